// SPDX-License-Identifier: AGPL-3.0-or-later

use thiserror::Error;

/// Errors which can occur while loading a database schema description.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// Schema file could not be read.
    #[error("Could not read schema file '{0}': {1}")]
    Io(String, #[source] std::io::Error),

    /// Schema description is not valid JSON or does not match the expected structure.
    #[error("Invalid schema description: {0}")]
    Json(#[from] serde_json::Error),

    /// Table name can't be used as SQL identifier.
    #[error("SQL identifier must match regexp {0} but it is {1}")]
    InvalidIdentifier(String, String),

    /// Foreign key declaration is incomplete.
    #[error("Malformed foreign key in table {0}: {1}")]
    MalformedForeignKey(String, String),
}
