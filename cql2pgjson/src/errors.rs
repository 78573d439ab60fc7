// SPDX-License-Identifier: AGPL-3.0-or-later

use thiserror::Error;

use crate::cql::ParseError;
use crate::schema::SchemaError;

/// A specialized result type for compiling CQL queries.
pub type Result<T> = std::result::Result<T, Cql2PgJsonError>;

/// Represents all the ways a CQL query can fail to compile.
#[derive(Error, Debug)]
pub enum Cql2PgJsonError {
    /// Name of the document column is invalid or empty.
    #[error("Invalid document column: {0}")]
    FieldConfiguration(String),

    /// List of server choice indexes contains invalid names.
    #[error("Invalid server choice index: {0}")]
    IndexConfiguration(String),

    /// Query can't be translated with the given schema and configuration.
    #[error("Invalid query: {0}")]
    QueryValidation(String),

    /// Query uses a CQL feature which is not implemented.
    #[error("Unsupported CQL feature: {0}")]
    UnsupportedFeature(String),

    /// Query text is not valid CQL.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Schema description could not be loaded.
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl Cql2PgJsonError {
    /// Returns true if this error was caused by the query and not by the configuration of the
    /// translator.
    pub fn is_query_error(&self) -> bool {
        matches!(
            self,
            Self::QueryValidation(_) | Self::UnsupportedFeature(_) | Self::Parse(_)
        )
    }
}
