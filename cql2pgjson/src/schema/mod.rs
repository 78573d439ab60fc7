// SPDX-License-Identifier: AGPL-3.0-or-later

//! Database schema description with tables, indexes and foreign keys.
mod errors;
mod foreign_keys;
mod index;
mod model;

pub use errors::SchemaError;
pub use foreign_keys::ForeignKeyHop;
pub use index::DbIndex;
pub use model::{
    validate_sql_identifier, ForeignKey, Index, Schema, Table, JSONB_COLUMN_NAME, PK_COLUMN_NAME,
};
