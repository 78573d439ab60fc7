// SPDX-License-Identifier: AGPL-3.0-or-later

//! # cql2pgjson
//!
//! Compiles queries written in the Contextual Query Language (CQL) into the `WHERE` and
//! `ORDER BY` bodies of PostgreSQL statements over tables storing their records as JSONB
//! documents.
//!
//! Every table has a UUID primary key column `id` and a document column `jsonb`. A JSON schema
//! file describes the indexes declared on the document fields and the foreign keys between
//! tables, the generated SQL folds case and accents the same way these indexes do so PostgreSQL
//! can use them.
//!
//! ```
//! use std::sync::Arc;
//!
//! use cql2pgjson::{Cql2PgJson, Schema};
//!
//! let schema = Schema::from_json(
//!     r#"{
//!         "tables": [{
//!             "tableName": "users",
//!             "fullTextIndex": [{ "fieldName": "name" }]
//!         }]
//!     }"#,
//! )?;
//!
//! let translator = Cql2PgJson::new("users.jsonb")?.with_schema(Arc::new(schema));
//! let select = translator.to_sql("name all \"ada lovelace\" sortBy id")?;
//!
//! assert_eq!(
//!     select.get_where(),
//!     "to_tsvector('simple', f_unaccent(users.jsonb->>'name')) \
//!     @@ to_tsquery('simple', f_unaccent('ada & lovelace'))"
//! );
//! assert_eq!(select.get_order_by(), "id");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
#![warn(
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications
)]

mod compiler;
mod config;
pub mod cql;
mod errors;
pub mod schema;
pub mod sql;

#[cfg(test)]
mod test_utils;

pub use crate::compiler::{id_range_bounds, is_uuid, Cql2PgJson};
pub use crate::config::{Configuration, ForeignKeyMode};
pub use crate::cql::parse;
pub use crate::errors::{Cql2PgJsonError, Result};
pub use crate::schema::Schema;
pub use crate::sql::SqlSelect;
