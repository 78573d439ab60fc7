// SPDX-License-Identifier: AGPL-3.0-or-later

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::schema::JSONB_COLUMN_NAME;

/// Configuration object holding everything a translator needs to compile queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Document columns the queries run against, for example `users.jsonb`.
    ///
    /// The table name is taken from the first column. When more than one column is given, an
    /// index prefixed with a column name (`group_data.name`) addresses that column, all other
    /// indexes address the first column.
    pub document_columns: Vec<String>,

    /// Indexes searched for terms without an explicit index (`cql.serverChoice`).
    pub server_choice_indexes: Vec<String>,

    /// Path to the JSON description of tables, indexes and foreign keys.
    ///
    /// Without a schema no index information is available, all comparisons are still generated
    /// but with default case and accent folding and no foreign key joins.
    pub db_schema_path: Option<PathBuf>,

    /// Which side of a term may address another table.
    pub foreign_key_mode: ForeignKeyMode,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            document_columns: vec![JSONB_COLUMN_NAME.into()],
            server_choice_indexes: Vec::new(),
            db_schema_path: None,
            foreign_key_mode: ForeignKeyMode::default(),
        }
    }
}

/// Strictness of foreign key detection in search clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForeignKeyMode {
    /// Only an index qualified with a table name or alias (`tableb.name = x`) joins another table.
    Strict,

    /// Additionally a search term qualified with a table name or alias (`tableaId == tableb.id`)
    /// compares against the values of the other table.
    Permissive,
}

impl Default for ForeignKeyMode {
    fn default() -> Self {
        Self::Strict
    }
}
