// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::config::ForeignKeyMode;
use crate::errors::{Cql2PgJsonError, Result};
use crate::schema::{DbIndex, Schema, JSONB_COLUMN_NAME};
use crate::sql::{select_column, IndexTextAndJsonValues};

/// Everything needed to compile one node of a query.
///
/// Compiling a join or an array expansion creates a new context for the other table and reuses
/// the same compiler functions, so nested predicates follow the same rules as top-level ones.
#[derive(Debug, Clone)]
pub(crate) struct CompileContext<'a> {
    /// Name of the table the compiled predicate filters.
    pub table: String,

    /// Document columns, the first one is the default.
    pub columns: Vec<String>,

    /// Schema of all tables, shared with nested contexts.
    pub schema: &'a Schema,

    /// Indexes searched for `cql.serverChoice`.
    pub server_choice_indexes: &'a [String],

    /// Which side of a search clause may address another table.
    pub foreign_key_mode: ForeignKeyMode,
}

impl<'a> CompileContext<'a> {
    /// Returns the context of the table the first column belongs to.
    pub fn new(
        columns: &[String],
        schema: &'a Schema,
        server_choice_indexes: &'a [String],
        foreign_key_mode: ForeignKeyMode,
    ) -> Self {
        let table = columns
            .first()
            .map(|column| table_name(column))
            .unwrap_or_default();

        Self {
            table,
            columns: columns.to_vec(),
            schema,
            server_choice_indexes,
            foreign_key_mode,
        }
    }

    /// Context for compiling a predicate on the documents of another table.
    pub fn for_table(&self, table: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: vec![format!("{}.{}", table, JSONB_COLUMN_NAME)],
            schema: self.schema,
            server_choice_indexes: self.server_choice_indexes,
            foreign_key_mode: self.foreign_key_mode,
        }
    }

    /// Default document column.
    pub fn column(&self) -> &str {
        self.columns.first().map(String::as_str).unwrap_or_default()
    }

    /// Column and index name inside that column an index addresses.
    fn resolve<'i>(&'i self, index: &'i str) -> (&'i str, &'i str) {
        if self.columns.len() > 1 {
            select_column(&self.columns, index)
        } else {
            (self.column(), index)
        }
    }

    /// Declared indexes of a field of the current table.
    pub fn db_index(&self, index: &str) -> DbIndex<'a> {
        let (_, index) = self.resolve(index);
        self.schema.db_index(&self.table, index)
    }

    /// Text and JSON expressions of a field, using the expression of a compound or SQL
    /// expression index when one is declared.
    ///
    /// Fails for index names which can't be put into the string literals of a JSON path.
    pub fn values(
        &self,
        index: &str,
        db_index: &DbIndex<'_>,
    ) -> Result<IndexTextAndJsonValues> {
        if index.contains('\'') {
            return Err(Cql2PgJsonError::QueryValidation(format!(
                "CQL: Index name must not contain a single quote: {}",
                index
            )));
        }

        let (column, index) = self.resolve(index);
        Ok(IndexTextAndJsonValues::new(column, index)
            .with_index_expression(column, db_index.expression_index()))
    }
}

/// Derives the table name from a document column: `schema.users.jsonb` and `users.jsonb` address
/// table `users`, a column without a dot is taken as the table name.
pub(crate) fn table_name(column: &str) -> String {
    let segments: Vec<&str> = column.split('.').collect();

    if segments.len() >= 2 {
        segments[segments.len() - 2].to_string()
    } else {
        column.to_string()
    }
}
