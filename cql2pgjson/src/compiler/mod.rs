// SPDX-License-Identifier: AGPL-3.0-or-later

//! Translation of CQL query trees into SQL for PostgreSQL JSONB columns.
mod context;
mod foreign_key;
mod id;
mod term;
mod tree;

use std::sync::Arc;

use log::{debug, info};

use crate::compiler::context::{table_name, CompileContext};
use crate::config::{Configuration, ForeignKeyMode};
use crate::cql::{parse, CqlNode};
use crate::errors::{Cql2PgJsonError, Result};
use crate::schema::Schema;
use crate::sql::SqlSelect;

pub use id::{id_range_bounds, is_uuid};

/// Translator of CQL queries into `WHERE` and `ORDER BY` bodies for one or more JSONB columns.
///
/// The translator is immutable once built and can be shared between threads. Every compilation
/// only reads the schema, compiling the same query twice yields the same SQL.
///
/// ```
/// # use cql2pgjson::Cql2PgJson;
/// let translator = Cql2PgJson::new("users.jsonb")?;
/// assert_eq!(
///     translator.to_where("name == Smith")?,
///     "lower(f_unaccent(users.jsonb->>'name')) LIKE lower(f_unaccent('Smith'))"
/// );
/// # Ok::<(), cql2pgjson::Cql2PgJsonError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Cql2PgJson {
    columns: Vec<String>,
    schema: Arc<Schema>,
    server_choice_indexes: Vec<String>,
    foreign_key_mode: ForeignKeyMode,
}

impl Cql2PgJson {
    /// Returns a translator for queries on a single document column, for example `users.jsonb`.
    pub fn new(column: &str) -> Result<Self> {
        Self::with_columns(&[column])
    }

    /// Returns a translator for queries on several document columns.
    ///
    /// Indexes prefixed with a column name address that column, all others the first one.
    pub fn with_columns<S: AsRef<str>>(columns: &[S]) -> Result<Self> {
        if columns.is_empty() {
            return Err(Cql2PgJsonError::FieldConfiguration(
                "at least one document column is required".into(),
            ));
        }

        let columns = columns
            .iter()
            .map(|column| {
                let column = column.as_ref().trim();
                if column.is_empty() {
                    return Err(Cql2PgJsonError::FieldConfiguration(
                        "document column name must not be empty".into(),
                    ));
                }
                Ok(column.to_string())
            })
            .collect::<Result<Vec<String>>>()?;

        Ok(Self {
            columns,
            schema: Arc::new(Schema::default()),
            server_choice_indexes: Vec::new(),
            foreign_key_mode: ForeignKeyMode::default(),
        })
    }

    /// Uses the given schema for index information and foreign keys.
    pub fn with_schema(mut self, schema: Arc<Schema>) -> Self {
        self.schema = schema;
        self
    }

    /// Indexes searched for terms without explicit index.
    ///
    /// Names must not be empty or contain quotes.
    pub fn with_server_choice_indexes<S: AsRef<str>>(mut self, indexes: &[S]) -> Result<Self> {
        let mut server_choice_indexes = Vec::with_capacity(indexes.len());

        for (position, index) in indexes.iter().enumerate() {
            let index = index.as_ref();

            if index.trim().is_empty() {
                return Err(Cql2PgJsonError::IndexConfiguration(format!(
                    "index number {} is empty",
                    position + 1
                )));
            }

            if index.contains('"') || index.contains('\'') {
                return Err(Cql2PgJsonError::IndexConfiguration(format!(
                    "index number {} contains a quote: {}",
                    position + 1,
                    index
                )));
            }

            server_choice_indexes.push(index.to_string());
        }

        self.server_choice_indexes = server_choice_indexes;
        Ok(self)
    }

    /// Sets which side of a search clause may address another table.
    pub fn with_foreign_key_mode(mut self, mode: ForeignKeyMode) -> Self {
        self.foreign_key_mode = mode;
        self
    }

    /// Builds a translator from a configuration, loading the schema file if one is configured.
    pub fn from_config(config: &Configuration) -> Result<Self> {
        let translator = Self::with_columns(&config.document_columns)?
            .with_server_choice_indexes(&config.server_choice_indexes)?
            .with_foreign_key_mode(config.foreign_key_mode);

        match &config.db_schema_path {
            Some(path) => {
                let schema = Schema::from_file(path)?;
                Ok(translator.with_schema(Arc::new(schema)))
            }
            None => {
                info!("No database schema configured, index information is not available");
                Ok(translator)
            }
        }
    }

    /// Document columns queries run against.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Name of the table derived from the first document column.
    pub fn table_name(&self) -> String {
        self.columns
            .first()
            .map(|column| table_name(column))
            .unwrap_or_default()
    }

    /// Schema used for index information and foreign keys.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Server choice indexes.
    pub fn server_choice_indexes(&self) -> &[String] {
        &self.server_choice_indexes
    }

    fn context(&self) -> CompileContext<'_> {
        CompileContext::new(
            &self.columns,
            &self.schema,
            &self.server_choice_indexes,
            self.foreign_key_mode,
        )
    }

    /// Compiles CQL query text into a `WHERE` body without the `WHERE` keyword.
    ///
    /// Sort keys of the query are appended as `ORDER BY` clause.
    pub fn to_where(&self, cql: &str) -> Result<String> {
        self.to_where_node(&parse(cql)?)
    }

    /// Compiles a parsed CQL query into a `WHERE` body.
    pub fn to_where_node(&self, node: &CqlNode) -> Result<String> {
        let sql = tree::compile_node(&self.context(), node)?;
        debug!("CQL {} generated SQL {}", node, sql);
        Ok(sql)
    }

    /// Compiles CQL query text into separate `WHERE` and `ORDER BY` bodies.
    pub fn to_sql(&self, cql: &str) -> Result<SqlSelect> {
        self.to_sql_node(&parse(cql)?)
    }

    /// Compiles a parsed CQL query into separate `WHERE` and `ORDER BY` bodies.
    pub fn to_sql_node(&self, node: &CqlNode) -> Result<SqlSelect> {
        let select = tree::compile_select(&self.context(), node)?;
        debug!("CQL {} generated SQL {}", node, select);
        Ok(select)
    }
}
