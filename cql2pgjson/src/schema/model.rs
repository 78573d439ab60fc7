// SPDX-License-Identifier: AGPL-3.0-or-later

use std::fs;
use std::path::Path;

use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::schema::errors::SchemaError;

/// Table names need to be usable as SQL identifiers without quoting. The length is limited to
/// stay within PostgreSQL's limit of 63 characters when deriving index and trigger names.
static SQL_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new("^[a-zA-Z_][a-zA-Z0-9_]{0,48}$").expect("valid regular expression"));

/// Name of the primary key column of every table.
pub const PK_COLUMN_NAME: &str = "id";

/// Name of the JSONB column holding the documents of a table.
pub const JSONB_COLUMN_NAME: &str = "jsonb";

/// Returns an error if the given string can't be used as a table name.
pub fn validate_sql_identifier(identifier: &str) -> Result<(), SchemaError> {
    if !SQL_IDENTIFIER.is_match(identifier) {
        return Err(SchemaError::InvalidIdentifier(
            SQL_IDENTIFIER.as_str().to_string(),
            identifier.to_string(),
        ));
    }

    Ok(())
}

fn default_true() -> bool {
    true
}

/// Database schema description with all tables, their indexes and foreign keys.
///
/// The schema is loaded once and never changed afterwards, it can be shared between many
/// translators and threads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Schema {
    /// Tables storing JSONB documents.
    pub tables: Vec<Table>,
}

/// Table holding JSONB documents in its `jsonb` column and their UUID in the `id` column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    /// Name of the table, a valid SQL identifier.
    pub table_name: String,

    /// Indexes using `tsvector` full text search.
    #[serde(default)]
    pub full_text_index: Vec<Index>,

    /// Indexes using `gin_trgm_ops` trigram matching.
    #[serde(default)]
    pub gin_index: Vec<Index>,

    /// Non-unique b-tree indexes.
    #[serde(default)]
    pub index: Vec<Index>,

    /// Unique b-tree indexes.
    #[serde(default)]
    pub unique_index: Vec<Index>,

    /// Indexes using `text_pattern_ops`, optimized for `LIKE` queries.
    #[serde(default)]
    pub like_index: Vec<Index>,

    /// Foreign keys pointing from this table to its parent tables.
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
}

/// Index on a field of the JSONB documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Index {
    /// Dotted path of the indexed field, for example `personal.lastName`.
    pub field_name: String,

    /// Index was created without `lower()`.
    #[serde(default)]
    pub case_sensitive: bool,

    /// Index was created with `f_unaccent()`, the default.
    #[serde(default = "default_true")]
    pub remove_accents: bool,

    /// Non-string indexes are neither lower-cased nor unaccented.
    #[serde(default = "default_true")]
    pub string_type: bool,

    /// Field inside the array elements the relation modifiers compare against.
    #[serde(default)]
    pub array_subfield: Option<String>,

    /// Names of relation modifiers (without `@`) supported on the array elements.
    #[serde(default)]
    pub array_modifiers: Vec<String>,

    /// Comma separated dotted paths of a compound index.
    #[serde(default)]
    pub multi_field_names: Option<String>,

    /// SQL expression the index was created on, used instead of the JSON path.
    #[serde(default)]
    pub sql_expression: Option<String>,
}

impl Index {
    /// Returns a plain string index on the given field.
    pub fn new(field_name: &str) -> Self {
        Self {
            field_name: field_name.to_string(),
            case_sensitive: false,
            remove_accents: true,
            string_type: true,
            array_subfield: None,
            array_modifiers: Vec::new(),
            multi_field_names: None,
            sql_expression: None,
        }
    }

    /// Returns true if the index was created without `lower()`.
    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive || !self.string_type
    }

    /// Returns true if the index was created with `f_unaccent()`.
    pub fn removes_accents(&self) -> bool {
        self.remove_accents && self.string_type
    }
}

/// Foreign key pointing from a child table to its parent table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKey {
    /// Dotted path of the field in the child documents holding the parent id.
    pub field_name: String,

    /// Name of the parent table.
    pub target_table: String,

    /// Name queries use to address the parent table from the child, defaults to the target
    /// table name.
    #[serde(default)]
    pub target_table_alias: Option<String>,

    /// Name queries use to address the child table from the parent, defaults to the child
    /// table name.
    #[serde(default)]
    pub table_alias: Option<String>,
}

impl ForeignKey {
    /// Returns a foreign key without aliases.
    pub fn new(field_name: &str, target_table: &str) -> Self {
        Self {
            field_name: field_name.to_string(),
            target_table: target_table.to_string(),
            target_table_alias: None,
            table_alias: None,
        }
    }

    /// Alias of the parent table, falls back to its name.
    pub fn target_alias(&self) -> &str {
        self.target_table_alias
            .as_deref()
            .unwrap_or(&self.target_table)
    }

    /// Alias of the child table owning this foreign key, falls back to its name.
    pub fn source_alias<'a>(&'a self, table: &'a Table) -> &'a str {
        self.table_alias.as_deref().unwrap_or(&table.table_name)
    }
}

impl Schema {
    /// Parses and validates a JSON schema description.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let schema: Schema = serde_json::from_str(json)?;
        schema.validate()?;
        Ok(schema)
    }

    /// Reads a JSON schema description from a file.
    pub fn from_file(path: &Path) -> Result<Self, SchemaError> {
        let json = fs::read_to_string(path)
            .map_err(|err| SchemaError::Io(path.display().to_string(), err))?;
        let schema = Self::from_json(&json)?;

        info!(
            "Loaded database schema with {} tables from {}",
            schema.tables.len(),
            path.display()
        );

        Ok(schema)
    }

    fn validate(&self) -> Result<(), SchemaError> {
        for table in &self.tables {
            validate_sql_identifier(&table.table_name)?;

            for foreign_key in &table.foreign_keys {
                if foreign_key.field_name.trim().is_empty() {
                    return Err(SchemaError::MalformedForeignKey(
                        table.table_name.clone(),
                        "missing field name".into(),
                    ));
                }

                validate_sql_identifier(&foreign_key.target_table).map_err(|_| {
                    SchemaError::MalformedForeignKey(
                        table.table_name.clone(),
                        format!(
                            "invalid target table '{}' for field {}",
                            foreign_key.target_table, foreign_key.field_name
                        ),
                    )
                })?;
            }
        }

        Ok(())
    }

    /// Returns the table with the given name.
    pub fn table(&self, table_name: &str) -> Option<&Table> {
        self.tables
            .iter()
            .find(|table| table.table_name == table_name)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use rstest::rstest;
    use tempfile::NamedTempFile;

    use crate::schema::errors::SchemaError;

    use super::{validate_sql_identifier, Schema};

    #[test]
    fn index_defaults() {
        let schema = Schema::from_json(
            r#"{
                "tables": [{
                    "tableName": "users",
                    "mode": "new",
                    "ginIndex": [{ "fieldName": "name" }],
                    "index": [{ "fieldName": "age", "stringType": false }]
                }]
            }"#,
        )
        .unwrap();

        let table = schema.table("users").unwrap();
        let name = &table.gin_index[0];
        assert!(!name.is_case_sensitive());
        assert!(name.removes_accents());

        // Non-string indexes are never folded
        let age = &table.index[0];
        assert!(age.is_case_sensitive());
        assert!(!age.removes_accents());

        assert!(table.full_text_index.is_empty());
        assert!(table.foreign_keys.is_empty());
    }

    #[test]
    fn foreign_key_aliases() {
        let schema = Schema::from_json(
            r#"{
                "tables": [
                    { "tableName": "parent" },
                    {
                        "tableName": "child",
                        "foreignKeys": [
                            { "fieldName": "parentId", "targetTable": "parent" },
                            {
                                "fieldName": "otherParentId",
                                "targetTable": "parent",
                                "targetTableAlias": "otherParent",
                                "tableAlias": "otherChild"
                            }
                        ]
                    }
                ]
            }"#,
        )
        .unwrap();

        let child = schema.table("child").unwrap();
        assert_eq!(child.foreign_keys[0].target_alias(), "parent");
        assert_eq!(child.foreign_keys[0].source_alias(child), "child");
        assert_eq!(child.foreign_keys[1].target_alias(), "otherParent");
        assert_eq!(child.foreign_keys[1].source_alias(child), "otherChild");
    }

    #[rstest]
    #[case::invalid_json("{ tables: ", false)]
    #[case::invalid_table_name(r#"{ "tables": [{ "tableName": "drop table" }] }"#, false)]
    #[case::malformed_foreign_key(
        r#"{ "tables": [{ "tableName": "a", "foreignKeys": [{ "fieldName": "bId", "targetTable": "" }] }] }"#,
        false
    )]
    #[case::empty_schema("{}", true)]
    fn load_json(#[case] json: &str, #[case] is_ok: bool) {
        assert_eq!(Schema::from_json(json).is_ok(), is_ok);
    }

    #[rstest]
    #[case::simple("users", true)]
    #[case::underscore("_holdings_record", true)]
    #[case::digit_first("1users", false)]
    #[case::dash("user-data", false)]
    #[case::quote("users'", false)]
    #[case::too_long("a1234567890123456789012345678901234567890123456789", false)]
    #[case::max_length("a123456789012345678901234567890123456789012345678", true)]
    fn sql_identifiers(#[case] identifier: &str, #[case] is_valid: bool) {
        assert_eq!(validate_sql_identifier(identifier).is_ok(), is_valid);
    }

    #[test]
    fn load_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(br#"{ "tables": [{ "tableName": "instance" }] }"#)
            .unwrap();

        let schema = Schema::from_file(file.path()).unwrap();
        assert!(schema.table("instance").is_some());
        assert!(schema.table("item").is_none());
    }

    #[test]
    fn missing_file() {
        let result = Schema::from_file(std::path::Path::new("/does/not/exist.json"));
        assert!(matches!(result, Err(SchemaError::Io(_, _))));
    }
}
