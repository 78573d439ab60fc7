// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::schema::Index;

/// SQL expressions addressing one field of the JSONB documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexTextAndJsonValues {
    /// Expression returning the field as text, for example `jsonb->'a'->>'b'`.
    pub text: String,

    /// Expression returning the field as JSON, for example `jsonb->'a'->'b'`.
    pub json: String,
}

impl IndexTextAndJsonValues {
    /// Returns the text and JSON expressions of a dotted index in the given document column.
    pub fn new(column: &str, index: &str) -> Self {
        Self {
            text: index_to_sql_text(column, index),
            json: index_to_sql_json(column, index),
        }
    }

    /// Replaces the text expression with the one an index was created on, if it declares one.
    pub fn with_index_expression(mut self, column: &str, index: Option<&Index>) -> Self {
        if let Some(expression) = index.and_then(|index| index_expression(column, index)) {
            self.text = expression;
        }
        self
    }
}

/// Converts a dotted index into a SQL expression of type text: `column->'foo'->>'bar'`.
pub fn index_to_sql_text(column: &str, index: &str) -> String {
    let segments: Vec<&str> = index.split('.').collect();
    let mut sql = String::from(column);

    for (position, segment) in segments.iter().enumerate() {
        if position < segments.len() - 1 {
            sql.push_str("->");
        } else {
            sql.push_str("->>");
        }
        sql.push('\'');
        sql.push_str(segment);
        sql.push('\'');
    }

    sql
}

/// Converts a dotted index into a SQL expression of type JSON: `column->'foo'->'bar'`.
pub fn index_to_sql_json(column: &str, index: &str) -> String {
    format!("{}->'{}'", column, index.replace('.', "'->'"))
}

/// Picks the document column an index addresses and strips the column prefix from it.
pub fn select_column<'a>(columns: &'a [String], index: &'a str) -> (&'a str, &'a str) {
    for column in columns {
        if let Some(rest) = index
            .strip_prefix(column.as_str())
            .and_then(|rest| rest.strip_prefix('.'))
        {
            return (column, rest);
        }
    }

    match columns.first() {
        Some(column) => (column, index),
        None => ("", index),
    }
}

/// Text expression of a compound or SQL expression index, `None` for plain field indexes.
pub fn index_expression(column: &str, index: &Index) -> Option<String> {
    if let Some(expression) = &index.sql_expression {
        return Some(format!("({})", expression.trim()));
    }

    let field_names = index.multi_field_names.as_deref()?;
    let fields: Vec<String> = field_names
        .split(',')
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .map(|field| index_to_sql_text(column, field))
        .collect();

    Some(format!("concat_space_sql({})", fields.join(" , ")))
}
