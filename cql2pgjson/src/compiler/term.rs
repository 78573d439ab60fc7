// SPDX-License-Identifier: AGPL-3.0-or-later

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::compiler::context::CompileContext;
use crate::compiler::foreign_key::compile_foreign_key;
use crate::compiler::id::compile_id;
use crate::cql::{
    CqlAccents, CqlCase, CqlModifiers, CqlTermFormat, TermNode, ALL_RECORDS, SERVER_CHOICE,
};
use crate::errors::{Cql2PgJsonError, Result};
use crate::schema::{DbIndex, PK_COLUMN_NAME};
use crate::sql::escape::{cql2like, ft_term, is_postgres_number, json_string};
use crate::sql::{index_to_sql_json, index_to_sql_text, IndexTextAndJsonValues};

/// Stand-alone `*` tokens are not valid words in a full text query.
static STRAY_STARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r" +\*").expect("valid regular expression"));

/// Wraps a SQL expression into `f_unaccent` and `lower` calls.
fn fold(expression: &str, lower: bool, unaccent: bool) -> String {
    let mut result = expression.to_string();
    if unaccent {
        result = format!("f_unaccent({})", result);
    }
    if lower {
        result = format!("lower({})", result);
    }
    result
}

/// Compiles one search clause of a query into a SQL boolean expression.
pub(crate) fn compile_term(context: &CompileContext<'_>, node: &TermNode) -> Result<String> {
    if node.index.eq_ignore_ascii_case(ALL_RECORDS) {
        return Ok("true".into());
    }

    if let Some(sql) = compile_foreign_key(context, node)? {
        return Ok(sql);
    }

    if node.index.eq_ignore_ascii_case(SERVER_CHOICE) {
        if context.server_choice_indexes.is_empty() {
            return Err(Cql2PgJsonError::QueryValidation(
                "cql.serverChoice requested, but no server choice indexes defined".into(),
            ));
        }

        let pieces = context
            .server_choice_indexes
            .iter()
            .map(|index| compile_index(context, index, node))
            .collect::<Result<Vec<String>>>()?;

        return Ok(pieces.join(" OR "));
    }

    compile_index(context, &node.index, node)
}

/// Compiles a search clause against a field of the current table.
fn compile_index(context: &CompileContext<'_>, index: &str, node: &TermNode) -> Result<String> {
    let db_index = context.db_index(index);
    let values = context.values(index, &db_index)?;

    for modifier in &node.relation.modifiers {
        let name = match modifier.name.strip_prefix('@') {
            Some(name) => name,
            None => continue,
        };

        return match db_index.array_modifier(name) {
            Some((modifier_name, subfield)) => compile_array(
                context,
                index,
                node,
                modifier_name,
                subfield,
                modifier.value.as_deref().unwrap_or_default(),
                &db_index,
            ),
            None => Err(Cql2PgJsonError::QueryValidation(format!(
                "CQL: Unsupported relation modifier {}",
                modifier.name
            ))),
        };
    }

    if index == PK_COLUMN_NAME {
        return compile_id(node);
    }

    compile_comparison(node, &values, &db_index)
}

/// Chooses the comparison strategy from the relation and its modifiers.
fn compile_comparison(
    node: &TermNode,
    values: &IndexTextAndJsonValues,
    db_index: &DbIndex<'_>,
) -> Result<String> {
    let modifiers = CqlModifiers::new(&node.relation.modifiers)?;
    let comparator = node.relation.base.to_lowercase();

    let sql = match comparator.as_str() {
        "=" if modifiers.term_format == CqlTermFormat::Number => {
            compile_typed(node, &comparator, values, &modifiers, db_index)
        }
        "=" if modifiers.ignores_case_and_accents() => {
            compile_full_text(node, &comparator, values, &modifiers, db_index)?
        }
        "=" => compile_like(node, &comparator, values, &modifiers, db_index),
        "adj" | "all" | "any" => {
            compile_full_text(node, &comparator, values, &modifiers, db_index)?
        }
        "==" | "<>" if modifiers.term_format == CqlTermFormat::String => {
            compile_like(node, &comparator, values, &modifiers, db_index)
        }
        "==" | "<>" | "<" | ">" | "<=" | ">=" => {
            compile_typed(node, &comparator, values, &modifiers, db_index)
        }
        _ => {
            return Err(Cql2PgJsonError::UnsupportedFeature(format!(
                "Relation {} not implemented yet: {}",
                comparator, node
            )))
        }
    };

    debug!("Index {} generated SQL {}", values.text, sql);

    Ok(sql)
}

/// Full text search using the `simple` dictionary, which only lower-cases the words.
fn compile_full_text(
    node: &TermNode,
    comparator: &str,
    values: &IndexTextAndJsonValues,
    modifiers: &CqlModifiers,
    db_index: &DbIndex<'_>,
) -> Result<String> {
    let text = &values.text;

    if !db_index.has_full_text_index() {
        warn!("Doing full text search without full text index for {}", text);
    }

    if modifiers.accents == CqlAccents::RespectAccents {
        warn!("Ignoring /respectAccents modifier for full text search {}", text);
    }

    if modifiers.case == CqlCase::RespectCase {
        warn!("Ignoring /respectCase modifier for full text search {}", text);
    }

    let term = STRAY_STARS.replace_all(&node.term, "");
    let term = term.trim();

    if term == "*" {
        return Ok("true".into());
    }

    if term.is_empty() {
        return Ok(format!("{} ~ ''", text));
    }

    let words = term
        .split_whitespace()
        .map(ft_term)
        .collect::<Result<Vec<String>>>()?;

    let ts_query = match comparator {
        "any" => words.join(" | "),
        "all" => words.join(" & "),
        _ => words.join("<->"),
    };

    // Fold the same way the index was created
    let unaccent = db_index
        .full_text_index
        .map_or(true, |index| index.removes_accents());

    Ok(format!(
        "to_tsvector('simple', {}) @@ to_tsquery('simple', {})",
        fold(text, false, unaccent),
        fold(&format!("'{}'", ts_query), false, unaccent)
    ))
}

/// Pattern match with `LIKE`, first in the folding of the declared index so it gets used, then
/// in the folding the modifiers ask for.
fn compile_like(
    node: &TermNode,
    comparator: &str,
    values: &IndexTextAndJsonValues,
    modifiers: &CqlModifiers,
    db_index: &DbIndex<'_>,
) -> String {
    let text = &values.text;

    if !db_index.has_gin_index() && !db_index.has_like_index() {
        warn!("Doing LIKE search without GIN index for {}", text);
    }

    let operator = if comparator == "<>" {
        " NOT LIKE "
    } else {
        " LIKE "
    };
    let like = format!("'{}'", cql2like(&node.term));

    let (lower, unaccent) = db_index
        .pattern_index()
        .map_or((true, true), |index| {
            (!index.is_case_sensitive(), index.removes_accents())
        });

    let index_match = format!(
        "{}{}{}",
        fold(text, lower, unaccent),
        operator,
        fold(&like, lower, unaccent)
    );

    if modifiers.ignores_case_and_accents() {
        return index_match;
    }

    let lower = modifiers.case != CqlCase::RespectCase;
    let unaccent = modifiers.accents != CqlAccents::RespectAccents;

    format!(
        "{} AND {}{}{}",
        index_match,
        fold(text, lower, unaccent),
        operator,
        fold(&like, lower, unaccent)
    )
}

/// Plain SQL comparison, as number when the term is formatted as one.
fn compile_typed(
    node: &TermNode,
    comparator: &str,
    values: &IndexTextAndJsonValues,
    modifiers: &CqlModifiers,
    db_index: &DbIndex<'_>,
) -> String {
    if !db_index.has_other_index() {
        warn!("Doing SQL query without index for {}", values.text);
    }

    let comparator = if comparator == "==" { "=" } else { comparator };

    if modifiers.term_format == CqlTermFormat::Number {
        if is_postgres_number(&node.term) {
            return format!("({})::numeric {}{}", values.text, comparator, node.term);
        }

        return format!(
            "({})::numeric {}'{}'",
            values.text,
            comparator,
            cql2like(&node.term)
        );
    }

    format!("{} {}'{}'", values.text, comparator, cql2like(&node.term))
}

/// Searches the elements of a JSON array, only elements containing the relation modifier as key
/// and value match.
fn compile_array(
    context: &CompileContext<'_>,
    index: &str,
    node: &TermNode,
    modifier_name: &str,
    subfield: &str,
    modifier_value: &str,
    db_index: &DbIndex<'_>,
) -> Result<String> {
    // Inside the subquery the column is addressed without table name
    let column = match context.column().rsplit_once('.') {
        Some((_, column)) => column,
        None => {
            return Err(Cql2PgJsonError::FieldConfiguration(format!(
                "Array relation modifiers need a document column with table name, got {}",
                context.column()
            )))
        }
    };

    let values = IndexTextAndJsonValues {
        text: index_to_sql_text("t.c", subfield),
        json: index_to_sql_json("t.c", subfield),
    };
    let predicate = compile_comparison(node, &values, db_index)?;

    Ok(format!(
        "id in (select t.id from (select id as id, jsonb_array_elements({}) as c from {}) as t \
        where t.c @> '{{{}: {}}}' and {})",
        index_to_sql_json(column, index),
        context.table,
        json_string(modifier_name).replace('\'', "''"),
        json_string(modifier_value).replace('\'', "''"),
        predicate
    ))
}
