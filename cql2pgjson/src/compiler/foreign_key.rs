// SPDX-License-Identifier: AGPL-3.0-or-later

//! Joins to other tables through foreign keys.
//!
//! An index qualified with the name or alias of another table (`holdings_record.permanentLocationId`)
//! compiles into nested `IN` subqueries following the foreign keys from the current table to the
//! addressed one, in either direction.
use log::debug;

use crate::compiler::context::CompileContext;
use crate::compiler::term::compile_term;
use crate::config::ForeignKeyMode;
use crate::cql::TermNode;
use crate::errors::{Cql2PgJsonError, Result};
use crate::schema::{validate_sql_identifier, ForeignKeyHop, JSONB_COLUMN_NAME, PK_COLUMN_NAME};
use crate::sql::index_to_sql_text;

/// Direction of a join path relative to the current table.
#[derive(Debug)]
enum JoinPath {
    /// Current table is the child, hops lead up to the addressed parent.
    ToParent(Vec<ForeignKeyHop>),

    /// Current table is the parent, hops lead down to the addressed child.
    ToChild(Vec<ForeignKeyHop>),
}

/// Splits `alias.rest` when `alias` addresses another table of the schema.
fn qualifier<'n>(context: &CompileContext<'_>, name: &'n str) -> Option<(&'n str, &'n str)> {
    let (alias, rest) = name.split_once('.')?;

    if alias == context.table || rest.is_empty() {
        return None;
    }

    // Without a known current table there is nothing to join from
    context.schema.table(&context.table)?;

    if context.schema.is_table_or_alias(alias) {
        Some((alias, rest))
    } else {
        None
    }
}

/// Text expression of the foreign key field in the child documents.
fn foreign_key_field(hop: &ForeignKeyHop) -> String {
    index_to_sql_text(
        &format!("{}.{}", hop.table, JSONB_COLUMN_NAME),
        &hop.field,
    )
}

/// Finds the only join path between the current table and the addressed one.
fn join_path(context: &CompileContext<'_>, alias: &str) -> Result<JoinPath> {
    let to_parent = context
        .schema
        .foreign_key_path_to_alias(&context.table, alias);
    let to_child = context
        .schema
        .foreign_key_path_from_alias(alias, &context.table);

    match (to_parent, to_child) {
        (Some(path), None) => Ok(JoinPath::ToParent(path)),
        (None, Some(path)) => Ok(JoinPath::ToChild(path)),
        (Some(_), Some(_)) => Err(Cql2PgJsonError::QueryValidation(format!(
            "Ambiguous foreign key between {} and {}, both are parent and child of each other",
            context.table, alias
        ))),
        (None, None) => Err(Cql2PgJsonError::QueryValidation(format!(
            "No foreign key path between {} and {}",
            context.table, alias
        ))),
    }
}

/// Compiles a search clause addressing another table, returns `None` when the clause only
/// addresses the current table.
pub(crate) fn compile_foreign_key(
    context: &CompileContext<'_>,
    node: &TermNode,
) -> Result<Option<String>> {
    if let Some((alias, rest)) = qualifier(context, &node.index) {
        return compile_join(context, alias, rest, node).map(Some);
    }

    if context.foreign_key_mode == ForeignKeyMode::Permissive {
        if let Some((alias, field)) = qualifier(context, &node.term) {
            return compile_value_join(context, alias, field, node).map(Some);
        }
    }

    Ok(None)
}

/// Filters the current table by a predicate on the documents of another table.
fn compile_join(
    context: &CompileContext<'_>,
    alias: &str,
    rest: &str,
    node: &TermNode,
) -> Result<String> {
    let path = join_path(context, alias)?;

    let (hops, final_table) = match &path {
        JoinPath::ToParent(hops) => (hops, hops.last().map(|hop| hop.target_table.as_str())),
        JoinPath::ToChild(hops) => (hops, hops.last().map(|hop| hop.table.as_str())),
    };
    let final_table = final_table.ok_or_else(|| {
        Cql2PgJsonError::QueryValidation(format!(
            "No foreign key path between {} and {}",
            context.table, alias
        ))
    })?;

    debug!(
        "Join from {} to {} via {} foreign keys",
        context.table,
        final_table,
        hops.len()
    );

    let inner_node = TermNode::new(rest, node.relation.clone(), &node.term);
    let inner = compile_term(&context.for_table(final_table), &inner_node)?;

    let sql = hops.iter().rev().fold(inner, |inner, hop| match &path {
        JoinPath::ToParent(_) => format!(
            "({})::UUID IN  ( SELECT {} from {} WHERE {})",
            foreign_key_field(hop),
            PK_COLUMN_NAME,
            hop.target_table,
            inner
        ),
        JoinPath::ToChild(_) => format!(
            "{}.{} IN  ( SELECT ({})::UUID from {} WHERE {})",
            hop.target_table,
            PK_COLUMN_NAME,
            foreign_key_field(hop),
            hop.table,
            inner
        ),
    });

    Ok(sql)
}

/// Compares a field of the current table with the values of a field of another table.
fn compile_value_join(
    context: &CompileContext<'_>,
    alias: &str,
    field: &str,
    node: &TermNode,
) -> Result<String> {
    // The field comes from the search term and ends up in SQL string literals
    if field
        .split('.')
        .any(|segment| validate_sql_identifier(segment).is_err())
    {
        return Err(Cql2PgJsonError::QueryValidation(format!(
            "CQL: Invalid field name {} of table {}",
            field, alias
        )));
    }

    // Only tables linked by foreign keys can be compared
    join_path(context, alias)?;

    let table = context.schema.table_for_alias(alias).ok_or_else(|| {
        Cql2PgJsonError::QueryValidation(format!("Unknown table alias {}", alias))
    })?;

    let db_index = context.db_index(&node.index);
    let values = context.values(&node.index, &db_index)?;
    let other_field = index_to_sql_text(&format!("{}.{}", table, JSONB_COLUMN_NAME), field);

    match node.relation.base.as_str() {
        "=" | "==" => Ok(format!(
            "{} IN  ( SELECT {} from {})",
            values.text, other_field, table
        )),
        // A single NULL in the subquery would make NOT IN fail for every record
        "<>" => Ok(format!(
            "{} NOT IN  ( SELECT {} from {} WHERE {} IS NOT NULL)",
            values.text, other_field, table, other_field
        )),
        other => Err(Cql2PgJsonError::QueryValidation(format!(
            "CQL: Relation {} can't compare with values of table {}",
            other, alias
        ))),
    }
}
