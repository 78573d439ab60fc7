// SPDX-License-Identifier: AGPL-3.0-or-later

use log::debug;

use crate::compiler::context::CompileContext;
use crate::compiler::term::compile_term;
use crate::cql::{
    BooleanNode, BooleanOperator, CqlModifiers, CqlNode, CqlSort, CqlTermFormat, SortKey,
};
use crate::errors::Result;
use crate::schema::PK_COLUMN_NAME;
use crate::sql::SqlSelect;

/// Compiles a query into one SQL boolean expression.
///
/// A sort node inside the query is rendered as `<where> ORDER BY <order>`.
pub(crate) fn compile_node(context: &CompileContext<'_>, node: &CqlNode) -> Result<String> {
    match node {
        CqlNode::Term(term) => compile_term(context, term),
        CqlNode::Boolean(boolean) => compile_boolean(context, boolean),
        CqlNode::Sort(_) => {
            let select = compile_select(context, node)?;
            Ok(format!("{} ORDER BY {}", select.where_clause, select.order_by))
        }
    }
}

/// Compiles a query into `WHERE` and `ORDER BY` bodies.
pub(crate) fn compile_select(context: &CompileContext<'_>, node: &CqlNode) -> Result<SqlSelect> {
    match node {
        CqlNode::Sort(sort) => {
            let where_clause = compile_node(context, &sort.subtree)?;
            let order_by = compile_sort_keys(context, &sort.keys)?;
            Ok(SqlSelect::new(where_clause, order_by))
        }
        _ => Ok(SqlSelect::new(compile_node(context, node)?, String::new())),
    }
}

/// Returns true for a clause like `title=*` which matches every record having the field.
fn matches_any_value(node: &CqlNode) -> bool {
    match node {
        CqlNode::Term(term) => term.term == "*" && term.relation.base == "=",
        _ => false,
    }
}

/// Compiles a chain of boolean nodes.
///
/// Parsed queries nest to the left, the chain is walked in a loop so long queries don't grow the
/// stack.
fn compile_boolean(context: &CompileContext<'_>, node: &BooleanNode) -> Result<String> {
    let mut chain = vec![node];
    let mut leftmost = node.left.as_ref();
    while let CqlNode::Boolean(boolean) = leftmost {
        chain.push(boolean);
        leftmost = boolean.left.as_ref();
    }

    let mut sql = compile_node(context, leftmost)?;

    for boolean in chain.into_iter().rev() {
        // User interfaces send `title=* OR contributors=* OR ...` before anything was typed in
        if boolean.operator == BooleanOperator::Or && matches_any_value(&boolean.right) {
            debug!("Simplifying OR clause with =* on the right side");
            continue;
        }

        let right = compile_node(context, &boolean.right)?;

        sql = match boolean.operator {
            BooleanOperator::And => format!("({}) AND ({})", sql, right),
            BooleanOperator::Or => format!("({}) OR ({})", sql, right),
            // CQL "NOT" means "AND NOT", a missing field (NULL) counts as not matching
            BooleanOperator::Not => format!("({}) AND (({}) IS NOT TRUE)", sql, right),
        };
    }

    Ok(sql)
}

fn compile_sort_keys(context: &CompileContext<'_>, keys: &[SortKey]) -> Result<String> {
    let mut order = Vec::with_capacity(keys.len());

    for key in keys {
        let modifiers = CqlModifiers::new(&key.modifiers)?;
        let direction = match modifiers.sort {
            CqlSort::Ascending => "",
            CqlSort::Descending => " DESC",
        };

        if key.index == PK_COLUMN_NAME {
            order.push(format!("{}{}", PK_COLUMN_NAME, direction));
            continue;
        }

        let db_index = context.db_index(&key.index);
        let values = context.values(&key.index, &db_index)?;

        // Numbers sort by their JSON value, text by its folded form
        let expression = match modifiers.term_format {
            CqlTermFormat::Number => values.json,
            CqlTermFormat::String => format!("lower(f_unaccent({}))", values.text),
        };

        order.push(format!("{}{}", expression, direction));
    }

    Ok(order.join(", "))
}
