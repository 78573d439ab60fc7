// SPDX-License-Identifier: AGPL-3.0-or-later

//! Comparisons on the primary key column.
//!
//! Ids are UUIDs stored in the `id` column, searching them there instead of in the documents lets
//! PostgreSQL use the primary key index. Right truncated terms become a range scan.
use once_cell::sync::Lazy;
use regex::Regex;

use crate::cql::TermNode;
use crate::errors::{Cql2PgJsonError, Result};
use crate::schema::PK_COLUMN_NAME;

static UUID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        "^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$",
    )
    .expect("valid regular expression")
});

const LOWEST_UUID: &str = "00000000-0000-0000-0000-000000000000";

const HIGHEST_UUID: &str = "ffffffff-ffff-ffff-ffff-ffffffffffff";

/// Returns true if the value has the shape of a UUID.
pub fn is_uuid(value: &str) -> bool {
    UUID.is_match(value)
}

/// Lowest and highest UUID starting with the given prefix.
///
/// The bounds are not valid UUIDs when the prefix isn't a valid start of a UUID.
pub fn id_range_bounds(prefix: &str) -> (String, String) {
    let pad = |bound: &str| {
        // Prefixes with multibyte characters are never valid, padding by bytes is enough
        match bound.get(prefix.len()..) {
            Some(rest) => format!("{}{}", prefix, rest),
            None => prefix.to_string(),
        }
    };

    (pad(LOWEST_UUID), pad(HIGHEST_UUID))
}

fn invalid_uuid(equals: bool) -> String {
    // The term is never put into the comment
    if equals {
        "false /* id == invalid UUID */".into()
    } else {
        "true /* id <> invalid UUID */".into()
    }
}

/// Compiles a search clause on the primary key.
pub fn compile_id(node: &TermNode) -> Result<String> {
    if let Some(modifier) = node.relation.modifiers.first() {
        return Err(Cql2PgJsonError::QueryValidation(format!(
            "CQL: Unsupported modifier {}",
            modifier.name
        )));
    }

    let term = node.term.as_str();
    let (comparator, equals) = match node.relation.base.as_str() {
        ">" | "<" | ">=" | "<=" => {
            if !is_uuid(term) {
                return Err(Cql2PgJsonError::QueryValidation(format!(
                    "CQL: Invalid UUID after id comparator {}: {}",
                    node.relation.base, term
                )));
            }

            return Ok(format!("{}{}'{}'", PK_COLUMN_NAME, node.relation.base, term));
        }
        "=" | "==" => ("=", true),
        "<>" => ("<>", false),
        other => {
            return Err(Cql2PgJsonError::QueryValidation(format!(
                "CQL: Unsupported operator '{}' id only supports '=', '==', and '<>' \
                (possibly with right truncation)",
                other
            )))
        }
    };

    // Every record has an id
    if term.is_empty() || term == "*" {
        return Ok(if equals { "true" } else { "false" }.into());
    }

    if !term.contains('*') {
        if !is_uuid(term) {
            return Ok(invalid_uuid(equals));
        }

        return Ok(format!("{}{}'{}'", PK_COLUMN_NAME, comparator, term));
    }

    let prefix = term.strip_suffix('*').unwrap_or(term);
    if prefix.contains('*') {
        return Err(Cql2PgJsonError::QueryValidation(format!(
            "CQL: only right truncation supported for id: {}",
            term
        )));
    }

    let (lowest, highest) = id_range_bounds(prefix);
    if !is_uuid(&lowest) || !is_uuid(&highest) {
        return Ok(invalid_uuid(equals));
    }

    let sql = if equals {
        format!(
            "({pk}>='{lowest}' and {pk}<='{highest}')",
            pk = PK_COLUMN_NAME
        )
    } else {
        format!(
            "({pk}<'{lowest}' or {pk}>'{highest}')",
            pk = PK_COLUMN_NAME
        )
    };

    Ok(sql)
}
