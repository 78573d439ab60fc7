// SPDX-License-Identifier: AGPL-3.0-or-later

use std::fmt::{self, Display};

/// `WHERE` and `ORDER BY` bodies compiled from one CQL query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SqlSelect {
    /// Boolean expression without the leading `WHERE` keyword, empty when there is none.
    pub where_clause: String,

    /// Comma separated sort expressions without the leading `ORDER BY` keywords, empty when the
    /// query has no sort keys.
    pub order_by: String,
}

impl SqlSelect {
    /// Returns a statement body from its compiled parts.
    pub fn new(where_clause: String, order_by: String) -> Self {
        Self {
            where_clause,
            order_by,
        }
    }

    /// Returns the `WHERE` body.
    pub fn get_where(&self) -> &str {
        &self.where_clause
    }

    /// Returns the `ORDER BY` body.
    pub fn get_order_by(&self) -> &str {
        &self.order_by
    }
}

impl Display for SqlSelect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.where_clause.is_empty() {
            write!(f, "WHERE {}", self.where_clause)?;
        }

        if !self.order_by.is_empty() {
            if !self.where_clause.is_empty() {
                write!(f, " ")?;
            }
            write!(f, "ORDER BY {}", self.order_by)?;
        }

        Ok(())
    }
}
