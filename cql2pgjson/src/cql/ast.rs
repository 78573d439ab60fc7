// SPDX-License-Identifier: AGPL-3.0-or-later

use std::fmt::{self, Display};

/// Index name matching every record.
pub const ALL_RECORDS: &str = "cql.allRecords";

/// Index name used for terms which do not name an index.
pub const SERVER_CHOICE: &str = "cql.serverChoice";

/// Node of a parsed CQL query.
#[derive(Debug, Clone, PartialEq)]
pub enum CqlNode {
    /// Single search clause, for example `title = "cat"`.
    Term(TermNode),

    /// Two sub-queries combined by a boolean operator.
    Boolean(BooleanNode),

    /// Query with sort keys attached to it.
    Sort(SortNode),
}

impl CqlNode {
    /// Returns a new term node with a relation without modifiers.
    pub fn term(index: &str, relation: &str, term: &str) -> Self {
        Self::Term(TermNode::new(index, Relation::new(relation), term))
    }

    /// Returns a new boolean node.
    pub fn boolean(operator: BooleanOperator, left: CqlNode, right: CqlNode) -> Self {
        Self::Boolean(BooleanNode {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    /// Returns a new sort node wrapping the given query.
    pub fn sort(subtree: CqlNode, keys: Vec<SortKey>) -> Self {
        Self::Sort(SortNode {
            subtree: Box::new(subtree),
            keys,
        })
    }

    /// Name of the node kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            CqlNode::Term(_) => "term",
            CqlNode::Boolean(_) => "boolean",
            CqlNode::Sort(_) => "sort",
        }
    }
}

/// Search clause consisting of index, relation and search term.
#[derive(Debug, Clone, PartialEq)]
pub struct TermNode {
    /// Index the term is searched in, `cql.serverChoice` when the query names none.
    pub index: String,

    /// Relation between index and term.
    pub relation: Relation,

    /// Search term as written in the query, CQL escape sequences are kept.
    pub term: String,
}

impl TermNode {
    /// Returns a search clause.
    pub fn new(index: &str, relation: Relation, term: &str) -> Self {
        Self {
            index: index.to_string(),
            relation,
            term: term.to_string(),
        }
    }
}

/// Comparison operator of a search clause, optionally with modifiers (`=/respectCase`).
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    /// Operator, either a symbol like `==` or a word like `all`.
    pub base: String,

    /// Modifiers in the order they appear in the query.
    pub modifiers: Vec<Modifier>,
}

impl Relation {
    /// Returns a relation without modifiers.
    pub fn new(base: &str) -> Self {
        Self {
            base: base.to_string(),
            modifiers: Vec::new(),
        }
    }

    /// Returns this relation with an additional modifier.
    pub fn modifier(mut self, modifier: Modifier) -> Self {
        self.modifiers.push(modifier);
        self
    }
}

/// Relation or sort modifier, for example `/respectCase` or `/@type=primary`.
#[derive(Debug, Clone, PartialEq)]
pub struct Modifier {
    /// Name of the modifier, including a leading `@` for relation modifiers.
    pub name: String,

    /// Comparison symbol between name and value.
    pub comparison: Option<String>,

    /// Value of the modifier.
    pub value: Option<String>,
}

impl Modifier {
    /// Returns a modifier without value.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            comparison: None,
            value: None,
        }
    }

    /// Returns a modifier with a comparison and value.
    pub fn with_value(name: &str, comparison: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            comparison: Some(comparison.to_string()),
            value: Some(value.to_string()),
        }
    }
}

/// Boolean operators supported by CQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOperator {
    /// Both sub-queries match.
    And,

    /// Any of the sub-queries matches.
    Or,

    /// CQL "NOT" is a binary operator with "AND NOT" semantics.
    Not,
}

/// Two sub-queries combined with a boolean operator.
#[derive(Debug, Clone, PartialEq)]
pub struct BooleanNode {
    /// Operator combining both sides.
    pub operator: BooleanOperator,

    /// Left side, the operator is left associative.
    pub left: Box<CqlNode>,

    /// Right side.
    pub right: Box<CqlNode>,
}

/// Query followed by a `sortBy` clause.
#[derive(Debug, Clone, PartialEq)]
pub struct SortNode {
    /// Query whose results are sorted.
    pub subtree: Box<CqlNode>,

    /// Sort keys, most significant first.
    pub keys: Vec<SortKey>,
}

/// One index of a `sortBy` clause, in the order the keys appear in the query.
#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    /// Index to sort by.
    pub index: String,

    /// Sort modifiers like `/sort.descending` or `/number`.
    pub modifiers: Vec<Modifier>,
}

impl SortKey {
    /// Returns an ascending sort key without modifiers.
    pub fn new(index: &str) -> Self {
        Self {
            index: index.to_string(),
            modifiers: Vec::new(),
        }
    }

    /// Returns this sort key with an additional modifier.
    pub fn modifier(mut self, modifier: Modifier) -> Self {
        self.modifiers.push(modifier);
        self
    }
}

fn write_modifiers(f: &mut fmt::Formatter<'_>, modifiers: &[Modifier]) -> fmt::Result {
    for modifier in modifiers {
        write!(f, "/{}", modifier.name)?;
        if let (Some(comparison), Some(value)) = (&modifier.comparison, &modifier.value) {
            write!(f, "{comparison}{value}")?;
        }
    }

    Ok(())
}

impl Display for BooleanOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let operator = match self {
            BooleanOperator::And => "and",
            BooleanOperator::Or => "or",
            BooleanOperator::Not => "not",
        };

        write!(f, "{operator}")
    }
}

impl Display for TermNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.index, self.relation.base)?;
        write_modifiers(f, &self.relation.modifiers)?;
        write!(f, " \"{}\"", self.term)
    }
}

impl Display for CqlNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CqlNode::Term(node) => write!(f, "{node}"),
            CqlNode::Boolean(node) => {
                write!(f, "({}) {} ({})", node.left, node.operator, node.right)
            }
            CqlNode::Sort(node) => {
                write!(f, "{} sortBy", node.subtree)?;
                for key in &node.keys {
                    write!(f, " {}", key.index)?;
                    write_modifiers(f, &key.modifiers)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BooleanOperator, CqlNode, Modifier, Relation, SortKey, TermNode};

    #[test]
    fn display_query() {
        let node = CqlNode::sort(
            CqlNode::boolean(
                BooleanOperator::Not,
                CqlNode::Term(TermNode::new(
                    "title",
                    Relation::new("=").modifier(Modifier::new("respectCase")),
                    "Cat",
                )),
                CqlNode::term("id", "==", "*"),
            ),
            vec![SortKey::new("title").modifier(Modifier::new("sort.descending"))],
        );

        assert_eq!(
            node.to_string(),
            "(title =/respectCase \"Cat\") not (id == \"*\") sortBy title/sort.descending"
        );
    }

    #[test]
    fn kind_names() {
        assert_eq!(CqlNode::term("a", "=", "b").kind(), "term");
        assert_eq!(
            CqlNode::sort(CqlNode::term("a", "=", "b"), vec![]).kind(),
            "sort"
        );
    }
}
