// SPDX-License-Identifier: AGPL-3.0-or-later

//! CQL query trees, the parser producing them and modifier handling.
mod ast;
mod modifiers;
mod parser;

pub use ast::{
    BooleanNode, BooleanOperator, CqlNode, Modifier, Relation, SortKey, SortNode, TermNode,
    ALL_RECORDS, SERVER_CHOICE,
};
pub use modifiers::{CqlAccents, CqlCase, CqlModifiers, CqlSort, CqlTermFormat};
pub use parser::{parse, ParseError};
