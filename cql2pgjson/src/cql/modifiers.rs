// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::cql::ast::Modifier;
use crate::errors::{Cql2PgJsonError, Result};

/// Case sensitivity of a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CqlCase {
    /// Compare lower-cased values, the default.
    IgnoreCase,

    /// Compare values as they are.
    RespectCase,
}

/// Accent sensitivity of a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CqlAccents {
    /// Compare values with accents removed, the default.
    IgnoreAccents,

    /// Compare values with their accents.
    RespectAccents,
}

/// Format the search term should be compared in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CqlTermFormat {
    /// Compare as text, the default.
    String,

    /// Compare as number, `/number` modifier.
    Number,
}

/// Direction of a sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CqlSort {
    /// Arrange items from smallest to largest value.
    Ascending,

    /// Arrange items from largest to smallest value.
    Descending,
}

/// Settings derived from the modifiers of a relation or sort key.
///
/// When a setting is given more than once the last one wins. Modifiers starting with `@` are
/// relation modifiers addressing elements of JSON arrays, they are collected as they are.
#[derive(Debug, Clone, PartialEq)]
pub struct CqlModifiers {
    /// `/ignoreCase` or `/respectCase`.
    pub case: CqlCase,

    /// `/ignoreAccents` or `/respectAccents`.
    pub accents: CqlAccents,

    /// `/string` or `/number`.
    pub term_format: CqlTermFormat,

    /// `/sort.ascending` or `/sort.descending`.
    pub sort: CqlSort,

    /// Modifiers starting with `@`.
    pub relation_modifiers: Vec<Modifier>,
}

impl Default for CqlModifiers {
    fn default() -> Self {
        Self {
            case: CqlCase::IgnoreCase,
            accents: CqlAccents::IgnoreAccents,
            term_format: CqlTermFormat::String,
            sort: CqlSort::Ascending,
            relation_modifiers: Vec::new(),
        }
    }
}

impl CqlModifiers {
    /// Derive settings from a list of modifiers, modifier names are case-insensitive.
    pub fn new(modifiers: &[Modifier]) -> Result<Self> {
        let mut result = Self::default();

        for modifier in modifiers {
            if modifier.name.starts_with('@') {
                result.relation_modifiers.push(modifier.clone());
                continue;
            }

            match modifier.name.to_lowercase().as_str() {
                "ignorecase" => result.case = CqlCase::IgnoreCase,
                "respectcase" => result.case = CqlCase::RespectCase,
                "ignoreaccents" => result.accents = CqlAccents::IgnoreAccents,
                "respectaccents" => result.accents = CqlAccents::RespectAccents,
                "string" => result.term_format = CqlTermFormat::String,
                "number" => result.term_format = CqlTermFormat::Number,
                "sort.ascending" => result.sort = CqlSort::Ascending,
                "sort.descending" => result.sort = CqlSort::Descending,
                // Masking is always on, `/unmasked` is not supported
                "masked" => (),
                _ => {
                    return Err(Cql2PgJsonError::UnsupportedFeature(format!(
                        "CQL: Unsupported modifier {}",
                        modifier.name
                    )))
                }
            }
        }

        Ok(result)
    }

    /// Returns true if neither case nor accents should be respected.
    pub fn ignores_case_and_accents(&self) -> bool {
        self.case == CqlCase::IgnoreCase && self.accents == CqlAccents::IgnoreAccents
    }
}
