// SPDX-License-Identifier: AGPL-3.0-or-later

//! Building blocks of the generated SQL: escaping, JSON paths and the compiled statement parts.
pub mod escape;
mod path;
mod select;

pub use path::{
    index_expression, index_to_sql_json, index_to_sql_text, select_column,
    IndexTextAndJsonValues,
};
pub use select::SqlSelect;
