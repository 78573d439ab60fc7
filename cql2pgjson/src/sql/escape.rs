// SPDX-License-Identifier: AGPL-3.0-or-later

//! Conversion of CQL search terms into SQL literals, patterns and full text tokens.
//!
//! CQL escapes `*`, `?`, `^` and `\` with a backslash. Every function here returns text which is
//! safe to place between single quotes in a SQL statement.
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::{Cql2PgJsonError, Result};

/// Numeric constant as accepted by PostgreSQL, see
/// <https://www.postgresql.org/docs/current/sql-syntax-lexical.html#SQL-SYNTAX-CONSTANTS-NUMERIC>
static POSTGRES_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:\d+|\d+\.\d*|\.\d+)(?:[eE][+-]?\d+)?$").expect("valid regular expression")
});

/// Characters with a special meaning inside a `tsquery` literal.
const TSQUERY_SPECIALS: &str = "&!|()<>*:\\";

/// Characters which need a backslash inside a POSIX regular expression.
const REGEXP_SPECIALS: &str = ".+(){}[]$";

/// Converts a CQL string into the body of a SQL `LIKE` pattern.
///
/// Unescaped `*` and `?` become `%` and `_`, literal `%` and `_` are escaped. A single
/// trailing backslash is matched literally.
pub fn cql2like(value: &str) -> String {
    let mut like = String::with_capacity(value.len());

    // True if the previous character is an escaping backslash
    let mut backslash = false;

    for c in value.chars() {
        match c {
            '\\' => {
                if backslash {
                    like.push_str("\\\\");
                }
                backslash = !backslash;
                continue;
            }
            '%' | '_' => {
                like.push('\\');
                like.push(c);
            }
            '?' if backslash => like.push_str("\\?"),
            '?' => like.push('_'),
            '*' if backslash => like.push_str("\\*"),
            '*' => like.push('%'),
            '\'' => like.push_str("''"),
            _ => like.push(c),
        }

        backslash = false;
    }

    if backslash {
        like.push_str("\\\\");
    }

    like
}

/// Converts a CQL string into the body of a plain SQL string literal.
///
/// Fails on masking characters and anchors as they have no meaning in a plain string.
pub fn cql2string(value: &str) -> Result<String> {
    let mut result = String::with_capacity(value.len());
    let mut chars = value.chars();

    while let Some(c) = chars.next() {
        let c = match c {
            '\\' => chars.next().ok_or_else(|| {
                Cql2PgJsonError::QueryValidation(format!(
                    "CQL: Trailing backslash in term: {value}"
                ))
            })?,
            '*' | '?' | '^' => {
                return Err(Cql2PgJsonError::QueryValidation(format!(
                    "CQL: Unsupported masking or anchor character {c} in term: {value}"
                )))
            }
            _ => c,
        };

        if c == '\'' {
            result.push_str("''");
        } else {
            result.push(c);
        }
    }

    Ok(result)
}

/// Converts a CQL string into a POSIX regular expression for the `~` operator.
///
/// `*` becomes `.*`, `?` becomes `.` and `^` matches the start or the end of the string.
pub fn cql2regexp(value: &str) -> String {
    let mut regexp = String::with_capacity(value.len());
    let mut backslash = false;

    for c in value.chars() {
        match c {
            '\\' => {
                if backslash {
                    regexp.push_str("\\\\");
                }
                backslash = !backslash;
                continue;
            }
            _ if REGEXP_SPECIALS.contains(c) => {
                regexp.push('\\');
                regexp.push(c);
            }
            '?' if backslash => regexp.push_str("\\?"),
            '?' => regexp.push('.'),
            '*' if backslash => regexp.push_str("\\*"),
            '*' => regexp.push_str(".*"),
            '^' if backslash => regexp.push_str("\\^"),
            '^' => regexp.push_str("(^|$)"),
            '\'' => regexp.push_str("''"),
            _ => regexp.push(c),
        }

        backslash = false;
    }

    if backslash {
        regexp.push_str("\\\\");
    }

    regexp
}

/// Converts one word of a CQL term into a token of a `tsquery` literal.
///
/// Right truncation (`abc*`) becomes a prefix match, all other masking and anchoring is
/// rejected.
pub fn ft_term(word: &str) -> Result<String> {
    let word = word.trim();
    let chars: Vec<char> = word.chars().collect();
    let mut result = String::with_capacity(word.len());
    let mut i = 0;

    while i < chars.len() {
        let mut c = chars[i];

        match c {
            '?' => {
                return Err(Cql2PgJsonError::QueryValidation(
                    "CQL: single character mask unsupported (?)".into(),
                ))
            }
            '*' if i == chars.len() - 1 => {
                result.push_str(":*");
                i += 1;
                continue;
            }
            '*' => {
                return Err(Cql2PgJsonError::QueryValidation(
                    "CQL: only right truncation supported".into(),
                ))
            }
            '^' => {
                return Err(Cql2PgJsonError::QueryValidation(
                    "CQL: anchoring unsupported (^)".into(),
                ))
            }
            '\\' => {
                // Trailing backslash escapes nothing
                if i == chars.len() - 1 {
                    break;
                }
                i += 1;
                c = chars[i];
            }
            _ => (),
        }

        i += 1;

        if c == '\'' {
            // A leading quote can't be doubled inside the tsquery literal
            if !result.is_empty() {
                result.push_str("''");
            }
            continue;
        }

        if TSQUERY_SPECIALS.contains(c) {
            result.push('\\');
        }
        result.push(c);
    }

    Ok(result)
}

/// Returns true if the value is a numeric constant PostgreSQL accepts without quotes.
pub fn is_postgres_number(value: &str) -> bool {
    POSTGRES_NUMBER.is_match(value)
}

/// Returns true if the CQL string contains an unescaped `*` or `?`.
pub fn has_cql_wildcard(value: &str) -> bool {
    let mut backslash = false;

    for c in value.chars() {
        match c {
            '\\' => {
                backslash = !backslash;
                continue;
            }
            '*' | '?' if !backslash => return true,
            _ => (),
        }
        backslash = false;
    }

    false
}

/// Escapes a value for use inside a JSON string literal.
pub fn json_string(value: &str) -> String {
    // Serializing a string can't fail
    serde_json::to_string(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{
        cql2like, cql2regexp, cql2string, ft_term, has_cql_wildcard, is_postgres_number,
        json_string,
    };

    #[rstest]
    #[case::empty("", "")]
    #[case::quote("'", "''")]
    #[case::plain("a", "a")]
    #[case::star("*", "%")]
    #[case::question_mark("?", "_")]
    #[case::trailing_backslash("\\", "\\\\")]
    #[case::escaped_star("\\*", "\\*")]
    #[case::escaped_question_mark("\\?", "\\?")]
    #[case::escaped_percent("\\%", "\\%")]
    #[case::percent("%", "\\%")]
    #[case::underscore("_", "\\_")]
    #[case::escaped_underscore("\\_", "\\_")]
    #[case::escaped_quote("\\'", "''")]
    #[case::escaped_backslash("\\\\", "\\\\")]
    #[case::escaped_letter("\\x", "x")]
    #[case::mixed("a*b?c%d", "a%b_c\\%d")]
    fn like_patterns(#[case] cql: &str, #[case] expected: &str) {
        assert_eq!(cql2like(cql), expected);
    }

    #[rstest]
    #[case::empty("", Some(""))]
    #[case::quote("'", Some("''"))]
    #[case::two_quotes("''", Some("''''"))]
    #[case::quotes_inside("a''b", Some("a''''b"))]
    #[case::plain("a", Some("a"))]
    #[case::anchor("^", None)]
    #[case::star("*", None)]
    #[case::question_mark("?", None)]
    #[case::trailing_backslash("\\", None)]
    #[case::escaped_letter("\\x", Some("x"))]
    #[case::escaped_star("\\*", Some("*"))]
    #[case::escaped_question_mark("\\?", Some("?"))]
    #[case::escaped_quote("\\'", Some("''"))]
    #[case::escaped_backslash("\\\\", Some("\\"))]
    fn plain_strings(#[case] cql: &str, #[case] expected: Option<&str>) {
        assert_eq!(cql2string(cql).ok().as_deref(), expected);
    }

    #[rstest]
    #[case::empty("", "")]
    #[case::quote("'", "''")]
    #[case::plain("a", "a")]
    #[case::star("*", ".*")]
    #[case::question_mark("?", ".")]
    #[case::anchor("^", "(^|$)")]
    #[case::trailing_backslash("\\", "\\\\")]
    #[case::escaped_star("\\*", "\\*")]
    #[case::escaped_question_mark("\\?", "\\?")]
    #[case::escaped_anchor("\\^", "\\^")]
    #[case::escaped_percent("\\%", "%")]
    #[case::escaped_underscore("\\_", "_")]
    #[case::open_parenthesis("(", "\\(")]
    #[case::escaped_open_parenthesis("\\(", "\\(")]
    #[case::close_parenthesis(")", "\\)")]
    #[case::open_brace("{", "\\{")]
    #[case::close_brace("}", "\\}")]
    #[case::open_bracket("[", "\\[")]
    #[case::escaped_close_bracket("\\]", "\\]")]
    #[case::dollar("$", "\\$")]
    #[case::dot(".", "\\.")]
    #[case::plus("+", "\\+")]
    #[case::escaped_quote("\\'", "''")]
    #[case::escaped_backslash("\\\\", "\\\\")]
    fn regular_expressions(#[case] cql: &str, #[case] expected: &str) {
        assert_eq!(cql2regexp(cql), expected);
    }

    #[rstest]
    #[case::plain("abc", Some("abc"))]
    #[case::trimmed("  abc ", Some("abc"))]
    #[case::right_truncation("abc*", Some("abc:*"))]
    #[case::left_truncation("*abc", None)]
    #[case::inner_star("a*c", None)]
    #[case::question_mark("a?c", None)]
    #[case::anchor("^abc", None)]
    #[case::escaped_star("a\\*c", Some("a\\*c"))]
    #[case::escaped_letter("\\abc", Some("abc"))]
    #[case::trailing_backslash("abc\\", Some("abc"))]
    #[case::specials("a&b|c!d", Some("a\\&b\\|c\\!d"))]
    #[case::colon_and_brackets("(a:b)", Some("\\(a\\:b\\)"))]
    #[case::inner_quote("it's", Some("it''s"))]
    #[case::leading_quote("'abc", Some("abc"))]
    #[case::only_quote("'", Some(""))]
    fn full_text_terms(#[case] word: &str, #[case] expected: Option<&str>) {
        assert_eq!(ft_term(word).ok().as_deref(), expected);
    }

    #[rstest]
    #[case("42")]
    #[case("3.5")]
    #[case("4.")]
    #[case(".001")]
    #[case("5e2")]
    #[case("1.925e-3")]
    #[case("0")]
    #[case("00")]
    #[case("+1")]
    #[case("-0")]
    #[case("0099")]
    #[case("123.456e789")]
    #[case("-123.456e-789")]
    #[case("+123.456e+789")]
    fn postgres_numbers(#[case] value: &str) {
        assert!(is_postgres_number(value));
    }

    #[rstest]
    #[case("")]
    #[case("e")]
    #[case(".")]
    #[case(".e2")]
    #[case("1e2e")]
    #[case("1e")]
    #[case("12 OR 1=1")]
    #[case("0x1F")]
    fn not_postgres_numbers(#[case] value: &str) {
        assert!(!is_postgres_number(value));
    }

    #[rstest]
    #[case::none("abc", false)]
    #[case::star("ab*", true)]
    #[case::question_mark("a?c", true)]
    #[case::escaped("a\\*\\?", false)]
    #[case::escaped_backslash("a\\\\*", true)]
    fn wildcards(#[case] value: &str, #[case] expected: bool) {
        assert_eq!(has_cql_wildcard(value), expected);
    }

    #[test]
    fn json_strings() {
        assert_eq!(json_string("primary"), "\"primary\"");
        assert_eq!(json_string("a\"b\\c"), "\"a\\\"b\\\\c\"");
    }
}
