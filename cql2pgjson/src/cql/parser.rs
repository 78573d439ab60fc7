// SPDX-License-Identifier: AGPL-3.0-or-later

//! Recursive descent parser for CQL query text.
//!
//! Grammar (CQL 1.2 without prefix assignments and proximity):
//!
//! ```text
//! query         = scoped_clause [ "sortBy" sort_key { sort_key } ] ;
//! scoped_clause = search_clause { boolean search_clause } ;
//! boolean       = "and" | "or" | "not" ;
//! search_clause = "(" scoped_clause ")" | [ index relation ] term ;
//! relation      = comparitor { "/" modifier } ;
//! comparitor    = "=" | "==" | "<>" | "<" | ">" | "<=" | ">=" | word ;
//! modifier      = word [ comparitor term ] ;
//! sort_key      = index { "/" modifier } ;
//! term          = word | quoted ;
//! ```
//!
//! All boolean operators have the same precedence and associate to the left. Backslash escape
//! sequences inside quoted terms are kept as they are, they get interpreted by the SQL escaping
//! functions later on.
use std::iter::Peekable;
use std::str::CharIndices;

use thiserror::Error;

use crate::cql::ast::{
    BooleanOperator, CqlNode, Modifier, Relation, SortKey, TermNode, SERVER_CHOICE,
};

/// Error returned when query text is not valid CQL.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("CQL parse error at position {position}: {message}")]
pub struct ParseError {
    /// Description of what went wrong.
    pub message: String,

    /// Byte offset in the query text.
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq)]
enum TokenType {
    LParen,
    RParen,
    Slash,
    Comparitor(String),
    Word(String),
    Quoted(String),
    Eof,
}

impl TokenType {
    fn describe(&self) -> String {
        match self {
            TokenType::LParen => "'('".into(),
            TokenType::RParen => "')'".into(),
            TokenType::Slash => "'/'".into(),
            TokenType::Comparitor(symbol) => format!("'{symbol}'"),
            TokenType::Word(word) => format!("'{word}'"),
            TokenType::Quoted(value) => format!("\"{value}\""),
            TokenType::Eof => "end of query".into(),
        }
    }
}

#[derive(Debug, Clone)]
struct Token {
    token_type: TokenType,
    position: usize,
}

/// Characters which terminate an unquoted word.
fn is_word_delimiter(ch: char) -> bool {
    ch.is_whitespace() || matches!(ch, '(' | ')' | '=' | '<' | '>' | '"' | '/')
}

fn is_keyword(word: &str) -> bool {
    matches!(
        word.to_lowercase().as_str(),
        "and" | "or" | "not" | "prox" | "sortby"
    )
}

struct Lexer<'a> {
    chars: Peekable<CharIndices<'a>>,
    length: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.char_indices().peekable(),
            length: input.len(),
        }
    }

    fn position(&mut self) -> usize {
        self.chars.peek().map(|(pos, _)| *pos).unwrap_or(self.length)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, ch)| *ch)
    }

    fn advance(&mut self) -> Option<char> {
        self.chars.next().map(|(_, ch)| ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if !ch.is_whitespace() {
                break;
            }
            self.advance();
        }
    }

    fn read_quoted(&mut self, start: usize) -> Result<TokenType, ParseError> {
        // Opening quote
        self.advance();

        let mut value = String::new();
        loop {
            match self.advance() {
                None => {
                    return Err(ParseError {
                        message: "Unterminated quoted term".into(),
                        position: start,
                    })
                }
                Some('"') => break,
                Some('\\') => {
                    // Keep the escape sequence, only make sure an escaped quote does not end the
                    // term
                    value.push('\\');
                    if let Some(ch) = self.advance() {
                        value.push(ch);
                    }
                }
                Some(ch) => value.push(ch),
            }
        }

        Ok(TokenType::Quoted(value))
    }

    fn read_word(&mut self) -> TokenType {
        let mut word = String::new();
        while let Some(ch) = self.peek() {
            if is_word_delimiter(ch) {
                break;
            }
            word.push(ch);
            self.advance();
        }

        TokenType::Word(word)
    }

    fn next_token(&mut self) -> Result<Token, ParseError> {
        self.skip_whitespace();
        let position = self.position();

        let token_type = match self.peek() {
            None => TokenType::Eof,
            Some('(') => {
                self.advance();
                TokenType::LParen
            }
            Some(')') => {
                self.advance();
                TokenType::RParen
            }
            Some('/') => {
                self.advance();
                TokenType::Slash
            }
            Some('=') => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    TokenType::Comparitor("==".into())
                } else {
                    TokenType::Comparitor("=".into())
                }
            }
            Some('<') => {
                self.advance();
                match self.peek() {
                    Some('=') => {
                        self.advance();
                        TokenType::Comparitor("<=".into())
                    }
                    Some('>') => {
                        self.advance();
                        TokenType::Comparitor("<>".into())
                    }
                    _ => TokenType::Comparitor("<".into()),
                }
            }
            Some('>') => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    TokenType::Comparitor(">=".into())
                } else {
                    TokenType::Comparitor(">".into())
                }
            }
            Some('"') => self.read_quoted(position)?,
            Some(_) => self.read_word(),
        };

        Ok(Token {
            token_type,
            position,
        })
    }

    /// Returns all tokens of the input, the last one is always `Eof`.
    fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = token.token_type == TokenType::Eof;
            tokens.push(token);
            if is_eof {
                return Ok(tokens);
            }
        }
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    // The lexer guarantees a trailing `Eof` token and `advance` never moves past it
    fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek(&self) -> &TokenType {
        &self.current().token_type
    }

    fn advance(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn error(&self, message: &str) -> ParseError {
        ParseError {
            message: message.to_string(),
            position: self.current().position,
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        self.error(&format!(
            "Expected {}, found {}",
            expected,
            self.peek().describe()
        ))
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), TokenType::Word(word) if word.eq_ignore_ascii_case(keyword))
    }

    fn parse_query(&mut self) -> Result<CqlNode, ParseError> {
        if *self.peek() == TokenType::Eof {
            return Err(self.error("Empty query"));
        }

        let mut node = self.parse_scoped_clause()?;

        if self.peek_keyword("sortby") {
            self.advance();
            let keys = self.parse_sort_keys()?;
            node = CqlNode::sort(node, keys);
        }

        match self.peek() {
            TokenType::Eof => Ok(node),
            _ => Err(self.unexpected("boolean operator or end of query")),
        }
    }

    fn parse_scoped_clause(&mut self) -> Result<CqlNode, ParseError> {
        let mut left = self.parse_search_clause()?;

        loop {
            let operator = match self.peek() {
                TokenType::Word(word) => match word.to_lowercase().as_str() {
                    "and" => BooleanOperator::And,
                    "or" => BooleanOperator::Or,
                    "not" => BooleanOperator::Not,
                    "prox" => return Err(self.error("Boolean operator 'prox' is not supported")),
                    _ => break,
                },
                _ => break,
            };
            self.advance();

            if *self.peek() == TokenType::Slash {
                return Err(self.error("Boolean modifiers are not supported"));
            }

            let right = self.parse_search_clause()?;
            left = CqlNode::boolean(operator, left, right);
        }

        Ok(left)
    }

    fn parse_search_clause(&mut self) -> Result<CqlNode, ParseError> {
        if *self.peek() == TokenType::LParen {
            self.advance();
            let node = self.parse_scoped_clause()?;
            if *self.peek() != TokenType::RParen {
                return Err(self.unexpected("')'"));
            }
            self.advance();
            return Ok(node);
        }

        let first = self.parse_term()?;

        let base = match self.peek() {
            TokenType::Comparitor(symbol) => symbol.clone(),
            TokenType::Word(word) if !is_keyword(word) => word.clone(),
            // Term without index and relation
            _ => return Ok(CqlNode::term(SERVER_CHOICE, "=", &first)),
        };
        self.advance();

        let modifiers = self.parse_modifiers()?;
        let term = self.parse_term()?;

        Ok(CqlNode::Term(TermNode::new(
            &first,
            Relation { base, modifiers },
            &term,
        )))
    }

    fn parse_term(&mut self) -> Result<String, ParseError> {
        let term = match self.peek() {
            TokenType::Word(word) => word.clone(),
            TokenType::Quoted(value) => value.clone(),
            _ => return Err(self.unexpected("search term")),
        };
        self.advance();

        Ok(term)
    }

    fn parse_modifiers(&mut self) -> Result<Vec<Modifier>, ParseError> {
        let mut modifiers = Vec::new();

        while *self.peek() == TokenType::Slash {
            self.advance();

            let name = match self.peek() {
                TokenType::Word(word) => word.clone(),
                _ => return Err(self.unexpected("modifier name")),
            };
            self.advance();

            let modifier = match self.peek().clone() {
                TokenType::Comparitor(comparison) => {
                    self.advance();
                    let value = self.parse_term()?;
                    Modifier::with_value(&name, &comparison, &value)
                }
                _ => Modifier::new(&name),
            };

            modifiers.push(modifier);
        }

        Ok(modifiers)
    }

    fn parse_sort_keys(&mut self) -> Result<Vec<SortKey>, ParseError> {
        let mut keys = Vec::new();

        loop {
            let index = match self.peek() {
                TokenType::Word(word) => word.clone(),
                TokenType::Quoted(value) => value.clone(),
                _ => break,
            };
            self.advance();

            let modifiers = self.parse_modifiers()?;
            keys.push(SortKey { index, modifiers });
        }

        if keys.is_empty() {
            return Err(self.unexpected("sort index"));
        }

        Ok(keys)
    }
}

/// Parses CQL query text into a query tree.
pub fn parse(input: &str) -> Result<CqlNode, ParseError> {
    let tokens = Lexer::new(input).tokenize()?;
    Parser::new(tokens).parse_query()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use crate::cql::ast::{
        BooleanOperator, CqlNode, Modifier, Relation, SortKey, TermNode, SERVER_CHOICE,
    };

    use super::parse;

    #[rstest]
    #[case::bare_word("cat", CqlNode::term(SERVER_CHOICE, "=", "cat"))]
    #[case::bare_quoted("\"cat dog\"", CqlNode::term(SERVER_CHOICE, "=", "cat dog"))]
    #[case::symbol_relation("title=cat", CqlNode::term("title", "=", "cat"))]
    #[case::exact("title == \"a b\"", CqlNode::term("title", "==", "a b"))]
    #[case::not_equal("title <> x", CqlNode::term("title", "<>", "x"))]
    #[case::less_equal("n <= 5", CqlNode::term("n", "<=", "5"))]
    #[case::greater_equal("n >= 5", CqlNode::term("n", ">=", "5"))]
    #[case::greater("n > 5", CqlNode::term("n", ">", "5"))]
    #[case::named_relation("title any \"a b\"", CqlNode::term("title", "any", "a b"))]
    #[case::dotted_index("a.b.c adj x", CqlNode::term("a.b.c", "adj", "x"))]
    #[case::empty_term("title = \"\"", CqlNode::term("title", "=", ""))]
    #[case::keeps_escapes(r#"title = "a\"b\*""#, CqlNode::term("title", "=", r#"a\"b\*"#))]
    #[case::uuid("id == 11111111-1111-1111-1111-111111111111", CqlNode::term("id", "==", "11111111-1111-1111-1111-111111111111"))]
    fn parse_term_nodes(#[case] query: &str, #[case] expected: CqlNode) {
        assert_eq!(parse(query).unwrap(), expected);
    }

    #[test]
    fn relation_modifiers() {
        let node = parse("tableb.blah ==/number/@type=primary 123452").unwrap();

        assert_eq!(
            node,
            CqlNode::Term(TermNode::new(
                "tableb.blah",
                Relation::new("==")
                    .modifier(Modifier::new("number"))
                    .modifier(Modifier::with_value("@type", "=", "primary")),
                "123452"
            ))
        );
    }

    #[test]
    fn booleans_associate_to_the_left() {
        let node = parse("a=1 or b=2 AND c=3 not d=4").unwrap();

        let expected = CqlNode::boolean(
            BooleanOperator::Not,
            CqlNode::boolean(
                BooleanOperator::And,
                CqlNode::boolean(
                    BooleanOperator::Or,
                    CqlNode::term("a", "=", "1"),
                    CqlNode::term("b", "=", "2"),
                ),
                CqlNode::term("c", "=", "3"),
            ),
            CqlNode::term("d", "=", "4"),
        );

        assert_eq!(node, expected);
    }

    #[test]
    fn parentheses() {
        let node = parse("a=1 and (b=2 or c=3)").unwrap();

        let expected = CqlNode::boolean(
            BooleanOperator::And,
            CqlNode::term("a", "=", "1"),
            CqlNode::boolean(
                BooleanOperator::Or,
                CqlNode::term("b", "=", "2"),
                CqlNode::term("c", "=", "3"),
            ),
        );

        assert_eq!(node, expected);
    }

    #[test]
    fn sort_keys() {
        let node = parse("cql.allRecords=1 sortBy title/sort.descending id").unwrap();

        let expected = CqlNode::sort(
            CqlNode::term("cql.allRecords", "=", "1"),
            vec![
                SortKey::new("title").modifier(Modifier::new("sort.descending")),
                SortKey::new("id"),
            ],
        );

        assert_eq!(node, expected);
    }

    #[rstest]
    #[case::empty("")]
    #[case::whitespace("   ")]
    #[case::unterminated_quote("title = \"abc")]
    #[case::missing_term("title =")]
    #[case::missing_parenthesis("(a=1")]
    #[case::trailing_word("cat dog")]
    #[case::prox("a prox b")]
    #[case::boolean_modifier("a and/rel.algorithm=cql b")]
    #[case::missing_sort_key("a=1 sortBy")]
    #[case::missing_modifier_name("a =/ b")]
    fn invalid_queries(#[case] query: &str) {
        assert!(parse(query).is_err());
    }

    #[test]
    fn error_position() {
        let err = parse("title = \"abc").unwrap_err();
        assert_eq!(err.position, 8);
    }
}
