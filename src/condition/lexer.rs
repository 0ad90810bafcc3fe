//! Condition tokenizer
//!
//! Splits condition text into positioned tokens. Keywords are
//! case-sensitive: `AND`, `OR` and `BETWEEN` are keywords, while `and` is an
//! ordinary identifier and fails later as unbound.

use nom::{
    IResult,
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, digit1, satisfy},
    combinator::{map, not, opt, peek, recognize, value},
    multi::many0,
    sequence::{delimited, pair, tuple},
};

use super::{Comparator, ConditionError};

/// Lexical token
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    Number(f64),
    Text(String),
    Op(Comparator),
    And,
    Or,
    Between,
    LParen,
    RParen,
}

impl Token {
    /// Short description for error messages
    pub fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("identifier '{}'", name),
            Token::Number(n) => format!("number {}", n),
            Token::Text(s) => format!("string \"{}\"", s),
            Token::Op(op) => format!("operator '{}'", op),
            Token::And => "keyword AND".to_string(),
            Token::Or => "keyword OR".to_string(),
            Token::Between => "keyword BETWEEN".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
        }
    }
}

/// A token with its byte offset in the source
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub offset: usize,
    pub token: Token,
}

/// Tokenize a whole condition
pub fn tokenize(source: &str) -> Result<Vec<Spanned>, ConditionError> {
    let mut tokens = Vec::new();
    let mut remaining = source.trim_start();

    while !remaining.is_empty() {
        let offset = source.len() - remaining.len();
        match token(remaining) {
            Ok((rest, token)) => {
                tokens.push(Spanned { offset, token });
                remaining = rest.trim_start();
            }
            Err(_) => {
                let found = remaining.chars().next().unwrap_or(' ');
                let message = if found == '"' || found == '\'' {
                    "unterminated string literal".to_string()
                } else if found.is_ascii_digit() || matches!(found, '-' | '+' | '.') {
                    format!("malformed number near '{}'", snippet(remaining))
                } else {
                    format!("unexpected character '{}'", found)
                };
                return Err(ConditionError::Syntax { position: offset, message });
            }
        }
    }

    Ok(tokens)
}

fn snippet(input: &str) -> &str {
    let end = input
        .char_indices()
        .find(|(_, c)| c.is_whitespace())
        .map(|(i, _)| i)
        .unwrap_or(input.len());
    &input[..end]
}

fn token(input: &str) -> IResult<&str, Token> {
    alt((
        map(string_literal, Token::Text),
        map(numeric_literal, Token::Number),
        map(comparator, Token::Op),
        value(Token::LParen, char('(')),
        value(Token::RParen, char(')')),
        map(word, keyword_or_ident),
    ))(input)
}

fn keyword_or_ident(word: &str) -> Token {
    match word {
        "AND" => Token::And,
        "OR" => Token::Or,
        "BETWEEN" => Token::Between,
        other => Token::Ident(other.to_string()),
    }
}

/// Parse a bare word [A-Za-z_][A-Za-z0-9_]*
fn word(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))(input)
}

/// Parse a comparison operator; two-character forms first
fn comparator(input: &str) -> IResult<&str, Comparator> {
    alt((
        value(Comparator::Eq, tag("==")),
        value(Comparator::Le, tag("<=")),
        value(Comparator::Ge, tag(">=")),
        value(Comparator::Eq, tag("=")),
        value(Comparator::Lt, tag("<")),
        value(Comparator::Gt, tag(">")),
    ))(input)
}

/// Parse a numeric literal: optional sign, digits and/or fraction, optional exponent
fn numeric_literal(input: &str) -> IResult<&str, f64> {
    let (rest, text) = recognize(tuple((
        opt(alt((char('-'), char('+')))),
        alt((
            recognize(pair(digit1, opt(pair(char('.'), digit1)))),
            recognize(pair(char('.'), digit1)),
        )),
        opt(tuple((alt((char('e'), char('E'))), opt(alt((char('+'), char('-')))), digit1))),
    )))(input)?;

    // "6AND" or "1.2.3" is not a number followed by something else
    let (rest, _) = not(peek(satisfy(|c: char| c.is_alphanumeric() || c == '_' || c == '.')))(rest)?;

    match text.parse::<f64>() {
        Ok(n) => Ok((rest, n)),
        Err(_) => Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Float,
        ))),
    }
}

/// Parse a double- or single-quoted string literal
fn string_literal(input: &str) -> IResult<&str, String> {
    alt((quoted('"'), quoted('\'')))(input)
}

/// String body between `quote` characters, with backslash escapes
fn quoted(quote: char) -> impl Fn(&str) -> IResult<&str, String> {
    move |input| {
        map(
            delimited(
                char(quote),
                recognize(many0(alt((
                    recognize(satisfy(move |c| c != quote && c != '\\' && c != '\n')),
                    recognize(pair(char('\\'), satisfy(|c| c != '\n'))),
                )))),
                char(quote),
            ),
            unescape_string,
        )(input)
    }
}

/// Unescape common escape sequences
fn unescape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('t') => result.push('\t'),
                Some('\\') => result.push('\\'),
                Some('"') => result.push('"'),
                Some('\'') => result.push('\''),
                Some(other) => {
                    result.push('\\');
                    result.push(other);
                }
                None => result.push('\\'),
            }
        } else {
            result.push(c);
        }
    }
    result
}
