//! Recursive-descent parser for rule conditions
//!
//! ```text
//! condition  := or_expr
//! or_expr    := and_expr ( "OR" and_expr )*
//! and_expr   := primary ( "AND" primary )*
//! primary    := "(" or_expr ")" | comparison
//! comparison := field "BETWEEN" number "AND" number
//!             | field comparator literal
//! ```
//!
//! `BETWEEN` consumes its own `AND`, so the range is always a single node
//! and never leaks into the conjunction level.

use super::lexer::{tokenize, Spanned, Token};
use super::{Comparator, Condition, ConditionError, Field, Literal};

/// Maximum parenthesis nesting
const MAX_DEPTH: usize = 32;

/// Parse condition text into an expression tree
pub fn parse_condition(source: &str) -> Result<Condition, ConditionError> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err(ConditionError::UnexpectedEof);
    }

    let mut parser = ConditionParser::new(&tokens);
    let condition = parser.parse_or()?;

    if let Some(extra) = parser.peek() {
        return Err(ConditionError::Syntax {
            position: extra.offset,
            message: format!("unexpected {} after complete condition", extra.token.describe()),
        });
    }

    Ok(condition)
}

struct ConditionParser<'t> {
    tokens: &'t [Spanned],
    pos: usize,
    depth: usize,
}

impl<'t> ConditionParser<'t> {
    fn new(tokens: &'t [Spanned]) -> Self {
        ConditionParser {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<&'t Spanned> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Result<&'t Spanned, ConditionError> {
        let spanned = self.tokens.get(self.pos).ok_or(ConditionError::UnexpectedEof)?;
        self.pos += 1;
        Ok(spanned)
    }

    fn eat(&mut self, expected: &Token) -> bool {
        match self.peek() {
            Some(spanned) if &spanned.token == expected => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn parse_or(&mut self) -> Result<Condition, ConditionError> {
        let mut terms = vec![self.parse_and()?];
        while self.eat(&Token::Or) {
            terms.push(self.parse_and()?);
        }
        Ok(if terms.len() == 1 {
            terms.remove(0)
        } else {
            Condition::Or(terms)
        })
    }

    fn parse_and(&mut self) -> Result<Condition, ConditionError> {
        let mut terms = vec![self.parse_primary()?];
        while self.eat(&Token::And) {
            terms.push(self.parse_primary()?);
        }
        Ok(if terms.len() == 1 {
            terms.remove(0)
        } else {
            Condition::And(terms)
        })
    }

    fn parse_primary(&mut self) -> Result<Condition, ConditionError> {
        let open = match self.peek() {
            Some(spanned) if spanned.token == Token::LParen => spanned,
            _ => return self.parse_comparison(),
        };
        self.pos += 1;

        if self.depth >= MAX_DEPTH {
            return Err(ConditionError::Syntax {
                position: open.offset,
                message: format!("parentheses nested deeper than {}", MAX_DEPTH),
            });
        }

        self.depth += 1;
        let inner = self.parse_or()?;
        self.depth -= 1;

        let close = self.next()?;
        if close.token != Token::RParen {
            return Err(ConditionError::Syntax {
                position: close.offset,
                message: format!("expected ')' but found {}", close.token.describe()),
            });
        }
        Ok(inner)
    }

    fn parse_comparison(&mut self) -> Result<Condition, ConditionError> {
        let field = self.parse_field()?;
        let op = self.next()?;

        match &op.token {
            Token::Between => {
                let low = self.expect_number(field)?;
                let and = self.next()?;
                if and.token != Token::And {
                    return Err(ConditionError::Syntax {
                        position: and.offset,
                        message: format!(
                            "expected AND in BETWEEN range but found {}",
                            and.token.describe()
                        ),
                    });
                }
                let high = self.expect_number(field)?;
                if !field.is_numeric() {
                    return Err(ConditionError::UnsupportedOperator {
                        field: field.to_string(),
                        operator: "BETWEEN".to_string(),
                    });
                }
                Ok(Condition::Between { field, low, high })
            }
            Token::Op(comparator) => {
                let value = self.parse_literal()?;
                check_comparison(field, *comparator, &value)?;
                Ok(Condition::Comparison {
                    field,
                    op: *comparator,
                    value,
                })
            }
            other => Err(ConditionError::Syntax {
                position: op.offset,
                message: format!(
                    "expected comparator (=, ==, <, <=, >, >=, BETWEEN) after {} but found {}",
                    field,
                    other.describe()
                ),
            }),
        }
    }

    fn parse_field(&mut self) -> Result<Field, ConditionError> {
        let spanned = self.next()?;
        match &spanned.token {
            Token::Ident(name) => Field::from_name(name)
                .ok_or_else(|| ConditionError::UnboundIdentifier { name: name.clone() }),
            other => Err(ConditionError::Syntax {
                position: spanned.offset,
                message: format!("expected time, light or weather but found {}", other.describe()),
            }),
        }
    }

    fn parse_literal(&mut self) -> Result<Literal, ConditionError> {
        let spanned = self.next()?;
        match &spanned.token {
            Token::Number(n) => Ok(Literal::Number(*n)),
            Token::Text(s) => Ok(Literal::Text(s.clone())),
            Token::Ident(name) => Err(ConditionError::TypeMismatch {
                field: "comparison".to_string(),
                found: format!("identifier '{}' (only literals are allowed on the right)", name),
            }),
            other => Err(ConditionError::Syntax {
                position: spanned.offset,
                message: format!("expected number or string but found {}", other.describe()),
            }),
        }
    }

    fn expect_number(&mut self, field: Field) -> Result<f64, ConditionError> {
        let spanned = self.next()?;
        match &spanned.token {
            Token::Number(n) => Ok(*n),
            Token::Text(_) => Err(ConditionError::TypeMismatch {
                field: field.to_string(),
                found: "a string range bound".to_string(),
            }),
            other => Err(ConditionError::Syntax {
                position: spanned.offset,
                message: format!("expected number in BETWEEN range but found {}", other.describe()),
            }),
        }
    }
}

fn check_comparison(field: Field, op: Comparator, value: &Literal) -> Result<(), ConditionError> {
    match (field.is_numeric(), value) {
        (true, Literal::Number(_)) => Ok(()),
        (true, Literal::Text(_)) => Err(ConditionError::TypeMismatch {
            field: field.to_string(),
            found: "a string".to_string(),
        }),
        (false, Literal::Number(_)) => Err(ConditionError::TypeMismatch {
            field: field.to_string(),
            found: "a number".to_string(),
        }),
        (false, Literal::Text(_)) if op == Comparator::Eq => Ok(()),
        (false, Literal::Text(_)) => Err(ConditionError::UnsupportedOperator {
            field: field.to_string(),
            operator: op.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_between_is_single_node() {
        let cond = parse_condition("time BETWEEN 6 AND 18").unwrap();
        assert_eq!(
            cond,
            Condition::Between {
                field: Field::Time,
                low: 6.0,
                high: 18.0
            }
        );
    }

    #[test]
    fn test_parse_between_or() {
        let cond = parse_condition("time BETWEEN 6 AND 18 OR weather = \"rainy\"").unwrap();
        assert_eq!(
            cond,
            Condition::Or(vec![
                Condition::Between {
                    field: Field::Time,
                    low: 6.0,
                    high: 18.0
                },
                Condition::Comparison {
                    field: Field::Weather,
                    op: Comparator::Eq,
                    value: Literal::Text("rainy".to_string()),
                },
            ])
        );
    }

    #[test]
    fn test_parse_between_and_chain() {
        let cond = parse_condition("time BETWEEN 6 AND 18 AND light BETWEEN 0 AND 0.5").unwrap();
        match cond {
            Condition::And(children) => {
                assert_eq!(children.len(), 2);
                assert!(children
                    .iter()
                    .all(|c| matches!(c, Condition::Between { .. })));
            }
            other => panic!("expected And, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_precedence() {
        let cond = parse_condition("light < 0.3 AND time > 20 OR weather = 'rainy'").unwrap();
        match cond {
            Condition::Or(children) => {
                assert!(matches!(children[0], Condition::And(_)));
                assert!(matches!(children[1], Condition::Comparison { .. }));
            }
            other => panic!("expected Or, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_operator() {
        assert!(matches!(
            parse_condition("time >>> 5"),
            Err(ConditionError::Syntax { position: 6, .. })
        ));
    }

    #[test]
    fn test_empty_and_truncated() {
        assert_eq!(parse_condition(""), Err(ConditionError::UnexpectedEof));
        assert_eq!(parse_condition("   "), Err(ConditionError::UnexpectedEof));
        assert_eq!(parse_condition("time <"), Err(ConditionError::UnexpectedEof));
        assert_eq!(parse_condition("time BETWEEN 6 AND"), Err(ConditionError::UnexpectedEof));
        assert_eq!(parse_condition("light < 0.3 AND"), Err(ConditionError::UnexpectedEof));
    }

    #[test]
    fn test_unbound_identifiers_rejected() {
        assert_eq!(
            parse_condition("humidity > 3"),
            Err(ConditionError::UnboundIdentifier {
                name: "humidity".to_string()
            })
        );
        assert!(matches!(
            parse_condition("__import__('os')"),
            Err(ConditionError::UnboundIdentifier { .. })
        ));
        assert!(matches!(
            parse_condition("time > light"),
            Err(ConditionError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_lowercase_keywords_rejected() {
        assert!(parse_condition("time > 5 and light < 2").is_err());
        assert!(parse_condition("time between 6 AND 18").is_err());
    }

    #[test]
    fn test_type_checks() {
        assert!(matches!(
            parse_condition("weather = 3"),
            Err(ConditionError::TypeMismatch { .. })
        ));
        assert!(matches!(
            parse_condition("time = \"noon\""),
            Err(ConditionError::TypeMismatch { .. })
        ));
        assert!(matches!(
            parse_condition("weather < \"rainy\""),
            Err(ConditionError::UnsupportedOperator { .. })
        ));
        assert!(matches!(
            parse_condition("weather BETWEEN 1 AND 2"),
            Err(ConditionError::UnsupportedOperator { .. })
        ));
        assert!(matches!(
            parse_condition("time BETWEEN 'a' AND 'b'"),
            Err(ConditionError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_between_requires_and() {
        assert!(matches!(
            parse_condition("time BETWEEN 6 OR 18"),
            Err(ConditionError::Syntax { .. })
        ));
    }

    #[test]
    fn test_trailing_tokens_rejected() {
        assert!(matches!(
            parse_condition("time > 5 light < 2"),
            Err(ConditionError::Syntax { position: 9, .. })
        ));
        assert!(parse_condition("time > 5)").is_err());
    }

    #[test]
    fn test_parentheses() {
        assert!(parse_condition("((time > 5))").is_ok());
        assert!(parse_condition("(time > 5").is_err());
        assert!(parse_condition("()").is_err());

        let deep = format!("{}time > 5{}", "(".repeat(40), ")".repeat(40));
        assert!(matches!(
            parse_condition(&deep),
            Err(ConditionError::Syntax { .. })
        ));
    }
}
