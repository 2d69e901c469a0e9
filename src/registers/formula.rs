//! Formula evaluation for register scaling
//!
//! Register definitions downloaded from the platform carry their scaling as
//! arithmetic formula strings with `#` standing for the operand: `"#/2"`,
//! `"#*2"`, `"#+30"`. The strings come from vendor-maintained register maps,
//! so they are evaluated against a closed grammar (numbers, `#`, `+ - * /`,
//! unary minus, parentheses) rather than handed to anything that can execute
//! code. `""`, `"x"` and `"#"` mean the value passes through unchanged.

use thiserror::Error;
use tracing::warn;

/// Maximum parenthesis nesting accepted in a formula
const MAX_DEPTH: u32 = 64;

/// Failures while evaluating a register formula
///
/// These never escape a decode or encode pass: a register with a broken
/// formula keeps its raw value and the failure is logged.
#[derive(Error, Debug, PartialEq)]
pub enum FormulaError {
    /// Character the grammar does not know
    #[error("unexpected character '{0}' in formula")]
    UnexpectedChar(char),

    /// Token sequence the grammar cannot parse
    #[error("parse error in formula: {0}")]
    Parse(String),

    /// Parenthesis nesting beyond [`MAX_DEPTH`]
    #[error("formula nesting too deep")]
    TooDeep,

    /// Division by zero and the like
    #[error("formula result is not finite")]
    NonFinite,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Placeholder,
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

fn tokenize(formula: &str) -> Result<Vec<Token>, FormulaError> {
    let mut tokens = Vec::new();
    let mut chars = formula.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' => {
                chars.next();
            }
            '#' => {
                chars.next();
                tokens.push(Token::Placeholder);
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '/' => {
                chars.next();
                tokens.push(Token::Slash);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '0'..='9' | '.' => {
                let mut literal = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        literal.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let number = literal
                    .parse::<f64>()
                    .map_err(|_| FormulaError::Parse(format!("bad number '{literal}'")))?;
                tokens.push(Token::Number(number));
            }
            other => return Err(FormulaError::UnexpectedChar(other)),
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    value: f64,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expr(&mut self, depth: u32) -> Result<f64, FormulaError> {
        let mut left = self.term(depth)?;
        while let Some(op) = self.peek() {
            match op {
                Token::Plus => {
                    self.next();
                    left += self.term(depth)?;
                }
                Token::Minus => {
                    self.next();
                    left -= self.term(depth)?;
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn term(&mut self, depth: u32) -> Result<f64, FormulaError> {
        let mut left = self.unary(depth)?;
        while let Some(op) = self.peek() {
            match op {
                Token::Star => {
                    self.next();
                    left *= self.unary(depth)?;
                }
                Token::Slash => {
                    self.next();
                    left /= self.unary(depth)?;
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn unary(&mut self, depth: u32) -> Result<f64, FormulaError> {
        if depth > MAX_DEPTH {
            return Err(FormulaError::TooDeep);
        }
        if self.peek() == Some(Token::Minus) {
            self.next();
            return Ok(-self.unary(depth + 1)?);
        }
        self.primary(depth)
    }

    fn primary(&mut self, depth: u32) -> Result<f64, FormulaError> {
        if depth > MAX_DEPTH {
            return Err(FormulaError::TooDeep);
        }

        match self.next() {
            Some(Token::Number(n)) => Ok(n),
            Some(Token::Placeholder) => Ok(self.value),
            Some(Token::LParen) => {
                let inner = self.expr(depth + 1)?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(FormulaError::Parse("missing closing parenthesis".into())),
                }
            }
            other => Err(FormulaError::Parse(format!("unexpected token {other:?}"))),
        }
    }
}

/// Whether a formula string means "no transformation"
pub fn is_identity(formula: Option<&str>) -> bool {
    match formula {
        None => true,
        Some(f) => {
            let trimmed = f.trim();
            trimmed.is_empty() || trimmed == "x" || trimmed == "#"
        }
    }
}

/// Evaluate a formula with `#` bound to `value`
///
/// Strict variant: parse and arithmetic failures are returned to the caller.
pub fn evaluate(formula: &str, value: f64) -> Result<f64, FormulaError> {
    let tokens = tokenize(formula)?;
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        value,
    };
    let result = parser.expr(0)?;
    if parser.pos != tokens.len() {
        return Err(FormulaError::Parse("trailing tokens".into()));
    }
    if !result.is_finite() {
        return Err(FormulaError::NonFinite);
    }
    Ok(result)
}

/// Apply a register formula to a value, passing through on failure
///
/// Identity markers return the value as-is. A formula that fails to parse or
/// evaluate logs a warning and also returns the value as-is, so one broken
/// register definition cannot take down a whole decode pass.
pub fn apply(formula: Option<&str>, value: f64) -> f64 {
    if is_identity(formula) {
        return value;
    }
    let formula = formula.unwrap_or_default();

    match evaluate(formula, value) {
        Ok(result) => result,
        Err(e) => {
            warn!("Formula {formula:?} failed for value {value}: {e}");
            value
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_markers() {
        assert!(is_identity(None));
        assert!(is_identity(Some("")));
        assert!(is_identity(Some("  ")));
        assert!(is_identity(Some("x")));
        assert!(is_identity(Some("#")));
        assert!(!is_identity(Some("#/2")));

        assert_eq!(apply(None, 42.0), 42.0);
        assert_eq!(apply(Some("x"), 42.0), 42.0);
        assert_eq!(apply(Some("#"), 42.0), 42.0);
    }

    #[test]
    fn test_vendor_formulas() {
        // the shapes that actually occur in register maps
        assert_eq!(evaluate("#/2", 140.0).unwrap(), 70.0);
        assert_eq!(evaluate("#*2", 21.0).unwrap(), 42.0);
        assert_eq!(evaluate("#+30", 12.0).unwrap(), 42.0);
        assert_eq!(evaluate("#-30", 72.0).unwrap(), 42.0);
        assert_eq!(evaluate("#/10", 215.0).unwrap(), 21.5);
    }

    #[test]
    fn test_operator_precedence_and_parens() {
        assert_eq!(evaluate("#+2*3", 1.0).unwrap(), 7.0);
        assert_eq!(evaluate("(#+2)*3", 1.0).unwrap(), 9.0);
        assert_eq!(evaluate("#*2+30", 5.0).unwrap(), 40.0);
        assert_eq!(evaluate("100-#/2", 40.0).unwrap(), 80.0);
    }

    #[test]
    fn test_unary_minus_and_repeated_placeholder() {
        assert_eq!(evaluate("-#", 5.0).unwrap(), -5.0);
        assert_eq!(evaluate("--#", 5.0).unwrap(), 5.0);
        assert_eq!(evaluate("#+#", 5.0).unwrap(), 10.0);
        assert_eq!(evaluate("#*#", 3.0).unwrap(), 9.0);
        assert_eq!(evaluate("#--2", 5.0).unwrap(), 7.0);
    }

    #[test]
    fn test_fractional_literals() {
        assert_eq!(evaluate("#*0.5", 10.0).unwrap(), 5.0);
        assert_eq!(evaluate("#*.5", 10.0).unwrap(), 5.0);
    }

    #[test]
    fn test_rejects_anything_that_is_not_arithmetic() {
        assert_eq!(
            evaluate("alert(1)", 0.0),
            Err(FormulaError::UnexpectedChar('a'))
        );
        assert_eq!(
            evaluate("#;#", 0.0),
            Err(FormulaError::UnexpectedChar(';'))
        );
        assert!(matches!(evaluate("#+", 0.0), Err(FormulaError::Parse(_))));
        assert!(matches!(evaluate("(#", 0.0), Err(FormulaError::Parse(_))));
        assert!(matches!(evaluate("# 2", 0.0), Err(FormulaError::Parse(_))));
        assert!(matches!(evaluate("", 0.0), Err(FormulaError::Parse(_))));
    }

    #[test]
    fn test_non_finite_results_are_errors() {
        assert_eq!(evaluate("#/0", 1.0), Err(FormulaError::NonFinite));
        assert_eq!(evaluate("1/(#-#)", 1.0), Err(FormulaError::NonFinite));
    }

    #[test]
    fn test_nesting_depth_is_bounded() {
        let deep = format!("{}#{}", "(".repeat(80), ")".repeat(80));
        assert_eq!(evaluate(&deep, 1.0), Err(FormulaError::TooDeep));

        let minus_chain = format!("{}#", "-".repeat(5000));
        assert_eq!(evaluate(&minus_chain, 1.0), Err(FormulaError::TooDeep));

        let fine = format!("{}#{}", "(".repeat(10), ")".repeat(10));
        assert_eq!(evaluate(&fine, 1.0).unwrap(), 1.0);
    }

    #[test]
    fn test_apply_passes_through_on_failure() {
        // broken formulas keep the raw value rather than aborting the decode
        assert_eq!(apply(Some("#/0"), 123.0), 123.0);
        assert_eq!(apply(Some("not math"), 123.0), 123.0);
        assert_eq!(apply(Some("#/2"), 124.0), 62.0);
    }
}
