//! Arithmetic evaluator behind the Yaya `EVAL` built-in.
//!
//! Grammar (precedence climbing):
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := unary (('*' | '/') unary)*
//! unary  := '-' unary | atom
//! atom   := number | '(' expr ')'
//! ```

use crate::error::{ShioriError, ShioriResult};

/// Deepest nesting of parentheses and unary minus `evaluate` accepts.
pub const MAX_DEPTH: usize = 256;

/// True if `input` only uses characters `EVAL` accepts.
pub fn is_arithmetic(input: &str) -> bool {
    !input.trim().is_empty()
        && input
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '*' | '/' | '(' | ')' | '.' | ' '))
}

pub fn evaluate(input: &str) -> ShioriResult<f64> {
    let mut parser = Parser {
        chars: input.chars().collect(),
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    if parser.peek().is_some() {
        return Err(ShioriError::Expression(format!(
            "unexpected '{}' at {}",
            parser.chars[parser.pos], parser.pos
        )));
    }
    Ok(value)
}

/// Integral values print without a fractional part.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl Parser {
    /// Next non-space character, leaving `pos` on it.
    fn peek(&mut self) -> Option<char> {
        while self.chars.get(self.pos) == Some(&' ') {
            self.pos += 1;
        }
        self.chars.get(self.pos).copied()
    }

    fn descend(&mut self) -> ShioriResult<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ShioriError::Expression("expression nested too deeply".to_string()));
        }
        Ok(())
    }

    fn expr(&mut self) -> ShioriResult<f64> {
        let mut value = self.term()?;
        while let Some(op @ ('+' | '-')) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self) -> ShioriResult<f64> {
        let mut value = self.unary()?;
        while let Some(op @ ('*' | '/')) = self.peek() {
            self.pos += 1;
            let rhs = self.unary()?;
            if op == '*' {
                value *= rhs;
            } else {
                if rhs == 0.0 {
                    return Err(ShioriError::Expression("division by zero".to_string()));
                }
                value /= rhs;
            }
        }
        Ok(value)
    }

    fn unary(&mut self) -> ShioriResult<f64> {
        if self.peek() == Some('-') {
            self.pos += 1;
            self.descend()?;
            let value = self.unary()?;
            self.depth -= 1;
            return Ok(-value);
        }
        self.atom()
    }

    fn atom(&mut self) -> ShioriResult<f64> {
        match self.peek() {
            Some('(') => {
                self.pos += 1;
                self.descend()?;
                let value = self.expr()?;
                if self.peek() != Some(')') {
                    return Err(ShioriError::Expression("missing ')'".to_string()));
                }
                self.pos += 1;
                self.depth -= 1;
                Ok(value)
            }
            Some(c) if c.is_ascii_digit() || c == '.' => {
                let start = self.pos;
                while matches!(self.chars.get(self.pos), Some(c) if c.is_ascii_digit() || *c == '.') {
                    self.pos += 1;
                }
                let literal: String = self.chars[start..self.pos].iter().collect();
                literal
                    .parse::<f64>()
                    .map_err(|_| ShioriError::Expression(format!("bad number '{}'", literal)))
            }
            Some(c) => Err(ShioriError::Expression(format!("unexpected '{}' at {}", c, self.pos))),
            None => Err(ShioriError::Expression("unexpected end of expression".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence_and_parens() {
        assert_eq!(evaluate("1 + 2 * 3").unwrap(), 7.0);
        assert_eq!(evaluate("(1 + 2) * 3").unwrap(), 9.0);
        assert_eq!(evaluate("-4 + 10 / 4").unwrap(), -1.5);
        assert_eq!(evaluate("2 - -3").unwrap(), 5.0);
    }

    #[test]
    fn test_errors() {
        assert!(evaluate("1 / 0").is_err());
        assert!(evaluate("(1 + 2").is_err());
        assert!(evaluate("1 2").is_err());
        assert!(evaluate("1..2").is_err());
        assert!(evaluate("").is_err());
    }

    #[test]
    fn test_deep_nesting_is_an_error() {
        let parens = format!("{}1{}", "(".repeat(5_000), ")".repeat(5_000));
        assert!(matches!(evaluate(&parens), Err(ShioriError::Expression(_))));
        assert!(matches!(evaluate(&"(".repeat(200_000)), Err(ShioriError::Expression(_))));

        let negations = format!("{}1", "-".repeat(200_000));
        assert!(matches!(evaluate(&negations), Err(ShioriError::Expression(_))));
    }

    #[test]
    fn test_nesting_within_limit_and_siblings_do_not_accumulate() {
        let nested = format!("{}7{}", "(".repeat(MAX_DEPTH), ")".repeat(MAX_DEPTH));
        assert_eq!(evaluate(&nested).unwrap(), 7.0);

        let siblings = vec!["(1)"; 1_000].join(" + ");
        assert_eq!(evaluate(&siblings).unwrap(), 1_000.0);
        assert_eq!(evaluate("--2").unwrap(), 2.0);
    }

    #[test]
    fn test_charset_and_formatting() {
        assert!(is_arithmetic("12 * (3 - 1)"));
        assert!(!is_arithmetic("alert(1)"));
        assert!(!is_arithmetic("   "));
        assert_eq!(format_number(42.0), "42");
        assert_eq!(format_number(2.5), "2.5");
    }
}
