//! Arithmetic expression evaluator.
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! expr   := term (("+" | "-") term)*
//! term   := unary (("*" | "/" | "//" | "%") unary)*
//! unary  := ("+" | "-") unary | power
//! power  := atom (("**" | "^") unary)?
//! atom   := number | name | name "(" expr ")" | "(" expr ")"
//! ```
//!
//! `-2 ** 2` is `-4` and `2 ** 3 ** 2` is `512`. Nothing outside this
//! grammar is accepted.

use crate::error::CalcError;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    SlashSlash,
    Percent,
    Pow,
    LParen,
    RParen,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Num(n) => write!(f, "{n}"),
            Token::Ident(s) => f.write_str(s),
            Token::Plus => f.write_str("+"),
            Token::Minus => f.write_str("-"),
            Token::Star => f.write_str("*"),
            Token::Slash => f.write_str("/"),
            Token::SlashSlash => f.write_str("//"),
            Token::Percent => f.write_str("%"),
            Token::Pow => f.write_str("**"),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, CalcError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                // Exponent only when digits follow; `2e` lexes as `2` then `e`.
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        i = j;
                        while i < chars.len() && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
                let text: String = chars[start..i].iter().collect();
                let value = text
                    .parse::<f64>()
                    .map_err(|_| CalcError::UnexpectedToken(text.clone()))?;
                tokens.push(Token::Num(value));
            }
            'a'..='z' | 'A'..='Z' | '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                if chars.get(i + 1) == Some(&'*') {
                    tokens.push(Token::Pow);
                    i += 2;
                } else {
                    tokens.push(Token::Star);
                    i += 1;
                }
            }
            '/' => {
                if chars.get(i + 1) == Some(&'/') {
                    tokens.push(Token::SlashSlash);
                    i += 2;
                } else {
                    tokens.push(Token::Slash);
                    i += 1;
                }
            }
            '%' => {
                tokens.push(Token::Percent);
                i += 1;
            }
            '^' => {
                tokens.push(Token::Pow);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            other => return Err(CalcError::UnexpectedChar { ch: other, pos: i }),
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn expect(&mut self, want: Token) -> Result<(), CalcError> {
        match self.next() {
            Some(tok) if tok == want => Ok(()),
            Some(tok) => Err(CalcError::UnexpectedToken(tok.to_string())),
            None => Err(CalcError::UnexpectedEnd),
        }
    }

    fn expr(&mut self) -> Result<f64, CalcError> {
        let mut value = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    value += self.term()?;
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    value -= self.term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn term(&mut self) -> Result<f64, CalcError> {
        let mut value = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(t @ (Token::Star | Token::Slash | Token::SlashSlash | Token::Percent)) => {
                    t.clone()
                }
                _ => return Ok(value),
            };
            self.pos += 1;
            let rhs = self.unary()?;
            value = match op {
                Token::Star => value * rhs,
                Token::Slash => {
                    if rhs == 0.0 {
                        return Err(CalcError::DivisionByZero);
                    }
                    value / rhs
                }
                Token::SlashSlash => {
                    if rhs == 0.0 {
                        return Err(CalcError::DivisionByZero);
                    }
                    (value / rhs).floor()
                }
                _ => {
                    if rhs == 0.0 {
                        return Err(CalcError::DivisionByZero);
                    }
                    // Result takes the sign of the divisor.
                    value - rhs * (value / rhs).floor()
                }
            };
        }
    }

    fn unary(&mut self) -> Result<f64, CalcError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(-self.unary()?)
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<f64, CalcError> {
        let base = self.atom()?;
        if matches!(self.peek(), Some(Token::Pow)) {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<f64, CalcError> {
        match self.next() {
            Some(Token::Num(n)) => Ok(n),
            Some(Token::LParen) => {
                let value = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(value)
            }
            Some(Token::Ident(name)) => {
                if matches!(self.peek(), Some(Token::LParen)) {
                    self.pos += 1;
                    let arg = self.expr()?;
                    self.expect(Token::RParen)?;
                    apply_function(&name, arg)
                } else {
                    constant(&name)
                }
            }
            Some(tok) => Err(CalcError::UnexpectedToken(tok.to_string())),
            None => Err(CalcError::UnexpectedEnd),
        }
    }
}

fn constant(name: &str) -> Result<f64, CalcError> {
    match name {
        "pi" => Ok(std::f64::consts::PI),
        "e" => Ok(std::f64::consts::E),
        _ => Err(CalcError::UnknownName(name.to_string())),
    }
}

fn apply_function(name: &str, arg: f64) -> Result<f64, CalcError> {
    let value = match name {
        "sqrt" => arg.sqrt(),
        "abs" => arg.abs(),
        "ln" => arg.ln(),
        "log10" => arg.log10(),
        "exp" => arg.exp(),
        "sin" => arg.sin(),
        "cos" => arg.cos(),
        "tan" => arg.tan(),
        "floor" => arg.floor(),
        "ceil" => arg.ceil(),
        "round" => arg.round(),
        _ => return Err(CalcError::UnknownName(name.to_string())),
    };
    Ok(value)
}

/// Evaluate an arithmetic expression.
pub fn evaluate(input: &str) -> Result<f64, CalcError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(CalcError::Empty);
    }
    let mut parser = Parser { tokens, pos: 0 };
    let value = parser.expr()?;
    if let Some(tok) = parser.peek() {
        return Err(CalcError::UnexpectedToken(tok.to_string()));
    }
    if !value.is_finite() {
        return Err(CalcError::NotFinite);
    }
    Ok(value)
}

/// Render a result without float noise: integers print without a decimal
/// point, everything else is rounded to 12 decimal places.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }
    if value.abs() < 1e-6 || value.abs() >= 1e15 {
        return format!("{value:e}");
    }
    let fixed = format!("{value:.12}");
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(s: &str) -> f64 {
        evaluate(s).unwrap()
    }

    #[test]
    fn precedence_and_associativity() {
        assert_eq!(eval("2 + 3 * 4"), 14.0);
        assert_eq!(eval("(2 + 3) * 4"), 20.0);
        assert_eq!(eval("10 - 4 - 3"), 3.0);
        assert_eq!(eval("2 ** 3 ** 2"), 512.0);
        assert_eq!(eval("2 ^ 10"), 1024.0);
        assert_eq!(eval("-2 ** 2"), -4.0);
        assert_eq!(eval("2 ** -1"), 0.5);
    }

    #[test]
    fn floor_division_and_modulo_follow_divisor_sign() {
        assert_eq!(eval("7 // 2"), 3.0);
        assert_eq!(eval("-7 // 2"), -4.0);
        assert_eq!(eval("7 % 3"), 1.0);
        assert_eq!(eval("-7 % 3"), 2.0);
        assert_eq!(eval("7 % -3"), -2.0);
    }

    #[test]
    fn functions_and_constants() {
        assert_eq!(eval("sqrt(16)"), 4.0);
        assert_eq!(eval("abs(-3.5)"), 3.5);
        assert!((eval("sin(pi / 2)") - 1.0).abs() < 1e-12);
        assert!((eval("ln(e)") - 1.0).abs() < 1e-12);
        assert!((eval("log10(1000)") - 3.0).abs() < 1e-12);
        assert_eq!(eval("floor(2.7) + ceil(2.1) + round(2.5)"), 8.0);
        assert_eq!(eval("1.5e3 + 2E-1"), 1500.2);
    }

    #[test]
    fn division_by_zero_is_an_error() {
        assert_eq!(evaluate("1 / 0"), Err(CalcError::DivisionByZero));
        assert_eq!(evaluate("1 // (2 - 2)"), Err(CalcError::DivisionByZero));
        assert_eq!(evaluate("5 % 0"), Err(CalcError::DivisionByZero));
    }

    #[test]
    fn rejects_anything_outside_the_grammar() {
        assert_eq!(
            evaluate("__import__(1)"),
            Err(CalcError::UnknownName("__import__".into()))
        );
        assert!(matches!(
            evaluate("open('x')"),
            Err(CalcError::UnexpectedChar { ch: '\'', .. })
        ));
        assert!(matches!(
            evaluate("2; 3"),
            Err(CalcError::UnexpectedChar { ch: ';', pos: 1 })
        ));
        assert_eq!(evaluate("x + 1"), Err(CalcError::UnknownName("x".into())));
        assert_eq!(evaluate(""), Err(CalcError::Empty));
        assert_eq!(evaluate("(1 + 2"), Err(CalcError::UnexpectedEnd));
        assert_eq!(evaluate("1 2"), Err(CalcError::UnexpectedToken("2".into())));
        assert_eq!(evaluate("sqrt(-1)"), Err(CalcError::NotFinite));
    }

    #[test]
    fn formats_results() {
        assert_eq!(format_number(42.0), "42");
        assert_eq!(format_number(0.1 + 0.2), "0.3");
        assert_eq!(format_number(-2.5), "-2.5");
    }
}
