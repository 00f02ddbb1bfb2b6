//! Arithmetic expressions for derived event variables.
//!
//! Grammar (lowest to highest precedence): `||`, `&&`, comparisons,
//! `+ -`, `* /`, unary `- !`, atoms (numbers, names, calls, parentheses).
//! Booleans are encoded as 1.0 / 0.0; comparisons involving NaN are false.
//! Built-ins: `abs sqrt log exp cos acos` (one argument), `pow min max` (two).

use nx_core::{Error, Result};

use crate::predicate::Comparison;

#[derive(Debug, Clone)]
enum Node {
    Const(f64),
    Var(usize),
    Neg(Box<Node>),
    Not(Box<Node>),
    Arith(Arith, Box<Node>, Box<Node>),
    Cmp(Comparison, Box<Node>, Box<Node>),
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
    Call(Func, Vec<Node>),
}

#[derive(Debug, Clone, Copy)]
enum Arith {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy)]
enum Func {
    Abs,
    Sqrt,
    Log,
    Exp,
    Cos,
    Acos,
    Pow,
    Min,
    Max,
}

impl Func {
    fn lookup(name: &str) -> Option<(Func, usize)> {
        let f = match name {
            "abs" => (Func::Abs, 1),
            "sqrt" => (Func::Sqrt, 1),
            "log" => (Func::Log, 1),
            "exp" => (Func::Exp, 1),
            "cos" => (Func::Cos, 1),
            "acos" => (Func::Acos, 1),
            "pow" => (Func::Pow, 2),
            "min" => (Func::Min, 2),
            "max" => (Func::Max, 2),
            _ => return None,
        };
        Some(f)
    }
}

/// A parsed expression over named inputs.
#[derive(Debug, Clone)]
pub struct Expression {
    root: Node,
    source: String,
    /// Input names in order of first appearance.
    pub inputs: Vec<String>,
}

impl Expression {
    /// Parse `text`. Syntax errors are [`Error::Config`].
    pub fn parse(text: &str) -> Result<Self> {
        let tokens = lex(text)?;
        let mut p = Parser { tokens: &tokens, pos: 0, inputs: Vec::new(), depth: 0 };
        let root = p.or()?;
        if let Some(t) = p.tokens.get(p.pos) {
            return Err(Error::Config(format!("unexpected {t:?} after expression '{text}'")));
        }
        Ok(Self { root, source: text.to_string(), inputs: p.inputs })
    }

    /// Source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate with `values[i]` bound to `inputs[i]`.
    pub fn eval(&self, values: &[f64]) -> f64 {
        eval(&self.root, values)
    }
}

fn truth(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

fn eval(n: &Node, v: &[f64]) -> f64 {
    match n {
        Node::Const(c) => *c,
        Node::Var(i) => v[*i],
        Node::Neg(a) => -eval(a, v),
        Node::Not(a) => truth(!(eval(a, v) > 0.0)),
        Node::Arith(op, a, b) => {
            let (x, y) = (eval(a, v), eval(b, v));
            match op {
                Arith::Add => x + y,
                Arith::Sub => x - y,
                Arith::Mul => x * y,
                Arith::Div => x / y,
            }
        }
        Node::Cmp(op, a, b) => truth(op.holds(eval(a, v), eval(b, v))),
        Node::And(a, b) => truth(eval(a, v) > 0.0 && eval(b, v) > 0.0),
        Node::Or(a, b) => truth(eval(a, v) > 0.0 || eval(b, v) > 0.0),
        Node::Call(f, args) => {
            let x = eval(&args[0], v);
            match f {
                Func::Abs => x.abs(),
                Func::Sqrt => x.sqrt(),
                Func::Log => x.ln(),
                Func::Exp => x.exp(),
                Func::Cos => x.cos(),
                Func::Acos => x.acos(),
                Func::Pow => x.powf(eval(&args[1], v)),
                Func::Min => x.min(eval(&args[1], v)),
                Func::Max => x.max(eval(&args[1], v)),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Num(f64),
    Name(String),
    Op(&'static str),
    Open,
    Close,
    Comma,
}

const OPERATORS: [&str; 15] =
    ["&&", "||", "==", "!=", "<=", ">=", "<", ">", "!", "+", "-", "*", "/", "(", ")"];

fn lex(text: &str) -> Result<Vec<Tok>> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }
        if c.is_ascii_digit() || c == b'.' {
            let start = i;
            while i < bytes.len() {
                let d = bytes[i];
                let exp_sign = (d == b'+' || d == b'-') && matches!(bytes[i - 1], b'e' | b'E');
                if d.is_ascii_digit() || d == b'.' || d == b'e' || d == b'E' || exp_sign {
                    i += 1;
                } else {
                    break;
                }
            }
            let s = &text[start..i];
            let n = s.parse().map_err(|_| Error::Config(format!("invalid number '{s}' in '{text}'")))?;
            out.push(Tok::Num(n));
            continue;
        }
        if c.is_ascii_alphabetic() || c == b'_' {
            let start = i;
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            out.push(Tok::Name(text[start..i].to_string()));
            continue;
        }
        if c == b',' {
            out.push(Tok::Comma);
            i += 1;
            continue;
        }
        let Some(op) = OPERATORS.iter().find(|op| text[i..].starts_with(**op)) else {
            return Err(Error::Config(format!(
                "unexpected character '{}' in '{text}'",
                text[i..].chars().next().unwrap_or('?')
            )));
        };
        out.push(match *op {
            "(" => Tok::Open,
            ")" => Tok::Close,
            other => Tok::Op(other),
        });
        i += op.len();
    }
    Ok(out)
}

/// Maximum nesting of parentheses, calls and unary operators.
const MAX_DEPTH: usize = 128;

struct Parser<'a> {
    tokens: &'a [Tok],
    pos: usize,
    inputs: Vec<String>,
    depth: usize,
}

impl Parser<'_> {
    fn peek_op(&self) -> Option<&'static str> {
        match self.tokens.get(self.pos) {
            Some(Tok::Op(op)) => Some(*op),
            _ => None,
        }
    }

    fn next(&mut self) -> Option<Tok> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn expect(&mut self, want: Tok) -> Result<()> {
        match self.next() {
            Some(t) if t == want => Ok(()),
            other => Err(Error::Config(format!("expected {want:?}, got {other:?}"))),
        }
    }

    fn input(&mut self, name: String) -> usize {
        match self.inputs.iter().position(|n| *n == name) {
            Some(i) => i,
            None => {
                self.inputs.push(name);
                self.inputs.len() - 1
            }
        }
    }

    fn or(&mut self) -> Result<Node> {
        let mut lhs = self.and()?;
        while self.peek_op() == Some("||") {
            self.pos += 1;
            lhs = Node::Or(Box::new(lhs), Box::new(self.and()?));
        }
        Ok(lhs)
    }

    fn and(&mut self) -> Result<Node> {
        let mut lhs = self.cmp()?;
        while self.peek_op() == Some("&&") {
            self.pos += 1;
            lhs = Node::And(Box::new(lhs), Box::new(self.cmp()?));
        }
        Ok(lhs)
    }

    fn cmp(&mut self) -> Result<Node> {
        let lhs = self.sum()?;
        let Some(op) = self.peek_op().and_then(|s| s.parse::<Comparison>().ok()) else {
            return Ok(lhs);
        };
        self.pos += 1;
        Ok(Node::Cmp(op, Box::new(lhs), Box::new(self.sum()?)))
    }

    fn sum(&mut self) -> Result<Node> {
        let mut lhs = self.product()?;
        loop {
            let op = match self.peek_op() {
                Some("+") => Arith::Add,
                Some("-") => Arith::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            lhs = Node::Arith(op, Box::new(lhs), Box::new(self.product()?));
        }
    }

    fn product(&mut self) -> Result<Node> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek_op() {
                Some("*") => Arith::Mul,
                Some("/") => Arith::Div,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            lhs = Node::Arith(op, Box::new(lhs), Box::new(self.unary()?));
        }
    }

    // Every nested sub-expression passes through here.
    fn unary(&mut self) -> Result<Node> {
        if self.depth >= MAX_DEPTH {
            return Err(Error::Config(format!("expression nested deeper than {MAX_DEPTH} levels")));
        }
        self.depth += 1;
        let node = self.unary_inner();
        self.depth -= 1;
        node
    }

    fn unary_inner(&mut self) -> Result<Node> {
        match self.peek_op() {
            Some("-") => {
                self.pos += 1;
                Ok(Node::Neg(Box::new(self.unary()?)))
            }
            Some("!") => {
                self.pos += 1;
                Ok(Node::Not(Box::new(self.unary()?)))
            }
            _ => self.atom(),
        }
    }

    fn atom(&mut self) -> Result<Node> {
        match self.next() {
            Some(Tok::Num(n)) => Ok(Node::Const(n)),
            Some(Tok::Open) => {
                let inner = self.or()?;
                self.expect(Tok::Close)?;
                Ok(inner)
            }
            Some(Tok::Name(name)) if self.tokens.get(self.pos) == Some(&Tok::Open) => {
                self.pos += 1;
                let (func, arity) = Func::lookup(&name)
                    .ok_or_else(|| Error::Config(format!("unknown function '{name}'")))?;
                let mut args = vec![self.or()?];
                while self.tokens.get(self.pos) == Some(&Tok::Comma) {
                    self.pos += 1;
                    args.push(self.or()?);
                }
                self.expect(Tok::Close)?;
                if args.len() != arity {
                    return Err(Error::Config(format!(
                        "'{name}' takes {arity} argument(s), got {}",
                        args.len()
                    )));
                }
                Ok(Node::Call(func, args))
            }
            Some(Tok::Name(name)) => Ok(Node::Var(self.input(name))),
            other => Err(Error::Config(format!("expected a number, name or '(', got {other:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval_str(text: &str, values: &[f64]) -> f64 {
        Expression::parse(text).unwrap().eval(values)
    }

    #[test]
    fn precedence() {
        assert_eq!(eval_str("2 + 3 * 4", &[]), 14.0);
        assert_eq!(eval_str("(1 + 2) * (3 + 4)", &[]), 21.0);
        assert_eq!(eval_str("-x + 1", &[5.0]), -4.0);
    }

    #[test]
    fn inputs_in_first_appearance_order() {
        let e = Expression::parse("sqrt(px*px + py*py + pz*pz)").unwrap();
        assert_eq!(e.inputs, vec!["px", "py", "pz"]);
        assert!((e.eval(&[1.0, 2.0, 2.0]) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn comparisons_and_logic() {
        let e = Expression::parse("n_p == 0 && p_mu >= 0.1").unwrap();
        assert_eq!(e.eval(&[0.0, 0.2]), 1.0);
        assert_eq!(e.eval(&[1.0, 0.2]), 0.0);
        assert_eq!(eval_str("!(x > 3)", &[2.0]), 1.0);
        assert_eq!(eval_str("x > 5 || y < 2", &[3.0, 1.0]), 1.0);
    }

    #[test]
    fn nan_comparisons_are_false() {
        assert_eq!(eval_str("x < 1", &[f64::NAN]), 0.0);
        assert_eq!(eval_str("x != 1", &[f64::NAN]), 0.0);
    }

    #[test]
    fn functions() {
        assert_eq!(eval_str("pow(x, 2)", &[3.0]), 9.0);
        assert_eq!(eval_str("max(a, b)", &[3.0, 7.0]), 7.0);
        assert!((eval_str("cos(acos(x))", &[0.25]) - 0.25).abs() < 1e-12);
        assert!((eval_str("1.5e2 + 3.0E-1", &[]) - 150.3).abs() < 1e-10);
    }

    #[test]
    fn deep_nesting_is_rejected() {
        let parens = format!("{}x{}", "(".repeat(5000), ")".repeat(5000));
        let negs = format!("{}x", "-".repeat(5000));
        let calls = format!("{}x{}", "abs(".repeat(5000), ")".repeat(5000));
        for text in [parens, negs, calls] {
            let err = Expression::parse(&text).unwrap_err();
            assert!(err.is_config());
            assert!(err.to_string().contains("nested deeper"), "{err}");
        }
        let ok = format!("{}x{}", "(".repeat(50), ")".repeat(50));
        assert_eq!(Expression::parse(&ok).unwrap().eval(&[2.0]), 2.0);
    }

    #[test]
    fn parse_errors_are_config_errors() {
        for bad in ["1 +", "foo(1)", "pow(1)", "(x", "x $ y", "1 2"] {
            let err = Expression::parse(bad).unwrap_err();
            assert!(err.is_config(), "{bad}: {err}");
        }
    }
}
