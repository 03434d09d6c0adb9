//! # ZQL Parser
//!
//! Parses a SQL-like query string into a [`CompiledQuery`].
//!
//! Syntax:
//! ```text
//! SELECT * FROM stream WHERE field > 100 AND field2 = "value" OR field3 != 1 ORDER BY field DESC LIMIT 10, 20
//! ```
//!
//! `SELECT ... FROM` may be omitted, leaving a bare filter such as `name=test`.

use std::fmt;

use super::{CompareOp, CompiledQuery, Condition, Order, Result, ZqlError};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Str(String),
    Num(String),
    Op(CompareOp),
    Star,
    Comma,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Word(w) => write!(f, "{}", w),
            Self::Str(s) => write!(f, "\"{}\"", s),
            Self::Num(n) => write!(f, "{}", n),
            Self::Op(op) => write!(f, "{}", op),
            Self::Star => write!(f, "*"),
            Self::Comma => write!(f, ","),
        }
    }
}

/// Parse a raw query string. The table name is returned unprefixed.
pub fn parse(input: &str) -> Result<CompiledQuery> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ZqlError::Empty);
    }
    Parser { tokens, pos: 0 }.query()
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        match c {
            b' ' | b'\t' | b'\r' | b'\n' => i += 1,
            b'\'' | b'"' => {
                let start = i;
                let mut value = String::new();
                i += 1;
                loop {
                    let Some(ch) = input[i..].chars().next() else {
                        return Err(ZqlError::UnterminatedString(start));
                    };
                    i += ch.len_utf8();
                    if ch == '\\' {
                        if let Some(escaped) = input[i..].chars().next() {
                            value.push(escaped);
                            i += escaped.len_utf8();
                            continue;
                        }
                        return Err(ZqlError::UnterminatedString(start));
                    }
                    if ch as u32 == c as u32 {
                        break;
                    }
                    value.push(ch);
                }
                tokens.push(Token::Str(value));
            }
            b'*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            b',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            b'=' | b'!' | b'<' | b'>' => {
                let next = bytes.get(i + 1).copied();
                let (op, len) = match (c, next) {
                    (b'=', Some(b'=')) => (CompareOp::Eq, 2),
                    (b'=', _) => (CompareOp::Eq, 1),
                    (b'!', Some(b'=')) => (CompareOp::Neq, 2),
                    (b'<', Some(b'>')) => (CompareOp::Neq, 2),
                    (b'<', Some(b'=')) => (CompareOp::Lte, 2),
                    (b'<', _) => (CompareOp::Lt, 1),
                    (b'>', Some(b'=')) => (CompareOp::Gte, 2),
                    (b'>', _) => (CompareOp::Gt, 1),
                    _ => return Err(ZqlError::UnexpectedChar { ch: '!', pos: i }),
                };
                tokens.push(Token::Op(op));
                i += len;
            }
            b'0'..=b'9' | b'-' => {
                let start = i;
                i += 1;
                while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                    i += 1;
                }
                if c == b'-' && i == start + 1 {
                    return Err(ZqlError::UnexpectedChar { ch: '-', pos: start });
                }
                tokens.push(Token::Num(input[start..i].to_string()));
            }
            _ if is_ident_start(c) => {
                let start = i;
                while i < bytes.len()
                    && (is_ident_start(bytes[i]) || bytes[i].is_ascii_digit() || bytes[i] == b'.')
                {
                    i += 1;
                }
                tokens.push(Token::Word(input[start..i].to_string()));
            }
            _ => {
                let ch = input[i..].chars().next().unwrap_or('?');
                return Err(ZqlError::UnexpectedChar { ch, pos: i });
            }
        }
    }

    Ok(tokens)
}

/// Letters, `_`, and any non-ASCII byte (so UTF-8 field names lex whole).
fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b >= 0x80
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn query(mut self) -> Result<CompiledQuery> {
        let mut query = CompiledQuery {
            table: String::new(),
            fields: Vec::new(),
            filter: Vec::new(),
            order: None,
            limit: None,
            offset: None,
        };

        if self.eat_keyword("SELECT") {
            query.fields = self.select_list()?;
            self.expect_keyword("FROM")?;
            query.table = self.identifier("table name")?;
            if self.eat_keyword("WHERE") {
                query.filter = self.filter()?;
            }
        } else {
            self.eat_keyword("WHERE");
            if !self.at_clause_end() {
                query.filter = self.filter()?;
            }
        }

        if self.eat_keyword("ORDER") {
            self.expect_keyword("BY")?;
            let field = self.identifier("ORDER BY field")?;
            let descending = if self.eat_keyword("DESC") {
                true
            } else {
                self.eat_keyword("ASC");
                false
            };
            query.order = Some(Order { field, descending });
        }

        if self.eat_keyword("LIMIT") {
            let first = self.count("LIMIT")?;
            if self.peek() == Some(&Token::Comma) {
                self.pos += 1;
                query.offset = Some(first);
                query.limit = Some(self.count("LIMIT")?);
            } else {
                query.limit = Some(first);
            }
        }

        if self.eat_keyword("OFFSET") {
            query.offset = Some(self.count("OFFSET")?);
        }

        if let Some(tok) = self.peek() {
            return Err(ZqlError::Syntax(format!(
                "unexpected '{}' after end of query",
                tok
            )));
        }

        Ok(query)
    }

    fn select_list(&mut self) -> Result<Vec<String>> {
        if self.peek() == Some(&Token::Star) {
            self.pos += 1;
            return Ok(Vec::new());
        }
        let mut fields = vec![self.identifier("field name")?];
        while self.peek() == Some(&Token::Comma) {
            self.pos += 1;
            fields.push(self.identifier("field name")?);
        }
        Ok(fields)
    }

    /// `cond {AND cond} {OR cond {AND cond}}` — AND binds tighter than OR.
    fn filter(&mut self) -> Result<Vec<Vec<Condition>>> {
        let mut groups = Vec::new();
        let mut group = vec![self.condition()?];
        loop {
            if self.eat_keyword("AND") {
                group.push(self.condition()?);
            } else if self.eat_keyword("OR") {
                groups.push(std::mem::take(&mut group));
                group.push(self.condition()?);
            } else {
                break;
            }
        }
        groups.push(group);
        Ok(groups)
    }

    fn condition(&mut self) -> Result<Condition> {
        let field = self.identifier("field name")?;
        let op = match self.next() {
            Some(Token::Op(op)) => op,
            Some(Token::Word(w)) if w.eq_ignore_ascii_case("CONTAINS") => CompareOp::Contains,
            Some(Token::Word(w)) if w.eq_ignore_ascii_case("STARTSWITH") => CompareOp::StartsWith,
            Some(tok) => {
                return Err(ZqlError::Syntax(format!(
                    "expected operator after '{}', found '{}'",
                    field, tok
                )))
            }
            None => {
                return Err(ZqlError::Syntax(format!(
                    "expected operator after '{}'",
                    field
                )))
            }
        };
        let value = match self.next() {
            Some(Token::Str(s)) => serde_json::Value::String(s),
            Some(Token::Num(n)) => parse_number(&n)?,
            Some(Token::Word(w)) => match w.to_ascii_lowercase().as_str() {
                "true" => serde_json::Value::Bool(true),
                "false" => serde_json::Value::Bool(false),
                "null" => serde_json::Value::Null,
                _ => serde_json::Value::String(w),
            },
            Some(tok) => {
                return Err(ZqlError::Syntax(format!(
                    "expected value for '{}', found '{}'",
                    field, tok
                )))
            }
            None => {
                return Err(ZqlError::Syntax(format!(
                    "expected value for '{}'",
                    field
                )))
            }
        };
        Ok(Condition { field, op, value })
    }

    fn count(&mut self, clause: &str) -> Result<u64> {
        match self.next() {
            Some(Token::Num(n)) => n.parse::<u64>().map_err(|_| {
                ZqlError::Syntax(format!(
                    "{} expects a non-negative integer, found '{}'",
                    clause, n
                ))
            }),
            other => Err(ZqlError::Syntax(format!(
                "{} expects a non-negative integer, found '{}'",
                clause,
                other.map(|t| t.to_string()).unwrap_or_default()
            ))),
        }
    }

    fn identifier(&mut self, what: &str) -> Result<String> {
        match self.next() {
            Some(Token::Word(w)) => Ok(w),
            Some(tok) => Err(ZqlError::Syntax(format!(
                "expected {}, found '{}'",
                what, tok
            ))),
            None => Err(ZqlError::Syntax(format!("expected {}", what))),
        }
    }

    fn at_clause_end(&self) -> bool {
        match self.peek() {
            None => true,
            Some(Token::Word(w)) => ["ORDER", "LIMIT", "OFFSET"]
                .iter()
                .any(|kw| w.eq_ignore_ascii_case(kw)),
            Some(_) => false,
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        match self.peek() {
            Some(Token::Word(w)) if w.eq_ignore_ascii_case(keyword) => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(ZqlError::Syntax(format!("expected {}", keyword)))
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }
}

fn parse_number(s: &str) -> Result<serde_json::Value> {
    if let Ok(n) = s.parse::<i64>() {
        return Ok(serde_json::Value::Number(n.into()));
    }
    s.parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(serde_json::Value::Number)
        .ok_or_else(|| ZqlError::Syntax(format!("invalid number '{}'", s)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_simple_query() {
        let q = parse("SELECT * FROM orders WHERE amount > 100 LIMIT 50").unwrap();
        assert_eq!(q.table, "orders");
        assert!(q.fields.is_empty());
        assert_eq!(q.filter.len(), 1);
        assert_eq!(q.filter[0][0].field, "amount");
        assert_eq!(q.filter[0][0].op, CompareOp::Gt);
        assert_eq!(q.filter[0][0].value, json!(100));
        assert_eq!(q.limit, Some(50));
    }

    #[test]
    fn test_bare_filter() {
        let q = parse("name=test").unwrap();
        assert_eq!(q.table, "");
        assert_eq!(
            q.filter,
            vec![vec![Condition {
                field: "name".into(),
                op: CompareOp::Eq,
                value: json!("test"),
            }]]
        );
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let q = parse("select a, b from t where a = 1 and b = 2 or c != 'x'").unwrap();
        assert_eq!(q.fields, vec!["a", "b"]);
        assert_eq!(q.filter.len(), 2);
        assert_eq!(q.filter[0].len(), 2);
        assert_eq!(q.filter[1][0].op, CompareOp::Neq);
        assert_eq!(q.filter[1][0].value, json!("x"));
    }

    #[test]
    fn test_order_and_mysql_style_limit() {
        let q = parse("SELECT * FROM t ORDER BY age DESC LIMIT 20, 10").unwrap();
        assert_eq!(
            q.order,
            Some(Order {
                field: "age".into(),
                descending: true
            })
        );
        assert_eq!(q.offset, Some(20));
        assert_eq!(q.limit, Some(10));
    }

    #[test]
    fn test_word_operators_and_literals() {
        let q = parse(
            "SELECT * FROM events WHERE path STARTSWITH \"/api\" AND msg CONTAINS 'it\\'s' AND ok = true AND gone = NULL AND ratio <= -0.5",
        )
        .unwrap();
        let conds = &q.filter[0];
        assert_eq!(conds[0].op, CompareOp::StartsWith);
        assert_eq!(conds[1].op, CompareOp::Contains);
        assert_eq!(conds[1].value, json!("it's"));
        assert_eq!(conds[2].value, json!(true));
        assert_eq!(conds[3].value, serde_json::Value::Null);
        assert_eq!(conds[4].value, json!(-0.5));
    }

    #[test]
    fn test_unterminated_string() {
        assert_eq!(
            parse("name = 'abc").unwrap_err(),
            ZqlError::UnterminatedString(7)
        );
    }

    #[test]
    fn test_missing_value() {
        let err = parse("SELECT * FROM t WHERE a =").unwrap_err();
        assert_eq!(err.to_string(), "syntax error: expected value for 'a'");
    }

    #[test]
    fn test_trailing_input_rejected() {
        assert!(matches!(
            parse("SELECT * FROM t LIMIT 5 garbage"),
            Err(ZqlError::Syntax(_))
        ));
    }

    #[test]
    fn test_errors_show_operator_symbols() {
        let err = parse("SELECT * FROM t LIMIT 5 >= 3").unwrap_err();
        assert_eq!(
            err.to_string(),
            "syntax error: unexpected '>=' after end of query"
        );

        let err = parse("a != != 1").unwrap_err();
        assert_eq!(
            err.to_string(),
            "syntax error: expected value for 'a', found '!='"
        );
    }

    #[test]
    fn test_unexpected_character() {
        assert_eq!(
            parse("a = 1 ; drop").unwrap_err(),
            ZqlError::UnexpectedChar { ch: ';', pos: 6 }
        );
    }

    #[test]
    fn test_utf8_field_names() {
        let q = parse("SELECT * FROM 日志 WHERE 级别 = '错误'").unwrap();
        assert_eq!(q.table, "日志");
        assert_eq!(q.filter[0][0].field, "级别");
        assert_eq!(q.filter[0][0].value, json!("错误"));
    }

    #[test]
    fn test_negative_limit_rejected() {
        assert!(parse("SELECT * FROM t LIMIT -1").is_err());
    }
}
