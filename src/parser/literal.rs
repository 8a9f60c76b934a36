//! Parser for list-like fields that were serialized as literals
//!
//! When a nested dataset is flattened into a delimited table, list and object
//! fields end up as their literal representation, e.g.
//!
//! ```text
//! ['CHEMBL1201583', 'CHEMBL1201584']
//! [{'location': 'SL-0086', 'labelSL': 'Cytoplasm'}, {'location': 'SL-0191', 'labelSL': 'Nucleus'}]
//! ```
//!
//! [`parse`] turns such a value back into a [`Value`]. Both single and double
//! quoted strings are accepted, so JSON serialized fields parse as well.
//!
//! # Examples
//!
//! ```
//! use modloc::parser::literal;
//! use serde_json::json;
//!
//! let value = literal::parse("[{'location': 'SL-0086', 'labelSL': None}]").unwrap();
//! assert_eq!(value, json!([{"location": "SL-0086", "labelSL": null}]));
//!
//! assert!(literal::parse("['unterminated").is_err());
//! ```

use serde_json::{Map, Number, Value};

use crate::{ModlocError, ModlocResult};

/// Parses a literal into a [`Value`]
///
/// Supported are lists `[...]`, tuples `(...)`, dicts `{...}`, quoted strings,
/// integers, floats, `None`/`null`, `True`/`False` and `nan` (parsed as null).
///
/// # Errors
///
/// [`ModlocError::MalformedLiteral`] with the full raw value if the input
/// is not a single complete literal
pub fn parse(value: &str) -> ModlocResult<Value> {
    let mut parser = Parser::new(value);
    let parsed = parser
        .complete()
        .map_err(|reason| ModlocError::MalformedLiteral {
            value: value.to_string(),
            reason,
        })?;
    Ok(parsed)
}

type ParseResult<T> = Result<T, String>;

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    /// Parses one value and ensures nothing but whitespace follows
    fn complete(&mut self) -> ParseResult<Value> {
        self.skip_whitespace();
        let value = self.value()?;
        self.skip_whitespace();
        match self.peek() {
            None => Ok(value),
            Some(c) => Err(format!("unexpected '{c}' at position {}", self.pos)),
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn expect(&mut self, expected: char) -> ParseResult<()> {
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(format!(
                "expected '{expected}' but found '{c}' at position {}",
                self.pos - c.len_utf8()
            )),
            None => Err(format!("expected '{expected}' but input ended")),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn value(&mut self) -> ParseResult<Value> {
        match self.peek() {
            Some('[') => self.sequence('[', ']'),
            Some('(') => self.sequence('(', ')'),
            Some('{') => self.dict(),
            Some(quote @ ('\'' | '"')) => self.string(quote).map(Value::String),
            Some(c) if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => self.number(),
            Some(c) if c.is_alphabetic() => self.word(),
            Some(c) => Err(format!("unexpected '{c}' at position {}", self.pos)),
            None => Err("unexpected end of input".to_string()),
        }
    }

    /// Parses `[a, b, ...]` or `(a, b, ...)`, a trailing comma is allowed
    fn sequence(&mut self, open: char, close: char) -> ParseResult<Value> {
        self.expect(open)?;
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek() == Some(close) {
                self.bump();
                break;
            }
            items.push(self.value()?);
            self.skip_whitespace();
            match self.bump() {
                Some(',') => continue,
                Some(c) if c == close => break,
                Some(c) => {
                    return Err(format!(
                        "expected ',' or '{close}' but found '{c}' at position {}",
                        self.pos - c.len_utf8()
                    ))
                }
                None => return Err(format!("missing closing '{close}'")),
            }
        }
        Ok(Value::Array(items))
    }

    fn dict(&mut self) -> ParseResult<Value> {
        self.expect('{')?;
        let mut map = Map::new();
        loop {
            self.skip_whitespace();
            if self.peek() == Some('}') {
                self.bump();
                break;
            }
            let key = match self.value()? {
                Value::String(key) => key,
                Value::Number(n) => n.to_string(),
                other => return Err(format!("invalid dict key {other}")),
            };
            self.skip_whitespace();
            self.expect(':')?;
            self.skip_whitespace();
            let value = self.value()?;
            map.insert(key, value);
            self.skip_whitespace();
            match self.bump() {
                Some(',') => continue,
                Some('}') => break,
                Some(c) => {
                    return Err(format!(
                        "expected ',' or '}}' but found '{c}' at position {}",
                        self.pos - c.len_utf8()
                    ))
                }
                None => return Err("missing closing '}'".to_string()),
            }
        }
        Ok(Value::Object(map))
    }

    fn string(&mut self, quote: char) -> ParseResult<String> {
        let start = self.pos;
        self.expect(quote)?;
        let mut res = String::new();
        loop {
            match self.bump() {
                None => return Err(format!("unterminated string starting at position {start}")),
                Some(c) if c == quote => return Ok(res),
                Some('\\') => self.escape(&mut res)?,
                Some(c) => res.push(c),
            }
        }
    }

    fn escape(&mut self, res: &mut String) -> ParseResult<()> {
        match self.bump() {
            Some('n') => res.push('\n'),
            Some('t') => res.push('\t'),
            Some('r') => res.push('\r'),
            Some('0') => res.push('\0'),
            Some('x') => res.push(self.hex_char(2)?),
            Some('u') => res.push(self.hex_char(4)?),
            Some(c @ ('\\' | '\'' | '"' | '/')) => res.push(c),
            // unknown escapes are kept verbatim
            Some(c) => {
                res.push('\\');
                res.push(c);
            }
            None => return Err("input ends with an escape character".to_string()),
        }
        Ok(())
    }

    fn hex_char(&mut self, digits: usize) -> ParseResult<char> {
        let start = self.pos;
        let end = start + digits;
        let hex = self
            .src
            .get(start..end)
            .ok_or_else(|| format!("truncated escape sequence at position {start}"))?;
        let code = u32::from_str_radix(hex, 16)
            .map_err(|_| format!("invalid escape sequence '{hex}' at position {start}"))?;
        self.pos = end;
        char::from_u32(code).ok_or_else(|| format!("invalid code point {code:#x}"))
    }

    fn number(&mut self) -> ParseResult<Value> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E' | '_'))
        {
            self.bump();
        }
        let raw: String = self.src[start..self.pos].chars().filter(|c| *c != '_').collect();
        if let Ok(int) = raw.parse::<i64>() {
            return Ok(Value::from(int));
        }
        raw.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| format!("invalid number '{raw}' at position {start}"))
    }

    fn word(&mut self) -> ParseResult<Value> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.bump();
        }
        match &self.src[start..self.pos] {
            "None" | "null" | "nan" | "NaN" => Ok(Value::Null),
            "True" | "true" => Ok(Value::Bool(true)),
            "False" | "false" => Ok(Value::Bool(false)),
            other => Err(format!("unknown identifier '{other}' at position {start}")),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_of_strings() {
        assert_eq!(
            parse("['CHEMBL1', \"CHEMBL2\"]").unwrap(),
            json!(["CHEMBL1", "CHEMBL2"])
        );
    }

    #[test]
    fn empty_containers() {
        assert_eq!(parse("[]").unwrap(), json!([]));
        assert_eq!(parse(" ( ) ").unwrap(), json!([]));
        assert_eq!(parse("{}").unwrap(), json!({}));
    }

    #[test]
    fn trailing_comma() {
        assert_eq!(parse("('ENSG1',)").unwrap(), json!(["ENSG1"]));
        assert_eq!(parse("{'a': 1,}").unwrap(), json!({"a": 1}));
    }

    #[test]
    fn list_of_location_dicts() {
        let raw = "[{'location': 'SL-0086', 'source': 'uniprot', 'termSL': 'SL-0086', 'labelSL': 'Cytoplasm'}, {'location': 'Nucleus', 'labelSL': None}]";
        assert_eq!(
            parse(raw).unwrap(),
            json!([
                {"location": "SL-0086", "source": "uniprot", "termSL": "SL-0086", "labelSL": "Cytoplasm"},
                {"location": "Nucleus", "labelSL": null}
            ])
        );
    }

    #[test]
    fn scalars() {
        assert_eq!(parse("None").unwrap(), Value::Null);
        assert_eq!(parse("nan").unwrap(), Value::Null);
        assert_eq!(parse("True").unwrap(), json!(true));
        assert_eq!(parse("false").unwrap(), json!(false));
        assert_eq!(parse("-12").unwrap(), json!(-12));
        assert_eq!(parse("1_000").unwrap(), json!(1000));
        assert_eq!(parse("0.5").unwrap(), json!(0.5));
        assert_eq!(parse("1e-3").unwrap(), json!(0.001));
    }

    #[test]
    fn escapes() {
        assert_eq!(parse(r"'it\'s'").unwrap(), json!("it's"));
        assert_eq!(parse(r#""a\tb\u00e9""#).unwrap(), json!("a\tbé"));
        assert_eq!(parse(r"'C:\d'").unwrap(), json!("C:\\d"));
        assert_eq!(parse(r#"'mixed "quotes"'"#).unwrap(), json!("mixed \"quotes\""));
    }

    #[test]
    fn nested() {
        assert_eq!(
            parse("{'rows': ['ENSG1', 'ENSG2'], 'count': 2}").unwrap(),
            json!({"rows": ["ENSG1", "ENSG2"], "count": 2})
        );
    }

    #[test]
    fn malformed() {
        for raw in [
            "",
            "[",
            "['a' 'b']",
            "['a',",
            "{'a' 1}",
            "{'a': }",
            "'open",
            "['a'] trailing",
            "[undefined]",
            "[1.2.3]",
            r"'\u12'",
        ] {
            match parse(raw) {
                Err(ModlocError::MalformedLiteral { value, .. }) => assert_eq!(value, raw),
                other => panic!("{raw} should be malformed, got {other:?}"),
            }
        }
    }
}
