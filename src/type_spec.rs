//! Hive/ORC type-string parser.
//!
//! Grammar (keywords are case-insensitive):
//!
//! ```text
//! type      := primitive | array<type> | map<primitive,type>
//!            | struct<name:type,...> | uniontype<type,...>
//! primitive := boolean | tinyint | smallint | int | bigint | float | double
//!            | string | binary | date | timestamp | timestamp with local time zone
//!            | interval_year_month | interval_day_time | void | unknown
//!            | char(n) | varchar(n) | decimal[(p[,s])]
//! ```
use once_cell::sync::Lazy;
use regex::Regex;

use crate::descriptor::{PrimitiveKind, TypeDescriptor};
use crate::error::SchemaError;

const MAX_CHAR_LENGTH: u32 = 255;
const MAX_VARCHAR_LENGTH: u32 = 65535;
const MAX_DECIMAL_PRECISION: u32 = 38;
const DEFAULT_DECIMAL_PRECISION: u8 = 10;
const DEFAULT_DECIMAL_SCALE: u8 = 0;
/// Guards the recursive descent against pathological type strings.
const MAX_SPEC_NESTING: usize = 256;

/// Word runs may contain spaces so that `timestamp with local time zone` is one token.
static TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9_.$\s]+|[<>(),:]|.").expect("static token regex")
});

/// Turns a textual type spec into a descriptor tree.
pub trait TypeSpecParser {
    fn parse(&self, spec: &str) -> Result<TypeDescriptor, SchemaError>;
}

/// Parser for the Hive type-string grammar.
#[derive(Debug, Clone, Copy, Default)]
pub struct HiveTypeParser;

impl TypeSpecParser for HiveTypeParser {
    fn parse(&self, spec: &str) -> Result<TypeDescriptor, SchemaError> {
        let tokens = tokenize(spec)?;
        let mut cursor = Cursor { spec, tokens, pos: 0 };
        let ty = cursor.parse_type(0)?;
        match cursor.peek() {
            None => Ok(ty),
            Some(tok) => Err(cursor.error_at(tok.offset, format!("unexpected trailing `{}`", tok.text))),
        }
    }
}

/// Shorthand for `HiveTypeParser.parse(spec)`.
pub fn parse_type_spec(spec: &str) -> Result<TypeDescriptor, SchemaError> {
    HiveTypeParser.parse(spec)
}

// ------------------------------- Tokens ----------------------------------- //

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Word,
    Punct(char),
}

#[derive(Debug, Clone)]
struct Token<'a> {
    kind: TokenKind,
    text: &'a str,
    offset: usize,
}

fn tokenize(spec: &str) -> Result<Vec<Token<'_>>, SchemaError> {
    let mut out = Vec::new();
    for m in TOKEN.find_iter(spec) {
        let raw = m.as_str();
        let mut chars = raw.chars();
        let first = chars.next();
        match (first, chars.next()) {
            (Some(c @ ('<' | '>' | '(' | ')' | ',' | ':')), None) => out.push(Token {
                kind: TokenKind::Punct(c),
                text: raw,
                offset: m.start(),
            }),
            (Some(c), None) if !is_word_char(c) => {
                return Err(SchemaError {
                    spec: spec.to_string(),
                    offset: m.start(),
                    message: format!("unexpected character `{c}`"),
                });
            }
            _ => {
                let text = raw.trim();
                if text.is_empty() {
                    continue;
                }
                let lead = raw.len() - raw.trim_start().len();
                out.push(Token { kind: TokenKind::Word, text, offset: m.start() + lead });
            }
        }
    }
    Ok(out)
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '$') || c.is_whitespace()
}

// ------------------------------- Parser ----------------------------------- //

struct Cursor<'a> {
    spec: &'a str,
    tokens: Vec<Token<'a>>,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Result<Token<'a>, SchemaError> {
        match self.tokens.get(self.pos) {
            Some(tok) => {
                self.pos += 1;
                Ok(tok.clone())
            }
            None => Err(self.error_at(self.spec.len(), "unexpected end of type spec")),
        }
    }

    fn error_at(&self, offset: usize, message: impl Into<String>) -> SchemaError {
        SchemaError { spec: self.spec.to_string(), offset, message: message.into() }
    }

    fn expect(&mut self, punct: char) -> Result<(), SchemaError> {
        let tok = self.next()?;
        if tok.kind == TokenKind::Punct(punct) {
            Ok(())
        } else {
            Err(self.error_at(tok.offset, format!("expected `{punct}`, found `{}`", tok.text)))
        }
    }

    fn eat(&mut self, punct: char) -> bool {
        if self.peek().is_some_and(|t| t.kind == TokenKind::Punct(punct)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn word(&mut self, what: &str) -> Result<Token<'a>, SchemaError> {
        let tok = self.next()?;
        match tok.kind {
            TokenKind::Word => Ok(tok),
            TokenKind::Punct(_) => Err(self.error_at(tok.offset, format!("expected {what}, found `{}`", tok.text))),
        }
    }

    fn number(&mut self, what: &str) -> Result<u32, SchemaError> {
        let tok = self.word(what)?;
        tok.text
            .parse::<u32>()
            .map_err(|_| self.error_at(tok.offset, format!("expected {what}, found `{}`", tok.text)))
    }

    fn parse_type(&mut self, depth: usize) -> Result<TypeDescriptor, SchemaError> {
        let tok = self.word("a type name")?;
        if depth >= MAX_SPEC_NESTING {
            return Err(self.error_at(tok.offset, format!("type nesting exceeds {MAX_SPEC_NESTING} levels")));
        }
        let name = tok.text.split_whitespace().collect::<Vec<_>>().join(" ").to_ascii_lowercase();
        let kind = match name.as_str() {
            "array" => {
                self.expect('<')?;
                let element = self.parse_type(depth + 1)?;
                self.expect('>')?;
                return Ok(TypeDescriptor::list(element));
            }
            "map" => {
                self.expect('<')?;
                let key_offset = self.peek().map_or(self.spec.len(), |t| t.offset);
                let key = self.parse_type(depth + 1)?;
                if !matches!(key, TypeDescriptor::Primitive { .. }) {
                    return Err(self.error_at(key_offset, "map key must be a primitive type"));
                }
                self.expect(',')?;
                let value = self.parse_type(depth + 1)?;
                self.expect('>')?;
                return Ok(TypeDescriptor::map(key, value));
            }
            "struct" => return self.parse_struct(tok.offset, depth),
            "uniontype" => {
                self.expect('<')?;
                let mut members = vec![self.parse_type(depth + 1)?];
                while self.eat(',') {
                    members.push(self.parse_type(depth + 1)?);
                }
                self.expect('>')?;
                return Ok(TypeDescriptor::union(members));
            }
            "boolean" => PrimitiveKind::Boolean,
            "tinyint" => PrimitiveKind::Byte,
            "smallint" => PrimitiveKind::Short,
            "int" => PrimitiveKind::Int,
            "bigint" => PrimitiveKind::Long,
            "float" => PrimitiveKind::Float,
            "double" => PrimitiveKind::Double,
            "string" => PrimitiveKind::String,
            "binary" => PrimitiveKind::Binary,
            "date" => PrimitiveKind::Date,
            "timestamp" => PrimitiveKind::Timestamp,
            "timestamp with local time zone" => PrimitiveKind::TimestampLocalTz,
            "interval_year_month" => PrimitiveKind::IntervalYearMonth,
            "interval_day_time" => PrimitiveKind::IntervalDayTime,
            "void" => PrimitiveKind::Void,
            "unknown" => PrimitiveKind::Unknown,
            "char" => PrimitiveKind::Char { length: self.parse_length(tok.offset, "char", MAX_CHAR_LENGTH)? },
            "varchar" => PrimitiveKind::Varchar {
                max_length: self.parse_length(tok.offset, "varchar", MAX_VARCHAR_LENGTH)?,
            },
            "decimal" => self.parse_decimal(tok.offset)?,
            _ => return Err(self.error_at(tok.offset, format!("unknown type `{}`", tok.text))),
        };
        Ok(TypeDescriptor::primitive(kind))
    }

    fn parse_struct(&mut self, offset: usize, depth: usize) -> Result<TypeDescriptor, SchemaError> {
        self.expect('<')?;
        if self.eat('>') {
            return Err(self.error_at(offset, "struct must declare at least one field"));
        }
        let mut fields = indexmap::IndexMap::new();
        loop {
            let name = self.word("a field name")?;
            self.expect(':')?;
            let ty = self.parse_type(depth + 1)?;
            if fields.insert(name.text.to_string(), ty).is_some() {
                return Err(self.error_at(name.offset, format!("duplicate struct field `{}`", name.text)));
            }
            if !self.eat(',') {
                break;
            }
        }
        self.expect('>')?;
        Ok(TypeDescriptor::Struct { fields })
    }

    fn parse_length(&mut self, offset: usize, name: &str, max: u32) -> Result<u32, SchemaError> {
        if !self.eat('(') {
            return Err(self.error_at(offset, format!("{name} requires a length, e.g. {name}(10)")));
        }
        let length = self.number("a length")?;
        self.expect(')')?;
        if length == 0 || length > max {
            return Err(self.error_at(offset, format!("{name} length must be between 1 and {max}")));
        }
        Ok(length)
    }

    fn parse_decimal(&mut self, offset: usize) -> Result<PrimitiveKind, SchemaError> {
        if !self.eat('(') {
            return Ok(PrimitiveKind::Decimal {
                precision: DEFAULT_DECIMAL_PRECISION,
                scale: DEFAULT_DECIMAL_SCALE,
            });
        }
        let precision = self.number("a decimal precision")?;
        let scale = if self.eat(',') { self.number("a decimal scale")? } else { 0 };
        self.expect(')')?;
        if precision == 0 || precision > MAX_DECIMAL_PRECISION {
            return Err(self.error_at(
                offset,
                format!("decimal precision must be between 1 and {MAX_DECIMAL_PRECISION}"),
            ));
        }
        if scale > precision {
            return Err(self.error_at(offset, "decimal scale cannot exceed its precision"));
        }
        // both bounded by 38 above
        Ok(PrimitiveKind::Decimal { precision: precision as u8, scale: scale as u8 })
    }
}

// ------------------------------- Tests ------------------------------------ //
