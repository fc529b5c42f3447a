//! Parse schema dump text back into commands.
//!
//! Accepts exactly what [`crate::dump`] writes: one `create_function` or
//! `create_aggregate` statement per entry, a quoted name, then
//! `, key: value` options. Values are double-quoted strings, integers, or a
//! `<<-TAG` heredoc whose body follows on the next lines and ends at a line
//! consisting of `TAG` alone, unindented. Body lines lose their two-space
//! indentation.
//!
//! Blank lines and lines starting with `#` are skipped.

use indexmap::IndexMap;

use crate::command::Command;
use crate::definition::Version;
use crate::dump::BODY_INDENT;
use crate::statements::{CreateAggregate, CreateFunction, DEFAULT_LANGUAGE};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Value {
    Str(String),
    Int(u64),
}

/// Parse a whole dump.
pub fn parse(text: &str) -> Result<Vec<Command>> {
    let lines: Vec<&str> = text.lines().collect();
    let mut commands = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line_no = i + 1;
        let line = lines[i].trim();
        i += 1;

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (operation, rest) = line
            .split_once(char::is_whitespace)
            .ok_or_else(|| Error::parse(line_no, format!("expected a statement, got `{line}`")))?;

        let mut cursor = Cursor::new(rest, line_no);
        let name = cursor.string()?;
        let mut options = Options::new(line_no);

        loop {
            cursor.skip_ws();
            if cursor.at_end() {
                break;
            }
            cursor.expect(',')?;
            let key = cursor.ident()?;
            cursor.expect(':')?;

            let value = match cursor.heredoc_tag()? {
                Some(tag) => Value::Str(read_heredoc(&lines, &mut i, &tag, line_no)?),
                None => cursor.scalar()?,
            };
            options.insert(key, value)?;
        }

        commands.push(build(operation, name, options)?);
    }

    Ok(commands)
}

fn read_heredoc(lines: &[&str], i: &mut usize, tag: &str, start: usize) -> Result<String> {
    let mut body = Vec::new();
    while *i < lines.len() {
        let line = lines[*i];
        *i += 1;
        if line.trim_end() == tag {
            return Ok(body.join("\n"));
        }
        body.push(line.strip_prefix(BODY_INDENT).unwrap_or(line));
    }
    Err(Error::parse(start, format!("unterminated heredoc, expected `{tag}`")))
}

fn build(operation: &str, name: String, mut options: Options) -> Result<Command> {
    let command = match operation {
        "create_function" => {
            let mut req = CreateFunction::new(
                name,
                options.required_str("arguments")?,
                options.required_str("returns")?,
            );
            req.language = options
                .str("language")?
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
            req.version = options.version("version")?;
            req.sql_definition = options.str("sql_definition")?;
            Command::CreateFunction(req)
        }
        "create_aggregate" => {
            let mut req = CreateAggregate::new(name, options.required_str("arguments")?);
            req.version = options.version("version")?;
            req.sql_definition = options.str("sql_definition")?;
            Command::CreateAggregate(req)
        }
        other => {
            return Err(Error::parse(
                options.line,
                format!("unknown statement `{other}`"),
            ));
        }
    };
    options.finish()?;
    Ok(command)
}

struct Options {
    line: usize,
    values: IndexMap<String, Value>,
}

impl Options {
    fn new(line: usize) -> Self {
        Self {
            line,
            values: IndexMap::new(),
        }
    }

    fn insert(&mut self, key: String, value: Value) -> Result<()> {
        if self.values.contains_key(&key) {
            return Err(Error::parse(self.line, format!("duplicate option `{key}`")));
        }
        self.values.insert(key, value);
        Ok(())
    }

    fn str(&mut self, key: &str) -> Result<Option<String>> {
        match self.values.shift_remove(key) {
            None => Ok(None),
            Some(Value::Str(s)) => Ok(Some(s)),
            Some(Value::Int(_)) => Err(Error::parse(
                self.line,
                format!("option `{key}` must be a string"),
            )),
        }
    }

    fn required_str(&mut self, key: &str) -> Result<String> {
        self.str(key)?
            .ok_or_else(|| Error::parse(self.line, format!("missing option `{key}`")))
    }

    fn version(&mut self, key: &str) -> Result<Option<Version>> {
        match self.values.shift_remove(key) {
            None => Ok(None),
            Some(Value::Int(n)) => u32::try_from(n)
                .ok()
                .and_then(Version::new)
                .map(Some)
                .ok_or_else(|| Error::parse(self.line, format!("invalid version {n}"))),
            Some(Value::Str(_)) => Err(Error::parse(
                self.line,
                format!("option `{key}` must be an integer"),
            )),
        }
    }

    fn finish(self) -> Result<()> {
        match self.values.keys().next() {
            Some(key) => Err(Error::parse(self.line, format!("unknown option `{key}`"))),
            None => Ok(()),
        }
    }
}

struct Cursor<'a> {
    rest: &'a str,
    line: usize,
}

impl<'a> Cursor<'a> {
    fn new(rest: &'a str, line: usize) -> Self {
        Self { rest, line }
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::parse(self.line, message)
    }

    fn skip_ws(&mut self) {
        self.rest = self.rest.trim_start();
    }

    fn at_end(&self) -> bool {
        self.rest.is_empty()
    }

    fn expect(&mut self, c: char) -> Result<()> {
        self.skip_ws();
        match self.rest.strip_prefix(c) {
            Some(rest) => {
                self.rest = rest;
                Ok(())
            }
            None => Err(self.error(format!("expected `{c}` at `{}`", self.rest))),
        }
    }

    fn ident(&mut self) -> Result<String> {
        self.skip_ws();
        let end = self
            .rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(self.rest.len());
        if end == 0 {
            return Err(self.error(format!("expected an option name at `{}`", self.rest)));
        }
        let (ident, rest) = self.rest.split_at(end);
        self.rest = rest;
        Ok(ident.to_string())
    }

    /// `<<-TAG`, if that is what comes next.
    fn heredoc_tag(&mut self) -> Result<Option<String>> {
        self.skip_ws();
        let Some(rest) = self.rest.strip_prefix("<<-") else {
            return Ok(None);
        };
        self.rest = rest;
        let tag = self.ident()?;
        Ok(Some(tag))
    }

    fn scalar(&mut self) -> Result<Value> {
        self.skip_ws();
        if self.rest.starts_with('"') {
            return Ok(Value::Str(self.string()?));
        }
        let end = self
            .rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(self.rest.len());
        let (digits, rest) = self.rest.split_at(end);
        let n = digits
            .parse::<u64>()
            .map_err(|_| self.error(format!("expected a string or integer at `{}`", self.rest)))?;
        self.rest = rest;
        Ok(Value::Int(n))
    }

    fn string(&mut self) -> Result<String> {
        self.expect('"')?;
        let input = self.rest;
        let mut out = String::new();
        let mut chars = input.char_indices();

        while let Some((i, c)) = chars.next() {
            match c {
                '"' => {
                    self.rest = &input[i + 1..];
                    return Ok(out);
                }
                '\\' => match chars.next() {
                    Some((_, '"')) => out.push('"'),
                    Some((_, '\\')) => out.push('\\'),
                    Some((_, 'n')) => out.push('\n'),
                    Some((_, 't')) => out.push('\t'),
                    Some((_, 'r')) => out.push('\r'),
                    Some((_, 'u')) => {
                        let mut hex = String::new();
                        if !matches!(chars.next(), Some((_, '{'))) {
                            return Err(self.error("expected `{` after `\\u`"));
                        }
                        for (_, c) in chars.by_ref() {
                            if c == '}' {
                                break;
                            }
                            hex.push(c);
                        }
                        let c = u32::from_str_radix(&hex, 16)
                            .ok()
                            .and_then(char::from_u32)
                            .ok_or_else(|| self.error(format!("invalid escape `\\u{{{hex}}}`")))?;
                        out.push(c);
                    }
                    Some((_, other)) => {
                        return Err(self.error(format!("unknown escape `\\{other}`")));
                    }
                    None => break,
                },
                c => out.push(c),
            }
        }

        Err(self.error("unterminated string"))
    }
}
