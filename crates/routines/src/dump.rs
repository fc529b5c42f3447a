//! Schema dump: catalog state as re-executable statements.
//!
//! ```text
//! create_function "add_em", arguments: "integer, integer", returns: "integer", language: "sql", sql_definition: <<-SQL
//!   SELECT $1 + $2;
//! SQL
//!
//! create_aggregate "custom_avg", arguments: "double precision", version: 1
//! ```
//!
//! Aggregates are stamped with their latest definition version rather than
//! the catalog body: the stored option list does not reliably match the text
//! of the file it was created from.
//!
//! The output can be fed back through [`crate::load::parse`].

use std::fmt::Write as _;

use crate::adapter::Introspect;
use crate::definition::{DefinitionStore, ObjectKind};
use crate::descriptor::Descriptor;
use crate::resolver::VersionResolver;
use crate::Result;

/// Names that are never dumped.
pub const RESERVED_NAMES: &[&str] = &["schema_migrations"];

/// Heredoc terminator for function bodies.
pub const HEREDOC_TAG: &str = "SQL";

/// Body lines are indented by this much inside the heredoc.
pub const BODY_INDENT: &str = "  ";

pub struct SchemaDumper<'a, S: DefinitionStore + ?Sized> {
    resolver: VersionResolver<'a, S>,
    ignore: Vec<String>,
}

impl<'a, S: DefinitionStore + ?Sized> SchemaDumper<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            resolver: VersionResolver::new(store),
            ignore: Vec::new(),
        }
    }

    /// Additional names to leave out, on top of [`RESERVED_NAMES`].
    pub fn ignore<I, T>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.ignore.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn is_ignored(&self, name: &str) -> bool {
        RESERVED_NAMES.contains(&name) || self.ignore.iter().any(|ignored| ignored == name)
    }

    /// One statement per dumpable descriptor, in input order.
    pub fn dump(&self, descriptors: &[Descriptor]) -> Result<Vec<String>> {
        descriptors
            .iter()
            .filter(|d| !self.is_ignored(&d.name))
            .map(|d| match d.object_kind() {
                ObjectKind::Function => Ok(function_statement(d)),
                ObjectKind::Aggregate => self.aggregate_statement(d),
            })
            .collect()
    }

    /// Introspect and dump in one go.
    pub async fn dump_catalog<I: Introspect>(&self, adapter: &I) -> Result<Vec<String>> {
        let descriptors = adapter.introspect().await?;
        tracing::debug!(count = descriptors.len(), "introspected");
        self.dump(&descriptors)
    }

    fn aggregate_statement(&self, d: &Descriptor) -> Result<String> {
        let version = self.resolver.latest(ObjectKind::Aggregate, &d.name)?;
        Ok(format!(
            "create_aggregate {}, arguments: {}, version: {}",
            quote_literal(&d.name),
            quote_literal(&d.arguments),
            version.get()
        ))
    }
}

fn function_statement(d: &Descriptor) -> String {
    let mut out = format!(
        "create_function {}, arguments: {}, returns: {}, language: {}, sql_definition: <<-{}\n",
        quote_literal(&d.name),
        quote_literal(&d.arguments),
        quote_literal(d.result_type.as_deref().unwrap_or_default()),
        quote_literal(&d.language),
        HEREDOC_TAG,
    );
    for line in d.source_code.lines() {
        if line.trim().is_empty() {
            out.push('\n');
        } else {
            out.push_str(BODY_INDENT);
            out.push_str(line);
            out.push('\n');
        }
    }
    out.push_str(HEREDOC_TAG);
    out
}

/// Joins statements into a document, separated by blank lines.
pub fn render(statements: &[String]) -> String {
    let mut out = statements.join("\n\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

/// Double-quoted string literal with `\`, `"` and control characters escaped.
pub fn quote_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{{{:x}}}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
