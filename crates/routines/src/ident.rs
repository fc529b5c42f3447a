//! Identifier quoting.
//!
//! Object names are only quoted when they have to be: a segment that Postgres
//! would read back unchanged without quotes (`[a-z_][a-z0-9_]*`) is emitted
//! bare, anything else is double-quoted.

use std::fmt;

/// A PostgreSQL identifier wrapper.
///
/// Display writes the value escaped and quoted with double quotes.
///
/// # Example
/// ```
/// use routines::Ident;
/// assert_eq!(format!("{}", Ident("My Fn")), "\"My Fn\"");
/// assert_eq!(format!("{}", Ident("bla\"h")), "\"bla\"\"h\"");
/// ```
pub struct Ident<T: AsRef<str>>(pub T);

impl<T: AsRef<str>> fmt::Display for Ident<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"")?;
        for c in self.0.as_ref().chars() {
            if c == '"' {
                write!(f, "\"\"")?;
            } else {
                write!(f, "{}", c)?;
            }
        }
        write!(f, "\"")
    }
}

/// True if `s` survives Postgres' identifier case folding unquoted.
pub fn is_simple_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Quote a single identifier segment if it is not simple.
///
/// # Examples
///
/// ```
/// assert_eq!(routines::pg_identifier("add_em"), "add_em");
/// assert_eq!(routines::pg_identifier("AddEm"), "\"AddEm\"");
/// ```
pub fn pg_identifier(segment: &str) -> String {
    if is_simple_ident(segment) {
        segment.to_string()
    } else {
        Ident(segment).to_string()
    }
}

/// Render a possibly namespace-qualified name for DDL.
///
/// Segments that are already double-quoted are kept verbatim, so names coming
/// back from introspection are not quoted twice.
pub fn quote_name(name: &str) -> String {
    split_segments(name)
        .iter()
        .map(|segment| {
            if segment.len() >= 2 && segment.starts_with('"') && segment.ends_with('"') {
                segment.to_string()
            } else {
                pg_identifier(segment)
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// The name as written by an author: each quoted segment loses its
/// surrounding quotes and `""` becomes `"`.
///
/// ```
/// assert_eq!(routines::unquote_name("\"Util\".avg"), "Util.avg");
/// assert_eq!(routines::unquote_name("\"na\"\"me\""), "na\"me");
/// ```
pub fn unquote_name(name: &str) -> String {
    split_segments(name)
        .iter()
        .map(|segment| {
            match segment
                .strip_prefix('"')
                .and_then(|inner| inner.strip_suffix('"'))
            {
                Some(inner) => inner.replace("\"\"", "\""),
                None => segment.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Split on `.` outside of double quotes.
fn split_segments(name: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;

    for (i, c) in name.char_indices() {
        match c {
            // `""` inside quotes toggles twice and stays quoted.
            '"' => in_quotes = !in_quotes,
            '.' if !in_quotes => {
                segments.push(&name[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    segments.push(&name[start..]);
    segments
}
