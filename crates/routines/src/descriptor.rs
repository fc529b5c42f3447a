//! Catalog snapshots of functions and aggregates.

use std::fmt;
use std::str::FromStr;

use crate::{Error, ObjectKind};

/// How the catalog classifies a routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoutineKind {
    Normal,
    Aggregate,
    Window,
    Trigger,
}

impl RoutineKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RoutineKind::Normal => "normal",
            RoutineKind::Aggregate => "aggregate",
            RoutineKind::Window => "window",
            RoutineKind::Trigger => "trigger",
        }
    }
}

impl fmt::Display for RoutineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoutineKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(RoutineKind::Normal),
            "aggregate" => Ok(RoutineKind::Aggregate),
            "window" => Ok(RoutineKind::Window),
            "trigger" => Ok(RoutineKind::Trigger),
            _ => Err(Error::InvalidKind(s.to_string())),
        }
    }
}

/// A function or aggregate as it currently exists in the catalog.
///
/// Built fresh by every introspection call.
#[derive(Debug, Clone)]
pub struct Descriptor {
    /// Namespace-qualified (and quoted) only outside the default namespace.
    pub name: String,
    pub kind: RoutineKind,
    /// Canonical signature as rendered by `pg_get_function_arguments`.
    pub arguments: String,
    /// `None` for aggregates.
    pub result_type: Option<String>,
    pub language: String,
    /// Trimmed `prosrc`.
    pub source_code: String,
}

impl Descriptor {
    pub fn object_kind(&self) -> ObjectKind {
        match self.kind {
            RoutineKind::Aggregate => ObjectKind::Aggregate,
            _ => ObjectKind::Function,
        }
    }
}

/// Result type never takes part in identity.
impl PartialEq for Descriptor {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.arguments == other.arguments
            && self.language == other.language
            && self.source_code == other.source_code
            && self.kind == other.kind
    }
}

impl Eq for Descriptor {}
