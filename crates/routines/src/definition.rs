//! Versioned definition files.
//!
//! Every function or aggregate body lives in its own file, one file per
//! version:
//!
//! ```text
//! db/functions/add_em_v01.sql
//! db/functions/add_em_v02.sql
//! db/aggregates/public_custom_avg_v01.sql
//! ```
//!
//! The file name is derived from the object name with any namespace separator
//! (`.`) replaced by an underscore, followed by `_v` and the version padded to
//! at least two digits.

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;
use std::sync::Mutex;

use crate::ident::unquote_name;
use crate::{Error, Result};

/// The kind of object a definition describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Function,
    Aggregate,
}

impl ObjectKind {
    /// Directory holding this kind's definitions, relative to the store root.
    pub fn dir_name(self) -> &'static str {
        match self {
            ObjectKind::Function => "functions",
            ObjectKind::Aggregate => "aggregates",
        }
    }

    /// Keyword used in DDL (`DROP FUNCTION`, `DROP AGGREGATE`).
    pub fn keyword(self) -> &'static str {
        match self {
            ObjectKind::Function => "FUNCTION",
            ObjectKind::Aggregate => "AGGREGATE",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKind::Function => write!(f, "function"),
            ObjectKind::Aggregate => write!(f, "aggregate"),
        }
    }
}

impl FromStr for ObjectKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "function" | "functions" => Ok(ObjectKind::Function),
            "aggregate" | "aggregates" => Ok(ObjectKind::Aggregate),
            other => Err(Error::InvalidKind(other.to_string())),
        }
    }
}

/// A definition version. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version(NonZeroU32);

impl Version {
    pub const FIRST: Version = Version(NonZeroU32::MIN);

    /// Returns `None` for zero.
    pub fn new(n: u32) -> Option<Self> {
        NonZeroU32::new(n).map(Version)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }

    pub fn next(self) -> Version {
        Version(self.0.saturating_add(1))
    }
}

/// Zero-padded to at least two digits: `01`, `15`, `150`.
impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0.get())
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.parse::<u32>()
            .ok()
            .and_then(Version::new)
            .ok_or_else(|| Error::InvalidVersion(s.to_string()))
    }
}

/// File-name stem for an object name: quoting is dropped and namespace
/// separators become `_`, so `ns.thing` and `"Ns".thing` map to
/// `ns_thing_v01.sql` and `Ns_thing_v01.sql`.
pub fn normalize_name(name: &str) -> String {
    unquote_name(name).replace('.', "_")
}

/// A single (kind, name, version) definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    pub kind: ObjectKind,
    pub name: String,
    pub version: Version,
}

impl Definition {
    pub fn new(kind: ObjectKind, name: impl Into<String>, version: Version) -> Self {
        Self {
            kind,
            name: name.into(),
            version,
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}_v{}.sql", normalize_name(&self.name), self.version)
    }

    /// Path relative to the store root, e.g. `functions/add_em_v01.sql`.
    pub fn path(&self) -> Utf8PathBuf {
        Utf8Path::new(self.kind.dir_name()).join(self.file_name())
    }
}

/// Extracts the version from `file_name` if it is `<normalized>_v<digits>.sql`.
pub fn parse_file_version(normalized: &str, file_name: &str) -> Option<Version> {
    let digits = file_name
        .strip_prefix(normalized)?
        .strip_prefix("_v")?
        .strip_suffix(".sql")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<u32>().ok().and_then(Version::new)
}

/// Where definition bodies are read from.
///
/// Paths passed to the required methods are relative to the store root.
pub trait DefinitionStore: Send + Sync {
    /// Root used when displaying paths in errors.
    fn root(&self) -> &Utf8Path;

    /// File names directly inside the kind's directory. A missing directory
    /// is an empty listing.
    fn list(&self, kind: ObjectKind) -> Result<Vec<String>>;

    /// Contents of the file at `path`, `None` if it does not exist.
    fn load(&self, path: &Utf8Path) -> Result<Option<String>>;

    /// Writes `body` to `path`, creating parent directories.
    fn store(&self, path: &Utf8Path, body: &str) -> Result<()>;

    /// Full path of a definition, as shown to the author.
    fn full_path(&self, definition: &Definition) -> Utf8PathBuf {
        self.root().join(definition.path())
    }

    /// Reads a definition body. Blank bodies are rejected.
    fn read(&self, definition: &Definition) -> Result<String> {
        let full_path = self.full_path(definition);
        let body = self
            .load(&definition.path())?
            .ok_or_else(|| Error::DefinitionNotFound {
                kind: definition.kind,
                path: full_path.clone(),
            })?;

        if body.trim().is_empty() {
            return Err(Error::EmptyDefinition {
                kind: definition.kind,
                path: full_path,
            });
        }

        Ok(body)
    }
}

/// Definitions on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: Utf8PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn io_error(&self, path: &Utf8Path, source: std::io::Error) -> Error {
        Error::Io {
            path: self.root.join(path),
            source,
        }
    }
}

impl DefinitionStore for FsStore {
    fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn list(&self, kind: ObjectKind) -> Result<Vec<String>> {
        let dir = Utf8Path::new(kind.dir_name());
        let entries = match std::fs::read_dir(self.root.join(dir)) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_error(dir, e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| self.io_error(dir, e))?;
            // Non-UTF-8 names can never match the convention.
            if let Ok(name) = entry.file_name().into_string() {
                names.push(name);
            }
        }
        Ok(names)
    }

    fn load(&self, path: &Utf8Path) -> Result<Option<String>> {
        match std::fs::read_to_string(self.root.join(path)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_error(path, e)),
        }
    }

    fn store(&self, path: &Utf8Path, body: &str) -> Result<()> {
        let full = self.root.join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(path, e))?;
        }
        std::fs::write(&full, body).map_err(|e| self.io_error(path, e))
    }
}

/// Definitions held in memory, keyed by relative path.
#[derive(Debug)]
pub struct MemoryStore {
    root: Utf8PathBuf,
    files: Mutex<IndexMap<Utf8PathBuf, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            root: Utf8PathBuf::from("db"),
            files: Mutex::default(),
        }
    }

    /// Adds a definition file, replacing any previous content.
    pub fn with(self, kind: ObjectKind, name: &str, version: Version, body: &str) -> Self {
        let path = Definition::new(kind, name, version).path();
        self.files().insert(path, body.to_string());
        self
    }

    fn files(&self) -> std::sync::MutexGuard<'_, IndexMap<Utf8PathBuf, String>> {
        // A poisoned map is still a valid map.
        self.files.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DefinitionStore for MemoryStore {
    fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn list(&self, kind: ObjectKind) -> Result<Vec<String>> {
        let dir = Utf8Path::new(kind.dir_name());
        Ok(self
            .files()
            .keys()
            .filter(|path| path.parent() == Some(dir))
            .filter_map(|path| path.file_name().map(str::to_string))
            .collect())
    }

    fn load(&self, path: &Utf8Path) -> Result<Option<String>> {
        Ok(self.files().get(path).cloned())
    }

    fn store(&self, path: &Utf8Path, body: &str) -> Result<()> {
        self.files().insert(path.to_path_buf(), body.to_string());
        Ok(())
    }
}
