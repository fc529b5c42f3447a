//! Create, drop, update and replace functions and aggregates.
//!
//! Each operation takes its own request type carrying only the options that
//! operation understands. Requests are validated before any definition file
//! is read, and definition files are read before any DDL runs.
//!
//! ```ignore
//! let statements = Statements::new(&adapter, &store);
//!
//! statements
//!     .create_function(&CreateFunction::new("add_em", "integer, integer", "integer"))
//!     .await?;
//!
//! statements
//!     .update_function(
//!         &UpdateFunction::new("add_em", "integer, integer", "integer")
//!             .version(Version::new(2).unwrap())
//!             .revert_to_version(Version::FIRST),
//!     )
//!     .await?;
//! ```

use crate::adapter::Execute;
use crate::definition::{Definition, DefinitionStore, ObjectKind, Version};
use crate::{Command, Error, Result};

pub const DEFAULT_LANGUAGE: &str = "sql";

const BOTH_SOURCES: &str = "sql_definition and version cannot both be set";
const NO_SOURCE: &str = "sql_definition or version must be specified";

/// Where a body comes from once a request is validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source<'a> {
    Version(Version),
    Inline(&'a str),
}

/// `create_function`: defaults to version 1 when no source is given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateFunction {
    pub name: String,
    pub arguments: String,
    pub returns: String,
    pub language: String,
    pub version: Option<Version>,
    pub sql_definition: Option<String>,
}

impl CreateFunction {
    pub fn new(
        name: impl Into<String>,
        arguments: impl Into<String>,
        returns: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            arguments: arguments.into(),
            returns: returns.into(),
            language: DEFAULT_LANGUAGE.to_string(),
            version: None,
            sql_definition: None,
        }
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }

    pub fn sql_definition(mut self, sql: impl Into<String>) -> Self {
        self.sql_definition = Some(sql.into());
        self
    }

    pub fn source(&self) -> Result<Source<'_>> {
        optional_source(self.version, self.sql_definition.as_deref())
    }
}

/// `drop_function`.
///
/// `returns`, `language` and `revert_to_version` are never used for the drop
/// itself; they describe how to recreate the function on rollback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropFunction {
    pub name: String,
    pub arguments: String,
    pub returns: String,
    pub language: String,
    pub revert_to_version: Option<Version>,
}

impl DropFunction {
    pub fn new(
        name: impl Into<String>,
        arguments: impl Into<String>,
        returns: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            arguments: arguments.into(),
            returns: returns.into(),
            language: DEFAULT_LANGUAGE.to_string(),
            revert_to_version: None,
        }
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn revert_to_version(mut self, version: Version) -> Self {
        self.revert_to_version = Some(version);
        self
    }
}

/// `update_function`: exactly one of `version` and `sql_definition`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateFunction {
    pub name: String,
    pub arguments: String,
    pub returns: String,
    pub language: String,
    pub version: Option<Version>,
    pub sql_definition: Option<String>,
    pub revert_to_version: Option<Version>,
}

impl UpdateFunction {
    pub fn new(
        name: impl Into<String>,
        arguments: impl Into<String>,
        returns: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            arguments: arguments.into(),
            returns: returns.into(),
            language: DEFAULT_LANGUAGE.to_string(),
            version: None,
            sql_definition: None,
            revert_to_version: None,
        }
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }

    pub fn sql_definition(mut self, sql: impl Into<String>) -> Self {
        self.sql_definition = Some(sql.into());
        self
    }

    pub fn revert_to_version(mut self, version: Version) -> Self {
        self.revert_to_version = Some(version);
        self
    }

    pub fn source(&self) -> Result<Source<'_>> {
        required_source(self.version, self.sql_definition.as_deref())
    }
}

/// `replace_function`: version only, there is no inline body form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceFunction {
    pub name: String,
    pub arguments: String,
    pub returns: String,
    pub language: String,
    pub version: Option<Version>,
    pub revert_to_version: Option<Version>,
}

impl ReplaceFunction {
    pub fn new(
        name: impl Into<String>,
        arguments: impl Into<String>,
        returns: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            arguments: arguments.into(),
            returns: returns.into(),
            language: DEFAULT_LANGUAGE.to_string(),
            version: None,
            revert_to_version: None,
        }
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }

    pub fn revert_to_version(mut self, version: Version) -> Self {
        self.revert_to_version = Some(version);
        self
    }
}

/// `create_aggregate`: defaults to version 1 when no source is given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateAggregate {
    pub name: String,
    pub arguments: String,
    pub version: Option<Version>,
    pub sql_definition: Option<String>,
}

impl CreateAggregate {
    pub fn new(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: arguments.into(),
            version: None,
            sql_definition: None,
        }
    }

    pub fn version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }

    pub fn sql_definition(mut self, sql: impl Into<String>) -> Self {
        self.sql_definition = Some(sql.into());
        self
    }

    pub fn source(&self) -> Result<Source<'_>> {
        optional_source(self.version, self.sql_definition.as_deref())
    }
}

/// `drop_aggregate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropAggregate {
    pub name: String,
    pub arguments: String,
    pub revert_to_version: Option<Version>,
}

impl DropAggregate {
    pub fn new(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: arguments.into(),
            revert_to_version: None,
        }
    }

    pub fn revert_to_version(mut self, version: Version) -> Self {
        self.revert_to_version = Some(version);
        self
    }
}

/// `update_aggregate`: exactly one of `version` and `sql_definition`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateAggregate {
    pub name: String,
    pub arguments: String,
    pub version: Option<Version>,
    pub sql_definition: Option<String>,
    pub revert_to_version: Option<Version>,
}

impl UpdateAggregate {
    pub fn new(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: arguments.into(),
            version: None,
            sql_definition: None,
            revert_to_version: None,
        }
    }

    pub fn version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }

    pub fn sql_definition(mut self, sql: impl Into<String>) -> Self {
        self.sql_definition = Some(sql.into());
        self
    }

    pub fn revert_to_version(mut self, version: Version) -> Self {
        self.revert_to_version = Some(version);
        self
    }

    pub fn source(&self) -> Result<Source<'_>> {
        required_source(self.version, self.sql_definition.as_deref())
    }
}

/// A blank inline body counts as no body at all.
fn optional_source(version: Option<Version>, sql: Option<&str>) -> Result<Source<'_>> {
    match (version, non_blank(sql)) {
        (Some(_), Some(_)) => Err(Error::ArgumentConflict(BOTH_SOURCES)),
        (Some(version), None) => Ok(Source::Version(version)),
        (None, Some(sql)) => Ok(Source::Inline(sql)),
        (None, None) => Ok(Source::Version(Version::FIRST)),
    }
}

fn required_source(version: Option<Version>, sql: Option<&str>) -> Result<Source<'_>> {
    match (version, non_blank(sql)) {
        (None, None) => Err(Error::ArgumentConflict(NO_SOURCE)),
        (version, sql) => optional_source(version, sql),
    }
}

fn non_blank(sql: Option<&str>) -> Option<&str> {
    sql.filter(|sql| !sql.trim().is_empty())
}

/// The statement layer: validates requests, resolves bodies, runs DDL.
pub struct Statements<'a, E: Execute, S: DefinitionStore + ?Sized> {
    adapter: &'a E,
    store: &'a S,
}

impl<'a, E: Execute, S: DefinitionStore + ?Sized> Statements<'a, E, S> {
    pub fn new(adapter: &'a E, store: &'a S) -> Self {
        Self { adapter, store }
    }

    pub fn store(&self) -> &'a S {
        self.store
    }

    fn body(&self, kind: ObjectKind, name: &str, source: Source<'_>) -> Result<String> {
        match source {
            Source::Version(version) => self.store.read(&Definition::new(kind, name, version)),
            Source::Inline(sql) => Ok(sql.to_string()),
        }
    }

    pub async fn create_function(&self, req: &CreateFunction) -> Result<()> {
        let source = req.source()?;
        tracing::info!(name = %req.name, arguments = %req.arguments, source = ?source, "create_function");
        let body = self.body(ObjectKind::Function, &req.name, source)?;
        self.adapter
            .create_function(&req.name, &req.arguments, &req.returns, &body, &req.language)
            .await
    }

    pub async fn drop_function(&self, req: &DropFunction) -> Result<()> {
        tracing::info!(name = %req.name, arguments = %req.arguments, "drop_function");
        self.adapter.drop_function(&req.name, &req.arguments).await
    }

    pub async fn update_function(&self, req: &UpdateFunction) -> Result<()> {
        let source = req.source()?;
        tracing::info!(name = %req.name, arguments = %req.arguments, source = ?source, "update_function");
        let body = self.body(ObjectKind::Function, &req.name, source)?;
        self.adapter
            .update_function(&req.name, &req.arguments, &req.returns, &body, &req.language)
            .await
    }

    pub async fn replace_function(&self, req: &ReplaceFunction) -> Result<()> {
        let version = req.version.ok_or(Error::MissingVersion {
            operation: "replace_function",
        })?;
        tracing::info!(name = %req.name, arguments = %req.arguments, %version, "replace_function");
        let body = self.body(ObjectKind::Function, &req.name, Source::Version(version))?;
        self.adapter
            .replace_function(&req.name, &req.arguments, &req.returns, &body, &req.language)
            .await
    }

    pub async fn create_aggregate(&self, req: &CreateAggregate) -> Result<()> {
        let source = req.source()?;
        tracing::info!(name = %req.name, arguments = %req.arguments, source = ?source, "create_aggregate");
        let body = self.body(ObjectKind::Aggregate, &req.name, source)?;
        self.adapter
            .create_aggregate(&req.name, &req.arguments, &body)
            .await
    }

    pub async fn drop_aggregate(&self, req: &DropAggregate) -> Result<()> {
        tracing::info!(name = %req.name, arguments = %req.arguments, "drop_aggregate");
        self.adapter.drop_aggregate(&req.name, &req.arguments).await
    }

    pub async fn update_aggregate(&self, req: &UpdateAggregate) -> Result<()> {
        let source = req.source()?;
        tracing::info!(name = %req.name, arguments = %req.arguments, source = ?source, "update_aggregate");
        let body = self.body(ObjectKind::Aggregate, &req.name, source)?;
        self.adapter
            .update_aggregate(&req.name, &req.arguments, &body)
            .await
    }

    /// Run a command through the matching operation.
    pub async fn execute(&self, command: &Command) -> Result<()> {
        match command {
            Command::CreateFunction(req) => self.create_function(req).await,
            Command::DropFunction(req) => self.drop_function(req).await,
            Command::UpdateFunction(req) => self.update_function(req).await,
            Command::ReplaceFunction(req) => self.replace_function(req).await,
            Command::CreateAggregate(req) => self.create_aggregate(req).await,
            Command::DropAggregate(req) => self.drop_aggregate(req).await,
            Command::UpdateAggregate(req) => self.update_aggregate(req).await,
        }
    }
}
