//! Versioned Postgres functions and aggregates.
//!
//! This crate provides:
//! - Definition files, one per version, resolved by naming convention
//! - Statements to create, drop, update and replace functions and aggregates
//! - A command recorder that can roll those statements back
//! - Catalog introspection and a round-trippable schema dump
//!
//! # Definitions
//!
//! Bodies live under a store root, one file per version:
//!
//! ```text
//! db/functions/add_em_v01.sql    SELECT $1 + $2;
//! db/functions/add_em_v02.sql    SELECT $1 + $2 + 3;
//! db/aggregates/custom_avg_v01.sql
//! ```
//!
//! An aggregate body is its option list (`sfunc = ..., stype = ...`), not code.
//!
//! # Migrations
//!
//! Run statements through a [`CommandRecorder`] so they can be reverted:
//!
//! ```ignore
//! let adapter = PostgresAdapter::new(&client);
//! let store = FsStore::new("db");
//! let mut recorder = CommandRecorder::new(Statements::new(&adapter, &store));
//!
//! recorder
//!     .update_function(
//!         UpdateFunction::new("add_em", "integer, integer", "integer")
//!             .version(Version::new(2).unwrap())
//!             .revert_to_version(Version::FIRST),
//!     )
//!     .await?;
//!
//! // Later, to roll back:
//! recorder.revert().await?;
//! ```
//!
//! Dropping, updating or replacing is only reversible with a
//! `revert_to_version`: the old body is never kept in memory, it is read back
//! from its definition file.

pub mod adapter;
mod command;
pub mod definition;
mod descriptor;
pub mod dump;
mod error;
mod ident;
pub mod load;
pub mod resolver;
pub mod scaffold;
pub mod statements;
mod traced;

pub use adapter::{Execute, Introspect, PostgresAdapter};
pub use command::{Command, CommandRecorder};
pub use definition::{Definition, DefinitionStore, FsStore, MemoryStore, ObjectKind, Version};
pub use descriptor::{Descriptor, RoutineKind};
pub use dump::SchemaDumper;
pub use error::Error;
pub use ident::{Ident, pg_identifier, quote_name, unquote_name};
pub use resolver::{Intent, VersionResolver};
pub use scaffold::{Plan, Scaffold};
pub use statements::{
    CreateAggregate, CreateFunction, DropAggregate, DropFunction, ReplaceFunction, Statements,
    UpdateAggregate, UpdateFunction,
};
pub use traced::{Connection, ConnectionExt, TracedConn};

/// Result type for routines operations.
pub type Result<T> = std::result::Result<T, Error>;
