//! Recording mutating statements so they can be rolled back.
//!
//! A function's previous body is never kept around: rolling back a drop,
//! update or replace recreates the object from a definition file, so those
//! commands are only reversible when the author said which version to go back
//! to (`revert_to_version`).
//!
//! | recorded | inverse |
//! |----------|---------|
//! | create   | drop, same arguments |
//! | drop     | create at `revert_to_version` |
//! | update   | update to `revert_to_version` |
//! | replace  | replace with `revert_to_version` |

use crate::adapter::Execute;
use crate::definition::{DefinitionStore, Version};
use crate::statements::{
    CreateAggregate, CreateFunction, DropAggregate, DropFunction, ReplaceFunction, Statements,
    UpdateAggregate, UpdateFunction,
};
use crate::{Error, Result};

/// A mutating statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    CreateFunction(CreateFunction),
    DropFunction(DropFunction),
    UpdateFunction(UpdateFunction),
    ReplaceFunction(ReplaceFunction),
    CreateAggregate(CreateAggregate),
    DropAggregate(DropAggregate),
    UpdateAggregate(UpdateAggregate),
}

impl Command {
    pub fn operation(&self) -> &'static str {
        match self {
            Command::CreateFunction(_) => "create_function",
            Command::DropFunction(_) => "drop_function",
            Command::UpdateFunction(_) => "update_function",
            Command::ReplaceFunction(_) => "replace_function",
            Command::CreateAggregate(_) => "create_aggregate",
            Command::DropAggregate(_) => "drop_aggregate",
            Command::UpdateAggregate(_) => "update_aggregate",
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Command::CreateFunction(c) => &c.name,
            Command::DropFunction(c) => &c.name,
            Command::UpdateFunction(c) => &c.name,
            Command::ReplaceFunction(c) => &c.name,
            Command::CreateAggregate(c) => &c.name,
            Command::DropAggregate(c) => &c.name,
            Command::UpdateAggregate(c) => &c.name,
        }
    }

    /// The command that undoes this one.
    pub fn invert(&self) -> Result<Command> {
        Ok(match self {
            Command::CreateFunction(c) => Command::DropFunction(DropFunction {
                name: c.name.clone(),
                arguments: c.arguments.clone(),
                returns: c.returns.clone(),
                language: c.language.clone(),
                revert_to_version: None,
            }),
            Command::DropFunction(c) => Command::CreateFunction(CreateFunction {
                name: c.name.clone(),
                arguments: c.arguments.clone(),
                returns: c.returns.clone(),
                language: c.language.clone(),
                version: Some(revert_target("create_function", c.revert_to_version)?),
                sql_definition: None,
            }),
            Command::UpdateFunction(c) => Command::UpdateFunction(UpdateFunction {
                name: c.name.clone(),
                arguments: c.arguments.clone(),
                returns: c.returns.clone(),
                language: c.language.clone(),
                version: Some(revert_target("update_function", c.revert_to_version)?),
                sql_definition: None,
                revert_to_version: None,
            }),
            Command::ReplaceFunction(c) => Command::ReplaceFunction(ReplaceFunction {
                name: c.name.clone(),
                arguments: c.arguments.clone(),
                returns: c.returns.clone(),
                language: c.language.clone(),
                version: Some(revert_target("replace_function", c.revert_to_version)?),
                revert_to_version: None,
            }),
            Command::CreateAggregate(c) => Command::DropAggregate(DropAggregate {
                name: c.name.clone(),
                arguments: c.arguments.clone(),
                revert_to_version: None,
            }),
            Command::DropAggregate(c) => Command::CreateAggregate(CreateAggregate {
                name: c.name.clone(),
                arguments: c.arguments.clone(),
                version: Some(revert_target("create_aggregate", c.revert_to_version)?),
                sql_definition: None,
            }),
            Command::UpdateAggregate(c) => Command::UpdateAggregate(UpdateAggregate {
                name: c.name.clone(),
                arguments: c.arguments.clone(),
                version: Some(revert_target("update_aggregate", c.revert_to_version)?),
                sql_definition: None,
                revert_to_version: None,
            }),
        })
    }
}

/// `inverse` is the operation that would run on rollback.
fn revert_target(inverse: &'static str, revert_to_version: Option<Version>) -> Result<Version> {
    revert_to_version.ok_or(Error::IrreversibleOperation { operation: inverse })
}

/// Decorates [`Statements`], logging each successful mutating call.
pub struct CommandRecorder<'a, E: Execute, S: DefinitionStore + ?Sized> {
    statements: Statements<'a, E, S>,
    commands: Vec<Command>,
}

impl<'a, E: Execute, S: DefinitionStore + ?Sized> CommandRecorder<'a, E, S> {
    pub fn new(statements: Statements<'a, E, S>) -> Self {
        Self {
            statements,
            commands: Vec::new(),
        }
    }

    /// Commands recorded so far, oldest first.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Append a command without running it.
    pub fn record(&mut self, command: Command) {
        tracing::debug!(operation = command.operation(), name = command.name(), "recorded");
        self.commands.push(command);
    }

    /// Run a command and record it once it succeeded.
    pub async fn execute(&mut self, command: Command) -> Result<()> {
        self.statements.execute(&command).await?;
        self.record(command);
        Ok(())
    }

    pub async fn create_function(&mut self, req: CreateFunction) -> Result<()> {
        self.execute(Command::CreateFunction(req)).await
    }

    pub async fn drop_function(&mut self, req: DropFunction) -> Result<()> {
        self.execute(Command::DropFunction(req)).await
    }

    pub async fn update_function(&mut self, req: UpdateFunction) -> Result<()> {
        self.execute(Command::UpdateFunction(req)).await
    }

    pub async fn replace_function(&mut self, req: ReplaceFunction) -> Result<()> {
        self.execute(Command::ReplaceFunction(req)).await
    }

    pub async fn create_aggregate(&mut self, req: CreateAggregate) -> Result<()> {
        self.execute(Command::CreateAggregate(req)).await
    }

    pub async fn drop_aggregate(&mut self, req: DropAggregate) -> Result<()> {
        self.execute(Command::DropAggregate(req)).await
    }

    pub async fn update_aggregate(&mut self, req: UpdateAggregate) -> Result<()> {
        self.execute(Command::UpdateAggregate(req)).await
    }

    /// Run `commands` in order and return how many ran.
    ///
    /// On the first failure everything recorded so far is reverted and that
    /// failure is returned. If reverting fails too, both errors are reported
    /// in [`Error::RollbackFailed`].
    pub async fn execute_all<I>(&mut self, commands: I) -> Result<usize>
    where
        I: IntoIterator<Item = Command>,
    {
        let mut count = 0;
        for command in commands {
            let operation = command.operation();
            let name = command.name().to_string();
            if let Err(error) = self.execute(command).await {
                tracing::warn!(operation, %name, %error, "rolling back");
                return Err(match self.revert().await {
                    Ok(()) => error,
                    Err(rollback) => Error::RollbackFailed {
                        source: Box::new(error),
                        rollback: Box::new(rollback),
                    },
                });
            }
            count += 1;
        }
        Ok(count)
    }

    /// Inverses of every recorded command, newest first.
    ///
    /// Fails as a whole if any command is irreversible.
    pub fn inverse_commands(&self) -> Result<Vec<Command>> {
        self.commands.iter().rev().map(Command::invert).collect()
    }

    /// Undo everything recorded, newest first, and clear the log.
    ///
    /// All inverses are computed before anything runs, so an irreversible
    /// command aborts the rollback without touching the catalog.
    pub async fn revert(&mut self) -> Result<()> {
        let inverses = self.inverse_commands()?;
        tracing::info!(commands = inverses.len(), "reverting");
        for command in &inverses {
            self.statements.execute(command).await?;
        }
        self.commands.clear();
        Ok(())
    }
}
