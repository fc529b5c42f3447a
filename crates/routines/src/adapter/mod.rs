//! Engine adapters.
//!
//! An adapter has two capabilities, kept as separate traits so an engine can
//! provide either one on its own:
//!
//! - [`Execute`] runs DDL for create/drop/update/replace.
//! - [`Introspect`] lists the routines currently in the catalog.
//!
//! [`PostgresAdapter`] implements both.

use std::future::Future;

use crate::descriptor::Descriptor;
use crate::ident::quote_name;
use crate::{ObjectKind, Result};

mod postgres;

pub use postgres::PostgresAdapter;

/// Runs DDL against the catalog.
///
/// No existence checks are made: creating an existing signature or dropping a
/// missing one fails in the engine, and that error is returned as-is.
pub trait Execute: Sync {
    /// Run a single DDL statement.
    fn execute_ddl(&self, sql: &str) -> impl Future<Output = Result<()>> + Send;

    fn create_function(
        &self,
        name: &str,
        arguments: &str,
        returns: &str,
        body: &str,
        language: &str,
    ) -> impl Future<Output = Result<()>> + Send {
        let sql = create_function_sql(name, arguments, returns, body, language);
        async move { self.execute_ddl(&sql).await }
    }

    fn create_aggregate(
        &self,
        name: &str,
        arguments: &str,
        body: &str,
    ) -> impl Future<Output = Result<()>> + Send {
        let sql = create_aggregate_sql(name, arguments, body);
        async move { self.execute_ddl(&sql).await }
    }

    fn drop_function(&self, name: &str, arguments: &str) -> impl Future<Output = Result<()>> + Send {
        let sql = drop_sql(ObjectKind::Function, name, arguments);
        async move { self.execute_ddl(&sql).await }
    }

    fn drop_aggregate(
        &self,
        name: &str,
        arguments: &str,
    ) -> impl Future<Output = Result<()>> + Send {
        let sql = drop_sql(ObjectKind::Aggregate, name, arguments);
        async move { self.execute_ddl(&sql).await }
    }

    /// Drop then create, as two statements. Not atomic: if the create fails
    /// the function is gone. Updating a missing function fails on the drop.
    fn update_function(
        &self,
        name: &str,
        arguments: &str,
        returns: &str,
        body: &str,
        language: &str,
    ) -> impl Future<Output = Result<()>> + Send {
        async move {
            self.drop_function(name, arguments).await?;
            self.create_function(name, arguments, returns, body, language)
                .await
        }
    }

    /// Drop then create, as two statements.
    fn update_aggregate(
        &self,
        name: &str,
        arguments: &str,
        body: &str,
    ) -> impl Future<Output = Result<()>> + Send {
        async move {
            self.drop_aggregate(name, arguments).await?;
            self.create_aggregate(name, arguments, body).await
        }
    }

    /// Single `CREATE OR REPLACE`, keeping dependent objects intact.
    fn replace_function(
        &self,
        name: &str,
        arguments: &str,
        returns: &str,
        body: &str,
        language: &str,
    ) -> impl Future<Output = Result<()>> + Send {
        let sql = replace_function_sql(name, arguments, returns, body, language);
        async move { self.execute_ddl(&sql).await }
    }
}

/// Lists routines from the catalog.
pub trait Introspect: Sync {
    /// Plain and window functions, excluding natively compiled ones.
    fn functions(&self) -> impl Future<Output = Result<Vec<Descriptor>>> + Send;

    fn aggregates(&self) -> impl Future<Output = Result<Vec<Descriptor>>> + Send;

    /// Functions followed by aggregates.
    fn introspect(&self) -> impl Future<Output = Result<Vec<Descriptor>>> + Send {
        async move {
            let mut all = self.functions().await?;
            all.extend(self.aggregates().await?);
            Ok(all)
        }
    }
}

pub fn create_function_sql(
    name: &str,
    arguments: &str,
    returns: &str,
    body: &str,
    language: &str,
) -> String {
    format!(
        "CREATE FUNCTION {}({}) RETURNS {} AS $$ {} $$ LANGUAGE {};",
        quote_name(name),
        arguments,
        returns,
        body,
        language
    )
}

pub fn replace_function_sql(
    name: &str,
    arguments: &str,
    returns: &str,
    body: &str,
    language: &str,
) -> String {
    format!(
        "CREATE OR REPLACE FUNCTION {}({}) RETURNS {} AS $$ {} $$ LANGUAGE {};",
        quote_name(name),
        arguments,
        returns,
        body,
        language
    )
}

/// The body of an aggregate is its `key = value` option list.
pub fn create_aggregate_sql(name: &str, arguments: &str, body: &str) -> String {
    format!(
        "CREATE AGGREGATE {}({})({});",
        quote_name(name),
        arguments,
        body
    )
}

pub fn drop_sql(kind: ObjectKind, name: &str, arguments: &str) -> String {
    format!("DROP {} {}({});", kind.keyword(), quote_name(name), arguments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_function_sql() {
        let sql = create_function_sql(
            "add_em",
            "integer, integer",
            "integer",
            "SELECT $1 + $2;",
            "sql",
        );
        insta::assert_snapshot!(sql, @"CREATE FUNCTION add_em(integer, integer) RETURNS integer AS $$ SELECT $1 + $2; $$ LANGUAGE sql;");
    }

    #[test]
    fn test_replace_function_sql() {
        let sql = replace_function_sql("Util.add_em", "a int", "int", "SELECT a", "sql");
        insta::assert_snapshot!(sql, @r#"CREATE OR REPLACE FUNCTION "Util".add_em(a int) RETURNS int AS $$ SELECT a $$ LANGUAGE sql;"#);
    }

    #[test]
    fn test_create_aggregate_sql() {
        let sql = create_aggregate_sql(
            "custom_avg",
            "float8",
            "sfunc = float8_accum, stype = float8[], finalfunc = float8_avg, initcond = '{0,0,0}'",
        );
        insta::assert_snapshot!(sql, @"CREATE AGGREGATE custom_avg(float8)(sfunc = float8_accum, stype = float8[], finalfunc = float8_avg, initcond = '{0,0,0}');");
    }

    #[test]
    fn test_drop_sql() {
        assert_eq!(
            drop_sql(ObjectKind::Function, "add_em", "integer, integer"),
            "DROP FUNCTION add_em(integer, integer);"
        );
        assert_eq!(
            drop_sql(ObjectKind::Aggregate, "\"My Avg\"", "float8"),
            "DROP AGGREGATE \"My Avg\"(float8);"
        );
    }
}
