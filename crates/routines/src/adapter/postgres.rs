//! PostgreSQL adapter.

use tokio_postgres::Row;

use super::{Execute, Introspect};
use crate::descriptor::{Descriptor, RoutineKind};
use crate::ident::pg_identifier;
use crate::traced::{Connection, ConnectionExt};
use crate::Result;

/// Namespace whose objects are listed without qualification.
pub const DEFAULT_NAMESPACE: &str = "public";

const FUNCTIONS_SQL: &str = r#"
SELECT n.nspname AS namespace,
       p.proname AS name,
       pg_catalog.pg_get_function_result(p.oid) AS result_data_type,
       pg_catalog.pg_get_function_arguments(p.oid) AS argument_data_types,
       CASE
         WHEN p.prokind = 'a' THEN 'aggregate'
         WHEN p.prokind = 'w' THEN 'window'
         WHEN p.prorettype = 'pg_catalog.trigger'::pg_catalog.regtype THEN 'trigger'
         ELSE 'normal'
       END AS kind,
       p.prosrc AS source_code,
       l.lanname AS language
FROM pg_catalog.pg_proc p
     LEFT JOIN pg_catalog.pg_namespace n ON n.oid = p.pronamespace
     LEFT JOIN pg_catalog.pg_language l ON l.oid = p.prolang
WHERE pg_catalog.pg_function_is_visible(p.oid)
      AND n.nspname <> 'pg_catalog'
      AND n.nspname <> 'information_schema'
      AND p.prokind IN ('f', 'w')
      AND p.prorettype <> 'pg_catalog.trigger'::pg_catalog.regtype
      AND LOWER(l.lanname) <> 'c'
ORDER BY 1, 2, 4
"#;

const AGGREGATES_SQL: &str = r#"
SELECT n.nspname AS namespace,
       p.proname AS name,
       pg_catalog.pg_get_function_result(p.oid) AS result_data_type,
       pg_catalog.pg_get_function_arguments(p.oid) AS argument_data_types,
       CASE
         WHEN p.prokind = 'a' THEN 'aggregate'
         WHEN p.prokind = 'w' THEN 'window'
         WHEN p.prorettype = 'pg_catalog.trigger'::pg_catalog.regtype THEN 'trigger'
         ELSE 'normal'
       END AS kind,
       p.prosrc AS source_code,
       l.lanname AS language
FROM pg_catalog.pg_proc p
     LEFT JOIN pg_catalog.pg_namespace n ON n.oid = p.pronamespace
     LEFT JOIN pg_catalog.pg_language l ON l.oid = p.prolang
WHERE pg_catalog.pg_function_is_visible(p.oid)
      AND n.nspname <> 'pg_catalog'
      AND n.nspname <> 'information_schema'
      AND p.prokind = 'a'
ORDER BY 1, 2, 4
"#;

/// Adapter over any traced [`Connection`].
///
/// # Example
///
/// ```ignore
/// let adapter = PostgresAdapter::new(&client);
/// for function in adapter.functions().await? {
///     println!("{}({})", function.name, function.arguments);
/// }
/// ```
pub struct PostgresAdapter<'a, C: Connection + ?Sized> {
    conn: &'a C,
}

impl<'a, C: Connection + ?Sized> PostgresAdapter<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    async fn descriptors(&self, sql: &str, with_result: bool) -> Result<Vec<Descriptor>> {
        let rows = self.conn.traced().query(sql, &[]).await?;
        rows.iter()
            .map(|row| descriptor_from_row(row, with_result))
            .collect()
    }
}

impl<C: Connection + ?Sized> Execute for PostgresAdapter<'_, C> {
    async fn execute_ddl(&self, sql: &str) -> Result<()> {
        self.conn.traced().batch_execute(sql).await?;
        Ok(())
    }
}

impl<C: Connection + ?Sized> Introspect for PostgresAdapter<'_, C> {
    async fn functions(&self) -> Result<Vec<Descriptor>> {
        self.descriptors(FUNCTIONS_SQL, true).await
    }

    async fn aggregates(&self) -> Result<Vec<Descriptor>> {
        self.descriptors(AGGREGATES_SQL, false).await
    }
}

fn descriptor_from_row(row: &Row, with_result: bool) -> Result<Descriptor> {
    let namespace: String = row.try_get("namespace")?;
    let name: String = row.try_get("name")?;
    let kind: String = row.try_get("kind")?;
    let source_code: String = row.try_get("source_code")?;

    Ok(Descriptor {
        name: qualified_name(&namespace, &name),
        kind: kind.parse::<RoutineKind>()?,
        arguments: row.try_get("argument_data_types")?,
        result_type: if with_result {
            Some(row.try_get("result_data_type")?)
        } else {
            None
        },
        language: row.try_get("language")?,
        source_code: source_code.trim().to_string(),
    })
}

/// `namespace.name`, unless the namespace is the default one.
pub fn qualified_name(namespace: &str, name: &str) -> String {
    if namespace == DEFAULT_NAMESPACE {
        pg_identifier(name)
    } else {
        format!("{}.{}", pg_identifier(namespace), pg_identifier(name))
    }
}
