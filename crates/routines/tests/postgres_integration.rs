//! Integration tests against real PostgreSQL.
//!
//! These tests verify that:
//! 1. Generated DDL executes correctly against PostgreSQL
//! 2. Rollback restores earlier definitions and removes created objects
//! 3. Introspection and the schema dump reflect the catalog
//!
//! Run with: cargo nextest run -p routines --test postgres_integration
//!
//! Note: Requires Docker to be running.

use camino::Utf8PathBuf;
use routines::{
    CommandRecorder, CreateAggregate, CreateFunction, DefinitionStore, Definition, DropFunction,
    Error, FsStore, Introspect, ObjectKind, PostgresAdapter, RoutineKind, SchemaDumper,
    Statements, UpdateFunction, Version, dump, load,
};
use std::time::Duration;
use testcontainers_modules::postgres::Postgres;
use testcontainers_modules::testcontainers::ContainerAsync;
use testcontainers_modules::testcontainers::runners::AsyncRunner;
use tokio_postgres::error::SqlState;
use tokio_postgres::{Client, NoTls};

const AVG_BODY: &str =
    "sfunc = float8_accum, stype = float8[], finalfunc = float8_avg, initcond = '{0,0,0}'";

fn v(n: u32) -> Version {
    Version::new(n).unwrap()
}

/// Set up a PostgreSQL container and return its handle and port.
async fn setup_postgres() -> (ContainerAsync<Postgres>, u16) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let container = Postgres::default()
        .start()
        .await
        .expect("failed to start postgres container");
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("postgres port not available");

    (container, port)
}

/// Connect to `dbname`, with retries (postgres may not be fully ready even after port is open)
async fn connect(port: u16, dbname: &str) -> Client {
    let conn_str = format!(
        "host=127.0.0.1 port={} user=postgres password=postgres dbname={}",
        port, dbname
    );

    let mut attempts = 0;
    let max_attempts = 10;
    let (client, connection) = loop {
        attempts += 1;
        match tokio_postgres::connect(&conn_str, NoTls).await {
            Ok(result) => break result,
            Err(e) if attempts < max_attempts => {
                tracing::debug!("Connection attempt {} failed: {}, retrying...", attempts, e);
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
            Err(e) => panic!(
                "failed to connect to postgres after {} attempts: {}",
                attempts, e
            ),
        }
    };

    // Spawn the connection handler
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            eprintln!("connection error: {}", e);
        }
    });

    client
}

/// A definition store in a fresh temporary directory.
fn temp_store() -> (tempfile::TempDir, FsStore) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("non-UTF-8 temp dir");
    (dir, FsStore::new(root))
}

fn write(store: &FsStore, kind: ObjectKind, name: &str, version: u32, body: &str) {
    store
        .store(&Definition::new(kind, name, v(version)).path(), body)
        .expect("failed to write definition");
}

fn is_undefined_function(err: &tokio_postgres::Error) -> bool {
    err.code() == Some(&SqlState::UNDEFINED_FUNCTION)
}

#[tokio::test]
async fn test_update_and_revert_custom_sum() {
    let (_container, port) = setup_postgres().await;
    let client = connect(port, "postgres").await;
    let (_dir, store) = temp_store();
    write(&store, ObjectKind::Function, "custom_sum", 1, "SELECT $1+$2");
    write(&store, ObjectKind::Function, "custom_sum", 2, "SELECT $1+$2+3");

    let adapter = PostgresAdapter::new(&client);
    let mut recorder = CommandRecorder::new(Statements::new(&adapter, &store));

    recorder
        .create_function(CreateFunction::new("custom_sum", "integer,integer", "integer"))
        .await
        .unwrap();
    let row = client.query_one("SELECT custom_sum(1, 2)", &[]).await.unwrap();
    assert_eq!(row.get::<_, i32>(0), 3);

    recorder
        .update_function(
            UpdateFunction::new("custom_sum", "integer,integer", "integer")
                .version(v(2))
                .revert_to_version(v(1)),
        )
        .await
        .unwrap();
    let row = client.query_one("SELECT custom_sum(1, 2)", &[]).await.unwrap();
    assert_eq!(row.get::<_, i32>(0), 6);

    recorder.revert().await.unwrap();

    let err = client
        .query_one("SELECT custom_sum(1, 2)", &[])
        .await
        .unwrap_err();
    assert!(is_undefined_function(&err), "unexpected error: {err}");
}

#[tokio::test]
async fn test_update_missing_function_fails_loudly() {
    let (_container, port) = setup_postgres().await;
    let client = connect(port, "postgres").await;
    let (_dir, store) = temp_store();

    let adapter = PostgresAdapter::new(&client);
    let statements = Statements::new(&adapter, &store);

    let err = statements
        .update_function(
            &UpdateFunction::new("nope", "integer", "integer").sql_definition("SELECT $1"),
        )
        .await
        .unwrap_err();
    assert!(
        matches!(&err, Error::Postgres(e) if is_undefined_function(e)),
        "unexpected error: {err}"
    );
}

#[tokio::test]
async fn test_introspect_aggregate() {
    let (_container, port) = setup_postgres().await;
    let client = connect(port, "postgres").await;
    let (_dir, store) = temp_store();
    write(&store, ObjectKind::Aggregate, "custom_avg", 1, AVG_BODY);

    let adapter = PostgresAdapter::new(&client);
    Statements::new(&adapter, &store)
        .create_aggregate(&CreateAggregate::new("custom_avg", "float8"))
        .await
        .unwrap();

    let aggregates = adapter.aggregates().await.unwrap();
    assert_eq!(aggregates.len(), 1);
    assert_eq!(aggregates[0].name, "custom_avg");
    assert_eq!(aggregates[0].kind, RoutineKind::Aggregate);
    assert_eq!(aggregates[0].arguments, "double precision");

    let functions = adapter.functions().await.unwrap();
    assert!(functions.iter().all(|f| f.name != "custom_avg"));
}

#[tokio::test]
async fn test_drop_removes_only_exact_signature() {
    let (_container, port) = setup_postgres().await;
    let client = connect(port, "postgres").await;
    let (_dir, store) = temp_store();

    let adapter = PostgresAdapter::new(&client);
    let statements = Statements::new(&adapter, &store);

    for arguments in ["integer,integer", "float8,float8"] {
        statements
            .create_function(
                &CreateFunction::new("custom_sum", arguments, "float8")
                    .sql_definition("SELECT ($1 + $2)::float8"),
            )
            .await
            .unwrap();
    }

    statements
        .drop_function(&DropFunction::new("custom_sum", "integer,integer", "float8"))
        .await
        .unwrap();

    let functions = adapter.functions().await.unwrap();
    let signatures: Vec<&str> = functions
        .iter()
        .filter(|f| f.name == "custom_sum")
        .map(|f| f.arguments.as_str())
        .collect();
    assert_eq!(signatures, vec!["double precision, double precision"]);
}

#[tokio::test]
async fn test_introspect_namespaced_function() {
    let (_container, port) = setup_postgres().await;
    let client = connect(port, "postgres").await;
    client
        .batch_execute("CREATE SCHEMA util; SET search_path TO public, util;")
        .await
        .unwrap();
    let (_dir, store) = temp_store();

    let adapter = PostgresAdapter::new(&client);
    Statements::new(&adapter, &store)
        .create_function(
            &CreateFunction::new("util.twice", "integer", "integer").sql_definition("SELECT $1 * 2"),
        )
        .await
        .unwrap();

    let functions = adapter.functions().await.unwrap();
    let twice = functions
        .iter()
        .find(|f| f.name == "util.twice")
        .expect("util.twice should be listed");
    assert_eq!(twice.result_type.as_deref(), Some("integer"));
    assert_eq!(twice.language, "sql");
    assert_eq!(twice.source_code, "SELECT $1 * 2");
}

#[tokio::test]
async fn test_introspect_skips_native_and_trigger_functions() {
    let (_container, port) = setup_postgres().await;
    let client = connect(port, "postgres").await;
    client
        .batch_execute(
            r#"
            CREATE FUNCTION native_handler() RETURNS language_handler
                AS '$libdir/plpgsql', 'plpgsql_call_handler' LANGUAGE c;
            CREATE FUNCTION touch_row() RETURNS trigger
                AS $$ BEGIN RETURN NEW; END; $$ LANGUAGE plpgsql;
            CREATE FUNCTION my_rank() RETURNS bigint
                AS 'window_rank' LANGUAGE internal WINDOW;
            CREATE FUNCTION plain_one() RETURNS integer
                AS $$ SELECT 1 $$ LANGUAGE sql;
            "#,
        )
        .await
        .unwrap();

    let adapter = PostgresAdapter::new(&client);
    let functions = adapter.functions().await.unwrap();
    let names: Vec<&str> = functions.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["my_rank", "plain_one"]);

    assert_eq!(functions[0].kind, RoutineKind::Window);
    assert_eq!(functions[0].language, "internal");
    assert_eq!(functions[0].source_code, "window_rank");
    assert_eq!(functions[1].kind, RoutineKind::Normal);

    assert!(adapter.aggregates().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_dump_contains_body_and_skips_reserved() {
    let (_container, port) = setup_postgres().await;
    let client = connect(port, "postgres").await;
    let (_dir, store) = temp_store();
    write(&store, ObjectKind::Function, "add_em", 1, "SELECT $1 + $2;");

    let adapter = PostgresAdapter::new(&client);
    let statements = Statements::new(&adapter, &store);
    statements
        .create_function(&CreateFunction::new("add_em", "integer, integer", "integer"))
        .await
        .unwrap();
    statements
        .create_function(
            &CreateFunction::new("schema_migrations", "", "integer").sql_definition("SELECT 1"),
        )
        .await
        .unwrap();

    let text = dump::render(&SchemaDumper::new(&store).dump_catalog(&adapter).await.unwrap());

    assert!(text.contains("create_function \"add_em\""), "{text}");
    assert!(text.contains("SELECT $1 + $2;"), "{text}");
    assert!(!text.contains("schema_migrations"), "{text}");
}

#[tokio::test]
async fn test_dump_load_round_trip() {
    let (_container, port) = setup_postgres().await;
    let source = connect(port, "postgres").await;
    let (_dir, store) = temp_store();
    write(&store, ObjectKind::Function, "add_em", 1, "SELECT $1 + $2;");
    write(&store, ObjectKind::Aggregate, "custom_avg", 1, AVG_BODY);
    write(&store, ObjectKind::Aggregate, "MyAvg", 1, AVG_BODY);

    let adapter = PostgresAdapter::new(&source);
    let statements = Statements::new(&adapter, &store);
    statements
        .create_function(&CreateFunction::new("add_em", "integer, integer", "integer"))
        .await
        .unwrap();
    statements
        .create_function(
            &CreateFunction::new("greet", "who text", "text")
                .language("plpgsql")
                .sql_definition("\nBEGIN\n  RETURN 'hello ' || who;\nEND;\n"),
        )
        .await
        .unwrap();
    statements
        .create_aggregate(&CreateAggregate::new("custom_avg", "float8"))
        .await
        .unwrap();
    statements
        .create_aggregate(&CreateAggregate::new("MyAvg", "float8"))
        .await
        .unwrap();

    let dumper = SchemaDumper::new(&store);
    let first = dump::render(&dumper.dump_catalog(&adapter).await.unwrap());
    assert!(first.contains(r#"create_aggregate "\"MyAvg\"""#), "{first}");

    source.batch_execute("CREATE DATABASE restored").await.unwrap();
    let restored = connect(port, "restored").await;
    let restored_adapter = PostgresAdapter::new(&restored);
    let restored_statements = Statements::new(&restored_adapter, &store);
    for command in load::parse(&first).unwrap() {
        restored_statements.execute(&command).await.unwrap();
    }

    let second = dump::render(&dumper.dump_catalog(&restored_adapter).await.unwrap());
    assert_eq!(first, second);
    assert_eq!(
        adapter.introspect().await.unwrap(),
        restored_adapter.introspect().await.unwrap()
    );
}
