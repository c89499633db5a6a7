//! Resolution scenarios driven through the in-memory catalog.

use coltype_lib::db::connectors::memory::InMemoryCatalog;
use coltype_lib::db::type_resolver::{RecordingSink, UnhandledType};
use coltype_lib::{
    ArrayElementInfo, ColumnAddress, ColumnInfo, Dialect, ResolveError, ResolvedType,
    ResolverOptions, ScalarType, TypeResolver,
};

// ─── helpers ───────────────────────────────────────────────────────────────

const ALL_DIALECTS: [Dialect; 3] = [Dialect::Postgres, Dialect::MySql, Dialect::SqlServer];

fn address(column: &str) -> ColumnAddress {
    ColumnAddress::new("public", "products", column)
}

fn element(udt_name: &str, raw_type: &str, labels: &[&str]) -> ArrayElementInfo {
    ArrayElementInfo {
        udt_name: udt_name.to_string(),
        raw_type: raw_type.to_string(),
        special_values: labels.iter().map(|s| s.to_string()).collect(),
    }
}

async fn resolve_plain(raw_type: &str, dialect: Dialect) -> ResolvedType {
    let catalog = InMemoryCatalog::new();
    let resolver = TypeResolver::new(&catalog, dialect);
    resolver
        .resolve(&ColumnInfo::new(raw_type), &address("value"))
        .await
        .expect("scalar resolution never touches the catalog")
}

// ═══════════════════════════════════════════════════════════════════════════
//  SCALAR TYPES
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn varchar_is_string_in_every_dialect() {
    for dialect in ALL_DIALECTS {
        assert_eq!(
            resolve_plain("VARCHAR(255)", dialect).await,
            ResolvedType::Scalar(ScalarType::String)
        );
    }
}

#[tokio::test]
async fn scalar_table() {
    let cases = [
        ("BIGINT", ScalarType::BigInt),
        ("MONEY", ScalarType::Double),
        ("NUMERIC", ScalarType::Double),
        ("REAL", ScalarType::Double),
        ("UNIQUEIDENTIFIER", ScalarType::Uuid),
        ("uuid", ScalarType::Uuid),
        ("JSONB", ScalarType::Jsonb),
        ("SERIAL", ScalarType::Integer),
        ("FLOAT(8)", ScalarType::Float),
        ("DATE", ScalarType::Date),
        ("TIMESTAMP(6)", ScalarType::Date),
        ("TIME", ScalarType::Time),
        ("INET", ScalarType::Inet),
        ("BOOLEAN", ScalarType::Boolean),
    ];

    for (raw, expected) in cases {
        for dialect in ALL_DIALECTS {
            assert_eq!(
                resolve_plain(raw, dialect).await,
                ResolvedType::Scalar(expected),
                "{} under {}",
                raw,
                dialect
            );
        }
    }
}

#[tokio::test]
async fn bit_one_is_boolean_only_for_mysql() {
    assert_eq!(
        resolve_plain("BIT(1)", Dialect::MySql).await,
        ResolvedType::Scalar(ScalarType::Boolean)
    );
    assert_eq!(resolve_plain("BIT(1)", Dialect::SqlServer).await, ResolvedType::Unresolved);
    assert_eq!(
        resolve_plain("BIT", Dialect::SqlServer).await,
        ResolvedType::Scalar(ScalarType::Boolean)
    );
}

#[tokio::test]
async fn mysql_enum_literal_passes_through() {
    let raw = "ENUM('small','medium','large')";
    let resolved = resolve_plain(raw, Dialect::MySql).await;
    assert_eq!(resolved, ResolvedType::Literal(raw.to_string()));
    assert_eq!(resolved.expression().as_deref(), Some(raw));
}

#[tokio::test]
async fn resolution_is_repeatable() {
    let catalog = InMemoryCatalog::new().with_enum("color");
    let resolver = TypeResolver::new(&catalog, Dialect::Postgres);
    let column = ColumnInfo::new("USER-DEFINED").with_special_values(["red", "blue"]);
    let addr = address("color");

    let first = resolver.resolve(&column, &addr).await.unwrap();
    let second = resolver.resolve(&column, &addr).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.expression(), second.expression());
}

// ═══════════════════════════════════════════════════════════════════════════
//  ENUMS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn postgres_enum_lists_labels_in_order() {
    let catalog = InMemoryCatalog::new().with_enum("color");
    let resolver = TypeResolver::new(&catalog, Dialect::Postgres);
    let column = ColumnInfo::new("USER-DEFINED").with_special_values(["red", "blue"]);

    let resolved = resolver.resolve(&column, &address("color")).await.unwrap();
    assert_eq!(
        resolved,
        ResolvedType::Enum(vec!["red".to_string(), "blue".to_string()])
    );

    let expr = resolved.expression().unwrap();
    assert_eq!(expr, "ENUM(\n        'red',\n        'blue',\n      )");
    assert_eq!(expr.matches("'red'").count(), 1);
    assert!(expr.find("'red'").unwrap() < expr.find("'blue'").unwrap());
}

#[tokio::test]
async fn user_defined_outside_postgres_is_string() {
    let catalog = InMemoryCatalog::new().with_enum("color");
    let resolver = TypeResolver::new(&catalog, Dialect::MySql);
    let column = ColumnInfo::new("USER-DEFINED").with_special_values(["red"]);

    let resolved = resolver.resolve(&column, &address("color")).await.unwrap();
    assert_eq!(resolved, ResolvedType::Scalar(ScalarType::String));
    assert_eq!(catalog.lookup_count(), 0);
}

// ═══════════════════════════════════════════════════════════════════════════
//  ARRAYS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn postgres_array_of_integer() {
    let catalog = InMemoryCatalog::new()
        .with_array_element(address("scores"), element("int4", "INTEGER", &[]));
    let resolver = TypeResolver::new(&catalog, Dialect::Postgres);

    let resolved = resolver
        .resolve(&ColumnInfo::new("ARRAY"), &address("scores"))
        .await
        .unwrap();
    assert_eq!(
        resolved,
        ResolvedType::Array(Box::new(ResolvedType::Scalar(ScalarType::Integer)))
    );
    assert_eq!(resolved.expression().as_deref(), Some("ARRAY(DataTypes.INTEGER)"));
}

#[tokio::test]
async fn nested_arrays_wrap_string_at_every_level() {
    // Nested lookups are keyed by the element's catalog type name.
    let catalog = InMemoryCatalog::new()
        .with_array_element(address("matrix"), element("_varchar", "ARRAY", &[]))
        .with_array_element(address("_varchar"), element("_text", "ARRAY", &[]))
        .with_array_element(address("_text"), element("varchar", "character varying(20)", &[]));
    let resolver = TypeResolver::new(&catalog, Dialect::Postgres);

    let resolved = resolver
        .resolve(&ColumnInfo::new("ARRAY"), &address("matrix"))
        .await
        .unwrap();
    assert_eq!(
        resolved.expression().as_deref(),
        Some("ARRAY(DataTypes.ARRAY(DataTypes.ARRAY(DataTypes.STRING)))")
    );
    assert_eq!(catalog.lookup_count(), 3);
}

#[tokio::test]
async fn array_of_enum_embeds_enum_expression() {
    let catalog = InMemoryCatalog::new()
        .with_enum("mood")
        .with_array_element(address("moods"), element("mood", "USER-DEFINED", &["sad", "happy"]));
    let resolver = TypeResolver::new(&catalog, Dialect::Postgres);

    let resolved = resolver
        .resolve(&ColumnInfo::new("ARRAY"), &address("moods"))
        .await
        .unwrap();
    assert_eq!(
        resolved.expression().as_deref(),
        Some("ARRAY(DataTypes.ENUM(\n        'sad',\n        'happy',\n      ))")
    );
}

#[tokio::test]
async fn array_outside_postgres_is_unresolved() {
    let catalog = InMemoryCatalog::new()
        .with_array_element(address("scores"), element("int4", "INTEGER", &[]));

    for dialect in [Dialect::MySql, Dialect::SqlServer] {
        let resolver = TypeResolver::new(&catalog, dialect);
        let resolved = resolver
            .resolve(&ColumnInfo::new("ARRAY"), &address("scores"))
            .await
            .unwrap();
        assert_eq!(resolved, ResolvedType::Unresolved);
    }
    assert_eq!(catalog.lookup_count(), 0);
}

// ═══════════════════════════════════════════════════════════════════════════
//  DIAGNOSTICS AND FAILURES
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn unknown_type_warns_once() {
    let catalog = InMemoryCatalog::new();
    let sink = RecordingSink::new();
    let resolver = TypeResolver::new(&catalog, Dialect::Postgres).with_sink(&sink);

    let resolved = resolver
        .resolve(&ColumnInfo::new("FOOBAR"), &address("mystery"))
        .await
        .unwrap();
    assert_eq!(resolved, ResolvedType::Unresolved);
    assert_eq!(
        sink.entries(),
        vec![UnhandledType {
            raw_type: "FOOBAR".to_string(),
            column_name: "mystery".to_string(),
        }]
    );
    assert!(sink.entries()[0].to_string().contains("FOOBAR"));
}

#[tokio::test]
async fn unknown_type_is_silent_when_warnings_disabled() {
    let catalog = InMemoryCatalog::new();
    let sink = RecordingSink::new();
    let resolver = TypeResolver::new(&catalog, Dialect::Postgres)
        .with_options(ResolverOptions {
            allow_warning: false,
        })
        .with_sink(&sink);

    let resolved = resolver
        .resolve(&ColumnInfo::new("FOOBAR"), &address("mystery"))
        .await
        .unwrap();
    assert_eq!(resolved, ResolvedType::Unresolved);
    assert!(sink.entries().is_empty());
}

#[tokio::test]
async fn array_lookup_failure_propagates() {
    let catalog = InMemoryCatalog::new().failing("server closed the connection");
    let resolver = TypeResolver::new(&catalog, Dialect::Postgres);

    let err = resolver
        .resolve(&ColumnInfo::new("ARRAY"), &address("scores"))
        .await
        .unwrap_err();
    match err {
        ResolveError::Lookup { column, source } => {
            assert_eq!(column, "public.products.scores");
            assert_eq!(source.to_string(), "server closed the connection");
        }
    }
}

#[tokio::test]
async fn missing_array_column_is_an_error_not_unresolved() {
    let catalog = InMemoryCatalog::new();
    let resolver = TypeResolver::new(&catalog, Dialect::Postgres);

    let result = resolver
        .resolve(&ColumnInfo::new("ARRAY"), &address("ghost"))
        .await;
    assert!(result.is_err());
}
