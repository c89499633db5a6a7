use super::connectors::{CatalogAccess, Dialect};
use super::schema::{ColumnAddress, ColumnInfo};
use futures_util::future::{BoxFuture, FutureExt};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Canonical scalar types understood by the model generator
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Boolean,
    String,
    Uuid,
    Jsonb,
    Integer,
    BigInt,
    Float,
    Double,
    Date,
    Time,
    Inet,
}

impl ScalarType {
    pub fn tag(&self) -> &'static str {
        match self {
            ScalarType::Boolean => "BOOLEAN",
            ScalarType::String => "STRING",
            ScalarType::Uuid => "UUID",
            ScalarType::Jsonb => "JSONB",
            ScalarType::Integer => "INTEGER",
            ScalarType::BigInt => "BIGINT",
            ScalarType::Float => "FLOAT",
            ScalarType::Double => "DOUBLE",
            ScalarType::Date => "DATE",
            ScalarType::Time => "TIME",
            ScalarType::Inet => "INET",
        }
    }
}

impl std::fmt::Display for ScalarType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Result of resolving one column
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ResolvedType {
    Scalar(ScalarType),
    /// Catalog-backed enum, labels in catalog order
    Enum(Vec<String>),
    /// Raw type that is already an embeddable expression (MySQL `ENUM(...)`)
    Literal(String),
    Array(Box<ResolvedType>),
    Unresolved,
}

impl ResolvedType {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, ResolvedType::Unresolved)
    }

    /// The token embedded into generated model source, `None` when unresolved.
    pub fn expression(&self) -> Option<String> {
        match self {
            ResolvedType::Scalar(scalar) => Some(scalar.tag().to_string()),
            ResolvedType::Enum(labels) => Some(enum_expression(labels)),
            ResolvedType::Literal(raw) => Some(raw.clone()),
            ResolvedType::Array(inner) => inner
                .expression()
                .map(|inner| format!("ARRAY(DataTypes.{})", inner)),
            ResolvedType::Unresolved => None,
        }
    }
}

fn enum_expression(labels: &[String]) -> String {
    let mut expr = String::from("ENUM(\n");
    for label in labels {
        expr.push_str("        '");
        expr.push_str(&escape_label(label));
        expr.push_str("',\n");
    }
    expr.push_str("      )");
    expr
}

fn escape_label(label: &str) -> String {
    let mut escaped = String::with_capacity(label.len());
    for c in label.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            c if c.is_control() => escaped.push_str(&format!("\\u{{{:04x}}}", c as u32)),
            c => escaped.push(c),
        }
    }
    escaped
}

/// What a matched rule asks the resolver to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOutcome {
    Scalar(ScalarType),
    /// Enum when the catalog confirms it, STRING otherwise
    UserDefined,
    /// Raw type passes through unchanged
    Passthrough,
    /// Resolve the element type and wrap it
    Array,
}

enum Matcher {
    Literal(&'static str),
    /// Literal that only applies under one dialect
    DialectLiteral(Dialect, &'static str),
    Pattern(Regex),
}

impl Matcher {
    fn matches(&self, raw_type: &str, dialect: Dialect) -> bool {
        match self {
            Matcher::Literal(name) => raw_type.eq_ignore_ascii_case(name),
            Matcher::DialectLiteral(only, name) => {
                *only == dialect && raw_type.eq_ignore_ascii_case(name)
            }
            Matcher::Pattern(re) => re.is_match(raw_type),
        }
    }
}

fn pattern(re: &str) -> Matcher {
    Matcher::Pattern(Regex::new(&format!("(?i){}", re)).expect("type pattern must compile"))
}

struct TypeRule {
    matchers: Vec<Matcher>,
    outcome: RuleOutcome,
}

impl TypeRule {
    fn new(outcome: RuleOutcome, matchers: Vec<Matcher>) -> Self {
        Self { matchers, outcome }
    }
}

// First match wins; order matters.
static RULES: Lazy<Vec<TypeRule>> = Lazy::new(|| {
    use Matcher::{DialectLiteral, Literal};
    use RuleOutcome::*;

    vec![
        TypeRule::new(
            Scalar(ScalarType::Boolean),
            vec![
                DialectLiteral(Dialect::MySql, "BIT(1)"),
                Literal("BIT"),
                Literal("BOOLEAN"),
            ],
        ),
        TypeRule::new(
            Scalar(ScalarType::String),
            vec![
                Literal("CHARACTER VARYING"),
                Literal("TEXT"),
                Literal("NTEXT"),
                pattern("TEXT.*"),
                pattern("VARCHAR.*"),
                pattern("CHAR.*"),
                Literal("NVARCHAR"),
            ],
        ),
        TypeRule::new(UserDefined, vec![Literal("USER-DEFINED")]),
        TypeRule::new(Passthrough, vec![pattern(r"ENUM\((.*)\)")]),
        TypeRule::new(
            Scalar(ScalarType::Uuid),
            vec![Literal("UNIQUEIDENTIFIER"), Literal("UUID")],
        ),
        TypeRule::new(Scalar(ScalarType::Jsonb), vec![Literal("JSONB")]),
        TypeRule::new(
            Scalar(ScalarType::Integer),
            vec![
                Literal("INTEGER"),
                Literal("SERIAL"),
                Literal("BIGSERIAL"),
                pattern("^INT.*"),
                pattern("^SMALLINT.*"),
                pattern("^TINYINT.*"),
            ],
        ),
        TypeRule::new(Scalar(ScalarType::BigInt), vec![pattern("^BIGINT.*")]),
        TypeRule::new(Scalar(ScalarType::Float), vec![pattern("FLOAT.*")]),
        TypeRule::new(
            Scalar(ScalarType::Double),
            vec![
                Literal("NUMERIC"),
                Literal("DECIMAL"),
                Literal("REAL"),
                Literal("DOUBLE"),
                Literal("DOUBLE PRECISION"),
                pattern("DECIMAL.*"),
                Literal("MONEY"),
            ],
        ),
        TypeRule::new(
            Scalar(ScalarType::Date),
            vec![Literal("DATE"), Literal("DATETIME"), pattern("^TIMESTAMP.*")],
        ),
        TypeRule::new(
            Scalar(ScalarType::Time),
            vec![Literal("TIME"), Literal("TIME WITHOUT TIME ZONE")],
        ),
        TypeRule::new(Array, vec![Literal("ARRAY")]),
        TypeRule::new(Scalar(ScalarType::Inet), vec![Literal("INET")]),
    ]
});

/// Match a raw catalog type against the rule table.
///
/// Pure and synchronous: no catalog access happens here. `None` means no
/// rule applies and the column is unresolved.
pub fn classify(raw_type: &str, dialect: Dialect) -> Option<RuleOutcome> {
    let raw_type = raw_type.trim();
    RULES
        .iter()
        .find(|rule| rule.matchers.iter().any(|m| m.matches(raw_type, dialect)))
        .map(|rule| rule.outcome)
}

/// A raw type no rule could map
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnhandledType {
    pub raw_type: String,
    pub column_name: String,
}

impl std::fmt::Display for UnhandledType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Type {} is not handled: The column {} won't be generated. If you need it please create it manually.",
            self.raw_type, self.column_name
        )
    }
}

/// Receives diagnostics emitted during resolution
pub trait DiagnosticSink: Send + Sync {
    fn unhandled_type(&self, diagnostic: &UnhandledType);
}

/// Forwards diagnostics to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn unhandled_type(&self, diagnostic: &UnhandledType) {
        log::warn!("{}", diagnostic);
    }
}

/// Keeps diagnostics in memory
#[derive(Debug, Default)]
pub struct RecordingSink {
    entries: Mutex<Vec<UnhandledType>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<UnhandledType> {
        let entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.clone()
    }
}

impl DiagnosticSink for RecordingSink {
    fn unhandled_type(&self, diagnostic: &UnhandledType) {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.push(diagnostic.clone());
    }
}

static LOG_SINK: LogSink = LogSink;

/// Resolver settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ResolverOptions {
    /// Emit a diagnostic for every unresolved column
    pub allow_warning: bool,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            allow_warning: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("Catalog lookup failed for column {column}: {source}")]
    Lookup {
        column: String,
        source: anyhow::Error,
    },
}

impl ResolveError {
    fn lookup(address: &ColumnAddress, source: anyhow::Error) -> Self {
        ResolveError::Lookup {
            column: address.to_string(),
            source,
        }
    }
}

/// Maps catalog column metadata to canonical model types.
///
/// Holds no state of its own; one resolver can serve any number of columns,
/// concurrently or not.
pub struct TypeResolver<'a> {
    catalog: &'a dyn CatalogAccess,
    dialect: Dialect,
    options: ResolverOptions,
    sink: &'a dyn DiagnosticSink,
}

impl<'a> TypeResolver<'a> {
    pub fn new(catalog: &'a dyn CatalogAccess, dialect: Dialect) -> Self {
        Self {
            catalog,
            dialect,
            options: ResolverOptions::default(),
            sink: &LOG_SINK,
        }
    }

    pub fn with_options(mut self, options: ResolverOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_sink(mut self, sink: &'a dyn DiagnosticSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Resolve the column at `address`.
    ///
    /// Unmapped types come back as [`ResolvedType::Unresolved`]; only a
    /// failing catalog lookup produces an error.
    pub fn resolve<'r>(
        &'r self,
        column: &'r ColumnInfo,
        address: &'r ColumnAddress,
    ) -> BoxFuture<'r, Result<ResolvedType, ResolveError>> {
        self.resolve_as(column, address, &address.column_name)
    }

    /// Diagnostics name `reported_column`, the column the generator will skip,
    /// even when `address` points at a nested array element.
    fn resolve_as<'r>(
        &'r self,
        column: &'r ColumnInfo,
        address: &'r ColumnAddress,
        reported_column: &'r str,
    ) -> BoxFuture<'r, Result<ResolvedType, ResolveError>> {
        async move {
            let outcome = match classify(&column.raw_type, self.dialect) {
                Some(outcome) => outcome,
                None => {
                    self.warn_unhandled(column, reported_column);
                    return Ok(ResolvedType::Unresolved);
                }
            };

            match outcome {
                RuleOutcome::Scalar(scalar) => Ok(ResolvedType::Scalar(scalar)),
                RuleOutcome::Passthrough => Ok(ResolvedType::Literal(column.raw_type.clone())),
                RuleOutcome::UserDefined => self.resolve_user_defined(column, address).await,
                RuleOutcome::Array => self.resolve_array(address, reported_column).await,
            }
        }
        .boxed()
    }

    async fn resolve_user_defined(
        &self,
        column: &ColumnInfo,
        address: &ColumnAddress,
    ) -> Result<ResolvedType, ResolveError> {
        if self.dialect != Dialect::Postgres {
            return Ok(ResolvedType::Scalar(ScalarType::String));
        }

        let is_enum = self
            .catalog
            .is_enum_type(&address.column_name)
            .await
            .map_err(|e| ResolveError::lookup(address, e))?;

        if is_enum {
            Ok(ResolvedType::Enum(column.special_values.clone()))
        } else {
            Ok(ResolvedType::Scalar(ScalarType::String))
        }
    }

    async fn resolve_array(
        &self,
        address: &ColumnAddress,
        reported_column: &str,
    ) -> Result<ResolvedType, ResolveError> {
        if self.dialect != Dialect::Postgres {
            return Ok(ResolvedType::Unresolved);
        }

        let element = self
            .catalog
            .array_element(address)
            .await
            .map_err(|e| ResolveError::lookup(address, e))?;
        log::debug!(
            "Array column {} has element type {} ({})",
            address,
            element.udt_name,
            element.raw_type
        );

        let element_address = address.with_column(element.udt_name.clone());
        let element_info = ColumnInfo::from(element);

        match self
            .resolve_as(&element_info, &element_address, reported_column)
            .await?
        {
            ResolvedType::Unresolved => Ok(ResolvedType::Unresolved),
            inner => Ok(ResolvedType::Array(Box::new(inner))),
        }
    }

    fn warn_unhandled(&self, column: &ColumnInfo, column_name: &str) {
        if !self.options.allow_warning {
            return;
        }
        self.sink.unhandled_type(&UnhandledType {
            raw_type: column.raw_type.clone(),
            column_name: column_name.to_string(),
        });
    }
}
