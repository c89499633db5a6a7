pub mod memory;
pub mod postgres;

use crate::db::schema::{ArrayElementInfo, ColumnAddress};
use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Supported catalog dialects
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Dialect {
    #[serde(rename = "postgres", alias = "postgresql")]
    Postgres,
    #[serde(rename = "mysql", alias = "mariadb")]
    MySql,
    #[serde(rename = "mssql", alias = "sqlserver")]
    SqlServer,
}

impl Dialect {
    /// Parse a dialect name as found in connection settings.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Some(Dialect::Postgres),
            "mysql" | "mariadb" => Some(Dialect::MySql),
            "mssql" | "sqlserver" | "tedious" => Some(Dialect::SqlServer),
            _ => None,
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dialect::Postgres => write!(f, "PostgreSQL"),
            Dialect::MySql => write!(f, "MySQL"),
            Dialect::SqlServer => write!(f, "SQL Server"),
        }
    }
}

fn default_schema() -> String {
    "public".to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Connection configuration for a catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub dialect: Dialect,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub connection_string: Option<String>,
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default = "default_timeout")]
    pub connection_timeout_secs: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::Postgres,
            host: None,
            port: None,
            database: None,
            username: None,
            password: None,
            connection_string: None,
            schema: default_schema(),
            connection_timeout_secs: default_timeout(),
        }
    }
}

impl ConnectionConfig {
    /// Load a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read connection config {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse connection config {}", path.display()))
    }
}

/// Read-only catalog lookups the type resolver depends on
#[async_trait]
pub trait CatalogAccess: Send + Sync {
    /// True if a catalog enum type is named `name`, or backs a column named `name`
    async fn is_enum_type(&self, name: &str) -> anyhow::Result<bool>;

    /// Element type descriptor of the array column at `address`
    async fn array_element(&self, address: &ColumnAddress) -> anyhow::Result<ArrayElementInfo>;
}
