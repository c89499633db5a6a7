use super::{CatalogAccess, ConnectionConfig};
use crate::db::schema::{ArrayElementInfo, ColumnAddress};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_postgres::{Client, Config as PgConfig, NoTls};

const ENUM_TYPE_QUERY: &str = "\
    SELECT i.udt_name::text \
    FROM pg_catalog.pg_type t \
    JOIN pg_catalog.pg_namespace n ON n.oid = t.typnamespace \
    JOIN pg_catalog.pg_enum e ON t.oid = e.enumtypid \
    LEFT JOIN information_schema.columns i ON t.typname = i.udt_name \
    WHERE i.column_name::text = $1::text OR t.typname::text = $1::text \
    GROUP BY i.udt_name";

const ARRAY_ELEMENT_QUERY: &str = "\
    SELECT e.udt_name::text AS udt_name, \
      ((CASE WHEN e.udt_name = 'hstore' THEN e.udt_name ELSE e.data_type END) \
        || (CASE WHEN e.character_maximum_length IS NOT NULL \
          THEN '(' || e.character_maximum_length || ')' ELSE '' END))::text AS raw_type, \
      (SELECT array_agg(en.enumlabel ORDER BY en.enumsortorder) \
        FROM pg_catalog.pg_type t \
        JOIN pg_catalog.pg_enum en ON t.oid = en.enumtypid \
        WHERE t.typname = e.udt_name)::text AS special \
    FROM information_schema.columns c \
    LEFT JOIN information_schema.element_types e \
      ON ((c.table_catalog, c.table_schema, c.table_name, 'TABLE', c.dtd_identifier) \
        = (e.object_catalog, e.object_schema, e.object_name, e.object_type, e.collection_type_identifier)) \
    WHERE c.table_schema::text = $1::text \
      AND c.table_name::text = $2::text \
      AND c.column_name::text = $3::text";

/// PostgreSQL catalog using tokio-postgres
///
/// Lookups only take the read lock; connect and disconnect take the write lock.
pub struct PostgresCatalog {
    config: ConnectionConfig,
    client: RwLock<Option<Client>>,
}

impl PostgresCatalog {
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            client: RwLock::new(None),
        }
    }

    /// Build a tokio-postgres Config from our ConnectionConfig
    fn build_pg_config(&self) -> anyhow::Result<PgConfig> {
        let mut pg_config = match self.config.connection_string {
            Some(ref conn_str) => conn_str
                .parse::<PgConfig>()
                .context("Failed to parse PostgreSQL connection string")?,
            None => {
                let mut pg_config = PgConfig::new();
                pg_config.host(self.config.host.as_deref().unwrap_or("localhost"));
                pg_config.port(self.config.port.unwrap_or(5432));
                if let Some(ref db) = self.config.database {
                    pg_config.dbname(db);
                }
                if let Some(ref user) = self.config.username {
                    pg_config.user(user);
                }
                if let Some(ref pass) = self.config.password {
                    pg_config.password(pass);
                }
                pg_config
            }
        };
        pg_config.connect_timeout(Duration::from_secs(self.config.connection_timeout_secs));
        Ok(pg_config)
    }

    pub async fn connect(&self) -> anyhow::Result<()> {
        let pg_config = self.build_pg_config()?;
        let (client, connection) = pg_config
            .connect(NoTls)
            .await
            .context("PostgreSQL connection/authentication failed")?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                log::error!("PostgreSQL connection closed with error: {}", e);
            }
        });

        log::info!(
            "Connected to PostgreSQL catalog {}",
            self.config.database.as_deref().unwrap_or("(default database)")
        );
        *self.client.write().await = Some(client);
        Ok(())
    }

    pub async fn disconnect(&self) -> anyhow::Result<()> {
        *self.client.write().await = None;
        Ok(())
    }

    pub async fn is_connected(&self) -> bool {
        self.client.read().await.is_some()
    }
}

#[async_trait]
impl CatalogAccess for PostgresCatalog {
    async fn is_enum_type(&self, name: &str) -> anyhow::Result<bool> {
        let guard = self.client.read().await;
        let client = guard
            .as_ref()
            .ok_or_else(|| anyhow!("Not connected to PostgreSQL"))?;

        let rows = client
            .query(ENUM_TYPE_QUERY, &[&name])
            .await
            .with_context(|| format!("Failed to look up enum type for {}", name))?;
        log::debug!("Enum lookup for {} matched {} row(s)", name, rows.len());
        Ok(!rows.is_empty())
    }

    async fn array_element(&self, address: &ColumnAddress) -> anyhow::Result<ArrayElementInfo> {
        let guard = self.client.read().await;
        let client = guard
            .as_ref()
            .ok_or_else(|| anyhow!("Not connected to PostgreSQL"))?;

        let row = client
            .query_opt(
                ARRAY_ELEMENT_QUERY,
                &[&address.schema, &address.table, &address.column_name],
            )
            .await
            .with_context(|| format!("Failed to look up array element type of {}", address))?
            .ok_or_else(|| anyhow!("Column {} not found in catalog", address))?;

        let udt_name: Option<String> = row.try_get("udt_name")?;
        let raw_type: Option<String> = row.try_get("raw_type")?;
        let special: Option<String> = row.try_get("special")?;

        match (udt_name, raw_type) {
            (Some(udt_name), Some(raw_type)) => Ok(ArrayElementInfo {
                udt_name,
                raw_type,
                special_values: special.as_deref().map(parse_array_literal).unwrap_or_default(),
            }),
            _ => Err(anyhow!("Column {} has no array element type", address)),
        }
    }
}

/// Split a PostgreSQL array literal such as `{red,"light blue"}` into its elements.
pub fn parse_array_literal(literal: &str) -> Vec<String> {
    let trimmed = literal.trim();
    let inner = trimmed
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .unwrap_or(trimmed);
    if inner.is_empty() {
        return Vec::new();
    }

    let mut values = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = inner.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => values.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    values.push(current);
    values
}
