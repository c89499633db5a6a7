use super::CatalogAccess;
use crate::db::schema::{ArrayElementInfo, ColumnAddress};
use anyhow::anyhow;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Catalog backed by in-process tables.
///
/// Useful for dialects that never need lookups and for driving the
/// resolver without a live database.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    enum_names: HashSet<String>,
    array_elements: HashMap<ColumnAddress, ArrayElementInfo>,
    failure: Option<String>,
    lookups: AtomicUsize,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a name the enum lookup answers `true` for.
    pub fn with_enum(mut self, name: impl Into<String>) -> Self {
        self.enum_names.insert(name.into());
        self
    }

    /// Register the element type reported for an array column.
    pub fn with_array_element(mut self, address: ColumnAddress, element: ArrayElementInfo) -> Self {
        self.array_elements.insert(address, element);
        self
    }

    /// Make every lookup fail with `message`.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Number of lookups served so far, failed ones included.
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn record(&self) -> anyhow::Result<()> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(message) => Err(anyhow!("{}", message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CatalogAccess for InMemoryCatalog {
    async fn is_enum_type(&self, name: &str) -> anyhow::Result<bool> {
        self.record()?;
        Ok(self.enum_names.contains(name))
    }

    async fn array_element(&self, address: &ColumnAddress) -> anyhow::Result<ArrayElementInfo> {
        self.record()?;
        self.array_elements
            .get(address)
            .cloned()
            .ok_or_else(|| anyhow!("Column {} not found in catalog", address))
    }
}
