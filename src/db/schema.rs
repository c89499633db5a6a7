use serde::{Deserialize, Serialize};

/// A column as reported by catalog introspection
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnInfo {
    /// Dialect-native type name, possibly with a length/precision suffix (e.g. `VARCHAR(255)`)
    pub raw_type: String,
    /// Enum labels or element labels, in catalog order
    #[serde(default)]
    pub special_values: Vec<String>,
    /// Catalog type name of the element, set when this column describes an array element
    #[serde(default)]
    pub element_type_name: Option<String>,
}

impl ColumnInfo {
    pub fn new(raw_type: impl Into<String>) -> Self {
        Self {
            raw_type: raw_type.into(),
            ..Default::default()
        }
    }

    pub fn with_special_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.special_values = values.into_iter().map(Into::into).collect();
        self
    }
}

/// Identifies a column for catalog lookups
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ColumnAddress {
    pub schema: String,
    pub table: String,
    pub column_name: String,
}

impl ColumnAddress {
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        column_name: impl Into<String>,
    ) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            column_name: column_name.into(),
        }
    }

    /// Same schema and table, different column identifier.
    ///
    /// Array elements are looked up again under their catalog type name, so
    /// nested resolution swaps the column name for the element's `udt_name`.
    pub fn with_column(&self, column_name: impl Into<String>) -> Self {
        Self {
            schema: self.schema.clone(),
            table: self.table.clone(),
            column_name: column_name.into(),
        }
    }
}

impl std::fmt::Display for ColumnAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.schema, self.table, self.column_name)
    }
}

/// Element type of an array column, as returned by the array element lookup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArrayElementInfo {
    pub udt_name: String,
    pub raw_type: String,
    #[serde(default)]
    pub special_values: Vec<String>,
}

impl From<ArrayElementInfo> for ColumnInfo {
    fn from(element: ArrayElementInfo) -> Self {
        ColumnInfo {
            raw_type: element.raw_type,
            special_values: element.special_values,
            element_type_name: Some(element.udt_name),
        }
    }
}
