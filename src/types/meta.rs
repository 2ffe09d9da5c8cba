//! Column descriptors and decoded row values
//!
//! A [`Meta`] binds one logical field of a record type to one tabular column.
//! [`MetaValues`] is one decoded row, keyed by field name.

use super::error::BoxError;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Custom assignment of a raw cell value onto a record
///
/// Receives the target record, the raw value of the meta's own field and the
/// whole decoded row.
pub type Setter<R> = Arc<dyn Fn(&mut R, &str, &MetaValues) -> Result<(), BoxError> + Send + Sync>;

/// Custom stringification of a record for export
pub type Valuer<R> = Arc<dyn Fn(&R) -> Result<String, BoxError> + Send + Sync>;

/// Row level validator run during import decoding
pub type Validator = Arc<dyn Fn(&MetaValues) -> Result<(), BoxError> + Send + Sync>;

/// One decoded row, exposed as `field name -> raw value`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaValues {
    values: HashMap<String, String>,
}

impl MetaValues {
    /// Create an empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw value of a field, or `""` when the field is absent
    pub fn get(&self, field: &str) -> &str {
        self.values.get(field).map(String::as_str).unwrap_or("")
    }

    /// Set the raw value of a field, replacing any previous value
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.values.insert(field.into(), value.into());
    }

    /// Whether the row carries a value for the field
    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    /// Number of fields in the row
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the row has no fields
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MetaValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = MetaValues::new();
        for (field, value) in iter {
            values.set(field, value);
        }
        values
    }
}

/// Declarative binding of one record field to one tabular column
///
/// Built with [`Meta::new`] and configured through the consuming builder
/// methods before the meta is handed to an importer or exporter.
///
/// # Examples
///
/// ```
/// use record_exchange::Meta;
///
/// #[derive(Debug, Clone, Default, PartialEq)]
/// struct Person {
///     id: u64,
///     name: String,
/// }
///
/// let id: Meta<Person> = Meta::new("ID").primary_key(true);
/// let name: Meta<Person> = Meta::new("Name").header("Full name");
///
/// assert_eq!(id.column_header(), "ID");
/// assert_eq!(name.column_header(), "Full name");
/// ```
pub struct Meta<R> {
    field: String,
    column_header: String,
    primary_key: bool,
    setter: Option<Setter<R>>,
    valuer: Option<Valuer<R>>,
}

impl<R> Meta<R> {
    /// Create a meta for a field; the column header defaults to the field name
    pub fn new(field: impl Into<String>) -> Self {
        let field = field.into();
        Meta {
            column_header: field.clone(),
            field,
            primary_key: false,
            setter: None,
            valuer: None,
        }
    }

    /// Override the tabular column label
    pub fn header(mut self, header: impl Into<String>) -> Self {
        self.column_header = header.into();
        self
    }

    /// Mark the meta as part of the record identity
    pub fn primary_key(mut self, primary_key: bool) -> Self {
        self.primary_key = primary_key;
        self
    }

    /// Replace default coercion with a custom setter
    pub fn setter<F>(mut self, setter: F) -> Self
    where
        F: Fn(&mut R, &str, &MetaValues) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.setter = Some(Arc::new(setter));
        self
    }

    /// Replace default stringification with a custom valuer
    pub fn valuer<F>(mut self, valuer: F) -> Self
    where
        F: Fn(&R) -> Result<String, BoxError> + Send + Sync + 'static,
    {
        self.valuer = Some(Arc::new(valuer));
        self
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn column_header(&self) -> &str {
        &self.column_header
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn has_setter(&self) -> bool {
        self.setter.is_some()
    }

    pub fn has_valuer(&self) -> bool {
        self.valuer.is_some()
    }

    pub(crate) fn setter_fn(&self) -> Option<&Setter<R>> {
        self.setter.as_ref()
    }

    pub(crate) fn valuer_fn(&self) -> Option<&Valuer<R>> {
        self.valuer.as_ref()
    }
}

impl<R> Clone for Meta<R> {
    fn clone(&self) -> Self {
        Meta {
            field: self.field.clone(),
            column_header: self.column_header.clone(),
            primary_key: self.primary_key,
            setter: self.setter.clone(),
            valuer: self.valuer.clone(),
        }
    }
}

impl<R> fmt::Debug for Meta<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Meta")
            .field("field", &self.field)
            .field("column_header", &self.column_header)
            .field("primary_key", &self.primary_key)
            .field("setter", &self.setter.is_some())
            .field("valuer", &self.valuer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Row {
        name: String,
    }

    #[test]
    fn test_meta_values_missing_field_reads_empty() {
        let mut values = MetaValues::new();
        values.set("Name", "Tom");

        assert_eq!(values.get("Name"), "Tom");
        assert_eq!(values.get("Age"), "");
        assert!(values.contains("Name"));
        assert!(!values.contains("Age"));
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn test_meta_values_from_iterator_last_wins() {
        let values: MetaValues = [("ID", "1"), ("ID", "2")].into_iter().collect();
        assert_eq!(values.get("ID"), "2");
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn test_meta_defaults() {
        let meta: Meta<Row> = Meta::new("Name");
        assert_eq!(meta.field(), "Name");
        assert_eq!(meta.column_header(), "Name");
        assert!(!meta.is_primary_key());
        assert!(!meta.has_setter());
        assert!(!meta.has_valuer());
    }

    #[test]
    fn test_meta_builder_configures_closures() {
        let meta: Meta<Row> = Meta::new("Name")
            .header("Nameeee")
            .setter(|row: &mut Row, value, _| {
                row.name = value.to_uppercase();
                Ok(())
            })
            .valuer(|row: &Row| Ok(row.name.to_lowercase()));

        assert_eq!(meta.column_header(), "Nameeee");

        let mut row = Row::default();
        let setter = meta.setter_fn().unwrap();
        setter(&mut row, "tom", &MetaValues::new()).unwrap();
        assert_eq!(row.name, "TOM");

        let valuer = meta.valuer_fn().unwrap();
        assert_eq!(valuer(&row).unwrap(), "tom");

        let cloned = meta.clone();
        assert!(cloned.has_setter() && cloned.has_valuer());
    }

    #[test]
    fn test_meta_debug_hides_closures() {
        let meta: Meta<Row> = Meta::new("ID").primary_key(true);
        let debug = format!("{:?}", meta);
        assert!(debug.contains("primary_key: true"));
        assert!(debug.contains("setter: false"));
    }
}
