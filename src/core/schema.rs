//! Runtime type descriptor for record types
//!
//! A [`Schema`] is the table of named field and association accessors a
//! [`Resource`] registers in `describe`. The importer, exporter and store
//! adapters address record fields through it by logical name (`"ID"`) or by
//! DB-style column name (`"id"`).

use crate::core::coerce::{set_value_from_string, Field, Kind};
use crate::core::traits::Resource;
use crate::types::{CoercionError, ExchangeError, Meta};
use std::fmt;

type SetFn<R> = Box<dyn Fn(&mut R, &str) -> Result<(), CoercionError> + Send + Sync>;
type FormatFn<R> = Box<dyn Fn(&R) -> String + Send + Sync>;
type ClearFn<R> = Box<dyn Fn(&mut R) + Send + Sync>;
type CopyFn<R> = Box<dyn Fn(&mut R, &R) + Send + Sync>;

/// Named accessor for one scalar field of a record
pub struct FieldAccessor<R> {
    name: String,
    column: String,
    kind: Kind,
    set: SetFn<R>,
    format: FormatFn<R>,
}

impl<R> FieldAccessor<R> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// DB-style column name derived from the field name
    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Assign a raw string with the default coercion rules
    pub fn set(&self, record: &mut R, raw: &str) -> Result<(), CoercionError> {
        (self.set)(record, raw)
    }

    /// Stringify the field with the default formatting rules
    pub fn format(&self, record: &R) -> String {
        (self.format)(record)
    }
}

/// Named accessor for an associated sub-record (or list of them)
pub struct AssociationAccessor<R> {
    name: String,
    clear: ClearFn<R>,
    copy: CopyFn<R>,
}

impl<R> AssociationAccessor<R> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reset the association to its empty value
    pub fn clear(&self, record: &mut R) {
        (self.clear)(record)
    }

    /// Overwrite the association on `target` with the one on `source`
    pub fn copy_from(&self, target: &mut R, source: &R) {
        (self.copy)(target, source)
    }
}

/// Field and association table of a record type
pub struct Schema<R> {
    fields: Vec<FieldAccessor<R>>,
    associations: Vec<AssociationAccessor<R>>,
}

impl<R: Resource> Schema<R> {
    /// Build the schema of a resource type
    pub fn of() -> Self {
        let mut schema = Schema::empty();
        R::describe(&mut schema);
        schema
    }
}

impl<R: 'static> Schema<R> {
    /// Create a schema with no fields
    pub fn empty() -> Self {
        Schema {
            fields: Vec::new(),
            associations: Vec::new(),
        }
    }

    /// Register a field under a logical name
    ///
    /// # Examples
    ///
    /// ```
    /// use record_exchange::{Resource, Schema};
    ///
    /// #[derive(Debug, Clone, Default, PartialEq)]
    /// struct Person {
    ///     id: u64,
    ///     age: Option<i32>,
    /// }
    ///
    /// impl Resource for Person {
    ///     fn describe(schema: &mut Schema<Self>) {
    ///         schema
    ///             .field("ID", |p| &p.id, |p| &mut p.id)
    ///             .field("Age", |p| &p.age, |p| &mut p.age);
    ///     }
    /// }
    ///
    /// let schema = Schema::<Person>::of();
    /// assert_eq!(schema.field_named("ID").unwrap().column(), "id");
    /// ```
    pub fn field<T: Field>(
        &mut self,
        name: &str,
        get: fn(&R) -> &T,
        get_mut: fn(&mut R) -> &mut T,
    ) -> &mut Self {
        self.fields.push(FieldAccessor {
            name: name.to_string(),
            column: to_snake_case(name),
            kind: T::kind(),
            set: Box::new(move |record, raw| set_value_from_string(get_mut(record), raw)),
            format: Box::new(move |record| get(record).format_value()),
        });
        self
    }

    /// Register an association that stores can preload and save
    pub fn association<T: Clone + Default + 'static>(
        &mut self,
        name: &str,
        get: fn(&R) -> &T,
        get_mut: fn(&mut R) -> &mut T,
    ) -> &mut Self {
        self.associations.push(AssociationAccessor {
            name: name.to_string(),
            clear: Box::new(move |record| *get_mut(record) = T::default()),
            copy: Box::new(move |target, source| *get_mut(target) = get(source).clone()),
        });
        self
    }
}

impl<R> Schema<R> {
    pub fn field_named(&self, name: &str) -> Option<&FieldAccessor<R>> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_by_column(&self, column: &str) -> Option<&FieldAccessor<R>> {
        self.fields.iter().find(|f| f.column == column)
    }

    pub fn association_named(&self, name: &str) -> Option<&AssociationAccessor<R>> {
        self.associations.iter().find(|a| a.name == name)
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldAccessor<R>> {
        self.fields.iter()
    }

    pub fn associations(&self) -> impl Iterator<Item = &AssociationAccessor<R>> {
        self.associations.iter()
    }

    /// Number of scalar fields, i.e. bound parameters per written record
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Validate a meta set against this schema
    ///
    /// Returns the indices of the primary-key metas in declaration order.
    /// Primary-key metas are optional; without them every imported row is
    /// created as a new record.
    pub fn validate_metas(
        &self,
        metas: &[Meta<R>],
        associations: &[String],
    ) -> Result<Vec<usize>, ExchangeError> {
        if metas.is_empty() {
            return Err(ExchangeError::NoMetas);
        }

        let mut primary_keys = Vec::new();
        for (i, meta) in metas.iter().enumerate() {
            if meta.field().is_empty() {
                return Err(ExchangeError::EmptyField);
            }
            if !meta.has_setter() && !meta.has_valuer() && self.field_named(meta.field()).is_none()
            {
                return Err(ExchangeError::field_not_found(meta.field()));
            }
            if meta.column_header().is_empty() {
                return Err(ExchangeError::EmptyHeader);
            }
            if meta.is_primary_key() {
                if meta.has_setter() || meta.has_valuer() {
                    return Err(ExchangeError::PrimaryKeySetter {
                        field: meta.field().to_string(),
                    });
                }
                primary_keys.push(i);
            }
        }

        if let Some(unknown) = associations
            .iter()
            .find(|a| self.association_named(a).is_none())
        {
            return Err(ExchangeError::AssociationNotFound {
                name: unknown.clone(),
            });
        }

        Ok(primary_keys)
    }
}

impl<R> fmt::Debug for Schema<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field(
                "fields",
                &self.fields.iter().map(|a| &a.name).collect::<Vec<_>>(),
            )
            .field(
                "associations",
                &self.associations.iter().map(|a| &a.name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Convert a field name to its DB-style column name
///
/// Acronym runs stay together: `ID -> id`, `UserID -> user_id`,
/// `HTTPServer -> http_server`.
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                let prev = chars[i - 1];
                let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
                if prev.is_lowercase()
                    || prev.is_ascii_digit()
                    || (prev.is_uppercase() && next_is_lower)
                {
                    out.push('_');
                }
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixtures::{Person, User};
    use rstest::rstest;

    #[rstest]
    #[case("ID", "id")]
    #[case("Name", "name")]
    #[case("UserID", "user_id")]
    #[case("ReleaseDate", "release_date")]
    #[case("HTTPServer", "http_server")]
    #[case("Name2", "name2")]
    #[case("5G", "5_g")]
    #[case("already_snake", "already_snake")]
    #[case("Screen_Size", "screen_size")]
    fn test_to_snake_case(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(to_snake_case(name), expected);
    }

    #[test]
    fn test_schema_lookup() {
        let schema = Schema::<Person>::of();

        assert_eq!(schema.field_count(), 4);
        assert_eq!(schema.field_named("Age").unwrap().kind(), Kind::Pointer);
        assert_eq!(schema.field_by_column("id").unwrap().name(), "ID");
        assert!(schema.field_named("Missing").is_none());
        assert!(schema.association_named("Hobbies").is_none());
    }

    #[test]
    fn test_field_accessor_set_and_format() {
        let schema = Schema::<Person>::of();
        let age = schema.field_named("Age").unwrap();

        let mut person = Person::default();
        age.set(&mut person, "6").unwrap();
        assert_eq!(person.age, Some(6));
        assert_eq!(age.format(&person), "6");

        age.set(&mut person, "").unwrap();
        assert_eq!(person.age, None);
        assert_eq!(age.format(&person), "");
    }

    #[test]
    fn test_association_accessor() {
        let schema = Schema::<User>::of();
        let hobbies = schema.association_named("Hobbies").unwrap();

        let mut source = User::default();
        source.hobbies.push(crate::core::fixtures::Hobby::named("Running"));
        let mut target = User::default();

        hobbies.copy_from(&mut target, &source);
        assert_eq!(target.hobbies, source.hobbies);

        hobbies.clear(&mut target);
        assert!(target.hobbies.is_empty());
    }

    #[rstest]
    #[case::no_metas(vec![], vec![], ExchangeError::NoMetas)]
    #[case::empty_field(vec![Meta::new("")], vec![], ExchangeError::EmptyField)]
    #[case::empty_header(vec![Meta::new("Name").header("")], vec![], ExchangeError::EmptyHeader)]
    #[case::unknown_field(
        vec![Meta::new("Nickname")],
        vec![],
        ExchangeError::field_not_found("Nickname")
    )]
    #[case::primary_key_with_setter(
        vec![Meta::new("ID").primary_key(true).setter(|_: &mut Person, _, _| Ok(()))],
        vec![],
        ExchangeError::PrimaryKeySetter { field: "ID".to_string() }
    )]
    #[case::unknown_association(
        vec![Meta::new("ID")],
        vec!["Hobbies".to_string()],
        ExchangeError::AssociationNotFound { name: "Hobbies".to_string() }
    )]
    fn test_validate_metas_errors(
        #[case] metas: Vec<Meta<Person>>,
        #[case] associations: Vec<String>,
        #[case] expected: ExchangeError,
    ) {
        let schema = Schema::<Person>::of();
        assert_eq!(schema.validate_metas(&metas, &associations), Err(expected));
    }

    #[test]
    fn test_validate_metas_primary_keys() {
        let schema = Schema::<Person>::of();
        let metas = vec![
            Meta::new("Name"),
            Meta::new("ID").primary_key(true),
            Meta::new("Nickname").setter(|_: &mut Person, _, _| Ok(())),
            Meta::new("Age").primary_key(true),
        ];

        assert_eq!(schema.validate_metas(&metas, &[]), Ok(vec![1, 3]));
    }

    #[test]
    fn test_validate_metas_without_primary_key_is_allowed() {
        let schema = Schema::<Person>::of();
        assert_eq!(schema.validate_metas(&[Meta::new("Name")], &[]), Ok(vec![]));
    }
}
