//! In-memory record store
//!
//! This module provides the MemoryStore component, a [`Store`] adapter that
//! keeps records in a `Vec` in insertion order. It is the reference backend
//! for the importer and exporter and the store used throughout the tests.
//!
//! # Column Addressing
//!
//! Conflict targets and key filters name DB-style columns (`id`, `user_id`).
//! They are resolved through the record type's [`Schema`], and stored values
//! are compared in their default string form.
//!
//! # Associations
//!
//! Associations behave like a relational store with eager loading: a query
//! returns cleared associations unless they are listed in `preload`, and an
//! upsert only writes the associations it is asked to save.

use crate::core::schema::{FieldAccessor, Schema};
use crate::core::traits::{OnConflict, Query, Resource, Store};
use crate::types::ExchangeError;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Vec-backed store for any [`Resource`]
pub struct MemoryStore<R> {
    schema: Schema<R>,
    /// Stored records in insertion order
    records: Vec<R>,
    /// Size of every upsert statement issued so far
    upsert_calls: Vec<usize>,
}

impl<R: Resource> MemoryStore<R> {
    /// Create a new empty store
    pub fn new() -> Self {
        MemoryStore {
            schema: Schema::of(),
            records: Vec::new(),
            upsert_calls: Vec::new(),
        }
    }

    /// Create a store seeded with records
    pub fn with_records(records: impl IntoIterator<Item = R>) -> Self {
        let mut store = Self::new();
        store.records.extend(records);
        store
    }

    /// Append a record without any conflict handling
    pub fn insert(&mut self, record: R) {
        self.records.push(record);
    }

    /// Stored records in insertion order
    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record counts of every upsert statement, in issue order
    pub fn upsert_calls(&self) -> &[usize] {
        &self.upsert_calls
    }

    fn resolve_columns(&self, columns: &[String]) -> Result<Vec<&FieldAccessor<R>>, ExchangeError> {
        columns
            .iter()
            .map(|column| {
                self.schema
                    .field_by_column(column)
                    .ok_or_else(|| ExchangeError::store(format!("unknown column {}", column)))
            })
            .collect()
    }

    fn check_associations(&self, associations: &[String]) -> Result<(), ExchangeError> {
        match associations
            .iter()
            .find(|name| self.schema.association_named(name).is_none())
        {
            Some(name) => Err(ExchangeError::store(format!("unknown association {}", name))),
            None => Ok(()),
        }
    }

    /// Copy of `record` with every association not in `keep` reset
    fn project(&self, record: &R, keep: &[String]) -> R {
        let mut projected = record.clone();
        for association in self.schema.associations() {
            if !keep.iter().any(|name| name == association.name()) {
                association.clear(&mut projected);
            }
        }
        projected
    }
}

fn key_of<R>(accessors: &[&FieldAccessor<R>], record: &R) -> Vec<String> {
    accessors.iter().map(|a| a.format(record)).collect()
}

impl<R: Resource> Default for MemoryStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Resource> Store<R> for MemoryStore<R> {
    fn count(&self) -> Result<usize, ExchangeError> {
        Ok(self.records.len())
    }

    fn find_in_batches(
        &self,
        query: &Query,
        batch_size: usize,
        on_batch: &mut dyn FnMut(Vec<R>) -> Result<(), ExchangeError>,
    ) -> Result<(), ExchangeError> {
        self.check_associations(&query.preload)?;

        let filter = match &query.keys {
            Some(keys) => {
                let accessors = self.resolve_columns(&keys.columns)?;
                let wanted: HashSet<&[String]> = keys.values.iter().map(Vec::as_slice).collect();
                Some((accessors, wanted))
            }
            None => None,
        };

        let batch_size = batch_size.max(1);
        let mut batch = Vec::with_capacity(batch_size.min(self.records.len()));
        for record in &self.records {
            if let Some((accessors, wanted)) = &filter {
                if !wanted.contains(key_of(accessors, record).as_slice()) {
                    continue;
                }
            }

            batch.push(self.project(record, &query.preload));
            if batch.len() == batch_size {
                on_batch(std::mem::take(&mut batch))?;
            }
        }

        if !batch.is_empty() {
            on_batch(batch)?;
        }

        Ok(())
    }

    fn upsert_in_batches(
        &mut self,
        records: Vec<R>,
        on_conflict: &OnConflict,
        associations: &[String],
        batch_size: usize,
    ) -> Result<(), ExchangeError> {
        self.check_associations(associations)?;
        let accessors = self.resolve_columns(&on_conflict.columns)?;

        let mut index: HashMap<Vec<String>, usize> = HashMap::new();
        if !accessors.is_empty() {
            for (i, stored) in self.records.iter().enumerate() {
                index.insert(key_of(&accessors, stored), i);
            }
        }

        let mut writes = Vec::new();
        let mut next_slot = self.records.len();
        let batch_size = batch_size.max(1);
        let mut statements = Vec::new();
        let mut pending = records.into_iter().peekable();
        while pending.peek().is_some() {
            let statement: Vec<R> = pending.by_ref().take(batch_size).collect();
            statements.push(statement.len());

            for record in statement {
                let incoming = self.project(&record, associations);
                let existing = if accessors.is_empty() {
                    next_slot += 1;
                    None
                } else {
                    let key = key_of(&accessors, &incoming);
                    match index.get(&key) {
                        Some(&i) => Some(i),
                        None => {
                            index.insert(key, next_slot);
                            next_slot += 1;
                            None
                        }
                    }
                };
                writes.push((existing, incoming));
            }
        }

        let mut inserted = 0;
        let mut updated = 0;
        for (existing, mut incoming) in writes {
            match existing {
                Some(i) if on_conflict.update_all => {
                    for association in self.schema.associations() {
                        if !associations.iter().any(|name| name == association.name()) {
                            association.copy_from(&mut incoming, &self.records[i]);
                        }
                    }
                    self.records[i] = incoming;
                    updated += 1;
                }
                Some(_) => {}
                None => {
                    self.records.push(incoming);
                    inserted += 1;
                }
            }
        }

        debug!(
            statements = statements.len(),
            inserted, updated, "Upserted records"
        );
        self.upsert_calls.extend(statements);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixtures::{Hobby, Person, Pet, User};
    use crate::core::traits::KeyFilter;

    fn person(id: u64, name: &str) -> Person {
        Person {
            id,
            name: name.to_string(),
            ..Person::default()
        }
    }

    fn collect<R: Resource>(store: &MemoryStore<R>, query: &Query, batch: usize) -> Vec<Vec<R>> {
        let mut batches = Vec::new();
        store
            .find_in_batches(query, batch, &mut |records| {
                batches.push(records);
                Ok(())
            })
            .unwrap();
        batches
    }

    #[test]
    fn test_find_in_batches_chunks_in_insertion_order() {
        let store = MemoryStore::with_records((1..=5).map(|i| person(i, "p")));

        let batches = collect(&store, &Query::all(), 2);
        let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(batches[2][0].id, 5);
    }

    #[test]
    fn test_find_in_batches_key_filter() {
        let store = MemoryStore::with_records(vec![person(1, "Tom"), person(2, "Jerry")]);
        let query = Query::all().with_keys(KeyFilter {
            columns: vec!["id".to_string()],
            values: vec![vec!["2".to_string()], vec!["9".to_string()]],
        });

        let batches = collect(&store, &query, 10);
        assert_eq!(batches, vec![vec![person(2, "Jerry")]]);
    }

    #[test]
    fn test_find_in_batches_callback_error_stops_scan() {
        let store = MemoryStore::with_records((1..=4).map(|i| person(i, "p")));
        let mut calls = 0;

        let result = store.find_in_batches(&Query::all(), 1, &mut |_| {
            calls += 1;
            Err(ExchangeError::store("stop"))
        });

        assert_eq!(result, Err(ExchangeError::store("stop")));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_associations_only_loaded_when_preloaded() {
        let user = User {
            number: "100".to_string(),
            name: "Tom".to_string(),
            hobbies: vec![Hobby::named("Running")],
        };
        let store = MemoryStore::with_records(vec![user.clone()]);

        let plain = collect(&store, &Query::all(), 10);
        assert!(plain[0][0].hobbies.is_empty());

        let preloaded = collect(&store, &Query::all().preload(&["Hobbies".to_string()]), 10);
        assert_eq!(preloaded[0][0], user);
    }

    #[test]
    fn test_upsert_inserts_and_updates_by_conflict_columns() {
        let mut store = MemoryStore::with_records(vec![person(1, "Tom")]);
        let on_conflict = OnConflict {
            columns: vec!["id".to_string()],
            update_all: true,
        };

        store
            .upsert_in_batches(
                vec![person(1, "Tomey"), person(2, "Jerry"), person(3, "Spike")],
                &on_conflict,
                &[],
                2,
            )
            .unwrap();

        assert_eq!(
            store.records(),
            &[person(1, "Tomey"), person(2, "Jerry"), person(3, "Spike")]
        );
        assert_eq!(store.upsert_calls(), &[2, 1]);
    }

    #[test]
    fn test_upsert_composite_conflict_target() {
        let mut store = MemoryStore::<Pet>::new();
        let on_conflict = OnConflict {
            columns: vec!["id".to_string(), "name".to_string()],
            update_all: true,
        };

        store
            .upsert_in_batches(
                vec![Pet::new(1, "Tom", 6), Pet::new(1, "Tom2", 16)],
                &on_conflict,
                &[],
                10,
            )
            .unwrap();
        store
            .upsert_in_batches(vec![Pet::new(1, "Tom", 7)], &on_conflict, &[], 10)
            .unwrap();

        assert_eq!(
            store.records(),
            &[Pet::new(1, "Tom", 7), Pet::new(1, "Tom2", 16)]
        );
    }

    #[test]
    fn test_upsert_without_conflict_columns_inserts() {
        let mut store = MemoryStore::with_records(vec![person(1, "Tom")]);

        store
            .upsert_in_batches(vec![person(1, "Tom")], &OnConflict::default(), &[], 10)
            .unwrap();

        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_upsert_keeps_unsaved_associations() {
        let stored = User {
            number: "100".to_string(),
            name: "Tom".to_string(),
            hobbies: vec![Hobby::named("Running")],
        };
        let mut store = MemoryStore::with_records(vec![stored]);
        let incoming = User {
            number: "100".to_string(),
            name: "Tommy".to_string(),
            hobbies: vec![],
        };
        let on_conflict = OnConflict {
            columns: vec!["number".to_string()],
            update_all: true,
        };

        store
            .upsert_in_batches(vec![incoming], &on_conflict, &[], 10)
            .unwrap();

        assert_eq!(store.records()[0].name, "Tommy");
        assert_eq!(store.records()[0].hobbies, vec![Hobby::named("Running")]);
    }

    #[test]
    fn test_upsert_unknown_column_writes_nothing() {
        let mut store = MemoryStore::<Person>::new();
        let on_conflict = OnConflict {
            columns: vec!["uuid".to_string()],
            update_all: true,
        };

        let result = store.upsert_in_batches(vec![person(1, "Tom")], &on_conflict, &[], 10);

        assert_eq!(result, Err(ExchangeError::store("unknown column uuid")));
        assert!(store.is_empty());
        assert!(store.upsert_calls().is_empty());
    }

    #[test]
    fn test_unknown_association_is_a_store_error() {
        let store = MemoryStore::<Person>::new();
        let result = store.find_in_batches(
            &Query::all().preload(&["Hobbies".to_string()]),
            10,
            &mut |_| Ok(()),
        );
        assert_eq!(
            result,
            Err(ExchangeError::store("unknown association Hobbies"))
        );
    }
}
