//! Record types and store wrappers shared by the unit tests

use crate::core::memory_store::MemoryStore;
use crate::core::schema::Schema;
use crate::core::traits::{OnConflict, Query, Resource, Store};
use crate::types::ExchangeError;
use chrono::NaiveDate;
use std::cell::RefCell;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Person {
    pub id: u64,
    pub name: String,
    pub age: Option<i32>,
    pub birth: Option<NaiveDate>,
}

impl Person {
    pub fn new(id: u64, name: &str, age: Option<i32>) -> Self {
        Person {
            id,
            name: name.to_string(),
            age,
            birth: None,
        }
    }
}

impl Resource for Person {
    fn describe(schema: &mut Schema<Self>) {
        schema
            .field("ID", |p| &p.id, |p| &mut p.id)
            .field("Name", |p| &p.name, |p| &mut p.name)
            .field("Age", |p| &p.age, |p| &mut p.age)
            .field("Birth", |p| &p.birth, |p| &mut p.birth);
    }
}

/// Record identified by (ID, Name)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pet {
    pub id: u64,
    pub name: String,
    pub age: Option<i32>,
}

impl Pet {
    pub fn new(id: u64, name: &str, age: i32) -> Self {
        Pet {
            id,
            name: name.to_string(),
            age: Some(age),
        }
    }
}

impl Resource for Pet {
    fn describe(schema: &mut Schema<Self>) {
        schema
            .field("ID", |p| &p.id, |p| &mut p.id)
            .field("Name", |p| &p.name, |p| &mut p.name)
            .field("Age", |p| &p.age, |p| &mut p.age);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hobby {
    pub name: String,
}

impl Hobby {
    pub fn named(name: &str) -> Self {
        Hobby {
            name: name.to_string(),
        }
    }
}

/// Record with a has-many association
#[derive(Debug, Clone, Default, PartialEq)]
pub struct User {
    pub number: String,
    pub name: String,
    pub hobbies: Vec<Hobby>,
}

impl Resource for User {
    fn describe(schema: &mut Schema<Self>) {
        schema
            .field("Number", |u| &u.number, |u| &mut u.number)
            .field("Name", |u| &u.name, |u| &mut u.name)
            .association("Hobbies", |u| &u.hobbies, |u| &mut u.hobbies);
    }
}

/// Store that logs every call and can be told to fail
pub struct RecordingStore<R> {
    pub inner: MemoryStore<R>,
    pub queries: RefCell<Vec<(Query, usize)>>,
    pub upserts: Vec<(OnConflict, Vec<String>, usize)>,
    pub fail_upsert: Option<String>,
    pub fail_find: Option<String>,
}

impl<R: Resource> RecordingStore<R> {
    pub fn new(inner: MemoryStore<R>) -> Self {
        RecordingStore {
            inner,
            queries: RefCell::new(Vec::new()),
            upserts: Vec::new(),
            fail_upsert: None,
            fail_find: None,
        }
    }

    pub fn records(&self) -> &[R] {
        self.inner.records()
    }
}

impl<R: Resource> Store<R> for RecordingStore<R> {
    fn count(&self) -> Result<usize, ExchangeError> {
        self.inner.count()
    }

    fn find_in_batches(
        &self,
        query: &Query,
        batch_size: usize,
        on_batch: &mut dyn FnMut(Vec<R>) -> Result<(), ExchangeError>,
    ) -> Result<(), ExchangeError> {
        self.queries.borrow_mut().push((query.clone(), batch_size));
        if let Some(message) = &self.fail_find {
            return Err(ExchangeError::store(message));
        }
        self.inner.find_in_batches(query, batch_size, on_batch)
    }

    fn upsert_in_batches(
        &mut self,
        records: Vec<R>,
        on_conflict: &OnConflict,
        associations: &[String],
        batch_size: usize,
    ) -> Result<(), ExchangeError> {
        self.upserts
            .push((on_conflict.clone(), associations.to_vec(), batch_size));
        if let Some(message) = &self.fail_upsert {
            return Err(ExchangeError::store(message));
        }
        self.inner
            .upsert_in_batches(records, on_conflict, associations, batch_size)
    }
}
