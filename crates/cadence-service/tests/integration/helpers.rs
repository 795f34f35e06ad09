#![allow(dead_code)]
//! Test helpers: fixtures around [`MemoryStore`] and a store wrapper that
//! can be told to fail generator writes.

use std::collections::BTreeSet;

use cadence_core::config::RecurrenceConfig;
use cadence_core::types::{EventId, GeneratorId, OccurrenceId};
use cadence_db::error::{DbError, DbResult};
use cadence_db::model::{Event, Generator, NewOccurrence, Occurrence, Span};
use cadence_db::store::{MemoryStore, OccurrenceScope, SpanEdge, Store};
use cadence_service::generator::{SaveOptions, save_generator};
use chrono::{DateTime, NaiveTime, TimeZone, Utc};

pub fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

pub fn at_min(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

/// A store with one event already in it.
pub struct Fixture {
    pub store: TestStore,
    pub config: RecurrenceConfig,
    pub event: Event,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(RecurrenceConfig::default())
    }

    pub fn with_config(config: RecurrenceConfig) -> Self {
        let mut store = TestStore::default();
        let event = Event::new("Choir practice").with_description("Bring your own sheet music");
        store.save_event(&event).unwrap();
        Self {
            store,
            config,
            event,
        }
    }

    pub fn generator(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Generator {
        Generator::new(self.event.id, start).with_end(end)
    }

    pub fn save(&mut self, generator: &Generator) {
        save_generator(&mut self.store, &self.config, generator, SaveOptions::default()).unwrap();
    }

    pub fn save_without_generation(&mut self, generator: &Generator) {
        save_generator(
            &mut self.store,
            &self.config,
            generator,
            SaveOptions { generate: false },
        )
        .unwrap();
    }

    pub fn stored(&self, generator: &Generator) -> Vec<Occurrence> {
        self.store
            .occurrences(OccurrenceScope::Generator(generator.id))
            .unwrap()
    }

    pub fn original_starts(&self, generator: &Generator) -> Vec<DateTime<Utc>> {
        let mut starts: Vec<_> = self
            .stored(generator)
            .iter()
            .map(Occurrence::original_start)
            .collect();
        starts.sort();
        starts
    }

    pub fn stored_at(&self, generator: &Generator, original_start: DateTime<Utc>) -> Occurrence {
        self.store
            .occurrences_starting_in(generator.id, &BTreeSet::from([original_start]))
            .unwrap()
            .into_iter()
            .next()
            .expect("no occurrence stored at that original start")
    }
}

/// Delegates to [`MemoryStore`]; generator writes fail while
/// `fail_generator_writes` is set.
#[derive(Debug, Default)]
pub struct TestStore {
    inner: MemoryStore,
    pub fail_generator_writes: bool,
}

impl Store for TestStore {
    fn transaction<T, E, F>(&mut self, callback: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self) -> Result<T, E>,
    {
        let fail_generator_writes = self.fail_generator_writes;
        let mut inner = std::mem::take(&mut self.inner);
        let result = inner.transaction(|inner| {
            let mut wrapped = Self {
                inner: std::mem::take(inner),
                fail_generator_writes,
            };
            let result = callback(&mut wrapped);
            *inner = wrapped.inner;
            result
        });
        self.inner = inner;
        result
    }

    fn get_event(&self, id: EventId) -> DbResult<Option<Event>> {
        self.inner.get_event(id)
    }

    fn save_event(&mut self, event: &Event) -> DbResult<()> {
        self.inner.save_event(event)
    }

    fn get_generator(&self, id: GeneratorId) -> DbResult<Option<Generator>> {
        self.inner.get_generator(id)
    }

    fn generators_for_event(&self, event_id: EventId) -> DbResult<Vec<Generator>> {
        self.inner.generators_for_event(event_id)
    }

    fn save_generator(&mut self, generator: &Generator) -> DbResult<()> {
        if self.fail_generator_writes {
            return Err(DbError::EventNotFound(generator.event_id));
        }
        self.inner.save_generator(generator)
    }

    fn delete_generator(&mut self, id: GeneratorId) -> DbResult<usize> {
        self.inner.delete_generator(id)
    }

    fn get_occurrence(&self, id: OccurrenceId) -> DbResult<Option<Occurrence>> {
        self.inner.get_occurrence(id)
    }

    fn occurrences(&self, scope: OccurrenceScope) -> DbResult<Vec<Occurrence>> {
        self.inner.occurrences(scope)
    }

    fn occurrences_starting_in(
        &self,
        generator_id: GeneratorId,
        starts: &BTreeSet<DateTime<Utc>>,
    ) -> DbResult<Vec<Occurrence>> {
        self.inner.occurrences_starting_in(generator_id, starts)
    }

    fn occurrences_at_time_of_day(
        &self,
        generator_id: GeneratorId,
        edge: SpanEdge,
        time: NaiveTime,
    ) -> DbResult<Vec<Occurrence>> {
        self.inner.occurrences_at_time_of_day(generator_id, edge, time)
    }

    fn occurrences_starting_after(
        &self,
        generator_id: GeneratorId,
        instant: DateTime<Utc>,
    ) -> DbResult<Vec<Occurrence>> {
        self.inner.occurrences_starting_after(generator_id, instant)
    }

    fn span_exists(&self, scope: OccurrenceScope, span: Span) -> DbResult<bool> {
        self.inner.span_exists(scope, span)
    }

    fn insert_occurrence(&mut self, new: &NewOccurrence) -> DbResult<Occurrence> {
        self.inner.insert_occurrence(new)
    }

    fn update_occurrence(&mut self, occurrence: &Occurrence) -> DbResult<()> {
        self.inner.update_occurrence(occurrence)
    }

    fn delete_occurrence(&mut self, id: OccurrenceId) -> DbResult<()> {
        self.inner.delete_occurrence(id)
    }
}
