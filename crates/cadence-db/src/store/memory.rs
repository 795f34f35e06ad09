use std::collections::{BTreeMap, BTreeSet, HashMap};

use cadence_core::types::{EventId, GeneratorId, OccurrenceId};
use chrono::{DateTime, NaiveTime, Utc};

use super::{OccurrenceScope, SpanEdge, Store};
use crate::error::{DbError, DbResult};
use crate::model::{Event, Generator, NewOccurrence, Occurrence, Span};

#[derive(Debug, Clone, Default)]
struct Tables {
    events: HashMap<EventId, Event>,
    generators: BTreeMap<GeneratorId, Generator>,
    occurrences: BTreeMap<OccurrenceId, Occurrence>,
}

impl Tables {
    fn in_scope(&self, scope: OccurrenceScope) -> impl Iterator<Item = &Occurrence> {
        self.occurrences
            .values()
            .filter(move |occurrence| match scope {
                OccurrenceScope::Generator(id) => occurrence.generator_id() == id,
                OccurrenceScope::Event(id) => occurrence.event_id() == id,
            })
    }

    fn original_span_taken(
        &self,
        generator_id: GeneratorId,
        span: Span,
        except: Option<OccurrenceId>,
    ) -> bool {
        self.in_scope(OccurrenceScope::Generator(generator_id))
            .any(|occurrence| occurrence.id() != except && occurrence.original_span() == span)
    }
}

fn sorted<'a>(occurrences: impl Iterator<Item = &'a Occurrence>) -> Vec<Occurrence> {
    let mut list: Vec<Occurrence> = occurrences.cloned().collect();
    list.sort_by(Occurrence::chronological);
    list
}

/// ## Summary
/// In-process store keeping every table in memory.
///
/// Transactions snapshot the tables on entry and restore the snapshot when
/// the callback fails.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Tables,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn transaction<T, E, F>(&mut self, callback: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self) -> Result<T, E>,
    {
        let snapshot = self.tables.clone();
        let result = callback(self);
        if result.is_err() {
            tracing::debug!("Rolling back transaction");
            self.tables = snapshot;
        }
        result
    }

    fn get_event(&self, id: EventId) -> DbResult<Option<Event>> {
        Ok(self.tables.events.get(&id).cloned())
    }

    fn save_event(&mut self, event: &Event) -> DbResult<()> {
        self.tables.events.insert(event.id, event.clone());
        Ok(())
    }

    fn get_generator(&self, id: GeneratorId) -> DbResult<Option<Generator>> {
        Ok(self.tables.generators.get(&id).cloned())
    }

    fn generators_for_event(&self, event_id: EventId) -> DbResult<Vec<Generator>> {
        let mut generators: Vec<Generator> = self
            .tables
            .generators
            .values()
            .filter(|generator| generator.event_id == event_id)
            .cloned()
            .collect();
        generators.sort_by_key(|generator| (generator.event_start, generator.id));
        Ok(generators)
    }

    fn save_generator(&mut self, generator: &Generator) -> DbResult<()> {
        if !self.tables.events.contains_key(&generator.event_id) {
            return Err(DbError::EventNotFound(generator.event_id));
        }
        self.tables
            .generators
            .insert(generator.id, generator.clone());
        Ok(())
    }

    fn delete_generator(&mut self, id: GeneratorId) -> DbResult<usize> {
        if self.tables.generators.remove(&id).is_none() {
            return Err(DbError::GeneratorNotFound(id));
        }
        let before = self.tables.occurrences.len();
        self.tables
            .occurrences
            .retain(|_, occurrence| occurrence.generator_id() != id);
        Ok(before - self.tables.occurrences.len())
    }

    fn get_occurrence(&self, id: OccurrenceId) -> DbResult<Option<Occurrence>> {
        Ok(self.tables.occurrences.get(&id).cloned())
    }

    fn occurrences(&self, scope: OccurrenceScope) -> DbResult<Vec<Occurrence>> {
        Ok(sorted(self.tables.in_scope(scope)))
    }

    fn occurrences_starting_in(
        &self,
        generator_id: GeneratorId,
        starts: &BTreeSet<DateTime<Utc>>,
    ) -> DbResult<Vec<Occurrence>> {
        Ok(sorted(
            self.tables
                .in_scope(OccurrenceScope::Generator(generator_id))
                .filter(|occurrence| starts.contains(&occurrence.original_start())),
        ))
    }

    fn occurrences_at_time_of_day(
        &self,
        generator_id: GeneratorId,
        edge: SpanEdge,
        time: NaiveTime,
    ) -> DbResult<Vec<Occurrence>> {
        Ok(sorted(
            self.tables
                .in_scope(OccurrenceScope::Generator(generator_id))
                .filter(|occurrence| {
                    let instant = match edge {
                        SpanEdge::Start => occurrence.original_start(),
                        SpanEdge::End => occurrence.original_end(),
                    };
                    instant.time() == time
                }),
        ))
    }

    fn occurrences_starting_after(
        &self,
        generator_id: GeneratorId,
        instant: DateTime<Utc>,
    ) -> DbResult<Vec<Occurrence>> {
        Ok(sorted(
            self.tables
                .in_scope(OccurrenceScope::Generator(generator_id))
                .filter(|occurrence| occurrence.original_start() > instant),
        ))
    }

    fn span_exists(&self, scope: OccurrenceScope, span: Span) -> DbResult<bool> {
        Ok(self
            .tables
            .in_scope(scope)
            .any(|occurrence| occurrence.original_span() == span || occurrence.span() == span))
    }

    fn insert_occurrence(&mut self, new: &NewOccurrence) -> DbResult<Occurrence> {
        if !self.tables.generators.contains_key(&new.generator_id) {
            return Err(DbError::GeneratorNotFound(new.generator_id));
        }
        if self
            .tables
            .original_span_taken(new.generator_id, new.span(), None)
        {
            return Err(DbError::UniqueViolation {
                generator_id: new.generator_id,
                original_start: new.start,
                original_end: new.end,
            });
        }

        let id = OccurrenceId::new();
        let occurrence = Occurrence::persisted(id, new);
        self.tables.occurrences.insert(id, occurrence.clone());
        Ok(occurrence)
    }

    fn update_occurrence(&mut self, occurrence: &Occurrence) -> DbResult<()> {
        let id = occurrence.id().ok_or(DbError::NotPersisted)?;
        let stored = self
            .tables
            .occurrences
            .get(&id)
            .ok_or(DbError::OccurrenceNotFound(id))?;
        if stored.generator_id() != occurrence.generator_id()
            || stored.event_id() != occurrence.event_id()
        {
            return Err(DbError::OwnershipMismatch(id));
        }
        if stored.original_span() != occurrence.original_span()
            && self.tables.original_span_taken(
                occurrence.generator_id(),
                occurrence.original_span(),
                Some(id),
            )
        {
            return Err(DbError::UniqueViolation {
                generator_id: occurrence.generator_id(),
                original_start: occurrence.original_start(),
                original_end: occurrence.original_end(),
            });
        }

        self.tables.occurrences.insert(id, occurrence.clone());
        Ok(())
    }

    fn delete_occurrence(&mut self, id: OccurrenceId) -> DbResult<()> {
        self.tables
            .occurrences
            .remove(&id)
            .map(|_| ())
            .ok_or(DbError::OccurrenceNotFound(id))
    }
}
