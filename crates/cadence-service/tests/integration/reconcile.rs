use cadence_db::model::Occurrence;
use cadence_db::store::OccurrenceScope;
use cadence_rule::{Frequency, Rule};
use cadence_service::error::ServiceError;
use cadence_service::occurrence::save_occurrence;
use cadence_service::reconcile::OccurrenceReconciler;
use chrono::{DateTime, Utc};

use super::helpers::{Fixture, at};

fn starts(occurrences: &[Occurrence]) -> Vec<DateTime<Utc>> {
    occurrences.iter().map(|occurrence| occurrence.start).collect()
}

fn monthly_fixture(generate: bool) -> (Fixture, cadence_db::model::Generator) {
    let mut fx = Fixture::new();
    let generator = fx
        .generator(at(2008, 1, 1, 0), at(2008, 1, 2, 0))
        .with_rule(Rule::new("Monthly", Frequency::Monthly));
    if generate {
        fx.save(&generator);
    } else {
        fx.save_without_generation(&generator);
    }
    (fx, generator)
}

#[test_log::test]
fn monthly_window_yields_fresh_candidates() {
    let (fx, generator) = monthly_fixture(false);
    let occurrences = OccurrenceReconciler::new(&fx.store, &fx.config)
        .get_occurrences(
            OccurrenceScope::Generator(generator.id),
            at(2008, 1, 24, 0),
            at(2008, 3, 2, 0),
        )
        .unwrap();

    assert_eq!(starts(&occurrences), vec![at(2008, 2, 1, 0), at(2008, 3, 1, 0)]);
    assert!(occurrences.iter().all(|occurrence| !occurrence.is_persisted()));
}

#[test_log::test]
fn monthly_window_prefers_stored_occurrences() {
    let (fx, generator) = monthly_fixture(true);
    let occurrences = OccurrenceReconciler::new(&fx.store, &fx.config)
        .get_occurrences(
            OccurrenceScope::Generator(generator.id),
            at(2008, 1, 24, 0),
            at(2008, 3, 2, 0),
        )
        .unwrap();

    assert_eq!(starts(&occurrences), vec![at(2008, 2, 1, 0), at(2008, 3, 1, 0)]);
    assert!(occurrences.iter().all(Occurrence::is_persisted));
}

#[test_log::test]
fn rule_less_generator_outside_window_is_empty() {
    let mut fx = Fixture::new();
    let generator = fx.generator(at(2008, 1, 1, 8), at(2008, 1, 1, 9));
    fx.save(&generator);

    let occurrences = OccurrenceReconciler::new(&fx.store, &fx.config)
        .get_occurrences(
            OccurrenceScope::Generator(generator.id),
            at(2008, 1, 24, 0),
            at(2008, 3, 2, 0),
        )
        .unwrap();
    assert!(occurrences.is_empty());
}

#[test_log::test]
fn occurrence_overlapping_window_start_is_included() {
    let mut fx = Fixture::new();
    let generator = fx.generator(at(2008, 1, 1, 8), at(2008, 1, 1, 12));
    fx.save_without_generation(&generator);

    let occurrences = OccurrenceReconciler::new(&fx.store, &fx.config)
        .get_occurrences(
            OccurrenceScope::Generator(generator.id),
            at(2008, 1, 1, 10),
            at(2008, 1, 2, 0),
        )
        .unwrap();
    assert_eq!(starts(&occurrences), vec![at(2008, 1, 1, 8)]);
}

#[test_log::test]
fn moved_occurrences_follow_their_current_span() {
    let (mut fx, generator) = monthly_fixture(true);

    // April moves into the window, February moves out of it.
    let mut april = fx.stored_at(&generator, at(2008, 4, 1, 0));
    april.move_to(at(2008, 2, 15, 0), at(2008, 2, 16, 0));
    save_occurrence(&mut fx.store, &mut april).unwrap();
    let mut february = fx.stored_at(&generator, at(2008, 2, 1, 0));
    february.move_to(at(2008, 5, 10, 0), at(2008, 5, 11, 0));
    save_occurrence(&mut fx.store, &mut february).unwrap();

    let occurrences = OccurrenceReconciler::new(&fx.store, &fx.config)
        .get_occurrences(
            OccurrenceScope::Generator(generator.id),
            at(2008, 1, 24, 0),
            at(2008, 3, 2, 0),
        )
        .unwrap();

    assert_eq!(starts(&occurrences), vec![at(2008, 2, 15, 0), at(2008, 3, 1, 0)]);
    assert_eq!(occurrences[0].id(), april.id());
    assert_eq!(occurrences[0].original_start(), at(2008, 4, 1, 0));
}

#[test_log::test]
fn every_intersecting_stored_occurrence_appears_once() {
    let mut fx = Fixture::new();
    let generator = fx
        .generator(at(2008, 1, 1, 9), at(2008, 1, 1, 10))
        .with_rule(Rule::new("Daily", Frequency::Daily))
        .with_repeat_until(at(2008, 1, 31, 9));
    fx.save(&generator);

    let mut cancelled = fx.stored_at(&generator, at(2008, 1, 11, 9));
    cancelled.cancel();
    save_occurrence(&mut fx.store, &mut cancelled).unwrap();
    let mut moved = fx.stored_at(&generator, at(2008, 1, 20, 9));
    moved.move_to(at(2008, 1, 12, 15), at(2008, 1, 12, 16));
    save_occurrence(&mut fx.store, &mut moved).unwrap();

    let (window_start, window_end) = (at(2008, 1, 10, 0), at(2008, 1, 15, 0));
    let occurrences = OccurrenceReconciler::new(&fx.store, &fx.config)
        .get_occurrences(OccurrenceScope::Generator(generator.id), window_start, window_end)
        .unwrap();

    assert!(
        occurrences
            .iter()
            .all(|occurrence| occurrence.intersects(window_start, window_end))
    );
    for stored in fx.stored(&generator) {
        let expected = usize::from(stored.intersects(window_start, window_end));
        let found = occurrences
            .iter()
            .filter(|occurrence| occurrence.id() == stored.id())
            .count();
        assert_eq!(found, expected, "occurrence at {}", stored.original_start());
    }
    assert_eq!(occurrences.len(), 6);
    assert!(occurrences.windows(2).all(|pair| pair[0].start <= pair[1].start));
    assert!(occurrences.iter().any(|occurrence| occurrence.cancelled));
}

#[test_log::test]
fn exceptions_are_not_offered_as_candidates() {
    let mut fx = Fixture::new();
    let mut generator = fx
        .generator(at(2008, 1, 1, 9), at(2008, 1, 1, 10))
        .with_rule(Rule::new("Daily", Frequency::Daily));
    generator.exceptions.insert(at(2008, 1, 2, 9));
    fx.save_without_generation(&generator);

    let occurrences = OccurrenceReconciler::new(&fx.store, &fx.config)
        .get_occurrences(
            OccurrenceScope::Generator(generator.id),
            at(2008, 1, 1, 0),
            at(2008, 1, 4, 0),
        )
        .unwrap();
    assert_eq!(starts(&occurrences), vec![at(2008, 1, 1, 9), at(2008, 1, 3, 9)]);
}

#[test_log::test]
fn event_scope_merges_generators() {
    let mut fx = Fixture::new();
    let mornings = fx
        .generator(at(2008, 1, 1, 9), at(2008, 1, 1, 10))
        .with_rule(Rule::new("Daily", Frequency::Daily));
    let evenings = fx
        .generator(at(2008, 1, 1, 19), at(2008, 1, 1, 20))
        .with_rule(Rule::new("Daily", Frequency::Daily));
    fx.save_without_generation(&mornings);
    fx.save_without_generation(&evenings);

    let occurrences = OccurrenceReconciler::new(&fx.store, &fx.config)
        .get_occurrences(
            OccurrenceScope::Event(fx.event.id),
            at(2008, 1, 1, 0),
            at(2008, 1, 3, 0),
        )
        .unwrap();
    assert_eq!(
        starts(&occurrences),
        vec![
            at(2008, 1, 1, 9),
            at(2008, 1, 1, 19),
            at(2008, 1, 2, 9),
            at(2008, 1, 2, 19),
        ]
    );
}

#[test_log::test]
fn event_scope_does_not_double_book_a_taken_slot() {
    let mut fx = Fixture::new();
    let first = fx
        .generator(at(2008, 1, 1, 9), at(2008, 1, 1, 10))
        .with_rule(Rule::new("Daily", Frequency::Daily))
        .with_repeat_until(at(2008, 1, 3, 9));
    let second = fx
        .generator(at(2008, 1, 2, 9), at(2008, 1, 2, 10))
        .with_rule(Rule::new("Daily", Frequency::Daily))
        .with_repeat_until(at(2008, 1, 3, 9));
    fx.save(&first);
    fx.save(&second);
    assert_eq!(fx.stored(&first).len(), 3);
    assert!(fx.stored(&second).is_empty());

    let mut cancelled = fx.stored_at(&first, at(2008, 1, 2, 9));
    cancelled.cancel();
    save_occurrence(&mut fx.store, &mut cancelled).unwrap();
    let mut moved = fx.stored_at(&first, at(2008, 1, 3, 9));
    moved.move_to(at(2008, 1, 3, 14), at(2008, 1, 3, 15));
    save_occurrence(&mut fx.store, &mut moved).unwrap();

    let occurrences = OccurrenceReconciler::new(&fx.store, &fx.config)
        .get_occurrences(
            OccurrenceScope::Event(fx.event.id),
            at(2008, 1, 1, 0),
            at(2008, 1, 4, 0),
        )
        .unwrap();
    assert_eq!(
        starts(&occurrences),
        vec![at(2008, 1, 1, 9), at(2008, 1, 2, 9), at(2008, 1, 3, 14)]
    );
    assert!(occurrences.iter().all(Occurrence::is_persisted));
    assert!(occurrences[1].cancelled);
}

#[test_log::test]
fn open_ended_windows_are_accepted() {
    let mut fx = Fixture::new();
    let generator = fx
        .generator(at(2008, 1, 1, 9), at(2008, 1, 1, 10))
        .with_rule(Rule::new("Weekly", Frequency::Weekly))
        .with_repeat_until(at(2008, 2, 1, 9));
    fx.save_without_generation(&generator);
    let reconciler = OccurrenceReconciler::new(&fx.store, &fx.config);

    let until_the_end = reconciler
        .get_occurrences(
            OccurrenceScope::Generator(generator.id),
            at(2008, 1, 1, 0),
            DateTime::<Utc>::MAX_UTC,
        )
        .unwrap();
    assert_eq!(until_the_end.len(), 5);
    assert_eq!(until_the_end.last().map(|occurrence| occurrence.start), Some(at(2008, 1, 29, 9)));

    let from_the_start = reconciler
        .get_occurrences(
            OccurrenceScope::Generator(generator.id),
            DateTime::<Utc>::MIN_UTC,
            at(2008, 1, 16, 0),
        )
        .unwrap();
    assert_eq!(
        starts(&from_the_start),
        vec![at(2008, 1, 1, 9), at(2008, 1, 8, 9), at(2008, 1, 15, 9)]
    );
}

#[test_log::test]
fn unknown_generator_is_not_found() {
    let fx = Fixture::new();
    let err = OccurrenceReconciler::new(&fx.store, &fx.config)
        .get_occurrences(
            OccurrenceScope::Generator(cadence_core::types::GeneratorId::new()),
            at(2008, 1, 1, 0),
            at(2008, 2, 1, 0),
        )
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[test_log::test]
fn occurrences_after_walks_lazily_in_order() {
    let mut fx = Fixture::new();
    let generator = fx
        .generator(at(2008, 1, 1, 9), at(2008, 1, 1, 10))
        .with_rule(Rule::new("Daily", Frequency::Daily))
        .with_repeat_until(at(2008, 3, 31, 9));
    fx.save(&generator);

    let reconciler = OccurrenceReconciler::new(&fx.store, &fx.config);
    let first: Vec<_> = reconciler
        .occurrences_after(&generator, at(2008, 1, 10, 9))
        .take(3)
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(
        starts(&first),
        vec![at(2008, 1, 10, 9), at(2008, 1, 11, 9), at(2008, 1, 12, 9)]
    );

    let all: Vec<_> = reconciler
        .occurrences_after(&generator, at(2008, 1, 1, 0))
        .collect::<Result<_, _>>()
        .unwrap();
    // January through March, less Good Friday (2008-03-21).
    assert_eq!(all.len(), 90);
    assert!(all.windows(2).all(|pair| pair[0].start < pair[1].start));
    assert_eq!(all.last().map(|occurrence| occurrence.start), Some(at(2008, 3, 31, 9)));
}

#[test_log::test]
fn occurrences_after_yields_a_moved_occurrence_once() {
    let mut fx = Fixture::new();
    let generator = fx
        .generator(at(2008, 1, 1, 9), at(2008, 1, 1, 10))
        .with_rule(Rule::new("Daily", Frequency::Daily))
        .with_repeat_until(at(2008, 6, 30, 9));
    fx.save(&generator);

    // Lands across the edge between the third and fourth 32-day steps.
    let mut moved = fx.stored_at(&generator, at(2008, 1, 5, 9));
    moved.move_to(at(2008, 4, 5, 23), at(2008, 4, 6, 0));
    save_occurrence(&mut fx.store, &mut moved).unwrap();

    let all: Vec<_> = OccurrenceReconciler::new(&fx.store, &fx.config)
        .occurrences_after(&generator, at(2008, 1, 1, 0))
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(all.len(), 181);
    assert_eq!(
        all.iter()
            .filter(|occurrence| occurrence.id() == moved.id())
            .count(),
        1
    );
    assert!(all.windows(2).all(|pair| pair[0].start <= pair[1].start));
}

#[test_log::test]
fn get_occurrence_looks_up_a_single_slot() {
    let mut fx = Fixture::new();
    let mut generator = fx
        .generator(at(2008, 1, 1, 9), at(2008, 1, 1, 10))
        .with_rule(Rule::new("Weekly", Frequency::Weekly));
    generator.exceptions.insert(at(2008, 1, 15, 9));
    fx.save_without_generation(&generator);
    let reconciler = OccurrenceReconciler::new(&fx.store, &fx.config);

    let fresh = reconciler.get_occurrence(&generator, at(2008, 1, 8, 9)).unwrap().unwrap();
    assert!(!fresh.is_persisted());
    assert_eq!(fresh.end, at(2008, 1, 8, 10));

    assert!(reconciler.get_occurrence(&generator, at(2008, 1, 9, 9)).unwrap().is_none());
    assert!(reconciler.get_occurrence(&generator, at(2008, 1, 15, 9)).unwrap().is_none());
}
