//! Integration tests for as-aired time matching

mod helpers;

use equiv_common::{Broadcast, Content, Publisher, Score};
use equiv_engine::generators::ActualTransmissionGenerator;
use equiv_engine::{EquivalenceGenerator, InMemoryStore};
use helpers::*;
use std::sync::Arc;

fn generator(store: &Arc<InMemoryStore>) -> ActualTransmissionGenerator {
    ActualTransmissionGenerator::builder(store.clone(), store.clone()).build()
}

/// Nitro programme scheduled 20:00-21:00 that actually aired 20:01:30-21:00:45
fn nitro_subject(channel: &str) -> Content {
    Content::item("http://nitro/s", Publisher::from(Publisher::BBC_NITRO))
        .with_title("Newsnight")
        .with_broadcast(
            broadcast(channel, at(20, 0, 0), at(21, 0, 0))
                .with_actual_times(at(20, 1, 30), at(21, 0, 45))
                .unwrap(),
        )
}

fn txlog(uri: &str, channel: &str, start_offset: i64, end_offset: i64) -> Content {
    Content::item(uri, Publisher::from(Publisher::BARB_TRANSMISSIONS))
        .with_title("NEWSNIGHT")
        .with_broadcast(broadcast(
            channel,
            plus_seconds(at(20, 1, 30), start_offset),
            plus_seconds(at(21, 0, 45), end_offset),
        ))
}

#[test]
fn test_txlog_within_one_second_matches() {
    let store = store();
    store.add_content(txlog("http://barb/exact", BBC_ONE_LONDON, 0, 0));
    store.add_content(txlog("http://barb/edge", BBC_ONE_LONDON, 1, -1));
    store.add_content(txlog("http://barb/late", BBC_ONE_LONDON, 2, 0));
    store.add_content(txlog("http://barb/overrun", BBC_ONE_LONDON, 0, 2));

    let scores = generator(&store)
        .generate(&nitro_subject(BBC_ONE_LONDON), &report())
        .unwrap();
    assert_eq!(scores.score_for("http://barb/exact"), Score::of(3.0));
    assert_eq!(scores.score_for("http://barb/edge"), Score::of(3.0));
    assert!(!scores.contains("http://barb/late"));
    assert!(!scores.contains("http://barb/overrun"));
}

#[test]
fn test_regional_variant_channel_matches() {
    let store = store();
    store.add_content(txlog("http://barb/east", BBC_ONE_EAST, 0, 0));

    let scores = generator(&store)
        .generate(&nitro_subject(BBC_ONE_LONDON), &report())
        .unwrap();
    assert!(scores.contains("http://barb/east"));
}

#[test]
fn test_txlog_subject_finds_nitro_and_skips_own_publisher() {
    let store = store();
    store.add_content(nitro_subject(BBC_ONE_LONDON));
    store.add_content(txlog("http://barb/other", BBC_ONE_LONDON, 0, 0));
    let subject = txlog("http://barb/s", BBC_ONE_LONDON, 0, 1);

    let scores = generator(&store).generate(&subject, &report()).unwrap();
    assert_eq!(scores.len(), 1);
    assert_eq!(scores.score_for("http://nitro/s"), Score::of(3.0));
}

#[test]
fn test_missing_actual_times_never_match() {
    let store = store();
    store.add_content(txlog("http://barb/exact", BBC_ONE_LONDON, 0, 0));
    let unaired = Content::item("http://nitro/s", Publisher::from(Publisher::BBC_NITRO))
        .with_broadcast(broadcast(BBC_ONE_LONDON, at(20, 1, 30), at(21, 0, 45)));

    let scores = generator(&store).generate(&unaired, &report()).unwrap();
    assert!(scores.is_empty());
}

#[test]
fn test_start_only_channel_ignores_end() {
    let store = store();
    store.add_content(txlog("http://barb/wales", BBC_TWO_WALES, 0, -900));

    let scheduled = broadcast(BBC_TWO_WALES, at(20, 0, 0), at(21, 0, 0));
    let subject = Content::item("http://nitro/s", Publisher::from(Publisher::BBC_NITRO))
        .with_broadcast(Broadcast {
            actual_start: Some(at(20, 1, 30)),
            ..scheduled
        });

    let scores = generator(&store).generate(&subject, &report()).unwrap();
    assert!(scores.contains("http://barb/wales"));

    // The same logs on a channel with reliable end times do not match
    store.add_content(txlog("http://barb/london", BBC_ONE_LONDON, 0, -900));
    let scores = generator(&store)
        .generate(&nitro_subject(BBC_ONE_LONDON), &report())
        .unwrap();
    assert!(!scores.contains("http://barb/london"));
}
