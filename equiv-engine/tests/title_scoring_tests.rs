//! Integration tests for title scorers backed by the container-title cache

mod helpers;

use equiv_common::{ChannelSet, Content, Publisher, Score};
use equiv_engine::scorers::{
    AcronymTitles, BroadcastTitleScorer, EditDistanceSubsetTitles, SubsetTitles,
    TitleMatchingScorer, TxlogTitleScorer,
};
use equiv_engine::{ContainerTitleCache, EquivalenceScorer};
use helpers::*;
use std::sync::Arc;
use std::time::Duration;

fn titled(uri: &str, publisher: &str, title: &str, channel: &str) -> Content {
    airing(uri, publisher, title, &[(channel, at(15, 0, 0), at(17, 0, 0))])
}

fn subset_scorer(cache: Arc<ContainerTitleCache>) -> BroadcastTitleScorer<SubsetTitles> {
    BroadcastTitleScorer::new(
        SubsetTitles::default(),
        cache,
        Arc::new(ChannelSet::sports_defaults()),
    )
}

#[test]
fn test_sports_channel_forces_mismatch() {
    let store = store();
    let cache = Arc::new(ContainerTitleCache::disabled(store.clone()));
    let scorer = subset_scorer(cache).with_mismatch_score(Score::ZERO).unwrap();

    let subject = titled("http://bbc/s", Publisher::BBC, "Live Premier League Football", ESPN);
    let candidate = titled(
        "http://pa/c",
        Publisher::PA,
        "Live Premier League Football",
        ITV_LONDON,
    );
    assert_eq!(scorer.score_pair(&subject, &candidate).unwrap(), Score::ZERO);

    let off_sports = titled(
        "http://bbc/s",
        Publisher::BBC,
        "Live Premier League Football",
        ITV_LONDON,
    );
    assert_eq!(scorer.score_pair(&off_sports, &candidate).unwrap(), Score::ONE);
}

#[test]
fn test_negative_mismatch_score_rejected() {
    let store = store();
    let cache = Arc::new(ContainerTitleCache::disabled(store));
    assert!(subset_scorer(cache).with_mismatch_score(Score::of(-1.0)).is_err());
}

#[test]
fn test_episode_matches_candidate_titled_after_brand() {
    let store = store();
    store.add_content(
        Content::brand("http://bbc/brand", Publisher::from(Publisher::BBC))
            .with_title("Doctor Who"),
    );
    store.add_content(
        Content::series("http://bbc/series", Publisher::from(Publisher::BBC))
            .with_title("Series 4")
            .with_container("http://bbc/brand"),
    );
    let cache = Arc::new(ContainerTitleCache::new(store.clone(), Duration::from_secs(60)));
    let scorer = subset_scorer(Arc::clone(&cache));

    let subject = titled("http://bbc/e", Publisher::BBC, "The Stolen Earth", ITV_LONDON)
        .with_container("http://bbc/series");
    let candidate = Arc::new(titled("http://pa/c", Publisher::PA, "Doctor Who", ITV_LONDON));
    let unrelated = Arc::new(titled("http://pa/u", Publisher::PA, "Casualty", ITV_LONDON));

    let scores = scorer
        .score(&subject, &[candidate, unrelated], &report())
        .unwrap();
    assert_eq!(scores.source(), "Broadcast-Title-Subset");
    assert_eq!(scores.score_for("http://pa/c"), Score::ONE);
    assert_eq!(scores.score_for("http://pa/u"), Score::NULL);
    assert!(cache.hits() > 0);
}

#[test]
fn test_comparator_family_names_and_rules() {
    let store = store();
    let cache = Arc::new(ContainerTitleCache::disabled(store));
    let sports = Arc::new(ChannelSet::sports_defaults());

    let edit_distance = BroadcastTitleScorer::new(
        EditDistanceSubsetTitles::default(),
        Arc::clone(&cache),
        Arc::clone(&sports),
    );
    let acronym = BroadcastTitleScorer::new(AcronymTitles::default(), cache, sports);

    let subject = titled("http://bbc/s", Publisher::BBC, "Crimewatch Roadshow Special", ITV_LONDON);
    let typo = titled("http://pa/c", Publisher::PA, "Crimewatch Roadshw", ITV_LONDON);
    assert_eq!(edit_distance.score_pair(&subject, &typo).unwrap(), Score::ONE);
    assert_eq!(edit_distance.name(), "LD-Broadcast-Title-Subset");

    let long = titled("http://bbc/s", Publisher::BBC, "Have I Got News For You", ITV_LONDON);
    let short = titled("http://pa/c", Publisher::PA, "HIGNFY", ITV_LONDON);
    assert_eq!(acronym.score_pair(&long, &short).unwrap(), Score::ONE);
    assert_eq!(acronym.name(), "Acronym-Broadcast-Title");
}

#[test]
fn test_title_scorer_reports_every_candidate() {
    let scorer = TitleMatchingScorer::new();
    let subject = titled("http://bbc/s", Publisher::BBC, "The Apprentice", ITV_LONDON);
    let same = Arc::new(titled("http://pa/a", Publisher::PA, "Apprentice", ITV_LONDON));
    let other = Arc::new(titled("http://pa/b", Publisher::PA, "Question Time", ITV_LONDON));
    let untitled = Arc::new(Content::item("http://pa/c", Publisher::from(Publisher::PA)));

    let scores = scorer
        .score(&subject, &[same, other, untitled], &report())
        .unwrap();
    assert_eq!(scores.len(), 3);
    assert_eq!(scores.score_for("http://pa/a"), Score::of(2.0));
    assert_eq!(scores.score_for("http://pa/b"), Score::NULL);
    assert_eq!(scores.score_for("http://pa/c"), Score::NULL);
}

#[test]
fn test_txlog_title_against_series_permutation() {
    let store = store();
    store.add_content(
        Content::brand("http://nitro/brand", Publisher::from(Publisher::BBC_NITRO))
            .with_title("Horizon"),
    );
    let cache = Arc::new(ContainerTitleCache::disabled(store.clone()));
    let scorer = TxlogTitleScorer::new().with_containers(cache);

    let nitro = titled(
        "http://nitro/e",
        Publisher::BBC_NITRO,
        "The Secret Life of Sleep",
        BBC_ONE_LONDON,
    )
    .with_container("http://nitro/brand");
    let log = titled(
        "http://barb/l",
        Publisher::BARB_TRANSMISSIONS,
        "HORIZON-THE SECRET LIFE OF SLEEP",
        BBC_ONE_LONDON,
    );
    assert_eq!(scorer.score_pair(&log, &nitro).unwrap(), Score::of(2.0));
}
