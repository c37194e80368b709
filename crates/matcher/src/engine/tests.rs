use super::*;

use std::sync::Arc;

use canonical::{clean, ParseOptions, Parser};
use chrono::Utc;
use diff::{detect, DiffEvent};
use ingest::Document;

fn snapshot(text: &str) -> Document {
    let cleaned = clean(text);
    let mut occurrences = Parser::new().parse(&cleaned.text, None, None, true);
    for occurrence in &mut occurrences {
        occurrence.start = cleaned.source_offset(occurrence.start);
        occurrence.end = cleaned.source_offset(occurrence.end);
    }
    Document {
        url: "mem://argus".into(),
        content_type: "text/plain".into(),
        fetched_at: Utc::now(),
        language: "en".into(),
        raw_text: Arc::from(text),
        occurrences,
        options: ParseOptions {
            filter_stopwords: false,
            enable_stemming: false,
            ignore_case: true,
        },
    }
}

/// One inserted difference covering all of `text`.
fn inserted(text: &str) -> Vec<Difference> {
    detect(&snapshot(""), &snapshot(text))
}

fn keyword(phrase: &str, slop: Slop) -> Keyword {
    Keyword {
        original_input: phrase.to_string(),
        terms: phrase.split_whitespace().map(str::to_lowercase).collect(),
        slop,
    }
}

#[test]
fn exact_phrase_needs_contiguous_terms() {
    let argus = keyword("argus panoptes", Slop::Exact(0));
    let filter = EventFilter::default();

    let hits = find_matches(&argus, &inserted("argus panoptes is"), filter, 0);
    assert_eq!(hits.len(), 1);

    let hits = find_matches(&argus, &inserted("argus is panoptes"), filter, 0);
    assert!(hits.is_empty());
}

#[test]
fn slop_tolerates_gaps() {
    let argus = keyword("argus panoptes", Slop::Exact(1));
    let filter = EventFilter::default();

    assert_eq!(find_matches(&argus, &inserted("argus panoptes is"), filter, 0).len(), 1);
    assert_eq!(find_matches(&argus, &inserted("argus is panoptes"), filter, 0).len(), 1);
    assert!(find_matches(&argus, &inserted("argus is a panoptes"), filter, 0).is_empty());
}

#[test]
fn unlimited_slop_only_needs_order() {
    let argus = keyword("argus panoptes", Slop::Unlimited);
    let filter = EventFilter::default();

    let text = "argus the giant with a hundred eyes called panoptes";
    assert_eq!(find_matches(&argus, &inserted(text), filter, 0).len(), 1);
    assert!(find_matches(&argus, &inserted("panoptes was argus"), filter, 0).is_empty());
}

#[test]
fn match_carries_text_snippet_and_original_phrase() {
    let old = snapshot("Hera sent Argus to guard Io.");
    let new = snapshot("Hera sent Argus Panoptes to guard Io.");
    let differences = detect(&old, &new);

    let hits = find_matches(
        &keyword("Panoptes", Slop::Exact(0)),
        &differences,
        EventFilter::default(),
        6,
    );
    let hit = hits.into_iter().next().expect("one match");
    assert_eq!(hit.event, DiffEvent::Inserted);
    assert_eq!(hit.keyword, "Panoptes");
    assert_eq!(hit.text, "Panoptes");
    assert_eq!(hit.snippet, "Argus Panoptes to gu");
}

#[test]
fn ignore_flags_drop_whole_categories() {
    let differences = detect(
        &snapshot("in Norse mythology"),
        &snapshot("in Greek mythology"),
    );
    let norse = keyword("norse", Slop::Exact(0));
    let greek = keyword("greek", Slop::Exact(0));

    let hits = find_matches(&norse, &differences, EventFilter::default(), 0);
    assert_eq!(hits.len(), 1);
    assert!(hits.iter().all(|m| m.event == DiffEvent::Deleted));

    assert!(find_matches(&norse, &differences, EventFilter::new(false, true), 0).is_empty());
    assert!(find_matches(&greek, &differences, EventFilter::new(true, false), 0).is_empty());
    assert_eq!(
        find_matches(&greek, &differences, EventFilter::new(false, true), 0).len(),
        1
    );
}

#[test]
fn union_over_keywords() {
    let differences = detect(
        &snapshot("in Norse mythology"),
        &snapshot("in Greek mythology"),
    );
    let keywords = [
        keyword("norse", Slop::Exact(0)),
        keyword("greek", Slop::Exact(0)),
        keyword("roman", Slop::Exact(0)),
    ];

    let mut events: Vec<DiffEvent> =
        find_all_matches(&keywords, &differences, EventFilter::default(), 0)
            .into_iter()
            .map(|m| m.event)
            .collect();
    events.sort();
    assert_eq!(events, vec![DiffEvent::Inserted, DiffEvent::Deleted]);

    assert!(find_all_matches(&keywords, &[], EventFilter::default(), 0).is_empty());
}

#[test]
fn reachability_uses_the_nearest_previous_term() {
    let window = ["a", "x", "x", "a", "b"];
    assert!(matches_terms(&["a", "b"], &window, Slop::Exact(0)));
    assert!(!matches_terms(&["a", "b"], &["a", "x", "b"], Slop::Exact(0)));
    assert!(matches_terms(&["a", "b", "c"], &["a", "b", "x", "c"], Slop::Exact(1)));
    assert!(!matches_terms(&["a", "b", "c"], &["a", "x", "x", "b", "c"], Slop::Exact(1)));
}

#[test]
fn degenerate_inputs_never_match() {
    let empty: [&str; 0] = [];
    assert!(!matches_terms(&empty, &["a"], Slop::Unlimited));
    assert!(!matches_terms(&["a"], &empty, Slop::Unlimited));
    assert!(!matches_terms(&["a", "b"], &["a"], Slop::Unlimited));
}
