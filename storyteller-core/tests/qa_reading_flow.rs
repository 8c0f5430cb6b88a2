//! QA tests for reading a story from the first segment to an ending.
//!
//! These tests drive the engine and the reading screen over the built-in
//! stories. No network access is needed.
//! Run with: `cargo test -p storyteller-core --test qa_reading_flow`

use std::sync::{Arc, Mutex};
use storyteller_core::flags::{DYNAMIC_THEMES, FIRST_PERSON_NARRATIVE, STORY_SHARING};
use storyteller_core::testing::{
    assert_at_segment, assert_not_found, assert_offers, assert_reading, assert_toasts,
    FailingStore, TestHarness,
};
use storyteller_core::{
    Completion, EngineError, EngineState, ProgressStore, StaticFlags, StoredProgress, StoryCatalog,
    StoryEngine, StyleToken, View,
};

// =============================================================================
// ENGINE TRANSITIONS
// =============================================================================

#[test]
fn test_story_one_starts_with_two_choices() {
    let harness = TestHarness::new();
    let engine = harness.start("story-1");

    assert!(matches!(engine.state(), EngineState::Ready(_)));
    assert_at_segment(&engine, "start");
    assert_offers(&engine, &["choice-1", "choice-2"]);
}

#[test]
fn test_dark_path_records_choice() {
    let harness = TestHarness::new();
    let mut engine = harness.start("story-1");

    harness.choose(&mut engine, "choice-1");

    assert_at_segment(&engine, "dark-path");
    assert_eq!(engine.user_choices(), ["choice-1"]);
    assert_offers(&engine, &["choice-3", "choice-4"]);
}

#[test]
fn test_longest_route_through_story_one() {
    let harness = TestHarness::new();
    let mut engine = harness.start("story-1");

    for choice in ["choice-1", "choice-4", "choice-10", "choice-1", "choice-4", "choice-9", "choice-11"] {
        harness.choose(&mut engine, choice);
    }

    assert_at_segment(&engine, "dragon-victory");
    assert_eq!(engine.user_choices().len(), 7);
    assert!(engine.current_segment().unwrap().is_terminal());
}

#[test]
fn test_complete_twice_persists_and_calls_back_once() {
    let harness = TestHarness::new();
    let mut engine = harness.start("story-1");
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    engine.on_complete(move |choices| sink.lock().unwrap().push(choices.to_vec()));

    harness.choose(&mut engine, "choice-1");
    harness.choose(&mut engine, "choice-3");
    harness.choose(&mut engine, "choice-7");

    assert_eq!(engine.complete().unwrap(), Completion::Recorded);
    assert_eq!(engine.complete().unwrap(), Completion::AlreadyCompleted);

    assert!(harness.is_completed("story-1"));
    assert_eq!(harness.progress.store().len(), 1);
    let received = received.lock().unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0], ["choice-1", "choice-3", "choice-7"]);
}

#[test]
fn test_completion_persisted_before_callback() {
    let harness = TestHarness::new();
    let mut engine = harness.start("story-2");
    let progress = harness.progress.clone();
    let seen = Arc::new(Mutex::new(None));
    let sink = seen.clone();
    engine.on_complete(move |_| {
        *sink.lock().unwrap() = Some(progress.is_completed("story-2"));
    });

    harness.choose(&mut engine, "choice-2");
    harness.choose(&mut engine, "choice-6");
    engine.complete().unwrap();

    assert_eq!(*seen.lock().unwrap(), Some(true));
}

#[test]
fn test_restart_after_completion() {
    let harness = TestHarness::new();
    let mut engine = harness.start("story-5");
    harness.choose(&mut engine, "choice-2");
    harness.choose(&mut engine, "choice-5");
    engine.complete().unwrap();
    assert!(harness.is_completed("story-5"));

    engine.restart("story-5");

    assert!(!harness.is_completed("story-5"));
    assert_at_segment(&engine, "start");
    assert!(engine.user_choices().is_empty());
}

#[test]
fn test_transitions_outside_ready_are_rejected() {
    let harness = TestHarness::new();
    let mut engine = harness.start("story-1");
    let offered = engine.offered_choices().remove(0);

    engine.start("story-1", "missing", &StaticFlags::new());
    assert_not_found(&engine);
    assert!(matches!(
        engine.select_choice(&offered),
        Err(EngineError::InvalidTransition { .. })
    ));
    assert!(matches!(
        engine.complete(),
        Err(EngineError::InvalidTransition { .. })
    ));
}

#[test]
fn test_unknown_ids_are_not_found() {
    let harness = TestHarness::new();

    let engine = harness.start("story-404");
    assert_not_found(&engine);

    let mut engine = StoryEngine::new(harness.catalog.clone(), harness.progress.clone());
    engine.start("story-3", "attic", &harness.flags);
    assert_not_found(&engine);
    assert!(engine.offered_choices().is_empty());
}

// =============================================================================
// NARRATIVE STYLE AND THEMES
// =============================================================================

#[test]
fn test_first_person_session() {
    let harness = TestHarness::new().with_flag(FIRST_PERSON_NARRATIVE);
    let mut engine = harness.start("story-1");
    harness.choose(&mut engine, "choice-1");
    harness.choose(&mut engine, "choice-3");

    let content = &engine.current_segment().unwrap().content;
    assert!(content.starts_with("I draw your sword"), "{content}");
}

#[test]
fn test_flags_are_read_once_per_session() {
    let harness = TestHarness::new();
    let mut engine = StoryEngine::new(harness.catalog.clone(), harness.progress.clone());

    let flags = StaticFlags::new().enable(DYNAMIC_THEMES);
    engine.start("story-3", "start", &flags);
    assert_eq!(engine.style_token(), Some(StyleToken::Horror));

    // Moving on does not consult any provider; the session keeps its features.
    harness.choose(&mut engine, "choice-1");
    assert_eq!(engine.style_token(), Some(StyleToken::Horror));
    assert!(engine.features().dynamic_themes);
}

// =============================================================================
// READING SCREEN
// =============================================================================

#[test]
fn test_screen_reads_to_completion() {
    let harness = TestHarness::new();
    let mut screen = harness.open("story-6");

    let start = assert_reading(screen.view());
    assert_eq!(start.choices.len(), 2);

    screen.choose(0).unwrap();
    screen.save_progress().unwrap();
    let ending = assert_reading(screen.choose(1).unwrap());
    assert_eq!(ending.segment_id, "church-flee");
    assert!(ending.is_ending);

    let choices = screen.complete().unwrap().unwrap();
    assert_eq!(choices, ["choice-1", "choice-4"]);
    assert_eq!(harness.saved_segment("story-6"), None);
    assert_toasts(&harness.notifier, &["Progress Saved", "Story Completed"]);
}

#[test]
fn test_screen_share_follows_flag() {
    let harness = TestHarness::new();
    assert_eq!(harness.open("story-1").share(), None);

    let harness = TestHarness::new().with_flag(STORY_SHARING);
    assert_eq!(
        harness.open("story-1").share().as_deref(),
        Some("https://storyteller.app/story/story-1")
    );
    assert_toasts(&harness.notifier, &["Link Copied"]);
}

#[test]
fn test_screen_not_found_view() {
    let harness = TestHarness::new();
    let screen = harness.open("story-0");
    assert!(matches!(screen.view(), View::NotFound { .. }));
}

#[test]
fn test_broken_storage_still_reads() {
    let catalog = Arc::new(StoryCatalog::builtin().unwrap());
    let progress: Arc<dyn ProgressStore> = Arc::new(StoredProgress::new(FailingStore));
    let mut engine = StoryEngine::new(catalog, progress);

    engine.resume("story-4", &StaticFlags::new());
    assert_at_segment(&engine, "start");

    engine.save_progress().unwrap();
    engine.start("story-4", "weak-spot", &StaticFlags::new());
    assert_eq!(engine.complete().unwrap(), Completion::Recorded);
}
