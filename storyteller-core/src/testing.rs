//! Testing utilities for the reader.
//!
//! This module provides tools for integration testing:
//! - `MockGenerator` for deterministic storyteller replies without API calls
//! - `RecordingNotifier` and `FailingStore` collaborators
//! - `TestHarness` for wiring engines and reading screens over shared state
//! - Assertion helpers for engine and view state

use crate::catalog::{Choice, Segment, Story, StoryCatalog, StoryMeta, Theme};
use crate::engine::{EngineState, StoryEngine};
use crate::flags::StaticFlags;
use crate::interface::{Notifier, SegmentView, StoryInterface, Toast, View};
use crate::progress::{KeyValueStore, MemoryStore, ProgressStore, StoreError, StoredProgress};
use crate::storyteller::{GeneratorError, StoryGenerator, FALLBACK_STORY};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Id of the story in [`fixture_catalog`].
pub const FIXTURE_STORY: &str = "fixture";

/// A small story with a loop, two endings and second-person text.
///
/// ```text
/// start --left--> cellar --back--> start
///   |               '--dig--> treasure (end)
///   '--right--> bridge (end)
/// ```
pub fn fixture_catalog() -> StoryCatalog {
    let meta = StoryMeta {
        id: FIXTURE_STORY.to_string(),
        title: "Fixture Tale".to_string(),
        description: "A story used by tests.".to_string(),
        cover_image: None,
        theme: Theme::Medieval,
    };
    let story = Story::new(
        meta,
        [
            Segment::branch(
                "start",
                "You wake at a crossroads. Your lantern is lit.",
                Theme::Medieval,
                vec![
                    Choice::new("left", "Take the left road", "cellar"),
                    Choice::new("right", "Take the right road", "bridge"),
                ],
            ),
            Segment::branch(
                "cellar",
                "A cellar door creaks. You hear digging.",
                Theme::Horror,
                vec![
                    Choice::new("back", "Go back", "start"),
                    Choice::new("dig", "Dig", "treasure"),
                ],
            ),
            Segment::ending("treasure", "Your shovel strikes gold.", Theme::Medieval),
            Segment::ending("bridge", "You cross the bridge into the sunrise.", Theme::Futuristic),
        ],
    );

    let mut catalog = StoryCatalog::new();
    if let Err(e) = catalog.insert(story) {
        panic!("fixture story is invalid: {e}");
    }
    catalog
}

/// A scripted reply from the mock generator.
#[derive(Debug, Clone)]
enum MockReply {
    Text(String),
    Fail(String),
}

/// A story generator that returns scripted replies in order.
///
/// Once the script runs out it answers with the fallback story.
#[derive(Debug, Default)]
pub struct MockGenerator {
    replies: Mutex<VecDeque<MockReply>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockGenerator {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| MockReply::Text(r.into())).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue a reply.
    pub fn then_reply(self, text: impl Into<String>) -> Self {
        self.push(MockReply::Text(text.into()));
        self
    }

    /// Queue a failure.
    pub fn then_fail(self, message: impl Into<String>) -> Self {
        self.push(MockReply::Fail(message.into()));
        self
    }

    /// User prompts received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.lock_calls().iter().map(|(_, p)| p.clone()).collect()
    }

    /// System prompts received so far.
    pub fn system_prompts(&self) -> Vec<String> {
        self.lock_calls().iter().map(|(s, _)| s.clone()).collect()
    }

    fn push(&self, reply: MockReply) {
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(reply);
    }

    fn lock_calls(&self) -> std::sync::MutexGuard<'_, Vec<(String, String)>> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl StoryGenerator for MockGenerator {
    async fn generate(&self, system_prompt: &str, prompt: &str) -> Result<String, GeneratorError> {
        self.lock_calls()
            .push((system_prompt.to_string(), prompt.to_string()));

        let reply = self
            .replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        match reply {
            Some(MockReply::Text(text)) => Ok(text),
            Some(MockReply::Fail(message)) => Err(GeneratorError::Other(message)),
            None => Ok(FALLBACK_STORY.to_string()),
        }
    }
}

/// A notifier that keeps every toast.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    toasts: Mutex<Vec<Toast>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toasts(&self) -> Vec<Toast> {
        self.toasts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Titles of the received toasts, oldest first.
    pub fn titles(&self) -> Vec<String> {
        self.toasts().into_iter().map(|t| t.title).collect()
    }

    pub fn clear(&self) {
        self.toasts.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, toast: Toast) {
        self.toasts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(toast);
    }
}

/// A key-value store where every operation fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingStore;

impl KeyValueStore for FailingStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Unavailable("storage disabled".to_string()))
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("storage disabled".to_string()))
    }

    fn remove(&self, _key: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("storage disabled".to_string()))
    }
}

/// Shared catalog, in-memory progress and a recording notifier.
///
/// Engines and screens created from one harness see each other's progress.
pub struct TestHarness {
    pub catalog: Arc<StoryCatalog>,
    pub progress: Arc<StoredProgress<MemoryStore>>,
    pub notifier: Arc<RecordingNotifier>,
    pub flags: StaticFlags,
}

impl TestHarness {
    /// Harness over the built-in stories.
    pub fn new() -> Self {
        match StoryCatalog::builtin() {
            Ok(catalog) => Self::with_catalog(catalog),
            Err(e) => panic!("built-in catalog is invalid: {e}"),
        }
    }

    /// Harness over [`fixture_catalog`].
    pub fn fixture() -> Self {
        Self::with_catalog(fixture_catalog())
    }

    pub fn with_catalog(catalog: StoryCatalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
            progress: Arc::new(StoredProgress::new(MemoryStore::new())),
            notifier: Arc::new(RecordingNotifier::new()),
            flags: StaticFlags::new(),
        }
    }

    /// Enable a flag for engines and screens created afterwards.
    pub fn with_flag(mut self, name: &str) -> Self {
        self.flags = self.flags.enable(name);
        self
    }

    /// An engine started at the story's entry segment.
    pub fn start(&self, story_id: &str) -> StoryEngine {
        let mut engine = StoryEngine::new(self.catalog.clone(), self.progress.clone());
        engine.start(story_id, crate::catalog::ENTRY_SEGMENT, &self.flags);
        engine
    }

    /// A reading screen, resumed from saved progress.
    pub fn open(&self, story_id: &str) -> StoryInterface {
        StoryInterface::open(
            self.catalog.clone(),
            self.progress.clone(),
            &self.flags,
            self.notifier.clone(),
            story_id,
        )
    }

    /// Follow the offered choice with the given id.
    #[track_caller]
    pub fn choose(&self, engine: &mut StoryEngine, choice_id: &str) {
        let Some(choice) = engine
            .offered_choices()
            .into_iter()
            .find(|c| c.id() == choice_id)
        else {
            panic!(
                "choice '{choice_id}' is not offered at '{}'",
                engine.current_segment_id()
            );
        };
        if let Err(e) = engine.select_choice(&choice) {
            panic!("selecting '{choice_id}' failed: {e}");
        }
    }

    pub fn is_completed(&self, story_id: &str) -> bool {
        self.progress.is_completed(story_id)
    }

    pub fn saved_segment(&self, story_id: &str) -> Option<String> {
        self.progress.load_progress(story_id)
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert the engine shows the given segment.
#[track_caller]
pub fn assert_at_segment(engine: &StoryEngine, segment_id: &str) {
    match engine.state() {
        EngineState::Ready(segment) | EngineState::Completed(segment) => assert_eq!(
            segment.id, segment_id,
            "Expected segment '{segment_id}', got '{}'",
            segment.id
        ),
        other => panic!("Expected segment '{segment_id}', engine is {}", other.name()),
    }
}

/// Assert the engine offers exactly these choice ids, in order.
#[track_caller]
pub fn assert_offers(engine: &StoryEngine, choice_ids: &[&str]) {
    let offered: Vec<String> = engine
        .offered_choices()
        .iter()
        .map(|c| c.id().to_string())
        .collect();
    assert_eq!(offered, choice_ids, "Unexpected choices offered");
}

/// Assert the engine could not resolve its segment.
#[track_caller]
pub fn assert_not_found(engine: &StoryEngine) {
    assert!(
        matches!(engine.state(), EngineState::NotFound(_)),
        "Expected not found, engine is {}",
        engine.state().name()
    );
}

/// Unwrap a reading view.
#[track_caller]
pub fn assert_reading(view: View) -> SegmentView {
    match view {
        View::Reading(segment) => segment,
        other => panic!("Expected a segment view, got {other:?}"),
    }
}

/// Assert the toast titles received so far.
#[track_caller]
pub fn assert_toasts(notifier: &RecordingNotifier, titles: &[&str]) {
    assert_eq!(notifier.titles(), titles, "Unexpected toasts");
}
