//! The story engine: a state machine over one reading session.
//!
//! The engine resolves segments from the [`StoryCatalog`], voices them in the
//! session's [`NarrativeStyle`], records the reader's choices and marks the
//! story completed exactly once. It owns no I/O of its own: completion goes
//! through the injected [`ProgressStore`], flags are read once at
//! [`StoryEngine::start`].
//!
//! ```ignore
//! let mut engine = StoryEngine::new(catalog, progress);
//! engine.start("story-1", "start", &flags);
//! let choice = engine.offered_choices().remove(0);
//! engine.select_choice(&choice)?;
//! ```

use crate::catalog::{Segment, SegmentNotFound, StoryCatalog, ENTRY_SEGMENT};
use crate::flags::{FlagProvider, SessionFeatures};
use crate::narrative::{transform, NarrativeStyle};
use crate::progress::ProgressStore;
use crate::theme::{style_token, StyleToken};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Callback invoked with the ordered choice ids once a story is completed.
pub type CompletionCallback = Box<dyn FnMut(&[String]) + Send>;

/// Errors from engine transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },

    #[error("choice '{choice_id}' was not offered for the current segment")]
    StaleChoice { choice_id: String },
}

/// Where the session currently is.
///
/// Segments carried by `Ready` and `Completed` hold the voiced content, not
/// the raw catalog text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineState {
    Loading,
    Ready(Segment),
    NotFound(SegmentNotFound),
    Completed(Segment),
}

impl EngineState {
    pub fn name(&self) -> &'static str {
        match self {
            EngineState::Loading => "loading",
            EngineState::Ready(_) => "ready",
            EngineState::NotFound(_) => "not found",
            EngineState::Completed(_) => "completed",
        }
    }

    /// The displayed segment, if there is one.
    pub fn segment(&self) -> Option<&Segment> {
        match self {
            EngineState::Ready(segment) | EngineState::Completed(segment) => Some(segment),
            EngineState::Loading | EngineState::NotFound(_) => None,
        }
    }
}

/// A choice presented to the reader.
///
/// Only the engine hands these out, and each one is tied to the engine and
/// segment it was offered on, so a reader can only pick what was actually
/// shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfferedChoice {
    index: usize,
    engine: u64,
    turn: u64,
    id: String,
    text: String,
}

impl OfferedChoice {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Position in the segment's choice list.
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Outcome of [`StoryEngine::complete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// First completion: persisted and the callback ran.
    Recorded,
    /// The story was already completed; nothing happened.
    AlreadyCompleted,
}

static NEXT_ENGINE_ID: AtomicU64 = AtomicU64::new(1);

/// One reading session.
pub struct StoryEngine {
    catalog: Arc<StoryCatalog>,
    progress: Arc<dyn ProgressStore>,
    features: SessionFeatures,
    story_id: String,
    current_segment_id: String,
    user_choices: Vec<String>,
    is_completed: bool,
    state: EngineState,
    /// Distinguishes engines so choices cannot cross between them.
    id: u64,
    /// Bumped on every segment load; invalidates older offered choices.
    turn: u64,
    on_complete: Option<CompletionCallback>,
}

impl StoryEngine {
    /// Create an idle engine. Call [`start`](Self::start) or
    /// [`resume`](Self::resume) to begin reading.
    pub fn new(catalog: Arc<StoryCatalog>, progress: Arc<dyn ProgressStore>) -> Self {
        Self {
            catalog,
            progress,
            features: SessionFeatures::default(),
            story_id: String::new(),
            current_segment_id: String::new(),
            user_choices: Vec::new(),
            is_completed: false,
            state: EngineState::Loading,
            id: NEXT_ENGINE_ID.fetch_add(1, Ordering::Relaxed),
            turn: 0,
            on_complete: None,
        }
    }

    /// Register the callback run after the first completion is persisted.
    pub fn on_complete(&mut self, callback: impl FnMut(&[String]) + Send + 'static) {
        self.on_complete = Some(Box::new(callback));
    }

    /// Begin a session at the given segment.
    ///
    /// Flags are resolved here and stay fixed until the next `start`.
    pub fn start(
        &mut self,
        story_id: impl Into<String>,
        initial_segment_id: &str,
        flags: &dyn FlagProvider,
    ) -> &EngineState {
        self.features = SessionFeatures::resolve(flags);
        self.story_id = story_id.into();
        self.user_choices.clear();
        self.is_completed = self.progress.is_completed(&self.story_id);

        tracing::debug!(
            story_id = %self.story_id,
            segment_id = initial_segment_id,
            completed = self.is_completed,
            "starting session"
        );

        self.load_segment(initial_segment_id);
        &self.state
    }

    /// Begin a session at the saved segment, or at the entry segment.
    pub fn resume(&mut self, story_id: impl Into<String>, flags: &dyn FlagProvider) -> &EngineState {
        let story_id = story_id.into();
        let segment_id = self
            .progress
            .load_progress(&story_id)
            .unwrap_or_else(|| ENTRY_SEGMENT.to_string());
        self.start(story_id, &segment_id, flags)
    }

    /// The choices of the current segment, in order.
    ///
    /// Empty unless the engine is `Ready` on a non-terminal segment.
    pub fn offered_choices(&self) -> Vec<OfferedChoice> {
        match &self.state {
            EngineState::Ready(segment) if !segment.is_terminal() => segment
                .choices
                .iter()
                .enumerate()
                .map(|(index, choice)| OfferedChoice {
                    index,
                    engine: self.id,
                    turn: self.turn,
                    id: choice.id.clone(),
                    text: choice.text.clone(),
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Follow a choice to its next segment.
    pub fn select_choice(&mut self, choice: &OfferedChoice) -> Result<&EngineState, EngineError> {
        let next_segment_id = match &self.state {
            EngineState::Ready(segment) if !segment.is_terminal() => {
                if choice.engine != self.id || choice.turn != self.turn {
                    return Err(EngineError::StaleChoice {
                        choice_id: choice.id.clone(),
                    });
                }
                segment
                    .choices
                    .get(choice.index)
                    .filter(|c| c.id == choice.id)
                    .map(|c| c.next_segment_id.clone())
                    .ok_or_else(|| EngineError::StaleChoice {
                        choice_id: choice.id.clone(),
                    })?
            }
            state => {
                return Err(EngineError::InvalidTransition {
                    action: "select a choice",
                    state: state.name(),
                })
            }
        };

        self.user_choices.push(choice.id.clone());
        tracing::debug!(
            story_id = %self.story_id,
            choice_id = %choice.id,
            next = %next_segment_id,
            "choice selected"
        );
        self.load_segment(&next_segment_id);
        Ok(&self.state)
    }

    /// Mark the story finished.
    ///
    /// Valid on a terminal segment. The first call persists completion and
    /// then runs the completion callback; later calls change nothing.
    pub fn complete(&mut self) -> Result<Completion, EngineError> {
        let segment = match std::mem::replace(&mut self.state, EngineState::Loading) {
            EngineState::Completed(segment) => {
                self.state = EngineState::Completed(segment);
                return Ok(Completion::AlreadyCompleted);
            }
            EngineState::Ready(segment) if segment.is_terminal() => segment,
            state => {
                let name = state.name();
                self.state = state;
                return Err(EngineError::InvalidTransition {
                    action: "complete the story",
                    state: name,
                });
            }
        };
        self.state = EngineState::Completed(segment);

        if self.is_completed {
            tracing::debug!(story_id = %self.story_id, "story already completed");
            return Ok(Completion::AlreadyCompleted);
        }

        self.progress.set_completed(&self.story_id);
        self.is_completed = true;
        tracing::info!(
            story_id = %self.story_id,
            choices = self.user_choices.len(),
            "story completed"
        );

        if let Some(callback) = self.on_complete.as_mut() {
            callback(&self.user_choices);
        }
        Ok(Completion::Recorded)
    }

    /// Forget completion and progress for a story and read it from the top.
    ///
    /// Keeps the features resolved at session start.
    pub fn restart(&mut self, story_id: impl Into<String>) -> &EngineState {
        self.story_id = story_id.into();
        self.progress.clear_completed(&self.story_id);
        self.progress.clear_progress(&self.story_id);
        self.user_choices.clear();
        self.is_completed = false;

        tracing::info!(story_id = %self.story_id, "restarting story");
        self.load_segment(ENTRY_SEGMENT);
        &self.state
    }

    /// Persist the current segment as the resume point.
    pub fn save_progress(&self) -> Result<(), EngineError> {
        match &self.state {
            EngineState::Ready(_) => {
                self.progress
                    .save_progress(&self.story_id, &self.current_segment_id);
                tracing::debug!(
                    story_id = %self.story_id,
                    segment_id = %self.current_segment_id,
                    "progress saved"
                );
                Ok(())
            }
            state => Err(EngineError::InvalidTransition {
                action: "save progress",
                state: state.name(),
            }),
        }
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn story_id(&self) -> &str {
        &self.story_id
    }

    pub fn current_segment_id(&self) -> &str {
        &self.current_segment_id
    }

    /// The displayed segment, if any.
    pub fn current_segment(&self) -> Option<&Segment> {
        self.state.segment()
    }

    /// Choice ids selected so far, oldest first.
    pub fn user_choices(&self) -> &[String] {
        &self.user_choices
    }

    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    pub fn features(&self) -> SessionFeatures {
        self.features
    }

    pub fn narrative_style(&self) -> NarrativeStyle {
        self.features.narrative_style
    }

    /// Style of the displayed segment under the session's theme flag.
    pub fn style_token(&self) -> Option<StyleToken> {
        self.current_segment()
            .map(|segment| style_token(segment.theme, self.features.dynamic_themes))
    }

    pub fn catalog(&self) -> &StoryCatalog {
        &self.catalog
    }

    fn load_segment(&mut self, segment_id: &str) {
        self.state = EngineState::Loading;
        self.current_segment_id = segment_id.to_string();
        self.turn += 1;

        self.state = match self.catalog.get_segment(&self.story_id, segment_id) {
            Ok(segment) => {
                let mut segment = segment.clone();
                segment.content = transform(&segment.content, self.features.narrative_style);
                EngineState::Ready(segment)
            }
            Err(not_found) => {
                tracing::warn!(error = %not_found, "segment lookup failed");
                EngineState::NotFound(not_found)
            }
        };
    }
}

impl std::fmt::Debug for StoryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoryEngine")
            .field("story_id", &self.story_id)
            .field("current_segment_id", &self.current_segment_id)
            .field("user_choices", &self.user_choices)
            .field("features", &self.features)
            .field("is_completed", &self.is_completed)
            .field("state", &self.state.name())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::{StaticFlags, DYNAMIC_THEMES, FIRST_PERSON_NARRATIVE};
    use crate::progress::{MemoryStore, StoredProgress};
    use std::sync::Mutex;

    fn engine() -> (StoryEngine, Arc<StoredProgress<MemoryStore>>) {
        let catalog = Arc::new(StoryCatalog::builtin().unwrap());
        let progress = Arc::new(StoredProgress::new(MemoryStore::new()));
        (StoryEngine::new(catalog, progress.clone()), progress)
    }

    fn pick(engine: &mut StoryEngine, choice_id: &str) {
        let choice = engine
            .offered_choices()
            .into_iter()
            .find(|c| c.id() == choice_id)
            .unwrap_or_else(|| panic!("choice {choice_id} not offered"));
        engine.select_choice(&choice).unwrap();
    }

    #[test]
    fn test_new_engine_is_loading() {
        let (engine, _) = engine();
        assert_eq!(engine.state(), &EngineState::Loading);
        assert!(engine.offered_choices().is_empty());
    }

    #[test]
    fn test_start_story_one() {
        let (mut engine, _) = engine();
        let state = engine.start("story-1", "start", &StaticFlags::new());

        let EngineState::Ready(segment) = state else {
            panic!("expected ready, got {state:?}");
        };
        let ids: Vec<&str> = segment.choices.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["choice-1", "choice-2"]);
    }

    #[test]
    fn test_select_choice_moves_to_next_segment() {
        let (mut engine, _) = engine();
        engine.start("story-1", "start", &StaticFlags::new());
        pick(&mut engine, "choice-1");

        assert_eq!(engine.current_segment_id(), "dark-path");
        assert_eq!(engine.user_choices(), ["choice-1"]);
        assert!(matches!(engine.state(), EngineState::Ready(s) if s.id == "dark-path"));
    }

    #[test]
    fn test_stale_choice_rejected() {
        let (mut engine, _) = engine();
        engine.start("story-1", "start", &StaticFlags::new());
        let stale = engine.offered_choices().remove(0);
        engine.select_choice(&stale).unwrap();

        let err = engine.select_choice(&stale).unwrap_err();
        assert_eq!(
            err,
            EngineError::StaleChoice {
                choice_id: "choice-1".to_string()
            }
        );
        assert_eq!(engine.user_choices(), ["choice-1"]);
    }

    #[test]
    fn test_choice_from_another_engine_rejected() {
        let (mut first, _) = engine();
        let (mut second, _) = engine();
        first.start("story-1", "start", &StaticFlags::new());
        second.start("story-2", "start", &StaticFlags::new());

        let foreign = first.offered_choices().remove(0);
        let err = second.select_choice(&foreign).unwrap_err();
        assert!(matches!(err, EngineError::StaleChoice { .. }));
        assert!(second.user_choices().is_empty());
        assert!(matches!(second.state(), EngineState::Ready(s) if s.id == "start"));

        first.select_choice(&foreign).unwrap();
        assert_eq!(first.user_choices(), ["choice-1"]);
    }

    #[test]
    fn test_first_person_content() {
        let (mut engine, _) = engine();
        let flags = StaticFlags::new().enable(FIRST_PERSON_NARRATIVE);
        engine.start("story-1", "start", &flags);

        let segment = engine.current_segment().unwrap();
        assert!(segment.content.starts_with("I stand at the edge"));
        assert_eq!(engine.narrative_style(), NarrativeStyle::FirstPerson);
    }

    #[test]
    fn test_style_token_follows_flag() {
        let (mut engine, _) = engine();
        engine.start("story-1", "start", &StaticFlags::new());
        assert_eq!(engine.style_token(), Some(StyleToken::Plain));

        engine.start("story-1", "start", &StaticFlags::new().enable(DYNAMIC_THEMES));
        assert_eq!(engine.style_token(), Some(StyleToken::Medieval));
    }

    #[test]
    fn test_unknown_segment_is_not_found() {
        let (mut engine, _) = engine();
        let state = engine.start("story-1", "no-such-segment", &StaticFlags::new());
        assert!(matches!(state, EngineState::NotFound(e) if e.segment_id == "no-such-segment"));

        let state = engine.start("no-such-story", "start", &StaticFlags::new());
        assert!(matches!(state, EngineState::NotFound(e) if e.story_id == "no-such-story"));
        assert!(engine.offered_choices().is_empty());
    }

    #[test]
    fn test_complete_is_idempotent() {
        let (mut engine, progress) = engine();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = calls.clone();
        engine.on_complete(move |choices| sink.lock().unwrap().push(choices.to_vec()));

        engine.start("story-1", "start", &StaticFlags::new());
        pick(&mut engine, "choice-2");
        pick(&mut engine, "choice-6");
        assert!(engine.current_segment().unwrap().is_terminal());

        assert_eq!(engine.complete().unwrap(), Completion::Recorded);
        assert_eq!(engine.complete().unwrap(), Completion::AlreadyCompleted);

        assert!(progress.is_completed("story-1"));
        assert_eq!(progress.store().len(), 1);
        assert_eq!(
            *calls.lock().unwrap(),
            vec![vec!["choice-2".to_string(), "choice-6".to_string()]]
        );
        assert!(matches!(engine.state(), EngineState::Completed(_)));
    }

    #[test]
    fn test_complete_requires_ending() {
        let (mut engine, _) = engine();
        assert!(matches!(
            engine.complete(),
            Err(EngineError::InvalidTransition { state: "loading", .. })
        ));

        engine.start("story-1", "start", &StaticFlags::new());
        assert!(matches!(
            engine.complete(),
            Err(EngineError::InvalidTransition { state: "ready", .. })
        ));
    }

    #[test]
    fn test_previously_completed_story_does_not_recomplete() {
        let (mut engine, progress) = engine();
        progress.set_completed("story-2");
        let calls = Arc::new(Mutex::new(0));
        let sink = calls.clone();
        engine.on_complete(move |_| *sink.lock().unwrap() += 1);

        engine.start("story-2", "flee-scene", &StaticFlags::new());
        assert!(engine.is_completed());
        assert_eq!(engine.complete().unwrap(), Completion::AlreadyCompleted);
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[test]
    fn test_restart_clears_completion_and_progress() {
        let (mut engine, progress) = engine();
        engine.start("story-3", "start", &StaticFlags::new());
        pick(&mut engine, "choice-1");
        engine.save_progress().unwrap();
        pick(&mut engine, "choice-3");
        engine.complete().unwrap();

        let state = engine.restart("story-3");
        assert!(matches!(state, EngineState::Ready(s) if s.id == "start"));
        assert!(!progress.is_completed("story-3"));
        assert_eq!(progress.load_progress("story-3"), None);
        assert!(engine.user_choices().is_empty());
        assert!(!engine.is_completed());
    }

    #[test]
    fn test_restart_keeps_session_style() {
        let (mut engine, _) = engine();
        engine.start("story-1", "start", &StaticFlags::new().enable(FIRST_PERSON_NARRATIVE));
        engine.restart("story-1");
        assert_eq!(engine.narrative_style(), NarrativeStyle::FirstPerson);
    }

    #[test]
    fn test_resume_from_saved_progress() {
        let (mut engine, progress) = engine();
        progress.save_progress("story-4", "blacksmith");

        engine.resume("story-4", &StaticFlags::new());
        assert_eq!(engine.current_segment_id(), "blacksmith");

        engine.resume("story-5", &StaticFlags::new());
        assert_eq!(engine.current_segment_id(), "start");
    }

    #[test]
    fn test_save_progress_only_when_ready() {
        let (mut engine, progress) = engine();
        assert!(engine.save_progress().is_err());

        engine.start("story-6", "church-dusk", &StaticFlags::new());
        engine.save_progress().unwrap();
        assert_eq!(progress.load_progress("story-6").as_deref(), Some("church-dusk"));

        engine.start("story-6", "missing", &StaticFlags::new());
        assert!(engine.save_progress().is_err());
    }

    #[test]
    fn test_choice_back_to_start_keeps_history() {
        let (mut engine, _) = engine();
        engine.start("story-1", "start", &StaticFlags::new());
        pick(&mut engine, "choice-1");
        pick(&mut engine, "choice-4");
        pick(&mut engine, "choice-10");

        assert_eq!(engine.current_segment_id(), "start");
        assert_eq!(engine.user_choices(), ["choice-1", "choice-4", "choice-10"]);
    }
}
