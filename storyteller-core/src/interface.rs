//! The reader's screens as plain data: the story library and the reading view.
//!
//! Nothing here draws. Front ends (the terminal UI, the headless line
//! protocol) render [`View`]s and forward user actions; toasts go to an
//! injected [`Notifier`].

use crate::catalog::{StoryCatalog, StoryMeta, Theme};
use crate::engine::{Completion, EngineError, EngineState, StoryEngine};
use crate::flags::FlagProvider;
use crate::progress::ProgressStore;
use crate::theme::StyleToken;
use std::sync::Arc;
use thiserror::Error;

/// Base of the links handed out by [`StoryInterface::share`].
pub const DEFAULT_SHARE_BASE_URL: &str = "https://storyteller.app";

/// Message shown when a story or segment cannot be resolved.
pub const NOT_FOUND_MESSAGE: &str = "Story segment not found.";

/// Shareable link for a story.
pub fn share_link(base_url: &str, story_id: &str) -> String {
    format!("{}/story/{}", base_url.trim_end_matches('/'), story_id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToastVariant {
    #[default]
    Default,
    Destructive,
}

/// A transient notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub title: String,
    pub description: String,
    pub variant: ToastVariant,
}

impl Toast {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: ToastVariant::Default,
        }
    }

    pub fn destructive(mut self) -> Self {
        self.variant = ToastVariant::Destructive;
        self
    }

    pub fn progress_saved() -> Self {
        Self::new("Progress Saved", "You can continue your story later.")
    }

    pub fn link_copied() -> Self {
        Self::new("Link Copied", "Share this link with your friends!")
    }

    pub fn sharing_disabled() -> Self {
        Self::new("Sharing Disabled", "This feature is currently unavailable.").destructive()
    }

    pub fn story_completed() -> Self {
        Self::new("Story Completed", "Your choices have been saved to your profile.")
    }
}

/// Receiver of toasts.
pub trait Notifier: Send + Sync {
    fn notify(&self, toast: Toast);
}

/// Notifier that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, toast: Toast) {
        tracing::info!(title = %toast.title, variant = ?toast.variant, "{}", toast.description);
    }
}

#[derive(Debug, Error)]
pub enum InterfaceError {
    #[error("there is no choice {index} (only {available} offered)")]
    NoSuchChoice { index: usize, available: usize },

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// A story as listed in the library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryCard {
    pub meta: StoryMeta,
    pub completed: bool,
}

impl StoryCard {
    /// Completed stories must be started over before they can be opened.
    pub fn can_open(&self) -> bool {
        !self.completed
    }

    pub fn action_label(&self) -> &'static str {
        if self.completed {
            "Start Over"
        } else {
            "Start Reading"
        }
    }
}

/// The story library screen.
#[derive(Clone)]
pub struct Library {
    catalog: Arc<StoryCatalog>,
    progress: Arc<dyn ProgressStore>,
}

impl Library {
    pub fn new(catalog: Arc<StoryCatalog>, progress: Arc<dyn ProgressStore>) -> Self {
        Self { catalog, progress }
    }

    /// One card per story, in catalog order.
    pub fn cards(&self) -> Vec<StoryCard> {
        self.catalog
            .stories()
            .map(|meta| StoryCard {
                completed: self.progress.is_completed(&meta.id),
                meta: meta.clone(),
            })
            .collect()
    }

    /// Clear a story's completion flag so it can be read again.
    ///
    /// Saved progress is left alone.
    pub fn start_over(&self, story_id: &str) {
        tracing::info!(story_id, "starting story over");
        self.progress.clear_completed(story_id);
    }
}

/// What the reading screen shows for a segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentView {
    pub story_id: String,
    pub segment_id: String,
    /// Narrative text, already voiced.
    pub content: String,
    pub theme: Theme,
    pub style: StyleToken,
    /// Choice labels in presentation order.
    pub choices: Vec<String>,
    pub is_ending: bool,
    pub completed: bool,
}

impl SegmentView {
    /// Label of the completion button on an ending.
    pub fn complete_label(&self) -> &'static str {
        if self.completed {
            "Completed"
        } else {
            "Complete Story"
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Loading,
    NotFound { message: String },
    Reading(SegmentView),
}

/// The reading screen for one story.
pub struct StoryInterface {
    engine: StoryEngine,
    progress: Arc<dyn ProgressStore>,
    notifier: Arc<dyn Notifier>,
    story_id: String,
    share_base_url: String,
}

impl StoryInterface {
    /// Open a story, resuming from saved progress when there is any.
    pub fn open(
        catalog: Arc<StoryCatalog>,
        progress: Arc<dyn ProgressStore>,
        flags: &dyn FlagProvider,
        notifier: Arc<dyn Notifier>,
        story_id: impl Into<String>,
    ) -> Self {
        let story_id = story_id.into();
        let mut engine = StoryEngine::new(catalog, progress.clone());
        engine.resume(story_id.clone(), flags);

        Self {
            engine,
            progress,
            notifier,
            story_id,
            share_base_url: DEFAULT_SHARE_BASE_URL.to_string(),
        }
    }

    pub fn with_share_base_url(mut self, url: impl Into<String>) -> Self {
        self.share_base_url = url.into();
        self
    }

    /// Run `callback` with the reader's choices when the story is completed.
    pub fn on_complete(&mut self, callback: impl FnMut(&[String]) + Send + 'static) {
        self.engine.on_complete(callback);
    }

    pub fn story_id(&self) -> &str {
        &self.story_id
    }

    pub fn engine(&self) -> &StoryEngine {
        &self.engine
    }

    /// Whether the share action is offered at all.
    pub fn sharing_enabled(&self) -> bool {
        self.engine.features().story_sharing
    }

    pub fn view(&self) -> View {
        let segment = match self.engine.state() {
            EngineState::Loading => return View::Loading,
            EngineState::NotFound(_) => {
                return View::NotFound {
                    message: NOT_FOUND_MESSAGE.to_string(),
                }
            }
            EngineState::Ready(segment) | EngineState::Completed(segment) => segment,
        };

        View::Reading(SegmentView {
            story_id: self.story_id.clone(),
            segment_id: segment.id.clone(),
            content: segment.content.clone(),
            theme: segment.theme,
            style: self.engine.style_token().unwrap_or_default(),
            choices: segment.choices.iter().map(|c| c.text.clone()).collect(),
            is_ending: segment.is_terminal(),
            completed: self.engine.is_completed(),
        })
    }

    /// Pick the `index`-th presented choice.
    pub fn choose(&mut self, index: usize) -> Result<View, InterfaceError> {
        let offered = self.engine.offered_choices();
        let available = offered.len();
        let choice = offered
            .into_iter()
            .nth(index)
            .ok_or(InterfaceError::NoSuchChoice { index, available })?;

        self.engine.select_choice(&choice)?;
        Ok(self.view())
    }

    pub fn save_progress(&self) -> Result<(), InterfaceError> {
        self.engine.save_progress()?;
        self.notifier.notify(Toast::progress_saved());
        Ok(())
    }

    /// The share link, or `None` when sharing is disabled.
    pub fn share(&self) -> Option<String> {
        if !self.sharing_enabled() {
            self.notifier.notify(Toast::sharing_disabled());
            return None;
        }
        let link = share_link(&self.share_base_url, &self.story_id);
        self.notifier.notify(Toast::link_copied());
        Some(link)
    }

    /// Finish the story.
    ///
    /// Returns the reader's choices on the first completion, `None` if the
    /// story had already been completed.
    pub fn complete(&mut self) -> Result<Option<Vec<String>>, InterfaceError> {
        match self.engine.complete()? {
            Completion::Recorded => {
                self.progress.clear_progress(&self.story_id);
                self.notifier.notify(Toast::story_completed());
                Ok(Some(self.engine.user_choices().to_vec()))
            }
            Completion::AlreadyCompleted => Ok(None),
        }
    }

    /// Read the story again from the beginning.
    pub fn restart(&mut self) -> View {
        self.engine.restart(self.story_id.clone());
        self.view()
    }
}
