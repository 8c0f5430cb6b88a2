//! Branching interactive-fiction reader.
//!
//! This crate provides:
//! - A validated catalog of branching stories
//! - A story engine that walks a story graph and records the reader's choices
//! - Feature-flagged first/third-person narration and per-segment themes
//! - Per-story progress and completion persistence
//! - Headless models of the library and reading screens
//! - An AI storyteller chat backed by Groq
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use storyteller_core::{
//!     LogNotifier, MemoryStore, StaticFlags, StoredProgress, StoryCatalog, StoryInterface, View,
//! };
//!
//! let catalog = Arc::new(StoryCatalog::builtin()?);
//! let progress = Arc::new(StoredProgress::new(MemoryStore::new()));
//! let flags = StaticFlags::from_list("use_first_person_narrative");
//!
//! let mut reader =
//!     StoryInterface::open(catalog, progress, &flags, Arc::new(LogNotifier), "story-1");
//! if let View::Reading(segment) = reader.choose(0)? {
//!     println!("{}", segment.content);
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod engine;
pub mod flags;
pub mod interface;
pub mod narrative;
pub mod progress;
pub mod storyteller;
pub mod testing;
pub mod theme;

// Primary public API
pub use catalog::{
    CatalogError, Choice, Segment, SegmentNotFound, Story, StoryCatalog, StoryMeta, Theme,
    ENTRY_SEGMENT,
};
pub use config::{ConfigError, ReaderConfig};
pub use engine::{Completion, EngineError, EngineState, OfferedChoice, StoryEngine};
pub use flags::{FlagError, FlagProvider, SessionFeatures, StaticFlags};
pub use interface::{
    InterfaceError, Library, LogNotifier, Notifier, SegmentView, StoryCard, StoryInterface, Toast,
    ToastVariant, View,
};
pub use narrative::{transform, NarrativeStyle};
pub use progress::{
    JsonFileStore, KeyValueStore, MemoryStore, ProgressStore, StoreError, StoredProgress,
};
pub use storyteller::{
    extract_theme, ChatEntry, ChatRole, GeneratorError, GroqGenerator, StoryGenerator, Storyteller,
};
pub use testing::{MockGenerator, RecordingNotifier, TestHarness};
pub use theme::{style_token, StyleToken};
