//! Story catalog: the immutable registry of story graphs.
//!
//! Every story is a flat map of segment id to [`Segment`], entered through the
//! segment `"start"`. Stories are validated when they are inserted, so a
//! catalog that exists is known to be free of dangling choices and dead ends.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use thiserror::Error;
use tokio::fs;

/// Segment id every story starts from.
pub const ENTRY_SEGMENT: &str = "start";

const BUILTIN_STORIES: &str = include_str!("../stories/builtin.json");

/// Presentational theme of a segment or story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Medieval,
    Futuristic,
    Horror,
    #[default]
    Default,
}

impl Theme {
    pub fn name(&self) -> &'static str {
        match self {
            Theme::Medieval => "medieval",
            Theme::Futuristic => "futuristic",
            Theme::Horror => "horror",
            Theme::Default => "default",
        }
    }

    /// Display label ("Medieval", "Horror", ...).
    pub fn label(&self) -> &'static str {
        match self {
            Theme::Medieval => "Medieval",
            Theme::Futuristic => "Futuristic",
            Theme::Horror => "Horror",
            Theme::Default => "Default",
        }
    }
}

/// A labeled edge from one segment to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Choice {
    pub id: String,
    pub text: String,
    pub next_segment_id: String,
}

/// One node of narrative text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub id: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub is_ending: bool,
}

impl Segment {
    /// Create a terminal segment.
    pub fn ending(id: impl Into<String>, content: impl Into<String>, theme: Theme) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            choices: Vec::new(),
            theme,
            is_ending: true,
        }
    }

    /// Create a segment that continues through the given choices.
    pub fn branch(
        id: impl Into<String>,
        content: impl Into<String>,
        theme: Theme,
        choices: Vec<Choice>,
    ) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            choices,
            theme,
            is_ending: false,
        }
    }

    /// Whether this segment ends the story.
    pub fn is_terminal(&self) -> bool {
        self.is_ending
    }

    /// Look up one of this segment's choices.
    pub fn choice(&self, choice_id: &str) -> Option<&Choice> {
        self.choices.iter().find(|c| c.id == choice_id)
    }
}

impl Choice {
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        next_segment_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            next_segment_id: next_segment_id.into(),
        }
    }
}

/// Segments of one story keyed by segment id.
pub type SegmentMap = HashMap<String, Segment>;

/// Listing information for a story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryMeta {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub theme: Theme,
}

/// A complete story graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Story {
    #[serde(flatten)]
    pub meta: StoryMeta,
    pub segments: SegmentMap,
}

impl Story {
    pub fn new(meta: StoryMeta, segments: impl IntoIterator<Item = Segment>) -> Self {
        Self {
            meta,
            segments: segments.into_iter().map(|s| (s.id.clone(), s)).collect(),
        }
    }

    pub fn id(&self) -> &str {
        &self.meta.id
    }
}

/// Returned when a story or segment does not exist.
///
/// Unknown story ids and unknown segment ids both produce this error; the
/// reader shows one recoverable "not found" view for either.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("segment '{segment_id}' not found in story '{story_id}'")]
pub struct SegmentNotFound {
    pub story_id: String,
    pub segment_id: String,
}

/// Errors raised while loading a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("story '{story_id}' has no 'start' segment")]
    MissingEntry { story_id: String },

    #[error("story '{story_id}': segment stored under '{key}' declares id '{declared}'")]
    SegmentIdMismatch {
        story_id: String,
        key: String,
        declared: String,
    },

    #[error("story '{story_id}': segment '{segment_id}' must either offer choices or be an ending")]
    MalformedSegment {
        story_id: String,
        segment_id: String,
    },

    #[error("story '{story_id}': segment '{segment_id}' repeats choice id '{choice_id}'")]
    DuplicateChoice {
        story_id: String,
        segment_id: String,
        choice_id: String,
    },

    #[error("story '{story_id}': choice '{choice_id}' in '{segment_id}' points to missing segment '{target}'")]
    DanglingChoiceReference {
        story_id: String,
        segment_id: String,
        choice_id: String,
        target: String,
    },

    #[error("story '{0}' is already in the catalog")]
    DuplicateStory(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Check the structural invariants of a story graph.
pub fn validate_story(story: &Story) -> Result<(), CatalogError> {
    let story_id = story.id();

    if !story.segments.contains_key(ENTRY_SEGMENT) {
        return Err(CatalogError::MissingEntry {
            story_id: story_id.to_string(),
        });
    }

    for (key, segment) in &story.segments {
        if *key != segment.id {
            return Err(CatalogError::SegmentIdMismatch {
                story_id: story_id.to_string(),
                key: key.clone(),
                declared: segment.id.clone(),
            });
        }

        // Exactly one of {choices, ending}.
        if segment.choices.is_empty() != segment.is_ending {
            return Err(CatalogError::MalformedSegment {
                story_id: story_id.to_string(),
                segment_id: segment.id.clone(),
            });
        }

        let mut seen = HashSet::new();
        for choice in &segment.choices {
            if !seen.insert(choice.id.as_str()) {
                return Err(CatalogError::DuplicateChoice {
                    story_id: story_id.to_string(),
                    segment_id: segment.id.clone(),
                    choice_id: choice.id.clone(),
                });
            }
            if !story.segments.contains_key(&choice.next_segment_id) {
                return Err(CatalogError::DanglingChoiceReference {
                    story_id: story_id.to_string(),
                    segment_id: segment.id.clone(),
                    choice_id: choice.id.clone(),
                    target: choice.next_segment_id.clone(),
                });
            }
        }
    }

    Ok(())
}

/// Registry of all stories available to the reader.
#[derive(Debug, Clone, Default)]
pub struct StoryCatalog {
    stories: HashMap<String, Story>,
    /// Story ids in insertion order, for listings.
    order: Vec<String>,
}

impl StoryCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// The stories bundled with the reader.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_STORIES)
    }

    /// Parse a JSON array of stories.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let stories: Vec<Story> = serde_json::from_str(json)?;
        Self::from_stories(stories)
    }

    /// Load a JSON array of stories from a file.
    pub async fn load_json(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let content = fs::read_to_string(path).await?;
        Self::from_json(&content)
    }

    /// Build a catalog, rejecting it if any story is malformed.
    pub fn from_stories(stories: impl IntoIterator<Item = Story>) -> Result<Self, CatalogError> {
        let mut catalog = Self::new();
        for story in stories {
            catalog.insert(story)?;
        }
        tracing::debug!(stories = catalog.len(), "loaded story catalog");
        Ok(catalog)
    }

    /// Validate and add a story.
    pub fn insert(&mut self, story: Story) -> Result<(), CatalogError> {
        if self.stories.contains_key(story.id()) {
            return Err(CatalogError::DuplicateStory(story.id().to_string()));
        }
        validate_story(&story)?;

        let id = story.id().to_string();
        self.order.push(id.clone());
        self.stories.insert(id, story);
        Ok(())
    }

    /// Add every story of `other`, in its listing order.
    pub fn merge(&mut self, mut other: StoryCatalog) -> Result<(), CatalogError> {
        for id in std::mem::take(&mut other.order) {
            if let Some(story) = other.stories.remove(&id) {
                self.insert(story)?;
            }
        }
        Ok(())
    }

    /// Resolve a segment of a story.
    pub fn get_segment(&self, story_id: &str, segment_id: &str) -> Result<&Segment, SegmentNotFound> {
        self.stories
            .get(story_id)
            .and_then(|story| story.segments.get(segment_id))
            .ok_or_else(|| SegmentNotFound {
                story_id: story_id.to_string(),
                segment_id: segment_id.to_string(),
            })
    }

    pub fn story(&self, story_id: &str) -> Option<&Story> {
        self.stories.get(story_id)
    }

    pub fn contains(&self, story_id: &str) -> bool {
        self.stories.contains_key(story_id)
    }

    /// Listing data for every story, in insertion order.
    pub fn stories(&self) -> impl Iterator<Item = &StoryMeta> {
        self.order
            .iter()
            .filter_map(|id| self.stories.get(id))
            .map(|story| &story.meta)
    }

    pub fn len(&self) -> usize {
        self.stories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stories.is_empty()
    }

    /// Segment ids reachable from the entry segment, in breadth-first order.
    ///
    /// Empty when the story does not exist.
    pub fn reachable_segments(&self, story_id: &str) -> Vec<&str> {
        let Some(story) = self.stories.get(story_id) else {
            return Vec::new();
        };

        let mut visited: HashSet<&str> = HashSet::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::from([ENTRY_SEGMENT]);

        while let Some(id) = queue.pop_front() {
            let Some(segment) = story.segments.get(id) else {
                continue;
            };
            if !visited.insert(segment.id.as_str()) {
                continue;
            }
            order.push(segment.id.as_str());
            for choice in &segment.choices {
                queue.push_back(choice.next_segment_id.as_str());
            }
        }

        order
    }

    /// Segments that no path from the entry segment reaches.
    pub fn unreachable_segments(&self, story_id: &str) -> Vec<&str> {
        let Some(story) = self.stories.get(story_id) else {
            return Vec::new();
        };
        let reachable: HashSet<&str> = self.reachable_segments(story_id).into_iter().collect();
        let mut orphans: Vec<&str> = story
            .segments
            .keys()
            .map(String::as_str)
            .filter(|id| !reachable.contains(id))
            .collect();
        orphans.sort_unstable();
        orphans
    }
}
