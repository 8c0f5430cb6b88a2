//! AI storyteller chat: short generated stories tagged with a theme.

use crate::catalog::Theme;
use async_trait::async_trait;
use thiserror::Error;

/// Instructions sent with every prompt.
pub const SYSTEM_PROMPT: &str = "You are a creative storyteller. Generate a concise, creative story (150-200 words) based on the user's prompt. Ensure the story has a clear setting, challenge, and resolution. Assign a theme (medieval, futuristic, or horror) that fits the story's tone, and include the theme in the response (e.g., 'Theme: medieval').";

/// Reply used when the model returns no text.
pub const FALLBACK_STORY: &str = "Sorry, I couldn’t generate a story right now.";

const MAX_TOKENS: usize = 300;
const TEMPERATURE: f32 = 0.7;
const TOP_P: f32 = 0.9;

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("story generator is not configured: {0}")]
    NotConfigured(String),

    #[error(transparent)]
    Groq(#[from] groq::Error),

    #[error("{0}")]
    Other(String),
}

/// Produces story text from a prompt.
#[async_trait]
pub trait StoryGenerator: Send + Sync {
    async fn generate(&self, system_prompt: &str, prompt: &str) -> Result<String, GeneratorError>;
}

/// [`StoryGenerator`] backed by the Groq chat API.
#[derive(Clone)]
pub struct GroqGenerator {
    client: groq::Groq,
}

impl GroqGenerator {
    pub fn new(client: groq::Groq) -> Self {
        Self { client }
    }

    /// Build from `GROQ_API_KEY`.
    pub fn from_env() -> Result<Self, GeneratorError> {
        let client = groq::Groq::from_env()
            .map_err(|e| GeneratorError::NotConfigured(e.to_string()))?;
        Ok(Self::new(client))
    }

    pub fn model(&self) -> &str {
        self.client.model()
    }
}

#[async_trait]
impl StoryGenerator for GroqGenerator {
    async fn generate(&self, system_prompt: &str, prompt: &str) -> Result<String, GeneratorError> {
        let request = groq::Request::new(vec![groq::Message::user(prompt)])
            .with_system(system_prompt)
            .with_max_tokens(MAX_TOKENS)
            .with_temperature(TEMPERATURE)
            .with_top_p(TOP_P)
            .with_penalties(0.0, 0.0);

        let response = self.client.complete(request).await?;
        tracing::debug!(
            model = %response.model,
            completion_tokens = response.usage.completion_tokens,
            "story generated"
        );

        Ok(response
            .content
            .filter(|text| !text.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_STORY.to_string()))
    }
}

/// Pull the theme marker out of generated text.
///
/// `Theme: futuristic` and `Theme: horror` select those themes; anything else
/// is medieval. The first marker (and the newline after it) is removed and
/// the rest trimmed.
pub fn extract_theme(text: &str) -> (Theme, String) {
    let theme = if text.contains("Theme: futuristic") {
        Theme::Futuristic
    } else if text.contains("Theme: horror") {
        Theme::Horror
    } else {
        Theme::Medieval
    };

    let marker = [Theme::Medieval, Theme::Futuristic, Theme::Horror]
        .into_iter()
        .filter_map(|t| {
            let marker = format!("Theme: {}", t.name());
            text.find(&marker).map(|at| (at, marker.len()))
        })
        .min_by_key(|(at, _)| *at);

    let content = match marker {
        Some((at, len)) => {
            let mut end = at + len;
            if text[end..].starts_with('\n') {
                end += 1;
            }
            format!("{}{}", &text[..at], &text[end..])
        }
        None => text.to_string(),
    };

    (theme, content.trim().to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Storyteller,
}

/// One line of the chat transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEntry {
    pub role: ChatRole,
    pub message: String,
    /// Set on storyteller replies.
    pub theme: Option<Theme>,
}

/// A chat session with a story generator.
pub struct Storyteller<G> {
    generator: G,
    history: Vec<ChatEntry>,
}

impl<G: StoryGenerator> Storyteller<G> {
    pub fn new(generator: G) -> Self {
        Self {
            generator,
            history: Vec::new(),
        }
    }

    pub fn history(&self) -> &[ChatEntry] {
        &self.history
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    /// Ask for a story.
    ///
    /// Blank prompts are ignored and return `Ok(None)`. On failure an apology
    /// is still added to the history before the error is returned.
    pub async fn ask(&mut self, prompt: &str) -> Result<Option<&ChatEntry>, GeneratorError> {
        if prompt.trim().is_empty() {
            return Ok(None);
        }

        self.history.push(ChatEntry {
            role: ChatRole::User,
            message: prompt.to_string(),
            theme: None,
        });

        let reply = match self.generator.generate(SYSTEM_PROMPT, prompt).await {
            Ok(text) => {
                let (theme, message) = extract_theme(&text);
                ChatEntry {
                    role: ChatRole::Storyteller,
                    message,
                    theme: Some(theme),
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "story generation failed");
                self.history.push(ChatEntry {
                    role: ChatRole::Storyteller,
                    message: format!("{FALLBACK_STORY} Error: {e}. Try again later!"),
                    theme: Some(Theme::Medieval),
                });
                return Err(e);
            }
        };

        self.history.push(reply);
        Ok(self.history.last())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockGenerator;

    #[test]
    fn test_extract_futuristic() {
        let (theme, text) = extract_theme("Theme: futuristic\nThe ship drifts.");
        assert_eq!(theme, Theme::Futuristic);
        assert_eq!(text, "The ship drifts.");
    }

    #[test]
    fn test_extract_trailing_marker() {
        let (theme, text) = extract_theme("The house creaks.\n\nTheme: horror");
        assert_eq!(theme, Theme::Horror);
        assert_eq!(text, "The house creaks.");
    }

    #[test]
    fn test_extract_defaults_to_medieval() {
        let (theme, text) = extract_theme("  A knight rides out.  ");
        assert_eq!(theme, Theme::Medieval);
        assert_eq!(text, "A knight rides out.");

        let (theme, text) = extract_theme("Theme: medieval\nA bard sings.");
        assert_eq!(theme, Theme::Medieval);
        assert_eq!(text, "A bard sings.");
    }

    #[test]
    fn test_extract_removes_only_first_marker() {
        let (theme, text) = extract_theme("Theme: horror\nBoo.\nTheme: horror");
        assert_eq!(theme, Theme::Horror);
        assert_eq!(text, "Boo.\nTheme: horror");
    }

    #[tokio::test]
    async fn test_ask_records_history() {
        let generator = MockGenerator::new(["Theme: futuristic\nNeon rain falls."]);
        let mut teller = Storyteller::new(generator);

        let reply = teller.ask("a city of robots").await.unwrap().cloned().unwrap();
        assert_eq!(reply.message, "Neon rain falls.");
        assert_eq!(reply.theme, Some(Theme::Futuristic));

        assert_eq!(teller.history().len(), 2);
        assert_eq!(teller.history()[0].role, ChatRole::User);
        assert_eq!(teller.generator().prompts(), ["a city of robots"]);
        assert_eq!(teller.generator().system_prompts(), [SYSTEM_PROMPT]);
    }

    #[tokio::test]
    async fn test_blank_prompt_ignored() {
        let mut teller = Storyteller::new(MockGenerator::default());
        assert!(teller.ask("   ").await.unwrap().is_none());
        assert!(teller.history().is_empty());
    }

    #[tokio::test]
    async fn test_failure_records_apology() {
        let generator = MockGenerator::default().then_fail("rate limited");
        let mut teller = Storyteller::new(generator);

        let err = teller.ask("a dragon").await.unwrap_err();
        assert_eq!(err.to_string(), "rate limited");

        let last = teller.history().last().unwrap();
        assert_eq!(
            last.message,
            "Sorry, I couldn’t generate a story right now. Error: rate limited. Try again later!"
        );
        assert_eq!(last.theme, Some(Theme::Medieval));
    }

    #[tokio::test]
    #[ignore] // Requires GROQ_API_KEY
    async fn test_groq_generator_live() {
        dotenvy::dotenv().ok();
        let generator = GroqGenerator::from_env().expect("GROQ_API_KEY not set");
        let mut teller = Storyteller::new(generator);

        let reply = teller.ask("A lighthouse keeper finds a map").await.unwrap().unwrap();
        assert!(!reply.message.is_empty());
        assert!(reply.theme.is_some());
    }
}
