//! Main application state and logic

use std::sync::Arc;

use storyteller_core::{
    ChatEntry, InterfaceError, Library, StoryCard, StoryInterface, ToastVariant, View,
};

use crate::services::Services;
use crate::toasts::ToastQueue;
use crate::ui::theme::ReaderTheme;
use crate::ui::Overlay;

/// Which screen is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    #[default]
    Library,
    Reading,
    Chat,
}

/// Main application state
pub struct App {
    pub services: Services,
    toasts: Arc<ToastQueue>,

    // UI state
    pub theme: ReaderTheme,
    pub screen: Screen,
    overlay: Option<Overlay>,

    // Library
    pub cards: Vec<StoryCard>,
    pub selected: usize,

    // Reading
    pub reader: Option<StoryInterface>,
    pub scroll: u16,

    // Chat
    chat_input: String,
    pub chat_pending: bool,

    // Status
    status: Option<(String, ToastVariant)>,
}

impl App {
    pub fn new(services: Services) -> Self {
        let mut app = Self {
            services,
            toasts: Arc::new(ToastQueue::new()),
            theme: ReaderTheme::default(),
            screen: Screen::Library,
            overlay: None,
            cards: Vec::new(),
            selected: 0,
            reader: None,
            scroll: 0,
            chat_input: String::new(),
            chat_pending: false,
            status: None,
        };
        app.refresh_cards();
        app.set_status("Press Enter to read, 'a' for the AI storyteller, '?' for help");
        app
    }

    fn library(&self) -> Library {
        Library::new(self.services.catalog.clone(), self.services.progress.clone())
    }

    /// Reload completion state of every card.
    pub fn refresh_cards(&mut self) {
        self.cards = self.library().cards();
        if self.selected >= self.cards.len() {
            self.selected = self.cards.len().saturating_sub(1);
        }
    }

    pub fn selected_card(&self) -> Option<&StoryCard> {
        self.cards.get(self.selected)
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.cards.len() {
            self.selected += 1;
        }
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Open the selected story, or ask to start it over if it is completed.
    pub fn open_selected(&mut self) {
        let Some(card) = self.selected_card() else {
            return;
        };
        if card.can_open() {
            let id = card.meta.id.clone();
            self.open_story(&id);
        } else {
            self.overlay = Some(Overlay::ConfirmStartOver(card.meta.id.clone()));
        }
    }

    /// Ask to start the selected story over.
    pub fn request_start_over(&mut self) {
        if let Some(card) = self.selected_card().filter(|c| c.completed) {
            self.overlay = Some(Overlay::ConfirmStartOver(card.meta.id.clone()));
        }
    }

    /// Clear the story's completion and open it.
    pub fn confirm_start_over(&mut self) {
        if let Some(Overlay::ConfirmStartOver(story_id)) = self.overlay.take() {
            self.library().start_over(&story_id);
            self.open_story(&story_id);
        }
    }

    pub fn open_story(&mut self, story_id: &str) {
        tracing::info!(story_id, "opening story");
        self.reader = Some(self.services.open(story_id, self.toasts.clone()));
        self.screen = Screen::Reading;
        self.scroll = 0;
        self.status = None;
    }

    pub fn back_to_library(&mut self) {
        self.reader = None;
        self.screen = Screen::Library;
        self.refresh_cards();
    }

    pub fn view(&self) -> Option<View> {
        self.reader.as_ref().map(|r| r.view())
    }

    /// Title of the open story.
    pub fn story_title(&self) -> Option<&str> {
        let reader = self.reader.as_ref()?;
        self.services
            .catalog
            .story(reader.story_id())
            .map(|s| s.meta.title.as_str())
    }

    /// Pick the `index`-th choice of the open story.
    pub fn choose(&mut self, index: usize) {
        let Some(reader) = self.reader.as_mut() else {
            return;
        };
        match reader.choose(index) {
            Ok(_) => self.scroll = 0,
            Err(InterfaceError::NoSuchChoice { .. }) => {}
            Err(e) => self.set_error(e.to_string()),
        }
    }

    pub fn save_progress(&mut self) {
        if let Some(Err(e)) = self.reader.as_ref().map(|r| r.save_progress()) {
            self.set_error(e.to_string());
        }
        self.pull_toasts();
    }

    pub fn share(&mut self) {
        let link = self.reader.as_ref().and_then(|r| r.share());
        self.pull_toasts();
        if let Some(link) = link {
            self.set_status(format!("Link Copied: {link}"));
        }
    }

    /// Complete the story and return to the library.
    pub fn complete(&mut self) {
        let Some(reader) = self.reader.as_mut() else {
            return;
        };
        match reader.complete() {
            Ok(Some(choices)) => {
                tracing::info!(choices = ?choices, "story completed");
                self.back_to_library();
            }
            Ok(None) => {}
            Err(e) => self.set_error(e.to_string()),
        }
        self.pull_toasts();
    }

    pub fn restart(&mut self) {
        if let Some(reader) = self.reader.as_mut() {
            reader.restart();
            self.scroll = 0;
        }
    }

    pub fn open_chat(&mut self) {
        self.screen = Screen::Chat;
        if self.services.storyteller.is_none() {
            self.set_error("AI storyteller is not configured (set GROQ_API_KEY)");
        }
    }

    pub fn chat_history(&self) -> &[ChatEntry] {
        self.services
            .storyteller
            .as_ref()
            .map(|s| s.history())
            .unwrap_or_default()
    }

    pub fn chat_input(&self) -> &str {
        &self.chat_input
    }

    pub fn push_char(&mut self, c: char) {
        self.chat_input.push(c);
    }

    pub fn backspace(&mut self) {
        self.chat_input.pop();
    }

    /// Take the typed prompt, if there is one and nothing is in flight.
    pub fn take_prompt(&mut self) -> Option<String> {
        if self.chat_pending || self.chat_input.trim().is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.chat_input))
    }

    /// Send a prompt to the storyteller.
    pub async fn ask_storyteller(&mut self, prompt: &str) {
        let Some(storyteller) = self.services.storyteller.as_mut() else {
            self.set_error("AI storyteller is not configured (set GROQ_API_KEY)");
            return;
        };

        self.chat_pending = true;
        let result = storyteller.ask(prompt).await.map(|_| ());
        self.chat_pending = false;

        match result {
            Ok(()) => self.status = None,
            Err(e) => self.set_error(format!("Storyteller error: {e}")),
        }
    }

    pub fn scroll_up(&mut self, amount: u16) {
        self.scroll = self.scroll.saturating_sub(amount);
    }

    pub fn scroll_down(&mut self, amount: u16) {
        self.scroll = self.scroll.saturating_add(amount);
    }

    pub fn overlay(&self) -> Option<&Overlay> {
        self.overlay.as_ref()
    }

    pub fn has_overlay(&self) -> bool {
        self.overlay.is_some()
    }

    pub fn close_overlay(&mut self) {
        self.overlay = None;
    }

    pub fn toggle_help(&mut self) {
        self.overlay = match self.overlay {
            Some(Overlay::Help) => None,
            _ => Some(Overlay::Help),
        };
    }

    /// Show the newest pending toast in the status bar.
    pub fn pull_toasts(&mut self) {
        if let Some(toast) = self.toasts.drain().pop() {
            self.status = Some((
                format!("{}: {}", toast.title, toast.description),
                toast.variant,
            ));
        }
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = Some((message.into(), ToastVariant::Default));
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.status = Some((message.into(), ToastVariant::Destructive));
    }

    pub fn status(&self) -> Option<(&str, ToastVariant)> {
        self.status.as_ref().map(|(m, v)| (m.as_str(), *v))
    }
}
