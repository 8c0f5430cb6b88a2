//! Headless mode for the reader.
//!
//! This module provides a simple text-based interface for reading stories
//! without a TUI. It's designed for automated testing and scripting.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use storyteller_core::{ChatRole, InterfaceError, Library, StoryInterface, ToastVariant, View};

use crate::services::Services;
use crate::toasts::ToastQueue;

/// What the input loop should do after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Line-oriented reader session.
pub struct HeadlessReader {
    services: Services,
    toasts: Arc<ToastQueue>,
    screen: Option<StoryInterface>,
}

impl HeadlessReader {
    pub fn new(services: Services) -> Self {
        Self {
            services,
            toasts: Arc::new(ToastQueue::new()),
            screen: None,
        }
    }

    fn library(&self) -> Library {
        Library::new(self.services.catalog.clone(), self.services.progress.clone())
    }

    /// Handle one line of input.
    ///
    /// - Lines starting with `#` are commands
    /// - A number picks that choice of the current segment
    pub async fn handle_line<W: Write>(&mut self, line: &str, out: &mut W) -> io::Result<Flow> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Flow::Continue);
        }

        let flow = match line.strip_prefix('#') {
            Some(command) => self.handle_command(command, out).await?,
            None => {
                self.handle_choice(line, out)?;
                Flow::Continue
            }
        };

        self.print_toasts(out)?;
        out.flush()?;
        Ok(flow)
    }

    async fn handle_command<W: Write>(&mut self, command: &str, out: &mut W) -> io::Result<Flow> {
        let (name, arg) = match command.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (command, ""),
        };

        match name {
            "quit" | "exit" => {
                writeln!(out, "Goodbye!")?;
                return Ok(Flow::Quit);
            }
            "list" => self.print_library(out)?,
            "open" => {
                if arg.is_empty() {
                    writeln!(out, "[ERROR] Usage: #open <story-id>")?;
                } else {
                    self.open(arg, out)?;
                }
            }
            "start-over" => {
                if arg.is_empty() {
                    writeln!(out, "[ERROR] Usage: #start-over <story-id>")?;
                } else {
                    self.library().start_over(arg);
                    self.open(arg, out)?;
                }
            }
            "back" => {
                self.screen = None;
                self.print_library(out)?;
            }
            "save" => match &self.screen {
                Some(screen) => {
                    if let Err(e) = screen.save_progress() {
                        writeln!(out, "[ERROR] {e}")?;
                    }
                }
                None => writeln!(out, "[ERROR] No story is open.")?,
            },
            "share" => match &self.screen {
                Some(screen) => {
                    if let Some(link) = screen.share() {
                        writeln!(out, "[LINK] {link}")?;
                    }
                }
                None => writeln!(out, "[ERROR] No story is open.")?,
            },
            "complete" => self.complete(out)?,
            "restart" => match self.screen.as_mut() {
                Some(screen) => {
                    screen.restart();
                    self.print_view(out)?;
                }
                None => writeln!(out, "[ERROR] No story is open.")?,
            },
            "status" => self.print_status(out)?,
            "ask" => self.ask(arg, out).await?,
            "help" => print_help(out)?,
            _ => writeln!(out, "[ERROR] Unknown command. Type #help for help.")?,
        }

        Ok(Flow::Continue)
    }

    fn handle_choice<W: Write>(&mut self, line: &str, out: &mut W) -> io::Result<()> {
        let Some(screen) = self.screen.as_mut() else {
            writeln!(out, "[ERROR] No story is open. Use #open <story-id>.")?;
            return Ok(());
        };

        let Ok(number) = line.parse::<usize>() else {
            writeln!(out, "[ERROR] Enter a choice number or a #command.")?;
            return Ok(());
        };

        match screen.choose(number.wrapping_sub(1)) {
            Ok(_) => self.print_view(out),
            Err(InterfaceError::NoSuchChoice { available, .. }) => {
                writeln!(out, "[ERROR] Choose a number from 1 to {available}.")
            }
            Err(e) => writeln!(out, "[ERROR] {e}"),
        }
    }

    /// Open a story unless it has already been completed.
    pub fn open<W: Write>(&mut self, story_id: &str, out: &mut W) -> io::Result<()> {
        let completed = self
            .library()
            .cards()
            .into_iter()
            .any(|card| card.meta.id == story_id && !card.can_open());
        if completed {
            writeln!(
                out,
                "[INFO] {story_id} is already completed. Use #start-over {story_id} to read it again."
            )?;
            return Ok(());
        }

        tracing::info!(story_id, "opening story");
        self.screen = Some(self.services.open(story_id, self.toasts.clone()));
        self.print_view(out)
    }

    fn complete<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        let Some(screen) = self.screen.as_mut() else {
            return writeln!(out, "[ERROR] No story is open.");
        };

        match screen.complete() {
            Ok(Some(choices)) => {
                writeln!(out, "[COMPLETED] Choices: {}", choices.join(", "))?;
                self.screen = None;
                Ok(())
            }
            Ok(None) => writeln!(out, "[INFO] This story is already completed."),
            Err(e) => writeln!(out, "[ERROR] {e}"),
        }
    }

    async fn ask<W: Write>(&mut self, prompt: &str, out: &mut W) -> io::Result<()> {
        let Some(storyteller) = self.services.storyteller.as_mut() else {
            return writeln!(
                out,
                "[ERROR] The AI storyteller is not configured (set GROQ_API_KEY)."
            );
        };
        if prompt.is_empty() {
            return writeln!(out, "[ERROR] Usage: #ask <prompt>");
        }

        write!(out, "[PROCESSING]")?;
        out.flush()?;
        let result = storyteller.ask(prompt).await;
        write!(out, "\r            \r")?;

        if let Err(e) = result {
            tracing::warn!(error = %e, "storyteller request failed");
        }
        if let Some(entry) = storyteller
            .history()
            .last()
            .filter(|e| e.role == ChatRole::Storyteller)
        {
            let theme = entry.theme.map(|t| t.name()).unwrap_or("none");
            writeln!(out, "[STORYTELLER] ({theme})")?;
            writeln!(out, "{}", entry.message)?;
        }
        Ok(())
    }

    fn print_library<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "[LIBRARY]")?;
        for card in self.library().cards() {
            let status = if card.completed { " [completed]" } else { "" };
            writeln!(
                out,
                "  {:<10} {} ({}){status}",
                card.meta.id,
                card.meta.title,
                card.meta.theme.label()
            )?;
        }
        Ok(())
    }

    fn print_view<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let Some(screen) = &self.screen else {
            return Ok(());
        };

        match screen.view() {
            View::Loading => writeln!(out, "[LOADING]"),
            View::NotFound { message } => {
                writeln!(out, "[NOT FOUND] {message}")?;
                writeln!(out, "  #back to return to the library")
            }
            View::Reading(segment) => {
                writeln!(out, "[SEGMENT] {} ({})", segment.segment_id, segment.theme.name())?;
                writeln!(out, "{}", segment.content)?;
                if segment.is_ending {
                    writeln!(out, "[THE END]")?;
                    if !segment.completed {
                        writeln!(out, "  #complete to finish the story")?;
                    }
                } else {
                    writeln!(out, "What will you do next?")?;
                    for (i, choice) in segment.choices.iter().enumerate() {
                        writeln!(out, "  {}. {choice}", i + 1)?;
                    }
                }
                Ok(())
            }
        }
    }

    fn print_status<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let Some(screen) = &self.screen else {
            return writeln!(out, "[STATUS] No story is open.");
        };

        let engine = screen.engine();
        writeln!(out, "[STATUS]")?;
        writeln!(out, "  Story: {}", screen.story_id())?;
        writeln!(out, "  Segment: {}", engine.current_segment_id())?;
        writeln!(out, "  Choices: {}", engine.user_choices().join(", "))?;
        writeln!(out, "  Narrative: {}", engine.narrative_style().name())?;
        writeln!(out, "  Completed: {}", engine.is_completed())
    }

    fn print_toasts<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for toast in self.toasts.drain() {
            let tag = match toast.variant {
                ToastVariant::Default => "TOAST",
                ToastVariant::Destructive => "WARNING",
            };
            writeln!(out, "[{tag}] {}: {}", toast.title, toast.description)?;
        }
        Ok(())
    }
}

fn print_help<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "[HELP]")?;
    writeln!(out, "  #list               - List the stories")?;
    writeln!(out, "  #open <id>          - Open a story (resumes saved progress)")?;
    writeln!(out, "  #start-over <id>    - Clear a completed story and open it")?;
    writeln!(out, "  #save               - Save your place in the open story")?;
    writeln!(out, "  #share              - Get a link to the open story")?;
    writeln!(out, "  #complete           - Finish the story at an ending")?;
    writeln!(out, "  #restart            - Read the open story from the start")?;
    writeln!(out, "  #back               - Close the story")?;
    writeln!(out, "  #status             - Show the reading session")?;
    writeln!(out, "  #ask <prompt>       - Ask the AI storyteller for a story")?;
    writeln!(out, "  #quit               - Exit")?;
    writeln!(out, "  <number>            - Pick a choice")
}

/// Run the reader in headless mode on stdin/stdout.
pub async fn run_headless(services: Services, story: Option<String>) -> io::Result<()> {
    let mut reader = HeadlessReader::new(services);
    let mut stdout = io::stdout();

    writeln!(stdout, "=== Storyteller Headless Mode ===")?;
    reader.print_library(&mut stdout)?;
    writeln!(stdout)?;
    print_help(&mut stdout)?;
    writeln!(stdout)?;

    if let Some(story_id) = story {
        reader.open(&story_id, &mut stdout)?;
    }
    stdout.flush()?;

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("Error reading input: {e}");
                break;
            }
        };

        if reader.handle_line(&line, &mut stdout).await? == Flow::Quit {
            break;
        }
    }

    Ok(())
}

/// Parse the story to open from command line arguments.
pub fn parse_story_from_args(args: &[String]) -> Option<String> {
    args.iter()
        .position(|a| a == "--story")
        .and_then(|i| args.get(i + 1))
        .cloned()
}
