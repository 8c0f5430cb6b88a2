//! Render orchestration for the reader TUI

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use storyteller_core::{style_token, ChatRole, SegmentView, View};

use crate::app::{App, Screen};
use crate::ui::layout::{centered_rect_fixed, chat_areas, AppLayout};
use crate::ui::Overlay;

/// Main render function
pub fn render(frame: &mut Frame, app: &App) {
    let layout = AppLayout::calculate(frame.area());

    render_title_bar(frame, app, layout.title);
    match app.screen {
        Screen::Library => render_library(frame, app, layout.body),
        Screen::Reading => render_reading(frame, app, layout.body),
        Screen::Chat => render_chat(frame, app, layout.body),
    }
    render_status_bar(frame, app, layout.status);
    render_hotkey_bar(frame, app, layout.hotkeys);

    if let Some(overlay) = app.overlay() {
        render_overlay(frame, app, overlay, frame.area());
    }
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = match app.screen {
        Screen::Library => " Interactive Stories ".to_string(),
        Screen::Reading => format!(" {} ", app.story_title().unwrap_or("Story")),
        Screen::Chat => " AI Storyteller ".to_string(),
    };

    let line = Line::from(Span::styled(
        title,
        Style::default()
            .fg(app.theme.foreground)
            .add_modifier(Modifier::BOLD),
    ));
    frame.render_widget(Paragraph::new(line), area);
}

fn render_library(frame: &mut Frame, app: &App, area: Rect) {
    let mut lines = Vec::new();
    for (i, card) in app.cards.iter().enumerate() {
        let selected = i == app.selected;
        let marker = if selected { "> " } else { "  " };
        let title_style = if selected {
            app.theme.selected_style()
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        };

        let mut title = vec![
            Span::styled(format!("{marker}{}", card.meta.title), title_style),
            Span::raw("  "),
            Span::styled(
                format!("[{}]", card.meta.theme.label()),
                Style::default().fg(app
                    .theme
                    .segment_color(style_token(card.meta.theme, true))),
            ),
        ];
        if card.completed {
            title.push(Span::raw("  "));
            title.push(Span::styled("Completed", app.theme.completed_style()));
        }
        lines.push(Line::from(title));
        lines.push(Line::from(Span::styled(
            format!("    {}", card.meta.description),
            app.theme.system_style(),
        )));
        lines.push(Line::from(Span::styled(
            format!("    {}", card.action_label()),
            if selected {
                app.theme.choice_style()
            } else {
                app.theme.system_style()
            },
        )));
        lines.push(Line::from(""));
    }

    let block = Block::default()
        .title(" Library ")
        .borders(Borders::ALL)
        .border_style(app.theme.border_style(true));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_reading(frame: &mut Frame, app: &App, area: Rect) {
    match app.view() {
        None | Some(View::Loading) => {
            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(app.theme.border_style(false));
            frame.render_widget(
                Paragraph::new(Span::styled("Loading...", app.theme.system_style())).block(block),
                area,
            );
        }
        Some(View::NotFound { message }) => {
            let lines = vec![
                Line::from(Span::styled(message, app.theme.error_style())),
                Line::from(""),
                Line::from(Span::styled(
                    "Esc  Return to Stories",
                    app.theme.system_style(),
                )),
            ];
            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(app.theme.error_style());
            frame.render_widget(Paragraph::new(lines).block(block), area);
        }
        Some(View::Reading(segment)) => render_segment(frame, app, &segment, area),
    }
}

fn render_segment(frame: &mut Frame, app: &App, segment: &SegmentView, area: Rect) {
    let mut lines: Vec<Line> = segment
        .content
        .lines()
        .map(|l| Line::from(Span::styled(l.to_string(), app.theme.segment_style(segment.style))))
        .collect();
    lines.push(Line::from(""));

    if segment.is_ending {
        lines.push(Line::from(Span::styled("The End", app.theme.ending_style())));
        lines.push(Line::from(""));
        let label = if segment.completed {
            Span::styled(segment.complete_label(), app.theme.completed_style())
        } else {
            Span::styled(format!("[c] {}", segment.complete_label()), app.theme.choice_style())
        };
        lines.push(Line::from(label));
    } else {
        lines.push(Line::from(Span::styled(
            "What will you do?",
            Style::default().add_modifier(Modifier::UNDERLINED),
        )));
        for (i, choice) in segment.choices.iter().enumerate() {
            lines.push(Line::from(vec![
                Span::styled(format!("  [{}] ", i + 1), app.theme.system_style()),
                Span::styled(choice.clone(), app.theme.choice_style()),
            ]));
        }
    }

    let block = Block::default()
        .title(format!(" {} ", segment.theme.label()))
        .borders(Borders::ALL)
        .border_style(app.theme.segment_border(segment.style));

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.scroll, 0));
    frame.render_widget(paragraph, area);
}

fn render_chat(frame: &mut Frame, app: &App, area: Rect) {
    let (transcript_area, input_area) = chat_areas(area);

    let mut lines = Vec::new();
    if app.services.storyteller.is_none() {
        lines.push(Line::from(Span::styled(
            "Set GROQ_API_KEY to enable the AI storyteller.",
            app.theme.system_style(),
        )));
    }
    for entry in app.chat_history() {
        match entry.role {
            ChatRole::User => lines.push(Line::from(vec![
                Span::styled("You: ", app.theme.selected_style()),
                Span::raw(entry.message.clone()),
            ])),
            ChatRole::Storyteller => {
                let style = entry
                    .theme
                    .map(|t| app.theme.segment_style(style_token(t, true)))
                    .unwrap_or_default();
                let header = match entry.theme {
                    Some(theme) => format!("Storyteller ({}):", theme.label()),
                    None => "Storyteller:".to_string(),
                };
                lines.push(Line::from(Span::styled(
                    header,
                    Style::default().add_modifier(Modifier::BOLD),
                )));
                for l in entry.message.lines() {
                    lines.push(Line::from(Span::styled(l.to_string(), style)));
                }
            }
        }
        lines.push(Line::from(""));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(app.theme.border_style(false));
    frame.render_widget(
        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((app.scroll, 0)),
        transcript_area,
    );

    let input = if app.chat_pending {
        Span::styled("The storyteller is thinking...", app.theme.system_style())
    } else if app.chat_input().is_empty() {
        Span::styled("Describe a story idea...", app.theme.system_style())
    } else {
        Span::raw(app.chat_input().to_string())
    };
    let block = Block::default()
        .title(" Prompt ")
        .borders(Borders::ALL)
        .border_style(app.theme.border_style(true));
    frame.render_widget(Paragraph::new(Line::from(input)).block(block), input_area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let line = match app.status() {
        Some((message, variant)) => Line::from(Span::styled(
            format!(" {message}"),
            app.theme.status_style(variant),
        )),
        None => Line::from(""),
    };
    frame.render_widget(Paragraph::new(line), area);
}

fn render_hotkey_bar(frame: &mut Frame, app: &App, area: Rect) {
    let keys: &[(&str, &str)] = match app.screen {
        Screen::Library => &[
            ("j/k", "Select"),
            ("Enter", "Open"),
            ("s", "Start Over"),
            ("a", "AI Storyteller"),
            ("?", "Help"),
            ("q", "Quit"),
        ],
        Screen::Reading => &[
            ("1-9", "Choose"),
            ("s", "Save"),
            ("x", "Share"),
            ("c", "Complete"),
            ("r", "Restart"),
            ("Esc", "Stories"),
        ],
        Screen::Chat => &[("Enter", "Send"), ("Esc", "Stories")],
    };

    let mut spans = Vec::new();
    for (key, action) in keys {
        spans.push(Span::styled(format!(" {key} "), app.theme.selected_style()));
        spans.push(Span::styled(format!("{action} "), app.theme.system_style()));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_overlay(frame: &mut Frame, app: &App, overlay: &Overlay, area: Rect) {
    match overlay {
        Overlay::Help => render_help_overlay(frame, app, area),
        Overlay::ConfirmStartOver(story_id) => render_confirm_overlay(frame, app, story_id, area),
    }
}

fn render_help_overlay(frame: &mut Frame, app: &App, area: Rect) {
    let popup_area = centered_rect_fixed(50, 22, area);
    frame.render_widget(Clear, popup_area);

    let heading = Style::default().add_modifier(Modifier::UNDERLINED);
    let help_text = vec![
        Line::from(Span::styled(
            " Interactive Stories - Help ",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled("Library:", heading)),
        Line::from("  j/k or ↑/↓   Select a story"),
        Line::from("  Enter        Read the selected story"),
        Line::from("  s            Start a completed story over"),
        Line::from("  a            Open the AI storyteller"),
        Line::from(""),
        Line::from(Span::styled("Reading:", heading)),
        Line::from("  1-9          Make a choice"),
        Line::from("  s            Save progress"),
        Line::from("  x            Share the story"),
        Line::from("  c            Complete the story (at an ending)"),
        Line::from("  r            Restart from the beginning"),
        Line::from("  j/k          Scroll"),
        Line::from("  Esc          Back to the library"),
        Line::from(""),
        Line::from("  q or Ctrl+C  Quit"),
        Line::from(""),
        Line::from(Span::styled(
            "Press Esc or ? to close",
            Style::default().add_modifier(Modifier::DIM),
        )),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(app.theme.border_style(true));

    frame.render_widget(
        Paragraph::new(help_text)
            .block(block)
            .wrap(Wrap { trim: false }),
        popup_area,
    );
}

fn render_confirm_overlay(frame: &mut Frame, app: &App, story_id: &str, area: Rect) {
    let popup_area = centered_rect_fixed(50, 7, area);
    frame.render_widget(Clear, popup_area);

    let title = app
        .services
        .catalog
        .story(story_id)
        .map(|s| s.meta.title.as_str())
        .unwrap_or(story_id);
    let text = vec![
        Line::from(format!("You have completed \"{title}\".")),
        Line::from("Start it over from the beginning?"),
        Line::from(""),
        Line::from(Span::styled(
            "y  Start Over    n  Cancel",
            app.theme.selected_style(),
        )),
    ];

    let block = Block::default()
        .title(" Start Over ")
        .borders(Borders::ALL)
        .border_style(app.theme.border_style(true));
    frame.render_widget(
        Paragraph::new(text).block(block).wrap(Wrap { trim: true }),
        popup_area,
    );
}
