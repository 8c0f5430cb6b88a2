//! Narrative style: first- or third-person rendering of segment text.
//!
//! Stories are written in the second person ("You stand..."). The transform
//! is a token substitution, not a grammar engine: "You are" becomes "I are".

use serde::{Deserialize, Serialize};

/// How segment text is voiced for the reader. Fixed for a whole session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NarrativeStyle {
    FirstPerson,
    #[default]
    ThirdPerson,
}

impl NarrativeStyle {
    /// Style selected by the `use_first_person_narrative` flag.
    pub fn from_first_person_flag(enabled: bool) -> Self {
        if enabled {
            NarrativeStyle::FirstPerson
        } else {
            NarrativeStyle::ThirdPerson
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            NarrativeStyle::FirstPerson => "first-person",
            NarrativeStyle::ThirdPerson => "third-person",
        }
    }

    /// Prefix that marks text as already voiced in this style.
    fn voiced_prefix(&self) -> &'static str {
        match self {
            NarrativeStyle::FirstPerson => "I",
            NarrativeStyle::ThirdPerson => "You",
        }
    }

    /// Substitutions for this style, longest token first.
    fn substitutions(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            NarrativeStyle::FirstPerson => &[("Your ", "My "), ("You ", "I ")],
            NarrativeStyle::ThirdPerson => &[("I am ", "You are "), ("My ", "Your "), ("I ", "You ")],
        }
    }
}

/// Render `text` in the given narrative style.
///
/// Text that already starts with the style's pronoun is returned unchanged.
/// Otherwise every token is replaced in a single pass over the original text,
/// so replacements are never rescanned. Tokens only match at the start of a
/// word and only in their capitalized form.
pub fn transform(text: &str, style: NarrativeStyle) -> String {
    if text.starts_with(style.voiced_prefix()) {
        return text.to_string();
    }
    substitute(text, style.substitutions())
}

fn substitute(text: &str, rules: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut at_word_start = true;

    while !rest.is_empty() {
        if at_word_start {
            if let Some((from, to)) = rules.iter().find(|(from, _)| rest.starts_with(from)) {
                out.push_str(to);
                rest = &rest[from.len()..];
                // Every token ends in a space.
                at_word_start = true;
                continue;
            }
        }

        let mut chars = rest.chars();
        let Some(c) = chars.next() else {
            break;
        };
        out.push(c);
        at_word_start = !c.is_alphanumeric();
        rest = chars.as_str();
    }

    out
}
