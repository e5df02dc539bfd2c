//! Inline text events.
//!
//! Authored line text carries bracket tags. Some are presentational bbcode
//! consumed by the renderer, the rest are event markers. The two are told
//! apart by walking the raw text together with the renderer's stripped text:
//! a tag is an event only if the stripped text still contains it verbatim.

use serde::{Deserialize, Serialize};

use crate::parser::{parse_tag, TagContent};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum TextEventKind {
    Speed(f32),
    Pause(f32),
    Auto(bool),
    NewLine,
    /// Index into the script's instruction table, run when reached.
    Instruction(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextEvent {
    /// Number of visible characters displayed before the event fires.
    pub index: usize,
    pub kind: TextEventKind,
}

/// What an `[N]` tag turns into.
#[derive(Debug, Clone, PartialEq)]
pub enum TagResolution {
    Event(usize),
    Splice(String),
    Unresolved,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedText {
    pub text: String,
    pub events: Vec<TextEvent>,
}

/// Extracts positioned events from `raw`.
///
/// `resolve` is called for every genuine `[N]` tag in order of appearance.
pub fn extract_events(
    raw: &str,
    stripped: &str,
    mut resolve: impl FnMut(usize) -> TagResolution,
) -> ParsedText {
    let raw: Vec<char> = raw.chars().collect();
    let stripped: Vec<char> = stripped.chars().collect();

    let mut parsed = ParsedText::default();
    let mut visible = 0;
    let mut i = 0;
    let mut j = 0;

    while i < raw.len() {
        let c = raw[i];

        if c == '\\' && matches!(raw.get(i + 1), Some('[' | ']')) {
            let bracket = raw[i + 1];
            parsed.text.push(bracket);
            visible += 1;
            if stripped.get(j) == Some(&'\\') && stripped.get(j + 1) == Some(&bracket) {
                j += 2;
            } else if stripped.get(j) == Some(&bracket) {
                j += 1;
            }
            i += 2;
            continue;
        }

        if c == '[' {
            let Some(close) = closing_bracket(&raw, i) else {
                // unterminated
                parsed.text.push(c);
                visible += 1;
                if stripped.get(j) == Some(&c) {
                    j += 1;
                }
                i += 1;
                continue;
            };

            let whole = &raw[i..=close];
            let genuine = stripped.get(j..j + whole.len()) == Some(whole);
            if !genuine {
                parsed.text.extend(whole);
                i = close + 1;
                continue;
            }

            let content: String = raw[i + 1..close].iter().collect();
            let kind = match parse_tag(&content) {
                Some(TagContent::Instruction(n)) => match resolve(n) {
                    TagResolution::Event(instruction) => Some(TextEventKind::Instruction(instruction)),
                    TagResolution::Splice(s) => {
                        visible += s.chars().count();
                        parsed.text.push_str(&s);
                        None
                    }
                    TagResolution::Unresolved => {
                        visible += whole.len();
                        parsed.text.extend(whole);
                        None
                    }
                },
                Some(TagContent::Speed(v)) => Some(TextEventKind::Speed(v)),
                Some(TagContent::Pause(v)) => Some(TextEventKind::Pause(v)),
                Some(TagContent::Auto(v)) => Some(TextEventKind::Auto(v)),
                Some(TagContent::NewLine) => Some(TextEventKind::NewLine),
                None => {
                    visible += whole.len();
                    parsed.text.extend(whole);
                    None
                }
            };
            if let Some(kind) = kind {
                parsed.events.push(TextEvent {
                    index: visible,
                    kind,
                });
            }
            j += whole.len();
            i = close + 1;
            continue;
        }

        parsed.text.push(c);
        visible += 1;
        if stripped.get(j) == Some(&c) {
            j += 1;
        }
        i += 1;
    }

    parsed
}

/// Index of the `]` closing the tag opened at `open`. An unescaped `[`
/// found first means the tag at `open` is unterminated.
fn closing_bracket(raw: &[char], open: usize) -> Option<usize> {
    for k in open + 1..raw.len() {
        match raw[k] {
            ']' => return Some(k),
            '[' if raw[k - 1] != '\\' => return None,
            _ => {}
        }
    }
    None
}
