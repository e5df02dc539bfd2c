//! Presentational markup understood by the default text renderer.

use nom::bytes::complete::{take_till, take_while1};
use nom::character::complete::char;
use nom::combinator::{opt, recognize, verify};
use nom::error::context;
use nom::sequence::{delimited, preceded};
use nom::Parser;

use crate::result::ParseResult;

pub const KNOWN_TAGS: &[&str] = &[
    "b",
    "i",
    "u",
    "s",
    "code",
    "p",
    "center",
    "left",
    "right",
    "fill",
    "indent",
    "url",
    "img",
    "font",
    "font_size",
    "color",
    "bgcolor",
    "fgcolor",
    "outline_size",
    "outline_color",
    "table",
    "cell",
    "ul",
    "ol",
    "lang",
    "hint",
    "dropcap",
    "wave",
    "tornado",
    "shake",
    "fade",
    "rainbow",
];

/// A whole bbcode tag such as `[color=red]` or `[/b]`.
pub fn bbcode_tag(input: &str) -> ParseResult<&str, &str> {
    context(
        "bbcode_tag",
        recognize(delimited(
            char('['),
            (
                opt(char('/')),
                verify(
                    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'),
                    |name: &str| KNOWN_TAGS.iter().any(|t| t.eq_ignore_ascii_case(name)),
                ),
                opt(preceded(
                    verify(take_till(|c: char| c != ' ' && c != '='), |s: &str| !s.is_empty()),
                    take_till(|c: char| c == ']' || c == '[' || c == '\n'),
                )),
            ),
            char(']'),
        )),
    )
    .parse(input)
}

/// Removes known bbcode tags, leaving event tags, escapes and text untouched.
pub fn strip(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(c) = rest.chars().next() {
        if c == '\\' && (rest[1..].starts_with('[') || rest[1..].starts_with(']')) {
            output.push_str(&rest[..2]);
            rest = &rest[2..];
            continue;
        }
        if c == '[' {
            if let Ok((next, _)) = bbcode_tag(rest) {
                rest = next;
                continue;
            }
        }
        output.push(c);
        rest = &rest[c.len_utf8()..];
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbcode_tag() {
        assert_eq!(bbcode_tag("[b]x"), Ok(("x", "[b]")));
        assert_eq!(bbcode_tag("[/b]"), Ok(("", "[/b]")));
        assert_eq!(bbcode_tag("[color=#ff0000]"), Ok(("", "[color=#ff0000]")));
        assert_eq!(
            bbcode_tag("[url href=x]link"),
            Ok(("link", "[url href=x]"))
        );
        assert!(bbcode_tag("[0]").is_err());
        assert!(bbcode_tag("[speed=2]").is_err());
        assert!(bbcode_tag("[bold]").is_err());
    }

    #[test]
    fn test_strip() {
        assert_eq!(strip("[b]Hi[/b] [0]!"), "Hi [0]!");
        assert_eq!(
            strip("[color=red]A[/color] \\[b\\] [speed=2]"),
            "A \\[b\\] [speed=2]"
        );
        assert_eq!(strip("unterminated [b"), "unterminated [b");
        assert_eq!(strip("日本[i]語[/i]"), "日本語");
    }
}
