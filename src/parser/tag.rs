use nom::branch::alt;
use nom::bytes::complete::tag_no_case;
use nom::character::complete::{char, digit1, space0};
use nom::combinator::{all_consuming, map, map_res, success, value};
use nom::error::context;
use nom::number::complete::float;
use nom::sequence::{delimited, preceded};
use nom::Parser;

use crate::result::ParseResult;

/// Content of a bracket tag inside dialog text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TagContent {
    /// `[N]`, refers to the line's N-th inline instruction.
    Instruction(usize),
    Speed(f32),
    Pause(f32),
    Auto(bool),
    NewLine,
}

/// Parses the text between `[` and `]`. Surrounding spaces are allowed, any
/// trailing garbage fails the parse.
pub fn tag_content(input: &str) -> ParseResult<&str, TagContent> {
    context(
        "tag_content",
        all_consuming(delimited(
            space0,
            alt((instruction, speed, pause, auto, new_line)),
            space0,
        )),
    )
    .parse(input)
}

pub fn instruction(input: &str) -> ParseResult<&str, TagContent> {
    context(
        "instruction",
        map_res(digit1, |s: &str| s.parse::<usize>().map(TagContent::Instruction)),
    )
    .parse(input)
}

pub fn speed(input: &str) -> ParseResult<&str, TagContent> {
    context(
        "speed",
        map(preceded(tag_no_case("speed"), assigned_float), TagContent::Speed),
    )
    .parse(input)
}

pub fn pause(input: &str) -> ParseResult<&str, TagContent> {
    context(
        "pause",
        map(preceded(tag_no_case("pause"), assigned_float), TagContent::Pause),
    )
    .parse(input)
}

/// `auto` alone turns auto-advance on.
pub fn auto(input: &str) -> ParseResult<&str, TagContent> {
    context(
        "auto",
        map(
            preceded(
                tag_no_case("auto"),
                alt((preceded(assign, boolean), success(true))),
            ),
            TagContent::Auto,
        ),
    )
    .parse(input)
}

pub fn new_line(input: &str) -> ParseResult<&str, TagContent> {
    context("new_line", value(TagContent::NewLine, tag_no_case("br"))).parse(input)
}

fn assign(input: &str) -> ParseResult<&str, char> {
    delimited(space0, char('='), space0).parse(input)
}

fn assigned_float(input: &str) -> ParseResult<&str, f32> {
    preceded(assign, float).parse(input)
}

fn boolean(input: &str) -> ParseResult<&str, bool> {
    alt((
        value(true, tag_no_case("true")),
        value(false, tag_no_case("false")),
    ))
    .parse(input)
}
