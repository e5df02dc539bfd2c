pub mod bbcode;
mod tag;

pub use self::tag::{tag_content, TagContent};

/// Parses bracket tag content, `None` when it is not an event tag.
pub fn parse_tag(content: &str) -> Option<TagContent> {
    tag_content(content).ok().map(|(_, tag)| tag)
}
