use crate::format::GoTo;
use crate::speaker::Speaker;
use crate::text::{ParsedText, TextEvent};

/// A line ready to be presented.
#[derive(Debug, Clone, PartialEq)]
pub struct DialogLine {
    pub line_index: usize,
    /// Speakers of the line as they were when it was built.
    pub speakers: Vec<Speaker>,
    pub text: String,
    pub events: Vec<TextEvent>,
    pub next: GoTo,
    fired: usize,
}

impl DialogLine {
    pub fn new(line_index: usize, speakers: Vec<Speaker>, parsed: ParsedText, next: GoTo) -> Self {
        Self {
            line_index,
            speakers,
            text: parsed.text,
            events: parsed.events,
            next,
            fired: 0,
        }
    }

    /// Events that became due now that `visible` characters are displayed.
    /// Each event is handed out once.
    pub fn take_due_events(&mut self, visible: usize) -> Vec<TextEvent> {
        let due = self.events[self.fired..]
            .iter()
            .take_while(|e| e.index <= visible)
            .count();
        let events = self.events[self.fired..self.fired + due].to_vec();
        self.fired += due;
        events
    }

    /// Remaining events, for when the line is skipped to the end.
    pub fn take_remaining_events(&mut self) -> Vec<TextEvent> {
        let events = self.events[self.fired..].to_vec();
        self.fired = self.events.len();
        events
    }

    pub fn has_pending_events(&self) -> bool {
        self.fired < self.events.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::TextEventKind;

    fn line() -> DialogLine {
        let events = [2, 2, 5]
            .into_iter()
            .map(|index| TextEvent {
                index,
                kind: TextEventKind::NewLine,
            })
            .collect();
        DialogLine::new(
            0,
            Vec::new(),
            ParsedText {
                text: "abcdef".into(),
                events,
            },
            GoTo::END,
        )
    }

    #[test]
    fn test_take_due_events() {
        let mut line = line();
        assert!(line.take_due_events(1).is_empty());
        assert_eq!(line.take_due_events(3).len(), 2);
        assert!(line.take_due_events(3).is_empty());
        assert!(line.has_pending_events());
        assert_eq!(line.take_remaining_events().len(), 1);
        assert!(!line.has_pending_events());
    }
}
