//! Persisted script asset format.
//!
//! A [`DialogScript`] is exchanged with authoring tools as JSON. Field names are
//! camelCase:
//!
//! ```json
//! {
//!   "speakerIds": ["ayla"],
//!   "instFloats": [3.5],
//!   "instStrings": ["gold", "Hello"],
//!   "choices": [{ "next": { "type": "line", "index": 1 }, "text": "Yes" }],
//!   "choiceSets": [[25, 0]],
//!   "sections": [{ "name": "start", "next": { "type": "line", "index": 0 } }],
//!   "lines": [{
//!     "instructionIndices": [0],
//!     "next": { "type": "end", "index": 0 },
//!     "speakerIndices": [0],
//!     "text": "You have [0] gold."
//!   }],
//!   "instructionStmts": [{ "index": -1, "next": { "type": "end", "index": 0 } }],
//!   "conditionals": [{ "branches": [0], "next": { "type": "end", "index": 0 } }],
//!   "instructions": [[4, 0]]
//! }
//! ```
//!
//! Every array except `sections` may be omitted. Instructions are arrays of
//! unsigned 16-bit integers encoded as described in [`crate::opcode`].
//!
//! A choice set mixes `[25, c]` (choice `c`), `[24, slot]` (disable up to
//! `slot`) and single instruction indices naming bool conditions. Indices 24
//! and 25 always read as those markers, so authoring tools must not place a
//! choice condition at either index.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RuntimeError};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, strum::FromRepr,
)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[serde(rename_all = "camelCase")]
#[repr(u16)]
pub enum GoToType {
    #[default]
    Undefined = 0,
    Line,
    Section,
    Instruction,
    Conditional,
    Choice,
    End,
}

/// An edge of the script's statement graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct GoTo {
    #[serde(rename = "type")]
    pub kind: GoToType,
    pub index: usize,
}

impl GoTo {
    pub const END: GoTo = GoTo::new(GoToType::End, 0);

    pub const fn new(kind: GoToType, index: usize) -> Self {
        Self { kind, index }
    }

    pub const fn line(index: usize) -> Self {
        Self::new(GoToType::Line, index)
    }

    pub const fn section(index: usize) -> Self {
        Self::new(GoToType::Section, index)
    }

    pub const fn instruction(index: usize) -> Self {
        Self::new(GoToType::Instruction, index)
    }

    pub const fn conditional(index: usize) -> Self {
        Self::new(GoToType::Conditional, index)
    }

    pub const fn choice(index: usize) -> Self {
        Self::new(GoToType::Choice, index)
    }

    /// `Undefined` and `End` both terminate the dialog.
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, GoToType::Undefined | GoToType::End)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[serde(rename_all = "camelCase")]
pub struct Section {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub next: GoTo,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[serde(rename_all = "camelCase")]
pub struct LineData {
    #[serde(default)]
    pub instruction_indices: Vec<usize>,
    pub next: GoTo,
    #[serde(default)]
    pub speaker_indices: Vec<usize>,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[serde(rename_all = "camelCase")]
pub struct InstructionStatement {
    /// Index into `instructions`, `-1` for none.
    pub index: i32,
    pub next: GoTo,
}

impl InstructionStatement {
    pub fn instruction_index(&self) -> Option<usize> {
        usize::try_from(self.index).ok()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[serde(rename_all = "camelCase")]
pub struct ConditionalStatement {
    /// Indices into `instructionStmts`, tested in order.
    pub branches: Vec<usize>,
    pub next: GoTo,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[serde(rename_all = "camelCase")]
pub struct Choice {
    pub next: GoTo,
    pub text: String,
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[serde(rename_all = "camelCase", default)]
pub struct DialogScript {
    pub speaker_ids: Vec<String>,
    pub inst_floats: Vec<f32>,
    pub inst_strings: Vec<String>,
    pub choices: Vec<Choice>,
    pub choice_sets: Vec<Vec<u16>>,
    pub sections: Vec<Section>,
    pub lines: Vec<LineData>,
    pub instruction_stmts: Vec<InstructionStatement>,
    pub conditionals: Vec<ConditionalStatement>,
    pub instructions: Vec<Vec<u16>>,
}

impl DialogScript {
    pub fn from_json(json: &str) -> Result<Self> {
        let script: DialogScript = serde_json::from_str(json)?;
        script.validate()?;
        Ok(script)
    }

    pub fn from_slice(data: &[u8]) -> Result<Self> {
        let script: DialogScript = serde_json::from_slice(data)?;
        script.validate()?;
        Ok(script)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn entry(&self) -> GoTo {
        GoTo::section(0)
    }

    pub fn section_by_name(&self, name: &str) -> Option<usize> {
        self.sections
            .iter()
            .position(|s| s.name.as_deref() == Some(name))
    }

    /// Checks that there is an entry section and that every statement edge
    /// points at an existing statement.
    pub fn validate(&self) -> Result<()> {
        if self.sections.is_empty() {
            return Err(RuntimeError::NoSections);
        }

        let edges = self
            .sections
            .iter()
            .map(|s| s.next)
            .chain(self.lines.iter().map(|l| l.next))
            .chain(self.instruction_stmts.iter().map(|s| s.next))
            .chain(self.conditionals.iter().map(|c| c.next))
            .chain(self.choices.iter().map(|c| c.next));
        for goto in edges {
            if !self.has_target(goto) {
                return Err(RuntimeError::DanglingGoTo(goto));
            }
        }

        for conditional in &self.conditionals {
            if let Some(&branch) = conditional
                .branches
                .iter()
                .find(|&&b| b >= self.instruction_stmts.len())
            {
                return Err(RuntimeError::DanglingGoTo(GoTo::instruction(branch)));
            }
        }

        Ok(())
    }

    pub fn has_target(&self, goto: GoTo) -> bool {
        let len = match goto.kind {
            GoToType::Undefined | GoToType::End => return true,
            GoToType::Line => self.lines.len(),
            GoToType::Section => self.sections.len(),
            GoToType::Instruction => self.instruction_stmts.len(),
            GoToType::Conditional => self.conditionals.len(),
            GoToType::Choice => self.choice_sets.len(),
        };
        goto.index < len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "speakerIds": ["ayla"],
        "instFloats": [3.5],
        "instStrings": ["gold"],
        "sections": [{ "name": "start", "next": { "type": "line", "index": 0 } }],
        "lines": [{
            "instructionIndices": [0],
            "next": { "type": "end", "index": 0 },
            "speakerIndices": [0],
            "text": "You have [0] gold."
        }],
        "instructions": [[4, 0]]
    }"#;

    #[test]
    fn test_parse_sample() {
        let script = DialogScript::from_json(SAMPLE).unwrap();
        assert_eq!(script.speaker_ids, vec!["ayla".to_string()]);
        assert_eq!(script.lines[0].next, GoTo::END);
        assert_eq!(script.sections[0].next, GoTo::line(0));
        assert_eq!(script.section_by_name("start"), Some(0));
        assert_eq!(script.instructions, vec![vec![4, 0]]);
        assert!(script.choices.is_empty());
    }

    #[test]
    fn test_no_sections_is_fatal() {
        let err = DialogScript::from_json(r#"{ "lines": [] }"#).unwrap_err();
        assert!(matches!(err, RuntimeError::NoSections));
    }

    #[test]
    fn test_malformed_json_is_fatal() {
        let err = DialogScript::from_json(r#"{ "sections": 3 }"#).unwrap_err();
        assert!(matches!(err, RuntimeError::Deserialize(_)));
    }

    #[test]
    fn test_dangling_goto_is_fatal() {
        let json = r#"{ "sections": [{ "next": { "type": "line", "index": 2 } }] }"#;
        let err = DialogScript::from_json(json).unwrap_err();
        assert!(matches!(err, RuntimeError::DanglingGoTo(g) if g == GoTo::line(2)));
    }

    #[test]
    fn test_goto_default_is_terminal() {
        assert!(GoTo::default().is_terminal());
        assert_eq!(GoTo::default().kind, GoToType::Undefined);
    }
}
