//! Instruction set and positional decoder.
//!
//! An instruction is a flat `[u16]` stream: an [`OpCode`] followed by its
//! operands. Operands are either literals or indices into the side tables of a
//! [`DialogScript`](crate::format::DialogScript). Sub-expressions are nested
//! inline, so the only way to find the end of an instruction is to decode it.

use crate::value::VarType;

/// Deepest expression nesting the evaluator and decoder will follow.
pub const MAX_NESTING: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::FromRepr, strum::Display)]
#[repr(u16)]
pub enum OpCode {
    Undefined = 0,
    Float,
    String,
    Bool,
    Var,
    Func,
    Mult,
    Div,
    Add,
    Sub,
    Less,
    Greater,
    LessEquals,
    GreaterEquals,
    Equals,
    NotEquals,
    And,
    Or,
    Not,
    Assign,
    MultAssign,
    DivAssign,
    AddAssign,
    SubAssign,
    Goto,
    Choice,
    SpeakerSetName,
    SpeakerSetPortrait,
    SpeakerSetMood,
    SpeakerSetGlobalMood,
    Auto,
    NewLine,
    Speed,
    Pause,
}

impl OpCode {
    /// Statically known result type, `None` when it depends on a runtime
    /// lookup (`Var`, `Func`).
    pub fn return_type(self) -> Option<VarType> {
        use OpCode::*;
        match self {
            Float | Mult | Div | Add | Sub => Some(VarType::Float),
            String => Some(VarType::String),
            Bool | Less | Greater | LessEquals | GreaterEquals | Equals | NotEquals | And | Or
            | Not => Some(VarType::Bool),
            Var | Func => None,
            _ => Some(VarType::Void),
        }
    }

    pub fn is_assignment(self) -> bool {
        matches!(
            self,
            OpCode::Assign
                | OpCode::MultAssign
                | OpCode::DivAssign
                | OpCode::AddAssign
                | OpCode::SubAssign
        )
    }

    pub fn is_speaker_set(self) -> bool {
        matches!(
            self,
            OpCode::SpeakerSetName
                | OpCode::SpeakerSetPortrait
                | OpCode::SpeakerSetMood
                | OpCode::SpeakerSetGlobalMood
        )
    }

    pub fn is_text_directive(self) -> bool {
        matches!(
            self,
            OpCode::Auto | OpCode::NewLine | OpCode::Speed | OpCode::Pause
        )
    }

    /// Instructions referenced from line text that must fire when the
    /// typewriter reaches them instead of being spliced into the text.
    pub fn is_deferred(self) -> bool {
        self.is_assignment() || self.is_speaker_set() || self.is_text_directive()
    }
}

impl From<OpCode> for u16 {
    fn from(op: OpCode) -> Self {
        op as u16
    }
}

/// Cursor over an instruction stream.
#[derive(Debug, Clone)]
pub struct Decoder<'a> {
    inst: &'a [u16],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(inst: &'a [u16]) -> Self {
        Self::at(inst, 0)
    }

    pub fn at(inst: &'a [u16], pos: usize) -> Self {
        Self { inst, pos }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn instruction(&self) -> &'a [u16] {
        self.inst
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.inst.len()
    }

    pub fn read(&mut self) -> Option<u16> {
        let value = self.inst.get(self.pos).copied();
        if value.is_some() {
            self.pos += 1;
        }
        value
    }

    pub fn read_index(&mut self) -> Option<usize> {
        self.read().map(usize::from)
    }

    pub fn read_op(&mut self) -> Option<OpCode> {
        let op = self.peek_op()?;
        self.pos += 1;
        Some(op)
    }

    pub fn peek_op(&self) -> Option<OpCode> {
        self.inst.get(self.pos).and_then(|v| OpCode::from_repr(*v))
    }

    pub fn skip_to_end(&mut self) {
        self.pos = self.inst.len();
    }

    /// Advances past one complete expression without evaluating it.
    /// Returns `false` if the stream is malformed.
    pub fn skip_expression(&mut self) -> bool {
        self.skip_nested(0)
    }

    fn skip_nested(&mut self, depth: usize) -> bool {
        use OpCode::*;
        if depth >= MAX_NESTING {
            log::error!("Expression nested deeper than {} at {}", MAX_NESTING, self.pos);
            self.skip_to_end();
            return false;
        }
        let inner = depth + 1;
        let Some(op) = self.read_op() else {
            self.skip_to_end();
            return false;
        };
        match op {
            Undefined | NewLine => true,
            Float | String | Bool | Var | Choice | Auto => self.read().is_some(),
            Func => {
                let (Some(_), Some(argc)) = (self.read(), self.read()) else {
                    return false;
                };
                (0..argc).all(|_| self.skip_nested(inner))
            }
            Mult | Div | Add | Sub | Less | Greater | LessEquals | GreaterEquals | Equals
            | NotEquals | And | Or => self.skip_nested(inner) && self.skip_nested(inner),
            Not | Speed | Pause => self.skip_nested(inner),
            Assign | MultAssign | DivAssign | AddAssign | SubAssign => {
                self.read().is_some() && self.skip_nested(inner)
            }
            SpeakerSetName | SpeakerSetPortrait | SpeakerSetMood | SpeakerSetGlobalMood => {
                self.read().is_some() && self.skip_nested(inner)
            }
            Goto => self.read().is_some() && self.read().is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_repr() {
        assert_eq!(OpCode::from_repr(0), Some(OpCode::Undefined));
        assert_eq!(OpCode::from_repr(1), Some(OpCode::Float));
        assert_eq!(OpCode::from_repr(u16::from(OpCode::Pause)), Some(OpCode::Pause));
        assert_eq!(OpCode::from_repr(u16::from(OpCode::Pause) + 1), None);
    }

    #[test]
    fn test_skip_expression() {
        // (1 + 2) < x, followed by a trailing literal
        let inst: &[u16] = &[
            OpCode::Less.into(),
            OpCode::Add.into(),
            OpCode::Float.into(),
            0,
            OpCode::Float.into(),
            1,
            OpCode::Var.into(),
            0,
            OpCode::Bool.into(),
            1,
        ];
        let mut decoder = Decoder::new(inst);
        assert!(decoder.skip_expression());
        assert_eq!(decoder.pos(), 8);
        assert!(decoder.skip_expression());
        assert!(decoder.is_at_end());
    }

    #[test]
    fn test_skip_func_arguments() {
        let inst: &[u16] = &[
            OpCode::Func.into(),
            0,
            2,
            OpCode::Float.into(),
            0,
            OpCode::Not.into(),
            OpCode::Bool.into(),
            0,
        ];
        let mut decoder = Decoder::new(inst);
        assert!(decoder.skip_expression());
        assert!(decoder.is_at_end());
    }

    #[test]
    fn test_skip_stops_at_nesting_limit() {
        let mut inst = vec![u16::from(OpCode::Not); MAX_NESTING * 4];
        inst.extend([u16::from(OpCode::Bool), 1]);
        let mut decoder = Decoder::new(&inst);
        assert!(!decoder.skip_expression());
        assert!(decoder.is_at_end());

        let mut inst = vec![u16::from(OpCode::Not); MAX_NESTING - 1];
        inst.extend([u16::from(OpCode::Bool), 1]);
        assert!(Decoder::new(&inst).skip_expression());
    }

    #[test]
    fn test_truncated_stream() {
        let inst: &[u16] = &[OpCode::Add.into(), OpCode::Float.into()];
        let mut decoder = Decoder::new(inst);
        assert!(!decoder.skip_expression());
        assert!(decoder.is_at_end());
    }
}
