//! Expression evaluator.
//!
//! The evaluator walks an instruction stream from a cursor, returning a typed
//! [`Value`] and leaving the cursor after everything it consumed. Scripts are
//! authored data, so lookups that fail degrade to default values with a warning
//! instead of aborting the dialog.

use crate::bridge::Bridge;
use crate::format::{Choice, DialogScript, GoTo, GoToType};
use crate::opcode::{Decoder, OpCode, MAX_NESTING};
use crate::speaker::Speaker;
use crate::storage::Storage;
use crate::value::{Value, VarType};

/// Presentation side effects of `Auto`, `NewLine`, `Speed` and `Pause`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TextDirective {
    Auto(bool),
    NewLine,
    Speed(f32),
    Pause(f32),
}

pub struct Evaluator<'a> {
    script: &'a DialogScript,
    bridge: &'a Bridge,
    storage: &'a mut Storage,
    speakers: &'a mut [Speaker],
    depth: usize,
}

impl<'a> Evaluator<'a> {
    pub fn new(
        script: &'a DialogScript,
        bridge: &'a Bridge,
        storage: &'a mut Storage,
        speakers: &'a mut [Speaker],
    ) -> Self {
        Self {
            script,
            bridge,
            storage,
            speakers,
            depth: 0,
        }
    }

    /// Evaluates a whole instruction from its first slot.
    pub fn evaluate(&mut self, inst: &[u16]) -> Value {
        self.eval(&mut Decoder::new(inst))
    }

    /// Evaluates the expression at `cursor` and advances it.
    pub fn eval_at(&mut self, inst: &[u16], cursor: &mut usize) -> Value {
        let mut decoder = Decoder::at(inst, *cursor);
        let value = self.eval(&mut decoder);
        *cursor = decoder.pos();
        value
    }

    pub fn eval_float(&mut self, d: &mut Decoder) -> f32 {
        self.eval(d).to_float()
    }

    pub fn eval_bool(&mut self, d: &mut Decoder) -> bool {
        self.eval(d).to_bool()
    }

    pub fn eval_string(&mut self, d: &mut Decoder) -> String {
        self.eval(d).to_string()
    }

    pub fn eval_typed(&mut self, d: &mut Decoder, ty: VarType) -> Value {
        self.eval(d).coerce(ty)
    }

    pub fn eval(&mut self, d: &mut Decoder) -> Value {
        if self.depth >= MAX_NESTING {
            log::error!(
                "Expression nested deeper than {} at {} in instruction of {} slots",
                MAX_NESTING,
                d.pos(),
                d.instruction().len()
            );
            d.skip_to_end();
            return Value::Void;
        }
        self.depth += 1;
        let value = self.eval_op(d);
        self.depth -= 1;
        value
    }

    fn eval_op(&mut self, d: &mut Decoder) -> Value {
        let start = d.pos();
        let Some(op) = d.read_op() else {
            log::error!(
                "Invalid opcode at {} in instruction {:?}",
                start,
                d.instruction()
            );
            d.skip_to_end();
            return Value::Void;
        };

        use OpCode as Op;
        match op {
            Op::Undefined => Value::Void,
            Op::Float => Value::Float(self.read_float(d)),
            Op::String => Value::String(self.read_string(d)),
            Op::Bool => Value::Bool(d.read().unwrap_or(0) != 0),
            Op::Var => {
                let name = self.read_string(d);
                self.get_var(&name)
            }
            Op::Func => self.eval_func(d),
            Op::Mult | Op::Div | Op::Add | Op::Sub => {
                let lhs = self.eval_float(d);
                let rhs = self.eval_float(d);
                Value::Float(arithmetic(op, lhs, rhs))
            }
            Op::Less | Op::Greater | Op::LessEquals | Op::GreaterEquals => {
                let lhs = self.eval_float(d);
                let rhs = self.eval_float(d);
                Value::Bool(match op {
                    Op::Less => lhs < rhs,
                    Op::Greater => lhs > rhs,
                    Op::LessEquals => lhs <= rhs,
                    _ => lhs >= rhs,
                })
            }
            Op::Equals | Op::NotEquals => {
                let equal = self.eval_equality(d);
                Value::Bool(if op == Op::Equals { equal } else { !equal })
            }
            Op::And => {
                let lhs = self.eval_bool(d);
                if lhs {
                    Value::Bool(self.eval_bool(d))
                } else {
                    d.skip_expression();
                    Value::Bool(false)
                }
            }
            Op::Or => {
                let lhs = self.eval_bool(d);
                if lhs {
                    d.skip_expression();
                    Value::Bool(true)
                } else {
                    Value::Bool(self.eval_bool(d))
                }
            }
            Op::Not => Value::Bool(!self.eval_bool(d)),
            Op::Assign | Op::MultAssign | Op::DivAssign | Op::AddAssign | Op::SubAssign => {
                self.eval_assign(op, d);
                Value::Void
            }
            Op::Goto => {
                d.read();
                d.read();
                Value::Void
            }
            Op::Choice | Op::Auto => {
                d.read();
                Value::Void
            }
            Op::SpeakerSetName
            | Op::SpeakerSetPortrait
            | Op::SpeakerSetMood
            | Op::SpeakerSetGlobalMood => {
                self.eval_speaker_set(op, d);
                Value::Void
            }
            Op::NewLine => Value::Void,
            Op::Speed | Op::Pause => {
                self.eval_float(d);
                Value::Void
            }
        }
    }

    /// Runs a text directive instruction, any other instruction is evaluated
    /// for its side effects and yields `None`.
    pub fn eval_directive(&mut self, inst: &[u16]) -> Option<TextDirective> {
        let mut d = Decoder::new(inst);
        match d.peek_op() {
            Some(OpCode::Auto) => {
                d.read();
                Some(TextDirective::Auto(d.read().unwrap_or(1) != 0))
            }
            Some(OpCode::NewLine) => Some(TextDirective::NewLine),
            Some(OpCode::Speed) => {
                d.read();
                Some(TextDirective::Speed(self.eval_float(&mut d)))
            }
            Some(OpCode::Pause) => {
                d.read();
                Some(TextDirective::Pause(self.eval_float(&mut d)))
            }
            _ => {
                self.eval(&mut d);
                None
            }
        }
    }

    /// Evaluates an instruction statement. A `Goto` instruction produces a
    /// computed jump; anything else is evaluated as void and yields `None`.
    pub fn eval_flow(&mut self, inst: &[u16]) -> Option<GoTo> {
        let mut d = Decoder::new(inst);
        if d.peek_op() == Some(OpCode::Goto) {
            d.read();
            let kind = d.read().and_then(GoToType::from_repr);
            let index = d.read_index();
            return match (kind, index) {
                (Some(kind), Some(index)) => Some(GoTo::new(kind, index)),
                _ => {
                    log::error!("Malformed goto instruction {:?}", inst);
                    None
                }
            };
        }
        let value = self.eval(&mut d);
        if !value.is_void() {
            log::trace!("Discarding instruction statement result {:?}", value);
        }
        None
    }

    /// Static or lookup-based result type of the expression at the cursor,
    /// without consuming it.
    pub fn return_type(&self, d: &Decoder) -> VarType {
        let Some(op) = d.peek_op() else {
            return VarType::Void;
        };
        if let Some(ty) = op.return_type() {
            return ty;
        }
        let mut peek = d.clone();
        peek.read();
        let name = self.read_string(&mut peek);
        match op {
            OpCode::Var => self.var_type(&name),
            _ => self
                .bridge
                .method(&name)
                .map(|m| m.return_type())
                .unwrap_or(VarType::Void),
        }
    }

    /// Builds the selectable choices of a choice set.
    ///
    /// Entries are `[Choice, c]`, `[Goto, slot]` or a single index into the
    /// script's instructions naming a bool condition. A value equal to the
    /// `Goto` or `Choice` opcode always reads as that entry, so instructions
    /// 24 and 25 cannot serve as choice conditions.
    ///
    /// Slots below `valid_index` are disabled. A `Goto` entry opens a disabled
    /// range up to its target slot unless the condition right before it held.
    /// Conditions inside a disabled range are not evaluated.
    pub fn eval_choices(&mut self, choice_set: &[u16]) -> Vec<Choice> {
        let mut choices = Vec::new();
        let mut valid_index = 0usize;
        let mut condition_passed = false;
        let mut d = Decoder::new(choice_set);

        while !d.is_at_end() {
            let slot = d.pos();
            match d.peek_op() {
                Some(OpCode::Choice) => {
                    d.read();
                    let Some(index) = d.read_index() else {
                        log::error!("Truncated choice entry in choice set {:?}", choice_set);
                        break;
                    };
                    match self.script.choices.get(index) {
                        Some(choice) => {
                            let mut choice = choice.clone();
                            choice.disabled = slot < valid_index;
                            choices.push(choice);
                        }
                        None => log::warn!("Choice {} not found", index),
                    }
                }
                Some(OpCode::Goto) => {
                    d.read();
                    let Some(target) = d.read_index() else {
                        log::error!("Truncated goto entry in choice set {:?}", choice_set);
                        break;
                    };
                    if condition_passed {
                        condition_passed = false;
                    } else {
                        valid_index = valid_index.max(target);
                    }
                }
                _ => {
                    let Some(instruction) = d.read_index() else {
                        break;
                    };
                    condition_passed = slot >= valid_index && self.eval_condition(instruction);
                }
            }
        }

        choices
    }

    fn eval_condition(&mut self, instruction: usize) -> bool {
        let script = self.script;
        match script.instructions.get(instruction) {
            Some(inst) => self.evaluate(inst).to_bool(),
            None => {
                log::warn!("Condition instruction {} not found", instruction);
                false
            }
        }
    }

    fn eval_func(&mut self, d: &mut Decoder) -> Value {
        let name = self.read_string(d);
        let argc = d.read().unwrap_or(0);
        let bridge = self.bridge;
        let Some(method) = bridge.method(&name) else {
            log::warn!("Function {} not found", name);
            for _ in 0..argc {
                d.skip_expression();
            }
            return Value::Void;
        };

        let argc = usize::from(argc);
        let params = method.params();
        if argc != params.len() {
            log::warn!(
                "Function {} expects {} argument(s), got {}",
                name,
                params.len(),
                argc
            );
        }
        let mut args: Vec<Value> = params
            .iter()
            .take(argc)
            .map(|&ty| self.eval_typed(d, ty))
            .collect();
        for _ in params.len()..argc {
            d.skip_expression();
        }
        args.extend(params.iter().skip(argc).map(|&ty| Value::default_for(ty)));
        method.call(&args)
    }

    fn eval_equality(&mut self, d: &mut Decoder) -> bool {
        match self.return_type(d) {
            VarType::Float => {
                let lhs = self.eval_float(d);
                lhs == self.eval_float(d)
            }
            VarType::Bool => {
                let lhs = self.eval_bool(d);
                lhs == self.eval_bool(d)
            }
            VarType::String => {
                let lhs = self.eval_string(d);
                lhs == self.eval_string(d)
            }
            VarType::Void => {
                let lhs = self.eval(d);
                lhs == self.eval(d)
            }
        }
    }

    fn eval_assign(&mut self, op: OpCode, d: &mut Decoder) {
        let name = self.read_string(d);
        if op == OpCode::Assign {
            let value = self.eval(d);
            self.set_var(&name, value);
            return;
        }

        let current = self.get_var(&name).to_float();
        let rhs = self.eval_float(d);
        let arith = match op {
            OpCode::MultAssign => OpCode::Mult,
            OpCode::DivAssign => OpCode::Div,
            OpCode::AddAssign => OpCode::Add,
            _ => OpCode::Sub,
        };
        self.set_var(&name, Value::Float(arithmetic(arith, current, rhs)));
    }

    fn eval_speaker_set(&mut self, op: OpCode, d: &mut Decoder) {
        let index = d.read_index();
        let value = self.eval_string(d);
        let Some(speaker) = index.and_then(|i| self.speakers.get_mut(i)) else {
            log::warn!("Speaker {:?} not found", index);
            return;
        };
        match op {
            OpCode::SpeakerSetName => speaker.display_name = value,
            OpCode::SpeakerSetPortrait => speaker.portrait = value,
            OpCode::SpeakerSetMood => speaker.mood = value,
            _ => {
                speaker.mood.clone_from(&value);
                speaker.global_mood = value;
            }
        }
    }

    pub fn get_var(&self, name: &str) -> Value {
        if let Some(property) = self.bridge.property(name) {
            return property.get();
        }
        match self.storage.try_get_value(name) {
            Some(value) => value.clone(),
            None => {
                log::warn!("Variable {} not found", name);
                Value::Void
            }
        }
    }

    pub fn set_var(&mut self, name: &str, value: Value) {
        match self.bridge.property(name) {
            Some(property) => {
                if !property.set(value) {
                    log::warn!("Bridge property {} is read-only", name);
                }
            }
            None => self.storage.set_value(name, value),
        }
    }

    fn var_type(&self, name: &str) -> VarType {
        if let Some(property) = self.bridge.property(name) {
            return property.var_type();
        }
        self.storage
            .try_get_value(name)
            .map(Value::var_type)
            .unwrap_or(VarType::Void)
    }

    fn read_float(&self, d: &mut Decoder) -> f32 {
        let index = d.read_index();
        match index.and_then(|i| self.script.inst_floats.get(i)) {
            Some(v) => *v,
            None => {
                log::warn!("Float literal {:?} not found", index);
                0.0
            }
        }
    }

    fn read_string(&self, d: &mut Decoder) -> String {
        let index = d.read_index();
        match index.and_then(|i| self.script.inst_strings.get(i)) {
            Some(s) => s.clone(),
            None => {
                log::warn!("String literal {:?} not found", index);
                String::new()
            }
        }
    }
}

fn arithmetic(op: OpCode, lhs: f32, rhs: f32) -> f32 {
    match op {
        OpCode::Mult => lhs * rhs,
        OpCode::Div => lhs / rhs,
        OpCode::Add => lhs + rhs,
        _ => lhs - rhs,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    const FLOAT: u16 = OpCode::Float as u16;
    const STRING: u16 = OpCode::String as u16;
    const BOOL: u16 = OpCode::Bool as u16;
    const VAR: u16 = OpCode::Var as u16;
    const FUNC: u16 = OpCode::Func as u16;
    const GOTO: u16 = OpCode::Goto as u16;
    const CHOICE: u16 = OpCode::Choice as u16;

    fn script() -> DialogScript {
        DialogScript {
            speaker_ids: vec!["ayla".into()],
            inst_floats: vec![3.5, 2.0, 10.0],
            inst_strings: vec![
                "gold".into(),
                "Hello".into(),
                "hp".into(),
                "greet".into(),
                "missing".into(),
            ],
            choices: (0..3)
                .map(|i| Choice {
                    next: GoTo::line(i),
                    text: format!("choice {}", i),
                    disabled: false,
                })
                .collect(),
            // choice conditions: true, false, greet()
            instructions: vec![vec![BOOL, 1], vec![BOOL, 0], vec![FUNC, 3, 0]],
            ..Default::default()
        }
    }

    struct Fixture {
        script: DialogScript,
        bridge: Bridge,
        storage: Storage,
        speakers: Vec<Speaker>,
    }

    impl Fixture {
        fn new() -> Self {
            let script = script();
            let speakers = script.speaker_ids.iter().map(Speaker::new).collect();
            Self {
                script,
                bridge: Bridge::new(),
                storage: Storage::new(),
                speakers,
            }
        }

        fn evaluator(&mut self) -> Evaluator<'_> {
            Evaluator::new(
                &self.script,
                &self.bridge,
                &mut self.storage,
                &mut self.speakers,
            )
        }
    }

    #[test]
    fn test_literals() {
        let mut f = Fixture::new();
        let mut ev = f.evaluator();
        assert_eq!(ev.evaluate(&[FLOAT, 0]), Value::Float(3.5));
        assert_eq!(ev.evaluate(&[STRING, 1]), Value::from("Hello"));
        assert_eq!(ev.evaluate(&[BOOL, 1]), Value::Bool(true));
        assert_eq!(ev.evaluate(&[BOOL, 0]), Value::Bool(false));
    }

    #[test]
    fn test_cursor_advances_past_operands() {
        let mut f = Fixture::new();
        let mut ev = f.evaluator();
        let inst = [OpCode::Add as u16, FLOAT, 0, FLOAT, 1, BOOL, 1];
        let mut cursor = 0;
        assert_eq!(ev.eval_at(&inst, &mut cursor), Value::Float(5.5));
        assert_eq!(cursor, 5);
        assert_eq!(ev.eval_at(&inst, &mut cursor), Value::Bool(true));
        assert_eq!(cursor, 7);
    }

    #[test]
    fn test_arithmetic_is_left_to_right() {
        let mut f = Fixture::new();
        let mut ev = f.evaluator();
        // (10 - 3.5) / 2
        let inst = [OpCode::Div as u16, OpCode::Sub as u16, FLOAT, 2, FLOAT, 0, FLOAT, 1];
        assert_eq!(ev.evaluate(&inst), Value::Float(3.25));
    }

    #[test]
    fn test_comparisons_and_logic() {
        let mut f = Fixture::new();
        let mut ev = f.evaluator();
        let less = [OpCode::Less as u16, FLOAT, 1, FLOAT, 0];
        assert_eq!(ev.evaluate(&less), Value::Bool(true));
        let not_and = [OpCode::Not as u16, OpCode::And as u16, BOOL, 1, BOOL, 0];
        assert_eq!(ev.evaluate(&not_and), Value::Bool(true));
        let or = [OpCode::Or as u16, BOOL, 0, OpCode::GreaterEquals as u16, FLOAT, 0, FLOAT, 0];
        assert_eq!(ev.evaluate(&or), Value::Bool(true));
    }

    #[test]
    fn test_and_short_circuits() {
        let calls = Arc::new(Mutex::new(0));
        let mut f = Fixture::new();
        let counter = calls.clone();
        f.bridge
            .register_method("greet", &[], VarType::Bool, move |_| {
                *counter.lock().unwrap() += 1;
                Value::Bool(true)
            });
        let mut ev = f.evaluator();
        let inst = [OpCode::And as u16, BOOL, 0, FUNC, 3, 0, BOOL, 1];
        let mut cursor = 0;
        assert_eq!(ev.eval_at(&inst, &mut cursor), Value::Bool(false));
        assert_eq!(cursor, 6);
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[test]
    fn test_equals_dispatches_on_first_operand() {
        let mut f = Fixture::new();
        f.storage.set_value("gold", Value::from("3.5"));
        let mut ev = f.evaluator();
        // string compare: "3.5" == "3.5"
        let string_eq = [OpCode::Equals as u16, VAR, 0, FLOAT, 0];
        assert_eq!(ev.evaluate(&string_eq), Value::Bool(true));
        // float compare: 3.5 == "3.5" parsed
        let float_eq = [OpCode::Equals as u16, FLOAT, 0, VAR, 0];
        assert_eq!(ev.evaluate(&float_eq), Value::Bool(true));
        let not_eq = [OpCode::NotEquals as u16, STRING, 1, STRING, 0];
        assert_eq!(ev.evaluate(&not_eq), Value::Bool(true));
    }

    #[test]
    fn test_assignment_to_storage() {
        let mut f = Fixture::new();
        {
            let mut ev = f.evaluator();
            ev.evaluate(&[OpCode::Assign as u16, 0, FLOAT, 2]);
            ev.evaluate(&[OpCode::AddAssign as u16, 0, FLOAT, 0]);
            ev.evaluate(&[OpCode::MultAssign as u16, 0, FLOAT, 1]);
        }
        assert_eq!(f.storage.try_get_value("gold"), Some(&Value::Float(27.0)));
    }

    #[test]
    fn test_compound_assignment_through_bridge() {
        let hp = Arc::new(Mutex::new(10.0_f32));
        let mut f = Fixture::new();
        let (get, set) = (hp.clone(), hp.clone());
        f.bridge.register_float(
            "hp",
            move || *get.lock().unwrap(),
            move |v| *set.lock().unwrap() = v,
        );
        f.evaluator().evaluate(&[OpCode::SubAssign as u16, 2, FLOAT, 0]);
        assert_eq!(*hp.lock().unwrap(), 6.5);
        assert!(!f.storage.contains("hp"));
    }

    #[test]
    fn test_unknown_names_degrade() {
        let mut f = Fixture::new();
        let mut ev = f.evaluator();
        assert_eq!(ev.evaluate(&[VAR, 4]), Value::Void);
        // unknown function still consumes its arguments
        let inst = [FUNC, 4, 1, FLOAT, 0, BOOL, 1];
        let mut cursor = 0;
        assert_eq!(ev.eval_at(&inst, &mut cursor), Value::Void);
        assert_eq!(cursor, 5);
        assert_eq!(ev.evaluate(&[OpCode::Add as u16, VAR, 4, FLOAT, 1]), Value::Float(2.0));
        // out of range literal and invalid opcode
        assert_eq!(ev.evaluate(&[FLOAT, 99]), Value::Float(0.0));
        assert_eq!(ev.evaluate(&[999]), Value::Void);
    }

    #[test]
    fn test_function_arguments_are_typed() {
        let mut f = Fixture::new();
        f.bridge.register_method(
            "greet",
            &[VarType::String, VarType::Float],
            VarType::String,
            |args| Value::String(format!("{}:{:?}", args[0], args[1])),
        );
        let mut ev = f.evaluator();
        let inst = [FUNC, 3, 2, FLOAT, 0, BOOL, 1];
        assert_eq!(ev.evaluate(&inst), Value::from("3.5:Float(1.0)"));
    }

    #[test]
    fn test_speaker_set() {
        let mut f = Fixture::new();
        {
            let mut ev = f.evaluator();
            ev.evaluate(&[OpCode::SpeakerSetName as u16, 0, STRING, 1]);
            ev.evaluate(&[OpCode::SpeakerSetGlobalMood as u16, 0, STRING, 0]);
            ev.evaluate(&[OpCode::SpeakerSetMood as u16, 3, STRING, 0]);
        }
        assert_eq!(f.speakers[0].display_name, "Hello");
        assert_eq!(f.speakers[0].global_mood, "gold");
        assert_eq!(f.speakers[0].mood, "gold");
    }

    #[test]
    fn test_directives_and_flow() {
        let mut f = Fixture::new();
        let mut ev = f.evaluator();
        assert_eq!(
            ev.eval_directive(&[OpCode::Speed as u16, FLOAT, 1]),
            Some(TextDirective::Speed(2.0))
        );
        assert_eq!(
            ev.eval_directive(&[OpCode::Auto as u16, 0]),
            Some(TextDirective::Auto(false))
        );
        assert_eq!(ev.eval_directive(&[FLOAT, 0]), None);
        assert_eq!(
            ev.eval_flow(&[GOTO, GoToType::Line as u16, 2]),
            Some(GoTo::line(2))
        );
        assert_eq!(ev.eval_flow(&[OpCode::Assign as u16, 0, FLOAT, 0]), None);
    }

    #[test]
    fn test_choice_goto_disables_range() {
        let mut f = Fixture::new();
        let mut ev = f.evaluator();
        let set = [GOTO, 6, CHOICE, 0, CHOICE, 1, CHOICE, 2];
        let choices = ev.eval_choices(&set);
        let disabled: Vec<bool> = choices.iter().map(|c| c.disabled).collect();
        assert_eq!(disabled, vec![true, true, false]);
        assert_eq!(choices[2].text, "choice 2");
    }

    #[test]
    fn test_choice_condition_guards_range() {
        let mut f = Fixture::new();
        let mut ev = f.evaluator();
        // if true { choice 0 } ; if false { choice 1 } ; choice 2
        let set = [
            0, GOTO, 5, CHOICE, 0, // slots 0..5
            1, GOTO, 10, CHOICE, 1, // slots 5..10
            CHOICE, 2,
        ];
        let disabled: Vec<bool> = ev.eval_choices(&set).iter().map(|c| c.disabled).collect();
        assert_eq!(disabled, vec![false, true, false]);
    }

    #[test]
    fn test_choice_conditions_inside_disabled_range_are_skipped() {
        let calls = Arc::new(Mutex::new(0));
        let mut f = Fixture::new();
        let counter = calls.clone();
        f.bridge.register_method("greet", &[], VarType::Bool, move |_| {
            *counter.lock().unwrap() += 1;
            Value::Bool(true)
        });
        let mut ev = f.evaluator();
        let set = [
            1, GOTO, 10, // outer range 0..10
            2, GOTO, 8, CHOICE, 0, // nested guarded choice
            CHOICE, 1, // still inside the outer range (slot 8)
            CHOICE, 2,
        ];
        let disabled: Vec<bool> = ev.eval_choices(&set).iter().map(|c| c.disabled).collect();
        assert_eq!(disabled, vec![true, true, false]);
        assert_eq!(*calls.lock().unwrap(), 0);

        // the same condition outside any range is evaluated
        let choices = ev.eval_choices(&[2, GOTO, 5, CHOICE, 0]);
        assert!(!choices[0].disabled);
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[test]
    fn test_missing_choice_condition_is_false() {
        let mut f = Fixture::new();
        let mut ev = f.evaluator();
        let choices = ev.eval_choices(&[40, GOTO, 5, CHOICE, 0, CHOICE, 1]);
        let disabled: Vec<bool> = choices.iter().map(|c| c.disabled).collect();
        assert_eq!(disabled, vec![true, false]);
    }

    #[test]
    fn test_deep_nesting_degrades() {
        let mut f = Fixture::new();
        let mut ev = f.evaluator();
        let mut inst = vec![OpCode::Not as u16; 200_000];
        inst.extend([BOOL, 1]);
        let mut cursor = 0;
        let value = ev.eval_at(&inst, &mut cursor);
        assert!(value.as_bool().is_some());
        assert_eq!(cursor, inst.len());

        // evaluation still works afterwards
        assert_eq!(ev.evaluate(&[OpCode::Not as u16, BOOL, 0]), Value::Bool(true));
    }

    #[test]
    fn test_function_arguments_match_declared_params() {
        let mut f = Fixture::new();
        f.bridge.register_method("greet", &[VarType::String], VarType::String, |args| {
            Value::String(format!("hi {}!", args[0]))
        });
        let mut ev = f.evaluator();
        assert_eq!(ev.evaluate(&[FUNC, 3, 0]), Value::from("hi !"));

        let inst = [FUNC, 3, 2, STRING, 1, FLOAT, 0, BOOL, 1];
        let mut cursor = 0;
        assert_eq!(ev.eval_at(&inst, &mut cursor), Value::from("hi Hello!"));
        assert_eq!(cursor, 7);
    }
}
