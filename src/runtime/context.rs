use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::bridge::SharedBridge;
use crate::format::{Choice, DialogScript, GoTo};
use crate::interpreter::{Evaluator, TextDirective};
use crate::opcode::OpCode;
use crate::speaker::Speaker;
use crate::storage::Storage;
use crate::text::{extract_events, TagResolution, TextEvent, TextEventKind};
use crate::value::Value;

use super::DialogLine;

/// Tunables of a dialog session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    /// Statements that may run back to back without reaching the presenter
    /// before the session gives up on a loop.
    pub max_steps_without_input: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_steps_without_input: 10_000,
        }
    }
}

/// Everything a dialog session evaluates against
#[derive(Debug)]
pub struct DialogContext {
    script: Arc<DialogScript>,
    bridge: Arc<SharedBridge>,
    storage: Storage,
    speakers: Vec<Speaker>,
    config: SessionConfig,
}

impl DialogContext {
    pub fn new(script: Arc<DialogScript>, bridge: Arc<SharedBridge>) -> Self {
        let speakers = script.speaker_ids.iter().map(Speaker::new).collect();
        Self {
            script,
            bridge,
            storage: Storage::new(),
            speakers,
            config: SessionConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_storage(mut self, storage: Storage) -> Self {
        self.storage = storage;
        self
    }

    pub fn script(&self) -> &Arc<DialogScript> {
        &self.script
    }

    pub fn bridge(&self) -> &Arc<SharedBridge> {
        &self.bridge
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut Storage {
        &mut self.storage
    }

    pub fn speakers(&self) -> &[Speaker] {
        &self.speakers
    }

    pub fn speakers_mut(&mut self) -> &mut Vec<Speaker> {
        &mut self.speakers
    }

    pub fn speaker(&self, speaker_id: &str) -> Option<&Speaker> {
        self.speakers.iter().find(|s| s.speaker_id == speaker_id)
    }

    /// Runs `f` with an evaluator bound to the current bridge table.
    pub fn with_evaluator<R>(&mut self, f: impl FnOnce(&mut Evaluator<'_>) -> R) -> R {
        let bridge = self.bridge.load();
        let mut evaluator =
            Evaluator::new(&self.script, &bridge, &mut self.storage, &mut self.speakers);
        f(&mut evaluator)
    }

    pub fn evaluate(&mut self, instruction: usize) -> Value {
        let script = self.script.clone();
        match script.instructions.get(instruction) {
            Some(inst) => self.with_evaluator(|ev| ev.evaluate(inst)),
            None => {
                log::warn!("Instruction {} not found", instruction);
                Value::Void
            }
        }
    }

    /// Evaluates an instruction statement's instruction, returning a computed
    /// jump if it is a `Goto`.
    pub fn eval_flow(&mut self, instruction: usize) -> Option<GoTo> {
        let script = self.script.clone();
        match script.instructions.get(instruction) {
            Some(inst) => self.with_evaluator(|ev| ev.eval_flow(inst)),
            None => {
                log::warn!("Instruction {} not found", instruction);
                None
            }
        }
    }

    /// Picks the first branch of a conditional statement whose condition holds.
    pub fn resolve_conditional(&mut self, index: usize) -> GoTo {
        let script = self.script.clone();
        let Some(conditional) = script.conditionals.get(index) else {
            log::warn!("Conditional {} not found", index);
            return GoTo::END;
        };

        for &branch in &conditional.branches {
            let Some(stmt) = script.instruction_stmts.get(branch) else {
                log::warn!("Conditional branch {} not found", branch);
                continue;
            };
            match stmt.instruction_index() {
                None => return stmt.next,
                Some(inst) if self.evaluate(inst).to_bool() => return stmt.next,
                Some(_) => {}
            }
        }

        conditional.next
    }

    pub fn choices(&mut self, choice_set: usize) -> Vec<Choice> {
        let script = self.script.clone();
        match script.choice_sets.get(choice_set) {
            Some(set) => self.with_evaluator(|ev| ev.eval_choices(set)),
            None => {
                log::warn!("Choice set {} not found", choice_set);
                Vec::new()
            }
        }
    }

    /// Executes a text event once the typewriter reaches it.
    pub fn fire_event(&mut self, event: &TextEvent) -> Option<TextDirective> {
        match event.kind {
            TextEventKind::Speed(v) => Some(TextDirective::Speed(v)),
            TextEventKind::Pause(v) => Some(TextDirective::Pause(v)),
            TextEventKind::Auto(v) => Some(TextDirective::Auto(v)),
            TextEventKind::NewLine => Some(TextDirective::NewLine),
            TextEventKind::Instruction(instruction) => {
                let script = self.script.clone();
                let inst = script.instructions.get(instruction)?;
                self.with_evaluator(|ev| ev.eval_directive(inst))
            }
        }
    }

    /// Prepares a line for display. Inline expressions are evaluated now and
    /// spliced into the text, side-effecting instructions become events.
    pub fn build_line(&mut self, line_index: usize, stripped: &str) -> Option<DialogLine> {
        let script = self.script.clone();
        let line = script.lines.get(line_index)?;

        for speaker in &mut self.speakers {
            speaker.reset_mood();
        }

        let parsed = extract_events(&line.text, stripped, |n| {
            let Some(&instruction) = line.instruction_indices.get(n) else {
                log::warn!("Line {} has no inline instruction {}", line_index, n);
                return TagResolution::Unresolved;
            };
            let Some(inst) = script.instructions.get(instruction) else {
                log::warn!("Instruction {} not found", instruction);
                return TagResolution::Unresolved;
            };
            match inst.first().and_then(|&op| OpCode::from_repr(op)) {
                Some(op) if op.is_deferred() => TagResolution::Event(instruction),
                _ => TagResolution::Splice(self.with_evaluator(|ev| ev.evaluate(inst)).to_string()),
            }
        });

        let speakers = line
            .speaker_indices
            .iter()
            .filter_map(|&i| {
                let speaker = self.speakers.get(i).cloned();
                if speaker.is_none() {
                    log::warn!("Speaker {} not found", i);
                }
                speaker
            })
            .collect();

        Some(DialogLine::new(line_index, speakers, parsed, line.next))
    }
}
