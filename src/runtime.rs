mod context;
mod line;
mod presenter;
mod state;

use std::sync::Arc;

pub use self::context::{DialogContext, SessionConfig};
pub use self::line::DialogLine;
pub use self::presenter::DialogPresenter;
pub use self::state::{SessionSnapshot, SessionState};

use crate::bridge::SharedBridge;
use crate::error::{Result, RuntimeError};
use crate::format::{DialogScript, GoTo, GoToType};

/// A dialog session drives one script through a presenter
pub struct DialogSession<P: DialogPresenter> {
    context: DialogContext,
    presenter: P,
    current: Option<GoTo>,
    state: SessionState,
    steps_without_input: usize,
}

impl<P: DialogPresenter> DialogSession<P> {
    pub fn new(script: Arc<DialogScript>, bridge: Arc<SharedBridge>, presenter: P) -> Self {
        Self::new_with_context(presenter, DialogContext::new(script, bridge))
    }

    pub fn new_with_context(presenter: P, context: DialogContext) -> Self {
        Self {
            context,
            presenter,
            current: None,
            state: SessionState::Idle,
            steps_without_input: 0,
        }
    }

    pub fn context(&self) -> &DialogContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut DialogContext {
        &mut self.context
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Statement the next step will execute.
    pub fn current(&self) -> Option<GoTo> {
        self.current
    }

    /// Starts at the entry section.
    pub fn start(&mut self) -> Result<()> {
        let entry = self.context.script().entry();
        self.start_at(entry)
    }

    pub fn start_section(&mut self, name: &str) -> Result<()> {
        let index = self
            .context
            .script()
            .section_by_name(name)
            .ok_or_else(|| RuntimeError::SectionNotFound(name.to_string()))?;
        self.start_at(GoTo::section(index))
    }

    fn start_at(&mut self, goto: GoTo) -> Result<()> {
        if self.state == SessionState::Running {
            return Err(RuntimeError::SessionStarted);
        }
        if self.context.script().sections.is_empty() {
            return Err(RuntimeError::NoSections);
        }
        if !self.context.script().has_target(goto) {
            return Err(RuntimeError::DanglingGoTo(goto));
        }

        log::debug!("Dialog session starting at {:?}", goto);
        self.current = Some(goto);
        self.state = SessionState::Running;
        self.steps_without_input = 0;
        Ok(())
    }

    /// Executes one statement. Returns `false` once the dialog has ended.
    pub async fn step(&mut self) -> Result<bool> {
        match self.state {
            SessionState::Idle => return Err(RuntimeError::SessionNotStarted),
            SessionState::Closed => return Err(RuntimeError::SessionClosed),
            SessionState::Running => {}
        }

        let goto = self.current.unwrap_or(GoTo::END);
        if !self.context.script().has_target(goto) {
            return Err(RuntimeError::DanglingGoTo(goto));
        }
        log::trace!("Dialog step {:?}", goto);

        let script = self.context.script().clone();
        let next = match goto.kind {
            GoToType::Undefined | GoToType::End => {
                self.close().await?;
                return Ok(false);
            }
            GoToType::Section => {
                self.count_step()?;
                script.sections[goto.index].next
            }
            GoToType::Line => {
                let stripped = self
                    .presenter
                    .strip_markup(&script.lines[goto.index].text);
                let line = self
                    .context
                    .build_line(goto.index, &stripped)
                    .ok_or(RuntimeError::DanglingGoTo(goto))?;
                let next = line.next;
                self.presenter
                    .handle_line(&mut self.context, line)
                    .await?;
                self.steps_without_input = 0;
                next
            }
            GoToType::Instruction => {
                self.count_step()?;
                let stmt = &script.instruction_stmts[goto.index];
                stmt.instruction_index()
                    .and_then(|i| self.context.eval_flow(i))
                    .unwrap_or(stmt.next)
            }
            GoToType::Conditional => {
                self.count_step()?;
                self.context.resolve_conditional(goto.index)
            }
            GoToType::Choice => {
                let choices = self.context.choices(goto.index);
                if choices.is_empty() {
                    return Err(RuntimeError::EmptyChoiceSet(goto.index));
                }
                let selected = self
                    .presenter
                    .open_option_box(&mut self.context, &choices)
                    .await?;
                self.steps_without_input = 0;
                match choices.get(selected) {
                    Some(choice) if !choice.disabled => choice.next,
                    _ => {
                        return Err(RuntimeError::InvalidChoice {
                            index: selected,
                            offered: choices.len(),
                        })
                    }
                }
            }
        };

        log::debug!("Dialog transition {:?} -> {:?}", goto, next);
        self.current = Some(next);
        Ok(true)
    }

    /// Like [`step`](Self::step), but a failure force-closes the session
    /// before the error is returned.
    pub async fn proceed(&mut self) -> Result<bool> {
        if self.state != SessionState::Running {
            return self.step().await;
        }

        match self.step().await {
            Ok(running) => Ok(running),
            Err(e) => {
                log::error!("Dialog session failed at {:?}: {}", self.current, e);
                if let Err(close_error) = self.close().await {
                    log::error!("Failed to close dialog: {}", close_error);
                }
                Err(e)
            }
        }
    }

    /// Runs the dialog to its end, starting it first if needed.
    pub async fn run(&mut self) -> Result<()> {
        if self.state == SessionState::Idle {
            self.start()?;
        }
        while self.proceed().await? {}
        Ok(())
    }

    pub fn run_blocking(&mut self) -> Result<()> {
        pollster::block_on(self.run())
    }

    /// Closes the session. Closing twice is a no-op.
    pub async fn close(&mut self) -> Result<()> {
        if self.state == SessionState::Closed {
            return Ok(());
        }
        self.state = SessionState::Closed;
        self.current = None;
        log::debug!("Dialog session closed");
        self.presenter.close_dialog(&mut self.context).await
    }

    pub fn save(&self) -> SessionSnapshot {
        SessionSnapshot {
            current: self.current,
            storage: self.context.storage().clone(),
            speakers: self.context.speakers().to_vec(),
        }
    }

    pub fn restore(&mut self, snapshot: SessionSnapshot) -> Result<()> {
        if let Some(goto) = snapshot.current {
            if !self.context.script().has_target(goto) {
                return Err(RuntimeError::DanglingGoTo(goto));
            }
        }

        *self.context.storage_mut() = snapshot.storage;
        *self.context.speakers_mut() = snapshot.speakers;
        self.current = snapshot.current;
        self.state = if self.current.is_some() {
            SessionState::Running
        } else {
            SessionState::Idle
        };
        self.steps_without_input = 0;
        Ok(())
    }

    fn count_step(&mut self) -> Result<()> {
        self.steps_without_input += 1;
        let limit = self.context.config().max_steps_without_input;
        if self.steps_without_input > limit {
            return Err(RuntimeError::StepLimitExceeded(limit));
        }
        Ok(())
    }
}
