use std::future::Future;

use crate::error::Result;
use crate::format::Choice;
use crate::parser::bbcode;

use super::{DialogContext, DialogLine};

/// Presentation layer driven by a dialog session.
///
/// Each call is awaited before the session moves on, so a presenter decides
/// when the dialog advances (end of a typewriter animation, a key press, ...).
pub trait DialogPresenter: Send {
    /// Text as displayed by the renderer with presentational markup removed.
    fn strip_markup(&self, text: &str) -> String {
        bbcode::strip(text)
    }

    /// Displays a line and resolves once the player is done with it. Text
    /// events are fired through [`DialogContext::fire_event`].
    fn handle_line(
        &mut self,
        ctx: &mut DialogContext,
        line: DialogLine,
    ) -> impl Future<Output = Result<()>>;

    /// Offers the choices and resolves with the index of the selected one.
    fn open_option_box(
        &mut self,
        ctx: &mut DialogContext,
        choices: &[Choice],
    ) -> impl Future<Output = Result<usize>>;

    fn close_dialog(&mut self, ctx: &mut DialogContext) -> impl Future<Output = Result<()>>;
}
