use std::panic::{self, AssertUnwindSafe};

use anyhow::Result;

use jazzify_timing::TransportState;
use jazzify_types::{JudgmentResult, Target};

/// Callback surface of a running session. Every method defaults to a no-op.
///
/// Errors and panics raised here are logged by the session and never stop
/// the scheduling loop.
pub trait SessionListener {
    fn on_question_activated(&mut self, _target: &Target) -> Result<()> {
        Ok(())
    }

    fn on_attack_success(&mut self, _target: &Target, _judgment: &JudgmentResult) -> Result<()> {
        Ok(())
    }

    fn on_attack_fail(&mut self, _target: &Target) -> Result<()> {
        Ok(())
    }

    fn on_game_complete(&mut self) -> Result<()> {
        Ok(())
    }

    /// A new loop cycle's targets were generated.
    fn on_loop(&mut self, _cycle: u32) -> Result<()> {
        Ok(())
    }

    fn on_measure(&mut self, _position: &TransportState) -> Result<()> {
        Ok(())
    }

    /// Externally owned completion condition (e.g. all enemies defeated).
    fn is_complete(&self) -> bool {
        false
    }
}

impl SessionListener for () {}

/// Run one callback, containing any error or panic it raises.
pub(crate) fn dispatch<L, F>(listener: &mut L, callback: &str, f: F)
where
    L: SessionListener + ?Sized,
    F: FnOnce(&mut L) -> Result<()>,
{
    match panic::catch_unwind(AssertUnwindSafe(|| f(listener))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => log::error!("{callback} callback failed: {e:#}"),
        Err(_) => log::error!("{callback} callback panicked"),
    }
}

/// Query the completion condition; a panicking check counts as incomplete.
pub(crate) fn poll_complete<L: SessionListener + ?Sized>(listener: &L) -> bool {
    panic::catch_unwind(AssertUnwindSafe(|| listener.is_complete())).unwrap_or_else(|_| {
        log::error!("is_complete panicked");
        false
    })
}
