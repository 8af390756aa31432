//! Print completion detection
//!
//! The host's print dialog is the only observable side effect of printing:
//! a transient top-level window that disappears once the document is
//! written. Completion is the window count falling back to the count captured
//! just before the print button was pressed.

use std::time::Duration;
use tracing::{debug, info, warn};

use crate::constants::{delays, keys};
use crate::desktop::{Desktop, Key};
use crate::dispatcher::InputDispatcher;
use crate::error::{MacroError, MacroResult};
use crate::registry::PositionRegistry;

/// Bounded polling: at most `max_attempts` checks, `interval` apart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollPolicy {
    pub fn from_registry(registry: &PositionRegistry) -> Self {
        Self {
            interval: registry.delay(delays::PRINT_POLL_INTERVAL),
            max_attempts: registry.print_poll_max_attempts().max(1),
        }
    }
}

fn window_count<D: Desktop + ?Sized>(desktop: &mut D) -> MacroResult<usize> {
    desktop
        .window_count()
        .map_err(|e| MacroError::action("count windows", format!("{e:#}")))
}

/// Block until the window count is at most `baseline`.
/// Returns the number of polls it took.
pub fn wait_for_baseline<D: Desktop + ?Sized>(
    desktop: &mut D,
    baseline: usize,
    policy: PollPolicy,
) -> MacroResult<u32> {
    for attempt in 1..=policy.max_attempts {
        let count = window_count(desktop)?;
        if count <= baseline {
            debug!(attempt, count, baseline, "Window count back to baseline");
            return Ok(attempt);
        }
        debug!(attempt, count, baseline, "Print still in progress");
        desktop.sleep(policy.interval);
    }
    warn!(attempts = policy.max_attempts, baseline, "Gave up waiting for print to finish");
    Err(MacroError::Timeout {
        attempts: policy.max_attempts,
        interval: policy.interval,
    })
}

/// Print state that outlives a single day: the output directory only has to
/// be entered into the dialog once per run
#[derive(Debug)]
pub struct PrintSession {
    output_dir: String,
    output_configured: bool,
}

impl PrintSession {
    pub fn new(output_dir: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            output_configured: false,
        }
    }

    pub fn output_configured(&self) -> bool {
        self.output_configured
    }

    /// Press print, fill in the dialog and wait for the host to finish.
    /// Never returns while a print could still be in flight, except on error.
    pub fn print_and_wait<D: Desktop>(
        &mut self,
        dispatcher: &mut InputDispatcher<'_, D>,
        filename: &str,
    ) -> MacroResult<()> {
        let policy = PollPolicy::from_registry(dispatcher.registry());
        let baseline = window_count(dispatcher.desktop_mut())?;
        debug!(baseline, "Captured window baseline");

        dispatcher.click_key(keys::PRINT_BUTTON)?;

        if !self.output_configured {
            info!(dir = %self.output_dir, "Setting print output directory");
            dispatcher.type_text(keys::OUTPUT_PATH_FIELD, &self.output_dir)?;
            dispatcher.press_key(Key::Enter)?;
            dispatcher.click_key(keys::FILENAME_FIELD)?;
            self.output_configured = true;
        }

        dispatcher.paste(filename)?;
        dispatcher.press_key(Key::Enter)?;
        dispatcher.wait(delays::PRINT_DURATION);

        let polls = wait_for_baseline(dispatcher.desktop_mut(), baseline, policy)?;
        info!(filename, polls, "Print finished");
        Ok(())
    }
}
