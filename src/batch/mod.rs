//! Batch engine: runs the per-day pipeline over a validated day range
//!
//! Single thread of control. Commands are only looked at between days; an
//! iteration that has started always runs to completion or failure.

pub mod pipeline;
pub mod state;

use std::sync::mpsc::{Receiver, TryRecvError};
use tracing::{error, info, warn};

use crate::completion::PrintSession;
use crate::desktop::Desktop;
use crate::dispatcher::InputDispatcher;
use crate::error::{MacroError, MacroResult};
use crate::job::{DayBatchJob, JobForm};

use pipeline::{run_day, DayContext, StepFailure};
pub use state::{FormLock, MacroRunState};
use state::{RunEvent, StateMachine};

/// Commands from the trigger surface (hotkeys, signals, a UI)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroCommand {
    Start,
    Pause,
    Stop,
}

/// Readout for whatever drives the form
pub trait BatchObserver {
    fn state_changed(&mut self, state: MacroRunState, form: &FormLock);
    fn log(&mut self, line: &str);
}

#[derive(Debug)]
pub enum BatchOutcome {
    Finished,
    /// Stopped by the user before `next_day` started
    Stopped { next_day: u32 },
    Aborted(StepFailure),
}

#[derive(Debug)]
pub struct BatchReport {
    pub completed: Vec<u32>,
    pub outcome: BatchOutcome,
}

pub struct BatchEngine<'r, D: Desktop, O: BatchObserver> {
    dispatcher: InputDispatcher<'r, D>,
    machine: StateMachine,
    observer: O,
    commands: Receiver<MacroCommand>,
    print: PrintSession,
}

impl<'r, D: Desktop, O: BatchObserver> BatchEngine<'r, D, O> {
    pub fn new(
        dispatcher: InputDispatcher<'r, D>,
        observer: O,
        commands: Receiver<MacroCommand>,
        print: PrintSession,
    ) -> Self {
        Self {
            dispatcher,
            machine: StateMachine::default(),
            observer,
            commands,
            print,
        }
    }

    pub fn state(&self) -> MacroRunState {
        self.machine.state()
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    #[cfg(test)]
    pub fn dispatcher(&self) -> &InputDispatcher<'r, D> {
        &self.dispatcher
    }

    /// Validate the form, then run. Invalid forms never reach the desktop.
    pub fn start(&mut self, form: &JobForm) -> MacroResult<BatchReport> {
        let job = DayBatchJob::validate(form).inspect_err(|e| {
            error!(error = %e, "Rejected batch request");
        })?;
        Ok(self.run(&job))
    }

    /// Block until a `start` command arrives; `false` on stop or hang-up
    pub fn wait_for_start(&mut self) -> bool {
        info!("Waiting for start command");
        loop {
            match self.commands.recv() {
                Ok(MacroCommand::Start) => return true,
                Ok(MacroCommand::Stop) | Err(_) => return false,
                Ok(MacroCommand::Pause) => {}
            }
        }
    }

    pub fn run(&mut self, job: &DayBatchJob) -> BatchReport {
        self.fire(RunEvent::Start);
        info!(
            name = job.name(),
            kind = %job.kind(),
            version = ?job.version(),
            start = *job.days().start(),
            end = *job.days().end(),
            "Batch started"
        );

        let mut completed = Vec::new();
        for day in job.days() {
            if let Err(e) = self.checkpoint() {
                self.emit(&format!("Batch stopped before day {day}: {e}"));
                self.fire(RunEvent::Stop);
                return BatchReport {
                    completed,
                    outcome: BatchOutcome::Stopped { next_day: day },
                };
            }

            let context = DayContext {
                dispatcher: &mut self.dispatcher,
                print: &mut self.print,
                job,
                day,
            };
            match run_day(context) {
                Ok(()) => {
                    completed.push(day);
                    self.emit(&format!("Day {day} printed as '{}'", job.filename(day)));
                }
                Err(failure) => {
                    error!(day, step = %failure.step, error = %failure.error, "Batch aborted");
                    self.emit(&format!("Batch aborted: {failure}"));
                    self.fire(RunEvent::Abort);
                    return BatchReport {
                        completed,
                        outcome: BatchOutcome::Aborted(failure),
                    };
                }
            }
        }

        self.emit(&format!("Batch finished: {} day(s) printed", completed.len()));
        self.fire(RunEvent::Finish);
        BatchReport {
            completed,
            outcome: BatchOutcome::Finished,
        }
    }

    /// Between-days cancellation point. Pausing blocks here until resumed.
    fn checkpoint(&mut self) -> MacroResult<()> {
        loop {
            match self.commands.try_recv() {
                Ok(MacroCommand::Stop) => return Err(MacroError::UserAbort),
                Ok(MacroCommand::Pause) => {
                    self.fire(RunEvent::Pause);
                    return self.wait_while_paused();
                }
                Ok(MacroCommand::Start) => {}
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return Ok(()),
            }
        }
    }

    fn wait_while_paused(&mut self) -> MacroResult<()> {
        self.emit("Batch paused");
        loop {
            match self.commands.recv() {
                Ok(MacroCommand::Start) => {
                    self.fire(RunEvent::Start);
                    self.emit("Batch resumed");
                    return Ok(());
                }
                Ok(MacroCommand::Pause) => {}
                // nobody left to resume us
                Ok(MacroCommand::Stop) | Err(_) => return Err(MacroError::UserAbort),
            }
        }
    }

    fn fire(&mut self, event: RunEvent) {
        let from = self.machine.state();
        match self.machine.fire(event) {
            Some(transition) => {
                info!(from = %from, to = %transition.to, ?event, "State changed");
                self.observer.state_changed(transition.to, self.machine.form());
            }
            None => warn!(state = %from, ?event, "Ignored event"),
        }
    }

    fn emit(&mut self, line: &str) {
        self.observer.log(line);
    }
}
