//! Run state and the transition table the UI reads from
//!
//! IDLE is both the initial and the only resting state. The form is locked on
//! the way into RUNNING and unlocked on every way back into IDLE, so a UI that
//! only mirrors `FormLock` can never be left disabled after an abort.

use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MacroRunState {
    #[default]
    Idle,
    Running,
    Paused,
}

impl fmt::Display for MacroRunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MacroRunState::Idle => "IDLE",
            MacroRunState::Running => "RUNNING",
            MacroRunState::Paused => "PAUSED",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunEvent {
    /// `start` command; from PAUSED this resumes with the next day
    Start,
    Pause,
    Stop,
    /// Last day printed
    Finish,
    /// Unrecoverable failure
    Abort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffect {
    LockForm,
    UnlockForm,
}

/// Inputs of the batch form
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FormField {
    Name,
    Type,
    Version,
    DayStart,
    DayEnd,
    StartButton,
}

impl FormField {
    pub const ALL: [FormField; 6] = [
        FormField::Name,
        FormField::Type,
        FormField::Version,
        FormField::DayStart,
        FormField::DayEnd,
        FormField::StartButton,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: MacroRunState,
    pub event: RunEvent,
    pub to: MacroRunState,
    pub effects: &'static [SideEffect],
}

const fn t(
    from: MacroRunState,
    event: RunEvent,
    to: MacroRunState,
    effects: &'static [SideEffect],
) -> Transition {
    Transition { from, event, to, effects }
}

use MacroRunState::{Idle, Paused, Running};
use SideEffect::{LockForm, UnlockForm};

pub const TRANSITIONS: &[Transition] = &[
    t(Idle, RunEvent::Start, Running, &[LockForm]),
    t(Running, RunEvent::Pause, Paused, &[]),
    t(Running, RunEvent::Stop, Idle, &[UnlockForm]),
    t(Running, RunEvent::Finish, Idle, &[UnlockForm]),
    t(Running, RunEvent::Abort, Idle, &[UnlockForm]),
    t(Paused, RunEvent::Start, Running, &[]),
    t(Paused, RunEvent::Stop, Idle, &[UnlockForm]),
    t(Paused, RunEvent::Abort, Idle, &[UnlockForm]),
];

pub fn lookup(from: MacroRunState, event: RunEvent) -> Option<&'static Transition> {
    TRANSITIONS.iter().find(|t| t.from == from && t.event == event)
}

/// Currently disabled form fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormLock {
    locked: BTreeSet<FormField>,
}

impl FormLock {
    pub fn is_locked(&self, field: FormField) -> bool {
        self.locked.contains(&field)
    }

    pub fn locked(&self) -> &BTreeSet<FormField> {
        &self.locked
    }

    fn apply(&mut self, effect: SideEffect) {
        match effect {
            SideEffect::LockForm => self.locked.extend(FormField::ALL),
            SideEffect::UnlockForm => self.locked.clear(),
        }
    }
}

#[derive(Debug, Default)]
pub struct StateMachine {
    state: MacroRunState,
    form: FormLock,
}

impl StateMachine {
    pub fn state(&self) -> MacroRunState {
        self.state
    }

    pub fn form(&self) -> &FormLock {
        &self.form
    }

    /// Events the table accepts in the current state
    pub fn accepted(&self) -> Vec<RunEvent> {
        TRANSITIONS
            .iter()
            .filter(|t| t.from == self.state)
            .map(|t| t.event)
            .collect()
    }

    /// Apply `event`; `None` (and no change) when the table has no entry
    pub fn fire(&mut self, event: RunEvent) -> Option<&'static Transition> {
        let transition = lookup(self.state, event)?;
        for effect in transition.effects {
            self.form.apply(*effect);
        }
        self.state = transition.to;
        Some(transition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_idle_and_unlocked() {
        let machine = StateMachine::default();
        assert_eq!(machine.state(), Idle);
        assert!(machine.form().locked().is_empty());
        assert_eq!(machine.accepted(), vec![RunEvent::Start]);
    }

    #[test]
    fn test_start_stop_round_trip_unlocks_everything_start_locked() {
        let mut machine = StateMachine::default();
        machine.fire(RunEvent::Start).unwrap();
        let locked_by_start = machine.form().locked().clone();
        assert_eq!(locked_by_start.len(), FormField::ALL.len());

        machine.fire(RunEvent::Stop).unwrap();
        assert_eq!(machine.state(), Idle);
        for field in &locked_by_start {
            assert!(!machine.form().is_locked(*field));
        }
    }

    #[test]
    fn test_pause_keeps_form_locked() {
        let mut machine = StateMachine::default();
        machine.fire(RunEvent::Start);
        machine.fire(RunEvent::Pause).unwrap();
        assert_eq!(machine.state(), Paused);
        assert!(machine.form().is_locked(FormField::DayStart));

        machine.fire(RunEvent::Start).unwrap();
        assert_eq!(machine.state(), Running);
        assert!(machine.form().is_locked(FormField::Name));
    }

    #[test]
    fn test_abort_from_any_active_state_returns_to_idle() {
        for path in [&[RunEvent::Start][..], &[RunEvent::Start, RunEvent::Pause][..]] {
            let mut machine = StateMachine::default();
            for event in path {
                machine.fire(*event).unwrap();
            }
            machine.fire(RunEvent::Abort).unwrap();
            assert_eq!(machine.state(), Idle);
            assert!(machine.form().locked().is_empty());
        }
    }

    #[test]
    fn test_rejected_events_change_nothing() {
        let mut machine = StateMachine::default();
        assert!(machine.fire(RunEvent::Pause).is_none());
        assert!(machine.fire(RunEvent::Stop).is_none());
        assert!(machine.fire(RunEvent::Finish).is_none());
        assert_eq!(machine.state(), Idle);

        machine.fire(RunEvent::Start);
        assert!(machine.fire(RunEvent::Start).is_none());
        assert_eq!(machine.state(), Running);
    }

    #[test]
    fn test_every_path_into_idle_unlocks() {
        for transition in TRANSITIONS.iter().filter(|t| t.to == Idle) {
            assert!(transition.effects.contains(&UnlockForm), "{transition:?}");
        }
    }
}
