//! Per-day steps, in the only order the host accepts them:
//! print must follow load, load must follow adding the day to the selection.

use std::fmt;
use thiserror::Error;
use tracing::debug;

use crate::completion::PrintSession;
use crate::constants::{delays, keys};
use crate::desktop::Desktop;
use crate::dispatcher::InputDispatcher;
use crate::error::{MacroError, MacroResult};
use crate::job::DayBatchJob;
use crate::pagination;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayStep {
    /// Click the previously selected day
    DeselectCurrent,
    RemoveSelection,
    NavigateToDay,
    AddSelection,
    LoadDay,
    SettleAfterLoad,
    PrintAndWait,
}

impl DayStep {
    pub const ORDER: [DayStep; 7] = [
        DayStep::DeselectCurrent,
        DayStep::RemoveSelection,
        DayStep::NavigateToDay,
        DayStep::AddSelection,
        DayStep::LoadDay,
        DayStep::SettleAfterLoad,
        DayStep::PrintAndWait,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DayStep::DeselectCurrent => "deselect current day",
            DayStep::RemoveSelection => "remove selection",
            DayStep::NavigateToDay => "navigate to day",
            DayStep::AddSelection => "add selection",
            DayStep::LoadDay => "load day",
            DayStep::SettleAfterLoad => "settle after load",
            DayStep::PrintAndWait => "print and wait",
        }
    }

    fn run<D: Desktop>(self, day: &mut DayContext<'_, '_, D>) -> MacroResult<()> {
        let dispatcher = &mut *day.dispatcher;
        match self {
            DayStep::DeselectCurrent => dispatcher.click_key(keys::SELECTED_FIRST_ROW),
            DayStep::RemoveSelection => dispatcher.click_key(keys::SELECTED_REMOVE),
            DayStep::NavigateToDay => {
                pagination::navigate_to(dispatcher, keys::DAY_LIST_FIRST_ROW, day.day).map(|_| ())
            }
            DayStep::AddSelection => dispatcher.click_key(keys::DAY_LIST_ADD),
            DayStep::LoadDay => dispatcher.click_key(keys::LOAD_BUTTON),
            DayStep::SettleAfterLoad => {
                dispatcher.wait(delays::LOAD_SETTLE);
                Ok(())
            }
            DayStep::PrintAndWait => {
                let filename = day.job.filename(day.day);
                day.print.print_and_wait(dispatcher, &filename)
            }
        }
    }
}

impl fmt::Display for DayStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
#[error("day {day}, step '{step}': {error}")]
pub struct StepFailure {
    pub day: u32,
    pub step: DayStep,
    #[source]
    pub error: MacroError,
}

pub struct DayContext<'a, 'r, D: Desktop> {
    pub dispatcher: &'a mut InputDispatcher<'r, D>,
    pub print: &'a mut PrintSession,
    pub job: &'a DayBatchJob,
    pub day: u32,
}

/// Run every step for one day, stopping at the first failure
pub fn run_day<D: Desktop>(mut day: DayContext<'_, '_, D>) -> Result<(), StepFailure> {
    for step in DayStep::ORDER {
        debug!(day = day.day, step = %step, "Running step");
        step.run(&mut day).map_err(|error| StepFailure {
            day: day.day,
            step,
            error,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desktop::fake::FakeDesktop;
    use crate::desktop::{Key, Point};
    use crate::job::{JobForm, WordbookType};
    use crate::registry::PositionRegistry;
    use serde_json::json;

    fn registry(with_load: bool) -> PositionRegistry {
        let mut tree = json!({
            "window_title": "Host",
            "page_down_size": 10,
            "delays": { "default": 0 },
            "ui_positions": {
                "day_list": { "first_row": [1, 0], "add_button": [2, 0] },
                "selected_list": { "first_row": [3, 0], "remove_button": [4, 0] },
                "buttons": { "load": [5, 0], "print": [6, 0] },
                "print_dialog": { "output_path_field": [7, 0], "filename_field": [8, 0] }
            }
        });
        if !with_load {
            tree["ui_positions"]["buttons"]
                .as_object_mut()
                .unwrap()
                .remove("load");
        }
        PositionRegistry::from_value(tree)
    }

    fn job() -> DayBatchJob {
        DayBatchJob::validate(&JobForm {
            name: "Book".into(),
            kind: Some(WordbookType::Random),
            version: Some("1".into()),
            day_start: 1,
            day_end: 3,
        })
        .unwrap()
    }

    #[test]
    fn test_steps_click_in_pipeline_order() {
        let reg = registry(true);
        let mut dispatcher = InputDispatcher::new(FakeDesktop::with_window("Host", Point::new(0, 0)), &reg);
        let mut print = PrintSession::new("/out");
        let job = job();

        run_day(DayContext {
            dispatcher: &mut dispatcher,
            print: &mut print,
            job: &job,
            day: 3,
        })
        .unwrap();

        let xs: Vec<i32> = dispatcher.desktop().clicks().iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![3, 4, 1, 2, 5, 6, 7, 8]);
        assert_eq!(
            dispatcher.desktop().keys(),
            vec![Key::Home, Key::Down, Key::Down, Key::Enter, Key::Enter]
        );
        assert_eq!(dispatcher.desktop().pastes(), vec!["/out", "Book 랜덤ver1 Day 3"]);
    }

    #[test]
    fn test_failure_names_the_step_and_stops() {
        let reg = registry(false);
        let mut dispatcher = InputDispatcher::new(FakeDesktop::with_window("Host", Point::new(0, 0)), &reg);
        let mut print = PrintSession::new("/out");
        let job = job();

        let failure = run_day(DayContext {
            dispatcher: &mut dispatcher,
            print: &mut print,
            job: &job,
            day: 2,
        })
        .unwrap_err();

        assert_eq!(failure.step, DayStep::LoadDay);
        assert_eq!(failure.day, 2);
        assert!(matches!(failure.error, MacroError::ConfigMissingKey { .. }));
        // nothing after the failing step ran
        assert!(!dispatcher.desktop().clicks().iter().any(|p| p.x == 6));
        assert!(!print.output_configured());
    }
}
