//! Keyboard-only navigation of the host's day list
//!
//! The host offers no row selection, so the cursor is parked on row 1 with
//! "home" and walked to the target with page-down jumps plus single steps.
//! Nothing verifies where the cursor ends up; `page_down_size` has to match
//! the host's real paging.

use tracing::{debug, info};

use crate::desktop::{Desktop, Key};
use crate::dispatcher::InputDispatcher;
use crate::error::MacroResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Approach {
    /// Step down from the top of the landing page
    FromAbove,
    /// Overshoot by one page, then step up
    FromBelow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationPlan {
    pub page_jumps: u32,
    pub steps: u32,
    pub approach: Approach,
}

impl NavigationPlan {
    /// Keys to send after the cursor sits on row 1
    ///
    /// `target` is 1-based; `page_size` must be positive. Targets on the first
    /// page always step down, so no jump is ever spent on them.
    pub fn new(target: u32, page_size: u32) -> Self {
        let index = target.saturating_sub(1);
        let page_size = page_size.max(1);
        let pages = index / page_size;
        let offset = index % page_size;

        if pages > 0 && offset * 2 > page_size {
            Self {
                page_jumps: pages + 1,
                steps: page_size - offset,
                approach: Approach::FromBelow,
            }
        } else {
            Self {
                page_jumps: pages,
                steps: offset,
                approach: Approach::FromAbove,
            }
        }
    }

    pub fn step_key(&self) -> Key {
        match self.approach {
            Approach::FromAbove => Key::Down,
            Approach::FromBelow => Key::Up,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = Key> {
        std::iter::repeat_n(Key::PageDown, self.page_jumps as usize)
            .chain(std::iter::repeat_n(self.step_key(), self.steps as usize))
    }

    pub fn keystrokes(&self) -> u32 {
        self.page_jumps + self.steps
    }
}

/// Focus the list through its first visible row, park on row 1 and walk to
/// `target`. A failed click aborts before any key is sent.
pub fn navigate_to<D: Desktop>(
    dispatcher: &mut InputDispatcher<'_, D>,
    first_row_key: &str,
    target: u32,
) -> MacroResult<NavigationPlan> {
    let page_size = dispatcher.registry().page_size()?;
    let plan = NavigationPlan::new(target, page_size);

    dispatcher.click_key(first_row_key)?;
    dispatcher.press_key(Key::Home)?;

    debug!(target, page_size, ?plan, "Navigating list");
    for key in plan.keys() {
        dispatcher.press_key(key)?;
    }
    info!(target, keystrokes = plan.keystrokes(), "List cursor moved");
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desktop::fake::FakeDesktop;
    use crate::desktop::Point;
    use crate::error::MacroError;
    use crate::registry::PositionRegistry;
    use serde_json::json;

    /// Row reached from row 1 by following the plan
    fn landing_row(plan: &NavigationPlan, page_size: u32) -> i64 {
        let mut row = 1 + i64::from(plan.page_jumps) * i64::from(page_size);
        match plan.approach {
            Approach::FromAbove => row += i64::from(plan.steps),
            Approach::FromBelow => row -= i64::from(plan.steps),
        }
        row
    }

    #[test]
    fn test_first_page_only_steps_down() {
        for page_size in [1, 2, 5, 10, 18] {
            for day in 1..=page_size {
                let plan = NavigationPlan::new(day, page_size);
                assert_eq!(plan.page_jumps, 0, "day={day} page_size={page_size}");
                assert_eq!(plan.steps, day - 1);
                assert_eq!(plan.step_key(), Key::Down);
            }
        }
    }

    #[test]
    fn test_page_jump_count_bounds_and_landing() {
        for page_size in [1, 3, 10, 18] {
            for day in 1..=200 {
                let plan = NavigationPlan::new(day, page_size);
                let base = (day - 1) / page_size;
                assert!(plan.page_jumps == base || plan.page_jumps == base + 1);
                assert_eq!(landing_row(&plan, page_size), i64::from(day));
            }
        }
    }

    #[test]
    fn test_never_worse_than_stepping() {
        for page_size in [3, 10, 18] {
            for day in 1..=200 {
                let plan = NavigationPlan::new(day, page_size);
                assert!(plan.keystrokes() <= day - 1, "day={day}");
            }
        }
    }

    #[test]
    fn test_approach_from_below_past_half_page() {
        // row 29 = 2 full pages + offset 8 of 10
        let plan = NavigationPlan::new(29, 10);
        assert_eq!(
            plan,
            NavigationPlan {
                page_jumps: 3,
                steps: 2,
                approach: Approach::FromBelow
            }
        );
    }

    #[test]
    fn test_exact_half_approaches_from_above() {
        let plan = NavigationPlan::new(16, 10);
        assert_eq!(plan.approach, Approach::FromAbove);
        assert_eq!((plan.page_jumps, plan.steps), (1, 5));
    }

    #[test]
    fn test_page_boundary_needs_no_steps() {
        let plan = NavigationPlan::new(21, 10);
        assert_eq!((plan.page_jumps, plan.steps), (2, 0));
    }

    #[test]
    fn test_zero_target_treated_as_first_row() {
        let plan = NavigationPlan::new(0, 10);
        assert_eq!(plan.keystrokes(), 0);
    }

    fn registry() -> PositionRegistry {
        PositionRegistry::from_value(json!({
            "window_title": "Host",
            "page_down_size": 10,
            "delays": { "default": 0 },
            "ui_positions": { "day_list": { "first_row": [10, 10] } }
        }))
    }

    #[test]
    fn test_navigate_sends_home_then_plan() {
        let reg = registry();
        let mut dispatcher = InputDispatcher::new(FakeDesktop::with_window("Host", Point::new(0, 0)), &reg);
        navigate_to(&mut dispatcher, "ui_positions.day_list.first_row", 29).unwrap();

        assert_eq!(dispatcher.desktop().clicks(), vec![Point::new(10, 10)]);
        assert_eq!(
            dispatcher.desktop().keys(),
            vec![Key::Home, Key::PageDown, Key::PageDown, Key::PageDown, Key::Up, Key::Up]
        );
    }

    #[test]
    fn test_navigate_aborts_when_click_fails() {
        let reg = registry();
        let mut dispatcher = InputDispatcher::new(FakeDesktop::with_window("Gone", Point::new(0, 0)), &reg);
        let err = navigate_to(&mut dispatcher, "ui_positions.day_list.first_row", 5).unwrap_err();
        assert!(matches!(err, MacroError::WindowNotFound { .. }));
        assert!(dispatcher.desktop().keys().is_empty());
    }
}
