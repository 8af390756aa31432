//! Host window lookup and activation
//!
//! One entry point for every caller; the title matching strategy is chosen
//! explicitly instead of being baked into each call site.

use std::time::Duration;
use tracing::debug;

use crate::desktop::{Desktop, HostWindow};
use crate::error::{MacroError, MacroResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleMatch {
    /// Title equals the needle; disambiguates processes sharing a product name
    Exact,
    /// Title contains the needle (calibration and diagnostics only)
    Contains,
}

impl TitleMatch {
    pub fn matches(self, title: &str, needle: &str) -> bool {
        match self {
            TitleMatch::Exact => title == needle,
            TitleMatch::Contains => title.contains(needle),
        }
    }
}

/// First window whose title matches `needle`
pub fn locate<D: Desktop + ?Sized>(
    desktop: &mut D,
    needle: &str,
    strategy: TitleMatch,
) -> MacroResult<HostWindow> {
    let windows = desktop
        .windows()
        .map_err(|e| MacroError::action("window enumeration", format!("{e:#}")))?;
    debug!(count = windows.len(), title = needle, ?strategy, "Enumerated windows");

    windows
        .into_iter()
        .find(|w| strategy.matches(&w.title, needle))
        .ok_or_else(|| {
            debug!(title = needle, ?strategy, "Host window not found");
            MacroError::WindowNotFound {
                title: needle.to_string(),
            }
        })
}

/// Raise/focus `window` then wait `settle` for the window manager to finish
pub fn activate<D: Desktop + ?Sized>(
    desktop: &mut D,
    window: &HostWindow,
    settle: Duration,
) -> MacroResult<()> {
    desktop
        .activate(window)
        .map_err(|e| MacroError::action(format!("activate window {}", window.id), format!("{e:#}")))?;
    desktop.sleep(settle);
    Ok(())
}

/// Locate by exact title and activate; the handle is only valid for the
/// current interaction
pub fn focus<D: Desktop + ?Sized>(
    desktop: &mut D,
    title: &str,
    settle: Duration,
) -> MacroResult<HostWindow> {
    let window = locate(desktop, title, TitleMatch::Exact)?;
    activate(desktop, &window, settle)?;
    debug!(window = window.id, x = window.origin.x, y = window.origin.y, "Host window focused");
    Ok(window)
}
