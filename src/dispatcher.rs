//! Registry-driven input dispatch
//!
//! Every pointer action re-acquires the host window first: the host may have
//! moved since the last step, and registry offsets are relative to its origin.

use std::time::Duration;
use tracing::{debug, info};

use crate::constants::delays;
use crate::desktop::{Desktop, HostWindow, Key, Point};
use crate::error::{MacroError, MacroResult};
use crate::registry::PositionRegistry;
use crate::window_locator;

pub struct InputDispatcher<'r, D: Desktop> {
    desktop: D,
    registry: &'r PositionRegistry,
}

impl<'r, D: Desktop> InputDispatcher<'r, D> {
    pub fn new(desktop: D, registry: &'r PositionRegistry) -> Self {
        Self { desktop, registry }
    }

    pub fn registry(&self) -> &'r PositionRegistry {
        self.registry
    }

    pub fn desktop_mut(&mut self) -> &mut D {
        &mut self.desktop
    }

    #[cfg(test)]
    pub fn desktop(&self) -> &D {
        &self.desktop
    }

    /// Locate and activate the configured host window
    pub fn focus_host(&mut self) -> MacroResult<HostWindow> {
        let title = self.registry.window_title()?;
        let settle = self.registry.delay(delays::WINDOW_ACTIVATE);
        window_locator::focus(&mut self.desktop, title, settle)
    }

    /// Absolute screen point of a registry key on the freshly focused host
    pub fn resolve(&mut self, path: &str) -> MacroResult<Point> {
        let window = self.focus_host()?;
        let offset = self.registry.point(path)?;
        let at = window
            .origin
            .checked_add(offset)
            .ok_or_else(|| MacroError::ConfigShape {
                path: path.to_string(),
                expected: "an on-screen offset",
            })?;
        if self.registry.debug() {
            info!(path, x = at.x, y = at.y, "Resolved position");
        } else {
            debug!(path, x = at.x, y = at.y, "Resolved position");
        }
        Ok(at)
    }

    pub fn click_key(&mut self, path: &str) -> MacroResult<()> {
        let at = self.resolve(path)?;
        self.desktop
            .click(at)
            .map_err(|e| MacroError::action(format!("click '{path}'"), format!("{e:#}")))?;
        self.wait(delays::CLICK);
        Ok(())
    }

    /// Click the field at `path`, then paste `text` into it
    pub fn type_text(&mut self, path: &str, text: &str) -> MacroResult<()> {
        self.click_key(path)?;
        self.paste(text)
    }

    /// Paste into whatever control currently has focus
    pub fn paste(&mut self, text: &str) -> MacroResult<()> {
        self.desktop
            .paste(text)
            .map_err(|e| MacroError::action("paste", format!("{e:#}")))?;
        self.wait(delays::TYPE);
        Ok(())
    }

    pub fn move_to(&mut self, path: &str) -> MacroResult<Point> {
        let at = self.resolve(path)?;
        self.desktop
            .move_pointer(at)
            .map_err(|e| MacroError::action(format!("move to '{path}'"), format!("{e:#}")))?;
        Ok(at)
    }

    pub fn press_key(&mut self, key: Key) -> MacroResult<()> {
        self.desktop
            .press_key(key)
            .map_err(|e| MacroError::action(format!("press '{}'", key.name()), format!("{e:#}")))?;
        self.wait(delays::KEY);
        Ok(())
    }

    /// Sleep for the named delay
    pub fn wait(&mut self, name: &str) {
        let duration = self.registry.delay(name);
        self.sleep(duration);
    }

    pub fn sleep(&mut self, duration: Duration) {
        self.desktop.sleep(duration);
    }
}
