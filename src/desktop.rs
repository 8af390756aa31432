//! OS collaborators the engine drives
//!
//! Everything that touches the real screen goes through [`Desktop`], so the
//! locator, dispatcher, navigator and detector can be exercised against a
//! scripted double.

use anyhow::Result;
use std::time::Duration;

use crate::constants::keysym;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// `None` when either coordinate leaves the `i32` range
    pub fn checked_add(self, rhs: Point) -> Option<Point> {
        Some(Point::new(self.x.checked_add(rhs.x)?, self.y.checked_add(rhs.y)?))
    }
}

/// One top-level window as seen at enumeration time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostWindow {
    pub id: u32,
    pub title: String,
    pub origin: Point,
    pub width: u16,
    pub height: u16,
}

/// Keys the engine sends to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Home,
    PageDown,
    Up,
    Down,
    Enter,
}

impl Key {
    pub fn keysym(self) -> u32 {
        match self {
            Key::Home => keysym::HOME,
            Key::PageDown => keysym::PAGE_DOWN,
            Key::Up => keysym::UP,
            Key::Down => keysym::DOWN,
            Key::Enter => keysym::RETURN,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Key::Home => "home",
            Key::PageDown => "pagedown",
            Key::Up => "up",
            Key::Down => "down",
            Key::Enter => "enter",
        }
    }
}

pub trait Desktop {
    /// All managed top-level windows, in stacking/client-list order
    fn windows(&mut self) -> Result<Vec<HostWindow>>;

    /// Number of managed top-level windows
    fn window_count(&mut self) -> Result<usize> {
        Ok(self.windows()?.len())
    }

    /// Raise and focus
    fn activate(&mut self, window: &HostWindow) -> Result<()>;

    fn move_pointer(&mut self, at: Point) -> Result<()>;

    /// Left click at an absolute screen point
    fn click(&mut self, at: Point) -> Result<()>;

    fn press_key(&mut self, key: Key) -> Result<()>;

    /// Put `text` on the clipboard and paste it into the focused control
    fn paste(&mut self, text: &str) -> Result<()>;

    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
