use anyhow::{Context, Result};
use tracing::debug;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::*;
use x11rb::protocol::xtest::ConnectionExt as XTestExt;
use x11rb::rust_connection::RustConnection;

use crate::constants::{keysym, x11};
use crate::desktop::{Desktop, HostWindow, Key, Point};

/// Pre-cached X11 atoms to avoid repeated roundtrips
pub struct CachedAtoms {
    pub wm_name: Atom,
    pub net_wm_name: Atom,
    pub utf8_string: Atom,
    pub net_client_list: Atom,
    pub net_active_window: Atom,
}

fn intern(conn: &RustConnection, name: &str) -> Result<Atom> {
    Ok(conn
        .intern_atom(false, name.as_bytes())
        .with_context(|| format!("Failed to intern {name} atom"))?
        .reply()
        .with_context(|| format!("Failed to get reply for {name} atom"))?
        .atom)
}

impl CachedAtoms {
    pub fn new(conn: &RustConnection) -> Result<Self> {
        Ok(Self {
            wm_name: intern(conn, "WM_NAME")?,
            net_wm_name: intern(conn, "_NET_WM_NAME")?,
            utf8_string: intern(conn, "UTF8_STRING")?,
            net_client_list: intern(conn, "_NET_CLIENT_LIST")?,
            net_active_window: intern(conn, "_NET_ACTIVE_WINDOW")?,
        })
    }
}

/// Keysym → keycode lookup built from the server's keyboard mapping
struct Keymap {
    min_keycode: u8,
    keysyms_per_keycode: u8,
    keysyms: Vec<Keysym>,
}

impl Keymap {
    fn load(conn: &RustConnection) -> Result<Self> {
        let setup = conn.setup();
        let (min, max) = (setup.min_keycode, setup.max_keycode);
        let reply = conn
            .get_keyboard_mapping(min, max - min + 1)
            .context("Failed to query keyboard mapping")?
            .reply()
            .context("Failed to get reply for keyboard mapping")?;
        Ok(Self {
            min_keycode: min,
            keysyms_per_keycode: reply.keysyms_per_keycode,
            keysyms: reply.keysyms,
        })
    }

    fn keycode(&self, sym: Keysym) -> Result<Keycode> {
        let per = usize::from(self.keysyms_per_keycode.max(1));
        let index = self
            .keysyms
            .iter()
            .position(|&s| s == sym)
            .with_context(|| format!("No keycode produces keysym {sym:#x}"))?;
        u8::try_from(index / per + usize::from(self.min_keycode))
            .with_context(|| format!("Keycode for keysym {sym:#x} out of range"))
    }
}

/// The real desktop: EWMH window list/activation plus XTEST input
pub struct X11Desktop {
    conn: RustConnection,
    root: Window,
    atoms: CachedAtoms,
    keymap: Keymap,
    clipboard: Option<arboard::Clipboard>,
}

impl X11Desktop {
    pub fn connect() -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None).context("Failed to connect to X11 display")?;
        let screen = &conn.setup().roots[screen_num];
        let root = screen.root;
        tracing::info!(
            "successfully connected to x11: screen={screen_num}, dimensions={}x{}",
            screen.width_in_pixels,
            screen.height_in_pixels
        );

        let version = conn
            .xtest_get_version(2, 2)
            .context("XTEST extension is not available")?
            .reply()
            .context("Failed to get XTEST version")?;
        debug!(major = version.major_version, minor = version.minor_version, "XTEST available");

        let atoms = CachedAtoms::new(&conn)?;
        let keymap = Keymap::load(&conn)?;
        Ok(Self {
            conn,
            root,
            atoms,
            keymap,
            clipboard: None,
        })
    }

    fn client_list(&self) -> Result<Vec<Window>> {
        let prop = self
            .conn
            .get_property(false, self.root, self.atoms.net_client_list, AtomEnum::WINDOW, 0, u32::MAX)
            .context("Failed to query _NET_CLIENT_LIST")?
            .reply()
            .context("Failed to get reply for _NET_CLIENT_LIST")?;
        Ok(prop
            .value32()
            .ok_or_else(|| anyhow::anyhow!("Invalid return from _NET_CLIENT_LIST"))?
            .collect())
    }

    fn title(&self, window: Window) -> Result<String> {
        let utf8 = self
            .conn
            .get_property(false, window, self.atoms.net_wm_name, self.atoms.utf8_string, 0, x11::TITLE_PROPERTY_LEN)
            .context(format!("Failed to query _NET_WM_NAME for window {window}"))?
            .reply()
            .context(format!("Failed to get _NET_WM_NAME reply for window {window}"))?;
        if !utf8.value.is_empty() {
            return Ok(String::from_utf8_lossy(&utf8.value).into_owned());
        }
        let legacy = self
            .conn
            .get_property(false, window, self.atoms.wm_name, AtomEnum::STRING, 0, x11::TITLE_PROPERTY_LEN)
            .context(format!("Failed to query WM_NAME for window {window}"))?
            .reply()
            .context(format!("Failed to get WM_NAME reply for window {window}"))?;
        Ok(String::from_utf8_lossy(&legacy.value).into_owned())
    }

    fn describe(&self, window: Window) -> Result<HostWindow> {
        let geometry = self
            .conn
            .get_geometry(window)
            .context(format!("Failed to query geometry for window {window}"))?
            .reply()
            .context(format!("Failed to get geometry reply for window {window}"))?;
        let origin = self
            .conn
            .translate_coordinates(window, self.root, 0, 0)
            .context(format!("Failed to translate coordinates for window {window}"))?
            .reply()
            .context(format!("Failed to get translate reply for window {window}"))?;
        Ok(HostWindow {
            id: window,
            title: self.title(window)?,
            origin: Point::new(i32::from(origin.dst_x), i32::from(origin.dst_y)),
            width: geometry.width,
            height: geometry.height,
        })
    }

    fn fake(&self, type_: u8, detail: u8, at: Option<Point>) -> Result<()> {
        let (x, y) = match at {
            Some(p) => (
                i16::try_from(p.x).context(format!("x={} is off screen", p.x))?,
                i16::try_from(p.y).context(format!("y={} is off screen", p.y))?,
            ),
            None => (0, 0),
        };
        self.conn
            .xtest_fake_input(type_, detail, x11rb::CURRENT_TIME, self.root, x, y, 0)
            .context("Failed to send XTEST input")?;
        Ok(())
    }

    fn tap(&self, sym: Keysym) -> Result<()> {
        let code = self.keymap.keycode(sym)?;
        self.fake(KEY_PRESS_EVENT, code, None)?;
        self.fake(KEY_RELEASE_EVENT, code, None)?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.conn.flush().context("Failed to flush X11 connection")
    }
}

impl Desktop for X11Desktop {
    fn windows(&mut self) -> Result<Vec<HostWindow>> {
        let mut windows = Vec::new();
        for window in self.client_list()? {
            // clients can disappear between the list and the queries
            match self.describe(window) {
                Ok(w) => windows.push(w),
                Err(e) => debug!(window = window, error = %e, "Skipping window"),
            }
        }
        Ok(windows)
    }

    fn window_count(&mut self) -> Result<usize> {
        Ok(self.client_list()?.len())
    }

    /// Activate (focus) an X11 window using _NET_ACTIVE_WINDOW
    fn activate(&mut self, window: &HostWindow) -> Result<()> {
        self.conn
            .configure_window(window.id, &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE))
            .context(format!("Failed to raise window {} to top of stack", window.id))?;

        let event = ClientMessageEvent {
            response_type: CLIENT_MESSAGE_EVENT,
            format: 32,
            sequence: 0,
            window: window.id,
            type_: self.atoms.net_active_window,
            data: ClientMessageData::from([
                x11::ACTIVE_WINDOW_SOURCE_PAGER,
                x11rb::CURRENT_TIME,
                0,
                0,
                0,
            ]),
        };

        self.conn
            .send_event(
                false,
                self.root,
                EventMask::SUBSTRUCTURE_NOTIFY | EventMask::SUBSTRUCTURE_REDIRECT,
                event,
            )
            .context(format!("Failed to send _NET_ACTIVE_WINDOW event for window {}", window.id))?;

        self.flush()
    }

    fn move_pointer(&mut self, at: Point) -> Result<()> {
        self.fake(MOTION_NOTIFY_EVENT, 0, Some(at))?;
        self.flush()
    }

    fn click(&mut self, at: Point) -> Result<()> {
        self.fake(MOTION_NOTIFY_EVENT, 0, Some(at))?;
        self.fake(BUTTON_PRESS_EVENT, x11::BUTTON_LEFT, Some(at))?;
        self.fake(BUTTON_RELEASE_EVENT, x11::BUTTON_LEFT, Some(at))?;
        self.flush()
    }

    fn press_key(&mut self, key: Key) -> Result<()> {
        self.tap(key.keysym())?;
        self.flush()
    }

    fn paste(&mut self, text: &str) -> Result<()> {
        if self.clipboard.is_none() {
            self.clipboard = Some(arboard::Clipboard::new().context("Failed to open clipboard")?);
        }
        if let Some(clipboard) = self.clipboard.as_mut() {
            clipboard
                .set_text(text.to_string())
                .context("Failed to set clipboard text")?;
        }

        let ctrl = self.keymap.keycode(keysym::CONTROL_L)?;
        self.fake(KEY_PRESS_EVENT, ctrl, None)?;
        let pasted = self.tap(keysym::LOWER_V);
        // always release ctrl, even when 'v' could not be sent
        self.fake(KEY_RELEASE_EVENT, ctrl, None)?;
        pasted?;
        self.flush()
    }
}
