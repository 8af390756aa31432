//! Application-wide constants
//!
//! Keysyms, atom names, config locations and the built-in delay table live
//! here so the rest of the crate never spells a magic number twice.

/// X11 protocol constants
pub mod x11 {
    /// Source indication for _NET_ACTIVE_WINDOW (2 = pager/direct user action)
    pub const ACTIVE_WINDOW_SOURCE_PAGER: u32 = 2;

    /// Left mouse button number
    pub const BUTTON_LEFT: u8 = 1;

    /// Property length (in 32-bit units) read for window titles
    pub const TITLE_PROPERTY_LEN: u32 = 1024;
}

/// X11 keysym values (from X11/keysymdef.h)
pub mod keysym {
    pub const HOME: u32 = 0xff50;
    pub const UP: u32 = 0xff52;
    pub const DOWN: u32 = 0xff54;
    pub const PAGE_DOWN: u32 = 0xff56;
    pub const RETURN: u32 = 0xff0d;
    pub const CONTROL_L: u32 = 0xffe3;
    pub const LOWER_V: u32 = 0x0076;
}

/// Config file location
pub mod config {
    /// Directory under the XDG config dir
    pub const APP_DIR: &str = "autotestcrafter";

    /// Position registry file name
    pub const FILENAME: &str = "positions.json";

    /// Suffix for the copy kept when an unreadable config gets replaced
    pub const BACKUP_SUFFIX: &str = "bak";
}

/// Built-in registry defaults
pub mod defaults {
    pub const WINDOW_TITLE: &str = "Wordbook Maker";

    pub const PAGE_DOWN_SIZE: u64 = 18;

    /// Upper bound on window-count polls while waiting for a print to finish
    pub const PRINT_POLL_MAX_ATTEMPTS: u64 = 600;

    /// Named delays in seconds
    pub const DELAYS: &[(&str, f64)] = &[
        ("default", 0.5),
        ("click", 0.3),
        ("type", 0.3),
        ("key", 0.1),
        ("window_activate", 0.5),
        ("load_settle", 2.0),
        ("print_duration", 3.0),
        ("print_poll_interval", 0.5),
    ];

    /// Symbolic UI locations, offsets relative to the host window origin
    pub const UI_POSITIONS: &[(&str, &str, [i64; 2])] = &[
        ("day_list", "first_row", [120, 210]),
        ("day_list", "add_button", [330, 300]),
        ("selected_list", "first_row", [520, 210]),
        ("selected_list", "remove_button", [330, 350]),
        ("buttons", "load", [700, 120]),
        ("buttons", "print", [780, 120]),
        ("print_dialog", "output_path_field", [400, 60]),
        ("print_dialog", "filename_field", [400, 420]),
    ];
}

/// Registry paths the batch engine depends on
pub mod keys {
    pub const WINDOW_TITLE: &str = "window_title";
    pub const DEBUG: &str = "debug";
    pub const PAGE_DOWN_SIZE: &str = "page_down_size";
    pub const PRINT_POLL_MAX_ATTEMPTS: &str = "print_poll_max_attempts";
    pub const DELAYS: &str = "delays";
    pub const UI_POSITIONS: &str = "ui_positions";

    pub const DAY_LIST_FIRST_ROW: &str = "ui_positions.day_list.first_row";
    pub const DAY_LIST_ADD: &str = "ui_positions.day_list.add_button";
    pub const SELECTED_FIRST_ROW: &str = "ui_positions.selected_list.first_row";
    pub const SELECTED_REMOVE: &str = "ui_positions.selected_list.remove_button";
    pub const LOAD_BUTTON: &str = "ui_positions.buttons.load";
    pub const PRINT_BUTTON: &str = "ui_positions.buttons.print";
    pub const OUTPUT_PATH_FIELD: &str = "ui_positions.print_dialog.output_path_field";
    pub const FILENAME_FIELD: &str = "ui_positions.print_dialog.filename_field";
}

/// Named delays looked up through the registry
pub mod delays {
    pub const CLICK: &str = "click";
    pub const TYPE: &str = "type";
    pub const KEY: &str = "key";
    pub const WINDOW_ACTIVATE: &str = "window_activate";
    pub const LOAD_SETTLE: &str = "load_settle";
    pub const PRINT_DURATION: &str = "print_duration";
    pub const PRINT_POLL_INTERVAL: &str = "print_poll_interval";
}

/// Characters that may not appear in synthesized output file names
pub const FORBIDDEN_FILENAME_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// evdev key event values
pub mod input {
    pub const KEY_PRESS: i32 = 1;
}

/// Input device paths and permissions (global hotkeys)
pub mod paths {
    pub const DEV_INPUT: &str = "/dev/input";
}

pub mod permissions {
    pub const INPUT_GROUP: &str = "input";
    pub const ADD_TO_INPUT_GROUP: &str = "sudo usermod -aG input $USER";
}

/// Process exit codes
pub mod exit {
    /// Batch aborted on a failed step
    pub const ABORTED: i32 = 1;
    /// Second interrupt while a stop was already pending
    pub const INTERRUPTED: i32 = 130;
}
