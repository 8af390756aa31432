use anyhow::{Context, Result};
use evdev::{Device, EventType, InputEventKind, Key};
use std::sync::mpsc::Sender;
use std::thread;
use tracing::{debug, error, info, warn};

use crate::batch::MacroCommand;
use crate::constants::{exit, input, paths, permissions};

/// Global trigger keys
fn command_for(key: Key) -> Option<MacroCommand> {
    match key {
        Key::KEY_F9 => Some(MacroCommand::Start),
        Key::KEY_F10 => Some(MacroCommand::Pause),
        Key::KEY_F11 => Some(MacroCommand::Stop),
        _ => None,
    }
}

/// Find all keyboard devices that have the trigger keys
fn find_all_keyboard_devices() -> Result<Vec<Device>> {
    info!(path = %paths::DEV_INPUT, "Scanning for keyboard devices...");

    let mut devices = Vec::new();

    for entry in std::fs::read_dir(paths::DEV_INPUT).context(format!(
        "Failed to read {} - are you in the '{}' group?",
        paths::DEV_INPUT,
        permissions::INPUT_GROUP
    ))? {
        let path = entry?.path();

        if let Ok(device) = Device::open(&path)
            && let Some(keys) = device.supported_keys()
            && keys.contains(Key::KEY_F9)
            && keys.contains(Key::KEY_F11)
        {
            info!(device_path = %path.display(), name = ?device.name(), "Found keyboard device");
            devices.push(device);
        }
    }

    if devices.is_empty() {
        anyhow::bail!(
            "No keyboard device found. Ensure you're in '{}' group:\n\
             {}\n\
             Then log out and back in.",
            permissions::INPUT_GROUP,
            permissions::ADD_TO_INPUT_GROUP
        )
    }

    info!(count = devices.len(), "Listening on keyboard device(s)");

    Ok(devices)
}

/// Spawn one listener thread per keyboard: F9 start/resume, F10 pause, F11 stop
pub fn spawn_listener(sender: Sender<MacroCommand>) -> Result<Vec<thread::JoinHandle<()>>> {
    let devices = find_all_keyboard_devices()?;
    let mut handles = Vec::new();

    for device in devices {
        let sender = sender.clone();
        let handle = thread::spawn(move || {
            info!(device = ?device.name(), "Hotkey listener started");
            if let Err(e) = listen_for_hotkeys(device, sender) {
                // a closed channel just means the batch is over
                debug!(error = %e, "Hotkey listener stopped");
            }
        });
        handles.push(handle);
    }

    Ok(handles)
}

fn listen_for_hotkeys(mut device: Device, sender: Sender<MacroCommand>) -> Result<()> {
    loop {
        let events = device.fetch_events().context("Failed to fetch events")?;

        for event in events {
            if event.event_type() != EventType::KEY || event.value() != input::KEY_PRESS {
                continue;
            }
            if let InputEventKind::Key(key) = event.kind()
                && let Some(command) = command_for(key)
            {
                info!(key = ?key, command = ?command, "Hotkey pressed, sending command");
                sender.send(command).context("Failed to send macro command")?;
            }
        }
    }
}

/// Check if hotkeys are available (user has input group permissions)
pub fn check_permissions() -> bool {
    std::fs::read_dir(paths::DEV_INPUT).is_ok()
}

/// Print helpful error message if permissions missing
pub fn print_permission_error() {
    error!(path = %paths::DEV_INPUT, "Cannot access input devices");
    error!(group = %permissions::INPUT_GROUP, "Hotkeys require group membership");
    error!(command = %permissions::ADD_TO_INPUT_GROUP, "Add user to input group");
    error!("  Then log out and back in");
    warn!(continuing = true, "Continuing without hotkey support...");
}

/// SIGINT/SIGTERM request a stop at the next day boundary. A second signal
/// exits immediately, since the current day may take a long time.
#[cfg(unix)]
pub fn spawn_signal_listener(sender: Sender<MacroCommand>) -> Result<thread::JoinHandle<()>> {
    use signal_hook::consts::signal::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM]).context("Failed to register signal handlers")?;
    Ok(thread::spawn(move || {
        let mut pending = false;
        for signal in signals.forever() {
            if pending {
                warn!(signal, "Second termination signal, exiting now");
                std::process::exit(exit::INTERRUPTED);
            }
            warn!(signal, "Termination signal received, stopping after the current day");
            pending = true;
            if sender.send(MacroCommand::Stop).is_err() {
                std::process::exit(exit::INTERRUPTED);
            }
        }
    }))
}
