//! Position registry
//!
//! Hierarchical key → coordinate/config store backing every automation step.
//! Loaded once at startup from a JSON file; when the file is missing or
//! unreadable the built-in tree is written out so later runs are reproducible.
//! Never mutated after load.

use anyhow::{Context, Result};
use serde_json::{json, Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::constants::{config, defaults, keys};
use crate::desktop::Point;
use crate::error::{MacroError, MacroResult};

/// Fallback when even `delays.default` is unusable
const LAST_RESORT_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct PositionRegistry {
    root: Value,
}

impl PositionRegistry {
    pub fn config_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(config::APP_DIR);
        path.push(config::FILENAME);
        path
    }

    pub fn from_value(root: Value) -> Self {
        Self { root }
    }

    /// Built-in default tree
    pub fn default_tree() -> Value {
        let delays: Map<String, Value> = defaults::DELAYS
            .iter()
            .map(|(name, secs)| (name.to_string(), json!(secs)))
            .collect();

        let mut positions = Map::new();
        for (group, leaf, [x, y]) in defaults::UI_POSITIONS {
            let entry = positions
                .entry(group.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(map) = entry {
                map.insert(leaf.to_string(), json!([x, y]));
            }
        }

        json!({
            (keys::WINDOW_TITLE): defaults::WINDOW_TITLE,
            (keys::DEBUG): false,
            (keys::DELAYS): delays,
            (keys::PAGE_DOWN_SIZE): defaults::PAGE_DOWN_SIZE,
            (keys::PRINT_POLL_MAX_ATTEMPTS): defaults::PRINT_POLL_MAX_ATTEMPTS,
            (keys::UI_POSITIONS): positions,
        })
    }

    /// Load from `path`, falling back to (and persisting) the defaults on any
    /// read or parse failure. Only a failure to persist the defaults is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let failure = match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<Value>(&contents) {
                Ok(root @ Value::Object(_)) => {
                    info!(path = %path.display(), "Loaded position registry");
                    return Ok(Self { root });
                }
                Ok(_) => Some("top level is not an object".to_string()),
                Err(e) => Some(e.to_string()),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => Some(e.to_string()),
        };

        if let Some(reason) = failure {
            error!(path = %path.display(), error = %reason, "Unreadable position registry, falling back to defaults");
            let backup = path.with_extension(format!("json.{}", config::BACKUP_SUFFIX));
            if let Err(e) = fs::rename(path, &backup) {
                warn!(path = %backup.display(), error = %e, "Could not keep a backup of the old registry");
            } else {
                info!(path = %backup.display(), "Kept old registry as backup");
            }
        } else {
            info!(path = %path.display(), "No position registry found, creating default");
        }

        let registry = Self {
            root: Self::default_tree(),
        };
        registry
            .save(path)
            .with_context(|| format!("Failed to persist default registry to {}", path.display()))?;
        Ok(registry)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {}", parent.display()))?;
        }
        let contents =
            serde_json::to_string_pretty(&self.root).context("Failed to serialize registry")?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write registry to {}", path.display()))?;
        info!(path = %path.display(), "Saved position registry");
        Ok(())
    }

    /// Resolve a dotted path. `null` counts as absent.
    pub fn get(&self, path: &str) -> MacroResult<&Value> {
        let missing = || MacroError::ConfigMissingKey {
            path: path.to_string(),
        };
        let mut node = &self.root;
        for segment in path.split('.') {
            node = node.as_object().and_then(|m| m.get(segment)).ok_or_else(missing)?;
        }
        if node.is_null() {
            return Err(missing());
        }
        Ok(node)
    }

    pub fn point(&self, path: &str) -> MacroResult<Point> {
        let shape = || MacroError::ConfigShape {
            path: path.to_string(),
            expected: "an [x, y] integer pair",
        };
        let pair = self.get(path)?.as_array().ok_or_else(shape)?;
        match pair.as_slice() {
            [x, y] => {
                let x = x.as_i64().and_then(|v| i32::try_from(v).ok()).ok_or_else(shape)?;
                let y = y.as_i64().and_then(|v| i32::try_from(v).ok()).ok_or_else(shape)?;
                Ok(Point::new(x, y))
            }
            _ => Err(shape()),
        }
    }

    pub fn string(&self, path: &str) -> MacroResult<&str> {
        self.get(path)?.as_str().ok_or_else(|| MacroError::ConfigShape {
            path: path.to_string(),
            expected: "a string",
        })
    }

    pub fn integer(&self, path: &str) -> MacroResult<u64> {
        self.get(path)?.as_u64().ok_or_else(|| MacroError::ConfigShape {
            path: path.to_string(),
            expected: "a non-negative integer",
        })
    }

    pub fn flag(&self, path: &str) -> MacroResult<bool> {
        self.get(path)?.as_bool().ok_or_else(|| MacroError::ConfigShape {
            path: path.to_string(),
            expected: "a boolean",
        })
    }

    pub fn window_title(&self) -> MacroResult<&str> {
        self.string(keys::WINDOW_TITLE)
    }

    /// Rows moved by one page-down press; zero is rejected
    pub fn page_size(&self) -> MacroResult<u32> {
        let size = self.integer(keys::PAGE_DOWN_SIZE)?;
        u32::try_from(size)
            .ok()
            .filter(|&s| s > 0)
            .ok_or_else(|| MacroError::ConfigShape {
                path: keys::PAGE_DOWN_SIZE.to_string(),
                expected: "a positive integer",
            })
    }

    /// Optional; absent or malformed means the built-in limit
    pub fn print_poll_max_attempts(&self) -> u32 {
        let fallback = defaults::PRINT_POLL_MAX_ATTEMPTS as u32;
        match self.integer(keys::PRINT_POLL_MAX_ATTEMPTS) {
            Ok(n) => u32::try_from(n).unwrap_or(u32::MAX),
            Err(MacroError::ConfigMissingKey { .. }) => fallback,
            Err(e) => {
                warn!(error = %e, fallback, "Unusable print poll limit, using built-in");
                fallback
            }
        }
    }

    /// `debug` is optional; absent means off
    pub fn debug(&self) -> bool {
        self.flag(keys::DEBUG).unwrap_or(false)
    }

    /// Named delay, falling back to `delays.default` when `name` is absent
    pub fn delay(&self, name: &str) -> Duration {
        let named = format!("{}.{name}", keys::DELAYS);
        let default = format!("{}.default", keys::DELAYS);
        self.seconds(&named)
            .or_else(|_| self.seconds(&default))
            .unwrap_or_else(|e| {
                warn!(delay = name, error = %e, "No usable delay configured, using built-in");
                LAST_RESORT_DELAY
            })
    }

    fn seconds(&self, path: &str) -> MacroResult<Duration> {
        self.get(path)?
            .as_f64()
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            // whole milliseconds, so 0.3 reads back as exactly 300ms
            .map(|secs| Duration::from_millis((secs * 1000.0).round() as u64))
            .ok_or_else(|| MacroError::ConfigShape {
                path: path.to_string(),
                expected: "a non-negative number of seconds",
            })
    }

    /// Every leaf in document order, as dotted paths. Arrays are leaves.
    pub fn leaf_paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        collect_leaves(&self.root, String::new(), &mut out);
        out
    }
}

fn collect_leaves(node: &Value, prefix: String, out: &mut Vec<String>) {
    match node {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                collect_leaves(child, path, out);
            }
        }
        _ if !prefix.is_empty() => out.push(prefix),
        _ => {}
    }
}
