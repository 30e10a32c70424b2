//! Layered settings: compiled defaults, then `~/.wshub/settings.json`, then
//! `WSHUB_*` environment variables.
//!
//! The file layer is merged as JSON before deserializing, so a file only
//! needs the keys it changes. Nested objects merge key by key; any other
//! value (array, scalar) replaces the default outright, and `null` leaves
//! the default in place.

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::{HubSettings, LogFormat, LogLevel};

pub(crate) const PORTS: RangeInclusive<u16> = 1..=65535;
pub(crate) const MESSAGE_SIZES: RangeInclusive<usize> = 1024..=64 * 1024 * 1024;
pub(crate) const MONITOR_INTERVALS: RangeInclusive<u64> = 1..=3600;
pub(crate) const TOKEN_LIFETIMES: RangeInclusive<u64> = 1..=525_600;

/// `~/.wshub/settings.json`, falling back to `/tmp` without `HOME`.
pub fn settings_path() -> PathBuf {
    std::env::var_os("HOME")
        .map_or_else(|| PathBuf::from("/tmp"), PathBuf::from)
        .join(".wshub")
        .join("settings.json")
}

/// All three layers, reading the file at [`settings_path`].
pub fn load_settings() -> Result<HubSettings> {
    load_settings_from_path(&settings_path())
}

/// All three layers, reading the file at `path`. A missing file is not an
/// error; an unreadable or malformed one is.
pub fn load_settings_from_path(path: &Path) -> Result<HubSettings> {
    let mut settings = load_file_layer(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Defaults with the file at `path` merged in. Environment is not consulted.
pub fn load_file_layer(path: &Path) -> Result<HubSettings> {
    let mut merged = serde_json::to_value(HubSettings::default())?;

    match std::fs::read_to_string(path) {
        Ok(content) => {
            debug!(path = %path.display(), "merging settings file");
            let overlay: Value = serde_json::from_str(&content)?;
            merged = deep_merge(merged, overlay);
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no settings file, using defaults");
        }
        Err(source) => {
            return Err(SettingsError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    }

    Ok(serde_json::from_value(merged)?)
}

/// Merge `overlay` onto `base` following the rules in the module docs.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    let (mut base, overlay) = match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => (base, overlay),
        (_, overlay) => return overlay,
    };
    for (key, value) in overlay {
        if value.is_null() {
            continue;
        }
        let value = match base.remove(&key) {
            Some(existing) => deep_merge(existing, value),
            None => value,
        };
        let _ = base.insert(key, value);
    }
    Value::Object(base)
}

/// Apply `WSHUB_*` variables from the process environment.
pub fn apply_env_overrides(settings: &mut HubSettings) {
    apply_overrides_from(settings, |name| std::env::var(name).ok());
}

/// Apply `WSHUB_*` overrides looked up through `lookup`.
///
/// Empty values are treated as unset. Values that fail to parse or fall out
/// of range are logged and skipped, keeping the file or default value.
pub fn apply_overrides_from(settings: &mut HubSettings, lookup: impl Fn(&str) -> Option<String>) {
    let env = Env { lookup };
    let server = &mut settings.server;
    env.set_string("WSHUB_HOST", &mut server.host);
    env.set("WSHUB_PORT", &mut server.port, |v| parse_in_range(v, &PORTS));
    env.set("WSHUB_MAX_MESSAGE_SIZE", &mut server.max_message_size, |v| {
        parse_in_range(v, &MESSAGE_SIZES)
    });

    env.set("WSHUB_MONITOR_INTERVAL_SECS", &mut settings.monitor.interval_secs, |v| {
        parse_in_range(v, &MONITOR_INTERVALS)
    });
    env.set("WSHUB_PRUNE_EMPTY", &mut settings.registry.prune_empty, parse_bool);

    let token = &mut settings.token;
    env.set_string("WSHUB_TOKEN_ISSUER", &mut token.issuer);
    env.set_string("WSHUB_TOKEN_AUDIENCE", &mut token.audience);
    env.set_string("WSHUB_TOKEN_SECRET", &mut token.security_key);
    env.set("WSHUB_TOKEN_EXPIRATION_MINUTES", &mut token.expiration_minutes, |v| {
        parse_in_range(v, &TOKEN_LIFETIMES)
    });

    env.set("WSHUB_LOG_LEVEL", &mut settings.logging.level, parse_log_level);
    env.set("WSHUB_LOG_FORMAT", &mut settings.logging.format, parse_log_format);
}

struct Env<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Env<F> {
    fn get(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn set_string(&self, name: &str, slot: &mut String) {
        if let Some(v) = self.get(name) {
            *slot = v;
        }
    }

    fn set<T>(&self, name: &str, slot: &mut T, parse: impl Fn(&str) -> Option<T>) {
        let Some(raw) = self.get(name) else {
            return;
        };
        match parse(&raw) {
            Some(v) => *slot = v,
            None => warn!(key = name, value = %raw, "ignoring invalid environment override"),
        }
    }
}

/// `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`, any case.
pub fn parse_bool(val: &str) -> Option<bool> {
    let val = val.to_ascii_lowercase();
    match val.as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse `val` and accept it only inside `range`.
pub fn parse_in_range<T>(val: &str, range: &RangeInclusive<T>) -> Option<T>
where
    T: FromStr + PartialOrd,
{
    val.trim().parse().ok().filter(|n| range.contains(n))
}

/// Level name, any case.
pub fn parse_log_level(val: &str) -> Option<LogLevel> {
    serde_json::from_value(Value::String(val.to_ascii_lowercase())).ok()
}

/// `compact` or `json`, any case.
pub fn parse_log_format(val: &str) -> Option<LogFormat> {
    serde_json::from_value(Value::String(val.to_ascii_lowercase())).ok()
}
