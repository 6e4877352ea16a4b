//! User preferences for the note panel: the show/hide hotkey and the folder
//! opened at startup.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Key names that only act as modifiers and never form a hotkey on their own.
const MODIFIER_KEYS: [&str; 5] = ["Control", "Alt", "Shift", "Meta", "Command"];

/// Persisted application configuration.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    /// Folder listed when the panel starts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_folder: Option<PathBuf>,
    /// Global hotkey that toggles the panel.
    #[serde(default)]
    pub hotkey: Hotkey,
}

impl AppConfig {
    /// Returns the configured default folder, ignoring an empty value.
    pub fn default_folder(&self) -> Option<&Path> {
        self.default_folder
            .as_deref()
            .filter(|folder| !folder.as_os_str().is_empty())
    }

    /// Returns a copy of this configuration with `update` applied.
    ///
    /// Hotkey modifiers are merged one by one, so an update that only
    /// mentions `shift` keeps the other modifier flags.
    #[must_use]
    pub fn merged(&self, update: ConfigUpdate) -> Self {
        let mut config = self.clone();

        if let Some(hotkey) = update.hotkey {
            if let Some(key) = hotkey.key {
                config.hotkey.key = key;
            }
            let modifiers = &mut config.hotkey.modifiers;
            modifiers.ctrl = hotkey.modifiers.ctrl.unwrap_or(modifiers.ctrl);
            modifiers.alt = hotkey.modifiers.alt.unwrap_or(modifiers.alt);
            modifiers.shift = hotkey.modifiers.shift.unwrap_or(modifiers.shift);
            modifiers.meta = hotkey.modifiers.meta.unwrap_or(modifiers.meta);
        }
        if let Some(default_folder) = update.default_folder {
            config.default_folder = Some(default_folder);
        }

        config
    }
}

/// Key plus modifier combination that toggles the panel.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Hotkey {
    pub key: String,
    #[serde(default)]
    pub modifiers: HotkeyModifiers,
}

impl Default for Hotkey {
    fn default() -> Self {
        Self {
            key: "Q".to_string(),
            modifiers: HotkeyModifiers {
                ctrl: true,
                ..HotkeyModifiers::default()
            },
        }
    }
}

impl Hotkey {
    /// Builds a hotkey from one recorded key press.
    ///
    /// Returns `None` for modifier-only presses. Single character keys are
    /// upper-cased so `q` and `Q` record the same hotkey.
    pub fn from_key_press(key: &str, modifiers: HotkeyModifiers) -> Option<Self> {
        if key.is_empty() || MODIFIER_KEYS.contains(&key) {
            return None;
        }

        let mut characters = key.chars();
        let key = match (characters.next(), characters.next()) {
            (Some(character), None) => character.to_uppercase().collect(),
            _ => key.to_string(),
        };

        Some(Self { key, modifiers })
    }

    /// Parses an accelerator string such as `Control+Shift+N`.
    ///
    /// The last `+` separated part is the key; unknown modifier names are
    /// ignored. Returns `None` when the key is missing or is a modifier.
    pub fn parse_accelerator(accelerator: &str) -> Option<Self> {
        let mut parts: Vec<&str> = accelerator.split('+').map(str::trim).collect();
        let key = parts.pop().unwrap_or_default();
        let modifiers = HotkeyModifiers {
            ctrl: parts.contains(&"Control"),
            alt: parts.contains(&"Alt"),
            shift: parts.contains(&"Shift"),
            meta: parts.contains(&"Meta"),
        };

        Self::from_key_press(key, modifiers)
    }

    /// Formats the hotkey as an accelerator string, modifiers first.
    pub fn to_accelerator(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if self.modifiers.ctrl {
            parts.push("Control");
        }
        if self.modifiers.alt {
            parts.push("Alt");
        }
        if self.modifiers.shift {
            parts.push("Shift");
        }
        if self.modifiers.meta {
            parts.push("Meta");
        }
        parts.push(&self.key);

        parts.join("+")
    }
}

/// Modifier flags of a [`Hotkey`].
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct HotkeyModifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

/// Partial configuration update; `None` fields keep their current value.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ConfigUpdate {
    pub default_folder: Option<PathBuf>,
    pub hotkey: Option<HotkeyUpdate>,
}

/// Partial hotkey update.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct HotkeyUpdate {
    pub key: Option<String>,
    pub modifiers: ModifiersUpdate,
}

impl From<Hotkey> for HotkeyUpdate {
    fn from(hotkey: Hotkey) -> Self {
        Self {
            key: Some(hotkey.key),
            modifiers: ModifiersUpdate {
                ctrl: Some(hotkey.modifiers.ctrl),
                alt: Some(hotkey.modifiers.alt),
                shift: Some(hotkey.modifiers.shift),
                meta: Some(hotkey.modifiers.meta),
            },
        }
    }
}

/// Partial modifier update.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ModifiersUpdate {
    pub ctrl: Option<bool>,
    pub alt: Option<bool>,
    pub shift: Option<bool>,
    pub meta: Option<bool>,
}
