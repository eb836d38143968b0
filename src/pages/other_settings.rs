//! Backup and location preferences.
//!
//! The toggles live on the page until the wizard finishes; `finalize`
//! writes them to the platform in one go.

use serde::{Deserialize, Serialize};

use crate::config::{SETTING_BACKUP_ENABLED, SETTING_LOCATION_PROVIDERS};
use crate::error::Result;
use crate::host::Platform;
use crate::page::{res, PageAction, PageBody, PageContext, PageHandler, PageInput, PageTitles, ToggleView};

pub const TOGGLE_BACKUP: &str = "backup";
/// Master switch for both location providers
pub const TOGGLE_LOCATION: &str = "location";
pub const TOGGLE_GPS: &str = "gps";
pub const TOGGLE_NETWORK: &str = "network";

const PROVIDER_GPS: &str = "gps";
const PROVIDER_NETWORK: &str = "network";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OtherSettings {
    pub backup: bool,
    pub gps: bool,
    pub network_location: bool,
}

impl Default for OtherSettings {
    fn default() -> Self {
        Self {
            backup: true,
            gps: false,
            network_location: false,
        }
    }
}

impl OtherSettings {
    /// Current platform values. Backup is on unless explicitly disabled.
    pub fn from_platform(platform: &dyn Platform) -> Self {
        let backup = platform
            .get_setting(SETTING_BACKUP_ENABLED)
            .map(|v| v.trim() != "0")
            .unwrap_or(true);
        let providers = platform
            .get_setting(SETTING_LOCATION_PROVIDERS)
            .unwrap_or_default();
        let has = |name: &str| providers.split(',').any(|p| p.trim() == name);

        Self {
            backup,
            gps: has(PROVIDER_GPS),
            network_location: has(PROVIDER_NETWORK),
        }
    }

    pub fn location_enabled(&self) -> bool {
        self.gps || self.network_location
    }

    /// Comma-separated enabled providers, as stored by the platform.
    pub fn providers(&self) -> String {
        let mut providers = Vec::new();
        if self.gps {
            providers.push(PROVIDER_GPS);
        }
        if self.network_location {
            providers.push(PROVIDER_NETWORK);
        }
        providers.join(",")
    }

    /// Flip one toggle. Individual providers only change while location
    /// access is on. Returns false for unknown or disabled toggles.
    pub fn set(&mut self, name: &str, enabled: bool) -> bool {
        match name {
            TOGGLE_BACKUP => self.backup = enabled,
            TOGGLE_LOCATION => {
                self.gps = enabled;
                self.network_location = enabled;
            }
            TOGGLE_GPS if self.location_enabled() => self.gps = enabled,
            TOGGLE_NETWORK if self.location_enabled() => self.network_location = enabled,
            _ => return false,
        }
        true
    }

    fn toggles(&self) -> Vec<ToggleView> {
        let location = self.location_enabled();
        vec![
            ToggleView {
                name: TOGGLE_BACKUP,
                label: res::BACKUP,
                checked: self.backup,
                enabled: true,
            },
            ToggleView {
                name: TOGGLE_LOCATION,
                label: res::LOCATION,
                checked: location,
                enabled: true,
            },
            ToggleView {
                name: TOGGLE_GPS,
                label: res::GPS,
                checked: self.gps,
                enabled: location,
            },
            ToggleView {
                name: TOGGLE_NETWORK,
                label: res::NETWORK_LOCATION,
                checked: self.network_location,
                enabled: location,
            },
        ]
    }
}

#[derive(Debug, Default)]
pub struct OtherSettingsPage {
    settings: OtherSettings,
}

impl OtherSettingsPage {
    pub fn new(settings: OtherSettings) -> Self {
        Self { settings }
    }

    pub fn from_platform(platform: &dyn Platform) -> Self {
        Self::new(OtherSettings::from_platform(platform))
    }

    pub fn settings(&self) -> OtherSettings {
        self.settings
    }
}

impl PageHandler for OtherSettingsPage {
    fn render(&self, _titles: &PageTitles, _action: PageAction) -> PageBody {
        PageBody::Toggles(self.settings.toggles())
    }

    fn on_input(&mut self, input: &PageInput, _ctx: &mut PageContext<'_>) -> bool {
        let PageInput::Toggle { name, enabled } = input;
        let changed = self.settings.set(name, *enabled);
        if changed {
            tracing::debug!("Toggle {} -> {}", name, enabled);
        } else {
            tracing::warn!("Toggle {} cannot be changed right now", name);
        }
        changed
    }

    fn save(&self) -> Option<serde_json::Value> {
        serde_json::to_value(self.settings).ok()
    }

    fn load(&mut self, extra: &serde_json::Value) -> Result<()> {
        self.settings = serde_json::from_value(extra.clone())?;
        Ok(())
    }

    fn finalize(&mut self, platform: &dyn Platform) -> Result<()> {
        tracing::info!(
            "Applying backup={} location providers=[{}]",
            self.settings.backup,
            self.settings.providers()
        );
        platform.put_setting(
            SETTING_BACKUP_ENABLED,
            if self.settings.backup { "1" } else { "0" },
        )?;
        platform.put_setting(SETTING_LOCATION_PROVIDERS, &self.settings.providers())?;
        Ok(())
    }
}
