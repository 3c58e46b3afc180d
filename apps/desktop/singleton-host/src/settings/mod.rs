//! Proxy settings owned by the host.
//!
//! - `file`: versioned binary `proxy.settings` load/save
//! - `state`: actor serializing mutations; the server's settings store

pub mod file;
pub mod state;

use server_core::error::settings::SettingsError;
use server_core::proxy::ProxyConfig;

use common::ErrorLocation;

use std::panic::Location;

/// How connections pick a proxy. Tags are persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProxyMode {
    /// Follow the operating system's proxy settings.
    #[default]
    System,
    /// Use the selected proxy.
    Enabled,
    Disabled,
}

impl ProxyMode {
    pub const fn tag(self) -> i32 {
        match self {
            ProxyMode::System => 0,
            ProxyMode::Enabled => 1,
            ProxyMode::Disabled => 2,
        }
    }

    #[track_caller]
    pub fn from_tag(tag: i32) -> Result<Self, SettingsError> {
        match tag {
            0 => Ok(ProxyMode::System),
            1 => Ok(ProxyMode::Enabled),
            2 => Ok(ProxyMode::Disabled),
            _ => Err(SettingsError::Format {
                message: format!("Unknown proxy mode {tag}"),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }
}

/// Everything the host knows about proxies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxySettings {
    pub list: Vec<ProxyConfig>,
    pub selected: Option<ProxyConfig>,
    pub mode: ProxyMode,
    pub use_proxy_for_calls: bool,
}

impl ProxySettings {
    /// Append `proxy`, select it, and turn proxying on for everything.
    ///
    /// The list is not deduplicated; applying the same proxy twice lists it twice.
    pub fn apply(&mut self, proxy: ProxyConfig) {
        self.list.push(proxy.clone());
        self.selected = Some(proxy);
        self.mode = ProxyMode::Enabled;
        self.use_proxy_for_calls = true;
    }

    /// The proxy connections should use right now, if any.
    pub fn active(&self) -> Option<&ProxyConfig> {
        match self.mode {
            ProxyMode::Enabled => self.selected.as_ref(),
            ProxyMode::System | ProxyMode::Disabled => None,
        }
    }
}
