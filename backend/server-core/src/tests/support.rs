// In-memory settings collaborator shared by the unit tests.

use crate::error::settings::SettingsError;
use crate::proxy::ProxyConfig;
use crate::settings::ProxySettingsStore;

use common::ErrorLocation;

use std::panic::Location;
use std::sync::Mutex;

#[derive(Debug, Default, Clone)]
pub(crate) struct FakeSettings {
    pub(crate) list: Vec<ProxyConfig>,
    pub(crate) selected: Option<ProxyConfig>,
    pub(crate) enabled: bool,
    pub(crate) use_proxy_for_calls: bool,
}

/// Records every applied proxy and mirrors what a real store does with it.
#[derive(Default)]
pub(crate) struct RecordingStore {
    settings: Mutex<FakeSettings>,
    reject: bool,
}

impl RecordingStore {
    pub(crate) fn rejecting() -> Self {
        Self {
            settings: Mutex::default(),
            reject: true,
        }
    }

    pub(crate) fn snapshot(&self) -> FakeSettings {
        self.settings.lock().unwrap().clone()
    }
}

impl ProxySettingsStore for RecordingStore {
    async fn apply_proxy(&self, proxy: ProxyConfig) -> Result<(), SettingsError> {
        if self.reject {
            return Err(SettingsError::Apply {
                message: "store is read-only".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let mut settings = self.settings.lock().unwrap();
        settings.list.push(proxy.clone());
        settings.selected = Some(proxy);
        settings.enabled = true;
        settings.use_proxy_for_calls = true;
        Ok(())
    }
}
