//! Seam between the dispatcher and the application's settings store.

use crate::error::settings::SettingsError;
use crate::proxy::ProxyConfig;

use std::future::Future;

/// Settings-mutation collaborator injected into the server.
///
/// Implementations own the proxy list and its persistence. The server only
/// ever calls [`apply_proxy`](ProxySettingsStore::apply_proxy), from its
/// control task, one call at a time.
pub trait ProxySettingsStore: Send + Sync + 'static {
    /// Make `proxy` the active proxy.
    ///
    /// Appends it to the proxy list, selects it, enables proxying and proxied
    /// calls, activates it on the network layer and persists the settings.
    fn apply_proxy(
        &self,
        proxy: ProxyConfig,
    ) -> impl Future<Output = Result<(), SettingsError>> + Send;
}
