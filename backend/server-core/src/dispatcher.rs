//! Command dispatch for requests forwarded by secondary instances.
//!
//! Every error caused by peer input is absorbed here: unknown methods, empty
//! or invalid params and store failures are logged and dropped. Nothing is
//! written back to the client.

use crate::SET_PROXY_METHOD;
use crate::envelope::Request;
use crate::error::proxy::ProxyConfigError;
use crate::proxy::{ProxyConfig, ProxyKind};
use crate::settings::ProxySettingsStore;

use std::sync::Arc;

use log::{debug, error, info, warn};
use serde_json::{Map, Value};

/// What became of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The settings store accepted the change.
    Applied,
    /// The request was dropped without touching the settings store.
    Ignored(IgnoreReason),
    /// The settings store rejected the change.
    StoreFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Empty method: undecodable document or a document without `method`.
    EmptyMethod,
    UnknownMethod,
    /// `params` absent, not a mapping, or an empty mapping.
    EmptyParams,
    /// `params` present but the proxy they describe is invalid.
    InvalidParams,
}

/// Routes decoded requests to the settings store.
pub struct CommandDispatcher<S> {
    settings: Arc<S>,
}

impl<S: ProxySettingsStore> CommandDispatcher<S> {
    pub fn new(settings: Arc<S>) -> Self {
        Self { settings }
    }

    pub async fn dispatch(&self, request: &Request) -> DispatchOutcome {
        match request.method.as_str() {
            SET_PROXY_METHOD => self.set_proxy(&request.params).await,
            "" => {
                debug!("Dropping request without method");
                DispatchOutcome::Ignored(IgnoreReason::EmptyMethod)
            }
            other => {
                debug!("Dropping unknown method '{other}'");
                DispatchOutcome::Ignored(IgnoreReason::UnknownMethod)
            }
        }
    }

    async fn set_proxy(&self, params: &Value) -> DispatchOutcome {
        let proxy = match proxy_from_params(params) {
            Ok(Some(proxy)) => proxy,
            Ok(None) => {
                debug!("set_proxy without params, nothing to do");
                return DispatchOutcome::Ignored(IgnoreReason::EmptyParams);
            }
            Err(e) => {
                warn!("Rejected set_proxy params: {e}");
                return DispatchOutcome::Ignored(IgnoreReason::InvalidParams);
            }
        };

        info!("Applying proxy {proxy}");
        match self.settings.apply_proxy(proxy).await {
            Ok(()) => DispatchOutcome::Applied,
            Err(e) => {
                error!("Settings store failed to apply proxy: {e}");
                DispatchOutcome::StoreFailed
            }
        }
    }
}

/// Build a proxy from `set_proxy` params.
///
/// Returns `Ok(None)` when there is nothing to apply (params missing, not a
/// mapping, or empty). Missing strings read as empty, a missing or
/// non-integral port reads as 0.
pub(crate) fn proxy_from_params(params: &Value) -> Result<Option<ProxyConfig>, ProxyConfigError> {
    let Some(object) = params.as_object() else {
        return Ok(None);
    };
    if object.is_empty() {
        return Ok(None);
    }

    let kind = ProxyKind::from_protocol(object.get("protocol").and_then(Value::as_str));
    let port = object.get("port").map(port_value).unwrap_or(0);

    ProxyConfig::new(
        kind,
        text_value(object, "host"),
        port,
        text_value(object, "user"),
        text_value(object, "password"),
    )
    .map(Some)
}

fn text_value<'a>(object: &'a Map<String, Value>, key: &str) -> &'a str {
    object.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn port_value(value: &Value) -> i64 {
    if let Some(port) = value.as_i64() {
        return port;
    }
    match value.as_f64() {
        Some(port) if port.fract() == 0.0 => port as i64,
        _ => 0,
    }
}
