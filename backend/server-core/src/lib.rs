pub mod client;
pub mod config;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod proxy;
pub mod server;
pub mod settings;

#[cfg(test)]
mod tests;

/// Well-known channel name shared by primary and secondary instances.
pub const LOCAL_SERVER_NAME: &str = "telegram_local_server";

/// Command a secondary instance sends to hand over a proxy.
pub const SET_PROXY_METHOD: &str = "set_proxy";
/// Notification broadcast to every connected secondary instance.
pub const NEW_SERVICE_MESSAGE_METHOD: &str = "new_service_message";
