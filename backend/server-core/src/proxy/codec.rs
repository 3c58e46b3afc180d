//! Binary proxy record used inside the versioned settings file.
//!
//! Layout, all integers big-endian:
//!
//! | field    | encoding                          |
//! |----------|-----------------------------------|
//! | kind     | `i32` tag (see [`ProxyKind::tag`](crate::proxy::ProxyKind::tag)) |
//! | host     | `u32` byte length + UTF-16BE      |
//! | port     | `i32`                             |
//! | user     | `u32` byte length + UTF-16BE      |
//! | password | `u32` byte length + UTF-16BE      |
//!
//! Strings follow the settings stream convention of [`STREAM_VERSION`]; an
//! empty string is written with length zero. Decoding belongs to the settings
//! store that owns the file.

use crate::proxy::ProxyConfig;

/// Stream version the settings file declares for these records (`Qt_5_1`).
pub const STREAM_VERSION: i32 = 17;

/// Serialized size of a string field, including its length prefix.
pub fn string_size(value: &str) -> usize {
    size_of::<u32>() + value.encode_utf16().count() * size_of::<u16>()
}

/// Serialized size of `proxy`.
pub fn encoded_len(proxy: &ProxyConfig) -> usize {
    size_of::<i32>()
        + string_size(proxy.host())
        + size_of::<i32>()
        + string_size(proxy.user())
        + string_size(proxy.password().expose())
}

/// Encode `proxy` into its persisted record.
pub fn encode(proxy: &ProxyConfig) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(encoded_len(proxy));
    put_i32(&mut buffer, proxy.kind().tag());
    put_string(&mut buffer, proxy.host());
    put_i32(&mut buffer, i32::from(proxy.port()));
    put_string(&mut buffer, proxy.user());
    put_string(&mut buffer, proxy.password().expose());
    buffer
}

pub fn put_i32(buffer: &mut Vec<u8>, value: i32) {
    buffer.extend_from_slice(&value.to_be_bytes());
}

pub fn put_u32(buffer: &mut Vec<u8>, value: u32) {
    buffer.extend_from_slice(&value.to_be_bytes());
}

/// Length-prefixed UTF-16BE string.
pub fn put_string(buffer: &mut Vec<u8>, value: &str) {
    let units: Vec<u16> = value.encode_utf16().collect();
    // u32 byte length; settings strings are far below 2 GiB
    put_u32(buffer, (units.len() * size_of::<u16>()) as u32);
    for unit in units {
        buffer.extend_from_slice(&unit.to_be_bytes());
    }
}

/// Length-prefixed opaque blob (a nested record).
pub fn put_blob(buffer: &mut Vec<u8>, blob: &[u8]) {
    put_u32(buffer, blob.len() as u32);
    buffer.extend_from_slice(blob);
}
