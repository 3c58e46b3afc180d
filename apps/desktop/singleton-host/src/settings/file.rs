//! `proxy.settings`: the host's persisted proxy settings.
//!
//! Layout, all integers big-endian:
//!
//! | field          | encoding                                       |
//! |----------------|------------------------------------------------|
//! | version        | `u32`, [`SETTINGS_VERSION`]                    |
//! | stream version | `i32`, [`STREAM_VERSION`]                      |
//! | mode           | `i32` [`ProxyMode`] tag                        |
//! | calls          | `i32`, 1 when calls go through the proxy       |
//! | list           | `u32` count, then one blob per proxy           |
//! | selected       | blob, zero length when nothing is selected     |
//!
//! A blob is a `u32` byte length followed by one proxy record as written by
//! [`server_core::proxy::codec::encode`].

use crate::settings::{ProxyMode, ProxySettings};

use server_core::error::settings::SettingsError;
use server_core::proxy::codec::{STREAM_VERSION, encode, put_blob, put_i32, put_u32};
use server_core::proxy::{ProxyConfig, ProxyKind};

use common::ErrorLocation;

use std::io::ErrorKind;
use std::panic::Location;
use std::path::Path;

use log::{debug, info};

pub const SETTINGS_FILE_NAME: &str = "proxy.settings";
pub const SETTINGS_VERSION: u32 = 1;

/// Serialize `settings` to the file layout.
pub fn encode_settings(settings: &ProxySettings) -> Vec<u8> {
    let mut buffer = Vec::new();
    put_u32(&mut buffer, SETTINGS_VERSION);
    put_i32(&mut buffer, STREAM_VERSION);
    put_i32(&mut buffer, settings.mode.tag());
    put_i32(&mut buffer, i32::from(settings.use_proxy_for_calls));

    put_u32(&mut buffer, settings.list.len() as u32);
    for proxy in &settings.list {
        put_blob(&mut buffer, &encode(proxy));
    }

    match &settings.selected {
        Some(proxy) => put_blob(&mut buffer, &encode(proxy)),
        None => put_blob(&mut buffer, &[]),
    }
    buffer
}

/// Parse the file layout.
///
/// # Errors
///
/// Returns [`SettingsError::Format`] on truncation, trailing bytes, an
/// unsupported version, or a proxy record that does not decode.
pub fn decode_settings(bytes: &[u8]) -> Result<ProxySettings, SettingsError> {
    let mut reader = Reader::new(bytes);

    let version = reader.u32()?;
    if version == 0 || version > SETTINGS_VERSION {
        return Err(format_error(format!("Unsupported settings version {version}")));
    }
    let stream_version = reader.i32()?;
    if stream_version != STREAM_VERSION {
        return Err(format_error(format!(
            "Unsupported stream version {stream_version}"
        )));
    }

    let mode = ProxyMode::from_tag(reader.i32()?)?;
    let use_proxy_for_calls = reader.i32()? != 0;

    let count = reader.u32()?;
    let mut list = Vec::new();
    for _ in 0..count {
        list.push(decode_proxy(reader.blob()?)?);
    }

    let selected = match reader.blob()? {
        [] => None,
        record => Some(decode_proxy(record)?),
    };

    if !reader.is_done() {
        return Err(format_error(format!(
            "{} trailing bytes",
            bytes.len() - reader.offset
        )));
    }

    Ok(ProxySettings {
        list,
        selected,
        mode,
        use_proxy_for_calls,
    })
}

/// Load `proxy.settings` from `dir`; a missing file yields empty settings.
pub fn load(dir: &Path) -> Result<ProxySettings, SettingsError> {
    let path = dir.join(SETTINGS_FILE_NAME);

    let bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!("No proxy settings at {}, starting empty", path.display());
            return Ok(ProxySettings::default());
        }
        Err(e) => {
            return Err(SettingsError::Read {
                location: ErrorLocation::from(Location::caller()),
                path,
                source: e,
            });
        }
    };

    let settings = decode_settings(&bytes)?;
    info!(
        "Loaded {} prox{} from {}",
        settings.list.len(),
        if settings.list.len() == 1 { "y" } else { "ies" },
        path.display()
    );
    Ok(settings)
}

/// Write `proxy.settings` into `dir` via temp file + rename.
pub fn save(dir: &Path, settings: &ProxySettings) -> Result<(), SettingsError> {
    let persist_error = |path: &Path, source| SettingsError::Persist {
        location: ErrorLocation::from(Location::caller()),
        path: path.to_path_buf(),
        source,
    };

    std::fs::create_dir_all(dir).map_err(|e| persist_error(dir, e))?;

    let path = dir.join(SETTINGS_FILE_NAME);
    let temp_path = dir.join(format!("{SETTINGS_FILE_NAME}.tmp"));

    std::fs::write(&temp_path, encode_settings(settings)).map_err(|e| persist_error(&temp_path, e))?;
    std::fs::rename(&temp_path, &path).map_err(|e| persist_error(&path, e))?;

    debug!("Proxy settings saved to {}", path.display());
    Ok(())
}

fn decode_proxy(record: &[u8]) -> Result<ProxyConfig, SettingsError> {
    let mut reader = Reader::new(record);

    let kind = ProxyKind::try_from(reader.i32()?).map_err(|e| format_error(e.to_string()))?;
    let host = reader.string()?;
    let port = reader.i32()?;
    let user = reader.string()?;
    let password = reader.string()?;

    if !reader.is_done() {
        return Err(format_error("Proxy record has trailing bytes".to_string()));
    }

    ProxyConfig::new(kind, host, i64::from(port), user, password)
        .map_err(|e| format_error(e.to_string()))
}

#[track_caller]
fn format_error(message: String) -> SettingsError {
    SettingsError::Format {
        message,
        location: ErrorLocation::from(Location::caller()),
    }
}

/// Big-endian cursor over a settings buffer.
struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn is_done(&self) -> bool {
        self.offset == self.bytes.len()
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], SettingsError> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| {
                format_error(format!(
                    "Truncated: wanted {len} bytes at offset {} of {}",
                    self.offset,
                    self.bytes.len()
                ))
            })?;
        let slice = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], SettingsError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u32(&mut self) -> Result<u32, SettingsError> {
        self.array().map(u32::from_be_bytes)
    }

    fn i32(&mut self) -> Result<i32, SettingsError> {
        self.array().map(i32::from_be_bytes)
    }

    fn blob(&mut self) -> Result<&'a [u8], SettingsError> {
        let len = self.u32()? as usize;
        self.take(len)
    }

    /// UTF-16BE string with a `u32` byte length.
    fn string(&mut self) -> Result<String, SettingsError> {
        let bytes = self.blob()?;
        if bytes.len() % 2 != 0 {
            return Err(format_error(format!("Odd string length {}", bytes.len())));
        }

        let units = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
        char::decode_utf16(units)
            .collect::<Result<String, _>>()
            .map_err(|e| format_error(format!("Invalid UTF-16 string: {e}")))
    }
}
