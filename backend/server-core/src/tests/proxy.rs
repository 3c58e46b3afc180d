// Unit tests for the proxy model and its binary record

use crate::error::proxy::ProxyConfigError;
use crate::proxy::codec::{encode, encoded_len};
use crate::proxy::{ProxyConfig, ProxyKind};

/// Read a big-endian u32 at `offset`.
fn be_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes(bytes[offset..offset + 4].try_into().unwrap())
}

/// **VALUE**: Verifies the record of the "no proxy" configuration.
///
/// **WHY THIS MATTERS**: The settings file reader expects tag 0 followed by empty strings;
/// a null-string marker here would corrupt every file written without a proxy.
///
/// **BUG THIS CATCHES**: Would catch empty strings written as 0xFFFFFFFF or a wrong tag.
#[test]
fn given_none_proxy_when_encoded_then_tag_is_zero_and_fields_are_empty() {
    // GIVEN: ProxyConfig{None, "", 0, "", ""}
    let proxy = ProxyConfig::none();

    // WHEN: Encoding
    let bytes = encode(&proxy);

    // THEN: tag 0, zero-length host, port 0, zero-length user and password
    assert_eq!(bytes.len(), 20);
    assert_eq!(i32::from_be_bytes(bytes[0..4].try_into().unwrap()), 0);
    assert_eq!(be_u32(&bytes, 4), 0, "host length");
    assert_eq!(be_u32(&bytes, 8), 0, "port");
    assert_eq!(be_u32(&bytes, 12), 0, "user length");
    assert_eq!(be_u32(&bytes, 16), 0, "password length");
}

/// **VALUE**: Verifies the full layout for a real proxy.
///
/// **WHY THIS MATTERS**: Field order and string encoding must match the settings stream
/// convention or the persisted proxy list becomes unreadable.
///
/// **BUG THIS CATCHES**: Would catch reordered fields, little-endian integers, or UTF-8
/// strings where UTF-16BE is expected.
#[test]
fn given_socks5_proxy_when_encoded_then_fields_follow_layout() {
    // GIVEN: A SOCKS5 proxy with credentials
    let proxy = ProxyConfig::new(ProxyKind::Socks5, "ab", 1080, "u", "p").unwrap();

    // WHEN: Encoding
    let bytes = encode(&proxy);

    // THEN: Every field sits where the layout says
    let parts: [&[u8]; 8] = [
        &1i32.to_be_bytes(),
        &4u32.to_be_bytes(),
        &[0, b'a', 0, b'b'],
        &1080i32.to_be_bytes(),
        &2u32.to_be_bytes(),
        &[0, b'u'],
        &2u32.to_be_bytes(),
        &[0, b'p'],
    ];
    let expected = parts.concat();
    assert_eq!(bytes, expected);
    assert_eq!(bytes.len(), encoded_len(&proxy));
}

/// **VALUE**: Verifies that the tag of every kind is stable and reversible.
///
/// **WHY THIS MATTERS**: Tags are persisted; renumbering would silently switch saved proxies
/// to a different protocol.
///
/// **BUG THIS CATCHES**: Would catch reordering of the enum or unknown tags being accepted.
#[test]
fn given_kind_tags_when_converted_back_then_unknown_tags_are_rejected() {
    for (kind, tag) in [
        (ProxyKind::None, 0),
        (ProxyKind::Socks5, 1),
        (ProxyKind::Http, 2),
        (ProxyKind::MtProto, 3),
    ] {
        assert_eq!(kind.tag(), tag);
        assert_eq!(ProxyKind::try_from(tag).unwrap(), kind);
    }

    for tag in [-1, 4, i32::MAX] {
        assert!(matches!(
            ProxyKind::try_from(tag),
            Err(ProxyConfigError::UnknownKind { tag: t, .. }) if t == tag
        ));
    }
}

/// **VALUE**: Verifies the proxy invariants enforced at construction.
///
/// **WHY THIS MATTERS**: The settings store must never receive a real proxy without a host
/// or with an unusable port.
///
/// **BUG THIS CATCHES**: Would catch validation that lets port 0, 65536 or an empty host through.
#[test]
fn given_invalid_fields_when_constructing_proxy_then_returns_error() {
    assert!(matches!(
        ProxyConfig::new(ProxyKind::Http, "", 8080, "", ""),
        Err(ProxyConfigError::EmptyHost { .. })
    ));
    for port in [0, -1, 65536] {
        assert!(matches!(
            ProxyConfig::new(ProxyKind::Socks5, "h", port, "", ""),
            Err(ProxyConfigError::InvalidPort { .. })
        ));
    }
    assert!(ProxyConfig::new(ProxyKind::Http, "h", 65535, "", "").is_ok());
    assert!(ProxyConfig::new(ProxyKind::None, "", 0, "", "").is_ok());
}

/// **VALUE**: Verifies that the "no proxy" kind keeps the port it was given.
///
/// **WHY THIS MATTERS**: A persisted record of kind none is read back through the same
/// constructor; a port that cannot be stored must not come back as a different value.
///
/// **BUG THIS CATCHES**: Would catch out-of-range ports silently rewritten to 0 instead of
/// being rejected.
#[test]
fn given_none_kind_when_port_is_out_of_range_then_rejected_otherwise_kept() {
    for port in [-1, 65536, i64::MAX] {
        assert!(
            matches!(
                ProxyConfig::new(ProxyKind::None, "", port, "", ""),
                Err(ProxyConfigError::InvalidPort { .. })
            ),
            "port {port}"
        );
    }

    let kept = ProxyConfig::new(ProxyKind::None, "leftover", 8080, "", "").unwrap();
    assert_eq!(kept.port(), 8080);
    assert_eq!(kept.host(), "leftover");
    assert_eq!(ProxyConfig::new(ProxyKind::None, "", 0, "", "").unwrap(), ProxyConfig::none());
}

/// **VALUE**: Verifies protocol mapping for `set_proxy`.
///
/// **WHY THIS MATTERS**: Only "socks5" selects SOCKS5; every other value means HTTP.
///
/// **BUG THIS CATCHES**: Would catch case-insensitive matching or "mtproto" slipping through.
#[test]
fn given_protocol_strings_when_mapped_then_only_socks5_is_socks5() {
    assert_eq!(ProxyKind::from_protocol(Some("socks5")), ProxyKind::Socks5);
    assert_eq!(ProxyKind::from_protocol(Some("http")), ProxyKind::Http);
    assert_eq!(ProxyKind::from_protocol(Some("SOCKS5")), ProxyKind::Http);
    assert_eq!(ProxyKind::from_protocol(Some("mtproto")), ProxyKind::Http);
    assert_eq!(ProxyKind::from_protocol(None), ProxyKind::Http);
}

/// **VALUE**: Verifies that a proxy's password never reaches log output.
///
/// **WHY THIS MATTERS**: The dispatcher logs every applied proxy.
///
/// **BUG THIS CATCHES**: Would catch Display or Debug printing the password.
#[test]
fn given_proxy_with_password_when_formatted_then_password_is_hidden() {
    let proxy = ProxyConfig::new(ProxyKind::Socks5, "proxy.example", 1080, "u", "s3cret").unwrap();

    let display = proxy.to_string();
    let debug = format!("{proxy:?}");

    assert_eq!(display, "socks5://proxy.example:1080 (user u)");
    assert!(!debug.contains("s3cret"));
}
