//! SHA1 signature for QR-code login requests

use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use sha1::{Digest, Sha1};

const NONCE_RANDOM_DIGITS: usize = 16;

/// Sign a QR-code login request
///
/// The platform expects the lowercase hex SHA1 of
/// `appid={appid}&noncestr={nonce_str}&sdk_ticket={sdk_ticket}&timestamp={timestamp}`,
/// keys in this exact order and values unescaped.
pub fn create_signature(appid: &str, nonce_str: &str, sdk_ticket: &str, timestamp: &str) -> String {
    let origin = format!(
        "appid={}&noncestr={}&sdk_ticket={}&timestamp={}",
        appid, nonce_str, sdk_ticket, timestamp
    );
    hex::encode(Sha1::digest(origin.as_bytes()))
}

/// Nonce made of the hex unix time in seconds followed by 16 random hex digits
pub fn generate_nonce() -> String {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();

    let mut rng = rand::thread_rng();
    let random: String = (0..NONCE_RANDOM_DIGITS)
        .map(|_| {
            let digit: u32 = rng.gen_range(0..16);
            char::from_digit(digit, 16).unwrap_or('0')
        })
        .collect();

    format!("{seconds:x}{random}")
}

/// Milliseconds since the unix epoch, as the QR login timestamp
pub(crate) fn timestamp_millis() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_known_answer() {
        // sha1("appid=wx1234567890abcdef&noncestr=abc&sdk_ticket=tk&timestamp=1")
        let signature = create_signature("wx1234567890abcdef", "abc", "tk", "1");
        assert_eq!(signature, "9bf221f70da47d4b67ccfd9b733d6991c2f86014");
        assert_eq!(signature.len(), 40);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_signature_empty_fields() {
        // sha1("appid=&noncestr=&sdk_ticket=&timestamp=")
        assert_eq!(
            create_signature("", "", "", ""),
            "04ee01732c950c7af399629bf95fe6d84795bc6a"
        );
    }

    #[test]
    fn test_signature_depends_on_key_order() {
        // sha1 of the same pairs with sdk_ticket and noncestr swapped
        let reordered = hex::encode(Sha1::digest(
            b"appid=wx1234567890abcdef&sdk_ticket=tk&noncestr=abc&timestamp=1",
        ));
        assert_ne!(create_signature("wx1234567890abcdef", "abc", "tk", "1"), reordered);
    }

    #[test]
    fn test_sha1_reference_vector() {
        assert_eq!(
            hex::encode(Sha1::digest(b"abc")),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
    }

    #[test]
    fn test_signature_depends_on_every_field() {
        let base = create_signature("wx1234567890abcdef", "n", "t", "1");
        assert_ne!(base, create_signature("wx1234567890abcdeg", "n", "t", "1"));
        assert_ne!(base, create_signature("wx1234567890abcdef", "m", "t", "1"));
        assert_ne!(base, create_signature("wx1234567890abcdef", "n", "u", "1"));
        assert_ne!(base, create_signature("wx1234567890abcdef", "n", "t", "2"));
    }

    #[test]
    fn test_nonce_shape() {
        let nonce = generate_nonce();
        assert!(nonce.len() > NONCE_RANDOM_DIGITS);
        assert!(nonce.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_nonce_unique() {
        assert_ne!(generate_nonce(), generate_nonce());
    }

    #[test]
    fn test_timestamp_millis_is_numeric() {
        let ts = timestamp_millis();
        assert!(ts.parse::<u128>().unwrap() > 1_600_000_000_000);
    }
}
