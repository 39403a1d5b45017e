use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::RequestBuilder;
use sha2::Sha256;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

pub const ACCESS_KEY_HEADER: &str = "AccessKeyId";
pub const TIMESTAMP_HEADER: &str = "TimeStamp";
pub const SIGNATURE_HEADER: &str = "Signature";

/// UTC, second precision, literal `Z` suffix
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// API key pair. The encryption key never leaves the process.
#[derive(Clone)]
pub struct Credentials {
    pub access_key: String,
    encryption_key: String,
}

impl Credentials {
    pub fn new(access_key: impl Into<String>, encryption_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            encryption_key: encryption_key.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.access_key.is_empty() || self.encryption_key.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("encryption_key", &"<redacted>")
            .finish()
    }
}

/// Generate HMAC-SHA256 signature for Data Buffet requests
///
/// The MAC covers `access_key + timestamp` and is keyed by the encryption
/// key. Output is 64 uppercase hex characters.
///
/// ```
/// use databuffet_client::api::auth::sign;
///
/// let signature = sign("my-access-key", "my-encryption-key", "2024-01-01T00:00:00Z");
/// assert_eq!(signature.len(), 64);
/// assert_eq!(signature, signature.to_uppercase());
/// ```
pub fn sign(access_key: &str, encryption_key: &str, timestamp: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(encryption_key.as_bytes())
        .expect("HMAC can take key of any size");

    mac.update(access_key.as_bytes());
    mac.update(timestamp.as_bytes());

    hex::encode_upper(mac.finalize().into_bytes())
}

/// Current UTC time in the request timestamp format
pub fn current_timestamp() -> String {
    Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

/// The three authentication headers attached to every request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub access_key_id: String,
    pub timestamp: String,
    pub signature: String,
}

impl SignedHeaders {
    pub fn apply(self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(ACCESS_KEY_HEADER, self.access_key_id)
            .header(TIMESTAMP_HEADER, self.timestamp)
            .header(SIGNATURE_HEADER, self.signature)
    }
}

/// Sign with a freshly generated timestamp.
///
/// Headers are valid for a single request.
pub fn signed_headers(credentials: &Credentials) -> SignedHeaders {
    signed_headers_at(credentials, current_timestamp())
}

pub fn signed_headers_at(credentials: &Credentials, timestamp: String) -> SignedHeaders {
    let signature = sign(&credentials.access_key, &credentials.encryption_key, &timestamp);

    SignedHeaders {
        access_key_id: credentials.access_key.clone(),
        timestamp,
        signature,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use proptest::prelude::*;

    #[test]
    fn test_sign() {
        let signature = sign("access", "secret", "2024-01-01T00:00:00Z");

        // Signature should be 64 character hex string
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));

        // Same input should produce same signature
        assert_eq!(signature, sign("access", "secret", "2024-01-01T00:00:00Z"));
    }

    #[test]
    fn test_sign_known_vector() {
        // RFC 4231 test case 2: key "Jefe", data "what do ya want for nothing?"
        let signature = sign("what do ya want ", "Jefe", "for nothing?");
        assert_eq!(
            signature,
            "5BDCC146BF60754E6A042426089575C75A003F089D2739839DEC58B964EC3843"
        );
    }

    #[test]
    fn test_timestamp_format() {
        let ts = current_timestamp();
        assert_eq!(ts.len(), 20);
        assert!(ts.ends_with('Z'));
        assert!(NaiveDateTime::parse_from_str(&ts, TIMESTAMP_FORMAT).is_ok());
    }

    #[test]
    fn test_signed_headers() {
        let credentials = Credentials::new("access", "secret");
        let headers = signed_headers_at(&credentials, "2024-01-01T00:00:00Z".to_string());

        assert_eq!(headers.access_key_id, "access");
        assert_eq!(headers.timestamp, "2024-01-01T00:00:00Z");
        assert_eq!(headers.signature, sign("access", "secret", "2024-01-01T00:00:00Z"));
    }

    #[test]
    fn test_debug_redacts_encryption_key() {
        let credentials = Credentials::new("access", "super-secret");
        let debug = format!("{credentials:?}");
        assert!(debug.contains("access"));
        assert!(!debug.contains("super-secret"));
    }

    fn flip_byte(input: &str, index: usize) -> String {
        let mut bytes = input.as_bytes().to_vec();
        let i = index % bytes.len();
        bytes[i] = if bytes[i] == b'a' { b'b' } else { b'a' };
        String::from_utf8(bytes).unwrap()
    }

    proptest! {
        #[test]
        fn prop_signature_shape(
            access in "[A-Za-z0-9-]{0,40}",
            secret in "[A-Za-z0-9-]{0,40}",
            ts in "[0-9T:Z-]{0,24}",
        ) {
            let signature = sign(&access, &secret, &ts);
            prop_assert_eq!(signature.len(), 64);
            prop_assert!(signature.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
            prop_assert_eq!(&signature, &sign(&access, &secret, &ts));
        }

        #[test]
        fn prop_single_byte_change_alters_signature(
            access in "[A-Za-z0-9-]{1,40}",
            secret in "[A-Za-z0-9-]{1,40}",
            ts in "[0-9T:Z-]{1,24}",
            index in any::<usize>(),
        ) {
            let original = sign(&access, &secret, &ts);

            prop_assert_ne!(&original, &sign(&flip_byte(&access, index), &secret, &ts));
            prop_assert_ne!(&original, &sign(&access, &flip_byte(&secret, index), &ts));
            prop_assert_ne!(&original, &sign(&access, &secret, &flip_byte(&ts, index)));
        }
    }
}
