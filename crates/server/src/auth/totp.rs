//! RFC 6238 time-based one-time passwords for authenticator apps.

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

const STEP_SECONDS: u64 = 30;
const DIGITS: u32 = 6;
/// Accept codes one step before or after the current one.
const WINDOW: i64 = 1;
const SECRET_BYTES: usize = 20;

const BASE32_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Unpadded RFC 4648 base32.
pub fn base32_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity((bytes.len() * 8).div_ceil(5));
    let mut buffer: u32 = 0;
    let mut bits = 0;
    for &b in bytes {
        buffer = (buffer << 8) | u32::from(b);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(BASE32_ALPHABET[((buffer >> bits) & 0x1f) as usize] as char);
        }
    }
    if bits > 0 {
        out.push(BASE32_ALPHABET[((buffer << (5 - bits)) & 0x1f) as usize] as char);
    }
    out
}

/// Decode base32, ignoring case, spaces and padding. Returns `None` on bad input.
pub fn base32_decode(input: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(input.len() * 5 / 8);
    let mut buffer: u32 = 0;
    let mut bits = 0;
    for c in input.chars().filter(|c| !c.is_whitespace() && *c != '=') {
        let upper = c.to_ascii_uppercase() as u8;
        let val = BASE32_ALPHABET.iter().position(|&a| a == upper)? as u32;
        buffer = (buffer << 5) | val;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push(((buffer >> bits) & 0xff) as u8);
        }
    }
    Some(out)
}

/// Fresh 160-bit secret, base32 encoded.
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    base32_encode(&bytes)
}

fn hotp(key: &[u8], counter: u64) -> Option<u32> {
    let mut mac = HmacSha1::new_from_slice(key).ok()?;
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();
    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = (u32::from(digest[offset]) & 0x7f) << 24
        | u32::from(digest[offset + 1]) << 16
        | u32::from(digest[offset + 2]) << 8
        | u32::from(digest[offset + 3]);
    Some(binary % 10u32.pow(DIGITS))
}

/// The code for `unix_time`, zero-padded.
pub fn code_at(secret_b32: &str, unix_time: u64) -> Option<String> {
    let key = base32_decode(secret_b32)?;
    hotp(&key, unix_time / STEP_SECONDS).map(|c| format!("{:0width$}", c, width = DIGITS as usize))
}

/// Check `code` against the secret at `unix_time` with a ±1 step window.
pub fn verify_at(secret_b32: &str, code: &str, unix_time: u64) -> bool {
    let code = code.trim();
    if code.len() != DIGITS as usize || !code.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    let Some(key) = base32_decode(secret_b32) else {
        return false;
    };
    let counter = (unix_time / STEP_SECONDS) as i64;
    (-WINDOW..=WINDOW).any(|delta| {
        let c = counter + delta;
        c >= 0
            && hotp(&key, c as u64)
                .map(|v| format!("{:0width$}", v, width = DIGITS as usize) == code)
                .unwrap_or(false)
    })
}

pub fn verify(secret_b32: &str, code: &str) -> bool {
    let now = chrono::Utc::now().timestamp().max(0) as u64;
    verify_at(secret_b32, code, now)
}

/// Provisioning URI understood by authenticator apps.
pub fn otpauth_url(issuer: &str, account: &str, secret_b32: &str) -> String {
    let issuer_enc = encode_component(issuer);
    format!(
        "otpauth://totp/{}:{}?secret={}&issuer={}",
        issuer_enc,
        encode_component(account),
        secret_b32,
        issuer_enc
    )
}

fn encode_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'@' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 6238 appendix B seed for SHA-1.
    const RFC_SECRET: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

    #[test]
    fn base32_matches_rfc_seed() {
        assert_eq!(base32_encode(b"12345678901234567890"), RFC_SECRET);
        assert_eq!(base32_decode(RFC_SECRET).unwrap(), b"12345678901234567890");
    }

    #[test]
    fn base32_rejects_bad_chars() {
        assert!(base32_decode("ABC1").is_none());
        assert_eq!(base32_decode("gezd gnbv").unwrap(), base32_decode("GEZDGNBV").unwrap());
    }

    #[test]
    fn rfc_6238_vectors_truncated_to_six_digits() {
        assert_eq!(code_at(RFC_SECRET, 59).unwrap(), "287082");
        assert_eq!(code_at(RFC_SECRET, 1111111109).unwrap(), "081804");
        assert_eq!(code_at(RFC_SECRET, 1234567890).unwrap(), "005924");
    }

    #[test]
    fn window_accepts_adjacent_steps() {
        let code = code_at(RFC_SECRET, 1111111109).unwrap();
        assert!(verify_at(RFC_SECRET, &code, 1111111109));
        assert!(verify_at(RFC_SECRET, &code, 1111111109 + 30));
        assert!(verify_at(RFC_SECRET, &code, 1111111109 - 30));
        assert!(!verify_at(RFC_SECRET, &code, 1111111109 + 90));
    }

    #[test]
    fn malformed_codes_fail() {
        assert!(!verify_at(RFC_SECRET, "12345", 59));
        assert!(!verify_at(RFC_SECRET, "abcdef", 59));
        assert!(!verify_at("!!!", "287082", 59));
    }

    #[test]
    fn generated_secret_is_32_chars() {
        let s = generate_secret();
        assert_eq!(s.len(), 32);
        assert!(base32_decode(&s).is_some());
    }

    #[test]
    fn otpauth_url_escapes_issuer() {
        let url = otpauth_url("ELSY Legal", "a@b.com", "ABC");
        assert_eq!(
            url,
            "otpauth://totp/ELSY%20Legal:a@b.com?secret=ABC&issuer=ELSY%20Legal"
        );
    }
}
