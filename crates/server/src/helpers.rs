use std::future::Future;

use chrono::{Datelike, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use shared_types::AppError;

/// Random-number draws before giving up on a free case or invoice number.
pub const MAX_NUMBER_ATTEMPTS: usize = 100;

const PASSWORD_CHARSET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*";

fn four_random_digits() -> u32 {
    rand::thread_rng().gen_range(0..10_000)
}

/// Draw from `generate` until `taken` reports a free value, at most
/// [`MAX_NUMBER_ATTEMPTS`] times.
pub async fn first_free_number<F, Fut>(
    generate: impl Fn() -> String,
    mut taken: F,
) -> Result<String, AppError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<bool, AppError>>,
{
    for _ in 0..MAX_NUMBER_ATTEMPTS {
        let candidate = generate();
        if !taken(candidate.clone()).await? {
            return Ok(candidate);
        }
    }
    tracing::error!(attempts = MAX_NUMBER_ATTEMPTS, "No free number left in this year's range");
    Err(AppError::internal("Could not allocate a unique number"))
}

/// `CASE-{year}-{4 random digits}`. Callers retry until unique.
pub fn generate_case_number() -> String {
    format!("CASE-{}-{:04}", Utc::now().year(), four_random_digits())
}

/// `INV-{year}-{4 random digits}`. Callers retry until unique.
pub fn generate_invoice_number() -> String {
    format!("INV-{}-{:04}", Utc::now().year(), four_random_digits())
}

pub fn client_number_prefix(year: i32) -> String {
    format!("CL-{year}-")
}

pub fn client_number(year: i32, seq: i64) -> String {
    format!("CL-{year}-{seq:04}")
}

/// Last-resort client number derived from the millisecond clock.
pub fn fallback_client_number(year: i32, millis: i64) -> String {
    format!("CL-{year}-{:04}", millis.rem_euclid(10_000))
}

/// Normalize a UAE number to `+971…`.
pub fn format_phone_number(phone: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.starts_with("971") {
        format!("+{digits}")
    } else if let Some(rest) = digits.strip_prefix('0') {
        format!("+971{rest}")
    } else {
        format!("+971{digits}")
    }
}

pub fn generate_random_password() -> String {
    let mut rng = rand::thread_rng();
    (0..12)
        .map(|_| PASSWORD_CHARSET[rng.gen_range(0..PASSWORD_CHARSET.len())] as char)
        .collect()
}

pub fn generate_otp() -> String {
    rand::thread_rng().gen_range(100_000..1_000_000).to_string()
}

pub fn sha256_hex(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

/// Whitespace becomes `_`; anything outside `[A-Za-z0-9._-]` is dropped.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect()
}

/// Strip the separators people type into phone numbers.
pub fn normalize_phone_query(q: &str) -> String {
    q.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect()
}

/// Quote a CSV field when it contains a delimiter, quote or line break.
pub fn csv_escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn to_csv(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut out = headers.iter().map(|h| csv_escape(h)).collect::<Vec<_>>().join(",");
    out.push('\n');
    for row in rows {
        out.push_str(&row.iter().map(|v| csv_escape(v)).collect::<Vec<_>>().join(","));
        out.push('\n');
    }
    out
}

fn split_csv_records(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }
    records
        .into_iter()
        .filter(|r| r.iter().any(|f| !f.trim().is_empty()))
        .collect()
}

/// Parse CSV with a header row into one JSON object per data row.
/// Headers and values are trimmed; short rows get empty strings.
pub fn parse_csv(text: &str) -> Vec<serde_json::Map<String, serde_json::Value>> {
    let mut records = split_csv_records(text).into_iter();
    let Some(headers) = records.next() else {
        return Vec::new();
    };
    let headers: Vec<String> = headers.iter().map(|h| h.trim().to_string()).collect();
    records
        .map(|row| {
            headers
                .iter()
                .enumerate()
                .map(|(i, h)| {
                    let v = row.get(i).map(|v| v.trim().to_string()).unwrap_or_default();
                    (h.clone(), serde_json::Value::String(v))
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[tokio::test]
    async fn number_allocation_gives_up_when_range_is_full() {
        let draws = Cell::new(0);
        let result = first_free_number(
            || {
                draws.set(draws.get() + 1);
                generate_case_number()
            },
            |_| async { Ok(true) },
        )
        .await;
        assert!(result.is_err());
        assert_eq!(draws.get(), MAX_NUMBER_ATTEMPTS);
    }

    #[tokio::test]
    async fn number_allocation_skips_taken_values() {
        let mut seen = Vec::new();
        let number = first_free_number(generate_invoice_number, |candidate| {
            seen.push(candidate);
            let taken = seen.len() < 3;
            async move { Ok(taken) }
        })
        .await
        .unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen.last(), Some(&number));
    }

    #[test]
    fn case_and_invoice_number_shapes() {
        let year = Utc::now().year();
        let case = generate_case_number();
        assert!(case.starts_with(&format!("CASE-{year}-")));
        assert_eq!(case.len(), format!("CASE-{year}-0000").len());

        let inv = generate_invoice_number();
        assert!(inv.starts_with(&format!("INV-{year}-")));
        assert!(inv[inv.len() - 4..].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn client_numbers_are_zero_padded() {
        assert_eq!(client_number(2025, 7), "CL-2025-0007");
        assert_eq!(client_number(2025, 12345), "CL-2025-12345");
        assert_eq!(fallback_client_number(2025, 1_700_000_004_321), "CL-2025-4321");
        assert_eq!(client_number_prefix(2026), "CL-2026-");
    }

    #[test]
    fn phone_formatting() {
        assert_eq!(format_phone_number("971501234567"), "+971501234567");
        assert_eq!(format_phone_number("+971 50 123 4567"), "+971501234567");
        assert_eq!(format_phone_number("0501234567"), "+971501234567");
        assert_eq!(format_phone_number("501234567"), "+971501234567");
    }

    #[test]
    fn random_password_charset() {
        let p = generate_random_password();
        assert_eq!(p.len(), 12);
        assert!(p.bytes().all(|b| PASSWORD_CHARSET.contains(&b)));
    }

    #[test]
    fn otp_is_six_digits() {
        let otp = generate_otp();
        assert_eq!(otp.len(), 6);
        assert!(otp.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn sha256_is_hex() {
        let h = sha256_hex("123456");
        assert_eq!(h.len(), 64);
        assert_eq!(h, sha256_hex("123456"));
        assert_ne!(h, sha256_hex("654321"));
    }

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(sanitize_file_name("my report (final).pdf"), "my_report_final.pdf");
        assert_eq!(sanitize_file_name("../etc/passwd"), "..etcpasswd");
        assert_eq!(sanitize_file_name("عقد.pdf"), ".pdf");
    }

    #[test]
    fn phone_query_normalization() {
        assert_eq!(normalize_phone_query("(050) 123-4567"), "0501234567");
    }

    #[test]
    fn csv_escaping() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn csv_writer_emits_header_and_rows() {
        let csv = to_csv(&["Name", "Emirate"], &[vec!["Bur Dubai, Station".into(), "Dubai".into()]]);
        assert_eq!(csv, "Name,Emirate\n\"Bur Dubai, Station\",Dubai\n");
    }

    #[test]
    fn csv_parser_handles_quotes_and_blank_lines() {
        let rows = parse_csv(
            "name,emirate,address\r\n\"Al Barsha, PS\",Dubai,\"Street \"\"5\"\"\"\n\nSharjah Central,Sharjah\n",
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], "Al Barsha, PS");
        assert_eq!(rows[0]["address"], "Street \"5\"");
        assert_eq!(rows[1]["emirate"], "Sharjah");
        assert_eq!(rows[1]["address"], "");
    }

    #[test]
    fn csv_parser_empty_input() {
        assert!(parse_csv("").is_empty());
        assert!(parse_csv("name,emirate\n").is_empty());
    }
}
