use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Emirates ────────────────────────────────────────────────────────

/// The seven emirates that cases and staff assignments are scoped to.
pub const EMIRATES: &[&str] = &[
    "Abu Dhabi",
    "Dubai",
    "Sharjah",
    "Ajman",
    "Umm Al Quwain",
    "Ras Al Khaimah",
    "Fujairah",
];

/// Police stations and jails may also sit in these regions.
pub const FACILITY_EMIRATES: &[&str] = &[
    "Abu Dhabi",
    "Dubai",
    "Sharjah",
    "Ajman",
    "Umm Al Quwain",
    "Ras Al Khaimah",
    "Fujairah",
    "Al Ain",
    "Others",
];

pub fn is_valid_emirate(s: &str) -> bool {
    EMIRATES.contains(&s)
}

pub fn is_valid_facility_emirate(s: &str) -> bool {
    FACILITY_EMIRATES.contains(&s)
}

// ── Envelope ────────────────────────────────────────────────────────

/// Success envelope shared by every JSON endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data,
        }
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data,
        }
    }
}

/// Success envelope with no payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

// ── Pagination ──────────────────────────────────────────────────────

/// Pagination block attached to list responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Pagination {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub pages: i64,
    pub unlimited: bool,
}

/// Parsed `page`/`limit` query values. `limit = None` means "return everything".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: Option<i64>,
}

impl PageRequest {
    /// `limit` of `0` or `all` disables paging. Garbage falls back to the defaults.
    pub fn parse(page: Option<&str>, limit: Option<&str>, default_limit: i64) -> Self {
        let page = page
            .and_then(|p| p.trim().parse::<i64>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(1);

        let limit = match limit.map(str::trim) {
            Some("0") | Some("all") => None,
            Some(raw) => Some(
                raw.parse::<i64>()
                    .ok()
                    .filter(|l| *l > 0)
                    .unwrap_or(default_limit),
            ),
            None => Some(default_limit),
        };

        Self { page, limit }
    }

    pub fn offset(&self) -> i64 {
        match self.limit {
            Some(limit) => (self.page - 1) * limit,
            None => 0,
        }
    }

    pub fn pagination(&self, total: i64, returned: usize) -> Pagination {
        match self.limit {
            Some(limit) => Pagination {
                total,
                page: self.page,
                limit,
                pages: (total + limit - 1) / limit,
                unlimited: false,
            },
            None => Pagination {
                total,
                page: 1,
                limit: returned as i64,
                pages: 1,
                unlimited: true,
            },
        }
    }
}

// ── Shared summaries ────────────────────────────────────────────────

/// Compact user reference embedded in other resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Result counters returned by bulk import endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ImportResults {
    pub success: i64,
    pub failed: i64,
    pub errors: Vec<String>,
}

/// `"No"` deactivates an imported row; anything else keeps it active.
pub fn import_flag_is_active(value: Option<&serde_json::Value>) -> bool {
    !matches!(value, Some(serde_json::Value::String(s)) if s == "No")
}

// ── Lenient input helpers ───────────────────────────────────────────

/// Parse a calendar date sent either as `YYYY-MM-DD` or as a full RFC 3339 timestamp.
pub fn parse_date_input(raw: &str) -> Option<chrono::NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            chrono::DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.date_naive())
        })
        .or_else(|| raw.get(..10).and_then(|d| chrono::NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()))
}

/// Form clients frequently send amounts as strings; accept both.
pub mod lenient_f64 {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(match value {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        })
    }
}
