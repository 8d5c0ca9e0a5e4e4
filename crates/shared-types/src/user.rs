use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ── Roles ───────────────────────────────────────────────────────────

/// Every account has exactly one role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Coordinator,
    Counsellor,
    Lawyer,
    Client,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::SuperAdmin,
        Role::Coordinator,
        Role::Counsellor,
        Role::Lawyer,
        Role::Client,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "super_admin" => Some(Role::SuperAdmin),
            "coordinator" => Some(Role::Coordinator),
            "counsellor" => Some(Role::Counsellor),
            "lawyer" => Some(Role::Lawyer),
            "client" => Some(Role::Client),
            _ => None,
        }
    }

    /// Lowercase string for database / JWT storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Coordinator => "coordinator",
            Role::Counsellor => "counsellor",
            Role::Lawyer => "lawyer",
            Role::Client => "client",
        }
    }

    /// Bit used by role-mask guards.
    pub const fn bit(&self) -> u8 {
        match self {
            Role::SuperAdmin => 1,
            Role::Coordinator => 2,
            Role::Counsellor => 4,
            Role::Lawyer => 8,
            Role::Client => 16,
        }
    }

    pub fn is_staff(&self) -> bool {
        !matches!(self, Role::Client)
    }

    /// Only coordinators and counsellors are restricted to assigned emirates.
    pub fn is_emirate_scoped(&self) -> bool {
        matches!(self, Role::Coordinator | Role::Counsellor)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Roles contained in a guard mask, in declaration order.
pub fn roles_in_mask(mask: u8) -> Vec<Role> {
    Role::ALL
        .iter()
        .copied()
        .filter(|r| mask & r.bit() != 0)
        .collect()
}

// ── DB row struct ───────────────────────────────────────────────────

/// A user row, including credentials. Never serialized directly.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub phone: String,
    pub role: String,
    pub phone_verified: bool,
    pub assigned_emirates: Value,
    pub created_by: Option<Uuid>,
    pub case_number: Option<String>,
    pub client_number: Option<String>,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub last_login_ip: Option<String>,
    pub two_factor_enabled: bool,
    pub two_factor_secret: Option<String>,
    pub two_factor_confirmed_at: Option<DateTime<Utc>>,
    pub two_factor_failed_attempts: i32,
    pub two_factor_lock_until: Option<DateTime<Utc>>,
    pub nationality: Option<String>,
    pub emirates_id: Option<String>,
    pub whatsapp_number: Option<String>,
    pub landline_number: Option<String>,
    pub company_name: Option<String>,
    pub company_address: Option<String>,
    pub company_email: Option<String>,
    pub company_phone: Option<String>,
    pub occupation: Option<String>,
    pub employer_name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub notes: Option<String>,
    pub specializations: Value,
    pub permissions: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn role(&self) -> Option<Role> {
        Role::parse(&self.role)
    }

    /// Assigned emirates as strings. Anything other than a JSON array yields `None`.
    pub fn emirate_list(&self) -> Option<Vec<String>> {
        parse_emirate_list(&self.assigned_emirates)
    }
}

/// Emirate lists were historically stored both as arrays and as JSON-encoded
/// strings; accept either.
pub fn parse_emirate_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => Some(
            items
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
        ),
        Value::String(raw) => serde_json::from_str::<Value>(raw)
            .ok()
            .filter(Value::is_array)
            .and_then(|v| parse_emirate_list(&v)),
        _ => None,
    }
}

// ── API response types ──────────────────────────────────────────────

/// User as returned by the API: no password hash, no 2FA secret.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: String,
    pub role: String,
    pub phone_verified: bool,
    /// Present only for coordinators and counsellors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_emirates: Option<Vec<String>>,
    pub created_by: Option<Uuid>,
    pub case_number: Option<String>,
    pub client_number: Option<String>,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub last_login_ip: Option<String>,
    pub two_factor_enabled: bool,
    pub nationality: Option<String>,
    pub emirates_id: Option<String>,
    pub whatsapp_number: Option<String>,
    pub landline_number: Option<String>,
    pub company_name: Option<String>,
    pub company_address: Option<String>,
    pub company_email: Option<String>,
    pub company_phone: Option<String>,
    pub occupation: Option<String>,
    pub employer_name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub notes: Option<String>,
    pub specializations: Value,
    pub permissions: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        let assigned_emirates = match u.role() {
            Some(role) if role.is_emirate_scoped() => Some(u.emirate_list().unwrap_or_default()),
            _ => None,
        };
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
            phone: u.phone,
            role: u.role,
            phone_verified: u.phone_verified,
            assigned_emirates,
            created_by: u.created_by,
            case_number: u.case_number,
            client_number: u.client_number,
            is_active: u.is_active,
            last_login: u.last_login,
            last_login_ip: u.last_login_ip,
            two_factor_enabled: u.two_factor_enabled,
            nationality: u.nationality,
            emirates_id: u.emirates_id,
            whatsapp_number: u.whatsapp_number,
            landline_number: u.landline_number,
            company_name: u.company_name,
            company_address: u.company_address,
            company_email: u.company_email,
            company_phone: u.company_phone,
            occupation: u.occupation,
            employer_name: u.employer_name,
            address: u.address,
            city: u.city,
            notes: u.notes,
            specializations: u.specializations,
            permissions: u.permissions,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

/// Lawyer directory entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct LawyerSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub specializations: Value,
}

/// Per-lawyer case counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct LawyerCaseStats {
    pub assigned: i64,
    pub completed: i64,
}

// ── Request types ───────────────────────────────────────────────────

/// Client contact and employment details shared by several requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ClientProfile {
    #[serde(default)]
    pub nationality: Option<String>,
    #[serde(default)]
    pub emirates_id: Option<String>,
    #[serde(default)]
    pub whatsapp_number: Option<String>,
    #[serde(default)]
    pub landline_number: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub company_address: Option<String>,
    #[serde(default)]
    pub company_email: Option<String>,
    #[serde(default)]
    pub company_phone: Option<String>,
    #[serde(default)]
    pub occupation: Option<String>,
    #[serde(default)]
    pub employer_name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ClientProfile {
    pub fn is_empty(&self) -> bool {
        *self == ClientProfile::default()
    }
}

/// Admin request to create any kind of account.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "validation", derive(validator::Validate))]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[serde(default)]
    #[cfg_attr(
        feature = "validation",
        validate(email(message = "Valid email is required"))
    )]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub client_number: Option<String>,
    #[serde(default)]
    pub assigned_emirates: Option<Vec<String>>,
    #[serde(default)]
    pub specializations: Option<Value>,
    #[serde(default)]
    pub permissions: Option<Value>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(flatten)]
    pub profile: ClientProfile,
}

/// Partial profile update. Privileged fields are honoured for super admins only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "validation", derive(validator::Validate))]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[serde(default)]
    #[cfg_attr(
        feature = "validation",
        validate(email(message = "Valid email is required"))
    )]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub client_number: Option<String>,
    #[serde(default)]
    pub assigned_emirates: Option<Vec<String>>,
    #[serde(default)]
    pub specializations: Option<Value>,
    #[serde(default)]
    pub permissions: Option<Value>,
    #[serde(flatten)]
    pub profile: ClientProfile,
}

/// Response for account creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct CreatedUser {
    pub user: UserResponse,
    pub email_sent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temporary_password: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct AdminResetPasswordRequest {
    #[serde(default)]
    pub new_password: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: Option<String>,
    #[serde(default)]
    pub new_password: Option<String>,
}

/// `emirates` is kept as raw JSON so a non-array body can be rejected with a clear message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AssignEmiratesRequest {
    #[serde(default)]
    pub emirates: Value,
}

/// Query string for the user list.
#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[serde(rename_all = "camelCase")]
pub struct UserListParams {
    pub role: Option<String>,
    pub is_active: Option<String>,
    pub search: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Paginated users.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UserPage {
    pub users: Vec<UserResponse>,
    pub pagination: crate::common::Pagination,
}

/// Outcome of a bulk client import.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ClientImportResults {
    pub created: i64,
    pub updated: i64,
    pub failed: i64,
    pub errors: Vec<String>,
    pub total_errors: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_str() {
        for role in Role::ALL {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("admin"), None);
    }

    #[test]
    fn only_clients_are_not_staff() {
        assert!(Role::Lawyer.is_staff());
        assert!(Role::SuperAdmin.is_staff());
        assert!(!Role::Client.is_staff());
    }

    #[test]
    fn mask_expands_to_roles() {
        let mask = Role::SuperAdmin.bit() | Role::Lawyer.bit();
        assert_eq!(roles_in_mask(mask), vec![Role::SuperAdmin, Role::Lawyer]);
    }

    #[test]
    fn emirate_list_accepts_array_and_encoded_string() {
        let arr = serde_json::json!(["Dubai", "Sharjah"]);
        assert_eq!(parse_emirate_list(&arr), Some(vec!["Dubai".into(), "Sharjah".into()]));

        let encoded = serde_json::json!("[\"Ajman\"]");
        assert_eq!(parse_emirate_list(&encoded), Some(vec!["Ajman".into()]));

        assert_eq!(parse_emirate_list(&serde_json::json!("not json")), None);
        assert_eq!(parse_emirate_list(&serde_json::json!({"a": 1})), None);
    }

    #[test]
    fn create_request_flattens_profile() {
        let req: CreateUserRequest = serde_json::from_value(serde_json::json!({
            "email": "c@example.com",
            "name": "Client",
            "phone": "0501234567",
            "role": "client",
            "emiratesId": "784-1234",
            "city": "Dubai"
        }))
        .unwrap();
        assert_eq!(req.profile.emirates_id.as_deref(), Some("784-1234"));
        assert_eq!(req.profile.city.as_deref(), Some("Dubai"));
        assert!(!req.profile.is_empty());
    }
}
