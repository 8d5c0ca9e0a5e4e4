use serde::{Deserialize, Serialize};

use crate::case::Case;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct SuperAdminDashboard {
    pub total_cases: i64,
    pub total_users: i64,
    pub total_revenue: f64,
    pub pending_cases: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct CoordinatorDashboard {
    pub my_cases: i64,
    pub pending_assignment: i64,
    pub active_cases: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct LawyerDashboard {
    pub assigned_cases: i64,
    pub active_cases: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct CounsellorDashboard {
    pub total_cases: i64,
    pub active_cases: i64,
}

/// Contact card for the lawyer on a client's latest case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct LawyerContact {
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ClientCaseCard {
    #[serde(flatten)]
    pub case: Case,
    pub lawyer: Option<LawyerContact>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ClientDashboard {
    pub case: Option<ClientCaseCard>,
    pub total_paid: f64,
}
