use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use shared_types::{
    is_valid_case_status, is_valid_urgency, AddNoteRequest, ApiResponse, AppError, AssignLawyerRequest, Case,
    CaseBrief, CaseListParams, CasePage, CaseStatusRequest, CaseView, ClientLookup,
    ClientProfile, ClientSearchParams, ClientSearchResult, DocumentView, ErrorResponse,
    MessageResponse, PageRequest, RegisterCaseRequest, RegisteredCase, Role, TrackingView, User,
    UserResponse, UserSummary, CASE_STATUSES, URGENCY_LEVELS,
};

use crate::auth::scope::{check_emirate_access, emirate_filter};
use crate::auth::password::hash_password;
use crate::auth::{roles, AuthUser, Authorized, CurrentUser, Staff};
use crate::error_convert::SqlxErrorExt;
use crate::repo::case::CaseFilter;
use crate::repo::tracking::TrackingEntry;
use crate::repo::user::NewUser;
use crate::storage::{DocumentStore, ObjectStore};
use crate::{helpers, mailgun, repo};

const DEFAULT_PAGE_SIZE: i64 = 20;
const MIN_SEARCH_LEN: usize = 3;

pub(crate) fn parse_case_id(id: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id).map_err(|_| AppError::bad_request("Invalid UUID format"))
}

pub(crate) async fn load_case(pool: &Pool<Postgres>, id: Uuid) -> Result<Case, AppError> {
    repo::case::find_by_id(pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Case not found"))
}

fn is_own_registration(caller: &CurrentUser, case: &Case) -> bool {
    caller.role != Role::Coordinator || case.coordinator_id == caller.id()
}

/// `{id, name, email, phone}` for case participants.
fn contact(summary: Option<UserSummary>) -> Option<UserSummary> {
    summary.map(|mut s| {
        s.role = None;
        s
    })
}

/// `{id, name, email}` for audit trail authors.
pub(crate) fn author(summary: Option<UserSummary>) -> Option<UserSummary> {
    summary.map(|mut s| {
        s.phone = None;
        s.role = None;
        s
    })
}

/// Attach participant summaries to a batch of cases with a single user lookup.
async fn with_participants(
    pool: &Pool<Postgres>,
    cases: Vec<Case>,
) -> Result<Vec<CaseView>, AppError> {
    let ids: Vec<Uuid> = cases
        .iter()
        .flat_map(|c| [Some(c.client_id), Some(c.coordinator_id), c.lawyer_id, c.counsellor_id])
        .flatten()
        .collect();
    let users = repo::user::summaries_by_ids(pool, &ids).await?;

    Ok(cases
        .into_iter()
        .map(|case| CaseView {
            client: contact(repo::user::pick(&users, Some(case.client_id))),
            coordinator: contact(repo::user::pick(&users, Some(case.coordinator_id))),
            lawyer: contact(repo::user::pick(&users, case.lawyer_id)),
            counsellor: contact(repo::user::pick(&users, case.counsellor_id)),
            tracking_records: None,
            expenses: None,
            payments: None,
            documents: None,
            case,
        })
        .collect())
}

/// The detail view: participants plus tracking, expenses, payments and documents.
pub(crate) async fn full_view(pool: &Pool<Postgres>, case: Case) -> Result<CaseView, AppError> {
    let case_id = case.id;
    let tracking = repo::tracking::list_for_case(pool, case_id).await?;
    let expenses = repo::expense::list_for_case(pool, case_id).await?;
    let payments = repo::payment::list_for_case(pool, case_id).await?;
    let documents = repo::document::list_for_case(pool, case_id).await?;

    let author_ids: Vec<Uuid> = tracking
        .iter()
        .map(|t| t.user_id)
        .chain(documents.iter().map(|d| d.uploaded_by))
        .collect();
    let authors = repo::user::summaries_by_ids(pool, &author_ids).await?;

    let mut view = with_participants(pool, vec![case])
        .await?
        .pop()
        .ok_or_else(|| AppError::internal("Case view could not be built"))?;

    view.tracking_records = Some(
        tracking
            .into_iter()
            .map(|record| TrackingView {
                user: author(repo::user::pick(&authors, Some(record.user_id))),
                record,
            })
            .collect(),
    );
    view.expenses = Some(expenses);
    view.payments = Some(payments);
    view.documents = Some(
        documents
            .into_iter()
            .map(|document| DocumentView {
                uploader: repo::user::pick(&authors, Some(document.uploaded_by)).map(|mut u| {
                    u.phone = None;
                    u
                }),
                document,
            })
            .collect(),
    );
    Ok(view)
}

// ── Client lookup ───────────────────────────────────────────────────

/// Start from the registered client, then fill what the account lacks from the
/// most recent case. Without an account the case alone describes the client.
pub fn merge_client_lookup(client: Option<&User>, latest: Option<&Case>) -> ClientLookup {
    let mut info = match client {
        Some(u) => ClientLookup {
            id: Some(u.id),
            name: u.name.clone(),
            email: Some(u.email.clone()),
            phone: Some(u.phone.clone()),
            client_number: u.client_number.clone(),
            emirates_id: u.emirates_id.clone(),
            nationality: u.nationality.clone(),
            whatsapp_number: u.whatsapp_number.clone(),
            landline_number: u.landline_number.clone(),
            company_address: u.company_address.clone(),
            company_number: u.company_phone.clone(),
            company_email: u.company_email.clone(),
            occupation: u.occupation.clone().map(Value::String),
            employer_name: u.employer_name.clone(),
            ..Default::default()
        },
        None => ClientLookup::default(),
    };

    let Some(case) = latest else {
        return info;
    };
    if client.is_none() {
        info.name = case.client_name.clone();
        info.email = case.client_email.clone();
        info.phone = case.client_phone.clone();
    }
    info.whatsapp_number = info.whatsapp_number.or_else(|| case.whatsapp_number.clone());
    info.landline_number = info.landline_number.or_else(|| case.landline_number.clone());
    info.emirates_id = info.emirates_id.or_else(|| case.emirates_id.clone());
    info.nationality = info.nationality.or_else(|| case.nationality.clone());
    info.company_address = info.company_address.or_else(|| case.company_address.clone());
    info.company_number = info.company_number.or_else(|| case.company_number.clone());
    info.company_email = info.company_email.or_else(|| case.company_email.clone());
    info.occupation = info.occupation.or_else(|| case.occupation.clone());
    info.employer_name = info.employer_name.or_else(|| case.employer_name.clone());
    info.employer_number = case.employer_number.clone();
    info.employer_address = case.employer_address.clone();
    info.salary = case.salary;
    info.family_member_name = case.family_member_name.clone();
    info.family_member_number = case.family_member_number.clone();
    info.friend_name = case.friend_name.clone();
    info.friend_number = case.friend_number.clone();
    info
}

fn resolve_name(names: &HashMap<String, String>, id: &Option<String>) -> Option<String> {
    id.as_ref()
        .map(|raw| names.get(raw).cloned().unwrap_or_else(|| raw.clone()))
}

/// GET /api/cases/search-client
#[utoipa::path(
    get,
    path = "/api/cases/search-client",
    params(ClientSearchParams),
    responses(
        (status = 200, description = "Lookup result", body = ApiResponse<ClientSearchResult>),
        (status = 400, description = "Query too short", body = ErrorResponse)
    ),
    tag = "cases"
)]
pub async fn search_client(
    State(pool): State<Pool<Postgres>>,
    Authorized(_caller): Authorized<{ roles::ADMIN_OR_COORDINATOR }>,
    Query(params): Query<ClientSearchParams>,
) -> Result<Json<ApiResponse<ClientSearchResult>>, AppError> {
    let term = params.query.as_deref().map(str::trim).unwrap_or_default();
    if term.chars().count() < MIN_SEARCH_LEN {
        return Err(AppError::bad_request(
            "Please provide at least 3 characters to search",
        ));
    }
    let normalized = helpers::normalize_phone_query(term);

    let client = repo::user::find_client_for_search(&pool, term, &normalized).await?;
    let cases =
        repo::case::find_for_client_search(&pool, term, &normalized, client.as_ref().map(|c| c.id))
            .await?;

    if client.is_none() && cases.is_empty() {
        return Ok(Json(ApiResponse::with_message(
            "No existing client found",
            ClientSearchResult::not_found(),
        )));
    }

    let taxonomy_ids: Vec<String> = cases
        .iter()
        .flat_map(|c| [&c.case_type, &c.case_category, &c.case_sub_category])
        .flatten()
        .cloned()
        .collect();
    let names = repo::taxonomy::names_by_ids(&pool, &taxonomy_ids).await?;
    let lawyer_ids: Vec<Uuid> = cases.iter().filter_map(|c| c.lawyer_id).collect();
    let lawyers = repo::user::summaries_by_ids(&pool, &lawyer_ids).await?;

    let briefs: Vec<CaseBrief> = cases
        .iter()
        .map(|c| CaseBrief {
            id: c.id,
            case_number: c.case_number.clone(),
            case_type: resolve_name(&names, &c.case_type),
            case_category: resolve_name(&names, &c.case_category),
            case_sub_category: resolve_name(&names, &c.case_sub_category),
            status: c.status.clone(),
            emirate: c.emirate.clone(),
            registration_date: c.registration_date,
            lawyer: repo::user::pick(&lawyers, c.lawyer_id)
                .map(|l| l.name)
                .unwrap_or_else(|| "Unassigned".to_string()),
        })
        .collect();

    let message = match (&client, briefs.len()) {
        (Some(_), 0) => "Found registered client (no cases yet)".to_string(),
        (Some(_), n) => format!("Found registered client with {n} case(s)"),
        (None, n) => format!("Found {n} case(s) for this client"),
    };

    Ok(Json(ApiResponse::with_message(
        message,
        ClientSearchResult {
            found: true,
            client: Some(merge_client_lookup(client.as_ref(), cases.first())),
            total_cases: Some(briefs.len() as i64),
            cases: briefs,
            is_registered_client: Some(client.is_some()),
        },
    )))
}

// ── Registration ────────────────────────────────────────────────────

fn registration_profile(body: &RegisterCaseRequest) -> ClientProfile {
    ClientProfile {
        nationality: body.nationality.clone(),
        emirates_id: body.emirates_id.clone(),
        whatsapp_number: body.whatsapp_number.clone(),
        landline_number: body.landline_number.clone(),
        company_address: body.company_address.clone(),
        company_email: body.company_email.clone(),
        company_phone: body.company_number.clone(),
        occupation: body.occupation_text(),
        employer_name: body.employer_name.clone(),
        ..Default::default()
    }
}

/// POST /api/cases
#[utoipa::path(
    post,
    path = "/api/cases",
    request_body = RegisterCaseRequest,
    responses(
        (status = 201, description = "Case registered", body = ApiResponse<RegisteredCase>),
        (status = 400, description = "Missing client contact or emirate", body = ErrorResponse),
        (status = 403, description = "Emirate not assigned to caller", body = ErrorResponse)
    ),
    tag = "cases"
)]
#[tracing::instrument(skip(pool, caller, body))]
pub async fn register_case(
    State(pool): State<Pool<Postgres>>,
    Authorized(caller): Authorized<{ roles::ADMIN_OR_COORDINATOR }>,
    Json(body): Json<RegisterCaseRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RegisteredCase>>), AppError> {
    let trimmed = |v: &Option<String>| v.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(str::to_string);
    let (Some(name), Some(email), Some(phone)) = (
        trimmed(&body.client_name),
        trimmed(&body.client_email),
        body.contact_phone().map(str::to_string),
    ) else {
        return Err(AppError::bad_request(
            "Client name, email, and phone are required",
        ));
    };
    check_emirate_access(&caller, body.emirate.as_deref())?;
    if let Some(urgency) = trimmed(&body.urgency_level) {
        if !is_valid_urgency(&urgency) {
            return Err(AppError::bad_request(format!(
                "Invalid urgency level. Must be one of: {}",
                URGENCY_LEVELS.join(", ")
            )));
        }
    }

    let case_number = repo::case::generate_unique_case_number(&pool).await?;
    let profile = registration_profile(&body);

    // Client account, case and first tracking entry commit together.
    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;
    let (client, temporary_password) = match repo::user::find_by_email(&pool, &email).await? {
        Some(existing) if profile.is_empty() => (existing, None),
        Some(existing) => (
            repo::user::update_profile_details(&mut *tx, existing.id, &profile).await?,
            None,
        ),
        None => {
            let password = helpers::generate_random_password();
            let mut new = NewUser::new(&email, hash_password(&password)?, &name, &phone, Role::Client.as_str());
            new.case_number = Some(case_number.clone());
            new.client_number = Some(repo::user::generate_client_number(&pool).await?);
            new.created_by = Some(caller.id());
            new.profile = profile;
            (repo::user::create(&mut *tx, new).await?, Some(password))
        }
    };

    let case = repo::case::create(&mut tx, &body, &case_number, client.id, caller.id()).await?;
    repo::tracking::append(
        &mut tx,
        case.id,
        caller.id(),
        &TrackingEntry::change(
            "case_registered",
            None,
            Some("Case registered".to_string()),
            format!("Case {} registered by {}", case.case_number, caller.user.name),
        ),
    )
    .await?;
    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;

    if let Some(password) = &temporary_password {
        let (subject, html) =
            mailgun::templates::welcome_credentials(&client.name, &client.email, password);
        if !mailgun::try_send(&client.email, &subject, &html).await {
            tracing::warn!(client_id = %client.id, "Welcome email not sent");
        }
    }

    tracing::info!(case_id = %case.id, case_number = %case.case_number, "Case registered");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Case registered successfully",
            RegisteredCase {
                case,
                client: UserResponse::from(client),
                temporary_password,
            },
        )),
    ))
}

// ── Reads ───────────────────────────────────────────────────────────

/// GET /api/cases
#[utoipa::path(
    get,
    path = "/api/cases",
    params(CaseListParams),
    responses(
        (status = 200, description = "Cases visible to the caller", body = ApiResponse<CasePage>)
    ),
    tag = "cases"
)]
pub async fn list_cases(
    State(pool): State<Pool<Postgres>>,
    AuthUser(caller): AuthUser,
    Query(params): Query<CaseListParams>,
) -> Result<Json<ApiResponse<CasePage>>, AppError> {
    let page = PageRequest::parse(params.page.as_deref(), params.limit.as_deref(), DEFAULT_PAGE_SIZE);
    let me = Some(caller.id());
    let mut filter = CaseFilter {
        emirates: emirate_filter(&caller),
        status: params.status.filter(|s| !s.is_empty()),
        emirate: params.emirate.filter(|e| !e.is_empty()),
        search: params.search,
        ..Default::default()
    };
    match caller.role {
        Role::Client => filter.client_id = me,
        Role::Lawyer => filter.lawyer_id = me,
        Role::Counsellor => filter.counsellor_id = me,
        Role::Coordinator => filter.coordinator_id = me,
        Role::SuperAdmin => {}
    }

    let (rows, total) = repo::case::list(&pool, &filter, page.limit, page.offset()).await?;
    let pagination = page.pagination(total, rows.len());
    let cases = with_participants(&pool, rows).await?;

    Ok(Json(ApiResponse::ok(CasePage { cases, pagination })))
}

/// GET /api/cases/{id}
#[utoipa::path(
    get,
    path = "/api/cases/{id}",
    params(("id" = String, Path, description = "Case UUID")),
    responses(
        (status = 200, description = "Case with history", body = ApiResponse<CaseView>),
        (status = 403, description = "Access denied", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "cases"
)]
pub async fn get_case(
    State(pool): State<Pool<Postgres>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<CaseView>>, AppError> {
    let case = load_case(&pool, parse_case_id(&id)?).await?;

    let owns = match caller.role {
        Role::Client => case.client_id == caller.id(),
        _ => is_own_registration(&caller, &case),
    };
    if !owns {
        return Err(AppError::forbidden("Access denied"));
    }

    Ok(Json(ApiResponse::ok(full_view(&pool, case).await?)))
}

// ── Writes ──────────────────────────────────────────────────────────

/// PUT /api/cases/{id}
#[utoipa::path(
    put,
    path = "/api/cases/{id}",
    params(("id" = String, Path, description = "Case UUID")),
    request_body = serde_json::Value,
    responses(
        (status = 200, description = "Case updated", body = ApiResponse<CaseView>),
        (status = 400, description = "Invalid field value", body = ErrorResponse),
        (status = 403, description = "Not your registration", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "cases"
)]
#[tracing::instrument(skip(pool, caller, body))]
pub async fn update_case(
    State(pool): State<Pool<Postgres>>,
    Staff(caller): Staff,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<ApiResponse<CaseView>>, AppError> {
    let Value::Object(fields) = body else {
        return Err(AppError::bad_request("Request body must be a JSON object"));
    };
    let case = load_case(&pool, parse_case_id(&id)?).await?;
    if !is_own_registration(&caller, &case) {
        return Err(AppError::forbidden(
            "Access denied - You can only update cases you registered",
        ));
    }

    let changes = repo::case::diff_fields(&case, &fields)?;
    if changes.is_empty() {
        return Ok(Json(ApiResponse::with_message(
            "No changes detected",
            full_view(&pool, case).await?,
        )));
    }

    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;
    repo::case::apply_changes(&mut tx, case.id, &changes).await?;
    for change in &changes {
        let entry = TrackingEntry::change(
            format!("field_update_{}", change.field),
            Some(change.old.clone()),
            Some(change.new.clone()),
            format!("{} updated from {} to {}", change.field, change.old, change.new),
        );
        repo::tracking::append(&mut tx, case.id, caller.id(), &entry).await?;
    }
    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;

    tracing::info!(case_id = %case.id, changed = changes.len(), "Case updated");
    let case = load_case(&pool, case.id).await?;
    Ok(Json(ApiResponse::with_message(
        "Case updated successfully",
        full_view(&pool, case).await?,
    )))
}

/// DELETE /api/cases/{id}
#[utoipa::path(
    delete,
    path = "/api/cases/{id}",
    params(("id" = String, Path, description = "Case UUID")),
    responses(
        (status = 200, description = "Case deleted", body = MessageResponse),
        (status = 403, description = "Not your registration", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "cases"
)]
#[tracing::instrument(skip(pool, store, caller))]
pub async fn delete_case(
    State(pool): State<Pool<Postgres>>,
    State(store): State<DocumentStore>,
    Authorized(caller): Authorized<{ roles::ADMIN_OR_COORDINATOR }>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let case = load_case(&pool, parse_case_id(&id)?).await?;
    if !is_own_registration(&caller, &case) {
        return Err(AppError::forbidden("Access denied"));
    }

    let documents = repo::document::list_for_case(&pool, case.id).await?;
    if !repo::case::delete(&pool, case.id).await? {
        return Err(AppError::not_found("Case not found"));
    }
    for doc in documents {
        if let Err(e) = store.delete(&doc.file_path).await {
            tracing::error!(error = %e, key = %doc.file_path, "Failed to remove stored document");
        }
    }

    tracing::info!(case_id = %case.id, "Case deleted");
    Ok(Json(MessageResponse::new("Case deleted successfully")))
}

/// PUT /api/cases/{id}/assign-lawyer
#[utoipa::path(
    put,
    path = "/api/cases/{id}/assign-lawyer",
    params(("id" = String, Path, description = "Case UUID")),
    request_body = AssignLawyerRequest,
    responses(
        (status = 200, description = "Lawyer assigned", body = ApiResponse<Case>),
        (status = 400, description = "Target is not a lawyer", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "cases"
)]
#[tracing::instrument(skip(pool, caller, body))]
pub async fn assign_lawyer(
    State(pool): State<Pool<Postgres>>,
    Authorized(caller): Authorized<{ roles::ADMIN_OR_COORDINATOR }>,
    Path(id): Path<String>,
    Json(body): Json<AssignLawyerRequest>,
) -> Result<Json<ApiResponse<Case>>, AppError> {
    let case = load_case(&pool, parse_case_id(&id)?).await?;

    let lawyer = match body.lawyer_id.as_deref().map(Uuid::parse_str) {
        Some(Ok(lawyer_id)) => repo::user::get(&pool, lawyer_id).await?,
        _ => None,
    };
    let lawyer = match lawyer {
        Some(u) if u.role == Role::Lawyer.as_str() => u,
        other => {
            let found = other.map(|u| u.role).unwrap_or_else(|| "None".to_string());
            return Err(AppError::bad_request(format!(
                "Invalid lawyer ID. Found: {found}"
            )));
        }
    };

    let previous = match case.lawyer_id {
        Some(prev) => repo::user::get(&pool, prev).await?.map(|u| u.name),
        None => None,
    };

    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;
    let updated = repo::case::assign_lawyer(&mut tx, case.id, lawyer.id).await?;
    repo::tracking::append(
        &mut tx,
        case.id,
        caller.id(),
        &TrackingEntry::change(
            "lawyer_assigned",
            previous,
            Some(lawyer.name.clone()),
            format!("Lawyer {} assigned by {}", lawyer.name, caller.user.name),
        ),
    )
    .await?;
    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;

    Ok(Json(ApiResponse::with_message(
        "Lawyer assigned successfully",
        updated,
    )))
}

/// PUT /api/cases/{id}/status
#[utoipa::path(
    put,
    path = "/api/cases/{id}/status",
    params(("id" = String, Path, description = "Case UUID")),
    request_body = CaseStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = ApiResponse<Case>),
        (status = 400, description = "Invalid status", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "cases"
)]
#[tracing::instrument(skip(pool, caller, body))]
pub async fn update_status(
    State(pool): State<Pool<Postgres>>,
    Staff(caller): Staff,
    Path(id): Path<String>,
    Json(body): Json<CaseStatusRequest>,
) -> Result<Json<ApiResponse<Case>>, AppError> {
    let status = body.status.as_deref().map(str::trim).unwrap_or_default();
    if !is_valid_case_status(status) {
        return Err(AppError::bad_request(format!(
            "Invalid status. Valid values: {}",
            CASE_STATUSES.join(", ")
        )));
    }
    let case = load_case(&pool, parse_case_id(&id)?).await?;

    let mut entry = TrackingEntry::change(
        "status_change",
        Some(case.status.clone()),
        Some(status.to_string()),
        format!("Status changed from {} to {}", case.status, status),
    );
    entry.reason = body.notes.filter(|n| !n.trim().is_empty());

    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;
    let updated = repo::case::set_status(&mut tx, case.id, status).await?;
    repo::tracking::append(&mut tx, case.id, caller.id(), &entry).await?;
    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;

    Ok(Json(ApiResponse::with_message(
        "Case status updated successfully",
        updated,
    )))
}

/// POST /api/cases/{id}/notes
#[utoipa::path(
    post,
    path = "/api/cases/{id}/notes",
    params(("id" = String, Path, description = "Case UUID")),
    request_body = AddNoteRequest,
    responses(
        (status = 200, description = "Note appended", body = ApiResponse<Case>),
        (status = 400, description = "Missing note", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "cases"
)]
#[tracing::instrument(skip(pool, caller, body))]
pub async fn add_note(
    State(pool): State<Pool<Postgres>>,
    Staff(caller): Staff,
    Path(id): Path<String>,
    Json(body): Json<AddNoteRequest>,
) -> Result<Json<ApiResponse<Case>>, AppError> {
    let note = body
        .note
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::bad_request("Note is required"))?;
    let case = load_case(&pool, parse_case_id(&id)?).await?;

    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;
    let updated = repo::case::append_note(&mut tx, case.id, note).await?;
    repo::tracking::append(
        &mut tx,
        case.id,
        caller.id(),
        &TrackingEntry::change(
            "note_added",
            None,
            Some(note.to_string()),
            format!("Note added by {}", caller.user.name),
        ),
    )
    .await?;
    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;

    Ok(Json(ApiResponse::with_message("Note added successfully", updated)))
}
