use chrono::NaiveDate;
use serde_json::{Map, Value};
use shared_types::{parse_date_input, AppError, Case, RegisterCaseRequest};
use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error_convert::SqlxErrorExt;
use crate::helpers;

/// Row filters for the case list. Every `None` means "no restriction".
#[derive(Debug, Clone, Default)]
pub struct CaseFilter {
    pub client_id: Option<Uuid>,
    pub lawyer_id: Option<Uuid>,
    pub counsellor_id: Option<Uuid>,
    pub coordinator_id: Option<Uuid>,
    /// Emirate scope of the caller, compared case-insensitively.
    pub emirates: Option<Vec<String>>,
    pub status: Option<String>,
    pub emirate: Option<String>,
    pub search: Option<String>,
}

pub async fn case_number_exists(pool: &Pool<Postgres>, number: &str) -> Result<bool, AppError> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM cases WHERE case_number = $1)")
        .bind(number)
        .fetch_one(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

pub async fn generate_unique_case_number(pool: &Pool<Postgres>) -> Result<String, AppError> {
    helpers::first_free_number(helpers::generate_case_number, |candidate| async move {
        case_number_exists(pool, &candidate).await
    })
    .await
}

fn text(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn date(value: &Option<String>) -> Option<NaiveDate> {
    value.as_deref().and_then(parse_date_input)
}

/// `still_on_duty` only takes `yes` or `no`.
fn yes_no(value: &Option<String>) -> Option<String> {
    text(value)
        .map(str::to_lowercase)
        .filter(|v| v == "yes" || v == "no")
}

/// Insert a freshly registered case. Runs on the caller's transaction so the
/// first tracking entry lands atomically with it.
pub async fn create(
    conn: &mut PgConnection,
    req: &RegisterCaseRequest,
    case_number: &str,
    client_id: Uuid,
    coordinator_id: Uuid,
) -> Result<Case, AppError> {
    let estimated = req.estimated_cost.unwrap_or(0.0);
    let urgency = text(&req.urgency_level).unwrap_or("medium");

    sqlx::query_as::<_, Case>(
        r#"
        INSERT INTO cases
            (case_number, client_id, coordinator_id, counsellor_id, lawyer_id,
             client_name, client_email, client_phone, emirates_id, nationality,
             whatsapp_number, landline_number, company_address, company_number,
             company_email, occupation, employer_name, employer_number,
             employer_address, salary, last_day_of_work, still_on_duty,
             work_period_start, work_period_end, family_member_name,
             family_member_number, friend_name, friend_number, case_type,
             case_category, case_sub_category, emirate, court_area, description,
             urgency_level, status, approval_status, hearing_date,
             next_hearing_date, estimated_cost, paid_amount, remaining_amount,
             notes, reference_source, reference_other_details, region_group,
             title, signature, jail_visiting, date_of_endorsement, jail_name,
             date_of_arrest, report_number, date_of_visiting, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27,
                $28, $29, $30, $31, $32, $33, $34, $35, 'pending', 'pending', $36,
                $37, $38, 0, $38, $39, $40, $41, $42, $43, $44, $45, $46, $47,
                $48, $49, $50, $3)
        RETURNING *
        "#,
    )
    .bind(case_number)
    .bind(client_id)
    .bind(coordinator_id)
    .bind(req.counsellor_id)
    .bind(req.lawyer_id)
    .bind(text(&req.client_name).unwrap_or_default())
    .bind(text(&req.client_email).map(str::to_lowercase))
    .bind(req.contact_phone())
    .bind(text(&req.emirates_id))
    .bind(text(&req.nationality))
    .bind(text(&req.whatsapp_number))
    .bind(text(&req.landline_number))
    .bind(text(&req.company_address))
    .bind(text(&req.company_number))
    .bind(text(&req.company_email))
    .bind(req.occupation.clone())
    .bind(text(&req.employer_name))
    .bind(text(&req.employer_number))
    .bind(text(&req.employer_address))
    .bind(req.salary)
    .bind(date(&req.last_day_of_work))
    .bind(yes_no(&req.still_on_duty))
    .bind(date(&req.work_period_start))
    .bind(date(&req.work_period_end))
    .bind(text(&req.family_member_name))
    .bind(text(&req.family_member_number))
    .bind(text(&req.friend_name))
    .bind(text(&req.friend_number))
    .bind(text(&req.case_type))
    .bind(text(&req.case_category))
    .bind(text(&req.case_sub_category))
    .bind(text(&req.emirate))
    .bind(text(&req.court_area))
    .bind(text(&req.description))
    .bind(urgency)
    .bind(date(&req.hearing_date))
    .bind(date(&req.next_hearing_date))
    .bind(estimated)
    .bind(text(&req.notes))
    .bind(text(&req.reference_source))
    .bind(text(&req.reference_other_details))
    .bind(text(&req.region_group))
    .bind(text(&req.title))
    .bind(text(&req.signature))
    .bind(req.jail_visiting.unwrap_or(false))
    .bind(date(&req.date_of_endorsement))
    .bind(text(&req.jail_name))
    .bind(date(&req.date_of_arrest))
    .bind(text(&req.report_number))
    .bind(date(&req.date_of_visiting))
    .fetch_one(conn)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn find_by_id(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<Case>, AppError> {
    sqlx::query_as::<_, Case>("SELECT * FROM cases WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

pub async fn find_by_number(pool: &Pool<Postgres>, number: &str) -> Result<Option<Case>, AppError> {
    sqlx::query_as::<_, Case>("SELECT * FROM cases WHERE case_number = $1")
        .bind(number.trim())
        .fetch_optional(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// Filtered, newest-first page of cases plus the total match count.
pub async fn list(
    pool: &Pool<Postgres>,
    filter: &CaseFilter,
    limit: Option<i64>,
    offset: i64,
) -> Result<(Vec<Case>, i64), AppError> {
    let pattern = filter
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{s}%"));
    let emirates = filter
        .emirates
        .as_ref()
        .map(|list| list.iter().map(|e| e.to_lowercase()).collect::<Vec<_>>());

    const WHERE: &str = r#"
        WHERE ($1::UUID IS NULL OR client_id = $1)
          AND ($2::UUID IS NULL OR lawyer_id = $2)
          AND ($3::UUID IS NULL OR counsellor_id = $3)
          AND ($4::UUID IS NULL OR coordinator_id = $4)
          AND ($5::TEXT[] IS NULL OR LOWER(emirate) = ANY($5))
          AND ($6::TEXT IS NULL OR status = $6)
          AND ($7::TEXT IS NULL OR emirate = $7)
          AND ($8::TEXT IS NULL OR case_number ILIKE $8
               OR client_name ILIKE $8 OR client_email ILIKE $8)
    "#;

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM cases {WHERE}"))
        .bind(filter.client_id)
        .bind(filter.lawyer_id)
        .bind(filter.counsellor_id)
        .bind(filter.coordinator_id)
        .bind(emirates.clone())
        .bind(filter.status.as_deref())
        .bind(filter.emirate.as_deref())
        .bind(pattern.as_deref())
        .fetch_one(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    let rows = sqlx::query_as::<_, Case>(&format!(
        "SELECT * FROM cases {WHERE} ORDER BY created_at DESC LIMIT $9 OFFSET $10"
    ))
    .bind(filter.client_id)
    .bind(filter.lawyer_id)
    .bind(filter.counsellor_id)
    .bind(filter.coordinator_id)
    .bind(emirates)
    .bind(filter.status.as_deref())
    .bind(filter.emirate.as_deref())
    .bind(pattern.as_deref())
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok((rows, total))
}

pub async fn delete(pool: &Pool<Postgres>, id: Uuid) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM cases WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(result.rows_affected() > 0)
}

pub async fn assign_lawyer(
    conn: &mut PgConnection,
    id: Uuid,
    lawyer_id: Uuid,
) -> Result<Case, AppError> {
    sqlx::query_as::<_, Case>("UPDATE cases SET lawyer_id = $2 WHERE id = $1 RETURNING *")
        .bind(id)
        .bind(lawyer_id)
        .fetch_one(conn)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// Closing a case stamps `closed_date`.
pub async fn set_status(
    conn: &mut PgConnection,
    id: Uuid,
    status: &str,
) -> Result<Case, AppError> {
    sqlx::query_as::<_, Case>(
        r#"
        UPDATE cases SET
            status      = $2,
            closed_date = CASE WHEN $2 = 'closed' THEN NOW() ELSE closed_date END
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(status)
    .fetch_one(conn)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Approve a quotation's case: move it into progress under the approving lawyer.
pub async fn start_progress(
    conn: &mut PgConnection,
    id: Uuid,
    lawyer_id: Uuid,
) -> Result<Case, AppError> {
    sqlx::query_as::<_, Case>(
        "UPDATE cases SET status = 'in_progress', lawyer_id = $2 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(lawyer_id)
    .fetch_one(conn)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Notes accumulate one per line.
pub async fn append_note(conn: &mut PgConnection, id: Uuid, note: &str) -> Result<Case, AppError> {
    sqlx::query_as::<_, Case>(
        r#"
        UPDATE cases SET
            notes = CASE
                WHEN notes IS NULL OR notes = '' THEN $2
                ELSE notes || E'\n' || $2
            END
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(note)
    .fetch_one(conn)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Case history lines for a client, newest first.
pub async fn find_for_client_search(
    pool: &Pool<Postgres>,
    term: &str,
    normalized_phone: &str,
    client_id: Option<Uuid>,
) -> Result<Vec<Case>, AppError> {
    sqlx::query_as::<_, Case>(
        r#"
        SELECT * FROM cases
        WHERE client_email ILIKE $1
           OR client_name ILIKE $1
           OR client_phone ILIKE $1
           OR client_phone ILIKE $2
           OR whatsapp_number ILIKE $2
           OR landline_number ILIKE $2
           OR emirates_id ILIKE $1
           OR case_number ILIKE $1
           OR ($3::UUID IS NOT NULL AND client_id = $3)
        ORDER BY created_at DESC
        "#,
    )
    .bind(format!("%{term}%"))
    .bind(format!("%{normalized_phone}%"))
    .bind(client_id)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Most recently registered case of a client.
pub async fn latest_for_client(
    pool: &Pool<Postgres>,
    client_id: Uuid,
) -> Result<Option<Case>, AppError> {
    sqlx::query_as::<_, Case>(
        "SELECT * FROM cases WHERE client_id = $1 ORDER BY created_at DESC LIMIT 1",
    )
    .bind(client_id)
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

// ── Field-by-field updates ──────────────────────────────────────────

/// Body keys that never reach the update.
pub const IGNORED_UPDATE_KEYS: &[&str] = &[
    "trackingRecords",
    "expenses",
    "payments",
    "documents",
    "id",
    "caseNumber",
    "createdAt",
    "updatedAt",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    /// Text column declared NOT NULL.
    RequiredText,
    Date,
    Number,
    /// Numeric column declared NOT NULL; blank becomes 0.
    Amount,
    Flag,
    Json,
    Reference,
}

/// `(wire key, column, kind)` for every updatable case field.
pub const UPDATABLE_FIELDS: &[(&str, &str, FieldKind)] = &[
    ("clientName", "client_name", FieldKind::RequiredText),
    ("clientEmail", "client_email", FieldKind::Text),
    ("clientPhone", "client_phone", FieldKind::Text),
    ("emiratesId", "emirates_id", FieldKind::Text),
    ("nationality", "nationality", FieldKind::Text),
    ("whatsappNumber", "whatsapp_number", FieldKind::Text),
    ("landlineNumber", "landline_number", FieldKind::Text),
    ("companyAddress", "company_address", FieldKind::Text),
    ("companyNumber", "company_number", FieldKind::Text),
    ("companyEmail", "company_email", FieldKind::Text),
    ("occupation", "occupation", FieldKind::Json),
    ("employerName", "employer_name", FieldKind::Text),
    ("employerNumber", "employer_number", FieldKind::Text),
    ("employerAddress", "employer_address", FieldKind::Text),
    ("salary", "salary", FieldKind::Number),
    ("lastDayOfWork", "last_day_of_work", FieldKind::Date),
    ("stillOnDuty", "still_on_duty", FieldKind::Text),
    ("workPeriodStart", "work_period_start", FieldKind::Date),
    ("workPeriodEnd", "work_period_end", FieldKind::Date),
    ("familyMemberName", "family_member_name", FieldKind::Text),
    ("familyMemberNumber", "family_member_number", FieldKind::Text),
    ("friendName", "friend_name", FieldKind::Text),
    ("friendNumber", "friend_number", FieldKind::Text),
    ("caseType", "case_type", FieldKind::Text),
    ("caseCategory", "case_category", FieldKind::Text),
    ("caseSubCategory", "case_sub_category", FieldKind::Text),
    ("emirate", "emirate", FieldKind::Text),
    ("courtArea", "court_area", FieldKind::Text),
    ("description", "description", FieldKind::Text),
    ("urgencyLevel", "urgency_level", FieldKind::RequiredText),
    ("status", "status", FieldKind::RequiredText),
    ("approvalStatus", "approval_status", FieldKind::RequiredText),
    ("hearingDate", "hearing_date", FieldKind::Date),
    ("nextHearingDate", "next_hearing_date", FieldKind::Date),
    ("estimatedCost", "estimated_cost", FieldKind::Amount),
    ("paidAmount", "paid_amount", FieldKind::Amount),
    ("remainingAmount", "remaining_amount", FieldKind::Amount),
    ("notes", "notes", FieldKind::Text),
    ("referenceSource", "reference_source", FieldKind::Text),
    ("referenceOtherDetails", "reference_other_details", FieldKind::Text),
    ("regionGroup", "region_group", FieldKind::Text),
    ("title", "title", FieldKind::Text),
    ("signature", "signature", FieldKind::Text),
    ("jailVisiting", "jail_visiting", FieldKind::Flag),
    ("dateOfEndorsement", "date_of_endorsement", FieldKind::Date),
    ("jailName", "jail_name", FieldKind::Text),
    ("dateOfArrest", "date_of_arrest", FieldKind::Date),
    ("reportNumber", "report_number", FieldKind::Text),
    ("dateOfVisiting", "date_of_visiting", FieldKind::Date),
    ("lawyerId", "lawyer_id", FieldKind::Reference),
    ("counsellorId", "counsellor_id", FieldKind::Reference),
];

/// A typed value ready to bind.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(Option<String>),
    Date(Option<NaiveDate>),
    Number(Option<f64>),
    Flag(bool),
    Json(Option<Value>),
    Reference(Option<Uuid>),
}

/// One detected change. `old`/`new` are the display strings used in the audit trail.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub field: &'static str,
    pub column: &'static str,
    pub old: String,
    pub new: String,
    pub value: FieldValue,
}

/// Null becomes `""`, strings are trimmed, everything else uses its JSON text.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

fn same_day(a: &str, b: &str) -> bool {
    match (parse_date_input(a), parse_date_input(b)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

fn same_amount(a: &str, b: &str) -> bool {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x == y,
        _ => false,
    }
}

fn truthy(shown: &str) -> bool {
    matches!(shown.trim().to_lowercase().as_str(), "true" | "yes" | "1")
}

fn parse_field(field: &str, kind: FieldKind, raw: &Value) -> Result<FieldValue, AppError> {
    let shown = display_value(raw);
    let blank = shown.is_empty();
    let invalid = || AppError::bad_request(format!("Invalid value for {field}"));

    Ok(match kind {
        FieldKind::Text => FieldValue::Text((!blank).then_some(shown)),
        FieldKind::RequiredText => {
            if blank {
                return Err(AppError::bad_request(format!("{field} cannot be empty")));
            }
            FieldValue::Text(Some(shown))
        }
        FieldKind::Date => {
            if blank {
                FieldValue::Date(None)
            } else {
                FieldValue::Date(Some(parse_date_input(&shown).ok_or_else(invalid)?))
            }
        }
        FieldKind::Number | FieldKind::Amount => {
            let parsed = if blank {
                None
            } else {
                Some(shown.parse::<f64>().map_err(|_| invalid())?)
            };
            if kind == FieldKind::Amount {
                FieldValue::Number(Some(parsed.unwrap_or(0.0)))
            } else {
                FieldValue::Number(parsed)
            }
        }
        FieldKind::Flag => FieldValue::Flag(match raw {
            Value::Bool(b) => *b,
            _ => truthy(&shown),
        }),
        FieldKind::Json => FieldValue::Json((!raw.is_null()).then(|| raw.clone())),
        FieldKind::Reference => {
            if blank {
                FieldValue::Reference(None)
            } else {
                FieldValue::Reference(Some(Uuid::parse_str(&shown).map_err(|_| invalid())?))
            }
        }
    })
}

/// Compare a partial update body with the stored case and keep only real changes.
/// Date fields that name the same calendar day are treated as unchanged.
pub fn diff_fields(current: &Case, body: &Map<String, Value>) -> Result<Vec<FieldChange>, AppError> {
    let stored = match serde_json::to_value(current) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };

    let mut changes = Vec::new();
    for (field, column, kind) in UPDATABLE_FIELDS {
        let Some(raw) = body.get(*field) else {
            continue;
        };
        let old = stored.get(*field).map(display_value).unwrap_or_default();
        let new = display_value(raw);
        if old == new {
            continue;
        }
        let equivalent = match kind {
            FieldKind::Date => same_day(&old, &new),
            FieldKind::Number | FieldKind::Amount => same_amount(&old, &new),
            FieldKind::Flag => truthy(&old) == truthy(&new),
            _ => false,
        };
        if equivalent {
            continue;
        }
        let value = parse_field(field, *kind, raw)?;
        changes.push(FieldChange {
            field,
            column,
            old,
            new,
            value,
        });
    }
    Ok(changes)
}

/// Write the detected changes in one statement.
pub async fn apply_changes(
    conn: &mut PgConnection,
    id: Uuid,
    changes: &[FieldChange],
) -> Result<(), AppError> {
    if changes.is_empty() {
        return Ok(());
    }

    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE cases SET ");
    let mut set = qb.separated(", ");
    for change in changes {
        set.push(change.column).push_unseparated(" = ");
        match &change.value {
            FieldValue::Text(v) => set.push_bind_unseparated(v.clone()),
            FieldValue::Date(v) => set.push_bind_unseparated(*v),
            FieldValue::Number(v) => set.push_bind_unseparated(*v),
            FieldValue::Flag(v) => set.push_bind_unseparated(*v),
            FieldValue::Json(v) => set.push_bind_unseparated(v.clone()),
            FieldValue::Reference(v) => set.push_bind_unseparated(*v),
        };
    }
    qb.push(" WHERE id = ").push_bind(id);

    qb.build()
        .execute(conn)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn sample_case() -> Case {
        let now = Utc::now();
        Case {
            id: Uuid::new_v4(),
            case_number: "CASE-2025-0001".into(),
            client_id: Uuid::new_v4(),
            coordinator_id: Uuid::new_v4(),
            counsellor_id: None,
            lawyer_id: None,
            client_name: "Rashid".into(),
            client_email: Some("rashid@example.com".into()),
            client_phone: None,
            emirates_id: None,
            nationality: None,
            whatsapp_number: None,
            landline_number: None,
            company_address: None,
            company_number: None,
            company_email: None,
            occupation: None,
            employer_name: None,
            employer_number: None,
            employer_address: None,
            salary: Some(4000.0),
            last_day_of_work: None,
            still_on_duty: None,
            work_period_start: None,
            work_period_end: None,
            family_member_name: None,
            family_member_number: None,
            friend_name: None,
            friend_number: None,
            case_type: None,
            case_category: None,
            case_sub_category: None,
            emirate: Some("Dubai".into()),
            court_area: None,
            description: None,
            urgency_level: "medium".into(),
            status: "pending".into(),
            approval_status: "pending".into(),
            registration_date: now,
            hearing_date: NaiveDate::from_ymd_opt(2025, 5, 20),
            next_hearing_date: None,
            closed_date: None,
            estimated_cost: 1000.0,
            paid_amount: 0.0,
            remaining_amount: 1000.0,
            notes: None,
            reference_source: None,
            reference_other_details: None,
            region_group: None,
            title: None,
            signature: None,
            jail_visiting: false,
            date_of_endorsement: None,
            jail_name: None,
            date_of_arrest: None,
            report_number: None,
            date_of_visiting: None,
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn body(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => Map::new(),
        }
    }

    #[test]
    fn unchanged_and_trimmed_values_are_skipped() {
        let case = sample_case();
        let changes = diff_fields(
            &case,
            &body(json!({"clientName": " Rashid ", "emirate": "Dubai", "notes": null})),
        )
        .unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn same_calendar_day_is_not_a_change() {
        let case = sample_case();
        let changes =
            diff_fields(&case, &body(json!({"hearingDate": "2025-05-20T00:00:00.000Z"}))).unwrap();
        assert!(changes.is_empty());

        let changes = diff_fields(&case, &body(json!({"hearingDate": "2025-05-21"}))).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].old, "2025-05-20");
        assert_eq!(changes[0].new, "2025-05-21");
        assert_eq!(
            changes[0].value,
            FieldValue::Date(NaiveDate::from_ymd_opt(2025, 5, 21))
        );
    }

    #[test]
    fn numbers_compare_by_text_and_parse_strings() {
        let case = sample_case();
        let changes = diff_fields(&case, &body(json!({"estimatedCost": 1000}))).unwrap();
        assert!(changes.is_empty());

        let changes = diff_fields(&case, &body(json!({"estimatedCost": "2500"}))).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].column, "estimated_cost");
        assert_eq!(changes[0].value, FieldValue::Number(Some(2500.0)));
    }

    #[test]
    fn flags_compare_by_truth_value() {
        let case = sample_case();
        for same in [json!("No"), json!("no"), json!(false), json!("0"), json!("false")] {
            let changes = diff_fields(&case, &body(json!({"jailVisiting": same}))).unwrap();
            assert!(changes.is_empty(), "{same} should match a stored false");
        }

        let changes = diff_fields(&case, &body(json!({"jailVisiting": "Yes"}))).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].old, "false");
        assert_eq!(changes[0].value, FieldValue::Flag(true));
    }

    #[test]
    fn unknown_and_ignored_keys_do_nothing() {
        let case = sample_case();
        let changes = diff_fields(
            &case,
            &body(json!({"caseNumber": "X", "favouriteColour": "blue", "id": "abc"})),
        )
        .unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn required_text_cannot_be_blanked() {
        let case = sample_case();
        let err = diff_fields(&case, &body(json!({"status": ""}))).unwrap_err();
        assert_eq!(err.status_code_u16(), 400);
    }

    #[test]
    fn clearing_an_optional_field_records_empty_new_value() {
        let case = sample_case();
        let changes = diff_fields(&case, &body(json!({"clientEmail": null}))).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].new, "");
        assert_eq!(changes[0].value, FieldValue::Text(None));
    }

    #[test]
    fn bad_reference_is_rejected() {
        let case = sample_case();
        assert!(diff_fields(&case, &body(json!({"lawyerId": "not-a-uuid"}))).is_err());
    }
}
