use axum::{
    extract::DefaultBodyLimit,
    http::{Method, Uri},
    routing::get,
    Router,
};
use shared_types::{
    // Errors and envelopes
    AppError, AppErrorKind, ErrorResponse, FieldError, ImportResults, MessageResponse, Pagination,
    UserSummary,
    // Auth
    AuthSession, EmailRequest, LoginOutcome, LoginRequest, NewPassword, OtpRequest,
    OtpSessionCreated, OtpVerifyRequest, PasswordReset, PendingResetView, RefreshRequest,
    RefreshedToken, RegisterRequest, RegisteredUser, RejectResetRequest, ResetPasswordRequest,
    TwoFactorConfirmRequest, TwoFactorLoginRequest, TwoFactorSetup,
    // Users
    AdminResetPasswordRequest, AssignEmiratesRequest, ChangePasswordRequest, ClientImportResults,
    ClientProfile, CreateUserRequest, CreatedUser, LawyerCaseStats, LawyerSummary, Role,
    UpdateUserRequest, UserPage, UserResponse,
    // Cases
    AddNoteRequest, AssignLawyerRequest, Case, CaseBrief, CaseExpense, CasePage,
    CasePaymentRequest, CaseStatusRequest, CaseTracking, CaseView, ClientLookup,
    ClientSearchResult, ExpenseRequest, RegisterCaseRequest, RegisteredCase, TrackingEntryRequest,
    TrackingView,
    // Documents, consultations, payments, notifications
    Consultation, CreateConsultationRequest, CreatePaymentRequest, Document, DocumentUploadForm,
    DocumentView, Notification, NotificationResult, Payment, SendEmailRequest, SendTextRequest,
    UpdateConsultationRequest,
    // Settings and subscriptions
    Setting, SubscribeRequest, Subscription, UnsubscribeRequest, UpsertSettingRequest,
    // Dashboards
    ClientCaseCard, ClientDashboard, CoordinatorDashboard, CounsellorDashboard, LawyerContact,
    LawyerDashboard, SuperAdminDashboard,
    // Taxonomy and occupations
    CascadeDeleted, CaseCategory, CaseSubCategory, CaseType, CaseTypeExport, CaseTypeRef,
    CaseTypeRequest, CaseTypeTree, CategoryExport, CategoryRef, CategoryRequest, CategoryView,
    CategoryWithSubs, OccupationSubType, OccupationSubTypeRequest, OccupationSubTypeView,
    OccupationType, OccupationTypeRef, OccupationTypeRequest, OccupationTypeTree,
    SubCategoryExport, SubCategoryRequest, SubCategoryView,
    // Detention facilities
    CreateJailVisitRequest, EmirateCount, FacilityRef, ImportItemError, Jail, JailList,
    JailRequest, JailView, JailVisit, JailVisitList, JailVisitView, PoliceStation,
    PoliceStationExport, PoliceStationImportRequest, PoliceStationList, PoliceStationRequest,
    PoliceStationStats, PoliceStationWithJails, ReviewRequest, StationImportResults,
    // Quotations, messages, inquiries
    CaseInquiry, ClientCaseLine, CourtQuotation, CreateMessageRequest, CreateQuotationRequest,
    InquiryDocument, InquiryForm, InquiryStatusRequest, InquiryUploadForm, Message,
    MessageClient, MessageStatusRequest, MessageView, QuotationView, ReplyRequest, UnreadCount,
};
use sqlx::{Pool, Postgres};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::{
    auth::auth_middleware,
    db::AppState,
    health,
    rate_limit::{rate_limit_middleware, RateLimitState},
    rest,
    storage::DocumentStore,
    telemetry::OtelTraceLayer,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Auth
        rest::auth::login,
        rest::auth::two_factor_setup,
        rest::auth::two_factor_confirm,
        rest::auth::two_factor_verify_login,
        rest::auth::register,
        rest::auth::request_otp,
        rest::auth::verify_otp,
        rest::auth::refresh,
        rest::auth::forgot_password,
        rest::auth::reset_password,
        rest::auth::logout,
        rest::auth::request_reset,
        rest::auth::pending_resets,
        rest::auth::approve_reset,
        rest::auth::reject_reset,
        // Users
        rest::user::list_lawyers,
        rest::user::case_statistics,
        rest::user::create_user,
        rest::user::list_users,
        rest::user::get_user,
        rest::user::update_user,
        rest::user::delete_user,
        rest::user::admin_reset_password,
        rest::user::assign_emirates,
        rest::user::change_password,
        rest::user::import_clients,
        // Cases
        rest::case::search_client,
        rest::case::register_case,
        rest::case::list_cases,
        rest::case::get_case,
        rest::case::update_case,
        rest::case::delete_case,
        rest::case::assign_lawyer,
        rest::case::update_status,
        rest::case::add_note,
        rest::case_tracking::list_tracking,
        rest::case_tracking::add_tracking,
        rest::case_tracking::update_tracking,
        rest::case_tracking::delete_tracking,
        rest::case_expense::list_expenses,
        rest::case_expense::add_expense,
        rest::case_expense::update_expense,
        rest::case_expense::delete_expense,
        rest::case_payment::list_case_payments,
        rest::case_payment::add_case_payment,
        rest::case_payment::update_case_payment,
        rest::case_payment::delete_case_payment,
        // Documents
        rest::document::upload_document,
        rest::document::list_case_documents,
        rest::document::delete_document,
        // Consultations and payments
        rest::consultation::create_consultation,
        rest::consultation::list_consultations,
        rest::consultation::update_consultation,
        rest::payment::create_payment,
        rest::payment::list_payments,
        rest::payment::list_payments_for_case,
        // Notifications
        rest::notification::send_sms,
        rest::notification::send_whatsapp,
        rest::notification::send_email,
        // Settings and subscriptions
        rest::setting::list_settings,
        rest::setting::get_setting,
        rest::setting::put_setting,
        rest::subscription::subscribe,
        rest::subscription::unsubscribe,
        rest::subscription::list_subscriptions,
        // Dashboards
        rest::dashboard::super_admin,
        rest::dashboard::coordinator,
        rest::dashboard::lawyer,
        rest::dashboard::counsellor,
        rest::dashboard::client,
        // Case taxonomy
        rest::taxonomy::create_case_type,
        rest::taxonomy::list_case_types,
        rest::taxonomy::get_case_type,
        rest::taxonomy::update_case_type,
        rest::taxonomy::delete_case_type,
        rest::taxonomy::create_category,
        rest::taxonomy::list_categories,
        rest::taxonomy::categories_by_type,
        rest::taxonomy::update_category,
        rest::taxonomy::delete_category,
        rest::taxonomy::create_sub_category,
        rest::taxonomy::list_sub_categories,
        rest::taxonomy::sub_categories_by_category,
        rest::taxonomy::update_sub_category,
        rest::taxonomy::delete_sub_category,
        rest::taxonomy::export_case_types,
        rest::taxonomy::export_categories,
        rest::taxonomy::export_sub_categories,
        rest::taxonomy::import_case_types,
        rest::taxonomy::import_categories,
        rest::taxonomy::import_sub_categories,
        // Work occupations
        rest::occupation::create_type,
        rest::occupation::list_types,
        rest::occupation::update_type,
        rest::occupation::delete_type,
        rest::occupation::create_sub_type,
        rest::occupation::list_sub_types,
        rest::occupation::sub_types_by_type,
        rest::occupation::update_sub_type,
        rest::occupation::delete_sub_type,
        // Detention facilities
        rest::police_station::create_station,
        rest::police_station::list_stations,
        rest::police_station::get_station,
        rest::police_station::update_station,
        rest::police_station::delete_station,
        rest::police_station::station_stats,
        rest::police_station::export_stations,
        rest::police_station::import_stations,
        rest::jail::create_jail,
        rest::jail::list_jails,
        rest::jail::get_jail,
        rest::jail::update_jail,
        rest::jail::delete_jail,
        rest::jail_visit::create_visit,
        rest::jail_visit::list_visits,
        rest::jail_visit::get_visit,
        rest::jail_visit::review_visit,
        rest::jail_visit::delete_visit,
        // Court quotations
        rest::quotation::create_quotation,
        rest::quotation::list_quotations,
        rest::quotation::get_quotation,
        rest::quotation::review_quotation,
        rest::quotation::delete_quotation,
        // Client messages
        rest::message::create_message,
        rest::message::list_messages,
        rest::message::unread_count,
        rest::message::get_message,
        rest::message::reply_message,
        rest::message::update_message_status,
        rest::message::delete_message,
        // Public case inquiries
        rest::inquiry::create_inquiry,
        rest::inquiry::list_inquiries,
        rest::inquiry::update_inquiry_status,
        rest::inquiry::delete_inquiry,
        health::health_check,
    ),
    components(schemas(
        AppErrorKind, ErrorResponse, FieldError, ImportResults, MessageResponse,
        Pagination, UserSummary,
        AuthSession, EmailRequest, LoginOutcome, LoginRequest, NewPassword, OtpRequest,
        OtpSessionCreated, OtpVerifyRequest, PasswordReset, PendingResetView, RefreshRequest,
        RefreshedToken, RegisterRequest, RegisteredUser, RejectResetRequest, ResetPasswordRequest,
        TwoFactorConfirmRequest, TwoFactorLoginRequest, TwoFactorSetup,
        AdminResetPasswordRequest, AssignEmiratesRequest, ChangePasswordRequest,
        ClientImportResults, ClientProfile, CreateUserRequest, CreatedUser, LawyerCaseStats,
        LawyerSummary, Role, UpdateUserRequest, UserPage, UserResponse,
        AddNoteRequest, AssignLawyerRequest, Case, CaseBrief, CaseExpense, CasePage,
        CasePaymentRequest, CaseStatusRequest, CaseTracking, CaseView, ClientLookup,
        ClientSearchResult, ExpenseRequest, RegisterCaseRequest, RegisteredCase,
        TrackingEntryRequest, TrackingView,
        Consultation, CreateConsultationRequest, CreatePaymentRequest, Document,
        DocumentUploadForm, DocumentView, Notification, NotificationResult, Payment,
        SendEmailRequest, SendTextRequest, UpdateConsultationRequest,
        Setting, SubscribeRequest, Subscription, UnsubscribeRequest, UpsertSettingRequest,
        ClientCaseCard, ClientDashboard, CoordinatorDashboard, CounsellorDashboard,
        LawyerContact, LawyerDashboard, SuperAdminDashboard,
        CascadeDeleted, CaseCategory, CaseSubCategory, CaseType, CaseTypeExport, CaseTypeRef,
        CaseTypeRequest, CaseTypeTree, CategoryExport, CategoryRef, CategoryRequest,
        CategoryView, CategoryWithSubs, OccupationSubType, OccupationSubTypeRequest,
        OccupationSubTypeView, OccupationType, OccupationTypeRef, OccupationTypeRequest,
        OccupationTypeTree, SubCategoryExport, SubCategoryRequest, SubCategoryView,
        CreateJailVisitRequest, EmirateCount, FacilityRef, ImportItemError, Jail, JailList,
        JailRequest, JailView, JailVisit, JailVisitList, JailVisitView, PoliceStation,
        PoliceStationExport, PoliceStationImportRequest, PoliceStationList,
        PoliceStationRequest, PoliceStationStats, PoliceStationWithJails, ReviewRequest,
        StationImportResults,
        CaseInquiry, ClientCaseLine, CourtQuotation, CreateMessageRequest,
        CreateQuotationRequest, InquiryDocument, InquiryForm, InquiryStatusRequest,
        InquiryUploadForm, Message, MessageClient, MessageStatusRequest, MessageView,
        QuotationView, ReplyRequest, UnreadCount,
        health::HealthResponse,
    )),
    tags(
        (name = "auth", description = "Login, two-factor, OTP and password reset"),
        (name = "users", description = "User administration and client import"),
        (name = "cases", description = "Case registration, assignment and status"),
        (name = "case-tracking", description = "Case progress timeline"),
        (name = "case-expenses", description = "Expenses recorded against a case"),
        (name = "case-payments", description = "Fee payments recorded against a case"),
        (name = "documents", description = "Case document uploads"),
        (name = "consultations", description = "Consultation scheduling"),
        (name = "payments", description = "Payment records"),
        (name = "notifications", description = "SMS, WhatsApp and email delivery"),
        (name = "settings", description = "Key/value application settings"),
        (name = "subscriptions", description = "Newsletter subscriptions"),
        (name = "dashboard", description = "Per-role dashboard statistics"),
        (name = "case-taxonomy", description = "Case types, categories and sub-categories"),
        (name = "work-occupations", description = "Client occupation reference data"),
        (name = "police-stations", description = "Police station directory"),
        (name = "jails", description = "Jail directory"),
        (name = "jail-visits", description = "Jail visit requests"),
        (name = "court-quotations", description = "Court fee quotations"),
        (name = "messages", description = "Client to staff messages"),
        (name = "case-inquiries", description = "Public case inquiry form"),
        (name = "health", description = "Health check endpoint")
    ),
    info(
        title = "ELSY API",
        description = "Legal Case Management System API",
        version = "1.0.0"
    )
)]
pub struct ApiDoc;

/// Largest accepted request body: a full inquiry upload plus form fields.
fn max_body_bytes() -> usize {
    std::env::var("MAX_REQUEST_BYTES")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(shared_types::MAX_UPLOAD_BYTES * shared_types::MAX_INQUIRY_FILES + 1024 * 1024)
}

async fn route_not_found(method: Method, uri: Uri) -> AppError {
    AppError::not_found(format!("Route {method} {} not found", uri.path()))
}

/// Build the application router from a pool and document store.
pub fn api_router(pool: Pool<Postgres>, store: DocumentStore) -> Router {
    api_router_with(AppState::new(pool, store))
}

/// Assemble every route, the docs UI and the middleware stack around `state`.
///
/// Layers run outermost first: request id, auth, body limit, then the
/// optional OpenTelemetry span.
pub fn api_router_with(state: AppState) -> Router {
    api_router_with_rate_limit(state, RateLimitState::for_auth_from_env())
}

/// Same as [`api_router_with`] with an explicit limiter for the login and reset routes.
pub fn api_router_with_rate_limit(state: AppState, rate_limit: RateLimitState) -> Router {
    let flags = crate::config::feature_flags();

    let limited = rest::limited_auth_router()
        .layer(axum::middleware::from_fn_with_state(rate_limit, rate_limit_middleware));

    let mut router = Router::new()
        .merge(limited)
        .merge(rest::api_router())
        .route("/health", get(health::health_check))
        .fallback(route_not_found);

    if let DocumentStore::Local(local) = &state.store {
        router = router.nest_service("/uploads", ServeDir::new(local.root()));
    }

    let mut router = router
        .with_state(state.clone())
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    if flags.telemetry {
        router = router.layer(OtelTraceLayer);
    }

    router
        .layer(DefaultBodyLimit::max(max_body_bytes()))
        .layer(axum::middleware::from_fn_with_state(state, auth_middleware))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
