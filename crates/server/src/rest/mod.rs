pub mod auth;
pub mod case;
pub mod case_expense;
pub mod case_payment;
pub mod case_tracking;
pub mod consultation;
pub mod dashboard;
pub mod document;
pub mod import;
pub mod inquiry;
pub mod jail;
pub mod jail_visit;
pub mod message;
pub mod notification;
pub mod occupation;
pub mod payment;
pub mod police_station;
pub mod quotation;
pub mod setting;
pub mod subscription;
pub mod taxonomy;
pub mod upload;
pub mod user;

use axum::{routing::{delete, get, post, put}, Router};
use crate::db::AppState;

/// Auth endpoints that sit behind the per-IP rate limiter.
pub fn limited_auth_router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/2fa/verify-login", post(auth::two_factor_verify_login))
        .route("/api/auth/otp/request", post(auth::request_otp))
        .route("/api/auth/otp/verify", post(auth::verify_otp))
        .route("/api/auth/forgot-password", post(auth::forgot_password))
        .route("/api/auth/reset-password", post(auth::reset_password))
        .route("/api/auth/request-reset", post(auth::request_reset))
}

/// Build the combined REST API router.
pub fn api_router() -> Router<AppState> {
    Router::new()
        // Auth
        .route("/api/auth/2fa/setup", post(auth::two_factor_setup))
        .route("/api/auth/2fa/confirm", post(auth::two_factor_confirm))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/refresh", post(auth::refresh))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/pending-resets", get(auth::pending_resets))
        .route("/api/auth/pending-resets/{id}/approve", put(auth::approve_reset))
        .route("/api/auth/pending-resets/{id}/reject", put(auth::reject_reset))
        // Users
        .route("/api/users", get(user::list_users).post(user::create_user))
        .route("/api/users/lawyers", get(user::list_lawyers))
        .route("/api/users/case-statistics", get(user::case_statistics))
        .route("/api/users/change-password", post(user::change_password))
        .route("/api/users/import", post(user::import_clients))
        .route(
            "/api/users/{id}",
            get(user::get_user).put(user::update_user).delete(user::delete_user),
        )
        .route("/api/users/{id}/reset-password", post(user::admin_reset_password))
        .route("/api/users/{id}/emirates", put(user::assign_emirates))
        // Cases
        .route("/api/cases", get(case::list_cases).post(case::register_case))
        .route("/api/cases/search-client", get(case::search_client))
        .route(
            "/api/cases/{id}",
            get(case::get_case).put(case::update_case).delete(case::delete_case),
        )
        .route("/api/cases/{id}/assign-lawyer", put(case::assign_lawyer))
        .route("/api/cases/{id}/status", put(case::update_status))
        .route("/api/cases/{id}/notes", post(case::add_note))
        // Case ledger: tracking, expenses, payments
        .route(
            "/api/cases/{case_id}/tracking",
            get(case_tracking::list_tracking).post(case_tracking::add_tracking),
        )
        .route(
            "/api/cases/{case_id}/tracking/{id}",
            put(case_tracking::update_tracking).delete(case_tracking::delete_tracking),
        )
        .route(
            "/api/cases/{case_id}/expenses",
            get(case_expense::list_expenses).post(case_expense::add_expense),
        )
        .route(
            "/api/cases/{case_id}/expenses/{id}",
            put(case_expense::update_expense).delete(case_expense::delete_expense),
        )
        .route(
            "/api/cases/{case_id}/payments",
            get(case_payment::list_case_payments).post(case_payment::add_case_payment),
        )
        .route(
            "/api/cases/{case_id}/payments/{id}",
            put(case_payment::update_case_payment).delete(case_payment::delete_case_payment),
        )
        // Documents
        .route("/api/documents/upload", post(document::upload_document))
        .route("/api/documents/case/{case_id}", get(document::list_case_documents))
        .route("/api/documents/{id}", delete(document::delete_document))
        // Consultations and payments
        .route(
            "/api/consultations",
            get(consultation::list_consultations).post(consultation::create_consultation),
        )
        .route("/api/consultations/{id}", put(consultation::update_consultation))
        .route("/api/payments", get(payment::list_payments).post(payment::create_payment))
        .route("/api/payments/case/{case_id}", get(payment::list_payments_for_case))
        // Notifications
        .route("/api/notifications/sms", post(notification::send_sms))
        .route("/api/notifications/whatsapp", post(notification::send_whatsapp))
        .route("/api/notifications/email", post(notification::send_email))
        // Settings and subscriptions
        .route("/api/settings", get(setting::list_settings))
        .route("/api/settings/{key}", get(setting::get_setting).put(setting::put_setting))
        .route("/api/subscriptions", get(subscription::list_subscriptions))
        .route("/api/subscriptions/subscribe", post(subscription::subscribe))
        .route("/api/subscriptions/unsubscribe", post(subscription::unsubscribe))
        // Dashboards
        .route("/api/dashboard/super-admin", get(dashboard::super_admin))
        .route("/api/dashboard/coordinator", get(dashboard::coordinator))
        .route("/api/dashboard/lawyer", get(dashboard::lawyer))
        .route("/api/dashboard/counsellor", get(dashboard::counsellor))
        .route("/api/dashboard/client", get(dashboard::client))
        // Case taxonomy
        .route(
            "/api/case-types",
            get(taxonomy::list_case_types).post(taxonomy::create_case_type),
        )
        .route(
            "/api/case-types/{id}",
            get(taxonomy::get_case_type)
                .put(taxonomy::update_case_type)
                .delete(taxonomy::delete_case_type),
        )
        .route(
            "/api/case-categories",
            get(taxonomy::list_categories).post(taxonomy::create_category),
        )
        .route(
            "/api/case-categories/by-type/{case_type_id}",
            get(taxonomy::categories_by_type),
        )
        .route(
            "/api/case-categories/{id}",
            put(taxonomy::update_category).delete(taxonomy::delete_category),
        )
        .route(
            "/api/case-sub-categories",
            get(taxonomy::list_sub_categories).post(taxonomy::create_sub_category),
        )
        .route(
            "/api/case-sub-categories/by-category/{category_id}",
            get(taxonomy::sub_categories_by_category),
        )
        .route(
            "/api/case-sub-categories/{id}",
            put(taxonomy::update_sub_category).delete(taxonomy::delete_sub_category),
        )
        .route("/api/export/CaseTypes", get(taxonomy::export_case_types))
        .route("/api/export/CaseCategories", get(taxonomy::export_categories))
        .route("/api/export/CaseSubCategories", get(taxonomy::export_sub_categories))
        .route("/api/import/CaseTypes", post(taxonomy::import_case_types))
        .route("/api/import/CaseCategories", post(taxonomy::import_categories))
        .route("/api/import/CaseSubCategories", post(taxonomy::import_sub_categories))
        // Work occupations
        .route(
            "/api/work-occupations/types",
            get(occupation::list_types).post(occupation::create_type),
        )
        .route(
            "/api/work-occupations/types/{id}",
            put(occupation::update_type).delete(occupation::delete_type),
        )
        .route(
            "/api/work-occupations/sub-types",
            get(occupation::list_sub_types).post(occupation::create_sub_type),
        )
        .route(
            "/api/work-occupations/sub-types/by-type/{type_id}",
            get(occupation::sub_types_by_type),
        )
        .route(
            "/api/work-occupations/sub-types/{id}",
            put(occupation::update_sub_type).delete(occupation::delete_sub_type),
        )
        // Detention facilities
        .route(
            "/api/police-stations",
            get(police_station::list_stations).post(police_station::create_station),
        )
        .route("/api/police-stations/stats/overview", get(police_station::station_stats))
        .route("/api/police-stations/export", get(police_station::export_stations))
        .route("/api/police-stations/import", post(police_station::import_stations))
        .route(
            "/api/police-stations/{id}",
            get(police_station::get_station)
                .put(police_station::update_station)
                .delete(police_station::delete_station),
        )
        .route("/api/jails", get(jail::list_jails).post(jail::create_jail))
        .route(
            "/api/jails/{id}",
            get(jail::get_jail).put(jail::update_jail).delete(jail::delete_jail),
        )
        .route(
            "/api/jail-visits",
            get(jail_visit::list_visits).post(jail_visit::create_visit),
        )
        .route(
            "/api/jail-visits/{id}",
            get(jail_visit::get_visit).delete(jail_visit::delete_visit),
        )
        .route("/api/jail-visits/{id}/status", put(jail_visit::review_visit))
        // Court quotations
        .route(
            "/api/court-quotations",
            get(quotation::list_quotations).post(quotation::create_quotation),
        )
        .route(
            "/api/court-quotations/{id}",
            get(quotation::get_quotation).delete(quotation::delete_quotation),
        )
        .route("/api/court-quotations/{id}/status", put(quotation::review_quotation))
        // Client messages
        .route("/api/messages", get(message::list_messages).post(message::create_message))
        .route("/api/messages/unread-count", get(message::unread_count))
        .route(
            "/api/messages/{id}",
            get(message::get_message).delete(message::delete_message),
        )
        .route("/api/messages/{id}/reply", post(message::reply_message))
        .route("/api/messages/{id}/status", put(message::update_message_status))
        // Public case inquiries
        .route(
            "/api/case-inquiries",
            get(inquiry::list_inquiries).post(inquiry::create_inquiry),
        )
        .route("/api/case-inquiries/{id}/status", put(inquiry::update_inquiry_status))
        .route("/api/case-inquiries/{id}", delete(inquiry::delete_inquiry))
}
