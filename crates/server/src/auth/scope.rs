//! Emirate scoping for coordinators and counsellors.

use serde_json::Value;
use shared_types::AppError;

use super::CurrentUser;

/// Matches no real emirate; used when a scoped user has no usable assignment.
pub const NO_EMIRATE_SENTINEL: &str = "__NONE__";

fn assigned(user: &CurrentUser) -> Vec<String> {
    user.user
        .emirate_list()
        .unwrap_or_default()
        .into_iter()
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .collect()
}

pub fn has_emirate_access(user: &CurrentUser, emirate: &str) -> bool {
    if !user.role.is_emirate_scoped() {
        return true;
    }
    let wanted = emirate.trim();
    assigned(user).iter().any(|e| e.eq_ignore_ascii_case(wanted))
}

/// `None` means unrestricted. Otherwise the emirates a query must be limited to.
pub fn emirate_filter(user: &CurrentUser) -> Option<Vec<String>> {
    if !user.role.is_emirate_scoped() {
        return None;
    }
    let list = assigned(user);
    if list.is_empty() {
        Some(vec![NO_EMIRATE_SENTINEL.to_string()])
    } else {
        Some(list)
    }
}

pub fn check_emirate_access(user: &CurrentUser, emirate: Option<&str>) -> Result<(), AppError> {
    let emirate = match emirate.map(str::trim) {
        Some(e) if !e.is_empty() => e,
        _ => return Err(AppError::bad_request("Emirate is required.")),
    };
    if has_emirate_access(user, emirate) {
        return Ok(());
    }
    let yours: Vec<Value> = assigned(user).into_iter().map(Value::from).collect();
    Err(
        AppError::forbidden(format!("You do not have access to {emirate}."))
            .with_detail("yourEmirates", yours),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::test_support::user_with_role;
    use serde_json::json;
    use shared_types::Role;

    fn coordinator(emirates: Value) -> CurrentUser {
        let mut u = user_with_role(Role::Coordinator);
        u.user.assigned_emirates = emirates;
        u
    }

    #[test]
    fn unscoped_roles_always_pass() {
        for role in [Role::SuperAdmin, Role::Lawyer, Role::Client] {
            let u = user_with_role(role);
            assert!(has_emirate_access(&u, "Dubai"));
            assert_eq!(emirate_filter(&u), None);
        }
    }

    #[test]
    fn comparison_is_trimmed_and_case_insensitive() {
        let u = coordinator(json!([" dubai ", "Sharjah"]));
        assert!(has_emirate_access(&u, "Dubai"));
        assert!(has_emirate_access(&u, "SHARJAH "));
        assert!(!has_emirate_access(&u, "Ajman"));
    }

    #[test]
    fn empty_or_invalid_list_yields_sentinel() {
        let u = coordinator(json!([]));
        assert!(!has_emirate_access(&u, "Dubai"));
        assert_eq!(emirate_filter(&u), Some(vec!["__NONE__".to_string()]));

        let u = coordinator(json!({"not": "a list"}));
        assert_eq!(emirate_filter(&u), Some(vec!["__NONE__".to_string()]));
    }

    #[test]
    fn json_string_list_is_accepted() {
        let u = coordinator(json!("[\"Fujairah\"]"));
        assert!(has_emirate_access(&u, "Fujairah"));
        assert_eq!(emirate_filter(&u), Some(vec!["Fujairah".to_string()]));
    }

    #[test]
    fn check_reports_required_and_forbidden() {
        let u = coordinator(json!(["Dubai"]));
        let err = check_emirate_access(&u, None).unwrap_err();
        assert_eq!(err.status_code_u16(), 400);
        assert_eq!(err.message, "Emirate is required.");

        let err = check_emirate_access(&u, Some("Ajman")).unwrap_err();
        assert_eq!(err.status_code_u16(), 403);
        assert_eq!(err.message, "You do not have access to Ajman.");
        assert_eq!(err.details["yourEmirates"], json!(["Dubai"]));

        assert!(check_emirate_access(&u, Some("dubai")).is_ok());
    }
}
