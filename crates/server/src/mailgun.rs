//! Mailgun HTTP client plus the branded email templates.

use crate::config::{app_base_url, app_name, feature_flags};

fn env_required(name: &str) -> Result<String, String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| format!("{name} is not configured"))
}

fn mailgun_from(domain: &str) -> String {
    std::env::var("MAILGUN_FROM")
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| format!("{} <noreply@{}>", app_name(), domain))
}

#[tracing::instrument(skip(html))]
pub async fn send_email(to: &str, subject: &str, html: &str) -> Result<(), String> {
    if !feature_flags().mailgun {
        return Err("Mailgun integration is disabled".to_string());
    }
    let domain = env_required("MAILGUN_DOMAIN")?;
    let api_key = env_required("MAILGUN_API_KEY")?;
    let url = format!("https://api.mailgun.net/v3/{domain}/messages");

    let response = reqwest::Client::new()
        .post(&url)
        .basic_auth("api", Some(api_key))
        .form(&[
            ("from", mailgun_from(&domain).as_str()),
            ("to", to),
            ("subject", subject),
            ("html", html),
        ])
        .send()
        .await
        .map_err(|e| format!("Mailgun request failed: {e}"))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(format!("Mailgun API error ({status}): {body}"));
    }

    tracing::info!(to, subject, "Email sent");
    Ok(())
}

/// Send and report success as a bool; failures are logged, never propagated.
pub async fn try_send(to: &str, subject: &str, html: &str) -> bool {
    match send_email(to, subject, html).await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(error = %e, to, subject, "Failed to send email");
            false
        }
    }
}

pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Wrap body HTML in the branded layout.
pub fn wrap_html(content: &str) -> String {
    let name = escape_html(&app_name());
    format!(
        r#"<!DOCTYPE html>
<html>
<body style="margin:0;padding:0;background:#f4f5f7;font-family:Arial,Helvetica,sans-serif;">
  <table width="100%" cellpadding="0" cellspacing="0" style="padding:24px 0;">
    <tr><td align="center">
      <table width="600" cellpadding="0" cellspacing="0" style="background:#ffffff;border-radius:8px;">
        <tr><td style="background:#1b2a4a;color:#ffffff;padding:20px 32px;font-size:20px;font-weight:bold;">{name}</td></tr>
        <tr><td style="padding:32px;color:#333333;font-size:15px;line-height:1.6;">{content}</td></tr>
        <tr><td style="padding:16px 32px;color:#888888;font-size:12px;border-top:1px solid #eeeeee;">This is an automated message from {name}. Please do not reply.</td></tr>
      </table>
    </td></tr>
  </table>
</body>
</html>"#
    )
}

pub mod templates {
    use super::{app_base_url, app_name, escape_html, wrap_html};

    fn credentials_block(email: &str, password: &str) -> String {
        format!(
            r#"<p style="background:#f4f5f7;padding:16px;border-radius:6px;">
<strong>Email:</strong> {}<br><strong>Password:</strong> {}</p>"#,
            escape_html(email),
            escape_html(password)
        )
    }

    /// Account created by staff or during case registration.
    pub fn welcome_credentials(name: &str, email: &str, password: &str) -> (String, String) {
        let subject = format!("Welcome to {}", app_name());
        let body = format!(
            r#"<p>Dear {},</p>
<p>An account has been created for you. You can sign in with the credentials below.</p>
{}
<p><a href="{}/login">Sign in</a> and change your password after your first login.</p>"#,
            escape_html(name),
            credentials_block(email, password),
            app_base_url()
        );
        (subject, wrap_html(&body))
    }

    pub fn password_reset_link(name: &str, token: &str) -> (String, String) {
        let link = format!("{}/reset-password?token={}", app_base_url(), token);
        let body = format!(
            r#"<p>Dear {},</p>
<p>We received a request to reset your password. The link below is valid for one hour.</p>
<p><a href="{link}">{link}</a></p>
<p>If you did not request this, you can ignore this email.</p>"#,
            escape_html(name)
        );
        ("Reset your password".to_string(), wrap_html(&body))
    }

    /// Password issued after an administrator approved a reset request.
    pub fn approved_new_password(name: &str, email: &str, password: &str) -> (String, String) {
        let body = format!(
            r#"<p>Dear {},</p>
<p>Your password reset request has been approved. Your new credentials are:</p>
{}
<p>Please change this password after signing in.</p>"#,
            escape_html(name),
            credentials_block(email, password)
        );
        ("Your password has been reset".to_string(), wrap_html(&body))
    }

    pub fn imported_client_credentials(
        name: &str,
        email: &str,
        password: &str,
        client_number: &str,
    ) -> (String, String) {
        let subject = format!("Your {} client account", app_name());
        let body = format!(
            r#"<p>Dear {},</p>
<p>Your client account has been set up. Your client number is <strong>{}</strong>.</p>
{}
<p><a href="{}/login">Sign in</a> to follow your cases.</p>"#,
            escape_html(name),
            escape_html(client_number),
            credentials_block(email, password),
            app_base_url()
        );
        (subject, wrap_html(&body))
    }
}
