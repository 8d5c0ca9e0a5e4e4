//! Thin Twilio Messages API client for SMS and WhatsApp.

use serde::Deserialize;

use crate::config::feature_flags;

fn env_required(name: &str) -> Result<String, String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| format!("{name} is not configured"))
}

#[derive(Deserialize)]
struct MessageCreated {
    sid: String,
}

/// `whatsapp:`-prefix a number unless it already is.
pub fn whatsapp_address(number: &str) -> String {
    if number.starts_with("whatsapp:") {
        number.to_string()
    } else {
        format!("whatsapp:{number}")
    }
}

pub fn otp_message(otp: &str) -> String {
    format!("Your ELSY verification code is: {otp}. Valid for 10 minutes.")
}

async fn create_message(from: &str, to: &str, body: &str) -> Result<String, String> {
    if !feature_flags().twilio {
        return Err("Twilio integration is disabled".to_string());
    }
    let sid = env_required("TWILIO_ACCOUNT_SID")?;
    let auth_token = env_required("TWILIO_AUTH_TOKEN")?;

    let url = format!("https://api.twilio.com/2010-04-01/Accounts/{sid}/Messages.json");
    let response = reqwest::Client::new()
        .post(&url)
        .basic_auth(&sid, Some(&auth_token))
        .form(&[("From", from), ("To", to), ("Body", body)])
        .send()
        .await
        .map_err(|e| format!("Twilio request failed: {e}"))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(format!("Twilio API error ({status}): {body}"));
    }

    response
        .json::<MessageCreated>()
        .await
        .map(|m| m.sid)
        .map_err(|e| format!("Unexpected Twilio response: {e}"))
}

/// Send an SMS. Returns the Twilio message SID.
#[tracing::instrument(skip(body))]
pub async fn send_sms(to: &str, body: &str) -> Result<String, String> {
    let from = env_required("TWILIO_FROM_NUMBER")?;
    let sid = create_message(&from, to, body).await?;
    tracing::info!(to, sid, "SMS sent");
    Ok(sid)
}

#[tracing::instrument(skip(body))]
pub async fn send_whatsapp(to: &str, body: &str) -> Result<String, String> {
    let from = whatsapp_address(&env_required("TWILIO_WHATSAPP_NUMBER")?);
    let sid = create_message(&from, &whatsapp_address(to), body).await?;
    tracing::info!(to, sid, "WhatsApp message sent");
    Ok(sid)
}

#[tracing::instrument(skip(otp))]
pub async fn send_otp(phone: &str, otp: &str) -> Result<String, String> {
    send_sms(phone, &otp_message(otp)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whatsapp_prefix_is_idempotent() {
        assert_eq!(whatsapp_address("+971501234567"), "whatsapp:+971501234567");
        assert_eq!(whatsapp_address("whatsapp:+971501234567"), "whatsapp:+971501234567");
    }

    #[test]
    fn otp_message_text() {
        assert_eq!(
            otp_message("123456"),
            "Your ELSY verification code is: 123456. Valid for 10 minutes."
        );
    }

    #[tokio::test]
    async fn disabled_flag_short_circuits() {
        std::env::set_var("TWILIO_FROM_NUMBER", "+15550000000");
        let err = send_sms("+971500000000", "hi").await.unwrap_err();
        assert_eq!(err, "Twilio integration is disabled");
    }
}
