use serde::{Deserialize, Serialize};

/// Outbound integrations that can be switched on in `config.toml`.
///
/// A flag that is off means the integration is never contacted: emails and
/// texts are logged and reported as not sent, documents go to the local
/// upload directory, and no OTLP exporter is installed.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct FeatureFlags {
    /// Credential, reset and notification emails through Mailgun.
    #[serde(default)]
    pub mailgun: bool,
    /// SMS, WhatsApp and phone OTP delivery through Twilio.
    #[serde(default)]
    pub twilio: bool,
    /// Store case documents and inquiry uploads in an S3 bucket.
    #[serde(default)]
    pub s3: bool,
    #[serde(default)]
    pub telemetry: bool,
}

impl FeatureFlags {
    /// Every integration disabled; what a missing config file yields.
    pub const ALL_OFF: FeatureFlags = FeatureFlags {
        mailgun: false,
        twilio: false,
        s3: false,
        telemetry: false,
    };

    /// Names of the switched-on integrations, for the startup log.
    pub fn enabled(&self) -> Vec<&'static str> {
        [
            ("mailgun", self.mailgun),
            ("twilio", self.twilio),
            ("s3", self.s3),
            ("telemetry", self.telemetry),
        ]
        .into_iter()
        .filter_map(|(name, on)| on.then_some(name))
        .collect()
    }
}

/// `config.toml` as a whole. Only the `[features]` table is read today.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub features: FeatureFlags,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_disables_every_gateway() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.features, FeatureFlags::ALL_OFF);
        assert_eq!(FeatureFlags::default(), FeatureFlags::ALL_OFF);
        assert!(config.features.enabled().is_empty());
    }

    #[test]
    fn messaging_gateways_switch_independently() {
        let config: AppConfig = toml::from_str(
            r#"
            [features]
            twilio = true
            "#,
        )
        .unwrap();
        assert!(config.features.twilio);
        assert!(!config.features.mailgun);
        assert_eq!(config.features.enabled(), vec!["twilio"]);
    }

    #[test]
    fn production_profile_lists_enabled_integrations_in_order() {
        let config: AppConfig = toml::from_str(
            r#"
            [features]
            telemetry = true
            s3 = true
            mailgun = true
            "#,
        )
        .unwrap();
        assert_eq!(config.features.enabled(), vec!["mailgun", "s3", "telemetry"]);
    }

    #[test]
    fn flags_from_retired_integrations_are_ignored() {
        let config: AppConfig = toml::from_str(
            r#"
            [features]
            s3 = true
            sendgrid = true
            "#,
        )
        .unwrap();
        assert!(config.features.s3);
        assert_eq!(config.features.enabled(), vec!["s3"]);
    }
}
