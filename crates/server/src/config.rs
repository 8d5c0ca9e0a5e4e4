use shared_types::{AppConfig, FeatureFlags};
use std::sync::OnceLock;

static FLAGS: OnceLock<FeatureFlags> = OnceLock::new();

/// Default location, relative to the working directory. Override with `ELSY_CONFIG`.
const CONFIG_PATH: &str = "config.toml";

fn config_path() -> String {
    std::env::var("ELSY_CONFIG").unwrap_or_else(|_| CONFIG_PATH.to_string())
}

/// Parse the `[features]` table. Bad TOML turns every flag off.
pub fn parse_feature_flags(contents: &str) -> FeatureFlags {
    match toml::from_str::<AppConfig>(contents) {
        Ok(config) => config.features,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to parse config, defaulting all flags off");
            FeatureFlags::default()
        }
    }
}

/// Read the config file into the global flags. Only the first call has effect.
pub fn load_feature_flags() -> &'static FeatureFlags {
    FLAGS.get_or_init(|| {
        let path = config_path();
        let flags = match std::fs::read_to_string(&path) {
            Ok(contents) => parse_feature_flags(&contents),
            Err(e) => {
                tracing::warn!(path, error = %e, "Config file not found, defaulting all flags off");
                FeatureFlags::default()
            }
        };
        tracing::info!(enabled = ?flags.enabled(), "Feature flags loaded");
        flags
    })
}

/// The loaded flags, or all-off if `load_feature_flags()` has not run.
pub fn feature_flags() -> &'static FeatureFlags {
    static DEFAULT: FeatureFlags = FeatureFlags::ALL_OFF;
    FLAGS.get().unwrap_or(&DEFAULT)
}

/// Frontend base URL used in emailed links.
pub fn app_base_url() -> String {
    std::env::var("APP_BASE_URL")
        .unwrap_or_else(|_| "http://localhost:3000".to_string())
        .trim_end_matches('/')
        .to_string()
}

pub fn app_name() -> String {
    std::env::var("APP_NAME").unwrap_or_else(|_| "ELSY".to_string())
}

pub fn two_factor_app_name() -> String {
    std::env::var("TWO_FACTOR_APP_NAME").unwrap_or_else(|_| "ELSY".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_features_table() {
        let flags = parse_feature_flags("[features]\nmailgun = true\ns3 = true\n");
        assert!(flags.mailgun);
        assert!(flags.s3);
        assert!(!flags.twilio);
        assert!(!flags.telemetry);
    }

    #[test]
    fn garbage_turns_everything_off() {
        let flags = parse_feature_flags("this is = = not toml");
        assert!(!flags.mailgun && !flags.twilio && !flags.s3 && !flags.telemetry);
    }
}
