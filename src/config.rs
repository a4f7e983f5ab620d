//! Configuration types.

use std::path::PathBuf;

use secrecy::SecretString;

/// What `/start` does for a user whose profile is already complete.
///
/// Source deployments disagreed: older ones re-collected the whole
/// profile unconditionally, later ones checked completeness first. Both
/// behaviors are kept selectable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnboardingPolicy {
    /// Re-run onboarding on every begin event.
    Always,
    /// Only onboard users whose profile is incomplete.
    IfIncomplete,
}

impl Default for OnboardingPolicy {
    fn default() -> Self {
        Self::IfIncomplete
    }
}

impl OnboardingPolicy {
    /// Parse the `PAIRCHAT_REONBOARD` value.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "always" => Some(Self::Always),
            "if-incomplete" | "if_incomplete" => Some(Self::IfIncomplete),
            _ => None,
        }
    }
}

/// Bot configuration, built from environment variables.
#[derive(Debug, Clone, Default)]
pub struct BotConfig {
    /// Telegram Bot API token. The Telegram channel is disabled when unset.
    pub telegram_token: Option<SecretString>,
    pub onboarding_policy: OnboardingPolicy,
    /// Port for the ops listener (/healthz, /stats). Disabled when unset.
    pub http_port: Option<u16>,
    /// Directory for rotated log files. Stderr-only logging when unset.
    pub log_dir: Option<PathBuf>,
}

impl BotConfig {
    /// Build config from environment variables. Missing variables fall
    /// back to defaults; malformed ones are logged and ignored.
    pub fn from_env() -> Self {
        let telegram_token = std::env::var("TELEGRAM_BOT_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .map(SecretString::from);

        let onboarding_policy = match std::env::var("PAIRCHAT_REONBOARD") {
            Ok(raw) => OnboardingPolicy::parse(&raw).unwrap_or_else(|| {
                tracing::warn!(value = %raw, "Unknown PAIRCHAT_REONBOARD value, using if-incomplete");
                OnboardingPolicy::IfIncomplete
            }),
            Err(_) => OnboardingPolicy::IfIncomplete,
        };

        let http_port: Option<u16> = std::env::var("PAIRCHAT_HTTP_PORT")
            .ok()
            .and_then(|s| s.parse().ok());

        let log_dir = std::env::var("PAIRCHAT_LOG_DIR").ok().map(PathBuf::from);

        Self {
            telegram_token,
            onboarding_policy,
            http_port,
            log_dir,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_parse_accepts_both_spellings() {
        assert_eq!(OnboardingPolicy::parse("always"), Some(OnboardingPolicy::Always));
        assert_eq!(OnboardingPolicy::parse("ALWAYS"), Some(OnboardingPolicy::Always));
        assert_eq!(
            OnboardingPolicy::parse("if-incomplete"),
            Some(OnboardingPolicy::IfIncomplete)
        );
        assert_eq!(
            OnboardingPolicy::parse("if_incomplete"),
            Some(OnboardingPolicy::IfIncomplete)
        );
    }

    #[test]
    fn policy_parse_rejects_unknown() {
        assert_eq!(OnboardingPolicy::parse("sometimes"), None);
        assert_eq!(OnboardingPolicy::parse(""), None);
    }

    #[test]
    fn default_policy_checks_completeness_first() {
        assert_eq!(OnboardingPolicy::default(), OnboardingPolicy::IfIncomplete);
    }
}
