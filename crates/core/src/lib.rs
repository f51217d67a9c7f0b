pub mod digest;
pub mod domain;
pub mod engine;
pub mod error;
pub mod llm;
pub mod market;
pub mod pipeline;
pub mod portfolio;
pub mod time;

pub mod config {
    use crate::error::ConfigError;

    #[derive(Debug, Clone, Default)]
    pub struct Settings {
        pub xai_api_key: Option<String>,
        pub xai_model: Option<String>,
        pub xai_base_url: Option<String>,
        pub resend_api_key: Option<String>,
        pub from_email: Option<String>,
        pub to_email: Option<String>,
        pub sentry_dsn: Option<String>,
        pub portfolio_config_path: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> Self {
            Self {
                xai_api_key: env_non_empty("XAI_API_KEY"),
                xai_model: env_non_empty("XAI_MODEL"),
                xai_base_url: env_non_empty("XAI_API_BASE_URL"),
                resend_api_key: env_non_empty("RESEND_API_KEY"),
                from_email: env_non_empty("FROM_EMAIL"),
                to_email: env_non_empty("TO_EMAIL"),
                sentry_dsn: env_non_empty("SENTRY_DSN"),
                portfolio_config_path: env_non_empty("PORTFOLIO_CONFIG_PATH"),
            }
        }

        pub fn require_xai_api_key(&self) -> Result<&str, ConfigError> {
            self.xai_api_key
                .as_deref()
                .ok_or(ConfigError::MissingEnv("XAI_API_KEY"))
        }

        pub fn require_resend_api_key(&self) -> Result<&str, ConfigError> {
            self.resend_api_key
                .as_deref()
                .ok_or(ConfigError::MissingEnv("RESEND_API_KEY"))
        }

        pub fn require_from_email(&self) -> Result<&str, ConfigError> {
            self.from_email
                .as_deref()
                .ok_or(ConfigError::MissingEnv("FROM_EMAIL"))
        }

        /// `TO_EMAIL` wins; the portfolio file's `email` is the fallback.
        pub fn resolve_recipient<'a>(
            &'a self,
            portfolio_email: Option<&'a str>,
        ) -> Result<&'a str, ConfigError> {
            self.to_email
                .as_deref()
                .or(portfolio_email)
                .ok_or(ConfigError::MissingEnv("TO_EMAIL"))
        }
    }

    fn env_non_empty(key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

}
