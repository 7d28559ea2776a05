pub mod domain;
pub mod forecast;
pub mod ingest;
pub mod model;
pub mod pipeline;

pub mod config {
    use std::time::Duration;

    use anyhow::Context;

    const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
    const DEFAULT_PORT: u16 = 8000;
    const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 30;
    const DEFAULT_MODEL_RETRIES: u32 = 3;
    const DEFAULT_MODEL_PREDICT_PATH: &str = "/predict";

    #[derive(Debug, Clone, Default)]
    pub struct Settings {
        pub sentry_dsn: Option<String>,
        pub model_server_url: Option<String>,
        pub model_api_key: Option<String>,
        pub model_predict_path: Option<String>,
        pub model_timeout_secs: Option<u64>,
        pub model_retries: Option<u32>,
        pub max_upload_bytes: Option<usize>,
        pub port: Option<u16>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Self::from_lookup(|name| std::env::var(name).ok())
        }

        /// Builds settings from any variable source. Blank values count as unset; a numeric
        /// variable that does not parse is an error rather than a silent default.
        pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
            let text = |name: &str| lookup(name).filter(|s| !s.trim().is_empty());
            Ok(Self {
                sentry_dsn: lookup("SENTRY_DSN"),
                model_server_url: text("MODEL_SERVER_URL"),
                model_api_key: lookup("MODEL_API_KEY"),
                model_predict_path: text("MODEL_PREDICT_PATH"),
                model_timeout_secs: parse_var("MODEL_TIMEOUT_SECS", text("MODEL_TIMEOUT_SECS"))?,
                model_retries: parse_var("MODEL_RETRIES", text("MODEL_RETRIES"))?,
                max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", text("MAX_UPLOAD_BYTES"))?,
                port: parse_var("PORT", text("PORT"))?,
            })
        }

        pub fn require_model_server_url(&self) -> anyhow::Result<&str> {
            self.model_server_url
                .as_deref()
                .context("MODEL_SERVER_URL is required")
        }

        pub fn model_predict_path(&self) -> &str {
            self.model_predict_path
                .as_deref()
                .unwrap_or(DEFAULT_MODEL_PREDICT_PATH)
        }

        pub fn model_timeout(&self) -> Duration {
            Duration::from_secs(
                self.model_timeout_secs
                    .unwrap_or(DEFAULT_MODEL_TIMEOUT_SECS),
            )
        }

        /// Total attempts per model call, at least one.
        pub fn model_retries(&self) -> u32 {
            self.model_retries.unwrap_or(DEFAULT_MODEL_RETRIES).max(1)
        }

        pub fn max_upload_bytes(&self) -> usize {
            self.max_upload_bytes.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES)
        }

        pub fn port(&self) -> u16 {
            self.port.unwrap_or(DEFAULT_PORT)
        }
    }

    fn parse_var<T>(name: &str, raw: Option<String>) -> anyhow::Result<Option<T>>
    where
        T: std::str::FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        raw.map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("{name} must be a valid number (got {raw:?})"))
        })
        .transpose()
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::collections::HashMap;

        fn from_pairs(pairs: &[(&str, &str)]) -> anyhow::Result<Settings> {
            let vars: HashMap<String, String> = pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            Settings::from_lookup(|name| vars.get(name).cloned())
        }

        #[test]
        fn defaults_apply_when_unset() {
            let s = Settings::default();
            assert_eq!(s.max_upload_bytes(), 10 * 1024 * 1024);
            assert_eq!(s.port(), 8000);
            assert_eq!(s.model_timeout(), Duration::from_secs(30));
            assert_eq!(s.model_retries(), 3);
            assert_eq!(s.model_predict_path(), "/predict");
            assert!(s.require_model_server_url().is_err());
        }

        #[test]
        fn reads_model_client_variables() {
            let s = from_pairs(&[
                ("MODEL_SERVER_URL", "http://models.local"),
                ("MODEL_TIMEOUT_SECS", " 5 "),
                ("MODEL_RETRIES", "1"),
                ("MODEL_PREDICT_PATH", "v2/score"),
            ])
            .unwrap();
            assert_eq!(s.require_model_server_url().unwrap(), "http://models.local");
            assert_eq!(s.model_timeout(), Duration::from_secs(5));
            assert_eq!(s.model_retries(), 1);
            assert_eq!(s.model_predict_path(), "v2/score");
        }

        #[test]
        fn malformed_numeric_variables_are_errors() {
            let err = from_pairs(&[("MODEL_RETRIES", "three")]).unwrap_err();
            assert!(err.to_string().contains("MODEL_RETRIES"));

            let err = from_pairs(&[("MODEL_TIMEOUT_SECS", "-5")]).unwrap_err();
            assert!(err.to_string().contains("MODEL_TIMEOUT_SECS"));

            assert!(from_pairs(&[("PORT", "80000")]).is_err());
        }

        #[test]
        fn blank_values_count_as_unset() {
            let s = from_pairs(&[("MODEL_SERVER_URL", "  "), ("MODEL_RETRIES", "")]).unwrap();
            assert!(s.model_server_url.is_none());
            assert_eq!(s.model_retries(), 3);
        }

        #[test]
        fn zero_retries_still_makes_one_attempt() {
            let s = from_pairs(&[("MODEL_RETRIES", "0")]).unwrap();
            assert_eq!(s.model_retries(), 1);
        }
    }
}
