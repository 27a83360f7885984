pub mod dashboard;
pub mod domain;
pub mod flows;
pub mod llm;
pub mod storage;

pub mod config {
    use anyhow::Context;
    use std::path::PathBuf;

    const DEFAULT_STORE_PATH: &str = ".sensei/store.json";

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub anthropic_api_key: Option<String>,
        pub anthropic_base_url: Option<String>,
        pub anthropic_model: Option<String>,
        pub anthropic_max_tokens: Option<u32>,
        pub anthropic_timeout_secs: Option<u64>,
        pub store_path: Option<PathBuf>,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                anthropic_api_key: non_empty_var("ANTHROPIC_API_KEY"),
                anthropic_base_url: non_empty_var("ANTHROPIC_BASE_URL"),
                anthropic_model: non_empty_var("ANTHROPIC_MODEL"),
                anthropic_max_tokens: parsed_var("ANTHROPIC_MAX_TOKENS")?,
                anthropic_timeout_secs: parsed_var("ANTHROPIC_TIMEOUT_SECS")?,
                store_path: non_empty_var("SENSEI_STORE_PATH").map(PathBuf::from),
                sentry_dsn: non_empty_var("SENTRY_DSN"),
            })
        }

        pub fn require_anthropic_api_key(&self) -> anyhow::Result<&str> {
            self.anthropic_api_key
                .as_deref()
                .context("ANTHROPIC_API_KEY is required")
        }

        /// Location of the local key-value store backing the watchlist.
        pub fn store_path(&self) -> PathBuf {
            self.store_path
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH))
        }

        /// Same as [`Settings::store_path`] but reads only `SENSEI_STORE_PATH`,
        /// so it works when the backend variables are malformed.
        pub fn store_path_from_env() -> PathBuf {
            non_empty_var("SENSEI_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH))
        }
    }

    fn non_empty_var(key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|s| !s.trim().is_empty())
    }

    fn parsed_var<T>(key: &str) -> anyhow::Result<Option<T>>
    where
        T: std::str::FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        non_empty_var(key)
            .map(|s| s.trim().parse::<T>())
            .transpose()
            .with_context(|| format!("{key} is not a valid number"))
    }
}
