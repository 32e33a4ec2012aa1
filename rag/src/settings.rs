use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use dotenv::dotenv;
use rag_embeddings::client::RetryPolicy;
use rag_embeddings::client::cohere::InputType;
use rag_embeddings::{BenchmarkRunner, ProviderConfig};

use crate::bench::OutputFormat;
use crate::logging::{LogFormat, LoggingConfig};

const DEFAULT_TEXTS: &[&str] = &["cat", "dog", "airplane"];

/// 从环境变量（及 `.env`）读取的运行配置
#[derive(Debug, Clone)]
pub struct Settings {
    pub openai: Option<ProviderConfig>,
    pub cohere: Option<ProviderConfig>,
    pub cohere_input_type: InputType,
    pub timeout: Option<Duration>,
    pub bench_runs: usize,
    pub output: OutputFormat,
    pub retry: RetryPolicy,
    pub texts: Vec<String>,
    pub logging: LoggingConfig,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 通过查找函数读取，方便测试时不修改进程环境
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let timeout = parse::<u64>(&get, "EMBED_TIMEOUT_SECS")?.map(Duration::from_secs);
        let max_batch_size = parse::<usize>(&get, "EMBED_MAX_BATCH_SIZE")?;

        let provider = |key_var: &str, model_var: &str, url_var: &str| {
            get(key_var).map(|key| ProviderConfig {
                credential: key,
                model: get(model_var),
                base_url: get(url_var),
                timeout,
                max_batch_size,
            })
        };

        let retry_attempts = parse::<u32>(&get, "RETRY_ATTEMPTS")?.unwrap_or(1);
        let min_backoff = parse::<u64>(&get, "RETRY_MIN_BACKOFF_MS")?.unwrap_or(0);
        let max_backoff = parse::<u64>(&get, "RETRY_MAX_BACKOFF_MS")?.unwrap_or(1000);
        let retry = RetryPolicy::new(
            retry_attempts,
            Duration::from_millis(min_backoff),
            Duration::from_millis(max_backoff),
        )
        .map_err(|e| anyhow!("invalid retry settings: {}", e))?;

        // 运行次数为 0 时在发出任何请求前报错
        let bench_runs = parse::<usize>(&get, "BENCH_RUNS")?.unwrap_or(5);
        BenchmarkRunner::new(bench_runs).map_err(|e| anyhow!("invalid value for BENCH_RUNS: {}", e))?;

        let texts = match get("BENCH_TEXTS") {
            Some(raw) => raw.split(';').map(|s| s.trim().to_string()).collect(),
            None => DEFAULT_TEXTS.iter().map(|s| s.to_string()).collect(),
        };

        Ok(Self {
            openai: provider("OPENAI_API_KEY", "OPENAI_EMBED_MODEL", "EMBED_BASE_URL_OPENAI"),
            cohere: provider("COHERE_API_KEY", "COHERE_EMBED_MODEL", "EMBED_BASE_URL_COHERE"),
            cohere_input_type: parse::<InputType>(&get, "COHERE_INPUT_TYPE")?
                .unwrap_or(InputType::SearchDocument),
            timeout,
            bench_runs,
            output: parse::<OutputFormat>(&get, "BENCH_OUTPUT")?.unwrap_or_default(),
            retry,
            texts,
            logging: LoggingConfig {
                level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
                format: parse::<LogFormat>(&get, "LOG_FORMAT")?.unwrap_or_default(),
            },
        })
    }
}

fn parse<T>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get(key)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| anyhow!("{}", e))
                .with_context(|| format!("invalid value for {}: {:?}", key, raw))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_without_keys() {
        let settings = settings(&[]).unwrap();
        assert!(settings.openai.is_none());
        assert!(settings.cohere.is_none());
        assert_eq!(settings.bench_runs, 5);
        assert_eq!(settings.output, OutputFormat::Text);
        assert_eq!(settings.retry.max_attempts(), 1);
        assert_eq!(settings.texts, ["cat", "dog", "airplane"]);
        assert_eq!(settings.logging.level, "info");
        assert_eq!(settings.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_provider_configs_share_transport_options() {
        let settings = settings(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_EMBED_MODEL", "text-embedding-3-small"),
            ("COHERE_API_KEY", "co-test"),
            ("EMBED_TIMEOUT_SECS", "30"),
            ("EMBED_MAX_BATCH_SIZE", "64"),
            ("COHERE_INPUT_TYPE", "search_query"),
        ])
        .unwrap();

        let openai = settings.openai.unwrap();
        assert_eq!(openai.credential, "sk-test");
        assert_eq!(openai.model.as_deref(), Some("text-embedding-3-small"));
        assert_eq!(openai.timeout, Some(Duration::from_secs(30)));

        let cohere = settings.cohere.unwrap();
        assert_eq!(cohere.max_batch_size, Some(64));
        assert!(cohere.model.is_none());
        assert_eq!(settings.cohere_input_type, InputType::SearchQuery);
    }

    #[test]
    fn test_blank_key_means_not_configured() {
        let settings = settings(&[("OPENAI_API_KEY", "  ")]).unwrap();
        assert!(settings.openai.is_none());
    }

    #[test]
    fn test_invalid_number_names_the_variable() {
        let err = settings(&[("BENCH_RUNS", "five")]).unwrap_err();
        assert!(format!("{:#}", err).contains("BENCH_RUNS"));
    }

    #[test]
    fn test_zero_bench_runs_is_rejected_up_front() {
        let err = settings(&[("OPENAI_API_KEY", "sk-test"), ("BENCH_RUNS", "0")]).unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("BENCH_RUNS"), "{message}");
        assert!(message.contains("Configuration error"), "{message}");
    }

    #[test]
    fn test_json_output_is_selectable() {
        let json = settings(&[("BENCH_OUTPUT", "json")]).unwrap();
        assert_eq!(json.output, OutputFormat::Json);
        assert!(settings(&[("BENCH_OUTPUT", "xml")]).is_err());
    }

    #[test]
    fn test_zero_retry_attempts_is_rejected() {
        assert!(settings(&[("RETRY_ATTEMPTS", "0")]).is_err());
    }

    #[test]
    fn test_bench_texts_are_split() {
        let settings = settings(&[("BENCH_TEXTS", "contract law; tort law ;banana")]).unwrap();
        assert_eq!(settings.texts, ["contract law", "tort law", "banana"]);
    }
}
