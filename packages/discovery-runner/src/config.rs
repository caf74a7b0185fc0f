use anyhow::{ensure, Context, Result};
use dotenvy::dotenv;
use recipe_discovery::{BatchConfig, CrawlBudget, CrawlConfig};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Runner configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub max_recipe_urls: usize,
    pub max_depth: usize,
    pub politeness_delay_seconds: f64,
    pub worker_count: usize,
    pub site_batch_size: usize,
    pub site_concurrency: usize,
    pub fetch_timeout_seconds: u64,
    pub firecrawl_api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let crawl = CrawlConfig::default();
        let budget = CrawlBudget::default();
        let batch = BatchConfig::default();
        Self {
            max_recipe_urls: budget.max_recipe_urls,
            max_depth: budget.max_depth,
            politeness_delay_seconds: crawl.politeness_delay_secs,
            worker_count: crawl.worker_count,
            site_batch_size: batch.site_batch_size,
            site_concurrency: batch.site_concurrency,
            fetch_timeout_seconds: crawl.fetch_timeout_secs,
            firecrawl_api_key: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_vars(|name| env::var(name).ok())
    }

    /// Build from any variable source; unset variables keep their defaults.
    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            max_recipe_urls: parse_or(&var, "RECIPE_MAX_URLS", defaults.max_recipe_urls)?,
            max_depth: parse_or(&var, "RECIPE_MAX_DEPTH", defaults.max_depth)?,
            politeness_delay_seconds: parse_or(
                &var,
                "POLITENESS_DELAY_SECONDS",
                defaults.politeness_delay_seconds,
            )?,
            worker_count: parse_or(&var, "WORKER_COUNT", defaults.worker_count)?,
            site_batch_size: parse_or(&var, "SITE_BATCH_SIZE", defaults.site_batch_size)?,
            site_concurrency: parse_or(&var, "SITE_CONCURRENCY", defaults.site_concurrency)?,
            fetch_timeout_seconds: parse_or(
                &var,
                "FETCH_TIMEOUT_SECONDS",
                defaults.fetch_timeout_seconds,
            )?,
            firecrawl_api_key: var("FIRECRAWL_API_KEY").filter(|key| !key.trim().is_empty()),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values the crawler cannot turn into a schedule.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            Duration::try_from_secs_f64(self.politeness_delay_seconds).is_ok(),
            "POLITENESS_DELAY_SECONDS must be a finite, non-negative number of seconds, got {}",
            self.politeness_delay_seconds
        );
        Ok(())
    }

    pub fn crawl_config(&self) -> CrawlConfig {
        CrawlConfig::new()
            .with_workers(self.worker_count)
            .with_politeness_delay(self.politeness_delay_seconds)
            .with_fetch_timeout(self.fetch_timeout_seconds)
    }

    pub fn budget(&self) -> CrawlBudget {
        CrawlBudget::new(self.max_recipe_urls).with_max_depth(self.max_depth)
    }

    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig::new(self.site_batch_size, self.site_concurrency)
    }
}

fn parse_or<F, T>(var: &F, name: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(name) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid number", name)),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_vars(vars(&[])).unwrap();
        assert_eq!(config.max_recipe_urls, 5);
        assert_eq!(config.worker_count, 4);
        assert_eq!(config.site_batch_size, 20);
        assert!(config.firecrawl_api_key.is_none());
    }

    #[test]
    fn test_overrides_from_vars() {
        let config = Config::from_vars(vars(&[
            ("RECIPE_MAX_URLS", "12"),
            ("POLITENESS_DELAY_SECONDS", "0.25"),
            ("SITE_CONCURRENCY", " 8 "),
            ("FIRECRAWL_API_KEY", "fc-test"),
        ]))
        .unwrap();
        assert_eq!(config.max_recipe_urls, 12);
        assert_eq!(config.politeness_delay_seconds, 0.25);
        assert_eq!(config.site_concurrency, 8);
        assert_eq!(config.firecrawl_api_key.as_deref(), Some("fc-test"));
        assert_eq!(config.budget().max_recipe_urls, 12);
    }

    #[test]
    fn test_invalid_number_names_the_variable() {
        let err = Config::from_vars(vars(&[("WORKER_COUNT", "many")])).unwrap_err();
        assert!(err.to_string().contains("WORKER_COUNT"));
    }

    #[test]
    fn test_unusable_politeness_delay_rejected() {
        for raw in ["inf", "NaN", "-0.5", "1e300"] {
            let err = Config::from_vars(vars(&[("POLITENESS_DELAY_SECONDS", raw)])).unwrap_err();
            assert!(err.to_string().contains("POLITENESS_DELAY_SECONDS"), "{}", raw);
        }
    }

    #[test]
    fn test_validate_catches_overrides() {
        let mut config = Config::default();
        config.politeness_delay_seconds = f64::INFINITY;
        assert!(config.validate().is_err());
    }
}
