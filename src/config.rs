use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per batch (including the first).
    /// 1 means no automatic retry.
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            base_delay_secs: 0.25,
            max_delay_secs: 30,
        }
    }
}

/// Global engine configuration loaded from `~/.config/chunkwell/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Batch size used when a submission does not specify one.
    pub default_chunk_size: usize,
    /// Upper bound on batch size; submissions asking for more are clamped.
    pub max_chunk_size: usize,
    /// Maximum batches executing concurrently within one job.
    pub max_workers: usize,
    /// Concurrently active jobs allowed per tenant (admission slots).
    pub admission_ceiling: usize,
    /// Result-count ceiling enforced on query-backed record sources.
    pub query_result_ceiling: u64,
    /// Operations budget granted to each batch context, reset per batch.
    pub batch_ops_budget: u64,
    /// Optional hard cap on live (non-terminal) jobs per tenant. When set,
    /// submissions beyond it fail with AdmissionDenied instead of queueing.
    #[serde(default)]
    pub max_live_jobs: Option<usize>,
    /// Optional retry policy; if missing, batches get a single attempt.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_chunk_size: 200,
            max_chunk_size: 2000,
            max_workers: 4,
            admission_ceiling: 5,
            query_result_ceiling: 50_000,
            batch_ops_budget: 10_000,
            max_live_jobs: None,
            retry: None,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("chunkwell")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<EngineConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = EngineConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: EngineConfig = toml::from_str(&data)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.default_chunk_size, 200);
        assert_eq!(cfg.max_chunk_size, 2000);
        assert_eq!(cfg.max_workers, 4);
        assert_eq!(cfg.admission_ceiling, 5);
        assert_eq!(cfg.query_result_ceiling, 50_000);
        assert_eq!(cfg.batch_ops_budget, 10_000);
        assert!(cfg.max_live_jobs.is_none());
        assert!(cfg.retry.is_none());
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = EngineConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: EngineConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.default_chunk_size, cfg.default_chunk_size);
        assert_eq!(parsed.max_workers, cfg.max_workers);
        assert_eq!(parsed.admission_ceiling, cfg.admission_ceiling);
        assert_eq!(parsed.batch_ops_budget, cfg.batch_ops_budget);
    }

    #[test]
    fn config_toml_custom_values() {
        let toml = r#"
            default_chunk_size = 50
            max_chunk_size = 500
            max_workers = 1
            admission_ceiling = 2
            query_result_ceiling = 1000
            batch_ops_budget = 64
        "#;
        let cfg: EngineConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.default_chunk_size, 50);
        assert_eq!(cfg.max_chunk_size, 500);
        assert_eq!(cfg.max_workers, 1);
        assert_eq!(cfg.admission_ceiling, 2);
        assert_eq!(cfg.query_result_ceiling, 1000);
        assert_eq!(cfg.batch_ops_budget, 64);
        assert!(cfg.retry.is_none());
    }

    #[test]
    fn config_toml_retry_section() {
        let toml = r#"
            default_chunk_size = 200
            max_chunk_size = 2000
            max_workers = 4
            admission_ceiling = 5
            query_result_ceiling = 50000
            batch_ops_budget = 10000
            max_live_jobs = 16

            [retry]
            max_attempts = 3
            base_delay_secs = 0.5
            max_delay_secs = 15
        "#;
        let cfg: EngineConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.max_live_jobs, Some(16));
        let retry = cfg.retry.as_ref().unwrap();
        assert_eq!(retry.max_attempts, 3);
        assert!((retry.base_delay_secs - 0.5).abs() < 1e-9);
        assert_eq!(retry.max_delay_secs, 15);
    }
}
