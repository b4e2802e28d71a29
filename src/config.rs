//! Configuration management — provider URLs and batching knobs. Cost weights
//! and 2-opt tuning are deliberately not environment variables; they live in
//! `services::nearest_neighbor::CostWeights` and `services::two_opt::TwoOptConfig`
//! as per-call tuning structs.

use anyhow::Result;

/// Pipeline-wide configuration: routing provider URLs (absent means the
/// corresponding provider falls back to a Haversine-backed mock) and
/// batched-call tuning.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub car_routing_url: Option<String>,
    pub transit_routing_url: Option<String>,
    pub walking_routing_url: Option<String>,
    pub batch_size: usize,
    pub batch_delay_ms: u64,
    pub call_timeout_ms: u64,
    pub max_attempts: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            car_routing_url: None,
            transit_routing_url: None,
            walking_routing_url: None,
            batch_size: 3,
            batch_delay_ms: 500,
            call_timeout_ms: 10_000,
            max_attempts: 3,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables, falling back to
    /// `Default` for anything unset.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let car_routing_url = std::env::var("CAR_ROUTING_URL").ok();
        let transit_routing_url = std::env::var("TRANSIT_ROUTING_URL").ok();
        let walking_routing_url = std::env::var("WALKING_ROUTING_URL").ok();

        let batch_size = env_or("BATCH_SIZE", defaults.batch_size);
        let batch_delay_ms = env_or("BATCH_DELAY_MS", defaults.batch_delay_ms);
        let call_timeout_ms = env_or("CALL_TIMEOUT_MS", defaults.call_timeout_ms);
        let max_attempts = env_or("MAX_ATTEMPTS", defaults.max_attempts);

        Ok(Self {
            car_routing_url,
            transit_routing_url,
            walking_routing_url,
            batch_size,
            batch_delay_ms,
            call_timeout_ms,
            max_attempts,
        })
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}
