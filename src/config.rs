//! Environment-driven configuration

use std::time::Duration;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub simulator: SimulatorConfig,
    pub refund_window_days: i64,
}

/// Tuning for the mock fulfillment simulator. The probabilities are
/// per-tick chances of an order advancing one step.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    pub interval: Duration,
    pub payment_probability: f64,
    pub delivery_probability: f64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is required")?;
        let port = env_parse("PORT", 8084_u16)?;
        let interval_secs = env_parse("SIMULATOR_INTERVAL_SECS", 15_u64)?;
        let payment_probability = env_parse("SIMULATOR_PAYMENT_PROBABILITY", 0.4_f64)?;
        let delivery_probability = env_parse("SIMULATOR_DELIVERY_PROBABILITY", 0.3_f64)?;
        let refund_window_days = env_parse("REFUND_WINDOW_DAYS", 30_i64)?;

        Ok(Self {
            database_url,
            port,
            simulator: SimulatorConfig {
                interval: Duration::from_secs(interval_secs),
                payment_probability,
                delivery_probability,
            },
            refund_window_days,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw.parse().with_context(|| format!("invalid {key}")),
        Err(_) => Ok(default),
    }
}
