//! Environment-driven server configuration.

use std::net::SocketAddr;
use std::str::FromStr;

use bigdecimal::BigDecimal;

use giftvault_core::RewardRates;

/// Default listen address.
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Socket address the server listens on (`GIFTVAULT_BIND_ADDR`).
    pub bind_addr: SocketAddr,
    /// Reward accrual rates (`GIFTVAULT_PURCHASE_RATE`,
    /// `GIFTVAULT_RECHARGE_RATE`, `GIFTVAULT_ENGAGEMENT_BONUS`).
    pub reward_rates: RewardRates,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.parse().expect("default bind addr parses"),
            reward_rates: RewardRates::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from the environment, falling back to defaults
    /// for unset variables. Malformed values are an error, not a silent
    /// fallback.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = AppConfig::default();

        if let Ok(addr) = std::env::var("GIFTVAULT_BIND_ADDR") {
            config.bind_addr = addr
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid GIFTVAULT_BIND_ADDR '{addr}': {e}"))?;
        }
        if let Ok(rate) = std::env::var("GIFTVAULT_PURCHASE_RATE") {
            config.reward_rates.purchase_rate = parse_rate("GIFTVAULT_PURCHASE_RATE", &rate)?;
        }
        if let Ok(rate) = std::env::var("GIFTVAULT_RECHARGE_RATE") {
            config.reward_rates.recharge_rate = parse_rate("GIFTVAULT_RECHARGE_RATE", &rate)?;
        }
        if let Ok(bonus) = std::env::var("GIFTVAULT_ENGAGEMENT_BONUS") {
            config.reward_rates.engagement_bonus = bonus
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid GIFTVAULT_ENGAGEMENT_BONUS '{bonus}': {e}"))?;
        }

        Ok(config)
    }
}

fn parse_rate(name: &str, value: &str) -> anyhow::Result<BigDecimal> {
    let rate = BigDecimal::from_str(value)
        .map_err(|e| anyhow::anyhow!("invalid {name} '{value}': {e}"))?;
    if rate < BigDecimal::from(0) || rate > BigDecimal::from(1) {
        anyhow::bail!("{name} must be between 0 and 1, got {value}");
    }
    Ok(rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.reward_rates.engagement_bonus, 25);
    }

    #[test]
    fn test_parse_rate_bounds() {
        assert!(parse_rate("X", "0.05").is_ok());
        assert!(parse_rate("X", "1.5").is_err());
        assert!(parse_rate("X", "-0.1").is_err());
        assert!(parse_rate("X", "abc").is_err());
    }
}
