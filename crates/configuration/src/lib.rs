use crate::error::ConfigError;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{
    AlertingConfig, Config, FamilyWeights, ScoringConfig, SeriesMap, StressConfig, StressWeights,
};

/// Loads the application configuration from an optional `conduit.toml` file.
///
/// Missing file and missing sections both fall back to the compiled-in
/// defaults, so a bare deployment works with no configuration at all.
/// Validation rejects weight sets that do not sum to 1.0 up front, rather
/// than letting a miscalibrated composite surface as strange scores later.
pub fn load_config() -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::with_name("conduit").required(false))
        .add_source(config::Environment::with_prefix("CONDUIT").separator("__"))
        .build()?;

    let config = builder.try_deserialize::<Config>()?;
    validate(&config)?;

    Ok(config)
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    let fw = &config.scoring.weights;
    let family_sum = fw.curve + fw.liquidity + fw.supply + fw.demand + fw.policy;
    if (family_sum - 1.0).abs() > 1e-9 {
        return Err(ConfigError::ValidationError(format!(
            "transmission family weights must sum to 1.0, got {family_sum}"
        )));
    }

    let sw = &config.stress.weights;
    let stress_sum = sw.transmission + sw.liquidity + sw.curve + sw.auction + sw.turnover;
    if (stress_sum - 1.0).abs() > 1e-9 {
        return Err(ConfigError::ValidationError(format!(
            "stress component weights must sum to 1.0, got {stress_sum}"
        )));
    }

    if config.scoring.min_families == 0 || config.scoring.min_families > 5 {
        return Err(ConfigError::ValidationError(format!(
            "min_families must be in 1..=5, got {}",
            config.scoring.min_families
        )));
    }

    if config.alerting.cache_ttl_secs > 300 {
        return Err(ConfigError::ValidationError(
            "alert threshold cache TTL must not exceed 300 seconds".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn bad_weights_rejected() {
        let mut config = Config::default();
        config.scoring.weights.curve = 0.9;
        assert!(validate(&config).is_err());
    }
}
