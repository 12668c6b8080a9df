use crate::config::types::{BatchConfig, Config, MonitorConfig, ScraperConfig};
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.store.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    validate_batch_config(&config.batch)?;
    validate_monitor_config(&config.monitor)?;
    validate_scraper_config(&config.scraper)?;
    Ok(())
}

/// Validates batch partitioning configuration
fn validate_batch_config(config: &BatchConfig) -> Result<(), ConfigError> {
    if config.first_group < 1 {
        return Err(ConfigError::Validation(format!(
            "first_group must be >= 1, got {}",
            config.first_group
        )));
    }

    if config.group_count < 1 {
        return Err(ConfigError::Validation(format!(
            "group_count must be >= 1, got {}",
            config.group_count
        )));
    }

    if config.batch_size < 1 {
        return Err(ConfigError::Validation(format!(
            "batch_size must be >= 1, got {}",
            config.batch_size
        )));
    }

    if config.scrap_batch_size < 1 || config.scrap_batch_size > 64 {
        return Err(ConfigError::Validation(format!(
            "scrap_batch_size must be between 1 and 64, got {}",
            config.scrap_batch_size
        )));
    }

    Ok(())
}

/// Validates resource monitor configuration
fn validate_monitor_config(config: &MonitorConfig) -> Result<(), ConfigError> {
    if config.sample_interval_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "sample_interval_secs must be >= 1, got {}",
            config.sample_interval_secs
        )));
    }

    for (name, value) in [
        ("throttle_cpu_percent", config.throttle_cpu_percent),
        ("critical_cpu_percent", config.critical_cpu_percent),
    ] {
        if !(0.0..=100.0).contains(&value) {
            return Err(ConfigError::Validation(format!(
                "{} must be between 0 and 100, got {}",
                name, value
            )));
        }
    }

    if config.critical_cpu_percent < config.throttle_cpu_percent {
        return Err(ConfigError::Validation(format!(
            "critical_cpu_percent ({}) must be >= throttle_cpu_percent ({})",
            config.critical_cpu_percent, config.throttle_cpu_percent
        )));
    }

    Ok(())
}

/// Validates crawl task configuration
fn validate_scraper_config(config: &ScraperConfig) -> Result<(), ConfigError> {
    for placeholder in ["{query}", "{lat}", "{long}"] {
        if !config.search_url_template.contains(placeholder) {
            return Err(ConfigError::Validation(format!(
                "search_url_template must contain the {} placeholder",
                placeholder
            )));
        }
    }

    if config.place_url_prefix.is_empty() {
        return Err(ConfigError::Validation(
            "place_url_prefix cannot be empty".to_string(),
        ));
    }

    if config.navigation_timeout_secs < 1 || config.detail_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "navigation and detail timeouts must be >= 1s".to_string(),
        ));
    }

    if config.stable_polls < 1 {
        return Err(ConfigError::Validation(format!(
            "stable_polls must be >= 1, got {}",
            config.stable_polls
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::StoreConfig;

    fn base_config() -> Config {
        Config {
            store: StoreConfig {
                database_path: "./test.db".to_string(),
            },
            batch: BatchConfig::default(),
            monitor: MonitorConfig::default(),
            scraper: ScraperConfig::default(),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&base_config()).is_ok());
    }

    #[test]
    fn test_rejects_zero_batch_size() {
        let mut config = base_config();
        config.batch.batch_size = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_inverted_cpu_thresholds() {
        let mut config = base_config();
        config.monitor.throttle_cpu_percent = 95.0;
        config.monitor.critical_cpu_percent = 90.0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_template_without_placeholders() {
        let mut config = base_config();
        config.scraper.search_url_template = "https://example.com/search".to_string();
        assert!(validate(&config).is_err());
    }
}
