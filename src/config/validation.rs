use crate::config::types::{Config, CrawlerConfig, StorageConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_storage_config(&config.storage)?;
    validate_seeds(&config.seeds)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.min_crawl_delay > config.max_crawl_delay {
        return Err(ConfigError::Validation(format!(
            "min_crawl_delay ({}s) must not exceed max_crawl_delay ({}s)",
            config.min_crawl_delay, config.max_crawl_delay
        )));
    }

    if config.batch_size < 1 || config.batch_size > 1000 {
        return Err(ConfigError::Validation(format!(
            "batch_size must be between 1 and 1000, got {}",
            config.batch_size
        )));
    }

    if config.max_pages == Some(0) {
        return Err(ConfigError::Validation(
            "max_pages must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    validate_table_name(&config.page_table)?;
    validate_table_name(&config.pending_table)?;

    if config.page_table.eq_ignore_ascii_case(&config.pending_table) {
        return Err(ConfigError::Validation(format!(
            "page_table and pending_table must differ, both are '{}'",
            config.page_table
        )));
    }

    Ok(())
}

/// Validates seed URLs: absolute http(s) URLs with a host
fn validate_seeds(seeds: &[String]) -> Result<(), ConfigError> {
    for seed in seeds {
        let url = Url::parse(seed)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "Seed URL '{}' must use http or https",
                seed
            )));
        }

        if url.host_str().is_none() {
            return Err(ConfigError::InvalidUrl(format!(
                "Seed URL '{}' has no host",
                seed
            )));
        }
    }

    Ok(())
}

/// Validates a SQL table identifier
///
/// Table names are spliced into statement text, so only `[A-Za-z_][A-Za-z0-9_]*`
/// is accepted.
pub fn validate_table_name(name: &str) -> Result<(), ConfigError> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);

    if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ConfigError::InvalidTableName(format!(
            "'{}' must match [A-Za-z_][A-Za-z0-9_]*",
            name
        )));
    }

    if name.len() > 63 {
        return Err(ConfigError::InvalidTableName(format!(
            "'{}' is longer than 63 characters",
            name
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_table_name() {
        assert!(validate_table_name("crawled_pages").is_ok());
        assert!(validate_table_name("_pending2").is_ok());

        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("2pages").is_err());
        assert!(validate_table_name("pages; DROP TABLE x").is_err());
        assert!(validate_table_name("pages-table").is_err());
        assert!(validate_table_name(&"a".repeat(64)).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("admin@sub.example.com").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("invalid").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user@").is_err());
        assert!(validate_email("user@domain").is_err());
        assert!(validate_email("a@b@c.com").is_err());
    }

    #[test]
    fn test_delay_range() {
        let mut config = CrawlerConfig {
            min_crawl_delay: 5,
            max_crawl_delay: 2,
            batch_size: 1,
            max_pages: None,
            max_robots_crawl_delay: 60,
        };
        assert!(validate_crawler_config(&config).is_err());

        config.max_crawl_delay = 5;
        assert!(validate_crawler_config(&config).is_ok());

        config.batch_size = 0;
        assert!(validate_crawler_config(&config).is_err());
    }

    #[test]
    fn test_seeds_must_be_http() {
        assert!(validate_seeds(&["https://example.com/".to_string()]).is_ok());
        assert!(validate_seeds(&["ftp://example.com/".to_string()]).is_err());
        assert!(validate_seeds(&["not a url".to_string()]).is_err());
    }
}
