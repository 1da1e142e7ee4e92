use crate::config::AppConfig;
use crate::errors::ApiError;
use validator::Validate;

/// Validate request input
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ApiError> {
    input
        .validate()
        .map_err(|e| ApiError::ValidationError(format!("Validation failed: {}", e)))
}

/// Resolve raw page/limit query values against configured defaults and caps.
/// Page is 1-based; a missing or zero limit falls back to the default and is
/// clamped to the configured maximum.
pub fn page_and_limit(page: Option<u64>, limit: Option<u64>, config: &AppConfig) -> (u64, u64) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit
        .unwrap_or(config.api_default_page_size)
        .clamp(1, config.api_max_page_size);
    (page, limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        AppConfig::new(
            "sqlite::memory:".into(),
            "x".repeat(64),
            3600,
            "127.0.0.1".into(),
            0,
            "development".into(),
        )
    }

    #[test]
    fn limit_defaults_and_caps() {
        let cfg = config();

        assert_eq!(
            page_and_limit(None, None, &cfg),
            (1, cfg.api_default_page_size)
        );
        assert_eq!(
            page_and_limit(Some(0), Some(10_000), &cfg),
            (1, cfg.api_max_page_size)
        );
        assert_eq!(page_and_limit(Some(3), Some(0), &cfg), (3, 1));
    }
}
