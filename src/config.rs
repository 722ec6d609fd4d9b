use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    /// Base URL of the marketing API object endpoints.
    pub api_base_url: String,
    /// Tenant identifier sent with every upstream request.
    pub business_unit_id: String,
    /// Records requested per page.
    pub page_limit: usize,
    /// Hard page ceiling for cursor-paginated prospect reads.
    pub max_pages: usize,
    /// Hard page ceiling for visitor-activity reads.
    pub activity_max_pages: usize,
    /// Record cap for the full prospect read used by the health analysis.
    pub prospect_record_cap: usize,
    /// Sample size for the data-quality / duplicate estimation.
    pub sample_size: usize,
    /// Per-request timeout for outbound API calls, in seconds.
    pub request_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            api_base_url: std::env::var("MARKETING_API_BASE_URL")
                .unwrap_or_else(|_| "https://pi.pardot.com/api/v5/objects".to_string())
                .trim_end_matches('/')
                .to_string(),
            business_unit_id: std::env::var("BUSINESS_UNIT_ID")
                .map_err(|_| anyhow::anyhow!("BUSINESS_UNIT_ID environment variable required"))
                .and_then(|id| {
                    if id.trim().is_empty() {
                        anyhow::bail!("BUSINESS_UNIT_ID cannot be empty");
                    }
                    Ok(id)
                })?,
            page_limit: parse_env_or("PAGE_LIMIT", 1000)?,
            max_pages: parse_env_or("MAX_PAGES", 20)?,
            activity_max_pages: parse_env_or("ACTIVITY_MAX_PAGES", 5)?,
            prospect_record_cap: parse_env_or("PROSPECT_RECORD_CAP", 10_000)?,
            sample_size: parse_env_or("SAMPLE_SIZE", 1000)?,
            request_timeout_secs: parse_env_or("REQUEST_TIMEOUT_SECS", 30)?,
        };

        let parsed = url::Url::parse(&config.api_base_url)
            .map_err(|e| anyhow::anyhow!("MARKETING_API_BASE_URL is not a valid URL: {}", e))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            anyhow::bail!("MARKETING_API_BASE_URL must use http:// or https://");
        }
        if config.sample_size == 0 {
            anyhow::bail!("SAMPLE_SIZE must be greater than zero");
        }

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Marketing API base URL: {}", config.api_base_url);
        tracing::debug!("Server Port: {}", config.port);
        tracing::debug!(
            "Fetch limits: {} per page, {} pages max, sample size {}",
            config.page_limit,
            config.max_pages,
            config.sample_size
        );

        Ok(config)
    }
}

fn parse_env_or<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr + Copy,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a valid number", name)),
        Err(_) => Ok(default),
    }
}
