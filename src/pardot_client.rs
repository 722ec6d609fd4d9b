use crate::config::Config;
use crate::errors::AppError;
use crate::models::{ApiPage, IdRecord, Prospect};
use chrono::{Duration, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;

/// Reduced field projection used by the health aggregator; enough for
/// date-window and opt-out classification only.
pub const REPORT_FIELDS: &str = "id,email,createdAt,updatedAt,isDoNotEmail,optedOut";

/// Full projection used by the prospect health analysis and filter layer.
pub const PROSPECT_HEALTH_FIELDS: &str = "id,email,firstName,lastName,company,country,jobTitle,\
score,grade,lastActivityAt,createdAt,updatedAt,firstAssignedAt,isDoNotEmail,optedOut,\
isEmailHardBounced,isStarred,isReviewed,assignedToId,salesforceId";

/// Projection for the data-quality sample.
pub const QUALITY_FIELDS: &str =
    "id,email,firstName,lastName,company,industry,country,phone,jobTitle,city";

/// Client for the upstream marketing-automation REST API.
///
/// Built per request from the caller's bearer token; every call carries the
/// token plus the tenant business-unit header. All requests share one
/// uniform timeout and there are no retries: report generation prefers
/// partial data over latency spikes.
#[derive(Clone)]
pub struct PardotClient {
    client: Client,
    base_url: String,
    token: String,
    business_unit_id: String,
    page_limit: usize,
    max_pages: usize,
    activity_max_pages: usize,
}

impl PardotClient {
    pub fn new(config: &Config, token: &str) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create API client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.api_base_url.clone(),
            token: token.to_string(),
            business_unit_id: config.business_unit_id.clone(),
            page_limit: config.page_limit,
            max_pages: config.max_pages,
            activity_max_pages: config.activity_max_pages,
        })
    }

    fn object_url(&self, resource: &str, params: &[(String, String)]) -> Result<reqwest::Url, AppError> {
        reqwest::Url::parse_with_params(&format!("{}/{}", self.base_url, resource), params)
            .map_err(|e| AppError::ExternalApiError(format!("Failed to build URL: {}", e)))
    }

    async fn get_page<T: DeserializeOwned>(&self, url: reqwest::Url) -> Result<ApiPage<T>, AppError> {
        let response = self
            .client
            .get(url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Pardot-Business-Unit-Id", &self.business_unit_id)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("API request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!("API returned error {}: {}", status, error_text);
            return Err(AppError::ExternalApiError(format!(
                "API returned status {}: {}",
                status, error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Failed to parse API response: {}", e)))
    }

    /// Fetches a collection with cursor (`nextPageToken`) pagination.
    ///
    /// The first request carries `limit` and any filter parameters, later
    /// requests only the continuation token. Stops on an empty page, a
    /// missing token, or the page ceiling. A failure before anything was
    /// accumulated is a hard error; a mid-stream failure logs a warning and
    /// returns the partial accumulation.
    pub async fn fetch_all<T: DeserializeOwned>(
        &self,
        resource: &str,
        fields: &str,
        filters: &[(&str, String)],
        max_pages: usize,
    ) -> Result<Vec<T>, AppError> {
        let mut all: Vec<T> = Vec::new();
        let mut next_token: Option<String> = None;

        for page_index in 0..max_pages {
            let mut params: Vec<(String, String)> =
                vec![("fields".to_string(), fields.to_string())];
            match &next_token {
                Some(token) => params.push(("nextPageToken".to_string(), token.clone())),
                None => {
                    params.push(("limit".to_string(), self.page_limit.to_string()));
                    for (key, value) in filters {
                        params.push((key.to_string(), value.clone()));
                    }
                }
            }

            let url = self.object_url(resource, &params)?;
            let page: ApiPage<T> = match self.get_page(url).await {
                Ok(page) => page,
                Err(e) if all.is_empty() => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        "Pagination of {} stopped after {} records: {}",
                        resource,
                        all.len(),
                        e
                    );
                    return Ok(all);
                }
            };

            let fetched = page.values.len();
            all.extend(page.values);
            tracing::debug!(
                "Fetched {} {} records (page {}, total: {})",
                fetched,
                resource,
                page_index + 1,
                all.len()
            );

            next_token = page.next_page_token;
            if next_token.is_none() || fetched == 0 {
                break;
            }
        }

        Ok(all)
    }

    /// Fetches the full prospect collection following `nextPageUrl` links,
    /// capped at `record_cap` records to bound worst-case latency against
    /// very large remote databases.
    pub async fn fetch_prospects_by_url(
        &self,
        fields: &str,
        record_cap: usize,
    ) -> Result<Vec<Prospect>, AppError> {
        let mut all: Vec<Prospect> = Vec::new();
        let first = self.object_url(
            "prospects",
            &[
                ("fields".to_string(), fields.to_string()),
                ("limit".to_string(), self.page_limit.to_string()),
            ],
        )?;
        let mut next_url = Some(first);

        while let Some(url) = next_url.take() {
            let page: ApiPage<Prospect> = match self.get_page(url).await {
                Ok(page) => page,
                Err(e) if all.is_empty() => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        "Prospect fetch stopped after {} records: {}",
                        all.len(),
                        e
                    );
                    return Ok(all);
                }
            };

            let fetched = page.values.len();
            all.extend(page.values);
            tracing::debug!("Fetched {} prospect records (total: {})", fetched, all.len());

            if fetched == 0 || all.len() >= record_cap {
                break;
            }
            next_url = match page.next_page_url.as_deref() {
                Some(raw) => Some(reqwest::Url::parse(raw).map_err(|e| {
                    AppError::ExternalApiError(format!("Invalid nextPageUrl: {}", e))
                })?),
                None => None,
            };
        }

        Ok(all)
    }

    /// Counts prospects by paging an id-only projection.
    pub async fn count_prospects(&self, filters: &[(&str, String)]) -> Result<usize, AppError> {
        let ids: Vec<IdRecord> = self
            .fetch_all("prospects", "id", filters, self.max_pages)
            .await?;
        Ok(ids.len())
    }

    /// Fetches a single bounded sample page for data-quality estimation.
    pub async fn fetch_sample(&self, limit: usize) -> Result<Vec<Prospect>, AppError> {
        let url = self.object_url(
            "prospects",
            &[
                ("fields".to_string(), QUALITY_FIELDS.to_string()),
                ("limit".to_string(), limit.to_string()),
            ],
        )?;
        let page: ApiPage<Prospect> = self.get_page(url).await?;
        Ok(page.values)
    }

    /// Counts visitor activities, optionally restricted by type and a
    /// trailing day window. Activity reads use a tighter page ceiling.
    pub async fn count_activities(
        &self,
        activity_type: Option<&str>,
        days_back: Option<i64>,
    ) -> Result<usize, AppError> {
        let mut filters: Vec<(&str, String)> = Vec::new();
        if let Some(activity_type) = activity_type {
            filters.push(("type", activity_type.to_string()));
        }
        if let Some(days) = days_back {
            let cutoff = Utc::now() - Duration::days(days);
            filters.push((
                "createdAtAfter",
                cutoff.format("%Y-%m-%dT%H:%M:%S.000Z").to_string(),
            ));
        }

        let records: Vec<IdRecord> = self
            .fetch_all(
                "visitor-activities",
                "id,type,createdAt",
                &filters,
                self.activity_max_pages,
            )
            .await?;
        Ok(records.len())
    }
}
