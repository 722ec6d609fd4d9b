use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============ Upstream API Models ============

/// A prospect (contact/lead) record as returned by the marketing API.
///
/// Every field except `id` is optional: the API only returns the fields
/// requested through the `fields` projection, and even requested fields may
/// be null for a given record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Prospect {
    /// Unique prospect identifier.
    pub id: u64,
    /// Email address; the de-duplication key when present.
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company: Option<String>,
    pub job_title: Option<String>,
    pub industry: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
    /// Creation timestamp (ISO-8601 string as sent by the API).
    pub created_at: Option<String>,
    /// Last update timestamp.
    pub updated_at: Option<String>,
    /// Last recorded activity timestamp; absent means never active.
    pub last_activity_at: Option<String>,
    pub first_assigned_at: Option<String>,
    pub first_activity_at: Option<String>,
    pub is_do_not_email: Option<bool>,
    pub opted_out: Option<bool>,
    pub is_email_hard_bounced: Option<bool>,
    pub is_starred: Option<bool>,
    pub is_reviewed: Option<bool>,
    pub assigned_to_id: Option<u64>,
    pub salesforce_id: Option<String>,
    pub campaign_id: Option<u64>,
    /// Lead score; may be negative.
    pub score: Option<i64>,
    /// Letter grade (A through F, optionally with +/-).
    pub grade: Option<String>,
}

/// One page of an upstream collection read.
///
/// Endpoints advance with either `nextPageToken` (cursor style) or
/// `nextPageUrl` (full-URL style) depending on the resource family.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPage<T> {
    #[serde(default = "Vec::new")]
    pub values: Vec<T>,
    #[serde(default)]
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub next_page_url: Option<String>,
}

/// Minimal record used for count-only and activity reads.
#[derive(Debug, Clone, Deserialize)]
pub struct IdRecord {
    #[allow(dead_code)]
    pub id: u64,
}

// ============ Classification Outputs ============

/// A group of prospects sharing the same normalized email address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub email: String,
    pub count: usize,
    pub members: Vec<DuplicateMember>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateMember {
    pub id: u64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: Option<String>,
}

/// Days since last activity for an inactive prospect.
///
/// Serializes to a JSON number, or to the strings `"Never"` (no activity
/// timestamp at all) and `"Unknown"` (timestamp present but unparseable).
#[derive(Debug, Clone, PartialEq)]
pub enum DaysInactive {
    Days(i64),
    Never,
    Unknown,
}

impl Serialize for DaysInactive {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DaysInactive::Days(d) => serializer.serialize_i64(*d),
            DaysInactive::Never => serializer.serialize_str("Never"),
            DaysInactive::Unknown => serializer.serialize_str("Unknown"),
        }
    }
}

impl<'de> Deserialize<'de> for DaysInactive {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        match value {
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(DaysInactive::Days)
                .ok_or_else(|| serde::de::Error::custom("invalid day count")),
            serde_json::Value::String(s) if s == "Never" => Ok(DaysInactive::Never),
            serde_json::Value::String(s) if s == "Unknown" => Ok(DaysInactive::Unknown),
            other => Err(serde::de::Error::custom(format!(
                "invalid daysInactive value: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InactiveRecord {
    pub id: u64,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company: Option<String>,
    pub last_activity_at: Option<String>,
    pub days_inactive: DaysInactive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingFieldsRecord {
    pub id: u64,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company: Option<String>,
    pub missing_fields: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringIssueRecord {
    pub id: u64,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company: Option<String>,
    pub score: Option<i64>,
    pub grade: Option<String>,
    pub last_activity_at: Option<String>,
    pub issues: Vec<String>,
}

/// Full output of the prospect health analysis, cached as one unit and
/// sliced by the paginated tab endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProspectAnalysis {
    pub total_prospects: usize,
    pub all_prospects: Vec<Prospect>,
    pub duplicates: Vec<DuplicateGroup>,
    pub inactive_prospects: Vec<InactiveRecord>,
    pub missing_fields: Vec<MissingFieldsRecord>,
    pub scoring_issues: Vec<ScoringIssueRecord>,
}

impl ProspectAnalysis {
    /// Prospects with at least one recorded activity.
    pub fn active_prospects(&self) -> Vec<Prospect> {
        self.all_prospects
            .iter()
            .filter(|p| p.last_activity_at.is_some())
            .cloned()
            .collect()
    }
}

// ============ Health Report (renderer contract) ============

/// One row of a report section table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricRow {
    pub metric: String,
    pub count: u64,
    pub percentage: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry_standard: Option<String>,
}

impl MetricRow {
    pub fn new(metric: &str, count: u64, percentage: String) -> Self {
        Self {
            metric: metric.to_string(),
            count,
            percentage,
            industry_standard: None,
        }
    }

    pub fn with_standard(metric: &str, count: u64, percentage: String, standard: &str) -> Self {
        Self {
            metric: metric.to_string(),
            count,
            percentage,
            industry_standard: Some(standard.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportSection {
    pub table_data: Vec<MetricRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_database: u64,
    pub active_leads_6m: u64,
    pub marketable_leads: u64,
    pub engagement_rate: f64,
    pub marketability_rate: f64,
}

/// Chart dataset. Color fields mirror the renderer's expectations: a single
/// color string for line charts, an array of colors for bar/pie charts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDataset {
    pub label: String,
    pub data: Vec<u64>,
    pub background_color: serde_json::Value,
    pub border_color: serde_json::Value,
    pub border_width: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<ChartDataset>,
}

/// Self-contained chart descriptor; renderers need no additional lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartDescriptor {
    pub id: String,
    #[serde(rename = "type")]
    pub chart_type: String,
    pub title: String,
    pub data: ChartData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub description: String,
    pub action: String,
}

impl Recommendation {
    pub fn new(kind: &str, title: &str, description: String, action: &str) -> Self {
        Self {
            kind: kind.to_string(),
            title: title.to_string(),
            description,
            action: action.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Recommendations {
    pub active_contacts: Vec<Recommendation>,
    pub inactive_contacts: Vec<Recommendation>,
    pub empty_details: Vec<Recommendation>,
    pub scoring_issues: Vec<Recommendation>,
}

/// The aggregator's output and the sole contract report renderers depend
/// on. Section names and row shapes must stay stable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub active_contacts: ReportSection,
    pub inactive_contacts: ReportSection,
    pub empty_details: ReportSection,
    pub scoring_issues: ReportSection,
    pub summary: ReportSummary,
    pub chart_data: Vec<ChartDescriptor>,
    pub recommendations: Recommendations,
}

// ============ Request / Response Models ============

/// Query parameters accepted by the report endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportQueryParams {
    pub filter_type: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageParams {
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_per_page")]
    pub per_page: usize,
}

fn default_page() -> usize {
    1
}

fn default_per_page() -> usize {
    10
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pagination {
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub pages: usize,
}

/// Body of `POST /api/v1/prospects/filter`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterProspectsBody {
    #[serde(default)]
    pub filters: crate::filters::FilterRequest,
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_per_page")]
    pub per_page: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActivityCountParams {
    #[serde(rename = "type")]
    pub activity_type: Option<String>,
    pub days_back: Option<i64>,
}

/// Headline counts returned by `GET /api/v1/prospects/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProspectHealthSummary {
    pub total_prospects: usize,
    pub active_prospects: usize,
    pub duplicate_count: usize,
    pub inactive_count: usize,
    pub missing_fields_count: usize,
    pub scoring_issues_count: usize,
    pub health_score: String,
}

impl ProspectHealthSummary {
    pub fn from_analysis(analysis: &ProspectAnalysis) -> Self {
        let active = analysis
            .all_prospects
            .iter()
            .filter(|p| p.last_activity_at.is_some())
            .count();
        Self {
            total_prospects: analysis.total_prospects,
            active_prospects: active,
            duplicate_count: analysis.duplicates.len(),
            inactive_count: analysis.inactive_prospects.len(),
            missing_fields_count: analysis.missing_fields.len(),
            scoring_issues_count: analysis.scoring_issues.len(),
            health_score: if analysis.duplicates.is_empty() {
                "Good".to_string()
            } else {
                "Needs Attention".to_string()
            },
        }
    }
}

/// A time window resolved from a named preset or explicit dates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DateWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}
