//! Pure classification functions over an in-memory prospect collection.
//!
//! No I/O happens here: the fetcher hands over a `Vec<Prospect>` and every
//! function below is deterministic given the same input order.

use crate::models::{
    DaysInactive, DuplicateGroup, DuplicateMember, InactiveRecord, MissingFieldsRecord, Prospect,
    ScoringIssueRecord,
};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::collections::HashMap;

/// Values that count as "missing" even when a field is technically filled.
const PLACEHOLDER_TOKENS: [&str; 4] = ["none", "null", "n/a", "undefined"];

/// Critical fields checked by `find_missing_fields`, in report order.
const CRITICAL_FIELDS: [&str; 5] = ["firstName", "lastName", "company", "jobTitle", "country"];

/// Default inactivity cutoff in days.
pub const DEFAULT_INACTIVE_DAYS: i64 = 90;

/// Lowercases and trims an email for de-duplication. Returns `None` for
/// blank values and the `n/a` placeholder, which excludes the record from
/// duplicate detection entirely.
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_lowercase();
    if normalized.is_empty() || normalized == "n/a" {
        None
    } else {
        Some(normalized)
    }
}

/// True when a field value is blank, or one of the placeholder tokens that
/// data-entry tools leave behind.
pub fn is_blank_or_placeholder(value: Option<&String>) -> bool {
    match value {
        None => true,
        Some(v) => {
            let trimmed = v.trim();
            trimmed.is_empty() || PLACEHOLDER_TOKENS.contains(&trimmed.to_lowercase().as_str())
        }
    }
}

/// Parses timestamps as the API emits them: RFC 3339 with or without a `Z`
/// suffix, a naive `YYYY-MM-DDTHH:MM:SS`, or a bare date.
pub fn parse_api_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }
    None
}

/// Groups prospects by normalized email and returns every group with more
/// than one member. Groups and members keep their original encounter order.
pub fn find_duplicates(prospects: &[Prospect]) -> Vec<DuplicateGroup> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<&Prospect>> = HashMap::new();

    for prospect in prospects {
        let Some(email) = prospect.email.as_deref().and_then(normalize_email) else {
            continue;
        };
        let entry = groups.entry(email.clone()).or_default();
        if entry.is_empty() {
            order.push(email);
        }
        entry.push(prospect);
    }

    order
        .into_iter()
        .filter_map(|email| {
            let members = groups.remove(&email)?;
            if members.len() < 2 {
                return None;
            }
            Some(DuplicateGroup {
                count: members.len(),
                members: members
                    .iter()
                    .map(|p| DuplicateMember {
                        id: p.id,
                        first_name: p.first_name.clone(),
                        last_name: p.last_name.clone(),
                        created_at: p.created_at.clone(),
                    })
                    .collect(),
                email,
            })
        })
        .collect()
}

/// Finds prospects with no activity inside the cutoff window.
///
/// Prospects with no recorded activity at all are included as `"Never"`,
/// and unparseable timestamps as `"Unknown"`: absence of activity data is
/// itself treated as an inactivity signal.
pub fn find_inactive(prospects: &[Prospect], days: i64, now: DateTime<Utc>) -> Vec<InactiveRecord> {
    let cutoff = now - Duration::days(days);
    let mut inactive = Vec::new();

    for prospect in prospects {
        let days_inactive = match prospect.last_activity_at.as_deref() {
            None => DaysInactive::Never,
            Some(raw) => match parse_api_timestamp(raw) {
                Some(activity_date) => {
                    if activity_date >= cutoff {
                        continue;
                    }
                    DaysInactive::Days((now - activity_date).num_days())
                }
                None => DaysInactive::Unknown,
            },
        };
        inactive.push(InactiveRecord {
            id: prospect.id,
            email: prospect.email.clone(),
            first_name: prospect.first_name.clone(),
            last_name: prospect.last_name.clone(),
            company: prospect.company.clone(),
            last_activity_at: prospect.last_activity_at.clone(),
            days_inactive,
        });
    }

    inactive
}

/// Finds prospects missing at least one critical field. The emitted list
/// names every missing field, not just the first one found.
pub fn find_missing_fields(prospects: &[Prospect]) -> Vec<MissingFieldsRecord> {
    let mut missing = Vec::new();

    for prospect in prospects {
        let mut missing_fields = Vec::new();
        for field in CRITICAL_FIELDS {
            let value = match field {
                "firstName" => prospect.first_name.as_ref(),
                "lastName" => prospect.last_name.as_ref(),
                "company" => prospect.company.as_ref(),
                "jobTitle" => prospect.job_title.as_ref(),
                "country" => prospect.country.as_ref(),
                _ => unreachable!(),
            };
            if is_blank_or_placeholder(value) {
                missing_fields.push(field.to_string());
            }
        }

        if !missing_fields.is_empty() {
            missing.push(MissingFieldsRecord {
                id: prospect.id,
                email: prospect.email.clone(),
                first_name: prospect.first_name.clone(),
                last_name: prospect.last_name.clone(),
                company: prospect.company.clone(),
                missing_fields,
            });
        }
    }

    missing
}

/// Expected score range for a letter grade. A prospect graded `A` should
/// score 75 or higher, `B` 50-74, `C` 25-49, `D` below 25.
fn grade_matches_score(grade: &str, score: i64) -> bool {
    match grade.trim().chars().next().map(|c| c.to_ascii_uppercase()) {
        Some('A') => score >= 75,
        Some('B') => (50..=74).contains(&score),
        Some('C') => (25..=49).contains(&score),
        Some('D') => score < 25,
        _ => true,
    }
}

/// Evaluates the scoring consistency rules independently per prospect.
/// A single prospect may accumulate several issue codes; a record is only
/// emitted when at least one rule fires.
pub fn find_scoring_issues(prospects: &[Prospect]) -> Vec<ScoringIssueRecord> {
    let mut flagged = Vec::new();

    for prospect in prospects {
        let mut issues = Vec::new();

        if let (Some(grade), Some(score)) = (prospect.grade.as_deref(), prospect.score) {
            if !grade_matches_score(grade, score) {
                issues.push("grade_score_mismatch".to_string());
            }
        }
        if let Some(score) = prospect.score {
            if score < 0 {
                issues.push("negative_score".to_string());
            }
            if score > 1000 {
                issues.push("unusually_high_score".to_string());
            }
            if score == 0 && prospect.last_activity_at.is_some() {
                issues.push("active_with_zero_score".to_string());
            }
        }

        if !issues.is_empty() {
            flagged.push(ScoringIssueRecord {
                id: prospect.id,
                email: prospect.email.clone(),
                first_name: prospect.first_name.clone(),
                last_name: prospect.last_name.clone(),
                company: prospect.company.clone(),
                score: prospect.score,
                grade: prospect.grade.clone(),
                last_activity_at: prospect.last_activity_at.clone(),
                issues,
            });
        }
    }

    flagged
}
