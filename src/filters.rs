//! View and time-window filtering over an already-fetched prospect
//! collection, plus offset/limit pagination of the filtered results.
//!
//! Everything here is pure: handlers pull the collection out of the cache
//! and pass `Utc::now()` in, so tests can pin the clock.

use crate::classify::parse_api_timestamp;
use crate::models::{DateWindow, Pagination, Prospect};
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Named boolean predicate applied as a single-pass filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewFilter {
    #[default]
    AllProspects,
    ActiveProspects,
    NeverActiveProspects,
    AssignedProspects,
    UnassignedProspects,
    MailableProspects,
    UnmailableProspects,
    UnsubscribedProspects,
    ProspectsNotInSalesforce,
    StarredProspects,
    ReviewedProspects,
}

/// Which prospect timestamp the time window applies to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateField {
    #[default]
    LastActivity,
    Created,
    Updated,
    FirstAssigned,
}

/// Named time-window presets. `This*` presets are open-ended to "now";
/// calendar `Last*` presets cover the complete prior period, fully closed,
/// while `Last7Days` rolls back from the current instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateRange {
    #[default]
    AllTime,
    Today,
    Yesterday,
    Last7Days,
    ThisMonth,
    LastMonth,
    ThisQuarter,
    LastQuarter,
    ThisYear,
    LastYear,
    Custom,
}

/// Filter selection as posted by clients.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterRequest {
    #[serde(default)]
    pub view: ViewFilter,
    #[serde(default)]
    pub date_field: DateField,
    #[serde(default)]
    pub date_range: DateRange,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

fn has_value(value: &Option<String>) -> bool {
    value.as_deref().map(|v| !v.trim().is_empty()).unwrap_or(false)
}

fn is_mailable(p: &Prospect) -> bool {
    has_value(&p.email)
        && !p.is_do_not_email.unwrap_or(false)
        && !p.opted_out.unwrap_or(false)
        && !p.is_email_hard_bounced.unwrap_or(false)
}

fn matches_view(p: &Prospect, view: ViewFilter) -> bool {
    match view {
        ViewFilter::AllProspects => true,
        ViewFilter::ActiveProspects => p.last_activity_at.is_some(),
        ViewFilter::NeverActiveProspects => p.last_activity_at.is_none(),
        ViewFilter::AssignedProspects => p.assigned_to_id.is_some(),
        ViewFilter::UnassignedProspects => p.assigned_to_id.is_none(),
        ViewFilter::MailableProspects => is_mailable(p),
        ViewFilter::UnmailableProspects => !is_mailable(p),
        ViewFilter::UnsubscribedProspects => {
            p.is_do_not_email.unwrap_or(false) || p.opted_out.unwrap_or(false)
        }
        ViewFilter::ProspectsNotInSalesforce => !has_value(&p.salesforce_id),
        ViewFilter::StarredProspects => p.is_starred.unwrap_or(false),
        ViewFilter::ReviewedProspects => p.is_reviewed.unwrap_or(false),
    }
}

fn selected_date(p: &Prospect, field: DateField) -> Option<&String> {
    match field {
        DateField::LastActivity => p.last_activity_at.as_ref(),
        DateField::Created => p.created_at.as_ref(),
        DateField::Updated => p.updated_at.as_ref(),
        DateField::FirstAssigned => p.first_assigned_at.as_ref(),
    }
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).expect("valid midnight"))
}

fn day_end(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(
        &date
            .and_hms_micro_opt(23, 59, 59, 999_999)
            .expect("valid end of day"),
    )
}

fn month_start(year: i32, month: u32) -> DateTime<Utc> {
    day_start(NaiveDate::from_ymd_opt(year, month, 1).expect("valid first of month"))
}

fn quarter_start_month(month: u32) -> u32 {
    ((month - 1) / 3) * 3 + 1
}

/// Resolves a named preset (or custom dates) into an absolute window.
/// Returns `None` for `all_time` or an unusable custom range.
pub fn resolve_window(request: &FilterRequest, now: DateTime<Utc>) -> Option<DateWindow> {
    let today = now.date_naive();
    match request.date_range {
        DateRange::AllTime => None,
        DateRange::Today => Some(DateWindow {
            start: day_start(today),
            end: now,
        }),
        DateRange::Yesterday => {
            let yesterday = today - Duration::days(1);
            Some(DateWindow {
                start: day_start(yesterday),
                end: day_end(yesterday),
            })
        }
        // Rolling window, not calendar-aligned like the other last_* presets
        DateRange::Last7Days => Some(DateWindow {
            start: now - Duration::days(7),
            end: now,
        }),
        DateRange::ThisMonth => Some(DateWindow {
            start: month_start(today.year(), today.month()),
            end: now,
        }),
        DateRange::LastMonth => {
            let this_month = month_start(today.year(), today.month());
            let last_day = this_month.date_naive() - Duration::days(1);
            Some(DateWindow {
                start: month_start(last_day.year(), last_day.month()),
                end: day_end(last_day),
            })
        }
        DateRange::ThisQuarter => Some(DateWindow {
            start: month_start(today.year(), quarter_start_month(today.month())),
            end: now,
        }),
        DateRange::LastQuarter => {
            let current_start = quarter_start_month(today.month());
            let (year, start_month) = if current_start == 1 {
                (today.year() - 1, 10)
            } else {
                (today.year(), current_start - 3)
            };
            let quarter_end = month_start(today.year(), current_start).date_naive() - Duration::days(1);
            // current_start == 1 means last quarter ended on Dec 31 of the
            // prior year, which the subtraction above already yields
            Some(DateWindow {
                start: month_start(year, start_month),
                end: day_end(quarter_end),
            })
        }
        DateRange::ThisYear => Some(DateWindow {
            start: month_start(today.year(), 1),
            end: now,
        }),
        DateRange::LastYear => Some(DateWindow {
            start: month_start(today.year() - 1, 1),
            end: day_end(
                NaiveDate::from_ymd_opt(today.year() - 1, 12, 31).expect("valid Dec 31"),
            ),
        }),
        DateRange::Custom => {
            let start = request
                .start_date
                .as_deref()
                .and_then(parse_api_timestamp)?;
            let end = request.end_date.as_deref().and_then(parse_api_timestamp)?;
            Some(DateWindow {
                start: day_start(start.date_naive()),
                end: day_end(end.date_naive()),
            })
        }
    }
}

/// Applies the view predicate and optional time window in a single pass.
///
/// A record lacking the selected date field is excluded from time-filtered
/// results; "filter to window X" has a stricter default than the inactivity
/// classification, which counts missing data as a signal.
pub fn apply_filters(
    prospects: &[Prospect],
    request: &FilterRequest,
    now: DateTime<Utc>,
) -> Vec<Prospect> {
    let window = resolve_window(request, now);

    prospects
        .iter()
        .filter(|p| matches_view(p, request.view))
        .filter(|p| {
            let Some(window) = window else {
                return true;
            };
            let Some(raw) = selected_date(p, request.date_field) else {
                return false;
            };
            match parse_api_timestamp(raw) {
                Some(date) => date >= window.start && date <= window.end,
                None => false,
            }
        })
        .cloned()
        .collect()
}

/// Offset/limit pagination: `pages = ceil(total / per_page)`.
///
/// `page` and `per_page` come straight from untrusted query parameters, so
/// the offset arithmetic saturates rather than overflowing.
pub fn paginate<T: Clone>(items: &[T], page: usize, per_page: usize) -> (Vec<T>, Pagination) {
    let page = page.max(1);
    let per_page = per_page.max(1);
    let total = items.len();
    let pages = total.div_ceil(per_page);
    let start = (page - 1).saturating_mul(per_page);
    let slice = if start >= total {
        Vec::new()
    } else {
        items[start..start.saturating_add(per_page).min(total)].to_vec()
    };
    (
        slice,
        Pagination {
            page,
            per_page,
            total,
            pages,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_now() -> DateTime<Utc> {
        // Mid-quarter Friday, far from month boundaries
        Utc.with_ymd_and_hms(2025, 5, 16, 15, 30, 0).unwrap()
    }

    fn with_created(id: u64, created: &str) -> Prospect {
        Prospect {
            id,
            created_at: Some(created.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_this_month_open_ended_to_now() {
        let window = resolve_window(
            &FilterRequest {
                date_range: DateRange::ThisMonth,
                ..Default::default()
            },
            fixed_now(),
        )
        .unwrap();
        assert_eq!(window.start, Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap());
        assert_eq!(window.end, fixed_now());
    }

    #[test]
    fn test_last_month_fully_closed() {
        let window = resolve_window(
            &FilterRequest {
                date_range: DateRange::LastMonth,
                ..Default::default()
            },
            fixed_now(),
        )
        .unwrap();
        assert_eq!(window.start, Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap());
        assert_eq!(window.end.date_naive(), NaiveDate::from_ymd_opt(2025, 4, 30).unwrap());
    }

    #[test]
    fn test_last_quarter_year_rollover() {
        let january = Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap();
        let window = resolve_window(
            &FilterRequest {
                date_range: DateRange::LastQuarter,
                ..Default::default()
            },
            january,
        )
        .unwrap();
        assert_eq!(window.start, Utc.with_ymd_and_hms(2024, 10, 1, 0, 0, 0).unwrap());
        assert_eq!(window.end.date_naive(), NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
    }

    #[test]
    fn test_record_without_selected_field_excluded() {
        let in_window = with_created(1, "2025-05-10T08:00:00Z");
        let missing = Prospect {
            id: 2,
            ..Default::default()
        };
        let request = FilterRequest {
            date_field: DateField::Created,
            date_range: DateRange::ThisMonth,
            ..Default::default()
        };

        let filtered = apply_filters(&[in_window, missing], &request, fixed_now());
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, 1);
    }

    #[test]
    fn test_custom_range_expands_to_day_bounds() {
        let request = FilterRequest {
            date_field: DateField::Created,
            date_range: DateRange::Custom,
            start_date: Some("2025-03-01".to_string()),
            end_date: Some("2025-03-31".to_string()),
            ..Default::default()
        };
        let late_on_last_day = with_created(1, "2025-03-31T23:50:00Z");
        let filtered = apply_filters(&[late_on_last_day], &request, fixed_now());
        assert_eq!(filtered.len(), 1);
    }

    #[test]
    fn test_view_mailable() {
        let mailable = Prospect {
            id: 1,
            email: Some("ok@x.com".to_string()),
            ..Default::default()
        };
        let bounced = Prospect {
            id: 2,
            email: Some("bounce@x.com".to_string()),
            is_email_hard_bounced: Some(true),
            ..Default::default()
        };
        let no_email = Prospect {
            id: 3,
            ..Default::default()
        };
        let request = FilterRequest {
            view: ViewFilter::MailableProspects,
            ..Default::default()
        };

        let filtered = apply_filters(&[mailable, bounced, no_email], &request, fixed_now());
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, 1);
    }

    #[test]
    fn test_last_7_days_rolls_from_now() {
        let window = resolve_window(
            &FilterRequest {
                date_range: DateRange::Last7Days,
                ..Default::default()
            },
            fixed_now(),
        )
        .unwrap();
        assert_eq!(window.start, fixed_now() - Duration::days(7));
        assert_eq!(window.end, fixed_now());
    }

    #[test]
    fn test_pagination_middle_page() {
        let items: Vec<u64> = (1..=25).collect();
        let (slice, pagination) = paginate(&items, 2, 10);
        assert_eq!(slice, (11..=20).collect::<Vec<u64>>());
        assert_eq!(pagination.pages, 3);
        assert_eq!(pagination.total, 25);
    }

    #[test]
    fn test_pagination_past_end_is_empty() {
        let items: Vec<u64> = (1..=5).collect();
        let (slice, pagination) = paginate(&items, 4, 10);
        assert!(slice.is_empty());
        assert_eq!(pagination.pages, 1);
    }

    #[test]
    fn test_pagination_extreme_geometry_saturates() {
        let items: Vec<u64> = (1..=5).collect();

        // Offset arithmetic must not overflow on hostile page numbers
        let (slice, pagination) = paginate(&items, usize::MAX, 1000);
        assert!(slice.is_empty());
        assert_eq!(pagination.total, 5);

        // Nor on a per-page size near the integer ceiling
        let (slice, pagination) = paginate(&items, 1, usize::MAX);
        assert_eq!(slice.len(), 5);
        assert_eq!(pagination.pages, 1);

        let (slice, _) = paginate(&items, usize::MAX, usize::MAX);
        assert!(slice.is_empty());
    }
}
