use chrono::{DateTime, Datelike, Duration, Months, NaiveTime, Utc};
use mongodb::bson::{doc, oid::ObjectId, Bson, Document};
use serde::Serialize;

use super::error::AppError;

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;

/// Normalized pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
}

impl Pagination {
    pub fn new(page: Option<u64>, limit: Option<u64>) -> Self {
        let page = page.unwrap_or(1).max(1);
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        Self { page, limit }
    }

    /// Capped at `i64::MAX`, the largest skip the server accepts; past the end is an empty page.
    pub fn skip(&self) -> u64 {
        self.page
            .saturating_sub(1)
            .saturating_mul(self.limit)
            .min(i64::MAX as u64)
    }

    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(self.limit)
    }
}

/// List envelope shared by every paginated endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub success: bool,
    pub items: Vec<T>,
    pub total_pages: u64,
    pub current_page: u64,
    pub total: u64,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total: u64, pagination: Pagination) -> Self {
        Self {
            success: true,
            items,
            total_pages: pagination.total_pages(total),
            current_page: pagination.page,
            total,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            success: self.success,
            items: self.items.into_iter().map(f).collect(),
            total_pages: self.total_pages,
            current_page: self.current_page,
            total: self.total,
        }
    }
}

/// Case-insensitive `$or` regex filter over `fields`. Returns `None` for a blank term.
pub fn search_filter(term: Option<&str>, fields: &[&str]) -> Option<Bson> {
    let term = term.map(str::trim).filter(|t| !t.is_empty())?;
    let pattern = regex::escape(term);

    let clauses: Vec<Bson> = fields
        .iter()
        .map(|field| {
            let mut clause = Document::new();
            clause.insert(*field, doc! { "$regex": pattern.as_str(), "$options": "i" });
            Bson::Document(clause)
        })
        .collect();

    Some(Bson::Array(clauses))
}

/// Adds `$or` search clauses to an existing filter.
pub fn apply_search(filter: &mut Document, term: Option<&str>, fields: &[&str]) {
    if let Some(clauses) = search_filter(term, fields) {
        filter.insert("$or", clauses);
    }
}

pub fn parse_object_id(id: &str, what: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(id).map_err(|_| AppError::Validation(format!("Invalid {} ID", what)))
}

/// Midnight UTC of the day containing `at`.
pub fn day_start(at: DateTime<Utc>) -> DateTime<Utc> {
    at.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Lower bound for a named reporting period (`week`, `month`); `None` means all time.
pub fn period_start(period: Option<&str>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match period {
        Some("week") => Some(day_start(now) - Duration::days(6)),
        Some("month") => Some(day_start(now) - Duration::days(29)),
        _ => None,
    }
}

/// Midnight UTC on the first day of the month `months` months before `now`'s month.
pub fn months_back_start(now: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    let first = now.date_naive().with_day(1).unwrap_or(now.date_naive());
    first
        .checked_sub_months(Months::new(months))
        .unwrap_or(first)
        .and_time(NaiveTime::MIN)
        .and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_pagination_defaults() {
        let p = Pagination::new(None, None);
        assert_eq!(p, Pagination { page: 1, limit: 10 });
        assert_eq!(p.skip(), 0);
    }

    #[test]
    fn test_pagination_clamps() {
        let p = Pagination::new(Some(0), Some(0));
        assert_eq!(p, Pagination { page: 1, limit: 1 });

        let p = Pagination::new(Some(3), Some(1000));
        assert_eq!(p.limit, MAX_PAGE_SIZE);
        assert_eq!(p.skip(), 200);
    }

    #[test]
    fn test_huge_page_does_not_overflow() {
        let p = Pagination::new(Some(u64::MAX), Some(10));
        assert_eq!(p.skip(), i64::MAX as u64);
        assert_eq!(p.total_pages(15), 2);
    }

    #[test]
    fn test_second_page_of_fifteen() {
        let p = Pagination::new(Some(2), Some(10));
        assert_eq!(p.skip(), 10);
        assert_eq!(p.total_pages(15), 2);

        let page: Paginated<u32> = Paginated::new((10..15).collect(), 15, p);
        assert_eq!(page.items.len(), 5);
        assert_eq!(page.current_page, 2);
        assert_eq!(page.total_pages, 2);
    }

    #[test]
    fn test_total_pages_edges() {
        let p = Pagination::new(Some(1), Some(10));
        assert_eq!(p.total_pages(0), 0);
        assert_eq!(p.total_pages(10), 1);
        assert_eq!(p.total_pages(11), 2);
    }

    #[test]
    fn test_paginated_serializes_camel_case() {
        let page: Paginated<u32> = Paginated::new(vec![1], 1, Pagination::new(None, None));
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["totalPages"], 1);
        assert_eq!(json["currentPage"], 1);
        assert_eq!(json["total"], 1);
    }

    #[test]
    fn test_search_filter_escapes_and_ors() {
        let clauses = search_filter(Some(" bike (commute) "), &["title", "description"]).unwrap();
        let arr = clauses.as_array().unwrap();
        assert_eq!(arr.len(), 2);

        let first = arr[0].as_document().unwrap().get_document("title").unwrap();
        assert_eq!(first.get_str("$regex").unwrap(), r"bike \(commute\)");
        assert_eq!(first.get_str("$options").unwrap(), "i");
    }

    #[test]
    fn test_blank_search_is_ignored() {
        assert!(search_filter(None, &["name"]).is_none());
        assert!(search_filter(Some("   "), &["name"]).is_none());

        let mut filter = doc! { "category": "energy" };
        apply_search(&mut filter, Some(""), &["name"]);
        assert!(!filter.contains_key("$or"));
    }

    #[test]
    fn test_parse_object_id() {
        assert!(parse_object_id("65f1c0d2a1b2c3d4e5f60718", "action").is_ok());
        match parse_object_id("nope", "action") {
            Err(AppError::Validation(msg)) => assert_eq!(msg, "Invalid action ID"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_day_start_truncates() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 23, 59, 58).unwrap();
        assert_eq!(day_start(at), Utc.with_ymd_and_hms(2024, 3, 9, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_period_start() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();
        assert_eq!(
            period_start(Some("week"), now),
            Some(Utc.with_ymd_and_hms(2024, 3, 3, 0, 0, 0).unwrap())
        );
        assert_eq!(
            period_start(Some("month"), now),
            Some(Utc.with_ymd_and_hms(2024, 2, 9, 0, 0, 0).unwrap())
        );
        assert_eq!(period_start(Some("all"), now), None);
        assert_eq!(period_start(None, now), None);
    }

    #[test]
    fn test_months_back_start() {
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 18, 0, 0).unwrap();
        assert_eq!(months_back_start(now, 11), Utc.with_ymd_and_hms(2023, 4, 1, 0, 0, 0).unwrap());
        assert_eq!(months_back_start(now, 0), Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
    }
}
