use chrono::{DateTime, Utc};
use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};

pub fn to_bson_date(at: DateTime<Utc>) -> BsonDateTime {
    BsonDateTime::from_millis(at.timestamp_millis())
}

pub fn to_chrono(at: BsonDateTime) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(at.timestamp_millis()).unwrap_or_default()
}

/// RFC 3339 rendering used in every JSON response.
pub fn fmt_date(at: BsonDateTime) -> String {
    to_chrono(at).to_rfc3339()
}

pub fn oid_hex(id: Option<ObjectId>) -> String {
    id.map(|id| id.to_hex()).unwrap_or_default()
}

pub fn ids_hex(ids: &[ObjectId]) -> Vec<String> {
    ids.iter().map(|id| id.to_hex()).collect()
}

/// Trims and rejects blank text fields.
pub fn required_text(value: &str, field: &str) -> Result<String, crate::utils::AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(crate::utils::AppError::Validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

/// Trimmed value, or None when missing or blank.
pub fn optional_text(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_bson_date_conversion() {
        let at = Utc.with_ymd_and_hms(2024, 4, 22, 8, 30, 0).unwrap();
        assert_eq!(to_chrono(to_bson_date(at)), at);
        assert_eq!(fmt_date(to_bson_date(at)), "2024-04-22T08:30:00+00:00");
    }

    #[test]
    fn test_required_text() {
        assert_eq!(required_text("  Bike to work ", "Title").unwrap(), "Bike to work");
        assert!(required_text("   ", "Title").is_err());
    }

    #[test]
    fn test_optional_text() {
        assert_eq!(optional_text(Some("  ".into())), None);
        assert_eq!(optional_text(Some(" Porto ".into())), Some("Porto".to_string()));
        assert_eq!(optional_text(None), None);
    }
}
