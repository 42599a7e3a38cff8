use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};

use super::common::{fmt_date, oid_hex};
use crate::utils::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ActionCategory {
    Transport,
    Energy,
    Food,
    Waste,
    Water,
    Shopping,
    Other,
}

impl ActionCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionCategory::Transport => "transport",
            ActionCategory::Energy => "energy",
            ActionCategory::Food => "food",
            ActionCategory::Waste => "waste",
            ActionCategory::Water => "water",
            ActionCategory::Shopping => "shopping",
            ActionCategory::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    #[default]
    Daily,
    Weekly,
    Monthly,
    Once,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Once => "once",
        }
    }
}

/// Ação ecológica com valor fixo de emissão evitada (kg CO2e) e pontos
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: ActionCategory,
    pub emission_saved: f64,
    pub points: i64,
    #[serde(default)]
    pub frequency: Frequency,
    /// None for the built-in catalog
    #[serde(default)]
    pub created_by: Option<ObjectId>,
    pub created_at: BsonDateTime,
    pub updated_at: BsonDateTime,
}

impl Action {
    pub const COLLECTION: &'static str = "actions";
}

pub fn validate_impact(emission_saved: f64, points: i64) -> Result<(), AppError> {
    if !emission_saved.is_finite() || emission_saved < 0.0 {
        return Err(AppError::validation("emission_saved must be a non-negative number"));
    }
    if points < 0 {
        return Err(AppError::validation("points must be non-negative"));
    }
    Ok(())
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateActionRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: ActionCategory,
    pub emission_saved: f64,
    pub points: i64,
    pub frequency: Option<Frequency>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UpdateActionRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<ActionCategory>,
    pub emission_saved: Option<f64>,
    pub points: Option<i64>,
    pub frequency: Option<Frequency>,
}

#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
pub struct LogActionRequest {
    pub notes: Option<String>,
}

/// `?category=&search=&page=&limit=`
#[derive(Debug, Default, Deserialize)]
pub struct ActionQuery {
    pub category: Option<ActionCategory>,
    pub search: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: ActionCategory,
    pub emission_saved: f64,
    pub points: i64,
    pub frequency: Frequency,
    pub created_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Action> for ActionResponse {
    fn from(a: Action) -> Self {
        ActionResponse {
            id: oid_hex(a.id),
            title: a.title,
            description: a.description,
            category: a.category,
            emission_saved: a.emission_saved,
            points: a.points,
            frequency: a.frequency,
            created_by: a.created_by.map(|id| id.to_hex()),
            created_at: fmt_date(a.created_at),
            updated_at: fmt_date(a.updated_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_impact() {
        assert!(validate_impact(2.5, 15).is_ok());
        assert!(validate_impact(0.0, 0).is_ok());
        assert!(validate_impact(-0.1, 15).is_err());
        assert!(validate_impact(2.5, -1).is_err());
        assert!(validate_impact(f64::NAN, 1).is_err());
    }

    #[test]
    fn test_create_request_requires_fields() {
        let body = r#"{"title":"Bike to work","category":"transport","emission_saved":2.5}"#;
        assert!(serde_json::from_str::<CreateActionRequest>(body).is_err());

        let body = r#"{"title":"Bike to work","category":"transport","emission_saved":2.5,"points":15}"#;
        let req: CreateActionRequest = serde_json::from_str(body).unwrap();
        assert_eq!(req.category, ActionCategory::Transport);
        assert!(req.frequency.is_none());
    }
}
