use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};

use super::common::{fmt_date, oid_hex};

/// Registro de uma ação feita por um usuário num dia (UTC).
/// Índice único (user, action, date): uma vez por ação por dia.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAction {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user: ObjectId,
    pub action: ObjectId,
    /// Midnight UTC of the day the action was logged
    pub date: BsonDateTime,
    /// Values copied from the action at log time
    pub emission_saved: f64,
    pub points: i64,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: BsonDateTime,
}

impl UserAction {
    pub const COLLECTION: &'static str = "user_actions";
}

/// `?from=&to=&page=&limit=` for the caller's history
#[derive(Debug, Default, Deserialize)]
pub struct UserActionQuery {
    pub from: Option<chrono::DateTime<chrono::Utc>>,
    pub to: Option<chrono::DateTime<chrono::Utc>>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct UserActionResponse {
    pub id: String,
    pub user: String,
    pub action: String,
    pub date: String,
    pub emission_saved: f64,
    pub points: i64,
    pub notes: Option<String>,
    pub created_at: String,
}

impl From<UserAction> for UserActionResponse {
    fn from(ua: UserAction) -> Self {
        UserActionResponse {
            id: oid_hex(ua.id),
            user: ua.user.to_hex(),
            action: ua.action.to_hex(),
            date: fmt_date(ua.date),
            emission_saved: ua.emission_saved,
            points: ua.points,
            notes: ua.notes,
            created_at: fmt_date(ua.created_at),
        }
    }
}
