use chrono::{DateTime, Utc};
use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};

use super::common::{fmt_date, ids_hex, oid_hex, to_chrono};
use crate::utils::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeScope {
    #[default]
    Global,
    Organization,
    Local,
}

impl ChallengeScope {
    pub fn as_str(self) -> &'static str {
        match self {
            ChallengeScope::Global => "global",
            ChallengeScope::Organization => "organization",
            ChallengeScope::Local => "local",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeStatus {
    Upcoming,
    Active,
    Ended,
}

/// Ação exigida pelo desafio e quantas vezes deve ser registrada
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeAction {
    pub action: ObjectId,
    pub count: i32,
}

/// Desafio com prazo (collection "challenges")
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Challenge {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub actions: Vec<ChallengeAction>,
    #[serde(default)]
    pub participants: Vec<ObjectId>,
    #[serde(default)]
    pub completed_by: Vec<ObjectId>,
    /// Everyone who has ever joined, kept across leave.
    #[serde(default)]
    pub joined_by: Vec<ObjectId>,
    pub start_date: BsonDateTime,
    pub end_date: BsonDateTime,
    #[serde(default)]
    pub scope: ChallengeScope,
    #[serde(default)]
    pub organization: Option<ObjectId>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub reward_points: i64,
    pub created_by: ObjectId,
    pub created_at: BsonDateTime,
    pub updated_at: BsonDateTime,
}

impl Challenge {
    pub const COLLECTION: &'static str = "challenges";

    pub fn status(&self, now: DateTime<Utc>) -> ChallengeStatus {
        if now < to_chrono(self.start_date) {
            ChallengeStatus::Upcoming
        } else if now > to_chrono(self.end_date) {
            ChallengeStatus::Ended
        } else {
            ChallengeStatus::Active
        }
    }

    pub fn is_participant(&self, user: &ObjectId) -> bool {
        self.participants.contains(user)
    }

    /// `challenges_joined` counts distinct challenges, so a rejoin is not a first join.
    pub fn is_first_join(&self, user: &ObjectId) -> bool {
        !self.joined_by.contains(user) && !self.is_participant(user)
    }

    pub fn has_completed(&self, user: &ObjectId) -> bool {
        self.completed_by.contains(user)
    }

    pub fn ensure_can_join(&self, user: &ObjectId, now: DateTime<Utc>) -> Result<(), AppError> {
        if now > to_chrono(self.end_date) {
            return Err(AppError::validation("This challenge has already ended"));
        }
        if self.is_participant(user) {
            return Err(AppError::validation("You have already joined this challenge"));
        }
        Ok(())
    }

    pub fn ensure_can_leave(&self, user: &ObjectId) -> Result<(), AppError> {
        if !self.is_participant(user) {
            return Err(AppError::validation("You have not joined this challenge"));
        }
        Ok(())
    }

    pub fn ensure_can_complete(&self, user: &ObjectId) -> Result<(), AppError> {
        if !self.is_participant(user) {
            return Err(AppError::validation("You must join the challenge before completing it"));
        }
        if self.has_completed(user) {
            return Err(AppError::validation("You have already completed this challenge"));
        }
        Ok(())
    }
}

/// organization iff scope = organization; location iff scope = local
pub fn validate_scope(
    scope: ChallengeScope,
    organization: Option<&ObjectId>,
    location: Option<&str>,
) -> Result<(), AppError> {
    let location = location.map(str::trim).filter(|l| !l.is_empty());

    match (scope, organization.is_some(), location.is_some()) {
        (ChallengeScope::Organization, false, _) => {
            Err(AppError::validation("Organization is required for organization challenges"))
        }
        (ChallengeScope::Local, _, false) => {
            Err(AppError::validation("Location is required for local challenges"))
        }
        (ChallengeScope::Organization, true, true) | (ChallengeScope::Global, _, true) => {
            Err(AppError::validation("Location is only allowed for local challenges"))
        }
        (ChallengeScope::Local, true, _) | (ChallengeScope::Global, true, _) => {
            Err(AppError::validation("Organization is only allowed for organization challenges"))
        }
        _ => Ok(()),
    }
}

pub fn validate_dates(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), AppError> {
    if end <= start {
        return Err(AppError::validation("end_date must be after start_date"));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct ChallengeActionInput {
    pub action: String,
    pub count: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct CreateChallengeRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub actions: Vec<ChallengeActionInput>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub scope: Option<ChallengeScope>,
    pub organization: Option<String>,
    pub location: Option<String>,
    pub reward_points: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateChallengeRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub actions: Option<Vec<ChallengeActionInput>>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub scope: Option<ChallengeScope>,
    pub organization: Option<String>,
    pub location: Option<String>,
    pub reward_points: Option<i64>,
}

/// `?scope=&organization=&status=&search=&page=&limit=`
#[derive(Debug, Default, Deserialize)]
pub struct ChallengeQuery {
    pub scope: Option<ChallengeScope>,
    pub organization: Option<String>,
    pub status: Option<ChallengeStatus>,
    pub search: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ChallengeActionResponse {
    pub action: String,
    pub count: i32,
}

#[derive(Debug, Serialize)]
pub struct ChallengeResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub actions: Vec<ChallengeActionResponse>,
    pub participants: Vec<String>,
    pub completed_by: Vec<String>,
    pub participant_count: usize,
    pub start_date: String,
    pub end_date: String,
    pub status: ChallengeStatus,
    pub scope: ChallengeScope,
    pub organization: Option<String>,
    pub location: Option<String>,
    pub reward_points: i64,
    pub created_by: String,
    pub created_at: String,
}

impl From<Challenge> for ChallengeResponse {
    fn from(c: Challenge) -> Self {
        let status = c.status(Utc::now());
        ChallengeResponse {
            id: oid_hex(c.id),
            title: c.title,
            description: c.description,
            actions: c
                .actions
                .iter()
                .map(|a| ChallengeActionResponse { action: a.action.to_hex(), count: a.count })
                .collect(),
            participant_count: c.participants.len(),
            participants: ids_hex(&c.participants),
            completed_by: ids_hex(&c.completed_by),
            start_date: fmt_date(c.start_date),
            end_date: fmt_date(c.end_date),
            status,
            scope: c.scope,
            organization: c.organization.map(|id| id.to_hex()),
            location: c.location,
            reward_points: c.reward_points,
            created_by: c.created_by.to_hex(),
            created_at: fmt_date(c.created_at),
        }
    }
}

/// Per-action progress of one participant.
#[derive(Debug, Serialize)]
pub struct ActionProgress {
    pub action: String,
    pub required: i32,
    pub logged: i64,
    pub done: bool,
}

#[derive(Debug, Serialize)]
pub struct ChallengeProgress {
    pub challenge: String,
    pub joined: bool,
    pub completed: bool,
    pub actions: Vec<ActionProgress>,
    pub percent: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::common::to_bson_date;
    use chrono::{Duration, TimeZone};

    fn challenge(start: DateTime<Utc>, end: DateTime<Utc>) -> Challenge {
        let now = BsonDateTime::now();
        Challenge {
            id: Some(ObjectId::new()),
            title: "Car-free week".into(),
            description: String::new(),
            actions: vec![],
            participants: vec![],
            completed_by: vec![],
            joined_by: vec![],
            start_date: to_bson_date(start),
            end_date: to_bson_date(end),
            scope: ChallengeScope::Global,
            organization: None,
            location: None,
            reward_points: 50,
            created_by: ObjectId::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_join_after_end_is_rejected() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = start + Duration::days(7);
        let c = challenge(start, end);

        let err = c.ensure_can_join(&ObjectId::new(), end + Duration::seconds(1)).unwrap_err();
        assert_eq!(err.to_string(), "This challenge has already ended");
        assert!(c.ensure_can_join(&ObjectId::new(), end).is_ok());
    }

    #[test]
    fn test_join_twice_is_rejected() {
        let start = Utc::now() - Duration::days(1);
        let mut c = challenge(start, start + Duration::days(7));
        let user = ObjectId::new();
        c.participants.push(user);
        assert!(c.ensure_can_join(&user, Utc::now()).is_err());
    }

    #[test]
    fn test_complete_requires_join_and_only_once() {
        let start = Utc::now() - Duration::days(1);
        let mut c = challenge(start, start + Duration::days(7));
        let user = ObjectId::new();

        assert!(c.ensure_can_complete(&user).is_err());
        c.participants.push(user);
        assert!(c.ensure_can_complete(&user).is_ok());
        c.completed_by.push(user);
        let err = c.ensure_can_complete(&user).unwrap_err();
        assert_eq!(err.to_string(), "You have already completed this challenge");
    }

    #[test]
    fn test_rejoin_is_not_first_join() {
        let start = Utc::now();
        let mut c = challenge(start, start + Duration::days(3));
        let user = ObjectId::new();
        assert!(c.is_first_join(&user));

        c.participants.push(user);
        c.joined_by.push(user);
        c.participants.retain(|id| *id != user);
        assert!(c.ensure_can_join(&user, start).is_ok());
        assert!(!c.is_first_join(&user));
    }

    #[test]
    fn test_leave_requires_participation() {
        let start = Utc::now();
        let mut c = challenge(start, start + Duration::days(1));
        let user = ObjectId::new();
        assert!(c.ensure_can_leave(&user).is_err());
        c.participants.push(user);
        assert!(c.ensure_can_leave(&user).is_ok());
    }

    #[test]
    fn test_status() {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 6, 30, 0, 0, 0).unwrap();
        let c = challenge(start, end);
        assert_eq!(c.status(start - Duration::days(1)), ChallengeStatus::Upcoming);
        assert_eq!(c.status(start + Duration::days(1)), ChallengeStatus::Active);
        assert_eq!(c.status(end + Duration::days(1)), ChallengeStatus::Ended);
    }

    #[test]
    fn test_scope_rules() {
        let org = ObjectId::new();
        assert!(validate_scope(ChallengeScope::Global, None, None).is_ok());
        assert!(validate_scope(ChallengeScope::Organization, Some(&org), None).is_ok());
        assert!(validate_scope(ChallengeScope::Local, None, Some("Lisbon")).is_ok());

        assert!(validate_scope(ChallengeScope::Organization, None, None).is_err());
        assert!(validate_scope(ChallengeScope::Local, None, Some("  ")).is_err());
        assert!(validate_scope(ChallengeScope::Global, Some(&org), None).is_err());
        assert!(validate_scope(ChallengeScope::Global, None, Some("Lisbon")).is_err());
        assert!(validate_scope(ChallengeScope::Local, Some(&org), Some("Lisbon")).is_err());
    }

    #[test]
    fn test_dates() {
        let start = Utc::now();
        assert!(validate_dates(start, start + Duration::hours(1)).is_ok());
        assert!(validate_dates(start, start).is_err());
        assert!(validate_dates(start, start - Duration::hours(1)).is_err());
    }
}
