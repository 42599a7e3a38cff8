use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::common::{fmt_date, oid_hex};
use crate::utils::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Public,
    School,
    Corporate,
    Admin,
}

impl Role {
    /// School and corporate accounts must belong to an organization.
    pub fn requires_organization(self) -> bool {
        matches!(self, Role::School | Role::Corporate)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Public => "public",
            Role::School => "school",
            Role::Corporate => "corporate",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Usuário da plataforma (collection "users")
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub email: String,
    /// bcrypt hash
    pub password: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub organization: Option<ObjectId>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub total_emission_saved: f64,
    #[serde(default)]
    pub total_points: i64,
    #[serde(default)]
    pub actions_completed: i64,
    #[serde(default)]
    pub challenges_joined: i64,
    #[serde(default)]
    pub challenges_completed: i64,
    pub created_at: BsonDateTime,
    pub updated_at: BsonDateTime,
}

impl User {
    pub const COLLECTION: &'static str = "users";
}

pub fn validate_role_organization(role: Role, organization: Option<&ObjectId>) -> Result<(), AppError> {
    match (role.requires_organization(), organization) {
        (true, None) => Err(AppError::Validation(format!(
            "Organization is required for {} accounts",
            role
        ))),
        (false, Some(_)) => Err(AppError::Validation(format!(
            "{} accounts cannot be linked to an organization",
            role
        ))),
        _ => Ok(()),
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
}

/// Perfil exposto pela API (nunca inclui a senha)
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub organization: Option<String>,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub total_emission_saved: f64,
    pub total_points: i64,
    pub actions_completed: i64,
    pub challenges_joined: i64,
    pub challenges_completed: i64,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        UserResponse {
            id: oid_hex(u.id),
            name: u.name,
            email: u.email,
            role: u.role,
            organization: u.organization.map(|id| id.to_hex()),
            avatar: u.avatar,
            bio: u.bio,
            location: u.location,
            total_emission_saved: u.total_emission_saved,
            total_points: u.total_points,
            actions_completed: u.actions_completed,
            challenges_joined: u.challenges_joined,
            challenges_completed: u.challenges_completed,
            created_at: fmt_date(u.created_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_school_and_corporate_need_organization() {
        assert!(validate_role_organization(Role::School, None).is_err());
        assert!(validate_role_organization(Role::Corporate, None).is_err());

        let org = ObjectId::new();
        assert!(validate_role_organization(Role::School, Some(&org)).is_ok());
        assert!(validate_role_organization(Role::Corporate, Some(&org)).is_ok());
    }

    #[test]
    fn test_public_and_admin_roles() {
        assert!(validate_role_organization(Role::Public, None).is_ok());
        assert!(validate_role_organization(Role::Admin, None).is_ok());
        assert!(validate_role_organization(Role::Public, Some(&ObjectId::new())).is_err());
        assert!(validate_role_organization(Role::Admin, Some(&ObjectId::new())).is_err());
    }

    #[test]
    fn test_role_serde() {
        assert_eq!(serde_json::to_string(&Role::Corporate).unwrap(), "\"corporate\"");
        let role: Role = serde_json::from_str("\"school\"").unwrap();
        assert_eq!(role, Role::School);
        assert!(serde_json::from_str::<Role>("\"teacher\"").is_err());
    }

    #[test]
    fn test_response_hides_password() {
        let now = BsonDateTime::now();
        let user = User {
            id: Some(ObjectId::new()),
            name: "Ana".into(),
            email: "ana@example.com".into(),
            password: "$2b$12$hash".into(),
            role: Role::Public,
            organization: None,
            avatar: None,
            bio: None,
            location: None,
            total_emission_saved: 0.0,
            total_points: 0,
            actions_completed: 0,
            challenges_joined: 0,
            challenges_completed: 0,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(UserResponse::from(user)).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["role"], "public");
    }
}
