use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};

use super::common::{fmt_date, ids_hex, oid_hex};
use super::membership::Membership;

/// Comunidade temática, collection "communities" (name é único)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Community {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub is_private: bool,
    pub admin: ObjectId,
    #[serde(default)]
    pub members: Vec<ObjectId>,
    pub created_at: BsonDateTime,
    pub updated_at: BsonDateTime,
}

impl Community {
    pub const COLLECTION: &'static str = "communities";
}

impl Membership for Community {
    const KIND: &'static str = "community";

    fn admin(&self) -> &ObjectId {
        &self.admin
    }

    fn members(&self) -> &[ObjectId] {
        &self.members
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateCommunityRequest {
    pub name: String,
    pub description: String,
    pub category: Option<String>,
    pub image: Option<String>,
    #[serde(default)]
    pub is_private: bool,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UpdateCommunityRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub image: Option<String>,
    pub is_private: Option<bool>,
}

/// `?category=&search=&page=&limit=`
#[derive(Debug, Default, Deserialize)]
pub struct CommunityQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct CommunityResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: Option<String>,
    pub image: Option<String>,
    pub is_private: bool,
    pub admin: String,
    pub members: Vec<String>,
    pub member_count: usize,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Community> for CommunityResponse {
    fn from(c: Community) -> Self {
        CommunityResponse {
            id: oid_hex(c.id),
            name: c.name,
            description: c.description,
            category: c.category,
            image: c.image,
            is_private: c.is_private,
            admin: c.admin.to_hex(),
            member_count: c.members.len(),
            members: ids_hex(&c.members),
            created_at: fmt_date(c.created_at),
            updated_at: fmt_date(c.updated_at),
        }
    }
}
