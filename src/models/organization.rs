use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};

use super::common::{fmt_date, ids_hex, oid_hex};
use super::membership::Membership;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrganizationType {
    School,
    Corporate,
    Nonprofit,
    Government,
    Other,
}

impl OrganizationType {
    pub fn as_str(self) -> &'static str {
        match self {
            OrganizationType::School => "school",
            OrganizationType::Corporate => "corporate",
            OrganizationType::Nonprofit => "nonprofit",
            OrganizationType::Government => "government",
            OrganizationType::Other => "other",
        }
    }
}

/// Organização (escola, empresa, ONG...), collection "organizations"
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    #[serde(rename = "type")]
    pub org_type: OrganizationType,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    pub admin: ObjectId,
    #[serde(default)]
    pub members: Vec<ObjectId>,
    pub created_at: BsonDateTime,
    pub updated_at: BsonDateTime,
}

impl Organization {
    pub const COLLECTION: &'static str = "organizations";
}

impl Membership for Organization {
    const KIND: &'static str = "organization";

    fn admin(&self) -> &ObjectId {
        &self.admin
    }

    fn members(&self) -> &[ObjectId] {
        &self.members
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateOrganizationRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub org_type: OrganizationType,
    pub description: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UpdateOrganizationRequest {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub org_type: Option<OrganizationType>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
}

/// `?type=&search=&page=&limit=`
#[derive(Debug, Default, Deserialize)]
pub struct OrganizationQuery {
    #[serde(rename = "type")]
    pub org_type: Option<OrganizationType>,
    pub search: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct OrganizationResponse {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub org_type: OrganizationType,
    pub description: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub admin: String,
    pub members: Vec<String>,
    pub member_count: usize,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Organization> for OrganizationResponse {
    fn from(o: Organization) -> Self {
        OrganizationResponse {
            id: oid_hex(o.id),
            name: o.name,
            org_type: o.org_type,
            description: o.description,
            location: o.location,
            website: o.website,
            admin: o.admin.to_hex(),
            member_count: o.members.len(),
            members: ids_hex(&o.members),
            created_at: fmt_date(o.created_at),
            updated_at: fmt_date(o.updated_at),
        }
    }
}
