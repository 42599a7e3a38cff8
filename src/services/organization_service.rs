use mongodb::{
    bson::{doc, oid::ObjectId, DateTime as BsonDateTime, Document},
    options::ReturnDocument,
};

use crate::{
    database::MongoDB,
    models::{
        common::{optional_text, required_text},
        initial_members, CreateOrganizationRequest, Organization, OrganizationQuery,
        UpdateOrganizationRequest, User,
    },
    services::{
        auth_service::{self, Claims},
        listing::{find_by_id, find_page},
        membership_service,
    },
    utils::{apply_search, AppError, Paginated, Pagination},
};

const SEARCH_FIELDS: &[&str] = &["name", "description", "location"];

fn collection(db: &MongoDB) -> mongodb::Collection<Organization> {
    db.collection::<Organization>(Organization::COLLECTION)
}

pub fn list_filter(query: &OrganizationQuery) -> Document {
    let mut filter = doc! {};
    if let Some(org_type) = query.org_type {
        filter.insert("type", org_type.as_str());
    }
    apply_search(&mut filter, query.search.as_deref(), SEARCH_FIELDS);
    filter
}

pub async fn list(db: &MongoDB, query: &OrganizationQuery) -> Result<Paginated<Organization>, AppError> {
    find_page(
        &collection(db),
        list_filter(query),
        doc! { "created_at": -1 },
        Pagination::new(query.page, query.limit),
    )
    .await
}

pub async fn get(db: &MongoDB, id: &ObjectId) -> Result<Organization, AppError> {
    find_by_id(&collection(db), id, "Organization").await
}

/// The creator becomes admin and first member.
pub async fn create(
    db: &MongoDB,
    claims: &Claims,
    request: CreateOrganizationRequest,
) -> Result<Organization, AppError> {
    let admin = claims.user_id()?;
    let now = BsonDateTime::now();

    let mut organization = Organization {
        id: None,
        name: required_text(&request.name, "Name")?,
        org_type: request.org_type,
        description: optional_text(request.description),
        location: optional_text(request.location),
        website: optional_text(request.website),
        admin,
        members: initial_members(admin, Vec::new()),
        created_at: now,
        updated_at: now,
    };

    let inserted = collection(db).insert_one(&organization).await?;
    organization.id = inserted.inserted_id.as_object_id();

    log::info!("🏢 Organization created: {} by {}", organization.name, claims.email);
    Ok(organization)
}

pub async fn update(
    db: &MongoDB,
    claims: &Claims,
    id: &ObjectId,
    request: UpdateOrganizationRequest,
) -> Result<Organization, AppError> {
    let existing = get(db, id).await?;
    claims.ensure_can_modify(&existing.admin, "update this organization")?;

    let mut set = doc! { "updated_at": BsonDateTime::now() };
    if let Some(name) = &request.name {
        set.insert("name", required_text(name, "Name")?);
    }
    if let Some(org_type) = request.org_type {
        set.insert("type", org_type.as_str());
    }
    if let Some(description) = request.description {
        set.insert("description", description.trim());
    }
    if let Some(location) = request.location {
        set.insert("location", location.trim());
    }
    if let Some(website) = request.website {
        set.insert("website", website.trim());
    }

    collection(db)
        .find_one_and_update(doc! { "_id": *id }, doc! { "$set": set })
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| AppError::not_found("Organization not found"))
}

/// Refused while school/corporate accounts are still linked to the organization.
pub async fn delete(db: &MongoDB, claims: &Claims, id: &ObjectId) -> Result<(), AppError> {
    let existing = get(db, id).await?;
    claims.ensure_can_modify(&existing.admin, "delete this organization")?;

    let linked = db
        .collection::<User>(User::COLLECTION)
        .count_documents(doc! { "organization": *id })
        .await?;
    if linked > 0 {
        return Err(AppError::Conflict(format!(
            "Organization still has {} linked account(s)",
            linked
        )));
    }

    collection(db).delete_one(doc! { "_id": *id }).await?;
    log::info!("🗑️  Organization deleted: {} by {}", existing.name, claims.email);
    Ok(())
}

pub async fn join(db: &MongoDB, claims: &Claims, id: &ObjectId) -> Result<Organization, AppError> {
    let user = claims.user_id()?;
    let organization = membership_service::join(&collection(db), id, user, "Organization").await?;
    log::info!("➕ {} joined organization {}", claims.email, organization.name);
    Ok(organization)
}

pub async fn leave(db: &MongoDB, claims: &Claims, id: &ObjectId) -> Result<Organization, AppError> {
    let user_id = claims.user_id()?;
    let organization = get(db, id).await?;

    let user = auth_service::get_user(db, &user_id).await?;
    ensure_not_linked(&user, id)?;

    let organization = membership_service::leave(&collection(db), &organization, id, user_id).await?;
    log::info!("➖ {} left organization {}", claims.email, organization.name);
    Ok(organization)
}

fn ensure_not_linked(user: &User, organization: &ObjectId) -> Result<(), AppError> {
    if user.organization.as_ref() == Some(organization) {
        return Err(AppError::validation(
            "You cannot leave the organization your account is linked to",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OrganizationType, Role};

    #[test]
    fn test_list_filter() {
        let query = OrganizationQuery {
            org_type: Some(OrganizationType::School),
            search: Some("green".into()),
            ..Default::default()
        };
        let filter = list_filter(&query);
        assert_eq!(filter.get_str("type").unwrap(), "school");
        assert_eq!(filter.get_array("$or").unwrap().len(), 3);
    }

    #[test]
    fn test_linked_account_cannot_leave() {
        let org = ObjectId::new();
        let now = BsonDateTime::now();
        let mut user = User {
            id: Some(ObjectId::new()),
            name: "Leo".into(),
            email: "leo@school.edu".into(),
            password: String::new(),
            role: Role::School,
            organization: Some(org),
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
        assert!(ensure_not_linked(&user, &org).is_err());
        assert!(ensure_not_linked(&user, &ObjectId::new()).is_ok());

        user.organization = None;
        assert!(ensure_not_linked(&user, &org).is_ok());
    }
}
