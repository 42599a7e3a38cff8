use mongodb::{
    bson::{doc, oid::ObjectId, DateTime as BsonDateTime, Document},
    options::ReturnDocument,
    Collection,
};

use crate::{
    database::MongoDB,
    models::{
        common::{optional_text, required_text},
        initial_members, Community, CommunityQuery, CreateCommunityRequest, Post, UpdateCommunityRequest,
    },
    services::{
        auth_service::Claims,
        listing::{find_by_id, find_page},
        membership_service,
    },
    utils::{apply_search, is_duplicate_key, AppError, Paginated, Pagination},
};

const SEARCH_FIELDS: &[&str] = &["name", "description"];

fn collection(db: &MongoDB) -> Collection<Community> {
    db.collection::<Community>(Community::COLLECTION)
}

fn name_conflict(e: mongodb::error::Error) -> AppError {
    if is_duplicate_key(&e) {
        AppError::Conflict("A community with this name already exists".into())
    } else {
        AppError::Database(e)
    }
}

pub fn list_filter(query: &CommunityQuery) -> Document {
    let mut filter = doc! {};
    if let Some(category) = query.category.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        filter.insert("category", category);
    }
    apply_search(&mut filter, query.search.as_deref(), SEARCH_FIELDS);
    filter
}

pub async fn list(db: &MongoDB, query: &CommunityQuery) -> Result<Paginated<Community>, AppError> {
    find_page(
        &collection(db),
        list_filter(query),
        doc! { "created_at": -1 },
        Pagination::new(query.page, query.limit),
    )
    .await
}

pub async fn get(db: &MongoDB, id: &ObjectId) -> Result<Community, AppError> {
    find_by_id(&collection(db), id, "Community").await
}

pub async fn create(db: &MongoDB, claims: &Claims, request: CreateCommunityRequest) -> Result<Community, AppError> {
    let admin = claims.user_id()?;
    let now = BsonDateTime::now();

    let mut community = Community {
        id: None,
        name: required_text(&request.name, "Name")?,
        description: required_text(&request.description, "Description")?,
        category: optional_text(request.category),
        image: optional_text(request.image),
        is_private: request.is_private,
        admin,
        members: initial_members(admin, Vec::new()),
        created_at: now,
        updated_at: now,
    };

    let inserted = collection(db).insert_one(&community).await.map_err(name_conflict)?;
    community.id = inserted.inserted_id.as_object_id();

    log::info!("👥 Community created: {} by {}", community.name, claims.email);
    Ok(community)
}

pub async fn update(
    db: &MongoDB,
    claims: &Claims,
    id: &ObjectId,
    request: UpdateCommunityRequest,
) -> Result<Community, AppError> {
    let existing = get(db, id).await?;
    claims.ensure_can_modify(&existing.admin, "update this community")?;

    let mut set = doc! { "updated_at": BsonDateTime::now() };
    if let Some(name) = &request.name {
        set.insert("name", required_text(name, "Name")?);
    }
    if let Some(description) = &request.description {
        set.insert("description", required_text(description, "Description")?);
    }
    if let Some(category) = request.category {
        set.insert("category", category.trim());
    }
    if let Some(image) = request.image {
        set.insert("image", image.trim());
    }
    if let Some(is_private) = request.is_private {
        set.insert("is_private", is_private);
    }

    collection(db)
        .find_one_and_update(doc! { "_id": *id }, doc! { "$set": set })
        .return_document(ReturnDocument::After)
        .await
        .map_err(name_conflict)?
        .ok_or_else(|| AppError::not_found("Community not found"))
}

/// Posts made in the community stay in the feed without a community reference.
pub async fn delete(db: &MongoDB, claims: &Claims, id: &ObjectId) -> Result<(), AppError> {
    let existing = get(db, id).await?;
    claims.ensure_can_modify(&existing.admin, "delete this community")?;

    collection(db).delete_one(doc! { "_id": *id }).await?;

    let detached = db
        .collection::<Post>(Post::COLLECTION)
        .update_many(doc! { "community": *id }, doc! { "$set": { "community": null } })
        .await?;

    log::info!(
        "🗑️  Community deleted: {} by {} ({} posts detached)",
        existing.name,
        claims.email,
        detached.modified_count
    );
    Ok(())
}

pub async fn join(db: &MongoDB, claims: &Claims, id: &ObjectId) -> Result<Community, AppError> {
    let user = claims.user_id()?;
    let community = membership_service::join(&collection(db), id, user, "Community").await?;
    log::info!("➕ {} joined community {}", claims.email, community.name);
    Ok(community)
}

pub async fn leave(db: &MongoDB, claims: &Claims, id: &ObjectId) -> Result<Community, AppError> {
    let user = claims.user_id()?;
    let community = get(db, id).await?;
    let community = membership_service::leave(&collection(db), &community, id, user).await?;
    log::info!("➖ {} left community {}", claims.email, community.name);
    Ok(community)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Membership, Role};
    use crate::services::auth_service::claims_for;

    #[test]
    fn test_list_filter() {
        let query = CommunityQuery {
            category: Some(" energy ".into()),
            search: Some("solar".into()),
            ..Default::default()
        };
        let filter = list_filter(&query);
        assert_eq!(filter.get_str("category").unwrap(), "energy");
        assert_eq!(filter.get_array("$or").unwrap().len(), 2);

        let blank = CommunityQuery { category: Some("  ".into()), ..Default::default() };
        assert!(list_filter(&blank).is_empty());
    }

    #[test]
    fn test_admin_cannot_leave_own_community() {
        let admin = ObjectId::new();
        let now = BsonDateTime::now();
        let community = Community {
            id: Some(ObjectId::new()),
            name: "Zero Waste Porto".into(),
            description: "Swaps and repair cafés".into(),
            category: Some("waste".into()),
            image: None,
            is_private: false,
            admin,
            members: initial_members(admin, Vec::new()),
            created_at: now,
            updated_at: now,
        };

        let err = community.ensure_can_leave(&admin).unwrap_err();
        assert_eq!(err.to_string(), "Admin cannot leave their own community");
        assert!(claims_for(admin, Role::Public).can_modify(&community.admin));
    }

    #[tokio::test]
    #[ignore] // requires MONGO_URI
    async fn test_duplicate_name_is_conflict() {
        let uri = std::env::var("MONGO_URI").unwrap();
        let db = MongoDB::with_database(&uri, "terranest_test").await.unwrap();
        let caller = claims_for(ObjectId::new(), Role::Public);

        let request = || CreateCommunityRequest {
            name: format!("dup-{}", caller.sub),
            description: "test".into(),
            category: None,
            image: None,
            is_private: false,
        };

        let created = create(&db, &caller, request()).await.unwrap();
        assert!(matches!(create(&db, &caller, request()).await, Err(AppError::Conflict(_))));

        delete(&db, &caller, &created.id.unwrap()).await.unwrap();
    }
}
