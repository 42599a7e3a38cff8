use mongodb::{
    bson::{doc, oid::ObjectId, DateTime as BsonDateTime},
    options::ReturnDocument,
};

use crate::{
    database::MongoDB,
    models::{
        common::required_text, Challenge, Community, Organization, Post, UpdateProfileRequest, User, UserAction,
    },
    services::{auth_service::Claims, listing::find_by_id},
    utils::AppError,
};

pub async fn get_profile(db: &MongoDB, id: &ObjectId) -> Result<User, AppError> {
    find_by_id(&db.collection::<User>(User::COLLECTION), id, "User").await
}

pub async fn update_profile(db: &MongoDB, claims: &Claims, request: UpdateProfileRequest) -> Result<User, AppError> {
    let user_id = claims.user_id()?;

    let mut set = doc! { "updated_at": BsonDateTime::now() };
    if let Some(name) = &request.name {
        set.insert("name", required_text(name, "Name")?);
    }
    if let Some(avatar) = request.avatar {
        set.insert("avatar", avatar.trim());
    }
    if let Some(bio) = request.bio {
        set.insert("bio", bio.trim());
    }
    if let Some(location) = request.location {
        set.insert("location", location.trim());
    }

    let user = db
        .collection::<User>(User::COLLECTION)
        .find_one_and_update(doc! { "_id": user_id }, doc! { "$set": set })
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    log::info!("✏️  Profile updated: {}", user.email);
    Ok(user)
}

/// Deletes the account, then removes its traces from other collections.
///
/// Users who still administer an organization or community must hand it over
/// or delete it first. The cleanup after the account delete is best-effort:
/// a failing step is logged and the remaining steps still run.
pub async fn delete_user(db: &MongoDB, claims: &Claims, id: &ObjectId) -> Result<(), AppError> {
    claims.ensure_can_modify(id, "delete this user")?;
    let user = get_profile(db, id).await?;

    let admin_of = db
        .collection::<Organization>(Organization::COLLECTION)
        .count_documents(doc! { "admin": *id })
        .await?
        + db
            .collection::<Community>(Community::COLLECTION)
            .count_documents(doc! { "admin": *id })
            .await?;
    if admin_of > 0 {
        return Err(AppError::Conflict(
            "Transfer or delete the organizations and communities you administer first".into(),
        ));
    }

    db.collection::<User>(User::COLLECTION).delete_one(doc! { "_id": *id }).await?;

    let steps = [
        (
            "challenges",
            db.collection::<Challenge>(Challenge::COLLECTION)
                .update_many(doc! {}, doc! { "$pull": { "participants": *id, "completed_by": *id, "joined_by": *id } })
                .await
                .map(|r| r.modified_count),
        ),
        (
            "communities",
            db.collection::<Community>(Community::COLLECTION)
                .update_many(doc! { "members": *id }, doc! { "$pull": { "members": *id } })
                .await
                .map(|r| r.modified_count),
        ),
        (
            "organizations",
            db.collection::<Organization>(Organization::COLLECTION)
                .update_many(doc! { "members": *id }, doc! { "$pull": { "members": *id } })
                .await
                .map(|r| r.modified_count),
        ),
        (
            "posts",
            db.collection::<Post>(Post::COLLECTION)
                .delete_many(doc! { "user": *id })
                .await
                .map(|r| r.deleted_count),
        ),
        (
            "likes and comments",
            db.collection::<Post>(Post::COLLECTION)
                .update_many(doc! {}, doc! { "$pull": { "likes": *id, "comments": { "user": *id } } })
                .await
                .map(|r| r.modified_count),
        ),
        (
            "user_actions",
            db.collection::<UserAction>(UserAction::COLLECTION)
                .delete_many(doc! { "user": *id })
                .await
                .map(|r| r.deleted_count),
        ),
    ];

    for (what, result) in steps {
        match result {
            Ok(n) => log::debug!("   🧹 {}: {} document(s)", what, n),
            Err(e) => log::warn!("⚠️  Cleanup of {} for user {} failed: {}", what, id, e),
        }
    }

    log::info!("🗑️  User deleted: {} by {}", user.email, claims.email);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::services::auth_service::claims_for;

    fn user(id: ObjectId) -> User {
        let now = BsonDateTime::now();
        User {
            id: Some(id),
            name: "Ines".into(),
            email: format!("{}@example.com", id.to_hex()),
            password: String::new(),
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
        }
    }

    #[tokio::test]
    #[ignore] // requires MONGO_URI
    async fn test_delete_cascades_membership() {
        let uri = std::env::var("MONGO_URI").unwrap();
        let db = MongoDB::with_database(&uri, "terranest_test").await.unwrap();

        let id = ObjectId::new();
        db.collection::<User>(User::COLLECTION).insert_one(user(id)).await.unwrap();
        let admin = ObjectId::new();
        let community = db
            .collection::<Community>(Community::COLLECTION)
            .insert_one(Community {
                id: None,
                name: format!("cascade-{}", id.to_hex()),
                description: "test".into(),
                category: None,
                image: None,
                is_private: false,
                admin,
                members: vec![admin, id],
                created_at: BsonDateTime::now(),
                updated_at: BsonDateTime::now(),
            })
            .await
            .unwrap()
            .inserted_id
            .as_object_id()
            .unwrap();

        let stranger = claims_for(ObjectId::new(), Role::Public);
        assert!(matches!(delete_user(&db, &stranger, &id).await, Err(AppError::Forbidden(_))));

        delete_user(&db, &claims_for(id, Role::Public), &id).await.unwrap();

        let c = find_by_id(&db.collection::<Community>(Community::COLLECTION), &community, "Community")
            .await
            .unwrap();
        assert_eq!(c.members, vec![admin]);
        assert!(matches!(get_profile(&db, &id).await, Err(AppError::NotFound(_))));
    }
}
