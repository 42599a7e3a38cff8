use mongodb::{
    bson::{doc, oid::ObjectId, DateTime as BsonDateTime},
    options::ReturnDocument,
    Collection,
};
use serde::de::DeserializeOwned;

use crate::{models::Membership, services::listing::find_by_id, utils::AppError};

/// Adds `user` to the group's members. The `$ne` guard keeps a concurrent
/// duplicate join from matching.
pub async fn join<T>(collection: &Collection<T>, id: &ObjectId, user: ObjectId, what: &str) -> Result<T, AppError>
where
    T: Membership + DeserializeOwned + Unpin + Send + Sync,
{
    let group = find_by_id(collection, id, what).await?;
    group.ensure_can_join(&user)?;

    collection
        .find_one_and_update(
            doc! { "_id": *id, "members": { "$ne": user } },
            doc! {
                "$addToSet": { "members": user },
                "$set": { "updated_at": BsonDateTime::now() },
            },
        )
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| AppError::Validation(format!("You are already a member of this {}", T::KIND)))
}

pub async fn leave<T>(collection: &Collection<T>, group: &T, id: &ObjectId, user: ObjectId) -> Result<T, AppError>
where
    T: Membership + DeserializeOwned + Unpin + Send + Sync,
{
    group.ensure_can_leave(&user)?;

    collection
        .find_one_and_update(
            doc! { "_id": *id, "members": user },
            doc! {
                "$pull": { "members": user },
                "$set": { "updated_at": BsonDateTime::now() },
            },
        )
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| AppError::Validation(format!("You are not a member of this {}", T::KIND)))
}
