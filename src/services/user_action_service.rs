use mongodb::bson::{doc, oid::ObjectId, Document};

use crate::{
    database::MongoDB,
    models::{common::to_bson_date, User, UserAction, UserActionQuery},
    services::{
        auth_service::Claims,
        listing::{find_by_id, find_page},
    },
    utils::{AppError, Paginated, Pagination},
};

pub fn history_filter(user: &ObjectId, query: &UserActionQuery) -> Result<Document, AppError> {
    if let (Some(from), Some(to)) = (query.from, query.to) {
        if from > to {
            return Err(AppError::validation("from must not be after to"));
        }
    }

    let mut filter = doc! { "user": *user };
    let mut range = Document::new();
    if let Some(from) = query.from {
        range.insert("$gte", to_bson_date(from));
    }
    if let Some(to) = query.to {
        range.insert("$lte", to_bson_date(to));
    }
    if !range.is_empty() {
        filter.insert("date", range);
    }
    Ok(filter)
}

pub async fn list(db: &MongoDB, claims: &Claims, query: &UserActionQuery) -> Result<Paginated<UserAction>, AppError> {
    let user_id = claims.user_id()?;
    find_page(
        &db.collection::<UserAction>(UserAction::COLLECTION),
        history_filter(&user_id, query)?,
        doc! { "date": -1, "created_at": -1 },
        Pagination::new(query.page, query.limit),
    )
    .await
}

/// Removes a log entry and takes its snapshot values back off the owner's totals.
pub async fn delete(db: &MongoDB, claims: &Claims, id: &ObjectId) -> Result<(), AppError> {
    let collection = db.collection::<UserAction>(UserAction::COLLECTION);
    let entry = find_by_id(&collection, id, "User action").await?;
    claims.ensure_can_modify(&entry.user, "delete this user action")?;

    let deleted = collection.delete_one(doc! { "_id": *id }).await?;
    if deleted.deleted_count == 0 {
        return Err(AppError::not_found("User action not found"));
    }

    let (emission, points) = (-entry.emission_saved, -entry.points);
    db.collection::<User>(User::COLLECTION)
        .update_one(
            doc! { "_id": entry.user },
            doc! { "$inc": {
                "total_emission_saved": emission,
                "total_points": points,
                "actions_completed": -1_i64,
            } },
        )
        .await?;

    log::info!("🗑️  User action {} removed by {}", id, claims.email);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_history_filter_without_range() {
        let user = ObjectId::new();
        let filter = history_filter(&user, &UserActionQuery::default()).unwrap();
        assert_eq!(filter.get_object_id("user").unwrap(), user);
        assert!(!filter.contains_key("date"));
    }

    #[test]
    fn test_history_filter_with_range() {
        let query = UserActionQuery {
            from: Some(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()),
            to: Some(Utc.with_ymd_and_hms(2024, 5, 31, 23, 59, 59).unwrap()),
            ..Default::default()
        };
        let filter = history_filter(&ObjectId::new(), &query).unwrap();
        let range = filter.get_document("date").unwrap();
        assert!(range.contains_key("$gte"));
        assert!(range.contains_key("$lte"));
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        let query = UserActionQuery {
            from: Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()),
            to: Some(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()),
            ..Default::default()
        };
        assert!(matches!(history_filter(&ObjectId::new(), &query), Err(AppError::Validation(_))));
    }
}
