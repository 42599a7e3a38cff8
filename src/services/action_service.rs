use chrono::Utc;
use mongodb::{
    bson::{doc, oid::ObjectId, DateTime as BsonDateTime, Document},
    options::ReturnDocument,
};

use crate::{
    database::MongoDB,
    models::{
        common::{required_text, to_bson_date},
        validate_impact, Action, ActionQuery, CreateActionRequest, LogActionRequest, UpdateActionRequest,
        User, UserAction,
    },
    services::{
        auth_service::Claims,
        listing::{find_by_id, find_page},
    },
    utils::{apply_search, day_start, is_duplicate_key, AppError, Paginated, Pagination},
};

const SEARCH_FIELDS: &[&str] = &["title", "description"];

pub fn list_filter(query: &ActionQuery) -> Document {
    let mut filter = doc! {};
    if let Some(category) = query.category {
        filter.insert("category", category.as_str());
    }
    apply_search(&mut filter, query.search.as_deref(), SEARCH_FIELDS);
    filter
}

pub async fn list(db: &MongoDB, query: &ActionQuery) -> Result<Paginated<Action>, AppError> {
    let collection = db.collection::<Action>(Action::COLLECTION);
    find_page(
        &collection,
        list_filter(query),
        doc! { "created_at": -1 },
        Pagination::new(query.page, query.limit),
    )
    .await
}

pub async fn get(db: &MongoDB, id: &ObjectId) -> Result<Action, AppError> {
    find_by_id(&db.collection::<Action>(Action::COLLECTION), id, "Action").await
}

/// Built-in catalog actions have no creator and only admins may touch them.
fn ensure_owner(claims: &Claims, action: &Action, what: &str) -> Result<(), AppError> {
    match action.created_by {
        Some(owner) => claims.ensure_can_modify(&owner, what),
        None if claims.is_admin() => Ok(()),
        None => Err(AppError::Forbidden(format!("Not authorized to {}", what))),
    }
}

pub async fn create(db: &MongoDB, claims: &Claims, request: CreateActionRequest) -> Result<Action, AppError> {
    let title = required_text(&request.title, "Title")?;
    validate_impact(request.emission_saved, request.points)?;

    let now = BsonDateTime::now();
    let mut action = Action {
        id: None,
        title,
        description: request.description.trim().to_string(),
        category: request.category,
        emission_saved: request.emission_saved,
        points: request.points,
        frequency: request.frequency.unwrap_or_default(),
        created_by: Some(claims.user_id()?),
        created_at: now,
        updated_at: now,
    };

    let inserted = db.collection::<Action>(Action::COLLECTION).insert_one(&action).await?;
    action.id = inserted.inserted_id.as_object_id();

    log::info!("✅ Action created: {} by {}", action.title, claims.email);
    Ok(action)
}

pub async fn update(
    db: &MongoDB,
    claims: &Claims,
    id: &ObjectId,
    request: UpdateActionRequest,
) -> Result<Action, AppError> {
    let collection = db.collection::<Action>(Action::COLLECTION);
    let existing = find_by_id(&collection, id, "Action").await?;
    ensure_owner(claims, &existing, "update this action")?;

    validate_impact(
        request.emission_saved.unwrap_or(existing.emission_saved),
        request.points.unwrap_or(existing.points),
    )?;

    let mut set = doc! { "updated_at": BsonDateTime::now() };
    if let Some(title) = &request.title {
        set.insert("title", required_text(title, "Title")?);
    }
    if let Some(description) = &request.description {
        set.insert("description", description.trim());
    }
    if let Some(category) = request.category {
        set.insert("category", category.as_str());
    }
    if let Some(emission_saved) = request.emission_saved {
        set.insert("emission_saved", emission_saved);
    }
    if let Some(points) = request.points {
        set.insert("points", points);
    }
    if let Some(frequency) = request.frequency {
        set.insert("frequency", frequency.as_str());
    }

    collection
        .find_one_and_update(doc! { "_id": *id }, doc! { "$set": set })
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| AppError::not_found("Action not found"))
}

pub async fn delete(db: &MongoDB, claims: &Claims, id: &ObjectId) -> Result<(), AppError> {
    let collection = db.collection::<Action>(Action::COLLECTION);
    let existing = find_by_id(&collection, id, "Action").await?;
    ensure_owner(claims, &existing, "delete this action")?;

    collection.delete_one(doc! { "_id": *id }).await?;
    log::info!("🗑️  Action deleted: {} by {}", existing.title, claims.email);
    Ok(())
}

/// Records the action for the caller's current UTC day and credits the
/// action's emission and points to the user's totals.
pub async fn log_action(
    db: &MongoDB,
    claims: &Claims,
    id: &ObjectId,
    request: LogActionRequest,
) -> Result<UserAction, AppError> {
    let user_id = claims.user_id()?;
    let action = get(db, id).await?;

    let mut entry = UserAction {
        id: None,
        user: user_id,
        action: *id,
        date: to_bson_date(day_start(Utc::now())),
        emission_saved: action.emission_saved,
        points: action.points,
        notes: request.notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
        created_at: BsonDateTime::now(),
    };

    let inserted = db
        .collection::<UserAction>(UserAction::COLLECTION)
        .insert_one(&entry)
        .await
        .map_err(|e| {
            if is_duplicate_key(&e) {
                AppError::validation("You have already logged this action today")
            } else {
                AppError::Database(e)
            }
        })?;
    entry.id = inserted.inserted_id.as_object_id();

    db.collection::<User>(User::COLLECTION)
        .update_one(
            doc! { "_id": user_id },
            doc! { "$inc": {
                "total_emission_saved": action.emission_saved,
                "total_points": action.points,
                "actions_completed": 1_i64,
            } },
        )
        .await?;

    log::info!("🌱 {} logged '{}' (+{} kg CO2e)", claims.email, action.title, action.emission_saved);
    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActionCategory, Frequency, Role};
    use crate::services::auth_service::claims_for as claims;

    fn action(created_by: Option<ObjectId>) -> Action {
        let now = BsonDateTime::now();
        Action {
            id: Some(ObjectId::new()),
            title: "Bike to work".into(),
            description: String::new(),
            category: ActionCategory::Transport,
            emission_saved: 2.5,
            points: 15,
            frequency: Frequency::Daily,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_list_filter() {
        let query = ActionQuery {
            category: Some(ActionCategory::Energy),
            search: Some("led".into()),
            ..Default::default()
        };
        let filter = list_filter(&query);
        assert_eq!(filter.get_str("category").unwrap(), "energy");
        assert_eq!(filter.get_array("$or").unwrap().len(), 2);

        assert!(list_filter(&ActionQuery::default()).is_empty());
    }

    #[test]
    fn test_catalog_actions_are_admin_only() {
        let catalog = action(None);
        assert!(ensure_owner(&claims(ObjectId::new(), Role::Public), &catalog, "update this action").is_err());
        assert!(ensure_owner(&claims(ObjectId::new(), Role::Admin), &catalog, "update this action").is_ok());
    }

    #[test]
    fn test_owner_can_modify_own_action() {
        let owner = ObjectId::new();
        let own = action(Some(owner));
        assert!(ensure_owner(&claims(owner, Role::Public), &own, "delete this action").is_ok());

        let err = ensure_owner(&claims(ObjectId::new(), Role::School), &own, "delete this action").unwrap_err();
        assert_eq!(err.to_string(), "Not authorized to delete this action");
    }

    #[tokio::test]
    #[ignore] // requires MONGO_URI
    async fn test_second_log_same_day_is_rejected() {
        let uri = std::env::var("MONGO_URI").unwrap();
        let db = MongoDB::with_database(&uri, "terranest_test").await.unwrap();

        let user_id = ObjectId::new();
        let caller = claims(user_id, Role::Public);
        let created = create(
            &db,
            &caller,
            CreateActionRequest {
                title: "Cold wash".into(),
                description: String::new(),
                category: ActionCategory::Energy,
                emission_saved: 0.6,
                points: 5,
                frequency: None,
            },
        )
        .await
        .unwrap();
        let action_id = created.id.unwrap();

        assert!(log_action(&db, &caller, &action_id, LogActionRequest::default()).await.is_ok());
        let err = log_action(&db, &caller, &action_id, LogActionRequest::default()).await.unwrap_err();
        assert_eq!(err.to_string(), "You have already logged this action today");

        delete(&db, &caller, &action_id).await.unwrap();
    }
}
