use std::collections::HashMap;

use chrono::{DateTime, Utc};
use mongodb::{
    bson::{doc, oid::ObjectId, Bson, DateTime as BsonDateTime, Document},
    options::ReturnDocument,
    Collection,
};
use serde::Deserialize;

use crate::{
    database::MongoDB,
    models::{
        common::{optional_text, required_text, to_bson_date, to_chrono},
        validate_dates, validate_scope, Action, ActionProgress, Challenge, ChallengeAction, ChallengeActionInput,
        ChallengeProgress, ChallengeQuery, ChallengeScope, ChallengeStatus, CreateChallengeRequest, Organization,
        UpdateChallengeRequest, User, UserAction,
    },
    services::{
        aggregations,
        auth_service::Claims,
        listing::{aggregate_rows, find_by_id, find_page},
    },
    utils::{apply_search, day_start, parse_object_id, AppError, Paginated, Pagination},
};

const SEARCH_FIELDS: &[&str] = &["title", "description"];

fn collection(db: &MongoDB) -> Collection<Challenge> {
    db.collection::<Challenge>(Challenge::COLLECTION)
}

pub fn list_filter(query: &ChallengeQuery, now: DateTime<Utc>) -> Result<Document, AppError> {
    let mut filter = doc! {};
    if let Some(scope) = query.scope {
        filter.insert("scope", scope.as_str());
    }
    if let Some(organization) = query.organization.as_deref().filter(|s| !s.is_empty()) {
        filter.insert("organization", parse_object_id(organization, "organization")?);
    }

    let now = to_bson_date(now);
    match query.status {
        Some(ChallengeStatus::Upcoming) => {
            filter.insert("start_date", doc! { "$gt": now });
        }
        Some(ChallengeStatus::Active) => {
            filter.insert("start_date", doc! { "$lte": now });
            filter.insert("end_date", doc! { "$gte": now });
        }
        Some(ChallengeStatus::Ended) => {
            filter.insert("end_date", doc! { "$lt": now });
        }
        None => {}
    }

    apply_search(&mut filter, query.search.as_deref(), SEARCH_FIELDS);
    Ok(filter)
}

pub async fn list(db: &MongoDB, query: &ChallengeQuery) -> Result<Paginated<Challenge>, AppError> {
    find_page(
        &collection(db),
        list_filter(query, Utc::now())?,
        doc! { "start_date": -1 },
        Pagination::new(query.page, query.limit),
    )
    .await
}

pub async fn get(db: &MongoDB, id: &ObjectId) -> Result<Challenge, AppError> {
    find_by_id(&collection(db), id, "Challenge").await
}

/// Parses the required actions; a missing count means once, duplicates are merged.
pub fn parse_actions(inputs: &[ChallengeActionInput]) -> Result<Vec<ChallengeAction>, AppError> {
    let mut actions: Vec<ChallengeAction> = Vec::new();
    for input in inputs {
        let action = parse_object_id(&input.action, "action")?;
        let count = input.count.unwrap_or(1);
        if count < 1 {
            return Err(AppError::validation("Action count must be at least 1"));
        }
        match actions.iter_mut().find(|a| a.action == action) {
            Some(existing) => {
                existing.count = existing
                    .count
                    .checked_add(count)
                    .ok_or_else(|| AppError::validation("Action count is too large"))?;
            }
            None => actions.push(ChallengeAction { action, count }),
        }
    }
    Ok(actions)
}

async fn ensure_actions_exist(db: &MongoDB, actions: &[ChallengeAction]) -> Result<(), AppError> {
    if actions.is_empty() {
        return Ok(());
    }
    let ids: Vec<ObjectId> = actions.iter().map(|a| a.action).collect();
    let found = db
        .collection::<Action>(Action::COLLECTION)
        .count_documents(doc! { "_id": { "$in": ids } })
        .await?;
    if found != actions.len() as u64 {
        return Err(AppError::not_found("One or more actions not found"));
    }
    Ok(())
}

async fn ensure_organization_exists(db: &MongoDB, organization: Option<&ObjectId>) -> Result<(), AppError> {
    if let Some(id) = organization {
        find_by_id(&db.collection::<Organization>(Organization::COLLECTION), id, "Organization").await?;
    }
    Ok(())
}

fn validate_reward(points: i64) -> Result<(), AppError> {
    if points < 0 {
        return Err(AppError::validation("reward_points must be non-negative"));
    }
    Ok(())
}

fn parse_organization(value: Option<String>) -> Result<Option<ObjectId>, AppError> {
    optional_text(value).map(|id| parse_object_id(&id, "organization")).transpose()
}

pub async fn create(db: &MongoDB, claims: &Claims, request: CreateChallengeRequest) -> Result<Challenge, AppError> {
    let title = required_text(&request.title, "Title")?;
    let scope = request.scope.unwrap_or_default();
    let organization = parse_organization(request.organization)?;
    let location = optional_text(request.location);
    let reward_points = request.reward_points.unwrap_or(0);

    validate_scope(scope, organization.as_ref(), location.as_deref())?;
    validate_dates(request.start_date, request.end_date)?;
    validate_reward(reward_points)?;

    let actions = parse_actions(&request.actions)?;
    ensure_actions_exist(db, &actions).await?;
    ensure_organization_exists(db, organization.as_ref()).await?;

    let now = BsonDateTime::now();
    let mut challenge = Challenge {
        id: None,
        title,
        description: request.description.trim().to_string(),
        actions,
        participants: Vec::new(),
        completed_by: Vec::new(),
        joined_by: Vec::new(),
        start_date: to_bson_date(request.start_date),
        end_date: to_bson_date(request.end_date),
        scope,
        organization,
        location,
        reward_points,
        created_by: claims.user_id()?,
        created_at: now,
        updated_at: now,
    };

    let inserted = collection(db).insert_one(&challenge).await?;
    challenge.id = inserted.inserted_id.as_object_id();

    log::info!("🏁 Challenge created: {} by {}", challenge.title, claims.email);
    Ok(challenge)
}

/// Scope-dependent fields are recomputed together: switching scope drops the
/// organization or location that no longer applies unless a new one is sent.
pub async fn update(
    db: &MongoDB,
    claims: &Claims,
    id: &ObjectId,
    request: UpdateChallengeRequest,
) -> Result<Challenge, AppError> {
    let existing = get(db, id).await?;
    claims.ensure_can_modify(&existing.created_by, "update this challenge")?;

    let scope = request.scope.unwrap_or(existing.scope);
    let organization = match request.organization {
        Some(value) => parse_organization(Some(value))?,
        None if scope == ChallengeScope::Organization => existing.organization,
        None => None,
    };
    let location = match request.location {
        Some(value) => optional_text(Some(value)),
        None if scope == ChallengeScope::Local => existing.location.clone(),
        None => None,
    };
    validate_scope(scope, organization.as_ref(), location.as_deref())?;

    let start = request.start_date.unwrap_or_else(|| to_chrono(existing.start_date));
    let end = request.end_date.unwrap_or_else(|| to_chrono(existing.end_date));
    validate_dates(start, end)?;

    let mut set = doc! {
        "updated_at": BsonDateTime::now(),
        "scope": scope.as_str(),
        "organization": organization.map(Bson::ObjectId).unwrap_or(Bson::Null),
        "location": location.map(Bson::String).unwrap_or(Bson::Null),
        "start_date": to_bson_date(start),
        "end_date": to_bson_date(end),
    };
    if let Some(title) = &request.title {
        set.insert("title", required_text(title, "Title")?);
    }
    if let Some(description) = &request.description {
        set.insert("description", description.trim());
    }
    if let Some(reward_points) = request.reward_points {
        validate_reward(reward_points)?;
        set.insert("reward_points", reward_points);
    }
    if let Some(inputs) = &request.actions {
        let actions = parse_actions(inputs)?;
        ensure_actions_exist(db, &actions).await?;
        set.insert("actions", mongodb::bson::to_bson(&actions)?);
    }
    ensure_organization_exists(db, organization.as_ref()).await?;

    collection(db)
        .find_one_and_update(doc! { "_id": *id }, doc! { "$set": set })
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| AppError::not_found("Challenge not found"))
}

pub async fn delete(db: &MongoDB, claims: &Claims, id: &ObjectId) -> Result<(), AppError> {
    let existing = get(db, id).await?;
    claims.ensure_can_modify(&existing.created_by, "delete this challenge")?;

    collection(db).delete_one(doc! { "_id": *id }).await?;
    log::info!("🗑️  Challenge deleted: {} by {}", existing.title, claims.email);
    Ok(())
}

async fn bump_user(db: &MongoDB, user: &ObjectId, inc: Document) -> Result<(), AppError> {
    db.collection::<User>(User::COLLECTION)
        .update_one(doc! { "_id": *user }, doc! { "$inc": inc })
        .await?;
    Ok(())
}

pub async fn join(db: &MongoDB, claims: &Claims, id: &ObjectId) -> Result<Challenge, AppError> {
    let user = claims.user_id()?;
    let challenge = get(db, id).await?;
    challenge.ensure_can_join(&user, Utc::now())?;

    let before = collection(db)
        .find_one_and_update(
            doc! { "_id": *id, "participants": { "$ne": user } },
            doc! { "$addToSet": { "participants": user, "joined_by": user } },
        )
        .return_document(ReturnDocument::Before)
        .await?
        .ok_or_else(|| AppError::validation("You have already joined this challenge"))?;

    if before.is_first_join(&user) {
        bump_user(db, &user, doc! { "challenges_joined": 1_i64 }).await?;
    }
    let challenge = get(db, id).await?;
    log::info!("➕ {} joined challenge {}", claims.email, challenge.title);
    Ok(challenge)
}

pub async fn leave(db: &MongoDB, claims: &Claims, id: &ObjectId) -> Result<Challenge, AppError> {
    let user = claims.user_id()?;
    let challenge = get(db, id).await?;
    challenge.ensure_can_leave(&user)?;

    let challenge = collection(db)
        .find_one_and_update(
            doc! { "_id": *id, "participants": user },
            doc! { "$pull": { "participants": user } },
        )
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| AppError::validation("You have not joined this challenge"))?;

    log::info!("➖ {} left challenge {}", claims.email, challenge.title);
    Ok(challenge)
}

/// Marks the challenge completed for the caller and credits its reward points.
pub async fn complete(db: &MongoDB, claims: &Claims, id: &ObjectId) -> Result<Challenge, AppError> {
    let user = claims.user_id()?;
    let challenge = get(db, id).await?;
    challenge.ensure_can_complete(&user)?;

    let challenge = collection(db)
        .find_one_and_update(
            doc! { "_id": *id, "participants": user, "completed_by": { "$ne": user } },
            doc! { "$addToSet": { "completed_by": user } },
        )
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| AppError::validation("You have already completed this challenge"))?;

    bump_user(
        db,
        &user,
        doc! { "challenges_completed": 1_i64, "total_points": challenge.reward_points },
    )
    .await?;

    log::info!("🏆 {} completed challenge {} (+{} pts)", claims.email, challenge.title, challenge.reward_points);
    Ok(challenge)
}

#[derive(Debug, Deserialize)]
struct ProgressRow {
    #[serde(rename = "_id")]
    action: ObjectId,
    count: i64,
}

/// Per-action progress; `percent` averages each action's capped ratio.
pub fn build_progress(challenge: &Challenge, user: &ObjectId, logged: &HashMap<ObjectId, i64>) -> ChallengeProgress {
    let actions: Vec<ActionProgress> = challenge
        .actions
        .iter()
        .map(|a| {
            let count = logged.get(&a.action).copied().unwrap_or(0);
            ActionProgress {
                action: a.action.to_hex(),
                required: a.count,
                logged: count,
                done: count >= a.count as i64,
            }
        })
        .collect();

    let completed = challenge.has_completed(user);
    let percent = if actions.is_empty() {
        if completed { 100.0 } else { 0.0 }
    } else {
        let sum: f64 = actions
            .iter()
            .map(|a| (a.logged as f64 / a.required.max(1) as f64).min(1.0))
            .sum();
        (sum / actions.len() as f64 * 100.0).round()
    };

    ChallengeProgress {
        challenge: challenge.id.map(|id| id.to_hex()).unwrap_or_default(),
        joined: challenge.is_participant(user),
        completed,
        actions,
        percent,
    }
}

pub async fn progress(db: &MongoDB, claims: &Claims, id: &ObjectId) -> Result<ChallengeProgress, AppError> {
    let user = claims.user_id()?;
    let challenge = get(db, id).await?;

    let ids: Vec<ObjectId> = challenge.actions.iter().map(|a| a.action).collect();
    let mut logged = HashMap::new();
    if !ids.is_empty() {
        let pipeline = aggregations::challenge_progress_pipeline(
            &user,
            &ids,
            day_start(to_chrono(challenge.start_date)),
            to_chrono(challenge.end_date),
        );
        let rows: Vec<ProgressRow> =
            aggregate_rows(&db.collection::<UserAction>(UserAction::COLLECTION), pipeline).await?;
        logged.extend(rows.into_iter().map(|r| (r.action, r.count)));
    }

    Ok(build_progress(&challenge, &user, &logged))
}
