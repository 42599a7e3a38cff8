//! Aggregation pipelines over `user_actions`.
//!
//! Every builder is a pure function so the stages can be checked without a database.

use chrono::{DateTime, Utc};
use mongodb::bson::{doc, oid::ObjectId, Bson, Document};

use crate::models::{common::to_bson_date, Action, LeaderboardSort, User};

/// Per-user totals joined with the user profile, sorted and cut to `limit`.
pub fn leaderboard_pipeline(sort: LeaderboardSort, limit: i64, since: Option<DateTime<Utc>>) -> Vec<Document> {
    let mut pipeline = Vec::new();
    if let Some(since) = since {
        pipeline.push(doc! { "$match": { "date": { "$gte": to_bson_date(since) } } });
    }

    let mut order = Document::new();
    order.insert(sort.field(), -1);
    order.insert("_id", 1);

    pipeline.extend([
        doc! { "$group": {
            "_id": "$user",
            "total_emission_saved": { "$sum": "$emission_saved" },
            "total_points": { "$sum": "$points" },
            "actions_count": { "$sum": 1 },
        } },
        doc! { "$lookup": {
            "from": User::COLLECTION,
            "localField": "_id",
            "foreignField": "_id",
            "as": "user",
        } },
        doc! { "$unwind": "$user" },
        doc! { "$sort": order },
        doc! { "$limit": limit },
        doc! { "$project": {
            "name": "$user.name",
            "avatar": "$user.avatar",
            "organization": "$user.organization",
            "total_emission_saved": 1,
            "total_points": 1,
            "actions_count": 1,
        } },
    ]);
    pipeline
}

fn user_match(user: &ObjectId, since: Option<DateTime<Utc>>) -> Document {
    let mut filter = doc! { "user": *user };
    if let Some(since) = since {
        filter.insert("date", doc! { "$gte": to_bson_date(since) });
    }
    doc! { "$match": filter }
}

/// `$group` body keyed by `id` with the emission/points/count sums.
fn group_sums(id: impl Into<Bson>) -> Document {
    let id: Bson = id.into();
    doc! {
        "_id": id,
        "emission_saved": { "$sum": "$emission_saved" },
        "points": { "$sum": "$points" },
        "count": { "$sum": 1 },
    }
}

pub fn totals_pipeline(user: &ObjectId) -> Vec<Document> {
    vec![
        user_match(user, None),
        doc! { "$group": {
            "_id": null,
            "total_emission_saved": { "$sum": "$emission_saved" },
            "total_points": { "$sum": "$points" },
            "actions_count": { "$sum": 1 },
        } },
    ]
}

/// One row per calendar month (UTC) since `since`, oldest first.
pub fn monthly_pipeline(user: &ObjectId, since: DateTime<Utc>) -> Vec<Document> {
    let group = group_sums(doc! { "year": { "$year": "$date" }, "month": { "$month": "$date" } });

    vec![
        user_match(user, Some(since)),
        doc! { "$group": group },
        doc! { "$sort": { "_id.year": 1, "_id.month": 1 } },
        doc! { "$project": {
            "_id": 0,
            "year": "$_id.year",
            "month": "$_id.month",
            "emission_saved": 1,
            "points": 1,
            "count": 1,
        } },
    ]
}

/// One row per day that has logs, keyed `YYYY-MM-DD`.
pub fn daily_pipeline(user: &ObjectId, since: DateTime<Utc>) -> Vec<Document> {
    let group = group_sums(doc! { "$dateToString": { "format": "%Y-%m-%d", "date": "$date" } });

    vec![
        user_match(user, Some(since)),
        doc! { "$group": group },
        doc! { "$sort": { "_id": 1 } },
        doc! { "$project": { "_id": 0, "date": "$_id", "emission_saved": 1, "points": 1, "count": 1 } },
    ]
}

/// Breakdown by the category of the logged catalog action.
pub fn category_pipeline(user: &ObjectId, since: Option<DateTime<Utc>>) -> Vec<Document> {
    let group = group_sums("$action_doc.category");

    vec![
        user_match(user, since),
        doc! { "$lookup": {
            "from": Action::COLLECTION,
            "localField": "action",
            "foreignField": "_id",
            "as": "action_doc",
        } },
        doc! { "$unwind": "$action_doc" },
        doc! { "$group": group },
        doc! { "$sort": { "emission_saved": -1, "_id": 1 } },
        doc! { "$project": { "_id": 0, "category": "$_id", "emission_saved": 1, "points": 1, "count": 1 } },
    ]
}

pub fn recent_actions_pipeline(user: &ObjectId, limit: i64) -> Vec<Document> {
    vec![
        user_match(user, None),
        doc! { "$sort": { "date": -1, "created_at": -1 } },
        doc! { "$limit": limit },
        doc! { "$lookup": {
            "from": Action::COLLECTION,
            "localField": "action",
            "foreignField": "_id",
            "as": "action_doc",
        } },
        doc! { "$unwind": "$action_doc" },
        doc! { "$project": {
            "action": 1,
            "date": 1,
            "emission_saved": 1,
            "points": 1,
            "title": "$action_doc.title",
            "category": "$action_doc.category",
        } },
    ]
}

/// Log counts per required action between the challenge dates.
pub fn challenge_progress_pipeline(
    user: &ObjectId,
    actions: &[ObjectId],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<Document> {
    vec![
        doc! { "$match": {
            "user": *user,
            "action": { "$in": actions.to_vec() },
            "date": { "$gte": to_bson_date(start), "$lte": to_bson_date(end) },
        } },
        doc! { "$group": { "_id": "$action", "count": { "$sum": 1 } } },
    ]
}
