use chrono::{DateTime, Duration, Utc};
use mongodb::bson::{doc, oid::ObjectId};

use crate::{
    database::MongoDB,
    models::{
        common::to_bson_date, rank_rows, CategoryStat, Challenge, DailyStat, LeaderboardEntry, LeaderboardQuery,
        LeaderboardRow, MonthlyStat, RecentAction, RecentActionRow, Totals, UserAction, UserDashboard,
        UserResponse, UserStats,
    },
    services::{aggregations, auth_service, listing::aggregate_rows},
    utils::{day_start, months_back_start, period_start, AppError, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE},
};

const DASHBOARD_DAYS: i64 = 7;
const RECENT_ACTIONS: i64 = 5;
const MONTHS_OF_HISTORY: u32 = 12;

pub async fn leaderboard(db: &MongoDB, query: &LeaderboardQuery) -> Result<Vec<LeaderboardEntry>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE) as i64;
    let since = period_start(query.period.map(|p| p.as_str()), Utc::now());
    let pipeline = aggregations::leaderboard_pipeline(query.sort_by.unwrap_or_default(), limit, since);

    let rows: Vec<LeaderboardRow> =
        aggregate_rows(&db.collection::<UserAction>(UserAction::COLLECTION), pipeline).await?;
    Ok(rank_rows(rows))
}

pub async fn user_stats(db: &MongoDB, user: &ObjectId) -> Result<UserStats, AppError> {
    let collection = db.collection::<UserAction>(UserAction::COLLECTION);
    let since = months_back_start(Utc::now(), MONTHS_OF_HISTORY - 1);

    let totals: Vec<Totals> = aggregate_rows(&collection, aggregations::totals_pipeline(user)).await?;
    let monthly: Vec<MonthlyStat> = aggregate_rows(&collection, aggregations::monthly_pipeline(user, since)).await?;
    let categories: Vec<CategoryStat> =
        aggregate_rows(&collection, aggregations::category_pipeline(user, None)).await?;

    Ok(UserStats {
        totals: totals.into_iter().next().unwrap_or_default(),
        monthly,
        categories,
    })
}

/// One entry per day from `start`, zero-filled where the pipeline had no row.
pub fn fill_days(rows: Vec<DailyStat>, start: DateTime<Utc>, days: i64) -> Vec<DailyStat> {
    (0..days)
        .map(|offset| {
            let date = (start + Duration::days(offset)).format("%Y-%m-%d").to_string();
            rows.iter().find(|r| r.date == date).cloned().unwrap_or(DailyStat {
                date,
                emission_saved: 0.0,
                points: 0,
                count: 0,
            })
        })
        .collect()
}

pub async fn dashboard(db: &MongoDB, user_id: &ObjectId) -> Result<UserDashboard, AppError> {
    let user = auth_service::get_user(db, user_id).await?;
    let collection = db.collection::<UserAction>(UserAction::COLLECTION);

    let now = Utc::now();
    let week_start = day_start(now) - Duration::days(DASHBOARD_DAYS - 1);

    let daily: Vec<DailyStat> =
        aggregate_rows(&collection, aggregations::daily_pipeline(user_id, week_start)).await?;
    let recent: Vec<RecentActionRow> =
        aggregate_rows(&collection, aggregations::recent_actions_pipeline(user_id, RECENT_ACTIONS)).await?;
    let categories: Vec<CategoryStat> =
        aggregate_rows(&collection, aggregations::category_pipeline(user_id, None)).await?;

    let bson_now = to_bson_date(now);
    let active_challenges = db
        .collection::<Challenge>(Challenge::COLLECTION)
        .count_documents(doc! {
            "participants": *user_id,
            "start_date": { "$lte": bson_now },
            "end_date": { "$gte": bson_now },
        })
        .await?;

    Ok(UserDashboard {
        user: UserResponse::from(user),
        weekly: fill_days(daily, week_start, DASHBOARD_DAYS),
        recent_actions: recent.into_iter().map(RecentAction::from).collect(),
        categories,
        active_challenges,
    })
}
