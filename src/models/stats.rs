use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaderboardSort {
    #[default]
    Emission,
    Points,
    Actions,
}

impl LeaderboardSort {
    /// Field of the grouped document to sort on.
    pub fn field(self) -> &'static str {
        match self {
            LeaderboardSort::Emission => "total_emission_saved",
            LeaderboardSort::Points => "total_points",
            LeaderboardSort::Actions => "actions_count",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Week,
    Month,
    All,
}

impl Period {
    pub fn as_str(self) -> &'static str {
        match self {
            Period::Week => "week",
            Period::Month => "month",
            Period::All => "all",
        }
    }
}

/// `?sortBy=&limit=&period=`
#[derive(Debug, Default, Deserialize)]
pub struct LeaderboardQuery {
    #[serde(rename = "sortBy")]
    pub sort_by: Option<LeaderboardSort>,
    pub limit: Option<u64>,
    pub period: Option<Period>,
}

/// Row produced by the leaderboard pipeline
#[derive(Debug, Clone, Deserialize)]
pub struct LeaderboardRow {
    #[serde(rename = "_id")]
    pub user: ObjectId,
    pub name: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub organization: Option<ObjectId>,
    #[serde(default)]
    pub total_emission_saved: f64,
    #[serde(default)]
    pub total_points: i64,
    #[serde(default)]
    pub actions_count: i64,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user_id: String,
    pub name: String,
    pub avatar: Option<String>,
    pub organization: Option<String>,
    pub total_emission_saved: f64,
    pub total_points: i64,
    pub actions_count: i64,
}

/// Assigns 1-based ranks in the order the pipeline returned the rows.
pub fn rank_rows(rows: Vec<LeaderboardRow>) -> Vec<LeaderboardEntry> {
    rows.into_iter()
        .enumerate()
        .map(|(i, r)| LeaderboardEntry {
            rank: i + 1,
            user_id: r.user.to_hex(),
            name: r.name,
            avatar: r.avatar,
            organization: r.organization.map(|id| id.to_hex()),
            total_emission_saved: r.total_emission_saved,
            total_points: r.total_points,
            actions_count: r.actions_count,
        })
        .collect()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Totals {
    #[serde(default)]
    pub total_emission_saved: f64,
    #[serde(default)]
    pub total_points: i64,
    #[serde(default)]
    pub actions_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyStat {
    pub year: i32,
    pub month: i32,
    #[serde(default)]
    pub emission_saved: f64,
    #[serde(default)]
    pub points: i64,
    #[serde(default)]
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyStat {
    /// YYYY-MM-DD
    pub date: String,
    #[serde(default)]
    pub emission_saved: f64,
    #[serde(default)]
    pub points: i64,
    #[serde(default)]
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryStat {
    pub category: String,
    #[serde(default)]
    pub emission_saved: f64,
    #[serde(default)]
    pub points: i64,
    #[serde(default)]
    pub count: i64,
}

/// Logged action joined with its catalog entry
#[derive(Debug, Clone, Deserialize)]
pub struct RecentActionRow {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub action: ObjectId,
    pub title: String,
    pub category: String,
    pub date: mongodb::bson::DateTime,
    #[serde(default)]
    pub emission_saved: f64,
    #[serde(default)]
    pub points: i64,
}

#[derive(Debug, Serialize)]
pub struct RecentAction {
    pub id: String,
    pub action: String,
    pub title: String,
    pub category: String,
    pub date: String,
    pub emission_saved: f64,
    pub points: i64,
}

impl From<RecentActionRow> for RecentAction {
    fn from(r: RecentActionRow) -> Self {
        RecentAction {
            id: r.id.to_hex(),
            action: r.action.to_hex(),
            title: r.title,
            category: r.category,
            date: super::common::fmt_date(r.date),
            emission_saved: r.emission_saved,
            points: r.points,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserStats {
    pub totals: Totals,
    pub monthly: Vec<MonthlyStat>,
    pub categories: Vec<CategoryStat>,
}

#[derive(Debug, Serialize)]
pub struct UserDashboard {
    pub user: super::UserResponse,
    pub weekly: Vec<DailyStat>,
    pub recent_actions: Vec<RecentAction>,
    pub categories: Vec<CategoryStat>,
    pub active_challenges: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    #[test]
    fn test_ranks_are_one_based_and_ordered() {
        let rows: Vec<LeaderboardRow> = (0..3)
            .map(|i| {
                mongodb::bson::from_document(doc! {
                    "_id": ObjectId::new(),
                    "name": format!("user{}", i),
                    "total_emission_saved": 10.0 - i as f64,
                    "total_points": 100_i64 - i,
                    "actions_count": 3_i32,
                })
                .unwrap()
            })
            .collect();

        let entries = rank_rows(rows);
        let ranks: Vec<usize> = entries.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        assert_eq!(entries[0].name, "user0");
        assert_eq!(entries[2].actions_count, 3);
    }

    #[test]
    fn test_sort_fields() {
        assert_eq!(LeaderboardSort::default().field(), "total_emission_saved");
        assert_eq!(LeaderboardSort::Points.field(), "total_points");
        assert_eq!(LeaderboardSort::Actions.field(), "actions_count");
    }

    #[test]
    fn test_leaderboard_query_parsing() {
        let q: LeaderboardQuery =
            serde_json::from_str(r#"{"sortBy":"points","limit":5,"period":"week"}"#).unwrap();
        assert_eq!(q.sort_by, Some(LeaderboardSort::Points));
        assert_eq!(q.period, Some(Period::Week));
    }
}
