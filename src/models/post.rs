use mongodb::bson::{doc, oid::ObjectId, DateTime as BsonDateTime, Document};
use serde::{Deserialize, Serialize};

use super::common::{fmt_date, ids_hex, oid_hex};

/// Comentário embutido no post (tem seu próprio _id)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user: ObjectId,
    pub content: String,
    pub created_at: BsonDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user: ObjectId,
    #[serde(default)]
    pub community: Option<ObjectId>,
    pub content: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub likes: Vec<ObjectId>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    pub created_at: BsonDateTime,
    pub updated_at: BsonDateTime,
}

impl Post {
    pub const COLLECTION: &'static str = "posts";

    pub fn is_liked_by(&self, user: &ObjectId) -> bool {
        self.likes.contains(user)
    }

    /// Update that flips `user`'s like, and whether the post ends up liked.
    pub fn like_toggle_update(&self, user: &ObjectId) -> (Document, bool) {
        if self.is_liked_by(user) {
            (doc! { "$pull": { "likes": *user } }, false)
        } else {
            (doc! { "$addToSet": { "likes": *user } }, true)
        }
    }

    pub fn comment(&self, comment_id: &ObjectId) -> Option<&Comment> {
        self.comments.iter().find(|c| &c.id == comment_id)
    }
}

/// Tags are trimmed, lowercased, de-duplicated and blank ones dropped.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim().trim_start_matches('#').to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreatePostRequest {
    pub content: String,
    pub community: Option<String>,
    pub image: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UpdatePostRequest {
    pub content: Option<String>,
    pub image: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateCommentRequest {
    pub content: String,
}

/// `?community=&user=&tag=&search=&page=&limit=`
#[derive(Debug, Default, Deserialize)]
pub struct PostQuery {
    pub community: Option<String>,
    pub user: Option<String>,
    pub tag: Option<String>,
    pub search: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: String,
    pub user: String,
    pub content: String,
    pub created_at: String,
}

impl From<Comment> for CommentResponse {
    fn from(c: Comment) -> Self {
        CommentResponse {
            id: c.id.to_hex(),
            user: c.user.to_hex(),
            content: c.content,
            created_at: fmt_date(c.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub id: String,
    pub user: String,
    pub community: Option<String>,
    pub content: String,
    pub image: Option<String>,
    pub tags: Vec<String>,
    pub likes: Vec<String>,
    pub like_count: usize,
    pub comments: Vec<CommentResponse>,
    pub comment_count: usize,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Post> for PostResponse {
    fn from(p: Post) -> Self {
        PostResponse {
            id: oid_hex(p.id),
            user: p.user.to_hex(),
            community: p.community.map(|id| id.to_hex()),
            content: p.content,
            image: p.image,
            tags: p.tags,
            like_count: p.likes.len(),
            likes: ids_hex(&p.likes),
            comment_count: p.comments.len(),
            comments: p.comments.into_iter().map(CommentResponse::from).collect(),
            created_at: fmt_date(p.created_at),
            updated_at: fmt_date(p.updated_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post() -> Post {
        let now = BsonDateTime::now();
        Post {
            id: Some(ObjectId::new()),
            user: ObjectId::new(),
            community: None,
            content: "Planted 3 trees today".into(),
            image: None,
            tags: vec![],
            likes: vec![],
            comments: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a like update document the way the server would.
    fn apply_like_update(post: &mut Post, update: &Document) {
        if let Ok(add) = update.get_document("$addToSet") {
            let user = add.get_object_id("likes").unwrap();
            if !post.likes.contains(&user) {
                post.likes.push(user);
            }
        }
        if let Ok(pull) = update.get_document("$pull") {
            let user = pull.get_object_id("likes").unwrap();
            post.likes.retain(|id| *id != user);
        }
    }

    #[test]
    fn test_double_toggle_restores_state() {
        let mut p = post();
        let other = ObjectId::new();
        p.likes.push(other);
        let original = p.likes.clone();
        let user = ObjectId::new();

        let (update, liked) = p.like_toggle_update(&user);
        assert!(liked);
        apply_like_update(&mut p, &update);
        assert!(p.is_liked_by(&user));

        let (update, liked) = p.like_toggle_update(&user);
        assert!(!liked);
        apply_like_update(&mut p, &update);
        assert_eq!(p.likes, original);

        let (update, _) = p.like_toggle_update(&other);
        apply_like_update(&mut p, &update);
        let (update, _) = p.like_toggle_update(&other);
        apply_like_update(&mut p, &update);
        assert_eq!(p.likes, original);
    }

    #[test]
    fn test_like_toggle_update() {
        let mut p = post();
        let user = ObjectId::new();

        let (update, liked) = p.like_toggle_update(&user);
        assert!(liked);
        assert!(update.contains_key("$addToSet"));

        p.likes.push(user);
        let (update, liked) = p.like_toggle_update(&user);
        assert!(!liked);
        assert!(update.contains_key("$pull"));
    }

    #[test]
    fn test_normalize_tags() {
        let tags = vec![" #Solar ".to_string(), "solar".into(), "".into(), "Bike".into()];
        assert_eq!(normalize_tags(&tags), vec!["solar".to_string(), "bike".to_string()]);
    }

    #[test]
    fn test_find_comment() {
        let mut p = post();
        let comment = Comment {
            id: ObjectId::new(),
            user: ObjectId::new(),
            content: "Nice!".into(),
            created_at: BsonDateTime::now(),
        };
        let cid = comment.id;
        p.comments.push(comment);
        assert!(p.comment(&cid).is_some());
        assert!(p.comment(&ObjectId::new()).is_none());
    }
}
