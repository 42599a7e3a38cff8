use mongodb::{
    bson::{doc, oid::ObjectId, to_bson, DateTime as BsonDateTime, Document},
    options::ReturnDocument,
    Collection,
};

use crate::{
    database::MongoDB,
    models::{
        common::{optional_text, required_text},
        normalize_tags, Comment, Community, CreateCommentRequest, CreatePostRequest, Membership, Post, PostQuery,
        UpdatePostRequest,
    },
    services::{
        auth_service::Claims,
        listing::{find_by_id, find_page},
    },
    utils::{apply_search, parse_object_id, AppError, Paginated, Pagination},
};

const SEARCH_FIELDS: &[&str] = &["content"];

fn collection(db: &MongoDB) -> Collection<Post> {
    db.collection::<Post>(Post::COLLECTION)
}

pub fn list_filter(query: &PostQuery) -> Result<Document, AppError> {
    let mut filter = doc! {};
    if let Some(community) = query.community.as_deref().filter(|s| !s.is_empty()) {
        filter.insert("community", parse_object_id(community, "community")?);
    }
    if let Some(user) = query.user.as_deref().filter(|s| !s.is_empty()) {
        filter.insert("user", parse_object_id(user, "user")?);
    }
    if let Some(tag) = normalize_tags(query.tag.as_slice()).into_iter().next() {
        filter.insert("tags", tag);
    }
    apply_search(&mut filter, query.search.as_deref(), SEARCH_FIELDS);
    Ok(filter)
}

pub async fn list(db: &MongoDB, query: &PostQuery) -> Result<Paginated<Post>, AppError> {
    find_page(
        &collection(db),
        list_filter(query)?,
        doc! { "created_at": -1 },
        Pagination::new(query.page, query.limit),
    )
    .await
}

pub async fn get(db: &MongoDB, id: &ObjectId) -> Result<Post, AppError> {
    find_by_id(&collection(db), id, "Post").await
}

/// Posting into a community requires membership.
pub async fn create(db: &MongoDB, claims: &Claims, request: CreatePostRequest) -> Result<Post, AppError> {
    let user = claims.user_id()?;
    let content = required_text(&request.content, "Content")?;

    let community = match optional_text(request.community) {
        Some(id) => {
            let id = parse_object_id(&id, "community")?;
            let community =
                find_by_id(&db.collection::<Community>(Community::COLLECTION), &id, "Community").await?;
            if !community.is_member(&user) {
                return Err(AppError::forbidden("You must be a member of this community to post"));
            }
            Some(id)
        }
        None => None,
    };

    let now = BsonDateTime::now();
    let mut post = Post {
        id: None,
        user,
        community,
        content,
        image: optional_text(request.image),
        tags: normalize_tags(&request.tags),
        likes: Vec::new(),
        comments: Vec::new(),
        created_at: now,
        updated_at: now,
    };

    let inserted = collection(db).insert_one(&post).await?;
    post.id = inserted.inserted_id.as_object_id();

    log::info!("📝 Post created by {}", claims.email);
    Ok(post)
}

pub async fn update(db: &MongoDB, claims: &Claims, id: &ObjectId, request: UpdatePostRequest) -> Result<Post, AppError> {
    let existing = get(db, id).await?;
    claims.ensure_can_modify(&existing.user, "update this post")?;

    let mut set = doc! { "updated_at": BsonDateTime::now() };
    if let Some(content) = &request.content {
        set.insert("content", required_text(content, "Content")?);
    }
    if let Some(image) = request.image {
        set.insert("image", image.trim());
    }
    if let Some(tags) = &request.tags {
        set.insert("tags", normalize_tags(tags));
    }

    collection(db)
        .find_one_and_update(doc! { "_id": *id }, doc! { "$set": set })
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| AppError::not_found("Post not found"))
}

pub async fn delete(db: &MongoDB, claims: &Claims, id: &ObjectId) -> Result<(), AppError> {
    let existing = get(db, id).await?;
    claims.ensure_can_modify(&existing.user, "delete this post")?;

    collection(db).delete_one(doc! { "_id": *id }).await?;
    log::info!("🗑️  Post {} deleted by {}", id, claims.email);
    Ok(())
}

/// Likes the post if the caller has not, unlikes it otherwise.
/// Returns the updated post and whether it is now liked.
pub async fn toggle_like(db: &MongoDB, claims: &Claims, id: &ObjectId) -> Result<(Post, bool), AppError> {
    let user = claims.user_id()?;
    let post = get(db, id).await?;
    let (update, liked) = post.like_toggle_update(&user);

    let post = collection(db)
        .find_one_and_update(doc! { "_id": *id }, update)
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| AppError::not_found("Post not found"))?;

    Ok((post, liked))
}

pub async fn add_comment(
    db: &MongoDB,
    claims: &Claims,
    id: &ObjectId,
    request: CreateCommentRequest,
) -> Result<Post, AppError> {
    let comment = Comment {
        id: ObjectId::new(),
        user: claims.user_id()?,
        content: required_text(&request.content, "Content")?,
        created_at: BsonDateTime::now(),
    };

    let comment = to_bson(&comment)?;

    let post = collection(db)
        .find_one_and_update(doc! { "_id": *id }, doc! { "$push": { "comments": comment } })
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| AppError::not_found("Post not found"))?;

    log::info!("💬 {} commented on post {}", claims.email, id);
    Ok(post)
}

/// Comment author, post author, or admin.
pub fn ensure_can_delete_comment(claims: &Claims, post: &Post, comment_id: &ObjectId) -> Result<(), AppError> {
    let comment = post
        .comment(comment_id)
        .ok_or_else(|| AppError::not_found("Comment not found"))?;

    if claims.can_modify(&comment.user) || claims.can_modify(&post.user) {
        Ok(())
    } else {
        Err(AppError::forbidden("Not authorized to delete this comment"))
    }
}

pub async fn delete_comment(
    db: &MongoDB,
    claims: &Claims,
    id: &ObjectId,
    comment_id: &ObjectId,
) -> Result<Post, AppError> {
    let post = get(db, id).await?;
    ensure_can_delete_comment(claims, &post, comment_id)?;

    collection(db)
        .find_one_and_update(
            doc! { "_id": *id },
            doc! { "$pull": { "comments": { "_id": *comment_id } } },
        )
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| AppError::not_found("Post not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::services::auth_service::claims_for;

    fn post_with_comment(author: ObjectId, commenter: ObjectId) -> (Post, ObjectId) {
        let now = BsonDateTime::now();
        let comment = Comment { id: ObjectId::new(), user: commenter, content: "Great!".into(), created_at: now };
        let comment_id = comment.id;
        let post = Post {
            id: Some(ObjectId::new()),
            user: author,
            community: None,
            content: "Switched to a heat pump".into(),
            image: None,
            tags: vec!["energy".into()],
            likes: vec![],
            comments: vec![comment],
            created_at: now,
            updated_at: now,
        };
        (post, comment_id)
    }

    #[test]
    fn test_list_filter() {
        let community = ObjectId::new();
        let query = PostQuery {
            community: Some(community.to_hex()),
            tag: Some("#Solar".into()),
            search: Some("panel".into()),
            ..Default::default()
        };
        let filter = list_filter(&query).unwrap();
        assert_eq!(filter.get_object_id("community").unwrap(), community);
        assert_eq!(filter.get_str("tags").unwrap(), "solar");
        assert_eq!(filter.get_array("$or").unwrap().len(), 1);
    }

    #[test]
    fn test_list_filter_rejects_bad_ids() {
        let query = PostQuery { user: Some("abc".into()), ..Default::default() };
        match list_filter(&query) {
            Err(AppError::Validation(msg)) => assert_eq!(msg, "Invalid user ID"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_comment_delete_permissions() {
        let author = ObjectId::new();
        let commenter = ObjectId::new();
        let (post, comment_id) = post_with_comment(author, commenter);

        assert!(ensure_can_delete_comment(&claims_for(commenter, Role::Public), &post, &comment_id).is_ok());
        assert!(ensure_can_delete_comment(&claims_for(author, Role::Public), &post, &comment_id).is_ok());
        assert!(ensure_can_delete_comment(&claims_for(ObjectId::new(), Role::Admin), &post, &comment_id).is_ok());

        let stranger = claims_for(ObjectId::new(), Role::Public);
        assert!(matches!(
            ensure_can_delete_comment(&stranger, &post, &comment_id),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            ensure_can_delete_comment(&stranger, &post, &ObjectId::new()),
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    #[ignore] // requires MONGO_URI
    async fn test_like_twice_restores_post() {
        let uri = std::env::var("MONGO_URI").unwrap();
        let db = MongoDB::with_database(&uri, "terranest_test").await.unwrap();

        let author = claims_for(ObjectId::new(), Role::Public);
        let created = create(
            &db,
            &author,
            CreatePostRequest {
                content: "Started composting".into(),
                community: None,
                image: None,
                tags: vec![],
            },
        )
        .await
        .unwrap();
        let post_id = created.id.unwrap();

        let fan = claims_for(ObjectId::new(), Role::Public);
        let (post, liked) = toggle_like(&db, &fan, &post_id).await.unwrap();
        assert!(liked);
        assert_eq!(post.likes.len(), 1);

        let (post, liked) = toggle_like(&db, &fan, &post_id).await.unwrap();
        assert!(!liked);
        assert_eq!(post.likes, created.likes);

        delete(&db, &author, &post_id).await.unwrap();
    }
}
