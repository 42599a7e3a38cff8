use actix_web::{web, HttpResponse};

use crate::{
    database::MongoDB,
    middleware::auth::Claims,
    models::{CreateCommentRequest, CreatePostRequest, Post, PostQuery, PostResponse, UpdatePostRequest},
    services::post_service,
    utils::{parse_object_id, AppError},
};

fn post_json(post: Post) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "post": PostResponse::from(post)
    }))
}

/// GET /api/posts - feed (comunidade, autor, tag, busca)
pub async fn list_posts(db: web::Data<MongoDB>, query: web::Query<PostQuery>) -> Result<HttpResponse, AppError> {
    log::info!(
        "📋 GET /posts - community: {:?}, user: {:?}, tag: {:?}",
        query.community,
        query.user,
        query.tag
    );

    let page = post_service::list(&db, &query).await?;
    Ok(HttpResponse::Ok().json(page.map(PostResponse::from)))
}

/// GET /api/posts/{id}
pub async fn get_post(db: web::Data<MongoDB>, path: web::Path<String>) -> Result<HttpResponse, AppError> {
    let id = parse_object_id(&path, "post")?;
    log::info!("🔍 GET /posts/{}", id);

    Ok(post_json(post_service::get(&db, &id).await?))
}

/// POST /api/posts
pub async fn create_post(
    claims: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    request: web::Json<CreatePostRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("📝 POST /posts - user: {}", claims.email);

    let post = post_service::create(&db, &claims, request.into_inner()).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "post": PostResponse::from(post)
    })))
}

/// PUT /api/posts/{id}
pub async fn update_post(
    claims: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
    request: web::Json<UpdatePostRequest>,
) -> Result<HttpResponse, AppError> {
    let id = parse_object_id(&path, "post")?;
    log::info!("✏️  PUT /posts/{} - user: {}", id, claims.email);

    Ok(post_json(post_service::update(&db, &claims, &id, request.into_inner()).await?))
}

/// DELETE /api/posts/{id}
pub async fn delete_post(
    claims: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = parse_object_id(&path, "post")?;
    log::info!("🗑️  DELETE /posts/{} - user: {}", id, claims.email);

    post_service::delete(&db, &claims, &id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Post deleted"
    })))
}

/// POST /api/posts/{id}/like - curte ou descurte
pub async fn like_post(
    claims: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = parse_object_id(&path, "post")?;
    log::info!("❤️  POST /posts/{}/like - user: {}", id, claims.email);

    let (post, liked) = post_service::toggle_like(&db, &claims, &id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "liked": liked,
        "post": PostResponse::from(post)
    })))
}

/// POST /api/posts/{id}/comments
pub async fn add_comment(
    claims: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
    request: web::Json<CreateCommentRequest>,
) -> Result<HttpResponse, AppError> {
    let id = parse_object_id(&path, "post")?;
    log::info!("💬 POST /posts/{}/comments - user: {}", id, claims.email);

    let post = post_service::add_comment(&db, &claims, &id, request.into_inner()).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "post": PostResponse::from(post)
    })))
}

/// DELETE /api/posts/{id}/comments/{comment_id}
pub async fn delete_comment(
    claims: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (post_id, comment_id) = path.into_inner();
    let id = parse_object_id(&post_id, "post")?;
    let comment_id = parse_object_id(&comment_id, "comment")?;
    log::info!("🗑️  DELETE /posts/{}/comments/{} - user: {}", id, comment_id, claims.email);

    Ok(post_json(post_service::delete_comment(&db, &claims, &id, &comment_id).await?))
}
