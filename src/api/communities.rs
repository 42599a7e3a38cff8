use actix_web::{web, HttpResponse};

use crate::{
    database::MongoDB,
    middleware::auth::Claims,
    models::{Community, CommunityQuery, CommunityResponse, CreateCommunityRequest, UpdateCommunityRequest},
    services::community_service,
    utils::{parse_object_id, AppError},
};

fn community_json(community: Community) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "community": CommunityResponse::from(community)
    }))
}

/// GET /api/communities
pub async fn list_communities(
    db: web::Data<MongoDB>,
    query: web::Query<CommunityQuery>,
) -> Result<HttpResponse, AppError> {
    log::info!("📋 GET /communities - category: {:?}, search: {:?}", query.category, query.search);

    let page = community_service::list(&db, &query).await?;
    Ok(HttpResponse::Ok().json(page.map(CommunityResponse::from)))
}

/// GET /api/communities/{id}
pub async fn get_community(db: web::Data<MongoDB>, path: web::Path<String>) -> Result<HttpResponse, AppError> {
    let id = parse_object_id(&path, "community")?;
    log::info!("🔍 GET /communities/{}", id);

    Ok(community_json(community_service::get(&db, &id).await?))
}

/// POST /api/communities
pub async fn create_community(
    claims: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    request: web::Json<CreateCommunityRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("📝 POST /communities - user: {}, name: {}", claims.email, request.name);

    let community = community_service::create(&db, &claims, request.into_inner()).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "community": CommunityResponse::from(community)
    })))
}

/// PUT /api/communities/{id}
pub async fn update_community(
    claims: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
    request: web::Json<UpdateCommunityRequest>,
) -> Result<HttpResponse, AppError> {
    let id = parse_object_id(&path, "community")?;
    log::info!("✏️  PUT /communities/{} - user: {}", id, claims.email);

    Ok(community_json(
        community_service::update(&db, &claims, &id, request.into_inner()).await?,
    ))
}

/// DELETE /api/communities/{id}
pub async fn delete_community(
    claims: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = parse_object_id(&path, "community")?;
    log::info!("🗑️  DELETE /communities/{} - user: {}", id, claims.email);

    community_service::delete(&db, &claims, &id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Community deleted"
    })))
}

/// POST /api/communities/{id}/join
pub async fn join_community(
    claims: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = parse_object_id(&path, "community")?;
    log::info!("➕ POST /communities/{}/join - user: {}", id, claims.email);

    Ok(community_json(community_service::join(&db, &claims, &id).await?))
}

/// POST /api/communities/{id}/leave
pub async fn leave_community(
    claims: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = parse_object_id(&path, "community")?;
    log::info!("➖ POST /communities/{}/leave - user: {}", id, claims.email);

    Ok(community_json(community_service::leave(&db, &claims, &id).await?))
}
