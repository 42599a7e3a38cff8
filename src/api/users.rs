use actix_web::{web, HttpResponse};

use crate::{
    database::MongoDB,
    middleware::auth::Claims,
    models::{LeaderboardQuery, UpdateProfileRequest, UserResponse},
    services::{stats_service, user_service},
    utils::{parse_object_id, AppError},
};

/// GET /api/users/leaderboard?sortBy=&limit=&period=
#[utoipa::path(
    get,
    path = "/api/users/leaderboard",
    tag = "Users",
    params(
        ("sortBy" = Option<String>, Query, description = "emission (default), points or actions"),
        ("limit" = Option<u64>, Query, description = "Rows to return, default 10, max 100"),
        ("period" = Option<String>, Query, description = "week, month or all (default)")
    ),
    responses(
        (status = 200, description = "Ranked users, rank starting at 1")
    )
)]
pub async fn leaderboard(
    db: web::Data<MongoDB>,
    query: web::Query<LeaderboardQuery>,
) -> Result<HttpResponse, AppError> {
    log::info!(
        "🏅 GET /users/leaderboard - sortBy: {:?}, period: {:?}, limit: {:?}",
        query.sort_by,
        query.period,
        query.limit
    );

    let leaderboard = stats_service::leaderboard(&db, &query).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "leaderboard": leaderboard
    })))
}

/// GET /api/users/stats
pub async fn user_stats(claims: web::ReqData<Claims>, db: web::Data<MongoDB>) -> Result<HttpResponse, AppError> {
    log::info!("📊 GET /users/stats - user: {}", claims.email);

    let stats = stats_service::user_stats(&db, &claims.user_id()?).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "stats": stats
    })))
}

/// GET /api/users/dashboard
pub async fn dashboard(claims: web::ReqData<Claims>, db: web::Data<MongoDB>) -> Result<HttpResponse, AppError> {
    log::info!("📊 GET /users/dashboard - user: {}", claims.email);

    let dashboard = stats_service::dashboard(&db, &claims.user_id()?).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "dashboard": dashboard
    })))
}

/// PUT /api/users/profile
pub async fn update_profile(
    claims: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    request: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("✏️  PUT /users/profile - user: {}", claims.email);

    let user = user_service::update_profile(&db, &claims, request.into_inner()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "user": UserResponse::from(user)
    })))
}

/// GET /api/users/{id}
pub async fn get_user(db: web::Data<MongoDB>, path: web::Path<String>) -> Result<HttpResponse, AppError> {
    let id = parse_object_id(&path, "user")?;
    log::info!("🔍 GET /users/{}", id);

    let user = user_service::get_profile(&db, &id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "user": UserResponse::from(user)
    })))
}

/// DELETE /api/users/{id}
pub async fn delete_user(
    claims: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = parse_object_id(&path, "user")?;
    log::info!("🗑️  DELETE /users/{} - by: {}", id, claims.email);

    user_service::delete_user(&db, &claims, &id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "User deleted"
    })))
}
