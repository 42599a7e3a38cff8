use actix_web::{web, HttpResponse};

use crate::{
    database::MongoDB,
    middleware::auth::Claims,
    models::{Challenge, ChallengeQuery, ChallengeResponse, CreateChallengeRequest, UpdateChallengeRequest},
    services::challenge_service,
    utils::{parse_object_id, AppError},
};

fn challenge_json(challenge: Challenge) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "challenge": ChallengeResponse::from(challenge)
    }))
}

/// GET /api/challenges - escopo, organização, status, busca
pub async fn list_challenges(
    db: web::Data<MongoDB>,
    query: web::Query<ChallengeQuery>,
) -> Result<HttpResponse, AppError> {
    log::info!(
        "📋 GET /challenges - scope: {:?}, status: {:?}, search: {:?}",
        query.scope,
        query.status,
        query.search
    );

    let page = challenge_service::list(&db, &query).await?;
    Ok(HttpResponse::Ok().json(page.map(ChallengeResponse::from)))
}

/// GET /api/challenges/{id}
pub async fn get_challenge(db: web::Data<MongoDB>, path: web::Path<String>) -> Result<HttpResponse, AppError> {
    let id = parse_object_id(&path, "challenge")?;
    log::info!("🔍 GET /challenges/{}", id);

    Ok(challenge_json(challenge_service::get(&db, &id).await?))
}

/// POST /api/challenges
pub async fn create_challenge(
    claims: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    request: web::Json<CreateChallengeRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("📝 POST /challenges - user: {}, title: {}", claims.email, request.title);

    let challenge = challenge_service::create(&db, &claims, request.into_inner()).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "challenge": ChallengeResponse::from(challenge)
    })))
}

/// PUT /api/challenges/{id}
pub async fn update_challenge(
    claims: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
    request: web::Json<UpdateChallengeRequest>,
) -> Result<HttpResponse, AppError> {
    let id = parse_object_id(&path, "challenge")?;
    log::info!("✏️  PUT /challenges/{} - user: {}", id, claims.email);

    Ok(challenge_json(
        challenge_service::update(&db, &claims, &id, request.into_inner()).await?,
    ))
}

/// DELETE /api/challenges/{id}
pub async fn delete_challenge(
    claims: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = parse_object_id(&path, "challenge")?;
    log::info!("🗑️  DELETE /challenges/{} - user: {}", id, claims.email);

    challenge_service::delete(&db, &claims, &id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Challenge deleted"
    })))
}

/// POST /api/challenges/{id}/join
pub async fn join_challenge(
    claims: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = parse_object_id(&path, "challenge")?;
    log::info!("➕ POST /challenges/{}/join - user: {}", id, claims.email);

    Ok(challenge_json(challenge_service::join(&db, &claims, &id).await?))
}

/// POST /api/challenges/{id}/leave
pub async fn leave_challenge(
    claims: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = parse_object_id(&path, "challenge")?;
    log::info!("➖ POST /challenges/{}/leave - user: {}", id, claims.email);

    Ok(challenge_json(challenge_service::leave(&db, &claims, &id).await?))
}

/// POST /api/challenges/{id}/complete
pub async fn complete_challenge(
    claims: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = parse_object_id(&path, "challenge")?;
    log::info!("🏆 POST /challenges/{}/complete - user: {}", id, claims.email);

    Ok(challenge_json(challenge_service::complete(&db, &claims, &id).await?))
}

/// GET /api/challenges/{id}/progress
pub async fn challenge_progress(
    claims: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = parse_object_id(&path, "challenge")?;
    log::info!("📈 GET /challenges/{}/progress - user: {}", id, claims.email);

    let progress = challenge_service::progress(&db, &claims, &id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "progress": progress
    })))
}
