use actix_web::{web, HttpResponse};

use crate::{
    database::MongoDB,
    middleware::auth::Claims,
    models::UserResponse,
    services::auth_service::{self, AuthResponse, LoginRequest, RefreshTokenRequest, RegisterRequest},
    utils::AppError,
};

#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registration successful", body = AuthResponse),
        (status = 400, description = "Invalid request or user already exists"),
        (status = 404, description = "Organization not found")
    )
)]
pub async fn register(
    db: web::Data<MongoDB>,
    request: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("📝 POST /auth/register - email: {}, role: {}", request.email, request.role);

    let response = auth_service::register(&db, request.into_inner()).await?;
    Ok(HttpResponse::Created().json(response))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(db: web::Data<MongoDB>, request: web::Json<LoginRequest>) -> Result<HttpResponse, AppError> {
    log::info!("🔐 POST /auth/login - email: {}", request.email);

    let response = auth_service::login(&db, &request).await?;
    log::info!("✅ Login successful: {}", request.email);
    Ok(HttpResponse::Ok().json(response))
}

#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    tag = "Auth",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "New token pair", body = AuthResponse),
        (status = 401, description = "Invalid or expired refresh token")
    )
)]
pub async fn refresh_token(
    db: web::Data<MongoDB>,
    request: web::Json<RefreshTokenRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("🔄 POST /auth/refresh");

    let response = auth_service::refresh_token(&db, &request).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Missing or invalid token")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_me(claims: web::ReqData<Claims>, db: web::Data<MongoDB>) -> Result<HttpResponse, AppError> {
    log::info!("👤 GET /auth/me - user: {}", claims.email);

    let user = auth_service::get_user(&db, &claims.user_id()?).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "user": UserResponse::from(user)
    })))
}
