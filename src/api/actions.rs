use actix_web::{web, HttpResponse};

use crate::{
    database::MongoDB,
    middleware::auth::Claims,
    models::{
        ActionQuery, ActionResponse, CreateActionRequest, LogActionRequest, UpdateActionRequest, UserActionResponse,
    },
    services::action_service,
    utils::{parse_object_id, AppError},
};

/// GET /api/actions - Lista ações (categoria, busca, paginação)
#[utoipa::path(
    get,
    path = "/api/actions",
    tag = "Actions",
    params(
        ("category" = Option<String>, Query, description = "transport, energy, food, waste, water, shopping, other"),
        ("search" = Option<String>, Query, description = "Case-insensitive match on title and description"),
        ("page" = Option<u64>, Query, description = "Page number, default 1"),
        ("limit" = Option<u64>, Query, description = "Page size, default 10, max 100")
    ),
    responses(
        (status = 200, description = "Paginated actions")
    )
)]
pub async fn list_actions(db: web::Data<MongoDB>, query: web::Query<ActionQuery>) -> Result<HttpResponse, AppError> {
    log::info!("📋 GET /actions - category: {:?}, search: {:?}", query.category, query.search);

    let page = action_service::list(&db, &query).await?;
    Ok(HttpResponse::Ok().json(page.map(ActionResponse::from)))
}

/// GET /api/actions/{id}
pub async fn get_action(db: web::Data<MongoDB>, path: web::Path<String>) -> Result<HttpResponse, AppError> {
    let id = parse_object_id(&path, "action")?;
    log::info!("🔍 GET /actions/{}", id);

    let action = action_service::get(&db, &id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "action": ActionResponse::from(action)
    })))
}

/// POST /api/actions
#[utoipa::path(
    post,
    path = "/api/actions",
    tag = "Actions",
    request_body = CreateActionRequest,
    responses(
        (status = 201, description = "Action created"),
        (status = 400, description = "Missing or invalid fields"),
        (status = 401, description = "Missing or invalid token")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_action(
    claims: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    request: web::Json<CreateActionRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("📝 POST /actions - user: {}, title: {}", claims.email, request.title);

    let action = action_service::create(&db, &claims, request.into_inner()).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "action": ActionResponse::from(action)
    })))
}

/// PUT /api/actions/{id}
pub async fn update_action(
    claims: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
    request: web::Json<UpdateActionRequest>,
) -> Result<HttpResponse, AppError> {
    let id = parse_object_id(&path, "action")?;
    log::info!("✏️  PUT /actions/{} - user: {}", id, claims.email);

    let action = action_service::update(&db, &claims, &id, request.into_inner()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "action": ActionResponse::from(action)
    })))
}

/// DELETE /api/actions/{id}
pub async fn delete_action(
    claims: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = parse_object_id(&path, "action")?;
    log::info!("🗑️  DELETE /actions/{} - user: {}", id, claims.email);

    action_service::delete(&db, &claims, &id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Action deleted"
    })))
}

/// POST /api/actions/{id}/log - registra a ação para hoje (uma vez por dia)
#[utoipa::path(
    post,
    path = "/api/actions/{id}/log",
    tag = "Actions",
    params(("id" = String, Path, description = "Action id")),
    request_body(content = LogActionRequest, description = "Optional notes"),
    responses(
        (status = 201, description = "Action logged for today"),
        (status = 400, description = "Already logged today or invalid id"),
        (status = 404, description = "Action not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn log_action(
    claims: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
    request: Option<web::Json<LogActionRequest>>,
) -> Result<HttpResponse, AppError> {
    let id = parse_object_id(&path, "action")?;
    log::info!("🌱 POST /actions/{}/log - user: {}", id, claims.email);

    let request = request.map(web::Json::into_inner).unwrap_or_default();
    let entry = action_service::log_action(&db, &claims, &id, request).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "userAction": UserActionResponse::from(entry)
    })))
}
