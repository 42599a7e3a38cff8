use actix_web::{web, HttpResponse};

use crate::{
    database::MongoDB,
    middleware::auth::Claims,
    models::{UserActionQuery, UserActionResponse},
    services::user_action_service,
    utils::{parse_object_id, AppError},
};

/// GET /api/user-actions - histórico do usuário autenticado
pub async fn list_user_actions(
    claims: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    query: web::Query<UserActionQuery>,
) -> Result<HttpResponse, AppError> {
    log::info!("📋 GET /user-actions - user: {}", claims.email);

    let page = user_action_service::list(&db, &claims, &query).await?;
    Ok(HttpResponse::Ok().json(page.map(UserActionResponse::from)))
}

/// DELETE /api/user-actions/{id}
pub async fn delete_user_action(
    claims: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = parse_object_id(&path, "user action")?;
    log::info!("🗑️  DELETE /user-actions/{} - user: {}", id, claims.email);

    user_action_service::delete(&db, &claims, &id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "User action deleted"
    })))
}
