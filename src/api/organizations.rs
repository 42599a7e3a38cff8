use actix_web::{web, HttpResponse};

use crate::{
    database::MongoDB,
    middleware::auth::Claims,
    models::{
        CreateOrganizationRequest, Organization, OrganizationQuery, OrganizationResponse, UpdateOrganizationRequest,
    },
    services::organization_service,
    utils::{parse_object_id, AppError},
};

fn organization_json(organization: Organization) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "organization": OrganizationResponse::from(organization)
    }))
}

/// GET /api/organizations
pub async fn list_organizations(
    db: web::Data<MongoDB>,
    query: web::Query<OrganizationQuery>,
) -> Result<HttpResponse, AppError> {
    log::info!("📋 GET /organizations - type: {:?}, search: {:?}", query.org_type, query.search);

    let page = organization_service::list(&db, &query).await?;
    Ok(HttpResponse::Ok().json(page.map(OrganizationResponse::from)))
}

/// GET /api/organizations/{id}
pub async fn get_organization(db: web::Data<MongoDB>, path: web::Path<String>) -> Result<HttpResponse, AppError> {
    let id = parse_object_id(&path, "organization")?;
    log::info!("🔍 GET /organizations/{}", id);

    Ok(organization_json(organization_service::get(&db, &id).await?))
}

/// POST /api/organizations
pub async fn create_organization(
    claims: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    request: web::Json<CreateOrganizationRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("📝 POST /organizations - user: {}, name: {}", claims.email, request.name);

    let organization = organization_service::create(&db, &claims, request.into_inner()).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "organization": OrganizationResponse::from(organization)
    })))
}

/// PUT /api/organizations/{id}
pub async fn update_organization(
    claims: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
    request: web::Json<UpdateOrganizationRequest>,
) -> Result<HttpResponse, AppError> {
    let id = parse_object_id(&path, "organization")?;
    log::info!("✏️  PUT /organizations/{} - user: {}", id, claims.email);

    Ok(organization_json(
        organization_service::update(&db, &claims, &id, request.into_inner()).await?,
    ))
}

/// DELETE /api/organizations/{id}
pub async fn delete_organization(
    claims: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = parse_object_id(&path, "organization")?;
    log::info!("🗑️  DELETE /organizations/{} - user: {}", id, claims.email);

    organization_service::delete(&db, &claims, &id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Organization deleted"
    })))
}

/// POST /api/organizations/{id}/join
pub async fn join_organization(
    claims: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = parse_object_id(&path, "organization")?;
    log::info!("➕ POST /organizations/{}/join - user: {}", id, claims.email);

    Ok(organization_json(organization_service::join(&db, &claims, &id).await?))
}

/// POST /api/organizations/{id}/leave
pub async fn leave_organization(
    claims: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = parse_object_id(&path, "organization")?;
    log::info!("➖ POST /organizations/{}/leave - user: {}", id, claims.email);

    Ok(organization_json(organization_service::leave(&db, &claims, &id).await?))
}
