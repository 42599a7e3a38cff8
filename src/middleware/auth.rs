use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::Method,
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};

use crate::services::auth_service::{self, TokenType};
use crate::utils::AppError;

pub use crate::services::auth_service::Claims;

/// Validates the `Authorization: Bearer <jwt>` header and stores the [`Claims`]
/// in the request extensions for `web::ReqData<Claims>`.
///
/// With `public_reads`, GET/HEAD requests go through without a token (claims are
/// still attached when a valid one is sent) and every other method requires one.
#[derive(Debug, Clone, Copy)]
pub struct AuthMiddleware {
    public_reads: bool,
}

impl AuthMiddleware {
    pub fn required() -> Self {
        Self { public_reads: false }
    }

    pub fn public_reads() -> Self {
        Self { public_reads: true }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService { service, public_reads: self.public_reads }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
    public_reads: bool,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let anonymous_ok = self.public_reads && matches!(*req.method(), Method::GET | Method::HEAD);

        match authenticate(&req) {
            Ok(claims) => {
                req.extensions_mut().insert(claims);
            }
            Err(_) if anonymous_ok => {}
            Err(e) => return Box::pin(async move { Err(Error::from(e)) }),
        }

        let fut = self.service.call(req);
        Box::pin(async move { fut.await })
    }
}

fn authenticate(req: &ServiceRequest) -> Result<Claims, AppError> {
    let header = req
        .headers()
        .get(actix_web::http::header::AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("Missing authorization token".into()))?;

    let token = header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Invalid token format".into()))?;

    auth_service::verify_token(token, TokenType::Access)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, User};
    use actix_web::{http::StatusCode, test, web, App, HttpResponse};
    use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};

    async fn whoami(claims: web::ReqData<Claims>) -> HttpResponse {
        HttpResponse::Ok().body(claims.sub.clone())
    }

    fn token_for(id: ObjectId) -> String {
        let now = BsonDateTime::now();
        let user = User {
            id: Some(id),
            name: "Rui".into(),
            email: "rui@example.com".into(),
            password: String::new(),
            role: Role::Public,
            organization: None,
            avatar: None,
            bio: None,
            location: None,
            total_emission_saved: 0.0,
            total_points: 0,
            actions_completed: 0,
            challenges_joined: 0,
            challenges_completed: 0,
            created_at: now,
            updated_at: now,
        };
        auth_service::generate_jwt(&user).unwrap()
    }

    #[actix_web::test]
    async fn test_missing_token_is_401() {
        let app = test::init_service(
            App::new().service(web::scope("/api/me").wrap(AuthMiddleware::required()).route("", web::get().to(whoami))),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/me").to_request();
        let err = test::try_call_service(&app, req).await.unwrap_err();
        assert_eq!(err.as_response_error().status_code(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_malformed_header_is_401() {
        let app = test::init_service(
            App::new().service(web::scope("/api/me").wrap(AuthMiddleware::required()).route("", web::get().to(whoami))),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/me")
            .insert_header(("Authorization", "Token abc"))
            .to_request();
        let err = test::try_call_service(&app, req).await.unwrap_err();
        assert_eq!(err.as_response_error().status_code(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_valid_token_reaches_handler() {
        let app = test::init_service(
            App::new().service(web::scope("/api/me").wrap(AuthMiddleware::required()).route("", web::get().to(whoami))),
        )
        .await;

        let id = ObjectId::new();
        let req = test::TestRequest::get()
            .uri("/api/me")
            .insert_header(("Authorization", format!("Bearer {}", token_for(id))))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body = test::read_body(resp).await;
        assert_eq!(body, id.to_hex().as_bytes());
    }

    #[actix_web::test]
    async fn test_public_reads_only_guard_writes() {
        let app = test::init_service(
            App::new().service(
                web::scope("/api/items")
                    .wrap(AuthMiddleware::public_reads())
                    .route("", web::get().to(|| async { HttpResponse::Ok().finish() }))
                    .route("", web::post().to(whoami)),
            ),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/items").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::post().uri("/api/items").to_request();
        let err = test::try_call_service(&app, req).await.unwrap_err();
        assert_eq!(err.as_response_error().status_code(), StatusCode::UNAUTHORIZED);

        let id = ObjectId::new();
        let req = test::TestRequest::post()
            .uri("/api/items")
            .insert_header(("Authorization", format!("Bearer {}", token_for(id))))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
