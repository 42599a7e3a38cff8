mod api;
mod config;
mod database;
mod middleware;
mod models;
mod seeds;
mod services;
mod utils;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::middleware::auth::AuthMiddleware;
use crate::utils::AppError;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = match config::AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("❌ Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    log::info!("🚀 Starting TerraNest API...");

    let db = match database::MongoDB::new(&config.mongo_uri).await {
        Ok(db) => db,
        Err(e) => {
            log::error!("❌ Failed to connect to MongoDB: {}", e);
            std::process::exit(1);
        }
    };

    log::info!("✅ MongoDB connected successfully");

    // 🌱 Seed default eco-actions
    seeds::actions_seed::seed_default_actions(&db).await;

    let db_data = web::Data::new(db);
    let bind_addr = config.bind_addr();
    let frontend_url = config.frontend_url.clone();

    log::info!("🌐 Server starting on {}", bind_addr);
    log::info!("📚 Swagger UI available at: http://{}/swagger-ui/", bind_addr);
    log::info!("📄 OpenAPI spec at: http://{}/api-docs/openapi.json", bind_addr);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&frontend_url)
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                actix_web::http::header::AUTHORIZATION,
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::ACCEPT,
            ])
            .expose_headers(vec![actix_web::http::header::CONTENT_TYPE])
            .supports_credentials()
            .max_age(3600);

        let openapi = api::swagger::ApiDoc::openapi();

        App::new()
            .app_data(db_data.clone())
            // Malformed bodies, queries and paths answer with the uniform error body
            .app_data(web::JsonConfig::default().error_handler(|err, _req| {
                AppError::Validation(err.to_string()).into()
            }))
            .app_data(web::QueryConfig::default().error_handler(|err, _req| {
                AppError::Validation(err.to_string()).into()
            }))
            .app_data(web::PathConfig::default().error_handler(|err, _req| {
                AppError::Validation(err.to_string()).into()
            }))
            .wrap(cors)
            .wrap(middleware::SecurityHeaders)
            .wrap(Logger::default())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi)
            )
            .route("/health", web::get().to(api::health::health_check))
            .configure(routes)
    })
    .bind(bind_addr)?
    .run()
    .await
}

/// Route table. Scopes with `public_reads` let GET through anonymously and
/// require a token for every write; `required` resources need one for reads too.
fn routes(cfg: &mut web::ServiceConfig) {
    cfg
        // Auth endpoints
        .service(
            web::scope("/api/auth")
                .route("/register", web::post().to(api::auth::register))
                .route("/login", web::post().to(api::auth::login))
                .route("/refresh", web::post().to(api::auth::refresh_token))
                .service(
                    web::resource("/me")
                        .wrap(AuthMiddleware::required())
                        .route(web::get().to(api::auth::get_me))
                )
        )

        // Users: leaderboard and profile (fixed segments before /{id})
        .service(
            web::scope("/api/users")
                .wrap(AuthMiddleware::public_reads())
                .route("/leaderboard", web::get().to(api::users::leaderboard))
                .service(
                    web::resource("/dashboard")
                        .wrap(AuthMiddleware::required())
                        .route(web::get().to(api::users::dashboard))
                )
                .service(
                    web::resource("/stats")
                        .wrap(AuthMiddleware::required())
                        .route(web::get().to(api::users::user_stats))
                )
                .route("/profile", web::put().to(api::users::update_profile))
                .route("/{id}", web::get().to(api::users::get_user))
                .route("/{id}", web::delete().to(api::users::delete_user))
        )

        // Actions: catalog + daily log
        .service(
            web::scope("/api/actions")
                .wrap(AuthMiddleware::public_reads())
                .route("", web::get().to(api::actions::list_actions))
                .route("", web::post().to(api::actions::create_action))
                .route("/{id}", web::get().to(api::actions::get_action))
                .route("/{id}", web::put().to(api::actions::update_action))
                .route("/{id}", web::delete().to(api::actions::delete_action))
                .route("/{id}/log", web::post().to(api::actions::log_action))
        )

        // User actions: personal history (always authenticated)
        .service(
            web::scope("/api/user-actions")
                .wrap(AuthMiddleware::required())
                .route("", web::get().to(api::user_actions::list_user_actions))
                .route("/{id}", web::delete().to(api::user_actions::delete_user_action))
        )

        .service(
            web::scope("/api/organizations")
                .wrap(AuthMiddleware::public_reads())
                .route("", web::get().to(api::organizations::list_organizations))
                .route("", web::post().to(api::organizations::create_organization))
                .route("/{id}", web::get().to(api::organizations::get_organization))
                .route("/{id}", web::put().to(api::organizations::update_organization))
                .route("/{id}", web::delete().to(api::organizations::delete_organization))
                .route("/{id}/join", web::post().to(api::organizations::join_organization))
                .route("/{id}/leave", web::post().to(api::organizations::leave_organization))
        )

        .service(
            web::scope("/api/communities")
                .wrap(AuthMiddleware::public_reads())
                .route("", web::get().to(api::communities::list_communities))
                .route("", web::post().to(api::communities::create_community))
                .route("/{id}", web::get().to(api::communities::get_community))
                .route("/{id}", web::put().to(api::communities::update_community))
                .route("/{id}", web::delete().to(api::communities::delete_community))
                .route("/{id}/join", web::post().to(api::communities::join_community))
                .route("/{id}/leave", web::post().to(api::communities::leave_community))
        )

        .service(
            web::scope("/api/posts")
                .wrap(AuthMiddleware::public_reads())
                .route("", web::get().to(api::posts::list_posts))
                .route("", web::post().to(api::posts::create_post))
                .route("/{id}", web::get().to(api::posts::get_post))
                .route("/{id}", web::put().to(api::posts::update_post))
                .route("/{id}", web::delete().to(api::posts::delete_post))
                .route("/{id}/like", web::post().to(api::posts::like_post))
                .route("/{id}/comments", web::post().to(api::posts::add_comment))
                .route("/{id}/comments/{comment_id}", web::delete().to(api::posts::delete_comment))
        )

        .service(
            web::scope("/api/challenges")
                .wrap(AuthMiddleware::public_reads())
                .route("", web::get().to(api::challenges::list_challenges))
                .route("", web::post().to(api::challenges::create_challenge))
                .route("/{id}", web::get().to(api::challenges::get_challenge))
                .route("/{id}", web::put().to(api::challenges::update_challenge))
                .route("/{id}", web::delete().to(api::challenges::delete_challenge))
                .route("/{id}/join", web::post().to(api::challenges::join_challenge))
                .route("/{id}/leave", web::post().to(api::challenges::leave_challenge))
                .route("/{id}/complete", web::post().to(api::challenges::complete_challenge))
                .service(
                    web::resource("/{id}/progress")
                        .wrap(AuthMiddleware::required())
                        .route(web::get().to(api::challenges::challenge_progress))
                )
        );
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test};

    #[actix_web::test]
    async fn test_protected_reads_require_token() {
        // Middleware rejects before any handler touches the database
        let app = test::init_service(App::new().configure(routes)).await;

        for uri in ["/api/auth/me", "/api/users/dashboard", "/api/users/stats", "/api/user-actions"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let err = test::try_call_service(&app, req).await.unwrap_err();
            assert_eq!(err.as_response_error().status_code(), StatusCode::UNAUTHORIZED, "{}", uri);
        }
    }

    #[actix_web::test]
    async fn test_writes_require_token() {
        let app = test::init_service(App::new().configure(routes)).await;

        let req = test::TestRequest::post()
            .uri("/api/actions")
            .set_json(serde_json::json!({ "title": "x" }))
            .to_request();
        let err = test::try_call_service(&app, req).await.unwrap_err();
        assert_eq!(err.as_response_error().status_code(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::delete()
            .uri("/api/posts/507f1f77bcf86cd799439011")
            .to_request();
        let err = test::try_call_service(&app, req).await.unwrap_err();
        assert_eq!(err.as_response_error().status_code(), StatusCode::UNAUTHORIZED);
    }
}
