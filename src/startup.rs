use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::configuration::Settings;
use crate::directory::UserDirectory;
use crate::error::{AppError, ValidationError};
use crate::logger::LoggerMiddleware;
use crate::middleware::JwtMiddleware;
use crate::routes::{api_1, api_2, edit_user, get_user, health_check, list_users, signin, signup};
use crate::service::UserService;

pub fn run(
    listener: TcpListener,
    directory: Arc<dyn UserDirectory>,
    settings: Settings,
) -> Result<Server, std::io::Error> {
    let service = web::Data::new(UserService::new(
        directory,
        settings.jwt.clone(),
        settings.application.password_hash_cost,
    ));
    let jwt_config = settings.jwt;
    let expose_management_routes = settings.application.expose_management_routes;

    if expose_management_routes {
        tracing::info!("Management routes (edit, list) are enabled");
    }

    let server = HttpServer::new(move || {
        // Malformed bodies and query strings share the error envelope
        let json_config = web::JsonConfig::default().error_handler(|err, _req| {
            tracing::debug!("Rejected request body: {}", err);
            AppError::from(ValidationError::InvalidFormat("request body".to_string())).into()
        });
        let query_config = web::QueryConfig::default().error_handler(|err, _req| {
            tracing::debug!("Rejected query string: {}", err);
            AppError::from(ValidationError::InvalidFormat("query string".to_string())).into()
        });

        let mut users = web::scope("/users").wrap(JwtMiddleware::new(jwt_config.clone()));
        if expose_management_routes {
            users = users
                .route("", web::get().to(list_users))
                .route("/edit", web::patch().to(edit_user));
        }
        users = users.route("/{user_id}", web::get().to(get_user));

        App::new()
            .wrap(LoggerMiddleware)
            .app_data(service.clone())
            .app_data(json_config)
            .app_data(query_config)
            // Public routes
            .route("/health_check", web::get().to(health_check))
            .route("/api-1", web::get().to(api_1))
            .route("/api-2", web::get().to(api_2))
            .route("/users/signup", web::post().to(signup))
            .route("/users/signin", web::post().to(signin))
            // Authenticated routes
            .service(users)
    })
    .listen(listener)?
    .run();

    Ok(server)
}
