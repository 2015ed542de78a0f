use actix_identity::IdentityMiddleware;
use actix_session::storage::CookieSessionStore;
use actix_session::SessionMiddleware;
use actix_web::body::MessageBody;
use actix_web::cookie::Key;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::middleware::{Logger, NormalizePath, TrailingSlash};
use actix_web::{web, App};

pub mod assets;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod rest;
pub mod routes;
pub mod security;
pub mod templates;
pub mod testing;

use config::Config;
use db::DbPool;
use security::SecurityHeaders;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "AURSID";

/// Assemble the application: shared state, middleware and every route.
pub fn build_app(
    pool: DbPool,
    config: Config,
    session_key: Key,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let secure_cookies = config.secure_cookies;

    App::new()
        .app_data(web::Data::new(pool))
        .app_data(web::Data::new(config))
        .wrap(IdentityMiddleware::default())
        .wrap(
            SessionMiddleware::builder(CookieSessionStore::default(), session_key)
                .cookie_name(SESSION_COOKIE.to_owned())
                .cookie_secure(secure_cookies)
                .build(),
        )
        .wrap(SecurityHeaders)
        .wrap(Logger::default())
        .wrap(NormalizePath::new(TrailingSlash::Trim))
        // pages
        .service(routes::index)
        .service(routes::language)
        .service(routes::raise_five_three)
        .service(auth::login_form)
        .service(auth::form_login)
        .service(auth::logout)
        // static files
        .service(assets::favicon)
        .service(assets::static_favicon)
        .service(assets::style_css)
        // RESTful APIs
        .route("/api/{endpoint:.*}", web::get().to(rest::rest_dispatch))
        .default_service(web::route().to(routes::not_found))
}
