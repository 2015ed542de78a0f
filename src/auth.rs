use actix_identity::Identity;
use actix_web::http::{header, StatusCode};
use actix_web::{get, post, web, HttpMessage, HttpRequest, HttpResponse};
use log::{info, warn};
use serde::Deserialize;
use sqlx::SqliteConnection;
use yarte::Template;

use crate::config::Config;
use crate::db::{self, DbPool};
use crate::error::{Error, Result, WebError};
use crate::models::{Session, User};
use crate::routes::is_local_path;
use crate::security::CspNonce;
use crate::templates::{self, make_context, LoginTemplate};

#[derive(Deserialize)]
pub struct LoginForm {
    user: String,
    passwd: String,
    next: Option<String>,
}

/// Check `password` for `username` and open a session.
///
/// Returns the new session ID, or `None` when the user does not exist, is
/// suspended, or the password does not match.
pub async fn login(
    conn: &mut SqliteConnection,
    username: &str,
    password: &str,
) -> Result<Option<String>> {
    let mut user = match User::find_by_username(conn, username).await? {
        Some(user) => user,
        None => return Ok(None),
    };
    if user.suspended {
        warn!("Suspended user {} attempted to log in", user.username);
        return Ok(None);
    }

    let hash_owner = user.clone();
    let password = password.to_owned();
    let is_valid = web::block(move || hash_owner.verify_password(&password))
        .await
        .map_err(|_| Error::Blocking)??;
    if !is_valid {
        return Ok(None);
    }

    let session = Session::create(conn, user.id).await?;
    user.touch_last_login(conn).await?;
    info!("User {} logged in", user.username);

    Ok(Some(session.session_id))
}

/// Resolve a session ID to its user, expiring idle sessions.
pub async fn authenticate(
    conn: &mut SqliteConnection,
    session_id: &str,
    timeout: i64,
) -> Result<Option<User>> {
    let mut session = match Session::find(conn, session_id).await? {
        Some(session) => session,
        None => return Ok(None),
    };
    if session.is_expired(timeout, db::now()) {
        Session::delete(conn, session_id).await?;
        return Ok(None);
    }

    let user = User::find(conn, session.users_id).await?;
    match user {
        Some(user) if !user.suspended => {
            session.touch(conn).await?;
            Ok(Some(user))
        }
        _ => Ok(None),
    }
}

/// The user behind the request's identity cookie, if any.
pub async fn current_user(
    conn: &mut SqliteConnection,
    identity: Option<&Identity>,
    config: &Config,
) -> Result<Option<User>> {
    match identity.and_then(|id| id.id().ok()) {
        Some(session_id) => authenticate(conn, &session_id, config.login_timeout).await,
        None => Ok(None),
    }
}

fn login_page(
    status: StatusCode,
    config: &Config,
    nonce: &CspNonce,
    msg: &str,
    next: &str,
) -> std::result::Result<HttpResponse, WebError> {
    let template = LoginTemplate {
        ctx: make_context(config, "Login", nonce, None),
        msg: msg.to_owned(),
        next: next.to_owned(),
    };
    templates::html(status, template.call())
}

#[get("/login")]
pub async fn login_form(
    identity: Option<Identity>,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    nonce: CspNonce,
) -> std::result::Result<HttpResponse, WebError> {
    let mut conn = pool.acquire().await?;
    if current_user(&mut conn, identity.as_ref(), &config).await?.is_some() {
        return Ok(HttpResponse::SeeOther()
            .insert_header((header::LOCATION, "/"))
            .finish());
    }
    // the cookie may outlive its session row
    if let Some(identity) = identity {
        identity.logout();
    }

    login_page(StatusCode::OK, &config, &nonce, "", "/")
}

#[post("/login")]
pub async fn form_login(
    req: HttpRequest,
    form: web::Form<LoginForm>,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    nonce: CspNonce,
) -> std::result::Result<HttpResponse, WebError> {
    let next = form
        .next
        .as_deref()
        .filter(|next| is_local_path(next))
        .unwrap_or("/")
        .to_owned();

    let mut conn = pool.acquire().await?;
    let session_id = login(&mut conn, &form.user, &form.passwd).await?;
    match session_id {
        Some(session_id) => {
            Identity::login(&req.extensions(), session_id)
                .map_err(|e| WebError::Session(e.to_string()))?;
            Ok(HttpResponse::SeeOther()
                .insert_header((header::LOCATION, next))
                .finish())
        }
        None => login_page(
            StatusCode::UNAUTHORIZED,
            &config,
            &nonce,
            "Bad username or password.",
            &next,
        ),
    }
}

#[post("/logout")]
pub async fn logout(
    identity: Option<Identity>,
    pool: web::Data<DbPool>,
) -> std::result::Result<HttpResponse, WebError> {
    if let Some(identity) = identity {
        if let Ok(session_id) = identity.id() {
            let mut conn = pool.acquire().await?;
            Session::delete(&mut conn, &session_id).await?;
        }
        identity.logout();
    }

    Ok(HttpResponse::SeeOther()
        .insert_header((header::LOCATION, "/"))
        .finish())
}
