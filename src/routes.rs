use actix_identity::Identity;
use actix_web::cookie::Cookie;
use actix_web::http::{header, StatusCode};
use actix_web::{get, post, web, HttpRequest, HttpResponse};
use serde::Deserialize;
use yarte::Template;

use crate::auth;
use crate::config::Config;
use crate::db::DbPool;
use crate::error::WebError;
use crate::models::{PackageBase, PackageRequest, User};
use crate::security::CspNonce;
use crate::templates::{
    self, make_context, IndexTemplate, NotFoundTemplate, RecentUpdate,
    ServiceUnavailableTemplate, Statistics,
};

pub const LANGUAGE_COOKIE: &str = "AURLANG";
const RECENT_UPDATES: i64 = 10;

/// True for a path on this site: `/...` but not the protocol-relative `//host`.
pub fn is_local_path(target: &str) -> bool {
    target.starts_with('/') && !target.starts_with("//") && !target.starts_with("/\\")
}

/// `/?id=foo&k=v` is shorthand for `/foo?k=v`; the remaining parameters
/// keep their order. The id is percent-encoded into a single path segment.
fn id_redirect(query_string: &str) -> Result<Option<String>, WebError> {
    let params: Vec<(String, String)> = serde_urlencoded::from_str(query_string)
        .map_err(|_| WebError::BadRequest("Malformed query string.".to_owned()))?;
    let id = match params.iter().find(|(key, _)| key == "id") {
        Some((_, id)) => id.clone(),
        None => return Ok(None),
    };
    if id.is_empty() {
        return Err(WebError::BadRequest("Invalid 'id' parameter.".to_owned()));
    }
    let id = urlencoding::encode(&id);

    let rest: Vec<&(String, String)> = params.iter().filter(|(key, _)| key != "id").collect();
    if rest.is_empty() {
        return Ok(Some(format!("/{}", id)));
    }
    let rest = serde_urlencoded::to_string(rest)
        .map_err(|_| WebError::BadRequest("Malformed query string.".to_owned()))?;
    Ok(Some(format!("/{}?{}", id, rest)))
}

#[get("/")]
pub async fn index(
    req: HttpRequest,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    identity: Option<Identity>,
    nonce: CspNonce,
) -> Result<HttpResponse, WebError> {
    if let Some(location) = id_redirect(req.query_string())? {
        return Ok(HttpResponse::TemporaryRedirect()
            .insert_header((header::LOCATION, location))
            .finish());
    }

    let mut conn = pool.acquire().await?;
    let user = auth::current_user(&mut conn, identity.as_ref(), &config).await?;
    let stats = Statistics {
        package_count: PackageBase::count(&mut conn).await?,
        orphan_count: PackageBase::count_orphans(&mut conn).await?,
        user_count: User::count(&mut conn).await?,
        pending_request_count: PackageRequest::count_pending(&mut conn).await?,
    };
    let recent_updates = PackageBase::recent_updates(&mut conn, RECENT_UPDATES)
        .await?
        .iter()
        .map(RecentUpdate::from)
        .collect();

    let template = IndexTemplate {
        ctx: make_context(&config, "Home", &nonce, user.as_ref()),
        stats,
        recent_updates,
    };
    templates::html(StatusCode::OK, template.call())
}

#[derive(Deserialize)]
pub struct LanguageForm {
    set_lang: String,
    next: String,
    q: Option<String>,
}

#[post("/language")]
pub async fn language(
    form: web::Form<LanguageForm>,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    identity: Option<Identity>,
) -> Result<HttpResponse, WebError> {
    let LanguageForm { set_lang, next, q } = form.into_inner();
    if !is_local_path(&next) {
        return Err(WebError::BadRequest("Invalid 'next' parameter.".to_owned()));
    }

    let mut conn = pool.acquire().await?;
    if let Some(mut user) = auth::current_user(&mut conn, identity.as_ref(), &config).await? {
        user.set_lang_preference(&mut conn, &set_lang).await?;
    }

    let location = match q.as_deref() {
        Some(q) if !q.is_empty() => format!("{}?{}", next, q),
        _ => next,
    };
    let cookie = Cookie::build(LANGUAGE_COOKIE, set_lang)
        .path("/")
        .http_only(true)
        .secure(config.secure_cookies)
        .finish();

    Ok(HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .cookie(cookie)
        .finish())
}

/// Internal fault path, answers 503.
#[get("/raisefivethree")]
pub async fn raise_five_three(
    config: web::Data<Config>,
    nonce: CspNonce,
) -> Result<HttpResponse, WebError> {
    let template = ServiceUnavailableTemplate {
        ctx: make_context(&config, "Service Unavailable", &nonce, None),
    };
    templates::html(StatusCode::SERVICE_UNAVAILABLE, template.call())
}

pub async fn not_found(
    config: web::Data<Config>,
    nonce: CspNonce,
) -> Result<HttpResponse, WebError> {
    let template = NotFoundTemplate {
        ctx: make_context(&config, "Page Not Found", &nonce, None),
    };
    templates::html(StatusCode::NOT_FOUND, template.call())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_paths() {
        assert!(is_local_path("/"));
        assert!(is_local_path("/packages?K=foo"));
        assert!(!is_local_path("https://evil.net"));
        assert!(!is_local_path("//evil.net/"));
        assert!(!is_local_path("/\\evil.net"));
        assert!(!is_local_path(""));
    }

    #[test]
    fn test_id_redirect() {
        assert_eq!(
            id_redirect("id=test&key=value&key2=value2").unwrap(),
            Some("/test?key=value&key2=value2".to_owned())
        );
        assert_eq!(id_redirect("key=value&id=test").unwrap(), Some("/test?key=value".to_owned()));
        assert_eq!(id_redirect("id=test").unwrap(), Some("/test".to_owned()));
        assert_eq!(id_redirect("").unwrap(), None);
        assert_eq!(id_redirect("key=value").unwrap(), None);
        assert!(id_redirect("id=").is_err());
    }

    #[test]
    fn test_id_redirect_encodes_id() {
        assert_eq!(id_redirect("id=%C3%BC").unwrap(), Some("/%C3%BC".to_owned()));
        assert_eq!(
            id_redirect("id=a%2Fb&k=v").unwrap(),
            Some("/a%2Fb?k=v".to_owned())
        );
        assert_eq!(id_redirect("id=%2F%2Fevil.net").unwrap(), Some("/%2F%2Fevil.net".to_owned()));
    }
}
