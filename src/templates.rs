use actix_web::http::{header, StatusCode};
use actix_web::HttpResponse;
use yarte::Template;

use crate::config::Config;
use crate::error::WebError;
use crate::models::{PackageBase, User};
use crate::security::CspNonce;

/// Length of the commit hash shown in the footer.
pub const SHORT_COMMIT_LEN: usize = 7;

/// Values every page template needs.
#[derive(Debug, Clone)]
pub struct PageContext {
    pub title: String,
    pub nonce: String,
    pub language: String,
    pub username: Option<String>,
    pub commit_hash: Option<String>,
    pub commit_url: Option<String>,
}

impl PageContext {
    pub fn is_authenticated(&self) -> bool {
        self.username.is_some()
    }

    pub fn username(&self) -> &str {
        self.username.as_deref().unwrap_or_default()
    }

    pub fn has_commit(&self) -> bool {
        self.commit_hash.is_some()
    }

    pub fn short_commit(&self) -> &str {
        self.commit_hash.as_deref().unwrap_or_default()
    }

    pub fn commit_link(&self) -> &str {
        self.commit_url.as_deref().unwrap_or_default()
    }
}

pub fn make_context(
    config: &Config,
    title: &str,
    nonce: &CspNonce,
    user: Option<&User>,
) -> PageContext {
    let commit_hash = config.commit_hash.as_deref().map(|hash| {
        hash.char_indices()
            .nth(SHORT_COMMIT_LEN)
            .map_or(hash, |(end, _)| &hash[..end])
            .to_owned()
    });
    let commit_url = commit_hash
        .as_deref()
        .map(|hash| config.commit_url.replacen("%s", hash, 1));

    PageContext {
        title: title.to_owned(),
        nonce: nonce.as_str().to_owned(),
        language: user.map_or_else(|| "en".to_owned(), |u| u.lang_preference.clone()),
        username: user.map(|u| u.username.clone()),
        commit_hash,
        commit_url,
    }
}

#[derive(Debug, Clone, Default)]
pub struct Statistics {
    pub package_count: i64,
    pub orphan_count: i64,
    pub user_count: i64,
    pub pending_request_count: i64,
}

/// A row of the front page's recent updates list.
#[derive(Debug, Clone)]
pub struct RecentUpdate {
    pub name: String,
    pub modified: String,
}

impl From<&PackageBase> for RecentUpdate {
    fn from(base: &PackageBase) -> Self {
        let modified = chrono::DateTime::<chrono::Utc>::from_timestamp(base.modified_ts, 0)
            .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        RecentUpdate {
            name: base.name.clone(),
            modified,
        }
    }
}

#[derive(Template)]
#[template(path = "index.hbs")]
pub struct IndexTemplate {
    pub ctx: PageContext,
    pub stats: Statistics,
    pub recent_updates: Vec<RecentUpdate>,
}

#[derive(Template)]
#[template(path = "login.hbs")]
pub struct LoginTemplate {
    pub ctx: PageContext,
    pub msg: String,
    pub next: String,
}

#[derive(Template)]
#[template(path = "errors/404.hbs")]
pub struct NotFoundTemplate {
    pub ctx: PageContext,
}

#[derive(Template)]
#[template(path = "errors/503.hbs")]
pub struct ServiceUnavailableTemplate {
    pub ctx: PageContext,
}

/// Wrap a rendered template in an HTML response.
pub fn html(
    status: StatusCode,
    rendered: Result<String, std::fmt::Error>,
) -> Result<HttpResponse, WebError> {
    let body = rendered?;
    Ok(HttpResponse::build(status)
        .insert_header((header::CONTENT_TYPE, "text/html; charset=utf-8"))
        .body(body))
}
