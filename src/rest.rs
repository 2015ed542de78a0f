use std::path::{Iter, PathBuf};

use actix_web::{http, web, HttpRequest, HttpResponse};
use log::error;
use serde::Serialize;
use serde_json::to_string;
use sqlx::SqliteConnection;

use crate::db::DbPool;
use crate::error::Result;
use crate::models::{PackageRequest, RequestType, User};

pub const BAD_REQUEST_RETURN: &str = r#"{"success": false, "message": "Bad Request"}"#;
pub const NOT_FOUND_RETURN: &str = r#"{"success": false, "message": "Not Found"}"#;
pub const INTERNAL_ERR_RESPONSE: &str = r#"{"success": false, "message": "Internal error"}"#;

macro_rules! json_response {
    ($builder:expr, $body:expr) => {
        $builder
            .insert_header((http::header::CONTENT_TYPE, "application/json"))
            .body($body)
    };
}

macro_rules! BAD_REQUEST {
    () => {
        json_response!(HttpResponse::BadRequest(), BAD_REQUEST_RETURN)
    };
}

macro_rules! NOT_FOUND {
    () => {
        json_response!(HttpResponse::NotFound(), NOT_FOUND_RETURN)
    };
}

macro_rules! INTERNAL_ERROR {
    () => {
        json_response!(HttpResponse::InternalServerError(), INTERNAL_ERR_RESPONSE)
    };
}

macro_rules! OK {
    ($r:ident) => {
        json_response!(HttpResponse::Ok(), $r)
    };
}

#[derive(Debug, Serialize)]
struct RequestSummary {
    id: i64,
    request_type: String,
    package_base_name: String,
    merge_base_name: Option<String>,
    request_ts: i64,
}

#[derive(Debug, Serialize)]
struct RequestDetail {
    id: i64,
    request_type: String,
    package_base_id: Option<i64>,
    package_base_name: String,
    merge_base_name: Option<String>,
    requester: Option<String>,
    comments: String,
    closure_comment: String,
    request_ts: i64,
    closed_ts: Option<i64>,
    closer: Option<String>,
    status: i64,
    /// `None` when the stored code has no label.
    status_label: Option<&'static str>,
}

pub async fn rest_dispatch(pool: web::Data<DbPool>, req: HttpRequest) -> HttpResponse {
    let path = match req.match_info().query("endpoint").parse::<PathBuf>() {
        Ok(path) => path,
        Err(_) => return BAD_REQUEST!(),
    };
    let mut components = path.iter();
    let result = match components.next().map(|c| c.to_string_lossy()) {
        Some(c) if c == "requests" => rest_requests(&pool).await,
        Some(c) if c == "request" => rest_request_detail(&pool, components).await,
        _ => return BAD_REQUEST!(),
    };

    result.unwrap_or_else(|e| {
        error!("API request {} failed: {}", req.path(), e);
        INTERNAL_ERROR!()
    })
}

async fn type_name(conn: &mut SqliteConnection, id: i64) -> Result<String> {
    Ok(RequestType::find(conn, id)
        .await?
        .map(|t| t.name_display())
        .unwrap_or_default())
}

async fn username(conn: &mut SqliteConnection, id: Option<i64>) -> Result<Option<String>> {
    match id {
        Some(id) => Ok(User::find(conn, id).await?.map(|u| u.username)),
        None => Ok(None),
    }
}

async fn rest_requests(pool: &DbPool) -> Result<HttpResponse> {
    let mut conn = pool.acquire().await?;
    let requests = PackageRequest::pending(&mut conn).await?;

    let mut summaries = Vec::with_capacity(requests.len());
    for request in requests {
        summaries.push(RequestSummary {
            id: request.id,
            request_type: type_name(&mut conn, request.req_type_id).await?,
            package_base_name: request.package_base_name,
            merge_base_name: request.merge_base_name,
            request_ts: request.request_ts,
        });
    }
    let result = match to_string(&summaries) {
        Ok(result) => result,
        Err(_) => return Ok(INTERNAL_ERROR!()),
    };

    Ok(OK!(result))
}

async fn rest_request_detail(pool: &DbPool, mut components: Iter<'_>) -> Result<HttpResponse> {
    let request_id = match components.next().map(|c| c.to_string_lossy().parse::<i64>()) {
        Some(Ok(id)) => id,
        _ => return Ok(BAD_REQUEST!()),
    };

    let mut conn = pool.acquire().await?;
    let request = match PackageRequest::find(&mut conn, request_id).await? {
        Some(request) => request,
        None => return Ok(NOT_FOUND!()),
    };

    let detail = RequestDetail {
        id: request.id,
        request_type: type_name(&mut conn, request.req_type_id).await?,
        package_base_id: request.package_base_id,
        requester: username(&mut conn, Some(request.users_id)).await?,
        closer: username(&mut conn, request.closed_uid).await?,
        status: request.status,
        status_label: request.status_display().ok(),
        package_base_name: request.package_base_name,
        merge_base_name: request.merge_base_name,
        comments: request.comments,
        closure_comment: request.closure_comment,
        request_ts: request.request_ts,
        closed_ts: request.closed_ts,
    };
    let result = match to_string(&detail) {
        Ok(result) => result,
        Err(_) => return Ok(INTERNAL_ERROR!()),
    };

    Ok(OK!(result))
}
