use actix_web::cookie::{Cookie, Key};
use actix_web::dev::ServiceResponse;
use actix_web::http::{header, StatusCode};
use actix_web::test;
use regex::Regex;

use aurweb::config::Config;
use aurweb::db::DbPool;
use aurweb::models::{
    NewPackageBase, NewPackageRequest, PackageBase, PackageRequest, RequestType, User, DELETION_ID,
};
use aurweb::testing::{make_user, memory_pool, TEST_PASSWORD};
use aurweb::{build_app, SESSION_COOKIE};

fn header_str<B>(resp: &ServiceResponse<B>, name: header::HeaderName) -> String {
    resp.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned()
}

async fn setup() -> DbPool {
    memory_pool().await.unwrap()
}

#[actix_web::test]
async fn test_index() {
    let app = test::init_service(build_app(setup().await, Config::default(), Key::generate())).await;
    let req = test::TestRequest::get().uri("/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_index_shows_recent_updates() {
    let pool = setup().await;
    {
        let mut conn = pool.acquire().await.unwrap();
        let user = make_user(&mut conn, "test").await.unwrap();
        PackageBase::create(&mut conn, NewPackageBase::named("yay-bin").maintainer(&user))
            .await
            .unwrap();
    }
    let app = test::init_service(build_app(pool, Config::default(), Key::generate())).await;

    let req = test::TestRequest::get().uri("/").to_request();
    let body = test::call_and_read_body(&app, req).await;
    let body = String::from_utf8(body.to_vec()).unwrap();
    assert!(body.contains("yay-bin"));
}

#[actix_web::test]
async fn test_security_headers() {
    let app = test::init_service(build_app(setup().await, Config::default(), Key::generate())).await;
    let req = test::TestRequest::get().uri("/").to_request();
    let resp = test::call_service(&app, req).await;

    assert!(!header_str(&resp, header::CONTENT_SECURITY_POLICY).is_empty());
    assert_eq!(header_str(&resp, header::X_CONTENT_TYPE_OPTIONS), "nosniff");
    assert_eq!(header_str(&resp, header::REFERRER_POLICY), "same-origin");
    assert_eq!(header_str(&resp, header::X_FRAME_OPTIONS), "SAMEORIGIN");
}

#[actix_web::test]
async fn test_security_headers_on_errors() {
    let app = test::init_service(build_app(setup().await, Config::default(), Key::generate())).await;
    let req = test::TestRequest::get().uri("/nonexistentroute").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(header_str(&resp, header::X_FRAME_OPTIONS), "SAMEORIGIN");
}

#[actix_web::test]
async fn test_nonce_csp() {
    let app = test::init_service(build_app(setup().await, Config::default(), Key::generate())).await;
    let req = test::TestRequest::get().uri("/").to_request();
    let resp = test::call_service(&app, req).await;

    let csp = header_str(&resp, header::CONTENT_SECURITY_POLICY);
    let script_src = csp
        .split("; ")
        .find(|field| field.starts_with("script-src"))
        .unwrap()
        .to_owned();
    let nonce = Regex::new(r"script-src .*'nonce-([a-fA-F0-9]{8})' ")
        .unwrap()
        .captures(&script_src)
        .unwrap()[1]
        .to_owned();

    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    let script_tag = Regex::new(r"<script[^>]*>").unwrap();
    let nonce_attr = Regex::new(r#"nonce="([^"]*)""#).unwrap();
    let mut scripts = 0;
    for tag in script_tag.find_iter(&body) {
        scripts += 1;
        let found = nonce_attr.captures(tag.as_str()).unwrap();
        assert_eq!(&found[1], nonce);
    }
    assert!(scripts > 0);
}

#[actix_web::test]
async fn test_nonce_differs_per_response() {
    let app = test::init_service(build_app(setup().await, Config::default(), Key::generate())).await;
    let first = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    let second = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;

    assert_ne!(
        header_str(&first, header::CONTENT_SECURITY_POLICY),
        header_str(&second, header::CONTENT_SECURITY_POLICY)
    );
}

#[actix_web::test]
async fn test_favicon() {
    let app = test::init_service(build_app(setup().await, Config::default(), Key::generate())).await;

    let req = test::TestRequest::get().uri("/favicon.ico").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let favicon = test::read_body(resp).await;

    let req = test::TestRequest::get().uri("/static/images/favicon.ico").to_request();
    let static_favicon = test::call_and_read_body(&app, req).await;
    assert_eq!(favicon, static_favicon);
}

#[actix_web::test]
async fn test_stylesheet() {
    let app = test::init_service(build_app(setup().await, Config::default(), Key::generate())).await;
    let req = test::TestRequest::get().uri("/static/css/aurweb.css").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(header_str(&resp, header::CONTENT_TYPE).starts_with("text/css"));
}

#[actix_web::test]
async fn test_language() {
    let app = test::init_service(build_app(setup().await, Config::default(), Key::generate())).await;
    let req = test::TestRequest::post()
        .uri("/language")
        .set_form([("set_lang", "de"), ("next", "/")])
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(header_str(&resp, header::LOCATION), "/");
    let lang = resp
        .response()
        .cookies()
        .find(|c| c.name() == "AURLANG")
        .map(|c| c.value().to_owned());
    assert_eq!(lang.as_deref(), Some("de"));
}

#[actix_web::test]
async fn test_language_invalid_next() {
    let app = test::init_service(build_app(setup().await, Config::default(), Key::generate())).await;

    for next in ["https://evil.net", "//evil.net/"] {
        let req = test::TestRequest::post()
            .uri("/language")
            .set_form([("set_lang", "de"), ("next", next)])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}

#[actix_web::test]
async fn test_user_language() {
    let pool = setup().await;
    let user = make_user(&mut pool.acquire().await.unwrap(), "test")
        .await
        .unwrap();
    let app = test::init_service(build_app(pool.clone(), Config::default(), Key::generate())).await;

    let req = test::TestRequest::post()
        .uri("/login")
        .set_form([("user", "test"), ("passwd", TEST_PASSWORD), ("next", "/")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let session: Cookie<'static> = resp
        .response()
        .cookies()
        .find(|c| c.name() == SESSION_COOKIE)
        .unwrap()
        .into_owned();

    let req = test::TestRequest::post()
        .uri("/language")
        .cookie(session)
        .set_form([("set_lang", "de"), ("next", "/")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let user = User::find(&mut pool.acquire().await.unwrap(), user.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.lang_preference, "de");
}

#[actix_web::test]
async fn test_language_query_params() {
    let app = test::init_service(build_app(setup().await, Config::default(), Key::generate())).await;
    let req = test::TestRequest::post()
        .uri("/language")
        .set_form([("set_lang", "de"), ("next", "/"), ("q", "next=%2F")])
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(header_str(&resp, header::LOCATION), "/?next=%2F");
}

#[actix_web::test]
async fn test_login_rejects_bad_password() {
    let pool = setup().await;
    make_user(&mut pool.acquire().await.unwrap(), "test")
        .await
        .unwrap();
    let app = test::init_service(build_app(pool, Config::default(), Key::generate())).await;

    let req = test::TestRequest::post()
        .uri("/login")
        .set_form([("user", "test"), ("passwd", "wrong"), ("next", "/")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_error_messages() {
    let app = test::init_service(build_app(setup().await, Config::default(), Key::generate())).await;

    let req = test::TestRequest::get().uri("/nonexistentroute").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get().uri("/raisefivethree").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(!header_str(&resp, header::CONTENT_SECURITY_POLICY).is_empty());
    assert_eq!(header_str(&resp, header::X_CONTENT_TYPE_OPTIONS), "nosniff");
    assert_eq!(header_str(&resp, header::REFERRER_POLICY), "same-origin");
    assert_eq!(header_str(&resp, header::X_FRAME_OPTIONS), "SAMEORIGIN");
}

#[actix_web::test]
async fn test_id_redirect() {
    let app = test::init_service(build_app(setup().await, Config::default(), Key::generate())).await;
    let req = test::TestRequest::get()
        .uri("/?id=test&key=value&key2=value2")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(header_str(&resp, header::LOCATION), "/test?key=value&key2=value2");
}

#[actix_web::test]
async fn test_id_redirect_non_ascii() {
    let app = test::init_service(build_app(setup().await, Config::default(), Key::generate())).await;
    let req = test::TestRequest::get().uri("/?id=%C3%BC").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(header_str(&resp, header::LOCATION), "/%C3%BC");
}

#[actix_web::test]
async fn test_api_requests() {
    let pool = setup().await;
    let request_id = {
        let mut conn = pool.acquire().await.unwrap();
        let user = make_user(&mut conn, "test").await.unwrap();
        let base = PackageBase::create(&mut conn, NewPackageBase::named("pkg").maintainer(&user))
            .await
            .unwrap();
        let deletion = RequestType::find(&mut conn, DELETION_ID).await.unwrap().unwrap();
        let new = NewPackageRequest::default()
            .request_type(&deletion)
            .user(&user)
            .package_base(&base)
            .package_base_name(base.name.clone())
            .comments("no longer maintained upstream")
            .closure_comment("");
        PackageRequest::create(&mut conn, new).await.unwrap().id
    };
    let app = test::init_service(build_app(pool, Config::default(), Key::generate())).await;

    let req = test::TestRequest::get().uri("/api/requests").to_request();
    let list: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(list.as_array().map(Vec::len), Some(1));
    assert_eq!(list[0]["package_base_name"], "pkg");

    let req = test::TestRequest::get()
        .uri(&format!("/api/request/{}", request_id))
        .to_request();
    let detail: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(detail["requester"], "test");
    assert_eq!(detail["status"], 0);
    assert_eq!(detail["status_label"], "Pending");
    assert!(detail["closer"].is_null());

    let req = test::TestRequest::get().uri("/api/request/9999").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get().uri("/api/request/abc").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_login_page_redirects_when_logged_in() {
    let pool = setup().await;
    make_user(&mut pool.acquire().await.unwrap(), "test")
        .await
        .unwrap();
    let app = test::init_service(build_app(pool, Config::default(), Key::generate())).await;
    let req = test::TestRequest::post()
        .uri("/login")
        .set_form([("user", "test"), ("passwd", TEST_PASSWORD), ("next", "/")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let session = resp
        .response()
        .cookies()
        .find(|c| c.name() == SESSION_COOKIE)
        .unwrap()
        .into_owned();

    let req = test::TestRequest::get().uri("/login").cookie(session).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(header_str(&resp, header::LOCATION), "/");
}

#[actix_web::test]
async fn test_login_page_reachable_after_session_expiry() {
    let pool = setup().await;
    make_user(&mut pool.acquire().await.unwrap(), "test")
        .await
        .unwrap();
    let app = test::init_service(build_app(pool.clone(), Config::default(), Key::generate())).await;
    let req = test::TestRequest::post()
        .uri("/login")
        .set_form([("user", "test"), ("passwd", TEST_PASSWORD), ("next", "/")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let session = resp
        .response()
        .cookies()
        .find(|c| c.name() == SESSION_COOKIE)
        .unwrap()
        .into_owned();

    sqlx::query("UPDATE Sessions SET LastUpdateTS = 0")
        .execute(&pool)
        .await
        .unwrap();

    let req = test::TestRequest::get().uri("/").cookie(session.clone()).to_request();
    let body = test::call_and_read_body(&app, req).await;
    let body = String::from_utf8(body.to_vec()).unwrap();
    assert!(body.contains(r#"<a href="/login">Login</a>"#));

    let req = test::TestRequest::get().uri("/login").cookie(session).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}
