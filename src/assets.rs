use actix_web::{get, HttpResponse, Responder};

const STYLE_CSS: &str = include_str!("../static/css/aurweb.css");
const FAVICON: &[u8] = include_bytes!("../static/images/favicon.ico");

fn favicon_response() -> HttpResponse {
    HttpResponse::Ok().content_type("image/x-icon").body(FAVICON)
}

#[get("/static/css/aurweb.css")]
pub async fn style_css() -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/css; charset=utf-8")
        .body(STYLE_CSS)
}

#[get("/static/images/favicon.ico")]
pub async fn static_favicon() -> impl Responder {
    favicon_response()
}

#[get("/favicon.ico")]
pub async fn favicon() -> impl Responder {
    favicon_response()
}
