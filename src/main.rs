use actix_web::cookie::Key;
use actix_web::HttpServer;
use log::info;

use aurweb::config::Config;
use aurweb::{build_app, db};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env()?;
    let pool = db::connect(&config.database_url).await?;
    info!("Database connection established.");

    let session_key = Key::generate();
    let listen = config.listen_address.clone();
    info!("Listening on {}", listen);

    HttpServer::new(move || build_app(pool.clone(), config.clone(), session_key.clone()))
        .bind(listen)?
        .run()
        .await?;

    Ok(())
}
