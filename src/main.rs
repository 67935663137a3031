use actix_web::{App, HttpResponse, HttpServer, get, middleware::Logger, web};
use serde_json::json;
use sqlx::PgPool;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod auth;
mod comments;
mod config;
mod db;
mod error;
mod likes;
mod media;
mod models;
mod pagination;
mod playlists;
mod subscriptions;
mod token;
mod videos;
mod views;

#[get("/healthz")]
async fn healthcheck() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    dotenv::dotenv().ok();
    let config = config::Config::from_env().expect("Failed to load config from environment");

    tracing::info!("starting vidstream backend on {}", config.bind_addr);

    let pool = PgPool::connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");
    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let tokens = token::TokenService::new(&config);
    let media = media::MediaStore::new(config.media_root.clone(), config.media_base_url.clone())
        .await
        .expect("Failed to initialize media store");

    let bind_addr = config.bind_addr.clone();
    let pool_data = web::Data::new(pool);
    let tokens_data = web::Data::new(tokens);
    let media_data = web::Data::new(media);

    HttpServer::new(move || {
        App::new()
            .app_data(pool_data.clone())
            .app_data(tokens_data.clone())
            .app_data(media_data.clone())
            .wrap(Logger::default())
            .service(healthcheck)
            .configure(auth::init_routes)
            .configure(videos::init_routes)
            .configure(comments::init_routes)
            .configure(likes::init_routes)
            .configure(subscriptions::init_routes)
            .configure(playlists::init_routes)
    })
    .bind(bind_addr)?
    .run()
    .await
}
