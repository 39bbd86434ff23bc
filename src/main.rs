use actix_cors::Cors;
use actix_web::{self, middleware::Logger, web, App, HttpServer};
use std::sync::Arc;

use crate::{
    constants::Env,
    modules::uploader::{LocalMediaStore, UploaderConfig, UploaderService},
};

mod api;
mod constants;
mod modules;
#[cfg(test)]
mod test;
mod utils;

#[actix_web::get("/")]
async fn health_check() -> &'static str {
    "Server is running"
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let env = Env::from_env().map_err(|e| std::io::Error::other(e.to_string()))?;
    log::info!("Environment variables loaded");

    let config = UploaderConfig::from(&env);
    tokio::fs::create_dir_all(&config.media_dir).await?;

    let store = LocalMediaStore::new(&config.media_dir);
    let uploader_service = UploaderService::new(Arc::new(store), config);

    let frontend_url = env.frontend_url.clone();
    let route_prefix = env.route_prefix.clone();

    tracing::info!("Starting server at http://{}:{}", env.ip, env.port);
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&frontend_url)
            .allowed_methods(vec!["GET", "POST"])
            .allow_any_header()
            .supports_credentials();

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(web::Data::new(uploader_service.clone()))
            .service(health_check)
            .service(
                web::scope(&route_prefix)
                    .configure(modules::uploader::route::configure::<LocalMediaStore>),
            )
    })
    .bind((env.ip.as_str(), env.port))?
    .workers(2)
    .run()
    .await
}
