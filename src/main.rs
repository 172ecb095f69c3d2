use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use clap::Parser;
use studybuddy::api;
use studybuddy::api::middleware::ApiKeyAuth;
use studybuddy::cli::{
    commands::{Cli, Commands},
    run_cli,
};
use studybuddy::config::AppConfig;
use studybuddy::db;
use studybuddy::email;
use studybuddy::llm::GatewayClient;
use tracing::{error, info};

async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({"status": "healthy"}))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if !matches!(cli.command, Commands::Serve) {
        run_cli(cli.command, cli.config).await;
        return Ok(());
    }

    info!("Starting StudyBuddy relay server...");

    let config = match AppConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let db_pool = match db::get_connection(&config.database) {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };

    let gateway = GatewayClient::new(&config.llm);
    let mailer = email::from_config(&config.email);

    let host = config.server.host.clone();
    let port = config.server.port;

    info!("Server listening on {}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(config.clone()))
            .app_data(web::Data::new(db_pool.clone()))
            .app_data(web::Data::new(gateway.clone()))
            .app_data(web::Data::new(mailer.clone()))
            .route("/health", web::get().to(health))
            .wrap(ApiKeyAuth)
            .configure(api::routes::configure)
            .configure(api::account::configure)
            .service(api::relay::study_chat)
    })
    .bind((host, port))?
    .run()
    .await
}
