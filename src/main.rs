use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use milestone_backend::auth::jwt::TokenVerifier;
use milestone_backend::config::AppConfig;
use milestone_backend::create_pool;
use milestone_backend::gateway::PaymentGateway;
use milestone_backend::gateway::signature::WebhookVerifier;
use milestone_backend::gateway::stripe::StripeGateway;
use milestone_backend::handlers;
use milestone_backend::services::reconciliation;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = AppConfig::from_env().map_err(std::io::Error::other)?;

    let db = create_pool(&config.database_url)
        .await
        .map_err(std::io::Error::other)?;
    tracing::info!("Connected to database");

    // Re-run confirmations that failed earlier (webhook 500s, crashed redirects).
    actix_web::rt::spawn(reconciliation::run_retry_loop(
        db.clone(),
        config.reconcile_retry_interval,
        config.reconcile_max_attempts,
    ));

    let db_data = web::Data::new(db);
    let verifier = web::Data::new(Arc::new(TokenVerifier::from_config(&config.auth)));
    let gateway: Arc<dyn PaymentGateway> = Arc::new(StripeGateway::new(&config.stripe));
    let gateway = web::Data::new(gateway);
    let webhook_verifier = web::Data::new(WebhookVerifier::new(
        &config.stripe.webhook_secret,
        config.stripe.webhook_tolerance,
    ));

    let bind_addr = config.bind_addr.clone();
    tracing::info!("Server running at http://{bind_addr}");

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allowed_methods(vec!["GET", "POST", "PUT", "OPTIONS"])
            .allowed_headers(vec![
                actix_web::http::header::AUTHORIZATION,
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::ACCEPT,
            ])
            .max_age(3600);

        App::new()
            .wrap(cors)
            .app_data(db_data.clone())
            .app_data(verifier.clone())
            .app_data(gateway.clone())
            .app_data(webhook_verifier.clone())
            .service(web::scope("/api").configure(handlers::init_routes))
    })
    .bind(&bind_addr)?
    .run()
    .await
}
