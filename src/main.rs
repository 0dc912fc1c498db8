//! NL-to-SQL chat server for the credit card demo database.

use card_analytics_api::api;
use card_analytics_api::config::Settings;
use card_analytics_api::core::formatter::ReplyFormatter;
use card_analytics_api::core::generator::LlmSqlGenerator;
use card_analytics_api::core::services::AnalyticsChatService;
use card_analytics_api::core::session::SessionStore;
use card_analytics_api::infrastructure::database::DatabaseConnection;
use card_analytics_api::infrastructure::llm::OpenAiClient;
use card_analytics_api::infrastructure::repositories::DbQueryRepository;

use axum::Router;
use axum::http::{HeaderValue, Method};
use axum::response::Html;
use axum::routing::get;
use di::{Injectable, ServiceCollection};
use di_axum::RouterServiceProviderExtensions;
use log::info;
use tokio::runtime::{Builder, Runtime};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

fn main() -> anyhow::Result<()> {
    // initialize tracing
    tracing_subscriber::fmt::init();

    dotenvy::dotenv().ok();
    let settings = Settings::from_env().map_err(|e| anyhow::anyhow!(e))?;
    let port = settings.port;
    info!(
        "starting with {} database on port {port}",
        settings.database.kind_name()
    );

    let runtime: Runtime = Builder::new_multi_thread().enable_all().build()?;

    runtime.block_on(web_server_task(port));

    Ok(())
}

async fn web_server_task(port: u16) {
    let provider = ServiceCollection::new()
        .add(Settings::singleton())
        .add(DatabaseConnection::singleton())
        .add(OpenAiClient::singleton())
        .add(SessionStore::singleton())
        .add(DbQueryRepository::scoped())
        .add(LlmSqlGenerator::scoped())
        .add(ReplyFormatter::scoped())
        .add(AnalyticsChatService::scoped())
        .build_provider()
        .unwrap();

    // build our application with a route
    let app = Router::new()
        .route("/", get(index))
        .nest_service(
            "/static",
            ServiceBuilder::new().service(ServeDir::new("static")),
        )
        .nest("/chat", api::chat::router())
        .layer(
            CorsLayer::new()
                .allow_headers(Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_origin([
                    "http://localhost:3000".parse::<HeaderValue>().unwrap(),
                    "http://localhost:5173".parse::<HeaderValue>().unwrap(),
                ]),
        )
        .with_provider(provider);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .unwrap();
    info!("listening on {}", listener.local_addr().unwrap());
    axum::serve(listener, app).await.unwrap();
    info!("Shutting down...");
}

async fn index() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}
