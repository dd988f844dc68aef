use anyhow::Context;
use clap::{Parser, ValueEnum};
use serde_json::json;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use resource_api::auth::{generate_jwt, Claims};
use resource_api::config::{config, AppConfig};
use resource_api::controller::Services;
use resource_api::database::{DatabaseManager, PgEntityStore, PgFileStore, PgResource, PgUserDirectory};
use resource_api::filter::SortDirection;
use resource_api::handlers::ApiRouter;
use resource_api::memory::{MemoryEntityStore, MemoryFileStore, MemoryResource, MemoryUserDirectory};
use resource_api::store::{FieldRules, Group, User};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Storage {
    /// Seeded in-memory demo data
    Memory,
    /// Tables from `migrations/schema.sql` in `DATABASE_URL`
    Postgres,
}

#[derive(Debug, Parser)]
#[command(name = "resource-api", version, about = "Generic REST resource API server")]
struct Args {
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,

    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    #[arg(long, value_enum, default_value = "memory")]
    storage: Storage,

    /// Print a bearer token for this user id and exit
    #[arg(long)]
    issue_token: Option<i64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so DATABASE_URL and APP_ENV are picked up
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = config().clone();

    if let Some(user_id) = args.issue_token {
        let token = generate_jwt(&Claims::new(user_id, config.security.jwt_expiry_hours))?;
        println!("{}", token);
        return Ok(());
    }

    tracing::info!(
        "Starting resource API in {:?} mode{}",
        config.environment,
        if resource_api::is_production!() { "" } else { " (debug settings)" }
    );

    let app = match args.storage {
        Storage::Memory => memory_app(config).await,
        Storage::Postgres => postgres_app(config).await?,
    };

    let bind_addr = format!("{}:{}", args.bind, args.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Listening on http://{}", bind_addr);
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

async fn memory_app(config: AppConfig) -> axum::Router {
    let users = MemoryUserDirectory::new().with_user(User {
        id: 1,
        name: "Demo".into(),
        email: Some("demo@example.com".into()),
        groups: vec![Group {
            id: 1,
            code: "editors".into(),
            name: "Editors".into(),
        }],
    });

    let store = MemoryEntityStore::new("posts").with_relations(["preview_image", "images"]);
    for (title, status) in [("Hello", "published"), ("Draft post", "draft"), ("Second", "published")] {
        store.insert(json!({ "title": title, "status": status })).await;
    }

    let posts = MemoryResource::new(store)
        .with_sort("id", SortDirection::Desc)
        .filter_on("status")
        .with_rules(FieldRules::new().rule("title", "required|string|max:255"))
        .writable_by("editors");

    let services = Services::new(config, Arc::new(users), Arc::new(MemoryFileStore::new()));
    ApiRouter::new(Arc::new(services)).resource(posts).into_router()
}

async fn postgres_app(config: AppConfig) -> anyhow::Result<axum::Router> {
    let manager = DatabaseManager::new(config.database.clone());
    let pool = manager.main_pool().await.context("connecting to DATABASE_URL")?;
    manager.health_check().await?;

    let store = PgEntityStore::new(pool.clone(), "posts")?
        .with_relations(["preview_image", "images"])
        .with_soft_delete("deleted_at")?;
    let posts = PgResource::new("posts", store)
        .filter_on("status")
        .with_rules(FieldRules::new().rule("title", "required|string|max:255"));

    let services = Services::new(
        config,
        Arc::new(PgUserDirectory::new(pool.clone())),
        Arc::new(PgFileStore::new(pool)),
    );
    Ok(ApiRouter::new(Arc::new(services)).resource(posts).into_router())
}
