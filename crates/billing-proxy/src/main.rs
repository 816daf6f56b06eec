//! Billing proxy - Entry point.

use billing_proxy::{
    api::{create_router, AppState},
    auth::TokenIssuer,
    config::Config,
    store::Store,
};
use itel_billing_client::{BillingClient, BillingClientConfig};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.level));

    let registry = tracing_subscriber::registry().with(filter);
    if config.log.format.eq_ignore_ascii_case("json") {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    info!("Starting billing proxy");

    // Initialize iTelBilling client
    let billing = match BillingClient::new(BillingClientConfig {
        base_url: config.billing.base_url.clone(),
        allowed_ip: config.billing.allowed_ip.clone(),
        timeout: config.billing.timeout(),
    }) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to create billing client: {}", e);
            std::process::exit(1);
        }
    };
    info!(
        base_url = %billing.base_url(),
        allowed_ip = ?billing.allowed_ip(),
        "iTelBilling client ready"
    );

    // Initialize storage
    let store = match (config.store.persist, config.store_secret()) {
        (true, Some(secret)) => Store::encrypted(config.store.path.clone(), secret),
        (true, None) => {
            warn!("No store secret configured, using in-memory storage");
            Store::memory()
        }
        (false, _) => {
            info!("Persistence disabled, using in-memory storage");
            Store::memory()
        }
    };

    // Load existing users. A store that cannot be decrypted is fatal so it
    // is never overwritten with an empty directory.
    let users = match store.load().await {
        Ok(d) => {
            info!("Loaded {} user records", d.count());
            d
        }
        Err(e) => {
            error!("Failed to load user store: {}", e);
            std::process::exit(1);
        }
    };

    let Some(token_secret) = config.token_secret().cloned() else {
        error!("AUTH__TOKEN_SECRET is missing");
        std::process::exit(1);
    };
    let tokens = TokenIssuer::new(token_secret, config.auth.token_ttl());

    // Create application state
    let state = AppState::new(users, store, billing, tokens);
    let app = create_router(state);

    // Bind to address
    let addr = SocketAddr::new(
        config
            .server
            .listen_addr
            .parse()
            .unwrap_or([0, 0, 0, 0].into()),
        config.server.port,
    );

    info!("Listening on {}", addr);

    let listener = match TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    // Run server
    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
