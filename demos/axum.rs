/* demos/axum.rs */

use axum::{Router, response::Json, routing::get};
use ipgate::{ClientIp, GateOptions, IpGate, IpGateLayer};
use serde_json::json;
use std::net::SocketAddr;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::new("ipgate=debug"))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let app = create_app();
    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();

    println!("Server starting on http://localhost:3000");
    println!("Test endpoints:");
    println!("  • GET /open     - No list configured, always allowed");
    println!("  • GET /local    - Whitelist: loopback peers only");
    println!("  • GET /proxied  - Whitelist 203.0.113.42, trusts forwarding headers");
    println!("  • GET /blocked  - Blacklist 203.0.113.42, trusts forwarding headers");
    println!();
    println!("Test with headers:");
    println!("  curl -H 'X-Forwarded-For: 203.0.113.42, 10.0.0.1' http://localhost:3000/proxied");
    println!("  curl -H 'X-Client-IP: 203.0.113.42' http://localhost:3000/blocked");
    println!();

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}

fn create_app() -> Router {
    let open = Router::new()
        .route("/", get(ip_handler))
        .layer(IpGateLayer::from_options(Vec::<String>::new(), GateOptions::default()));

    let local = Router::new()
        .route("/", get(ip_handler))
        .layer(IpGateLayer::from_options(
            ["127.0.0.1", "::1"],
            GateOptions::default(),
        ));

    let proxied_gate = IpGate::new(["203.0.113.42"], GateOptions::new().allow_forwarded(true));
    let proxied = Router::new()
        .route("/", get(ip_handler))
        .layer(IpGateLayer::new(proxied_gate));

    let blocked = Router::new().route("/", get(ip_handler)).layer(
        IpGateLayer::from_options(
            "203.0.113.42",
            GateOptions::new().allow(false).allow_forwarded(true),
        ),
    );

    Router::new()
        .nest("/open", open)
        .nest("/local", local)
        .nest("/proxied", proxied)
        .nest("/blocked", blocked)
}

/// Echo the client IP the gate let through.
async fn ip_handler(client_ip: ClientIp) -> Json<serde_json::Value> {
    Json(json!({
        "client_ip": client_ip.ip(),
        "allowed": true,
    }))
}
