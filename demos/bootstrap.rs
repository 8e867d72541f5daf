//! End-to-end bootstrap walkthrough on mock providers.
//!
//! Demonstrates the full pipeline without a control plane or database
//! server: token acquisition, endpoint resolution, credential minting, and
//! connection open with a version probe.
//!
//! Run with: cargo run --example bootstrap

use pglease::providers::mock::{mock_config, MockConnector, MockControlPlane, MockTokenProvider};
use pglease::Bootstrapper;
use std::sync::Arc;

#[tokio::main]
async fn main() -> pglease::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pglease=info".into()),
        )
        .init();

    println!("=== Bootstrap Flow Example ===\n");

    // A control plane with one registered instance
    let plane = MockControlPlane::new();
    plane.set_instance("demo-db", "demo-db.example.internal").await;
    let plane = Arc::new(plane);

    let config = mock_config();
    let flow = Bootstrapper::new(
        Arc::new(MockTokenProvider::new()),
        plane.clone(),
        plane.clone(),
        MockConnector::new(),
        &config,
    );

    println!("1. Checking instance access...");
    let accessible = flow.validate_instance_access("demo-db").await;
    println!("   ✓ access: {}", accessible);

    println!("\n2. Running the bootstrap pipeline...");
    let handle = flow.run("demo-db").await?;
    println!("   ✓ connected as '{}' to '{}'", handle.username, handle.database);
    println!("   ✓ server version: {}", handle.server_version());

    println!("\n3. Credential accounting:");
    println!("   - credentials minted: {}", plane.mint_count());
    for request_id in plane.minted_request_ids() {
        println!("   - request id: {}", request_id);
    }

    println!("\n=== Example Complete ===");
    Ok(())
}
