//! Stale credential handling example.
//!
//! Shows the single most important failure to handle distinctly: the server
//! rejecting a minted password because it expired or was rotated. The
//! correct response is re-running the whole flow from token acquisition,
//! never retrying the connection with the same credential.
//!
//! Run with: cargo run --example stale_credential

use pglease::providers::mock::{mock_config, MockConnector, MockControlPlane, MockTokenProvider};
use pglease::{Bootstrapper, PgleaseError};
use std::sync::Arc;

#[tokio::main]
async fn main() -> pglease::Result<()> {
    println!("=== Stale Credential Example ===\n");

    let plane = MockControlPlane::new();
    plane.set_instance("demo-db", "demo-db.example.internal").await;
    let plane = Arc::new(plane);
    let config = mock_config();

    // The server has rotated the credential: whatever gets minted now, the
    // connector only accepts a password the flow will never produce.
    let mut connector = MockConnector::new();
    connector.accepted_password = Some("already-rotated".to_string());

    let flow = Bootstrapper::new(
        Arc::new(MockTokenProvider::new()),
        plane.clone(),
        plane.clone(),
        connector,
        &config,
    );

    println!("1. Attempting bootstrap with a credential the server will reject...");
    match flow.run("demo-db").await {
        Err(err @ PgleaseError::AuthenticationRejected(_)) => {
            println!("   ✗ rejected as expected: {}", err);
            println!("   stage: {:?}", err.stage());
            println!("   re-run whole flow: {}", err.is_rerunnable());
            println!("   connection attempts: {}", flow.connector().attempts());
        }
        other => {
            println!("   unexpected outcome: {:?}", other.map(|_| "connected"));
        }
    }

    println!("\n2. Re-running the whole flow against an accepting server...");
    let flow = Bootstrapper::new(
        Arc::new(MockTokenProvider::new()),
        plane.clone(),
        plane.clone(),
        MockConnector::new(),
        &config,
    );
    let handle = flow.run("demo-db").await?;
    println!("   ✓ fresh mint accepted, server: {}", handle.server_version());
    println!("   total credentials minted across both attempts: {}", plane.mint_count());

    println!("\n=== Example Complete ===");
    Ok(())
}
