//! Two program instances coordinating over one local bus
//!
//! Runs the whole protocol in a single process: presence, a fire-and-forget
//! broadcast, a wait-broadcast, and variable replication.

use std::time::Duration;

use tokio::time::sleep;

use tabmesh_bus::LocalBus;
use tabmesh_runtime::{Node, NodeConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let bus = LocalBus::new();
    let alice = Node::spawn(&bus, NodeConfig::default());
    let bob = Node::spawn(&bus, NodeConfig::default());

    println!("alice session: {}", alice.session());
    println!("bob session:   {}", bob.session());

    alice.declare_message("round start");
    bob.declare_message("round start");
    alice.declare_variable("score");

    bob.on_broadcast("round start", || async {
        println!("[bob] round start received, getting ready...");
        sleep(Duration::from_millis(300)).await;
        println!("[bob] ready");
    });

    // Let the startup pings settle so alice knows bob is there.
    sleep(Duration::from_millis(500)).await;
    println!("alice sees {} peer(s)", alice.presence_estimate());

    println!("[alice] broadcast and wait: \"round start\"");
    alice.broadcast_and_wait("round start").await?;
    println!("[alice] every peer finished reacting");

    alice.set_variable("score", 5.0)?;
    alice.change_variable("score", 2.0)?;
    sleep(Duration::from_millis(100)).await;
    println!("[bob] score = {}", bob.get_variable("score"));

    println!("alice stats: {:?}", alice.stats());
    Ok(())
}
