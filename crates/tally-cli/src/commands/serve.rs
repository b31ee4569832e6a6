//! Server command implementation

use anyhow::Result;
use tally_core::{AIBackend, AIClient, TallyConfig};

pub async fn cmd_serve(config: TallyConfig, host: &str, port: u16) -> Result<()> {
    println!("🚀 Starting Tally server...");
    println!("   Listening: http://{}:{}", host, port);

    match AIClient::from_config(&config.ai) {
        Some(client) => println!(
            "   🤖 AI backend: {} ({} at {})",
            client.kind(),
            client.model(),
            client.host()
        ),
        None => println!("   📊 AI backend: none (statistical detection only)"),
    }
    if host != "127.0.0.1" && host != "localhost" {
        println!();
        println!("   ⚠️  The API has no authentication - do not expose to untrusted networks!");
    }
    println!();
    println!("   Press Ctrl+C to stop");

    tally_server::serve(config, host, port).await?;

    Ok(())
}
