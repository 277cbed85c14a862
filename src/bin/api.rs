use research_agent::{api::start_server, ResearchAgent, Settings};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::from_env();

    if settings.llm.api_key.is_none() {
        eprintln!("⚠️  GROQ_API_KEY not set in .env");
        eprintln!("📌 Model-backed endpoints will fail until it is configured");
    }

    info!("🚀 Research Agent - API Server");
    info!("📍 Port: {}", settings.port);

    let agent = Arc::new(ResearchAgent::from_settings(&settings).await?);

    info!("✅ Research agent initialized");
    info!("📡 Starting API server...");

    start_server(agent, settings.port).await?;

    Ok(())
}
