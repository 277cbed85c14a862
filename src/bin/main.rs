use research_agent::{ResearchAgent, Settings};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let goal = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if goal.trim().is_empty() {
        eprintln!("Usage: orchestrator <research goal>");
        std::process::exit(2);
    }

    info!("Research agent starting");

    let settings = Settings::from_env();
    let agent = ResearchAgent::from_settings(&settings).await?;

    info!(goal = %goal, "Running research pipeline");

    match agent.run(&goal).await {
        Ok(result) => {
            println!("\n=== RESEARCH RESULT ===");
            println!("Goal: {}", result.goal);

            for outcome in &result.tasks {
                println!("\n--- {} ---", outcome.task);
                println!("{}", outcome.result.findings);
                if !outcome.result.tags.is_empty() {
                    println!("\nTags: {}", outcome.result.tags.join(", "));
                }
                for source in &outcome.result.sources {
                    println!("  [{}] {}", source.title, source.url);
                }
                for warning in &outcome.result.warnings {
                    println!("  warning: {}", warning);
                }
            }

            println!("\n=== FINAL REPORT ===\n{}", result.report);
            Ok(())
        }
        Err(e) => {
            eprintln!("Research failed: {}", e);
            Err(Box::new(e) as Box<dyn std::error::Error>)
        }
    }
}
