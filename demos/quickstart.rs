//! Minimal end-to-end example for `tsap`.
//!
//! Profiles two subjects, pits them against each other, and (when an API key
//! is present) asks the completion service to narrate the result.
//!
//! To run:
//! - Optionally set `TSAP_API_KEY` (or `DEEPSEEK_API_KEY`)
//! - `cargo run --example quickstart`

use std::sync::Arc;

use tsap::engine::render_report_markdown;
use tsap::gateway::NoopUsageSink;
use tsap::{AnalysisEngine, EngineConfig, Narrator, ProviderGateway};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Overrides and thresholds; an empty config uses the built-in defaults.
    let config_path = concat!(env!("CARGO_MANIFEST_DIR"), "/demos/config.json");
    let engine = AnalysisEngine::new(EngineConfig::load_from_path(config_path)?);

    // Same names, same config: same reports, every time.
    for name in ["Ganyu", "Orin"] {
        let report = engine.analyze_single(name)?;
        println!("{}", render_report_markdown(&report));
    }

    let versus = engine.analyze_versus("Orin", "Ganyu")?;
    println!("{}", render_report_markdown(&versus));

    // Narration is optional and never changes the report.
    match ProviderGateway::from_env(Arc::new(NoopUsageSink)) {
        Ok(gateway) => {
            let narrator = Narrator::new(Arc::new(gateway));
            let narration = narrator
                .narrate_streaming(&versus, |delta| print!("{delta}"))
                .await?;
            println!("\n\n({} output tokens)", narration.output_tokens);
        }
        Err(err) => eprintln!("skipping narration: {err}"),
    }

    Ok(())
}
