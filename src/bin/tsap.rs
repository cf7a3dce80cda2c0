#![forbid(unsafe_code)]

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::warn;

use tsap::engine::{render_report_markdown, Mode, Report};
use tsap::gateway::{ProviderGateway, TracingUsageSink};
use tsap::narrate::{Narration, Narrator, NarratorConfig, DEFAULT_MODEL};
use tsap::{AnalysisEngine, EngineConfig};

#[derive(Parser)]
#[command(name = "tsap", version, about = "Deterministic trait-profile analysis")]
struct Cli {
    /// JSON config with overrides and rule thresholds
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = Format::Markdown, global = true)]
    format: Format,
    /// Log at DEBUG instead of INFO
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Markdown,
}

#[derive(Subcommand)]
enum Commands {
    /// Profile one subject in the defense role
    Single {
        name: String,
        #[command(flatten)]
        narration: NarrateArgs,
    },
    /// Profile one subject in the attack role
    Attack {
        name: String,
        #[command(flatten)]
        narration: NarrateArgs,
    },
    /// Synchrony between two subjects
    Resonance {
        first: String,
        second: Option<String>,
        #[command(flatten)]
        narration: NarrateArgs,
    },
    /// Attacker against defender
    Versus {
        attacker: String,
        defender: Option<String>,
        #[command(flatten)]
        narration: NarrateArgs,
    },
}

#[derive(Args, Clone)]
struct NarrateArgs {
    /// Ask the completion service for prose on top of the report
    #[arg(long)]
    narrate: bool,
    /// Print narration deltas as they arrive (markdown output only)
    #[arg(long, requires = "narrate")]
    stream: bool,
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,
}

impl Commands {
    fn split(self) -> (Mode, String, Option<String>, NarrateArgs) {
        match self {
            Commands::Single { name, narration } => (Mode::Single, name, None, narration),
            Commands::Attack { name, narration } => (Mode::Attack, name, None, narration),
            Commands::Resonance {
                first,
                second,
                narration,
            } => (Mode::Resonance, first, second, narration),
            Commands::Versus {
                attacker,
                defender,
                narration,
            } => (Mode::Versus, attacker, defender, narration),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => EngineConfig::load_from_path(path)?,
        None => EngineConfig::default(),
    };
    let engine = AnalysisEngine::new(config);

    let (mode, primary, secondary, narration) = cli.command.split();
    let report = engine.analyze(mode, &primary, secondary.as_deref())?;

    match cli.format {
        Format::Json => {
            let narrated = if narration.narrate {
                narrate(&report, &narration, false).await
            } else {
                None
            };
            let out = match narrated {
                Some(n) => serde_json::json!({ "report": report, "narration": n.text }),
                None => serde_json::to_value(&report)?,
            };
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Format::Markdown => {
            print!("{}", render_report_markdown(&report));
            if narration.narrate {
                println!("\n## Narration\n");
                io::stdout().flush()?;
                if let Some(n) = narrate(&report, &narration, narration.stream).await {
                    if narration.stream {
                        println!();
                    } else {
                        println!("{}", n.text);
                    }
                }
            }
        }
    }

    Ok(())
}

/// Narration failures leave the report intact; they are logged, not fatal.
async fn narrate(report: &Report, args: &NarrateArgs, stream: bool) -> Option<Narration> {
    let gateway = match ProviderGateway::from_env(Arc::new(TracingUsageSink)) {
        Ok(g) => g,
        Err(err) => {
            warn!(error = %err, "narration unavailable");
            return None;
        }
    };
    let narrator = Narrator::with_config(
        Arc::new(gateway),
        NarratorConfig {
            model: args.model.clone(),
            ..NarratorConfig::default()
        },
    );

    let result = if stream {
        let mut sink = DeltaWriter::new(io::stdout());
        narrator
            .narrate_streaming(report, |delta| sink.write(delta))
            .await
    } else {
        narrator.narrate(report).await
    };

    match result {
        Ok(n) => Some(n),
        Err(err) => {
            warn!(report_id = report.id(), error = %err, "narration failed");
            None
        }
    }
}

/// Forwards streamed deltas until the first write error, which is logged once.
struct DeltaWriter<W: Write> {
    out: W,
    failed: bool,
}

impl<W: Write> DeltaWriter<W> {
    fn new(out: W) -> Self {
        Self { out, failed: false }
    }

    fn write(&mut self, delta: &str) {
        if self.failed {
            return;
        }
        let result = self
            .out
            .write_all(delta.as_bytes())
            .and_then(|()| self.out.flush());
        if let Err(err) = result {
            warn!(error = %err, "stdout closed; dropping remaining narration deltas");
            self.failed = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ClosedPipe {
        attempts: usize,
    }

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            self.attempts += 1;
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn delta_writer_forwards_in_order() {
        let mut sink = DeltaWriter::new(Vec::new());
        sink.write("Sync ");
        sink.write("drift.");
        assert!(!sink.failed);
        assert_eq!(sink.out, b"Sync drift.");
    }

    #[test]
    fn delta_writer_stops_after_first_error() {
        let mut sink = DeltaWriter::new(ClosedPipe { attempts: 0 });
        sink.write("a");
        sink.write("b");
        sink.write("c");
        assert!(sink.failed);
        assert_eq!(sink.out.attempts, 1);
    }
}
