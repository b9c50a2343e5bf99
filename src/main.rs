use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use match_coach::agents::coach::match_digest;
use match_coach::config::AppConfig;
use match_coach::fetch::MatchQuery;
use match_coach::pipeline::{self, CoachingPipeline, CoachingReport, MatchAnalysis};
use match_coach::storage::{FeedbackLog, StorageConfig};

#[derive(Parser)]
#[command(name = "match-coach")]
#[command(about = "Valorant match analysis and AI coaching feedback")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: String,

    /// Data directory path (overrides config)
    #[arg(long)]
    data_dir: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Riot ID of the player to look up.
#[derive(clap::Args)]
struct PlayerArgs {
    /// Riot name (before the #)
    #[arg(long)]
    name: String,

    /// Riot tag (after the #)
    #[arg(long)]
    tag: String,

    /// Region shard, e.g. "ap", "eu", "na"
    #[arg(long)]
    region: Option<String>,
}

impl PlayerArgs {
    fn query(&self, config: &AppConfig) -> MatchQuery {
        pipeline::match_query(&config.api, &self.name, &self.tag, self.region.as_deref())
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the latest competitive match and save it
    Fetch {
        #[command(flatten)]
        player: PlayerArgs,
    },

    /// Print player, combat and round summaries
    Analyze {
        /// Riot name (before the #)
        #[arg(long)]
        name: String,

        /// Riot tag (after the #); not needed with --file
        #[arg(long, required_unless_present = "file")]
        tag: Option<String>,

        /// Region shard, e.g. "ap", "eu", "na"
        #[arg(long)]
        region: Option<String>,

        /// Analyze a saved API response instead of fetching
        #[arg(long)]
        file: Option<String>,

        /// Recompute summaries instead of reading cached files
        #[arg(long)]
        refresh: bool,
    },

    /// Fetch, analyze and print coaching feedback
    Coach {
        #[command(flatten)]
        player: PlayerArgs,

        /// Recompute summaries instead of reading cached files
        #[arg(long)]
        refresh: bool,
    },

    /// Ask the coach a question about the latest match
    Ask {
        #[command(flatten)]
        player: PlayerArgs,

        /// The question
        question: String,

        /// Recompute summaries instead of reading cached files
        #[arg(long)]
        refresh: bool,
    },

    /// Show previously generated feedback
    History {
        /// Only show feedback for this player name
        #[arg(long)]
        player: Option<String>,

        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// Debug utilities
    Debug {
        #[command(subcommand)]
        action: DebugAction,
    },
}

#[derive(Subcommand)]
enum DebugAction {
    /// Analyze a fixture file offline, without cache or network
    ParseFixture {
        path: String,

        /// Player name to analyze
        #[arg(long)]
        player: String,
    },
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = AppConfig::load_or_default(Path::new(&cli.config))
        .with_context(|| format!("Loading config from {}", cli.config))?;

    if let Some(data_dir) = &cli.data_dir {
        config.data_dir = PathBuf::from(data_dir);
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    Ok(config)
}

fn print_analysis(analysis: &MatchAnalysis) -> Result<()> {
    println!("=== Player Summary ===");
    println!("{}", serde_json::to_string_pretty(&analysis.player)?);
    println!("\n=== Combat Summary ===");
    println!("{}", match_digest(&analysis.player, &analysis.combat));
    println!("K/D ratio: {:.2}", analysis.combat.kd_ratio());
    println!("\n=== Rounds ({}) ===", analysis.rounds.len());
    for round in &analysis.rounds {
        let site = round
            .plant_site
            .as_deref()
            .map(|s| format!(", planted {}", s))
            .unwrap_or_default();
        println!(
            "  Round {:>2}: {} ({} kills, {} credits left{})",
            round.round + 1,
            if round.won { "won" } else { "lost" },
            round.stats.kills,
            round.economy.remaining,
            site
        );
    }
    Ok(())
}

fn print_report(report: &CoachingReport) {
    println!(
        "=== Coaching: {} ({}) ===\n",
        report.analysis.player.player, report.match_id
    );
    println!("{}", report.feedback);
    println!("\n-- {} [{}]", report.model, report.record_id);
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(cli.json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!cli.json_logs).then(|| tracing_subscriber::fmt::layer()))
        .init();

    tracing::info!("Starting match-coach v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Fetch { player } => {
            let pipeline = CoachingPipeline::from_config(&config)?;
            let query = player.query(&config);

            let document = pipeline.fetch(&query).await?;
            println!(
                "Fetched match {} on {} ({} rounds, {} kills)",
                document.match_id(),
                document.map_name(),
                document.rounds.len(),
                document.kills.len()
            );
            println!("Saved to {}", pipeline.storage().match_data_path().display());
        }
        Commands::Analyze {
            name,
            tag,
            region,
            file,
            refresh,
        } => {
            let pipeline = CoachingPipeline::from_config(&config)?.with_refresh(refresh);

            let document = match (file, tag) {
                (Some(path), _) => pipeline::load_document(Path::new(&path))?,
                (None, Some(tag)) => {
                    let query =
                        pipeline::match_query(&config.api, &name, &tag, region.as_deref());
                    pipeline.fetch(&query).await?
                }
                (None, None) => anyhow::bail!("--tag is required unless --file is given"),
            };

            let analysis = pipeline.analyze_document(&document, &name)?;
            print_analysis(&analysis)?;
        }
        Commands::Coach { player, refresh } => {
            let pipeline = CoachingPipeline::from_config_with_coach(&config)?.with_refresh(refresh);
            let query = player.query(&config);

            let report = pipeline.run(&query, None).await?;
            print_report(&report);
        }
        Commands::Ask {
            player,
            question,
            refresh,
        } => {
            let pipeline = CoachingPipeline::from_config_with_coach(&config)?.with_refresh(refresh);
            let query = player.query(&config);

            let report = pipeline.run(&query, Some(question)).await?;
            print_report(&report);
        }
        Commands::History { player, limit } => {
            let storage = StorageConfig::new(config.data_dir.clone());
            let records = FeedbackLog::new(&storage).recent(player.as_deref(), limit)?;

            if records.is_empty() {
                println!("No feedback recorded yet.");
                println!("Use `coach` or `ask` to generate some.");
            } else {
                println!("=== Feedback History ({} entries) ===\n", records.len());
                for record in records {
                    println!(
                        "{}  {}  match {}  [{}]",
                        record.created_at.format("%Y-%m-%d %H:%M"),
                        record.player,
                        record.match_id,
                        record.model
                    );
                    if let Some(question) = &record.question {
                        println!("  Q: {}", question);
                    }
                    println!("  {}\n", record.feedback.replace('\n', "\n  "));
                }
            }
        }
        Commands::Debug { action } => match action {
            DebugAction::ParseFixture { path, player } => {
                tracing::info!("Parsing fixture: {}", path);
                let document = pipeline::load_document(Path::new(&path))?;
                let analysis = pipeline::analyze(&document, &player)?;
                println!("{}", serde_json::to_string_pretty(&analysis)?);
            }
        },
    }

    Ok(())
}
