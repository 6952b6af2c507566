//! Gridiron projection CLI
//!
//! Per-player NFL stat and fantasy point projections for an upcoming matchup.

use clap::{Parser, Subcommand};
use gridiron::{Config, Result, TargetMode};

#[derive(Parser)]
#[command(name = "gridiron")]
#[command(about = "NFL player projections from season averages and matchup context", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Data management commands
    Data {
        #[command(subcommand)]
        action: DataCommands,
    },
    /// Train one model per position cohort
    Train {
        /// Predict per-counter stats or a single fantasy score
        #[arg(long, default_value = "counters")]
        mode: TargetMode,
    },
    /// Predict a player's production against an opponent
    Predict {
        /// Player name, full ("Aaron Rodgers") or short ("A.Rodgers")
        player: String,
        /// Opponent team code
        opponent: String,
        /// home or away
        venue: String,
        /// Position, when the short name matches more than one player
        #[arg(long)]
        position: Option<String>,
        #[arg(long, default_value = "counters")]
        mode: TargetMode,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Model management commands
    Model {
        #[command(subcommand)]
        action: ModelCommands,
    },
    /// Initialize a new project with default config
    Init,
}

#[derive(Subcommand)]
enum DataCommands {
    /// Import a box score feed (JSON array or one JSON object per line)
    Import {
        /// Feed file path
        file: String,
    },
    /// Show record store status
    Status,
    /// Delete every stored observation
    Clear,
}

#[derive(Subcommand)]
enum ModelCommands {
    /// Show information about the trained artifacts
    Info {
        #[arg(long, default_value = "counters")]
        mode: TargetMode,
    },
}

#[derive(Clone, Debug)]
enum OutputFormat {
    Table,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Use table or json.", s)),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or fall back to defaults
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    let result = match cli.command {
        Commands::Data { action } => match action {
            DataCommands::Import { file } => commands::data_import(&config, &file),
            DataCommands::Status => commands::data_status(&config),
            DataCommands::Clear => commands::data_clear(&config),
        },
        Commands::Train { mode } => commands::train(&config, mode),
        Commands::Predict {
            player,
            opponent,
            venue,
            position,
            mode,
            format,
        } => commands::predict(&config, &player, &opponent, &venue, position, mode, format),
        Commands::Model { action } => match action {
            ModelCommands::Info { mode } => commands::model_info(&config, mode),
        },
        Commands::Init => commands::init(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use gridiron::data::{load_feed, RecordStore};
    use gridiron::predict::{format_prediction, PredictionQuery, Predictor};
    use gridiron::training::ModelTrainer;
    use gridiron::Position;

    fn open_store(config: &Config) -> Result<RecordStore> {
        RecordStore::open(&config.data.database_path)
    }

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all("data")?;
        std::fs::create_dir_all(&config.data.model_dir)?;
        println!("Created data/ and {}/ directories", config.data.model_dir);

        println!("\nNext steps:");
        println!("  1. Edit {} to adjust tiers and scoring", config_path);
        println!("  2. Run 'gridiron data import <FILE>' to load box scores");
        println!("  3. Run 'gridiron train' to train the cohort models");
        println!("  4. Run 'gridiron predict \"Aaron Rodgers\" KC home' to make predictions");

        Ok(())
    }

    pub fn data_import(config: &Config, file: &str) -> Result<()> {
        let store = open_store(config)?;

        println!("Importing {}...", file);
        let import = load_feed(file)?;
        let count = store.upsert_observations(&import.observations)?;

        println!("Stored {} observations", count);
        if import.skipped_positions > 0 {
            println!("  Skipped {} records outside QB/RB/WR/TE", import.skipped_positions);
        }
        if import.malformed > 0 {
            println!("  Skipped {} malformed records", import.malformed);
        }

        Ok(())
    }

    pub fn data_status(config: &Config) -> Result<()> {
        let store = open_store(config)?;
        let stats = store.stats()?;

        println!("Record Store Status");
        println!("───────────────────────────────");
        println!("  Path:          {}", config.data.database_path);
        println!("  Players:       {}", stats.player_count);
        println!("  Observations:  {}", stats.observation_count);
        if let (Some(first), Some(last)) = (stats.first_week, stats.last_week) {
            println!("  Weeks:         {} to {}", first, last);
        }

        Ok(())
    }

    pub fn data_clear(config: &Config) -> Result<()> {
        let store = open_store(config)?;
        let removed = store.clear()?;
        println!("Removed {} observations", removed);
        Ok(())
    }

    pub fn train(config: &Config, mode: TargetMode) -> Result<()> {
        let store = open_store(config)?;
        let observations = store.all_observations()?;
        println!("Loaded {} observations", observations.len());

        let trainer = ModelTrainer::from_config(config);
        let artifacts = trainer.train_all(&observations, mode)?;
        let paths = ModelTrainer::persist_all(&artifacts, &config.data.model_dir)?;

        println!("\nTraining Complete");
        println!("───────────────────────────────");
        for (artifact, path) in artifacts.iter().zip(paths.iter()) {
            println!(
                "  {:<6} {:>5} rows ({} excluded)  {}",
                artifact.cohort,
                artifact.rows_used,
                artifact.rows_excluded,
                path.display()
            );
            if let Some(metrics) = &artifact.metrics {
                println!("         {}", metrics);
            }
        }

        Ok(())
    }

    pub fn predict(
        config: &Config,
        player: &str,
        opponent: &str,
        venue: &str,
        position: Option<String>,
        mode: TargetMode,
        format: OutputFormat,
    ) -> Result<()> {
        let predictor = Predictor::load(&config.data.model_dir, mode)?;

        let mut query = PredictionQuery::new(player, opponent, venue);
        if let Some(code) = position {
            query = query.with_position(Position::parse(&code)?);
        }

        let prediction = predictor.predict(&query)?;
        match format {
            OutputFormat::Table => println!("{}", format_prediction(&prediction)),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&prediction)?),
        }

        Ok(())
    }

    pub fn model_info(config: &Config, mode: TargetMode) -> Result<()> {
        let predictor = Predictor::load(&config.data.model_dir, mode)?;

        println!("Model Information ({} mode)", predictor.mode());
        println!("───────────────────────────────");
        for artifact in predictor.artifacts() {
            println!("  Cohort:     {}", artifact.cohort);
            println!("  Estimator:  {}", artifact.estimator);
            println!("  Trained:    {}", artifact.trained_at.format("%Y-%m-%d %H:%M UTC"));
            println!(
                "  Rows:       {} used, {} excluded",
                artifact.rows_used, artifact.rows_excluded
            );
            println!("  Players:    {}", artifact.profiles.len());
            println!("  Features:   {}", artifact.schema.feature_names().join(", "));
            println!("  Targets:    {}", artifact.schema.target_names().join(", "));
            if let Some(metrics) = &artifact.metrics {
                println!("  {}", metrics);
            }
            println!();
        }

        Ok(())
    }
}
