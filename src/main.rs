//! COVID-19 Prediction CLI
//!
//! Predicts total imputed cases and total deaths from current metrics and
//! summarizes the historical dataset.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use covid::{Config, Result};

#[derive(Parser)]
#[command(name = "covid")]
#[command(about = "COVID-19 total case and death prediction", long_about = None)]
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
    /// Predict total cases or total deaths
    Predict {
        /// case or death
        target: Target,
        /// JSON object of inputs keyed by column name
        #[arg(long)]
        input: Option<String>,
        /// Override one input, e.g. --set fullyVaccinated=9400000
        #[arg(long = "set", value_name = "NAME=VALUE")]
        sets: Vec<String>,
        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
    /// List model inputs with their bounds
    Fields {
        /// case or death
        target: Target,
    },
    /// Headline figures for a date range
    Overview {
        /// First date (inclusive), defaults to the earliest row
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Last date (inclusive), defaults to the latest row
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// Per-date values of one column
    Series {
        /// Column name, e.g. imputed_total_cases
        column: String,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// Export the dataset as CSV
    Export {
        /// Output path
        output: String,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// Model management commands
    Model {
        #[command(subcommand)]
        action: ModelCommands,
    },
    /// Write the default config
    Init,
}

#[derive(Subcommand)]
enum ModelCommands {
    /// Show model and preprocessing configuration
    Info {
        /// case or death
        target: Target,
    },
}

#[derive(Clone, Copy, Debug)]
enum Target {
    Case,
    Death,
}

impl std::str::FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "case" | "cases" => Ok(Target::Case),
            "death" | "deaths" => Ok(Target::Death),
            _ => Err(format!("Unknown target: {}. Use case or death.", s)),
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Use text or json.", s)),
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

    // Load or create config
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

    match run(cli.command, &config, &cli.config) {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Exit status 2 marks a prediction that ran but reported a failure
fn run(command: Commands, config: &Config, config_path: &str) -> Result<i32> {
    match command {
        Commands::Predict {
            target,
            input,
            sets,
            format,
        } => {
            let outcome = match target {
                Target::Case => commands::predict::<covid::features::CaseFeatures>(
                    &config.case,
                    input,
                    &sets,
                    format,
                )?,
                Target::Death => commands::predict::<covid::features::DeathFeatures>(
                    &config.death,
                    input,
                    &sets,
                    format,
                )?,
            };
            return Ok(if outcome.is_success() { 0 } else { 2 });
        }
        Commands::Fields { target } => match target {
            Target::Case => commands::fields::<covid::features::CaseFeatures>()?,
            Target::Death => commands::fields::<covid::features::DeathFeatures>()?,
        },
        Commands::Overview { from, to } => commands::overview(config, from, to)?,
        Commands::Series { column, from, to } => commands::series(config, &column, from, to)?,
        Commands::Export { output, from, to } => commands::export(config, &output, from, to)?,
        Commands::Model { action } => match action {
            ModelCommands::Info { target } => match target {
                Target::Case => commands::model_info(&config.case, "case")?,
                Target::Death => commands::model_info(&config.death, "death")?,
            },
        },
        Commands::Init => commands::init(config_path)?,
    }
    Ok(0)
}

mod commands {
    use super::*;
    use covid::data::{CovidDataset, HeadlineMetrics};
    use covid::features::FeatureRecord;
    use covid::model::artifact_path;
    use covid::predict::{Pipeline, PredictionOutcome};
    use covid::{CovidError, PipelineConfig};

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        println!("\nNext steps:");
        println!("  1. Place the exported models under assets/model/");
        println!("  2. Run 'covid fields case' to see the inputs");
        println!("  3. Run 'covid predict case --set fullyVaccinated=9400000'");

        Ok(())
    }

    /// Split `name=value`
    fn parse_assignment(raw: &str) -> Result<(&str, f64)> {
        let (name, value) = raw
            .split_once('=')
            .ok_or_else(|| CovidError::Parse(format!("Expected NAME=VALUE, got {}", raw)))?;
        let value = value
            .trim()
            .parse()
            .map_err(|_| CovidError::Parse(format!("Invalid number for {}: {}", name, value)))?;
        Ok((name.trim(), value))
    }

    pub fn predict<F: FeatureRecord + serde::Serialize>(
        config: &PipelineConfig,
        input: Option<String>,
        sets: &[String],
        format: OutputFormat,
    ) -> Result<PredictionOutcome> {
        let mut features = match input {
            Some(path) => F::from_json(&std::fs::read_to_string(&path)?)?,
            None => F::default(),
        };
        for raw in sets {
            let (name, value) = parse_assignment(raw)?;
            features.set(name, value)?;
        }

        let pipeline = Pipeline::<F>::from_config(config)?;
        let outcome = pipeline.run(&features);

        match format {
            OutputFormat::Text => {
                if outcome.is_success() {
                    println!("{}", outcome);
                } else {
                    eprintln!("{}", outcome);
                }
            }
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "target": F::TARGET,
                    "input": features,
                    "outcome": outcome,
                });
                println!("{}", serde_json::to_string_pretty(&json)?);
            }
        }

        Ok(outcome)
    }

    pub fn fields<F: FeatureRecord>() -> Result<()> {
        println!("Inputs for {} (model column order)", F::TARGET);
        println!("───────────────────────────────────────────────────────────────");
        for spec in F::FIELDS {
            let max = spec
                .max
                .map(|m| m.to_string())
                .unwrap_or_else(|| "-".to_string());
            let kind = if spec.integer { "int" } else { "float" };
            println!(
                "  {:<32} {:>5}  min {:<10} max {:<6} default {}",
                spec.name, kind, spec.min, max, spec.default
            );
            println!("      {}", spec.help);
        }
        Ok(())
    }

    fn load_range(
        config: &Config,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<CovidDataset> {
        CovidDataset::load(&config.data.dataset_path)?.select(from, to)
    }

    pub fn overview(config: &Config, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<()> {
        let data = load_range(config, from, to)?;

        println!("Overview of COVID-19 Data");
        println!("───────────────────────────────");
        match data.date_span() {
            Some((first, last)) => println!("  Range: {} to {} ({} rows)", first, last, data.len()),
            None => {
                println!("  No data found for the selected date range.");
                return Ok(());
            }
        }
        print!("{}", HeadlineMetrics::from_dataset(&data));

        Ok(())
    }

    pub fn series(
        config: &Config,
        column: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<()> {
        let data = load_range(config, from, to)?;
        if data.column_index(column).is_none() {
            return Err(CovidError::Parse(format!(
                "Unknown column: {}. Available: {}",
                column,
                data.columns().join(", ")
            )));
        }

        println!("{:<12} {:>16}", "date", column);
        for (date, value) in data.series(column)? {
            println!("{:<12} {:>16}", date.to_string(), value);
        }
        Ok(())
    }

    pub fn export(
        config: &Config,
        output: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<()> {
        let data = load_range(config, from, to)?;
        let file = std::fs::File::create(output)?;
        data.write_csv(file)?;
        println!("Exported {} rows to {}", data.len(), output);
        Ok(())
    }

    pub fn model_info(config: &PipelineConfig, name: &str) -> Result<()> {
        let artifact = artifact_path(&config.model);

        println!("Model Information ({})", name);
        println!("───────────────────────────────");
        println!("  Kind:           {}", config.model.kind);
        println!("  Path:           {}", artifact.display());
        println!("  Present:        {}", artifact.exists());
        if !config.model.hidden_dims.is_empty() {
            println!("  Hidden dims:    {:?}", config.model.hidden_dims);
        }
        println!("  Baseline:");
        for (feature, value) in config.baseline.iter() {
            println!("    {:<28} {}", feature, value);
        }
        if !config.log_offsets.is_empty() {
            println!("  Log offsets:");
            for (feature, offset) in config.log_offsets.iter() {
                println!("    {:<28} ln(x + {})", feature, offset);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const DAILY: &str = "\
,imputed_total_cases,totalVaccinations
2021-01-01,100,
2021-01-02,150,10
2021-01-03,300,30
";

    fn config_in(dir: &std::path::Path) -> Config {
        let dataset = dir.join("daily.csv");
        std::fs::write(&dataset, DAILY).unwrap();

        let mut config = Config::default();
        config.data.dataset_path = dataset;
        config.case.model.path = dir.join("absent_case_model.json");
        config.death.model.path = dir.join("absent_death_model.json");
        config
    }

    fn predict(target: Target, sets: &[&str]) -> Commands {
        Commands::Predict {
            target,
            input: None,
            sets: sets.iter().map(|s| s.to_string()).collect(),
            format: OutputFormat::Text,
        }
    }

    #[test]
    fn test_failed_prediction_exits_with_two() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        // the model artifact is missing, so the pipeline reports a failure
        let code = run(predict(Target::Death, &[]), &config, "unused.toml").unwrap();
        assert_eq!(code, 2);
    }

    #[test]
    fn test_invalid_input_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        assert!(run(predict(Target::Case, &["month=13"]), &config, "unused.toml").is_err());
        assert!(run(predict(Target::Case, &["month"]), &config, "unused.toml").is_err());
    }

    #[test]
    fn test_series_command() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        let series = |column: &str, from: Option<NaiveDate>| Commands::Series {
            column: column.to_string(),
            from,
            to: None,
        };
        let after_last = NaiveDate::from_ymd_opt(2021, 6, 1);

        assert_eq!(run(series("imputed_total_cases", None), &config, "unused.toml").unwrap(), 0);
        assert_eq!(
            run(series("totalVaccinations", after_last), &config, "unused.toml").unwrap(),
            0
        );
        assert!(run(series("no_such_column", None), &config, "unused.toml").is_err());
    }

    #[test]
    fn test_missing_dataset_is_an_error() {
        let mut config = Config::default();
        config.data.dataset_path = PathBuf::from("/nonexistent/daily.csv");
        let overview = Commands::Overview {
            from: None,
            to: None,
        };
        assert!(run(overview, &config, "unused.toml").is_err());
    }
}
