// SPDX-License-Identifier: MIT

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use skiplogic_rs::condition::parse_condition;
use skiplogic_rs::config::{Settings, ENV_CONFIG};
use skiplogic_rs::error::SurveyError;
use skiplogic_rs::survey::{evaluate_response, validate_survey, SurveyLoader, SurveyWalker};

use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Settings file (defaults to $SKIPLOGIC_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse a condition and print its canonical form
    Parse {
        condition: String,

        /// Print the syntax tree as JSON
        #[arg(long)]
        json: bool,
    },
    /// Evaluate a condition against an uploaded response
    Eval {
        condition: String,

        #[arg(short, long)]
        survey: PathBuf,

        #[arg(short, long)]
        responses: PathBuf,

        /// Evaluate inside a repeatable set iteration, e.g. `meals:0`
        #[arg(long)]
        iteration: Option<String>,
    },
    /// Check every condition in a survey definition
    Validate {
        #[arg(short, long)]
        survey: PathBuf,
    },
    /// Replay a response and report what should have been displayed
    Walk {
        #[arg(short, long)]
        survey: PathBuf,

        #[arg(short, long)]
        responses: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    let config_path = args
        .config
        .or_else(|| std::env::var(ENV_CONFIG).ok().map(PathBuf::from));
    let settings = Settings::load(config_path.as_deref()).context("Failed to load settings")?;
    let loader = SurveyLoader::new();

    match args.command {
        Commands::Parse { condition, json } => {
            let sentence = parse_condition(&condition)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&sentence)?);
            } else {
                println!("{}", sentence);
            }
        }
        Commands::Eval {
            condition,
            survey,
            responses,
            iteration,
        } => {
            let def = loader
                .load_survey(&survey)
                .with_context(|| format!("Failed to load survey {}", survey.display()))?;
            let response = loader
                .load_response(&responses)
                .with_context(|| format!("Failed to load responses {}", responses.display()))?;
            let scope = match iteration.as_deref() {
                Some(selector) => {
                    let Some((set_id, index)) = selector.split_once(':') else {
                        bail!("--iteration expects SET:INDEX, got '{}'", selector);
                    };
                    let index: usize = index
                        .parse()
                        .with_context(|| format!("Invalid iteration index '{}'", index))?;
                    Some((set_id, index))
                }
                None => None,
            };

            println!("{}", evaluate_response(&def, &response, scope, &condition)?);
        }
        Commands::Validate { survey } => {
            let def = loader
                .load_survey(&survey)
                .with_context(|| format!("Failed to load survey {}", survey.display()))?;
            let issues = validate_survey(&def);
            for issue in &issues {
                println!("{}", issue);
            }
            if !issues.is_empty() {
                return Err(SurveyError::Invalid {
                    survey_id: def.id,
                    count: issues.len(),
                }
                .into());
            }
            log::info!("Survey '{}' is valid", def.id);
        }
        Commands::Walk {
            survey,
            responses,
            json,
        } => {
            let def = loader
                .load_survey(&survey)
                .with_context(|| format!("Failed to load survey {}", survey.display()))?;
            let response = loader
                .load_response(&responses)
                .with_context(|| format!("Failed to load responses {}", responses.display()))?;

            let walker = SurveyWalker::new(settings);
            let report = walker.walk(&def, &response).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for outcome in &report.outcomes {
                    let label = match outcome.iteration {
                        Some(i) => format!("{}[{}]", outcome.item_id, i),
                        None => outcome.item_id.clone(),
                    };
                    println!("{}: {}", label, outcome.status);
                }
                for issue in &report.issues {
                    println!("issue {}", issue);
                }
            }
        }
    }

    Ok(())
}
