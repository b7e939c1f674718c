//! FXLens - curated-query analytics for EUR/USD forex data.

use anyhow::{bail, Context};
use fxlens::app::{Answer, Dashboard};
use fxlens::cli::{Cli, Command, UnansweredAction};
use fxlens::config::Config;
use fxlens::db::{self, DatabaseClient, FailingDatabaseClient, MockDatabaseClient};
use fxlens::error::FxLensError;
use fxlens::llm::Atlas;
use fxlens::logging::{self, LogTarget};
use fxlens::output::{AnswerOutput, OutputFormat};
use fxlens::persistence::UnansweredLog;
use fxlens::registry::CuratedStore;
use fxlens::tui;
use tracing::{error, info, warn};

/// Exit code for a question nothing could answer.
const EXIT_MISS: i32 = 2;

const NO_DATABASE: &str = "No database configured. Set DATABASE_URL, pass --db-url, or use --mock-db.";

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse_args();

    logging::init(if cli.is_tui() {
        LogTarget::File
    } else {
        LogTarget::Stderr
    });

    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    let config = load_config(&cli)?;

    match cli.command() {
        Command::Tui => {
            let params = cli.query_params(&config);
            params.validate()?;
            let dashboard = build_dashboard(&cli, &config).await?;
            let db_label = db_label(&cli, &config);
            tui::run(dashboard, params, db_label).await?;
            Ok(0)
        }
        Command::Ask {
            question,
            json,
            limit,
        } => {
            let question = question.join(" ");
            if question.trim().is_empty() {
                bail!("Please enter a question");
            }
            let params = cli.query_params(&config);
            let output = AnswerOutput::new(OutputFormat::from_json_flag(json));
            let dashboard = build_dashboard(&cli, &config).await?;

            let code = match dashboard.ask(&question, &params, limit).await {
                Ok(answer) => {
                    print!("{}", output.answer(&answer, &params));
                    match answer {
                        Answer::Miss(_) => EXIT_MISS,
                        Answer::Hit(_) | Answer::Generated(_) => 0,
                    }
                }
                Err(e @ (FxLensError::Query(_) | FxLensError::Connection(_))) => {
                    print!("{}", output.failure(&question, &e));
                    1
                }
                Err(e) => return Err(e.into()),
            };
            dashboard.close().await?;
            Ok(code)
        }
        Command::Queries { json } => {
            let store = load_store(&config)?;
            print!(
                "{}",
                AnswerOutput::new(OutputFormat::from_json_flag(json)).queries(&store)
            );
            Ok(0)
        }
        Command::Unanswered { action } => {
            let log = UnansweredLog::new(&config.log.unanswered_path);
            match action {
                UnansweredAction::List { json } => {
                    let records = log.read_all()?;
                    print!(
                        "{}",
                        AnswerOutput::new(OutputFormat::from_json_flag(json)).unanswered(&records)
                    );
                }
                UnansweredAction::Path => println!("{}", log.path().display()),
                UnansweredAction::Clear { yes } => {
                    if !yes {
                        bail!(
                            "Refusing to clear {} without --yes",
                            log.path().display()
                        );
                    }
                    let removed = log.count()?;
                    log.clear()?;
                    info!("Cleared {} unanswered questions", removed);
                    println!("Cleared {removed} unanswered questions.");
                }
            }
            Ok(0)
        }
        Command::Health => health(&cli, &config).await,
    }
}

/// Config file, then environment, then CLI flags.
fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let mut config = Config::load_from_file(&config_path)?;
    config.apply_env_overrides()?;
    cli.apply_to_config(&mut config)?;
    Ok(config)
}

fn load_store(config: &Config) -> anyhow::Result<CuratedStore> {
    CuratedStore::load_dir(&config.registry.dir).with_context(|| {
        format!(
            "Could not load curated queries from {}",
            config.registry.dir.display()
        )
    })
}

/// Opens the database without connecting. Questions that miss never touch
/// it, so an absent or unreachable database only fails curated and Atlas queries.
fn open_database(cli: &Cli, config: &Config) -> anyhow::Result<Box<dyn DatabaseClient>> {
    if cli.mock_db {
        info!("Using the built-in sample bars");
        return Ok(Box::new(MockDatabaseClient::new()));
    }
    if !config.database.is_configured() {
        warn!("No database configured; only unanswered questions can be handled");
        return Ok(Box::new(FailingDatabaseClient::new(NO_DATABASE)));
    }
    info!("Using database {}", config.database.display_string());
    Ok(db::connect_lazy(&config.database)?)
}

async fn build_dashboard(cli: &Cli, config: &Config) -> anyhow::Result<Dashboard> {
    let store = load_store(config)?;
    let db = open_database(cli, config)?;
    let log = UnansweredLog::new(&config.log.unanswered_path);

    let dashboard = Dashboard::new(store, db, log);
    if config.llm.enabled {
        Ok(dashboard.with_atlas(Atlas::from_config(&config.llm)?))
    } else {
        Ok(dashboard)
    }
}

fn db_label(cli: &Cli, config: &Config) -> String {
    if cli.mock_db {
        "sample data".to_string()
    } else if !config.database.is_configured() {
        "no database".to_string()
    } else {
        config.database.display_string()
    }
}

async fn health(cli: &Cli, config: &Config) -> anyhow::Result<i32> {
    let dashboard = build_dashboard(cli, config).await?;
    println!(
        "Curated queries: {} loaded from {}",
        dashboard.store().len(),
        config.registry.dir.display()
    );

    let db_ok = match dashboard.ping().await {
        Ok(()) => {
            println!("Database: ok ({})", db_label(cli, config));
            true
        }
        Err(e) => {
            println!("Database: {e}");
            false
        }
    };

    println!("Atlas: {}", dashboard.atlas_status().await);
    match dashboard.log().count() {
        Ok(count) => println!(
            "Unanswered log: {} questions in {}",
            count,
            dashboard.log().path().display()
        ),
        Err(e) => println!("Unanswered log: {e}"),
    }

    dashboard.close().await?;
    Ok(if db_ok { 0 } else { 1 })
}
