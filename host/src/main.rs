use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use log::{error, info};
use serde_json::{Map, Value};
use tokio::sync::watch;

use riglaunch::config::default_database_path;
use riglaunch::logging::{self, LogFormat};
use riglaunch::{
    load_config, ConfigError, DiskStore, LaunchOrchestrator, LiveGateway, Outcome,
    RigLaunchError, SqliteKv,
};

const USAGE: &str = "usage: riglaunch-host <config.json> [attribution.json] [deeplink.json]";

#[tokio::main]
async fn main() -> ExitCode {
    let format = LogFormat::from_env_value(std::env::var("RIGLAUNCH_LOG_FORMAT").ok().as_deref());
    logging::init(format);

    let args: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();
    let Some(config_path) = args.first() else {
        eprintln!("{}", USAGE);
        return ExitCode::from(2);
    };

    match run(config_path, args.get(1), args.get(2)).await {
        Ok(outcome) => match serde_json::to_string(&outcome) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("Failed to serialize outcome: {}", e);
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(
    config_path: &Path,
    attribution_path: Option<&PathBuf>,
    deeplink_path: Option<&PathBuf>,
) -> Result<Outcome, RigLaunchError> {
    let config = Arc::new(load_config(config_path)?);

    let db_path = std::env::var_os("RIGLAUNCH_DB")
        .map(PathBuf::from)
        .or_else(default_database_path)
        .ok_or_else(|| ConfigError::Validation {
            message: "Cannot determine a database path; set RIGLAUNCH_DB".to_string(),
        })?;
    let store = Arc::new(DiskStore::from_sqlite(SqliteKv::open(&db_path)?));
    let gateway = Arc::new(LiveGateway::new(Arc::clone(&config), store.clone())?);

    let orchestrator = LaunchOrchestrator::new(config, store, gateway)?;
    let (_online_tx, online) = watch::channel(true);
    orchestrator.start(online);

    if let Some(path) = deeplink_path {
        orchestrator.buffer().receive_raw_deeplink(&read_json_map(path)?);
    }
    match attribution_path {
        Some(path) => orchestrator
            .buffer()
            .receive_raw_attribution(&read_json_map(path)?),
        None => {
            info!("No attribution given, running on stored state");
            orchestrator.trigger();
        }
    }

    let outcome = orchestrator.wait_resolved().await;
    orchestrator.shutdown();
    Ok(outcome)
}

fn read_json_map(path: &Path) -> Result<Map<String, Value>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    match serde_json::from_str(&content)? {
        Value::Object(map) => Ok(map),
        _ => Err(ConfigError::Validation {
            message: format!("'{}' must contain a JSON object", path.display()),
        }),
    }
}
