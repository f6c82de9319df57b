pub mod geo;
pub mod inference;
pub mod mission;
pub mod notice;
pub mod settings;
pub mod tracking;
pub mod utils;
pub mod visibility;
pub mod vision;

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};

use inference::{ArtifactHandle, ModelCache};
use mission::{MissionCatalog, MissionController};
use settings::SettingsStore;
use vision::{CaptureBuffer, CaptureEncoding};

pub use geo::GeoPoint;
pub use notice::StatusNotice;
pub use settings::EngineSettings;

const SETTINGS_ENV: &str = "SPOTQUEST_SETTINGS";
const MISSIONS_ENV: &str = "SPOTQUEST_MISSIONS";
const DEBUG_ENV: &str = "SPOTQUEST_DEBUG";

const USAGE: &str = "usage: spotquest <mission-id> <image> [model.json]\n       spotquest missions";

/// Default level is `Info`, `Debug` with `SPOTQUEST_DEBUG` set. `RUST_LOG`
/// overrides both.
pub fn init_logging() {
    let level = if env::var_os(DEBUG_ENV).is_some() {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init();
}

/// Command-line driver: scores one photo against one mission.
pub fn run() -> Result<()> {
    init_logging();
    log::info!("SpotQuest starting up...");

    let args: Vec<String> = env::args().skip(1).collect();
    let catalog = load_catalog()?;

    if args.first().map(String::as_str) == Some("missions") {
        for id in catalog.ids() {
            if let Some(config) = catalog.get(id) {
                println!("{:<10} {} ({})", config.id, config.title, config.hint);
            }
        }
        return Ok(());
    }

    let (mission_id, image_path) = match (args.first(), args.get(1)) {
        (Some(mission), Some(image)) => (mission.clone(), PathBuf::from(image)),
        _ => return Err(anyhow!(USAGE)),
    };

    let store = SettingsStore::new(settings_path())?;
    let settings = store.engine();
    settings.validate()?;

    let model_path = args
        .get(2)
        .map(PathBuf::from)
        .or_else(|| settings.model_path.clone())
        .ok_or_else(|| anyhow!("no model artifact given and none configured in settings\n{USAGE}"))?;

    let config = catalog
        .get(&mission_id)
        .cloned()
        .ok_or_else(|| anyhow!("unknown mission '{mission_id}'"))?;

    let capture = read_capture(&image_path)?;

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(async move {
        let models = ModelCache::global();
        models
            .load_model(&ArtifactHandle::Path(model_path.clone()))
            .await
            .with_context(|| format!("Failed to load model {}", model_path.display()))?;

        let controller = MissionController::new(config, models, &settings);
        controller.start().await?;
        let attempt = controller.on_captured(capture).await?;
        log::info!(
            "mission {} attempt {} finished: {:?}",
            mission_id,
            attempt.attempt_number,
            attempt.outcome
        );

        let snapshot = controller.snapshot().await;
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        if let Some(notice) = snapshot.notice {
            eprintln!("{}", notice.message());
        }
        Ok::<_, anyhow::Error>(())
    })
}

fn settings_path() -> PathBuf {
    env::var_os(SETTINGS_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("spotquest-settings.json"))
}

fn load_catalog() -> Result<MissionCatalog> {
    match env::var_os(MISSIONS_ENV) {
        Some(path) => MissionCatalog::load(Path::new(&path)),
        None => Ok(MissionCatalog::builtin()),
    }
}

fn read_capture(path: &Path) -> Result<CaptureBuffer> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();
    let encoding = CaptureEncoding::from_extension(extension)
        .ok_or_else(|| anyhow!("unsupported capture format '{}'", path.display()))?;
    let bytes = fs::read(path).with_context(|| format!("Failed to read capture {}", path.display()))?;
    Ok(CaptureBuffer::encoded(bytes, encoding))
}
