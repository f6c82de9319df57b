use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock, time::Duration};

pub const DEFAULT_FACING_THRESHOLD_DEGREES: f64 = 30.0;
pub const DEFAULT_HEADING_DEBOUNCE_DEGREES: f64 = 2.0;
pub const DEFAULT_MAX_RENDER_DISTANCE_METERS: f64 = 100.0;
pub const DEFAULT_ANALYSIS_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineSettings {
    pub facing_threshold_degrees: f64,
    pub heading_debounce_degrees: f64,
    pub max_render_distance_meters: f64,
    pub analysis_timeout_ms: u64,
    /// Classifier artifact to load at startup.
    pub model_path: Option<PathBuf>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            facing_threshold_degrees: DEFAULT_FACING_THRESHOLD_DEGREES,
            heading_debounce_degrees: DEFAULT_HEADING_DEBOUNCE_DEGREES,
            max_render_distance_meters: DEFAULT_MAX_RENDER_DISTANCE_METERS,
            analysis_timeout_ms: DEFAULT_ANALYSIS_TIMEOUT_MS,
            model_path: None,
        }
    }
}

impl EngineSettings {
    pub fn analysis_timeout(&self) -> Duration {
        Duration::from_millis(self.analysis_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=180.0).contains(&self.facing_threshold_degrees) {
            return Err(anyhow!(
                "facingThresholdDegrees must be within [0, 180], got {}",
                self.facing_threshold_degrees
            ));
        }
        if !(self.heading_debounce_degrees >= 0.0 && self.heading_debounce_degrees < 180.0) {
            return Err(anyhow!(
                "headingDebounceDegrees must be within [0, 180), got {}",
                self.heading_debounce_degrees
            ));
        }
        if !(self.max_render_distance_meters > 0.0) {
            return Err(anyhow!(
                "maxRenderDistanceMeters must be positive, got {}",
                self.max_render_distance_meters
            ));
        }
        if self.analysis_timeout_ms == 0 {
            return Err(anyhow!("analysisTimeoutMs must be greater than zero"));
        }
        Ok(())
    }
}

/// JSON-backed settings file. A missing file means defaults.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<EngineSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            read_settings(&path)?
        } else {
            EngineSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn engine(&self) -> EngineSettings {
        match self.data.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn update(&self, settings: EngineSettings) -> Result<()> {
        settings.validate()?;
        let mut guard = self
            .data
            .write()
            .map_err(|_| anyhow!("settings lock poisoned"))?;
        self.persist(&settings)?;
        *guard = settings;
        Ok(())
    }

    pub fn reload(&self) -> Result<()> {
        let data = read_settings(&self.path)?;
        let mut guard = self
            .data
            .write()
            .map_err(|_| anyhow!("settings lock poisoned"))?;
        *guard = data;
        Ok(())
    }

    fn persist(&self, data: &EngineSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

fn read_settings(path: &PathBuf) -> Result<EngineSettings> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings from {}", path.display()))?;
    let settings: EngineSettings = serde_json::from_str(&contents)
        .with_context(|| format!("Malformed settings in {}", path.display()))?;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("spotquest-{}-{}.json", name, uuid::Uuid::new_v4()))
    }

    #[test]
    fn missing_file_yields_defaults() {
        let store = SettingsStore::new(temp_path("missing")).unwrap();
        assert_eq!(store.engine(), EngineSettings::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let path = temp_path("partial");
        fs::write(&path, r#"{ "maxRenderDistanceMeters": 250.0 }"#).unwrap();

        let store = SettingsStore::new(path.clone()).unwrap();
        let settings = store.engine();
        assert_eq!(settings.max_render_distance_meters, 250.0);
        assert_eq!(settings.facing_threshold_degrees, DEFAULT_FACING_THRESHOLD_DEGREES);
        assert_eq!(settings.analysis_timeout(), Duration::from_secs(10));

        fs::remove_file(path).ok();
    }

    #[test]
    fn update_persists_and_reloads() {
        let path = temp_path("update");
        let store = SettingsStore::new(path.clone()).unwrap();

        let mut settings = store.engine();
        settings.facing_threshold_degrees = 45.0;
        store.update(settings).unwrap();

        let reopened = SettingsStore::new(path.clone()).unwrap();
        assert_eq!(reopened.engine().facing_threshold_degrees, 45.0);

        fs::write(&path, r#"{ "facingThresholdDegrees": 10.0 }"#).unwrap();
        reopened.reload().unwrap();
        assert_eq!(reopened.engine().facing_threshold_degrees, 10.0);

        fs::remove_file(path).ok();
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let store = SettingsStore::new(temp_path("invalid")).unwrap();
        let mut settings = store.engine();
        settings.analysis_timeout_ms = 0;
        assert!(store.update(settings).is_err());
        assert_eq!(store.engine(), EngineSettings::default());
    }
}
