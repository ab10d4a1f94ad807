// src/utils/env.rs
use log::{info, warn};
use std::path::{Path, PathBuf};

const ENV_PATHS: [&str; 3] = [".env", ".env.local", "../.env"];

/// What `load_env` found. Kept so it can be logged once the logger is up.
#[derive(Debug, Default)]
pub struct EnvLoad {
    pub loaded: Option<PathBuf>,
    pub failures: Vec<(PathBuf, String)>,
}

impl EnvLoad {
    pub fn log(&self) {
        for (path, error) in &self.failures {
            warn!("Failed to load environment from {}: {}", path.display(), error);
        }
        match &self.loaded {
            Some(path) => info!("Loaded environment variables from {}", path.display()),
            None => info!("No .env file found, using environment variables from system"),
        }
    }
}

/// Loads the first `.env` file found. Variables already set in the process
/// environment take precedence over the file.
pub fn load_env() -> EnvLoad {
    load_env_from(&ENV_PATHS.map(Path::new))
}

/// Tries `paths` in order; the first file that parses wins.
pub fn load_env_from(paths: &[&Path]) -> EnvLoad {
    let mut outcome = EnvLoad::default();
    for path in paths.iter().filter(|p| p.exists()) {
        match dotenv::from_path(path) {
            Ok(()) => {
                outcome.loaded = Some(path.to_path_buf());
                break;
            }
            Err(e) => outcome.failures.push((path.to_path_buf(), e.to_string())),
        }
    }
    outcome
}
