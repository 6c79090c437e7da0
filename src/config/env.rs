//! Environment variable handling and .env file management

use crate::error::{AppError, Result};
use std::path::Path;

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load .env from the working directory if it exists
    pub fn load_env_file(debug: bool) -> Result<()> {
        Self::load_from_path(Path::new(".env"), debug)
    }

    /// Load a specific env file if it exists; variables already set in the
    /// process environment keep their values
    pub fn load_from_path(path: &Path, debug: bool) -> Result<()> {
        if path.exists() {
            dotenv::from_path(path)
                .map_err(|e| AppError::config(format!("Failed to load {}: {}", path.display(), e)))?;

            if debug {
                eprintln!("Loaded configuration from {}", path.display());
            }
        } else if debug {
            eprintln!("No {} found, using defaults and CLI arguments", path.display());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_from_path_sets_unset_variables() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# comment").unwrap();
        writeln!(file, "ALB_ENV_TEST_LOADED=from-file").unwrap();
        writeln!(file, "ALB_ENV_TEST_KEPT=from-file").unwrap();
        file.flush().unwrap();

        std::env::set_var("ALB_ENV_TEST_KEPT", "from-process");
        EnvManager::load_from_path(file.path(), false).unwrap();

        assert_eq!(std::env::var("ALB_ENV_TEST_LOADED").unwrap(), "from-file");
        assert_eq!(std::env::var("ALB_ENV_TEST_KEPT").unwrap(), "from-process");

        std::env::remove_var("ALB_ENV_TEST_LOADED");
        std::env::remove_var("ALB_ENV_TEST_KEPT");
    }

    #[test]
    fn test_missing_file_is_not_an_error() {
        let missing = Path::new("/nonexistent/.env");
        assert!(EnvManager::load_from_path(missing, true).is_ok());
    }
}
