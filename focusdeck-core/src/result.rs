//! Result file written at the end of a headless run.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const RESULT_PATH_ENV: &str = "FOCUSDECK_RESULT_PATH";

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
pub struct IntegrationResult {
    pub success: bool,
    pub message: String,
}

impl IntegrationResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Path from `FOCUSDECK_RESULT_PATH`, if set and non-empty.
pub fn result_path_from_env() -> Option<PathBuf> {
    std::env::var_os(RESULT_PATH_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result.json");
        IntegrationResult::failure("context 'stash' is not focusable")
            .write(&path)
            .unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"success\": false"));
        let back = IntegrationResult::read(&path).unwrap();
        assert!(!back.success);
        assert_eq!(back.message, "context 'stash' is not focusable");
    }

    #[test]
    fn test_read_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = IntegrationResult::read(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, crate::error::Error::Io(_)));
    }
}
