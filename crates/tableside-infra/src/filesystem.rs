//! Data directory layout.

use std::path::PathBuf;

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `TABLESIDE_DATA_DIR` environment variable
/// 2. `~/.tableside`
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("TABLESIDE_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".tableside");
    }

    // Last resort: current directory
    PathBuf::from(".tableside")
}

/// Create the data directory if it does not exist yet.
pub async fn ensure_data_dir(data_dir: &std::path::Path) -> Result<(), std::io::Error> {
    tokio::fs::create_dir_all(data_dir).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_resolve_data_dir_ends_with_tableside_or_env() {
        let dir = resolve_data_dir();
        match std::env::var("TABLESIDE_DATA_DIR") {
            Ok(env) => assert_eq!(dir, PathBuf::from(env)),
            Err(_) => assert!(dir.ends_with(".tableside")),
        }
    }

    #[tokio::test]
    async fn test_ensure_data_dir_creates_nested() {
        let tmp = tempdir().unwrap();
        let nested = tmp.path().join("a").join("b");
        ensure_data_dir(&nested).await.unwrap();
        assert!(nested.is_dir());
        // Second call is a no-op.
        ensure_data_dir(&nested).await.unwrap();
    }
}
