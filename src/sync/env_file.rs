use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Parses a `KEY=VALUE` env file. Blank lines and `#` comments are skipped;
/// single or double quotes around a value are stripped. An unreadable file
/// yields an empty map, so a missing untracked file is never an error.
pub async fn load_env_file(path: &Path) -> HashMap<String, String> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(_) => {
            debug!("No env file at {:?}", path);
            return HashMap::new();
        }
    };

    let mut parsed = HashMap::new();
    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let Some((key, value)) = trimmed.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let mut value = value.trim();
        if (value.starts_with('"') && value.ends_with('"') && value.len() >= 2)
            || (value.starts_with('\'') && value.ends_with('\'') && value.len() >= 2)
        {
            value = &value[1..value.len() - 1];
        }
        parsed.insert(key.to_string(), value.to_string());
    }
    parsed
}

/// The API key comes from the process environment first, then the local
/// untracked env file.
pub async fn resolve_api_key(env_file: &Path) -> Option<String> {
    if let Ok(key) = std::env::var("CDN_API_KEY")
        && !key.is_empty()
    {
        return Some(key);
    }
    load_env_file(env_file).await.remove("CDN_API_KEY")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_parses_comments_quotes_and_blank_lines() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".env");
        std::fs::write(
            &path,
            "# local secrets\nCDN_API_KEY=\"sk_cdn_abc\"\n\nOTHER='quoted'\nBROKEN LINE\n=nokey\n",
        )
        .unwrap();

        let parsed = load_env_file(&path).await;
        assert_eq!(parsed.get("CDN_API_KEY").unwrap(), "sk_cdn_abc");
        assert_eq!(parsed.get("OTHER").unwrap(), "quoted");
        assert_eq!(parsed.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let parsed = load_env_file(&temp_dir.path().join("absent")).await;
        assert!(parsed.is_empty());
    }
}
