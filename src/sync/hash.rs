use sha2::{Digest, Sha256};
use std::path::Path;

/// Content address of a file: lowercase hex SHA-256 over the raw bytes,
/// returned alongside the bytes so the upload path does not re-read the
/// file. Two identical files hash identically regardless of name or mtime.
pub async fn sha256_of_file(path: &Path) -> std::io::Result<(String, Vec<u8>)> {
    let bytes = tokio::fs::read(path).await?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok((format!("{:x}", hasher.finalize()), bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_hash_depends_only_on_content() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("1 - A.jpg");
        let b = temp_dir.path().join("other name.jpg");
        let c = temp_dir.path().join("different.jpg");
        std::fs::write(&a, b"same bytes").unwrap();
        std::fs::write(&b, b"same bytes").unwrap();
        std::fs::write(&c, b"other bytes").unwrap();

        let (hash_a, bytes_a) = sha256_of_file(&a).await.unwrap();
        let (hash_b, _) = sha256_of_file(&b).await.unwrap();
        let (hash_c, _) = sha256_of_file(&c).await.unwrap();

        assert_eq!(hash_a, hash_b);
        assert_ne!(hash_a, hash_c);
        assert_eq!(bytes_a, b"same bytes");
        assert_eq!(hash_a.len(), 64);
        assert!(hash_a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[tokio::test]
    async fn test_missing_file_is_an_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = sha256_of_file(&temp_dir.path().join("absent.jpg")).await;
        assert!(result.is_err());
    }
}
