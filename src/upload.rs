// Upload gatekeeping for the HTTP surface: file name, extension and size

use thiserror::Error;

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadRejection {
    #[error("No file name provided")]
    MissingFileName,

    #[error("File type not allowed: {file_name} (allowed: {allowed})")]
    ExtensionNotAllowed { file_name: String, allowed: String },

    #[error("File too large: {size} bytes (max {max} bytes)")]
    TooLarge { size: usize, max: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    /// Lowercase, dot-prefixed (".xlsx")
    pub allowed_extensions: Vec<String>,
    pub max_bytes: usize,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            allowed_extensions: vec![".xlsx".to_string(), ".csv".to_string()],
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl UploadPolicy {
    /// "csv, .XLSX" → [".csv", ".xlsx"]
    pub fn parse_extensions(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(|s| s.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|s| !s.is_empty())
            .map(|s| format!(".{s}"))
            .collect()
    }

    pub fn check(&self, file_name: Option<&str>, size: usize) -> Result<(), UploadRejection> {
        let file_name = file_name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or(UploadRejection::MissingFileName)?;

        let lower = file_name.to_ascii_lowercase();
        if !self.allowed_extensions.iter().any(|ext| lower.ends_with(ext.as_str())) {
            return Err(UploadRejection::ExtensionNotAllowed {
                file_name: file_name.to_string(),
                allowed: self.allowed_extensions.join(", "),
            });
        }

        if size > self.max_bytes {
            return Err(UploadRejection::TooLarge {
                size,
                max: self.max_bytes,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_allowed_file() {
        let policy = UploadPolicy::default();

        assert!(policy.check(Some("BPI_2212233828_20241225.xlsx"), 1024).is_ok());
        assert!(policy.check(Some("Revolut_LT01_20240331.CSV"), 10).is_ok());
    }

    #[test]
    fn test_rejects_missing_name() {
        let policy = UploadPolicy::default();

        assert_eq!(policy.check(None, 1), Err(UploadRejection::MissingFileName));
        assert_eq!(policy.check(Some("  "), 1), Err(UploadRejection::MissingFileName));
    }

    #[test]
    fn test_rejects_extension() {
        let err = UploadPolicy::default()
            .check(Some("statement.pdf"), 1)
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "File type not allowed: statement.pdf (allowed: .xlsx, .csv)"
        );
    }

    #[test]
    fn test_size_limit_is_inclusive() {
        let policy = UploadPolicy::default();

        assert!(policy.check(Some("a_b_20240101.csv"), DEFAULT_MAX_UPLOAD_BYTES).is_ok());
        assert!(matches!(
            policy.check(Some("a_b_20240101.csv"), DEFAULT_MAX_UPLOAD_BYTES + 1),
            Err(UploadRejection::TooLarge { .. })
        ));
    }
}
