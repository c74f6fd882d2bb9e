use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Vault rejected {path} ({status}): {message}")]
    Service {
        path: String,
        status: u16,
        message: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing artifact '{0}' in workflow context")]
    MissingArtifact(String),

    #[error("Certificate parsing error: {0}")]
    CertParsing(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProvisionError {
    /// Vault answers 400/404 when the target of a delete/disable is already
    /// gone. Undo paths treat those as success.
    pub fn is_missing_target(&self) -> bool {
        matches!(
            self,
            ProvisionError::Service { status, .. } if *status == 400 || *status == 404
        )
    }
}

pub type Result<T> = std::result::Result<T, ProvisionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_target_detection() {
        let gone = ProvisionError::Service {
            path: "sys/mounts/pki".to_string(),
            status: 400,
            message: "no matching mount".to_string(),
        };
        assert!(gone.is_missing_target());

        let not_found = ProvisionError::Service {
            path: "pki/roles/example".to_string(),
            status: 404,
            message: "not found".to_string(),
        };
        assert!(not_found.is_missing_target());

        let denied = ProvisionError::Service {
            path: "sys/mounts/pki".to_string(),
            status: 403,
            message: "permission denied".to_string(),
        };
        assert!(!denied.is_missing_target());

        let config = ProvisionError::Config("missing token".to_string());
        assert!(!config.is_missing_target());
    }
}
