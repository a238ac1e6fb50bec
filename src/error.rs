use thiserror::Error;

#[derive(Error, Debug)]
pub enum SkiffError {
    #[error("Connection to {endpoint} failed: {reason}")]
    Connection { endpoint: String, reason: String },

    #[error("Listing bucket '{bucket}' failed: {reason}")]
    List { bucket: String, reason: String },

    #[error("Transfer of '{path}' failed: {reason}")]
    Transfer { path: String, reason: String },

    #[error("Invalid remote path '{path}': expected bucket/key")]
    InvalidRemotePath { path: String },

    #[error("Object not found: {bucket}/{key}")]
    ObjectNotFound { bucket: String, key: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl SkiffError {
    /// Returns a user-friendly suggestion for how to fix the error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            SkiffError::Connection { .. } => {
                Some("Check the endpoint and credentials with `skiff connect`.")
            }
            SkiffError::List { .. } => {
                Some("Check that the bucket exists and is readable.")
            }
            SkiffError::InvalidRemotePath { .. } => {
                Some("Remote paths are 'bucket/key', e.g. photos/2024/trip.jpg")
            }
            SkiffError::ObjectNotFound { .. } => {
                Some("Refresh the listing with `skiff tree`; the object may have been removed.")
            }
            SkiffError::Config(_) => {
                Some("Re-run `skiff connect` to rewrite the configuration file.")
            }
            _ => None,
        }
    }
}

impl From<serde_json::Error> for SkiffError {
    fn from(err: serde_json::Error) -> Self {
        SkiffError::Config(err.to_string())
    }
}

impl From<walkdir::Error> for SkiffError {
    fn from(err: walkdir::Error) -> Self {
        SkiffError::Io {
            source: err.into_io_error().unwrap_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::Other, "walkdir error")
            }),
        }
    }
}
