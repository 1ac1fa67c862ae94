use thiserror::Error;

#[derive(Error, Debug)]
pub enum SiteError {
    #[error("Failed to save '{path}': {source}")]
    StoreSave {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Upload rejected: {reason}")]
    UploadRejected { reason: String },

    #[error("Rating source login failed: {message}")]
    RatingAuth { message: String },

    #[error("Rating source request failed: {message}")]
    RatingRequest { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<serde_json::Error> for SiteError {
    fn from(err: serde_json::Error) -> Self {
        SiteError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for SiteError {
    fn from(err: reqwest::Error) -> Self {
        SiteError::RatingRequest {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SiteError>;
