use std::path::PathBuf;

/// Runtime settings, read once at startup
#[derive(Debug, Clone)]
pub struct Settings {
    /// HTTP port for the site
    pub port: u16,
    /// Directory holding the JSON collection files
    pub data_dir: PathBuf,
    /// Directory where uploaded images are stored
    pub upload_dir: PathBuf,
    /// Password for the admin back office
    pub admin_password: String,
    /// iRacing credentials for the rating sync (optional, mock is used without them)
    pub iracing_email: Option<String>,
    pub iracing_password: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: 8083,
            data_dir: PathBuf::from("data"),
            upload_dir: PathBuf::from("data/uploads"),
            admin_password: "admin123".to_string(),
            iracing_email: None,
            iracing_password: None,
        }
    }
}

impl Settings {
    /// Create settings from environment variables
    pub fn from_env() -> Self {
        let data_dir = std::env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));

        Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8083),
            upload_dir: std::env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| data_dir.join("uploads")),
            data_dir,
            admin_password: std::env::var("ADMIN_PASSWORD")
                .unwrap_or_else(|_| "admin123".to_string()),
            iracing_email: std::env::var("IRACING_USERNAME")
                .ok()
                .filter(|s| !s.is_empty()),
            iracing_password: std::env::var("IRACING_PASSWORD")
                .ok()
                .filter(|s| !s.is_empty()),
        }
    }

    /// Both credentials present, so the real Data API client can be tried
    pub fn has_iracing_credentials(&self) -> bool {
        self.iracing_email.is_some() && self.iracing_password.is_some()
    }
}
