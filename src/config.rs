use std::path::PathBuf;

/// Language the operator writes listings in.
pub const SOURCE_LANGUAGE: &str = "el";

/// Languages every listing text is translated into.
pub const TARGET_LANGUAGES: [&str; 5] = ["en", "sr", "bg", "de", "ro"];

const DEFAULT_BIND: &str = "0.0.0.0:5000";
const DEFAULT_DATABASE_URL: &str = "sqlite://database.db?mode=rwc";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Sender credential pair plus the address inquiries are delivered to
#[derive(Debug, Clone)]
pub struct MailCredentials {
    pub username: String,
    pub password: String,
    pub receiver: String,
}

/// Process configuration, read once from the environment
#[derive(Debug, Clone)]
pub struct Config {
    pub bind: String,
    pub database_url: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub mail: Option<MailCredentials>,
    pub static_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl Config {
    /// Load `.env` (if any) and read the process environment.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let mail = match (var("MAIL_USERNAME"), var("MAIL_PASSWORD")) {
            (Some(username), Some(password)) => Some(MailCredentials {
                receiver: var("MAIL_RECEIVER").unwrap_or_else(|| username.clone()),
                username,
                password,
            }),
            _ => None,
        };

        Self {
            bind: var("SITE_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string()),
            database_url: var("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            gemini_api_key: var("GEMINI_API_KEY"),
            gemini_model: var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            mail,
            static_dir: var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("static")),
            max_upload_bytes: var("MAX_UPLOAD_BYTES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
        }
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.static_dir.join("js/data/properties.json")
    }

    pub fn i18n_dir(&self) -> PathBuf {
        self.static_dir.join("js/data/i18n")
    }
}
