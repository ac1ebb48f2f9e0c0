// Configuration: the backend base URL and the location of the local image
// registry. Both are resolved once in `main` (flag, then environment, then
// the defaults below) and handed to the rest of the crate by value.

use std::path::PathBuf;

/// Backend used when neither `--api-url` nor `PXFORGE_API_URL` is set.
pub const DEFAULT_BASE_URL: &str = "https://shlokarora2709-ai-image-editor.hf.space";

/// Environment variable overriding the backend base URL.
pub const API_URL_ENV: &str = "PXFORGE_API_URL";

/// Environment variable overriding the registry file location.
pub const REGISTRY_ENV: &str = "PXFORGE_REGISTRY";

const CONFIG_DIR: &str = ".pxforge";
const REGISTRY_FILE: &str = "uploaded_images.json";

/// Effective settings for one process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub base_url: String,
    pub registry_path: PathBuf,
}

impl Config {
    /// Build a config from already-resolved optional overrides. `None`
    /// means "use the default".
    pub fn new(base_url: Option<String>, registry_path: Option<PathBuf>) -> Self {
        let base_url = base_url
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let registry_path = registry_path.unwrap_or_else(default_registry_path);
        Config {
            base_url,
            registry_path,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new(None, None)
    }
}

/// `~/.pxforge/uploaded_images.json`, or the same under the current
/// directory when no home directory can be determined.
pub fn default_registry_path() -> PathBuf {
    let dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    dir.join(CONFIG_DIR).join(REGISTRY_FILE)
}
