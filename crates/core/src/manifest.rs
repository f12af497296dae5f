//! The worker's compiled-in manifest.
//!
//! Bumping [`CACHE_VERSION`] is the only way to invalidate the shell on
//! redeploy: the next activation deletes every bucket with another name.

/// Bucket name prefix shared by every version.
pub const CACHE_PREFIX: &str = "shell-cache";

/// Current bucket version.
pub const CACHE_VERSION: u32 = 1;

/// Page served when neither the network nor an exact cache entry is available.
pub const OFFLINE_URL: &str = "/offline/";

/// Minimal set of resources needed to render the application offline.
pub const SHELL_ASSETS: &[&str] = &[
    "/",
    OFFLINE_URL,
    "/portal/",
    "/static/css/app.css",
    "/static/js/app.js",
    "/static/manifest.json",
];

/// Fixed description of one worker version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub cache_name: String,
    pub offline_url: String,
    pub shell_assets: Vec<String>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            cache_name: cache_name(CACHE_PREFIX, CACHE_VERSION),
            offline_url: OFFLINE_URL.to_string(),
            shell_assets: SHELL_ASSETS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Format a bucket name as `<prefix>-v<version>`.
pub fn cache_name(prefix: &str, version: u32) -> String {
    format!("{prefix}-v{version}")
}
