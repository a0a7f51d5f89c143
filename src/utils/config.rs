// Configuration file locations and environment handling

use std::collections::BTreeMap;
use std::path::PathBuf;

/// Environment variable naming an explicit clouds.yaml
pub const CONFIG_FILE_ENV: &str = "OS_CLIENT_CONFIG_FILE";

/// File names searched for in each config directory
const CONFIG_FILE_NAMES: &[&str] = &["clouds.yaml", "clouds.yml"];

/// Snapshot of the environment the loader reads `OS_*` variables from
pub type EnvVars = BTreeMap<String, String>;

/// Current process environment
pub fn current_env() -> EnvVars {
    std::env::vars().collect()
}

/// Per-user configuration directory (`~/.config/openstack` on Linux)
pub fn get_user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("openstack")
}

/// Per-user cache directory (`~/.cache/openstack` on Linux)
pub fn get_user_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("openstack")
}

/// System-wide configuration directory
pub fn get_site_config_dir() -> PathBuf {
    PathBuf::from("/etc/openstack")
}

/// Candidate clouds.yaml paths in priority order
///
/// An explicit `OS_CLIENT_CONFIG_FILE` comes first, then the current
/// directory, the user config directory and the system directory.
pub fn config_file_candidates(env: &EnvVars) -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(explicit) = env.get(CONFIG_FILE_ENV).filter(|p| !p.is_empty()) {
        candidates.push(PathBuf::from(explicit));
    }

    let dirs = [
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        get_user_config_dir(),
        get_site_config_dir(),
    ];
    for dir in dirs {
        for name in CONFIG_FILE_NAMES {
            candidates.push(dir.join(name));
        }
    }

    candidates
}

/// First existing candidate
pub fn find_config_file(env: &EnvVars) -> Option<PathBuf> {
    config_file_candidates(env).into_iter().find(|p| p.is_file())
}
