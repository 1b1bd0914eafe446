//! Process identity resolved once at startup.

use chrono::{Local, SecondsFormat};
use std::env;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Static facts about this process shown on the status page.
#[derive(Debug, Clone)]
pub struct Identity {
    /// Absolute path of the running executable; empty when unresolvable.
    pub executable: String,
    pub user: String,
    pub pid: u32,
    /// RFC 3339 start timestamp.
    pub started_at: String,
}

impl Identity {
    /// Resolves the identity of the current process.
    ///
    /// Failures are logged and leave the affected field degraded.
    pub fn resolve(user_override: Option<&str>) -> Self {
        let user = match user_override {
            Some(u) => u.to_string(),
            None => resolve_user(),
        };
        Self {
            executable: resolve_executable(),
            user,
            pid: std::process::id(),
            started_at: Local::now().to_rfc3339_opts(SecondsFormat::Secs, false),
        }
    }
}

/// Absolute path of the current executable.
pub fn resolve_executable() -> String {
    let exe = match env::current_exe() {
        Ok(p) => p,
        Err(e) => {
            warn!("Error getting the path for self: {}", e);
            return String::new();
        }
    };

    match make_absolute(exe.clone()) {
        Ok(abs) => abs.display().to_string(),
        Err(e) => {
            warn!("Error getting the absolute path for {}: {}", exe.display(), e);
            exe.display().to_string()
        }
    }
}

fn make_absolute(path: PathBuf) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path)
    } else {
        std::path::absolute(path)
    }
}

/// Name of the effective user, falling back to $USER.
pub fn resolve_user() -> String {
    match lookup_user_name() {
        Ok(name) => {
            debug!("Resolved current user: {}", name);
            name
        }
        Err(e) => {
            warn!("Cannot get current user: {}", e);
            env::var("USER").unwrap_or_default()
        }
    }
}

fn lookup_user_name() -> Result<String, String> {
    let uid = users::get_effective_uid();
    let user = users::get_user_by_uid(uid)
        .ok_or_else(|| format!("No passwd entry for uid {}", uid))?;
    Ok(user.name().to_string_lossy().into_owned())
}
