use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::utils::{AppError, AppResult};

/// Path of the running executable.
pub fn current_exe_path() -> AppResult<PathBuf> {
    std::env::current_exe()
        .map_err(|e| AppError::NotFound(format!("current executable: {}", e)))
}

/// Launch `program` detached from our stdio so it outlives this process.
pub fn spawn_detached(program: &Path, args: &[&str]) -> AppResult<()> {
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| AppError::CommandFailed(format!("{}: {}", program.display(), e)))?;
    Ok(())
}

/// Relaunch the application binary at `app_path`.
pub fn relaunch_app(app_path: &Path) -> AppResult<()> {
    log::info!("Relaunching {}", app_path.display());
    spawn_detached(app_path, &[])
}

/// Mark `path` executable (no-op off Unix).
pub fn set_executable(path: &Path) -> AppResult<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
    }
    let _ = path;
    Ok(())
}
