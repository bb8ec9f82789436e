use std::path::{Path, PathBuf};

use crate::models::InstallOptions;
use crate::utils::app_lifecycle::{current_exe_path, relaunch_app, set_executable, spawn_detached};
use crate::utils::{AppResult, UpdateError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// NSIS setup executable (electron-builder's Windows target).
    NsisInstaller,
    Msi,
    /// Disk image or package handed to the system installer.
    MacPackage,
    /// Self-contained binary (AppImage or plain executable) replacing ours.
    Binary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub kind: ArtifactKind,
    pub relaunched: bool,
}

pub fn artifact_kind(path: &Path) -> ArtifactKind {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "exe" => ArtifactKind::NsisInstaller,
        "msi" => ArtifactKind::Msi,
        "dmg" | "pkg" => ArtifactKind::MacPackage,
        _ => ArtifactKind::Binary,
    }
}

/// Installer arguments for an NSIS setup, matching electron-builder's flags.
pub fn nsis_args(options: InstallOptions) -> Vec<&'static str> {
    let mut args = vec!["--updated"];
    if options.silent {
        args.push("/S");
    }
    if options.force_restart {
        args.push("--force-run");
    }
    args
}

pub fn msi_args(options: InstallOptions) -> Vec<&'static str> {
    vec![if options.silent { "/quiet" } else { "/passive" }]
}

/// Apply a downloaded artifact to the running installation.
pub fn install_artifact(artifact: &Path, options: InstallOptions) -> AppResult<InstallOutcome> {
    if !artifact.exists() {
        return Err(UpdateError::InstallFailed(format!("artifact {} is missing", artifact.display())).into());
    }

    let kind = artifact_kind(artifact);
    log::info!(
        "Installing {} as {:?} (silent: {}, restart: {})",
        artifact.display(),
        kind,
        options.silent,
        options.force_restart
    );

    let relaunched = match kind {
        ArtifactKind::NsisInstaller => {
            spawn_detached(artifact, &nsis_args(options)).map_err(install_failed)?;
            options.force_restart
        }
        ArtifactKind::Msi => {
            let artifact_arg = artifact.to_string_lossy();
            let mut args = vec!["/i", &*artifact_arg];
            args.extend(msi_args(options));
            spawn_detached(Path::new("msiexec"), &args).map_err(install_failed)?;
            false
        }
        ArtifactKind::MacPackage => {
            if options.silent {
                log::warn!("Disk images cannot be installed silently, opening installer");
            }
            spawn_detached(Path::new("open"), &[&*artifact.to_string_lossy()]).map_err(install_failed)?;
            false
        }
        ArtifactKind::Binary => {
            let target = current_exe_path()?;
            replace_binary(artifact, &target)?;
            if options.force_restart {
                relaunch_app(&target).map_err(install_failed)?;
            }
            options.force_restart
        }
    };

    Ok(InstallOutcome { kind, relaunched })
}

/// Swap `target` for `new_binary`, restoring the original if the copy fails.
pub fn replace_binary(new_binary: &Path, target: &Path) -> AppResult<()> {
    let backup = backup_path(target);

    if target.exists() {
        std::fs::rename(target, &backup).map_err(|e| {
            UpdateError::InstallFailed(format!(
                "cannot back up {} to {}: {}",
                target.display(),
                backup.display(),
                e
            ))
        })?;
    }

    if let Err(e) = std::fs::copy(new_binary, target) {
        if backup.exists() {
            let _ = std::fs::rename(&backup, target);
        }
        return Err(UpdateError::InstallFailed(format!("cannot install to {}: {}", target.display(), e)).into());
    }

    set_executable(target)?;
    let _ = std::fs::remove_file(&backup);
    log::info!("Binary updated at {}", target.display());
    Ok(())
}

fn backup_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".old");
    target.with_file_name(name)
}

fn install_failed(e: crate::utils::AppError) -> UpdateError {
    UpdateError::InstallFailed(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::AppError;

    #[test]
    fn test_artifact_kind() {
        assert_eq!(artifact_kind(Path::new("Desk-Setup-1.0.0.exe")), ArtifactKind::NsisInstaller);
        assert_eq!(artifact_kind(Path::new("desk.MSI")), ArtifactKind::Msi);
        assert_eq!(artifact_kind(Path::new("desk-1.0.0.dmg")), ArtifactKind::MacPackage);
        assert_eq!(artifact_kind(Path::new("desk-1.0.0.AppImage")), ArtifactKind::Binary);
        assert_eq!(artifact_kind(Path::new("desk")), ArtifactKind::Binary);
    }

    #[test]
    fn test_nsis_args() {
        assert_eq!(nsis_args(InstallOptions::new(true, true)), vec!["--updated", "/S", "--force-run"]);
        assert_eq!(nsis_args(InstallOptions::new(true, false)), vec!["--updated", "/S"]);
        assert_eq!(nsis_args(InstallOptions::new(false, true)), vec!["--updated", "--force-run"]);
    }

    #[test]
    fn test_msi_args() {
        assert_eq!(msi_args(InstallOptions::new(true, false)), vec!["/quiet"]);
        assert_eq!(msi_args(InstallOptions::new(false, false)), vec!["/passive"]);
    }

    #[test]
    fn test_backup_path() {
        assert_eq!(backup_path(Path::new("/opt/desk/desk")), PathBuf::from("/opt/desk/desk.old"));
        assert_eq!(backup_path(Path::new("C:/Desk/desk.exe")), PathBuf::from("C:/Desk/desk.exe.old"));
    }

    #[test]
    fn test_replace_binary() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("desk");
        let new_binary = dir.path().join("desk-new");
        std::fs::write(&target, "old-content").unwrap();
        std::fs::write(&new_binary, "new-content").unwrap();

        replace_binary(&new_binary, &target).unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "new-content");
        assert!(!backup_path(&target).exists());
    }

    #[test]
    fn test_replace_binary_restores_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("desk");
        std::fs::write(&target, "old-content").unwrap();

        let err = replace_binary(&dir.path().join("missing"), &target).unwrap_err();
        assert!(matches!(err, AppError::Update(UpdateError::InstallFailed(_))));
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "old-content");
    }

    #[test]
    fn test_missing_artifact() {
        let err = install_artifact(Path::new("/nonexistent/desk.exe"), InstallOptions::new(true, true)).unwrap_err();
        assert!(matches!(err, AppError::Update(UpdateError::InstallFailed(_))));
    }
}
