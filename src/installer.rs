//! Idempotent installation of the Postgres client/benchmark tooling on a
//! compute node.
//!
//! The package-manager internals are not the interesting part; the contract
//! is. The installer probes for the tool first and exits successfully
//! without touching the package manager when it is already present, retries
//! transient package-manager failures under a bounded fixed-backoff policy,
//! and appends timestamped lines to a fixed log path.

use crate::retry::RetryPolicy;
use crate::{PgleaseError, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Default log path on a compute node.
const DEFAULT_LOG_PATH: &str = "/var/log/pglease-install.log";

/// Outcome of an installer run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// Probe found the tool; nothing was installed.
    AlreadyInstalled,
    /// The tool was installed and the probe now succeeds.
    Installed,
}

/// Idempotent installer for a single command-line tool.
///
/// # Example
///
/// ```no_run
/// use pglease::installer::Installer;
///
/// #[tokio::main]
/// async fn main() -> pglease::Result<()> {
///     let outcome = Installer::new("pgbench", &["postgresql-contrib"]).run().await?;
///     println!("install outcome: {:?}", outcome);
///     Ok(())
/// }
/// ```
pub struct Installer {
    probe_command: Vec<String>,
    update_command: Option<Vec<String>>,
    install_command: Vec<String>,
    log_path: PathBuf,
    retry: RetryPolicy,
}

impl Installer {
    /// Creates an installer that probes for `tool` on the PATH and installs
    /// the given apt packages when it is absent.
    pub fn new(tool: &str, packages: &[&str]) -> Self {
        let mut install_command = vec![
            "apt-get".to_string(),
            "install".to_string(),
            "-y".to_string(),
        ];
        install_command.extend(packages.iter().map(|p| p.to_string()));

        Self {
            probe_command: vec![tool.to_string(), "--version".to_string()],
            update_command: Some(vec!["apt-get".to_string(), "update".to_string()]),
            install_command,
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            retry: RetryPolicy::new(5, Duration::from_secs(10)),
        }
    }

    /// Overrides the probe command (default: `<tool> --version`).
    pub fn with_probe_command(mut self, command: &[&str]) -> Self {
        self.probe_command = command.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Overrides the install command (default: `apt-get install -y <packages>`).
    pub fn with_install_command(mut self, command: &[&str]) -> Self {
        self.install_command = command.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Overrides or disables the pre-install update step.
    pub fn with_update_command(mut self, command: Option<&[&str]>) -> Self {
        self.update_command = command.map(|c| c.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Overrides the log path (default: `/var/log/pglease-install.log`).
    pub fn with_log_path(mut self, path: impl AsRef<Path>) -> Self {
        self.log_path = path.as_ref().to_path_buf();
        self
    }

    /// Overrides the retry policy for package-manager operations.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Runs the install check.
    ///
    /// Returns [`InstallOutcome::AlreadyInstalled`] without invoking the
    /// package manager when the probe already succeeds. Package-manager
    /// steps are idempotent, so each runs under the retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`PgleaseError::CommandFailed`] when a package-manager step
    /// keeps failing past the retry bound, or when the probe still fails
    /// after a reportedly successful install.
    pub async fn run(&self) -> Result<InstallOutcome> {
        let tool = &self.probe_command[0];
        self.log(&format!("checking for {}", tool)).await?;

        if self.probe().await? {
            self.log(&format!("{} already present, nothing to do", tool))
                .await?;
            return Ok(InstallOutcome::AlreadyInstalled);
        }

        if let Some(update) = &self.update_command {
            self.log(&format!("running {}", update.join(" "))).await?;
            self.retry.run(|| run_checked(update)).await?;
        }

        self.log(&format!("running {}", self.install_command.join(" ")))
            .await?;
        self.retry.run(|| run_checked(&self.install_command)).await?;

        if !self.probe().await? {
            let message = format!("{} still missing after install", tool);
            self.log(&message).await?;
            return Err(PgleaseError::CommandFailed(message));
        }

        self.log(&format!("{} installed", tool)).await?;
        Ok(InstallOutcome::Installed)
    }

    /// True when the probe command runs and exits zero. A missing binary is
    /// "not installed", not an error.
    async fn probe(&self) -> Result<bool> {
        let (program, args) = split_command(&self.probe_command);
        let status = Command::new(program)
            .args(args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) => Ok(status.success()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Appends a timestamped line to the install log.
    async fn log(&self, message: &str) -> Result<()> {
        let line = format!("{} {}\n", Utc::now().to_rfc3339(), message);
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

fn split_command(command: &[String]) -> (&str, &[String]) {
    (&command[0], &command[1..])
}

/// Executes a command, mapping a non-zero exit or a missing binary to
/// [`PgleaseError::CommandFailed`].
async fn run_checked(command: &[String]) -> Result<()> {
    let (program, args) = split_command(command);
    let output = Command::new(program)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PgleaseError::CommandFailed(format!("{} command not found", program))
            } else {
                PgleaseError::Io(e)
            }
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(PgleaseError::CommandFailed(format!(
            "{} failed with exit code {}: {}",
            program,
            output.status.code().unwrap_or(-1),
            stderr.trim()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn marker_installer(dir: &tempfile::TempDir) -> (Installer, PathBuf) {
        let marker = dir.path().join("installed.marker");
        let log = dir.path().join("install.log");
        let marker_str = marker.to_str().unwrap().to_string();

        let installer = Installer::new("pglease-test-tool", &[])
            .with_probe_command(&["test", "-f", &marker_str])
            .with_update_command(None)
            .with_install_command(&["touch", &marker_str])
            .with_log_path(&log)
            .with_retry(RetryPolicy::new(2, Duration::from_millis(1)));

        (installer, log)
    }

    #[tokio::test]
    async fn test_installs_when_absent() {
        let dir = tempdir().unwrap();
        let (installer, log) = marker_installer(&dir);

        let outcome = installer.run().await.unwrap();
        assert_eq!(outcome, InstallOutcome::Installed);

        let log_contents = tokio::fs::read_to_string(&log).await.unwrap();
        assert!(log_contents.contains("installed"));
    }

    #[tokio::test]
    async fn test_second_run_is_idempotent() {
        let dir = tempdir().unwrap();
        let (installer, _log) = marker_installer(&dir);

        assert_eq!(installer.run().await.unwrap(), InstallOutcome::Installed);

        // Second run must detect the tool and never reach the install
        // command; a failing install command proves it was skipped.
        let marker = dir.path().join("installed.marker");
        let marker_str = marker.to_str().unwrap().to_string();
        let second = Installer::new("pglease-test-tool", &[])
            .with_probe_command(&["test", "-f", &marker_str])
            .with_update_command(None)
            .with_install_command(&["false"])
            .with_log_path(dir.path().join("install.log"))
            .with_retry(RetryPolicy::new(2, Duration::from_millis(1)));

        assert_eq!(
            second.run().await.unwrap(),
            InstallOutcome::AlreadyInstalled
        );
    }

    #[tokio::test]
    async fn test_persistent_install_failure_surfaces() {
        let dir = tempdir().unwrap();
        let marker = dir.path().join("never-created.marker");
        let marker_str = marker.to_str().unwrap().to_string();

        let installer = Installer::new("pglease-test-tool", &[])
            .with_probe_command(&["test", "-f", &marker_str])
            .with_update_command(None)
            .with_install_command(&["false"])
            .with_log_path(dir.path().join("install.log"))
            .with_retry(RetryPolicy::new(2, Duration::from_millis(1)));

        let result = installer.run().await;
        assert!(matches!(result, Err(PgleaseError::CommandFailed(_))));
    }

    #[tokio::test]
    async fn test_missing_package_manager_is_reported() {
        let dir = tempdir().unwrap();
        let marker = dir.path().join("never-created.marker");
        let marker_str = marker.to_str().unwrap().to_string();

        let installer = Installer::new("pglease-test-tool", &[])
            .with_probe_command(&["test", "-f", &marker_str])
            .with_update_command(None)
            .with_install_command(&["pglease-no-such-package-manager", "install"])
            .with_log_path(dir.path().join("install.log"))
            .with_retry(RetryPolicy::new(1, Duration::from_millis(1)));

        let err = installer.run().await.unwrap_err();
        assert!(err.to_string().contains("command not found"));
    }

    #[tokio::test]
    async fn test_log_lines_are_timestamped() {
        let dir = tempdir().unwrap();
        let (installer, log) = marker_installer(&dir);

        installer.run().await.unwrap();

        let log_contents = tokio::fs::read_to_string(&log).await.unwrap();
        for line in log_contents.lines() {
            // RFC 3339 timestamps start with the four-digit year.
            assert!(line.len() > 20, "line too short: {:?}", line);
            assert!(line[..4].chars().all(|c| c.is_ascii_digit()));
        }
    }
}
