use kuit_engine::config::BrowserConfig;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Common places a chromedriver binary gets installed to.
const WELL_KNOWN_PATHS: &[&str] = &[
    "/opt/homebrew/bin/chromedriver",
    "/usr/local/bin/chromedriver",
    "/Applications/chromedriver",
    "/usr/bin/chromedriver",
];

const READY_ATTEMPTS: u32 = 30;
const READY_INTERVAL: Duration = Duration::from_millis(200);

/// Remediation shown when no strategy produced a working driver.
pub const SETUP_GUIDANCE: &str = "\
To fix this, do one of the following:
  1. Install chromedriver and put it on PATH (e.g. `brew install chromedriver`
     or your distribution's chromium-driver package).
  2. Point CHROMEDRIVER (or browser.driver_path) at a chromedriver binary.
  3. Start a WebDriver server yourself and set WEBDRIVER_URL.
  4. Allow the driver manager to download Chrome for Testing
     (browser.allow_download: true) and make sure the host has network access.
The chromedriver major version must match the installed Chrome.";

/// Where a chromedriver candidate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverSource {
    Configured,
    SystemPath,
    WellKnown,
    Manager,
}

impl std::fmt::Display for DriverSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Configured => "configured path",
            Self::SystemPath => "PATH",
            Self::WellKnown => "well-known path",
            Self::Manager => "driver manager",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub source: DriverSource,
    pub path: PathBuf,
}

/// Find chromedriver on PATH.
pub fn find_on_path() -> Option<PathBuf> {
    if let Ok(output) = Command::new("which").arg("chromedriver").output()
        && output.status.success()
        && let Ok(path) = String::from_utf8(output.stdout)
    {
        let path = path.trim();
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    None
}

#[cfg(unix)]
pub fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
pub fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Local chromedriver candidates in the order they should be tried:
/// the configured path, then PATH, then well-known install locations.
/// A configured path is kept even if missing so the attempt is reported.
pub fn local_candidates(config: &BrowserConfig) -> Vec<Candidate> {
    local_candidates_from(config, find_on_path(), WELL_KNOWN_PATHS)
}

fn local_candidates_from(
    config: &BrowserConfig,
    on_path: Option<PathBuf>,
    well_known: &[&str],
) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = Vec::new();
    let mut push = |source, path: PathBuf| {
        if !candidates.iter().any(|c| c.path == path) {
            candidates.push(Candidate { source, path });
        }
    };

    if let Some(path) = &config.driver_path {
        push(DriverSource::Configured, path.clone());
    }
    if let Some(path) = on_path {
        push(DriverSource::SystemPath, path);
    }
    for path in well_known {
        let path = PathBuf::from(path);
        if is_executable(&path) {
            push(DriverSource::WellKnown, path);
        }
    }
    candidates
}

/// Handle to a running chromedriver process. The process is killed on drop.
pub struct DriverProcess {
    child: Child,
    port: u16,
}

impl DriverProcess {
    pub fn webdriver_url(&self) -> String {
        format!("http://localhost:{}", self.port)
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }
}

impl Drop for DriverProcess {
    fn drop(&mut self) {
        debug!("Shutting down chromedriver (pid {})", self.child.id());
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Start chromedriver on `port` and wait for its status endpoint.
pub async fn launch(path: &Path, port: u16) -> Result<DriverProcess, String> {
    if !path.exists() {
        return Err(format!("{} does not exist", path.display()));
    }
    if !is_executable(path) {
        return Err(format!("{} is not executable", path.display()));
    }

    let child = Command::new(path)
        .arg(format!("--port={}", port))
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| format!("failed to launch {}: {}", path.display(), e))?;
    let mut process = DriverProcess { child, port };
    info!("chromedriver launched with PID: {}", process.pid());

    let url = format!("http://localhost:{}/status", port);
    let client = reqwest::Client::new();
    for attempt in 1..=READY_ATTEMPTS {
        sleep(READY_INTERVAL).await;

        if let Ok(Some(status)) = process.child.try_wait() {
            return Err(format!("chromedriver exited early with {}", status));
        }
        match client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => {
                info!("chromedriver ready after {} attempts", attempt);
                return Ok(process);
            }
            Ok(resp) => {
                warn!(
                    "chromedriver answered {} but is not ready yet (attempt {})",
                    resp.status(),
                    attempt
                );
            }
            Err(_) => {
                if attempt % 5 == 0 {
                    info!("Waiting for chromedriver... (attempt {})", attempt);
                }
            }
        }
    }

    Err(format!(
        "chromedriver did not become ready within {:?}",
        READY_INTERVAL * READY_ATTEMPTS
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn executable(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, "#!/bin/sh\n").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        }
        path
    }

    #[test]
    fn test_candidate_order() {
        let dir = tempfile::tempdir().unwrap();
        let known = executable(dir.path(), "known");
        let known_str = known.to_string_lossy().to_string();
        let config = BrowserConfig {
            driver_path: Some(PathBuf::from("/nonexistent/chromedriver")),
            ..Default::default()
        };

        let candidates = local_candidates_from(
            &config,
            Some(PathBuf::from("/usr/lib/chromium/chromedriver")),
            &[known_str.as_str(), "/nonexistent/other"],
        );
        let sources: Vec<DriverSource> = candidates.iter().map(|c| c.source).collect();
        assert_eq!(
            sources,
            vec![
                DriverSource::Configured,
                DriverSource::SystemPath,
                DriverSource::WellKnown
            ]
        );
        assert_eq!(candidates[2].path, known);
    }

    #[test]
    fn test_duplicate_paths_are_tried_once() {
        let dir = tempfile::tempdir().unwrap();
        let driver = executable(dir.path(), "chromedriver");
        let driver_str = driver.to_string_lossy().to_string();
        let config = BrowserConfig {
            driver_path: Some(driver.clone()),
            ..Default::default()
        };

        let candidates =
            local_candidates_from(&config, Some(driver.clone()), &[driver_str.as_str()]);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].source, DriverSource::Configured);
    }

    #[cfg(unix)]
    #[test]
    fn test_plain_file_is_not_executable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chromedriver");
        fs::write(&path, "").unwrap();
        assert!(!is_executable(&path));
        assert!(!is_executable(dir.path()));
    }

    #[tokio::test]
    async fn test_launch_missing_binary_fails_fast() {
        let err = launch(Path::new("/nonexistent/chromedriver"), 9515)
            .await
            .err()
            .unwrap();
        assert!(err.contains("does not exist"));
    }
}
