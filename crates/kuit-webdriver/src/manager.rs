//! Chrome for Testing chromedriver downloads, cached per version under the
//! user cache directory.

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

const ENDPOINT: &str = "https://googlechromelabs.github.io/chrome-for-testing";
const MILESTONES: &str = "latest-versions-per-milestone-with-downloads.json";
const LAST_KNOWN_GOOD: &str = "last-known-good-versions-with-downloads.json";

/// Chrome binaries asked for their version, in order.
const CHROME_BINARIES: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
];

#[derive(Debug, Deserialize)]
struct Download {
    platform: String,
    url: String,
}

#[derive(Debug, Default, Deserialize)]
struct Downloads {
    #[serde(default)]
    chromedriver: Vec<Download>,
}

#[derive(Debug, Deserialize)]
struct Release {
    version: String,
    #[serde(default)]
    downloads: Downloads,
}

#[derive(Debug, Deserialize)]
struct Milestones {
    milestones: HashMap<String, Release>,
}

#[derive(Debug, Deserialize)]
struct Channels {
    channels: HashMap<String, Release>,
}

/// Chrome for Testing platform name for an `os`/`arch` pair as reported by
/// `std::env::consts`.
pub fn platform_for(os: &str, arch: &str) -> Option<&'static str> {
    match (os, arch) {
        ("linux", "x86_64") => Some("linux64"),
        ("macos", "aarch64") => Some("mac-arm64"),
        ("macos", "x86_64") => Some("mac-x64"),
        ("windows", "x86_64") => Some("win64"),
        ("windows", "x86") => Some("win32"),
        _ => None,
    }
}

pub fn current_platform() -> Option<&'static str> {
    platform_for(std::env::consts::OS, std::env::consts::ARCH)
}

fn binary_name(platform: &str) -> &'static str {
    if platform.starts_with("win") {
        "chromedriver.exe"
    } else {
        "chromedriver"
    }
}

/// Major version out of `chrome --version` output such as
/// `Google Chrome 120.0.6099.109`.
pub fn parse_major(output: &str) -> Option<String> {
    output
        .split_whitespace()
        .find(|word| word.chars().next().is_some_and(|c| c.is_ascii_digit()))
        .and_then(|version| version.split('.').next())
        .filter(|major| major.chars().all(|c| c.is_ascii_digit()))
        .map(str::to_string)
}

/// Major version of the locally installed Chrome, if any.
pub fn installed_chrome_major() -> Option<String> {
    CHROME_BINARIES.iter().find_map(|binary| {
        let output = Command::new(binary).arg("--version").output().ok()?;
        if !output.status.success() {
            return None;
        }
        let major = parse_major(&String::from_utf8_lossy(&output.stdout))?;
        debug!("{} reports Chrome {}", binary, major);
        Some(major)
    })
}

fn version_key(version: &str) -> Vec<u32> {
    version
        .split('.')
        .map(|part| part.parse().unwrap_or(0))
        .collect()
}

/// Newest cached driver for `platform`, restricted to `major` when known.
pub fn find_cached(root: &Path, platform: &str, major: Option<&str>) -> Option<PathBuf> {
    let entries = fs::read_dir(root).ok()?;
    let mut best: Option<(Vec<u32>, PathBuf)> = None;
    for entry in entries.flatten() {
        let version = entry.file_name().to_string_lossy().to_string();
        if let Some(major) = major
            && version.split('.').next() != Some(major)
        {
            continue;
        }
        let driver = cached_path(root, &version, platform);
        if !driver.is_file() {
            continue;
        }
        let key = version_key(&version);
        if best.as_ref().is_none_or(|(current, _)| key > *current) {
            best = Some((key, driver));
        }
    }
    best.map(|(_, path)| path)
}

/// Where the driver for `version` is cached.
pub fn cached_path(root: &Path, version: &str, platform: &str) -> PathBuf {
    root.join(version)
        .join(format!("chromedriver-{}", platform))
        .join(binary_name(platform))
}

/// Write the driver binary from a Chrome for Testing zip to `dest`.
pub fn extract_driver(archive: &[u8], platform: &str, dest: &Path) -> Result<PathBuf, String> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive))
        .map_err(|e| format!("invalid chromedriver archive: {}", e))?;
    let binary = binary_name(platform);

    for i in 0..zip.len() {
        let mut file = zip
            .by_index(i)
            .map_err(|e| format!("invalid archive entry: {}", e))?;
        let name = file.name().to_string();
        if name.contains("..") {
            return Err(format!("refusing archive entry {}", name));
        }
        if Path::new(&name).file_name().and_then(|n| n.to_str()) != Some(binary) {
            continue;
        }

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .map_err(|e| format!("failed to read {}: {}", name, e))?;
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("failed to create {}: {}", parent.display(), e))?;
        }
        fs::write(dest, bytes).map_err(|e| format!("failed to write {}: {}", dest.display(), e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(dest, fs::Permissions::from_mode(0o755))
                .map_err(|e| format!("failed to mark {} executable: {}", dest.display(), e))?;
        }
        return Ok(dest.to_path_buf());
    }
    Err(format!("archive has no {}", binary))
}

pub struct DriverManager {
    http: reqwest::Client,
    cache_root: PathBuf,
    endpoint: String,
}

impl DriverManager {
    /// Manager caching under `<cache dir>/kuit/chromedriver`.
    pub fn new() -> Result<Self, String> {
        let cache = dirs::cache_dir().ok_or("no user cache directory on this platform")?;
        Ok(Self::with_cache_root(cache.join("kuit").join("chromedriver")))
    }

    pub fn with_cache_root(cache_root: PathBuf) -> Self {
        Self {
            http: reqwest::Client::new(),
            cache_root,
            endpoint: ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    /// A chromedriver matching the installed Chrome, from cache or freshly
    /// downloaded. Without a local Chrome the current stable release is used.
    pub async fn install(&self) -> Result<PathBuf, String> {
        let platform = current_platform().ok_or_else(|| {
            format!(
                "no Chrome for Testing build for {}/{}",
                std::env::consts::OS,
                std::env::consts::ARCH
            )
        })?;
        let major = installed_chrome_major();

        if let Some(path) = find_cached(&self.cache_root, platform, major.as_deref()) {
            info!("Using cached chromedriver at {}", path.display());
            return Ok(path);
        }

        let release = self.release(major.as_deref()).await?;
        let url = release
            .downloads
            .chromedriver
            .iter()
            .find(|d| d.platform == platform)
            .map(|d| d.url.clone())
            .ok_or_else(|| format!("release {} has no {} chromedriver", release.version, platform))?;

        info!("Downloading chromedriver {} from {}", release.version, url);
        let archive = self
            .http
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| format!("download failed: {}", e))?
            .bytes()
            .await
            .map_err(|e| format!("download failed: {}", e))?;

        let dest = cached_path(&self.cache_root, &release.version, platform);
        let platform = platform.to_string();
        let path = tokio::task::spawn_blocking(move || extract_driver(&archive, &platform, &dest))
            .await
            .map_err(|e| format!("extraction task failed: {}", e))??;
        info!("chromedriver {} cached at {}", release.version, path.display());
        Ok(path)
    }

    async fn release(&self, major: Option<&str>) -> Result<Release, String> {
        match major {
            Some(major) => {
                let mut doc: Milestones = self.fetch(MILESTONES).await?;
                doc.milestones
                    .remove(major)
                    .ok_or_else(|| format!("no chromedriver release for Chrome {}", major))
            }
            None => {
                let mut doc: Channels = self.fetch(LAST_KNOWN_GOOD).await?;
                doc.channels
                    .remove("Stable")
                    .ok_or_else(|| "no stable chromedriver release listed".to_string())
            }
        }
    }

    async fn fetch<T: serde::de::DeserializeOwned>(&self, file: &str) -> Result<T, String> {
        let url = format!("{}/{}", self.endpoint.trim_end_matches('/'), file);
        debug!("Fetching {}", url);
        self.http
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| format!("failed to fetch {}: {}", url, e))?
            .json()
            .await
            .map_err(|e| format!("failed to decode {}: {}", url, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, body) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(body).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_platform_names() {
        assert_eq!(platform_for("linux", "x86_64"), Some("linux64"));
        assert_eq!(platform_for("macos", "aarch64"), Some("mac-arm64"));
        assert_eq!(platform_for("linux", "aarch64"), None);
    }

    #[test]
    fn test_parse_major() {
        assert_eq!(parse_major("Google Chrome 120.0.6099.109 \n").as_deref(), Some("120"));
        assert_eq!(parse_major("Chromium 119.0.6045.199 built on Debian").as_deref(), Some("119"));
        assert_eq!(parse_major("not a browser"), None);
    }

    #[test]
    fn test_release_documents_decode() {
        let milestones: Milestones = serde_json::from_str(
            r#"{"timestamp": "t", "milestones": {"120": {"milestone": "120", "version": "120.0.6099.109",
                "downloads": {"chromedriver": [{"platform": "linux64", "url": "https://x/chromedriver-linux64.zip"}]}}}}"#,
        )
        .unwrap();
        let release = &milestones.milestones["120"];
        assert_eq!(release.version, "120.0.6099.109");
        assert_eq!(release.downloads.chromedriver[0].platform, "linux64");

        let channels: Channels = serde_json::from_str(
            r#"{"channels": {"Stable": {"channel": "Stable", "version": "121.0.6167.85", "downloads": {}}}}"#,
        )
        .unwrap();
        assert!(channels.channels["Stable"].downloads.chromedriver.is_empty());
    }

    #[test]
    fn test_extract_driver_from_archive() {
        let dir = tempfile::tempdir().unwrap();
        let zip = archive(&[
            ("chromedriver-linux64/LICENSE.chromedriver", b"license"),
            ("chromedriver-linux64/chromedriver", b"binary"),
        ]);
        let dest = cached_path(dir.path(), "120.0.6099.109", "linux64");

        let path = extract_driver(&zip, "linux64", &dest).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"binary");
        #[cfg(unix)]
        assert!(crate::chromedriver::is_executable(&path));
    }

    #[test]
    fn test_extract_rejects_traversal_and_missing_binary() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("chromedriver");

        let evil = archive(&[("../chromedriver", b"x")]);
        assert!(extract_driver(&evil, "linux64", &dest).is_err());

        let empty = archive(&[("README", b"x")]);
        assert!(extract_driver(&empty, "linux64", &dest).unwrap_err().contains("no chromedriver"));
    }

    #[test]
    fn test_find_cached_prefers_newest_matching_major() {
        let dir = tempfile::tempdir().unwrap();
        for version in ["119.0.6045.105", "120.0.6099.71", "120.0.6099.109"] {
            let path = cached_path(dir.path(), version, "linux64");
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, "").unwrap();
        }
        fs::create_dir_all(dir.path().join("121.0.1.1")).unwrap();

        let found = find_cached(dir.path(), "linux64", Some("120")).unwrap();
        assert!(found.starts_with(dir.path().join("120.0.6099.109")));

        let any = find_cached(dir.path(), "linux64", None).unwrap();
        assert!(any.starts_with(dir.path().join("120.0.6099.109")));

        assert_eq!(find_cached(dir.path(), "linux64", Some("118")), None);
        assert_eq!(find_cached(&dir.path().join("missing"), "linux64", None), None);
    }
}
