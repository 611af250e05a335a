use fantoccini::{Client, ClientBuilder};
use kuit_engine::config::BrowserConfig;
use serde_json::{Map, Value, json};

/// W3C capabilities for Chrome built from the browser settings.
pub fn chrome_capabilities(config: &BrowserConfig) -> Map<String, Value> {
    let mut args = Vec::new();
    if config.no_sandbox {
        args.push("--no-sandbox".to_string());
    }
    if config.disable_dev_shm {
        args.push("--disable-dev-shm-usage".to_string());
    }
    if config.disable_gpu {
        args.push("--disable-gpu".to_string());
    }
    args.push(format!(
        "--window-size={},{}",
        config.window_width, config.window_height
    ));
    if config.headless {
        args.push("--headless=new".to_string());
    }
    args.extend(config.extra_args.iter().cloned());

    let mut caps = Map::new();
    caps.insert("browserName".to_string(), json!("chrome"));
    caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
    caps
}

/// Open a WebDriver session at `url`.
pub async fn connect(url: &str, capabilities: Map<String, Value>) -> Result<Client, String> {
    ClientBuilder::native()
        .capabilities(capabilities)
        .connect(url)
        .await
        .map_err(|e| format!("Failed to connect to WebDriver at {}: {}", url, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(caps: &Map<String, Value>) -> Vec<String> {
        caps["goog:chromeOptions"]["args"]
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a.as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_default_capabilities() {
        let caps = chrome_capabilities(&BrowserConfig::default());
        assert_eq!(caps["browserName"], "chrome");
        assert_eq!(
            args(&caps),
            vec![
                "--no-sandbox",
                "--disable-dev-shm-usage",
                "--disable-gpu",
                "--window-size=1920,1080",
                "--headless=new",
            ]
        );
    }

    #[test]
    fn test_headed_window_with_extra_args() {
        let config = BrowserConfig {
            headless: false,
            no_sandbox: false,
            window_width: 1280,
            window_height: 800,
            extra_args: vec!["--lang=en-US".to_string()],
            ..Default::default()
        };
        let args = args(&chrome_capabilities(&config));
        assert!(!args.iter().any(|a| a.starts_with("--headless")));
        assert!(!args.contains(&"--no-sandbox".to_string()));
        assert!(args.contains(&"--window-size=1280,800".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("--lang=en-US"));
    }
}
