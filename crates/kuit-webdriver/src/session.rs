use crate::chromedriver::{self, DriverProcess, DriverSource, SETUP_GUIDANCE};
use crate::manager::DriverManager;
use crate::webdriver;
use async_trait::async_trait;
use fantoccini::Client;
use fantoccini::elements::Element;
use fantoccini::error::{CmdError, ErrorStatus};
use futures::FutureExt;
use futures::future::BoxFuture;
use kuit_common::locator::{Locator, Strategy};
use kuit_engine::config::BrowserConfig;
use kuit_engine::session::{ElementRef, NavigationResult, Session, SessionError};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use tracing::{debug, info, warn};

/// Engine handles for WebDriver elements. The same element found again
/// keeps its handle, so repeated lookups do not grow the table.
#[derive(Debug)]
struct Handles<E> {
    elements: HashMap<u64, E>,
    by_id: HashMap<String, u64>,
    next: u64,
}

impl<E> Handles<E> {
    fn new() -> Self {
        Self {
            elements: HashMap::new(),
            by_id: HashMap::new(),
            next: 0,
        }
    }

    fn get(&self, handle: u64) -> Option<&E> {
        self.elements.get(&handle)
    }

    fn insert(&mut self, id: String, element: E) -> ElementRef {
        let handle = match self.by_id.get(&id) {
            Some(handle) => *handle,
            None => {
                self.next += 1;
                self.by_id.insert(id, self.next);
                self.next
            }
        };
        self.elements.insert(handle, element);
        ElementRef(handle)
    }

    fn len(&self) -> usize {
        self.elements.len()
    }

    fn clear(&mut self) {
        self.elements.clear();
        self.by_id.clear();
    }
}

/// Chrome driven over WebDriver. Owns the chromedriver process when it
/// launched one.
pub struct ChromeSession {
    client: Option<Client>,
    elements: Handles<Element>,
    driver: Option<DriverProcess>,
}

impl ChromeSession {
    fn new(client: Client, driver: Option<DriverProcess>) -> Self {
        Self {
            client: Some(client),
            elements: Handles::new(),
            driver,
        }
    }

    /// Open a browser session, trying each way of getting a WebDriver
    /// server in turn. Every failed attempt is logged and reported in
    /// [`SessionError::Setup`] if none succeeds.
    pub async fn acquire(config: &BrowserConfig) -> Result<Self, SessionError> {
        let caps = webdriver::chrome_capabilities(config);
        let mut attempts = Vec::new();

        if let Some(url) = &config.webdriver_url {
            info!("Connecting to external WebDriver at {}...", url);
            match webdriver::connect(url, caps.clone()).await {
                Ok(client) => return Ok(Self::new(client, None)),
                Err(e) => {
                    warn!("{}", e);
                    attempts.push(format!("WEBDRIVER_URL {}: {}", url, e));
                }
            }
        }

        for candidate in chromedriver::local_candidates(config) {
            match Self::start(&candidate.path, config.driver_port, &caps).await {
                Ok(session) => {
                    info!(
                        "Browser session ready using chromedriver from {} ({})",
                        candidate.source,
                        candidate.path.display()
                    );
                    return Ok(session);
                }
                Err(e) => {
                    warn!("chromedriver from {} failed: {}", candidate.source, e);
                    attempts.push(format!(
                        "{} {}: {}",
                        candidate.source,
                        candidate.path.display(),
                        e
                    ));
                }
            }
        }

        if config.allow_download {
            let installed = match DriverManager::new() {
                Ok(manager) => manager.install().await,
                Err(e) => Err(e),
            };
            let started = match installed {
                Ok(path) => Self::start(&path, config.driver_port, &caps).await,
                Err(e) => Err(e),
            };
            match started {
                Ok(session) => {
                    info!(
                        "Browser session ready using chromedriver from {}",
                        DriverSource::Manager
                    );
                    return Ok(session);
                }
                Err(e) => {
                    warn!("chromedriver from {} failed: {}", DriverSource::Manager, e);
                    attempts.push(format!("{}: {}", DriverSource::Manager, e));
                }
            }
        } else {
            debug!("Driver download disabled");
        }

        Err(SessionError::Setup {
            attempts,
            guidance: SETUP_GUIDANCE.to_string(),
        })
    }

    async fn start(
        path: &Path,
        port: u16,
        caps: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Self, String> {
        let driver = chromedriver::launch(path, port).await?;
        let client = webdriver::connect(&driver.webdriver_url(), caps.clone()).await?;
        Ok(Self::new(client, Some(driver)))
    }

    fn client(&self) -> Result<&Client, SessionError> {
        self.client.as_ref().ok_or(SessionError::NotReady)
    }

    fn element(&self, element: ElementRef) -> Result<&Element, SessionError> {
        self.elements
            .get(element.0)
            .ok_or(SessionError::StaleElement(element.0))
    }

    fn register(&mut self, found: Vec<Element>) -> Vec<ElementRef> {
        let handles: Vec<ElementRef> = found
            .into_iter()
            .map(|element| {
                let id = element.element_id().to_string();
                self.elements.insert(id, element)
            })
            .collect();
        debug!("{} element handle(s) held", self.elements.len());
        handles
    }

    async fn run_on(&self, script: &str, element: ElementRef) -> Result<(), SessionError> {
        let arg = serde_json::to_value(self.element(element)?)?;
        self.client()?
            .execute(script, vec![arg])
            .await
            .map_err(|e| SessionError::Script(e.to_string()))?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lookup {
    Id,
    XPath,
    LinkText,
    Css,
}

impl Lookup {
    fn native(self, selector: &str) -> fantoccini::Locator<'_> {
        match self {
            Self::Id => fantoccini::Locator::Id(selector),
            Self::XPath => fantoccini::Locator::XPath(selector),
            Self::LinkText => fantoccini::Locator::LinkText(selector),
            Self::Css => fantoccini::Locator::Css(selector),
        }
    }
}

/// WebDriver lookup for a locator. Class and tag locators go through CSS.
fn lookup(locator: &Locator) -> (Lookup, String) {
    match locator.strategy {
        Strategy::Id => (Lookup::Id, locator.selector.clone()),
        Strategy::XPath => (Lookup::XPath, locator.selector.clone()),
        Strategy::LinkText => (Lookup::LinkText, locator.selector.clone()),
        Strategy::Css | Strategy::ClassName | Strategy::TagName => (
            Lookup::Css,
            locator
                .as_css()
                .unwrap_or_else(|| locator.selector.clone()),
        ),
    }
}

fn element_error(element: ElementRef, e: CmdError) -> SessionError {
    match &e {
        CmdError::Standard(wd) if wd.error == ErrorStatus::StaleElementReference => {
            SessionError::StaleElement(element.0)
        }
        _ => SessionError::WebDriver(e.to_string()),
    }
}

#[async_trait]
impl Session for ChromeSession {
    async fn navigate(&mut self, url: &str) -> Result<NavigationResult, SessionError> {
        let client = self.client()?.clone();
        info!("Navigating to: {}", url);
        client
            .goto(url)
            .await
            .map_err(|e| SessionError::Navigation(e.to_string()))?;
        self.elements.clear();

        let title = client.title().await.unwrap_or_default();
        let url = client
            .current_url()
            .await
            .map(|u| u.to_string())
            .unwrap_or_default();
        Ok(NavigationResult { url, title })
    }

    async fn title(&mut self) -> Result<String, SessionError> {
        self.client()?
            .title()
            .await
            .map_err(|e| SessionError::WebDriver(e.to_string()))
    }

    async fn current_url(&mut self) -> Result<String, SessionError> {
        self.client()?
            .current_url()
            .await
            .map(|u| u.to_string())
            .map_err(|e| SessionError::WebDriver(e.to_string()))
    }

    async fn find_all(&mut self, locator: &Locator) -> Result<Vec<ElementRef>, SessionError> {
        let (kind, selector) = lookup(locator);
        let found = self
            .client()?
            .find_all(kind.native(&selector))
            .await
            .map_err(|e| SessionError::WebDriver(e.to_string()))?;
        Ok(self.register(found))
    }

    async fn find_all_within(
        &mut self,
        parent: ElementRef,
        locator: &Locator,
    ) -> Result<Vec<ElementRef>, SessionError> {
        let (kind, selector) = lookup(locator);
        let found = self
            .element(parent)?
            .find_all(kind.native(&selector))
            .await
            .map_err(|e| element_error(parent, e))?;
        Ok(self.register(found))
    }

    async fn is_displayed(&mut self, element: ElementRef) -> Result<bool, SessionError> {
        self.element(element)?
            .is_displayed()
            .await
            .map_err(|e| element_error(element, e))
    }

    async fn is_enabled(&mut self, element: ElementRef) -> Result<bool, SessionError> {
        self.element(element)?
            .is_enabled()
            .await
            .map_err(|e| element_error(element, e))
    }

    async fn text(&mut self, element: ElementRef) -> Result<String, SessionError> {
        self.element(element)?
            .text()
            .await
            .map_err(|e| element_error(element, e))
    }

    async fn attribute(
        &mut self,
        element: ElementRef,
        name: &str,
    ) -> Result<Option<String>, SessionError> {
        self.element(element)?
            .attr(name)
            .await
            .map_err(|e| element_error(element, e))
    }

    async fn clear(&mut self, element: ElementRef) -> Result<(), SessionError> {
        self.element(element)?
            .clear()
            .await
            .map_err(|e| element_error(element, e))
    }

    async fn type_text(&mut self, element: ElementRef, text: &str) -> Result<(), SessionError> {
        self.element(element)?
            .send_keys(text)
            .await
            .map_err(|e| element_error(element, e))
    }

    async fn press_enter(&mut self, element: ElementRef) -> Result<(), SessionError> {
        self.element(element)?
            .send_keys("\u{E007}")
            .await
            .map_err(|e| element_error(element, e))
    }

    async fn click(&mut self, element: ElementRef) -> Result<(), SessionError> {
        self.element(element)?
            .click()
            .await
            .map_err(|e| element_error(element, e))
    }

    async fn select_by_text(
        &mut self,
        element: ElementRef,
        text: &str,
    ) -> Result<(), SessionError> {
        self.element(element)?
            .select_by_label(text)
            .await
            .map_err(|e| element_error(element, e))
    }

    async fn scroll_into_view(&mut self, element: ElementRef) -> Result<(), SessionError> {
        self.run_on(
            "arguments[0].scrollIntoView({block: 'center', inline: 'nearest'});",
            element,
        )
        .await
    }

    async fn script_click(&mut self, element: ElementRef) -> Result<(), SessionError> {
        self.run_on("arguments[0].click();", element).await
    }

    async fn vertical_position(&mut self, element: ElementRef) -> Result<f64, SessionError> {
        let (_, y, _, _) = self
            .element(element)?
            .rectangle()
            .await
            .map_err(|e| element_error(element, e))?;
        Ok(y)
    }

    async fn release(&mut self) -> Result<(), SessionError> {
        self.elements.clear();
        let closed = match self.client.take() {
            Some(client) => client
                .close()
                .await
                .map_err(|e| SessionError::WebDriver(format!("Failed to close session: {}", e))),
            None => Ok(()),
        };
        // Dropping the process handle stops chromedriver.
        self.driver = None;
        closed
    }
}

/// Acquire a session, run `body` on it, and release the session whether
/// the body returns, errors or panics. A panic is resumed after release.
pub async fn with_session<T>(
    config: &BrowserConfig,
    body: impl for<'a> FnOnce(&'a mut dyn Session) -> BoxFuture<'a, T>,
) -> Result<T, SessionError> {
    let mut session = ChromeSession::acquire(config).await?;
    let outcome = AssertUnwindSafe(body(&mut session)).catch_unwind().await;

    if let Err(e) = session.release().await {
        warn!("Failed to release browser session: {}", e);
    }
    match outcome {
        Ok(value) => Ok(value),
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_strategies() {
        assert_eq!(
            lookup(&Locator::id("name-input")),
            (Lookup::Id, "name-input".to_string())
        );
        assert_eq!(
            lookup(&Locator::class_name("notification-text notification-title")),
            (
                Lookup::Css,
                ".notification-text.notification-title".to_string()
            )
        );
        assert_eq!(lookup(&Locator::tag_name("tr")).0, Lookup::Css);
        assert_eq!(
            lookup(&Locator::link_text("View All Traces")).0,
            Lookup::LinkText
        );
    }

    #[test]
    fn test_handles_reused_for_known_elements() {
        let mut handles = Handles::new();
        let first = handles.insert("e-1".to_string(), "row");
        let second = handles.insert("e-2".to_string(), "button");
        assert_ne!(first, second);

        // Polling finds the same elements again.
        for _ in 0..10 {
            assert_eq!(handles.insert("e-1".to_string(), "row again"), first);
        }
        assert_eq!(handles.len(), 2);
        assert_eq!(handles.get(first.0), Some(&"row again"));
    }

    #[test]
    fn test_cleared_handles_are_stale() {
        let mut handles = Handles::new();
        let row = handles.insert("e-1".to_string(), "row");
        handles.clear();
        assert_eq!(handles.get(row.0), None);

        let fresh = handles.insert("e-1".to_string(), "row");
        assert_ne!(fresh, row);
    }

    #[tokio::test]
    async fn test_setup_error_lists_every_attempt() {
        let config = BrowserConfig {
            driver_path: Some("/nonexistent/chromedriver".into()),
            webdriver_url: Some("http://127.0.0.1:9".to_string()),
            allow_download: false,
            ..Default::default()
        };

        match ChromeSession::acquire(&config).await {
            Err(SessionError::Setup { attempts, guidance }) => {
                assert!(attempts[0].starts_with("WEBDRIVER_URL"));
                assert!(attempts[1].starts_with("configured path /nonexistent/chromedriver"));
                assert!(guidance.contains("WEBDRIVER_URL"));
            }
            Err(other) => panic!("expected a setup error, got {}", other),
            // A working chromedriver on PATH wins over the broken candidates.
            Ok(mut session) => session.release().await.unwrap(),
        }
    }
}
