#![allow(dead_code)]

use async_trait::async_trait;
use kuit_engine::config::SuiteConfig;
use kuit_engine::locator::{Locator, LocatorCatalog};
use kuit_engine::session::{ElementRef, NavigationResult, Session, SessionError};
use std::collections::HashMap;
use std::io::Read;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use tiny_http::{Response, Server};

/// Route engine logs to the test harness. `RUST_LOG` picks the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Config with waits short enough for tests.
pub fn fast_config() -> SuiteConfig {
    let mut config = SuiteConfig::default();
    config.ui.base_url = "http://dashboard.test".to_string();
    config.timeouts.default_wait_ms = 60;
    config.timeouts.settle_ms = 20;
    config.timeouts.reconcile_ms = 300;
    config.timeouts.poll_interval_ms = 20;
    config.timeouts.active_wait_ms = 300;
    config.timeouts.request_timeout_ms = 2000;
    config
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Navigate(String),
    Clear(u64),
    Type(u64, String),
    Enter(u64),
    Click(u64),
    ScriptClick(u64),
    Select(u64, String),
    Release,
}

#[derive(Debug, Clone)]
pub struct FakeElement {
    pub text: String,
    pub value: String,
    pub attributes: HashMap<String, String>,
    pub displayed: bool,
    pub enabled: bool,
    pub y: f64,
}

impl FakeElement {
    pub fn new() -> Self {
        Self {
            text: String::new(),
            value: String::new(),
            attributes: HashMap::new(),
            displayed: true,
            enabled: true,
            y: 0.0,
        }
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn value(mut self, value: &str) -> Self {
        self.value = value.to_string();
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn at(mut self, y: f64) -> Self {
        self.y = y;
        self
    }
}

/// In-memory page: elements are registered under the selector string of
/// the locator that finds them.
#[derive(Debug, Default)]
pub struct MockSession {
    elements: HashMap<u64, FakeElement>,
    matches: HashMap<String, Vec<u64>>,
    children: HashMap<(u64, String), Vec<u64>>,
    on_click: HashMap<u64, Vec<(String, u64)>>,
    next_id: u64,
    pub url: String,
    pub title: String,
    pub actions: Vec<Action>,
}

impl MockSession {
    pub fn new() -> Self {
        Self {
            url: "about:blank".to_string(),
            title: "Kytos".to_string(),
            ..Default::default()
        }
    }

    fn insert(&mut self, element: FakeElement) -> u64 {
        self.next_id += 1;
        self.elements.insert(self.next_id, element);
        self.next_id
    }

    /// Add an element found by `selector`.
    pub fn add(&mut self, selector: &str, element: FakeElement) -> ElementRef {
        let id = self.insert(element);
        self.matches.entry(selector.to_string()).or_default().push(id);
        ElementRef(id)
    }

    /// Add an element under the selector a catalog entry uses.
    pub fn add_named(
        &mut self,
        catalog: &LocatorCatalog,
        name: &str,
        element: FakeElement,
    ) -> ElementRef {
        let selector = catalog.get(name).unwrap().selector.clone();
        self.add(&selector, element)
    }

    /// Add a table row with one `<td>` per cell.
    pub fn add_row(&mut self, selector: &str, cells: &[&str], y: f64) -> ElementRef {
        let row = self.add(selector, FakeElement::new().at(y));
        for cell in cells {
            let id = self.insert(FakeElement::new().text(cell));
            self.children
                .entry((row.0, "./td".to_string()))
                .or_default()
                .push(id);
        }
        row
    }

    /// Clicking `trigger` makes a new element appear under `selector`.
    pub fn reveal_on_click(&mut self, trigger: ElementRef, selector: &str, element: FakeElement) {
        let id = self.insert(element);
        self.on_click
            .entry(trigger.0)
            .or_default()
            .push((selector.to_string(), id));
    }

    pub fn value_of(&self, element: ElementRef) -> String {
        self.elements
            .get(&element.0)
            .map(|e| e.value.clone())
            .unwrap_or_default()
    }

    pub fn count(&self, selector: &str) -> usize {
        self.matches.get(selector).map_or(0, Vec::len)
    }

    fn element(&mut self, element: ElementRef) -> Result<&mut FakeElement, SessionError> {
        self.elements
            .get_mut(&element.0)
            .ok_or(SessionError::StaleElement(element.0))
    }

    fn clicked(&mut self, element: ElementRef) {
        if let Some(revealed) = self.on_click.remove(&element.0) {
            for (selector, id) in revealed {
                self.matches.entry(selector).or_default().push(id);
            }
        }
    }
}

#[async_trait]
impl Session for MockSession {
    async fn navigate(&mut self, url: &str) -> Result<NavigationResult, SessionError> {
        self.actions.push(Action::Navigate(url.to_string()));
        self.url = url.to_string();
        Ok(NavigationResult {
            url: self.url.clone(),
            title: self.title.clone(),
        })
    }

    async fn title(&mut self) -> Result<String, SessionError> {
        Ok(self.title.clone())
    }

    async fn current_url(&mut self) -> Result<String, SessionError> {
        Ok(self.url.clone())
    }

    async fn find_all(&mut self, locator: &Locator) -> Result<Vec<ElementRef>, SessionError> {
        Ok(self
            .matches
            .get(&locator.selector)
            .map(|ids| ids.iter().map(|id| ElementRef(*id)).collect())
            .unwrap_or_default())
    }

    async fn find_all_within(
        &mut self,
        parent: ElementRef,
        locator: &Locator,
    ) -> Result<Vec<ElementRef>, SessionError> {
        Ok(self
            .children
            .get(&(parent.0, locator.selector.clone()))
            .map(|ids| ids.iter().map(|id| ElementRef(*id)).collect())
            .unwrap_or_default())
    }

    async fn is_displayed(&mut self, element: ElementRef) -> Result<bool, SessionError> {
        Ok(self.element(element)?.displayed)
    }

    async fn is_enabled(&mut self, element: ElementRef) -> Result<bool, SessionError> {
        Ok(self.element(element)?.enabled)
    }

    async fn text(&mut self, element: ElementRef) -> Result<String, SessionError> {
        Ok(self.element(element)?.text.clone())
    }

    async fn attribute(
        &mut self,
        element: ElementRef,
        name: &str,
    ) -> Result<Option<String>, SessionError> {
        Ok(self.element(element)?.attributes.get(name).cloned())
    }

    async fn clear(&mut self, element: ElementRef) -> Result<(), SessionError> {
        self.element(element)?.value.clear();
        self.actions.push(Action::Clear(element.0));
        Ok(())
    }

    async fn type_text(&mut self, element: ElementRef, text: &str) -> Result<(), SessionError> {
        self.element(element)?.value.push_str(text);
        self.actions.push(Action::Type(element.0, text.to_string()));
        Ok(())
    }

    async fn press_enter(&mut self, element: ElementRef) -> Result<(), SessionError> {
        self.element(element)?;
        self.actions.push(Action::Enter(element.0));
        Ok(())
    }

    async fn click(&mut self, element: ElementRef) -> Result<(), SessionError> {
        self.element(element)?;
        self.actions.push(Action::Click(element.0));
        self.clicked(element);
        Ok(())
    }

    async fn select_by_text(&mut self, element: ElementRef, text: &str) -> Result<(), SessionError> {
        self.element(element)?.value = text.to_string();
        self.actions.push(Action::Select(element.0, text.to_string()));
        Ok(())
    }

    async fn script_click(&mut self, element: ElementRef) -> Result<(), SessionError> {
        self.element(element)?;
        self.actions.push(Action::ScriptClick(element.0));
        self.clicked(element);
        Ok(())
    }

    async fn vertical_position(&mut self, element: ElementRef) -> Result<f64, SessionError> {
        Ok(self.element(element)?.y)
    }

    async fn release(&mut self) -> Result<(), SessionError> {
        self.actions.push(Action::Release);
        Ok(())
    }
}

/// A request seen by [`StubApi`].
#[derive(Debug, Clone, PartialEq)]
pub struct Seen {
    pub method: String,
    pub path: String,
    pub body: String,
}

/// Canned REST endpoint on an ephemeral port.
///
/// The handler gets the request and the zero based attempt number and
/// returns a status code and body.
pub struct StubApi {
    pub base: String,
    pub attempts: Arc<AtomicUsize>,
    pub seen: Arc<Mutex<Vec<Seen>>>,
    server: Arc<Server>,
    handle: Option<JoinHandle<()>>,
}

impl StubApi {
    pub fn start<F>(handler: F) -> Self
    where
        F: Fn(&Seen, usize) -> (u16, String) + Send + 'static,
    {
        let server = Arc::new(Server::http("127.0.0.1:0").unwrap());
        let addr = server.server_addr().to_ip().unwrap();
        let attempts = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let handle = {
            let server = Arc::clone(&server);
            let attempts = Arc::clone(&attempts);
            let seen = Arc::clone(&seen);
            thread::spawn(move || {
                for mut request in server.incoming_requests() {
                    let mut body = String::new();
                    let _ = request.as_reader().read_to_string(&mut body);
                    let entry = Seen {
                        method: request.method().as_str().to_string(),
                        path: request.url().to_string(),
                        body,
                    };
                    let attempt = attempts.fetch_add(1, Ordering::SeqCst);
                    let (status, body) = handler(&entry, attempt);
                    seen.lock().unwrap().push(entry);
                    let response = Response::from_string(body).with_status_code(status);
                    let _ = request.respond(response);
                }
            })
        };

        Self {
            base: format!("http://{}", addr),
            attempts,
            seen,
            server,
            handle: Some(handle),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }

    /// Suite config whose API endpoints all point at this stub.
    pub fn config(&self) -> SuiteConfig {
        let mut config = fast_config();
        config.ui.base_url = self.base.clone();
        config
    }
}

impl Drop for StubApi {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
