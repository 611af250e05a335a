//! Generic page driver.
//!
//! Every dashboard domain runs the same navigate, fill, submit and read
//! skeleton. A [`DomainSpec`] names the catalog entries a domain uses for
//! each step, and the domain modules add their own accessors on top.

pub mod circuit;
pub mod maintenance;
pub mod pathfinder;
pub mod status;
pub mod trace;

use crate::api::ApiClient;
use crate::config::SuiteConfig;
use crate::fixtures::{FieldValue, FormRecord};
use crate::resolve::Resolver;
use crate::session::{ElementRef, Session, SessionError};
use kuit_common::locator::{Locator, LocatorCatalog, ResolveMode};
use std::fmt;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

pub use crate::resolve::Resolved;

const DIAGNOSTIC_BUTTONS: usize = 10;
const SETTLE_RETRY: Duration = Duration::from_millis(100);

/// How a form control receives its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Clear, then type.
    Text,
    /// Clear, type, then confirm the suggestion with Enter.
    Autocomplete,
    /// Pick one `<option>` by visible text.
    Select,
    /// Pick every listed `<option>` by visible text.
    MultiSelect,
    /// Click once when the record's flag is set.
    Toggle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }

    pub const fn text(name: &'static str) -> Self {
        Self::new(name, FieldKind::Text)
    }
}

/// What to wait for after an action that re-renders the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settle {
    /// Until the named element is present.
    Present(&'static str),
    /// Until the number of matches for the named locator differs from
    /// the count taken before the action.
    CountChanges(&'static str),
    /// A bounded fixed delay, for actions with no observable completion.
    /// Known source of flakiness.
    Fixed,
}

/// Where best-effort cleanup for a domain goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupTarget {
    Circuits,
    MaintenanceWindows,
    None,
}

/// Catalog entry names and hooks that make up one dashboard domain.
#[derive(Debug)]
pub struct DomainSpec {
    pub domain: &'static str,
    /// Main menu button that opens the domain.
    pub entry: &'static str,
    /// Control whose presence shows the domain rendered.
    pub ready: &'static str,
    pub required: &'static [FieldSpec],
    pub optional: &'static [FieldSpec],
    pub submit: Option<&'static str>,
    pub submit_settle: Settle,
    pub result_rows: Option<&'static str>,
    pub cleanup: CleanupTarget,
}

/// Locator for a main menu button by its title.
pub(crate) fn main_button(title: &str) -> Locator {
    Locator::css(format!(
        "button[data-test=\"main-button\"][title=\"{}\"]",
        title
    ))
}

/// Locator for an enabled button whose text contains `label`.
pub(crate) fn enabled_button(label: &str) -> Locator {
    Locator::xpath(format!(
        "//button[contains(., '{}') and not(@disabled)]",
        label
    ))
}

/// Entries every form domain carries: readiness marker, notifications and
/// validation errors.
pub(crate) fn with_form_entries(catalog: LocatorCatalog) -> LocatorCatalog {
    catalog
        .with(
            "form_ready",
            Locator::css("input[class='k-input'], textarea, select"),
        )
        .with(
            "message_title",
            Locator::class_name("notification-text notification-title"),
        )
        .with(
            "message_description",
            Locator::class_name("notification-text notification-description"),
        )
        .with(
            "validation_error",
            Locator::css(".validation-error, [class*='error']"),
        )
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ButtonInfo {
    pub title: String,
    pub text: String,
    pub data_test: String,
}

/// Page context gathered when navigation fails.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub reason: String,
    pub url: Option<String>,
    pub title: Option<String>,
    pub buttons: Vec<ButtonInfo>,
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reason)?;
        if let Some(url) = &self.url {
            write!(f, "\n  url: {}", url)?;
        }
        if let Some(title) = &self.title {
            write!(f, "\n  title: {}", title)?;
        }
        if !self.buttons.is_empty() {
            write!(f, "\n  buttons:")?;
        }
        for (i, button) in self.buttons.iter().enumerate() {
            write!(
                f,
                "\n    {}. title='{}' text='{}' data-test='{}'",
                i + 1,
                button.title,
                button.text,
                button.data_test
            )?;
        }
        Ok(())
    }
}

/// Notification and validation text shown by a form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormMessages {
    pub title: Option<String>,
    pub description: Option<String>,
    pub validation_errors: Vec<String>,
}

impl FormMessages {
    /// No notification or validation text on the page.
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.validation_errors.is_empty()
    }

    pub fn mentions(&self, needle: &str) -> bool {
        self.title
            .iter()
            .chain(self.description.iter())
            .chain(self.validation_errors.iter())
            .any(|text| text.contains(needle))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FillReport {
    pub filled: Vec<&'static str>,
    /// Optional fields whose control was not on the page.
    pub skipped: Vec<&'static str>,
}

pub struct PageDriver<'s> {
    session: &'s mut dyn Session,
    spec: &'static DomainSpec,
    catalog: LocatorCatalog,
    resolver: Resolver,
    base_url: String,
    settle: Duration,
    api: ApiClient,
    diagnostics: Option<Diagnostics>,
}

impl<'s> PageDriver<'s> {
    pub fn new(
        session: &'s mut dyn Session,
        spec: &'static DomainSpec,
        catalog: LocatorCatalog,
        config: &SuiteConfig,
        api: ApiClient,
    ) -> Self {
        Self {
            session,
            spec,
            catalog,
            resolver: Resolver::new(config.timeouts.default_wait()),
            base_url: config.ui.base_url.clone(),
            settle: config.timeouts.settle(),
            api,
            diagnostics: None,
        }
    }

    pub fn spec(&self) -> &'static DomainSpec {
        self.spec
    }

    pub fn catalog(&self) -> &LocatorCatalog {
        &self.catalog
    }

    pub fn session(&mut self) -> &mut dyn Session {
        &mut *self.session
    }

    /// Context captured by the last failed [`PageDriver::navigate`].
    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        self.diagnostics.as_ref()
    }

    fn locator(&self, name: &str) -> Result<Locator, SessionError> {
        self.catalog.get(name).cloned()
    }

    pub async fn resolve(&mut self, name: &str, mode: ResolveMode) -> Result<Resolved, SessionError> {
        let locator = self.locator(name)?;
        self.resolver
            .resolve(&mut *self.session, name, &locator, mode)
            .await
    }

    /// First element present under `name`, waiting up to the default wait.
    pub async fn find(&mut self, name: &str) -> Result<ElementRef, SessionError> {
        let locator = self.locator(name)?;
        self.resolver.presence(&mut *self.session, name, &locator).await
    }

    pub async fn find_clickable(&mut self, name: &str) -> Result<ElementRef, SessionError> {
        let locator = self.locator(name)?;
        self.resolver.clickable(&mut *self.session, name, &locator).await
    }

    /// Current matches for `name`, without waiting.
    pub async fn find_all(&mut self, name: &str) -> Result<Vec<ElementRef>, SessionError> {
        let locator = self.locator(name)?;
        self.resolver.all(&mut *self.session, &locator).await
    }

    pub async fn count(&mut self, name: &str) -> Result<usize, SessionError> {
        Ok(self.find_all(name).await?.len())
    }

    /// Open the domain from the dashboard home and check its controls
    /// rendered. Returns false instead of failing; see
    /// [`PageDriver::diagnostics`] for why.
    pub async fn navigate(&mut self) -> bool {
        self.diagnostics = None;
        match self.try_navigate().await {
            Ok(controls) => {
                info!(
                    "Opened {} with {} interactive element(s)",
                    self.spec.domain, controls
                );
                true
            }
            Err(e) => {
                let diagnostics = self.collect_diagnostics(e.to_string()).await;
                warn!("Failed to open {}: {}", self.spec.domain, diagnostics);
                self.diagnostics = Some(diagnostics);
                false
            }
        }
    }

    async fn try_navigate(&mut self) -> Result<usize, SessionError> {
        let base_url = self.base_url.clone();
        self.session.navigate(&base_url).await?;
        let entry = self.find_clickable(self.spec.entry).await?;
        self.session.click(entry).await?;
        self.find(self.spec.ready).await?;
        let controls = self.count(self.spec.ready).await?;
        if controls == 0 {
            return Err(SessionError::Navigation(format!(
                "no interactive elements after opening {}",
                self.spec.domain
            )));
        }
        Ok(controls)
    }

    async fn collect_diagnostics(&mut self, reason: String) -> Diagnostics {
        let url = self.session.current_url().await.ok();
        let title = self.session.title().await.ok();
        let mut buttons = Vec::new();
        if let Ok(found) = self.session.find_all(&Locator::tag_name("button")).await {
            for button in found.into_iter().take(DIAGNOSTIC_BUTTONS) {
                buttons.push(ButtonInfo {
                    title: self.attribute_or_empty(button, "title").await,
                    text: self
                        .session
                        .text(button)
                        .await
                        .map(|t| t.trim().to_string())
                        .unwrap_or_default(),
                    data_test: self.attribute_or_empty(button, "data-test").await,
                });
            }
        }
        Diagnostics {
            reason,
            url,
            title,
            buttons,
        }
    }

    async fn attribute_or_empty(&mut self, element: ElementRef, name: &str) -> String {
        self.session
            .attribute(element, name)
            .await
            .ok()
            .flatten()
            .unwrap_or_default()
    }

    /// Fill the domain form from `record`.
    ///
    /// Required fields always get a value (empty when the record has none)
    /// and a missing control is an error. Optional fields are only touched
    /// when the record has a non-empty value, and a missing control is
    /// logged and skipped.
    pub async fn fill(&mut self, record: &dyn FormRecord) -> Result<FillReport, SessionError> {
        let mut report = FillReport::default();

        for field in self.spec.required {
            let value = record
                .field(field.name)
                .unwrap_or_else(|| FieldValue::Text(String::new()));
            self.set_field(field, &value).await?;
            report.filled.push(field.name);
        }

        for field in self.spec.optional {
            let Some(value) = record.field(field.name).filter(|v| !v.is_empty()) else {
                continue;
            };
            match self.set_field(field, &value).await {
                Ok(()) => report.filled.push(field.name),
                Err(SessionError::NotFound { .. } | SessionError::UnknownLocator { .. }) => {
                    warn!("Optional field '{}' not found, skipping", field.name);
                    report.skipped.push(field.name);
                }
                Err(e) => return Err(e),
            }
        }

        debug!(
            "Filled {} field(s) on {}, skipped {}",
            report.filled.len(),
            self.spec.domain,
            report.skipped.len()
        );
        Ok(report)
    }

    async fn set_field(&mut self, field: &FieldSpec, value: &FieldValue) -> Result<(), SessionError> {
        match field.kind {
            FieldKind::Text => {
                let element = self.find(field.name).await?;
                self.session.clear(element).await?;
                self.session.type_text(element, &value.as_text()).await
            }
            FieldKind::Autocomplete => {
                let element = self.find(field.name).await?;
                self.session.clear(element).await?;
                self.session.type_text(element, &value.as_text()).await?;
                self.session.press_enter(element).await
            }
            FieldKind::Select => {
                let element = self.find(field.name).await?;
                self.session.select_by_text(element, &value.as_text()).await
            }
            FieldKind::MultiSelect => {
                let element = self.find(field.name).await?;
                let items = match value {
                    FieldValue::List(items) => items.clone(),
                    other => vec![other.as_text()],
                };
                for item in &items {
                    self.session.select_by_text(element, item).await?;
                }
                Ok(())
            }
            FieldKind::Toggle => {
                if matches!(value, FieldValue::Flag(false)) {
                    return Ok(());
                }
                let element = self.find_clickable(field.name).await?;
                self.session.click(element).await
            }
        }
    }

    /// Click the domain's submit control and wait for the page to settle.
    pub async fn submit(&mut self) -> Result<(), SessionError> {
        let Some(submit) = self.spec.submit else {
            return Err(SessionError::Other(format!(
                "{} has no submit control",
                self.spec.domain
            )));
        };
        self.click_and_settle(submit, self.spec.submit_settle).await
    }

    /// Click a named control, then wait according to `settle`.
    pub async fn click_and_settle(&mut self, name: &str, settle: Settle) -> Result<(), SessionError> {
        let before = match settle {
            Settle::CountChanges(watched) => self.count(watched).await?,
            _ => 0,
        };
        let element = self.find_clickable(name).await?;
        self.session.click(element).await?;
        self.wait_settle(settle, before).await
    }

    pub async fn click_named(&mut self, name: &str) -> Result<(), SessionError> {
        let element = self.find_clickable(name).await?;
        self.session.click(element).await
    }

    async fn wait_settle(&mut self, settle: Settle, before: usize) -> Result<(), SessionError> {
        match settle {
            Settle::Present(name) => {
                let locator = self.locator(name)?;
                let bounded = Resolver::new(self.settle).with_retry_interval(SETTLE_RETRY);
                match bounded.presence(&mut *self.session, name, &locator).await {
                    Ok(_) => Ok(()),
                    Err(SessionError::NotFound { .. }) => {
                        debug!("'{}' did not appear within {:?}", name, self.settle);
                        Ok(())
                    }
                    Err(e) => Err(e),
                }
            }
            Settle::CountChanges(name) => {
                let started = Instant::now();
                loop {
                    let now = self.count(name).await?;
                    if now != before {
                        return Ok(());
                    }
                    let elapsed = started.elapsed();
                    if elapsed >= self.settle {
                        debug!("'{}' count stayed at {} for {:?}", name, now, self.settle);
                        return Ok(());
                    }
                    sleep(SETTLE_RETRY.min(self.settle - elapsed)).await;
                }
            }
            Settle::Fixed => {
                sleep(self.settle).await;
                Ok(())
            }
        }
    }

    /// Trimmed text of every `<td>` in a table row.
    pub async fn row_cells(&mut self, row: ElementRef) -> Result<Vec<String>, SessionError> {
        let cells = self
            .session
            .find_all_within(row, &Locator::xpath("./td"))
            .await?;
        let mut texts = Vec::with_capacity(cells.len());
        for cell in cells {
            texts.push(self.session.text(cell).await?.trim().to_string());
        }
        Ok(texts)
    }

    /// Rows matching `name`, each as its cell texts, in page order.
    /// Rows that go stale while being read are skipped.
    pub async fn read_rows(&mut self, name: &str) -> Result<Vec<Vec<String>>, SessionError> {
        let rows = self.find_all(name).await?;
        let mut table = Vec::with_capacity(rows.len());
        for row in rows {
            match self.row_cells(row).await {
                Ok(cells) => table.push(cells),
                Err(e) if e.is_retryable() => debug!("Skipping stale row: {}", e),
                Err(e) => return Err(e),
            }
        }
        Ok(table)
    }

    /// The domain's result table.
    pub async fn read_result_table(&mut self) -> Result<Vec<Vec<String>>, SessionError> {
        let Some(rows) = self.spec.result_rows else {
            return Ok(Vec::new());
        };
        self.read_rows(rows).await
    }

    /// Cell `column` of the first result row.
    pub async fn first_row_column(&mut self, column: usize) -> Result<Option<String>, SessionError> {
        let table = self.read_result_table().await?;
        Ok(table.into_iter().next().and_then(|row| row.into_iter().nth(column)))
    }

    /// Notification and validation messages currently shown. Never waits.
    pub async fn messages(&mut self) -> Result<FormMessages, SessionError> {
        Ok(FormMessages {
            title: self.first_text("message_title").await?,
            description: self.first_text("message_description").await?,
            validation_errors: self.all_texts("validation_error").await?,
        })
    }

    async fn first_text(&mut self, name: &str) -> Result<Option<String>, SessionError> {
        if !self.catalog.contains(name) {
            return Ok(None);
        }
        match self.find_all(name).await?.first() {
            Some(element) => Ok(Some(self.session.text(*element).await?)),
            None => Ok(None),
        }
    }

    async fn all_texts(&mut self, name: &str) -> Result<Vec<String>, SessionError> {
        if !self.catalog.contains(name) {
            return Ok(Vec::new());
        }
        let mut texts = Vec::new();
        for element in self.find_all(name).await? {
            texts.push(self.session.text(element).await?);
        }
        Ok(texts)
    }

    /// Best-effort deletion of remote resources matching `keys`.
    ///
    /// Circuits match by name; maintenance windows by description or id.
    /// Never fails; returns how many resources were deleted.
    pub async fn cleanup(&self, keys: &[String]) -> usize {
        match self.spec.cleanup {
            CleanupTarget::Circuits => self.api.cleanup_circuits(keys).await,
            CleanupTarget::MaintenanceWindows => {
                self.api
                    .cleanup_windows(|window| {
                        keys.iter().any(|key| {
                            window.description.as_deref() == Some(key.as_str())
                                || window.id.as_deref() == Some(key.as_str())
                        })
                    })
                    .await
            }
            CleanupTarget::None => {
                debug!("{} has no remote resources to clean up", self.spec.domain);
                0
            }
        }
    }
}
