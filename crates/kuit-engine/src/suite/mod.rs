//! Scenario catalog and serial runner.
//!
//! Every scenario is registered once with its domain, a unique name and
//! tags. Selection narrows the catalog by any of the three; the runner then
//! executes the selection one scenario at a time against a single session.

pub mod circuit;
pub mod maintenance;
pub mod pathfinder;
pub mod status;
pub mod trace;

use crate::api::ApiClient;
use crate::config::SuiteConfig;
use crate::page::PageDriver;
use crate::poller::Poller;
use crate::scenario::{Expectation, ScenarioError, ScenarioReport, Steps, run_scenario};
use crate::session::{Session, SessionError};
use kuit_common::error::ApiError;
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

/// Everything a scenario needs besides the browser session.
#[derive(Debug, Clone)]
pub struct SuiteContext {
    pub config: SuiteConfig,
    pub api: ApiClient,
}

impl SuiteContext {
    pub fn new(config: SuiteConfig) -> Result<Self, ApiError> {
        let api = ApiClient::from_config(&config)?;
        Ok(Self { config, api })
    }

    pub fn with_api(config: SuiteConfig, api: ApiClient) -> Self {
        Self { config, api }
    }

    /// The shared reconciliation deadline. Positive and negative scenarios
    /// both wait this long.
    pub fn reconcile_poller(&self) -> Poller {
        Poller::new(
            self.config.timeouts.reconcile(),
            self.config.timeouts.poll_interval(),
        )
    }

    pub fn active_poller(&self) -> Poller {
        Poller::new(
            self.config.timeouts.active_wait(),
            self.config.timeouts.poll_interval(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    Circuit,
    PathFinder,
    Trace,
    Maintenance,
    Status,
}

impl Domain {
    pub const ALL: [Domain; 5] = [
        Self::Circuit,
        Self::PathFinder,
        Self::Trace,
        Self::Maintenance,
        Self::Status,
    ];
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Circuit => "circuit",
            Self::PathFinder => "path-finder",
            Self::Trace => "trace",
            Self::Maintenance => "maintenance",
            Self::Status => "status",
        };
        f.write_str(name)
    }
}

impl FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "circuit" | "evc" | "mef-eline" | "mef_eline" => Ok(Self::Circuit),
            "path-finder" | "pathfinder" => Ok(Self::PathFinder),
            "trace" | "sdntrace" => Ok(Self::Trace),
            "maintenance" => Ok(Self::Maintenance),
            "status" | "statusmenu" => Ok(Self::Status),
            other => Err(format!("unknown domain '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioTag {
    Smoke,
    Negative,
    Boundary,
    Performance,
}

impl fmt::Display for ScenarioTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Smoke => "smoke",
            Self::Negative => "negative",
            Self::Boundary => "boundary",
            Self::Performance => "performance",
        };
        f.write_str(name)
    }
}

impl FromStr for ScenarioTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "smoke" => Ok(Self::Smoke),
            "negative" => Ok(Self::Negative),
            "boundary" => Ok(Self::Boundary),
            "performance" => Ok(Self::Performance),
            other => Err(format!("unknown tag '{}'", other)),
        }
    }
}

/// Builds the steps of one scenario for a session.
pub type ScenarioFn = for<'c> fn(&'c mut dyn Session, &'c SuiteContext) -> Box<dyn Steps + 'c>;

#[derive(Clone, Copy)]
pub struct ScenarioEntry {
    pub domain: Domain,
    pub name: &'static str,
    pub tags: &'static [ScenarioTag],
    pub build: ScenarioFn,
}

impl ScenarioEntry {
    pub fn new(
        domain: Domain,
        name: &'static str,
        tags: &'static [ScenarioTag],
        build: ScenarioFn,
    ) -> Self {
        Self {
            domain,
            name,
            tags,
            build,
        }
    }

    pub fn has_tag(&self, tag: ScenarioTag) -> bool {
        self.tags.contains(&tag)
    }
}

impl fmt::Debug for ScenarioEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScenarioEntry")
            .field("domain", &self.domain)
            .field("name", &self.name)
            .field("tags", &self.tags)
            .finish()
    }
}

/// Every registered scenario, grouped by domain.
pub fn catalog() -> Vec<ScenarioEntry> {
    let mut entries = Vec::new();
    entries.extend(circuit::scenarios());
    entries.extend(pathfinder::scenarios());
    entries.extend(trace::scenarios());
    entries.extend(maintenance::scenarios());
    entries.extend(status::scenarios());
    entries
}

/// Scenario filter. Empty criteria match everything; non-empty ones must
/// all match.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub domains: Vec<Domain>,
    /// Exact scenario names.
    pub names: Vec<String>,
    pub tags: Vec<ScenarioTag>,
}

impl Selection {
    pub fn matches(&self, entry: &ScenarioEntry) -> bool {
        (self.domains.is_empty() || self.domains.contains(&entry.domain))
            && (self.names.is_empty() || self.names.iter().any(|n| n == entry.name))
            && (self.tags.is_empty() || self.tags.iter().any(|t| entry.has_tag(*t)))
    }

    pub fn apply(&self, entries: Vec<ScenarioEntry>) -> Vec<ScenarioEntry> {
        entries.into_iter().filter(|e| self.matches(e)).collect()
    }
}

/// Run `entries` one after another on `session`.
///
/// With `fail_fast` the run stops after the first failing scenario; its
/// cleanup has already run by then.
pub async fn run_selected(
    session: &mut dyn Session,
    suite: &SuiteContext,
    entries: &[ScenarioEntry],
    fail_fast: bool,
) -> Vec<ScenarioReport> {
    let mut reports = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        info!(
            "[{}/{}] {} :: {}",
            i + 1,
            entries.len(),
            entry.domain,
            entry.name
        );
        let mut steps = (entry.build)(&mut *session, suite);
        let report = run_scenario(entry.name, steps.as_mut()).await;
        drop(steps);

        let failed = !report.passed();
        reports.push(report);
        if failed && fail_fast {
            warn!("Stopping after first failure");
            break;
        }
    }
    reports
}

/// Open the domain, turning a failed navigation into a scenario error that
/// carries the page diagnostics.
pub(crate) async fn open_page(page: &mut PageDriver<'_>) -> Result<(), ScenarioError> {
    if page.navigate().await {
        return Ok(());
    }
    Err(ScenarioError::Navigation {
        diagnostics: page.diagnostics().cloned().unwrap_or_default(),
    })
}

/// Submit the form. A negative scenario whose submit control never became
/// clickable counts as rejected input, not as a failed step.
pub(crate) async fn submit_form(
    page: &mut PageDriver<'_>,
    expectation: Expectation,
) -> Result<(), ScenarioError> {
    match page.submit().await {
        Ok(()) => Ok(()),
        Err(SessionError::NotFound { name, .. }) if expectation == Expectation::Absent => {
            info!("Submit control '{}' stayed disabled, input rejected", name);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// The `n`th fixture record. Builders only ask for indices their fixture
/// list has; release builds fall back to an empty record.
pub(crate) fn pick<T: Default>(records: Vec<T>, n: usize) -> T {
    debug_assert!(
        n < records.len(),
        "fixture index {} out of {} record(s)",
        n,
        records.len()
    );
    records.into_iter().nth(n).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_pick_returns_indexed_record() {
        assert_eq!(pick(vec!["a", "b"], 1), "b");
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "fixture index 3 out of 1")]
    fn test_pick_rejects_missing_fixture() {
        pick(vec![String::from("only")], 3);
    }

    #[test]
    fn test_catalog_names_are_unique() {
        let entries = catalog();
        let names: HashSet<_> = entries.iter().map(|e| e.name).collect();
        assert_eq!(names.len(), entries.len());
    }

    #[test]
    fn test_catalog_covers_every_domain() {
        let entries = catalog();
        for domain in Domain::ALL {
            assert!(
                entries.iter().any(|e| e.domain == domain),
                "no scenario for {}",
                domain
            );
        }
    }

    #[test]
    fn test_selection_by_tag_and_domain() {
        let selection = Selection {
            domains: vec![Domain::Circuit],
            tags: vec![ScenarioTag::Performance],
            ..Default::default()
        };
        let selected = selection.apply(catalog());
        assert!(!selected.is_empty());
        assert!(selected.iter().all(|e| e.domain == Domain::Circuit));
        assert!(selected.iter().all(|e| e.has_tag(ScenarioTag::Performance)));
    }

    #[test]
    fn test_selection_by_name() {
        let selection = Selection {
            names: vec!["circuit_basic".to_string()],
            ..Default::default()
        };
        let selected = selection.apply(catalog());
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name, "circuit_basic");
    }

    #[test]
    fn test_domain_and_tag_parsing() {
        assert_eq!("mef-eline".parse::<Domain>().unwrap(), Domain::Circuit);
        assert_eq!("SDNTrace".parse::<Domain>().unwrap(), Domain::Trace);
        assert!("routing".parse::<Domain>().is_err());
        assert_eq!(
            "performance".parse::<ScenarioTag>().unwrap(),
            ScenarioTag::Performance
        );
    }
}
