//! Maintenance window scenarios.

use super::{Domain, ScenarioEntry, ScenarioTag, SuiteContext, open_page, pick, submit_form};
use crate::fixtures::{MaintenanceRecord, maintenance};
use crate::page::maintenance::MaintenancePage;
use crate::scenario::{Expectation, Reconciliation, ScenarioError, Steps};
use crate::session::Session;
use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use kuit_common::protocol::MaintenanceWindow;

/// Layout of `inserted_at` in maintenance API responses.
const INSERTED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

/// Whether `inserted_at` is no earlier than `submitted` (whole seconds).
/// Unparseable values fall back to comparing the formatted strings.
fn inserted_since(inserted_at: &str, submitted: DateTime<Utc>) -> bool {
    let submitted = submitted.trunc_subsecs(0);
    match DateTime::parse_from_str(inserted_at, INSERTED_AT_FORMAT) {
        Ok(inserted) => inserted.with_timezone(&Utc) >= submitted,
        Err(_) => inserted_at >= submitted.format(INSERTED_AT_FORMAT).to_string().as_str(),
    }
}

/// Whether `window` is the one created from `record` after `submitted`.
pub fn window_matches(
    window: &MaintenanceWindow,
    record: &MaintenanceRecord,
    submitted: DateTime<Utc>,
) -> bool {
    window.description.as_deref() == Some(record.description.as_str())
        && window.start.as_deref() == Some(record.start_time.as_str())
        && window.end.as_deref() == Some(record.end_time.as_str())
        && window
            .inserted_at
            .as_deref()
            .is_some_and(|at| inserted_since(at, submitted))
}

pub struct WindowCreation<'c> {
    page: MaintenancePage<'c>,
    suite: &'c SuiteContext,
    record: MaintenanceRecord,
    expectation: Expectation,
    submitted: Option<DateTime<Utc>>,
}

impl<'c> WindowCreation<'c> {
    pub fn new(
        session: &'c mut dyn Session,
        suite: &'c SuiteContext,
        record: MaintenanceRecord,
        expectation: Expectation,
    ) -> Self {
        Self {
            page: MaintenancePage::new(session, &suite.config, suite.api.clone()),
            suite,
            record,
            expectation,
            submitted: None,
        }
    }
}

#[async_trait]
impl Steps for WindowCreation<'_> {
    fn expectation(&self) -> Expectation {
        self.expectation
    }

    async fn open(&mut self) -> Result<(), ScenarioError> {
        open_page(&mut self.page).await
    }

    async fn fill(&mut self) -> Result<(), ScenarioError> {
        self.page.fill(&self.record).await?;
        Ok(())
    }

    async fn submit(&mut self) -> Result<(), ScenarioError> {
        self.submitted = Some(Utc::now());
        submit_form(&mut self.page, self.expectation).await
    }

    async fn reconcile(&mut self) -> Result<Reconciliation, ScenarioError> {
        let submitted = self.submitted.unwrap_or_else(Utc::now);
        let api = &self.suite.api;
        let record = &self.record;
        let found = self
            .suite
            .reconcile_poller()
            .poll(
                move || api.list_windows(),
                |windows: &Vec<MaintenanceWindow>| {
                    windows
                        .iter()
                        .find(|w| window_matches(w, record, submitted))
                        .and_then(|w| w.id.clone())
                },
            )
            .await;
        Ok(found.into())
    }

    async fn verify(&mut self, outcome: &Reconciliation) -> Result<(), ScenarioError> {
        self.expectation.check(outcome)?;
        let Some(id) = outcome.key() else {
            return Ok(());
        };
        self.page.open_window_list().await?;
        if self.page.window_in_table(id).await?.is_none() {
            return Err(ScenarioError::assertion(format!(
                "maintenance window {} missing from the table",
                id
            )));
        }
        Ok(())
    }

    async fn cleanup(&mut self) -> usize {
        self.page.cleanup(&[self.record.description.clone()]).await
    }
}

fn valid_window(n: usize) -> MaintenanceRecord {
    pick(maintenance::valid(Utc::now()), n)
}

fn invalid_window(n: usize) -> MaintenanceRecord {
    pick(maintenance::invalid(Utc::now()), n)
}

fn single_switch<'c>(session: &'c mut dyn Session, suite: &'c SuiteContext) -> Box<dyn Steps + 'c> {
    Box::new(WindowCreation::new(session, suite, valid_window(0), Expectation::Present))
}

fn multiple_switches<'c>(
    session: &'c mut dyn Session,
    suite: &'c SuiteContext,
) -> Box<dyn Steps + 'c> {
    Box::new(WindowCreation::new(session, suite, valid_window(1), Expectation::Present))
}

fn empty_targets<'c>(session: &'c mut dyn Session, suite: &'c SuiteContext) -> Box<dyn Steps + 'c> {
    Box::new(WindowCreation::new(session, suite, invalid_window(0), Expectation::Absent))
}

fn past_start<'c>(session: &'c mut dyn Session, suite: &'c SuiteContext) -> Box<dyn Steps + 'c> {
    Box::new(WindowCreation::new(session, suite, invalid_window(1), Expectation::Absent))
}

fn bad_time_format<'c>(session: &'c mut dyn Session, suite: &'c SuiteContext) -> Box<dyn Steps + 'c> {
    Box::new(WindowCreation::new(session, suite, invalid_window(2), Expectation::Absent))
}

pub fn scenarios() -> Vec<ScenarioEntry> {
    use ScenarioTag::*;

    let d = Domain::Maintenance;
    vec![
        ScenarioEntry::new(d, "maintenance_single_switch", &[Smoke], single_switch),
        ScenarioEntry::new(d, "maintenance_multiple_switches", &[], multiple_switches),
        ScenarioEntry::new(d, "maintenance_empty_targets", &[Negative], empty_targets),
        ScenarioEntry::new(d, "maintenance_past_start", &[Negative], past_start),
        ScenarioEntry::new(d, "maintenance_bad_time_format", &[Negative], bad_time_format),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record() -> MaintenanceRecord {
        MaintenanceRecord::new(
            "Valid data",
            (
                "2026-03-13T12:00:00+0000".to_string(),
                "2026-03-13T13:00:00+0000".to_string(),
            ),
        )
    }

    fn window(inserted_at: &str) -> MaintenanceWindow {
        MaintenanceWindow {
            id: Some("w1".to_string()),
            description: Some("Valid data".to_string()),
            start: Some("2026-03-13T12:00:00+0000".to_string()),
            end: Some("2026-03-13T13:00:00+0000".to_string()),
            inserted_at: Some(inserted_at.to_string()),
            ..Default::default()
        }
    }

    fn submitted() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_window_matches_after_submission() {
        assert!(window_matches(&window("2026-03-10T12:00:05+0000"), &record(), submitted()));
        assert!(window_matches(&window("2026-03-10T12:00:00+0000"), &record(), submitted()));
    }

    #[test]
    fn test_window_inserted_before_submission_is_ignored() {
        assert!(!window_matches(&window("2026-03-10T11:59:59+0000"), &record(), submitted()));
    }

    #[test]
    fn test_window_must_match_description_and_times() {
        let mut other = window("2026-03-10T12:00:05+0000");
        other.description = Some("Another".to_string());
        assert!(!window_matches(&other, &record(), submitted()));

        let mut shifted = window("2026-03-10T12:00:05+0000");
        shifted.end = Some("2026-03-13T14:00:00+0000".to_string());
        assert!(!window_matches(&shifted, &record(), submitted()));
    }

    #[test]
    fn test_unparseable_inserted_at_compares_as_text() {
        assert!(inserted_since("2026-03-10T12:00:05", submitted()));
        assert!(!inserted_since("2025-01-01", submitted()));
    }
}
