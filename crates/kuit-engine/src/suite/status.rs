//! Status dashboard scenarios: UI table sizes against API counts, plus the
//! table filters when a filter literal is configured.

use super::{Domain, ScenarioEntry, ScenarioTag, SuiteContext, open_page};
use crate::api::ApiClient;
use crate::page::status::{StatusPage, StatusTable};
use crate::scenario::{Expectation, Reconciliation, ScenarioError, Steps};
use crate::session::Session;
use async_trait::async_trait;
use kuit_common::error::ApiError;
use tracing::info;

async fn api_count(api: &ApiClient, table: StatusTable) -> Result<usize, ApiError> {
    match table {
        StatusTable::Switches => api.count_switches().await,
        StatusTable::Links => api.count_links().await,
        StatusTable::Interfaces => api.count_interfaces().await,
    }
}

pub struct TableConsistency<'c> {
    page: StatusPage<'c>,
    suite: &'c SuiteContext,
    table: StatusTable,
}

impl<'c> TableConsistency<'c> {
    pub fn new(session: &'c mut dyn Session, suite: &'c SuiteContext, table: StatusTable) -> Self {
        Self {
            page: StatusPage::new(session, &suite.config, suite.api.clone()),
            suite,
            table,
        }
    }

    fn filter(&self) -> Option<&str> {
        let filters = &self.suite.config.status_filters;
        match self.table {
            StatusTable::Switches => filters.switch.as_deref(),
            StatusTable::Links => filters.link.as_deref(),
            StatusTable::Interfaces => filters.interface.as_deref(),
        }
    }
}

#[async_trait]
impl Steps for TableConsistency<'_> {
    fn expectation(&self) -> Expectation {
        Expectation::Present
    }

    async fn open(&mut self) -> Result<(), ScenarioError> {
        open_page(&mut self.page).await
    }

    async fn reconcile(&mut self) -> Result<Reconciliation, ScenarioError> {
        let shown = self.page.row_count(self.table).await?;
        let api = &self.suite.api;
        let table = self.table;
        let found = self
            .suite
            .reconcile_poller()
            .poll(
                move || api_count(api, table),
                |count: &usize| (*count == shown).then(|| count.to_string()),
            )
            .await;
        if found.is_none() {
            info!("UI shows {} {} but the API never agreed", shown, table);
        }
        Ok(found.into())
    }

    async fn verify(&mut self, outcome: &Reconciliation) -> Result<(), ScenarioError> {
        self.expectation().check(outcome)?;
        let Some(value) = self.filter().map(str::to_string) else {
            return Ok(());
        };
        let table = self.table;
        let filtered = self.page.filtered_rows_contain(table, &value).await?;
        self.page.clear_filter(table).await?;
        if !filtered {
            return Err(ScenarioError::assertion(format!(
                "{} filter '{}' left rows without the value",
                table, value
            )));
        }
        Ok(())
    }
}

fn switches<'c>(session: &'c mut dyn Session, suite: &'c SuiteContext) -> Box<dyn Steps + 'c> {
    Box::new(TableConsistency::new(session, suite, StatusTable::Switches))
}

fn links<'c>(session: &'c mut dyn Session, suite: &'c SuiteContext) -> Box<dyn Steps + 'c> {
    Box::new(TableConsistency::new(session, suite, StatusTable::Links))
}

fn interfaces<'c>(session: &'c mut dyn Session, suite: &'c SuiteContext) -> Box<dyn Steps + 'c> {
    Box::new(TableConsistency::new(session, suite, StatusTable::Interfaces))
}

pub fn scenarios() -> Vec<ScenarioEntry> {
    let d = Domain::Status;
    vec![
        ScenarioEntry::new(d, "status_switches", &[ScenarioTag::Smoke], switches),
        ScenarioEntry::new(d, "status_links", &[], links),
        ScenarioEntry::new(d, "status_interfaces", &[], interfaces),
    ]
}
