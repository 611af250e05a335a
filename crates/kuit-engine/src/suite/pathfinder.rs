//! Path-finder scenarios. Nothing is created remotely; the computed path
//! panels are the observable result.

use super::{Domain, ScenarioEntry, ScenarioTag, SuiteContext, open_page, pick};
use crate::fixtures::{PathRecord, paths};
use crate::page::pathfinder::PathFinderPage;
use crate::scenario::{Expectation, Reconciliation, ScenarioError, Steps};
use crate::session::Session;
use async_trait::async_trait;
use tracing::info;

pub struct PathSearch<'c> {
    page: PathFinderPage<'c>,
    record: PathRecord,
}

impl<'c> PathSearch<'c> {
    pub fn new(session: &'c mut dyn Session, suite: &'c SuiteContext, record: PathRecord) -> Self {
        Self {
            page: PathFinderPage::new(session, &suite.config, suite.api.clone()),
            record,
        }
    }
}

#[async_trait]
impl Steps for PathSearch<'_> {
    fn expectation(&self) -> Expectation {
        Expectation::Present
    }

    async fn open(&mut self) -> Result<(), ScenarioError> {
        open_page(&mut self.page).await
    }

    async fn fill(&mut self) -> Result<(), ScenarioError> {
        self.page.fill(&self.record).await?;
        Ok(())
    }

    async fn submit(&mut self) -> Result<(), ScenarioError> {
        self.page.submit().await?;
        Ok(())
    }

    async fn reconcile(&mut self) -> Result<Reconciliation, ScenarioError> {
        let count = self.page.path_count().await?;
        info!(
            "{} path(s) from {} to {}",
            count, self.record.source, self.record.destination
        );
        Ok(if count > 0 {
            Reconciliation::Found(count.to_string())
        } else {
            Reconciliation::NotFound
        })
    }
}

fn basic_path<'c>(session: &'c mut dyn Session, suite: &'c SuiteContext) -> Box<dyn Steps + 'c> {
    Box::new(PathSearch::new(session, suite, pick(paths::valid(), 0)))
}

fn constrained_path<'c>(
    session: &'c mut dyn Session,
    suite: &'c SuiteContext,
) -> Box<dyn Steps + 'c> {
    Box::new(PathSearch::new(session, suite, pick(paths::valid(), 1)))
}

pub fn scenarios() -> Vec<ScenarioEntry> {
    let d = Domain::PathFinder;
    vec![
        ScenarioEntry::new(d, "path_basic", &[ScenarioTag::Smoke], basic_path),
        ScenarioEntry::new(d, "path_with_metrics", &[], constrained_path),
    ]
}
