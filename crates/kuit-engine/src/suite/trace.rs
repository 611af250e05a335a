//! Trace scenarios.
//!
//! Traces cannot be deleted, so every check compares against snapshots of
//! the ids that existed before the scenario submitted anything.

use super::{Domain, ScenarioEntry, ScenarioTag, SuiteContext, open_page, pick, submit_form};
use crate::fixtures::{TraceRecord, traces};
use crate::page::trace::TracePage;
use crate::scenario::{Expectation, Reconciliation, ScenarioError, Steps};
use crate::session::Session;
use async_trait::async_trait;
use kuit_common::protocol::{TraceCollection, TraceEntry};
use tracing::{debug, info, warn};

fn entry_id(key: Option<String>, entry: &TraceEntry) -> Option<String> {
    entry.request_id_text().or(key)
}

/// Every trace id the API lists, in server order.
pub fn api_trace_ids(collection: &TraceCollection) -> Vec<String> {
    collection
        .entries()
        .into_iter()
        .filter_map(|(key, entry)| entry_id(key, entry))
        .collect()
}

/// `id` if the API lists it.
pub fn find_trace_id(collection: &TraceCollection, id: &str) -> Option<String> {
    api_trace_ids(collection).into_iter().find(|known| known == id)
}

/// First trace not in `prior` with a hop at `dpid`/`port`.
pub fn find_new_trace(
    collection: &TraceCollection,
    prior: &[String],
    dpid: &str,
    port: &str,
) -> Option<String> {
    collection.entries().into_iter().find_map(|(key, entry)| {
        let id = entry_id(key, entry)?;
        let hit = !prior.contains(&id) && entry.result.iter().any(|hop| hop.matches(dpid, port));
        hit.then_some(id)
    })
}

/// Snapshots taken before anything is submitted.
#[derive(Debug, Default)]
struct Prior {
    ui: Vec<String>,
    api: Vec<String>,
}

/// An API listing failure only fails the snapshot for a negative scenario.
async fn snapshot(
    page: &mut TracePage<'_>,
    suite: &SuiteContext,
    expectation: Expectation,
) -> Result<Prior, ScenarioError> {
    page.open_trace_list().await?;
    let ui = page.trace_ids().await?;
    let api = match suite.api.list_traces().await {
        Ok(collection) => api_trace_ids(&collection),
        Err(e) if expectation == Expectation::Absent => return Err(e.into()),
        Err(e) => {
            warn!("Could not snapshot traces through the API: {}", e);
            Vec::new()
        }
    };
    debug!("{} trace(s) in the table, {} in the API", ui.len(), api.len());
    Ok(Prior { ui, api })
}

/// Start one trace from the form and look for it in the table and the API.
pub struct TraceStart<'c> {
    page: TracePage<'c>,
    suite: &'c SuiteContext,
    record: TraceRecord,
    expectation: Expectation,
    prior: Prior,
}

impl<'c> TraceStart<'c> {
    pub fn new(
        session: &'c mut dyn Session,
        suite: &'c SuiteContext,
        record: TraceRecord,
        expectation: Expectation,
    ) -> Self {
        Self {
            page: TracePage::new(session, &suite.config, suite.api.clone()),
            suite,
            record,
            expectation,
            prior: Prior::default(),
        }
    }
}

#[async_trait]
impl Steps for TraceStart<'_> {
    fn expectation(&self) -> Expectation {
        self.expectation
    }

    async fn open(&mut self) -> Result<(), ScenarioError> {
        open_page(&mut self.page).await?;
        self.prior = snapshot(&mut self.page, self.suite, self.expectation).await?;
        Ok(())
    }

    async fn fill(&mut self) -> Result<(), ScenarioError> {
        self.page.fill(&self.record).await?;
        Ok(())
    }

    async fn submit(&mut self) -> Result<(), ScenarioError> {
        submit_form(&mut self.page, self.expectation).await
    }

    async fn reconcile(&mut self) -> Result<Reconciliation, ScenarioError> {
        let (dpid, port) = (self.record.dpid.as_str(), self.record.port.as_str());
        self.page.open_trace_list().await?;
        let listed = self.page.find_new_trace(&self.prior.ui, dpid, port).await?;

        let api = &self.suite.api;
        let poller = self.suite.reconcile_poller();
        let found = match listed {
            Some(id) if self.expectation == Expectation::Absent => {
                info!("Table lists unexpected trace {}", id);
                Some(id)
            }
            Some(id) => {
                poller
                    .poll(
                        move || api.list_traces(),
                        |c: &TraceCollection| find_trace_id(c, &id),
                    )
                    .await
            }
            None => {
                let prior = &self.prior.api;
                poller
                    .poll(
                        move || api.list_traces(),
                        |c: &TraceCollection| find_new_trace(c, prior, dpid, port),
                    )
                    .await
            }
        };
        Ok(found.into())
    }
}

/// Start two traces, pick the second up with "Fetch Trace", then open it
/// with its row's View button.
pub struct TraceFetchAndView<'c> {
    page: TracePage<'c>,
    suite: &'c SuiteContext,
    first: TraceRecord,
    second: TraceRecord,
    prior: Prior,
}

impl<'c> TraceFetchAndView<'c> {
    pub fn new(
        session: &'c mut dyn Session,
        suite: &'c SuiteContext,
        first: TraceRecord,
        second: TraceRecord,
    ) -> Self {
        Self {
            page: TracePage::new(session, &suite.config, suite.api.clone()),
            suite,
            first,
            second,
            prior: Prior::default(),
        }
    }

    async fn listed(&mut self, record: &TraceRecord, exclude: &[String]) -> Result<String, ScenarioError> {
        let mut prior = self.prior.ui.clone();
        prior.extend_from_slice(exclude);
        self.page
            .find_new_trace(&prior, &record.dpid, &record.port)
            .await?
            .ok_or_else(|| {
                ScenarioError::assertion(format!(
                    "no new trace for {}/{} in the table",
                    record.dpid, record.port
                ))
            })
    }
}

#[async_trait]
impl Steps for TraceFetchAndView<'_> {
    fn expectation(&self) -> Expectation {
        Expectation::Present
    }

    async fn open(&mut self) -> Result<(), ScenarioError> {
        open_page(&mut self.page).await?;
        self.prior = snapshot(&mut self.page, self.suite, Expectation::Present).await?;
        Ok(())
    }

    async fn fill(&mut self) -> Result<(), ScenarioError> {
        self.page.fill(&self.first).await?;
        Ok(())
    }

    async fn submit(&mut self) -> Result<(), ScenarioError> {
        self.page.submit().await?;
        self.page.fill(&self.second).await?;
        self.page.submit().await?;
        Ok(())
    }

    async fn reconcile(&mut self) -> Result<Reconciliation, ScenarioError> {
        let fetched = self
            .page
            .fetch_trace(&self.prior.ui, &self.second.dpid, &self.second.port)
            .await?;
        let Some(fetched) = fetched else {
            return Err(ScenarioError::assertion("Fetch Trace listed no new trace"));
        };
        info!("Fetch Trace listed {}", fetched);

        self.page.open_trace_list().await?;
        let first = self.first.clone();
        let second = self.second.clone();
        let first_id = self.listed(&first, &[]).await?;
        let second_id = self.listed(&second, std::slice::from_ref(&first_id)).await?;

        if self.page.view_trace(&second_id).await?.is_none() {
            return Err(ScenarioError::assertion(format!(
                "trace {} not shown after View",
                second_id
            )));
        }

        let ids = [first_id, second_id];
        let api = &self.suite.api;
        let found = self
            .suite
            .reconcile_poller()
            .poll(
                move || api.list_traces(),
                |c: &TraceCollection| {
                    let known = api_trace_ids(c);
                    ids.iter()
                        .all(|id| known.contains(id))
                        .then(|| ids.join(","))
                },
            )
            .await;
        Ok(found.into())
    }
}

fn start_trace<'c>(session: &'c mut dyn Session, suite: &'c SuiteContext) -> Box<dyn Steps + 'c> {
    let record = pick(traces::valid(), 0);
    Box::new(TraceStart::new(session, suite, record, Expectation::Present))
}

fn fetch_and_view<'c>(session: &'c mut dyn Session, suite: &'c SuiteContext) -> Box<dyn Steps + 'c> {
    let first = pick(traces::valid(), 0);
    let second = pick(traces::valid(), 1);
    Box::new(TraceFetchAndView::new(session, suite, first, second))
}

fn unknown_switch<'c>(session: &'c mut dyn Session, suite: &'c SuiteContext) -> Box<dyn Steps + 'c> {
    let record = pick(traces::invalid(), 0);
    Box::new(TraceStart::new(session, suite, record, Expectation::Absent))
}

fn malformed_dpid<'c>(session: &'c mut dyn Session, suite: &'c SuiteContext) -> Box<dyn Steps + 'c> {
    let record = pick(traces::invalid(), 1);
    Box::new(TraceStart::new(session, suite, record, Expectation::Absent))
}

fn invalid_port<'c>(session: &'c mut dyn Session, suite: &'c SuiteContext) -> Box<dyn Steps + 'c> {
    let record = pick(traces::invalid(), 2);
    Box::new(TraceStart::new(session, suite, record, Expectation::Absent))
}

pub fn scenarios() -> Vec<ScenarioEntry> {
    use ScenarioTag::*;

    let d = Domain::Trace;
    vec![
        ScenarioEntry::new(d, "trace_start", &[Smoke], start_trace),
        ScenarioEntry::new(d, "trace_fetch_and_view", &[], fetch_and_view),
        ScenarioEntry::new(d, "trace_unknown_switch", &[Negative], unknown_switch),
        ScenarioEntry::new(d, "trace_malformed_dpid", &[Negative], malformed_dpid),
        ScenarioEntry::new(d, "trace_invalid_port", &[Negative], invalid_port),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection(body: &str) -> TraceCollection {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_keyed_collection_prefers_request_id() {
        let c = collection(
            r#"{"a1": {"request_id": 30, "result": []}, "b2": {"result": []}}"#,
        );
        assert_eq!(api_trace_ids(&c), vec!["30", "b2"]);
        assert_eq!(find_trace_id(&c, "b2").as_deref(), Some("b2"));
        assert_eq!(find_trace_id(&c, "a1"), None);
    }

    #[test]
    fn test_new_trace_skips_prior_ids() {
        let c = collection(
            r#"[
                {"request_id": 1, "result": [{"dpid": "00:00:00:00:00:00:00:14", "port": 13}]},
                {"request_id": 2, "result": [{"dpid": "00:00:00:00:00:00:00:14", "port": "13"}]}
            ]"#,
        );
        let dpid = "00:00:00:00:00:00:00:14";
        assert_eq!(find_new_trace(&c, &[], dpid, "13").as_deref(), Some("1"));
        assert_eq!(
            find_new_trace(&c, &["1".to_string()], dpid, "13").as_deref(),
            Some("2")
        );
        assert_eq!(find_new_trace(&c, &[], "ff:ff:ff:ff:ff:ff:ff:ff", "13"), None);
    }
}
