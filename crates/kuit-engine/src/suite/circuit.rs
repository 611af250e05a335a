//! Circuit (EVC) scenarios.

use super::{Domain, ScenarioEntry, ScenarioTag, SuiteContext, open_page, pick, submit_form};
use crate::api::find_circuit_by_name;
use crate::fixtures::{CircuitRecord, circuits};
use crate::page::circuit::CircuitPage;
use crate::payload::build_evc_payload;
use crate::scenario::{Expectation, Reconciliation, ScenarioError, Steps};
use crate::session::Session;
use async_trait::async_trait;
use kuit_common::protocol::{EvcRecord, Keyed};
use tracing::{debug, info};

/// Create a circuit through the form and confirm it through the API.
pub struct CircuitCreation<'c> {
    page: CircuitPage<'c>,
    suite: &'c SuiteContext,
    record: CircuitRecord,
    expectation: Expectation,
    table_check: bool,
    wait_active: bool,
}

impl<'c> CircuitCreation<'c> {
    pub fn new(
        session: &'c mut dyn Session,
        suite: &'c SuiteContext,
        record: CircuitRecord,
        expectation: Expectation,
    ) -> Self {
        Self {
            page: CircuitPage::new(session, &suite.config, suite.api.clone()),
            suite,
            record,
            expectation,
            table_check: false,
            wait_active: false,
        }
    }

    /// Also require the installed-circuit table to list the circuit first.
    pub fn with_table_check(mut self) -> Self {
        self.table_check = true;
        self
    }

    /// Also require the controller to report the circuit active.
    pub fn with_active_wait(mut self) -> Self {
        self.wait_active = true;
        self
    }
}

#[async_trait]
impl Steps for CircuitCreation<'_> {
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
        submit_form(&mut self.page, self.expectation).await?;
        let messages = self.page.messages().await?;
        if let Some(expected) = &self.record.expected_error {
            debug!("Expecting '{}', form shows {:?}", expected, messages);
            if !messages.is_empty() && !messages.mentions(expected) {
                return Err(ScenarioError::assertion(format!(
                    "form shows {:?}, expected a message mentioning '{}'",
                    messages, expected
                )));
            }
        }
        Ok(())
    }

    async fn reconcile(&mut self) -> Result<Reconciliation, ScenarioError> {
        let api = &self.suite.api;
        let name = self.record.name.as_str();
        let found = self
            .suite
            .reconcile_poller()
            .poll(
                move || api.list_circuits(),
                |circuits: &Keyed<EvcRecord>| find_circuit_by_name(circuits, name),
            )
            .await;
        Ok(found.into())
    }

    async fn verify(&mut self, outcome: &Reconciliation) -> Result<(), ScenarioError> {
        self.expectation.check(outcome)?;

        if self.table_check {
            self.page.open_installed_list().await?;
            let first = self.page.first_circuit_name().await?;
            if first.as_deref() != Some(self.record.name.as_str()) {
                return Err(ScenarioError::assertion(format!(
                    "installed table shows {:?} first, expected '{}'",
                    first, self.record.name
                )));
            }
        }

        if self.wait_active
            && let Some(id) = outcome.key()
        {
            let poller = self.suite.active_poller();
            if !self.suite.api.wait_for_circuit_active(id, &poller).await {
                return Err(ScenarioError::assertion(format!(
                    "circuit '{}' did not become active within {:?}",
                    id,
                    poller.deadline()
                )));
            }
            info!("Circuit {} is active", id);
        }
        Ok(())
    }

    async fn cleanup(&mut self) -> usize {
        if self.record.name.is_empty() {
            return 0;
        }
        self.page.cleanup(&[self.record.name.clone()]).await
    }
}

/// Create a circuit straight through the REST API and read it back.
pub struct ApiRoundtrip<'c> {
    suite: &'c SuiteContext,
    record: CircuitRecord,
    created: Option<String>,
}

impl<'c> ApiRoundtrip<'c> {
    pub fn new(suite: &'c SuiteContext, record: CircuitRecord) -> Self {
        Self {
            suite,
            record,
            created: None,
        }
    }
}

#[async_trait]
impl Steps for ApiRoundtrip<'_> {
    fn expectation(&self) -> Expectation {
        Expectation::Present
    }

    async fn open(&mut self) -> Result<(), ScenarioError> {
        Ok(())
    }

    async fn submit(&mut self) -> Result<(), ScenarioError> {
        let payload = build_evc_payload(&self.record)?;
        let id = self.suite.api.create_circuit(&payload).await?;
        info!("Created circuit {} through the API", id);
        self.created = Some(id);
        Ok(())
    }

    async fn reconcile(&mut self) -> Result<Reconciliation, ScenarioError> {
        let Some(id) = self.created.clone() else {
            return Ok(Reconciliation::NotFound);
        };
        let record = self.suite.api.get_circuit(&id).await?;
        if record.name.as_deref() == Some(self.record.name.as_str()) {
            Ok(Reconciliation::Found(id))
        } else {
            Err(ScenarioError::assertion(format!(
                "circuit {} is named {:?}, expected '{}'",
                id, record.name, self.record.name
            )))
        }
    }

    async fn cleanup(&mut self) -> usize {
        self.suite
            .api
            .cleanup_circuits(&[self.record.name.clone()])
            .await
    }
}

fn boundary_record(name: &str, vlan: &str) -> CircuitRecord {
    CircuitRecord::new(name, circuits::ENDPOINT_A, vlan, circuits::ENDPOINT_Z, vlan)
}

fn basic<'c>(session: &'c mut dyn Session, suite: &'c SuiteContext) -> Box<dyn Steps + 'c> {
    let record = pick(circuits::valid(), 0);
    Box::new(CircuitCreation::new(session, suite, record, Expectation::Present).with_table_check())
}

fn full_feature<'c>(session: &'c mut dyn Session, suite: &'c SuiteContext) -> Box<dyn Steps + 'c> {
    let record = pick(circuits::valid(), 1);
    Box::new(CircuitCreation::new(session, suite, record, Expectation::Present))
}

fn vlan_range<'c>(session: &'c mut dyn Session, suite: &'c SuiteContext) -> Box<dyn Steps + 'c> {
    let record = pick(circuits::valid(), 2);
    Box::new(CircuitCreation::new(session, suite, record, Expectation::Present))
}

fn empty_name<'c>(session: &'c mut dyn Session, suite: &'c SuiteContext) -> Box<dyn Steps + 'c> {
    let record = pick(circuits::invalid(), 0);
    Box::new(CircuitCreation::new(session, suite, record, Expectation::Absent))
}

fn invalid_vlan<'c>(session: &'c mut dyn Session, suite: &'c SuiteContext) -> Box<dyn Steps + 'c> {
    let record = pick(circuits::invalid(), 1);
    Box::new(CircuitCreation::new(session, suite, record, Expectation::Absent))
}

fn unknown_endpoint<'c>(
    session: &'c mut dyn Session,
    suite: &'c SuiteContext,
) -> Box<dyn Steps + 'c> {
    let record = pick(circuits::invalid(), 2);
    Box::new(CircuitCreation::new(session, suite, record, Expectation::Absent))
}

fn max_vlan<'c>(session: &'c mut dyn Session, suite: &'c SuiteContext) -> Box<dyn Steps + 'c> {
    let record = boundary_record("Boundary_Max_VLAN", &circuits::boundary().max_vlan);
    Box::new(CircuitCreation::new(session, suite, record, Expectation::Present))
}

fn reserved_vlan<'c>(session: &'c mut dyn Session, suite: &'c SuiteContext) -> Box<dyn Steps + 'c> {
    let record = boundary_record("Boundary_Reserved_VLAN", &circuits::boundary().invalid_vlan);
    Box::new(CircuitCreation::new(session, suite, record, Expectation::Absent))
}

fn long_name<'c>(session: &'c mut dyn Session, suite: &'c SuiteContext) -> Box<dyn Steps + 'c> {
    let record = boundary_record(&circuits::boundary().long_name, "100");
    Box::new(CircuitCreation::new(session, suite, record, Expectation::Absent))
}

fn performance<'c>(session: &'c mut dyn Session, suite: &'c SuiteContext) -> Box<dyn Steps + 'c> {
    Box::new(
        CircuitCreation::new(session, suite, circuits::performance(), Expectation::Present)
            .with_active_wait(),
    )
}

fn api_roundtrip<'c>(_session: &'c mut dyn Session, suite: &'c SuiteContext) -> Box<dyn Steps + 'c> {
    Box::new(ApiRoundtrip::new(suite, circuits::api_roundtrip()))
}

pub fn scenarios() -> Vec<ScenarioEntry> {
    use ScenarioTag::*;

    let d = Domain::Circuit;
    vec![
        ScenarioEntry::new(d, "circuit_basic", &[Smoke], basic),
        ScenarioEntry::new(d, "circuit_full_feature", &[], full_feature),
        ScenarioEntry::new(d, "circuit_vlan_range", &[], vlan_range),
        ScenarioEntry::new(d, "circuit_empty_name", &[Negative], empty_name),
        ScenarioEntry::new(d, "circuit_invalid_vlan", &[Negative], invalid_vlan),
        ScenarioEntry::new(d, "circuit_unknown_endpoint", &[Negative], unknown_endpoint),
        ScenarioEntry::new(d, "circuit_max_vlan", &[Boundary], max_vlan),
        ScenarioEntry::new(d, "circuit_reserved_vlan", &[Boundary, Negative], reserved_vlan),
        ScenarioEntry::new(d, "circuit_long_name", &[Boundary, Negative], long_name),
        ScenarioEntry::new(d, "circuit_performance", &[Performance], performance),
        ScenarioEntry::new(d, "circuit_api_roundtrip", &[Smoke], api_roundtrip),
    ]
}
