//! Circuit (EVC) request form.

use super::{
    CleanupTarget, DomainSpec, FieldKind, FieldSpec, PageDriver, Settle, enabled_button,
    main_button, with_form_entries,
};
use crate::api::ApiClient;
use crate::config::SuiteConfig;
use crate::session::{Session, SessionError};
use kuit_common::locator::{Locator, LocatorCatalog};
use std::ops::{Deref, DerefMut};

pub static CIRCUIT: DomainSpec = DomainSpec {
    domain: "circuit",
    entry: "entry",
    ready: "form_ready",
    required: &[
        FieldSpec::text("name"),
        FieldSpec::text("endpoint_a"),
        FieldSpec::text("endpoint_z"),
        FieldSpec::text("vlan_a"),
        FieldSpec::text("vlan_z"),
    ],
    optional: &[
        FieldSpec::new("service_level", FieldKind::Select),
        FieldSpec::new("priority", FieldKind::Select),
        FieldSpec::text("max_paths"),
        FieldSpec::new("qos_queue", FieldKind::Select),
        FieldSpec::new("enable_int", FieldKind::Toggle),
    ],
    submit: Some("submit"),
    submit_settle: Settle::Present("message_title"),
    result_rows: Some("circuit_rows"),
    cleanup: CleanupTarget::Circuits,
};

pub fn catalog() -> LocatorCatalog {
    with_form_entries(LocatorCatalog::new("circuit"))
        .with("entry", main_button("Mef-Eline"))
        .with("name", Locator::id("name-input"))
        .with(
            "endpoint_a",
            Locator::xpath("//*[@id='endpoint-a-input']/div/div/div/input"),
        )
        .with(
            "endpoint_z",
            Locator::xpath("//*[@id='endpoint-z-input']/div/div/div/input"),
        )
        .with("vlan_a", Locator::id("endpoint-a-tag-value"))
        .with("vlan_z", Locator::id("endpoint-z-tag-value"))
        .with("service_level", Locator::id("service-level-input"))
        .with("priority", Locator::id("sb-priority-input"))
        .with("max_paths", Locator::id("max_paths"))
        .with(
            "qos_queue",
            Locator::xpath("//*[@id='mef_eline_toolbar_form']/label/select"),
        )
        .with(
            "enable_int",
            Locator::xpath("//span[contains(text(),'INT')]/preceding-sibling::input"),
        )
        .with("submit", enabled_button("Request"))
        .with("list_installed", enabled_button("List installed EVC"))
        .with(
            "circuit_rows",
            Locator::xpath("//*[@id='mef-table-list-circuit']/tbody/tr"),
        )
}

pub struct CircuitPage<'s> {
    driver: PageDriver<'s>,
}

impl<'s> CircuitPage<'s> {
    pub fn new(session: &'s mut dyn Session, config: &SuiteConfig, api: ApiClient) -> Self {
        Self {
            driver: PageDriver::new(session, &CIRCUIT, catalog(), config, api),
        }
    }

    /// Show the installed circuit table.
    pub async fn open_installed_list(&mut self) -> Result<(), SessionError> {
        self.driver
            .click_and_settle("list_installed", Settle::Present("circuit_rows"))
            .await
    }

    /// Name column of the first installed circuit.
    pub async fn first_circuit_name(&mut self) -> Result<Option<String>, SessionError> {
        self.driver.first_row_column(0).await
    }
}

impl<'s> Deref for CircuitPage<'s> {
    type Target = PageDriver<'s>;

    fn deref(&self) -> &Self::Target {
        &self.driver
    }
}

impl<'s> DerefMut for CircuitPage<'s> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.driver
    }
}
