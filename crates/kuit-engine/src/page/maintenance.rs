//! Maintenance window form.

use super::{
    CleanupTarget, DomainSpec, FieldKind, FieldSpec, PageDriver, Settle, enabled_button,
    main_button, with_form_entries,
};
use crate::api::ApiClient;
use crate::config::SuiteConfig;
use crate::session::{Session, SessionError};
use kuit_common::locator::{Locator, LocatorCatalog};
use std::ops::{Deref, DerefMut};

const FORM: &str = "//*[@id='app']/div[1]/div/div[3]/div/div[1]/div";

pub static MAINTENANCE: DomainSpec = DomainSpec {
    domain: "maintenance",
    entry: "entry",
    ready: "form_ready",
    required: &[FieldSpec::text("start_time"), FieldSpec::text("end_time")],
    optional: &[
        FieldSpec::text("description"),
        FieldSpec::new("switches", FieldKind::MultiSelect),
        FieldSpec::new("interfaces", FieldKind::MultiSelect),
        FieldSpec::new("links", FieldKind::MultiSelect),
        FieldSpec::new("force", FieldKind::Toggle),
    ],
    submit: Some("submit"),
    submit_settle: Settle::Present("message_title"),
    result_rows: Some("window_rows"),
    cleanup: CleanupTarget::MaintenanceWindows,
};

fn form_control(tail: &str) -> Locator {
    Locator::xpath(format!("{}/{}", FORM, tail))
}

pub fn catalog() -> LocatorCatalog {
    // The dashboard spells the menu title this way.
    with_form_entries(LocatorCatalog::new("maintenance"))
        .with("entry", main_button("Maintenace"))
        .with("description", form_control("div[1]/input"))
        .with("start_time", form_control("div[2]/div[1]/input"))
        .with("end_time", form_control("div[2]/div[2]/input"))
        .with("switches", form_control("label[1]/select"))
        .with("interfaces", form_control("label[2]/select"))
        .with("links", form_control("label[3]/select"))
        .with("force", form_control("div[4]/label/span"))
        .with("submit", enabled_button("Create Maintenance Window"))
        .with("reset", enabled_button("Reset"))
        .with("list_windows", enabled_button("List Maintenance Windows"))
        .with(
            "window_rows",
            Locator::xpath("//*[@id='maintenance-table-list-windows']/tbody/tr"),
        )
}

pub struct MaintenancePage<'s> {
    driver: PageDriver<'s>,
}

impl<'s> MaintenancePage<'s> {
    pub fn new(session: &'s mut dyn Session, config: &SuiteConfig, api: ApiClient) -> Self {
        Self {
            driver: PageDriver::new(session, &MAINTENANCE, catalog(), config, api),
        }
    }

    pub async fn reset_fields(&mut self) -> Result<(), SessionError> {
        self.driver.click_and_settle("reset", Settle::Fixed).await
    }

    pub async fn open_window_list(&mut self) -> Result<(), SessionError> {
        self.driver
            .click_and_settle("list_windows", Settle::Present("window_rows"))
            .await
    }

    /// The window id as shown in the first column, if listed.
    pub async fn window_in_table(&mut self, id: &str) -> Result<Option<String>, SessionError> {
        let rows = self.driver.read_result_table().await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.into_iter().next())
            .find(|first| first == id))
    }
}

impl<'s> Deref for MaintenancePage<'s> {
    type Target = PageDriver<'s>;

    fn deref(&self) -> &Self::Target {
        &self.driver
    }
}

impl<'s> DerefMut for MaintenancePage<'s> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.driver
    }
}
