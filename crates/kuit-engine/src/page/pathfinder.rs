//! Path-finder form.

use super::{
    CleanupTarget, DomainSpec, FieldKind, FieldSpec, PageDriver, Settle, main_button,
    with_form_entries,
};
use crate::api::ApiClient;
use crate::config::SuiteConfig;
use crate::session::{Session, SessionError};
use kuit_common::locator::{Locator, LocatorCatalog};
use std::ops::{Deref, DerefMut};

const OPTIONS_PANEL: &str = "//*[@id='app']/div[1]/div/div[7]/div/div/div/div";

pub static PATH_FINDER: DomainSpec = DomainSpec {
    domain: "path-finder",
    entry: "entry",
    ready: "form_ready",
    required: &[
        FieldSpec::new("source", FieldKind::Autocomplete),
        FieldSpec::new("destination", FieldKind::Autocomplete),
    ],
    optional: &[
        FieldSpec::text("bandwidth"),
        FieldSpec::text("reliability"),
        FieldSpec::text("delay"),
        FieldSpec::text("utilization"),
        FieldSpec::text("priority"),
        FieldSpec::text("spf_max_paths"),
        FieldSpec::text("spf_max_path_cost"),
    ],
    submit: Some("submit"),
    submit_settle: Settle::Present("paths"),
    result_rows: None,
    cleanup: CleanupTarget::None,
};

fn option_input(row: usize, tail: &str) -> Locator {
    Locator::xpath(format!("{}/div[{}]/{}", OPTIONS_PANEL, row, tail))
}

pub fn catalog() -> LocatorCatalog {
    with_form_entries(LocatorCatalog::new("path-finder"))
        .with("entry", main_button("Napp Pathfinder"))
        .with("source", Locator::xpath("//*[@id='source']/div/div/div/input"))
        .with(
            "destination",
            Locator::xpath("//*[@id='destination']/div/div/div/input"),
        )
        .with("bandwidth", option_input(5, "div[3]/input"))
        .with("reliability", option_input(6, "div[3]/input"))
        .with("delay", option_input(7, "div[3]/input"))
        .with("utilization", option_input(8, "div[3]/input"))
        .with("priority", option_input(9, "div[3]/input"))
        .with("spf_max_paths", option_input(14, "div/div/input"))
        .with("spf_max_path_cost", option_input(15, "div/div/input"))
        .with("submit", option_input(16, "button"))
        .with(
            "paths",
            Locator::xpath("//*[@id='app']/section[2]/div[1]/div/button[1]"),
        )
        .with("path_panels", Locator::class_name("k-property-panel"))
}

pub struct PathFinderPage<'s> {
    driver: PageDriver<'s>,
}

impl<'s> PathFinderPage<'s> {
    pub fn new(session: &'s mut dyn Session, config: &SuiteConfig, api: ApiClient) -> Self {
        Self {
            driver: PageDriver::new(session, &PATH_FINDER, catalog(), config, api),
        }
    }

    /// Open the computed paths and count the result panels.
    pub async fn path_count(&mut self) -> Result<usize, SessionError> {
        self.driver
            .click_and_settle("paths", Settle::Present("path_panels"))
            .await?;
        let panels = self.driver.find_all("path_panels").await?;
        for panel in &panels {
            let text = self.driver.session().text(*panel).await?;
            tracing::debug!("Path panel: {}", text.replace('\n', " | "));
        }
        Ok(panels.len())
    }
}

impl<'s> Deref for PathFinderPage<'s> {
    type Target = PageDriver<'s>;

    fn deref(&self) -> &Self::Target {
        &self.driver
    }
}

impl<'s> DerefMut for PathFinderPage<'s> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.driver
    }
}
