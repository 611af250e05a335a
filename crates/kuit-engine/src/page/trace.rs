//! Trace form and the trace list.

use super::{
    CleanupTarget, DomainSpec, FieldSpec, PageDriver, Settle, enabled_button, main_button,
    with_form_entries,
};
use crate::api::ApiClient;
use crate::config::SuiteConfig;
use crate::session::{ElementRef, Session, SessionError};
use kuit_common::locator::{Locator, LocatorCatalog};
use std::ops::{Deref, DerefMut};
use tracing::{debug, info};

const HEADER_PANEL: &str = "//*[@id='app']/div[1]/div/div[6]/div/div/div[1]/div";

const ID_COLUMN: usize = 0;
const DPID_COLUMN: usize = 1;
const PORT_COLUMN: usize = 4;

pub static TRACE: DomainSpec = DomainSpec {
    domain: "trace",
    entry: "entry",
    ready: "form_ready",
    required: &[FieldSpec::text("dpid"), FieldSpec::text("port")],
    optional: &[
        FieldSpec::text("dl_vlan"),
        FieldSpec::text("dl_type"),
        FieldSpec::text("dl_src"),
        FieldSpec::text("dl_dst"),
        FieldSpec::text("nw_src"),
        FieldSpec::text("nw_dst"),
        FieldSpec::text("nw_proto"),
        FieldSpec::text("nw_tos"),
        FieldSpec::text("tp_src"),
        FieldSpec::text("tp_dst"),
    ],
    submit: Some("submit"),
    submit_settle: Settle::Fixed,
    result_rows: Some("trace_rows"),
    cleanup: CleanupTarget::None,
};

fn header_input(tail: &str) -> Locator {
    Locator::xpath(format!("{}/{}/input", HEADER_PANEL, tail))
}

pub fn catalog() -> LocatorCatalog {
    with_form_entries(LocatorCatalog::new("trace"))
        .with("entry", main_button("Napp sdntrace"))
        .with("dpid", Locator::xpath("//*[@id='dpid']/div/div/div/input"))
        .with("port", Locator::xpath("//*[@id='in_port']/div/div/div/input"))
        .with("dl_vlan", header_input("div[2]/div/div[1]"))
        .with("dl_type", header_input("div[2]/div/div[2]"))
        .with("dl_src", header_input("div[2]/div/div[3]"))
        .with("dl_dst", header_input("div[2]/div/div[4]"))
        .with("nw_src", header_input("div[3]/div/div[1]/div/div[1]"))
        .with("nw_dst", header_input("div[3]/div/div[1]/div/div[2]"))
        .with("nw_proto", header_input("div[3]/div/div[2]"))
        .with("nw_tos", header_input("div[3]/div/div[3]"))
        .with("tp_src", header_input("div[4]/div/div[1]"))
        .with("tp_dst", header_input("div[4]/div/div[2]"))
        .with("submit", enabled_button("Start Trace"))
        .with("reset", enabled_button("Reset"))
        .with("view_all", enabled_button("View All Traces"))
        .with(
            "fetch",
            Locator::xpath("//button[.//text()[contains(., 'Fetch Trace')]]"),
        )
        .with(
            "view_buttons",
            Locator::xpath("//button[contains(normalize-space(.), 'View')]"),
        )
        .with(
            "trace_rows",
            Locator::css("div[id^='k-info-wrapper-id'] table tbody tr"),
        )
}

fn row_below(rows: &[(f64, String)], button_y: f64) -> usize {
    rows.iter()
        .position(|(y, _)| *y > button_y)
        .unwrap_or(rows.len() - 1)
}

/// Whether the View button at `button_y` belongs to the row showing
/// `trace_id`.
///
/// `rows` holds each row's top edge and id, sorted top to bottom. The
/// button sits just above the first row below it (or the last row when
/// none is below), and the row after that candidate is checked too.
pub fn view_button_matches(rows: &[(f64, String)], button_y: f64, trace_id: &str) -> bool {
    if rows.is_empty() {
        return false;
    }
    rows[row_below(rows, button_y)..]
        .iter()
        .take(2)
        .any(|(_, id)| id.trim() == trace_id)
}

/// Index of the View button for `trace_id` among `buttons` (top edges).
///
/// A button whose nearest row below shows `trace_id` wins over one that
/// only matches through the following row.
pub fn choose_view_button(
    rows: &[(f64, String)],
    buttons: &[f64],
    trace_id: &str,
) -> Option<usize> {
    if rows.is_empty() {
        return None;
    }
    buttons
        .iter()
        .position(|y| rows[row_below(rows, *y)].1.trim() == trace_id)
        .or_else(|| {
            buttons
                .iter()
                .position(|y| view_button_matches(rows, *y, trace_id))
        })
}

pub struct TracePage<'s> {
    driver: PageDriver<'s>,
}

impl<'s> TracePage<'s> {
    pub fn new(session: &'s mut dyn Session, config: &SuiteConfig, api: ApiClient) -> Self {
        Self {
            driver: PageDriver::new(session, &TRACE, catalog(), config, api),
        }
    }

    pub async fn open_trace_list(&mut self) -> Result<(), SessionError> {
        self.driver
            .click_and_settle("view_all", Settle::Present("trace_rows"))
            .await
    }

    pub async fn reset_fields(&mut self) -> Result<(), SessionError> {
        self.driver.click_and_settle("reset", Settle::Fixed).await
    }

    /// Trace ids listed in the table, first occurrence order, no repeats.
    pub async fn trace_ids(&mut self) -> Result<Vec<String>, SessionError> {
        let mut ids: Vec<String> = Vec::new();
        for row in self.driver.read_result_table().await? {
            if let Some(id) = row.into_iter().nth(ID_COLUMN)
                && !id.is_empty()
                && !ids.contains(&id)
            {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    /// Id of a listed trace for `dpid`/`port` that is not in `prior`.
    pub async fn find_new_trace(
        &mut self,
        prior: &[String],
        dpid: &str,
        port: &str,
    ) -> Result<Option<String>, SessionError> {
        let rows = self.driver.read_result_table().await?;
        Ok(rows.into_iter().find_map(|row| {
            let id = row.get(ID_COLUMN)?;
            let matches = row.get(DPID_COLUMN).map(String::as_str) == Some(dpid)
                && row.get(PORT_COLUMN).map(String::as_str) == Some(port)
                && !prior.contains(id);
            matches.then(|| id.clone())
        }))
    }

    /// Press "Fetch Trace" and look for the new trace it lists.
    pub async fn fetch_trace(
        &mut self,
        prior: &[String],
        dpid: &str,
        port: &str,
    ) -> Result<Option<String>, SessionError> {
        let button = self.driver.find_clickable("fetch").await?;
        self.driver.session().scroll_into_view(button).await?;
        self.driver.session().script_click(button).await?;
        self.driver.find("trace_rows").await?;
        self.find_new_trace(prior, dpid, port).await
    }

    async fn row_positions(&mut self) -> Result<Vec<(f64, String)>, SessionError> {
        let rows = self.driver.find_all("trace_rows").await?;
        let mut positions = Vec::with_capacity(rows.len());
        for row in rows {
            let y = self.driver.session().vertical_position(row).await?;
            let id = self
                .driver
                .row_cells(row)
                .await?
                .into_iter()
                .nth(ID_COLUMN)
                .unwrap_or_default();
            positions.push((y, id));
        }
        positions.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(positions)
    }

    async fn matching_view_button(
        &mut self,
        rows: &[(f64, String)],
        trace_id: &str,
    ) -> Result<Option<ElementRef>, SessionError> {
        let buttons = self.driver.find_all("view_buttons").await?;
        let mut tops = Vec::with_capacity(buttons.len());
        for button in &buttons {
            tops.push(self.driver.session().vertical_position(*button).await?);
        }
        Ok(choose_view_button(rows, &tops, trace_id).map(|idx| buttons[idx]))
    }

    /// Click the View button next to `trace_id` and confirm the trace is
    /// shown.
    pub async fn view_trace(&mut self, trace_id: &str) -> Result<Option<String>, SessionError> {
        let rows = self.row_positions().await?;
        if rows.is_empty() {
            return Err(SessionError::Other(format!(
                "no trace rows to match trace '{}'",
                trace_id
            )));
        }
        let Some(button) = self.matching_view_button(&rows, trace_id).await? else {
            return Err(SessionError::Other(format!(
                "no View button for trace '{}'",
                trace_id
            )));
        };
        self.driver.session().scroll_into_view(button).await?;
        self.driver.session().script_click(button).await?;
        info!("Opened trace {}", trace_id);
        self.trace_in_table(trace_id).await
    }

    /// `trace_id` if the table lists it.
    pub async fn trace_in_table(&mut self, trace_id: &str) -> Result<Option<String>, SessionError> {
        if let Err(e) = self.driver.find("trace_rows").await {
            debug!("Trace table did not appear: {}", e);
            return Ok(None);
        }
        Ok(self
            .trace_ids()
            .await?
            .into_iter()
            .find(|id| id == trace_id))
    }
}

impl<'s> Deref for TracePage<'s> {
    type Target = PageDriver<'s>;

    fn deref(&self) -> &Self::Target {
        &self.driver
    }
}

impl<'s> DerefMut for TracePage<'s> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.driver
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<(f64, String)> {
        vec![
            (100.0, "7".to_string()),
            (140.0, "8".to_string()),
            (180.0, "9".to_string()),
        ]
    }

    #[test]
    fn test_view_button_matches_row_below() {
        assert!(view_button_matches(&rows(), 90.0, "7"));
        assert!(view_button_matches(&rows(), 120.0, "8"));
        assert!(!view_button_matches(&rows(), 120.0, "7"));
    }

    #[test]
    fn test_view_button_checks_following_row() {
        assert!(view_button_matches(&rows(), 90.0, "8"));
        assert!(!view_button_matches(&rows(), 90.0, "9"));
    }

    #[test]
    fn test_nearest_row_wins_over_following_row() {
        let buttons = [90.0, 130.0, 170.0];
        assert_eq!(choose_view_button(&rows(), &buttons, "8"), Some(1));
        assert_eq!(choose_view_button(&rows(), &buttons, "7"), Some(0));
        assert_eq!(choose_view_button(&rows(), &buttons, "10"), None);
    }

    #[test]
    fn test_following_row_used_without_a_direct_match() {
        assert_eq!(choose_view_button(&rows(), &[90.0], "8"), Some(0));
        assert_eq!(choose_view_button(&[], &[90.0], "8"), None);
    }

    #[test]
    fn test_view_button_below_all_rows_uses_last() {
        assert!(view_button_matches(&rows(), 500.0, "9"));
        assert!(!view_button_matches(&[], 10.0, "9"));
    }

    #[test]
    fn test_catalog_has_every_field() {
        let catalog = catalog();
        for field in TRACE.required.iter().chain(TRACE.optional) {
            assert!(catalog.contains(field.name), "missing {}", field.name);
        }
    }
}
