//! Status dashboard: switch, link and interface tables.

use super::{CleanupTarget, DomainSpec, PageDriver, Settle, main_button};
use crate::api::ApiClient;
use crate::config::SuiteConfig;
use crate::session::{Session, SessionError};
use kuit_common::locator::{Locator, LocatorCatalog};
use std::fmt;
use std::ops::{Deref, DerefMut};
use tracing::debug;

pub static STATUS: DomainSpec = DomainSpec {
    domain: "status",
    entry: "entry",
    ready: "switch_table",
    required: &[],
    optional: &[],
    submit: None,
    submit_settle: Settle::Fixed,
    result_rows: Some("switch_rows"),
    cleanup: CleanupTarget::None,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTable {
    Switches,
    Links,
    Interfaces,
}

impl StatusTable {
    pub const ALL: [StatusTable; 3] = [Self::Switches, Self::Links, Self::Interfaces];

    fn data_test(self) -> &'static str {
        match self {
            Self::Switches => "switch_table",
            Self::Links => "link_table",
            Self::Interfaces => "interface_table",
        }
    }

    pub fn table(self) -> &'static str {
        self.data_test()
    }

    pub fn rows(self) -> &'static str {
        match self {
            Self::Switches => "switch_rows",
            Self::Links => "link_rows",
            Self::Interfaces => "interface_rows",
        }
    }

    pub fn filter(self) -> &'static str {
        match self {
            Self::Switches => "switch_filter",
            Self::Links => "link_filter",
            Self::Interfaces => "interface_filter",
        }
    }
}

impl fmt::Display for StatusTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Switches => "switches",
            Self::Links => "links",
            Self::Interfaces => "interfaces",
        };
        f.write_str(name)
    }
}

pub fn catalog() -> LocatorCatalog {
    let mut catalog = LocatorCatalog::new("status").with("entry", main_button("Status Menu"));
    for table in StatusTable::ALL {
        let base = format!("//table[@data-test='{}']", table.data_test());
        catalog = catalog
            .with(table.table(), Locator::xpath(base.clone()))
            .with(table.rows(), Locator::xpath(format!("{}//tbody/tr", base)))
            .with(
                table.filter(),
                Locator::xpath(format!("{}/preceding::input[1]", base)),
            );
    }
    catalog
}

/// Whether a filtered table kept at least one row and every row shows
/// `value`.
pub fn rows_contain(rows: &[Vec<String>], value: &str) -> bool {
    !rows.is_empty()
        && rows
            .iter()
            .all(|cells| cells.iter().any(|cell| cell.contains(value)))
}

pub struct StatusPage<'s> {
    driver: PageDriver<'s>,
}

impl<'s> StatusPage<'s> {
    pub fn new(session: &'s mut dyn Session, config: &SuiteConfig, api: ApiClient) -> Self {
        Self {
            driver: PageDriver::new(session, &STATUS, catalog(), config, api),
        }
    }

    /// Rows currently shown in `table`.
    pub async fn row_count(&mut self, table: StatusTable) -> Result<usize, SessionError> {
        self.driver.find(table.table()).await?;
        let rows = self.driver.count(table.rows()).await?;
        debug!("UI shows {} {}", rows, table);
        Ok(rows)
    }

    /// Type `value` into the table's filter and wait for the rows to change.
    pub async fn apply_filter(&mut self, table: StatusTable, value: &str) -> Result<(), SessionError> {
        let before = self.driver.count(table.rows()).await?;
        let input = self.driver.find(table.filter()).await?;
        self.driver.session().clear(input).await?;
        self.driver.session().type_text(input, value).await?;
        let settle = Settle::CountChanges(table.rows());
        self.driver.wait_settle(settle, before).await
    }

    pub async fn clear_filter(&mut self, table: StatusTable) -> Result<(), SessionError> {
        let input = self.driver.find(table.filter()).await?;
        self.driver.session().clear(input).await
    }

    /// Filter `table` by `value` and check every remaining row shows it.
    pub async fn filtered_rows_contain(
        &mut self,
        table: StatusTable,
        value: &str,
    ) -> Result<bool, SessionError> {
        self.apply_filter(table, value).await?;
        let rows = self.driver.read_rows(table.rows()).await?;
        debug!("{} row(s) left in {} after filtering by '{}'", rows.len(), table, value);
        Ok(rows_contain(&rows, value))
    }
}

impl<'s> Deref for StatusPage<'s> {
    type Target = PageDriver<'s>;

    fn deref(&self) -> &Self::Target {
        &self.driver
    }
}

impl<'s> DerefMut for StatusPage<'s> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.driver
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_rows_contain_requires_every_row() {
        let rows = vec![row(&["SW14", "up"]), row(&["SW14-b", "up"])];
        assert!(rows_contain(&rows, "SW14"));

        let mixed = vec![row(&["SW14", "up"]), row(&["SW02", "up"])];
        assert!(!rows_contain(&mixed, "SW14"));
    }

    #[test]
    fn test_rows_contain_rejects_empty_table() {
        assert!(!rows_contain(&[], "SW14"));
    }

    #[test]
    fn test_catalog_has_table_entries() {
        let catalog = catalog();
        for table in StatusTable::ALL {
            assert!(catalog.contains(table.table()));
            assert!(catalog.contains(table.rows()));
            assert!(catalog.contains(table.filter()));
        }
    }
}
