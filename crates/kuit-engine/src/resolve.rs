//! Bounded element resolution on top of a non-blocking [`Session`].

use crate::session::{ElementRef, Session, SessionError};
use kuit_common::locator::{Locator, ResolveMode};
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::debug;

const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    One(ElementRef),
    Many(Vec<ElementRef>),
}

impl Resolved {
    pub fn first(&self) -> Option<ElementRef> {
        match self {
            Resolved::One(element) => Some(*element),
            Resolved::Many(elements) => elements.first().copied(),
        }
    }

    pub fn into_vec(self) -> Vec<ElementRef> {
        match self {
            Resolved::One(element) => vec![element],
            Resolved::Many(elements) => elements,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Resolver {
    timeout: Duration,
    retry_interval: Duration,
}

impl Resolver {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }

    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolve `locator` according to `mode`.
    ///
    /// `name` is the catalog name reported in [`SessionError::NotFound`].
    pub async fn resolve<S: Session + ?Sized>(
        &self,
        session: &mut S,
        name: &str,
        locator: &Locator,
        mode: ResolveMode,
    ) -> Result<Resolved, SessionError> {
        match mode {
            ResolveMode::Presence => self.presence(session, name, locator).await.map(Resolved::One),
            ResolveMode::Clickable => self
                .clickable(session, name, locator)
                .await
                .map(Resolved::One),
            ResolveMode::All => self.all(session, locator).await.map(Resolved::Many),
        }
    }

    pub async fn presence<S: Session + ?Sized>(
        &self,
        session: &mut S,
        name: &str,
        locator: &Locator,
    ) -> Result<ElementRef, SessionError> {
        self.wait_for(session, name, locator, false).await
    }

    pub async fn clickable<S: Session + ?Sized>(
        &self,
        session: &mut S,
        name: &str,
        locator: &Locator,
    ) -> Result<ElementRef, SessionError> {
        self.wait_for(session, name, locator, true).await
    }

    /// Current matches, empty when nothing matches. Never waits.
    pub async fn all<S: Session + ?Sized>(
        &self,
        session: &mut S,
        locator: &Locator,
    ) -> Result<Vec<ElementRef>, SessionError> {
        session.find_all(locator).await
    }

    async fn wait_for<S: Session + ?Sized>(
        &self,
        session: &mut S,
        name: &str,
        locator: &Locator,
        clickable: bool,
    ) -> Result<ElementRef, SessionError> {
        let started = Instant::now();
        loop {
            match self.try_once(session, locator, clickable).await {
                Ok(Some(element)) => return Ok(element),
                Ok(None) => {}
                Err(e) if e.is_retryable() => {
                    debug!("Retrying '{}' after stale handle: {}", name, e);
                }
                Err(e) => return Err(e),
            }

            let elapsed = started.elapsed();
            if elapsed >= self.timeout {
                return Err(SessionError::NotFound {
                    name: name.to_string(),
                    locator: locator.clone(),
                    timeout_ms: self.timeout.as_millis() as u64,
                });
            }
            sleep(self.retry_interval.min(self.timeout - elapsed)).await;
        }
    }

    async fn try_once<S: Session + ?Sized>(
        &self,
        session: &mut S,
        locator: &Locator,
        clickable: bool,
    ) -> Result<Option<ElementRef>, SessionError> {
        let candidates = session.find_all(locator).await?;
        if !clickable {
            return Ok(candidates.first().copied());
        }
        for element in candidates {
            if session.is_displayed(element).await? && session.is_enabled(element).await? {
                return Ok(Some(element));
            }
        }
        Ok(None)
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}
