use async_trait::async_trait;
pub use kuit_common::error::SessionError;
use kuit_common::locator::Locator;

/// Opaque handle to an element found in the current page.
///
/// Handles are only valid until the page re-renders; using one afterwards
/// yields [`SessionError::StaleElement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementRef(pub u64);

#[derive(Debug, Clone)]
pub struct NavigationResult {
    pub url: String,
    pub title: String,
}

/// The drivable browser session every page driver runs against.
///
/// Lookups through [`Session::find_all`] never wait: bounded waiting is the
/// resolver's job, so enumeration stays non-blocking.
#[async_trait]
pub trait Session: Send + Sync {
    /// Navigate to a specific URL.
    async fn navigate(&mut self, url: &str) -> Result<NavigationResult, SessionError>;

    async fn title(&mut self) -> Result<String, SessionError>;

    async fn current_url(&mut self) -> Result<String, SessionError>;

    /// Every element currently matching `locator`, in document order.
    async fn find_all(&mut self, locator: &Locator) -> Result<Vec<ElementRef>, SessionError>;

    /// Every descendant of `parent` matching `locator`.
    async fn find_all_within(
        &mut self,
        parent: ElementRef,
        locator: &Locator,
    ) -> Result<Vec<ElementRef>, SessionError>;

    async fn is_displayed(&mut self, element: ElementRef) -> Result<bool, SessionError>;

    async fn is_enabled(&mut self, element: ElementRef) -> Result<bool, SessionError>;

    async fn text(&mut self, element: ElementRef) -> Result<String, SessionError>;

    async fn attribute(
        &mut self,
        element: ElementRef,
        name: &str,
    ) -> Result<Option<String>, SessionError>;

    async fn clear(&mut self, element: ElementRef) -> Result<(), SessionError>;

    async fn type_text(&mut self, element: ElementRef, text: &str) -> Result<(), SessionError>;

    /// Send the Enter key, used to confirm autocomplete inputs.
    async fn press_enter(&mut self, element: ElementRef) -> Result<(), SessionError>;

    async fn click(&mut self, element: ElementRef) -> Result<(), SessionError>;

    /// Choose the `<option>` of a `<select>` whose visible text is `text`.
    async fn select_by_text(&mut self, element: ElementRef, text: &str)
    -> Result<(), SessionError>;

    /// Scroll the element to the middle of the viewport.
    async fn scroll_into_view(&mut self, _element: ElementRef) -> Result<(), SessionError> {
        Ok(())
    }

    /// Click through script, for controls covered by overlays.
    async fn script_click(&mut self, element: ElementRef) -> Result<(), SessionError> {
        self.click(element).await
    }

    /// Document y coordinate of the element's top edge.
    async fn vertical_position(&mut self, element: ElementRef) -> Result<f64, SessionError>;

    /// Close the browser and release driver resources.
    async fn release(&mut self) -> Result<(), SessionError>;
}
