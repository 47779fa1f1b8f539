//! Wire types for the browser control protocol.
//!
//! The worker commands a single remote browser session through four verbs:
//! navigate, query (locate), extract, and render. These structs mirror the
//! JSON bodies of the control endpoints and derive `Serialize`/`Deserialize`
//! accordingly.

use serde::{Deserialize, Serialize};

/// How to find an element on the current page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", content = "value", rename_all = "snake_case")]
pub enum Selector {
    /// A CSS selector, matched in document order.
    Css(String),
    /// Visible-text match on anchors and buttons.
    Text(String),
}

impl Selector {
    pub fn css(value: impl Into<String>) -> Self {
        Selector::Css(value.into())
    }

    pub fn text(value: impl Into<String>) -> Self {
        Selector::Text(value.into())
    }
}

/// An opaque reference to a located element.
///
/// The control surface resolves `element_id` for follow-up extraction; `href`
/// is carried along when the element is a link so callers do not need a
/// second round-trip for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementHandle {
    pub element_id: String,
    #[serde(default)]
    pub href: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NavigateRequest<'a> {
    pub url: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryRequest<'a> {
    pub selector: &'a Selector,
}

/// Response to a query. `found: false` is the expected shape for an absent
/// element, not an error.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryResponse {
    pub found: bool,
    #[serde(default)]
    pub element_id: Option<String>,
    #[serde(default)]
    pub href: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractRequest<'a> {
    pub element_id: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractResponse {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenderRequest<'a> {
    pub url: &'a str,
}

/// Rendered document bytes, base64-encoded on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct RenderResponse {
    pub data: String,
}
