use std::time::Duration;

use base64::Engine;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::error::ActionError;
use super::types::{
    ElementHandle, ExtractRequest, ExtractResponse, NavigateRequest, QueryRequest, QueryResponse,
    RenderRequest, RenderResponse, Selector,
};
use crate::config::Secret;

const DEFAULT_CONTROL_URL: &str = "http://127.0.0.1:9333";

/// The browser capability the worker commands.
///
/// Any engine offering these four verbs satisfies the contract; the worker
/// never assumes a particular product behind it.
pub trait BrowserSession {
    async fn navigate(&self, url: &str) -> Result<(), ActionError>;
    /// First match in document order, or `None` when nothing matched.
    async fn locate(&self, selector: &Selector) -> Result<Option<ElementHandle>, ActionError>;
    async fn extract(&self, handle: &ElementHandle) -> Result<String, ActionError>;
    async fn render_document(&self, url: &str) -> Result<Vec<u8>, ActionError>;
}

/// A browser session driven over an HTTP control endpoint.
///
/// Holds the opaque site credential for the lifetime of the session. The
/// credential travels only in a request header and is never logged or
/// persisted anywhere else.
pub struct RemoteSession {
    http: Client,
    base_url: String,
    session_cookie: Secret,
}

impl RemoteSession {
    pub fn new(session_cookie: Secret) -> Self {
        Self::with_base_url(session_cookie, DEFAULT_CONTROL_URL.to_string())
    }

    /// Create a session pointing at a custom control endpoint (useful for testing).
    pub fn with_base_url(session_cookie: Secret, base_url: String) -> Self {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()
            .expect("failed to build HTTP client");
        Self {
            http,
            base_url,
            session_cookie,
        }
    }

    async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, ActionError> {
        let response = self
            .http
            .post(format!("{}{path}", self.base_url))
            .header("x-session-cookie", self.session_cookie.expose())
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ActionError::Timeout
                } else {
                    ActionError::Network(e)
                }
            })?;

        let status = response.status();
        match status.as_u16() {
            401 | 403 => {
                return Err(ActionError::SessionInvalid {
                    status: status.as_u16(),
                });
            }
            408 | 504 => return Err(ActionError::Timeout),
            410 => return Err(ActionError::StaleElement),
            _ => {}
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(ActionError::Http {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<R>()
            .await
            .map_err(|e| ActionError::Protocol(e.to_string()))
    }
}

impl BrowserSession for RemoteSession {
    async fn navigate(&self, url: &str) -> Result<(), ActionError> {
        let _: serde_json::Value = self
            .post("/session/navigate", &NavigateRequest { url })
            .await?;
        Ok(())
    }

    async fn locate(&self, selector: &Selector) -> Result<Option<ElementHandle>, ActionError> {
        let resp: QueryResponse = self.post("/session/query", &QueryRequest { selector }).await?;
        if !resp.found {
            return Ok(None);
        }
        let element_id = resp
            .element_id
            .ok_or_else(|| ActionError::Protocol("query match without element_id".into()))?;
        Ok(Some(ElementHandle {
            element_id,
            href: resp.href,
        }))
    }

    async fn extract(&self, handle: &ElementHandle) -> Result<String, ActionError> {
        let resp: ExtractResponse = self
            .post(
                "/session/extract",
                &ExtractRequest {
                    element_id: &handle.element_id,
                },
            )
            .await?;
        Ok(resp.text)
    }

    async fn render_document(&self, url: &str) -> Result<Vec<u8>, ActionError> {
        let resp: RenderResponse = self.post("/session/render", &RenderRequest { url }).await?;
        base64::engine::general_purpose::STANDARD
            .decode(&resp.data)
            .map_err(|e| ActionError::Protocol(format!("invalid document encoding: {e}")))
    }
}
