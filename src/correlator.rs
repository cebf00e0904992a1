//! Request/response correlation for the in-flight top-level navigation.
//!
//! The host feeds every navigation, outgoing request, response, and load
//! event into the correlator in the order they occur. Only traffic for the
//! page's own primary document is tracked: the correlator records the target
//! URL when a navigation starts, captures the first outgoing request and the
//! first start-stage response whose URL matches it, and invalidates the
//! response when the load ultimately fails. Everything else is silently
//! ignored; no event here can raise an error.
//!
//! # Example
//!
//! ```rust
//! use envmask::correlator::{
//!     LoadOutcome, NavigationCorrelator, RequestMeta, ResponseMeta, ResponseSlot, ResponseStage,
//! };
//!
//! let mut correlator = NavigationCorrelator::new();
//! correlator.on_navigation_requested("https://a.test/", false);
//! correlator.on_outgoing_request(&RequestMeta::get("https://a.test/"));
//! correlator.on_response_received(&ResponseMeta::new(
//!     "https://a.test/",
//!     ResponseStage::Start,
//!     200,
//! ));
//! correlator.on_load_finished(LoadOutcome::Success);
//!
//! let exchange = correlator.exchange();
//! assert_eq!(exchange.request.as_ref().unwrap().method, "GET");
//! match &exchange.response {
//!     ResponseSlot::Received(response) => assert_eq!(response.status_code, 200),
//!     other => panic!("unexpected response slot: {:?}", other),
//! }
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// The blank placeholder page; navigating to it never disturbs an exchange.
pub const BLANK_URL: &str = "about:blank";

/// Point in a resource's receipt lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStage {
    /// Headers available.
    Start,
    /// Fully received.
    End,
}

/// Final outcome of a page load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadOutcome {
    Success,
    Fail,
}

/// Outgoing request metadata as observed by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMeta {
    pub url: String,
    pub method: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl RequestMeta {
    pub fn new(url: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: method.into(),
            headers: HashMap::new(),
        }
    }

    /// Plain GET with no headers.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(url, "GET")
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Response event metadata as observed by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMeta {
    pub url: String,
    pub stage: ResponseStage,
    pub status: u16,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl ResponseMeta {
    pub fn new(url: impl Into<String>, stage: ResponseStage, status: u16) -> Self {
        Self {
            url: url.into(),
            stage,
            status,
            headers: HashMap::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Captured response for the primary document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseCapture {
    pub url: String,
    pub status_code: u16,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

/// The response half of an exchange. Distinguishes "no response yet"
/// from "navigation failed".
///
/// Serializes the way the host reports it: a captured response as its
/// object, nothing-yet as an empty object, failure as an explicit `null`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseSlot {
    Received(ResponseCapture),
    /// Nothing received so far.
    Empty,
    /// Explicit no-valid-response marker set on load failure.
    Failed,
}

impl Serialize for ResponseSlot {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ResponseSlot::Received(capture) => capture.serialize(serializer),
            ResponseSlot::Empty => {
                serde_json::Map::new().serialize(serializer)
            }
            ResponseSlot::Failed => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for ResponseSlot {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
        match raw {
            None | Some(serde_json::Value::Null) => Ok(ResponseSlot::Failed),
            Some(serde_json::Value::Object(map)) if map.is_empty() => Ok(ResponseSlot::Empty),
            Some(value) => serde_json::from_value(value)
                .map(ResponseSlot::Received)
                .map_err(serde::de::Error::custom),
        }
    }
}

impl ResponseSlot {
    pub fn is_empty(&self) -> bool {
        matches!(self, ResponseSlot::Empty)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ResponseSlot::Failed)
    }

    pub fn as_received(&self) -> Option<&ResponseCapture> {
        match self {
            ResponseSlot::Received(capture) => Some(capture),
            _ => None,
        }
    }
}

/// Serde shape for the request half of an exchange: an uncaptured request is
/// an empty object on the wire, never `null` (that marker belongs to the
/// failed response slot).
mod request_slot {
    use serde::{Deserialize, Serialize};

    use super::RequestMeta;

    pub fn serialize<S: serde::Serializer>(
        request: &Option<RequestMeta>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match request {
            Some(request) => request.serialize(serializer),
            None => serde_json::Map::new().serialize(serializer),
        }
    }

    pub fn deserialize<'de, D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<RequestMeta>, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        match raw {
            serde_json::Value::Object(map) if map.is_empty() => Ok(None),
            value => serde_json::from_value(value)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

/// Request/response metadata for one top-level navigation. Owned by the
/// correlator; the host reads snapshots.
///
/// On the wire a missing request is an empty object, mirroring the response
/// slot's nothing-yet form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpExchange {
    #[serde(with = "request_slot")]
    pub request: Option<RequestMeta>,
    pub response: ResponseSlot,
}

impl HttpExchange {
    fn empty() -> Self {
        Self {
            request: None,
            response: ResponseSlot::Empty,
        }
    }
}

/// Correlation state for one navigation lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrelatorPhase {
    /// No navigation observed yet.
    Idle,
    /// Navigation requested; waiting for the matching outgoing request.
    Pending,
    /// Primary request recorded; waiting for its response.
    RequestCaptured,
    /// Primary response recorded.
    ResponseCaptured,
    /// Load reported failure; the response slot is invalidated.
    Failed,
}

/// Tracks the single in-flight top-level navigation and pairs its outgoing
/// request with the first matching response.
#[derive(Debug, Clone)]
pub struct NavigationCorrelator {
    phase: CorrelatorPhase,
    pending_url: Option<String>,
    exchange: HttpExchange,
}

impl NavigationCorrelator {
    pub fn new() -> Self {
        Self {
            phase: CorrelatorPhase::Idle,
            pending_url: None,
            exchange: HttpExchange::empty(),
        }
    }

    /// A top-level navigation was requested. Resets the exchange and records
    /// the target, unless the navigation is the blank placeholder.
    pub fn on_navigation_requested(&mut self, url: &str, is_blank_placeholder: bool) {
        if is_blank_placeholder || url == BLANK_URL {
            return;
        }
        debug!(url, "tracking top-level navigation");
        self.phase = CorrelatorPhase::Pending;
        self.pending_url = Some(url.to_string());
        self.exchange = HttpExchange::empty();
    }

    /// An outgoing request was observed. Captured only when it is the first
    /// request for the pending navigation URL; sub-resource traffic is
    /// intentionally not recorded.
    pub fn on_outgoing_request(&mut self, request: &RequestMeta) {
        if self.phase != CorrelatorPhase::Pending {
            return;
        }
        if self.pending_url.as_deref() != Some(request.url.as_str()) {
            return;
        }
        debug!(url = %request.url, method = %request.method, "captured primary request");
        self.exchange.request = Some(request.clone());
        self.phase = CorrelatorPhase::RequestCaptured;
    }

    /// A response event was observed. Captured only for the pending URL at
    /// the start stage, and only once per navigation; later stages and
    /// unmatched URLs are ignored.
    pub fn on_response_received(&mut self, response: &ResponseMeta) {
        if !matches!(
            self.phase,
            CorrelatorPhase::Pending | CorrelatorPhase::RequestCaptured
        ) {
            return;
        }
        if response.stage != ResponseStage::Start {
            return;
        }
        if self.pending_url.as_deref() != Some(response.url.as_str()) {
            return;
        }
        debug!(url = %response.url, status = response.status, "captured primary response");
        self.exchange.response = ResponseSlot::Received(ResponseCapture {
            url: response.url.clone(),
            status_code: response.status,
            headers: response.headers.clone(),
        });
        self.phase = CorrelatorPhase::ResponseCaptured;
    }

    /// The overall load finished. A failure invalidates the response slot
    /// regardless of anything captured before.
    pub fn on_load_finished(&mut self, outcome: LoadOutcome) {
        if outcome == LoadOutcome::Fail {
            debug!(url = ?self.pending_url, "load failed, invalidating response");
            self.exchange.response = ResponseSlot::Failed;
            self.phase = CorrelatorPhase::Failed;
        }
    }

    /// Read-only snapshot for the host.
    pub fn exchange(&self) -> &HttpExchange {
        &self.exchange
    }

    pub fn phase(&self) -> CorrelatorPhase {
        self.phase
    }

    /// URL of the navigation currently being tracked.
    pub fn pending_url(&self) -> Option<&str> {
        self.pending_url.as_deref()
    }
}

impl Default for NavigationCorrelator {
    fn default() -> Self {
        Self::new()
    }
}
