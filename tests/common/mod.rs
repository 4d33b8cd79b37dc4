// Shared helpers for the panel integration tests
//
// ScriptedTransport replays canned panel responses in order and records
// every request it was asked to send.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use ultrasync::{PanelConfig, PanelError, PanelRequest, PanelResponse, Result, Transport, UltraSync};

pub const HOST: &str = "panel.local";

/// Read a file from tests/var/.
pub fn fixture(name: &str) -> String {
    let path = format!("{}/tests/var/{name}", env!("CARGO_MANIFEST_DIR"));
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to read fixture {path}: {e}"))
}

#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<PanelResponse>>>,
    requests: Mutex<Vec<PanelRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a 200 response carrying the named fixture.
    pub fn reply(&self, fixture_name: &str) -> &Self {
        self.reply_body(fixture(fixture_name))
    }

    pub fn reply_body(&self, body: impl Into<String>) -> &Self {
        self.push(Ok(PanelResponse::ok(body)))
    }

    pub fn reply_status(&self, status: u16) -> &Self {
        self.push(Ok(PanelResponse { status, body: String::new() }))
    }

    pub fn fail(&self, details: &str) -> &Self {
        self.push(Err(PanelError::Connection { details: details.to_string() }))
    }

    fn push(&self, response: Result<PanelResponse>) -> &Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    pub fn requests(&self) -> Vec<PanelRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Request paths relative to the panel root, in send order.
    pub fn paths(&self) -> Vec<String> {
        let prefix = format!("http://{HOST}/");
        self.requests()
            .iter()
            .map(|r| r.url.strip_prefix(&prefix).unwrap_or(&r.url).to_string())
            .collect()
    }

    pub fn last_request(&self) -> PanelRequest {
        self.requests().pop().expect("no request was sent")
    }

    pub fn pending(&self) -> usize {
        self.responses.lock().unwrap().len()
    }

    pub fn forget_requests(&self) {
        self.requests.lock().unwrap().clear();
    }
}

impl Transport for ScriptedTransport {
    async fn send(&self, request: &PanelRequest) -> Result<PanelResponse> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(PanelError::Connection { details: format!("no scripted response for {}", request.url) })
        })
    }
}

pub fn config() -> PanelConfig {
    PanelConfig::builder().host(HOST).user("User 1").pin("1234").build()
}

pub fn panel() -> UltraSync<ScriptedTransport> {
    UltraSync::with_transport(config(), ScriptedTransport::new())
}

/// A client that has completed login against the given vendor fixtures.
pub async fn logged_in(vendor_dir: &str) -> UltraSync<ScriptedTransport> {
    let mut panel = panel();
    panel
        .transport()
        .reply(&format!("{vendor_dir}/area.htm"))
        .reply(&format!("{vendor_dir}/zones.htm"));
    assert!(panel.login().await.unwrap(), "login against {vendor_dir} fixtures failed");
    panel.transport().forget_requests();
    panel
}
