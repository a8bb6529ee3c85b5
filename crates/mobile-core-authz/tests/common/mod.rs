// crates/mobile-core-authz/tests/common/mod.rs
// ============================================================================
// Module: Authz Test Support
// Description: Scripted cluster API stub built on tiny_http.
// Purpose: Record requests and replay canned responses for client tests.
// Dependencies: mobile-core-authz, tiny_http
// ============================================================================

#![allow(dead_code, reason = "Shared helpers are not used by every test binary.")]

use std::net::TcpListener;
use std::thread;
use std::thread::JoinHandle;

use mobile_core_authz::ClusterClient;
use mobile_core_authz::ClusterClientConfig;
use tiny_http::Response;
use tiny_http::Server;

/// Canned response for one request.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: String,
}

impl Reply {
    pub fn new(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
        }
    }
}

/// Request captured by the stub.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub url: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

/// Running stub; answers exactly `replies.len()` requests.
pub struct ClusterStub {
    pub host: String,
    handle: JoinHandle<Vec<Recorded>>,
}

impl ClusterStub {
    /// Waits for the scripted exchange and returns the captured requests.
    pub fn finish(self) -> Vec<Recorded> {
        self.handle.join().unwrap()
    }
}

/// Starts a stub that answers each request with the next reply in order.
pub fn spawn_cluster(replies: Vec<Reply>) -> ClusterStub {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let handle = thread::spawn(move || {
        let mut recorded = Vec::new();
        for reply in replies {
            let mut request = server.recv().unwrap();
            let header = |name: &'static str| {
                request
                    .headers()
                    .iter()
                    .find(|header| header.field.equiv(name))
                    .map(|header| header.value.as_str().to_string())
            };
            let authorization = header("Authorization");
            let content_type = header("Content-Type");
            let mut body = String::new();
            request.as_reader().read_to_string(&mut body).unwrap();
            recorded.push(Recorded {
                method: request.method().as_str().to_string(),
                url: request.url().to_string(),
                authorization,
                content_type,
                body,
            });
            let response = Response::from_string(reply.body).with_status_code(reply.status);
            request.respond(response).unwrap();
        }
        recorded
    });
    ClusterStub {
        host: format!("http://{addr}"),
        handle,
    }
}

/// Returns a host URL nothing listens on.
pub fn closed_host() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// Builds a token-scoped client for `host` in the `mobile` namespace.
pub fn client_for(host: &str, token: &str) -> ClusterClient {
    let config = ClusterClientConfig {
        connect_timeout_ms: 2_000,
        request_timeout_ms: 5_000,
        ..ClusterClientConfig::new(host, "mobile")
    };
    ClusterClient::new(config).unwrap().with_token(token)
}

/// Standard user payload.
pub fn user_body(name: &str, groups: &[&str]) -> String {
    serde_json::json!({ "metadata": { "name": name }, "groups": groups }).to_string()
}
