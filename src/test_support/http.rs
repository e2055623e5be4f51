use httpmock::MockServer;

/// Start a fresh `httpmock::MockServer` for tests that exercise the real HTTP transport.
pub async fn start_mock_server() -> MockServer {
    MockServer::start_async().await
}
