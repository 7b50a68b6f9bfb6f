// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Verify sessions stored on disk survive a restart.

use httptest::{Expectation, Server, matchers::*, responders::*};
use ritmio_auth::config::ClientConfig;
use ritmio_auth::controller::{AuthController, AuthStatus};
use ritmio_auth::store::{FileStore, TokenStore};
use serde_json::json;

type TestResult = anyhow::Result<()>;

fn test_controller(server: &Server, path: &std::path::Path) -> AuthController {
    let config = ClientConfig::builder()
        .with_endpoint(server.url_str("/api/v1"))
        .build();
    AuthController::new(config, TokenStore::new(FileStore::new(path)))
}

#[tokio::test]
async fn restart() -> TestResult {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("POST", "/api/v1/sessions")).respond_with(
            json_encoded(json!({
                "accessToken": "token-1",
                "expiresAt": "2035-03-01T10:00:00Z",
                "refreshAfter": "2035-03-01T09:55:00Z",
            })),
        ),
    );
    server.expect(
        Expectation::matching(all_of![
            request::method_path("GET", "/api/v1/users/me"),
            request::headers(contains(("authorization", "Bearer token-1"))),
        ])
        .times(2)
        .respond_with(json_encoded(json!({"id": 1, "name": "Ada", "email": "a@b.com"}))),
    );
    server.expect(
        Expectation::matching(request::method_path("DELETE", "/api/v1/sessions"))
            .respond_with(status_code(204)),
    );

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("session.json");

    let first = test_controller(&server, &path);
    first.login("a@b.com", "secret1").await?;
    first.gateway().scheduler().cancel();
    drop(first);

    let second = test_controller(&server, &path);
    let cached = second.gateway().store().profile();
    assert_eq!(cached.map(|p| p.name).as_deref(), Some("Ada"));
    assert_eq!(second.bootstrap().await, AuthStatus::Auth);

    second.logout().await;
    let third = test_controller(&server, &path);
    assert_eq!(third.bootstrap().await, AuthStatus::Guest);
    Ok(())
}
