mod common;

use acme_console::domain::model::{GuardDecision, UnauthorizedPolicy, View};
use acme_console::domain::ports::TokenRefresher;
use acme_console::{ApiClient, ApiSettings, ConsoleError, InventoryApi, Result};
use async_trait::async_trait;
use common::harness;
use httpmock::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_expired_token_is_refreshed_and_request_retried_once() {
    let server = MockServer::start();
    let h = harness(&server.base_url(), UnauthorizedPolicy::RefreshAndRetry);
    h.session.login("stale").unwrap();

    let rejected = server.mock(|when, then| {
        when.method(GET)
            .path("/inventory")
            .header("authorization", "Bearer stale");
        then.status(401);
    });
    let refresh = server.mock(|when, then| {
        when.method(GET).path("/refresh");
        then.status(200)
            .json_body(serde_json::json!({"accessToken": "renewed"}));
    });
    let accepted = server.mock(|when, then| {
        when.method(GET)
            .path("/inventory")
            .header("authorization", "Bearer renewed");
        then.status(200).json_body(serde_json::json!([
            {"type": "outgoing", "mainCategoryName": "Steel"},
            {"type": "incoming", "mainCategoryName": "Cement"}
        ]));
    });

    let outgoing = InventoryApi::new(h.api.clone()).outgoing().await.unwrap();

    rejected.assert_hits(1);
    refresh.assert_hits(1);
    accepted.assert_hits(1);
    assert_eq!(outgoing.len(), 1);
    assert_eq!(h.session.get_token().as_deref(), Some("renewed"));
    // only the login navigation; the refresh is invisible to the user
    assert_eq!(h.log.events(), vec!["navigate:/dashboard".to_string()]);
}

#[tokio::test]
async fn test_failed_refresh_clears_token_then_notifies_then_redirects() {
    let server = MockServer::start();
    let h = harness(&server.base_url(), UnauthorizedPolicy::RefreshAndRetry);
    h.session.login("stale").unwrap();

    let rejected = server.mock(|when, then| {
        when.method(GET).path("/companies/names");
        then.status(401);
    });
    let refresh = server.mock(|when, then| {
        when.method(GET).path("/refresh");
        then.status(403)
            .json_body(serde_json::json!({"message": "Refresh token expired"}));
    });

    let err = h
        .api
        .get_json::<serde_json::Value>("/companies/names")
        .await
        .unwrap_err();

    rejected.assert_hits(1);
    refresh.assert_hits(1);
    assert!(matches!(err, ConsoleError::ExpiredSession));
    assert_eq!(h.session.get_token(), None);
    assert_eq!(
        h.log.events(),
        vec![
            "navigate:/dashboard".to_string(),
            "notice:Session Expired".to_string(),
            "navigate:/".to_string(),
        ]
    );
    assert_eq!(
        h.session.require_auth(&View::Companies),
        GuardDecision::Redirect(View::Login)
    );
}

#[tokio::test]
async fn test_refresh_without_token_in_body_counts_as_failure() {
    let server = MockServer::start();
    let h = harness(&server.base_url(), UnauthorizedPolicy::RefreshAndRetry);
    h.session.login("stale").unwrap();

    server.mock(|when, then| {
        when.method(GET).path("/inventory");
        then.status(401);
    });
    server.mock(|when, then| {
        when.method(GET).path("/refresh");
        then.status(200).json_body(serde_json::json!({}));
    });

    let err = InventoryApi::new(h.api.clone()).list().await.unwrap_err();

    assert!(matches!(err, ConsoleError::ExpiredSession));
    assert_eq!(h.session.get_token(), None);
}

#[tokio::test]
async fn test_retry_rejected_again_expires_session() {
    let server = MockServer::start();
    let h = harness(&server.base_url(), UnauthorizedPolicy::RefreshAndRetry);
    h.session.login("stale").unwrap();

    let always_rejected = server.mock(|when, then| {
        when.method(GET).path("/inventory");
        then.status(401);
    });
    let refresh = server.mock(|when, then| {
        when.method(GET).path("/refresh");
        then.status(200)
            .json_body(serde_json::json!({"accessToken": "also-bad"}));
    });

    let err = InventoryApi::new(h.api.clone()).list().await.unwrap_err();

    // original attempt plus exactly one retry, one refresh
    always_rejected.assert_hits(2);
    refresh.assert_hits(1);
    assert!(matches!(err, ConsoleError::ExpiredSession));
    assert_eq!(h.session.get_token(), None);
    assert!(h.log.events().contains(&"notice:Session Expired".to_string()));
}

#[tokio::test]
async fn test_clear_and_redirect_policy_never_refreshes() {
    let server = MockServer::start();
    let h = harness(&server.base_url(), UnauthorizedPolicy::ClearAndRedirect);
    h.session.login("stale").unwrap();

    let rejected = server.mock(|when, then| {
        when.method(GET).path("/inventory");
        then.status(401);
    });
    let refresh = server.mock(|when, then| {
        when.method(GET).path("/refresh");
        then.status(200)
            .json_body(serde_json::json!({"accessToken": "renewed"}));
    });

    let err = InventoryApi::new(h.api.clone()).list().await.unwrap_err();

    rejected.assert_hits(1);
    assert_eq!(refresh.hits(), 0);
    assert!(matches!(err, ConsoleError::ExpiredSession));
    assert_eq!(h.session.get_token(), None);
    // no notice; the next guarded navigation does the redirect
    assert_eq!(h.log.events(), vec!["navigate:/dashboard".to_string()]);
    assert_eq!(
        h.session.require_auth(&View::Dashboard),
        GuardDecision::Redirect(View::Login)
    );
}

#[tokio::test]
async fn test_unauthorized_without_token_redirects_without_refresh() {
    let server = MockServer::start();
    let h = harness(&server.base_url(), UnauthorizedPolicy::RefreshAndRetry);

    server.mock(|when, then| {
        when.method(GET).path("/inventory");
        then.status(401);
    });
    let refresh = server.mock(|when, then| {
        when.method(GET).path("/refresh");
        then.status(200)
            .json_body(serde_json::json!({"accessToken": "renewed"}));
    });

    let err = InventoryApi::new(h.api.clone()).list().await.unwrap_err();

    assert!(matches!(err, ConsoleError::NoCredential));
    assert_eq!(refresh.hits(), 0);
    assert_eq!(h.log.events(), vec!["navigate:/".to_string()]);
}

#[tokio::test]
async fn test_server_errors_keep_the_session() {
    let server = MockServer::start();
    let h = harness(&server.base_url(), UnauthorizedPolicy::RefreshAndRetry);
    h.session.login("good").unwrap();

    server.mock(|when, then| {
        when.method(GET).path("/inventory");
        then.status(500)
            .json_body(serde_json::json!({"message": "Database unavailable"}));
    });

    let err = InventoryApi::new(h.api.clone()).list().await.unwrap_err();

    match err {
        ConsoleError::Api { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "Database unavailable");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(h.session.get_token().as_deref(), Some("good"));
}

/// Refresher that counts calls and is slow enough for 401s to pile up.
struct SlowRefresher {
    calls: AtomicUsize,
}

#[async_trait]
impl TokenRefresher for SlowRefresher {
    async fn refresh(&self, _current: Option<&str>) -> Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok(Some("shared-renewal".to_string()))
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_unauthorized_requests_share_one_refresh() {
    let server = MockServer::start();
    let h = harness(&server.base_url(), UnauthorizedPolicy::RefreshAndRetry);
    h.session.login("stale").unwrap();

    let refresher = Arc::new(SlowRefresher {
        calls: AtomicUsize::new(0),
    });
    // two clients over one session, as separate views of the dashboard would have
    let clients: Vec<Arc<ApiClient>> = (0..2)
        .map(|_| {
            let settings = ApiSettings::new(server.base_url())
                .with_policy(UnauthorizedPolicy::RefreshAndRetry);
            Arc::new(
                ApiClient::new(settings, h.session.clone())
                    .unwrap()
                    .with_refresher(refresher.clone()),
            )
        })
        .collect();

    server.mock(|when, then| {
        when.method(GET)
            .path("/inventory")
            .header("authorization", "Bearer stale");
        then.status(401);
    });
    let accepted = server.mock(|when, then| {
        when.method(GET)
            .path("/inventory")
            .header("authorization", "Bearer shared-renewal");
        then.status(200).json_body(serde_json::json!([]));
    });

    let mut handles = Vec::new();
    for i in 0..6 {
        let api = clients[i % clients.len()].clone();
        handles.push(tokio::spawn(async move {
            api.get_json::<Vec<serde_json::Value>>("/inventory").await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }

    assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
    accepted.assert_hits(6);
    assert_eq!(h.session.get_token().as_deref(), Some("shared-renewal"));
}
