//! Security events produced by served requests and their delivery.

use axum::http::StatusCode;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use static_guard::config::{HeadersConfig, RateLimitConfig, SecurityConfig, SuspiciousConfig};
use static_guard::{EventType, SecurityEvent, Severity};

mod common;
use common::*;

fn webhook(url: &str) -> SecurityConfig {
    SecurityConfig {
        enabled: true,
        webhook_url: url.to_string(),
        webhook_async: false,
        webhook_timeout: Duration::from_secs(2),
        ..Default::default()
    }
}

fn recorded(handler: &static_guard::StaticHandler) -> Arc<Mutex<Vec<SecurityEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    handler.add_security_callback(move |event| sink.lock().unwrap().push(event.clone()));
    events
}

#[tokio::test]
async fn test_sync_webhook_is_delivered_before_response() {
    let receiver = WebhookReceiver::start().await;
    let handler = fixture_handler();
    let mut config = webhook(&receiver.url);
    config
        .webhook_headers
        .insert("X-Api-Key".to_string(), "secret".to_string());
    handler.set_security_config(config);
    let app = app(&handler);

    let response = get(&app, "/static/../../../etc/passwd").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(receiver.count(), 1);

    let delivery = &receiver.deliveries()[0];
    assert_eq!(delivery.content_type, "application/json");
    assert_eq!(delivery.headers["x-api-key"], "secret");

    let event = delivery.json();
    assert_eq!(event["event_type"], "path_traversal");
    assert_eq!(event["severity"], "high");
    assert_eq!(event["blocked"], true);
    assert_eq!(event["status_code"], 403);
    assert_eq!(event["ip"], "198.51.100.20");
    assert_eq!(event["remote_addr"], CLIENT);
    assert_eq!(event["method"], "GET");
}

#[tokio::test]
async fn test_async_webhook_arrives_later() {
    let receiver = WebhookReceiver::start().await;
    let handler = fixture_handler();
    handler.set_security_config(SecurityConfig {
        webhook_async: true,
        ..webhook(&receiver.url)
    });
    let app = app(&handler);

    assert_eq!(get(&app, "/static/.env").await.status(), StatusCode::FORBIDDEN);

    let deliveries = receiver.wait_for(1, Duration::from_secs(3)).await;
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].json()["event_type"], "dot_file_access");
}

#[tokio::test]
async fn test_cef_format() {
    let receiver = WebhookReceiver::start().await;
    let handler = fixture_handler();
    handler.set_security_config(SecurityConfig {
        cef_format: true,
        ..webhook(&receiver.url)
    });
    let app = app(&handler);

    get(&app, "/static/.env").await;

    let delivery = &receiver.deliveries()[0];
    assert_eq!(delivery.content_type, "text/plain");
    assert!(delivery
        .body
        .starts_with("CEF:0|static-guard|embedded-static|1.0|dot_file_access|dot_file_access|5|"));
    assert!(delivery.body.contains("src=198.51.100.20"));
    assert!(delivery.body.contains("outcome=blocked"));
    assert!(delivery.body.contains("cn1=403"));
}

#[tokio::test]
async fn test_min_severity_filters() {
    let receiver = WebhookReceiver::start().await;
    let handler = fixture_handler();
    handler.set_security_config(SecurityConfig {
        min_severity: Severity::High,
        ..webhook(&receiver.url)
    });
    let app = app(&handler);

    get(&app, "/static/.env").await;
    assert_eq!(receiver.count(), 0);

    get(&app, "/static/../secret").await;
    get(&app, "/static/a%00b.txt").await;
    let deliveries = receiver.deliveries();
    assert_eq!(deliveries.len(), 2);
    assert_eq!(deliveries[0].json()["severity"], "high");
    assert_eq!(deliveries[1].json()["event_type"], "null_byte");
    assert_eq!(deliveries[1].json()["severity"], "critical");
}

#[tokio::test]
async fn test_batch_flushes_at_size() {
    let receiver = WebhookReceiver::start().await;
    let handler = fixture_handler();
    handler.set_security_config(SecurityConfig {
        batch_size: 3,
        batch_timeout: Duration::from_secs(60),
        ..webhook(&receiver.url)
    });
    let app = app(&handler);

    get(&app, "/static/.env").await;
    get(&app, "/static/.git/config").await;
    assert_eq!(handler.pending_security_events(), 2);
    get(&app, "/static/../x").await;

    let deliveries = receiver.wait_for(1, Duration::from_secs(3)).await;
    assert_eq!(deliveries.len(), 1);
    let payload = deliveries[0].json();
    assert_eq!(payload["count"], 3);
    assert_eq!(payload["events"].as_array().unwrap().len(), 3);
    assert_eq!(handler.pending_security_events(), 0);
}

#[tokio::test]
async fn test_batch_flushes_on_timer() {
    let receiver = WebhookReceiver::start().await;
    let handler = fixture_handler();
    handler.set_security_config(SecurityConfig {
        batch_size: 10,
        batch_timeout: Duration::from_millis(100),
        ..webhook(&receiver.url)
    });
    let app = app(&handler);

    get(&app, "/static/.env").await;
    get(&app, "/static/../x").await;

    let deliveries = receiver.wait_for(1, Duration::from_secs(3)).await;
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].json()["count"], 2);
    assert_eq!(handler.pending_security_events(), 0);

    // A later event starts a fresh window.
    get(&app, "/static/.svn/entries").await;
    let deliveries = receiver.wait_for(2, Duration::from_secs(3)).await;
    assert_eq!(deliveries.len(), 2);
    assert_eq!(deliveries[1].json()["count"], 1);
}

#[tokio::test]
async fn test_flush_on_demand_and_on_reconfigure() {
    let receiver = WebhookReceiver::start().await;
    let handler = fixture_handler();
    let batched = SecurityConfig {
        batch_size: 10,
        batch_timeout: Duration::from_secs(60),
        ..webhook(&receiver.url)
    };
    handler.set_security_config(batched.clone());
    let app = app(&handler);

    get(&app, "/static/.env").await;
    get(&app, "/static/../x").await;
    assert_eq!(handler.pending_security_events(), 2);
    handler.flush_security_events().await;
    assert_eq!(receiver.count(), 1);
    assert_eq!(handler.pending_security_events(), 0);

    get(&app, "/static/.env").await;
    handler.set_security_config(webhook(&receiver.url));
    let deliveries = receiver.wait_for(2, Duration::from_secs(3)).await;
    assert_eq!(deliveries[1].json()["count"], 1);
}

#[tokio::test]
async fn test_webhook_failure_does_not_change_response() {
    let receiver = WebhookReceiver::start().await;
    receiver.respond_with(500);
    let handler = fixture_handler();
    handler.set_security_config(webhook(&receiver.url));
    let app = app(&handler);

    assert_eq!(get(&app, "/static/../x").await.status(), StatusCode::FORBIDDEN);
    assert_eq!(receiver.count(), 1);

    // Nothing listens on the discard port.
    handler.set_security_config(SecurityConfig {
        webhook_timeout: Duration::from_millis(200),
        ..webhook("http://127.0.0.1:9/hook")
    });
    assert_eq!(get(&app, "/static/../x").await.status(), StatusCode::FORBIDDEN);
    assert_eq!(get(&app, "/static/test.txt").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_callbacks_see_every_blocking_decision() {
    let handler = fixture_handler();
    handler.set_security_config(SecurityConfig {
        enabled: true,
        ..Default::default()
    });
    let events = recorded(&handler);
    handler.set_headers_config(HeadersConfig {
        denied_mime_types: vec!["application/javascript".to_string(), "text/javascript".to_string()],
        ..Default::default()
    });
    handler.set_rate_limit_config(RateLimitConfig {
        enabled: true,
        max_requests: 1,
        ..Default::default()
    });
    let app = app(&handler);

    assert_eq!(get(&app, "/static/app.js").await.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        get(&app, "/static/test.txt").await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );

    assert!(wait_until(Duration::from_secs(3), || events.lock().unwrap().len() == 2).await);
    let events = events.lock().unwrap();
    let mime = events
        .iter()
        .find(|e| e.event_type == EventType::MimeTypeDenied)
        .unwrap();
    assert_eq!(mime.status_code, 403);
    assert_eq!(mime.details["reason"], "denied");

    let limited = events
        .iter()
        .find(|e| e.event_type == EventType::RateLimitExceeded)
        .unwrap();
    assert_eq!(limited.status_code, 429);
    assert_eq!(limited.details["limit"], "1");
    assert!(limited.blocked);
}

#[tokio::test]
async fn test_disabled_pipeline_is_silent() {
    let handler = fixture_handler();
    let events = recorded(&handler);
    let app = app(&handler);

    get(&app, "/static/../x").await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(events.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_suspicious_reported_with_final_status() {
    let handler = fixture_handler();
    handler.set_security_config(SecurityConfig {
        enabled: true,
        ..Default::default()
    });
    let events = recorded(&handler);
    handler.set_suspicious_config(SuspiciousConfig {
        enabled: true,
        ..Default::default()
    });
    let app = app(&handler);

    // Served successfully: quiet unless successful access is logged.
    assert_eq!(get(&app, "/static/backup.sql").await.status(), StatusCode::OK);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(events.lock().unwrap().is_empty());

    // Not found: reported, not blocked.
    assert_eq!(get(&app, "/static/shell.php").await.status(), StatusCode::NOT_FOUND);
    assert!(wait_until(Duration::from_secs(3), || events.lock().unwrap().len() == 1).await);
    {
        let events = events.lock().unwrap();
        assert_eq!(events[0].event_type, EventType::SuspiciousAccess);
        assert_eq!(events[0].severity, Severity::Medium);
        assert_eq!(events[0].status_code, 404);
        assert!(!events[0].blocked);
        assert_eq!(events[0].details["pattern"], ".php");
        assert_eq!(events[0].details["match"], "extension");
    }

    // Blocked by the guard: the violation plus a high severity suspicious event.
    assert_eq!(get(&app, "/static/.env").await.status(), StatusCode::FORBIDDEN);
    assert!(wait_until(Duration::from_secs(3), || events.lock().unwrap().len() == 3).await);
    {
        let events = events.lock().unwrap();
        let suspicious = events[1..]
            .iter()
            .find(|e| e.event_type == EventType::SuspiciousAccess)
            .unwrap();
        assert_eq!(suspicious.severity, Severity::High);
        assert!(suspicious.blocked);
        assert!(events[1..].iter().any(|e| e.event_type == EventType::DotFileAccess));
    }

    handler.set_suspicious_config(SuspiciousConfig {
        enabled: true,
        log_successful_access: true,
        ..Default::default()
    });
    assert_eq!(get(&app, "/static/backup.sql").await.status(), StatusCode::OK);
    assert!(wait_until(Duration::from_secs(3), || events.lock().unwrap().len() == 4).await);
    let events = events.lock().unwrap();
    assert_eq!(events[3].status_code, 200);
    assert!(!events[3].blocked);
    assert_eq!(events[3].details["pattern"], ".sql");
}

#[tokio::test]
async fn test_custom_headers_map_is_sent_verbatim() {
    let receiver = WebhookReceiver::start().await;
    let handler = fixture_handler();
    let mut headers = HashMap::new();
    headers.insert("Authorization".to_string(), "Bearer t0k3n".to_string());
    handler.set_security_config(SecurityConfig {
        webhook_headers: headers,
        ..webhook(&receiver.url)
    });
    let app = app(&handler);

    get(&app, "/static/.env").await;
    assert_eq!(receiver.deliveries()[0].headers["authorization"], "Bearer t0k3n");
}
