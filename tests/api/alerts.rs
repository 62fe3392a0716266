//! tests/api/alerts.rs

use crate::helpers::{spawn_app, TestApp};
use alerter::routes::AlertSummary;
use std::collections::HashSet;
use wiremock::matchers::{any, body_partial_json, method};
use wiremock::{Mock, ResponseTemplate};

fn alert() -> serde_json::Value {
    serde_json::json!({
        "subject": "New Job Alert: Rust developer",
        "body": "A new job titled \"Rust developer\" has been posted.",
    })
}

async fn subscribe_all(app: &TestApp, emails: &[&str]) {
    for email in emails {
        let response = app.post_subscribe(email).await;
        assert_eq!(200, response.status().as_u16());
    }
}

#[tokio::test]
async fn alerts_with_no_subscribers_send_nothing() {
    // Arrange
    let app = spawn_app().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        // We assert that no request is fired at the mail API!
        .expect(0)
        .mount(&app.email_server)
        .await;

    // Act
    let response = app.post_alert(alert()).await;

    // Assert
    assert_eq!(response.status().as_u16(), 200);
    let summary: AlertSummary = response.json().await.unwrap();
    assert_eq!(summary.sent, 0);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.message, "No subscribers to send alerts.");
    // Mock verifies on Drop that we haven't sent any email
}

#[tokio::test]
async fn alerts_are_delivered_once_to_every_subscriber() {
    // Arrange
    let app = spawn_app().await;
    let subscribers = ["a@gmail.com", "b@gmail.com", "c@gmail.com"];
    subscribe_all(&app, &subscribers).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(3)
        .mount(&app.email_server)
        .await;

    // Act
    let response = app.post_alert(alert()).await;

    // Assert
    assert_eq!(response.status().as_u16(), 200);
    let summary: AlertSummary = response.json().await.unwrap();
    assert_eq!(summary.sent, 3);
    assert_eq!(summary.failed, 0);

    let emails = app.sent_emails().await;
    let recipients: HashSet<String> = emails
        .iter()
        .flat_map(|e| e.to.iter().map(|r| r.email.clone()))
        .collect();
    assert_eq!(
        recipients,
        subscribers.iter().map(|s| s.to_string()).collect::<HashSet<_>>()
    );
    for email in &emails {
        assert_eq!(email.to.len(), 1);
        assert_eq!(email.subject, "New Job Alert: Rust developer");
        assert!(email.text_content.contains("Rust developer"));
        assert!(email.html_content.contains("Rust developer"));
    }
}

#[tokio::test]
async fn unsubscribed_emails_do_not_receive_alerts() {
    // Arrange
    let app = spawn_app().await;
    subscribe_all(&app, &["a@gmail.com", "b@gmail.com"]).await;
    app.post_unsubscribe("a@gmail.com").await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.email_server)
        .await;

    // Act
    let response = app.post_alert(alert()).await;

    // Assert
    assert_eq!(response.status().as_u16(), 200);
    let emails = app.sent_emails().await;
    assert_eq!(emails[0].to[0].email, "b@gmail.com");
}

#[tokio::test]
async fn a_failing_recipient_does_not_block_the_rest() {
    // Arrange
    let app = spawn_app().await;
    subscribe_all(&app, &["a@gmail.com", "b@gmail.com", "c@gmail.com"]).await;
    Mock::given(body_partial_json(serde_json::json!({
        "to": [{ "email": "b@gmail.com" }]
    })))
    .respond_with(ResponseTemplate::new(500))
    .expect(1)
    .mount(&app.email_server)
    .await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&app.email_server)
        .await;

    // Act
    let response = app.post_alert(alert()).await;

    // Assert
    assert_eq!(response.status().as_u16(), 502);
    let summary: AlertSummary = response.json().await.unwrap();
    assert_eq!(summary.sent, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.failed_recipients.len(), 1);
    assert_eq!(summary.failed_recipients[0].email, "b@gmail.com");
    assert!(!summary.failed_recipients[0].reason.is_empty());
}

#[tokio::test]
async fn alerts_return_400_for_invalid_data() {
    // Arrange
    let app = spawn_app().await;
    subscribe_all(&app, &["a@gmail.com"]).await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.email_server)
        .await;

    let test_cases = vec![
        (serde_json::json!({ "body": "Rust developer" }), "missing subject"),
        (serde_json::json!({ "subject": "New job" }), "missing body"),
        (
            serde_json::json!({ "subject": "  ", "body": "Rust developer" }),
            "blank subject",
        ),
        (
            serde_json::json!({ "subject": "New job", "body": "" }),
            "empty body",
        ),
        (
            serde_json::json!({ "title": "Rust developer" }),
            "title instead of subject and body",
        ),
    ];

    for (invalid_body, error_message) in test_cases {
        // Act
        let response = app.post_alert(invalid_body).await;

        // Assert
        assert_eq!(
            response.status().as_u16(),
            400,
            "The API did not fail with 400 Bad Request when the payload was {}.",
            error_message
        );
    }
}
