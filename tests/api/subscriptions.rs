//! tests/api/subscriptions.rs

use crate::helpers::spawn_app;
use alerter::routes::MessageBody;

#[tokio::test]
async fn subscribe_returns_a_200_for_a_new_email() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app.post_subscribe("ursula_le_guin@gmail.com").await;

    // Assert
    assert_eq!(200, response.status().as_u16());
    let body: MessageBody = response.json().await.unwrap();
    assert_eq!(body.message, "Successfully subscribed!");
}

#[tokio::test]
async fn subscribe_persists_the_new_subscriber() {
    // Arrange
    let app = spawn_app().await;

    // Act
    app.post_subscribe("ursula_le_guin@gmail.com").await;

    // Assert
    assert_eq!(app.subscribers().await, vec!["ursula_le_guin@gmail.com"]);

    let saved: Vec<String> = serde_json::from_slice(
        &std::fs::read(app.data_dir.path().join("subscribers.json"))
            .expect("Subscriber file was not written."),
    )
    .unwrap();
    assert_eq!(saved, vec!["ursula_le_guin@gmail.com"]);
}

#[tokio::test]
async fn subscribing_twice_returns_a_409_and_keeps_one_entry() {
    // Arrange
    let app = spawn_app().await;
    app.post_subscribe("ursula_le_guin@gmail.com").await;

    // Act
    let response = app.post_subscribe("ursula_le_guin@gmail.com").await;

    // Assert
    assert_eq!(409, response.status().as_u16());
    let body: MessageBody = response.json().await.unwrap();
    assert_eq!(body.message, "Already subscribed.");
    assert_eq!(app.subscribers().await, vec!["ursula_le_guin@gmail.com"]);
}

#[tokio::test]
async fn subscribe_returns_a_400_when_email_is_missing_or_blank() {
    // Arrange
    let app = spawn_app().await;
    let test_cases = vec![
        (serde_json::json!({}), "missing the email"),
        (serde_json::json!({ "email": "" }), "empty email"),
        (serde_json::json!({ "email": "   " }), "blank email"),
        (serde_json::json!({ "email": 42 }), "email of the wrong type"),
    ];

    for (body, error_message) in test_cases {
        // Act
        let response = app.post_json("/subscribe", &body).await;

        // Assert
        assert_eq!(
            400,
            response.status().as_u16(),
            // Additional customised error message on test failure
            "The API did not fail with 400 Bad Request when the payload was {}.",
            error_message
        );
        let body: Result<MessageBody, _> = response.json().await;
        assert!(
            body.is_ok(),
            "The 400 response for {} had no message body.",
            error_message
        );
    }

    assert!(app.subscribers().await.is_empty());
}

#[tokio::test]
async fn subscribe_returns_a_400_for_malformed_json() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app
        .api_client
        .post(&format!("{}/subscribe", app.address))
        .header("Content-Type", "application/json")
        .body("{\"email\": ")
        .send()
        .await
        .expect("Failed to execute request.");

    // Assert
    assert_eq!(400, response.status().as_u16());
    let body: MessageBody = response.json().await.unwrap();
    assert!(!body.message.is_empty());
}

#[tokio::test]
async fn email_addresses_are_case_sensitive() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let first = app.post_subscribe("Ursula@gmail.com").await;
    let second = app.post_subscribe("ursula@gmail.com").await;

    // Assert
    assert_eq!(200, first.status().as_u16());
    assert_eq!(200, second.status().as_u16());
    assert_eq!(
        app.subscribers().await,
        vec!["Ursula@gmail.com", "ursula@gmail.com"]
    );
}

#[tokio::test]
async fn concurrent_subscribes_of_one_email_store_a_single_entry() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let (first, second) = tokio::join!(
        app.post_subscribe("ursula_le_guin@gmail.com"),
        app.post_subscribe("ursula_le_guin@gmail.com"),
    );

    // Assert
    let mut statuses = vec![first.status().as_u16(), second.status().as_u16()];
    statuses.sort();
    assert_eq!(statuses, vec![200, 409]);
    assert_eq!(app.subscribers().await, vec!["ursula_le_guin@gmail.com"]);
}

#[tokio::test]
async fn unsubscribe_removes_the_subscriber() {
    // Arrange
    let app = spawn_app().await;
    app.post_subscribe("ursula_le_guin@gmail.com").await;
    app.post_subscribe("le_guin@gmail.com").await;

    // Act
    let response = app.post_unsubscribe("ursula_le_guin@gmail.com").await;

    // Assert
    assert_eq!(200, response.status().as_u16());
    let body: MessageBody = response.json().await.unwrap();
    assert_eq!(body.message, "Successfully unsubscribed.");
    assert_eq!(app.subscribers().await, vec!["le_guin@gmail.com"]);
}

#[tokio::test]
async fn unsubscribe_returns_a_404_for_an_unknown_email() {
    // Arrange
    let app = spawn_app().await;
    app.post_subscribe("ursula_le_guin@gmail.com").await;

    // Act
    let response = app.post_unsubscribe("le_guin@gmail.com").await;

    // Assert
    assert_eq!(404, response.status().as_u16());
    let body: MessageBody = response.json().await.unwrap();
    assert_eq!(body.message, "Email not found.");
    assert_eq!(app.subscribers().await, vec!["ursula_le_guin@gmail.com"]);
}

#[tokio::test]
async fn unsubscribe_returns_a_400_when_email_is_missing() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app.post_json("/unsubscribe", &serde_json::json!({})).await;

    // Assert
    assert_eq!(400, response.status().as_u16());
}

#[tokio::test]
async fn subscribe_fails_with_a_503_if_storage_is_unavailable() {
    // Arrange
    let app = spawn_app().await;
    app.post_subscribe("ursula_le_guin@gmail.com").await;

    // Sabotage the storage
    std::fs::remove_dir_all(app.data_dir.path()).unwrap();

    // Act
    let subscribe = app.post_subscribe("le_guin@gmail.com").await;
    let unsubscribe = app.post_unsubscribe("ursula_le_guin@gmail.com").await;

    // Assert
    assert_eq!(subscribe.status().as_u16(), 503);
    assert_eq!(unsubscribe.status().as_u16(), 503);
    assert_eq!(app.subscribers().await, vec!["ursula_le_guin@gmail.com"]);
}
