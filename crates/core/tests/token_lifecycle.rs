//! Credential store and token lifecycle behaviour against in-memory ports.

mod support;

use chrono::Duration;
use slotline_domain::{ConnectionStatus, Provider, SlotlineError};
use support::providers::{grant, PrefixCipher};
use support::{monday_morning, Harness};

#[tokio::test]
async fn fresh_token_is_returned_without_refresh() {
    let h = Harness::new(monday_morning());
    h.connect("u1", Provider::Calendar, "ya29.cached", Some("1//r"), monday_morning() + Duration::hours(1));

    let token = h.tokens.get_valid_access_token("u1", Provider::Calendar).await.unwrap();

    assert_eq!(token.token, "ya29.cached");
    assert!(!token.refreshed);
    assert!(h.endpoint.refresh_calls().is_empty());
}

#[tokio::test]
async fn token_inside_threshold_is_refreshed_and_persisted() {
    let h = Harness::new(monday_morning());
    h.connect("u1", Provider::Mail, "ya29.old", Some("1//r"), monday_morning() + Duration::minutes(4));
    h.endpoint.respond_with(grant("ya29.new", None, 3600));

    let token = h.tokens.get_valid_access_token("u1", Provider::Mail).await.unwrap();

    assert_eq!(token.token, "ya29.new");
    assert!(token.refreshed);
    assert_eq!(h.endpoint.refresh_calls(), vec![(Provider::Mail, "1//r".to_string())]);

    let row = h.credentials.get("u1", Provider::Mail).unwrap();
    assert_eq!(row.access_token_enc.as_deref(), Some(PrefixCipher::sealed("ya29.new").as_str()));
    assert_eq!(row.refresh_token_enc.as_deref(), Some(PrefixCipher::sealed("1//r").as_str()));
    assert_eq!(row.expires_at, monday_morning() + Duration::hours(1));

    // The persisted token is now served from cache.
    let again = h.tokens.get_valid_access_token("u1", Provider::Mail).await.unwrap();
    assert_eq!(again.token, "ya29.new");
    assert!(!again.refreshed);
    assert_eq!(h.endpoint.refresh_calls().len(), 1);
}

#[tokio::test]
async fn rotated_refresh_token_replaces_the_stored_one() {
    let h = Harness::new(monday_morning());
    h.connect("u1", Provider::Mail, "ya29.old", Some("1//old"), monday_morning());
    h.endpoint.respond_with(grant("ya29.new", Some("1//rotated"), 3600));

    h.tokens.get_valid_access_token("u1", Provider::Mail).await.unwrap();

    let row = h.credentials.get("u1", Provider::Mail).unwrap();
    assert_eq!(row.refresh_token_enc.as_deref(), Some(PrefixCipher::sealed("1//rotated").as_str()));
}

#[tokio::test]
async fn missing_refresh_token_requires_reconnect() {
    let h = Harness::new(monday_morning());
    h.connect("u1", Provider::Calendar, "ya29.old", None, monday_morning() + Duration::minutes(2));

    let err = h.tokens.get_valid_access_token("u1", Provider::Calendar).await.unwrap_err();

    assert_eq!(err, SlotlineError::NeedsReconnect(Provider::Calendar));
    assert!(h.endpoint.refresh_calls().is_empty());
}

#[tokio::test]
async fn provider_refusal_requires_reconnect_without_retry() {
    let h = Harness::new(monday_morning());
    h.connect("u1", Provider::Mail, "ya29.old", Some("1//revoked"), monday_morning());
    h.endpoint.fail_with(SlotlineError::Auth("invalid_grant".to_string()));

    let err = h.tokens.get_valid_access_token("u1", Provider::Mail).await.unwrap_err();

    assert_eq!(err, SlotlineError::NeedsReconnect(Provider::Mail));
    assert_eq!(h.endpoint.refresh_calls().len(), 1);
    assert_eq!(h.credentials.token_updates(), 0);
}

#[tokio::test]
async fn transient_refresh_failure_also_maps_to_reconnect() {
    let h = Harness::new(monday_morning());
    h.connect("u1", Provider::Mail, "ya29.old", Some("1//r"), monday_morning());
    h.endpoint.fail_with(SlotlineError::Network("connection reset".to_string()));

    let err = h.tokens.get_valid_access_token("u1", Provider::Mail).await.unwrap_err();
    assert_eq!(err, SlotlineError::NeedsReconnect(Provider::Mail));
}

#[tokio::test]
async fn unknown_user_requires_reconnect() {
    let h = Harness::new(monday_morning());
    let err = h.tokens.get_valid_access_token("nobody", Provider::Mail).await.unwrap_err();
    assert_eq!(err, SlotlineError::NeedsReconnect(Provider::Mail));
}

#[tokio::test]
async fn legacy_plaintext_rows_are_still_usable() {
    let h = Harness::new(monday_morning());
    h.connect_plaintext("u1", Provider::Mail, "ya29.plain", "1//plain", monday_morning() - Duration::minutes(1));
    h.endpoint.respond_with(grant("ya29.sealed", None, 3600));

    let token = h.tokens.get_valid_access_token("u1", Provider::Mail).await.unwrap();

    assert_eq!(token.token, "ya29.sealed");
    assert_eq!(h.endpoint.refresh_calls(), vec![(Provider::Mail, "1//plain".to_string())]);

    let credential = h.store.load("u1", Provider::Mail).await.unwrap().unwrap();
    assert_eq!(credential.access_token, "ya29.sealed");
    // Refresh token was not rotated, so the legacy value is kept as stored.
    assert_eq!(credential.refresh_token.as_deref(), Some("1//plain"));
}

#[tokio::test]
async fn reauthorization_without_refresh_token_keeps_the_old_one() {
    let h = Harness::new(monday_morning());
    h.store.save_authorization("u1", Provider::Calendar, &grant("ya29.a", Some("1//first"), 3600)).await.unwrap();

    let credential = h
        .store
        .save_authorization("u1", Provider::Calendar, &grant("ya29.b", None, 1800))
        .await
        .unwrap();

    assert_eq!(credential.access_token, "ya29.b");
    assert_eq!(credential.refresh_token.as_deref(), Some("1//first"));
    assert_eq!(credential.expires_at, monday_morning() + Duration::minutes(30));

    let row = h.credentials.get("u1", Provider::Calendar).unwrap();
    assert_eq!(row.status, ConnectionStatus::Connected);
    assert_eq!(row.refresh_token_enc.as_deref(), Some(PrefixCipher::sealed("1//first").as_str()));
}

#[tokio::test]
async fn disconnected_credentials_are_not_served() {
    let h = Harness::new(monday_morning());
    h.connect("u1", Provider::Mail, "ya29.a", Some("1//r"), monday_morning() + Duration::hours(1));

    h.store.disconnect("u1", Provider::Mail).await.unwrap();

    let row = h.credentials.get("u1", Provider::Mail).unwrap();
    assert_eq!(row.status, ConnectionStatus::Disconnected);
    assert!(row.access_token_enc.is_none());
    assert!(h.store.load("u1", Provider::Mail).await.unwrap().is_none());
    assert_eq!(
        h.tokens.get_valid_access_token("u1", Provider::Mail).await.unwrap_err(),
        SlotlineError::NeedsReconnect(Provider::Mail)
    );
}

#[tokio::test]
async fn credentials_are_scoped_per_provider() {
    let h = Harness::new(monday_morning());
    h.connect("u1", Provider::Mail, "ya29.mail", Some("1//r"), monday_morning() + Duration::hours(1));

    assert!(h.tokens.get_valid_access_token("u1", Provider::Mail).await.is_ok());
    assert_eq!(
        h.tokens.get_valid_access_token("u1", Provider::Calendar).await.unwrap_err(),
        SlotlineError::NeedsReconnect(Provider::Calendar)
    );
}
