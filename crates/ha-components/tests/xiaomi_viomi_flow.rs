//! End-to-end tests for the Xiaomi Viomi config flow

mod common;

use common::*;
use ha_components::xiaomi_viomi::{ConnectOutcome, DeviceInfo, DOMAIN, ERROR_INVALID_LENGTH};
use ha_config_entries::{setup_handler, ConfigEntryState, FlowResultType};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_user_step_shows_form() {
    let hass = TestHass::new(FakeConnector::new());

    let result = hass.flows.start_flow(DOMAIN).await.unwrap();

    assert_eq!(result.result_type, FlowResultType::Form);
    assert_eq!(result.step_id.as_deref(), Some("user"));
    assert!(result.errors.is_none());
    let fields: Vec<_> = result.data_schema.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(fields, ["host", "token", "name"]);
    assert_eq!(hass.connector.connects(), 0);
}

#[tokio::test]
async fn test_create_entry_titled_by_model() {
    let hass = TestHass::new(FakeConnector::new().device("10.0.0.5", MODEL, MAC));

    let form = hass.flows.start_flow(DOMAIN).await.unwrap();
    let result = hass
        .flows
        .progress_flow(
            &form.flow_id,
            Some(json!({"host": "10.0.0.5", "token": TOKEN})),
        )
        .await
        .unwrap();

    assert_eq!(result.result_type, FlowResultType::CreateEntry);
    assert_eq!(result.title.as_deref(), Some(MODEL));
    assert_eq!(result.context.unique_id.as_deref(), Some(UNIQUE_ID));
    assert_eq!(result.version, Some(1));

    let entry = hass.entries.get_by_unique_id(DOMAIN, UNIQUE_ID).unwrap();
    assert_eq!(entry.title, MODEL);
    assert_eq!(entry.data_str("host"), Some("10.0.0.5"));
    assert_eq!(entry.data_str("token"), Some(TOKEN));
    assert_eq!(entry.data_str("model"), Some(MODEL));
    assert_eq!(entry.data_str("name"), Some(MODEL));
    assert_eq!(entry.data_str("unique_id"), Some(UNIQUE_ID));
    assert_eq!(entry.data_str("mac"), Some(UNIQUE_ID));
    assert_eq!(entry.state, ConfigEntryState::Loaded);
}

#[tokio::test]
async fn test_user_name_becomes_title() {
    let hass = TestHass::new(FakeConnector::new().device("10.0.0.5", MODEL, MAC));

    let form = hass.flows.start_flow(DOMAIN).await.unwrap();
    let result = hass
        .flows
        .progress_flow(
            &form.flow_id,
            Some(json!({"host": "10.0.0.5", "token": TOKEN, "name": "Kitchen"})),
        )
        .await
        .unwrap();

    assert_eq!(result.title.as_deref(), Some("Kitchen"));
    let entry = hass.entries.get_by_unique_id(DOMAIN, UNIQUE_ID).unwrap();
    assert_eq!(entry.data_str("name"), Some("Kitchen"));
    assert_eq!(entry.data_str("model"), Some(MODEL));
}

#[tokio::test]
async fn test_unreachable_device_shows_cannot_connect() {
    let connector = FakeConnector::new();
    let hass = TestHass::new(connector.clone());

    let form = hass.flows.start_flow(DOMAIN).await.unwrap();
    let result = hass
        .flows
        .progress_flow(
            &form.flow_id,
            Some(json!({"host": "10.0.0.9", "token": TOKEN})),
        )
        .await
        .unwrap();

    assert_eq!(result.result_type, FlowResultType::Form);
    assert_eq!(result.errors.unwrap()["base"], "cannot_connect");
    assert!(hass.entries.is_empty());
    assert_eq!(hass.logger.at(Level::Error).len(), 1);

    // Flow stays open for a corrected submission
    connector.device("10.0.0.9", MODEL, MAC);
    let result = hass
        .flows
        .progress_flow(
            &form.flow_id,
            Some(json!({"host": "10.0.0.9", "token": TOKEN})),
        )
        .await
        .unwrap();
    assert_eq!(result.result_type, FlowResultType::CreateEntry);
}

#[tokio::test]
async fn test_checksum_failure_shows_invalid_auth() {
    let connector = FakeConnector::new().set(
        "10.0.0.5",
        Behavior::Respond(ConnectOutcome::AuthRejected),
    );
    let hass = TestHass::new(connector);

    let form = hass.flows.start_flow(DOMAIN).await.unwrap();
    let result = hass
        .flows
        .progress_flow(
            &form.flow_id,
            Some(json!({"host": "10.0.0.5", "token": TOKEN})),
        )
        .await
        .unwrap();

    assert_eq!(result.result_type, FlowResultType::Form);
    assert_eq!(result.errors.unwrap()["base"], "invalid_auth");
    assert!(hass.entries.is_empty());
}

#[tokio::test]
async fn test_unexpected_failure_is_logged_and_shows_unknown() {
    let connector = FakeConnector::new().set("10.0.0.5", Behavior::Panic);
    let hass = TestHass::new(connector);

    let form = hass.flows.start_flow(DOMAIN).await.unwrap();
    let result = hass
        .flows
        .progress_flow(
            &form.flow_id,
            Some(json!({"host": "10.0.0.5", "token": TOKEN})),
        )
        .await
        .unwrap();

    assert_eq!(result.result_type, FlowResultType::Form);
    assert_eq!(result.errors.unwrap()["base"], "unknown");

    let exceptions = hass.logger.at(Level::Exception);
    assert_eq!(exceptions.len(), 1);
    assert!(exceptions[0].starts_with("Unexpected exception"));
}

#[tokio::test]
async fn test_bad_token_length_rejected_before_connecting() {
    let hass = TestHass::new(FakeConnector::new().device("10.0.0.5", MODEL, MAC));

    let form = hass.flows.start_flow(DOMAIN).await.unwrap();
    for token in ["0123456789abcdef0123456789abcde", "0123456789abcdef0123456789abcdef0"] {
        let result = hass
            .flows
            .progress_flow(
                &form.flow_id,
                Some(json!({"host": "10.0.0.5", "token": token})),
            )
            .await
            .unwrap();

        assert_eq!(result.result_type, FlowResultType::Form);
        assert_eq!(result.errors.unwrap()["token"], ERROR_INVALID_LENGTH);
    }
    assert_eq!(hass.connector.connects(), 0);
    assert_eq!(hass.connector.queries(), 0);
}

#[tokio::test]
async fn test_second_submission_updates_and_aborts() {
    let connector = FakeConnector::new()
        .device("10.0.0.5", MODEL, MAC)
        .device("10.0.0.7", "viomi.vacuum.v9", "aa-bb-cc-dd-ee-ff");
    let hass = TestHass::new(connector);

    let form = hass.flows.start_flow(DOMAIN).await.unwrap();
    hass.flows
        .progress_flow(
            &form.flow_id,
            Some(json!({"host": "10.0.0.5", "token": TOKEN})),
        )
        .await
        .unwrap();
    let created = hass.entries.get_by_unique_id(DOMAIN, UNIQUE_ID).unwrap();

    // Count setups from here on to observe the reload
    let setups = Arc::new(AtomicUsize::new(0));
    let counter = setups.clone();
    hass.entries.register_setup_handler(
        DOMAIN,
        setup_handler(move |entry| {
            counter.fetch_add(1, Ordering::SeqCst);
            ha_components::xiaomi_viomi::async_setup_entry(entry)
        }),
    );

    let new_token = "fedcba9876543210fedcba9876543210";
    let form = hass.flows.start_flow(DOMAIN).await.unwrap();
    let result = hass
        .flows
        .progress_flow(
            &form.flow_id,
            Some(json!({"host": "10.0.0.7", "token": new_token, "name": "Upstairs"})),
        )
        .await
        .unwrap();

    assert_eq!(result.result_type, FlowResultType::Abort);
    assert_eq!(result.reason.as_deref(), Some("already_configured"));
    assert_eq!(hass.entries.len(), 1);

    let entry = hass.entries.get(&created.entry_id).unwrap();
    assert_eq!(entry.data_str("host"), Some("10.0.0.7"));
    assert_eq!(entry.data_str("token"), Some(new_token));
    assert_eq!(entry.data_str("name"), Some("Upstairs"));
    assert_eq!(entry.data_str("model"), Some("viomi.vacuum.v9"));
    // Title is left alone by the merge
    assert_eq!(entry.title, MODEL);
    assert!(entry.is_loaded());
    assert_eq!(setups.load(Ordering::SeqCst), 1);
    assert!(hass.flows.list_flows().await.is_empty());
}

#[tokio::test]
async fn test_resubmission_with_empty_name_keeps_title() {
    let hass = TestHass::new(FakeConnector::new().device("10.0.0.5", MODEL, MAC));

    let form = hass.flows.start_flow(DOMAIN).await.unwrap();
    hass.flows
        .progress_flow(
            &form.flow_id,
            Some(json!({"host": "10.0.0.5", "token": TOKEN, "name": "Kitchen"})),
        )
        .await
        .unwrap();

    let form = hass.flows.start_flow(DOMAIN).await.unwrap();
    let result = hass
        .flows
        .progress_flow(
            &form.flow_id,
            Some(json!({"host": "10.0.0.5", "token": TOKEN, "name": ""})),
        )
        .await
        .unwrap();
    assert_eq!(result.reason.as_deref(), Some("already_configured"));

    let entry = hass.entries.get_by_unique_id(DOMAIN, UNIQUE_ID).unwrap();
    assert_eq!(entry.title, "Kitchen");
    assert_eq!(entry.data_str("name"), Some("Kitchen"));
    assert_eq!(entry.data_str("model"), Some(MODEL));
}

#[tokio::test]
async fn test_dropped_submission_can_be_resubmitted() {
    let connector = FakeConnector::new().set(
        "10.0.0.5",
        Behavior::Delay(
            Duration::from_millis(300),
            ConnectOutcome::Connected(DeviceInfo::new(MODEL, MAC)),
        ),
    );
    let hass = TestHass::new(connector);
    let input = json!({"host": "10.0.0.5", "token": TOKEN});

    let form = hass.flows.start_flow(DOMAIN).await.unwrap();
    let first = tokio::time::timeout(
        Duration::from_millis(50),
        hass.flows.progress_flow(&form.flow_id, Some(input.clone())),
    )
    .await;
    assert!(first.is_err());
    assert!(hass.entries.is_empty());
    assert_eq!(hass.flows.list_flows().await.len(), 1);

    let result = hass
        .flows
        .progress_flow(&form.flow_id, Some(input))
        .await
        .unwrap();
    assert_eq!(result.result_type, FlowResultType::CreateEntry);
    assert_eq!(result.title.as_deref(), Some(MODEL));
}

#[tokio::test]
async fn test_identical_resubmission_is_idempotent() {
    let hass = TestHass::new(FakeConnector::new().device("10.0.0.5", MODEL, MAC));
    let input = json!({"host": "10.0.0.5", "token": TOKEN});

    let form = hass.flows.start_flow(DOMAIN).await.unwrap();
    let first = hass
        .flows
        .progress_flow(&form.flow_id, Some(input.clone()))
        .await
        .unwrap();
    assert_eq!(first.result_type, FlowResultType::CreateEntry);

    let form = hass.flows.start_flow(DOMAIN).await.unwrap();
    let second = hass
        .flows
        .progress_flow(&form.flow_id, Some(input))
        .await
        .unwrap();
    assert_eq!(second.result_type, FlowResultType::Abort);
    assert_eq!(second.reason.as_deref(), Some("already_configured"));

    let entry = hass.entries.get_by_unique_id(DOMAIN, UNIQUE_ID).unwrap();
    assert_eq!(entry.data_str("host"), Some("10.0.0.5"));
    assert_eq!(entry.data_str("token"), Some(TOKEN));
    assert_eq!(entry.data_str("name"), Some(MODEL));
    assert_eq!(entry.data_str("model"), Some(MODEL));
    assert_eq!(hass.entries.len(), 1);
}

#[tokio::test]
async fn test_entries_persist_across_restart() {
    let hass = TestHass::new(FakeConnector::new().device("10.0.0.5", MODEL, MAC));

    let form = hass.flows.start_flow(DOMAIN).await.unwrap();
    hass.flows
        .progress_flow(
            &form.flow_id,
            Some(json!({"host": "10.0.0.5", "token": TOKEN})),
        )
        .await
        .unwrap();

    let restarted = ha_config_entries::ConfigEntries::new(Arc::new(
        ha_config_entries::Storage::new(hass.dir.path()),
    ));
    restarted.load().await.unwrap();

    let entry = restarted.get_by_unique_id(DOMAIN, UNIQUE_ID).unwrap();
    assert_eq!(entry.title, MODEL);
    assert_eq!(entry.version, 1);
}
