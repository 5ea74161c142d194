//! Config flow for Xiaomi Viomi vacuums
//!
//! The flow is a pure transition function over [`FlowState`] and
//! [`FlowEvent`], producing one [`FlowEffect`] per step:
//!
//! ```text
//! AwaitingInput --Init--------------------------> AwaitingInput  [ShowForm]
//! AwaitingInput --Submit(bad schema)------------> AwaitingInput  [ShowForm + field errors]
//! AwaitingInput --Submit(ok)--------------------> Validating     [RunValidation]
//! Validating    --ValidationFailed--------------> AwaitingInput  [ShowForm + base error]
//! Validating    --Validated(existing entry)-----> Aborted        [UpdateAndAbort]
//! Validating    --Validated(no entry)-----------> Created        [CreateEntry]
//! ```
//!
//! [`ViomiConfigFlow`] drives it against the entry store.

use async_trait::async_trait;
use ha_config_entries::{
    ConfigEntries, ConfigEntry, ConfigEntrySource, ConfigEntryUpdate, ConfigFlow, EntryData,
    FlowContext, FlowManagerError, FlowManagerResult, FlowResult, STEP_USER,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use super::consts::{
    ABORT_ALREADY_CONFIGURED, CONFIG_FLOW_VERSION, CONF_HOST, CONF_MODEL, CONF_NAME, CONF_TOKEN,
    DOMAIN, ERROR_BASE,
};
use super::device::ViomiConnector;
use super::error::FlowError;
use super::logger::FlowLogger;
use super::schema::{device_config_schema, validate_user_input, DeviceConfigInput};
use super::validate::{validate_input, DeviceRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    /// Showing the form, possibly with errors
    AwaitingInput,
    /// Waiting on the device
    Validating,
    /// Finished with a new entry
    Created,
    /// Finished after updating an existing entry
    Aborted,
}

impl FlowState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FlowState::Created | FlowState::Aborted)
    }
}

#[derive(Debug)]
pub enum FlowEvent {
    /// Step entered without input
    Init,
    /// Raw form input
    Submit(serde_json::Value),
    ValidationFailed(FlowError),
    Validated {
        record: DeviceRecord,
        /// Entry already registered under the record's unique id
        existing: Option<ConfigEntry>,
    },
}

impl FlowEvent {
    fn name(&self) -> &'static str {
        match self {
            FlowEvent::Init => "init",
            FlowEvent::Submit(_) => "submit",
            FlowEvent::ValidationFailed(_) => "validation_failed",
            FlowEvent::Validated { .. } => "validated",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FlowEffect {
    ShowForm {
        errors: Option<HashMap<String, String>>,
    },
    RunValidation(DeviceConfigInput),
    CreateEntry {
        title: String,
        unique_id: String,
        data: EntryData,
    },
    /// Write `data` to the existing entry, reload it, and abort
    UpdateAndAbort {
        entry_id: String,
        unique_id: String,
        data: EntryData,
        reason: &'static str,
    },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("event {event} not accepted in state {state:?}")]
pub struct InvalidFlowTransition {
    pub state: FlowState,
    pub event: &'static str,
}

/// Compute the next state and the effect to perform
pub fn transition(
    state: FlowState,
    event: FlowEvent,
) -> Result<(FlowState, FlowEffect), InvalidFlowTransition> {
    use FlowState::*;

    let next = match (state, event) {
        (AwaitingInput, FlowEvent::Init) => (AwaitingInput, FlowEffect::ShowForm { errors: None }),

        (AwaitingInput, FlowEvent::Submit(raw)) => match validate_user_input(&raw) {
            Ok(input) => (Validating, FlowEffect::RunValidation(input)),
            Err(errors) => (
                AwaitingInput,
                FlowEffect::ShowForm {
                    errors: Some(errors),
                },
            ),
        },

        (Validating, FlowEvent::ValidationFailed(err)) => (
            AwaitingInput,
            FlowEffect::ShowForm {
                errors: Some(HashMap::from([(
                    ERROR_BASE.to_string(),
                    err.error_code().to_string(),
                )])),
            },
        ),

        (Validating, FlowEvent::Validated { record, existing }) => match existing {
            Some(entry) => (
                Aborted,
                FlowEffect::UpdateAndAbort {
                    data: merge_into_existing(&entry, &record),
                    entry_id: entry.entry_id,
                    unique_id: record.unique_id,
                    reason: ABORT_ALREADY_CONFIGURED,
                },
            ),
            None => (
                Created,
                FlowEffect::CreateEntry {
                    data: record.to_entry_data(),
                    title: record.name,
                    unique_id: record.unique_id,
                },
            ),
        },

        (state, event) => {
            return Err(InvalidFlowTransition {
                state,
                event: event.name(),
            })
        }
    };

    Ok(next)
}

/// Entry data after re-submitting an already configured device.
///
/// Without a submitted name the entry's title is kept as the name; the other
/// fields always take the new values.
pub fn merge_into_existing(entry: &ConfigEntry, record: &DeviceRecord) -> EntryData {
    let name = record
        .user_name
        .clone()
        .unwrap_or_else(|| entry.title.clone());

    let mut data = entry.data.clone();
    data.insert(CONF_HOST.to_string(), json!(record.host));
    data.insert(CONF_TOKEN.to_string(), json!(record.token));
    data.insert(CONF_NAME.to_string(), json!(name));
    data.insert(CONF_MODEL.to_string(), json!(record.model));
    data
}

/// Drives [`transition`] against the entry store and the device
pub struct ViomiConfigFlow {
    state: FlowState,
    entries: Arc<ConfigEntries>,
    connector: Arc<dyn ViomiConnector>,
    logger: Arc<dyn FlowLogger>,
}

impl ViomiConfigFlow {
    pub fn new(
        entries: Arc<ConfigEntries>,
        connector: Arc<dyn ViomiConnector>,
        logger: Arc<dyn FlowLogger>,
    ) -> Self {
        Self {
            state: FlowState::AwaitingInput,
            entries,
            connector,
            logger,
        }
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    fn apply(
        state: FlowState,
        event: FlowEvent,
    ) -> FlowManagerResult<(FlowState, FlowEffect)> {
        let (next, effect) =
            transition(state, event).map_err(|e| FlowManagerError::Step(e.to_string()))?;
        debug!("Viomi flow {:?} -> {:?}", state, next);
        Ok((next, effect))
    }

    /// Handle the `user` step.
    ///
    /// Intermediate states stay local until the step settles, so a step that
    /// is dropped mid-validation leaves the flow accepting input again.
    pub async fn async_step_user(
        &mut self,
        user_input: Option<serde_json::Value>,
    ) -> FlowManagerResult<FlowResult> {
        let event = match user_input {
            None => FlowEvent::Init,
            Some(input) => FlowEvent::Submit(input),
        };
        let (mut state, mut effect) = Self::apply(self.state, event)?;

        loop {
            (state, effect) = match effect {
                FlowEffect::ShowForm { errors } => {
                    self.state = state;
                    return Ok(FlowResult::form(
                        STEP_USER,
                        device_config_schema(),
                        errors,
                    ));
                }
                FlowEffect::RunValidation(input) => {
                    let event = self.run_validation(&input).await;
                    Self::apply(state, event)?
                }
                FlowEffect::CreateEntry {
                    title,
                    unique_id,
                    data,
                } => {
                    self.state = state;
                    return Ok(FlowResult::create_entry(title, data).with_context(FlowContext {
                        source: ConfigEntrySource::User,
                        unique_id: Some(unique_id),
                    }));
                }
                FlowEffect::UpdateAndAbort {
                    entry_id,
                    unique_id,
                    data,
                    reason,
                } => {
                    self.entries
                        .update(&entry_id, ConfigEntryUpdate::new().data(data))
                        .await?;
                    self.state = state;
                    if let Err(err) = self.entries.reload(&entry_id).await {
                        warn!("Reload of entry {} failed: {}", entry_id, err);
                    }
                    return Ok(FlowResult::abort(reason).with_context(FlowContext {
                        source: ConfigEntrySource::User,
                        unique_id: Some(unique_id),
                    }));
                }
            };
        }
    }

    async fn run_validation(&self, input: &DeviceConfigInput) -> FlowEvent {
        match validate_input(self.connector.clone(), input, self.logger.clone()).await {
            Ok(record) => {
                let existing = self.entries.get_by_unique_id(DOMAIN, &record.unique_id);
                FlowEvent::Validated { record, existing }
            }
            Err(err) => {
                if matches!(err, FlowError::Unknown(_)) {
                    self.logger
                        .exception(format_args!("Unexpected exception"), &err);
                }
                FlowEvent::ValidationFailed(err)
            }
        }
    }
}

#[async_trait]
impl ConfigFlow for ViomiConfigFlow {
    fn version(&self) -> u32 {
        CONFIG_FLOW_VERSION
    }

    async fn step(
        &mut self,
        step_id: &str,
        user_input: Option<serde_json::Value>,
    ) -> FlowManagerResult<FlowResult> {
        match step_id {
            STEP_USER => self.async_step_user(user_input).await,
            other => Err(FlowManagerError::Step(format!("unknown step {other}"))),
        }
    }
}
