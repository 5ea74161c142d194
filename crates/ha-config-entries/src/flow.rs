//! Config Flows
//!
//! A config flow is a short-lived, multi-step interactive session that ends
//! by creating a config entry or aborting. Integrations implement
//! [`ConfigFlow`]; the [`FlowManager`] owns the active flows, routes user
//! input to them and finishes `create_entry` results against the entry store.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use ulid::Ulid;

use crate::entry::{ConfigEntry, ConfigEntrySource, EntryData};
use crate::manager::{ConfigEntries, ConfigEntriesError};

/// Step id every UI-initiated flow starts at
pub const STEP_USER: &str = "user";

/// Errors raised while driving a flow
#[derive(Debug, Error)]
pub enum FlowManagerError {
    #[error("No config flow registered for {0}")]
    UnknownHandler(String),

    #[error("Flow {0} not found")]
    UnknownFlow(String),

    #[error("Flow step failed: {0}")]
    Step(String),

    #[error(transparent)]
    Entries(#[from] ConfigEntriesError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type FlowManagerResult<T> = Result<T, FlowManagerError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowResultType {
    Form,
    CreateEntry,
    Abort,
}

/// Form field schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    /// Exact length constraint for string fields
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
}

/// Flow context shared between the flow and the manager
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowContext {
    pub source: ConfigEntrySource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<String>,
}

/// Result of a config flow step
#[derive(Debug, Clone, Serialize)]
pub struct FlowResult {
    pub flow_id: String,
    /// Integration domain
    pub handler: String,
    #[serde(rename = "type")]
    pub result_type: FlowResultType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
    /// Always present, empty if no schema
    pub data_schema: Vec<FormField>,
    /// Errors from the previous submission (null if none)
    pub errors: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    /// Entry data (for create_entry)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<EntryData>,
    /// The created config entry (for create_entry, filled by the manager)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    pub context: FlowContext,
}

impl FlowResult {
    fn empty(result_type: FlowResultType) -> Self {
        Self {
            flow_id: String::new(),
            handler: String::new(),
            result_type,
            step_id: None,
            data_schema: Vec::new(),
            errors: None,
            title: None,
            reason: None,
            version: None,
            data: None,
            result: None,
            context: FlowContext::default(),
        }
    }

    /// Show a form, optionally annotated with errors
    pub fn form(
        step_id: impl Into<String>,
        data_schema: Vec<FormField>,
        errors: Option<HashMap<String, String>>,
    ) -> Self {
        Self {
            step_id: Some(step_id.into()),
            data_schema,
            errors,
            ..Self::empty(FlowResultType::Form)
        }
    }

    /// Finish the flow by creating an entry
    pub fn create_entry(title: impl Into<String>, data: EntryData) -> Self {
        Self {
            title: Some(title.into()),
            data: Some(data),
            ..Self::empty(FlowResultType::CreateEntry)
        }
    }

    /// Finish the flow without creating an entry
    pub fn abort(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
            ..Self::empty(FlowResultType::Abort)
        }
    }

    pub fn with_context(mut self, context: FlowContext) -> Self {
        self.context = context;
        self
    }

    pub fn is_finished(&self) -> bool {
        self.result_type != FlowResultType::Form
    }
}

/// A config flow implemented by an integration
#[async_trait]
pub trait ConfigFlow: Send {
    /// Entry schema version written on create
    fn version(&self) -> u32 {
        1
    }

    /// Run a step with optional user input
    async fn step(
        &mut self,
        step_id: &str,
        user_input: Option<serde_json::Value>,
    ) -> FlowManagerResult<FlowResult>;
}

/// Builds a fresh flow instance for a domain
pub type FlowFactory = Arc<dyn Fn() -> Box<dyn ConfigFlow> + Send + Sync>;

struct ActiveFlow {
    handler: String,
    source: ConfigEntrySource,
    flow: Box<dyn ConfigFlow>,
    current_step: String,
}

/// Manages active configuration flows
pub struct FlowManager {
    entries: Arc<ConfigEntries>,
    handlers: DashMap<String, FlowFactory>,
    flows: RwLock<HashMap<String, Arc<Mutex<ActiveFlow>>>>,
}

impl FlowManager {
    pub fn new(entries: Arc<ConfigEntries>) -> Self {
        Self {
            entries,
            handlers: DashMap::new(),
            flows: RwLock::new(HashMap::new()),
        }
    }

    pub fn entries(&self) -> &Arc<ConfigEntries> {
        &self.entries
    }

    /// Register the config flow for a domain
    pub fn register(&self, domain: &str, factory: FlowFactory) {
        self.handlers.insert(domain.to_string(), factory);
        debug!("Registered config flow for domain: {}", domain);
    }

    /// Start a new user-initiated flow for an integration and run its `user` step
    pub async fn start_flow(&self, handler: &str) -> FlowManagerResult<FlowResult> {
        self.init_flow(handler, ConfigEntrySource::User).await
    }

    /// Start a new flow with an explicit source.
    ///
    /// The source is reported by [`list_flows`](Self::list_flows) and stamped
    /// on every result context, so entries created by the flow carry it.
    pub async fn init_flow(
        &self,
        handler: &str,
        source: ConfigEntrySource,
    ) -> FlowManagerResult<FlowResult> {
        let factory = self
            .handlers
            .get(handler)
            .map(|f| f.value().clone())
            .ok_or_else(|| FlowManagerError::UnknownHandler(handler.to_string()))?;

        let flow_id = Ulid::new().to_string().to_lowercase();
        info!(
            "Starting config flow for {} ({}) with flow_id {}",
            handler,
            source.as_str(),
            flow_id
        );

        let active = Arc::new(Mutex::new(ActiveFlow {
            handler: handler.to_string(),
            source,
            flow: factory(),
            current_step: STEP_USER.to_string(),
        }));
        self.flows
            .write()
            .await
            .insert(flow_id.clone(), active.clone());

        let mut flow = active.lock().await;
        self.run_step(&flow_id, &mut flow, None).await
    }

    /// Continue a flow with user input
    pub async fn progress_flow(
        &self,
        flow_id: &str,
        user_input: Option<serde_json::Value>,
    ) -> FlowManagerResult<FlowResult> {
        let active = self
            .flows
            .read()
            .await
            .get(flow_id)
            .cloned()
            .ok_or_else(|| FlowManagerError::UnknownFlow(flow_id.to_string()))?;

        let mut flow = active.lock().await;
        info!(
            "Progressing flow {} for {} at step {}",
            flow_id, flow.handler, flow.current_step
        );
        self.run_step(flow_id, &mut flow, user_input).await
    }

    /// Drop an in-progress flow
    pub async fn abort_flow(&self, flow_id: &str) -> FlowManagerResult<()> {
        self.flows
            .write()
            .await
            .remove(flow_id)
            .map(|_| debug!("Aborted flow {}", flow_id))
            .ok_or_else(|| FlowManagerError::UnknownFlow(flow_id.to_string()))
    }

    /// List in-progress flows
    pub async fn list_flows(&self) -> Vec<serde_json::Value> {
        let flows = self.flows.read().await;
        let mut listed = Vec::with_capacity(flows.len());
        for (flow_id, active) in flows.iter() {
            // Flows mid-step are skipped rather than awaited
            let Ok(flow) = active.try_lock() else {
                continue;
            };
            listed.push(serde_json::json!({
                "flow_id": flow_id,
                "handler": flow.handler,
                "step_id": flow.current_step,
                "context": { "source": flow.source.as_str() },
            }));
        }
        listed
    }

    async fn run_step(
        &self,
        flow_id: &str,
        active: &mut ActiveFlow,
        user_input: Option<serde_json::Value>,
    ) -> FlowManagerResult<FlowResult> {
        let step_id = active.current_step.clone();
        let outcome = active.flow.step(&step_id, user_input).await;

        let mut result = match outcome {
            Ok(result) => result,
            Err(err) => {
                // A failing step ends the flow
                self.flows.write().await.remove(flow_id);
                return Err(err);
            }
        };
        result.flow_id = flow_id.to_string();
        result.handler = active.handler.clone();
        result.context.source = active.source;

        match result.result_type {
            FlowResultType::Form => {
                if let Some(step_id) = &result.step_id {
                    active.current_step = step_id.clone();
                }
                return Ok(result);
            }
            FlowResultType::CreateEntry => {
                result.version = Some(active.flow.version());
                let entry = self.finish_create(&active.handler, &result).await;
                self.flows.write().await.remove(flow_id);
                result.result = Some(serde_json::to_value(entry?)?);
            }
            FlowResultType::Abort => {
                self.flows.write().await.remove(flow_id);
            }
        }

        info!(
            "Flow {} completed with result type: {:?}",
            flow_id, result.result_type
        );
        Ok(result)
    }

    /// Store the entry described by a `create_entry` result and set it up
    async fn finish_create(
        &self,
        handler: &str,
        result: &FlowResult,
    ) -> FlowManagerResult<ConfigEntry> {
        let mut entry = ConfigEntry::new(handler, result.title.clone().unwrap_or_default())
            .with_data(result.data.clone().unwrap_or_default())
            .with_source(result.context.source)
            .with_version(result.version.unwrap_or(1), 1);
        if let Some(unique_id) = &result.context.unique_id {
            entry = entry.with_unique_id(unique_id.clone());
        }

        let entry = self.entries.add(entry).await?;

        // A failed setup leaves the entry in SetupError; the flow still succeeded
        if let Err(err) = self.entries.setup(&entry.entry_id).await {
            warn!("Setup of new entry {} failed: {}", entry.entry_id, err);
        }

        Ok(self.entries.get(&entry.entry_id).unwrap_or(entry))
    }
}
