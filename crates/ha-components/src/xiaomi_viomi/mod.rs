//! Xiaomi Viomi vacuum integration
//!
//! Pairs a Viomi vacuum by host and token: the config flow contacts the
//! device, reads its model and MAC, and stores a config entry keyed by the
//! normalized MAC. Device control is out of scope; talking to the device is
//! delegated to a [`ViomiConnector`].

mod config_flow;
mod consts;
mod device;
mod error;
mod hub;
mod import;
mod logger;
mod schema;
mod setup;
mod validate;

use ha_config_entries::{ConfigEntries, ConfigFlow, FlowManager};
use std::sync::Arc;

pub use config_flow::{
    merge_into_existing, transition, FlowEffect, FlowEvent, FlowState, InvalidFlowTransition,
    ViomiConfigFlow,
};
pub use consts::*;
pub use device::{ConnectOutcome, DeviceInfo, ViomiConnector, ViomiDevice};
pub use error::{FlowError, ImportError, SchemaErrors};
pub use hub::ViomiDeviceHub;
pub use import::{async_import_yaml, async_setup_platform, platform_configs, PLATFORM_DOMAIN};
pub use logger::{FlowLogger, TracingLogger};
pub use schema::{
    device_config_schema, validate_platform_config, validate_user_input, DeviceConfigInput,
    ERROR_INVALID_LENGTH, ERROR_INVALID_TYPE, ERROR_NOT_ALLOWED, ERROR_REQUIRED,
};
pub use setup::{async_setup_entry, register as register_setup};
pub use validate::{validate_input, DeviceRecord};

/// Register the integration: entry setup and the `user` config flow
pub fn async_setup(
    entries: &Arc<ConfigEntries>,
    flows: &FlowManager,
    connector: Arc<dyn ViomiConnector>,
    logger: Arc<dyn FlowLogger>,
) {
    setup::register(entries);

    let entries = Arc::clone(entries);
    flows.register(
        DOMAIN,
        Arc::new(move || {
            Box::new(ViomiConfigFlow::new(
                entries.clone(),
                connector.clone(),
                logger.clone(),
            )) as Box<dyn ConfigFlow>
        }),
    );
}
