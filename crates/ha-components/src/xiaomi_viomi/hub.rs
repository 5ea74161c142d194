//! Device hub: one connection attempt and the identity it produced

use std::sync::Arc;

use super::device::{token_prefix, ConnectOutcome, DeviceInfo, ViomiConnector, ViomiDevice};
use super::error::FlowError;
use super::logger::FlowLogger;

/// Connects to a Viomi device and keeps what it reported
pub struct ViomiDeviceHub {
    connector: Arc<dyn ViomiConnector>,
    logger: Arc<dyn FlowLogger>,
    device: Option<Arc<dyn ViomiDevice>>,
    device_info: Option<DeviceInfo>,
}

impl ViomiDeviceHub {
    pub fn new(connector: Arc<dyn ViomiConnector>, logger: Arc<dyn FlowLogger>) -> Self {
        Self {
            connector,
            logger,
            device: None,
            device_info: None,
        }
    }

    /// The device client, after a successful attempt
    pub fn device(&self) -> Option<&Arc<dyn ViomiDevice>> {
        self.device.as_ref()
    }

    /// The reported identity, after a successful attempt
    pub fn device_info(&self) -> Option<&DeviceInfo> {
        self.device_info.as_ref()
    }

    /// Try to reach the device and read its identity.
    ///
    /// Returns `Ok(false)` when the device cannot be reached and
    /// `Err(FlowError::InvalidAuth)` when it rejects the token.
    pub async fn attempt_connection(&mut self, host: &str, token: &str) -> Result<bool, FlowError> {
        self.logger.debug(format_args!(
            "Initializing with host {} (token {}...)",
            host,
            token_prefix(token)
        ));

        let device = self.connector.connect(host, token);
        let query = Arc::clone(&device);
        let outcome = tokio::task::spawn_blocking(move || query.info())
            .await
            .map_err(|e| FlowError::Unknown(format!("device query failed: {e}")))?;

        match outcome {
            ConnectOutcome::Connected(info) => {
                self.logger.debug(format_args!("{} detected", info.model));
                self.device = Some(device);
                self.device_info = Some(info);
                Ok(true)
            }
            ConnectOutcome::AuthRejected => Err(FlowError::InvalidAuth),
            ConnectOutcome::Unreachable(reason) => {
                self.logger.error(format_args!(
                    "DeviceException during setup of Viomi device with host {}: {}",
                    host, reason
                ));
                Ok(false)
            }
        }
    }
}
