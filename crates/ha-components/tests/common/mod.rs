//! Shared fixtures for the Xiaomi Viomi tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ha_components::xiaomi_viomi::{
    async_setup, ConnectOutcome, DeviceInfo, FlowLogger, ViomiConnector, ViomiDevice,
};
use ha_config_entries::{ConfigEntries, FlowManager, Storage};
use tempfile::TempDir;

pub const TOKEN: &str = "0123456789abcdef0123456789abcdef";
pub const MODEL: &str = "viomi.vacuum.v8";
pub const MAC: &str = "AA:BB:CC:DD:EE:FF";
pub const UNIQUE_ID: &str = "aa:bb:cc:dd:ee:ff";

/// What a fake device does when queried
#[derive(Debug, Clone)]
pub enum Behavior {
    Respond(ConnectOutcome),
    /// Answer after blocking for a while
    Delay(Duration, ConnectOutcome),
    Panic,
}

#[derive(Debug)]
pub struct FakeDevice {
    host: String,
    behavior: Behavior,
    queries: Arc<AtomicUsize>,
}

impl ViomiDevice for FakeDevice {
    fn host(&self) -> &str {
        &self.host
    }

    fn info(&self) -> ConnectOutcome {
        self.queries.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Respond(outcome) => outcome.clone(),
            Behavior::Delay(delay, outcome) => {
                std::thread::sleep(*delay);
                outcome.clone()
            }
            Behavior::Panic => panic!("device SDK blew up"),
        }
    }
}

/// Connector whose devices answer from a script keyed by host
#[derive(Default)]
pub struct FakeConnector {
    by_host: Mutex<HashMap<String, Behavior>>,
    connects: AtomicUsize,
    queries: Arc<AtomicUsize>,
}

impl FakeConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Device at `host` reports `model`/`mac`
    pub fn device(self: &Arc<Self>, host: &str, model: &str, mac: &str) -> Arc<Self> {
        self.set(
            host,
            Behavior::Respond(ConnectOutcome::Connected(DeviceInfo::new(model, mac))),
        )
    }

    pub fn set(self: &Arc<Self>, host: &str, behavior: Behavior) -> Arc<Self> {
        self.by_host
            .lock()
            .unwrap()
            .insert(host.to_string(), behavior);
        Arc::clone(self)
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

impl ViomiConnector for FakeConnector {
    fn connect(&self, host: &str, _token: &str) -> Arc<dyn ViomiDevice> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let behavior = self
            .by_host
            .lock()
            .unwrap()
            .get(host)
            .cloned()
            .unwrap_or_else(|| Behavior::Respond(ConnectOutcome::Unreachable("timeout".into())));
        Arc::new(FakeDevice {
            host: host.to_string(),
            behavior,
            queries: self.queries.clone(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Error,
    Exception,
}

/// Logger that keeps every line
#[derive(Default)]
pub struct RecordingLogger {
    lines: Mutex<Vec<(Level, String)>>,
}

impl RecordingLogger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn lines(&self) -> Vec<(Level, String)> {
        self.lines.lock().unwrap().clone()
    }

    pub fn at(&self, level: Level) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, line)| line)
            .collect()
    }

    fn push(&self, level: Level, line: String) {
        self.lines.lock().unwrap().push((level, line));
    }
}

impl FlowLogger for RecordingLogger {
    fn debug(&self, message: fmt::Arguments<'_>) {
        self.push(Level::Debug, message.to_string());
    }

    fn error(&self, message: fmt::Arguments<'_>) {
        self.push(Level::Error, message.to_string());
    }

    fn exception(&self, message: fmt::Arguments<'_>, error: &(dyn Error + 'static)) {
        self.push(Level::Exception, format!("{}: {}", message, error));
    }
}

/// Entry store, flow manager and the registered integration
pub struct TestHass {
    pub dir: TempDir,
    pub entries: Arc<ConfigEntries>,
    pub flows: FlowManager,
    pub connector: Arc<FakeConnector>,
    pub logger: Arc<RecordingLogger>,
}

impl TestHass {
    pub fn new(connector: Arc<FakeConnector>) -> Self {
        let dir = TempDir::new().unwrap();
        let entries = Arc::new(ConfigEntries::new(Arc::new(Storage::new(dir.path()))));
        let flows = FlowManager::new(entries.clone());
        let logger = RecordingLogger::new();

        async_setup(&entries, &flows, connector.clone(), logger.clone());

        Self {
            dir,
            entries,
            flows,
            connector,
            logger,
        }
    }
}
