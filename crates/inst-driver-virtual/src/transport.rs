//! Virtual communication channel.
//!
//! Stands in for a VISA/serial resource when no hardware is attached. Writes
//! are recorded, queries are answered from a canned response table, and
//! nothing ever blocks or fails.
//!
//! ```rust,ignore
//! let transport = VirtualTransport::new("VIRTUAL")
//!     .with_response("*IDN?", "Virtual DMM");
//! transport.open()?;
//! assert_eq!(transport.query("*IDN?")?, "Virtual DMM");
//! assert_eq!(transport.query("MEAS:VOLT?")?, "VIRTUAL QUERY:MEAS:VOLT?");
//! ```

use inst_core::{AppResult, Transport};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Prefix echoed back for queries with no canned response.
pub const UNKNOWN_QUERY_PREFIX: &str = "VIRTUAL QUERY:";

/// Hardware-free [`Transport`].
pub struct VirtualTransport {
    resource_name: String,
    open: AtomicBool,
    responses: RwLock<HashMap<String, String>>,
    history: Mutex<Vec<String>>,
}

impl VirtualTransport {
    /// Create a closed transport for `resource_name`.
    pub fn new(resource_name: impl Into<String>) -> Self {
        Self {
            resource_name: resource_name.into(),
            open: AtomicBool::new(false),
            responses: RwLock::new(HashMap::new()),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Create a transport for `resource_name` that is already open.
    pub fn new_open(resource_name: impl Into<String>) -> Self {
        let transport = Self::new(resource_name);
        transport.open_now();
        transport
    }

    /// Open the channel. Returns true if it was closed before.
    pub fn open_now(&self) -> bool {
        let opened = !self.open.swap(true, Ordering::SeqCst);
        if opened {
            tracing::info!(
                resource = %self.resource_name,
                "Virtual transport opened, no hardware connected"
            );
        }
        opened
    }

    /// Register a canned reply for `command`.
    pub fn with_response(self, command: impl Into<String>, reply: impl Into<String>) -> Self {
        self.set_response(command, reply);
        self
    }

    /// Register or replace a canned reply on a live transport.
    pub fn set_response(&self, command: impl Into<String>, reply: impl Into<String>) {
        self.responses.write().insert(command.into(), reply.into());
    }

    /// Commands sent so far (writes and queries, in order).
    pub fn history(&self) -> Vec<String> {
        self.history.lock().clone()
    }

    fn record(&self, command: &str) {
        self.history.lock().push(command.to_string());
    }
}

impl Transport for VirtualTransport {
    fn resource_name(&self) -> &str {
        &self.resource_name
    }

    fn open(&self) -> AppResult<()> {
        self.open_now();
        Ok(())
    }

    fn close(&self) -> AppResult<()> {
        if self.open.swap(false, Ordering::SeqCst) {
            tracing::debug!(resource = %self.resource_name, "Virtual transport closed");
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn write(&self, command: &str) -> AppResult<()> {
        tracing::debug!(resource = %self.resource_name, command, "write");
        self.record(command);
        Ok(())
    }

    fn query(&self, command: &str) -> AppResult<String> {
        self.record(command);
        let reply = match self.responses.read().get(command) {
            Some(reply) => reply.clone(),
            None => {
                tracing::debug!(command, "no canned response for query");
                format!("{}{}", UNKNOWN_QUERY_PREFIX, command)
            }
        };
        tracing::debug!(resource = %self.resource_name, command, %reply, "query");
        Ok(reply)
    }

    fn read(&self) -> AppResult<String> {
        Ok(String::new())
    }
}

impl std::fmt::Debug for VirtualTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualTransport")
            .field("resource_name", &self.resource_name)
            .field("open", &self.is_open())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_close_idempotent() {
        let transport = VirtualTransport::new("VIRTUAL");
        assert!(!transport.is_open());

        transport.open().unwrap();
        transport.open().unwrap();
        assert!(transport.is_open());

        transport.close().unwrap();
        transport.close().unwrap();
        assert!(!transport.is_open());
    }

    #[test]
    fn test_canned_and_unknown_queries() {
        let transport = VirtualTransport::new("VIRTUAL").with_response("*IDN?", "ACME,DMM,0,1.0");

        assert_eq!(transport.query("*IDN?").unwrap(), "ACME,DMM,0,1.0");
        assert_eq!(
            transport.query("MEAS:VOLT:DC?").unwrap(),
            "VIRTUAL QUERY:MEAS:VOLT:DC?"
        );
    }

    #[test]
    fn test_history_records_writes_and_queries() {
        let transport = VirtualTransport::new("VIRTUAL");
        transport.write("CONF:VOLT:DC").unwrap();
        transport.query("READ?").unwrap();

        assert_eq!(transport.history(), vec!["CONF:VOLT:DC", "READ?"]);
        assert_eq!(transport.read().unwrap(), "");
    }

    #[test]
    fn test_new_open_starts_open() {
        let transport = VirtualTransport::new_open("VIRTUAL");
        assert!(transport.is_open());
        assert!(!transport.open_now());

        transport.close().unwrap();
        assert!(transport.open_now());
    }

    #[test]
    fn test_resource_name() {
        let transport = VirtualTransport::new("virtual");
        assert_eq!(transport.resource_name(), "virtual");
    }
}
