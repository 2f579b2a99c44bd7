//! Boundary to the native similarity-search engine.
//!
//! The bridge only talks to the engine through these traits. Every fallible
//! call reports a raw [`StatusCode`]; translation into [`crate::OtamaError`]
//! happens in [`crate::status`].

use std::path::Path;

use crate::feature::{OpaqueHandle, ReleaseFeature};
use crate::id::Identifier;
use crate::results::ResultSet;
use crate::status::StatusCode;
use crate::variant::VariantRef;

/// Engine-side log verbosity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Debug,
    Info,
    Notice,
    Error,
}

/// Library-level entry points of the engine.
pub trait Engine: ReleaseFeature + 'static {
    type Connection: Connection;

    /// Open a connection from a connection string (typically a config file path).
    fn open(&self, config: &str) -> Result<Self::Connection, StatusCode>;

    /// Open a connection from a variant options tree.
    fn open_with_options(&self, options: VariantRef<'_>) -> Result<Self::Connection, StatusCode>;

    /// Human-readable text for a status code.
    fn status_message(&self, code: StatusCode) -> String;

    fn version(&self) -> String;

    fn set_log_level(&self, level: LogLevel);
}

/// One open engine connection.
///
/// Connections are a single mutable resource. Sharing one across threads
/// requires external synchronization.
pub trait Connection {
    fn close(&mut self);

    fn pull(&mut self) -> Result<(), StatusCode>;

    fn create_database(&mut self) -> Result<(), StatusCode>;

    fn drop_database(&mut self) -> Result<(), StatusCode>;

    fn drop_index(&mut self) -> Result<(), StatusCode>;

    fn vacuum_index(&mut self) -> Result<(), StatusCode>;

    fn insert_file(&mut self, path: &Path) -> Result<Identifier, StatusCode>;

    fn remove(&mut self, id: &Identifier) -> Result<(), StatusCode>;

    fn exists(&mut self, id: &Identifier) -> Result<bool, StatusCode>;

    fn search(&mut self, limit: usize, query: VariantRef<'_>) -> Result<ResultSet, StatusCode>;

    fn search_file(&mut self, limit: usize, path: &Path) -> Result<ResultSet, StatusCode>;

    fn similarity(&mut self, a: VariantRef<'_>, b: VariantRef<'_>) -> Result<f32, StatusCode>;

    /// Run a named driver method, writing its result into `output`.
    fn invoke(
        &mut self,
        method: &str,
        output: VariantRef<'_>,
        input: VariantRef<'_>,
    ) -> Result<(), StatusCode>;

    fn feature_raw(&mut self, query: VariantRef<'_>) -> Result<OpaqueHandle, StatusCode>;

    fn feature_string(&mut self, query: VariantRef<'_>) -> Result<String, StatusCode>;
}
