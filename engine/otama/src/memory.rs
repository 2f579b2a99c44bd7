//! In-process reference engine.
//!
//! Records live in memory, keyed by namespace. Identifiers are the first
//! twenty bytes of the SHA-256 of the inserted file, features are normalized
//! byte histograms, and similarity is histogram intersection. Useful for
//! exercising the bridge without the native library.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use sha2::{Digest, Sha256};

use crate::decode::decode;
use crate::encode::encode;
use crate::engine::{Connection, Engine, LogLevel};
use crate::feature::{OpaqueHandle, ReleaseFeature};
use crate::id::{Identifier, ID_LEN};
use crate::results::ResultSet;
use crate::status::StatusCode;
use crate::variant::{VariantKind, VariantRef};

const HISTOGRAM_BINS: usize = 256;
const DEFAULT_NAMESPACE: &str = "default";

type Histogram = Vec<f32>;

struct EngineState {
    log_level: LogLevel,
    namespaces: HashMap<String, Vec<(Identifier, Histogram)>>,
    features: HashMap<usize, Histogram>,
    next_handle: usize,
    fail_next: Option<StatusCode>,
}

struct Shared {
    state: Mutex<EngineState>,
    calls: AtomicUsize,
    released: AtomicUsize,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(|err| err.into_inner())
    }

    // Counts the call and consumes a pending injected failure.
    fn begin(&self) -> Result<MutexGuard<'_, EngineState>, StatusCode> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let mut state = self.lock();
        match state.fail_next.take() {
            Some(code) => Err(code),
            None => Ok(state),
        }
    }
}

/// Reference engine backed by process memory.
#[derive(Clone)]
pub struct MemoryEngine {
    shared: Arc<Shared>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(EngineState {
                    log_level: LogLevel::Info,
                    namespaces: HashMap::new(),
                    features: HashMap::new(),
                    next_handle: 1,
                    fail_next: None,
                }),
                calls: AtomicUsize::new(0),
                released: AtomicUsize::new(0),
            }),
        }
    }

    /// Make the next engine call fail with `code`.
    pub fn fail_next(&self, code: StatusCode) {
        self.shared.lock().fail_next = Some(code);
    }

    /// Number of engine calls made so far, including opens.
    pub fn calls(&self) -> usize {
        self.shared.calls.load(Ordering::Relaxed)
    }

    /// Feature handles currently held by the engine.
    pub fn live_features(&self) -> usize {
        self.shared.lock().features.len()
    }

    /// Feature handles released so far.
    pub fn released_features(&self) -> usize {
        self.shared.released.load(Ordering::Relaxed)
    }

    pub fn log_level(&self) -> LogLevel {
        self.shared.lock().log_level
    }

    fn connect(&self, namespace: String) -> MemoryConnection {
        self.shared
            .lock()
            .namespaces
            .entry(namespace.clone())
            .or_default();
        MemoryConnection {
            shared: Arc::clone(&self.shared),
            namespace,
        }
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ReleaseFeature for MemoryEngine {
    fn release_feature(&self, handle: OpaqueHandle) {
        if self.shared.lock().features.remove(&handle.get()).is_some() {
            self.shared.released.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl Engine for MemoryEngine {
    type Connection = MemoryConnection;

    fn open(&self, config: &str) -> Result<MemoryConnection, StatusCode> {
        drop(self.shared.begin()?);
        if config.is_empty() {
            return Err(StatusCode::INVALID_ARGUMENTS);
        }
        Ok(self.connect(config.to_string()))
    }

    fn open_with_options(&self, options: VariantRef<'_>) -> Result<MemoryConnection, StatusCode> {
        drop(self.shared.begin()?);
        if options.kind() != VariantKind::Hash {
            return Err(StatusCode::INVALID_ARGUMENTS);
        }
        let namespace = match options.hash_get("namespace") {
            Some(var) => text_of(var).ok_or(StatusCode::INVALID_ARGUMENTS)?,
            None => DEFAULT_NAMESPACE.to_string(),
        };
        Ok(self.connect(namespace))
    }

    fn status_message(&self, code: StatusCode) -> String {
        match code {
            StatusCode::OK => "OK",
            StatusCode::NODATA => "No Data",
            StatusCode::INVALID_ARGUMENTS => "Invalid Arguments",
            StatusCode::ASSERTION_FAILURE => "Assertion Failure",
            StatusCode::SYSERROR => "System Error",
            StatusCode::NOT_IMPLEMENTED => "Not Implemented",
            _ => "Unknown Status",
        }
        .to_string()
    }

    fn version(&self) -> String {
        concat!("otama-memory ", env!("CARGO_PKG_VERSION")).to_string()
    }

    fn set_log_level(&self, level: LogLevel) {
        self.shared.lock().log_level = level;
    }
}

/// Connection to one namespace of a [`MemoryEngine`].
pub struct MemoryConnection {
    shared: Arc<Shared>,
    namespace: String,
}

impl MemoryConnection {
    fn records<'s>(&self, state: &'s mut EngineState) -> &'s mut Vec<(Identifier, Histogram)> {
        state.namespaces.entry(self.namespace.clone()).or_default()
    }

    fn query_feature(
        &self,
        state: &mut EngineState,
        query: VariantRef<'_>,
    ) -> Result<Histogram, StatusCode> {
        if let Some(raw) = query.hash_get("raw") {
            let handle = raw.as_opaque().ok_or(StatusCode::INVALID_ARGUMENTS)?;
            return state
                .features
                .get(&handle.get())
                .cloned()
                .ok_or(StatusCode::INVALID_ARGUMENTS);
        }
        if let Some(file) = query.hash_get("file") {
            let path = text_of(file).ok_or(StatusCode::INVALID_ARGUMENTS)?;
            return file_histogram(Path::new(&path));
        }
        if let Some(data) = query.hash_get("data") {
            let bytes = bytes_of(data).ok_or(StatusCode::INVALID_ARGUMENTS)?;
            return Ok(histogram(&bytes));
        }
        if let Some(id) = query.hash_get("id") {
            let hex = text_of(id).ok_or(StatusCode::INVALID_ARGUMENTS)?;
            let id = Identifier::from_hex(&hex).map_err(|_| StatusCode::INVALID_ARGUMENTS)?;
            return self
                .records(state)
                .iter()
                .find(|(stored, _)| *stored == id)
                .map(|(_, feature)| feature.clone())
                .ok_or(StatusCode::NODATA);
        }
        Err(StatusCode::INVALID_ARGUMENTS)
    }

    fn rank(
        &self,
        state: &mut EngineState,
        limit: usize,
        query: &[f32],
    ) -> Result<ResultSet, StatusCode> {
        let mut scored: Vec<(Identifier, f32)> = self
            .records(state)
            .iter()
            .map(|(id, feature)| (*id, intersection(query, feature)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(limit);

        let mut results = ResultSet::new();
        for (id, similarity) in scored {
            let payload = results.push(id);
            payload.set_hash().map_err(|_| StatusCode::ASSERTION_FAILURE)?;
            payload
                .hash_at("similarity")
                .and_then(|slot| slot.set_float(f64::from(similarity)))
                .map_err(|_| StatusCode::ASSERTION_FAILURE)?;
        }
        Ok(results)
    }
}

impl Connection for MemoryConnection {
    fn close(&mut self) {}

    fn pull(&mut self) -> Result<(), StatusCode> {
        drop(self.shared.begin()?);
        Ok(())
    }

    fn create_database(&mut self) -> Result<(), StatusCode> {
        let shared = Arc::clone(&self.shared);
        let mut state = shared.begin()?;
        self.records(&mut state);
        Ok(())
    }

    fn drop_database(&mut self) -> Result<(), StatusCode> {
        let shared = Arc::clone(&self.shared);
        let mut state = shared.begin()?;
        self.records(&mut state).clear();
        Ok(())
    }

    fn drop_index(&mut self) -> Result<(), StatusCode> {
        drop(self.shared.begin()?);
        Ok(())
    }

    fn vacuum_index(&mut self) -> Result<(), StatusCode> {
        drop(self.shared.begin()?);
        Ok(())
    }

    fn insert_file(&mut self, path: &Path) -> Result<Identifier, StatusCode> {
        let shared = Arc::clone(&self.shared);
        let mut state = shared.begin()?;
        let bytes = fs::read(path).map_err(|_| StatusCode::SYSERROR)?;
        let digest = Sha256::digest(&bytes);
        let mut raw = [0u8; ID_LEN];
        raw.copy_from_slice(&digest[..ID_LEN]);
        let id = Identifier::from_bytes(raw);
        let feature = histogram(&bytes);

        let records = self.records(&mut state);
        match records.iter_mut().find(|(stored, _)| *stored == id) {
            Some(entry) => entry.1 = feature,
            None => records.push((id, feature)),
        }
        Ok(id)
    }

    fn remove(&mut self, id: &Identifier) -> Result<(), StatusCode> {
        let shared = Arc::clone(&self.shared);
        let mut state = shared.begin()?;
        self.records(&mut state).retain(|(stored, _)| stored != id);
        Ok(())
    }

    fn exists(&mut self, id: &Identifier) -> Result<bool, StatusCode> {
        let shared = Arc::clone(&self.shared);
        let mut state = shared.begin()?;
        Ok(self.records(&mut state).iter().any(|(stored, _)| stored == id))
    }

    fn search(&mut self, limit: usize, query: VariantRef<'_>) -> Result<ResultSet, StatusCode> {
        let shared = Arc::clone(&self.shared);
        let mut state = shared.begin()?;
        if query.kind() != VariantKind::Hash {
            return Err(StatusCode::INVALID_ARGUMENTS);
        }
        let feature = self.query_feature(&mut state, query)?;
        self.rank(&mut state, limit, &feature)
    }

    fn search_file(&mut self, limit: usize, path: &Path) -> Result<ResultSet, StatusCode> {
        let shared = Arc::clone(&self.shared);
        let mut state = shared.begin()?;
        let feature = file_histogram(path)?;
        self.rank(&mut state, limit, &feature)
    }

    fn similarity(&mut self, a: VariantRef<'_>, b: VariantRef<'_>) -> Result<f32, StatusCode> {
        let shared = Arc::clone(&self.shared);
        let mut state = shared.begin()?;
        let first = self.query_feature(&mut state, a)?;
        let second = self.query_feature(&mut state, b)?;
        Ok(intersection(&first, &second))
    }

    fn invoke(
        &mut self,
        method: &str,
        output: VariantRef<'_>,
        input: VariantRef<'_>,
    ) -> Result<(), StatusCode> {
        let shared = Arc::clone(&self.shared);
        let mut state = shared.begin()?;
        match method {
            "echo" => encode(&decode(input), output).map_err(|_| StatusCode::ASSERTION_FAILURE),
            "count" => {
                let count = self.records(&mut state).len();
                let count = i64::try_from(count).map_err(|_| StatusCode::ASSERTION_FAILURE)?;
                output
                    .set_int(count)
                    .map_err(|_| StatusCode::ASSERTION_FAILURE)
            }
            _ => Err(StatusCode::NOT_IMPLEMENTED),
        }
    }

    fn feature_raw(&mut self, query: VariantRef<'_>) -> Result<OpaqueHandle, StatusCode> {
        let shared = Arc::clone(&self.shared);
        let mut state = shared.begin()?;
        let feature = self.query_feature(&mut state, query)?;
        let raw = state.next_handle;
        state.next_handle += 1;
        let handle = OpaqueHandle::new(raw).ok_or(StatusCode::ASSERTION_FAILURE)?;
        state.features.insert(raw, feature);
        Ok(handle)
    }

    fn feature_string(&mut self, query: VariantRef<'_>) -> Result<String, StatusCode> {
        let shared = Arc::clone(&self.shared);
        let mut state = shared.begin()?;
        let feature = self.query_feature(&mut state, query)?;
        let quantized: Vec<u8> = feature
            .iter()
            .map(|bin| (bin.clamp(0.0, 1.0) * 255.0).round() as u8)
            .collect();
        Ok(hex::encode(quantized))
    }
}

fn text_of(var: VariantRef<'_>) -> Option<String> {
    match var.kind() {
        VariantKind::String => var.as_string(),
        VariantKind::Binary => var.as_binary().and_then(|b| String::from_utf8(b).ok()),
        _ => None,
    }
}

fn bytes_of(var: VariantRef<'_>) -> Option<Vec<u8>> {
    match var.kind() {
        VariantKind::Binary => var.as_binary(),
        VariantKind::String => var.as_string().map(String::into_bytes),
        _ => None,
    }
}

fn file_histogram(path: &Path) -> Result<Histogram, StatusCode> {
    let bytes = fs::read(path).map_err(|_| StatusCode::SYSERROR)?;
    Ok(histogram(&bytes))
}

fn histogram(bytes: &[u8]) -> Histogram {
    let mut bins = vec![0f32; HISTOGRAM_BINS];
    if bytes.is_empty() {
        return bins;
    }
    for byte in bytes {
        bins[usize::from(*byte)] += 1.0;
    }
    let total = bytes.len() as f32;
    for bin in &mut bins {
        *bin /= total;
    }
    bins
}

fn intersection(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x.min(*y)).sum()
}
