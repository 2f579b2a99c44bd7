//! Caller-facing database handle.
//!
//! Each operation opens at most one [`VariantPool`], encodes its arguments,
//! calls the engine, decodes the outcome into host values, and drops the
//! pool before returning on every path.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::OpenConfig;
use crate::decode::decode;
use crate::encode::encode;
use crate::engine::{Connection, Engine, LogLevel};
use crate::error::{OtamaError, OtamaResult};
use crate::feature::{FeatureRaw, ReleaseFeature};
use crate::id::Identifier;
use crate::results::{materialize, Record};
use crate::status::{self, StatusCode};
use crate::value::HostValue;
use crate::variant::VariantPool;

/// One-time engine setup performed when the bridge is loaded.
///
/// Quiets the engine log to errors only and returns its version string.
pub fn initialize<E: Engine>(engine: &E) -> String {
    engine.set_log_level(LogLevel::Error);
    let version = engine.version();
    debug!(version = %version, "engine initialized");
    version
}

/// Handle on one engine database.
///
/// A handle created with [`Database::new`] is not open; every engine-backed
/// operation on it fails with [`OtamaError::NotOpen`] until a successful
/// [`Database::reopen`].
pub struct Database<E: Engine> {
    engine: Arc<E>,
    conn: Option<E::Connection>,
}

impl<E: Engine> Database<E> {
    pub fn new(engine: Arc<E>) -> Self {
        Self { engine, conn: None }
    }

    /// Open from a host value: text is a connection string, a mapping is options.
    pub fn open(engine: Arc<E>, config: &HostValue) -> OtamaResult<Self> {
        let mut db = Self::new(engine);
        db.reopen(config)?;
        Ok(db)
    }

    pub fn open_config(engine: Arc<E>, config: &OpenConfig) -> OtamaResult<Self> {
        let mut db = Self::new(engine);
        db.connect(config)?;
        Ok(db)
    }

    /// Open (or re-open) this handle, closing any previous connection first.
    pub fn reopen(&mut self, config: &HostValue) -> OtamaResult<()> {
        let config = OpenConfig::from_host(config)?;
        self.connect(&config)
    }

    pub fn connect(&mut self, config: &OpenConfig) -> OtamaResult<()> {
        let conn = match config {
            OpenConfig::ConnectionString(conn_str) => {
                debug!(config = %conn_str, "opening engine connection");
                self.checked(self.engine.open(conn_str))?
            }
            OpenConfig::Options(options) => {
                let pool = VariantPool::open();
                let var = pool.new_variant();
                encode(options, var)?;
                debug!("opening engine connection with options");
                self.checked(self.engine.open_with_options(var))?
            }
        };
        self.close();
        self.conn = Some(conn);
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    /// Version string of the underlying engine library.
    pub fn version(&self) -> String {
        self.engine.version()
    }

    /// Close the connection. Closing an unopened handle does nothing.
    pub fn close(&mut self) {
        if let Some(mut conn) = self.conn.take() {
            debug!("closing engine connection");
            conn.close();
        }
    }

    pub fn pull(&mut self) -> OtamaResult<()> {
        self.call(|conn| conn.pull())
    }

    pub fn create_database(&mut self) -> OtamaResult<()> {
        self.call(|conn| conn.create_database())
    }

    pub fn drop_database(&mut self) -> OtamaResult<()> {
        self.call(|conn| conn.drop_database())
    }

    #[deprecated(note = "renamed to create_database")]
    pub fn create_table(&mut self) -> OtamaResult<()> {
        warn!("create_table is deprecated, rename to create_database");
        self.create_database()
    }

    #[deprecated(note = "renamed to drop_database")]
    pub fn drop_table(&mut self) -> OtamaResult<()> {
        warn!("drop_table is deprecated, rename to drop_database");
        self.drop_database()
    }

    pub fn drop_index(&mut self) -> OtamaResult<()> {
        self.call(|conn| conn.drop_index())
    }

    pub fn vacuum_index(&mut self) -> OtamaResult<()> {
        self.call(|conn| conn.vacuum_index())
    }

    /// Insert the file at `path` and return the new record's hex identifier.
    pub fn insert(&mut self, file: &HostValue) -> OtamaResult<String> {
        self.ensure_open()?;
        let path = match file_path(file)? {
            Some(path) => path,
            None => {
                return Err(OtamaError::argument(format!(
                    "not support type: {}",
                    file.kind()
                )))
            }
        };
        let id = self.call(|conn| conn.insert_file(&path))?;
        debug!(id = %id, path = %path.display(), "inserted file");
        Ok(id.to_hex())
    }

    pub fn remove(&mut self, hex_id: &str) -> OtamaResult<()> {
        self.ensure_open()?;
        let id = Identifier::from_hex(hex_id)?;
        self.call(|conn| conn.remove(&id))
    }

    pub fn exists(&mut self, hex_id: &str) -> OtamaResult<bool> {
        self.ensure_open()?;
        let id = Identifier::from_hex(hex_id)?;
        self.call(|conn| conn.exists(&id))
    }

    /// Search by file path (text) or by an encoded query value.
    ///
    /// Records come back in engine order. Either all records are returned
    /// or an error, never a partial list.
    pub fn search(&mut self, limit: usize, query: &HostValue) -> OtamaResult<Vec<Record>> {
        self.ensure_open()?;
        let results = match file_path(query)? {
            Some(path) => {
                debug!(limit, path = %path.display(), "searching by file");
                self.call(|conn| conn.search_file(limit, &path))?
            }
            None => {
                let pool = VariantPool::open();
                let var = pool.new_variant();
                encode(query, var)?;
                debug!(limit, "searching by query");
                self.call(|conn| conn.search(limit, var))?
            }
        };
        Ok(materialize(&results))
    }

    /// Similarity of two query mappings.
    pub fn similarity(&mut self, a: &HostValue, b: &HostValue) -> OtamaResult<f64> {
        self.ensure_open()?;
        if !(a.is_mapping() && b.is_mapping()) {
            return Err(OtamaError::argument("invalid argument type"));
        }
        let pool = VariantPool::open();
        let var_a = pool.new_variant();
        let var_b = pool.new_variant();
        encode(a, var_a)?;
        encode(b, var_b)?;
        let similarity = self.call(|conn| conn.similarity(var_a, var_b))?;
        Ok(f64::from(similarity))
    }

    /// Run a named driver method and decode its output.
    pub fn invoke(&mut self, method: &str, input: &HostValue) -> OtamaResult<HostValue> {
        self.ensure_open()?;
        let pool = VariantPool::open();
        let input_var = pool.new_variant();
        let output_var = pool.new_variant();
        encode(input, input_var)?;
        debug!(method, "invoking driver method");
        self.call(|conn| conn.invoke(method, output_var, input_var))?;
        Ok(decode(output_var))
    }

    /// Extract a feature handle for later use as a query value.
    pub fn feature_raw(&mut self, query: &HostValue) -> OtamaResult<FeatureRaw> {
        self.ensure_open()?;
        if !query.is_mapping() {
            return Err(OtamaError::argument("invalid argument"));
        }
        let pool = VariantPool::open();
        let var = pool.new_variant();
        encode(query, var)?;
        let handle = self.call(|conn| conn.feature_raw(var))?;
        let releaser: Arc<dyn ReleaseFeature> = self.engine.clone();
        Ok(FeatureRaw::wrap(handle, releaser))
    }

    pub fn feature_string(&mut self, query: &HostValue) -> OtamaResult<String> {
        self.ensure_open()?;
        if !query.is_mapping() {
            return Err(OtamaError::argument("invalid argument"));
        }
        let pool = VariantPool::open();
        let var = pool.new_variant();
        encode(query, var)?;
        self.call(|conn| conn.feature_string(var))
    }

    fn ensure_open(&self) -> OtamaResult<()> {
        if self.conn.is_none() {
            return Err(OtamaError::NotOpen);
        }
        Ok(())
    }

    fn call<T>(
        &mut self,
        f: impl FnOnce(&mut E::Connection) -> Result<T, StatusCode>,
    ) -> OtamaResult<T> {
        let engine = &self.engine;
        let conn = self.conn.as_mut().ok_or(OtamaError::NotOpen)?;
        status::map_result(f(conn), |code| engine.status_message(code))
    }

    fn checked<T>(&self, result: Result<T, StatusCode>) -> OtamaResult<T> {
        status::map_result(result, |code| self.engine.status_message(code))
    }
}

impl<E: Engine> Drop for Database<E> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Path named by a text argument, checked to exist. `None` for non-text values.
fn file_path(value: &HostValue) -> OtamaResult<Option<PathBuf>> {
    let path = match value {
        HostValue::Text(s) => PathBuf::from(s),
        HostValue::Bytes(b) => match std::str::from_utf8(b) {
            Ok(s) => PathBuf::from(s),
            Err(_) => return Ok(None),
        },
        _ => return Ok(None),
    };
    if !path.exists() {
        return Err(OtamaError::IoNotFound(path));
    }
    Ok(Some(path))
}
