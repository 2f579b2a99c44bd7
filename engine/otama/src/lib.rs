/* Copyright (c) 2026 Olle Mårtensson. This Source Code Form is subject to the terms of the Eclipse Public License, v. 2.0. */
//! Otama: host bindings for a content-based similarity-search engine.
//!
//! This crate lowers dynamically typed host values into the engine's variant
//! trees, raises engine results back into host values, and maps engine
//! status codes onto typed errors. The engine itself sits behind the
//! [`Engine`] and [`Connection`] traits; [`MemoryEngine`] is an in-process
//! implementation.
//!
//! # Examples
//! ```
//! use std::sync::Arc;
//! use otama::{Database, HostValue, MemoryEngine};
//!
//! let engine = Arc::new(MemoryEngine::new());
//! let config = HostValue::mapping([("namespace", HostValue::text("demo"))]);
//! let mut db = Database::open(engine, &config).expect("open");
//! db.create_database().expect("create");
//!
//! let count = db.invoke("count", &HostValue::Null).expect("invoke");
//! assert_eq!(count, HostValue::Int(0));
//! ```

mod error;
pub mod value;

pub mod config;
pub mod database;
pub mod decode;
pub mod encode;
pub mod engine;
pub mod feature;
pub mod id;
pub mod memory;
pub mod results;
pub mod status;
pub mod variant;

#[cfg(feature = "serde")]
mod serde_support;

pub use config::OpenConfig;
pub use database::{initialize, Database};
pub use decode::decode;
pub use encode::{encode, is_single_byte_text};
pub use engine::{Connection, Engine, LogLevel};
pub use error::{EngineErrorKind, OtamaError, OtamaResult};
pub use feature::{FeatureRaw, OpaqueHandle, ReleaseFeature};
pub use id::{Identifier, ID_HEX_LEN, ID_LEN};
pub use memory::{MemoryConnection, MemoryEngine};
pub use results::{materialize, Record, ResultSet, ID_KEY};
pub use status::{StatusCode, UNKNOWN_ERROR_MESSAGE};
pub use value::HostValue;
pub use variant::{VariantKind, VariantPool, VariantRef};
