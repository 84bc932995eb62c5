//! Persisted configuration
//!
//! Scalar settings live in durable cells, each paired with a
//! [`SettingSpec`] giving its limits, edit step and factory default.

pub mod settings;

pub use settings::*;
