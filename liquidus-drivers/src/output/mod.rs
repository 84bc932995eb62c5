//! Load output drivers

pub mod ssr;

pub use ssr::{SsrOutput, SsrPair};
