//! Remote text protocol
//!
//! A host talks to the oven over a serial link with short ASCII commands,
//! one per line:
//!
//! ```text
//! host  > PROF? 2\n
//! oven  < 2,NC-31 LOW-TEMP LF,0,140,65,90,140,75,3.0,160,15,-3.0\n\r
//! ```
//!
//! Keywords are case-insensitive. Replies end in `\n\r`. The transport is
//! not part of this crate: bytes go in through [`LineBuffer`], commands
//! come out of [`Command::parse`], and replies are formatted with the
//! helpers in [`response`].

#![no_std]
#![deny(unsafe_code)]

pub mod command;
pub mod line;
pub mod response;

pub use command::{ChannelConfig, Command, ParseError, ProfileRecord, CHANNELS};
pub use line::{LineBuffer, LineError, MAX_LINE};
pub use response::{PlotRecord, Reply, Response, IDN, TERMINATOR};
