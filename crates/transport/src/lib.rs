//! An abstraction layer for assistant chat transports.
//!
//! This crate establishes the protocol between the session engine and
//! whatever carries conversation turns over the wire (HTTP streaming,
//! server-sent events, a local fake). Types in this crate don't define
//! any behavior on their own; they are the constraints that transport
//! implementors adhere to.

#![deny(missing_docs)]

mod adapter;
mod context;
mod error;
mod request;
mod stream;

pub use adapter::*;
pub use context::*;
pub use error::*;
pub use request::*;
pub use stream::*;
