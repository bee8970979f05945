//! Transport adapters for `courier-core`.
//!
//! # Design
//! Each adapter wraps one HTTP library and implements
//! [`courier_core::Transport`]. Adapters return every response they receive,
//! whatever its status, and map library errors onto `TransportError`:
//! timeouts to `Timeout`, connection failures to `Network`, and anything that
//! prevented the request from being sent to `Invalid`.
//!
//! Module names carry the library's major version so a second version can sit
//! alongside without renaming the first.

#[cfg(feature = "reqwest")]
mod reqwest_0_12;
#[cfg(feature = "ureq")]
mod ureq_3;

#[cfg(feature = "reqwest")]
pub use reqwest_0_12::ReqwestTransport;
#[cfg(feature = "ureq")]
pub use ureq_3::UreqTransport;

/// A client dispatching through `reqwest`.
#[cfg(feature = "reqwest")]
pub type ReqwestClient<R = ()> = courier_core::Client<ReqwestTransport, R>;

/// A client dispatching through `ureq` on the blocking thread pool.
#[cfg(feature = "ureq")]
pub type UreqClient<R = ()> = courier_core::Client<UreqTransport, R>;
