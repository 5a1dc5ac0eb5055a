//! # ostinato-plug
//!
//! In-process back-ends for the ostinato PCM engine:
//!
//! - **null**: discards playback, synthesises silence on capture;
//!   never blocks, never xruns.
//! - **loopback**: a user-space ring with an embedder-driven
//!   [`LoopClock`]; deterministic virtual hardware.
//! - **route**: forwards every op to a cached slave handle, the
//!   skeleton for plugin chains.
//!
//! All three share one stream runtime (state machine, pointer
//! accounting, xrun detection, playback silencing, period events,
//! linked groups).

pub mod loopback;
pub mod null;
pub mod route;
mod runtime;

pub use loopback::LoopClock;
pub use route::RouteBackend;
