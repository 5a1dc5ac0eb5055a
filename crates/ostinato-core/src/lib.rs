//! # ostinato-core
//!
//! Core of the ostinato PCM streaming engine.
//!
//! The engine mediates between an application producing or consuming
//! audio frames and a back-end that owns a ring buffer. It negotiates a
//! hardware configuration by refining a set-valued parameter space to a
//! single point, drives a stream state machine, and moves frames either
//! by read/write calls or by direct windows into the ring.
//!
//! ## Architecture
//!
//! ```text
//! ostinato-core
//! ├── format / mask / interval  ← parameter value domains
//! ├── hw / sw                   ← configuration spaces & thresholds
//! ├── area                      ← channel areas, silence/copy loops
//! ├── state                     ← stream state machine
//! ├── pcm / transfer            ← the handle and its transfer engine
//! ├── backend / link            ← back-end trait, linked groups
//! └── poll / event              ← readiness cell, period events
//! ```
//!
//! Back-ends implementing [`Backend`] live in `ostinato-plug`; the
//! umbrella `ostinato` crate adds the fluent open API.

pub mod area;
pub mod backend;
pub mod error;
pub mod event;
pub mod format;
pub mod hw;
pub mod interval;
pub mod link;
pub mod mask;
pub mod pcm;
pub mod poll;
pub mod state;
pub mod sw;
pub mod transfer;

/// An unsigned frame count or free-running frame position.
pub type Frames = u64;

/// A signed frame count (negative values carry error codes in C-style
/// bridges; here they appear only in delay reporting).
pub type SFrames = i64;

pub use area::{
    area_copy, area_silence, areas_copy, areas_from_buf, areas_from_bufs, areas_silence,
    ChannelArea,
};
pub use backend::{Backend, BackendSetup, BackendType, HwConfig, PcmInfo, RingView};
pub use error::{Error, Result};
pub use event::{period_channel, PeriodEvent, PeriodReceiver, PeriodSender};
pub use format::{Access, Endian, Format, Subformat, ALL_ACCESSES, ALL_FORMATS, ALL_SUBFORMATS};
pub use hw::{HwParam, HwParams};
pub use interval::Interval;
pub use link::{LinkGroup, LinkHandle, Linkable};
pub use mask::Mask;
pub use pcm::{Pcm, Setup};
pub use poll::{FrameCell, PollDesc, PollEvent};
pub use state::{transition, Mode, StartMode, State, Status, Stream, StreamOp, TstampMode, XrunMode};
pub use sw::{boundary_for, SwParams};
pub use transfer::MmapWindow;
