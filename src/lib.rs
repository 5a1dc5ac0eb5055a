//! # Ostinato - User-space PCM Streaming Engine
//!
//! Digital-audio I/O core built from modular subsystems.
//!
//! ## Architecture
//!
//! Ostinato is an umbrella crate that coordinates:
//! - **ostinato-core** - The PCM engine (configuration-space
//!   negotiation, stream state machine, channel areas, ring-buffer
//!   transfer engine, back-end dispatch)
//! - **ostinato-plug** - In-process back-ends (null sink, loopback ring
//!   with an embedder-driven clock, slave routing)
//!
//! ## Quick Start
//!
//! ```ignore
//! use ostinato::prelude::*;
//!
//! // Open a playback handle against the null sink.
//! let mut pcm = PcmBuilder::playback("null").open()?;
//!
//! // Negotiate a configuration: refine the space to a single point.
//! let mut space = pcm.hw_params_any()?;
//! space.set_access(Access::RwInterleaved)?;
//! space.set_format(Format::S16Le)?;
//! space.set(HwParam::Channels, 2)?;
//! space.set(HwParam::Rate, 44100)?;
//! pcm.hw_params_set_near(&mut space, HwParam::BufferSize, 4096, 0)?;
//! pcm.hw_params(&mut space)?;          // commits and prepares
//!
//! // Stream: the first write that crosses the start threshold starts
//! // the hardware.
//! let silence = vec![0u8; 4096 * 4];
//! pcm.writei(&silence, 4096)?;
//!
//! pcm.drain()?;
//! pcm.close()?;
//! ```
//!
//! ## Back-ends
//!
//! Handles resolve through a [`Registry`] of back-end open functions;
//! the built-ins are `null` and `loop`. Out-of-tree back-ends implement
//! [`Backend`](ostinato_core::Backend) and register an opener.

/// Re-export of ostinato-core for direct access.
pub use ostinato_core as core;

/// Re-export of ostinato-plug for direct access.
pub use ostinato_plug as plug;

// Engine types
pub use ostinato_core::{
    // Areas
    area_copy,
    area_silence,
    areas_copy,
    areas_from_buf,
    areas_from_bufs,
    areas_silence,
    boundary_for,
    Access,
    Backend,
    BackendSetup,
    BackendType,
    ChannelArea,
    Endian,
    // Error
    Error,
    Format,
    Frames,
    // Configuration space
    HwConfig,
    HwParam,
    HwParams,
    Interval,
    LinkHandle,
    Mask,
    MmapWindow,
    Mode,
    // The handle
    Pcm,
    PcmInfo,
    PeriodEvent,
    PollDesc,
    PollEvent,
    Result,
    RingView,
    SFrames,
    Setup,
    StartMode,
    // State machine
    State,
    Status,
    Stream,
    Subformat,
    // Software parameters
    SwParams,
    TstampMode,
    XrunMode,
};

// Back-ends
pub use ostinato_plug::{loopback, null, route, LoopClock};

mod builder;
mod registry;

pub use builder::PcmBuilder;
pub use registry::{default_registry, OpenFn, OpenRequest, Registry};

/// Open a PCM by name through the process-wide registry.
pub fn open(name: &str, stream: Stream, mode: Mode) -> Result<Pcm> {
    default_registry().open(name, stream, mode)
}

/// Convenience prelude for common imports.
pub mod prelude {
    pub use crate::{open, PcmBuilder, Registry};

    pub use crate::core::{
        Access, Format, Frames, HwParam, HwParams, Mode, Pcm, State, Stream, SwParams,
    };

    pub use crate::plug::{loopback, null, LoopClock};
}
