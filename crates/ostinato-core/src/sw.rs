//! Software parameters: the thresholds and modes that govern the
//! transfer engine at run time.

use crate::error::{Error, Result};
use crate::state::{StartMode, TstampMode, XrunMode};
use crate::Frames;
use std::fmt;

/// Largest power-of-two multiple of `buffer_size` that still fits a
/// signed 32-bit frame count. Free-running pointers wrap at this value.
pub fn boundary_for(buffer_size: Frames) -> Frames {
    debug_assert!(buffer_size > 0);
    let mut boundary = buffer_size;
    while boundary.saturating_mul(2) <= i32::MAX as Frames {
        boundary *= 2;
    }
    boundary
}

/// Software configuration of a PCM stream.
///
/// A value object: obtain the current one with
/// [`Pcm::sw_params_current`](crate::pcm::Pcm::sw_params_current), adjust
/// it, and install it with [`Pcm::sw_params`](crate::pcm::Pcm::sw_params).
/// The deprecated start/xrun modes are stored alongside their thresholds,
/// so a mode set through the alias and read back is exact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwParams {
    pub tstamp_mode: TstampMode,
    pub period_step: u32,
    /// Minimum ticks to sleep between wake-up checks; 0 disables tick
    /// sleeping. Carried for back-ends with a timer wheel.
    pub sleep_min: u32,
    /// Frames that must be available before the poll descriptor fires.
    pub avail_min: Frames,
    /// Transfer sizes are rounded down to a multiple of this.
    pub xfer_align: Frames,
    /// Queued frames at which a transfer auto-starts the stream.
    pub start_threshold: Frames,
    /// Available frames at which the back-end declares an xrun.
    pub stop_threshold: Frames,
    /// Remaining-queue level at or below which silencing tops up ahead
    /// of the application pointer (playback only).
    pub silence_threshold: Frames,
    /// Frames silenced ahead per top-up.
    pub silence_size: Frames,
    start_mode: StartMode,
    xrun_mode: XrunMode,
    buffer_size: Frames,
    boundary: Frames,
}

impl SwParams {
    /// The defaults latched when a hardware configuration is committed.
    pub fn default_for(buffer_size: Frames, period_size: Frames) -> SwParams {
        let boundary = boundary_for(buffer_size);
        SwParams {
            tstamp_mode: TstampMode::None,
            period_step: 1,
            sleep_min: 0,
            avail_min: period_size,
            xfer_align: period_size,
            start_threshold: 1,
            stop_threshold: buffer_size,
            silence_threshold: 0,
            silence_size: 0,
            start_mode: StartMode::Data,
            xrun_mode: XrunMode::Stop,
            buffer_size,
            boundary,
        }
    }

    /// The pointer-wrap modulus derived from the buffer size.
    #[inline]
    pub fn boundary(&self) -> Frames {
        self.boundary
    }

    pub fn start_mode(&self) -> StartMode {
        self.start_mode
    }

    /// Set the deprecated start-mode alias, writing the matching
    /// threshold.
    pub fn set_start_mode(&mut self, mode: StartMode) {
        self.start_mode = mode;
        self.start_threshold = match mode {
            StartMode::Explicit => self.boundary,
            StartMode::Data => 1,
        };
    }

    /// Set the start threshold, keeping the stored mode coherent.
    pub fn set_start_threshold(&mut self, threshold: Frames) {
        self.start_threshold = threshold;
        self.start_mode = if threshold >= self.boundary {
            StartMode::Explicit
        } else {
            StartMode::Data
        };
    }

    pub fn xrun_mode(&self) -> XrunMode {
        self.xrun_mode
    }

    /// Set the deprecated xrun-mode alias, writing the matching
    /// threshold.
    pub fn set_xrun_mode(&mut self, mode: XrunMode) {
        self.xrun_mode = mode;
        self.stop_threshold = match mode {
            XrunMode::None => self.boundary,
            XrunMode::Stop => self.buffer_size,
        };
    }

    /// Set the stop threshold, keeping the stored mode coherent.
    pub fn set_stop_threshold(&mut self, threshold: Frames) {
        self.stop_threshold = threshold;
        self.xrun_mode = if threshold >= self.boundary {
            XrunMode::None
        } else {
            XrunMode::Stop
        };
    }

    /// Validate against the latched geometry.
    pub fn validate(&self, buffer_size: Frames, min_align: Frames) -> Result<()> {
        if self.avail_min == 0 || self.avail_min > buffer_size {
            return Err(Error::Invalid("avail_min out of range"));
        }
        if self.xfer_align == 0 || self.xfer_align % min_align != 0 {
            return Err(Error::Invalid("xfer_align not a multiple of min_align"));
        }
        if self.silence_threshold + self.silence_size > buffer_size {
            return Err(Error::Invalid(
                "silence_threshold + silence_size exceeds buffer size",
            ));
        }
        if self.start_threshold > self.boundary || self.stop_threshold > self.boundary {
            return Err(Error::Invalid("threshold beyond boundary"));
        }
        if self.period_step == 0 {
            return Err(Error::Invalid("period_step must be positive"));
        }
        Ok(())
    }

    /// Write the software setup in the conventional key/value layout.
    pub fn dump(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        writeln!(out, "tstamp_mode  : {}", self.tstamp_mode.name())?;
        writeln!(out, "period_step  : {}", self.period_step)?;
        writeln!(out, "sleep_min    : {}", self.sleep_min)?;
        writeln!(out, "avail_min    : {}", self.avail_min)?;
        writeln!(out, "xfer_align   : {}", self.xfer_align)?;
        writeln!(out, "start_threshold  : {}", self.start_threshold)?;
        writeln!(out, "stop_threshold   : {}", self.stop_threshold)?;
        writeln!(out, "silence_threshold: {}", self.silence_threshold)?;
        writeln!(out, "silence_size : {}", self.silence_size)?;
        writeln!(out, "boundary     : {}", self.boundary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_is_power_of_two_multiple() {
        let b = boundary_for(4096);
        assert_eq!(b % 4096, 0);
        assert!((b / 4096).is_power_of_two());
        assert!(b <= i32::MAX as u64);
        assert!(b * 2 > i32::MAX as u64);

        // Non-power-of-two buffers still get a valid boundary.
        let b = boundary_for(3000);
        assert_eq!(b % 3000, 0);
        assert!(b <= i32::MAX as u64);
    }

    #[test]
    fn test_defaults() {
        let sw = SwParams::default_for(4096, 1024);
        assert_eq!(sw.avail_min, 1024);
        assert_eq!(sw.xfer_align, 1024);
        assert_eq!(sw.start_threshold, 1);
        assert_eq!(sw.stop_threshold, 4096);
        assert_eq!(sw.start_mode(), StartMode::Data);
        assert_eq!(sw.xrun_mode(), XrunMode::Stop);
        sw.validate(4096, 1).unwrap();
    }

    #[test]
    fn test_mode_threshold_coupling() {
        let mut sw = SwParams::default_for(4096, 1024);
        sw.set_start_mode(StartMode::Explicit);
        assert_eq!(sw.start_threshold, sw.boundary());
        assert_eq!(sw.start_mode(), StartMode::Explicit);
        sw.set_start_threshold(2048);
        assert_eq!(sw.start_mode(), StartMode::Data);

        sw.set_xrun_mode(XrunMode::None);
        assert_eq!(sw.stop_threshold, sw.boundary());
        sw.set_stop_threshold(4096);
        assert_eq!(sw.xrun_mode(), XrunMode::Stop);
    }

    #[test]
    fn test_validation_rules() {
        let mut sw = SwParams::default_for(4096, 1024);
        sw.avail_min = 0;
        assert!(sw.validate(4096, 1).is_err());

        let mut sw = SwParams::default_for(4096, 1024);
        sw.avail_min = 5000;
        assert!(sw.validate(4096, 1).is_err());

        let mut sw = SwParams::default_for(4096, 1024);
        sw.xfer_align = 3;
        assert!(sw.validate(4096, 2).is_err());

        let mut sw = SwParams::default_for(4096, 1024);
        sw.silence_threshold = 3000;
        sw.silence_size = 2000;
        assert!(sw.validate(4096, 1).is_err());

        let mut sw = SwParams::default_for(4096, 1024);
        sw.start_threshold = sw.boundary() + 1;
        assert!(sw.validate(4096, 1).is_err());
    }
}
