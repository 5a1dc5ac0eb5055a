//! The hardware configuration space and its refinement engine.
//!
//! A [`HwParams`] describes the *set* of parameter tuples a stream could
//! be configured with: a bit-mask per discrete parameter (access, format,
//! subformat) and an interval per numeric parameter. Refinement
//! intersects the space with back-end constraints and then propagates the
//! derived couplings (frame bits from sample bits and channels, byte and
//! time views of the period and buffer) until nothing changes. Committing
//! picks a single point in a fixed priority order so the same refined
//! space always yields the same configuration.

use crate::error::{Error, Result};
use crate::format::{Access, Format, Subformat, ALL_ACCESSES, ALL_FORMATS, ALL_SUBFORMATS};
use crate::interval::Interval;
use crate::mask::Mask;
use std::fmt;

/// One parameter of the configuration space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwParam {
    // Mask parameters.
    Access,
    Format,
    Subformat,
    // Interval parameters.
    SampleBits,
    FrameBits,
    Channels,
    Rate,
    PeriodTime,
    PeriodSize,
    PeriodBytes,
    Periods,
    BufferTime,
    BufferSize,
    BufferBytes,
    TickTime,
}

impl HwParam {
    pub fn name(self) -> &'static str {
        match self {
            HwParam::Access => "access",
            HwParam::Format => "format",
            HwParam::Subformat => "subformat",
            HwParam::SampleBits => "sample_bits",
            HwParam::FrameBits => "frame_bits",
            HwParam::Channels => "channels",
            HwParam::Rate => "rate",
            HwParam::PeriodTime => "period_time",
            HwParam::PeriodSize => "period_size",
            HwParam::PeriodBytes => "period_bytes",
            HwParam::Periods => "periods",
            HwParam::BufferTime => "buffer_time",
            HwParam::BufferSize => "buffer_size",
            HwParam::BufferBytes => "buffer_bytes",
            HwParam::TickTime => "tick_time",
        }
    }

    pub fn is_mask(self) -> bool {
        matches!(self, HwParam::Access | HwParam::Format | HwParam::Subformat)
    }

    fn interval_index(self) -> usize {
        match self {
            HwParam::Access | HwParam::Format | HwParam::Subformat => {
                unreachable!("interval_index called on a mask parameter")
            }
            HwParam::SampleBits => 0,
            HwParam::FrameBits => 1,
            HwParam::Channels => 2,
            HwParam::Rate => 3,
            HwParam::PeriodTime => 4,
            HwParam::PeriodSize => 5,
            HwParam::PeriodBytes => 6,
            HwParam::Periods => 7,
            HwParam::BufferTime => 8,
            HwParam::BufferSize => 9,
            HwParam::BufferBytes => 10,
            HwParam::TickTime => 11,
        }
    }
}

const INTERVAL_PARAMS: [HwParam; 12] = [
    HwParam::SampleBits,
    HwParam::FrameBits,
    HwParam::Channels,
    HwParam::Rate,
    HwParam::PeriodTime,
    HwParam::PeriodSize,
    HwParam::PeriodBytes,
    HwParam::Periods,
    HwParam::BufferTime,
    HwParam::BufferSize,
    HwParam::BufferBytes,
    HwParam::TickTime,
];

const USEC_PER_SEC: u32 = 1_000_000;

/// The hardware configuration space.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HwParams {
    access: Mask,
    format: Mask,
    subformat: Mask,
    intervals: [Interval; 12],
}

impl HwParams {
    /// The universal configuration space.
    pub fn any() -> HwParams {
        let mut intervals = [Interval::any(); 12];
        let one_up = Interval::new(1, u32::MAX);
        intervals[HwParam::SampleBits.interval_index()] = Interval::new(4, 64);
        intervals[HwParam::FrameBits.interval_index()] = Interval::new(4, u32::MAX);
        for p in [
            HwParam::Channels,
            HwParam::Rate,
            HwParam::PeriodTime,
            HwParam::PeriodSize,
            HwParam::PeriodBytes,
            HwParam::Periods,
            HwParam::BufferTime,
            HwParam::BufferSize,
            HwParam::BufferBytes,
        ] {
            intervals[p.interval_index()] = one_up;
        }
        for p in [
            HwParam::SampleBits,
            HwParam::FrameBits,
            HwParam::Channels,
            HwParam::Periods,
        ] {
            let _ = intervals[p.interval_index()].set_integer();
        }
        HwParams {
            access: Mask::any(ALL_ACCESSES.len() as u32),
            format: Mask::any(ALL_FORMATS.len() as u32),
            subformat: Mask::any(ALL_SUBFORMATS.len() as u32),
            intervals,
        }
    }

    pub fn mask(&self, param: HwParam) -> &Mask {
        match param {
            HwParam::Access => &self.access,
            HwParam::Format => &self.format,
            HwParam::Subformat => &self.subformat,
            _ => panic!("{} is not a mask parameter", param.name()),
        }
    }

    pub fn mask_mut(&mut self, param: HwParam) -> &mut Mask {
        match param {
            HwParam::Access => &mut self.access,
            HwParam::Format => &mut self.format,
            HwParam::Subformat => &mut self.subformat,
            _ => panic!("{} is not a mask parameter", param.name()),
        }
    }

    pub fn interval(&self, param: HwParam) -> &Interval {
        &self.intervals[param.interval_index()]
    }

    pub fn interval_mut(&mut self, param: HwParam) -> &mut Interval {
        &mut self.intervals[param.interval_index()]
    }

    /// Intersect every parameter with the corresponding one of `caps`
    /// (what a back-end advertises). Derived couplings are not run here.
    pub fn refine_with(&mut self, caps: &HwParams) -> Result<bool> {
        let mut changed = false;
        changed |= self.access.refine(caps.access)?;
        changed |= self.format.refine(caps.format)?;
        changed |= self.subformat.refine(caps.subformat)?;
        for p in INTERVAL_PARAMS {
            changed |= self.intervals[p.interval_index()].refine(caps.interval(p))?;
        }
        Ok(changed)
    }

    /// Propagate the derived-parameter couplings to a fixed point.
    ///
    /// Every rule only shrinks its targets over a discrete domain, so
    /// the loop terminates.
    pub fn refine_derived(&mut self) -> Result<bool> {
        let mut any_change = false;
        loop {
            let mut changed = false;

            changed |= self.rule_sample_bits_from_format()?;
            changed |= self.rule_format_from_sample_bits()?;

            // frame_bits = sample_bits * channels
            changed |= self.rule3(
                HwParam::FrameBits,
                HwParam::SampleBits,
                HwParam::Channels,
                Coupling::Product,
            )?;
            // period_bytes = period_size * frame_bits / 8
            changed |= self.rule3(
                HwParam::PeriodBytes,
                HwParam::PeriodSize,
                HwParam::FrameBits,
                Coupling::ProductDivK(8),
            )?;
            // buffer_bytes = buffer_size * frame_bits / 8
            changed |= self.rule3(
                HwParam::BufferBytes,
                HwParam::BufferSize,
                HwParam::FrameBits,
                Coupling::ProductDivK(8),
            )?;
            // buffer_size = period_size * periods
            changed |= self.rule3(
                HwParam::BufferSize,
                HwParam::PeriodSize,
                HwParam::Periods,
                Coupling::Product,
            )?;
            // period_time = period_size * 1e6 / rate
            changed |= self.rule_time(HwParam::PeriodTime, HwParam::PeriodSize)?;
            // buffer_time = buffer_size * 1e6 / rate
            changed |= self.rule_time(HwParam::BufferTime, HwParam::BufferSize)?;

            if !changed {
                return Ok(any_change);
            }
            any_change = true;
        }
    }

    fn rule_sample_bits_from_format(&mut self) -> Result<bool> {
        let mut lo = u32::MAX;
        let mut hi = 0;
        for f in ALL_FORMATS {
            if self.format.test(f.index()) {
                if let Some(w) = f.physical_width() {
                    lo = lo.min(w);
                    hi = hi.max(w);
                }
            }
        }
        if hi == 0 {
            // Only opaque formats remain; widths constrain nothing.
            return Ok(false);
        }
        self.intervals[HwParam::SampleBits.interval_index()].refine(&Interval::new(lo, hi))
    }

    fn rule_format_from_sample_bits(&mut self) -> Result<bool> {
        let bits = *self.interval(HwParam::SampleBits);
        let mut keep = Mask::none();
        for f in ALL_FORMATS {
            match f.physical_width() {
                Some(w) if !bits.contains(w) => {}
                _ => keep.set(f.index()),
            }
        }
        self.format.refine(keep)
    }

    /// `target = a * b` (or `a * b / k`), refined in all three directions.
    fn rule3(&mut self, target: HwParam, a: HwParam, b: HwParam, c: Coupling) -> Result<bool> {
        let ia = *self.interval(a);
        let ib = *self.interval(b);
        let mut changed = match c {
            Coupling::Product => {
                self.interval_mut(target).refine(&Interval::mul(&ia, &ib))?
            }
            Coupling::ProductDivK(k) => self
                .interval_mut(target)
                .refine(&Interval::muldivk(&ia, &ib, k))?,
        };
        let it2 = *self.interval(target);
        changed |= match c {
            Coupling::Product => self.interval_mut(a).refine(&Interval::div(&it2, &ib))?,
            Coupling::ProductDivK(k) => self
                .interval_mut(a)
                .refine(&Interval::mulkdiv(&it2, k, &ib))?,
        };
        let ia2 = *self.interval(a);
        changed |= match c {
            Coupling::Product => self.interval_mut(b).refine(&Interval::div(&it2, &ia2))?,
            Coupling::ProductDivK(k) => self
                .interval_mut(b)
                .refine(&Interval::mulkdiv(&it2, k, &ia2))?,
        };
        Ok(changed)
    }

    /// `time_us = size_frames * 1e6 / rate`, refined in all directions.
    fn rule_time(&mut self, time: HwParam, size: HwParam) -> Result<bool> {
        let isize = *self.interval(size);
        let irate = *self.interval(HwParam::Rate);
        let mut changed = self
            .interval_mut(time)
            .refine(&Interval::mulkdiv(&isize, USEC_PER_SEC, &irate))?;
        let itime = *self.interval(time);
        changed |= self
            .interval_mut(size)
            .refine(&Interval::muldivk(&itime, &irate, USEC_PER_SEC))?;
        let isize2 = *self.interval(size);
        changed |= self
            .interval_mut(HwParam::Rate)
            .refine(&Interval::mulkdiv(&isize2, USEC_PER_SEC, &itime))?;
        Ok(changed)
    }

    // --- typed mask accessors ---------------------------------------

    pub fn test_access(&self, access: Access) -> bool {
        self.access.test(access.index())
    }

    pub fn set_access(&mut self, access: Access) -> Result<()> {
        self.access.refine_value(access.index())?;
        Ok(())
    }

    pub fn set_access_mask(&mut self, mask: Mask) -> Result<()> {
        self.access.refine(mask)?;
        Ok(())
    }

    pub fn get_access(&self) -> Result<Access> {
        if !self.access.single() {
            return Err(Error::Invalid("access is not a single value"));
        }
        Ok(Access::from_index(self.access.min_index().unwrap()).unwrap())
    }

    pub fn test_format(&self, format: Format) -> bool {
        self.format.test(format.index())
    }

    pub fn set_format(&mut self, format: Format) -> Result<()> {
        self.format.refine_value(format.index())?;
        Ok(())
    }

    pub fn set_format_mask(&mut self, mask: Mask) -> Result<()> {
        self.format.refine(mask)?;
        Ok(())
    }

    pub fn get_format(&self) -> Result<Format> {
        if !self.format.single() {
            return Err(Error::Invalid("format is not a single value"));
        }
        Ok(Format::from_index(self.format.min_index().unwrap()).unwrap())
    }

    pub fn test_subformat(&self, subformat: Subformat) -> bool {
        self.subformat.test(subformat.index())
    }

    pub fn set_subformat(&mut self, subformat: Subformat) -> Result<()> {
        self.subformat.refine_value(subformat.index())?;
        Ok(())
    }

    pub fn get_subformat(&self) -> Result<Subformat> {
        if !self.subformat.single() {
            return Err(Error::Invalid("subformat is not a single value"));
        }
        Ok(Subformat::from_index(self.subformat.min_index().unwrap()).unwrap())
    }

    // --- interval setters -------------------------------------------

    /// Collapse an interval parameter to one value.
    pub fn set(&mut self, param: HwParam, value: u32) -> Result<()> {
        self.interval_mut(param).refine_value(value)?;
        self.refine_derived()?;
        Ok(())
    }

    /// Whether `value` is admissible without mutating the space.
    pub fn test(&self, param: HwParam, value: u32) -> bool {
        let mut probe = self.clone();
        probe.set(param, value).is_ok()
    }

    pub fn set_min(&mut self, param: HwParam, min: u32) -> Result<()> {
        self.interval_mut(param).refine_min(min, false)?;
        self.refine_derived()?;
        Ok(())
    }

    pub fn set_max(&mut self, param: HwParam, max: u32) -> Result<()> {
        self.interval_mut(param).refine_max(max, false)?;
        self.refine_derived()?;
        Ok(())
    }

    pub fn set_minmax(&mut self, param: HwParam, min: u32, max: u32) -> Result<()> {
        self.interval_mut(param).refine(&Interval::new(min, max))?;
        self.refine_derived()?;
        Ok(())
    }

    /// Collapse to the lowest admissible value and return it.
    pub fn set_first(&mut self, param: HwParam) -> Result<u32> {
        self.interval_mut(param).refine_first()?;
        self.refine_derived()?;
        self.get(param)
    }

    /// Collapse to the highest admissible value and return it.
    pub fn set_last(&mut self, param: HwParam) -> Result<u32> {
        self.interval_mut(param).refine_last()?;
        self.refine_derived()?;
        self.get(param)
    }

    /// Collapse to the admissible value closest to `value`. Ties break
    /// toward the direction bias: negative prefers the smaller value,
    /// positive the larger; zero behaves like negative.
    pub fn set_near(&mut self, param: HwParam, value: u32, dir: i32) -> Result<u32> {
        self.set_near_with(param, value, dir, |p| p.refine_derived().map(|_| ()))
    }

    /// `set_near` with a caller-supplied refinement step, so the search
    /// can consult back-end constraints as well as the derived rules.
    pub fn set_near_with(
        &mut self,
        param: HwParam,
        value: u32,
        dir: i32,
        refine: impl Fn(&mut HwParams) -> Result<()>,
    ) -> Result<u32> {
        let above = self.probe_bound(param, value, true, &refine);
        let below = self.probe_bound(param, value, false, &refine);
        let chosen = match (below, above) {
            (None, None) => return Err(Error::EmptySpace),
            (Some(lo), None) => lo,
            (None, Some(hi)) => hi,
            (Some((lo_space, lo)), Some((hi_space, hi))) => {
                let d_lo = value - lo;
                let d_hi = hi - value;
                if d_hi < d_lo || (d_hi == d_lo && dir > 0) {
                    (hi_space, hi)
                } else {
                    (lo_space, lo)
                }
            }
        };
        *self = chosen.0;
        Ok(chosen.1)
    }

    fn probe_bound(
        &self,
        param: HwParam,
        value: u32,
        above: bool,
        refine: &impl Fn(&mut HwParams) -> Result<()>,
    ) -> Option<(HwParams, u32)> {
        let mut probe = self.clone();
        let r = if above {
            probe.interval_mut(param).refine_min(value, false)
        } else {
            probe.interval_mut(param).refine_max(value, false)
        };
        r.ok()?;
        refine(&mut probe).ok()?;
        let r = if above {
            probe.interval_mut(param).refine_first()
        } else {
            probe.interval_mut(param).refine_last()
        };
        r.ok()?;
        refine(&mut probe).ok()?;
        let v = probe.get(param).ok()?;
        Some((probe, v))
    }

    // --- getters ----------------------------------------------------

    /// The committed value of a single-point interval parameter.
    pub fn get(&self, param: HwParam) -> Result<u32> {
        let i = self.interval(param);
        if !i.single() {
            return Err(Error::Invalid("parameter is not a single value"));
        }
        Ok(i.point())
    }

    pub fn get_min(&self, param: HwParam) -> u32 {
        self.interval(param).min()
    }

    pub fn get_max(&self, param: HwParam) -> u32 {
        self.interval(param).max()
    }

    /// Collapse every remaining multi-valued parameter onto its lowest
    /// admissible value. Used as the final sweep of a commit.
    pub fn collapse_remaining(&mut self) -> Result<()> {
        if !self.access.single() {
            self.access.refine_first()?;
        }
        if !self.format.single() {
            self.format.refine_first()?;
        }
        if !self.subformat.single() {
            self.subformat.refine_first()?;
        }
        for p in INTERVAL_PARAMS {
            if !self.interval(p).single() {
                self.interval_mut(p).refine_first()?;
                self.refine_derived()?;
            }
        }
        Ok(())
    }

    /// Write the space in the conventional key/value text layout.
    pub fn dump(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        write!(out, "access       :")?;
        for a in ALL_ACCESSES {
            if self.test_access(a) {
                write!(out, " {}", a.name())?;
            }
        }
        writeln!(out)?;
        write!(out, "format       :")?;
        for f in ALL_FORMATS {
            if self.test_format(f) {
                write!(out, " {}", f.name())?;
            }
        }
        writeln!(out)?;
        write!(out, "subformat    :")?;
        for s in ALL_SUBFORMATS {
            if self.test_subformat(s) {
                write!(out, " {}", s.name())?;
            }
        }
        writeln!(out)?;
        for p in INTERVAL_PARAMS {
            let i = self.interval(p);
            if i.single() {
                writeln!(out, "{:<13}: {}", p.name(), i.point())?;
            } else {
                writeln!(
                    out,
                    "{:<13}: {}{},{}{}",
                    p.name(),
                    if i.openmin() { '(' } else { '[' },
                    i.min(),
                    i.max(),
                    if i.openmax() { ')' } else { ']' },
                )?;
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy)]
enum Coupling {
    /// `target = a * b`
    Product,
    /// `target = a * b / k`
    ProductDivK(u32),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constrained() -> HwParams {
        let mut p = HwParams::any();
        p.set_format(Format::S16Le).unwrap();
        p.set(HwParam::Channels, 2).unwrap();
        p.set(HwParam::Rate, 48000).unwrap();
        p
    }

    #[test]
    fn test_any_is_full() {
        let p = HwParams::any();
        assert!(p.test_access(Access::RwInterleaved));
        assert!(p.test_format(Format::Float64Be));
        assert_eq!(p.get_min(HwParam::Channels), 1);
        assert!(p.get(HwParam::Rate).is_err());
    }

    #[test]
    fn test_frame_bits_coupling() {
        let mut p = HwParams::any();
        p.set_format(Format::S16Le).unwrap();
        p.refine_derived().unwrap();
        assert_eq!(p.get(HwParam::SampleBits).unwrap(), 16);
        p.set(HwParam::Channels, 2).unwrap();
        assert_eq!(p.get(HwParam::FrameBits).unwrap(), 32);
    }

    #[test]
    fn test_format_dropped_by_sample_bits() {
        let mut p = HwParams::any();
        p.set(HwParam::SampleBits, 8).unwrap();
        assert!(p.test_format(Format::S8));
        assert!(p.test_format(Format::MuLaw));
        assert!(!p.test_format(Format::S16Le));
        assert!(!p.test_format(Format::FloatLe));
    }

    #[test]
    fn test_byte_couplings() {
        let mut p = constrained();
        p.set(HwParam::PeriodSize, 1024).unwrap();
        p.set(HwParam::Periods, 4).unwrap();
        assert_eq!(p.get(HwParam::PeriodBytes).unwrap(), 4096);
        assert_eq!(p.get(HwParam::BufferSize).unwrap(), 4096);
        assert_eq!(p.get(HwParam::BufferBytes).unwrap(), 16384);
    }

    #[test]
    fn test_time_coupling_round_trip() {
        let mut p = constrained();
        p.set(HwParam::PeriodSize, 480).unwrap();
        // 480 frames at 48 kHz is exactly 10 ms.
        assert_eq!(p.get(HwParam::PeriodTime).unwrap(), 10_000);
    }

    #[test]
    fn test_refinement_idempotent() {
        let mut p = constrained();
        p.set_minmax(HwParam::BufferSize, 1024, 8192).unwrap();
        let once = p.clone();
        p.refine_derived().unwrap();
        assert_eq!(p, once);
    }

    #[test]
    fn test_setter_shrinks_space() {
        let mut p = constrained();
        let before = *p.interval(HwParam::BufferSize);
        p.set_minmax(HwParam::BufferSize, 2048, 4096).unwrap();
        let after = p.interval(HwParam::BufferSize);
        assert!(after.min() >= before.min());
        assert!(after.max() <= before.max());
    }

    #[test]
    fn test_empty_space_rejected() {
        let mut p = constrained();
        p.set(HwParam::PeriodSize, 1024).unwrap();
        assert!(matches!(
            p.set(HwParam::PeriodBytes, 1000),
            Err(Error::EmptySpace)
        ));
    }

    #[test]
    fn test_test_does_not_mutate() {
        let p = constrained();
        let copy = p.clone();
        assert!(p.test(HwParam::PeriodSize, 1024));
        assert!(!p.test(HwParam::SampleBits, 8));
        assert_eq!(p, copy);
    }

    #[test]
    fn test_set_near_picks_closest() {
        let mut p = constrained();
        p.set_minmax(HwParam::PeriodSize, 512, 2048).unwrap();
        assert_eq!(p.set_near(HwParam::PeriodSize, 1000, 0).unwrap(), 1000);

        let mut p = constrained();
        p.set(HwParam::Periods, 4).unwrap();
        p.set_minmax(HwParam::BufferSize, 4096, 4096).unwrap();
        // period_size is pinned to 1024; near(1000) must land there.
        assert_eq!(p.set_near(HwParam::PeriodSize, 1000, 0).unwrap(), 1024);
    }

    #[test]
    fn test_set_near_clamps_to_range() {
        let mut p = constrained();
        p.set_minmax(HwParam::BufferSize, 1024, 8192).unwrap();
        assert_eq!(p.set_near(HwParam::BufferSize, 1, 0).unwrap(), 1024);

        let mut p = constrained();
        p.set_minmax(HwParam::BufferSize, 1024, 8192).unwrap();
        assert_eq!(
            p.set_near(HwParam::BufferSize, 1 << 30, 0).unwrap(),
            8192
        );
        assert_eq!(p.get(HwParam::BufferSize).unwrap(), 8192);
    }

    #[test]
    fn test_get_on_wide_param_fails() {
        let p = HwParams::any();
        assert!(matches!(p.get(HwParam::Rate), Err(Error::Invalid(_))));
        assert!(p.get_access().is_err());
    }

    #[test]
    fn test_dump_mentions_every_param() {
        let mut out = String::new();
        constrained().dump(&mut out).unwrap();
        for key in ["access", "format", "rate", "buffer_size", "tick_time"] {
            assert!(out.contains(key), "dump missing {key}: {out}");
        }
    }
}
