//! Integer intervals with open/closed ends, the value domain of the
//! non-mask configuration parameters.
//!
//! An interval is `[min, max]` with per-end inclusivity bits and an
//! integer-only flag. Refinement intersects intervals; the arithmetic
//! helpers (`mul`, `div`, `muldivk`, `mulkdiv`) propagate openness so
//! derived parameters stay conservative: a rounded-down lower bound
//! becomes open, a rounded-up upper bound becomes open.

use crate::error::{Error, Result};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Interval {
    min: u32,
    max: u32,
    openmin: bool,
    openmax: bool,
    integer: bool,
    empty: bool,
}

impl Interval {
    /// The universal interval.
    pub const fn any() -> Interval {
        Interval {
            min: 0,
            max: u32::MAX,
            openmin: false,
            openmax: false,
            integer: false,
            empty: false,
        }
    }

    pub const fn none() -> Interval {
        Interval {
            min: u32::MAX,
            max: 0,
            openmin: false,
            openmax: false,
            integer: false,
            empty: true,
        }
    }

    /// A closed interval `[min, max]`.
    pub fn new(min: u32, max: u32) -> Interval {
        let mut i = Interval::any();
        i.min = min;
        i.max = max;
        i.empty = i.checkempty();
        i
    }

    /// The single-point interval `[v, v]`.
    pub fn value(v: u32) -> Interval {
        Interval::new(v, v)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.empty
    }

    #[inline]
    pub fn min(&self) -> u32 {
        self.min
    }

    #[inline]
    pub fn max(&self) -> u32 {
        self.max
    }

    #[inline]
    pub fn openmin(&self) -> bool {
        self.openmin
    }

    #[inline]
    pub fn openmax(&self) -> bool {
        self.openmax
    }

    fn checkempty(&self) -> bool {
        self.min > self.max || (self.min == self.max && (self.openmin || self.openmax))
    }

    /// Exactly one value remains.
    pub fn single(&self) -> bool {
        !self.empty
            && (self.min == self.max || (self.min + 1 == self.max && (self.openmin || self.openmax)))
    }

    /// The committed value of a single-point interval. For an
    /// almost-single interval (`min + 1 == max` with an open end) the
    /// closed end wins; fully open, the lower value is reported.
    pub fn point(&self) -> u32 {
        debug_assert!(self.single());
        if self.openmin && !self.openmax {
            self.max
        } else {
            self.min
        }
    }

    /// Whether `v` lies inside the interval.
    pub fn contains(&self, v: u32) -> bool {
        if self.empty {
            return false;
        }
        let above = v > self.min || (v == self.min && !self.openmin);
        let below = v < self.max || (v == self.max && !self.openmax);
        above && below
    }

    /// Restrict to integers, collapsing open ends onto the nearest one.
    pub fn set_integer(&mut self) -> Result<bool> {
        let mut changed = false;
        if !self.integer {
            self.integer = true;
            changed = true;
        }
        self.normalize()?;
        Ok(changed)
    }

    fn normalize(&mut self) -> Result<()> {
        if self.integer {
            if self.openmin {
                self.min = self.min.saturating_add(1);
                self.openmin = false;
            }
            if self.openmax {
                self.max = self.max.saturating_sub(1);
                self.openmax = false;
            }
        } else if !self.openmin && !self.openmax && self.min == self.max {
            self.integer = true;
        }
        if self.checkempty() {
            self.empty = true;
            return Err(Error::EmptySpace);
        }
        Ok(())
    }

    /// Intersect with `v`. Reports whether this interval changed; an
    /// intersection that empties it is a refinement failure.
    pub fn refine(&mut self, v: &Interval) -> Result<bool> {
        if self.empty || v.empty {
            self.empty = true;
            return Err(Error::EmptySpace);
        }
        let mut changed = false;
        if self.min < v.min {
            self.min = v.min;
            self.openmin = v.openmin;
            changed = true;
        } else if self.min == v.min && !self.openmin && v.openmin {
            self.openmin = true;
            changed = true;
        }
        if self.max > v.max {
            self.max = v.max;
            self.openmax = v.openmax;
            changed = true;
        } else if self.max == v.max && !self.openmax && v.openmax {
            self.openmax = true;
            changed = true;
        }
        if !self.integer && v.integer {
            self.integer = true;
            changed = true;
        }
        self.normalize()?;
        Ok(changed)
    }

    pub fn refine_min(&mut self, min: u32, open: bool) -> Result<bool> {
        let mut v = Interval::any();
        v.min = min;
        v.openmin = open;
        self.refine(&v)
    }

    pub fn refine_max(&mut self, max: u32, open: bool) -> Result<bool> {
        let mut v = Interval::any();
        v.max = max;
        v.openmax = open;
        self.refine(&v)
    }

    /// Collapse to the single value `v`.
    pub fn refine_value(&mut self, v: u32) -> Result<bool> {
        self.refine(&Interval::value(v))
    }

    /// Collapse to the lowest remaining value. An open lower end of a
    /// non-integer interval collapses to the almost-single
    /// `(min, min + 1)` rather than an empty point.
    pub fn refine_first(&mut self) -> Result<bool> {
        if self.empty {
            return Err(Error::EmptySpace);
        }
        if self.single() {
            return Ok(false);
        }
        if self.integer && self.openmin {
            self.min += 1;
            self.openmin = false;
        }
        self.max = self.min;
        self.openmax = self.openmin;
        if self.openmax {
            self.max += 1;
        }
        self.normalize()?;
        Ok(true)
    }

    /// Collapse to the highest remaining value.
    pub fn refine_last(&mut self) -> Result<bool> {
        if self.empty {
            return Err(Error::EmptySpace);
        }
        if self.single() {
            return Ok(false);
        }
        if self.integer && self.openmax {
            self.max -= 1;
            self.openmax = false;
        }
        self.min = self.max;
        self.openmin = self.openmax;
        if self.openmin {
            self.min -= 1;
        }
        self.normalize()?;
        Ok(true)
    }

    /// `a * b`.
    pub fn mul(a: &Interval, b: &Interval) -> Interval {
        if a.empty || b.empty {
            return Interval::none();
        }
        Interval {
            min: sat_mul(a.min, b.min),
            openmin: a.openmin || b.openmin,
            max: sat_mul(a.max, b.max),
            openmax: a.openmax || b.openmax,
            integer: a.integer && b.integer,
            empty: false,
        }
    }

    /// `a / b`.
    pub fn div(a: &Interval, b: &Interval) -> Interval {
        if a.empty || b.empty {
            return Interval::none();
        }
        let (min, rmin) = div32(a.min, b.max);
        let mut c = Interval {
            min,
            openmin: rmin != 0 || a.openmin || b.openmax,
            max: 0,
            openmax: false,
            integer: false,
            empty: false,
        };
        if b.min > 0 {
            let (max, rmax) = div32(a.max, b.min);
            if rmax != 0 {
                c.max = max.saturating_add(1);
                c.openmax = true;
            } else {
                c.max = max;
                c.openmax = a.openmax || b.openmin;
            }
        } else {
            c.max = u32::MAX;
            c.openmax = false;
        }
        c
    }

    /// `a * b / k`.
    pub fn muldivk(a: &Interval, b: &Interval, k: u32) -> Interval {
        if a.empty || b.empty {
            return Interval::none();
        }
        let (min, rmin) = muldiv32(a.min, b.min, k);
        let (max, rmax) = muldiv32(a.max, b.max, k);
        let mut c = Interval {
            min,
            openmin: rmin != 0 || a.openmin || b.openmin,
            max,
            openmax: a.openmax || b.openmax,
            integer: false,
            empty: false,
        };
        if rmax != 0 {
            c.max = c.max.saturating_add(1);
            c.openmax = true;
        }
        c
    }

    /// `a * k / b`.
    pub fn mulkdiv(a: &Interval, k: u32, b: &Interval) -> Interval {
        if a.empty || b.empty {
            return Interval::none();
        }
        let (min, rmin) = muldiv32(a.min, k, b.max);
        let mut c = Interval {
            min,
            openmin: rmin != 0 || a.openmin || b.openmax,
            max: 0,
            openmax: false,
            integer: false,
            empty: false,
        };
        if b.min > 0 {
            let (max, rmax) = muldiv32(a.max, k, b.min);
            if rmax != 0 {
                c.max = max.saturating_add(1);
                c.openmax = true;
            } else {
                c.max = max;
                c.openmax = a.openmax || b.openmin;
            }
        } else {
            c.max = u32::MAX;
            c.openmax = false;
        }
        c
    }
}

impl Default for Interval {
    fn default() -> Self {
        Interval::any()
    }
}

fn sat_mul(a: u32, b: u32) -> u32 {
    let v = a as u64 * b as u64;
    v.min(u32::MAX as u64) as u32
}

fn div32(a: u32, b: u32) -> (u32, u32) {
    if b == 0 {
        return (u32::MAX, 0);
    }
    (a / b, a % b)
}

fn muldiv32(a: u32, b: u32, c: u32) -> (u32, u32) {
    if c == 0 {
        return (u32::MAX, 0);
    }
    let n = a as u64 * b as u64;
    let q = n / c as u64;
    let r = (n % c as u64) as u32;
    if q > u32::MAX as u64 {
        (u32::MAX, 0)
    } else {
        (q as u32, r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refine_intersect() {
        let mut i = Interval::any();
        assert!(i.refine(&Interval::new(100, 200)).unwrap());
        assert_eq!((i.min(), i.max()), (100, 200));
        assert!(!i.refine(&Interval::new(50, 300)).unwrap());
        assert!(i.refine(&Interval::new(150, 400)).unwrap());
        assert_eq!((i.min(), i.max()), (150, 200));
        assert!(matches!(
            i.refine(&Interval::new(300, 400)),
            Err(Error::EmptySpace)
        ));
        assert!(i.is_empty());
    }

    #[test]
    fn test_single_point() {
        let mut i = Interval::new(40, 50);
        assert!(!i.single());
        i.refine_value(44).unwrap();
        assert!(i.single());
        assert_eq!(i.point(), 44);
        assert!(i.refine_value(45).is_err());
    }

    #[test]
    fn test_first_last() {
        let mut first = Interval::new(8, 64);
        assert!(first.refine_first().unwrap());
        assert_eq!(first.point(), 8);

        let mut last = Interval::new(8, 64);
        assert!(last.refine_last().unwrap());
        assert_eq!(last.point(), 64);

        // Already single: nothing changes.
        assert!(!last.refine_last().unwrap());
    }

    #[test]
    fn test_integer_normalization() {
        let mut i = Interval::new(2, 10);
        i.refine_min(3, true).unwrap();
        i.set_integer().unwrap();
        // (3, 10] over integers is [4, 10].
        assert_eq!(i.min(), 4);
        assert!(!i.openmin());
    }

    #[test]
    fn test_mul_div() {
        let a = Interval::new(2, 4);
        let b = Interval::new(10, 20);
        let m = Interval::mul(&a, &b);
        assert_eq!((m.min(), m.max()), (20, 80));

        let d = Interval::div(&m, &b);
        // Conservative: 20/20 = 1 through 80/10 = 8.
        assert_eq!((d.min(), d.max()), (1, 8));
    }

    #[test]
    fn test_div_rounding_is_conservative() {
        let a = Interval::new(10, 10);
        let b = Interval::new(3, 3);
        let d = Interval::div(&a, &b);
        // 10/3: floor(3.33) open below, ceil(3.33) open above.
        assert_eq!(d.min(), 3);
        assert!(d.openmin());
        assert_eq!(d.max(), 4);
        assert!(d.openmax());
    }

    #[test]
    fn test_muldivk_mulkdiv() {
        // period_bytes = period_size * frame_bits / 8
        let period_size = Interval::new(1024, 1024);
        let frame_bits = Interval::new(32, 32);
        let bytes = Interval::muldivk(&period_size, &frame_bits, 8);
        assert_eq!((bytes.min(), bytes.max()), (4096, 4096));

        // period_time = period_size * 1_000_000 / rate
        let rate = Interval::new(44100, 44100);
        let time = Interval::mulkdiv(&period_size, 1_000_000, &rate);
        assert!(time.min() <= 23220 && time.max() >= 23219);
    }

    #[test]
    fn test_saturation() {
        let a = Interval::new(1 << 20, 1 << 20);
        let m = Interval::mul(&a, &a);
        assert_eq!(m.max(), u32::MAX);
    }
}
