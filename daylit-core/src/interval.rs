//! Ordered free time for the allocator.
//!
//! A day's free time is a chronologically ordered list of half-open
//! `[start, end)` minute intervals. Placing a task never edits the list in
//! place: [`FreeIntervals::carve`] returns a new list with the used interval
//! replaced by whatever is left on either side of the placement.

use crate::time::Minutes;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: Minutes,
    pub end: Minutes,
}

impl Interval {
    pub fn new(start: Minutes, end: Minutes) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> Minutes {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 0
    }

    /// Half-open overlap; touching intervals do not overlap.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FreeIntervals(Vec<Interval>);

impl FreeIntervals {
    /// Gaps between `day_start`/`day_end` and the busy intervals.
    ///
    /// `busy` must be sorted by start. Busy intervals may overlap each other or
    /// spill past the day boundaries; the gaps never cover any busy minute.
    pub fn between(day_start: Minutes, day_end: Minutes, busy: &[Interval]) -> Self {
        let mut free = Vec::new();
        let mut cursor = day_start;

        for b in busy {
            let gap_end = b.start.min(day_end);
            if cursor < gap_end {
                free.push(Interval::new(cursor, gap_end));
            }
            // an inverted block still consumes the time up to its start
            cursor = cursor.max(gap_end).max(b.end);
        }

        if cursor < day_end {
            free.push(Interval::new(cursor, day_end));
        }

        Self(free)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Interval> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total free minutes.
    pub fn total(&self) -> Minutes {
        self.0.iter().map(Interval::len).sum()
    }

    /// A new list where interval `index` is replaced by the non-empty parts of
    /// it before and after `placed`.
    ///
    /// `placed` must lie within interval `index`.
    pub fn carve(&self, index: usize, placed: Interval) -> Self {
        let mut out = Vec::with_capacity(self.0.len() + 1);
        for (i, iv) in self.0.iter().enumerate() {
            if i != index {
                out.push(*iv);
                continue;
            }
            let before = Interval::new(iv.start, placed.start);
            let after = Interval::new(placed.end, iv.end);
            if !before.is_empty() {
                out.push(before);
            }
            if !after.is_empty() {
                out.push(after);
            }
        }
        Self(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iv(s: Minutes, e: Minutes) -> Interval {
        Interval::new(s, e)
    }

    fn spans(f: &FreeIntervals) -> Vec<(Minutes, Minutes)> {
        f.iter().map(|i| (i.start, i.end)).collect()
    }

    #[test]
    fn whole_day_when_nothing_is_busy() {
        let f = FreeIntervals::between(540, 1020, &[]);
        assert_eq!(spans(&f), vec![(540, 1020)]);
        assert_eq!(f.total(), 480);
    }

    #[test]
    fn gaps_around_busy_blocks() {
        let f = FreeIntervals::between(540, 1020, &[iv(720, 780)]);
        assert_eq!(spans(&f), vec![(540, 720), (780, 1020)]);
    }

    #[test]
    fn nested_busy_block_does_not_reopen_time() {
        // 09:00-12:00 contains 10:00-11:00
        let f = FreeIntervals::between(480, 780, &[iv(540, 720), iv(600, 660)]);
        assert_eq!(spans(&f), vec![(480, 540), (720, 780)]);
    }

    #[test]
    fn busy_blocks_outside_the_day_are_clipped() {
        let f = FreeIntervals::between(540, 1020, &[iv(420, 600), iv(960, 1200)]);
        assert_eq!(spans(&f), vec![(600, 960)]);
    }

    #[test]
    fn inverted_busy_block_does_not_reopen_time() {
        // 11:00-10:00 followed by 12:00-13:00
        let f = FreeIntervals::between(540, 1020, &[iv(660, 600), iv(720, 780)]);
        assert_eq!(spans(&f), vec![(540, 660), (660, 720), (780, 1020)]);
        let all: Vec<Interval> = f.iter().copied().collect();
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert!(!a.overlaps(b), "{a:?} overlaps {b:?}");
            }
        }
    }

    #[test]
    fn degenerate_window_has_no_free_time() {
        assert!(FreeIntervals::between(1020, 540, &[]).is_empty());
        assert!(FreeIntervals::between(540, 540, &[]).is_empty());
    }

    #[test]
    fn carve_keeps_order_and_drops_empty_leftovers() {
        let f = FreeIntervals::between(540, 1020, &[iv(720, 780)]);

        let g = f.carve(0, iv(600, 660));
        assert_eq!(spans(&g), vec![(540, 600), (660, 720), (780, 1020)]);

        let h = g.carve(0, iv(540, 600));
        assert_eq!(spans(&h), vec![(660, 720), (780, 1020)]);

        // zero-length placement leaves the interval intact
        let z = h.carve(0, iv(660, 660));
        assert_eq!(spans(&z), spans(&h));

        // original list is untouched
        assert_eq!(spans(&f), vec![(540, 720), (780, 1020)]);
    }

    #[test]
    fn overlap_is_half_open() {
        assert!(iv(540, 600).overlaps(&iv(570, 630)));
        assert!(iv(540, 600).overlaps(&iv(540, 600)));
        assert!(!iv(540, 600).overlaps(&iv(600, 660)));
    }
}
