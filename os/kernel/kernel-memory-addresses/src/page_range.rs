//! Lazy ranges over frames and pages.
//!
//! Both range kinds are plain values: cloning one restarts the walk. Stepping
//! is done by [`PageStep`], which refuses to produce an address the target
//! address space cannot represent. A refused successor ends the iteration.

use crate::sealed::Sealed;
use crate::{PhysicalPage, VirtualPage};
use core::fmt;
use core::iter::FusedIterator;

/// Successor/predecessor for frame and page types.
pub trait PageStep: Sealed + Copy + Ord {
    /// The next unit, `None` if it is not representable.
    fn forward(self) -> Option<Self>;
    /// The previous unit, `None` if it is not representable.
    fn backward(self) -> Option<Self>;
}

/// Half-open range `[start, end)`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageRange<P: PageStep> {
    /// First unit yielded.
    pub start: P,
    /// First unit not yielded.
    pub end: P,
}

impl<P: PageStep> PageRange<P> {
    #[inline]
    #[must_use]
    pub const fn new(start: P, end: P) -> Self {
        Self { start, end }
    }

    /// `true` once `start >= end`.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

impl<P: PageStep> Iterator for PageRange<P> {
    type Item = P;

    fn next(&mut self) -> Option<P> {
        if self.is_empty() {
            return None;
        }

        let current = self.start;
        self.start = current.forward().unwrap_or(self.end);
        Some(current)
    }
}

impl<P: PageStep> DoubleEndedIterator for PageRange<P> {
    fn next_back(&mut self) -> Option<P> {
        if self.is_empty() {
            return None;
        }

        match self.end.backward() {
            Some(last) => {
                self.end = last;
                Some(last)
            }
            None => {
                self.end = self.start;
                None
            }
        }
    }
}

impl<P: PageStep> FusedIterator for PageRange<P> {}

impl<P: PageStep + fmt::Debug> fmt::Debug for PageRange<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageRange")
            .field("start", &self.start)
            .field("end", &self.end)
            .finish()
    }
}

/// Closed range `[start, end]`.
///
/// Once the final unit has been yielded the range stays empty even though
/// `start == end`, which avoids computing a successor past the top of the
/// address space.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageRangeInclusive<P: PageStep> {
    start: P,
    end: P,
    exhausted: bool,
}

impl<P: PageStep> PageRangeInclusive<P> {
    #[inline]
    #[must_use]
    pub const fn new(start: P, end: P) -> Self {
        Self {
            start,
            end,
            exhausted: false,
        }
    }

    /// Next unit to be yielded from the front.
    #[inline]
    #[must_use]
    pub const fn start(&self) -> P {
        self.start
    }

    /// Last unit to be yielded.
    #[inline]
    #[must_use]
    pub const fn end(&self) -> P {
        self.end
    }

    /// `true` once `start > end` or the final unit has been yielded.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exhausted || self.start > self.end
    }
}

impl<P: PageStep> Iterator for PageRangeInclusive<P> {
    type Item = P;

    fn next(&mut self) -> Option<P> {
        if self.is_empty() {
            return None;
        }

        let current = self.start;
        if current == self.end {
            self.exhausted = true;
        } else {
            match current.forward() {
                Some(next) => self.start = next,
                None => self.exhausted = true,
            }
        }
        Some(current)
    }
}

impl<P: PageStep> DoubleEndedIterator for PageRangeInclusive<P> {
    fn next_back(&mut self) -> Option<P> {
        if self.is_empty() {
            return None;
        }

        let current = self.end;
        if current == self.start {
            self.exhausted = true;
        } else {
            match current.backward() {
                Some(prev) => self.end = prev,
                None => self.exhausted = true,
            }
        }
        Some(current)
    }
}

impl<P: PageStep> FusedIterator for PageRangeInclusive<P> {}

impl<P: PageStep + fmt::Debug> fmt::Debug for PageRangeInclusive<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageRangeInclusive")
            .field("start", &self.start)
            .field("end", &self.end)
            .field("exhausted", &self.exhausted)
            .finish()
    }
}

/// `[start, end)` over physical frames of size `S`.
pub type PhysicalPageRange<S> = PageRange<PhysicalPage<S>>;
/// `[start, end]` over physical frames of size `S`.
pub type PhysicalPageRangeInclusive<S> = PageRangeInclusive<PhysicalPage<S>>;
/// `[start, end)` over virtual pages of size `S`.
pub type VirtualPageRange<S> = PageRange<VirtualPage<S>>;
/// `[start, end]` over virtual pages of size `S`.
pub type VirtualPageRangeInclusive<S> = PageRangeInclusive<VirtualPage<S>>;
