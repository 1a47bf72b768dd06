//! Shared status record and running totals.
//!
//! A single mutex guards both the latest `AssemblyInfo` and the counters so
//! a reader always observes a consistent pair; no caller holds the lock
//! across segmentation, display, or publish work.

use std::sync::Mutex;

use crate::data::{AssemblyInfo, Counters, PartRect};

#[derive(Default)]
pub struct StatusStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    info: AssemblyInfo,
    totals: Counters,
}

impl StatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one classification result into the record and apply the
    /// counter increments signalled by the edge-triggered flags.
    pub fn update(&self, info: AssemblyInfo) {
        let mut inner = self.inner.lock().expect("status lock poisoned");
        inner.info.defect = info.defect;
        inner.info.show = info.show;
        inner.info.area = info.area;
        inner.info.rect = info.rect;
        if info.inc_total {
            inner.totals.total_parts += 1;
        }
        if info.defect {
            inner.totals.total_defects += 1;
        }
    }

    /// Consistent snapshot of the latest record and the totals.
    pub fn read(&self) -> (AssemblyInfo, Counters) {
        let inner = self.inner.lock().expect("status lock poisoned");
        (inner.info, inner.totals)
    }

    /// Clear the latest record once nothing is being observed any more.
    /// The sustained `show` flag and the totals survive.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().expect("status lock poisoned");
        inner.info.defect = false;
        inner.info.area = 0;
        inner.info.inc_total = false;
        inner.info.rect = PartRect::default();
    }
}
