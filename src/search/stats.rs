//! Search statistics: node counts, table hits, cutoffs and timing.

use std::time::{Duration, Instant};

#[derive(Debug, Default, Clone)]
pub struct SearchStats {
    /// Total nodes searched, quiescence included.
    pub nodes: u64,

    /// Quiescence nodes.
    pub qnodes: u64,

    /// Transposition table hits.
    pub tt_hits: u64,

    /// Beta cutoffs.
    pub cutoffs: u64,

    /// Null-move cutoffs.
    pub null_cutoffs: u64,

    pub start_time: Option<Instant>,
    pub search_time: Duration,

    /// Nodes per second over the last search.
    pub nps: u64,
}

impl SearchStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_timing(&mut self) {
        self.start_time = Some(Instant::now());
    }

    pub fn update_timing(&mut self) {
        if let Some(start) = self.start_time {
            self.search_time = start.elapsed();
            let millis = self.search_time.as_millis() as u64;
            if millis > 0 {
                self.nps = self.nodes * 1000 / millis;
            }
        }
    }

    #[inline]
    pub fn inc_node(&mut self) {
        self.nodes += 1;
    }

    #[inline]
    pub fn inc_qnode(&mut self) {
        self.qnodes += 1;
    }

    #[inline]
    pub fn inc_tt_hit(&mut self) {
        self.tt_hits += 1;
    }

    #[inline]
    pub fn inc_cutoff(&mut self) {
        self.cutoffs += 1;
    }

    #[inline]
    pub fn inc_null_cutoff(&mut self) {
        self.null_cutoffs += 1;
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
