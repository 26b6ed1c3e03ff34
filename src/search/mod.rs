//! Search engine: iterative-deepening alpha-beta over a shared
//! transposition table, with Lazy-SMP parallelism.
//!
//! - `params`: search budgets and the result struct
//! - `stats`: per-search counters
//! - `tt`: lock-free transposition table
//! - `search`: the single-threaded searcher
//! - `thread_mgr`: the Lazy-SMP worker pool

pub mod params;
pub mod search;
pub mod stats;
pub mod thread_mgr;
pub mod tt;

pub use self::params::{SearchParams, SearchResult};
pub use self::search::{Search, INFINITE, MATE, MATE_THRESHOLD};
pub use self::stats::SearchStats;
pub use self::thread_mgr::{SearchJob, ThreadManager};
pub use self::tt::TranspositionTable;
