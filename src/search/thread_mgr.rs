//! Lazy-SMP thread manager.
//!
//! A pool of persistent workers all search the same root position, sharing
//! only the lock-free transposition table. Divergence comes from a depth
//! offset on odd workers and a per-worker move-ordering jitter. The first
//! worker to finish raises the job stop flag; the rest observe it between
//! nodes and return their best completed result. The manager keeps the
//! answer with the greatest completed depth, ties broken by score.

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::thread;
use std::time::Duration;

use super::params::{SearchParams, SearchResult};
use super::search::{Search, MAX_PLY};
use super::tt::TranspositionTable;
use crate::board::Board;

/// One root search, broadcast to every worker.
#[derive(Clone)]
pub struct SearchJob {
    pub board: Board,
    pub params: SearchParams,
}

const POLL_INTERVAL: Duration = Duration::from_millis(5);
const JOB_TIMEOUT: Duration = Duration::from_secs(600);

struct Shared {
    shutdown: AtomicBool,
    /// Stop flag for the job in flight; handed to every worker's search.
    job_stop: Arc<AtomicBool>,
    /// Bumped once per submitted job; workers run each job exactly once.
    job_generation: AtomicUsize,
    workers_done: AtomicUsize,
    current_job: Mutex<Option<SearchJob>>,
    results: Mutex<Vec<Option<SearchResult>>>,
}

pub struct ThreadManager {
    workers: Vec<thread::JoinHandle<()>>,
    num_threads: usize,
    tt: Arc<TranspositionTable>,
    shared: Arc<Shared>,
}

impl ThreadManager {
    pub fn new(num_threads: usize, tt_mb: usize) -> Self {
        let num_threads = num_threads.max(1);
        let tt = Arc::new(TranspositionTable::new(tt_mb));
        let shared = Arc::new(Shared {
            shutdown: AtomicBool::new(false),
            job_stop: Arc::new(AtomicBool::new(false)),
            job_generation: AtomicUsize::new(0),
            workers_done: AtomicUsize::new(0),
            current_job: Mutex::new(None),
            results: Mutex::new(vec![None; num_threads]),
        });

        let workers = (0..num_threads)
            .map(|worker_id| {
                let shared = shared.clone();
                let tt = tt.clone();
                thread::spawn(move || worker_loop(worker_id, shared, tt))
            })
            .collect();

        ThreadManager { workers, num_threads, tt, shared }
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    pub fn tt(&self) -> &Arc<TranspositionTable> {
        &self.tt
    }

    /// Run one search on all workers and block for the combined result.
    pub fn submit_job(&self, job: SearchJob) -> SearchResult {
        self.broadcast(job);
        self.collect(JOB_TIMEOUT).unwrap_or_default()
    }

    /// Start a search without blocking ("go infinite"); pair with
    /// `stop_current_job` + `collect` from the caller.
    pub fn start_async_search(&self, job: SearchJob) {
        self.broadcast(job);
    }

    /// Raise the stop flag for the running job.
    pub fn stop_current_job(&self) {
        self.shared.job_stop.store(true, Ordering::Release);
    }

    /// Wait until every worker has reported, then merge the results.
    /// None when the timeout expires with workers still searching.
    pub fn collect(&self, timeout: Duration) -> Option<SearchResult> {
        let start = std::time::Instant::now();
        while self.shared.workers_done.load(Ordering::Acquire) < self.num_threads {
            if start.elapsed() > timeout {
                return None;
            }
            thread::sleep(POLL_INTERVAL);
        }

        let results = self
            .shared
            .results
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        results
            .iter()
            .flatten()
            .max_by_key(|result| (result.depth_reached, result.score))
            .cloned()
    }

    fn broadcast(&self, job: SearchJob) {
        {
            let mut results = self
                .shared
                .results
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            results.iter_mut().for_each(|slot| *slot = None);
        }
        self.shared.workers_done.store(0, Ordering::Release);
        self.shared.job_stop.store(false, Ordering::Release);
        {
            let mut slot = self
                .shared
                .current_job
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            *slot = Some(job);
        }
        self.shared.job_generation.fetch_add(1, Ordering::Release);
    }

    /// Shut the pool down and join every worker.
    pub fn stop(self) {
        self.shared.shutdown.store(true, Ordering::Release);
        self.shared.job_stop.store(true, Ordering::Release);
        for worker in self.workers {
            let _ = worker.join();
        }
    }
}

fn worker_loop(worker_id: usize, shared: Arc<Shared>, tt: Arc<TranspositionTable>) {
    let mut seen_generation = 0usize;

    loop {
        if shared.shutdown.load(Ordering::Acquire) {
            break;
        }
        let generation = shared.job_generation.load(Ordering::Acquire);
        if generation == seen_generation {
            thread::sleep(POLL_INTERVAL);
            continue;
        }
        seen_generation = generation;

        let job = {
            let slot = shared
                .current_job
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            slot.clone()
        };
        let Some(SearchJob { board, mut params }) = job else {
            continue;
        };

        // Odd workers search one ply deeper; everyone past worker 0 gets
        // a distinct ordering perturbation.
        params.max_depth = params
            .max_depth
            .saturating_add((worker_id % 2) as u8)
            .min(MAX_PLY as u8 - 1);
        let seed = if worker_id == 0 {
            0
        } else {
            (worker_id as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15)
        };

        let mut search = Search::with_tt(board, tt.clone(), params)
            .with_stop_flag(shared.job_stop.clone())
            .with_ordering_seed(seed);
        let result = search.search();

        {
            let mut results = shared
                .results
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            results[worker_id] = Some(result);
        }

        // First finisher stops the stragglers.
        shared.job_stop.store(true, Ordering::Release);
        shared.workers_done.fetch_add(1, Ordering::AcqRel);
    }
}
