//! Lazy-SMP behavior: parallel searches stay legal, async searches stop.

use std::time::Duration;

use vipera::board::{Board, MOVE_NONE};
use vipera::search::{SearchJob, SearchParams, ThreadManager};
use vipera::uci::{process_uci_line, UciEngine};

#[test]
fn four_workers_return_a_legal_root_move() {
    vipera::init();
    let manager = ThreadManager::new(4, 16);

    let fens = [
        vipera::START_FEN,
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
    ];
    for fen in fens {
        let mut root = Board::new();
        root.set_from_fen(fen).unwrap();

        let job = SearchJob {
            board: root.clone(),
            params: SearchParams::new().max_depth(4).time_limit(0),
        };
        let result = manager.submit_job(job);

        assert!(
            root.generate_moves().contains(&result.best_move),
            "{fen}: {} is not legal at the root",
            vipera::move_to_uci(result.best_move)
        );
    }
    manager.stop();
}

#[test]
fn single_and_multi_thread_both_answer() {
    // Lazy SMP is non-deterministic; both configurations must simply
    // produce a legal answer without hanging.
    vipera::init();
    for threads in [1, 4] {
        let manager = ThreadManager::new(threads, 16);
        let job = SearchJob {
            board: Board::startpos(),
            params: SearchParams::new().max_depth(5).time_limit(0),
        };
        let result = manager.submit_job(job);
        assert_ne!(result.best_move, MOVE_NONE, "{threads} threads");
        assert!(result.depth_reached >= 5, "{threads} threads");
        manager.stop();
    }
}

#[test]
fn repeated_async_stop_cycles() {
    vipera::init();
    let mut engine = UciEngine::new();
    process_uci_line("setoption name Threads value 4", &mut engine);
    process_uci_line("position startpos", &mut engine);

    for i in 0..5 {
        let res = process_uci_line("go infinite", &mut engine);
        assert!(
            !res.iter().any(|l| l.starts_with("bestmove")),
            "go infinite must not answer immediately"
        );
        std::thread::sleep(Duration::from_millis(20 + i * 20));
        let res = process_uci_line("stop", &mut engine);
        assert!(
            res.iter().any(|l| l.starts_with("bestmove")),
            "stop cycle {i} produced no bestmove: {res:?}"
        );
    }
    process_uci_line("quit", &mut engine);
}

#[test]
fn shared_tt_survives_consecutive_jobs() {
    vipera::init();
    let manager = ThreadManager::new(2, 1);
    for _ in 0..3 {
        let job = SearchJob {
            board: Board::startpos(),
            params: SearchParams::new().max_depth(4).time_limit(0),
        };
        let result = manager.submit_job(job);
        assert_ne!(result.best_move, MOVE_NONE);
    }
    // The table keeps entries across jobs; later searches reuse them.
    assert!(manager.tt().hashfull() > 0);
    manager.stop();
}
