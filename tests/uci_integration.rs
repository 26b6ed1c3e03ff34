//! UCI protocol flows driven through the engine state machine.

use vipera::uci::{process_uci_line, UciEngine};

fn engine() -> UciEngine {
    vipera::init();
    UciEngine::new()
}

#[test]
fn handshake() {
    let mut engine = engine();
    let res = process_uci_line("uci", &mut engine);
    assert!(res.iter().any(|l| l.starts_with("id name Vipera")));
    assert!(res.iter().any(|l| l.contains("option name Hash")));
    assert!(res.iter().any(|l| l.contains("option name Threads")));
    assert_eq!(res.last().map(String::as_str), Some("uciok"));

    let res = process_uci_line("isready", &mut engine);
    assert_eq!(res, vec!["readyok".to_string()]);
}

#[test]
fn go_depth_returns_bestmove_and_info() {
    let mut engine = engine();
    process_uci_line("position startpos", &mut engine);
    let res = process_uci_line("go depth 3", &mut engine);

    let info = res.iter().find(|l| l.starts_with("info depth")).unwrap();
    assert!(info.contains("score"), "info line: {info}");
    assert!(info.contains("nodes"), "info line: {info}");
    assert!(info.contains("nps"), "info line: {info}");
    let best = res.iter().find(|l| l.starts_with("bestmove")).unwrap();
    assert_ne!(best.as_str(), "bestmove 0000");
    process_uci_line("quit", &mut engine);
}

#[test]
fn position_with_moves_reaches_the_position() {
    let mut engine = engine();
    process_uci_line("position startpos moves e2e4 e7e5 g1f3", &mut engine);
    let res = process_uci_line("go depth 2", &mut engine);
    assert!(res.iter().any(|l| l.starts_with("bestmove")));
    process_uci_line("quit", &mut engine);
}

#[test]
fn illegal_move_is_reported_and_position_kept() {
    let mut engine = engine();
    process_uci_line("position startpos moves e2e4", &mut engine);

    // e2e5 is not legal; the previous position must survive.
    let res = process_uci_line("position startpos moves e2e5", &mut engine);
    assert!(
        res.iter().any(|l| l.contains("illegal move")),
        "got: {res:?}"
    );

    let res = process_uci_line("go depth 2", &mut engine);
    assert!(res.iter().any(|l| l.starts_with("bestmove")));
    process_uci_line("quit", &mut engine);
}

#[test]
fn bad_fen_is_reported_and_position_kept() {
    let mut engine = engine();
    let res = process_uci_line("position fen not/a/fen w - - 0 1", &mut engine);
    assert!(
        res.iter().any(|l| l.contains("FEN parse error")),
        "got: {res:?}"
    );
    let res = process_uci_line("go depth 2", &mut engine);
    assert!(res.iter().any(|l| l.starts_with("bestmove")));
    process_uci_line("quit", &mut engine);
}

#[test]
fn mate_score_is_reported_as_mate() {
    let mut engine = engine();
    process_uci_line(
        "position fen 6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1",
        &mut engine,
    );
    let res = process_uci_line("go depth 3", &mut engine);
    assert!(
        res.iter().any(|l| l.contains("score mate 1")),
        "got: {res:?}"
    );
    assert!(res.iter().any(|l| l.contains("bestmove a1a8")));
    process_uci_line("quit", &mut engine);
}

#[test]
fn setoption_hash_and_threads_validate() {
    let mut engine = engine();
    let res = process_uci_line("setoption name Threads value 2", &mut engine);
    assert!(res.iter().any(|l| l.contains("Threads set to 2")));

    let res = process_uci_line("setoption name Threads value 0", &mut engine);
    assert!(res.iter().any(|l| l.contains("error")));

    let res = process_uci_line("setoption name Hash value 8", &mut engine);
    assert!(res.iter().any(|l| l.contains("Hash set to 8")));

    let res = process_uci_line("setoption name Hash value 99999", &mut engine);
    assert!(res.iter().any(|l| l.contains("error")));
    process_uci_line("quit", &mut engine);
}

#[test]
fn ucinewgame_resets_cleanly() {
    let mut engine = engine();
    process_uci_line("position startpos moves e2e4 e7e5", &mut engine);
    process_uci_line("ucinewgame", &mut engine);
    let res = process_uci_line("go depth 2", &mut engine);
    assert!(res.iter().any(|l| l.starts_with("bestmove")));
    process_uci_line("quit", &mut engine);
}

#[test]
fn stalemate_position_returns_null_move() {
    let mut engine = engine();
    process_uci_line("position fen 7k/5Q2/6K1/8/8/8/8/8 b - - 0 1", &mut engine);
    let res = process_uci_line("go depth 2", &mut engine);
    assert!(
        res.iter().any(|l| l.starts_with("bestmove 0000")),
        "got: {res:?}"
    );
    process_uci_line("quit", &mut engine);
}
