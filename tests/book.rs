//! Opening book: file parsing, weighted probing, soft failure modes.

use std::fs;
use std::path::PathBuf;

use vipera::board::Board;
use vipera::book::{encode_book_move, OpeningBook};

fn scratch_file(name: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("vipera-book-test-{}-{}", std::process::id(), name));
    path
}

fn entry_bytes(key: u64, raw_move: u16, weight: u16) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(16);
    bytes.extend_from_slice(&key.to_be_bytes());
    bytes.extend_from_slice(&raw_move.to_be_bytes());
    bytes.extend_from_slice(&weight.to_be_bytes());
    bytes.extend_from_slice(&0u32.to_be_bytes()); // learn field
    bytes
}

#[test]
fn probe_returns_a_stored_legal_move() {
    vipera::init();
    let mut board = Board::startpos();
    let e2e4 = vipera::new_move(12, 28, None);
    let d2d4 = vipera::new_move(11, 27, None);

    let mut bytes = entry_bytes(board.zobrist_key(), encode_book_move(e2e4), 3);
    bytes.extend(entry_bytes(board.zobrist_key(), encode_book_move(d2d4), 1));

    let path = scratch_file("probe");
    fs::write(&path, &bytes).unwrap();
    let book = OpeningBook::load(path.to_str().unwrap()).unwrap();
    fs::remove_file(&path).ok();

    assert_eq!(book.len(), 2);
    for _ in 0..20 {
        let mv = book.probe(&mut board).expect("startpos is in the book");
        assert!(mv == e2e4 || mv == d2d4);
    }
}

#[test]
fn probe_misses_unknown_positions() {
    vipera::init();
    let mut board = Board::startpos();
    let path = scratch_file("miss");
    fs::write(&path, entry_bytes(0xDEAD_BEEF, 796, 1)).unwrap();
    let book = OpeningBook::load(path.to_str().unwrap()).unwrap();
    fs::remove_file(&path).ok();

    assert!(book.probe(&mut board).is_none());
}

#[test]
fn illegal_book_moves_are_ignored() {
    vipera::init();
    let mut board = Board::startpos();
    // a1a8 is stored under the right key but is not legal at startpos.
    let bogus = vipera::new_move(0, 56, None);
    let path = scratch_file("illegal");
    fs::write(
        &path,
        entry_bytes(board.zobrist_key(), encode_book_move(bogus), 5),
    )
    .unwrap();
    let book = OpeningBook::load(path.to_str().unwrap()).unwrap();
    fs::remove_file(&path).ok();

    assert!(book.probe(&mut board).is_none());
}

#[test]
fn truncated_file_is_rejected() {
    let path = scratch_file("truncated");
    fs::write(&path, [0u8; 10]).unwrap();
    let err = OpeningBook::load(path.to_str().unwrap());
    fs::remove_file(&path).ok();
    assert!(err.is_err());
}

#[test]
fn missing_file_is_an_io_error() {
    assert!(OpeningBook::load("/nonexistent/book.bin").is_err());
}

#[test]
fn empty_file_holds_no_entries() {
    let path = scratch_file("empty");
    fs::write(&path, []).unwrap();
    let err = OpeningBook::load(path.to_str().unwrap());
    fs::remove_file(&path).ok();
    assert!(err.is_err());
}
