//! Perft diagnostic: count legal-move tree leaves and cross-check the
//! totals against shakmaty.

use clap::Parser;
use shakmaty::fen::Fen;
use shakmaty::{Chess, Position};
use vipera::board::{Board, START_FEN};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value_t = String::from(START_FEN))]
    fen: String,
    #[arg(short, long, default_value_t = 4)]
    depth: u8,
}

fn perft_vipera(board: &mut Board, depth: u8) -> u64 {
    if depth == 0 {
        return 1;
    }
    let mut nodes = 0u64;
    for mv in board.generate_moves() {
        let undo = board.make_move(mv);
        nodes += perft_vipera(board, depth - 1);
        board.unmake_move(undo);
    }
    nodes
}

fn perft_shakmaty(pos: &Chess, depth: u8) -> u64 {
    if depth == 0 {
        return 1;
    }
    let mut nodes = 0u64;
    for m in pos.legal_moves() {
        let mut new_pos = pos.clone();
        new_pos.play_unchecked(&m);
        nodes += perft_shakmaty(&new_pos, depth - 1);
    }
    nodes
}

fn main() {
    vipera::init();
    let args = Args::parse();

    println!("perft on '{}' at depth {}", args.fen, args.depth);

    let pos: Chess = if args.fen == START_FEN {
        Chess::default()
    } else {
        let fen: Fen = args.fen.parse().expect("shakmaty rejects this FEN");
        fen.into_position(shakmaty::CastlingMode::Standard)
            .expect("shakmaty rejects this position")
    };
    let start = std::time::Instant::now();
    let nodes_sh = perft_shakmaty(&pos, args.depth);
    let dur_sh = start.elapsed();

    let mut board = Board::new();
    board.set_from_fen(&args.fen).expect("engine rejects this FEN");
    let start = std::time::Instant::now();
    let nodes_vp = perft_vipera(&mut board, args.depth);
    let dur_vp = start.elapsed();

    println!(
        "shakmaty perft({}) = {} nodes ({} ms)",
        args.depth,
        nodes_sh,
        dur_sh.as_millis()
    );
    println!(
        "vipera   perft({}) = {} nodes ({} ms)",
        args.depth,
        nodes_vp,
        dur_vp.as_millis()
    );
    if nodes_sh == nodes_vp {
        println!("counts match");
    } else {
        println!("MISMATCH: difference = {}", nodes_vp as i64 - nodes_sh as i64);
        std::process::exit(1);
    }
}
