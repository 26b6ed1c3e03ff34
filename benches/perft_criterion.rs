//! Criterion benchmarks for move generation and search throughput.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use vipera::board::{Board, START_FEN};
use vipera::search::{Search, SearchParams};

const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

fn perft(board: &mut Board, depth: u8) -> u64 {
    if depth == 0 {
        return 1;
    }
    let mut nodes = 0u64;
    for mv in board.generate_moves() {
        let undo = board.make_move(mv);
        nodes += perft(board, depth - 1);
        board.unmake_move(undo);
    }
    nodes
}

fn bench_perft(c: &mut Criterion) {
    vipera::init();
    let mut group = c.benchmark_group("perft");

    for (name, fen, depth, nodes) in [
        ("startpos", START_FEN, 3u8, 8_902u64),
        ("startpos", START_FEN, 4, 197_281),
        ("kiwipete", KIWIPETE, 3, 97_862),
    ] {
        group.throughput(Throughput::Elements(nodes));
        group.bench_with_input(
            BenchmarkId::new(name, depth),
            &(fen, depth),
            |b, &(fen, depth)| {
                let mut board = Board::new();
                board.set_from_fen(fen).unwrap();
                b.iter(|| black_box(perft(&mut board, depth)));
            },
        );
    }
    group.finish();
}

fn bench_search(c: &mut Criterion) {
    vipera::init();
    let mut group = c.benchmark_group("search");
    group.sample_size(10);

    group.bench_function("startpos_depth_5", |b| {
        b.iter(|| {
            let params = SearchParams::new().max_depth(5).time_limit(0);
            let mut search = Search::new(Board::startpos(), 16, params);
            black_box(search.search())
        });
    });
    group.finish();
}

criterion_group!(benches, bench_perft, bench_search);
criterion_main!(benches);
