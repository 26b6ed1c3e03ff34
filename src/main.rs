//! Vipera UCI chess engine entry point.

fn main() {
    vipera::init();

    if let Err(err) = vipera::uci::run_uci_loop() {
        eprintln!("fatal: {}", err);
        std::process::exit(1);
    }
}
