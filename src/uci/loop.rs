//! UCI event loop and state machine.

use std::io::{self, BufRead, Write};
use std::time::Duration;

use super::options::{self, UciOptions};
use super::parser::{parse_uci_command, UciCommand};
use crate::board::{move_to_uci, parse_uci_move, Board, Color};
use crate::book::OpeningBook;
use crate::search::{
    SearchJob, SearchParams, SearchResult, ThreadManager, MATE, MATE_THRESHOLD,
};
use crate::time::TimeManager;

/// Book probing is only worth it early in the game.
const BOOK_MOVE_LIMIT: u16 = 20;

const STOP_GRACE: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UciState {
    Init,
    Ready,
    Thinking,
}

pub struct UciEngine {
    state: UciState,
    board: Board,
    running: bool,
    options: UciOptions,
    thread_mgr: Option<ThreadManager>,
    book: Option<OpeningBook>,
    async_search_active: bool,
}

impl UciEngine {
    pub fn new() -> Self {
        let options = UciOptions::default();
        let thread_mgr = ThreadManager::new(options.threads, options.hash_mb);
        // A missing default book is the normal case; stay quiet about it.
        let book = OpeningBook::load(&options.book_file).ok();
        Self {
            state: UciState::Init,
            board: Board::startpos(),
            running: true,
            options,
            thread_mgr: Some(thread_mgr),
            book,
            async_search_active: false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn handle_command(&mut self, cmd: UciCommand) -> Vec<String> {
        let mut res = Vec::new();
        match cmd {
            UciCommand::Uci => {
                res.push("id name Vipera".to_string());
                res.push("id author the Vipera authors".to_string());
                res.extend(UciOptions::describe());
                res.push("uciok".to_string());
                self.state = UciState::Ready;
            }
            UciCommand::IsReady => {
                res.push("readyok".to_string());
            }
            UciCommand::UciNewGame => {
                self.board = Board::startpos();
                if let Some(tm) = &self.thread_mgr {
                    tm.tt().clear();
                }
                self.state = UciState::Ready;
            }
            UciCommand::Position { fen, moves } => {
                self.handle_position(fen, moves, &mut res);
            }
            UciCommand::Go {
                wtime,
                btime,
                winc,
                binc,
                movetime,
                depth,
                movestogo: _,
                infinite,
            } => {
                self.handle_go(wtime, btime, winc, binc, movetime, depth, infinite, &mut res);
            }
            UciCommand::Stop => {
                self.handle_stop(&mut res);
            }
            UciCommand::SetOption { name, value } => {
                self.handle_setoption(&name, value.as_deref(), &mut res);
            }
            UciCommand::Quit => {
                if let Some(tm) = self.thread_mgr.take() {
                    tm.stop();
                }
                self.running = false;
            }
            UciCommand::Unknown(line) => {
                res.push(format!("info string unknown command: {}", line));
            }
        }
        res
    }

    /// Parse the position into a scratch board and commit only when the
    /// FEN and every move check out, so bad input cannot clobber the
    /// current position.
    fn handle_position(&mut self, fen: Option<String>, moves: Vec<String>, res: &mut Vec<String>) {
        let mut scratch = Board::new();
        let setup = match &fen {
            Some(fen_str) => scratch.set_from_fen(fen_str),
            None => scratch.set_from_fen(crate::board::START_FEN),
        };
        if let Err(err) = setup {
            res.push(format!("info string FEN parse error: {}", err));
            self.state = UciState::Ready;
            return;
        }

        for move_str in &moves {
            match parse_uci_move(&mut scratch, move_str) {
                Ok(mv) => {
                    scratch.make_move(mv);
                }
                Err(err) => {
                    res.push(format!("info string illegal move {}: {}", move_str, err));
                    self.state = UciState::Ready;
                    return;
                }
            }
        }

        self.board = scratch;
        self.state = UciState::Ready;
    }

    #[allow(clippy::too_many_arguments)]
    fn handle_go(
        &mut self,
        wtime: Option<u64>,
        btime: Option<u64>,
        winc: Option<u64>,
        binc: Option<u64>,
        movetime: Option<u64>,
        depth: Option<u8>,
        infinite: bool,
        res: &mut Vec<String>,
    ) {
        if self.state == UciState::Thinking {
            res.push("info string search already running".to_string());
            return;
        }
        let Some(tm) = &self.thread_mgr else {
            res.push("info string no thread manager available".to_string());
            res.push("bestmove 0000".to_string());
            return;
        };

        // Opening book first: a hit answers instantly.
        if !infinite && self.options.own_book && self.board.fullmove <= BOOK_MOVE_LIMIT {
            if let Some(book) = &self.book {
                if let Some(mv) = book.probe(&mut self.board) {
                    res.push(format!("info string book move {}", move_to_uci(mv)));
                    res.push(format!("bestmove {}", move_to_uci(mv)));
                    self.state = UciState::Ready;
                    return;
                }
            }
        }

        let (remaining, increment) = match self.board.side {
            Color::White => (wtime, winc),
            Color::Black => (btime, binc),
        };
        let budget = TimeManager::allocate(remaining, increment, movetime, self.board.fullmove);

        let mut params = SearchParams::new()
            .max_depth(depth.unwrap_or(64).clamp(1, 99))
            .infinite(infinite);
        params = match budget {
            Some(ms) if !infinite => params.time_limit(ms),
            // A bare "go" still has to come back: fall back to the
            // default per-move budget when nothing else bounds it.
            None if depth.is_none() && !infinite => params.time_limit(5000),
            _ => params.time_limit(0),
        };

        let job = SearchJob {
            board: self.board.clone(),
            params,
        };

        if infinite {
            tm.start_async_search(job);
            self.async_search_active = true;
            self.state = UciState::Thinking;
            // bestmove follows the stop command.
        } else {
            let result = tm.submit_job(job);
            res.extend(report_lines(&result));
            self.state = UciState::Ready;
        }
    }

    fn handle_stop(&mut self, res: &mut Vec<String>) {
        if let Some(tm) = &self.thread_mgr {
            tm.stop_current_job();
            if self.async_search_active {
                match tm.collect(STOP_GRACE) {
                    Some(result) => res.extend(report_lines(&result)),
                    None => {
                        res.push("info string search did not stop in time".to_string());
                        res.push("bestmove 0000".to_string());
                    }
                }
                self.async_search_active = false;
            }
        }
        self.state = UciState::Ready;
    }

    fn handle_setoption(&mut self, name: &str, value: Option<&str>, res: &mut Vec<String>) {
        match name {
            "Threads" => match value.and_then(|v| v.parse::<usize>().ok()) {
                Some(n) if (options::THREADS_MIN..=options::THREADS_MAX).contains(&n) => {
                    self.options.threads = n;
                    self.rebuild_thread_mgr();
                    res.push(format!("info string Threads set to {}", n));
                }
                _ => res.push(format!(
                    "info string error: Threads must be between {} and {}",
                    options::THREADS_MIN,
                    options::THREADS_MAX
                )),
            },
            "Hash" => match value.and_then(|v| v.parse::<usize>().ok()) {
                Some(mb) if (options::HASH_MIN..=options::HASH_MAX).contains(&mb) => {
                    self.options.hash_mb = mb;
                    self.rebuild_thread_mgr();
                    res.push(format!("info string Hash set to {} MB", mb));
                }
                _ => res.push(format!(
                    "info string error: Hash must be between {} and {} MB",
                    options::HASH_MIN,
                    options::HASH_MAX
                )),
            },
            "OwnBook" => {
                self.options.own_book =
                    matches!(value, Some("true") | Some("1") | Some("yes") | None);
                res.push(format!(
                    "info string OwnBook set to {}",
                    self.options.own_book
                ));
            }
            "BookFile" => {
                if let Some(path) = value {
                    self.options.book_file = path.to_string();
                    match OpeningBook::load(path) {
                        Ok(book) => {
                            res.push(format!(
                                "info string loaded book {} ({} entries)",
                                path,
                                book.len()
                            ));
                            self.book = Some(book);
                        }
                        Err(err) => {
                            // Soft failure: keep playing without a book.
                            res.push(format!("info string cannot load book {}: {}", path, err));
                            self.book = None;
                        }
                    }
                }
            }
            _ => {
                res.push(format!("info string unknown option: {}", name));
            }
        }
    }

    fn rebuild_thread_mgr(&mut self) {
        if let Some(old) = self.thread_mgr.take() {
            old.stop();
        }
        self.thread_mgr = Some(ThreadManager::new(
            self.options.threads,
            self.options.hash_mb,
        ));
    }
}

impl Default for UciEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a finished search as UCI `info` + `bestmove` lines.
fn report_lines(result: &SearchResult) -> Vec<String> {
    let score = if result.score.abs() >= MATE_THRESHOLD {
        // Plies to mate, reported as full moves with the sign of the
        // winning side.
        let plies = MATE - result.score.abs();
        let mate_in = (plies + 1) / 2;
        if result.score > 0 {
            format!("score mate {}", mate_in.max(1))
        } else {
            format!("score mate -{}", mate_in.max(1))
        }
    } else {
        format!("score cp {}", result.score)
    };

    let mut info = format!(
        "info depth {} {} nodes {} nps {}",
        result.depth_reached, score, result.nodes, result.nps
    );
    if !result.pv.is_empty() {
        let pv: Vec<String> = result.pv.iter().map(|&mv| move_to_uci(mv)).collect();
        info.push_str(&format!(" pv {}", pv.join(" ")));
    }

    vec![info, format!("bestmove {}", move_to_uci(result.best_move))]
}

/// Blocking stdin/stdout loop; the binary's whole life.
pub fn run_uci_loop() -> io::Result<()> {
    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let mut writer = stdout.lock();

    let mut engine = UciEngine::new();
    let mut buf = String::new();

    while engine.is_running() {
        buf.clear();
        if reader.read_line(&mut buf)? == 0 {
            break; // EOF
        }
        let line = buf.trim();
        if line.is_empty() {
            continue;
        }

        for response in engine.handle_command(parse_uci_command(line)) {
            writeln!(writer, "{}", response)?;
        }
        // Flush per command so the GUI sees output immediately.
        writer.flush()?;
    }

    Ok(())
}

/// Drive the engine with a single line; test and tooling entry point.
pub fn process_uci_line(line: &str, engine: &mut UciEngine) -> Vec<String> {
    engine.handle_command(parse_uci_command(line))
}
