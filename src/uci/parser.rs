//! UCI command parser.

#[derive(Debug, PartialEq, Eq)]
pub enum UciCommand {
    Uci,
    IsReady,
    SetOption {
        name: String,
        value: Option<String>,
    },
    UciNewGame,
    Position {
        fen: Option<String>,
        moves: Vec<String>,
    },
    Go {
        wtime: Option<u64>,
        btime: Option<u64>,
        winc: Option<u64>,
        binc: Option<u64>,
        movetime: Option<u64>,
        depth: Option<u8>,
        movestogo: Option<u16>,
        infinite: bool,
    },
    Stop,
    Quit,
    Unknown(String),
}

/// Parse one line of UCI input.
pub fn parse_uci_command(line: &str) -> UciCommand {
    let mut tokens = line.split_whitespace();
    let command = match tokens.next() {
        Some(t) => t,
        None => return UciCommand::Unknown(String::new()),
    };

    match command {
        "uci" => UciCommand::Uci,
        "isready" => UciCommand::IsReady,
        "ucinewgame" => UciCommand::UciNewGame,
        "stop" => UciCommand::Stop,
        "quit" => UciCommand::Quit,
        "setoption" => parse_setoption(tokens),
        "position" => parse_position(tokens),
        "go" => parse_go(tokens),
        _ => UciCommand::Unknown(line.trim().to_string()),
    }
}

fn parse_setoption<'a>(tokens: impl Iterator<Item = &'a str>) -> UciCommand {
    // setoption name <name tokens...> [value <value tokens...>]
    let mut name_parts = Vec::new();
    let mut value_parts = Vec::new();
    let mut in_value = false;
    for token in tokens {
        match token {
            "name" if name_parts.is_empty() && !in_value => {}
            "value" if !in_value => in_value = true,
            _ if in_value => value_parts.push(token),
            _ => name_parts.push(token),
        }
    }
    UciCommand::SetOption {
        name: name_parts.join(" "),
        value: if in_value {
            Some(value_parts.join(" "))
        } else {
            None
        },
    }
}

fn parse_position<'a>(mut tokens: impl Iterator<Item = &'a str>) -> UciCommand {
    let fen = match tokens.next() {
        Some("startpos") => {
            // Optional "moves" keyword follows directly.
            let moves = match tokens.next() {
                Some("moves") => tokens.map(str::to_string).collect(),
                _ => Vec::new(),
            };
            return UciCommand::Position { fen: None, moves };
        }
        Some("fen") => {
            let mut fen_parts = Vec::new();
            let mut moves = Vec::new();
            while let Some(token) = tokens.next() {
                if token == "moves" {
                    moves = tokens.by_ref().map(str::to_string).collect();
                    break;
                }
                fen_parts.push(token);
            }
            return UciCommand::Position {
                fen: Some(fen_parts.join(" ")),
                moves,
            };
        }
        other => format!("position {}", other.unwrap_or_default()),
    };
    UciCommand::Unknown(fen)
}

fn parse_go<'a>(mut tokens: impl Iterator<Item = &'a str>) -> UciCommand {
    let mut wtime = None;
    let mut btime = None;
    let mut winc = None;
    let mut binc = None;
    let mut movetime = None;
    let mut depth = None;
    let mut movestogo = None;
    let mut infinite = false;

    while let Some(token) = tokens.next() {
        match token {
            "wtime" => wtime = tokens.next().and_then(|v| v.parse().ok()),
            "btime" => btime = tokens.next().and_then(|v| v.parse().ok()),
            "winc" => winc = tokens.next().and_then(|v| v.parse().ok()),
            "binc" => binc = tokens.next().and_then(|v| v.parse().ok()),
            "movetime" => movetime = tokens.next().and_then(|v| v.parse().ok()),
            "depth" => depth = tokens.next().and_then(|v| v.parse().ok()),
            "movestogo" => movestogo = tokens.next().and_then(|v| v.parse().ok()),
            "infinite" => infinite = true,
            // Unknown go arguments (ponder, nodes, mate, ...) are skipped.
            _ => {}
        }
    }

    UciCommand::Go {
        wtime,
        btime,
        winc,
        binc,
        movetime,
        depth,
        movestogo,
        infinite,
    }
}
