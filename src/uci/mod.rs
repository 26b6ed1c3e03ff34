pub mod options;
pub mod parser;
pub mod r#loop;

pub use options::UciOptions;
pub use parser::{parse_uci_command, UciCommand};
pub use r#loop::{process_uci_line, run_uci_loop, UciEngine, UciState};
