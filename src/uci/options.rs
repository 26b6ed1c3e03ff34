//! UCI options the engine advertises and honors.

#[derive(Debug, Clone)]
pub struct UciOptions {
    /// Transposition table size in MB.
    pub hash_mb: usize,

    /// Number of Lazy-SMP workers.
    pub threads: usize,

    /// Consult the opening book before searching.
    pub own_book: bool,

    /// Polyglot-format book file path.
    pub book_file: String,
}

pub const HASH_MIN: usize = 1;
pub const HASH_MAX: usize = 4096;
pub const THREADS_MIN: usize = 1;
pub const THREADS_MAX: usize = 256;

impl Default for UciOptions {
    fn default() -> Self {
        Self {
            hash_mb: 16,
            threads: 1,
            own_book: true,
            book_file: "book.bin".to_string(),
        }
    }
}

impl UciOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// The `option name ...` lines announced in response to `uci`.
    pub fn describe() -> Vec<String> {
        vec![
            format!("option name Hash type spin default 16 min {HASH_MIN} max {HASH_MAX}"),
            format!("option name Threads type spin default 1 min {THREADS_MIN} max {THREADS_MAX}"),
            "option name OwnBook type check default true".to_string(),
            "option name BookFile type string default book.bin".to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = UciOptions::new();
        assert_eq!(options.hash_mb, 16);
        assert_eq!(options.threads, 1);
        assert!(options.own_book);
        assert_eq!(options.book_file, "book.bin");
    }

    #[test]
    fn describe_lists_every_option() {
        let lines = UciOptions::describe();
        for name in ["Hash", "Threads", "OwnBook", "BookFile"] {
            assert!(lines.iter().any(|l| l.contains(name)), "{name} missing");
        }
    }
}
