//! Wall-clock budget allocation for timed searches.

pub struct TimeManager;

impl TimeManager {
    /// Milliseconds to spend on the current move, or None when nothing
    /// constrains the clock (depth-limited and infinite searches).
    ///
    /// With a running clock the budget is
    /// `min(remaining/30, remaining*0.05 + increment*0.8)` scaled by a
    /// game-phase factor: conservative in the opening, generous once the
    /// position has simplified.
    pub fn allocate(
        remaining_ms: Option<u64>,
        increment_ms: Option<u64>,
        movetime_ms: Option<u64>,
        move_number: u16,
    ) -> Option<u64> {
        if let Some(movetime) = movetime_ms {
            return Some(movetime);
        }
        let remaining = remaining_ms?;
        let increment = increment_ms.unwrap_or(0);

        let factor = if move_number < 10 {
            80
        } else if move_number < 30 {
            100
        } else {
            120
        };

        let base = (remaining / 30).min(remaining / 20 + increment * 8 / 10);
        Some((base * factor / 100).max(10))
    }
}

#[cfg(test)]
mod tests {
    use super::TimeManager;

    #[test]
    fn movetime_wins_over_clock() {
        assert_eq!(
            TimeManager::allocate(Some(60_000), Some(1_000), Some(250), 5),
            Some(250)
        );
    }

    #[test]
    fn no_constraints_means_no_budget() {
        assert_eq!(TimeManager::allocate(None, None, None, 1), None);
    }

    #[test]
    fn opening_budget_is_trimmed() {
        // 60s remaining, no increment: base = min(2000, 3000) = 2000
        let opening = TimeManager::allocate(Some(60_000), None, None, 5).unwrap();
        let endgame = TimeManager::allocate(Some(60_000), None, None, 40).unwrap();
        assert_eq!(opening, 1600); // 2000 * 0.8
        assert_eq!(endgame, 2400); // 2000 * 1.2
    }

    #[test]
    fn increment_raises_the_cap() {
        // 3s remaining, 2s increment: min(100, 150 + 1600) = 100ms
        assert_eq!(
            TimeManager::allocate(Some(3_000), Some(2_000), None, 20),
            Some(100)
        );
    }

    #[test]
    fn floor_keeps_the_engine_moving() {
        assert_eq!(TimeManager::allocate(Some(60), None, None, 50), Some(10));
    }
}
