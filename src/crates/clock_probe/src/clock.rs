use serde::Serialize;

/// Whether replay may continue after a probed move was charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockVerdict {
    Continue,
    Forfeit,
}

/// Simulated clock of the probed side.
///
/// Remaining time is allowed to go negative; that is the forfeit condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClockState {
    remaining_ms: i64,
    increment_ms: i64,
    probed_plies: u32,
    forfeited: bool,
}

impl ClockState {
    pub fn new(initial_time_ms: i64, increment_ms: i64) -> Self {
        Self {
            remaining_ms: initial_time_ms,
            increment_ms,
            probed_plies: 0,
            forfeited: false,
        }
    }

    pub fn remaining_ms(&self) -> i64 {
        self.remaining_ms
    }

    pub fn increment_ms(&self) -> i64 {
        self.increment_ms
    }

    /// Number of probed moves charged so far.
    pub fn probed_plies(&self) -> u32 {
        self.probed_plies
    }

    pub fn is_forfeited(&self) -> bool {
        self.forfeited
    }

    /// Charge one probed move.
    ///
    /// The full allocation is deducted and the increment credited straight back,
    /// so a zero increment charges the allocation as is.
    pub fn charge(&mut self, allocated_ms: i64) -> ClockVerdict {
        let net = allocated_ms.saturating_sub(self.increment_ms);
        self.remaining_ms = self.remaining_ms.saturating_sub(net);
        self.probed_plies += 1;
        if self.remaining_ms < 0 {
            self.forfeited = true;
            ClockVerdict::Forfeit
        } else {
            ClockVerdict::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_increment_charges_allocation() {
        let mut clock = ClockState::new(10_000, 0);
        assert_eq!(clock.charge(500), ClockVerdict::Continue);
        assert_eq!(clock.remaining_ms(), 9_500);
        assert_eq!(clock.probed_plies(), 1);
    }

    #[test]
    fn forfeits_once_cumulative_allocation_exceeds_budget() {
        let allocations = [300, 400, 299, 2];
        let mut clock = ClockState::new(1_000, 0);
        let mut spent = 0;
        for allocation in allocations {
            spent += allocation;
            let verdict = clock.charge(allocation);
            assert_eq!(verdict == ClockVerdict::Forfeit, spent > 1_000);
        }
        assert_eq!(clock.remaining_ms(), -1);
        assert!(clock.is_forfeited());
    }

    #[test]
    fn exact_budget_is_not_forfeit() {
        let mut clock = ClockState::new(1_000, 0);
        assert_eq!(clock.charge(1_000), ClockVerdict::Continue);
        assert_eq!(clock.remaining_ms(), 0);
    }

    #[test]
    fn overspend_goes_negative() {
        let mut clock = ClockState::new(1_000, 0);
        assert_eq!(clock.charge(1_500), ClockVerdict::Forfeit);
        assert_eq!(clock.remaining_ms(), -500);
    }

    #[test]
    fn increment_is_credited_per_move() {
        let mut clock = ClockState::new(5_000, 100);
        assert_eq!(clock.charge(300), ClockVerdict::Continue);
        assert_eq!(clock.remaining_ms(), 4_800);

        let before = clock.remaining_ms();
        clock.charge(40);
        assert_eq!(clock.remaining_ms(), before - 40 + 100);
    }

    #[test]
    fn remaining_never_exceeds_initial_plus_increments() {
        let mut clock = ClockState::new(2_000, 250);
        for allocation in [0, 10, 250, 400, 0, 90] {
            clock.charge(allocation);
            let bound = 2_000 + 250 * i64::from(clock.probed_plies());
            assert!(clock.remaining_ms() <= bound);
        }
    }
}
