//! World clock: ticks and simulated years.
//!
//! The tick counter is the single source of truth for temporal state. The
//! year is derived from it and never stored. A tick is a year boundary when
//! it is a positive multiple of the year length; yearly rules run on that
//! tick and see the number of years completed so far.

/// Errors that can occur during clock operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClockError {
    /// Tick counter would overflow.
    #[error("tick counter overflow: cannot advance beyond u64::MAX")]
    TickOverflow,

    /// Invalid time configuration (zero ticks per year).
    #[error("invalid time configuration: {reason}")]
    InvalidConfig {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

/// World clock tracking ticks and years.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldClock {
    /// Ticks executed so far (incremented at the start of each tick).
    tick: u64,

    /// Ticks per simulated year.
    year_ticks: u64,
}

impl WorldClock {
    /// A clock at tick 0.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidConfig`] if `year_ticks` is zero.
    pub fn new(year_ticks: u64) -> Result<Self, ClockError> {
        if year_ticks == 0 {
            return Err(ClockError::InvalidConfig {
                reason: "year_ticks must be at least 1".to_owned(),
            });
        }
        Ok(Self {
            tick: 0,
            year_ticks,
        })
    }

    /// Advance by one tick and return the new tick number.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::TickOverflow`] if the counter is exhausted.
    pub fn advance(&mut self) -> Result<u64, ClockError> {
        self.tick = self.tick.checked_add(1).ok_or(ClockError::TickOverflow)?;
        Ok(self.tick)
    }

    /// Current tick.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Ticks per year.
    pub const fn year_ticks(&self) -> u64 {
        self.year_ticks
    }

    /// Completed years.
    pub const fn year(&self) -> u64 {
        match self.tick.checked_div(self.year_ticks) {
            Some(year) => year,
            None => 0,
        }
    }

    /// Whether the current tick closes a year.
    pub const fn is_year_boundary(&self) -> bool {
        self.tick > 0 && matches!(self.tick.checked_rem(self.year_ticks), Some(0))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn zero_year_length_is_rejected() {
        assert!(matches!(
            WorldClock::new(0),
            Err(ClockError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn years_follow_ticks() {
        let mut clock = WorldClock::new(10).unwrap();
        assert_eq!(clock.year(), 0);
        assert!(!clock.is_year_boundary());
        let mut boundaries = Vec::new();
        for _ in 0..25 {
            let tick = clock.advance().unwrap();
            if clock.is_year_boundary() {
                boundaries.push((tick, clock.year()));
            }
        }
        assert_eq!(boundaries, vec![(10, 1), (20, 2)]);
        assert_eq!(clock.tick(), 25);
        assert_eq!(clock.year(), 2);
    }

    #[test]
    fn overflow_is_reported() {
        let mut clock = WorldClock {
            tick: u64::MAX,
            year_ticks: 10,
        };
        assert_eq!(clock.advance(), Err(ClockError::TickOverflow));
        assert_eq!(clock.tick(), u64::MAX);
    }
}
