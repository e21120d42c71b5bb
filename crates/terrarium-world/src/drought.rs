//! Regional drought shocks on the resource field.
//!
//! Every `every_years` years a square block of `size x size` cells, placed
//! at a random origin and wrapping across the seams, is held at zero for
//! `duration_ticks` ticks. A new drought never starts while one is active.

use rand::Rng;
use serde::Deserialize;
use tracing::info;

use crate::resource_field::ResourceField;
use crate::sampling;

/// Drought configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DroughtParams {
    /// Whether droughts happen at all.
    pub enabled: bool,
    /// Years between droughts.
    pub every_years: u64,
    /// Side length of the affected block in cells.
    pub size: usize,
    /// Ticks the block stays barren.
    pub duration_ticks: u64,
}

impl Default for DroughtParams {
    fn default() -> Self {
        Self {
            enabled: true,
            every_years: 1500,
            size: 8,
            duration_ticks: 300,
        }
    }
}

/// A drought in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveDrought {
    /// Top-left row of the block.
    pub row: usize,
    /// Top-left column of the block.
    pub col: usize,
    /// Last tick (inclusive) on which the block is zeroed.
    pub until_tick: u64,
}

/// Drought scheduler and mask.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DroughtState {
    active: Option<ActiveDrought>,
}

impl DroughtState {
    /// The drought in progress, if any.
    pub const fn active(&self) -> Option<ActiveDrought> {
        self.active
    }

    /// Whether a drought is due in `year` at `tick`.
    pub fn is_due(&self, params: &DroughtParams, year: u64, tick: u64) -> bool {
        params.enabled
            && year > 0
            && year.checked_rem(params.every_years) == Some(0)
            && self.active.is_none_or(|d| d.until_tick < tick)
    }

    /// Start a drought at a random origin. Returns the new drought.
    pub fn start<R: Rng + ?Sized>(
        &mut self,
        field: &ResourceField,
        params: &DroughtParams,
        tick: u64,
        rng: &mut R,
    ) -> ActiveDrought {
        let row = sampling::index(rng, field.rows()).unwrap_or(0);
        let col = sampling::index(rng, field.cols()).unwrap_or(0);
        let drought = ActiveDrought {
            row,
            col,
            until_tick: tick.saturating_add(params.duration_ticks),
        };
        info!(row, col, until_tick = drought.until_tick, "drought began");
        self.active = Some(drought);
        drought
    }

    /// Zero the affected block if a drought covers `tick`. Expired droughts
    /// are cleared.
    pub fn apply(&mut self, field: &mut ResourceField, params: &DroughtParams, tick: u64) {
        let Some(drought) = self.active else {
            return;
        };
        if tick > drought.until_tick {
            self.active = None;
            return;
        }
        field.zero_region(drought.row, drought.col, params.size);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    #[test]
    fn due_only_on_multiples_of_the_period() {
        let state = DroughtState::default();
        let params = DroughtParams {
            every_years: 3,
            ..DroughtParams::default()
        };
        assert!(!state.is_due(&params, 0, 0));
        assert!(!state.is_due(&params, 2, 20));
        assert!(state.is_due(&params, 3, 30));
        assert!(state.is_due(&params, 6, 60));
    }

    #[test]
    fn disabled_never_due() {
        let params = DroughtParams {
            enabled: false,
            ..DroughtParams::default()
        };
        assert!(!DroughtState::default().is_due(&params, 1500, 15_000));
    }

    #[test]
    fn active_drought_blocks_a_new_one() {
        let mut rng = SmallRng::seed_from_u64(9);
        let field = ResourceField::new(16, 16, 1.0).unwrap();
        let params = DroughtParams {
            every_years: 1,
            duration_ticks: 30,
            ..DroughtParams::default()
        };
        let mut state = DroughtState::default();
        let _ = state.start(&field, &params, 10, &mut rng);
        assert!(!state.is_due(&params, 2, 20));
        assert!(state.is_due(&params, 5, 50));
    }

    #[test]
    fn apply_zeroes_block_until_expiry() {
        let mut rng = SmallRng::seed_from_u64(9);
        let mut field = ResourceField::new(16, 16, 1.0).unwrap();
        field.fill(1.0);
        let params = DroughtParams {
            size: 4,
            duration_ticks: 2,
            ..DroughtParams::default()
        };
        let mut state = DroughtState::default();
        let d = state.start(&field, &params, 5, &mut rng);

        state.apply(&mut field, &params, 6);
        assert_eq!(field.get(d.row, d.col), 0.0);
        assert_eq!(field.get(d.row + 3, d.col + 3), 0.0);
        let zeroed = field.cells().iter().filter(|c| **c == 0.0).count();
        assert_eq!(zeroed, 16);

        field.fill(1.0);
        state.apply(&mut field, &params, 8);
        assert!(state.active().is_none());
        assert!(field.cells().iter().all(|c| *c == 1.0));
    }
}
