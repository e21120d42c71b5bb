//! The 2D biomass grid grazed by herbivores and harvested by social actors.
//!
//! A [`ResourceField`] is a `rows x cols` grid of values in `[0, 1]` laid
//! over the torus. Continuous positions map to cells by integer division by
//! `cell_size`, wrapped toroidally.
//!
//! # Growth pass
//!
//! [`ResourceField::grow`] runs three steps in order:
//!
//! 1. Local growth. In the photosynthetic model every cell gains
//!    `r_max * lim * x * (1 - x) * dt` and loses `k * (1 - light) * x * dt`,
//!    where `lim` is the product of light, nutrient, and water factors. In
//!    the logistic model the gain is `r_max * x * (1 - x) * dt` with no
//!    coupling to the environment.
//! 2. Diffusion. Every cell moves `min(1, spread * dt)` of the way toward
//!    the mean of its four toroidal neighbours. All reads come from the
//!    pre-diffusion buffer and all writes go to a second buffer, which is
//!    swapped in afterwards.
//! 3. Gas exchange (photosynthetic model only). Mean biomass drives oxygen
//!    up and carbon dioxide down in light, with the reverse in the dark.
//!    Nutrients drop in proportion to photosynthesis plus a constant leak.

use glam::DVec2;
use rand::Rng;
use serde::Deserialize;
use terrarium_types::FieldView;

use crate::environment::Environment;
use crate::error::WorldError;
use crate::sampling;
use crate::torus::Torus;

/// How cells grow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthModel {
    /// Light, nutrient, and water limited growth with dark respiration and
    /// gas exchange into the environment.
    Photosynthetic,
    /// Plain logistic regrowth, decoupled from the environment.
    Logistic,
}

/// Tunable rates of the resource field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FieldParams {
    /// Side length of one cell in world units.
    pub cell_size: f64,
    /// Growth model.
    pub growth_model: GrowthModel,
    /// Maximum growth rate per unit time.
    pub r_max: f64,
    /// Dark respiration rate.
    pub dark_respiration: f64,
    /// Diffusion rate toward the neighbour mean.
    pub diffusion: f64,
    /// Mean initial cell value.
    pub init_level: f64,
    /// Standard deviation of the initial gaussian perturbation.
    pub init_jitter: f64,
    /// Probability per cell per unit time of a spontaneous bloom.
    pub spore_rate: f64,
    /// Biomass added by a bloom.
    pub spore_boost: f64,
    /// Oxygen produced per unit of lit mean biomass.
    pub photosynthesis: f64,
    /// Oxygen consumed per unit time in the dark.
    pub dark_o2_loss: f64,
    /// Carbon dioxide fixed per unit of oxygen produced.
    pub co2_per_ps: f64,
    /// Carbon dioxide released per unit time in the dark.
    pub dark_co2_gain: f64,
    /// Nutrients consumed per unit of photosynthesis.
    pub nutrient_per_ps: f64,
    /// Constant nutrient leak per unit time.
    pub nutrient_leak: f64,
    /// Energy units represented by a full cell (used by social harvest).
    pub resource_scale: f64,
}

impl Default for FieldParams {
    fn default() -> Self {
        Self {
            cell_size: 8.0,
            growth_model: GrowthModel::Photosynthetic,
            r_max: 0.3,
            dark_respiration: 0.02,
            diffusion: 0.05,
            init_level: 0.2,
            init_jitter: 0.05,
            spore_rate: 0.0,
            spore_boost: 0.2,
            photosynthesis: 0.02,
            dark_o2_loss: 0.01,
            co2_per_ps: 0.8,
            dark_co2_gain: 0.005,
            nutrient_per_ps: 0.5,
            nutrient_leak: 0.001,
            resource_scale: 10.0,
        }
    }
}

/// Limitation factor of photosynthetic growth, in `[0, 1]`.
pub fn limitation(light: f64, nutrients: f64, water: f64) -> f64 {
    let light_factor = (0.2 + 0.8 * light).min(1.0);
    let nutrient_factor = (0.3 + 0.7 * nutrients).min(1.0);
    let water_factor = water.min(1.0);
    (light_factor * nutrient_factor * water_factor).clamp(0.0, 1.0)
}

/// A toroidal grid of biomass values with a scratch buffer for diffusion.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceField {
    rows: usize,
    cols: usize,
    cell_size: f64,
    cells: Vec<f64>,
    next: Vec<f64>,
}

impl ResourceField {
    /// Create an empty (all zero) field.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidGeometry`] if either dimension is zero
    /// or the cell size is not positive.
    pub fn new(rows: usize, cols: usize, cell_size: f64) -> Result<Self, WorldError> {
        if rows == 0 || cols == 0 {
            return Err(WorldError::InvalidGeometry {
                reason: format!("resource field needs at least one cell, got {rows} x {cols}"),
            });
        }
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(WorldError::InvalidGeometry {
                reason: format!("cell size must be positive, got {cell_size}"),
            });
        }
        let len = rows.checked_mul(cols).ok_or_else(|| WorldError::InvalidGeometry {
            reason: format!("{rows} x {cols} cells overflow"),
        })?;
        Ok(Self {
            rows,
            cols,
            cell_size,
            cells: vec![0.0; len],
            next: vec![0.0; len],
        })
    }

    /// Lay a field over the torus and fill it with gaussian-perturbed
    /// initial biomass.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidGeometry`] if the torus is smaller than
    /// one cell.
    pub fn seeded<R: Rng + ?Sized>(
        torus: &Torus,
        params: &FieldParams,
        rng: &mut R,
    ) -> Result<Self, WorldError> {
        let cols = cells_along(torus.width(), params.cell_size);
        let rows = cells_along(torus.height(), params.cell_size);
        let mut field = Self::new(rows, cols, params.cell_size)?;
        for cell in &mut field.cells {
            *cell = sampling::gaussian(rng, params.init_level, params.init_jitter).clamp(0.0, 1.0);
        }
        Ok(field)
    }

    /// Number of rows.
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// Side length of one cell.
    pub const fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Row-major cell values.
    pub fn cells(&self) -> &[f64] {
        &self.cells
    }

    /// `(row, col)` of the cell containing `pos`, wrapped toroidally.
    pub fn cell_of(&self, pos: DVec2) -> (usize, usize) {
        (
            axis_index(pos.y, self.cell_size, self.rows),
            axis_index(pos.x, self.cell_size, self.cols),
        )
    }

    /// Centre of a cell in world coordinates.
    #[allow(clippy::arithmetic_side_effects)]
    pub fn cell_center(&self, row: usize, col: usize) -> DVec2 {
        DVec2::new(
            (index_to_f64(col % self.cols) + 0.5) * self.cell_size,
            (index_to_f64(row % self.rows) + 0.5) * self.cell_size,
        )
    }

    /// Value of a cell (indices wrap).
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.cells.get(self.flat(row, col)).copied().unwrap_or(0.0)
    }

    /// Overwrite a cell (indices wrap, value clamped to `[0, 1]`).
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        let idx = self.flat(row, col);
        if let Some(cell) = self.cells.get_mut(idx) {
            *cell = clamp_unit(value);
        }
    }

    /// Fill every cell with the same value (clamped).
    pub fn fill(&mut self, value: f64) {
        let value = clamp_unit(value);
        self.cells.iter_mut().for_each(|c| *c = value);
    }

    /// Read the cell under `pos` without mutating anything.
    pub fn sample(&self, pos: DVec2) -> f64 {
        let (row, col) = self.cell_of(pos);
        self.get(row, col)
    }

    /// Remove up to `amount` from the cell under `pos` and return what was
    /// actually taken. Taking less than requested is a normal outcome.
    pub fn eat(&mut self, pos: DVec2, amount: f64) -> f64 {
        let (row, col) = self.cell_of(pos);
        let idx = self.flat(row, col);
        let Some(cell) = self.cells.get_mut(idx) else {
            return 0.0;
        };
        let wanted = if amount.is_finite() { amount.max(0.0) } else { 0.0 };
        let take = cell.min(wanted);
        *cell = clamp_unit(*cell - take);
        take
    }

    /// Mean biomass over all cells.
    pub fn mean_biomass(&self) -> f64 {
        let n = self.cells.len();
        if n == 0 {
            return 0.0;
        }
        self.cells.iter().sum::<f64>() / index_to_f64(n)
    }

    /// Whether every cell lies in `[0, 1]`.
    pub fn within_bounds(&self) -> bool {
        self.cells.iter().all(|c| (0.0..=1.0).contains(c))
    }

    /// The eight toroidal neighbours of a cell as `(row, col)`, column by
    /// column from the left and top to bottom within each column.
    #[allow(clippy::arithmetic_side_effects)]
    pub fn neighbors8(&self, row: usize, col: usize) -> [(usize, usize); 8] {
        let up = (row % self.rows + self.rows - 1) % self.rows;
        let down = (row + 1) % self.rows;
        let left = (col % self.cols + self.cols - 1) % self.cols;
        let right = (col + 1) % self.cols;
        let row = row % self.rows;
        let col = col % self.cols;
        [
            (up, left),
            (row, left),
            (down, left),
            (up, col),
            (down, col),
            (up, right),
            (row, right),
            (down, right),
        ]
    }

    /// Zero a `size x size` block whose top-left cell is `(row, col)`,
    /// wrapping across the seams.
    pub fn zero_region(&mut self, row: usize, col: usize, size: usize) {
        for dr in 0..size.min(self.rows) {
            for dc in 0..size.min(self.cols) {
                self.set(row.wrapping_add(dr), col.wrapping_add(dc), 0.0);
            }
        }
    }

    /// Run one growth pass (growth, diffusion, gas exchange).
    pub fn grow<R: Rng + ?Sized>(
        &mut self,
        env: &mut Environment,
        params: &FieldParams,
        dt: f64,
        rng: &mut R,
    ) {
        self.grow_cells(env, params, dt, rng);
        self.diffuse(params.diffusion * dt);
        if params.growth_model == GrowthModel::Photosynthetic {
            self.exchange_gases(env, params, dt);
        }
    }

    fn grow_cells<R: Rng + ?Sized>(
        &mut self,
        env: &Environment,
        params: &FieldParams,
        dt: f64,
        rng: &mut R,
    ) {
        let light = env.light();
        let lim = limitation(light, env.nutrients(), env.water());
        for cell in &mut self.cells {
            let x = *cell;
            let next = match params.growth_model {
                GrowthModel::Photosynthetic => {
                    let growth = params.r_max * lim * x * (1.0 - x) * dt;
                    let resp = params.dark_respiration * (1.0 - light) * x * dt;
                    x + growth - resp
                }
                GrowthModel::Logistic => x + params.r_max * x * (1.0 - x) * dt,
            };
            *cell = clamp_unit(next);
            if params.spore_rate > 0.0 && sampling::chance(rng, params.spore_rate * dt) {
                *cell = clamp_unit(*cell + params.spore_boost);
            }
        }
    }

    /// Synchronous four-neighbour diffusion into the scratch buffer.
    #[allow(clippy::arithmetic_side_effects)]
    fn diffuse(&mut self, fraction: f64) {
        let fraction = if fraction.is_finite() { fraction.clamp(0.0, 1.0) } else { 0.0 };
        if fraction <= 0.0 {
            return;
        }
        for row in 0..self.rows {
            for col in 0..self.cols {
                let here = self.get(row, col);
                let up = self.get(row + self.rows - 1, col);
                let down = self.get(row + 1, col);
                let left = self.get(row, col + self.cols - 1);
                let right = self.get(row, col + 1);
                let mean = (up + down + left + right) * 0.25;
                let idx = self.flat(row, col);
                if let Some(slot) = self.next.get_mut(idx) {
                    *slot = clamp_unit(here + fraction * (mean - here));
                }
            }
        }
        std::mem::swap(&mut self.cells, &mut self.next);
    }

    fn exchange_gases(&self, env: &mut Environment, params: &FieldParams, dt: f64) {
        let light = env.light();
        let ps = params.photosynthesis * light * self.mean_biomass() * dt;
        env.add_o2(ps - params.dark_o2_loss * (1.0 - light) * dt);
        env.add_co2(-params.co2_per_ps * ps + params.dark_co2_gain * (1.0 - light) * dt);
        env.add_nutrients(-(params.nutrient_per_ps * ps + params.nutrient_leak * dt));
    }

    /// Read-only copy for rendering.
    pub fn view(&self) -> FieldView {
        FieldView {
            rows: self.rows,
            cols: self.cols,
            cell_size: self.cell_size,
            cells: self.cells.clone(),
        }
    }

    // rows and cols are non-zero (checked in `new`).
    #[allow(clippy::arithmetic_side_effects)]
    fn flat(&self, row: usize, col: usize) -> usize {
        (row % self.rows) * self.cols + (col % self.cols)
    }
}

fn clamp_unit(value: f64) -> f64 {
    Environment::clamp_pool(value, 0.0, 1.0)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn cells_along(extent: f64, cell_size: f64) -> usize {
    if !(extent.is_finite() && cell_size.is_finite() && cell_size > 0.0) {
        return 0;
    }
    (extent / cell_size).floor().max(0.0) as usize
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn axis_index(coord: f64, cell_size: f64, count: usize) -> usize {
    if !coord.is_finite() || count == 0 {
        return 0;
    }
    let raw = (coord / cell_size).floor();
    let count_f = index_to_f64(count);
    raw.rem_euclid(count_f).min(count_f - 1.0).max(0.0) as usize
}

#[allow(clippy::cast_precision_loss)]
const fn index_to_f64(n: usize) -> f64 {
    n as f64
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;
    use crate::environment::EnvironmentParams;

    fn field(rows: usize, cols: usize) -> ResourceField {
        ResourceField::new(rows, cols, 1.0).unwrap()
    }

    #[test]
    fn rejects_empty_grid() {
        assert!(ResourceField::new(0, 4, 1.0).is_err());
        assert!(ResourceField::new(4, 4, 0.0).is_err());
    }

    #[test]
    fn eat_from_saturated_cell_takes_exactly_the_request() {
        let mut f = field(4, 4);
        f.set(1, 2, 1.0);
        let pos = DVec2::new(2.5, 1.5);
        let taken = f.eat(pos, 0.5);
        assert_eq!(taken, 0.5);
        assert_eq!(f.get(1, 2), 0.5);
    }

    #[test]
    fn eat_returns_less_when_cell_is_short() {
        let mut f = field(4, 4);
        f.set(0, 0, 0.1);
        let taken = f.eat(DVec2::new(0.2, 0.2), 0.5);
        assert!((taken - 0.1).abs() < 1e-12);
        assert_eq!(f.get(0, 0), 0.0);
        assert_eq!(f.eat(DVec2::new(0.2, 0.2), 0.5), 0.0);
    }

    #[test]
    fn eat_ignores_negative_requests() {
        let mut f = field(2, 2);
        f.fill(0.5);
        assert_eq!(f.eat(DVec2::new(0.5, 0.5), -1.0), 0.0);
        assert_eq!(f.get(0, 0), 0.5);
    }

    #[test]
    fn sample_wraps_positions() {
        let mut f = field(4, 4);
        f.set(0, 3, 0.7);
        assert_eq!(f.sample(DVec2::new(-0.5, 4.2)), 0.7);
    }

    #[test]
    fn diffusion_is_order_independent() {
        // A single hot cell spreads symmetrically to its four neighbours.
        let mut f = field(5, 5);
        f.set(2, 2, 1.0);
        f.diffuse(0.4);
        let n = [f.get(1, 2), f.get(3, 2), f.get(2, 1), f.get(2, 3)];
        for v in n {
            assert!((v - 0.1).abs() < 1e-12, "neighbour got {v}");
        }
        assert!((f.get(2, 2) - 0.6).abs() < 1e-12);
        // Total mass is conserved by averaging toward neighbours.
        let total: f64 = f.cells().iter().sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn growth_keeps_cells_in_bounds() {
        let mut rng = SmallRng::seed_from_u64(5);
        let torus = Torus::new(80.0, 64.0).unwrap();
        let params = FieldParams {
            r_max: 50.0,
            spore_rate: 0.5,
            diffusion: 3.0,
            ..FieldParams::default()
        };
        let mut f = ResourceField::seeded(&torus, &params, &mut rng).unwrap();
        let mut env = Environment::new(&EnvironmentParams::default());
        for _ in 0..200 {
            let _ = env.advance_light(5.0);
            f.grow(&mut env, &params, 1.0, &mut rng);
            assert!(f.within_bounds());
            assert!(env.within_bounds());
        }
    }

    #[test]
    fn seeded_dimensions_follow_cell_size() {
        let mut rng = SmallRng::seed_from_u64(5);
        let torus = Torus::new(900.0, 700.0).unwrap();
        let f = ResourceField::seeded(&torus, &FieldParams::default(), &mut rng).unwrap();
        assert_eq!(f.cols(), 112);
        assert_eq!(f.rows(), 87);
    }

    #[test]
    fn dark_respiration_shrinks_biomass() {
        let mut rng = SmallRng::seed_from_u64(5);
        let mut f = field(3, 3);
        f.fill(0.5);
        let mut env = Environment::new(&EnvironmentParams::default());
        env.set_light_phase(0.75);
        f.grow(&mut env, &FieldParams::default(), 1.0, &mut rng);
        assert!(f.mean_biomass() < 0.5);
    }

    #[test]
    fn logistic_model_ignores_light_and_gases() {
        let mut rng = SmallRng::seed_from_u64(5);
        let mut f = field(3, 3);
        f.fill(0.5);
        let mut env = Environment::new(&EnvironmentParams::default());
        env.set_light_phase(0.75);
        let before = env.clone();
        let params = FieldParams {
            growth_model: GrowthModel::Logistic,
            r_max: 0.12,
            diffusion: 0.0,
            ..FieldParams::default()
        };
        f.grow(&mut env, &params, 1.0, &mut rng);
        assert!((f.get(0, 0) - 0.53).abs() < 1e-12);
        assert_eq!(env, before);
    }

    #[test]
    fn zero_region_wraps() {
        let mut f = field(4, 4);
        f.fill(1.0);
        f.zero_region(3, 3, 2);
        assert_eq!(f.get(3, 3), 0.0);
        assert_eq!(f.get(0, 0), 0.0);
        assert_eq!(f.get(3, 0), 0.0);
        assert_eq!(f.get(1, 1), 1.0);
    }

    #[test]
    fn neighbors_wrap_at_corner() {
        let f = field(3, 4);
        let n = f.neighbors8(0, 0);
        assert_eq!(n[0], (2, 3));
        assert_eq!(n[7], (1, 1));
    }

    #[test]
    fn limitation_saturates_at_one() {
        assert_eq!(limitation(1.0, 1.0, 1.0), 1.0);
        assert!((limitation(0.0, 0.0, 1.0) - 0.06).abs() < 1e-12);
    }
}
