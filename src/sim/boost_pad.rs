//! Boost pads: layouts, cooldowns and pickups

use serde::{Deserialize, Serialize};

use super::mutator::MutatorConfig;
use super::state::{BoostPadConfig, BoostPadState, CarState, GameMode};
use crate::consts::*;
use crate::math::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoostPad {
    pub config: BoostPadConfig,
    pub state: BoostPadState,
}

impl BoostPad {
    pub fn new(config: BoostPadConfig) -> Self {
        Self {
            config,
            state: BoostPadState::default(),
        }
    }

    fn pickup_radius(&self) -> f32 {
        if self.config.is_big {
            BOOST_PAD_PICKUP_RADIUS_BIG
        } else {
            BOOST_PAD_PICKUP_RADIUS_SMALL
        }
    }

    /// Whether a car origin is inside the pickup cylinder
    pub fn overlaps(&self, car_pos: Vec3) -> bool {
        let dx = car_pos.x - self.config.pos.x;
        let dy = car_pos.y - self.config.pos.y;
        let radius = self.pickup_radius();
        dx * dx + dy * dy < radius * radius
            && (car_pos.z - self.config.pos.z).abs() < BOOST_PAD_CYL_HEIGHT
    }

    /// Count down an inactive pad; reactivates once the cooldown runs out
    pub fn update_cooldown(&mut self, tick_time: f32) {
        if self.state.is_active {
            return;
        }
        self.state.cooldown -= tick_time;
        if self.state.cooldown <= 0.0 {
            self.state.cooldown = 0.0;
            self.state.is_active = true;
        }
    }

    /// Give boost to the car if possible; returns true on pickup
    pub fn try_pickup(&mut self, car: &mut CarState, mutator: &MutatorConfig) -> bool {
        if !self.state.is_active
            || car.is_demoed
            || car.boost >= BOOST_MAX
            || !self.overlaps(car.pos)
        {
            return false;
        }

        self.state.is_active = false;
        if self.config.is_big {
            self.state.cooldown = mutator.boost_pad_cooldown_big;
            car.boost = BOOST_MAX;
        } else {
            self.state.cooldown = mutator.boost_pad_cooldown_small;
            car.boost = (car.boost + BOOST_PAD_SMALL_AMOUNT).min(BOOST_MAX);
        }
        true
    }
}

const fn big(x: f32, y: f32) -> BoostPadConfig {
    BoostPadConfig {
        pos: Vec3::new(x, y, 73.0),
        is_big: true,
    }
}

const fn small(x: f32, y: f32) -> BoostPadConfig {
    BoostPadConfig {
        pos: Vec3::new(x, y, 70.0),
        is_big: false,
    }
}

const SOCCAR_PADS: [BoostPadConfig; 34] = [
    small(0.0, -4240.0),
    small(-1792.0, -4184.0),
    small(1792.0, -4184.0),
    big(-3072.0, -4096.0),
    big(3072.0, -4096.0),
    small(-940.0, -3308.0),
    small(940.0, -3308.0),
    small(0.0, -2816.0),
    small(-3584.0, -2484.0),
    small(3584.0, -2484.0),
    small(-1788.0, -2300.0),
    small(1788.0, -2300.0),
    small(-2048.0, -1036.0),
    small(0.0, -1024.0),
    small(2048.0, -1036.0),
    big(-3584.0, 0.0),
    small(-1024.0, 0.0),
    small(1024.0, 0.0),
    big(3584.0, 0.0),
    small(-2048.0, 1036.0),
    small(0.0, 1024.0),
    small(2048.0, 1036.0),
    small(-1788.0, 2300.0),
    small(1788.0, 2300.0),
    small(-3584.0, 2484.0),
    small(3584.0, 2484.0),
    small(0.0, 2816.0),
    small(-940.0, 3310.0),
    small(940.0, 3308.0),
    big(-3072.0, 4096.0),
    big(3072.0, 4096.0),
    small(-1792.0, 4184.0),
    small(1792.0, 4184.0),
    small(0.0, 4240.0),
];

const fn hoops(x: f32, y: f32, is_big: bool) -> BoostPadConfig {
    BoostPadConfig {
        pos: Vec3::new(x, y, if is_big { 72.0 } else { 64.0 }),
        is_big,
    }
}

const HOOPS_PADS: [BoostPadConfig; 20] = [
    hoops(-2176.0, -2944.0, true),
    hoops(2176.0, -2944.0, true),
    hoops(0.0, -2816.0, false),
    hoops(-1280.0, -2304.0, false),
    hoops(1280.0, -2304.0, false),
    hoops(-1536.0, -1024.0, false),
    hoops(1536.0, -1024.0, false),
    hoops(-512.0, -512.0, false),
    hoops(512.0, -512.0, false),
    hoops(-2432.0, 0.0, true),
    hoops(2432.0, 0.0, true),
    hoops(-512.0, 512.0, false),
    hoops(512.0, 512.0, false),
    hoops(-1536.0, 1024.0, false),
    hoops(1536.0, 1024.0, false),
    hoops(-1280.0, 2304.0, false),
    hoops(1280.0, 2304.0, false),
    hoops(0.0, 2816.0, false),
    hoops(-2176.0, 2944.0, true),
    hoops(2176.0, 2944.0, true),
];

/// Stock pad layout for a game mode
pub fn default_layout(game_mode: GameMode) -> &'static [BoostPadConfig] {
    match game_mode {
        GameMode::Soccar | GameMode::Heatseeker | GameMode::Snowday => &SOCCAR_PADS,
        GameMode::Hoops => &HOOPS_PADS,
        GameMode::Dropshot | GameMode::TheVoid => &[],
    }
}

const GRID_CELL_SIZE: f32 = 512.0;

/// Uniform grid over pad pickup areas
#[derive(Debug, Clone, PartialEq)]
pub struct PadGrid {
    min_x: f32,
    min_y: f32,
    cols: usize,
    rows: usize,
    /// Pad indices per cell, ascending
    cells: Vec<Vec<usize>>,
}

impl PadGrid {
    pub fn build(pads: &[BoostPad]) -> Self {
        let reach = BOOST_PAD_PICKUP_RADIUS_BIG;
        let (mut min_x, mut min_y) = (f32::INFINITY, f32::INFINITY);
        let (mut max_x, mut max_y) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
        for pad in pads {
            min_x = min_x.min(pad.config.pos.x - reach);
            min_y = min_y.min(pad.config.pos.y - reach);
            max_x = max_x.max(pad.config.pos.x + reach);
            max_y = max_y.max(pad.config.pos.y + reach);
        }
        if pads.is_empty() {
            return Self {
                min_x: 0.0,
                min_y: 0.0,
                cols: 0,
                rows: 0,
                cells: Vec::new(),
            };
        }

        let cols = ((max_x - min_x) / GRID_CELL_SIZE).ceil().max(1.0) as usize;
        let rows = ((max_y - min_y) / GRID_CELL_SIZE).ceil().max(1.0) as usize;
        let mut cells = vec![Vec::new(); cols * rows];

        for (idx, pad) in pads.iter().enumerate() {
            let radius = pad.pickup_radius();
            let col_lo = Self::axis_cell(pad.config.pos.x - radius, min_x, cols);
            let col_hi = Self::axis_cell(pad.config.pos.x + radius, min_x, cols);
            let row_lo = Self::axis_cell(pad.config.pos.y - radius, min_y, rows);
            let row_hi = Self::axis_cell(pad.config.pos.y + radius, min_y, rows);
            for row in row_lo..=row_hi {
                for col in col_lo..=col_hi {
                    cells[row * cols + col].push(idx);
                }
            }
        }

        Self {
            min_x,
            min_y,
            cols,
            rows,
            cells,
        }
    }

    fn axis_cell(v: f32, min: f32, count: usize) -> usize {
        (((v - min) / GRID_CELL_SIZE).floor().max(0.0) as usize).min(count - 1)
    }

    /// Pads whose pickup area may contain `pos`, in ascending index order
    pub fn candidates(&self, pos: Vec3) -> &[usize] {
        if self.cells.is_empty() {
            return &[];
        }
        let fx = (pos.x - self.min_x) / GRID_CELL_SIZE;
        let fy = (pos.y - self.min_y) / GRID_CELL_SIZE;
        if fx < 0.0 || fy < 0.0 || fx >= self.cols as f32 || fy >= self.rows as f32 {
            return &[];
        }
        &self.cells[fy as usize * self.cols + fx as usize]
    }
}

/// How pickups find nearby pads
#[derive(Debug, Clone, PartialEq)]
pub enum PadLookup {
    /// Check every pad
    Linear,
    /// Check only the pads sharing the car's grid cell
    Grid(PadGrid),
}

impl PadLookup {
    /// Pick up at most one pass of pads for a car; returns picked pad indices
    pub fn pickups(
        &self,
        pads: &mut [BoostPad],
        car: &mut CarState,
        mutator: &MutatorConfig,
    ) -> Vec<usize> {
        let mut picked = Vec::new();
        match self {
            PadLookup::Linear => {
                for (idx, pad) in pads.iter_mut().enumerate() {
                    if pad.try_pickup(car, mutator) {
                        picked.push(idx);
                    }
                }
            }
            PadLookup::Grid(grid) => {
                for &idx in grid.candidates(car.pos) {
                    if pads[idx].try_pickup(car, mutator) {
                        picked.push(idx);
                    }
                }
            }
        }
        picked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(mode: GameMode) -> Vec<BoostPad> {
        default_layout(mode).iter().copied().map(BoostPad::new).collect()
    }

    fn car_at(x: f32, y: f32, boost: f32) -> CarState {
        CarState {
            pos: Vec3::new(x, y, CAR_SPAWN_REST_Z),
            boost,
            ..Default::default()
        }
    }

    #[test]
    fn test_layout_sizes() {
        let soccar = default_layout(GameMode::Soccar);
        assert_eq!(soccar.len(), 34);
        assert_eq!(soccar.iter().filter(|p| p.is_big).count(), 6);
        assert_eq!(default_layout(GameMode::Hoops).len(), 20);
        assert!(default_layout(GameMode::TheVoid).is_empty());
    }

    #[test]
    fn test_big_pad_fills_boost() {
        let mutator = MutatorConfig::default();
        let mut pad = BoostPad::new(big(0.0, 0.0));
        let mut car = car_at(100.0, 0.0, 10.0);
        assert!(pad.try_pickup(&mut car, &mutator));
        assert_eq!(car.boost, BOOST_MAX);
        assert!(!pad.state.is_active);
        assert_eq!(pad.state.cooldown, BOOST_PAD_COOLDOWN_BIG);
    }

    #[test]
    fn test_small_pad_caps_at_max() {
        let mutator = MutatorConfig::default();
        let mut pad = BoostPad::new(small(0.0, 0.0));
        let mut car = car_at(0.0, 0.0, 95.0);
        assert!(pad.try_pickup(&mut car, &mutator));
        assert_eq!(car.boost, BOOST_MAX);
        assert_eq!(pad.state.cooldown, BOOST_PAD_COOLDOWN_SMALL);
    }

    #[test]
    fn test_full_boost_leaves_pad() {
        let mutator = MutatorConfig::default();
        let mut pad = BoostPad::new(small(0.0, 0.0));
        let mut car = car_at(0.0, 0.0, BOOST_MAX);
        assert!(!pad.try_pickup(&mut car, &mutator));
        assert!(pad.state.is_active);
    }

    #[test]
    fn test_cooldown_reactivates() {
        let mut pad = BoostPad::new(small(0.0, 0.0));
        pad.state = BoostPadState {
            is_active: false,
            cooldown: 0.02,
        };
        pad.update_cooldown(0.01);
        assert!(!pad.state.is_active);
        pad.update_cooldown(0.01);
        pad.update_cooldown(0.01);
        assert!(pad.state.is_active);
        assert_eq!(pad.state.cooldown, 0.0);
    }

    #[test]
    fn test_grid_matches_linear_scan() {
        let mutator = MutatorConfig::default();
        let base = layout(GameMode::Soccar);
        let grid = PadLookup::Grid(PadGrid::build(&base));

        for x in (-4000..=4000).step_by(160) {
            for y in (-5000..=5000).step_by(160) {
                let mut linear_pads = base.clone();
                let mut grid_pads = base.clone();
                let mut linear_car = car_at(x as f32, y as f32, 0.0);
                let mut grid_car = linear_car;

                let a = PadLookup::Linear.pickups(&mut linear_pads, &mut linear_car, &mutator);
                let b = grid.pickups(&mut grid_pads, &mut grid_car, &mutator);
                assert_eq!(a, b, "at ({x}, {y})");
                assert_eq!(linear_car, grid_car);
            }
        }
    }
}
