use rand::Rng;

use super::config::{DENSITIES, REGEN_PERIOD};
use super::resources::{Inventory, Resource, RESOURCE_KINDS};

/// The game world: a toroidal 2D grid of tiles, each holding a seven-slot
/// resource inventory.
///
/// Coordinates wrap on both axes; leaving one edge re-enters the opposite
/// edge. Movement convention: north is y+1, east is x+1.
pub struct World {
    pub width: i32,
    pub height: i32,
    tiles: Vec<Inventory>,
    /// Initial quantity seeded per kind, baseline for top-up passes.
    initial_quota: [i32; RESOURCE_KINDS],
}

impl World {
    /// Create an empty world. `seed_resources` performs the initial drop.
    pub fn new(width: i32, height: i32) -> Self {
        let area = (width * height) as f64;
        let mut initial_quota = [0; RESOURCE_KINDS];
        for (slot, density) in initial_quota.iter_mut().zip(DENSITIES) {
            *slot = ((area * density).floor() as i32).max(1);
        }
        World {
            width,
            height,
            tiles: vec![Inventory::new(); (width * height) as usize],
            initial_quota,
        }
    }

    /// Time-units between two top-up passes.
    pub fn regen_period(&self) -> u32 {
        REGEN_PERIOD
    }

    /// Wrap arbitrary coordinates onto the torus.
    pub fn wrap(&self, x: i32, y: i32) -> (i32, i32) {
        (x.rem_euclid(self.width), y.rem_euclid(self.height))
    }

    fn index(&self, x: i32, y: i32) -> usize {
        let (x, y) = self.wrap(x, y);
        (y * self.width + x) as usize
    }

    pub fn tile(&self, x: i32, y: i32) -> &Inventory {
        &self.tiles[self.index(x, y)]
    }

    pub fn tile_mut(&mut self, x: i32, y: i32) -> &mut Inventory {
        let idx = self.index(x, y);
        &mut self.tiles[idx]
    }

    /// Shortest wrapped delta from `from` to `to` along one axis of length
    /// `extent`, in [-extent/2, extent/2].
    pub fn wrapped_delta(from: i32, to: i32, extent: i32) -> i32 {
        let mut delta = to - from;
        if delta.abs() > extent / 2 {
            delta += if delta > 0 { -extent } else { extent };
        }
        delta
    }

    /// Total units of `kind` currently on the ground.
    pub fn ground_total(&self, kind: Resource) -> i32 {
        self.tiles.iter().map(|t| t.get(kind)).sum()
    }

    /// Initial resource drop: `max(1, floor(width * height * density))` units
    /// per kind, each on a uniformly random tile (a tile may stack several
    /// units of the same kind).
    pub fn seed_resources<R: Rng>(&mut self, rng: &mut R) {
        for (i, kind) in Resource::ALL.into_iter().enumerate() {
            for _ in 0..self.initial_quota[i] {
                self.drop_random(rng, kind);
            }
        }
    }

    /// Periodic top-up: a tenth of the initial quantity per kind (at least
    /// one unit), on random tiles. Returns the coordinates of every changed
    /// tile so the caller can mirror them to the GUI.
    pub fn regen_resources<R: Rng>(&mut self, rng: &mut R) -> Vec<(i32, i32)> {
        let mut changed = Vec::new();
        for (i, kind) in Resource::ALL.into_iter().enumerate() {
            let quantity = (self.initial_quota[i] / 10).max(1);
            for _ in 0..quantity {
                changed.push(self.drop_random(rng, kind));
            }
        }
        changed.sort_unstable();
        changed.dedup();
        changed
    }

    fn drop_random<R: Rng>(&mut self, rng: &mut R, kind: Resource) -> (i32, i32) {
        let x = rng.gen_range(0..self.width);
        let y = rng.gen_range(0..self.height);
        self.tile_mut(x, y).add(kind, 1);
        (x, y)
    }

    /// A uniformly random tile coordinate, for initial player placement.
    pub fn random_position<R: Rng>(&self, rng: &mut R) -> (i32, i32) {
        (rng.gen_range(0..self.width), rng.gen_range(0..self.height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::thread_rng;

    #[test]
    fn test_wrap() {
        let w = World::new(10, 8);
        assert_eq!(w.wrap(0, 0), (0, 0));
        assert_eq!(w.wrap(-1, 0), (9, 0));
        assert_eq!(w.wrap(10, 8), (0, 0));
        assert_eq!(w.wrap(3, -2), (3, 6));
        assert_eq!(w.wrap(23, 17), (3, 1));
    }

    #[test]
    fn test_tile_access_wraps() {
        let mut w = World::new(10, 8);
        w.tile_mut(-1, -1).add(Resource::Food, 3);
        assert_eq!(w.tile(9, 7).get(Resource::Food), 3);
    }

    #[test]
    fn test_wrapped_delta() {
        assert_eq!(World::wrapped_delta(0, 3, 10), 3);
        assert_eq!(World::wrapped_delta(0, 9, 10), -1);
        assert_eq!(World::wrapped_delta(9, 0, 10), 1);
        assert_eq!(World::wrapped_delta(2, 7, 10), 5);
        assert_eq!(World::wrapped_delta(4, 4, 10), 0);
    }

    #[test]
    fn test_seed_quantities() {
        let mut w = World::new(10, 10);
        w.seed_resources(&mut thread_rng());
        // 100 tiles: food 50, linemate 30, deraumere 15, sibur 10,
        // mendiane 10, phiras 8, thystame 5.
        let expected = [50, 30, 15, 10, 10, 8, 5];
        for (kind, want) in Resource::ALL.into_iter().zip(expected) {
            assert_eq!(w.ground_total(kind), want, "{kind}");
        }
    }

    #[test]
    fn test_seed_minimum_one_unit() {
        // Tiny area where floor(area * density) would be 0 for rare kinds.
        let mut w = World::new(2, 2);
        w.seed_resources(&mut thread_rng());
        for kind in Resource::ALL {
            assert!(w.ground_total(kind) >= 1, "{kind}");
        }
    }

    #[test]
    fn test_regen_adds_tenth() {
        let mut w = World::new(10, 10);
        let changed = w.regen_resources(&mut thread_rng());
        assert!(!changed.is_empty());
        // food quota 50 -> +5; thystame quota 5 -> max(1, 0) = +1
        assert_eq!(w.ground_total(Resource::Food), 5);
        assert_eq!(w.ground_total(Resource::Thystame), 1);
        for &(x, y) in &changed {
            assert!(x >= 0 && x < 10 && y >= 0 && y < 10);
        }
    }

    #[test]
    fn test_regen_reports_unique_tiles() {
        let mut w = World::new(10, 10);
        let changed = w.regen_resources(&mut thread_rng());
        let mut deduped = changed.clone();
        deduped.dedup();
        assert_eq!(changed, deduped);
    }
}
