//! Static level geometry built from a parsed tile map.

use cloak_core::render::{Color, Renderer};
use cloak_core::tiles::{TileCoord, TileKind, TileMap};
use glam::Vec2;
use rapier2d::prelude::RigidBodyHandle;

use crate::actor::Actor;
use crate::config::LevelConfig;
use crate::entity::EntityId;
use crate::physics::{BodyKind, FixtureDef, FixtureTag, PhysicsWorld};

/// Axis-aligned tile box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileBounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl TileBounds {
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }
}

/// Counter-clockwise corners of an axis-aligned box.
fn quad(min_x: f32, max_x: f32, min_y: f32, max_y: f32) -> [Vec2; 4] {
    [
        Vec2::new(min_x, min_y),
        Vec2::new(max_x, min_y),
        Vec2::new(max_x, max_y),
        Vec2::new(min_x, max_y),
    ]
}

const TERRAIN: Color = Color::rgb(96, 96, 96);

/// Tile sizing. Tiles sit edge to edge: the center of tile `(x, y)` is
/// `(2 x hw, 2 y hh)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileGrid {
    pub half_width: f32,
    pub half_height: f32,
}

impl TileGrid {
    pub fn new(config: &LevelConfig) -> Self {
        Self {
            half_width: config.half_tile_width,
            half_height: config.half_tile_height,
        }
    }

    pub fn tile_center(&self, coord: TileCoord) -> Vec2 {
        Vec2::new(
            2.0 * coord.x as f32 * self.half_width,
            2.0 * coord.y as f32 * self.half_height,
        )
    }

    pub fn tile_bounds(&self, coord: TileCoord) -> TileBounds {
        let center = self.tile_center(coord);
        let half = Vec2::new(self.half_width, self.half_height);
        TileBounds {
            min: center - half,
            max: center + half,
        }
    }

    /// Convex polygons for a geometry tile, counter-clockwise. Markers have
    /// none.
    pub fn tile_polygons(&self, coord: TileCoord, kind: TileKind) -> Vec<[Vec2; 4]> {
        let b = self.tile_bounds(coord);
        let c = b.center();
        match kind {
            TileKind::Start | TileKind::GuardSpawn => Vec::new(),
            TileKind::Block => vec![quad(b.min.x, b.max.x, b.min.y, b.max.y)],
            TileKind::Floor => vec![quad(b.min.x, b.max.x, b.min.y, c.y)],
            TileKind::Ceiling => vec![quad(b.min.x, b.max.x, c.y, b.max.y)],
            TileKind::AscendingStep => vec![
                quad(b.min.x, b.max.x, b.min.y, c.y),
                quad(c.x, b.max.x, c.y, b.max.y),
            ],
            TileKind::DescendingStep => vec![
                quad(b.min.x, b.max.x, b.min.y, c.y),
                quad(b.min.x, c.x, c.y, b.max.y),
            ],
        }
    }
}

/// The level: one static body holding every tile fixture, plus the spawn
/// positions found in the map.
#[derive(Debug)]
pub struct LevelActor {
    body: RigidBodyHandle,
    grid: TileGrid,
    tiles: TileMap,
    start_position: Vec2,
    guard_positions: Vec<Vec2>,
    fixture_count: usize,
}

impl LevelActor {
    /// Build the level geometry for `tiles` into `physics`.
    ///
    /// Without a start marker the start position is the origin.
    pub fn build(
        id: EntityId,
        physics: &mut PhysicsWorld,
        tiles: TileMap,
        config: &LevelConfig,
    ) -> Self {
        let grid = TileGrid::new(config);
        let body = physics.create_body(id, BodyKind::Static, Vec2::ZERO);
        let mut start_position = Vec2::ZERO;
        let mut guard_positions = Vec::new();
        let mut fixture_count = 0;

        for (coord, symbol) in tiles.iter() {
            let kind = TileKind::from_symbol(symbol);
            match kind {
                TileKind::Start => start_position = grid.tile_center(coord),
                TileKind::GuardSpawn => guard_positions.push(grid.tile_center(coord)),
                _ => {
                    for polygon in grid.tile_polygons(coord, kind) {
                        let def = FixtureDef::solid(FixtureTag::tile(id, coord, symbol));
                        if physics.attach_polygon(body, &polygon, def).is_some() {
                            fixture_count += 1;
                        } else {
                            tracing::warn!(%coord, %symbol, "Degenerate tile polygon skipped");
                        }
                    }
                },
            }
        }

        physics.update_queries();
        tracing::info!(
            tiles = tiles.len(),
            fixtures = fixture_count,
            guards = guard_positions.len(),
            "Level built"
        );

        Self {
            body,
            grid,
            tiles,
            start_position,
            guard_positions,
            fixture_count,
        }
    }

    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    pub fn tiles(&self) -> &TileMap {
        &self.tiles
    }

    pub fn start_position(&self) -> Vec2 {
        self.start_position
    }

    pub fn guard_positions(&self) -> &[Vec2] {
        &self.guard_positions
    }

    pub fn fixture_count(&self) -> usize {
        self.fixture_count
    }
}

impl Actor for LevelActor {
    fn name(&self) -> &str {
        "LEVEL"
    }

    fn body(&self) -> Option<RigidBodyHandle> {
        Some(self.body)
    }

    fn draw(&self, _physics: &PhysicsWorld, renderer: &mut dyn Renderer) {
        renderer.set_color(TERRAIN);
        for (coord, symbol) in self.tiles.iter() {
            for polygon in self.grid.tile_polygons(coord, TileKind::from_symbol(symbol)) {
                renderer.fill_quad(polygon);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use cloak_core::test_helpers::{MIXED_LEVEL, level};

    use super::*;
    use crate::config::WorldConfig;

    fn grid() -> TileGrid {
        TileGrid::new(&LevelConfig::default())
    }

    fn build(text: &str) -> (PhysicsWorld, LevelActor) {
        let mut physics = PhysicsWorld::new(&WorldConfig::default());
        let actor = LevelActor::build(
            EntityId::from_raw(0),
            &mut physics,
            level(text),
            &LevelConfig::default(),
        );
        (physics, actor)
    }

    #[test]
    fn start_marker_above_floor() {
        let (physics, actor) = build("@\n===");
        assert_eq!(actor.tiles().len(), 4);
        assert_eq!(actor.start_position(), Vec2::new(0.0, 0.0));
        assert_eq!(actor.fixture_count(), 3);
        assert_eq!(physics.fixtures_of(actor.body().unwrap()), 3);
        assert!(actor.guard_positions().is_empty());
    }

    #[test]
    fn mixed_level_geometry() {
        let (_, actor) = build(MIXED_LEVEL);
        // 12 ceiling halves, 2 floor halves, 2 steps of 2 parts, 12 blocks.
        assert_eq!(actor.fixture_count(), 12 + 2 + 4 + 12);
        assert_eq!(actor.start_position(), Vec2::new(0.0, -1.0));
        assert_eq!(actor.guard_positions(), &[Vec2::new(6.0, -1.0)]);
    }

    #[test]
    fn unknown_symbol_is_full_block() {
        let g = grid();
        let coord = TileCoord::new(2, -3);
        assert_eq!(
            g.tile_polygons(coord, TileKind::from_symbol('#')),
            g.tile_polygons(coord, TileKind::Block)
        );
    }

    #[test]
    fn step_quarters_sit_on_opposite_sides() {
        let g = grid();
        let coord = TileCoord::new(0, 0);
        let ascending = g.tile_polygons(coord, TileKind::AscendingStep);
        let descending = g.tile_polygons(coord, TileKind::DescendingStep);
        assert_eq!(ascending.len(), 2);
        assert_eq!(ascending[0], descending[0]);
        assert_eq!(ascending[1][0], Vec2::new(0.0, 0.0));
        assert_eq!(ascending[1][2], Vec2::new(0.5, 0.5));
        assert_eq!(descending[1][0], Vec2::new(-0.5, 0.0));
        assert_eq!(descending[1][2], Vec2::new(0.0, 0.5));
    }

    #[test]
    fn half_tiles() {
        let g = grid();
        let coord = TileCoord::new(1, 1);
        let floor = g.tile_polygons(coord, TileKind::Floor);
        let ceiling = g.tile_polygons(coord, TileKind::Ceiling);
        assert_eq!(floor[0][0], Vec2::new(0.5, 0.5));
        assert_eq!(floor[0][2], Vec2::new(1.5, 1.0));
        assert_eq!(ceiling[0][0], Vec2::new(0.5, 1.0));
        assert_eq!(ceiling[0][2], Vec2::new(1.5, 1.5));
        assert!(g.tile_polygons(coord, TileKind::Start).is_empty());
    }

    #[test]
    fn draw_fills_every_polygon() {
        let (physics, actor) = build("=_\n/");
        let mut list = cloak_core::render::DrawList::new();
        actor.draw(&physics, &mut list);
        assert_eq!(list.quads().count(), actor.fixture_count());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn bounds_are_centered_and_ordered(
                x in -1000i32..1000,
                y in -1000i32..1000,
                hw in 0.05f32..4.0,
                hh in 0.05f32..4.0,
            ) {
                let g = TileGrid { half_width: hw, half_height: hh };
                let coord = TileCoord::new(x, y);
                let bounds = g.tile_bounds(coord);
                let center = Vec2::new(2.0 * x as f32 * hw, 2.0 * y as f32 * hh);
                prop_assert_eq!(g.tile_center(coord), center);
                prop_assert!(bounds.min.x < bounds.max.x);
                prop_assert!(bounds.min.y < bounds.max.y);
                let tol = 1e-3 * (1.0 + center.abs().max_element());
                prop_assert!((bounds.min - (center - Vec2::new(hw, hh))).abs().max_element() <= tol);
                prop_assert!((bounds.max - (center + Vec2::new(hw, hh))).abs().max_element() <= tol);
            }
        }
    }
}
