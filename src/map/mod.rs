use bracket_geometry::prelude::{DistanceAlg, Point};
use bracket_pathfinding::prelude::{Algorithm2D, BaseMap, DijkstraMap};
use bracket_random::prelude::RandomNumberGenerator;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

const SURVIVE_NEIGHBORS: usize = 4;
const BIRTH_NEIGHBORS: usize = 5;
const DEAD_END_WEIGHT: f32 = 0.5;
const JUNCTION_WEIGHT: f32 = 0.3;

const ORTHOGONAL: [Point; 4] = [
    Point { x: 1, y: 0 },
    Point { x: -1, y: 0 },
    Point { x: 0, y: 1 },
    Point { x: 0, y: -1 },
];

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tile {
    #[default]
    Wall,
    Floor,
    Door,
    /// Altar, chest or switch depending on the room.
    Special,
}

impl Tile {
    pub fn glyph(&self) -> char {
        match self {
            Tile::Wall => '#',
            Tile::Floor => '.',
            Tile::Door => '+',
            Tile::Special => '*',
        }
    }

    pub fn is_walkable(&self) -> bool {
        !matches!(self, Tile::Wall)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoomLayout {
    pub width: i32,
    pub height: i32,
    pub tiles: Vec<Tile>,
}

impl RoomLayout {
    pub fn filled(width: i32, height: i32) -> Self {
        let size = (width.max(0) * height.max(0)) as usize;
        Self {
            width,
            height,
            tiles: vec![Tile::Wall; size],
        }
    }

    /// Square cave room: random interior, `passes` rounds of smoothing, then a
    /// door in the middle of the top and bottom walls.
    pub fn cellular(
        side: i32,
        floor_chance: f64,
        passes: u32,
        rng: &mut RandomNumberGenerator,
    ) -> Self {
        let mut layout = Self::filled(side, side);
        for y in 1..side - 1 {
            for x in 1..side - 1 {
                if rng.rand::<f64>() < floor_chance {
                    layout.set_tile(Point::new(x, y), Tile::Floor);
                }
            }
        }
        for _ in 0..passes {
            layout.smooth();
        }
        layout.place_doors();
        layout
    }

    fn idx(&self, x: i32, y: i32) -> Option<usize> {
        if self.in_bounds(Point::new(x, y)) {
            Some((y * self.width + x) as usize)
        } else {
            None
        }
    }

    pub fn in_bounds(&self, point: Point) -> bool {
        point.x >= 0 && point.x < self.width && point.y >= 0 && point.y < self.height
    }

    fn is_border(&self, point: Point) -> bool {
        point.x == 0 || point.y == 0 || point.x == self.width - 1 || point.y == self.height - 1
    }

    pub fn set_tile(&mut self, point: Point, tile: Tile) {
        if let Some(idx) = self.idx(point.x, point.y) {
            self.tiles[idx] = tile;
        }
    }

    pub fn tile_at(&self, point: Point) -> Option<Tile> {
        self.idx(point.x, point.y).map(|idx| self.tiles[idx])
    }

    pub fn is_floor(&self, point: Point) -> bool {
        self.tile_at(point) == Some(Tile::Floor)
    }

    pub fn floor_points(&self) -> Vec<Point> {
        let mut points = Vec::new();
        for y in 0..self.height {
            for x in 0..self.width {
                let point = Point::new(x, y);
                if self.is_floor(point) {
                    points.push(point);
                }
            }
        }
        points
    }

    pub fn count(&self, tile: Tile) -> usize {
        self.tiles.iter().filter(|t| **t == tile).count()
    }

    pub fn door_points(&self) -> Vec<Point> {
        (0..self.tiles.len())
            .filter(|idx| self.tiles[*idx] == Tile::Door)
            .map(|idx| self.index_to_point2d(idx))
            .collect()
    }

    fn moore_floor_neighbors(&self, point: Point) -> usize {
        let mut count = 0;
        for dy in -1..=1 {
            for dx in -1..=1 {
                if (dx, dy) != (0, 0) && self.is_floor(Point::new(point.x + dx, point.y + dy)) {
                    count += 1;
                }
            }
        }
        count
    }

    fn orthogonal_floor_neighbors(&self, point: Point) -> usize {
        ORTHOGONAL
            .iter()
            .filter(|dir| self.is_floor(Point::new(point.x + dir.x, point.y + dir.y)))
            .count()
    }

    /// One automaton pass over the interior. Reads the previous generation
    /// only, so cell order does not matter.
    pub fn smooth(&mut self) {
        let mut next = self.tiles.clone();
        for y in 1..self.height - 1 {
            for x in 1..self.width - 1 {
                let point = Point::new(x, y);
                let neighbors = self.moore_floor_neighbors(point);
                let idx = (y * self.width + x) as usize;
                next[idx] = match self.tiles[idx] {
                    Tile::Floor if neighbors >= SURVIVE_NEIGHBORS => Tile::Floor,
                    Tile::Floor => Tile::Wall,
                    Tile::Wall if neighbors >= BIRTH_NEIGHBORS => Tile::Floor,
                    other => other,
                };
            }
        }
        self.tiles = next;
    }

    fn place_doors(&mut self) {
        if self.width < 3 || self.height < 3 {
            return;
        }
        let mid = self.width / 2;
        for (door_y, inner_y) in [(0, 1), (self.height - 1, self.height - 2)] {
            self.set_tile(Point::new(mid, door_y), Tile::Door);
            self.set_tile(Point::new(mid, inner_y), Tile::Floor);
        }
    }

    /// Turns the floor tile closest to the centre into a special tile.
    pub fn mark_special_near_center(&mut self) -> Option<Point> {
        let center = Point::new(self.width / 2, self.height / 2);
        let chosen = self
            .floor_points()
            .into_iter()
            .filter(|point| !self.is_border(*point))
            .min_by(|a, b| {
                let da = DistanceAlg::Pythagoras.distance2d(*a, center);
                let db = DistanceAlg::Pythagoras.distance2d(*b, center);
                da.total_cmp(&db)
            })?;
        self.set_tile(chosen, Tile::Special);
        Some(chosen)
    }

    /// Corridor-ish floor tiles (≤2 orthogonal floor neighbours) weigh 0.5,
    /// junctions 0.3.
    pub fn complexity(&self) -> f32 {
        self.floor_points()
            .into_iter()
            .map(|point| {
                if self.orthogonal_floor_neighbors(point) <= 2 {
                    DEAD_END_WEIGHT
                } else {
                    JUNCTION_WEIGHT
                }
            })
            .sum()
    }

    /// Share of floor tiles a player entering through the top door can walk to.
    pub fn connectivity(&self) -> f32 {
        let floor = self.count(Tile::Floor);
        if floor == 0 {
            return 0.0;
        }
        let Some(entry) = self.door_points().first().copied() else {
            return 0.0;
        };
        let start = self.point2d_to_index(entry);
        let max_depth = (self.width * self.height) as f32;
        let dijkstra = DijkstraMap::new(self.width, self.height, &[start], self, max_depth);
        let reached = dijkstra
            .map
            .iter()
            .zip(self.tiles.iter())
            .filter(|(distance, tile)| **tile == Tile::Floor && **distance < f32::MAX)
            .count();
        reached as f32 / floor as f32
    }

    pub fn rows(&self) -> Vec<String> {
        (0..self.height)
            .map(|y| {
                (0..self.width)
                    .map(|x| self.tile_at(Point::new(x, y)).unwrap_or_default().glyph())
                    .collect()
            })
            .collect()
    }
}

impl BaseMap for RoomLayout {
    fn is_opaque(&self, idx: usize) -> bool {
        self.tiles.get(idx).is_none_or(|tile| !tile.is_walkable())
    }

    fn get_available_exits(&self, idx: usize) -> SmallVec<[(usize, f32); 10]> {
        let mut exits = SmallVec::new();
        let point = self.index_to_point2d(idx);
        for dir in ORTHOGONAL {
            let dest = Point::new(point.x + dir.x, point.y + dir.y);
            if self.tile_at(dest).is_some_and(|tile| tile.is_walkable()) {
                exits.push((self.point2d_to_index(dest), 1.0));
            }
        }
        exits
    }

    fn get_pathing_distance(&self, idx1: usize, idx2: usize) -> f32 {
        let p1 = self.index_to_point2d(idx1);
        let p2 = self.index_to_point2d(idx2);
        DistanceAlg::Pythagoras.distance2d(p1, p2)
    }
}

impl Algorithm2D for RoomLayout {
    fn dimensions(&self) -> Point {
        Point::new(self.width, self.height)
    }

    fn in_bounds(&self, point: Point) -> bool {
        RoomLayout::in_bounds(self, point)
    }
}
