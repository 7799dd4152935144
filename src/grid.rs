//! Hex-packed bubble grid: coordinate transform, tile store, cluster search.

/// Bubble colours (palette index order matches `Theme::bubble_color`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BubbleColor {
    Green,
    Yellow,
    Red,
    Blue,
    Magenta,
    Cyan,
}

impl BubbleColor {
    pub const ALL: [Self; 6] = [
        Self::Green,
        Self::Yellow,
        Self::Red,
        Self::Blue,
        Self::Magenta,
        Self::Cyan,
    ];

    /// Colour index 0..6 for theme.bubble_color().
    #[inline]
    pub fn index(&self) -> u8 {
        match self {
            Self::Green => 0,
            Self::Yellow => 1,
            Self::Red => 2,
            Self::Blue => 3,
            Self::Magenta => 4,
            Self::Cyan => 5,
        }
    }
}

/// Handle into the tile arena. Stable for the lifetime of the grid; recycled
/// ids are reused for later spawns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileId(usize);

/// One grid-resident (or pooled) bubble. Grid coordinates are never stored;
/// they are recomputed from the scene position via `Grid::to_grid`.
#[derive(Debug, Clone)]
pub struct Tile {
    pub color: BubbleColor,
    pub x: f32,
    pub y: f32,
    visited: bool,
    retired: bool,
}

impl Tile {
    /// True once the tile has been queued for removal.
    #[inline]
    pub fn retired(&self) -> bool {
        self.retired
    }
}

/// Six hex neighbours of a cell whose row sits flush left.
const ALIGNED_NEIGHBORS: [(i32, i32); 6] =
    [(1, 0), (0, 1), (-1, 1), (-1, 0), (-1, -1), (0, -1)];
/// Six hex neighbours of a cell whose row is shifted right by half a tile.
const SHIFTED_NEIGHBORS: [(i32, i32); 6] =
    [(1, 0), (1, 1), (0, 1), (-1, 0), (0, -1), (1, -1)];

/// Fixed-capacity hex grid of bubbles. Cells are the single source of truth
/// for occupancy; tiles live in an arena with a free-list pool.
#[derive(Debug, Clone)]
pub struct Grid {
    columns: usize,
    rows: usize,
    tile_size: f32,
    row_height: f32,
    /// Which rows carry the half-tile offset: odd rows when true, even rows
    /// when false. Flips on every ceiling-row injection.
    start_even: bool,
    /// cells[row * columns + col]. Row 0 is the ceiling.
    cells: Vec<Option<TileId>>,
    tiles: Vec<Tile>,
    free: Vec<TileId>,
}

impl Grid {
    pub fn new(columns: usize, rows: usize, tile_size: f32) -> Self {
        assert!(columns >= 2 && rows >= 2, "grid too small: {columns}x{rows}");
        Self {
            columns,
            rows,
            tile_size,
            row_height: tile_size * 3f32.sqrt() / 2.0,
            start_even: true,
            cells: vec![None; columns * rows],
            tiles: Vec::with_capacity(columns * rows),
            free: Vec::new(),
        }
    }

    #[inline]
    pub fn columns(&self) -> usize {
        self.columns
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    #[inline]
    pub fn row_height(&self) -> f32 {
        self.row_height
    }

    #[inline]
    fn index(&self, col: usize, row: usize) -> usize {
        assert!(
            col < self.columns && row < self.rows,
            "grid access out of range: ({col},{row})"
        );
        row * self.columns + col
    }

    /// True if `row` carries the half-tile horizontal offset.
    #[inline]
    pub fn is_offset_row(&self, row: usize) -> bool {
        (row % 2 == 1) == self.start_even
    }

    /// Offset rows lose their rightmost slot.
    #[inline]
    pub fn usable_columns(&self, row: usize) -> usize {
        self.columns - usize::from(self.is_offset_row(row))
    }

    /// Scene position of a cell centre.
    pub fn to_scene(&self, col: usize, row: usize) -> (f32, f32) {
        let mut x = col as f32 * self.tile_size + self.tile_size / 2.0;
        if self.is_offset_row(row) {
            x += self.tile_size / 2.0;
        }
        let y = row as f32 * self.row_height + self.tile_size / 2.0;
        (x, y)
    }

    /// Cell containing a scene position. Inverse of `to_scene` for on-grid
    /// input, except that on offset rows the rightmost (unusable) column is
    /// clamped down to the last valid one.
    pub fn to_grid(&self, x: f32, y: f32) -> (usize, usize) {
        let row = (y / self.row_height).floor().max(0.0) as usize;
        let mut x = x;
        if self.is_offset_row(row) {
            x -= self.tile_size / 2.0;
        }
        let mut col = (x / self.tile_size).floor().max(0.0) as usize;
        if self.is_offset_row(row) && col >= self.columns - 1 {
            col = self.columns - 2;
        }
        (col, row)
    }

    #[inline]
    pub fn get(&self, col: usize, row: usize) -> Option<TileId> {
        self.cells[self.index(col, row)]
    }

    pub fn set(&mut self, col: usize, row: usize, tile: Option<TileId>) {
        let idx = self.index(col, row);
        if tile.is_some() {
            debug_assert!(self.cells[idx].is_none(), "cell ({col},{row}) already occupied");
        }
        self.cells[idx] = tile;
    }

    #[inline]
    pub fn tile(&self, id: TileId) -> &Tile {
        &self.tiles[id.0]
    }

    #[inline]
    pub fn tile_mut(&mut self, id: TileId) -> &mut Tile {
        &mut self.tiles[id.0]
    }

    /// Pull a tile from the pool (or grow the arena) at a scene position.
    /// The tile is not grid-resident until `set` writes it into a cell.
    pub fn spawn(&mut self, color: BubbleColor, x: f32, y: f32) -> TileId {
        let tile = Tile {
            color,
            x,
            y,
            visited: false,
            retired: false,
        };
        if let Some(id) = self.free.pop() {
            self.tiles[id.0] = tile;
            id
        } else {
            self.tiles.push(tile);
            TileId(self.tiles.len() - 1)
        }
    }

    /// Return a popped tile to the pool. The caller must already have cleared
    /// its cell (if it had one).
    pub fn recycle(&mut self, id: TileId) {
        debug_assert!(!self.free.contains(&id), "tile recycled twice");
        self.free.push(id);
    }

    /// Mark a tile as queued for removal so mid-cascade searches skip it.
    #[inline]
    pub fn retire(&mut self, id: TileId) {
        self.tiles[id.0].retired = true;
    }

    fn reset_visited(&mut self) {
        for cell in &self.cells {
            if let Some(id) = *cell {
                self.tiles[id.0].visited = false;
            }
        }
    }

    /// In-bounds hex neighbour cells of `(col, row)`. The cell's own row
    /// parity selects the offset table.
    pub fn neighbor_cells(&self, col: usize, row: usize) -> Vec<(usize, usize)> {
        let table = if self.is_offset_row(row) {
            &SHIFTED_NEIGHBORS
        } else {
            &ALIGNED_NEIGHBORS
        };
        let mut cells = Vec::with_capacity(6);
        for &(dc, dr) in table {
            let nc = col as i32 + dc;
            let nr = row as i32 + dr;
            if nc >= 0 && (nc as usize) < self.columns && nr >= 0 && (nr as usize) < self.rows {
                cells.push((nc as usize, nr as usize));
            }
        }
        cells
    }

    /// Occupied hex neighbours of a tile. The tile's row is recomputed from
    /// its scene position, never cached.
    pub fn neighbors(&self, id: TileId) -> Vec<TileId> {
        let tile = &self.tiles[id.0];
        let (col, row) = self.to_grid(tile.x, tile.y);
        let mut found = Vec::with_capacity(6);
        for (nc, nr) in self.neighbor_cells(col, row) {
            if let Some(n) = self.get(nc, nr) {
                found.push(n);
            }
        }
        found
    }

    /// Flood fill from a seed cell (explicit stack). With `match_color`, only
    /// tiles of the seed's colour are collected; a mismatched tile is neither
    /// collected nor expanded, so same-colour tiles beyond it stay
    /// unreachable. `skip_retired` drops tiles already queued for removal,
    /// which keeps mid-cascade queries sound.
    pub fn find_connected(
        &mut self,
        col: usize,
        row: usize,
        match_color: bool,
        reset_visited: bool,
        skip_retired: bool,
    ) -> Vec<TileId> {
        if reset_visited {
            self.reset_visited();
        }
        let seed = self
            .get(col, row)
            .expect("cluster search seeded on an empty cell");
        let target = self.tiles[seed.0].color;
        self.tiles[seed.0].visited = true;

        let mut stack = vec![seed];
        let mut found = Vec::new();
        while let Some(id) = stack.pop() {
            let tile = &self.tiles[id.0];
            if skip_retired && tile.retired {
                continue;
            }
            if match_color && tile.color != target {
                continue;
            }
            found.push(id);
            for n in self.neighbors(id) {
                let neighbor = &mut self.tiles[n.0];
                if !neighbor.visited {
                    neighbor.visited = true;
                    stack.push(n);
                }
            }
        }
        found
    }

    /// All tiles in connected components with no member in the ceiling row.
    /// Row 0 is the only anchor; everything else is unsupported.
    pub fn find_floating(&mut self) -> Vec<TileId> {
        self.reset_visited();
        let mut floating = Vec::new();
        for row in 0..self.rows {
            for col in 0..self.columns {
                let Some(id) = self.get(col, row) else { continue };
                if self.tiles[id.0].visited {
                    continue;
                }
                let component = self.find_connected(col, row, false, false, true);
                let mut anchored = false;
                for &member in &component {
                    let tile = &self.tiles[member.0];
                    if self.to_grid(tile.x, tile.y).1 == 0 {
                        anchored = true;
                        break;
                    }
                }
                if !anchored {
                    floating.extend(component);
                }
            }
        }
        floating
    }

    /// First half of a ceiling-row injection: shift every row down one and
    /// flip the parity flag. Each row keeps its horizontal offset under the
    /// flipped flag, so tile x positions stay valid and only y moves. The
    /// caller refills row 0 afterwards.
    pub fn shift_down(&mut self) {
        debug_assert!(
            !self.bottom_row_occupied(),
            "shifting into an occupied bottom row"
        );
        self.start_even = !self.start_even;
        for row in (0..self.rows - 1).rev() {
            for col in 0..self.columns {
                let moved = self.cells[row * self.columns + col].take();
                if let Some(id) = moved {
                    self.tiles[id.0].y += self.row_height;
                }
                self.cells[(row + 1) * self.columns + col] = moved;
            }
        }
    }

    /// Loss scan: any bubble in the bottom row.
    pub fn bottom_row_occupied(&self) -> bool {
        (0..self.columns).any(|col| self.get(col, self.rows - 1).is_some())
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(grid: &mut Grid, col: usize, row: usize, color: BubbleColor) -> TileId {
        let (x, y) = grid.to_scene(col, row);
        let id = grid.spawn(color, x, y);
        grid.set(col, row, Some(id));
        id
    }

    #[test]
    fn scene_grid_round_trip_both_parities() {
        let mut grid = Grid::new(8, 14, 16.0);
        for _ in 0..2 {
            for row in 0..grid.rows() {
                for col in 0..grid.usable_columns(row) {
                    let (x, y) = grid.to_scene(col, row);
                    assert_eq!(grid.to_grid(x, y), (col, row), "({col},{row})");
                }
            }
            grid.shift_down();
        }
    }

    #[test]
    fn offset_row_right_edge_clamps() {
        let mut grid = Grid::new(8, 14, 16.0);
        for _ in 0..2 {
            let offset_row = (0..grid.rows()).find(|&r| grid.is_offset_row(r)).unwrap();
            // A landing in the phantom 8th slot of an offset row files into
            // the last usable column instead.
            let (x, y) = grid.to_scene(7, offset_row);
            assert_eq!(grid.to_grid(x, y), (6, offset_row));
            grid.shift_down();
        }
    }

    #[test]
    fn adjacency_is_symmetric_under_both_parities() {
        let mut grid = Grid::new(8, 14, 16.0);
        for _ in 0..2 {
            for row in 0..grid.rows() {
                for col in 0..grid.usable_columns(row) {
                    place(&mut grid, col, row, BubbleColor::Red);
                }
            }
            for row in 0..grid.rows() {
                for col in 0..grid.usable_columns(row) {
                    let id = grid.get(col, row).unwrap();
                    for n in grid.neighbors(id) {
                        assert!(
                            grid.neighbors(n).contains(&id),
                            "asymmetric adjacency at ({col},{row})"
                        );
                    }
                }
            }
            let mut cleared = Grid::new(8, 14, 16.0);
            cleared.shift_down();
            grid = cleared;
        }
    }

    #[test]
    fn cluster_ignores_isolated_other_color() {
        let mut grid = Grid::new(8, 14, 16.0);
        let run: Vec<TileId> = (0..4)
            .map(|col| place(&mut grid, col, 0, BubbleColor::Blue))
            .collect();
        place(&mut grid, 6, 5, BubbleColor::Red);

        for seed_col in 0..4 {
            let cluster = grid.find_connected(seed_col, 0, true, true, false);
            assert_eq!(cluster.len(), 4);
            for id in &run {
                assert!(cluster.contains(id));
            }
        }
    }

    #[test]
    fn flood_does_not_cross_colors() {
        let mut grid = Grid::new(8, 14, 16.0);
        place(&mut grid, 0, 0, BubbleColor::Red);
        place(&mut grid, 1, 0, BubbleColor::Red);
        place(&mut grid, 2, 0, BubbleColor::Blue);
        place(&mut grid, 3, 0, BubbleColor::Red);

        let cluster = grid.find_connected(0, 0, true, true, false);
        assert_eq!(cluster.len(), 2, "trailing red past the blue is unreachable");
    }

    #[test]
    fn floating_detection_finds_only_detached_tiles() {
        let mut grid = Grid::new(8, 14, 16.0);
        // Anchored chain: ceiling tile connected straight down through row 3.
        for row in 0..4 {
            place(&mut grid, 3, row, BubbleColor::Green);
        }
        // Detached pair, nowhere near the chain.
        let a = place(&mut grid, 6, 8, BubbleColor::Yellow);
        let b = place(&mut grid, 6, 9, BubbleColor::Red);

        let floating = grid.find_floating();
        assert_eq!(floating.len(), 2);
        assert!(floating.contains(&a) && floating.contains(&b));
    }

    #[test]
    fn retired_tiles_are_skipped() {
        let mut grid = Grid::new(8, 14, 16.0);
        place(&mut grid, 0, 0, BubbleColor::Cyan);
        let stale = place(&mut grid, 1, 0, BubbleColor::Cyan);
        grid.retire(stale);

        let component = grid.find_connected(0, 0, false, true, true);
        assert_eq!(component.len(), 1);
        assert!(!component.contains(&stale));
    }

    #[test]
    fn pool_reuses_recycled_ids() {
        let mut grid = Grid::new(8, 14, 16.0);
        let id = place(&mut grid, 0, 0, BubbleColor::Red);
        grid.set(0, 0, None);
        grid.retire(id);
        grid.recycle(id);
        let reused = grid.spawn(BubbleColor::Blue, 0.0, 0.0);
        assert_eq!(reused, id);
        assert!(!grid.tile(reused).retired());
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn out_of_range_access_fails_loudly() {
        let grid = Grid::new(8, 14, 16.0);
        let _ = grid.get(8, 0);
    }
}
