//! Patch surface tessellation.
//!
//! Subdivision reproduces the legacy compiler: every round inserts a column between each pair of
//! even columns and a row between each pair of even rows, then a final pass pulls the odd rows and
//! columns onto the curve their neighbours describe.

/// Largest width or height a control grid may grow to.
pub const MAX_GRID_SIZE: usize = 65;

/// A row major grid of patch control points.
#[derive(Clone, Debug, PartialEq)]
pub struct ControlGrid<V> {
    rows: Vec<Vec<V>>,
}

impl<V> ControlGrid<V> {
    /// Splits row major `points` into a grid. Patch grids need odd dimensions of at least three.
    pub fn new(width: usize, height: usize, points: Vec<V>) -> Option<Self> {
        if width < 3 || height < 3 || width % 2 == 0 || height % 2 == 0 {
            return None;
        }
        if width > MAX_GRID_SIZE || height > MAX_GRID_SIZE || points.len() != width * height {
            return None;
        }
        let mut points = points.into_iter();
        let rows = (0..height)
            .map(|_| points.by_ref().take(width).collect())
            .collect();
        Some(Self { rows })
    }

    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn get(&self, row: usize, column: usize) -> &V {
        &self.rows[row][column]
    }

    pub fn rows(&self) -> &[Vec<V>] {
        &self.rows
    }

    /// Row major points.
    pub fn into_points(self) -> Vec<V> {
        self.rows.into_iter().flatten().collect()
    }

    pub fn map<U>(self, mut f: impl FnMut(V) -> U) -> ControlGrid<U> {
        ControlGrid {
            rows: self
                .rows
                .into_iter()
                .map(|row| row.into_iter().map(&mut f).collect())
                .collect(),
        }
    }
}

/// Width or height after `level` rounds, ignoring the size bound.
pub fn subdivided_size(size: usize, level: i32) -> usize {
    if level <= 0 {
        size
    } else {
        (size - 1) * (1 << level) + 1
    }
}

fn insert_columns<V>(
    rows: &mut [Vec<V>],
    lerp: &impl Fn(&V, &V) -> V,
    write: &impl Fn(&mut V, V),
) {
    let mut width = rows.first().map_or(0, Vec::len);
    let mut j = 0;
    while j + 2 < width {
        if width + 2 > MAX_GRID_SIZE {
            log::debug!("patch width capped at {width}");
            break;
        }
        for row in rows.iter_mut() {
            let prev = lerp(&row[j], &row[j + 1]);
            let next = lerp(&row[j + 1], &row[j + 2]);
            let mid = lerp(&prev, &next);
            write(&mut row[j + 1], prev);
            row.insert(j + 2, next);
            row.insert(j + 2, mid);
        }
        width += 2;
        j += 4;
    }
}

fn insert_rows<V>(
    rows: &mut Vec<Vec<V>>,
    lerp: &impl Fn(&V, &V) -> V,
    write: &impl Fn(&mut V, V),
) {
    let mut i = 0;
    while i + 2 < rows.len() {
        if rows.len() + 2 > MAX_GRID_SIZE {
            log::debug!("patch height capped at {}", rows.len());
            break;
        }
        let width = rows[i].len();
        let mut prev_row = Vec::with_capacity(width);
        let mut mid_row = Vec::with_capacity(width);
        let mut next_row = Vec::with_capacity(width);
        for c in 0..width {
            let prev = lerp(&rows[i][c], &rows[i + 1][c]);
            let next = lerp(&rows[i + 1][c], &rows[i + 2][c]);
            mid_row.push(lerp(&prev, &next));
            prev_row.push(prev);
            next_row.push(next);
        }
        for (slot, prev) in rows[i + 1].iter_mut().zip(prev_row) {
            write(slot, prev);
        }
        rows.insert(i + 2, next_row);
        rows.insert(i + 2, mid_row);
        i += 4;
    }
}

fn put_on_curve<V>(rows: &mut [Vec<V>], lerp: &impl Fn(&V, &V) -> V, write: &impl Fn(&mut V, V)) {
    let height = rows.len();
    let width = rows.first().map_or(0, Vec::len);

    for c in 0..width {
        for r in (1..height.saturating_sub(1)).step_by(2) {
            let prev = lerp(&rows[r][c], &rows[r + 1][c]);
            let next = lerp(&rows[r][c], &rows[r - 1][c]);
            write(&mut rows[r][c], lerp(&prev, &next));
        }
    }
    for row in rows.iter_mut() {
        for c in (1..width.saturating_sub(1)).step_by(2) {
            let prev = lerp(&row[c], &row[c + 1]);
            let next = lerp(&row[c], &row[c - 1]);
            write(&mut row[c], lerp(&prev, &next));
        }
    }
}

fn run<V: Clone>(
    grid: &ControlGrid<V>,
    level: i32,
    lerp: impl Fn(&V, &V) -> V,
    write: impl Fn(&mut V, V),
) -> ControlGrid<V> {
    let mut rows = grid.rows.clone();
    if level < 0 {
        return ControlGrid { rows };
    }
    for _ in 0..level {
        insert_columns(&mut rows, &lerp, &write);
        insert_rows(&mut rows, &lerp, &write);
    }
    put_on_curve(&mut rows, &lerp, &write);
    ControlGrid { rows }
}

/// Subdivides `grid` `level` times and smooths the result. A negative level copies the grid.
pub fn subdivide<V: Clone>(
    grid: &ControlGrid<V>,
    level: i32,
    lerp: impl Fn(&V, &V) -> V,
) -> ControlGrid<V> {
    run(grid, level, lerp, |slot, value| *slot = value)
}

/// Like [`subdivide`], for vertices tagged with the source vertex occupying their grid slot.
///
/// Slots that held a control point keep its tag when their value is recomputed, inserted slots
/// are untagged.
pub fn subdivide_tagged<V: Clone>(
    grid: &ControlGrid<(V, Option<u32>)>,
    level: i32,
    lerp: impl Fn(&V, &V) -> V,
) -> ControlGrid<(V, Option<u32>)> {
    run(
        grid,
        level,
        |a, b| (lerp(&a.0, &b.0), None),
        |slot, value| slot.0 = value.0,
    )
}

/// One quad per grid cell in row major order, counter-clockwise unless `flip` is set.
pub fn quads(width: usize, height: usize, flip: bool) -> Vec<[u32; 4]> {
    let mut quads = Vec::with_capacity(width.saturating_sub(1) * height.saturating_sub(1));
    for r in 0..height.saturating_sub(1) {
        for c in 0..width.saturating_sub(1) {
            let k = (r * width + c) as u32;
            let w = width as u32;
            let mut quad = [k, k + w, k + w + 1, k + 1];
            if flip {
                quad.reverse();
            }
            quads.push(quad);
        }
    }
    quads
}

#[cfg(test)]
mod patch_tests {
    use glam::Vec3;

    use super::*;

    fn mid(a: &Vec3, b: &Vec3) -> Vec3 {
        (*a + *b) * 0.5
    }

    fn flat_grid(width: usize, height: usize) -> ControlGrid<Vec3> {
        let points = (0..height)
            .flat_map(|r| (0..width).map(move |c| Vec3::new(c as f32 * 8.0, r as f32 * 16.0, 0.0)))
            .collect();
        ControlGrid::new(width, height, points).unwrap()
    }

    #[test]
    fn rejects_unusable_grids() {
        assert!(ControlGrid::new(2, 3, vec![0; 6]).is_none());
        assert!(ControlGrid::new(3, 3, vec![0; 8]).is_none());
        assert!(ControlGrid::new(1, 1, vec![0]).is_none());
        assert!(ControlGrid::new(67, 3, vec![0; 201]).is_none());
        assert!(ControlGrid::new(3, 5, vec![0; 15]).is_some());
    }

    #[test]
    fn width_grows_as_two_w_minus_one() {
        let grid = flat_grid(3, 3);
        for (level, size) in [(0, 3), (1, 5), (2, 9), (3, 17), (4, 33), (5, 65), (6, 65)] {
            let out = subdivide(&grid, level, mid);
            assert_eq!(out.width(), size, "level {level}");
            assert_eq!(out.height(), size, "level {level}");
            assert!(out.rows().iter().all(|row| row.len() == size));
        }
        assert_eq!(subdivided_size(5, 2), 17);
        assert_eq!(subdivide(&flat_grid(5, 3), 2, mid).width(), 17);
    }

    #[test]
    fn growth_stops_at_bound() {
        let out = subdivide(&flat_grid(49, 3), 1, mid);
        assert_eq!(out.width(), MAX_GRID_SIZE);
        assert_eq!(out.height(), 5);
    }

    #[test]
    fn negative_level_copies() {
        let mut grid = flat_grid(3, 3);
        grid.rows[1][1].z = 100.0;
        assert_eq!(subdivide(&grid, -1, mid), grid);
    }

    #[test]
    fn smoothing_is_stable_on_flat_grids() {
        let grid = flat_grid(5, 3);
        assert_eq!(subdivide(&grid, 0, mid), grid);

        let fine = subdivide(&grid, 2, mid);
        for (r, row) in fine.rows().iter().enumerate() {
            for (c, p) in row.iter().enumerate() {
                assert_eq!(*p, Vec3::new(c as f32 * 2.0, r as f32 * 4.0, 0.0));
            }
        }
        assert_eq!(subdivide(&fine, 0, mid), fine);
    }

    #[test]
    fn smoothing_puts_control_points_on_the_curve() {
        let mut grid = flat_grid(3, 3);
        for row in &mut grid.rows {
            row[1].z = 8.0;
        }
        let out = subdivide(&grid, 0, mid);
        assert_eq!(out.get(0, 1).z, 4.0);
        assert_eq!(out.get(2, 1).z, 4.0);
        assert_eq!(out.get(1, 0).z, 0.0);
    }

    fn curved_grid(width: usize, spacing: f32, heights: &[f32]) -> ControlGrid<Vec3> {
        let points = heights
            .iter()
            .enumerate()
            .map(|(i, &z)| {
                let (c, r) = ((i % width) as f32, (i / width) as f32);
                Vec3::new(c * spacing, r * spacing, z)
            })
            .collect();
        ControlGrid::new(width, heights.len() / width, points).unwrap()
    }

    fn heights(grid: &ControlGrid<Vec3>, row: usize) -> Vec<f32> {
        grid.rows()[row].iter().map(|p| p.z).collect()
    }

    #[rustfmt::skip]
    const BUMPY: [f32; 9] = [
        0.0, 64.0, 128.0,
        32.0, 256.0, 0.0,
        192.0, 0.0, 64.0,
    ];

    #[test]
    fn curved_grid_one_round() {
        let out = subdivide(&curved_grid(3, 64.0, &BUMPY), 1, mid);
        assert_eq!((out.width(), out.height()), (5, 5));
        assert_eq!(heights(&out, 0), [0.0, 32.0, 64.0, 96.0, 128.0]);
        assert_eq!(heights(&out, 1), [24.0, 67.75, 91.0, 93.75, 76.0]);
        assert_eq!(heights(&out, 2), [64.0, 93.0, 100.0, 85.0, 48.0]);
        assert_eq!(heights(&out, 3), [120.0, 107.75, 91.0, 69.75, 44.0]);
        assert_eq!(heights(&out, 4), [192.0, 112.0, 64.0, 48.0, 64.0]);
        assert_eq!(out.get(3, 1).x, 32.0);
        assert_eq!(out.get(3, 1).y, 96.0);
    }

    #[test]
    fn curved_grid_two_rounds() {
        let out = subdivide(&curved_grid(3, 64.0, &BUMPY), 2, mid);
        assert_eq!((out.width(), out.height()), (9, 9));
        assert_eq!(out.get(1, 1).z, 32.171875);
        assert_eq!(out.get(3, 5).z, 96.921875);
        assert_eq!(out.get(4, 4).z, 100.0);
        assert_eq!(out.get(5, 0).z, 90.0);
        assert_eq!(out.get(7, 8).z, 51.0);
        assert_eq!(heights(&out, 8), [192.0, 148.0, 112.0, 84.0, 64.0, 52.0, 48.0, 52.0, 64.0]);
    }

    #[test]
    fn wide_curved_grid_one_round() {
        #[rustfmt::skip]
        let wide = [
            0.0, 64.0, 128.0, 0.0, 32.0,
            32.0, 256.0, 0.0, 64.0, 0.0,
            192.0, 0.0, 64.0, 128.0, 256.0,
        ];
        let out = subdivide(&curved_grid(5, 64.0, &wide), 1, mid);
        assert_eq!((out.width(), out.height()), (9, 5));
        assert_eq!(
            heights(&out, 1),
            [24.0, 67.75, 91.0, 93.75, 76.0, 56.875, 43.5, 35.875, 34.0]
        );
        assert_eq!(
            heights(&out, 3),
            [120.0, 107.75, 91.0, 69.75, 44.0, 69.875, 95.5, 120.875, 146.0]
        );
        assert_eq!(out.get(0, 5).z, 74.0);
        assert_eq!(out.get(0, 5).x, 160.0);
    }

    #[test]
    fn capped_grid_keeps_the_tail_unsplit() {
        let heights_49x3: Vec<f32> = (0..3)
            .flat_map(|r| {
                let lift = if r == 1 { 64.0 } else { 0.0 };
                (0..49).map(move |c| (16 * (c % 4)) as f32 + lift)
            })
            .collect();
        let out = subdivide(&curved_grid(49, 8.0, &heights_49x3), 1, mid);
        assert_eq!((out.width(), out.height()), (MAX_GRID_SIZE, 5));

        // columns up to the eighth inserted pair are split at 4 unit spacing, the rest keep 8
        let xs: Vec<f32> = out.rows()[0][28..36].iter().map(|p| p.x).collect();
        assert_eq!(xs, [112.0, 116.0, 120.0, 124.0, 128.0, 136.0, 144.0, 152.0]);
        assert_eq!(heights(&out, 0)[28..36], [32.0, 36.0, 32.0, 20.0, 0.0, 16.0, 32.0, 32.0]);
        assert_eq!(heights(&out, 2)[28..36], [64.0, 68.0, 64.0, 52.0, 32.0, 48.0, 64.0, 64.0]);
        assert_eq!(out.get(0, 64).x, 384.0);
        assert_eq!(out.get(1, 64).z, 24.0);
    }

    #[test]
    fn tags_follow_their_slots() {
        let points = (0..9u32)
            .map(|i| (Vec3::new((i % 3) as f32, (i / 3) as f32, 0.0), Some(i)))
            .collect();
        let grid = ControlGrid::new(3, 3, points).unwrap();
        let out = subdivide_tagged(&grid, 1, mid);
        assert_eq!(out.width(), 5);

        let tagged: Vec<(usize, usize, u32)> = out
            .rows()
            .iter()
            .enumerate()
            .flat_map(|(r, row)| {
                row.iter()
                    .enumerate()
                    .filter_map(move |(c, (_, tag))| tag.map(|t| (r, c, t)))
            })
            .collect();
        assert_eq!(tagged.len(), 9);
        assert_eq!(tagged[0], (0, 0, 0));
        assert_eq!(tagged[1], (0, 1, 1));
        assert_eq!(tagged[2], (0, 4, 2));
        assert_eq!(tagged[8], (4, 4, 8));
        assert_eq!(out.get(4, 4).0, Vec3::new(2.0, 2.0, 0.0));
    }

    #[test]
    fn quads_cover_every_cell() {
        let q = quads(3, 2, false);
        assert_eq!(q, [[0, 3, 4, 1], [1, 4, 5, 2]]);
        assert_eq!(quads(3, 2, true)[0], [1, 4, 3, 0]);
        assert_eq!(quads(65, 65, false).len(), 64 * 64);
    }
}
