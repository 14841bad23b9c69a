use crate::error::{DatasetError, Result};
use ndarray::{ArrayD, ArrayViewD, Axis, Slice};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Column/row counts of the tiling grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSpec {
    pub cols: u32,
    pub rows: u32,
}

impl GridSpec {
    pub fn new(cols: u32, rows: u32) -> Self {
        Self { cols, rows }
    }

    pub fn tile_count(&self) -> usize {
        self.cols as usize * self.rows as usize
    }

    /// Positions of every tile in row-major order
    pub fn positions(&self) -> impl Iterator<Item = TilePosition> + '_ {
        (1..=self.tile_count() as u32).map(move |index| TilePosition::from_index(index, self.cols))
    }

    pub fn contains_index(&self, index: u32) -> bool {
        index >= 1 && index as usize <= self.tile_count()
    }
}

impl Default for GridSpec {
    fn default() -> Self {
        Self::new(8, 8)
    }
}

impl fmt::Display for GridSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.cols, self.rows)
    }
}

/// 1-based location of a tile in the grid, `index = (row - 1) * cols + col`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TilePosition {
    pub index: u32,
    pub row: u32,
    pub col: u32,
}

impl TilePosition {
    pub fn from_index(index: u32, cols: u32) -> Self {
        debug_assert!(index >= 1 && cols >= 1);
        Self {
            index,
            row: (index - 1) / cols + 1,
            col: (index - 1) % cols + 1,
        }
    }
}

/// Splits an image buffer into `cols * rows` equally sized tiles in row-major order
///
/// The first two axes of `img` are height and width; any further axes (channels)
/// are carried through untouched. Each tile is `floor(H / rows) x floor(W / cols)`,
/// trailing pixels that do not fill a whole tile are dropped.
///
/// # Arguments
/// * `img` - Image buffer laid out as (H, W, ...)
/// * `cols` - Number of grid columns
/// * `rows` - Number of grid rows
///
/// # Returns
/// The tiles, tile `k` (1-based) covering grid cell `TilePosition::from_index(k, cols)`
pub fn split_into_grid<A: Clone>(
    img: ArrayViewD<'_, A>,
    cols: u32,
    rows: u32,
) -> Result<Vec<ArrayD<A>>> {
    if img.ndim() < 2 {
        return Err(DatasetError::Dimensionality(img.ndim()));
    }
    if cols == 0 || rows == 0 {
        return Err(DatasetError::InvalidConfig(format!(
            "grid must have at least one column and row, got {}x{}",
            cols, rows
        )));
    }

    let shape = img.shape();
    let tile_h = shape[0] / rows as usize;
    let tile_w = shape[1] / cols as usize;

    let mut tiles = Vec::with_capacity(cols as usize * rows as usize);
    for r in 0..rows as usize {
        let y_start = r * tile_h;
        let band = img.slice_axis(Axis(0), Slice::from(y_start..y_start + tile_h));
        for c in 0..cols as usize {
            let x_start = c * tile_w;
            let tile = band.slice_axis(Axis(1), Slice::from(x_start..x_start + tile_w));
            tiles.push(tile.to_owned());
        }
    }

    Ok(tiles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3, IxDyn, s};

    fn gradient(h: usize, w: usize) -> Array3<u16> {
        Array3::from_shape_fn((h, w, 3), |(y, x, ch)| (y * 1000 + x * 3 + ch) as u16)
    }

    #[test]
    fn test_tile_count_and_size() {
        let img = gradient(600, 800);
        let tiles = split_into_grid(img.view().into_dyn(), 8, 8).unwrap();
        assert_eq!(tiles.len(), 64);
        for tile in &tiles {
            assert_eq!(tile.shape(), &[75, 100, 3]);
        }
    }

    #[test]
    fn test_tiles_match_source_subrectangles() {
        let (h, w, cols, rows) = (37, 53, 5, 4);
        let img = gradient(h, w);
        let tiles = split_into_grid(img.view().into_dyn(), cols, rows).unwrap();
        let (tile_h, tile_w) = (h / rows as usize, w / cols as usize);

        for (k, tile) in tiles.iter().enumerate() {
            let pos = TilePosition::from_index(k as u32 + 1, cols);
            let y0 = (pos.row as usize - 1) * tile_h;
            let x0 = (pos.col as usize - 1) * tile_w;
            let expected = img.slice(s![y0..y0 + tile_h, x0..x0 + tile_w, ..]);
            assert_eq!(tile.view(), expected.into_dyn());
        }
    }

    #[test]
    fn test_trailing_pixels_dropped() {
        let img = Array2::from_shape_fn((10, 10), |(y, x)| (y * 10 + x) as u8);
        let tiles = split_into_grid(img.view().into_dyn(), 3, 3).unwrap();
        assert_eq!(tiles.len(), 9);
        assert_eq!(tiles[8].shape(), &[3, 3]);
        // last tile ends at (8, 8); row/col 9 are never copied
        assert_eq!(tiles[8][IxDyn(&[2, 2])], 88);
    }

    #[test]
    fn test_rejects_one_dimensional_buffer() {
        let img = ArrayD::<u8>::zeros(IxDyn(&[64]));
        let err = split_into_grid(img.view(), 8, 8).unwrap_err();
        assert!(matches!(err, DatasetError::Dimensionality(1)));
    }

    #[test]
    fn test_position_formula() {
        let cols = 8;
        for k in 1..=64u32 {
            let pos = TilePosition::from_index(k, cols);
            assert_eq!(pos.row, k.div_ceil(cols));
            assert_eq!(pos.col, ((k - 1) % cols) + 1);
            assert_eq!(pos.index, (pos.row - 1) * cols + pos.col);
        }
        let grid = GridSpec::new(3, 2);
        let indices: Vec<u32> = grid.positions().map(|p| p.index).collect();
        assert_eq!(indices, vec![1, 2, 3, 4, 5, 6]);
        assert!(grid.contains_index(6));
        assert!(!grid.contains_index(7));
        assert!(!grid.contains_index(0));
    }
}
