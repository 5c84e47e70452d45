use crate::grid::MaskedGrid;
use log::debug;

/// Fills masked cells of a `[depth × sample]` grid from the same
/// depth row at cyclically shifted sample positions.
///
/// Shifts of 1, 2, … `samples - 1` are tried in order, each reading
/// from the grid as left by the previous shift, until nothing is left
/// masked. A row with no valid value at all stays masked.
///
/// Returns the number of cells filled.
pub fn fill_depth_gaps(grid: &mut MaskedGrid) -> usize {
    let (rows, cols) = grid.shape();
    let mut filled = 0;
    for shift in 1..cols {
        if grid.masked_count() == 0 {
            break;
        }
        let source = grid.clone();
        for row in 0..rows {
            for col in 0..cols {
                if !source.is_masked(row, col) {
                    continue;
                }
                let from = (col + cols - shift) % cols;
                if let Some(v) = source.get(row, from) {
                    grid.set(row, col, Some(v));
                    filled += 1;
                }
            }
        }
    }
    debug!("filled {filled} masked cells, {} remain", grid.masked_count());
    filled
}
