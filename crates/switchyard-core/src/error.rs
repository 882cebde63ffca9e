use thiserror::Error;

/// Failures while reconstructing the track graph
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("no markers were detected, cannot calibrate the grid")]
    EmptyLayout,

    #[error("marker spread too small for a {rows}x{cols} grid (cell {cell_width}x{cell_height} px)")]
    DegenerateLayout {
        rows: usize,
        cols: usize,
        cell_width: i32,
        cell_height: i32,
    },

    #[error("no column offers an empty entry run next to a gate")]
    NoEntry,

    #[error("point #{0} does not exist")]
    UnknownPoint(usize),
}

pub type Result<T> = std::result::Result<T, GraphError>;
