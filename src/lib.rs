// Library exports for reelplot

pub mod backend;
pub mod error;
pub mod format;
pub mod geometry;
pub mod kind;
pub mod options;
pub mod palette;
pub mod params;
pub mod render;
pub mod stats;
pub mod surface;
pub mod table;

pub use error::{ChartError, Result};
pub use kind::ChartKind;
pub use options::{Param, RenderOptions, Transform};
pub use render::{render, Selector};
pub use surface::{Surface, SurfaceHandle};
pub use table::{Column, ColumnType, Table};
