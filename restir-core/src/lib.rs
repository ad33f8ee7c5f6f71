//! Per-pixel structs and algorithms shared by the resampling stages: alias
//! tables, reservoirs, surfaces, light tiles and random numbers.

#![allow(clippy::len_without_is_empty)]
#![allow(clippy::manual_range_contains)]

mod alias_table;
mod light;
mod light_tiles;
mod noise;
mod reservoir;
mod screen;
mod surface;
mod target;
mod utils;

pub use self::alias_table::*;
pub use self::light::*;
pub use self::light_tiles::*;
pub use self::noise::*;
pub use self::reservoir::*;
pub use self::screen::*;
pub use self::surface::*;
pub use self::target::*;
pub use self::utils::*;

/// Golden angle, used to spread neighbour offsets for spatial reuse.
pub const GOLDEN_ANGLE: f32 = 2.39996;
