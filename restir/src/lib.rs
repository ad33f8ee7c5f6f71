//! Reservoir-based spatiotemporal importance resampling (ReSTIR) of direct
//! and indirect lightning, running on the CPU over host-provided scenes.
//!
//! The host implements [`Scene`], registers its lights through
//! [`Renderer::lights_mut()`] and calls [`Renderer::render()`] once per
//! frame.

#![allow(clippy::len_without_is_empty)]
#![allow(clippy::too_many_arguments)]

mod buffers;
mod config;
mod dispatch;
mod error;
mod light;
mod light_tiles;
mod lights;
mod renderer;
mod scene;
#[cfg(test)]
mod testing;
mod utils;

pub use restir_core::*;

pub use self::buffers::*;
pub use self::config::*;
pub use self::dispatch::*;
pub use self::error::*;
pub use self::light::*;
pub use self::light_tiles::*;
pub use self::lights::*;
pub use self::renderer::*;
pub use self::scene::*;
