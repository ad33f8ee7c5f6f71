use crate::{Config, Dispatch, FrameBuffers, FrameContext, Scene};

/// Fetches the primary surfaces of the current frame.
#[derive(Debug)]
pub struct LoadSurfaceDataStage;

impl LoadSurfaceDataStage {
    pub fn new(_: &Config) -> Self {
        Self
    }

    pub fn run<S, D>(
        &self,
        ctx: &FrameContext<'_, S, D>,
        buffers: &mut FrameBuffers,
    ) where
        S: Scene,
        D: Dispatch,
    {
        let screen = buffers.screen;

        ctx.dispatcher
            .dispatch(buffers.surfaces.curr_mut(), |idx, surface| {
                *surface = ctx.scene.surface(screen.idx_to_screen(idx));
            });
    }
}
