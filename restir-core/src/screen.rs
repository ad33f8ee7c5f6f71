use glam::{ivec2, IVec2, UVec2};

/// Frame dimensions plus helpers for addressing per-pixel buffers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Screen {
    size: UVec2,
}

impl Screen {
    pub fn new(size: UVec2) -> Self {
        Self { size }
    }

    pub fn size(&self) -> UVec2 {
        self.size
    }

    pub fn len(&self) -> usize {
        (self.size.x as usize) * (self.size.y as usize)
    }

    /// Given a point in screen-coordinates, returns a unique index for it; used
    /// to index screen-space structures.
    pub fn screen_to_idx(&self, pos: UVec2) -> usize {
        (pos.y as usize) * (self.size.x as usize) + (pos.x as usize)
    }

    /// Inverse of [`Self::screen_to_idx()`].
    pub fn idx_to_screen(&self, idx: usize) -> UVec2 {
        let width = self.size.x.max(1) as usize;

        UVec2::new((idx % width) as u32, (idx / width) as u32)
    }

    /// Returns whether given point lays inside the screen.
    pub fn contains(&self, pos: IVec2) -> bool {
        let size = self.size.as_ivec2();

        pos.x >= 0 && pos.y >= 0 && pos.x < size.x && pos.y < size.y
    }

    /// Mirrors given point back into the screen, so that neighbours picked
    /// near the borders remain valid.
    pub fn contain(&self, pos: IVec2) -> UVec2 {
        fn reflect(x: i32, len: i32) -> i32 {
            let x = if x < 0 { -x } else { x };
            let x = if x >= len { 2 * len - x - 1 } else { x };

            x.clamp(0, (len - 1).max(0))
        }

        let size = self.size.as_ivec2();

        ivec2(reflect(pos.x, size.x), reflect(pos.y, size.y)).as_uvec2()
    }

    /// Returns whether given pixel gets initial candidates during given frame
    /// when checkerboarding is enabled.
    pub fn is_checkerboard_active(pos: UVec2, frame: u32) -> bool {
        (pos.x ^ pos.y ^ frame) & 1 == 0
    }
}
