use crate::config::RenderConfig;

/// Pixel rectangle with the origin at the top left of the image
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn area(&self) -> usize {
        (self.width * self.height) as usize
    }

    /// Pixels in row-major order
    pub fn pixels(self) -> impl Iterator<Item = (u32, u32)> {
        (self.top..self.top + self.height)
            .flat_map(move |y| (self.left..self.left + self.width).map(move |x| (x, y)))
    }
}

/// Splits the image into row-major square blocks
#[derive(Clone, Debug)]
pub struct RenderCoordinator {
    pub width: u32,
    pub height: u32,
    block_size: u32,
    x_blocks: usize,
    y_blocks: usize,
}

impl RenderCoordinator {
    pub fn new(config: &RenderConfig) -> RenderCoordinator {
        let width = config.width;
        let height = config.height;
        let block_size = config.tile_size.max(1);
        let x_blocks = ((width + block_size - 1) / block_size) as usize;
        let y_blocks = ((height + block_size - 1) / block_size) as usize;
        RenderCoordinator {
            width,
            height,
            block_size,
            x_blocks,
            y_blocks,
        }
    }

    pub fn block_count(&self) -> usize {
        self.x_blocks * self.y_blocks
    }

    /// Rectangle of the block_i:th block. Edge blocks are clipped to the image.
    pub fn block(&self, block_i: usize) -> Option<Rect> {
        if block_i >= self.block_count() {
            return None;
        }
        let x_i = (block_i % self.x_blocks) as u32;
        let y_i = (block_i / self.x_blocks) as u32;
        let start_x = self.block_size * x_i;
        let end_x = (self.block_size * (x_i + 1)).min(self.width);
        let start_y = self.block_size * y_i;
        let end_y = (self.block_size * (y_i + 1)).min(self.height);
        Some(Rect {
            left: start_x,
            top: start_y,
            width: end_x - start_x,
            height: end_y - start_y,
        })
    }
}
