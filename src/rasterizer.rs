use crate::picture;
use crate::tracer::{PictureTracer, PlaneWriter, PICTURE_HEIGHT, PICTURE_WIDTH};

pub const DEFAULT_COLOR: u8 = 0x0f;
pub const DEFAULT_PRIORITY: u8 = 0x04;

// Priority values below this are control codes (walk blocks, triggers, water).
pub const FIRST_PRIORITY: u8 = 4;
pub const NO_CONTROL: u8 = 15;

pub struct PictureRasterizer {
    pub screen: Box<[u8]>,
    pub priority: Box<[u8]>,
}

fn index(x: usize, y: usize) -> Option<usize> {
    if x < PICTURE_WIDTH && y < PICTURE_HEIGHT {
        Some(y * PICTURE_WIDTH + x)
    } else {
        None
    }
}

impl PictureRasterizer {
    pub fn new() -> PictureRasterizer {
        let screen_size = PICTURE_WIDTH * PICTURE_HEIGHT;
        PictureRasterizer{
            screen: vec![ DEFAULT_COLOR; screen_size ].into_boxed_slice(),
            priority: vec![ DEFAULT_PRIORITY; screen_size ].into_boxed_slice(),
        }
    }

    pub fn draw(&mut self, engine_version: u16, data: &[u8]) {
        let commands = picture::decode_picture(data);
        PictureTracer::new(engine_version, self).run(&commands);
    }

    pub fn render(engine_version: u16, data: &[u8]) -> (Vec<u8>, Vec<u8>) {
        let mut rasterizer = PictureRasterizer::new();
        rasterizer.draw(engine_version, data);
        (rasterizer.screen.into_vec(), rasterizer.priority.into_vec())
    }
}

impl Default for PictureRasterizer {
    fn default() -> Self {
        PictureRasterizer::new()
    }
}

impl PlaneWriter for PictureRasterizer {
    fn pixel_screen(&self, x: usize, y: usize) -> u8 {
        index(x, y).map_or(0, |i| self.screen[i])
    }

    fn set_pixel_screen(&mut self, x: usize, y: usize, color: u8) {
        if let Some(i) = index(x, y) {
            self.screen[i] = color;
        }
    }

    fn pixel_priority(&self, x: usize, y: usize) -> u8 {
        index(x, y).map_or(0, |i| self.priority[i])
    }

    fn set_pixel_priority(&mut self, x: usize, y: usize, priority: u8) {
        if let Some(i) = index(x, y) {
            self.priority[i] = priority;
        }
    }
}

// Separates a combined priority plane into (priority, control). A control
// code takes its priority from the first real priority below it in the
// same column.
pub fn split_priority_and_control(data: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let screen_size = PICTURE_WIDTH * PICTURE_HEIGHT;
    let mut priority = vec![ 0u8; screen_size ];
    let mut control = vec![ 0u8; screen_size ];
    let pixel = |x: usize, y: usize| data.get(y * PICTURE_WIDTH + x).copied().unwrap_or(0);

    for y in 0..PICTURE_HEIGHT {
        for x in 0..PICTURE_WIDTH {
            let offset = y * PICTURE_WIDTH + x;
            let value = pixel(x, y);
            if value < FIRST_PRIORITY {
                control[offset] = value;
                priority[offset] = ((y + 1)..PICTURE_HEIGHT)
                    .map(|below| pixel(x, below))
                    .find(|&p| p >= FIRST_PRIORITY)
                    .unwrap_or(FIRST_PRIORITY);
            } else {
                control[offset] = NO_CONTROL;
                priority[offset] = value;
            }
        }
    }
    (priority, control)
}
