use std::collections::VecDeque;

use crate::picture::{PicCommand, PATTERN_FLAG_RECTANGLE, PATTERN_FLAG_USE_TEXTURE, PATTERN_MASK_SIZE};

pub const PICTURE_WIDTH: usize = 160;
pub const PICTURE_HEIGHT: usize = 168;

const WIDTH: i32 = PICTURE_WIDTH as i32;
const HEIGHT: i32 = PICTURE_HEIGHT as i32;

// Unpainted pixels
const FILL_COLOR_FREE: u8 = 15;
const FILL_PRIORITY_FREE: u8 = 4;

pub trait PlaneWriter {
    fn pixel_screen(&self, x: usize, y: usize) -> u8;
    fn set_pixel_screen(&mut self, x: usize, y: usize, color: u8);
    fn pixel_priority(&self, x: usize, y: usize) -> u8;
    fn set_pixel_priority(&mut self, x: usize, y: usize, priority: u8);
}

const PATTERN_BINARY_LIST: [ u16; 16 ] = [
    0x8000, 0x4000, 0x2000, 0x1000, 0x0800, 0x0400, 0x0200, 0x0100,
    0x0080, 0x0040, 0x0020, 0x0010, 0x0008, 0x0004, 0x0002, 0x0001,
];

// Start of each pen size in PATTERN_CIRCLE_DATA
const PATTERN_CIRCLE_LIST: [ u8; 8 ] = [ 0, 1, 4, 9, 16, 25, 37, 50 ];

const PATTERN_CIRCLE_DATA: [ u16; 65 ] = [
    0x8000,
    0xe000, 0xe000, 0xe000,
    0x7000, 0xf800, 0xf800, 0xf800, 0x7000,
    0x3800, 0x7c00, 0xfe00, 0xfe00, 0xfe00, 0x7c00, 0x3800,
    0x1c00, 0x7f00, 0xff80, 0xff80, 0xff80, 0xff80, 0xff80, 0x7f00, 0x1c00,
    0x0e00, 0x3f80, 0x7fc0, 0x7fc0, 0xffe0, 0xffe0, 0xffe0, 0x7fc0, 0x7fc0, 0x3f80, 0x1f00, 0x0e00,
    0x0f80, 0x3fe0, 0x7ff0, 0x7ff0, 0xfff8, 0xfff8, 0xfff8, 0xfff8, 0xfff8, 0x7ff0, 0x7ff0, 0x3fe0, 0x0f80,
    0x07c0, 0x1ff0, 0x3ff8, 0x7ffc, 0x7ffc, 0xfffe, 0xfffe, 0xfffe, 0xfffe, 0xfffe, 0x7ffc, 0x7ffc, 0x3ff8, 0x1ff0, 0x07c0,
];

// Pen size 1 on v3 interpreters
const PATTERN_CIRCLE_DATA_V3_P1: [ u16; 3 ] = [ 0x0000, 0xe000, 0x0000 ];

const TEXTURE_DITHER: u8 = 0x01;

pub struct PictureTracer<'a, W: PlaneWriter> {
    planes: &'a mut W,
    version3: bool,
    screen: bool,
    screen_color: u8,
    priority: bool,
    priority_color: u8,
    pattern_code: u8,
}

impl<'a, W: PlaneWriter> PictureTracer<'a, W> {
    pub fn new(engine_version: u16, planes: &'a mut W) -> PictureTracer<'a, W> {
        PictureTracer{
            planes,
            version3: engine_version >= 0x3000,
            screen: false,
            screen_color: 0,
            priority: false,
            priority_color: 0,
            pattern_code: 0,
        }
    }

    pub fn run(&mut self, commands: &[PicCommand]) {
        for command in commands {
            self.apply(command);
        }
    }

    pub fn apply(&mut self, command: &PicCommand) {
        match command {
            PicCommand::SetColor(color) => { self.screen_color = *color; },
            PicCommand::SetColorEnabled(enabled) => { self.screen = *enabled; },
            PicCommand::SetPriority(priority) => { self.priority_color = *priority; },
            PicCommand::SetPriorityEnabled(enabled) => { self.priority = *enabled; },
            PicCommand::DrawYCorner(coords) => { self.draw_corner(coords, true); },
            PicCommand::DrawXCorner(coords) => { self.draw_corner(coords, false); },
            PicCommand::DrawLines(coords) => { self.draw_lines(coords); },
            PicCommand::Fill{ x, y } => { self.fill(*x as i32, *y as i32); },
            PicCommand::SetPattern{ code, .. } => { self.pattern_code = *code; },
            PicCommand::PlotPattern{ x, y } => { self.plot_pattern(*x as i32, *y as i32); },
            PicCommand::End => { },
        }
    }

    fn put_pixel(&mut self, x: i32, y: i32) {
        let x = x & 0xff;
        let y = y & 0xff;
        if x >= WIDTH || y >= HEIGHT {
            return
        }

        if self.screen {
            self.planes.set_pixel_screen(x as usize, y as usize, self.screen_color);
        }
        if self.priority {
            self.planes.set_pixel_priority(x as usize, y as usize, self.priority_color);
        }
    }

    fn draw_line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32) {
        let x1 = x1.clamp(0, WIDTH - 1);
        let x2 = x2.clamp(0, WIDTH - 1);
        let y1 = y1.clamp(0, HEIGHT - 1);
        let y2 = y2.clamp(0, HEIGHT - 1);

        if x1 == x2 {
            for y in y1.min(y2)..=y1.max(y2) {
                self.put_pixel(x1, y);
            }
            return
        }
        if y1 == y2 {
            for x in x1.min(x2)..=x1.max(x2) {
                self.put_pixel(x, y1);
            }
            return
        }

        let step_x = if x2 < x1 { -1 } else { 1 };
        let step_y = if y2 < y1 { -1 } else { 1 };
        let delta_x = (x2 - x1).abs();
        let delta_y = (y2 - y1).abs();

        let (mut remaining, detdelta, mut error_x, mut error_y) = if delta_y > delta_x {
            (delta_y, delta_y, delta_y / 2, 0)
        } else {
            (delta_x, delta_x, 0, delta_x / 2)
        };

        let mut x = x1;
        let mut y = y1;
        self.put_pixel(x, y);
        loop {
            error_y += delta_y;
            if error_y >= detdelta {
                error_y -= detdelta;
                y += step_y;
            }
            error_x += delta_x;
            if error_x >= detdelta {
                error_x -= detdelta;
                x += step_x;
            }
            self.put_pixel(x, y);

            remaining -= 1;
            if remaining <= 0 { break; }
        }
    }

    fn draw_corner(&mut self, coords: &[u8], y_first: bool) {
        if coords.len() < 2 {
            return
        }

        let mut x1 = coords[0] as i32;
        let mut y1 = coords[1] as i32;
        self.put_pixel(x1, y1);

        let mut vertical = y_first;
        for &c in &coords[2..] {
            let c = c as i32;
            if vertical {
                self.draw_line(x1, y1, x1, c);
                y1 = c;
            } else {
                self.draw_line(x1, y1, c, y1);
                x1 = c;
            }
            vertical = !vertical;
        }
    }

    fn draw_lines(&mut self, coords: &[u8]) {
        if coords.len() < 2 {
            return
        }

        let mut x1 = coords[0] as i32;
        let mut y1 = coords[1] as i32;
        self.put_pixel(x1, y1);

        for point in coords[2..].chunks_exact(2) {
            let x2 = point[0] as i32;
            let y2 = point[1] as i32;
            self.draw_line(x1, y1, x2, y2);
            x1 = x2;
            y1 = y2;
        }
    }

    fn can_fill(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 || x >= WIDTH || y >= HEIGHT {
            return false
        }

        let color = self.planes.pixel_screen(x as usize, y as usize);
        let priority = self.planes.pixel_priority(x as usize, y as usize);

        if !self.priority && self.screen && self.screen_color != FILL_COLOR_FREE {
            return color == FILL_COLOR_FREE
        }
        if self.priority && !self.screen && self.priority_color != FILL_PRIORITY_FREE {
            return priority == FILL_PRIORITY_FREE
        }
        self.screen && color == FILL_COLOR_FREE && self.screen_color != FILL_COLOR_FREE
    }

    fn fill(&mut self, x: i32, y: i32) {
        if !self.screen && !self.priority {
            return
        }

        let mut queue: VecDeque<(i32, i32)> = VecDeque::new();
        queue.push_back((x, y));
        while let Some((x, y)) = queue.pop_front() {
            if !self.can_fill(x, y) {
                continue
            }

            let mut c = x - 1;
            while self.can_fill(c, y) {
                c -= 1;
            }
            c += 1;

            let mut new_span_up = true;
            let mut new_span_down = true;
            while self.can_fill(c, y) {
                self.put_pixel(c, y);

                if self.can_fill(c, y - 1) {
                    if new_span_up {
                        queue.push_back((c, y - 1));
                        new_span_up = false;
                    }
                } else {
                    new_span_up = true;
                }

                if self.can_fill(c, y + 1) {
                    if new_span_down {
                        queue.push_back((c, y + 1));
                        new_span_down = false;
                    }
                } else {
                    new_span_down = true;
                }
                c += 1;
            }
        }
    }

    // Stamps the current pen centered on (x, y). The pen is sized on a
    // 320 pixel wide grid, then halved onto the 160 picture columns.
    fn plot_pattern(&mut self, x: i32, y: i32) {
        let pen_size = (self.pattern_code & PATTERN_MASK_SIZE) as i32;
        let (circle_data, mut circle_pointer): (&[u16], usize) = if self.version3 && pen_size == 1 {
            (&PATTERN_CIRCLE_DATA_V3_P1[..], 0)
        } else {
            (&PATTERN_CIRCLE_DATA[..], PATTERN_CIRCLE_LIST[pen_size as usize] as usize)
        };

        let start_x = (x * 2 - pen_size).clamp(0, WIDTH * 2 - 2 * pen_size) / 2;
        let mut pen_y = (y - pen_size).clamp(0, HEIGHT - 1 - 2 * pen_size);
        let pen_width = 2 * pen_size + 1;
        let last_row = pen_y + pen_width;

        let rectangle = (self.pattern_code & PATTERN_FLAG_RECTANGLE) != 0;
        let textured = (self.pattern_code & PATTERN_FLAG_USE_TEXTURE) != 0;
        let mut texture: u8 = 1;

        while pen_y < last_row {
            let circle_word = circle_data[circle_pointer];
            circle_pointer += 1;

            let mut pen_x = start_x;
            let mut counter = 0;
            while counter <= pen_width {
                if rectangle || (PATTERN_BINARY_LIST[(counter >> 1) as usize] & circle_word) != 0 {
                    if textured {
                        let bit = texture & 1;
                        texture >>= 1;
                        if bit != 0 {
                            texture ^= 0xb8;
                        }
                    }
                    if !textured || (texture & 0x03) == TEXTURE_DITHER {
                        self.put_pixel(pen_x, pen_y);
                    }
                }
                pen_x += 1;
                counter += 4;
            }
            pen_y += 1;
        }
    }
}
