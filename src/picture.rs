use log::warn;
use num_enum::TryFromPrimitive;
use std::convert::TryFrom;
use std::fmt;

// Bytes from here up are opcodes, everything below is operand data.
pub const FIRST_OPCODE: u8 = 0xf0;

pub const PATTERN_MASK_SIZE: u8 = 0x07;
pub const PATTERN_FLAG_RECTANGLE: u8 = 0x10;
pub const PATTERN_FLAG_USE_TEXTURE: u8 = 0x20;

#[derive(TryFromPrimitive)]
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
#[repr(u8)]
pub enum PicOp {
    SetColor = 0xf0,
    DisableColor = 0xf1,
    SetPriority = 0xf2,
    DisablePriority = 0xf3,
    YCorner = 0xf4,
    XCorner = 0xf5,
    AbsoluteLines = 0xf6,
    RelativeLines = 0xf7,
    Fill = 0xf8,
    SetPattern = 0xf9,
    PlotPatterns = 0xfa,
    SetColorPriorityFill = 0xfc,
    End = 0xff,
}

#[derive(Debug,Clone,PartialEq,Eq)]
pub enum PicCommand {
    SetColor(u8),
    SetColorEnabled(bool),
    SetPriority(u8),
    SetPriorityEnabled(bool),
    DrawYCorner(Vec<u8>),
    DrawXCorner(Vec<u8>),
    DrawLines(Vec<u8>),
    Fill{ x: u8, y: u8 },
    SetPattern{ code: u8, number: u8 },
    PlotPattern{ x: u8, y: u8 },
    End,
}

impl fmt::Display for PicCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PicCommand::SetColor(color) => write!(f, "set_color({})", color),
            PicCommand::SetColorEnabled(enabled) => write!(f, "set_color_screen({})", enabled),
            PicCommand::SetPriority(priority) => write!(f, "set_priority({})", priority),
            PicCommand::SetPriorityEnabled(enabled) => write!(f, "set_priority_screen({})", enabled),
            PicCommand::DrawYCorner(coords) => write!(f, "draw_y_corner({:?})", coords),
            PicCommand::DrawXCorner(coords) => write!(f, "draw_x_corner({:?})", coords),
            PicCommand::DrawLines(coords) => write!(f, "draw_lines({:?})", coords),
            PicCommand::Fill{ x, y } => write!(f, "fill({}, {})", x, y),
            PicCommand::SetPattern{ code, number } => write!(f, "set_pattern({:#04x}, {})", code, number),
            PicCommand::PlotPattern{ x, y } => write!(f, "plot_pattern({}, {})", x, y),
            PicCommand::End => write!(f, "end()"),
        }
    }
}

pub struct PicInstruction<'a> {
    pub offset: usize,
    pub bytes: &'a [u8],
    pub commands: Vec<PicCommand>,
}

pub struct PictureDecoder<'a> {
    data: &'a [u8],
    pos: usize,
    pattern_code: u8,
    pattern_number: u8,
    finished: bool,
}

// Relative lines store each step as a pair of sign/magnitude nibbles;
// converts them to a plain list of absolute coordinates.
pub fn convert_relative_lines(input: &[u8]) -> Vec<u8> {
    if input.len() < 2 {
        return input.to_vec()
    }

    let mut x = input[0];
    let mut y = input[1];
    let mut output = Vec::with_capacity(2 + (input.len() - 2) * 2);
    output.push(x);
    output.push(y);
    for disp in &input[2..] {
        let mut dx = (disp >> 4) as i8;
        let mut dy = (disp & 0x0f) as i8;
        if (dx & 0x08) != 0 { dx = -(dx & 0x07); }
        if (dy & 0x08) != 0 { dy = -(dy & 0x07); }
        x = x.wrapping_add(dx as u8);
        y = y.wrapping_add(dy as u8);
        output.push(x);
        output.push(y);
    }
    output
}

impl<'a> PictureDecoder<'a> {
    pub fn new(data: &'a [u8]) -> PictureDecoder<'a> {
        PictureDecoder{ data, pos: 0, pattern_code: 0, pattern_number: 0, finished: false }
    }

    fn operand(&mut self) -> Option<u8> {
        let value = self.data.get(self.pos).copied();
        if value.is_some() {
            self.pos += 1;
        } else {
            warn!("picture data ends inside operands at {:04x}", self.pos);
            self.finished = true;
        }
        value
    }

    fn operand_run(&mut self) -> &'a [u8] {
        let data: &'a [u8] = self.data;
        let start = self.pos;
        while self.pos < data.len() && data[self.pos] < FIRST_OPCODE {
            self.pos += 1;
        }
        &data[start..self.pos]
    }

    fn plot_patterns(&mut self, mut run: &[u8], commands: &mut Vec<PicCommand>) {
        while !run.is_empty() {
            if (self.pattern_code & PATTERN_FLAG_USE_TEXTURE) != 0 {
                self.pattern_number = run[0] >> 1;
                run = &run[1..];
                commands.push(PicCommand::SetPattern{ code: self.pattern_code, number: self.pattern_number });
            }
            if run.len() < 2 {
                break
            }
            commands.push(PicCommand::PlotPattern{ x: run[0], y: run[1] });
            run = &run[2..];
        }
    }
}

fn fills(run: &[u8], commands: &mut Vec<PicCommand>) {
    for pair in run.chunks_exact(2) {
        commands.push(PicCommand::Fill{ x: pair[0], y: pair[1] });
    }
}

impl<'a> Iterator for PictureDecoder<'a> {
    type Item = PicInstruction<'a>;

    fn next(&mut self) -> Option<PicInstruction<'a>> {
        if self.finished || self.pos >= self.data.len() {
            return None
        }

        let data: &'a [u8] = self.data;
        let offset = self.pos;
        let opcode = data[self.pos];
        self.pos += 1;

        let mut commands: Vec<PicCommand> = Vec::new();
        match PicOp::try_from(opcode) {
            Ok(PicOp::SetColor) => {
                if let Some(color) = self.operand() {
                    commands.push(PicCommand::SetColor(color));
                    commands.push(PicCommand::SetColorEnabled(true));
                }
            },
            Ok(PicOp::DisableColor) => {
                commands.push(PicCommand::SetColorEnabled(false));
            },
            Ok(PicOp::SetPriority) => {
                if let Some(priority) = self.operand() {
                    commands.push(PicCommand::SetPriority(priority));
                    commands.push(PicCommand::SetPriorityEnabled(true));
                }
            },
            Ok(PicOp::DisablePriority) => {
                commands.push(PicCommand::SetPriorityEnabled(false));
            },
            Ok(PicOp::SetPattern) => {
                if let Some(code) = self.operand() {
                    self.pattern_code = code;
                    commands.push(PicCommand::SetPattern{ code, number: self.pattern_number });
                }
            },
            Ok(PicOp::SetColorPriorityFill) => {
                if let (Some(color), Some(priority)) = (self.operand(), self.operand()) {
                    commands.push(PicCommand::SetColor(color));
                    commands.push(PicCommand::SetPriority(priority));
                    let run = self.operand_run();
                    fills(run, &mut commands);
                }
            },
            Ok(PicOp::End) => {
                commands.push(PicCommand::End);
                self.finished = true;
            },
            op => {
                let run = self.operand_run();
                match op {
                    Ok(PicOp::YCorner) => commands.push(PicCommand::DrawYCorner(run.to_vec())),
                    Ok(PicOp::XCorner) => commands.push(PicCommand::DrawXCorner(run.to_vec())),
                    Ok(PicOp::AbsoluteLines) => commands.push(PicCommand::DrawLines(run.to_vec())),
                    Ok(PicOp::RelativeLines) => commands.push(PicCommand::DrawLines(convert_relative_lines(run))),
                    Ok(PicOp::Fill) => fills(run, &mut commands),
                    Ok(PicOp::PlotPatterns) => self.plot_patterns(run, &mut commands),
                    _ => warn!("skipping unknown picture opcode {:02x} at {:04x} ({} operand bytes)", opcode, offset, run.len()),
                }
            }
        }

        Some(PicInstruction{ offset, bytes: &data[offset..self.pos], commands })
    }
}

pub fn decode_picture(data: &[u8]) -> Vec<PicCommand> {
    PictureDecoder::new(data).flat_map(|instr| instr.commands).collect()
}

pub struct PicturePrinter<'a> {
    data: &'a [u8],
    hex: bool,
}

impl<'a> PicturePrinter<'a> {
    pub fn new(data: &'a [u8], hex: bool) -> PicturePrinter<'a> {
        PicturePrinter{ data, hex }
    }
}

impl<'a> fmt::Display for PicturePrinter<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for instr in PictureDecoder::new(self.data) {
            if self.hex {
                for (n, line) in instr.bytes.chunks(16).enumerate() {
                    let hex: Vec<String> = line.iter().map(|b| format!("{:02x}", b)).collect();
                    writeln!(f, "// {:04x}: {}", instr.offset + n * 16, hex.join(" "))?;
                }
            }
            for command in &instr.commands {
                writeln!(f, "{}", command)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_commands() {
        let data = [ 0xf0, 0x04, 0xf1, 0xf2, 0x09, 0xf3, 0xf9, 0x15, 0xff ];
        assert_eq!(decode_picture(&data), vec![
            PicCommand::SetColor(4),
            PicCommand::SetColorEnabled(true),
            PicCommand::SetColorEnabled(false),
            PicCommand::SetPriority(9),
            PicCommand::SetPriorityEnabled(true),
            PicCommand::SetPriorityEnabled(false),
            PicCommand::SetPattern{ code: 0x15, number: 0 },
            PicCommand::End,
        ]);
    }

    #[test]
    fn operand_runs_end_at_next_opcode() {
        let data = [ 0xf6, 0x10, 0x20, 0x30, 0x40, 0xf8, 0x05, 0x06, 0x07, 0xf4, 0x01, 0x02, 0x03, 0xf5, 0xff ];
        assert_eq!(decode_picture(&data), vec![
            PicCommand::DrawLines(vec![ 0x10, 0x20, 0x30, 0x40 ]),
            PicCommand::Fill{ x: 5, y: 6 },
            PicCommand::DrawYCorner(vec![ 1, 2, 3 ]),
            PicCommand::DrawXCorner(vec![]),
            PicCommand::End,
        ]);
    }

    #[test]
    fn relative_lines() {
        let data = [ 0xf7, 0x10, 0x20, 0x21, 0x9a ];
        assert_eq!(decode_picture(&data), vec![
            PicCommand::DrawLines(vec![ 0x10, 0x20, 0x12, 0x21, 0x11, 0x1f ]),
        ]);
        assert_eq!(convert_relative_lines(&[ 0x00, 0x00, 0x99 ]), vec![ 0x00, 0x00, 0xff, 0xff ]);
        assert_eq!(convert_relative_lines(&[ 0x05 ]), vec![ 0x05 ]);
    }

    #[test]
    fn textured_patterns() {
        let data = [ 0xf9, 0x22, 0xfa, 0x08, 0x10, 0x20, 0x0a, 0x30, 0x40, 0x0c, 0xff ];
        assert_eq!(decode_picture(&data), vec![
            PicCommand::SetPattern{ code: 0x22, number: 0 },
            PicCommand::SetPattern{ code: 0x22, number: 4 },
            PicCommand::PlotPattern{ x: 0x10, y: 0x20 },
            PicCommand::SetPattern{ code: 0x22, number: 5 },
            PicCommand::PlotPattern{ x: 0x30, y: 0x40 },
            PicCommand::SetPattern{ code: 0x22, number: 6 },
            PicCommand::End,
        ]);
    }

    #[test]
    fn plain_patterns() {
        let data = [ 0xf9, 0x02, 0xfa, 0x10, 0x20, 0x30, 0xff ];
        assert_eq!(decode_picture(&data), vec![
            PicCommand::SetPattern{ code: 0x02, number: 0 },
            PicCommand::PlotPattern{ x: 0x10, y: 0x20 },
            PicCommand::End,
        ]);
    }

    #[test]
    fn color_priority_fill() {
        // the two operands are taken as-is, even when they look like opcodes
        let data = [ 0xfc, 0x03, 0xf5, 0x10, 0x20, 0x30, 0x40, 0xff ];
        assert_eq!(decode_picture(&data), vec![
            PicCommand::SetColor(3),
            PicCommand::SetPriority(0xf5),
            PicCommand::Fill{ x: 0x10, y: 0x20 },
            PicCommand::Fill{ x: 0x30, y: 0x40 },
            PicCommand::End,
        ]);
    }

    #[test]
    fn unknown_opcodes_are_skipped() {
        let data = [ 0x05, 0x06, 0xfb, 0x01, 0x02, 0xfe, 0xf1, 0xff, 0xf0, 0x01 ];
        assert_eq!(decode_picture(&data), vec![
            PicCommand::SetColorEnabled(false),
            PicCommand::End,
        ]);
    }

    #[test]
    fn truncated_operand() {
        assert_eq!(decode_picture(&[ 0xf1, 0xf0 ]), vec![ PicCommand::SetColorEnabled(false) ]);
        assert_eq!(decode_picture(&[ 0xfc, 0x01 ]), vec![]);
    }

    #[test]
    fn instruction_offsets() {
        let data = [ 0xf0, 0x04, 0xf8, 0x01, 0x02, 0x03, 0x04, 0xff ];
        let instrs: Vec<PicInstruction> = PictureDecoder::new(&data).collect();
        assert_eq!(instrs.len(), 3);
        assert_eq!(instrs[1].offset, 2);
        assert_eq!(instrs[1].bytes, &data[2..7]);
        assert_eq!(instrs[1].commands.len(), 2);
        assert_eq!(instrs[2].bytes, &[ 0xff ]);
    }

    #[test]
    fn listing() {
        let data = [ 0xf0, 0x04, 0xf8, 0x01, 0x02, 0xff ];
        let text = PicturePrinter::new(&data, true).to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec![
            "// 0000: f0 04",
            "set_color(4)",
            "set_color_screen(true)",
            "// 0002: f8 01 02",
            "fill(1, 2)",
            "// 0005: ff",
            "end()",
        ]);
        assert!(!PicturePrinter::new(&data, false).to_string().contains("//"));
    }
}
