use crate::bitstream;
use log::{debug, warn};

const START_BITS: u32 = 9;
const MAX_BITS: u32 = 12;
const TABLE_SIZE: usize = 4096;
const DECODE_STACK_SIZE: usize = 8192;
const MAX_CHAIN_LENGTH: usize = 4000;

const CODE_RESET: u32 = 0x100;
const CODE_END: u32 = 0x101;

#[derive(Debug)]
pub enum DecompressError {
    CodeExpansion(u32),
    LengthMismatch{ expected: usize, actual: usize },
}

impl std::fmt::Display for DecompressError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecompressError::CodeExpansion(code) => write!(f, "runaway prefix chain expanding code {:#x}", code),
            DecompressError::LengthMismatch{ expected, actual } => write!(f, "expanded to {} bytes, expected {}", actual, expected),
        }
    }
}

impl std::error::Error for DecompressError { }

struct Expander {
    num_bits: u32,
    max_code: u32,
    prefix_code: Vec<u32>,
    append_character: Vec<u8>,
    decode_stack: Vec<u8>,
}

impl Expander {
    fn new() -> Self {
        Expander{
            num_bits: 0,
            max_code: 0,
            prefix_code: vec![ 0; TABLE_SIZE ],
            append_character: vec![ 0; TABLE_SIZE ],
            decode_stack: Vec::with_capacity(DECODE_STACK_SIZE),
        }
    }

    // Widths of MAX_BITS and up are refused, codes stay at 11 bits at most
    fn set_bits(&mut self, value: u32) {
        if value >= MAX_BITS { return; }
        self.num_bits = value;
        self.max_code = (1 << value) - 2;
    }

    fn decode_string(&mut self, code: u32) -> Result<(), DecompressError> {
        let start = code;
        let mut code = code as usize;
        let mut chain = 0;
        while code > 0xff {
            if code >= TABLE_SIZE || chain >= MAX_CHAIN_LENGTH {
                return Err(DecompressError::CodeExpansion(start))
            }
            self.decode_stack.push(self.append_character[code]);
            code = self.prefix_code[code] as usize;
            chain += 1;
        }
        self.decode_stack.push(code as u8);
        Ok(())
    }

    fn expand(&mut self, input: &[u8], output: &mut Vec<u8>, output_size: usize) -> Result<(), DecompressError> {
        let mut codes = bitstream::CodeReader::new(input);

        self.set_bits(START_BITS);
        let mut next_code: u32 = 0x101;
        let mut old_code = codes.read_code(self.num_bits);
        let mut c = old_code;
        let mut new_code = codes.read_code(self.num_bits);

        while output.len() < output_size && new_code != CODE_END {
            if new_code == CODE_RESET {
                next_code = 0x102;
                self.set_bits(START_BITS);
                old_code = codes.read_code(self.num_bits);
                c = old_code;
                output.push(c as u8);
                new_code = codes.read_code(self.num_bits);
                continue
            }

            self.decode_stack.clear();
            if new_code >= next_code {
                // Code not in the table yet: previous string plus its own first character
                self.decode_stack.push(c as u8);
                self.decode_string(old_code)?;
            } else {
                self.decode_string(new_code)?;
            }

            c = *self.decode_stack.last().unwrap_or(&0) as u32;
            for &b in self.decode_stack.iter().rev() {
                if output.len() == output_size { break; }
                output.push(b);
            }

            if next_code > self.max_code {
                self.set_bits(self.num_bits + 1);
            }

            if (next_code as usize) < TABLE_SIZE {
                self.prefix_code[next_code as usize] = old_code;
                self.append_character[next_code as usize] = c as u8;
            }
            next_code += 1;
            old_code = new_code;
            new_code = codes.read_code(self.num_bits);
        }
        Ok(())
    }
}

pub fn expand_lzw(input: &[u8], output_size: usize) -> Result<Vec<u8>, DecompressError> {
    let mut output: Vec<u8> = Vec::with_capacity(output_size);
    let mut expander = Expander::new();
    expander.expand(input, &mut output, output_size)?;

    if output.len() != output_size {
        return Err(DecompressError::LengthMismatch{ expected: output_size, actual: output.len() })
    }
    debug!("expand_lzw: {} -> {} bytes", input.len(), output.len());
    Ok(output)
}

struct NibbleReader<'a> {
    input: &'a [u8],
    pos: usize,
    half: bool,
}

impl<'a> NibbleReader<'a> {
    fn at(&self, pos: usize) -> u8 {
        self.input.get(pos).copied().unwrap_or(0)
    }

    fn end_of_stream(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn read_byte(&mut self) -> u8 {
        let b = self.at(self.pos);
        self.pos += 1;
        if self.half {
            (b << 4) | (self.at(self.pos) >> 4)
        } else {
            b
        }
    }

    fn read_nibble(&mut self) -> u8 {
        if self.half {
            self.half = false;
            let b = self.at(self.pos) & 0x0f;
            self.pos += 1;
            b
        } else {
            self.half = true;
            self.at(self.pos) >> 4
        }
    }
}

pub fn expand_picture(input: &[u8], output_size: usize) -> Vec<u8> {
    let mut output: Vec<u8> = Vec::with_capacity(output_size);
    let mut rdr = NibbleReader{ input, pos: 0, half: false };

    let push = |output: &mut Vec<u8>, b: u8| {
        if output.len() < output_size { output.push(b); }
    };
    while !rdr.end_of_stream() {
        let opcode = rdr.read_byte();
        push(&mut output, opcode);
        match opcode {
            0xf0 | 0xf2 => {
                let nibble = rdr.read_nibble();
                push(&mut output, nibble);
            },
            0xff => { break },
            _ => { }
        }
    }

    if output.len() < output_size {
        warn!("expand_picture: {} bytes expanded, padding to {}", output.len(), output_size);
        output.resize(output_size, 0);
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    // Packs 9 bit codes lsb first
    fn pack_codes(codes: &[u32]) -> Vec<u8> {
        let mut data = Vec::new();
        let mut acc: u64 = 0;
        let mut nbits = 0;
        for &code in codes {
            acc |= (code as u64) << nbits;
            nbits += 9;
            while nbits >= 8 {
                data.push(acc as u8);
                acc >>= 8;
                nbits -= 8;
            }
        }
        if nbits > 0 {
            data.push(acc as u8);
        }
        data
    }

    #[test]
    fn literals_and_back_references() {
        // 'A', 'B', "AB", "BA", "ABB"
        let input = pack_codes(&[ 0x100, 0x41, 0x42, 0x102, 0x103, 0x104, 0x101 ]);
        let output = expand_lzw(&input, 9).unwrap();
        assert_eq!(output, b"ABABBAABB".to_vec());
    }

    #[test]
    fn code_not_yet_in_table() {
        // 'A' followed by the code being defined: "AA"
        let input = pack_codes(&[ 0x100, 0x41, 0x102, 0x101 ]);
        let output = expand_lzw(&input, 3).unwrap();
        assert_eq!(output, b"AAA".to_vec());
    }

    #[test]
    fn reset_restarts_the_table() {
        let input = pack_codes(&[ 0x100, 0x41, 0x42, 0x102, 0x100, 0x43, 0x44, 0x102, 0x101 ]);
        let output = expand_lzw(&input, 8).unwrap();
        assert_eq!(output, b"ABABCDCD".to_vec());
    }

    #[test]
    fn short_output_is_an_error() {
        let input = pack_codes(&[ 0x100, 0x41, 0x42, 0x101 ]);
        match expand_lzw(&input, 4) {
            Err(DecompressError::LengthMismatch{ expected, actual }) => {
                assert_eq!(expected, 4);
                assert_eq!(actual, 2);
            },
            _ => panic!("expected a length mismatch"),
        }
    }

    #[test]
    fn output_is_bounded() {
        let input = pack_codes(&[ 0x100, 0x41, 0x42, 0x102, 0x101 ]);
        let output = expand_lzw(&input, 3).unwrap();
        assert_eq!(output, b"ABA".to_vec());
    }

    #[test]
    fn picture_nibbles() {
        // f0 with nibble color 4, a coordinate, f2 with nibble priority 9
        let input = [ 0xf0, 0x41, 0x23, 0x4f, 0x29, 0xff ];
        let output = expand_picture(&input, 8);
        assert_eq!(output, vec![ 0xf0, 0x04, 0x12, 0x34, 0xf2, 0x09, 0xff, 0x00 ]);
    }

    #[test]
    fn picture_stops_at_end_marker() {
        let input = [ 0xf1, 0xff, 0xf1, 0xf1 ];
        let output = expand_picture(&input, 2);
        assert_eq!(output, vec![ 0xf1, 0xff ]);
    }
}
