// Reads variable width codes packed least significant bit first, as used
// by the LZW expander. Input runs out into zero bits rather than an error;
// the expander detects short data through its output length.
pub struct CodeReader<'a> {
    input: &'a [u8],
    pos: usize,
    acc: u64,
    acc_bits: u32,
}

impl<'a> CodeReader<'a> {
    pub fn new(input: &'a [u8]) -> CodeReader<'a> {
        CodeReader{ input, pos: 0, acc: 0, acc_bits: 0 }
    }

    pub fn exhausted(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn refill(&mut self) {
        while self.acc_bits <= 56 {
            let byte = self.input.get(self.pos).copied().unwrap_or(0);
            self.pos = self.pos.saturating_add(1);
            self.acc |= (byte as u64) << self.acc_bits;
            self.acc_bits += 8;
        }
    }

    pub fn read_code(&mut self, width: u32) -> u32 {
        debug_assert!(width > 0 && width <= 32);
        if self.acc_bits < width {
            self.refill();
        }
        let code = (self.acc & ((1u64 << width) - 1)) as u32;
        self.acc >>= width;
        self.acc_bits -= width;
        code
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nine_bit_codes() {
        // 0x100, 0x041, 0x1ff packed lsb first
        let data = [ 0x00, 0x83, 0xfc, 0x07 ];
        let mut codes = CodeReader::new(&data);
        assert_eq!(codes.read_code(9), 0x100);
        assert_eq!(codes.read_code(9), 0x041);
        assert_eq!(codes.read_code(9), 0x1ff);
        assert!(codes.exhausted());
        assert_eq!(codes.read_code(9), 0);
    }

    #[test]
    fn mixed_widths() {
        // 0x1ab in 9 bits, then 0x2cd in 10 bits, then 0x5 in 11 bits
        let value: u32 = 0x1ab | (0x2cd << 9) | (0x5 << 19);
        let data = value.to_le_bytes();
        let mut codes = CodeReader::new(&data);
        assert_eq!(codes.read_code(9), 0x1ab);
        assert_eq!(codes.read_code(10), 0x2cd);
        assert_eq!(codes.read_code(11), 0x5);
    }
}
