use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, Cursor, Seek, SeekFrom};

pub const CRYPT_KEY_SIERRA: &[u8] = b"Avis Durgan";
pub const CRYPT_KEY_AGDS: &[u8] = b"Alex Simkin";

pub fn decrypt(data: &mut [u8], key: &[u8]) {
    for (n, b) in data.iter_mut().enumerate() {
        *b ^= key[n % key.len()];
    }
}

// Range of the encrypted message texts inside a logic resource. The code
// section and the message pointer table in front of the texts are stored
// in the clear.
pub fn logic_message_range(data: &[u8]) -> Result<Option<std::ops::Range<usize>>, io::Error> {
    let mut rdr = Cursor::new(data);
    let section_start = rdr.read_u16::<LittleEndian>()? as usize + 2;
    rdr.seek(SeekFrom::Start(section_start as u64))?;
    let message_count = rdr.read_u8()? as usize;
    if message_count == 0 {
        return Ok(None)
    }

    let section_end = section_start + rdr.read_u16::<LittleEndian>()? as usize + 1;
    let first_message = section_start + 3 + (message_count << 1);
    if first_message > section_end || section_end > data.len() {
        return Err(io::Error::new(io::ErrorKind::InvalidData,
            format!("message section {}..{} outside of logic ({} bytes)", first_message, section_end, data.len())))
    }
    Ok(Some(first_message..section_end))
}

pub fn decrypt_logic(data: &mut [u8], key: &[u8]) -> Result<(), io::Error> {
    if let Some(range) = logic_message_range(data)? {
        decrypt(&mut data[range], key);
    }
    Ok(())
}
