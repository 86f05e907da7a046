use packed_struct::prelude::*;

use std::collections::{BTreeMap, HashMap};
use std::convert::TryFrom;
use std::ops::Range;

use crate::restype::ResourceType;
use crate::volume::VolumeError;

// Offset value marking a directory slot without a resource.
pub const ENTRY_NOT_PRESENT: u32 = 0xfffff;
pub const DIRECTORY_RECORD_SIZE: usize = 3;

pub const DIRECTORY_HEADER_SIZE: usize = 8;
pub const RESOURCE_HEADER_V2_SIZE: usize = 5;
pub const RESOURCE_HEADER_V3_SIZE: usize = 7;

// Picture payload with nibble packed color/priority operands (v3 only).
pub const FLAG_PICTURE_NIBBLES: u8 = 0x80;

#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub struct DirectoryEntry {
    pub volume: u8,
    pub offset: u32,
    pub length: u32,
}

pub type EntryMap = BTreeMap<u16, DirectoryEntry>;

#[derive(PackedStruct)]
#[packed_struct(endian="lsb")]
pub struct DirectoryHeader {
    pub logic_offset: u16,
    pub picture_offset: u16,
    pub view_offset: u16,
    pub sound_offset: u16,
}

#[derive(PackedStruct)]
#[packed_struct(endian="lsb")]
pub struct ResourceHeaderV2 {
    pub signature: u16,
    pub volume: u8,
    pub length: u16,
}

#[derive(PackedStruct)]
#[packed_struct(endian="lsb")]
pub struct ResourceHeaderV3 {
    pub signature: u16,
    pub flags: u8,
    pub uncompressed_length: u16,
    pub compressed_length: u16,
}

pub fn read_directory_entries(rtype: ResourceType, input: &[u8]) -> Result<EntryMap, VolumeError> {
    if input.len() % DIRECTORY_RECORD_SIZE != 0 {
        return Err(VolumeError::MalformedDirectory(rtype))
    }

    let mut entries = EntryMap::new();
    for (n, record) in input.chunks_exact(DIRECTORY_RECORD_SIZE).enumerate() {
        let volume = record[0] >> 4;
        let offset = ((record[0] as u32 & 0xf) << 16) | ((record[1] as u32) << 8) | record[2] as u32;
        if offset == ENTRY_NOT_PRESENT {
            continue
        }

        let id = u16::try_from(n).map_err(|_| VolumeError::MalformedDirectory(rtype))?;
        entries.insert(id, DirectoryEntry{ volume, offset, length: 0 });
    }
    Ok(entries)
}

pub fn split_combined_directory(input: &[u8]) -> Result<[ (ResourceType, Range<usize>); 4 ], VolumeError> {
    let malformed = || VolumeError::MalformedDirectory(ResourceType::Directory);
    if input.len() < DIRECTORY_HEADER_SIZE {
        return Err(malformed())
    }
    let header = DirectoryHeader::unpack_from_slice(&input[0..DIRECTORY_HEADER_SIZE]).map_err(|_| malformed())?;

    let offsets = [
        header.logic_offset as usize,
        header.picture_offset as usize,
        header.view_offset as usize,
        header.sound_offset as usize,
        input.len()
    ];
    if offsets.windows(2).any(|w| w[0] > w[1]) {
        return Err(malformed())
    }

    Ok([
        (ResourceType::Logic, offsets[0]..offsets[1]),
        (ResourceType::Picture, offsets[1]..offsets[2]),
        (ResourceType::View, offsets[2]..offsets[3]),
        (ResourceType::Sound, offsets[3]..offsets[4]),
    ])
}

// Lengths are not stored, each resource runs up to the next greater offset
// in the same volume, or to the end of the volume file. Entries sharing an
// offset get the same length.
pub fn calculate_entry_lengths(entries: &mut HashMap<ResourceType, EntryMap>, volume_sizes: &HashMap<u8, u64>) {
    let mut starts: Vec<(u8, u32)> = entries.iter()
        .filter(|(rtype, _)| rtype.is_indexed())
        .flat_map(|(_, map)| map.values().map(|e| (e.volume, e.offset)))
        .collect();
    starts.sort_unstable();
    starts.dedup();

    for (_, map) in entries.iter_mut().filter(|(rtype, _)| rtype.is_indexed()) {
        for entry in map.values_mut() {
            let next = starts.partition_point(|&start| start <= (entry.volume, entry.offset));
            let end = match starts.get(next) {
                Some(&(volume, offset)) if volume == entry.volume => Some(offset as u64),
                _ => volume_sizes.get(&entry.volume).copied(),
            };
            entry.length = match end {
                Some(end) if end >= entry.offset as u64 => (end - entry.offset as u64) as u32,
                _ => 0
            };
        }
    }
}
