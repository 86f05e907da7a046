use std::collections::HashMap;
use std::io;

use log::{debug, info, warn};
use packed_struct::prelude::*;

use crate::crypt;
use crate::decompress::{self, DecompressError};
use crate::gameinfo::GameInfo;
use crate::resource::{self, DirectoryEntry, EntryMap, ResourceHeaderV2, ResourceHeaderV3};
use crate::restype::{ResourceID, ResourceType, MAX_VOLUMES};
use crate::storage::ByteSource;

const RESOURCE_SIGNATURE: u16 = 0x3412;

#[derive(Debug)]
pub enum VolumeError {
    ResourceTypeNotFound(ResourceType),
    ResourceNotFound(ResourceID),
    FileNotFound(ResourceType),
    VolumeNotFound(u8),
    MalformedDirectory(ResourceType),
    Decompression(ResourceID, DecompressError),
    Io(ResourceID, io::Error),
    Storage(String, io::Error),
}

impl VolumeError {
    pub fn is_not_found(&self) -> bool {
        matches!(self,
            VolumeError::ResourceTypeNotFound(_) | VolumeError::ResourceNotFound(_) |
            VolumeError::FileNotFound(_) | VolumeError::VolumeNotFound(_))
    }
}

impl std::fmt::Display for VolumeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VolumeError::ResourceTypeNotFound(rtype) => write!(f, "no directory for resource type {}", rtype),
            VolumeError::ResourceNotFound(id) => write!(f, "resource {} does not exist", id),
            VolumeError::FileNotFound(rtype) => write!(f, "no file found for {}", rtype),
            VolumeError::VolumeNotFound(n) => write!(f, "volume {} not found", n),
            VolumeError::MalformedDirectory(rtype) => write!(f, "malformed {} directory", rtype),
            VolumeError::Decompression(id, e) => write!(f, "failed to expand resource {}: {}", id, e),
            VolumeError::Io(id, e) => write!(f, "failed to read resource {}: {}", id, e),
            VolumeError::Storage(name, e) => write!(f, "{}: {}", name, e),
        }
    }
}

impl std::error::Error for VolumeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            VolumeError::Decompression(_, e) => Some(e),
            VolumeError::Io(_, e) | VolumeError::Storage(_, e) => Some(e),
            _ => None
        }
    }
}

#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum Generation {
    V2,
    V3,
}

pub struct Volume<S: ByteSource> {
    storage: S,
    info: GameInfo,
    generation: Generation,
    entries: HashMap<ResourceType, EntryMap>,
}

fn truncated(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, what.to_string())
}

impl<S: ByteSource> Volume<S> {
    pub fn open(storage: S) -> Result<Volume<S>, VolumeError> {
        let info = GameInfo::detect(&storage)?;
        Volume::with_info(storage, info)
    }

    pub fn with_info(storage: S, info: GameInfo) -> Result<Volume<S>, VolumeError> {
        let generation = if info.is_version3() { Generation::V3 } else { Generation::V2 };

        let mut entries: HashMap<ResourceType, EntryMap> = HashMap::new();
        for &rtype in &[ ResourceType::Objects, ResourceType::Words ] {
            let name = info.file(rtype).ok_or(VolumeError::FileNotFound(rtype))?;
            let size = storage.size(name).map_err(|e| VolumeError::Storage(name.to_string(), e))?;
            let mut map = EntryMap::new();
            map.insert(0, DirectoryEntry{ volume: rtype as u8, offset: 0, length: size as u32 });
            entries.insert(rtype, map);
        }

        match generation {
            Generation::V2 => {
                for &rtype in &[ ResourceType::Picture, ResourceType::View, ResourceType::Sound, ResourceType::Logic ] {
                    let name = info.file(rtype).ok_or(VolumeError::FileNotFound(rtype))?;
                    let data = storage.read(name).map_err(|e| VolumeError::Storage(name.to_string(), e))?;
                    entries.insert(rtype, resource::read_directory_entries(rtype, &data)?);
                }
            },
            Generation::V3 => {
                let name = info.file(ResourceType::Directory).ok_or(VolumeError::FileNotFound(ResourceType::Directory))?;
                let data = storage.read(name).map_err(|e| VolumeError::Storage(name.to_string(), e))?;
                for (rtype, range) in resource::split_combined_directory(&data)? {
                    entries.insert(rtype, resource::read_directory_entries(rtype, &data[range])?);
                }
            }
        }

        let mut volume_sizes: HashMap<u8, u64> = HashMap::new();
        for n in 0..MAX_VOLUMES {
            let name = match ResourceType::volume(n).and_then(|role| info.file(role)) {
                Some(name) => name,
                None => continue
            };
            let size = storage.size(name).map_err(|e| VolumeError::Storage(name.to_string(), e))?;
            volume_sizes.insert(n, size);
        }
        resource::calculate_entry_lengths(&mut entries, &volume_sizes);

        info!("{:?} volume: {} logics, {} pictures, {} views, {} sounds", generation,
            entries[&ResourceType::Logic].len(), entries[&ResourceType::Picture].len(),
            entries[&ResourceType::View].len(), entries[&ResourceType::Sound].len());
        Ok(Volume{ storage, info, generation, entries })
    }

    pub fn info(&self) -> &GameInfo {
        &self.info
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn exists(&self, rtype: ResourceType, id: u16) -> bool {
        self.entry(rtype, id).is_ok()
    }

    pub fn entry(&self, rtype: ResourceType, id: u16) -> Result<&DirectoryEntry, VolumeError> {
        let entries = self.entries.get(&rtype).ok_or(VolumeError::ResourceTypeNotFound(rtype))?;
        entries.get(&id).ok_or(VolumeError::ResourceNotFound(ResourceID{ rtype, num: id }))
    }

    pub fn resource_ids(&self, rtype: ResourceType) -> Vec<u16> {
        match self.entries.get(&rtype) {
            Some(entries) => entries.keys().copied().collect(),
            None => Vec::new()
        }
    }

    pub fn load_raw(&self, rtype: ResourceType, id: u16) -> Result<Vec<u8>, VolumeError> {
        let entry = self.entry(rtype, id)?;
        let role = match rtype {
            ResourceType::Objects | ResourceType::Words => rtype,
            _ => ResourceType::volume(entry.volume).ok_or(VolumeError::VolumeNotFound(entry.volume))?
        };
        let name = match self.info.file(role) {
            Some(name) => name,
            None if role == rtype => return Err(VolumeError::FileNotFound(role)),
            None => return Err(VolumeError::VolumeNotFound(entry.volume))
        };

        self.storage.read_range(name, entry.offset as u64, entry.length as usize)
            .map_err(|e| VolumeError::Io(ResourceID{ rtype, num: id }, e))
    }

    pub fn load(&self, rtype: ResourceType, id: u16) -> Result<Vec<u8>, VolumeError> {
        let raw = self.load_raw(rtype, id)?;
        if !rtype.is_indexed() {
            return Ok(raw)
        }

        let res_id = ResourceID{ rtype, num: id };
        let data = match self.generation {
            Generation::V2 => load_v2(res_id, &raw)?,
            Generation::V3 => load_v3(res_id, &raw)?,
        };
        debug!("load {}: {} bytes stored, {} bytes decoded", res_id, raw.len(), data.len());
        Ok(data)
    }
}

fn check_signature(res_id: ResourceID, signature: u16) {
    if signature != RESOURCE_SIGNATURE {
        warn!("resource {}: unexpected signature {:04x}", res_id, signature);
    }
}

fn payload(res_id: ResourceID, raw: &[u8], start: usize, length: usize) -> Vec<u8> {
    let end = start + length;
    if end > raw.len() {
        warn!("resource {}: {} bytes declared, {} available", res_id, length, raw.len() - start);
        raw[start..].to_vec()
    } else {
        raw[start..end].to_vec()
    }
}

fn decrypt_logic(res_id: ResourceID, data: &mut [u8]) -> Result<(), VolumeError> {
    crypt::decrypt_logic(data, crypt::CRYPT_KEY_SIERRA).map_err(|e| VolumeError::Io(res_id, e))
}

fn load_v2(res_id: ResourceID, raw: &[u8]) -> Result<Vec<u8>, VolumeError> {
    if raw.len() < resource::RESOURCE_HEADER_V2_SIZE {
        return Ok(Vec::new())
    }
    let header = ResourceHeaderV2::unpack_from_slice(&raw[0..resource::RESOURCE_HEADER_V2_SIZE])
        .map_err(|_| VolumeError::Io(res_id, truncated("resource header")))?;
    check_signature(res_id, header.signature);

    let mut data = payload(res_id, raw, resource::RESOURCE_HEADER_V2_SIZE, header.length as usize);
    if res_id.rtype == ResourceType::Logic {
        decrypt_logic(res_id, &mut data)?;
    }
    Ok(data)
}

fn load_v3(res_id: ResourceID, raw: &[u8]) -> Result<Vec<u8>, VolumeError> {
    if raw.len() < resource::RESOURCE_HEADER_V3_SIZE {
        return Err(VolumeError::Io(res_id, truncated("resource header")))
    }
    let header = ResourceHeaderV3::unpack_from_slice(&raw[0..resource::RESOURCE_HEADER_V3_SIZE])
        .map_err(|_| VolumeError::Io(res_id, truncated("resource header")))?;
    check_signature(res_id, header.signature);

    let uncompressed_length = header.uncompressed_length as usize;
    let mut data = payload(res_id, raw, resource::RESOURCE_HEADER_V3_SIZE, header.compressed_length as usize);
    if header.uncompressed_length == header.compressed_length {
        if res_id.rtype == ResourceType::Logic {
            decrypt_logic(res_id, &mut data)?;
        }
        return Ok(data)
    }

    if res_id.rtype == ResourceType::Picture && (header.flags & resource::FLAG_PICTURE_NIBBLES) != 0 {
        Ok(decompress::expand_picture(&data, uncompressed_length))
    } else {
        decompress::expand_lzw(&data, uncompressed_length).map_err(|e| VolumeError::Decompression(res_id, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemorySource;

    fn record(volume: u8, offset: u32) -> [ u8; 3 ] {
        [ (volume << 4) | ((offset >> 16) & 0xf) as u8, (offset >> 8) as u8, offset as u8 ]
    }

    fn header_v2(length: usize) -> Vec<u8> {
        vec![ 0x12, 0x34, 0x00, length as u8, (length >> 8) as u8 ]
    }

    fn header_v3(flags: u8, uncompressed: usize, compressed: usize) -> Vec<u8> {
        vec![ 0x12, 0x34, flags, uncompressed as u8, (uncompressed >> 8) as u8, compressed as u8, (compressed >> 8) as u8 ]
    }

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

    // Logic with 2 code bytes and one message "hey"
    fn plain_logic() -> Vec<u8> {
        vec![ 0x02, 0x00, 0xaa, 0xbb, 0x01, 0x08, 0x00, 0x03, 0x00, b'h', b'e', b'y', 0x00 ]
    }

    fn v2_source() -> MemorySource {
        let picture = vec![ 0xf0, 0x01, 0xff ];
        let mut logic = plain_logic();
        crypt::decrypt(&mut logic[9..13], crypt::CRYPT_KEY_SIERRA);

        let mut vol0 = Vec::new();
        vol0.extend(header_v2(picture.len()));
        vol0.extend(&picture);
        let logic_offset = vol0.len() as u32;
        vol0.extend(header_v2(logic.len()));
        vol0.extend(&logic);

        let mut source = MemorySource::new();
        source.insert("vol.0", vol0);
        source.insert("picdir", [ record(0, 0), [ 0xff, 0xff, 0xff ], record(2, 0x10) ].concat());
        source.insert("logdir", record(0, logic_offset).to_vec());
        source.insert("viewdir", Vec::new());
        // sound 0 and picture 2 live in volumes that are not there
        source.insert("snddir", record(1, 0).to_vec());
        source.insert("object", vec![ 1, 2, 3, 4 ]);
        source.insert("words.tok", vec![ 5, 6 ]);
        source
    }

    #[test]
    fn v2_volume() {
        let volume = Volume::open(v2_source()).unwrap();
        assert_eq!(volume.generation(), Generation::V2);
        assert!(volume.exists(ResourceType::Picture, 0));
        assert!(!volume.exists(ResourceType::Picture, 1));
        assert!(volume.exists(ResourceType::Picture, 2));
        assert!(!volume.exists(ResourceType::View, 0));
        assert_eq!(volume.resource_ids(ResourceType::Picture), vec![ 0, 2 ]);

        assert_eq!(volume.entry(ResourceType::Picture, 0).unwrap().length, 8);
        assert_eq!(volume.entry(ResourceType::Logic, 0).unwrap().length, 18);

        assert_eq!(volume.load(ResourceType::Picture, 0).unwrap(), vec![ 0xf0, 0x01, 0xff ]);
        assert_eq!(volume.load(ResourceType::Logic, 0).unwrap(), plain_logic());
        assert_eq!(volume.load(ResourceType::Objects, 0).unwrap(), vec![ 1, 2, 3, 4 ]);
        assert_eq!(volume.load(ResourceType::Words, 0).unwrap(), vec![ 5, 6 ]);
        assert_eq!(volume.load_raw(ResourceType::Picture, 0).unwrap().len(), 8);
    }

    #[test]
    fn v2_failures_stay_local() {
        let volume = Volume::open(v2_source()).unwrap();

        assert_eq!(volume.entry(ResourceType::Picture, 2).unwrap().length, 0);
        match volume.load(ResourceType::Picture, 2) {
            Err(VolumeError::VolumeNotFound(2)) => { },
            other => panic!("unexpected {:?}", other.map(|d| d.len())),
        }
        match volume.load(ResourceType::Sound, 0) {
            Err(VolumeError::VolumeNotFound(1)) => { },
            other => panic!("unexpected {:?}", other.map(|d| d.len())),
        }
        match volume.load(ResourceType::Picture, 1) {
            Err(e) => assert!(e.is_not_found()),
            Ok(_) => panic!("picture 1 does not exist"),
        }
        match volume.load(ResourceType::Directory, 0) {
            Err(VolumeError::ResourceTypeNotFound(ResourceType::Directory)) => { },
            other => panic!("unexpected {:?}", other.map(|d| d.len())),
        }
        assert!(volume.load(ResourceType::Picture, 0).is_ok());
    }

    #[test]
    fn v2_malformed_directory_is_fatal() {
        let mut source = v2_source();
        source.insert("picdir", vec![ 0x00, 0x00 ]);
        match Volume::open(source) {
            Err(VolumeError::MalformedDirectory(ResourceType::Picture)) => { },
            _ => panic!("expected a malformed directory"),
        }
    }

    fn v3_source() -> MemorySource {
        let mut vol0 = Vec::new();
        let mut offsets = Vec::new();

        // picture 0, nibble packed
        offsets.push(vol0.len() as u32);
        let packed = [ 0xf0, 0x41, 0x23, 0x4f, 0x29, 0xff ];
        vol0.extend(header_v3(0x80, 7, packed.len()));
        vol0.extend(&packed);

        // picture 1, stored
        offsets.push(vol0.len() as u32);
        vol0.extend(header_v3(0x00, 2, 2));
        vol0.extend(&[ 0xf1, 0xff ]);

        // logic 0, lzw
        offsets.push(vol0.len() as u32);
        let lzw = pack_codes(&[ 0x100, 0x41, 0x42, 0x102, 0x101 ]);
        vol0.extend(header_v3(0x00, 4, lzw.len()));
        vol0.extend(&lzw);

        // view 0, lzw stream ending early
        offsets.push(vol0.len() as u32);
        let short = pack_codes(&[ 0x100, 0x41, 0x101 ]);
        vol0.extend(header_v3(0x00, 5, short.len()));
        vol0.extend(&short);

        let mut dir = vec![ 0x08, 0x00, 0x0b, 0x00, 0x11, 0x00, 0x14, 0x00 ];
        dir.extend(&record(0, offsets[2]));
        dir.extend(&record(0, offsets[0]));
        dir.extend(&record(0, offsets[1]));
        dir.extend(&record(0, offsets[3]));

        let mut source = MemorySource::new();
        source.insert("GRDIR", dir);
        source.insert("GRVOL.0", vol0);
        source.insert("OBJECT", vec![ 0 ]);
        source.insert("WORDS.TOK", vec![ 0 ]);
        source
    }

    #[test]
    fn v3_volume() {
        let volume = Volume::open(v3_source()).unwrap();
        assert_eq!(volume.generation(), Generation::V3);
        assert_eq!(volume.resource_ids(ResourceType::Picture), vec![ 0, 1 ]);
        assert_eq!(volume.resource_ids(ResourceType::Sound), Vec::<u16>::new());

        assert_eq!(volume.load(ResourceType::Picture, 0).unwrap(), vec![ 0xf0, 0x04, 0x12, 0x34, 0xf2, 0x09, 0xff ]);
        assert_eq!(volume.load(ResourceType::Picture, 1).unwrap(), vec![ 0xf1, 0xff ]);
        assert_eq!(volume.load(ResourceType::Logic, 0).unwrap(), b"ABAB".to_vec());
        assert_eq!(volume.entry(ResourceType::Picture, 1).unwrap().length, 9);
    }

    #[test]
    fn v3_length_mismatch_is_reported() {
        let volume = Volume::open(v3_source()).unwrap();
        match volume.load(ResourceType::View, 0) {
            Err(VolumeError::Decompression(id, DecompressError::LengthMismatch{ expected: 5, actual: 1 })) => {
                assert_eq!(id, ResourceID{ rtype: ResourceType::View, num: 0 });
            },
            other => panic!("unexpected {:?}", other.map(|d| d.len())),
        }
        assert!(volume.load(ResourceType::Logic, 0).is_ok());
    }

    #[test]
    fn v3_truncated_header() {
        let mut source = v3_source();
        let dir = vec![ 0x08, 0x00, 0x0b, 0x00, 0x0b, 0x00, 0x0b, 0x00, 0x00, 0x00, 0x00 ];
        source.insert("GRDIR", dir);
        source.insert("GRVOL.0", vec![ 0x12, 0x34, 0x00 ]);
        let volume = Volume::open(source).unwrap();
        match volume.load(ResourceType::Logic, 0) {
            Err(VolumeError::Io(_, e)) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("unexpected {:?}", other.map(|d| d.len())),
        }
    }
}
