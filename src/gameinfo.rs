use crate::restype::ResourceType;
use crate::storage::ByteSource;
use crate::volume::VolumeError;
use log::info;
use md5::{Digest, Md5};
use phf::phf_map;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum Platform {
    PcXt,
}

pub struct KnownGame {
    pub code: &'static str,
    pub description: &'static str,
    pub engine_version: u16,
    pub game_version: &'static str,
    pub platform: Platform,
    pub flags: u32,
}

// Keyed by the MD5 of `logdir` (v2) or of the combined directory (v3).
static KNOWN_GAMES: phf::Map<&'static str, KnownGame> = phf_map!{
    "10ad66e2ecbd66951534a50aedcd0128" => KnownGame{ code: "kq1", description: "King's Quest I", engine_version: 0x2917, game_version: "2.0F 1987-05-05 5.25", platform: Platform::PcXt, flags: 0 },
    "759e39f891a0e1d86dd29d7de485c6ac" => KnownGame{ code: "kq2", description: "King's Quest II", engine_version: 0x2440, game_version: "2.1 1987-04-10", platform: Platform::PcXt, flags: 0 },
    "d3d17b77b3b3cd13246749231d9473cd" => KnownGame{ code: "kq3", description: "King's Quest III", engine_version: 0x2936, game_version: "2.14 1988-03-15 3.5", platform: Platform::PcXt, flags: 0 },
    "fe44655c42f16c6f81046fdf169b6337" => KnownGame{ code: "kq4", description: "King's Quest IV", engine_version: 0x3086, game_version: "2.0 1988-07-27 3.5", platform: Platform::PcXt, flags: 0 },
};

const V2_FILES: [ &str; 7 ] = [ "logdir", "object", "picdir", "snddir", "viewdir", "words.tok", "vol.0" ];

static V2_VOLUME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^vol\.(\d)$").unwrap());
static V3_VOLUME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\w+)vol\.(\d)$").unwrap());
static V3_DIRECTORY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\w+)dir$").unwrap());

pub struct GameInfo {
    pub code: String,
    pub description: String,
    pub engine_version: u16,
    pub game_version: String,
    pub platform: Platform,
    pub flags: u32,
    pub files: HashMap<ResourceType, String>,
}

fn common_file(name: &str) -> Option<ResourceType> {
    match name {
        "words.tok" => Some(ResourceType::Words),
        "object" => Some(ResourceType::Objects),
        _ => None
    }
}

fn volume_from_capture(digit: &str) -> Option<ResourceType> {
    digit.parse::<u8>().ok().and_then(ResourceType::volume)
}

fn build_v2_files(names: &[String]) -> HashMap<ResourceType, String> {
    let mut files = HashMap::new();
    for name in names {
        let lower = name.to_lowercase();
        let role = match lower.as_str() {
            "logdir" => Some(ResourceType::Logic),
            "picdir" => Some(ResourceType::Picture),
            "snddir" => Some(ResourceType::Sound),
            "viewdir" => Some(ResourceType::View),
            other => common_file(other).or_else(|| {
                V2_VOLUME.captures(other).and_then(|c| volume_from_capture(&c[1]))
            })
        };
        if let Some(role) = role {
            files.insert(role, name.clone());
        }
    }
    files
}

fn build_v3_files(names: &[String]) -> HashMap<ResourceType, String> {
    let mut files = HashMap::new();
    for name in names {
        let lower = name.to_lowercase();
        let role = if let Some(role) = common_file(&lower) {
            Some(role)
        } else if let Some(c) = V3_VOLUME.captures(&lower) {
            volume_from_capture(&c[2])
        } else if V3_DIRECTORY.is_match(&lower) {
            Some(ResourceType::Directory)
        } else {
            None
        };
        if let Some(role) = role {
            files.insert(role, name.clone());
        }
    }
    files
}

fn md5_hex(data: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(data);
    hasher.finalize().iter().map(|b| format!("{:02x}", b)).collect()
}

impl GameInfo {
    pub fn detect<S: ByteSource + ?Sized>(source: &S) -> Result<GameInfo, VolumeError> {
        GameInfo::detect_with(source, &KNOWN_GAMES)
    }

    pub fn detect_with<S: ByteSource + ?Sized>(source: &S, known: &phf::Map<&'static str, KnownGame>) -> Result<GameInfo, VolumeError> {
        let names = source.list().map_err(|e| VolumeError::Storage("file list".to_string(), e))?;
        let present: HashSet<String> = names.iter().map(|n| n.to_lowercase()).collect();
        let is_v2 = V2_FILES.iter().all(|f| present.contains(*f));

        let (files, hash_role) = if is_v2 {
            (build_v2_files(&names), ResourceType::Logic)
        } else {
            (build_v3_files(&names), ResourceType::Directory)
        };

        let hash_file = files.get(&hash_role).ok_or(VolumeError::FileNotFound(hash_role))?;
        let data = source.read(hash_file).map_err(|e| VolumeError::Storage(hash_file.clone(), e))?;
        let hash = md5_hex(&data);

        let info = match known.get(hash.as_str()) {
            Some(game) => GameInfo{
                code: game.code.to_string(),
                description: game.description.to_string(),
                engine_version: game.engine_version,
                game_version: game.game_version.to_string(),
                platform: game.platform,
                flags: game.flags,
                files,
            },
            None if is_v2 => GameInfo{
                code: "agiv2".to_string(),
                description: format!("Unknown AGI v2 game {}", hash),
                engine_version: 0x2917,
                game_version: "0.0".to_string(),
                platform: Platform::PcXt,
                flags: 0,
                files,
            },
            None => GameInfo{
                code: "agiv3".to_string(),
                description: format!("Unknown AGI v3 game {}", hash),
                engine_version: 0x3086,
                game_version: "0.0".to_string(),
                platform: Platform::PcXt,
                flags: 0,
                files,
            },
        };
        info!("detected {} ({}), engine {}", info.code, info.description, info.engine_version_string());
        Ok(info)
    }

    pub fn is_version3(&self) -> bool {
        self.engine_version >= 0x3000
    }

    pub fn file(&self, role: ResourceType) -> Option<&str> {
        self.files.get(&role).map(|s| s.as_str())
    }

    pub fn engine_version_string(&self) -> String {
        let n = self.engine_version;
        format!("{}.{}.{:x}", (n >> 12) & 0xf, (n >> 8) & 0xf, n & 0xff)
    }
}

impl std::fmt::Display for GameInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let platform = match self.platform {
            Platform::PcXt => "PC XT",
        };
        writeln!(f, "Code: {}", self.code)?;
        writeln!(f, "Description: {}", self.description)?;
        writeln!(f, "Version: {}", self.game_version)?;
        writeln!(f, "Platform: {}", platform)?;
        writeln!(f, "Engine Version: {}", self.engine_version_string())
    }
}
