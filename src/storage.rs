use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

pub trait ByteSource {
    fn exists(&self, name: &str) -> bool;
    fn size(&self, name: &str) -> io::Result<u64>;
    fn read_range(&self, name: &str, offset: u64, length: usize) -> io::Result<Vec<u8>>;
    fn list(&self) -> io::Result<Vec<String>>;

    fn read(&self, name: &str) -> io::Result<Vec<u8>> {
        let size = self.size(name)?;
        self.read_range(name, 0, size as usize)
    }
}

fn not_found(name: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("{}: no such file", name))
}

// A game directory on disk. DOS games ship with upper case names, so
// lookups fall back to a case-insensitive match.
pub struct DirectorySource {
    path: PathBuf,
}

impl DirectorySource {
    pub fn new<P: AsRef<Path>>(path: P) -> DirectorySource {
        DirectorySource{ path: path.as_ref().to_path_buf() }
    }

    fn resolve(&self, name: &str) -> io::Result<PathBuf> {
        let exact = self.path.join(name);
        if exact.is_file() {
            return Ok(exact);
        }
        for candidate in self.list()? {
            if candidate.eq_ignore_ascii_case(name) {
                return Ok(self.path.join(candidate));
            }
        }
        Err(not_found(name))
    }
}

impl ByteSource for DirectorySource {
    fn exists(&self, name: &str) -> bool {
        self.resolve(name).is_ok()
    }

    fn size(&self, name: &str) -> io::Result<u64> {
        Ok(std::fs::metadata(self.resolve(name)?)?.len())
    }

    fn read_range(&self, name: &str, offset: u64, length: usize) -> io::Result<Vec<u8>> {
        let mut file = File::open(self.resolve(name)?)?;
        file.seek(SeekFrom::Start(offset))?;
        let mut data = vec![ 0u8; length ];
        file.read_exact(&mut data)?;
        Ok(data)
    }

    fn list(&self) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.path)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

#[derive(Default)]
pub struct MemorySource {
    files: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> MemorySource {
        MemorySource{ files: HashMap::new() }
    }

    pub fn insert(&mut self, name: &str, data: Vec<u8>) {
        self.files.insert(name.to_string(), data);
    }

    fn get(&self, name: &str) -> io::Result<&Vec<u8>> {
        self.files.get(name).ok_or_else(|| not_found(name))
    }
}

impl ByteSource for MemorySource {
    fn exists(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    fn size(&self, name: &str) -> io::Result<u64> {
        Ok(self.get(name)?.len() as u64)
    }

    fn read_range(&self, name: &str, offset: u64, length: usize) -> io::Result<Vec<u8>> {
        let data = self.get(name)?;
        let start = offset as usize;
        match start.checked_add(length) {
            Some(end) if end <= data.len() => Ok(data[start..end].to_vec()),
            _ => Err(io::Error::new(io::ErrorKind::UnexpectedEof,
                format!("{}: range {}+{} beyond end of file ({} bytes)", name, offset, length, data.len())))
        }
    }

    fn list(&self) -> io::Result<Vec<String>> {
        let mut names: Vec<String> = self.files.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}
