use std::collections::BTreeMap;
use std::io;
use std::sync::Arc;

use threads::Lock;

use crate::{FileSystem, OpenFile, is_valid_name};

type Contents = Arc<Lock<Vec<u8>>>;

/// File system kept entirely in memory.
///
/// Files live in an ordered map so listings are deterministic. Open
/// handles share the file's contents, so removing a name leaves them
/// usable until they are closed.
#[derive(Debug, Default)]
pub struct MemFileSystem {
    files: Lock<BTreeMap<String, Contents>>,
}

impl MemFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or replaces a file with the given contents.
    pub fn insert(&self, name: &str, data: impl Into<Vec<u8>>) {
        self.files
            .acquire()
            .insert(name.to_string(), Arc::new(Lock::new(data.into())));
    }

    pub fn contents(&self, name: &str) -> Option<Vec<u8>> {
        let files = self.files.acquire();
        let file = files.get(name)?;
        let data = file.acquire().clone();
        Some(data)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.acquire().contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.files.acquire().keys().cloned().collect()
    }
}

impl FileSystem for MemFileSystem {
    fn open(&self, name: &str, create: bool) -> Option<Box<dyn OpenFile>> {
        if !is_valid_name(name) {
            return None;
        }
        let mut files = self.files.acquire();
        let data = match files.get(name) {
            Some(data) => Arc::clone(data),
            None if create => {
                let data: Contents = Arc::new(Lock::new(Vec::new()));
                files.insert(name.to_string(), Arc::clone(&data));
                tracing::debug!(target: "filesys::mem", file = name, "created");
                data
            }
            None => return None,
        };
        Some(Box::new(MemFile {
            name: name.to_string(),
            data,
            pos: 0,
        }))
    }

    fn remove(&self, name: &str) -> bool {
        self.files.acquire().remove(name).is_some()
    }
}

#[derive(Debug)]
struct MemFile {
    name: String,
    data: Contents,
    pos: usize,
}

impl OpenFile for MemFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let data = self.data.acquire();
        let start = self.pos.min(data.len());
        let len = buf.len().min(data.len() - start);
        buf[..len].copy_from_slice(&data[start..start + len]);
        self.pos = start + len;
        Ok(len)
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        let mut data = self.data.acquire();
        let end = self.pos + bytes.len();
        if data.len() < end {
            data.resize(end, 0);
        }
        data[self.pos..end].copy_from_slice(bytes);
        self.pos = end;
        Ok(bytes.len())
    }
}
