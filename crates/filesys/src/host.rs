use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use crate::{FileSystem, OpenFile, is_valid_name};

/// Files in one host directory. Guests cannot name anything outside it.
#[derive(Debug, Clone)]
pub struct HostFileSystem {
    root: PathBuf,
}

impl HostFileSystem {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, name: &str) -> Option<PathBuf> {
        is_valid_name(name).then(|| self.root.join(name))
    }
}

impl FileSystem for HostFileSystem {
    fn open(&self, name: &str, create: bool) -> Option<Box<dyn OpenFile>> {
        let path = self.path_of(name)?;
        let opened = OpenOptions::new()
            .read(true)
            .write(true)
            .create(create)
            .open(&path)
            .or_else(|err| match err.kind() {
                // Read-only files can still be read, writes will fail later.
                io::ErrorKind::PermissionDenied => File::open(&path),
                _ => Err(err),
            });
        match opened {
            Ok(file) if file.metadata().map(|m| m.is_file()).unwrap_or(false) => {
                Some(Box::new(HostFile {
                    name: name.to_string(),
                    file: Some(file),
                }))
            }
            Ok(_) => None,
            Err(err) => {
                tracing::debug!(target: "filesys::host", file = name, error = %err, "open failed");
                None
            }
        }
    }

    fn remove(&self, name: &str) -> bool {
        let Some(path) = self.path_of(name) else {
            return false;
        };
        match fs::remove_file(&path) {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(target: "filesys::host", file = name, error = %err, "remove failed");
                false
            }
        }
    }
}

#[derive(Debug)]
struct HostFile {
    name: String,
    file: Option<File>,
}

impl HostFile {
    fn file(&mut self) -> io::Result<&mut File> {
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::other("file is closed"))
    }
}

impl OpenFile for HostFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file()?.read(buf)
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let file = self.file()?;
        file.write_all(data)?;
        Ok(data.len())
    }

    fn close(&mut self) {
        self.file = None;
    }
}
