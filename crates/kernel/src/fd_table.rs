use std::fmt;

use filesys::{Console, OpenFile};
use thiserror::Error;
use types::Config;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FdError {
    #[error("descriptor {0} is out of range")]
    OutOfRange(usize),
    #[error("descriptor {0} is not open")]
    NotOpen(usize),
}

/// Per-process table of open files, indexed by descriptor.
///
/// Descriptors 0 and 1 belong to the console. New files always get the
/// lowest free descriptor from 2 upward.
pub struct FileTable {
    slots: Vec<Option<Box<dyn OpenFile>>>,
}

impl fmt::Debug for FileTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.slots
                    .iter()
                    .enumerate()
                    .filter_map(|(fd, slot)| slot.as_ref().map(|file| (fd, file.name()))),
            )
            .finish()
    }
}

impl Default for FileTable {
    fn default() -> Self {
        Self::new()
    }
}

impl FileTable {
    pub fn new() -> Self {
        Self {
            slots: (0..Config::MAX_OPEN_FILES).map(|_| None).collect(),
        }
    }

    /// Table with the console bound to descriptors 0 and 1.
    pub fn with_console(console: &Console) -> Self {
        let mut table = Self::new();
        table.slots[Config::STDIN_FD] = Some(console.reader());
        table.slots[Config::STDOUT_FD] = Some(console.writer());
        table
    }

    /// Binds `file` to the lowest free descriptor. A full table hands the
    /// file back.
    pub fn allocate(&mut self, file: Box<dyn OpenFile>) -> Result<usize, Box<dyn OpenFile>> {
        let free = self
            .slots
            .iter()
            .enumerate()
            .skip(Config::RESERVED_DESCRIPTORS)
            .find(|(_, slot)| slot.is_none())
            .map(|(fd, _)| fd);
        match free {
            Some(fd) => {
                self.slots[fd] = Some(file);
                Ok(fd)
            }
            None => Err(file),
        }
    }

    /// Closes the file behind `fd` and frees the descriptor.
    pub fn release(&mut self, fd: usize) -> Result<(), FdError> {
        let slot = self.slots.get_mut(fd).ok_or(FdError::OutOfRange(fd))?;
        let mut file = slot.take().ok_or(FdError::NotOpen(fd))?;
        file.close();
        Ok(())
    }

    pub fn get(&mut self, fd: usize) -> Option<&mut Box<dyn OpenFile>> {
        self.slots.get_mut(fd).and_then(Option::as_mut)
    }

    pub fn is_open(&self, fd: usize) -> bool {
        self.slots.get(fd).is_some_and(Option::is_some)
    }

    pub fn has_free_slot(&self) -> bool {
        self.slots[Config::RESERVED_DESCRIPTORS..]
            .iter()
            .any(Option::is_none)
    }

    pub fn open_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn close_all(&mut self) {
        for slot in &mut self.slots {
            if let Some(mut file) = slot.take() {
                file.close();
            }
        }
    }
}

impl Drop for FileTable {
    fn drop(&mut self) {
        self.close_all();
    }
}
