use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use types::Config;

use crate::exception::ExceptionCause;

/// Virtual address as seen by user code.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VirtualAddress(pub u32);

impl VirtualAddress {
    pub fn as_u32(self) -> u32 {
        self.0
    }

    pub fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// Virtual page number.
    pub fn vpn(self) -> usize {
        (self.0 >> Config::PAGE_SHIFT) as usize
    }

    /// Byte offset within the page.
    pub fn offset(self) -> usize {
        (self.0 & Config::PAGE_OFFSET_MASK) as usize
    }

    pub fn align_down(self) -> Self {
        VirtualAddress(self.0 & !Config::PAGE_OFFSET_MASK)
    }

    pub fn wrapping_add(self, value: u32) -> Self {
        VirtualAddress(self.0.wrapping_add(value))
    }

    pub fn checked_add(self, value: u32) -> Option<Self> {
        self.0.checked_add(value).map(VirtualAddress)
    }
}

impl From<u32> for VirtualAddress {
    fn from(value: u32) -> Self {
        VirtualAddress(value)
    }
}

impl From<VirtualAddress> for usize {
    fn from(value: VirtualAddress) -> Self {
        value.as_usize()
    }
}

impl fmt::Display for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

/// CPU-facing view of an address space: loads, stores and fetches.
///
/// Implementors translate the address and report failures as the exception
/// the processor should raise. The sized helpers enforce natural alignment.
pub trait Mmu {
    fn load_bytes(&mut self, addr: VirtualAddress, buf: &mut [u8]) -> Result<(), ExceptionCause>;
    fn store_bytes(&mut self, addr: VirtualAddress, data: &[u8]) -> Result<(), ExceptionCause>;

    fn fetch_u32(&mut self, addr: VirtualAddress) -> Result<u32, ExceptionCause> {
        self.load_u32(addr)
    }

    fn load_u8(&mut self, addr: VirtualAddress) -> Result<u8, ExceptionCause> {
        let mut buf = [0u8; 1];
        self.load_bytes(addr, &mut buf)?;
        Ok(buf[0])
    }

    fn load_u16(&mut self, addr: VirtualAddress) -> Result<u16, ExceptionCause> {
        check_alignment(addr, 2)?;
        let mut buf = [0u8; 2];
        self.load_bytes(addr, &mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    fn load_u32(&mut self, addr: VirtualAddress) -> Result<u32, ExceptionCause> {
        check_alignment(addr, 4)?;
        let mut buf = [0u8; 4];
        self.load_bytes(addr, &mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn store_u8(&mut self, addr: VirtualAddress, value: u8) -> Result<(), ExceptionCause> {
        self.store_bytes(addr, &[value])
    }

    fn store_u16(&mut self, addr: VirtualAddress, value: u16) -> Result<(), ExceptionCause> {
        check_alignment(addr, 2)?;
        self.store_bytes(addr, &value.to_le_bytes())
    }

    fn store_u32(&mut self, addr: VirtualAddress, value: u32) -> Result<(), ExceptionCause> {
        check_alignment(addr, 4)?;
        self.store_bytes(addr, &value.to_le_bytes())
    }
}

fn check_alignment(addr: VirtualAddress, size: u32) -> Result<(), ExceptionCause> {
    if addr.as_u32() % size != 0 {
        return Err(ExceptionCause::AddressError);
    }
    Ok(())
}

/// Physical page number.
pub type Ppn = usize;

#[derive(Debug)]
struct Frames {
    bytes: Vec<u8>,
    free: Vec<Ppn>,
}

/// Main memory of the machine: a fixed arena of page-sized frames.
///
/// Frames are handed out to address spaces and returned when a process
/// goes away. Byte access is by physical address and clamped to the arena.
pub struct PhysicalMemory {
    num_pages: usize,
    frames: Mutex<Frames>,
}

impl fmt::Debug for PhysicalMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhysicalMemory")
            .field("num_pages", &self.num_pages)
            .field("free_pages", &self.free_pages())
            .finish()
    }
}

impl PhysicalMemory {
    pub fn new(num_pages: usize) -> Self {
        // Low frames first: the free list is popped from the back.
        let free = (0..num_pages).rev().collect();
        Self {
            num_pages,
            frames: Mutex::new(Frames {
                bytes: vec![0u8; num_pages * Config::PAGE_SIZE],
                free,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Frames> {
        self.frames.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn num_pages(&self) -> usize {
        self.num_pages
    }

    pub fn size(&self) -> usize {
        self.num_pages * Config::PAGE_SIZE
    }

    pub fn free_pages(&self) -> usize {
        self.lock().free.len()
    }

    /// Takes `count` zeroed frames, or none at all when fewer are free.
    pub fn allocate(&self, count: usize) -> Option<Vec<Ppn>> {
        let mut frames = self.lock();
        if frames.free.len() < count {
            tracing::debug!(
                target: "vm::memory",
                requested = count,
                free = frames.free.len(),
                "frame allocation refused"
            );
            return None;
        }
        let split = frames.free.len() - count;
        let mut taken = frames.free.split_off(split);
        taken.reverse();
        for &ppn in &taken {
            let start = ppn * Config::PAGE_SIZE;
            frames.bytes[start..start + Config::PAGE_SIZE].fill(0);
        }
        Some(taken)
    }

    /// Returns frames to the free list. Out-of-range or already free frames
    /// are ignored.
    pub fn release(&self, ppns: &[Ppn]) {
        let mut frames = self.lock();
        for &ppn in ppns {
            if ppn >= self.num_pages || frames.free.contains(&ppn) {
                tracing::warn!(target: "vm::memory", ppn, "ignoring release of unowned frame");
                continue;
            }
            frames.free.push(ppn);
        }
    }

    /// Copies bytes starting at `paddr`; returns how many were copied.
    pub fn read(&self, paddr: usize, buf: &mut [u8]) -> usize {
        let frames = self.lock();
        let Some(available) = frames.bytes.len().checked_sub(paddr) else {
            return 0;
        };
        let len = buf.len().min(available);
        buf[..len].copy_from_slice(&frames.bytes[paddr..paddr + len]);
        len
    }

    /// Copies `data` to `paddr`; returns how many bytes were written.
    pub fn write(&self, paddr: usize, data: &[u8]) -> usize {
        let mut frames = self.lock();
        let Some(available) = frames.bytes.len().checked_sub(paddr) else {
            return 0;
        };
        let len = data.len().min(available);
        frames.bytes[paddr..paddr + len].copy_from_slice(&data[..len]);
        len
    }

    /// Hex dump of one frame for trace output.
    pub fn dump_frame(&self, ppn: Ppn) -> Option<String> {
        if ppn >= self.num_pages {
            return None;
        }
        let frames = self.lock();
        let start = ppn * Config::PAGE_SIZE;
        Some(hex::encode(&frames.bytes[start..start + Config::PAGE_SIZE]))
    }
}
