use std::fmt;
use std::sync::Arc;

use types::Config;
use vm::memory::{Mmu, PhysicalMemory, Ppn, VirtualAddress};
use vm::ExceptionCause;

const PAGE_SIZE: usize = Config::PAGE_SIZE;

/// One page-table entry: where a virtual page lives and how it may be used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranslationEntry {
    pub vpn: usize,
    pub ppn: Ppn,
    pub valid: bool,
    pub read_only: bool,
    /// Set by any user access to the page.
    pub used: bool,
    /// Set by any store to the page.
    pub dirty: bool,
}

/// A process's virtual memory: a flat page table over frames borrowed
/// from the machine's physical memory.
///
/// Virtual pages `0..num_pages` are all mapped. Every kernel-side copy
/// is clamped to that range and reports how many bytes it moved, so a bad
/// user pointer produces a short count instead of a fault.
pub struct AddressSpace {
    memory: Arc<PhysicalMemory>,
    page_table: Vec<TranslationEntry>,
}

impl fmt::Debug for AddressSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddressSpace")
            .field("num_pages", &self.page_table.len())
            .finish()
    }
}

impl AddressSpace {
    /// Maps `num_pages` fresh, zeroed frames at virtual pages
    /// `0..num_pages`. Returns `None` without taking any frame when memory
    /// is short.
    pub fn allocate(memory: Arc<PhysicalMemory>, num_pages: usize) -> Option<Self> {
        let frames = memory.allocate(num_pages)?;
        let page_table = frames
            .into_iter()
            .enumerate()
            .map(|(vpn, ppn)| TranslationEntry {
                vpn,
                ppn,
                valid: true,
                ..TranslationEntry::default()
            })
            .collect();
        Some(Self { memory, page_table })
    }

    pub fn num_pages(&self) -> usize {
        self.page_table.len()
    }

    /// Bytes of mapped virtual memory.
    pub fn size(&self) -> usize {
        self.page_table.len() * PAGE_SIZE
    }

    pub fn entry(&self, vpn: usize) -> Option<&TranslationEntry> {
        self.page_table.get(vpn)
    }

    pub fn set_read_only(&mut self, vpn: usize, read_only: bool) {
        if let Some(entry) = self.page_table.get_mut(vpn) {
            entry.read_only = read_only;
        }
    }

    /// Returns every frame to physical memory. Safe to call more than once.
    pub fn release(&mut self) {
        if self.page_table.is_empty() {
            return;
        }
        let frames: Vec<Ppn> = self
            .page_table
            .drain(..)
            .filter(|entry| entry.valid)
            .map(|entry| entry.ppn)
            .collect();
        tracing::trace!(target: "kernel::address_space", frames = frames.len(), "releasing frames");
        self.memory.release(&frames);
    }

    /// Physical address of `addr`, if its page is mapped.
    fn translate(&self, addr: usize) -> Option<(usize, &TranslationEntry)> {
        let entry = self.page_table.get(addr / PAGE_SIZE).filter(|e| e.valid)?;
        Some((entry.ppn * PAGE_SIZE + addr % PAGE_SIZE, entry))
    }

    /// Copies from user memory into `buf`, stopping at the first unmapped
    /// byte. Returns the number of bytes copied.
    pub fn read(&self, vaddr: u32, buf: &mut [u8]) -> usize {
        let mut done = 0;
        while done < buf.len() {
            let addr = vaddr as usize + done;
            let Some((paddr, _)) = self.translate(addr) else {
                break;
            };
            let chunk = (PAGE_SIZE - addr % PAGE_SIZE).min(buf.len() - done);
            let copied = self.memory.read(paddr, &mut buf[done..done + chunk]);
            done += copied;
            if copied < chunk {
                break;
            }
        }
        done
    }

    /// Copies `data` into user memory, stopping at the first unmapped or
    /// read-only page. Returns the number of bytes copied.
    pub fn write(&mut self, vaddr: u32, data: &[u8]) -> usize {
        let mut done = 0;
        while done < data.len() {
            let addr = vaddr as usize + done;
            let vpn = addr / PAGE_SIZE;
            let Some(entry) = self
                .page_table
                .get_mut(vpn)
                .filter(|e| e.valid && !e.read_only)
            else {
                break;
            };
            entry.used = true;
            entry.dirty = true;
            let paddr = entry.ppn * PAGE_SIZE + addr % PAGE_SIZE;
            let chunk = (PAGE_SIZE - addr % PAGE_SIZE).min(data.len() - done);
            let copied = self.memory.write(paddr, &data[done..done + chunk]);
            done += copied;
            if copied < chunk {
                break;
            }
        }
        done
    }

    /// Reads a NUL-terminated string of at most `max_len` bytes (NUL not
    /// counted). `None` when no terminator appears in that window or the
    /// bytes are not UTF-8. Syscalls treat both cases as a bad name
    /// argument and return -1.
    pub fn read_string(&self, vaddr: u32, max_len: usize) -> Option<String> {
        let mut buf = vec![0u8; max_len + 1];
        let copied = self.read(vaddr, &mut buf);
        let len = buf[..copied].iter().position(|&b| b == 0)?;
        buf.truncate(len);
        String::from_utf8(buf).ok()
    }

    pub fn read_u32(&self, vaddr: u32) -> Option<u32> {
        let mut buf = [0u8; 4];
        (self.read(vaddr, &mut buf) == 4).then(|| u32::from_le_bytes(buf))
    }

    pub fn write_u32(&mut self, vaddr: u32, value: u32) -> bool {
        self.write(vaddr, &value.to_le_bytes()) == 4
    }

    /// True when every byte of `[vaddr, vaddr + len)` is mapped.
    pub fn contains(&self, vaddr: u32, len: usize) -> bool {
        self.pages_in(vaddr, len)
            .is_some_and(|mut pages| pages.all(|vpn| self.page_table[vpn].valid))
    }

    /// True when every byte of `[vaddr, vaddr + len)` is mapped and writable.
    pub fn is_writable(&self, vaddr: u32, len: usize) -> bool {
        self.pages_in(vaddr, len).is_some_and(|mut pages| {
            pages.all(|vpn| self.page_table[vpn].valid && !self.page_table[vpn].read_only)
        })
    }

    fn pages_in(&self, vaddr: u32, len: usize) -> Option<std::ops::Range<usize>> {
        let start = vaddr as usize;
        let end = start.checked_add(len)?;
        if end > self.size() {
            return None;
        }
        if len == 0 {
            return Some(0..0);
        }
        Some(start / PAGE_SIZE..(end - 1) / PAGE_SIZE + 1)
    }

    /// Hex dump of the page holding `addr`, for fault diagnostics.
    pub fn dump_page(&self, addr: VirtualAddress) -> Option<String> {
        let entry = self.page_table.get(addr.vpn()).filter(|e| e.valid)?;
        self.memory.dump_frame(entry.ppn)
    }

    /// Fills a whole page, ignoring its protection. Used while loading.
    pub(crate) fn fill_page(&mut self, vpn: usize, data: &[u8]) -> bool {
        let Some(entry) = self.page_table.get(vpn).filter(|e| e.valid) else {
            return false;
        };
        let len = data.len().min(PAGE_SIZE);
        self.memory.write(entry.ppn * PAGE_SIZE, &data[..len]) == len
    }

    /// Checks a user access and marks the touched pages.
    fn check_access(&mut self, addr: VirtualAddress, len: usize, store: bool) -> Result<(), ExceptionCause> {
        let pages = self
            .pages_in(addr.as_u32(), len)
            .ok_or(ExceptionCause::PageFault)?;
        for vpn in pages.clone() {
            let entry = &self.page_table[vpn];
            if !entry.valid {
                return Err(ExceptionCause::PageFault);
            }
            if store && entry.read_only {
                return Err(ExceptionCause::ReadOnly);
            }
        }
        for vpn in pages {
            let entry = &mut self.page_table[vpn];
            entry.used = true;
            entry.dirty |= store;
        }
        Ok(())
    }
}

impl Mmu for AddressSpace {
    fn load_bytes(&mut self, addr: VirtualAddress, buf: &mut [u8]) -> Result<(), ExceptionCause> {
        self.check_access(addr, buf.len(), false)?;
        if self.read(addr.as_u32(), buf) != buf.len() {
            return Err(ExceptionCause::BusError);
        }
        Ok(())
    }

    fn store_bytes(&mut self, addr: VirtualAddress, data: &[u8]) -> Result<(), ExceptionCause> {
        self.check_access(addr, data.len(), true)?;
        if self.write(addr.as_u32(), data) != data.len() {
            return Err(ExceptionCause::BusError);
        }
        Ok(())
    }
}

impl Drop for AddressSpace {
    fn drop(&mut self) {
        self.release();
    }
}
