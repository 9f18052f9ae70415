use std::fmt;

use types::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Code,
    ReadOnlyData,
    Data,
    /// Zero-initialized, no bytes in the file.
    Bss,
}

impl SectionKind {
    pub fn is_read_only(self) -> bool {
        matches!(self, SectionKind::Code | SectionKind::ReadOnlyData)
    }
}

/// One loadable section, expressed in whole pages.
#[derive(Clone)]
pub struct Section {
    pub name: String,
    pub kind: SectionKind,
    /// Virtual page the section starts on.
    pub first_vpn: usize,
    pub num_pages: usize,
    /// Size in memory; may exceed `data.len()`.
    pub size: usize,
    /// Initialized bytes from the file.
    pub data: Vec<u8>,
}

impl fmt::Debug for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Section")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("first_vpn", &self.first_vpn)
            .field("num_pages", &self.num_pages)
            .field("size", &self.size)
            .finish()
    }
}

impl Section {
    pub fn is_read_only(&self) -> bool {
        self.kind.is_read_only()
    }

    /// Fills `dst` with page `spn` of the section (0-based within the
    /// section). Bytes past the initialized data are zero.
    pub fn load_page(&self, spn: usize, dst: &mut [u8]) {
        dst.fill(0);
        if spn >= self.num_pages {
            return;
        }
        let start = spn * Config::PAGE_SIZE;
        if start >= self.data.len() {
            return;
        }
        let end = (start + dst.len().min(Config::PAGE_SIZE)).min(self.data.len());
        dst[..end - start].copy_from_slice(&self.data[start..end]);
    }
}
