use std::sync::Arc;

use filesys::FileSystem;
use image::{Executable, ImageError};
use thiserror::Error;
use types::Config;
use vm::memory::PhysicalMemory;

use crate::address_space::AddressSpace;

const PAGE_SIZE: usize = Config::PAGE_SIZE;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot open `{0}`")]
    Open(String),
    #[error("`{name}` is not a valid executable: {source}")]
    Image {
        name: String,
        #[source]
        source: ImageError,
    },
    #[error("`{name}`: section `{section}` starts at page {found}, expected page {expected}")]
    Fragmented {
        name: String,
        section: String,
        expected: usize,
        found: usize,
    },
    #[error("arguments need {needed} bytes but only {limit} fit in the argument page")]
    ArgumentsTooLong { needed: usize, limit: usize },
    #[error("`{name}` needs {needed} pages but only {free} are free")]
    InsufficientMemory {
        name: String,
        needed: usize,
        free: usize,
    },
}

/// A program ready to run: its mapped memory and its initial registers.
#[derive(Debug)]
pub struct LoadedImage {
    pub space: AddressSpace,
    pub initial_pc: u32,
    /// Top of the stack, which is also the base of the argument page.
    pub initial_sp: u32,
    pub argc: u32,
    /// Address of the argument pointer array.
    pub argv: u32,
}

/// Bytes the argument block needs: a pointer, the string and its NUL for
/// every argument.
pub fn argument_block_size(args: &[String]) -> usize {
    args.iter().map(|arg| 4 + arg.len() + 1).sum()
}

/// Loads the executable `name` into a fresh address space.
///
/// Layout, from virtual page 0 upward: the image sections back to back,
/// `Config::STACK_PAGES` of stack, then one page holding `argc` pointers
/// followed by the NUL-terminated argument strings. Nothing is left
/// allocated when loading fails.
pub fn load(
    fs: &dyn FileSystem,
    memory: &Arc<PhysicalMemory>,
    name: &str,
    args: &[String],
) -> Result<LoadedImage, LoadError> {
    tracing::debug!(target: "kernel::loader", program = name, ?args, "loading");

    let mut file = fs.open(name, false).ok_or_else(|| LoadError::Open(name.to_string()))?;
    let parsed = Executable::read_from(file.as_mut());
    file.close();
    let executable = parsed.map_err(|source| LoadError::Image {
        name: name.to_string(),
        source,
    })?;

    // Sections must tile the address space from page 0 with no holes.
    let mut section_pages = 0;
    for section in executable.sections() {
        if section.first_vpn != section_pages {
            return Err(LoadError::Fragmented {
                name: name.to_string(),
                section: section.name.clone(),
                expected: section_pages,
                found: section.first_vpn,
            });
        }
        section_pages += section.num_pages;
    }

    let needed = argument_block_size(args);
    if needed > PAGE_SIZE {
        return Err(LoadError::ArgumentsTooLong {
            needed,
            limit: PAGE_SIZE,
        });
    }

    let stack_top_page = section_pages + Config::STACK_PAGES;
    let num_pages = stack_top_page + Config::ARGUMENT_PAGES;
    let too_big = || LoadError::InsufficientMemory {
        name: name.to_string(),
        needed: num_pages,
        free: memory.free_pages(),
    };
    // The argument page must stay addressable with 32-bit pointers.
    if num_pages * PAGE_SIZE > u32::MAX as usize {
        return Err(too_big());
    }
    let mut space = AddressSpace::allocate(Arc::clone(memory), num_pages).ok_or_else(too_big)?;

    let mut page = vec![0u8; PAGE_SIZE];
    for section in executable.sections() {
        tracing::debug!(
            target: "kernel::loader",
            section = %section.name,
            pages = section.num_pages,
            read_only = section.is_read_only(),
            "initializing section"
        );
        for spn in 0..section.num_pages {
            let vpn = section.first_vpn + spn;
            section.load_page(spn, &mut page);
            if !space.fill_page(vpn, &page) {
                return Err(too_big());
            }
            space.set_read_only(vpn, section.is_read_only());
        }
    }

    let argv = (stack_top_page * PAGE_SIZE) as u32;
    let mut string_addr = argv + (args.len() * 4) as u32;
    for (i, arg) in args.iter().enumerate() {
        let pointer_addr = argv + (i * 4) as u32;
        let mut bytes = Vec::with_capacity(arg.len() + 1);
        bytes.extend_from_slice(arg.as_bytes());
        bytes.push(0);
        if !space.write_u32(pointer_addr, string_addr)
            || space.write(string_addr, &bytes) != bytes.len()
        {
            return Err(LoadError::ArgumentsTooLong {
                needed,
                limit: PAGE_SIZE,
            });
        }
        string_addr += bytes.len() as u32;
    }

    tracing::debug!(
        target: "kernel::loader",
        program = name,
        pages = num_pages,
        entry = format_args!("0x{:08x}", executable.entry_point()),
        "loaded"
    );

    Ok(LoadedImage {
        space,
        initial_pc: executable.entry_point(),
        initial_sp: argv,
        argc: args.len() as u32,
        argv,
    })
}
