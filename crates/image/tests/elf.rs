use image::{Executable, ImageError, ImageWriter, SectionKind};
use types::Config;

const PAGE: u32 = Config::PAGE_SIZE as u32;

fn sample() -> Vec<u8> {
    let code: Vec<u8> = (0..(PAGE + 8)).map(|i| i as u8).collect();
    ImageWriter::new(0x10)
        .section(".text", SectionKind::Code, 0, &code)
        .section(".rodata", SectionKind::ReadOnlyData, 2 * PAGE, b"const")
        .section(".data", SectionKind::Data, 3 * PAGE, &[7u8; 12])
        .bss(".bss", 4 * PAGE, 2 * PAGE + 1)
        .build()
}

#[test]
fn parses_sections_in_page_units() {
    let exe = Executable::parse(&sample()).unwrap();
    assert_eq!(exe.entry_point(), 0x10);
    assert_eq!(exe.num_sections(), 4);

    let kinds: Vec<_> = exe.sections().iter().map(|s| s.kind).collect();
    assert_eq!(
        kinds,
        [
            SectionKind::Code,
            SectionKind::ReadOnlyData,
            SectionKind::Data,
            SectionKind::Bss
        ]
    );
    let layout: Vec<_> = exe
        .sections()
        .iter()
        .map(|s| (s.name.as_str(), s.first_vpn, s.num_pages))
        .collect();
    assert_eq!(
        layout,
        [(".text", 0, 2), (".rodata", 2, 1), (".data", 3, 1), (".bss", 4, 3)]
    );
    assert!(exe.sections()[0].is_read_only());
    assert!(exe.sections()[1].is_read_only());
    assert!(!exe.sections()[2].is_read_only());
}

#[test]
fn load_page_zero_fills_the_tail() {
    let exe = Executable::parse(&sample()).unwrap();
    let text = &exe.sections()[0];
    let mut page = vec![0xffu8; Config::PAGE_SIZE];

    text.load_page(0, &mut page);
    assert_eq!(page[5], 5);
    assert_eq!(page[Config::PAGE_SIZE - 1], (Config::PAGE_SIZE - 1) as u8);

    text.load_page(1, &mut page);
    assert_eq!(&page[..8], &[0, 1, 2, 3, 4, 5, 6, 7]);
    assert!(page[8..].iter().all(|&b| b == 0));

    let bss = &exe.sections()[3];
    page.fill(0xff);
    bss.load_page(2, &mut page);
    assert!(page.iter().all(|&b| b == 0));
}

#[test]
fn sections_come_back_sorted_by_address() {
    let bytes = ImageWriter::new(0)
        .section(".data", SectionKind::Data, PAGE, &[1])
        .section(".text", SectionKind::Code, 0, &[0x13, 0, 0, 0])
        .build();
    let exe = Executable::parse(&bytes).unwrap();
    assert_eq!(exe.sections()[0].name, ".text");
    assert_eq!(exe.sections()[1].name, ".data");
}

#[test]
fn rejects_misaligned_section() {
    let bytes = ImageWriter::new(0)
        .section(".text", SectionKind::Code, 0x10, &[0x13, 0, 0, 0])
        .build();
    assert!(matches!(
        Executable::parse(&bytes),
        Err(ImageError::MisalignedSection { addr: 0x10, .. })
    ));
}

#[test]
fn rejects_foreign_machine() {
    let bytes = ImageWriter::new(0)
        .machine(62) // x86-64
        .section(".text", SectionKind::Code, 0, &[0x90])
        .build();
    assert!(matches!(
        Executable::parse(&bytes),
        Err(ImageError::WrongMachine(62))
    ));
}

#[test]
fn rejects_image_without_loadable_sections() {
    let bytes = ImageWriter::new(0).build();
    assert!(matches!(
        Executable::parse(&bytes),
        Err(ImageError::NoSections)
    ));
}

#[test]
fn rejects_garbage() {
    assert!(matches!(
        Executable::parse(b"#!/bin/sh\necho hi\n"),
        Err(ImageError::Parse(_))
    ));
}

#[test]
fn reads_through_an_open_file() {
    use filesys::{FileSystem, MemFileSystem};

    let fs = MemFileSystem::new();
    fs.insert("prog.elf", sample());
    let mut file = fs.open("prog.elf", false).unwrap();
    let exe = Executable::read_from(file.as_mut()).unwrap();
    assert_eq!(exe.num_sections(), 4);
}
