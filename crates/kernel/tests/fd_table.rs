use filesys::{Console, FileSystem, MemFileSystem, OpenFile};
use kernel::{FdError, FileTable};
use types::Config;

fn file(fs: &MemFileSystem, name: &str) -> Box<dyn OpenFile> {
    fs.open(name, true).unwrap()
}

#[test]
fn console_occupies_the_reserved_descriptors() {
    let (console, output) = Console::capture("in");
    let mut table = FileTable::with_console(&console);
    assert!(table.is_open(Config::STDIN_FD));
    assert!(table.is_open(Config::STDOUT_FD));
    assert_eq!(table.open_count(), 2);

    table.get(Config::STDOUT_FD).unwrap().write(b"out").unwrap();
    let mut buf = [0u8; 8];
    let n = table.get(Config::STDIN_FD).unwrap().read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"in");
    assert_eq!(output.as_string(), "out");
}

#[test]
fn fourteen_files_fit() {
    let fs = MemFileSystem::new();
    let mut table = FileTable::new();
    let usable = Config::MAX_OPEN_FILES - Config::RESERVED_DESCRIPTORS;
    for i in 0..usable {
        let fd = table.allocate(file(&fs, "f")).unwrap();
        assert_eq!(fd, Config::RESERVED_DESCRIPTORS + i);
    }
    assert!(!table.has_free_slot());
    let rejected = table.allocate(file(&fs, "g")).unwrap_err();
    assert_eq!(rejected.name(), "g");
}

#[test]
fn lowest_free_slot_is_reused() {
    let fs = MemFileSystem::new();
    let mut table = FileTable::new();
    for _ in 0..4 {
        table.allocate(file(&fs, "f")).unwrap();
    }
    table.release(3).unwrap();
    table.release(4).unwrap();
    assert_eq!(table.allocate(file(&fs, "f")).unwrap(), 3);
    assert_eq!(table.allocate(file(&fs, "f")).unwrap(), 4);
    assert_eq!(table.allocate(file(&fs, "f")).unwrap(), 6);
}

#[test]
fn release_reports_bad_descriptors() {
    let mut table = FileTable::new();
    assert_eq!(table.release(3), Err(FdError::NotOpen(3)));
    assert_eq!(
        table.release(Config::MAX_OPEN_FILES),
        Err(FdError::OutOfRange(Config::MAX_OPEN_FILES))
    );
    assert!(table.get(Config::MAX_OPEN_FILES).is_none());
}

#[test]
fn close_all_empties_the_table() {
    let fs = MemFileSystem::new();
    let (console, _) = Console::capture("");
    let mut table = FileTable::with_console(&console);
    table.allocate(file(&fs, "f")).unwrap();
    table.close_all();
    assert_eq!(table.open_count(), 0);
    assert!(table.has_free_slot());
}
