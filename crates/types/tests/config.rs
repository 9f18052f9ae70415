use types::{Config, SYSCALL_EXEC, SYSCALL_UNLINK, syscall_name};

#[test]
fn page_constants_agree() {
    assert_eq!(1usize << Config::PAGE_SHIFT, Config::PAGE_SIZE);
    assert_eq!(Config::PAGE_OFFSET_MASK as usize, Config::PAGE_SIZE - 1);
}

#[test]
fn console_descriptors_are_reserved() {
    assert!(Config::STDIN_FD < Config::RESERVED_DESCRIPTORS);
    assert!(Config::STDOUT_FD < Config::RESERVED_DESCRIPTORS);
    assert!(Config::RESERVED_DESCRIPTORS < Config::MAX_OPEN_FILES);
}

#[test]
fn syscall_names() {
    assert_eq!(syscall_name(SYSCALL_EXEC), "exec");
    assert_eq!(syscall_name(SYSCALL_UNLINK), "unlink");
    assert_eq!(syscall_name(42), "unknown");
}
