use std::sync::Arc;
use std::thread;
use std::time::Duration;

use kernel::{ExitStatus, JoinError, KillReason, ProcessRegistry, ProcessState};
use types::Config;

#[test]
fn pids_start_at_the_root_and_grow() {
    let registry = ProcessRegistry::new();
    let root = registry.register(None, "init");
    let child = registry.register(Some(root), "sh");
    assert_eq!(root, Config::ROOT_PID);
    assert!(child > root);
    assert_eq!(registry.parent_of(child), Some(root));
    assert_eq!(registry.children_of(root), vec![child]);
    assert_eq!(registry.state_of(child), Some(ProcessState::Created));
    registry.mark_running(child);
    assert_eq!(registry.state_of(child), Some(ProcessState::Running));
    assert_eq!(registry.live_count(), 2);
}

#[test]
fn join_checks_the_relationship() {
    let registry = ProcessRegistry::new();
    let root = registry.register(None, "init");
    let a = registry.register(Some(root), "a");
    let b = registry.register(Some(a), "b");

    assert_eq!(registry.join(root, root), Err(JoinError::SelfJoin));
    assert_eq!(registry.join(root, b), Err(JoinError::NotAChild(b)));
    assert_eq!(registry.join(root, 99), Err(JoinError::NotAChild(99)));
}

#[test]
fn join_waits_for_the_child() {
    let registry = Arc::new(ProcessRegistry::new());
    let root = registry.register(None, "init");
    let child = registry.register(Some(root), "worker");

    let exiting = Arc::clone(&registry);
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        exiting.exit(child, ExitStatus::Exited(5));
    });
    assert_eq!(registry.join(root, child), Ok(ExitStatus::Exited(5)));
    handle.join().unwrap();

    assert!(!registry.contains(child));
    assert!(registry.children_of(root).is_empty());
    assert_eq!(registry.join(root, child), Err(JoinError::NotAChild(child)));
}

#[test]
fn join_after_exit_returns_at_once() {
    let registry = ProcessRegistry::new();
    let root = registry.register(None, "init");
    let child = registry.register(Some(root), "quick");
    let killed = ExitStatus::Killed(KillReason::IllegalHalt);
    registry.exit(child, killed);
    assert_eq!(registry.status_of(child), Some(killed));
    assert_eq!(registry.join(root, child), Ok(killed));
}

#[test]
fn exiting_parent_orphans_its_children() {
    let registry = ProcessRegistry::new();
    let root = registry.register(None, "init");
    let parent = registry.register(Some(root), "parent");
    let running = registry.register(Some(parent), "running");
    let finished = registry.register(Some(parent), "finished");

    registry.exit(finished, ExitStatus::Exited(0));
    registry.exit(parent, ExitStatus::Exited(1));

    // Nobody can join `finished` any more, so it is gone already.
    assert!(!registry.contains(finished));
    assert_eq!(registry.parent_of(running), None);
    // The parent itself waits for its own parent.
    assert_eq!(registry.status_of(parent), Some(ExitStatus::Exited(1)));

    registry.exit(running, ExitStatus::Exited(2));
    assert!(!registry.contains(running));
    assert_eq!(registry.join(root, parent), Ok(ExitStatus::Exited(1)));
}

#[test]
fn root_status_is_kept_for_wait() {
    let registry = ProcessRegistry::new();
    let root = registry.register(None, "init");
    registry.exit(root, ExitStatus::Exited(3));
    assert_eq!(registry.state_of(root), Some(ProcessState::Exited));
    assert_eq!(registry.wait(root), Some(ExitStatus::Exited(3)));
    assert!(!registry.contains(root));
    assert_eq!(registry.wait(root), None);
}

#[test]
fn exit_is_published_once() {
    let registry = ProcessRegistry::new();
    let root = registry.register(None, "init");
    let child = registry.register(Some(root), "c");
    registry.exit(child, ExitStatus::Exited(1));
    registry.exit(child, ExitStatus::Exited(2));
    assert_eq!(registry.join(root, child), Ok(ExitStatus::Exited(1)));
}

#[test]
fn unregister_forgets_a_process() {
    let registry = ProcessRegistry::new();
    let root = registry.register(None, "init");
    let child = registry.register(Some(root), "never-started");
    registry.unregister(child);
    assert!(!registry.contains(child));
    assert!(registry.children_of(root).is_empty());
}
