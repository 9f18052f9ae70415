#![no_std]

pub mod config;
pub use config::{Config, Pid};

pub mod syscall;
pub use syscall::*;

pub mod abi;
