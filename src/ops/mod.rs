//! high-level operations on a store

mod push;
mod verify;

pub use push::{push, PushOptions, PushResult};
pub use verify::{verify, VerifyReport};
