//! Session launch adapters
//!
//! One adapter per terminal-emulator family. The interactive adapters
//! (SecureCRT, PuTTY, native OpenSSH) build an argument vector from a
//! resolved session and spawn the external program once per device,
//! fire-and-forget. The MTPuTTY adapter instead stages sessions into the
//! persisted MTPuTTY XML database for later manual launch.

pub mod args;
pub mod mtputty;
pub mod spawn;

pub use spawn::spawn_detached;
