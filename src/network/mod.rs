pub mod client;
pub mod protocol;
pub mod server;
pub mod transport;

pub use client::{ClientSession, ClientState};
pub use protocol::{FrameBuffer, MessageType, NetworkMessage};
pub use server::{ServerSession, ServerState};
pub use transport::{DEFAULT_PORT, DEFAULT_TIMEOUT_SECONDS};

use std::sync::{Mutex, MutexGuard};

/// Session state is plain data, so a panic elsewhere never leaves it torn.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
