//! Wrapped text-generation backend

mod provider;

pub use provider::Backend;

#[cfg(test)]
pub use provider::fake::{CountingBackend, FailingBackend};
#[cfg(test)]
pub use provider::MockBackend;
