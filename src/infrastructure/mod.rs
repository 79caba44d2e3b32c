//! Infrastructure layer - Cache, embedding and logging implementations

pub mod cache;
pub mod embedding;
pub mod logging;
pub mod services;
