//! Cache infrastructure - Index, eviction and request coalescing implementations

mod eviction;
mod exact_index;
mod semantic_index;
mod single_flight;

pub use eviction::{EvictionManager, SweeperHandle};
pub use exact_index::ExactMatchIndex;
pub use semantic_index::LinearSemanticIndex;
pub use single_flight::{FlightRole, SingleFlight};
