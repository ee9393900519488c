// Message bus transports
//
// - InMemoryBus: process-local publish / subscribe, used by tests and by
//   applications embedding producer and runner in one process
// - LineBus: JSON-lines envelopes over an async reader / writer pair

pub mod line;
pub mod memory;

pub use line::LineBus;
pub use memory::InMemoryBus;
