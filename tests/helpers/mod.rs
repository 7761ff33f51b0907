pub mod builders;
pub mod policies;
pub mod sink;

pub use builders::{CountingGate, GateManagerBuilder};
pub use policies::TestPolicies;
pub use sink::RecordingSink;
