pub mod assertions;
pub mod setup;

// Re-export main utilities for use by test files
#[allow(unused_imports)]
pub use assertions::{EventAssertion, ReceivedEvent};
#[allow(unused_imports)]
pub use setup::{AppStateBuilder, HubSetup, HubSetupBuilder};
