// core.rs splits chain responsibilities into submodules: registry state,
// blocks and chain management, and block-level validation.
pub mod chain;
pub mod state;
pub mod validation;

pub use chain::*;
pub use state::*;
pub use validation::*;
