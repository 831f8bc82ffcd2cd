pub mod cli;
pub mod mig;
pub mod node;

pub use cli::*;
pub use mig::*;
pub use node::*;
