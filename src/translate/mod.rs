pub mod interface;
pub mod loader;
pub mod marian;

pub use interface::*;
pub use loader::*;
