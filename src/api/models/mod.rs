pub mod compile;
pub mod system;

pub use compile::*;
pub use system::*;
