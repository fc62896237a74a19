mod interface;
mod mono_clock;

pub use interface::*;
pub use mono_clock::*;
