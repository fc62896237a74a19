mod atomic;
mod interface;
mod lock;
mod mutex;
mod sequence;
mod state;

pub use atomic::*;
pub use interface::*;
pub use lock::*;
pub(crate) use mutex::*;
pub use sequence::*;
