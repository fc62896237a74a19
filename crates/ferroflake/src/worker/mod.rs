mod worker_id;

pub use worker_id::*;
