mod buffer_frame;
mod buffer_pool;

pub use buffer_frame::*;
pub use buffer_pool::*;
