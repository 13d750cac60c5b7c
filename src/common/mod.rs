mod names;
mod result;

pub mod utf8;

pub use names::*;
pub use result::*;
