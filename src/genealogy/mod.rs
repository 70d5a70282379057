pub mod host;
pub mod mass;
pub mod progenitors;
pub mod tree;

pub use host::*;
pub use mass::*;
pub use progenitors::*;
pub use tree::*;
