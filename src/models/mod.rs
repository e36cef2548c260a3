pub mod item;
pub mod metadata;
pub mod thumbnail;

pub use item::*;
pub use metadata::*;
pub use thumbnail::*;
