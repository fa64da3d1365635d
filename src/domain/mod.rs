pub mod blocks;
pub mod forecast;
pub mod schedule;
pub mod types;

pub use blocks::*;
pub use forecast::*;
pub use schedule::*;
pub use types::*;
