pub mod cheapest;
pub mod guard;
pub mod merger;

pub use cheapest::*;
pub use guard::*;
pub use merger::*;
