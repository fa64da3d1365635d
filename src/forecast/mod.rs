pub mod aggregator;
pub mod rolling;

pub use aggregator::*;
pub use rolling::*;
