pub mod complementary;

pub use complementary::{RollFilter, RollFilterState, DEFAULT_ALPHA};
