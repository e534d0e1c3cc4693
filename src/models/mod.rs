pub mod card;
pub mod collection;
pub mod tier;

pub use card::*;
pub use collection::*;
pub use tier::*;
