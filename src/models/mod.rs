pub mod paper;
pub mod notes;
pub mod meta;

pub use paper::*;
pub use notes::*;
pub use meta::*;
