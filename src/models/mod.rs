pub mod diagnosis;
pub mod enums;
pub mod patient;

pub use diagnosis::*;
pub use enums::*;
pub use patient::*;
