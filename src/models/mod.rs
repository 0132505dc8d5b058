pub mod enums;
pub mod claim;
pub mod quality;

pub use enums::*;
pub use claim::*;
pub use quality::*;
