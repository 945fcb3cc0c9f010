pub mod drug;
pub mod enums;
pub mod patient;
pub mod prescription;
pub mod reminder;

pub use drug::*;
pub use patient::*;
pub use prescription::*;
pub use reminder::*;
