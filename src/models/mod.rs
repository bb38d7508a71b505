//! Data passed between the host and the blame engine.
//!
//! - `blame`: BlameLine, one authorship record per source line
//! - `input`: InputFile descriptors and the BlameInput batch contract

pub mod blame;
pub mod input;

pub use blame::*;
pub use input::*;
