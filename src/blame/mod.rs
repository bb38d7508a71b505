pub mod driver;
pub mod sink;

pub use driver::BlameCommand;
pub use sink::{BlameOutput, CollectingOutput, SinkAdapter};
