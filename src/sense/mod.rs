//! Parallel imaging building blocks
//!
//! - `maps`: coil sensitivity encoding operator
//! - `pattern`: sampling pattern estimation and statistics
//! - `scaling`: data scale estimate used to normalize k-space

pub mod maps;
pub mod pattern;
pub mod scaling;

pub use maps::*;
pub use pattern::*;
pub use scaling::*;
