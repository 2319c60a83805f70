//! Interpreters supported out of the box.

pub mod irb;
pub mod python3;

pub use irb::Irb;
pub use python3::Python3;
