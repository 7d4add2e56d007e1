//! Request handlers.

pub mod animation;
pub mod health;
pub mod words;

pub use animation::*;
pub use health::*;
pub use words::*;
