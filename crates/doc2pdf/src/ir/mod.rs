//! Intermediate representation shared by every native parser and the layout engine.

mod document;
mod elements;
mod style;

pub use document::*;
pub use elements::*;
pub use style::*;
