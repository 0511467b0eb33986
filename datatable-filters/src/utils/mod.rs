//! Generic building blocks used by the column and state layers.

pub mod debounce;
pub mod memo;
pub mod uniq;
pub mod value;
