#![doc = include_str!("../README.md")]

#[cfg(feature = "base36")]
mod base36;
mod error;
mod outcome;
mod permutation;
mod range;
mod report;
#[cfg(feature = "lock")]
mod shared;

#[cfg(feature = "base36")]
pub use crate::base36::*;
pub use crate::error::*;
pub use crate::outcome::*;
pub use crate::permutation::*;
pub use crate::range::*;
pub use crate::report::*;
#[cfg(feature = "lock")]
pub use crate::shared::*;
