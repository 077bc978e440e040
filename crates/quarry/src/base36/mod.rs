mod codec;
mod error;
mod fullname;

pub use codec::*;
pub use error::*;
pub use fullname::*;
