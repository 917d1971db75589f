pub use convert::{TryAsMut, TryAsRef};
pub use errors::Errors;

mod convert;
mod errors;
