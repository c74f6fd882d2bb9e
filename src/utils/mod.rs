pub mod cert_utils;
pub mod errors;
pub mod output;

pub use cert_utils::*;
pub use errors::*;
pub use output::*;
