pub mod market;
pub mod numeric;
pub mod signal;

pub use market::*;
pub use numeric::{lenient_fallback_count, parse_lenient};
pub use signal::*;
