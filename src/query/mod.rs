pub mod decode;
pub mod index;
pub mod raw;

pub use decode::{Decoded, decode_decisions};
pub use index::{ContextResult, DecisionIndex, FileLink, QueryOptions, RefLink, glob_to_like};
pub use raw::{RawResult, RawRow, RawValue, WRITE_KEYWORDS, check_read_only, execute_raw};
