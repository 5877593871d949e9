pub mod macros;
pub mod schedule;
pub mod time;

pub use schedule::*;
pub use time::{
    format_iso8601, from_datetime_local, local_offset, parse_iso8601, to_datetime_local,
    TimeParseError, DATETIME_LOCAL_FORMAT,
};
