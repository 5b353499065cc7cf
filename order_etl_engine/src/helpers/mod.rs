mod timestamps;

pub use timestamps::{parse_timestamp, TimestampError};
