pub mod codec;
pub mod sink;

pub use codec::{AudioEncoding, TELEPHONY_SAMPLE_RATE};
pub use sink::{RecordingSink, RecordingSummary};
