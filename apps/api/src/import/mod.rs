//! Getting data into the master record: the deterministic LinkedIn parser,
//! provider-backed extraction and enhancement, uploaded-file decoding, and
//! the merge engine every import goes through.

pub mod dates;
pub mod extract;
pub mod files;
pub mod handlers;
pub mod linkedin;
pub mod merge;
pub mod prompts;
