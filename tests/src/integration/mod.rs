//! Cross-subsystem integration flows.

pub mod end_to_end;
pub mod grading_consensus;
