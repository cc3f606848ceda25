//! Wire types served by the process monitor's `/basic` and `/status` endpoints.

pub mod basic;
pub mod status;

pub use basic::BasicInfo;
pub use status::{
    DescriptorSnapshot, OpenFiles, ProcessSnapshot, RejectedEntry, Reported, StatusEntries,
    StatusResponse,
};
