//! Rank slicing of MetaPhlAn-style abundance profiles, plus the fixed MetaPhlAn2, HUMAnN2
//! and GraPhlAn pipelines that produce and consume them.

pub mod error;
pub mod label;
pub mod naming;
pub mod pipeline;
pub mod rank;
pub mod reads;
pub mod slice;
pub mod tools;

pub use error::{Result, TaxsliceError};
pub use rank::Rank;
pub use slice::{slice_file, slice_lines, slice_profile, SliceSummary};
