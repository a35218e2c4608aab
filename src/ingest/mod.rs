//! Inputs produced outside the pipeline: diff reports and manifests

mod manifest;
mod report;

pub use manifest::Manifest;
pub use report::{
    parse_commit_rows, parse_diff_rows, read_commit_rows, read_diff_rows, COMMIT_COLUMNS,
    PROJECT_COLUMNS,
};
