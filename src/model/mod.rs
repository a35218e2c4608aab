mod row;
mod target;
mod view;

pub use row::{
    Analyzed, AnalyzedCommitRow, AnalyzedDiffRow, Classification, CommitRow, DiffRow, DiffStatus,
    ProjectRow,
};
pub use target::{DiffTarget, MappedDiffTarget, RepoBranch};
pub use view::{changes_over_time, top_committers, ChangesOverTime, TopCommitter};
