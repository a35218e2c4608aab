//! Project classification over three manifests
//!
//! A project listed in the common manifest is `Global`. A project listed
//! only in the upstream or downstream manifest is `DifferentialSpecific`.
//! Anything else is `Empty`.

use rustc_hash::FxHashMap;

use crate::ingest::Manifest;
use crate::model::{Analyzed, Classification, ProjectRow};
use crate::util::set;

/// Name -> classification lookup built once per run
#[derive(Debug, Clone, Default)]
pub struct ProjectClassifier {
    map: FxHashMap<String, Classification>,
}

impl ProjectClassifier {
    pub fn new<S: AsRef<str>>(common: &[S], upstream: &[S], downstream: &[S]) -> Self {
        // Names in the common manifest never reach `distinct`
        let distinct = set::subtract(&set::union(downstream, upstream), common);

        let mut map = FxHashMap::default();
        for name in common {
            map.insert(name.as_ref().to_string(), Classification::Global);
        }
        for name in distinct {
            map.insert(name, Classification::DifferentialSpecific);
        }

        Self { map }
    }

    pub fn from_manifests(common: &Manifest, upstream: &Manifest, downstream: &Manifest) -> Self {
        Self::new(common.project_names(), upstream.project_names(), downstream.project_names())
    }

    /// Classification of `name`, `Empty` when no manifest lists it
    pub fn classify(&self, name: &str) -> Classification {
        self.classify_or(name, Classification::Empty)
    }

    pub fn classify_or(&self, name: &str, default: Classification) -> Classification {
        self.map.get(name).copied().unwrap_or(default)
    }

    /// Tag every row with the classification of its project
    pub fn analyze<R: ProjectRow>(&self, rows: Vec<R>) -> Vec<Analyzed<R>> {
        rows.into_iter()
            .map(|row| {
                let classification = self.classify(row.project_name());
                Analyzed::new(row, classification)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
