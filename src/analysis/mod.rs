mod classifier;

pub use classifier::ProjectClassifier;
