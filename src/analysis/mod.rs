// src/analysis/mod.rs

pub mod classifier;
pub mod detector;
pub mod types;

// Re-export commonly used items
pub use classifier::{Classifier, HeuristicClassifier, SegmentFeatures};
pub use detector::{dynamic_threshold, smooth, AnomalyDetector};
pub use types::{AnomalyCategory, AnomalySegment};
