//! Emotion-profile risk scoring.
//!
//! [`risk::assess_risk`] turns an [`models::EmotionProfile`] into a
//! [`models::RiskAssessment`]. The other modules read upstream analysis
//! documents, render reports and keep a history of them on disk.

pub mod error;
pub mod ingest;
pub mod models;
pub mod report;
pub mod risk;
pub mod store;

pub use error::{AssessError, StoreError};
pub use models::{EmotionProfile, RiskAssessment};
pub use risk::{assess, assess_risk, RiskRules};
