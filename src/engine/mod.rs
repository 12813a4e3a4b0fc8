mod assembler;
mod embedding_store;
mod exclusion;
mod learner;
mod pipeline;
mod scorer;
mod source_trust;

pub use assembler::{DigestAssembler, TierPolicy};
pub use embedding_store::{cosine_similarity, truncate_to_char_boundary, EmbeddingStore};
pub use exclusion::{check_exclusion_capacity, veto_match};
pub use learner::{LearnerConfig, PreferenceLearner};
pub use pipeline::Pipeline;
pub use scorer::{RelevanceScorer, ScoringContext};
pub use source_trust::{SourceTrustEngine, TrustPolicy};
