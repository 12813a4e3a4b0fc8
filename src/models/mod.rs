mod article;
mod digest;
mod embedding;
mod feedback;
mod preference;
mod profile;
mod scoring;

pub use article::{Article, NewArticle, UserArticle};
pub use digest::{Digest, DigestTier};
pub use embedding::{Embedding, RefType};
pub use feedback::{FeedbackAction, FeedbackSample, SourceFeedbackCounts, SourceTrust};
pub use preference::LearnedPreference;
pub use profile::{Exclusion, Interest, NewExclusion, NewInterest, NewSource, Source};
pub use scoring::{ScoreOrigin, ScoringResult};
