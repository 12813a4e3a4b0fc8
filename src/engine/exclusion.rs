use crate::engine::cosine_similarity;
use crate::error::{AppError, Result};

/// Hard veto: the first active exclusion whose embedding is closer to
/// the article than the threshold wins, and the article never reaches
/// the model. Returns the matching category.
pub fn veto_match<'a>(
    article_vector: &[f32],
    exclusions: &'a [(String, Vec<f32>)],
    threshold: f64,
) -> Option<&'a str> {
    for (category, vector) in exclusions {
        let similarity = cosine_similarity(article_vector, vector) as f64;
        if similarity > threshold {
            return Some(category);
        }
    }
    None
}

/// Soft-limit precondition checked before a new exclusion is accepted.
pub fn check_exclusion_capacity(current: usize, cap: usize) -> Result<()> {
    if current >= cap {
        return Err(AppError::Validation(format!(
            "exclusion limit reached ({} of {})",
            current, cap
        )));
    }
    Ok(())
}
