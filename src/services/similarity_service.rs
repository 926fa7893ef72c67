use crate::error::{Error, Result};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use std::collections::HashSet;
use uuid::Uuid;

/// Ranked duplicate suggestion. Similarity is always within [0, 1]; results
/// are suggestions for a human to confirm, never a merge trigger.
#[derive(Debug, Clone, Serialize)]
pub struct SimilarCandidate {
    pub candidate_id: Uuid,
    pub similarity: f64,
    pub normalized_prompt: String,
}

#[derive(FromRow)]
struct CandidateRow {
    id: Uuid,
    prompt: Option<String>,
}

/// Lexical duplicate detection over draft prompts: normalization plus
/// character-trigram Jaccard overlap. Same-workspace only, retired records
/// and the question itself excluded.
#[derive(Clone)]
pub struct SimilarityService {
    pool: PgPool,
}

impl SimilarityService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_similar(
        &self,
        canonical_id: Uuid,
        threshold: f64,
        limit: usize,
    ) -> Result<Vec<SimilarCandidate>> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(Error::BadRequest(
                "Similarity threshold must be within [0, 1]".to_string(),
            ));
        }

        let target = sqlx::query_as::<_, CandidateRow>(
            r#"
            SELECT cq.id AS id, d.content->>'prompt' AS prompt
            FROM canonical_questions cq
            LEFT JOIN drafts d ON d.canonical_question_id = cq.id
            WHERE cq.id = $1 AND cq.retired_at IS NULL
            "#,
        )
        .bind(canonical_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(target) = target else {
            return Err(Error::NotFound(
                "Canonical question not found or merged away".to_string(),
            ));
        };

        let target_prompt = normalize_prompt(target.prompt.as_deref().unwrap_or(""));
        // Nothing to compare against yet: no suggestions, not an error.
        if target_prompt.is_empty() {
            return Ok(Vec::new());
        }
        let target_trigrams = trigrams(&target_prompt);

        let workspace_id = sqlx::query_scalar::<_, Uuid>(
            r#"SELECT workspace_id FROM canonical_questions WHERE id = $1"#,
        )
        .bind(canonical_id)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, CandidateRow>(
            r#"
            SELECT cq.id AS id, d.content->>'prompt' AS prompt
            FROM canonical_questions cq
            JOIN drafts d ON d.canonical_question_id = cq.id
            WHERE cq.workspace_id = $1 AND cq.retired_at IS NULL AND cq.id <> $2
            "#,
        )
        .bind(workspace_id)
        .bind(canonical_id)
        .fetch_all(&self.pool)
        .await?;

        let mut candidates: Vec<SimilarCandidate> = rows
            .into_iter()
            .filter_map(|row| {
                let normalized = normalize_prompt(row.prompt.as_deref().unwrap_or(""));
                if normalized.is_empty() {
                    return None;
                }
                let score = jaccard(&target_trigrams, &trigrams(&normalized));
                if score >= threshold {
                    Some(SimilarCandidate {
                        candidate_id: row.id,
                        similarity: score,
                        normalized_prompt: normalized,
                    })
                } else {
                    None
                }
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        candidates.truncate(limit);
        Ok(candidates)
    }
}

/// Lowercases, folds every non-alphanumeric run into a single space.
pub fn normalize_prompt(raw: &str) -> String {
    let mut mapped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_alphanumeric() {
            mapped.extend(c.to_lowercase());
        } else {
            mapped.push(' ');
        }
    }
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Character trigrams over the padded string, pg_trgm style.
fn trigrams(normalized: &str) -> HashSet<String> {
    let mut set = HashSet::new();
    if normalized.is_empty() {
        return set;
    }
    let padded: Vec<char> = format!("  {} ", normalized).chars().collect();
    for window in padded.windows(3) {
        set.insert(window.iter().collect());
    }
    set
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_folds_case_and_punctuation() {
        assert_eq!(
            normalize_prompt("What is the  POWER of:  x^2?"),
            "what is the power of x 2"
        );
        assert_eq!(normalize_prompt("  ...  "), "");
    }

    #[test]
    fn identical_prompts_score_one() {
        let a = trigrams(&normalize_prompt("Define a monotonic function"));
        let b = trigrams(&normalize_prompt("define a MONOTONIC function!"));
        assert_eq!(jaccard(&a, &b), 1.0);
    }

    #[test]
    fn unrelated_prompts_score_low() {
        let a = trigrams(&normalize_prompt("integrate x squared over zero to one"));
        let b = trigrams(&normalize_prompt("name the capital of France"));
        assert!(jaccard(&a, &b) < 0.1);
    }

    #[test]
    fn scores_stay_within_unit_interval() {
        let samples = [
            ("the quick brown fox", "the quick brown fox jumps"),
            ("a", "b"),
            ("", "anything"),
            ("same", "same"),
        ];
        for (x, y) in samples {
            let s = jaccard(&trigrams(&normalize_prompt(x)), &trigrams(&normalize_prompt(y)));
            assert!((0.0..=1.0).contains(&s), "score {} out of range", s);
        }
    }

    #[test]
    fn closer_prompt_ranks_higher() {
        let target = trigrams(&normalize_prompt("solve the linear system 2x + y = 5"));
        let near = jaccard(
            &target,
            &trigrams(&normalize_prompt("solve the linear system 2x + y = 7")),
        );
        let far = jaccard(
            &target,
            &trigrams(&normalize_prompt("sketch the graph of a parabola")),
        );
        assert!(near > far);
    }
}
