use rand::Rng;
use rand::seq::SliceRandom;

use quiz_core::model::Question;

/// Selection result for a quiz start.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizPlan {
    pub questions: Vec<Question>,
    /// Size of the pool the questions were drawn from.
    pub pool_size: usize,
    /// `true` when a random subset was drawn instead of the full pool.
    pub sampled: bool,
}

impl QuizPlan {
    #[must_use]
    pub fn total(&self) -> usize {
        self.questions.len()
    }
}

/// Picks the questions for one attempt.
///
/// - `limit` below the pool size draws a uniform sample without replacement
///   (shuffle, then truncate).
/// - Anything else keeps the full pool in its original order.
pub fn sample_questions<R: Rng + ?Sized>(
    pool: &[Question],
    limit: Option<usize>,
    rng: &mut R,
) -> QuizPlan {
    let pool_size = pool.len();
    let mut questions = pool.to_vec();

    let sampled = match limit {
        Some(limit) if limit < pool_size => {
            questions.as_mut_slice().shuffle(rng);
            questions.truncate(limit);
            true
        }
        _ => false,
    };

    QuizPlan {
        questions,
        pool_size,
        sampled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn pool(n: usize) -> Vec<Question> {
        (0..n)
            .map(|i| {
                Question::new(format!("Q{i}"), vec!["a".into(), "b".into()], 0, None).unwrap()
            })
            .collect()
    }

    #[test]
    fn full_length_keeps_original_order() {
        let pool = pool(5);
        let mut rng = StdRng::seed_from_u64(7);

        for limit in [None, Some(5), Some(50)] {
            let plan = sample_questions(&pool, limit, &mut rng);
            assert_eq!(plan.questions, pool);
            assert!(!plan.sampled);
            assert_eq!(plan.pool_size, 5);
        }
    }

    #[test]
    fn limited_quiz_draws_distinct_pool_members() {
        let pool = pool(30);
        let mut rng = StdRng::seed_from_u64(42);

        let plan = sample_questions(&pool, Some(10), &mut rng);

        assert_eq!(plan.total(), 10);
        assert!(plan.sampled);
        let mut prompts: Vec<&str> = plan.questions.iter().map(Question::prompt).collect();
        assert!(plan.questions.iter().all(|q| pool.contains(q)));
        prompts.sort_unstable();
        prompts.dedup();
        assert_eq!(prompts.len(), 10);
    }

    #[test]
    fn same_seed_draws_same_sample() {
        let pool = pool(20);
        let a = sample_questions(&pool, Some(5), &mut StdRng::seed_from_u64(3));
        let b = sample_questions(&pool, Some(5), &mut StdRng::seed_from_u64(3));
        assert_eq!(a, b);
    }
}
