use crate::model::Complexity;

pub struct ComplexityScorer;

impl ComplexityScorer {
    pub fn score(ingredient_count: usize, step_count: usize) -> Complexity {
        if ingredient_count >= 12 || step_count >= 8 {
            Complexity::Complex
        } else if ingredient_count <= 5 && step_count <= 5 {
            Complexity::Easy
        } else {
            Complexity::Medium
        }
    }
}
