use crate::condition::Condition;

/// Receives one callback per condition evaluated by
/// [`ConditionSet::compare_observed`](crate::ConditionSet::compare_observed).
///
/// Callbacks arrive in index order and stop after the first unsatisfied
/// condition. Conditions with
/// [`Predicate::Unspecified`](crate::Predicate::Unspecified) are reported
/// too, always as satisfied, even though no comparison takes place for them.
pub trait EvalObserver {
    fn evaluated(&mut self, index: usize, condition: &Condition, value: u16, satisfied: bool);
}

/// Observer that ignores every evaluation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl EvalObserver for NoopObserver {
    #[inline]
    fn evaluated(&mut self, _index: usize, _condition: &Condition, _value: u16, _satisfied: bool) {}
}

/// Observer that records `(index, satisfied)` for each evaluation.
#[derive(Debug, Default, Clone)]
pub struct RecordingObserver {
    pub evaluations: Vec<(usize, bool)>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indices that were evaluated, in order.
    pub fn indices(&self) -> Vec<usize> {
        self.evaluations.iter().map(|(index, _)| *index).collect()
    }
}

impl EvalObserver for RecordingObserver {
    fn evaluated(&mut self, index: usize, _condition: &Condition, _value: u16, satisfied: bool) {
        self.evaluations.push((index, satisfied));
    }
}
