use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;

use super::dialogue::DialogueState;
use super::domain::{
    Decision, DecisionId, DecisionStatus, FinancialBaseline, Payload, Recommendation,
    RecommendationFeedback, RecommendationId, SessionId, UserId,
};
use super::repository::{DecisionRepository, RepositoryError};

#[derive(Default)]
struct Tables {
    decisions: HashMap<DecisionId, Decision>,
    recommendations: HashMap<RecommendationId, Recommendation>,
    recommendation_by_decision: HashMap<DecisionId, RecommendationId>,
    feedback: Vec<RecommendationFeedback>,
    dialogues: HashMap<SessionId, DialogueState>,
    baselines: HashMap<UserId, FinancialBaseline>,
}

/// Process-local store used by the CLI, the demo server, and tests.
#[derive(Default, Clone)]
pub struct InMemoryDecisionRepository {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryDecisionRepository {
    pub fn feedback(&self) -> Vec<RecommendationFeedback> {
        self.tables
            .lock()
            .expect("repository mutex poisoned")
            .feedback
            .clone()
    }

    pub fn decisions(&self) -> Vec<Decision> {
        let guard = self.tables.lock().expect("repository mutex poisoned");
        let mut decisions: Vec<Decision> = guard.decisions.values().cloned().collect();
        decisions.sort_by(|a, b| a.id.cmp(&b.id));
        decisions
    }

    pub fn recommendation_count(&self) -> usize {
        self.tables
            .lock()
            .expect("repository mutex poisoned")
            .recommendations
            .len()
    }
}

impl DecisionRepository for InMemoryDecisionRepository {
    fn create_decision(&self, decision: Decision) -> Result<Decision, RepositoryError> {
        let mut guard = self.tables.lock().expect("repository mutex poisoned");
        if guard.decisions.contains_key(&decision.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.decisions.insert(decision.id.clone(), decision.clone());
        Ok(decision)
    }

    fn update_decision_status(
        &self,
        id: &DecisionId,
        status: DecisionStatus,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.tables.lock().expect("repository mutex poisoned");
        let decision = guard
            .decisions
            .get_mut(id)
            .ok_or(RepositoryError::NotFound)?;
        decision.status = status;
        decision.updated_at = Utc::now();
        Ok(())
    }

    fn fetch_decision(&self, id: &DecisionId) -> Result<Option<Decision>, RepositoryError> {
        let guard = self.tables.lock().expect("repository mutex poisoned");
        Ok(guard.decisions.get(id).cloned())
    }

    fn complete_decision(
        &self,
        recommendation: Recommendation,
        inputs: Payload,
    ) -> Result<Recommendation, RepositoryError> {
        let mut guard = self.tables.lock().expect("repository mutex poisoned");
        let tables = &mut *guard;
        if tables
            .recommendation_by_decision
            .contains_key(&recommendation.decision_id)
            || tables.recommendations.contains_key(&recommendation.id)
        {
            return Err(RepositoryError::Conflict);
        }
        let decision = tables
            .decisions
            .get_mut(&recommendation.decision_id)
            .ok_or(RepositoryError::NotFound)?;
        decision.inputs = inputs;
        decision.status = DecisionStatus::Processed;
        decision.updated_at = Utc::now();

        tables.recommendation_by_decision.insert(
            recommendation.decision_id.clone(),
            recommendation.id.clone(),
        );
        tables
            .recommendations
            .insert(recommendation.id.clone(), recommendation.clone());
        Ok(recommendation)
    }

    fn fetch_recommendation(
        &self,
        id: &RecommendationId,
    ) -> Result<Option<Recommendation>, RepositoryError> {
        let guard = self.tables.lock().expect("repository mutex poisoned");
        Ok(guard.recommendations.get(id).cloned())
    }

    fn recommendation_for(
        &self,
        decision_id: &DecisionId,
    ) -> Result<Option<Recommendation>, RepositoryError> {
        let guard = self.tables.lock().expect("repository mutex poisoned");
        Ok(guard
            .recommendation_by_decision
            .get(decision_id)
            .and_then(|id| guard.recommendations.get(id))
            .cloned())
    }

    fn insert_feedback(&self, feedback: RecommendationFeedback) -> Result<(), RepositoryError> {
        let mut guard = self.tables.lock().expect("repository mutex poisoned");
        if !guard
            .recommendations
            .contains_key(&feedback.recommendation_id)
        {
            return Err(RepositoryError::NotFound);
        }
        guard.feedback.push(feedback);
        Ok(())
    }

    fn load_dialogue(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<DialogueState>, RepositoryError> {
        let guard = self.tables.lock().expect("repository mutex poisoned");
        Ok(guard.dialogues.get(session_id).cloned())
    }

    fn save_dialogue(
        &self,
        mut state: DialogueState,
        expected_version: u64,
    ) -> Result<DialogueState, RepositoryError> {
        let mut guard = self.tables.lock().expect("repository mutex poisoned");
        let current = guard
            .dialogues
            .get(&state.session_id)
            .map(|stored| stored.version)
            .unwrap_or(0);
        if current != expected_version {
            return Err(RepositoryError::Conflict);
        }
        state.version = expected_version + 1;
        state.updated_at = Utc::now();
        guard
            .dialogues
            .insert(state.session_id.clone(), state.clone());
        Ok(state)
    }

    fn load_baseline(
        &self,
        user_id: &UserId,
    ) -> Result<Option<FinancialBaseline>, RepositoryError> {
        let guard = self.tables.lock().expect("repository mutex poisoned");
        Ok(guard.baselines.get(user_id).cloned())
    }

    fn save_baseline(
        &self,
        user_id: &UserId,
        baseline: FinancialBaseline,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.tables.lock().expect("repository mutex poisoned");
        guard.baselines.insert(user_id.clone(), baseline);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::advisor::domain::{Intent, SlotValue, Verdict};
    use std::collections::BTreeMap;

    fn decision(id: &str) -> Decision {
        let now = Utc::now();
        Decision {
            id: DecisionId(id.to_string()),
            user_id: UserId("owner".to_string()),
            question: "Can I hire?".to_string(),
            intent: Intent::Hiring,
            inputs: Payload::new(),
            status: DecisionStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn dialogue_saves_require_the_current_version() {
        let repository = InMemoryDecisionRepository::default();
        let state = DialogueState::new(
            SessionId("s-1".to_string()),
            UserId("owner".to_string()),
            Utc::now(),
        );

        let saved = repository
            .save_dialogue(state.clone(), 0)
            .expect("first save");
        assert_eq!(saved.version, 1);

        match repository.save_dialogue(state, 0) {
            Err(RepositoryError::Conflict) => {}
            other => panic!("expected conflict, got {other:?}"),
        }
        let saved = repository.save_dialogue(saved, 1).expect("second save");
        assert_eq!(saved.version, 2);
    }

    #[test]
    fn duplicate_decision_ids_conflict() {
        let repository = InMemoryDecisionRepository::default();
        repository
            .create_decision(decision("dec-1"))
            .expect("created");

        match repository.create_decision(decision("dec-1")) {
            Err(RepositoryError::Conflict) => {}
            other => panic!("expected conflict, got {other:?}"),
        }
        let missing = DecisionId("dec-9".to_string());
        match repository.update_decision_status(&missing, DecisionStatus::Error) {
            Err(RepositoryError::NotFound) => {}
            other => panic!("expected not found, got {other:?}"),
        }
    }

    fn recommendation(id: &str, decision: &str) -> Recommendation {
        Recommendation {
            id: RecommendationId(id.to_string()),
            decision_id: DecisionId(decision.to_string()),
            recommendation: Verdict::Approve,
            reasoning: "Net income covers the payroll.".to_string(),
            actionable_steps: vec!["Post the job listing.".to_string()],
            financial_health_score: 70,
            score_interpretation: "caution".to_string(),
            numeric_breakdown: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn completing_a_decision_attaches_one_recommendation_and_marks_it_processed() {
        let repository = InMemoryDecisionRepository::default();
        repository
            .create_decision(decision("dec-1"))
            .expect("created");
        let inputs = Payload::new().with("monthlyRevenue", SlotValue::Number(1_000.0));

        repository
            .complete_decision(recommendation("rec-1", "dec-1"), inputs.clone())
            .expect("completed");
        let stored = repository
            .fetch_decision(&DecisionId("dec-1".to_string()))
            .expect("fetch")
            .expect("present");
        assert_eq!(stored.status, DecisionStatus::Processed);
        assert_eq!(stored.inputs, inputs);

        match repository.complete_decision(recommendation("rec-2", "dec-1"), Payload::new()) {
            Err(RepositoryError::Conflict) => {}
            other => panic!("expected conflict, got {other:?}"),
        }
        match repository.complete_decision(recommendation("rec-3", "dec-404"), Payload::new()) {
            Err(RepositoryError::NotFound) => {}
            other => panic!("expected not found, got {other:?}"),
        }
        assert_eq!(repository.recommendation_count(), 1);
    }
}
