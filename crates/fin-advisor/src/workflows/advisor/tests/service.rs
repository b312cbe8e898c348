use super::common::*;
use std::collections::BTreeMap;

use serde_json::json;

use crate::workflows::advisor::dialogue::DialoguePhase;
use crate::workflows::advisor::domain::{DecisionId, DecisionStatus, RecommendationId, UserId};
use crate::workflows::advisor::repository::{DecisionRepository, RepositoryError};
use crate::workflows::advisor::slots::fields;
use crate::workflows::advisor::{AdvisorError, DecisionRequest, EngineReply, HealthBand};

fn hiring_request(payroll: f64) -> DecisionRequest {
    DecisionRequest {
        intent: Some("hiring".to_string()),
        question: "Can I afford to hire a barista?".to_string(),
        payload: BTreeMap::from([
            (fields::MONTHLY_REVENUE.to_string(), json!(150000)),
            (fields::MONTHLY_EXPENSES.to_string(), json!("80,000")),
            (fields::OWNER_WITHDRAWALS.to_string(), json!(10000)),
            (fields::STAFF_PAYROLL.to_string(), json!(payroll)),
            (fields::CURRENT_SAVINGS.to_string(), json!("60k")),
        ]),
    }
}

fn expect_decision(reply: EngineReply) -> crate::workflows::advisor::DecisionResult {
    match reply {
        EngineReply::Decision(result) => result,
        other => panic!("expected decision, got {other:?}"),
    }
}

#[test]
fn decide_returns_approval_and_persists_one_recommendation() {
    let (service, repository) = build_service();

    let result = expect_decision(
        service
            .decide(&owner(), hiring_request(20_000.0))
            .expect("decision"),
    );

    assert_eq!(result.decision_result, "APPROVE");
    assert_eq!(result.decision_status, "success");
    assert_eq!(result.financial_health_score, 69);
    assert_eq!(result.numeric_breakdown["net_income"], 60_000.0);

    let decision = repository
        .fetch_decision(&result.decision_id)
        .expect("fetch succeeds")
        .expect("decision stored");
    assert_eq!(decision.status, DecisionStatus::Processed);
    assert_eq!(decision.user_id, owner());
    assert_eq!(repository.recommendation_count(), 1);
}

#[test]
fn decide_waits_when_payroll_is_too_high() {
    let (service, _) = build_service();

    let result = expect_decision(
        service
            .decide(&owner(), hiring_request(30_000.0))
            .expect("decision"),
    );

    assert_eq!(result.decision_result, "WAIT");
    assert_eq!(result.decision_status, "warning");
    assert!(!result.next_steps.is_empty());
}

#[test]
fn decide_asks_for_the_first_missing_field_without_recording_anything() {
    let (service, repository) = build_service();
    let mut request = hiring_request(20_000.0);
    request.payload.remove(fields::OWNER_WITHDRAWALS);
    request
        .payload
        .insert("favouriteColour".to_string(), json!("teal"));

    match service.decide(&owner(), request).expect("reply") {
        EngineReply::DataNeeded { data_needed } => {
            assert_eq!(data_needed.field, fields::OWNER_WITHDRAWALS);
            assert_eq!(data_needed.kind, "number");
            assert!(data_needed.can_be_zero_or_none);
            assert_eq!(data_needed.intent_context.intent, "hiring");
            assert_eq!(data_needed.intent_context.decision_type, "Hiring Decision");
            assert!(!data_needed
                .intent_context
                .current_payload
                .contains("favouriteColour"));
            assert!(data_needed.validation_error.is_none());
        }
        other => panic!("expected data_needed, got {other:?}"),
    }
    assert!(repository.decisions().is_empty());
}

#[test]
fn decide_reprompts_invalid_values_with_a_reason() {
    let (service, _) = build_service();
    let mut request = hiring_request(20_000.0);
    request
        .payload
        .insert(fields::MONTHLY_EXPENSES.to_string(), json!(0));

    match service.decide(&owner(), request).expect("reply") {
        EngineReply::DataNeeded { data_needed } => {
            assert_eq!(data_needed.field, fields::MONTHLY_EXPENSES);
            assert!(!data_needed.can_be_zero_or_none);
            assert!(data_needed.validation_error.is_some());
            assert!(!data_needed
                .intent_context
                .current_payload
                .contains(fields::MONTHLY_EXPENSES));
        }
        other => panic!("expected data_needed, got {other:?}"),
    }
}

#[test]
fn decide_requests_clarification_for_unknown_questions() {
    let (service, _) = build_service();
    let request = DecisionRequest {
        question: "What's a good name for my cat?".to_string(),
        ..DecisionRequest::default()
    };

    match service.decide(&owner(), request).expect("reply") {
        EngineReply::Clarification { clarification } => {
            assert!(!clarification.suggested_actions.is_empty());
        }
        other => panic!("expected clarification, got {other:?}"),
    }
}

#[test]
fn decide_rejects_empty_requests() {
    let (service, _) = build_service();

    match service.decide(&owner(), DecisionRequest::default()) {
        Err(AdvisorError::InvalidRequest(_)) => {}
        other => panic!("expected invalid request, got {other:?}"),
    }
}

#[test]
fn chat_collects_slots_then_completes() {
    let (service, repository) = build_service();
    let session = session("chat");

    let answers = ["150000", "80000", "10000", "20000", "60000"];
    let mut reply = service
        .handle_turn(&owner(), &session, "Can I afford to hire an assistant?")
        .expect("first prompt");
    for answer in answers {
        match reply {
            EngineReply::DataNeeded { .. } => {}
            other => panic!("expected data_needed before {answer}, got {other:?}"),
        }
        reply = service
            .handle_turn(&owner(), &session, answer)
            .expect("turn accepted");
    }

    let result = expect_decision(reply);
    assert_eq!(result.decision_result, "APPROVE");

    let state = repository
        .load_dialogue(&session)
        .expect("load succeeds")
        .expect("state stored");
    assert_eq!(
        state.phase,
        DialoguePhase::Completed {
            decision_id: result.decision_id.clone()
        }
    );
    assert!(state.flow.is_none());
    assert!(state.last_resolved.is_some());

    let baseline = repository
        .load_baseline(&owner())
        .expect("load succeeds")
        .expect("baseline saved");
    assert_eq!(baseline.monthly_revenue, 150_000.0);
}

#[test]
fn retry_returns_the_same_recommendation() {
    let (service, _) = build_service();
    let session = session("retry");

    service
        .handle_turn(&owner(), &session, "Should I hire staff?")
        .expect("prompt");
    let mut last = None;
    for answer in ["150k", "80k", "10k", "30k", "60k"] {
        last = Some(service.handle_turn(&owner(), &session, answer).expect("turn"));
    }
    let original = expect_decision(last.expect("final reply"));

    let retried = expect_decision(service.retry(&owner(), &session).expect("retry"));

    assert_eq!(retried.decision_result, original.decision_result);
    assert_eq!(retried.explanation, original.explanation);
    assert_eq!(retried.next_steps, original.next_steps);
    assert_eq!(retried.numeric_breakdown, original.numeric_breakdown);
    assert_eq!(
        retried.financial_health_score,
        original.financial_health_score
    );
}

#[test]
fn retry_without_history_is_reported() {
    let (service, _) = build_service();

    match service.retry(&owner(), &session("empty")) {
        Err(AdvisorError::NothingToRetry) => {}
        other => panic!("expected nothing to retry, got {other:?}"),
    }
}

#[test]
fn cancel_mid_dialogue_discards_collected_values() {
    let (service, repository) = build_service();
    let session = session("cancel");

    service
        .handle_turn(&owner(), &session, "Can I hire someone?")
        .expect("prompt");
    service
        .handle_turn(&owner(), &session, "150000")
        .expect("answer");

    match service.cancel(&owner(), &session).expect("cancel") {
        EngineReply::Cancelled { .. } => {}
        other => panic!("expected cancelled, got {other:?}"),
    }
    let state = repository
        .load_dialogue(&session)
        .expect("load succeeds")
        .expect("state stored");
    assert!(state.flow.is_none());

    match service
        .handle_turn(&owner(), &session, "Should I take out a loan?")
        .expect("prompt")
    {
        EngineReply::DataNeeded { data_needed } => {
            assert_eq!(data_needed.intent_context.intent, "loan_management");
            assert!(data_needed.intent_context.current_payload.is_empty());
        }
        other => panic!("expected data_needed, got {other:?}"),
    }
}

#[test]
fn concurrent_turn_on_the_same_session_is_rejected() {
    let (service, repository) = build_scripted_service();
    let session = session("race");

    service
        .handle_turn(&owner(), &session, "Can I hire someone?")
        .expect("prompt");
    repository.race_next_load();

    match service.handle_turn(&owner(), &session, "150000") {
        Err(AdvisorError::ConcurrentTurn) => {}
        other => panic!("expected concurrent turn, got {other:?}"),
    }
    let state = repository
        .load_dialogue(&session)
        .expect("load succeeds")
        .expect("state stored");
    assert!(state.flow.expect("flow kept").payload.is_empty());
}

#[test]
fn sessions_are_private_to_their_owner() {
    let (service, _) = build_service();
    let session = session("private");

    service
        .handle_turn(&owner(), &session, "Can I hire someone?")
        .expect("prompt");

    match service.handle_turn(&UserId("intruder".to_string()), &session, "150000") {
        Err(AdvisorError::NotFound { what: "session" }) => {}
        other => panic!("expected not found, got {other:?}"),
    }
}

#[test]
fn store_failure_is_retried_once_before_succeeding() {
    let (service, repository) = build_scripted_service();
    repository.fail_completions(1);

    let result = expect_decision(
        service
            .decide(&owner(), hiring_request(20_000.0))
            .expect("second attempt succeeds"),
    );

    assert_eq!(repository.completion_attempts(), 2);
    assert_eq!(repository.inner.recommendation_count(), 1);
    let decision = repository
        .fetch_decision(&result.decision_id)
        .expect("fetch")
        .expect("stored");
    assert_eq!(decision.status, DecisionStatus::Processed);
}

#[test]
fn repeated_store_failure_marks_the_decision_as_errored() {
    let (service, repository) = build_scripted_service();
    repository.fail_completions(2);

    match service.decide(&owner(), hiring_request(20_000.0)) {
        Err(error @ AdvisorError::Repository(RepositoryError::Unavailable(_))) => {
            assert_eq!(error.code(), "STORE_UNAVAILABLE");
            assert!(!error.user_message().contains("database offline"));
        }
        other => panic!("expected store failure, got {other:?}"),
    }

    assert_eq!(repository.completion_attempts(), 2);
    assert_eq!(repository.inner.recommendation_count(), 0);
    let decisions = repository.inner.decisions();
    assert_eq!(decisions.len(), 1);
    assert_eq!(decisions[0].status, DecisionStatus::Error);
}

#[test]
fn failed_evaluation_can_be_retried_from_the_session() {
    let (service, repository) = build_scripted_service();
    let session = session("flaky");

    service
        .handle_turn(&owner(), &session, "Should I hire?")
        .expect("prompt");
    for answer in ["150000", "80000", "10000", "20000"] {
        service
            .handle_turn(&owner(), &session, answer)
            .expect("turn");
    }
    repository.fail_completions(2);
    match service.handle_turn(&owner(), &session, "60000") {
        Err(AdvisorError::Repository(RepositoryError::Unavailable(_))) => {}
        other => panic!("expected store failure, got {other:?}"),
    }

    let result = expect_decision(service.retry(&owner(), &session).expect("retry succeeds"));
    assert_eq!(result.decision_result, "APPROVE");
    assert_eq!(repository.inner.recommendation_count(), 1);
    let decisions = repository.inner.decisions();
    assert_eq!(decisions.len(), 1);
    assert_eq!(decisions[0].id, result.decision_id);
    assert_eq!(decisions[0].status, DecisionStatus::Processed);
}

#[test]
fn outage_during_completion_leaves_no_recommendation_and_retry_reuses_the_decision() {
    let (service, repository) = build_scripted_service();
    let session = session("outage");

    service
        .handle_turn(&owner(), &session, "Can I hire a baker?")
        .expect("prompt");
    for answer in ["150000", "80000", "10000", "20000"] {
        service
            .handle_turn(&owner(), &session, answer)
            .expect("turn");
    }
    repository.fail_completions(2);
    repository.fail_status_updates(1);

    match service.handle_turn(&owner(), &session, "60000") {
        Err(error @ AdvisorError::Repository(RepositoryError::Unavailable(_))) => {
            assert_eq!(error.code(), "STORE_UNAVAILABLE");
        }
        other => panic!("expected store failure, got {other:?}"),
    }
    assert_eq!(repository.inner.recommendation_count(), 0);
    let stranded = repository.inner.decisions();
    assert_eq!(stranded.len(), 1);
    assert_ne!(stranded[0].status, DecisionStatus::Processed);

    let result = expect_decision(service.retry(&owner(), &session).expect("retry succeeds"));
    assert_eq!(result.decision_id, stranded[0].id);
    assert_eq!(repository.inner.recommendation_count(), 1);
    let decisions = repository.inner.decisions();
    assert_eq!(decisions.len(), 1);
    assert_eq!(decisions[0].status, DecisionStatus::Processed);
    assert_eq!(
        decisions[0].inputs.number(fields::CURRENT_SAVINGS),
        Some(60_000.0)
    );
}

#[test]
fn decision_insert_that_landed_despite_an_outage_is_reused() {
    let (service, repository) = build_scripted_service();
    repository.lose_next_create_ack();

    let result = expect_decision(
        service
            .decide(&owner(), hiring_request(20_000.0))
            .expect("decision despite lost acknowledgement"),
    );

    assert_eq!(result.decision_result, "APPROVE");
    let decisions = repository.inner.decisions();
    assert_eq!(decisions.len(), 1);
    assert_eq!(decisions[0].id, result.decision_id);
    assert_eq!(decisions[0].status, DecisionStatus::Processed);
    assert_eq!(repository.inner.recommendation_count(), 1);
}

#[test]
fn chat_opens_a_pending_decision_after_the_first_answer() {
    let (service, repository) = build_service();
    let session = session("pending");

    match service
        .handle_turn(&owner(), &session, "Can I hire a cashier?")
        .expect("prompt")
    {
        EngineReply::DataNeeded { data_needed } => {
            assert!(data_needed.intent_context.decision_id.is_none());
        }
        other => panic!("expected data_needed, got {other:?}"),
    }
    assert!(repository.decisions().is_empty());

    let decision_id = match service
        .handle_turn(&owner(), &session, "150000")
        .expect("answer")
    {
        EngineReply::DataNeeded { data_needed } => data_needed
            .intent_context
            .decision_id
            .expect("decision opened"),
        other => panic!("expected data_needed, got {other:?}"),
    };
    let view = service
        .decision_status(&owner(), &decision_id)
        .expect("status");
    assert_eq!(view.status, "pending");
    assert!(view.recommendation_id.is_none());

    let mut reply = None;
    for answer in ["80000", "10000", "20000", "60000"] {
        reply = Some(service.handle_turn(&owner(), &session, answer).expect("turn"));
    }
    let result = expect_decision(reply.expect("final reply"));
    assert_eq!(result.decision_id, decision_id);
    let decisions = repository.decisions();
    assert_eq!(decisions.len(), 1);
    assert_eq!(decisions[0].status, DecisionStatus::Processed);
}

#[test]
fn feedback_is_recorded_for_the_owner_only() {
    let (service, repository) = build_service();
    let result = expect_decision(
        service
            .decide(&owner(), hiring_request(20_000.0))
            .expect("decision"),
    );

    let feedback = service
        .submit_feedback(
            &owner(),
            &result.recommendation_id,
            true,
            Some("  Helpful  ".to_string()),
        )
        .expect("feedback stored");
    assert!(feedback.accepted);
    assert_eq!(feedback.comment.as_deref(), Some("Helpful"));
    assert_eq!(repository.feedback().len(), 1);

    match service.submit_feedback(
        &UserId("someone-else".to_string()),
        &result.recommendation_id,
        false,
        None,
    ) {
        Err(AdvisorError::NotFound { .. }) => {}
        other => panic!("expected not found, got {other:?}"),
    }
    match service.submit_feedback(
        &owner(),
        &RecommendationId("rec-missing".to_string()),
        false,
        None,
    ) {
        Err(AdvisorError::NotFound { .. }) => {}
        other => panic!("expected not found, got {other:?}"),
    }
    assert_eq!(repository.feedback().len(), 1);
}

#[test]
fn decision_status_reports_the_recommendation() {
    let (service, _) = build_service();
    let result = expect_decision(
        service
            .decide(&owner(), hiring_request(20_000.0))
            .expect("decision"),
    );

    let view = service
        .decision_status(&owner(), &result.decision_id)
        .expect("status");
    assert_eq!(view.status, "processed");
    assert_eq!(view.recommendation, Some("APPROVE"));
    assert_eq!(view.recommendation_id, Some(result.recommendation_id.clone()));

    match service.decision_status(&owner(), &DecisionId("dec-missing".to_string())) {
        Err(AdvisorError::NotFound { what: "decision" }) => {}
        other => panic!("expected not found, got {other:?}"),
    }
}

#[test]
fn health_snapshot_requires_a_baseline() {
    let (service, repository) = build_service();

    match service.health_snapshot(&owner()) {
        Err(error @ AdvisorError::NoFinancialData) => {
            assert_eq!(error.code(), "NO_FINANCIAL_DATA");
        }
        other => panic!("expected no financial data, got {other:?}"),
    }

    repository
        .save_baseline(&owner(), baseline())
        .expect("baseline saved");
    let snapshot = service.health_snapshot(&owner()).expect("snapshot");
    // margin 25% caps profitability, runway 3 of 6 months, no debt: 40 + 17.5 + 25
    assert_eq!(snapshot.financial_health_score, 83);
    assert_eq!(snapshot.band, HealthBand::Stable);
}
