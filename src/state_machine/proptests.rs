//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::*;
use crate::conversation::{Message, ToolCall, ToolResult};
use crate::post_process;
use crate::tools::{GET_ACTIVITIES_IN_RANGE, GET_ACTIVITY_INFORMATION, GET_ATHLETE_STATS};
use proptest::prelude::*;
use serde_json::json;
use std::collections::HashSet;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_tool_name() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        GET_ATHLETE_STATS,
        GET_ACTIVITIES_IN_RANGE,
        GET_ACTIVITY_INFORMATION,
        "made_up_tool",
    ])
}

/// A round of calls with unique ids plus a completion order
fn arb_round() -> impl Strategy<Value = (Vec<ToolCall>, Vec<usize>)> {
    proptest::collection::vec(arb_tool_name(), 1..8).prop_flat_map(|names| {
        let calls: Vec<ToolCall> = names
            .iter()
            .enumerate()
            .map(|(i, name)| ToolCall::new(format!("call_{i}"), *name, json!({})))
            .collect();
        let order: Vec<usize> = (0..calls.len()).collect();
        (Just(calls), Just(order).prop_shuffle())
    })
}

fn arb_payload() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("{\"id\":1,\"type\":\"Run\"}\n{\"id\":2,\"type\":\"Ride\"}".to_string()),
        Just(crate::tools::NO_ACTIVITIES.to_string()),
        Just("Error: rate limit exceeded".to_string()),
        "[a-zA-Z0-9 ]{0,40}",
    ]
}

fn arb_state() -> impl Strategy<Value = ConvState> {
    let ids = proptest::collection::vec("[a-z]{4}", 0..4);
    prop_oneof![
        Just(ConvState::Reasoning),
        Just(ConvState::Done),
        ids.clone().prop_map(|pending| ConvState::Dispatching { pending }),
        ids.prop_map(|pending| ConvState::PostProcessing { pending }),
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        "[a-z ]{0,20}".prop_map(|text| Event::ModelResponded {
            message: Message::assistant(text, vec![])
        }),
        ("[a-z]{4}", arb_tool_name()).prop_map(|(id, name)| Event::ToolCompleted {
            result: ToolResult::new(id, name, "{}")
        }),
        Just(Event::PostProcessed { summary: None }),
    ]
}

// ============================================================================
// Validity Checkers
// ============================================================================

fn is_valid_state(state: &ConvState) -> bool {
    let pending = state.pending();
    let unique: HashSet<_> = pending.iter().collect();
    unique.len() == pending.len()
}

/// `RequestModel` is only ever emitted on the way back into `Reasoning`
fn effects_are_valid(result: &TransitionResult) -> bool {
    let requests = result
        .effects
        .iter()
        .filter(|e| matches!(e, Effect::RequestModel))
        .count();
    let expected = usize::from(result.new_state == ConvState::Reasoning);
    requests == expected
}

/// Drive one complete round, playing the runtime's role
fn drive_round(
    calls: &[ToolCall],
    order: &[usize],
    payload: &str,
) -> Result<(ConvState, Vec<Message>, Vec<Effect>), TransitionError> {
    let mut appended = Vec::new();
    let mut all_effects = Vec::new();

    let first = transition(
        &ConvState::Reasoning,
        Event::ModelResponded {
            message: Message::assistant("", calls.to_vec()),
        },
    )?;
    let mut state = first.new_state;
    all_effects.extend(first.effects);

    for &i in order {
        let call = &calls[i];
        let step = transition(
            &state,
            Event::ToolCompleted {
                result: ToolResult::new(call.id.clone(), call.name.clone(), payload),
            },
        )?;
        state = step.new_state;
        let mut post = None;
        for effect in step.effects {
            match &effect {
                Effect::AppendMessage(m) => appended.push(m.clone()),
                Effect::PostProcess { latest } => post = Some(post_process::process(latest)),
                _ => {}
            }
            all_effects.push(effect);
        }

        if let Some(summary) = post {
            let step = transition(&state, Event::PostProcessed { summary })?;
            state = step.new_state;
            for effect in step.effects {
                if let Effect::AppendMessage(m) = &effect {
                    appended.push(m.clone());
                }
                all_effects.push(effect);
            }
        }
    }

    Ok((state, appended, all_effects))
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    /// Any completion order ends in Reasoning with exactly one result per call
    #[test]
    fn prop_round_completes_in_any_order((calls, order) in arb_round(), payload in arb_payload()) {
        let (state, appended, effects) = drive_round(&calls, &order, &payload).unwrap();
        prop_assert_eq!(state, ConvState::Reasoning);

        let result_ids: Vec<&str> = appended
            .iter()
            .filter_map(|m| match m {
                Message::ToolResult(r) => Some(r.tool_call_id.as_str()),
                _ => None,
            })
            .collect();
        prop_assert_eq!(result_ids.len(), calls.len());
        let unique: HashSet<_> = result_ids.iter().collect();
        prop_assert_eq!(unique.len(), calls.len());

        // The model is asked again only once, after the last result
        let requests = effects.iter().filter(|e| matches!(e, Effect::RequestModel)).count();
        prop_assert_eq!(requests, 1);
        prop_assert!(matches!(effects.last(), Some(Effect::RequestModel)));
    }

    /// A post-processing effect follows exactly the listing results
    #[test]
    fn prop_post_process_only_for_listings((calls, order) in arb_round(), payload in arb_payload()) {
        let (_, _, effects) = drive_round(&calls, &order, &payload).unwrap();
        let post_count = effects.iter().filter(|e| matches!(e, Effect::PostProcess { .. })).count();
        let listing_count = calls.iter().filter(|c| c.name == GET_ACTIVITIES_IN_RANGE).count();
        prop_assert_eq!(post_count, listing_count);
    }

    /// Summaries are appended directly after the listing they describe
    #[test]
    fn prop_summary_follows_listing((calls, order) in arb_round(), payload in arb_payload()) {
        let (_, appended, _) = drive_round(&calls, &order, &payload).unwrap();
        for (i, message) in appended.iter().enumerate() {
            if matches!(message, Message::System { .. }) {
                let prev = i.checked_sub(1).and_then(|p| appended.get(p));
                prop_assert!(
                    matches!(prev, Some(Message::ToolResult(r)) if r.tool_name == GET_ACTIVITIES_IN_RANGE),
                    "summary without preceding listing result"
                );
            }
        }
    }

    /// Replaying a result that was already answered is rejected
    #[test]
    fn prop_duplicate_result_rejected((calls, order) in arb_round()) {
        prop_assume!(calls.len() > 1);
        let pending: Vec<String> = calls.iter().map(|c| c.id.clone()).collect();
        let first = &calls[order[0]];
        let step = transition(
            &ConvState::Dispatching { pending },
            Event::ToolCompleted { result: ToolResult::new(first.id.clone(), GET_ATHLETE_STATS, "{}") },
        ).unwrap();
        let again = transition(
            &step.new_state,
            Event::ToolCompleted { result: ToolResult::new(first.id.clone(), GET_ATHLETE_STATS, "{}") },
        );
        prop_assert_eq!(again.unwrap_err(), TransitionError::UnexpectedToolResult(first.id.clone()));
    }

    /// Valid states stay valid and effects stay consistent for any event
    #[test]
    fn prop_transitions_preserve_validity(state in arb_state(), event in arb_event()) {
        prop_assume!(is_valid_state(&state));
        if let Ok(result) = transition(&state, event) {
            prop_assert!(is_valid_state(&result.new_state));
            prop_assert!(effects_are_valid(&result));
        }
    }

    /// Done accepts nothing
    #[test]
    fn prop_done_is_terminal(event in arb_event()) {
        prop_assert_eq!(transition(&ConvState::Done, event).unwrap_err(), TransitionError::Terminal);
    }
}
