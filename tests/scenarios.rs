//! End-to-end scenarios, one per worked example.

use std::sync::Arc;

use wayfinder::prelude::*;
use wayfinder::constraint::{ConstraintKind, Phase, TransitionEvent};
use wayfinder::effect::EffectOp;
use wayfinder::rule::{Cost, ExecutableTransition};
use wayfinder::study;

fn peg_at(event: &TransitionEvent, disk: usize) -> Option<String> {
    event.before.as_object()?.get(&format!("disk{disk}"))?.as_str().map(str::to_string)
}

fn hanoi_system(disk_count: usize, pegs: &[&str]) -> wayfinder::rule::ExecutableSystem {
    let mut transitions = Vec::new();
    for disk in 1..=disk_count {
        for &dest in pegs {
            let dest = dest.to_string();
            let dest_for_effect = dest.clone();
            let smaller: Vec<usize> = (1..disk).collect();

            let not_already_there = {
                let dest = dest.clone();
                ConstraintKind::Custom {
                    name: format!("disk{disk}_not_on_{dest}"),
                    phase: Phase::BeforeTransition,
                    predicate: Arc::new(move |event: &TransitionEvent| {
                        peg_at(event, disk).as_deref() != Some(dest.as_str())
                    }),
                }
            };
            let dest_clear_of_smaller = {
                let dest = dest.clone();
                let smaller = smaller.clone();
                ConstraintKind::Custom {
                    name: format!("{dest}_clear_for_disk{disk}"),
                    phase: Phase::BeforeTransition,
                    predicate: Arc::new(move |event: &TransitionEvent| {
                        smaller.iter().all(|&s| peg_at(event, s).as_deref() != Some(dest.as_str()))
                    }),
                }
            };
            let is_topmost_on_source = {
                let smaller = smaller.clone();
                ConstraintKind::Custom {
                    name: format!("disk{disk}_is_topmost"),
                    phase: Phase::BeforeTransition,
                    predicate: Arc::new(move |event: &TransitionEvent| {
                        let here = peg_at(event, disk);
                        smaller.iter().all(|&s| peg_at(event, s) != here)
                    }),
                }
            };

            let constraints = vec![
                wayfinder::constraint::compile(format!("not_there_{disk}_{dest}"), not_already_there),
                wayfinder::constraint::compile(format!("clear_{disk}_{dest}"), dest_clear_of_smaller),
                wayfinder::constraint::compile(format!("top_{disk}_{dest}"), is_topmost_on_source),
            ];
            let effects = vec![wayfinder::effect::compile(EffectOp::Set {
                path: format!("disk{disk}"),
                value: State::from(dest_for_effect.as_str()),
            })
            .unwrap()];

            transitions.push(ExecutableTransition {
                name: format!("move_disk{disk}_to_{dest}"),
                constraints: constraints.into(),
                effects: effects.into(),
                cost: Cost::Fixed(1.0),
                metadata: Arc::new(Default::default()),
            });
        }
    }
    wayfinder::rule::ExecutableSystem { transitions: transitions.into() }
}

fn hanoi_initial(disk_count: usize, all_on: &str) -> State {
    State::object(
        (1..=disk_count).map(|d| (format!("disk{d}"), State::from(all_on))),
    )
}

fn open_schema() -> Validator {
    Validator::compile(Validation::Object { require: Default::default() })
}

#[tokio::test]
async fn s1_hanoi_three_disks_optimal_cost_is_seven() {
    let system = hanoi_system(3, &["A", "B", "C"]);
    let schema = open_schema();
    let codex = DefaultCodex;
    let start = hanoi_initial(3, "A");
    let goal = hanoi_initial(3, "C");

    let found = study::optimal_path(
        &system,
        &schema,
        &codex,
        start,
        |s| s == &goal,
        |cost, _| cost,
        study::cheaper,
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(found.total_cost, 7.0);
    assert_eq!(found.steps.len(), 7);
}

#[tokio::test]
async fn s4_bounded_hanoi_four_reaches_all_81_states() {
    let system = hanoi_system(4, &["A", "B", "C"]);
    let schema = open_schema();
    let codex = DefaultCodex;
    let start = hanoi_initial(4, "A");

    let (graph, profile) =
        study::bounded_expansion(&system, &schema, &codex, start, Limits::default()).await.unwrap();

    assert_eq!(graph.node_count(), 81);
    assert_eq!(profile.total_states, 81);
    assert!(profile.limit_reached.is_none());
    assert!(profile.avg_branching <= 3.0 + f64::EPSILON);
}

fn page_is(event: &TransitionEvent, expected: &'static str) -> bool {
    event.before.as_object().and_then(|o| o.get("page")).and_then(|v| v.as_str()) == Some(expected)
}

fn state_page_is(state: &State, expected: &str) -> bool {
    state.as_object().and_then(|o| o.get("page")).and_then(|v| v.as_str()) == Some(expected)
}

fn shopping_cart_system() -> wayfinder::rule::ExecutableSystem {
    let add_item = ExecutableTransition {
        name: "addItem".to_string(),
        constraints: vec![wayfinder::constraint::compile(
            "cap",
            ConstraintKind::PathNumber {
                path: "cart".to_string(),
                op: wayfinder::schema::NumberOp::Lt(3.0),
                phase: None,
            },
        )]
        .into(),
        effects: vec![
            wayfinder::effect::compile(EffectOp::Increment { path: "cart".to_string(), by: 1.0 })
                .unwrap(),
        ]
        .into(),
        cost: Cost::Fixed(1.0),
        metadata: Arc::new(Default::default()),
    };

    let go_to_checkout = ExecutableTransition {
        name: "goToCheckout".to_string(),
        constraints: vec![
            wayfinder::constraint::compile(
                "on_product_list",
                ConstraintKind::Custom {
                    name: "on_product_list".to_string(),
                    phase: Phase::BeforeTransition,
                    predicate: Arc::new(|event: &TransitionEvent| page_is(event, "product-list")),
                },
            ),
            wayfinder::constraint::compile(
                "has_items",
                ConstraintKind::PathNumber {
                    path: "cart".to_string(),
                    op: wayfinder::schema::NumberOp::Positive,
                    phase: None,
                },
            ),
        ]
        .into(),
        effects: vec![wayfinder::effect::compile(EffectOp::Set {
            path: "page".to_string(),
            value: State::from("checkout"),
        })
        .unwrap()]
        .into(),
        cost: Cost::Fixed(1.0),
        metadata: Arc::new(Default::default()),
    };

    let complete_checkout = ExecutableTransition {
        name: "completeCheckout".to_string(),
        constraints: vec![wayfinder::constraint::compile(
            "on_checkout",
            ConstraintKind::Custom {
                name: "on_checkout".to_string(),
                phase: Phase::BeforeTransition,
                predicate: Arc::new(|event: &TransitionEvent| page_is(event, "checkout")),
            },
        )]
        .into(),
        effects: vec![wayfinder::effect::compile(EffectOp::Set {
            path: "page".to_string(),
            value: State::from("confirmation"),
        })
        .unwrap()]
        .into(),
        cost: Cost::Fixed(1.0),
        metadata: Arc::new(Default::default()),
    };

    wayfinder::rule::ExecutableSystem {
        transitions: vec![add_item, go_to_checkout, complete_checkout].into(),
    }
}

#[tokio::test]
async fn s2_shopping_cart_optimal_path_cost_is_three() {
    let system = shopping_cart_system();
    let schema = open_schema();
    let codex = DefaultCodex;
    let start = State::object([
        ("page".to_string(), State::from("product-list")),
        ("cart".to_string(), State::Number(0.0)),
    ]);

    let found = study::optimal_path(
        &system,
        &schema,
        &codex,
        start,
        |s| state_page_is(s, "confirmation"),
        |cost, _| cost,
        study::cheaper,
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(found.total_cost, 3.0);
    let names: Vec<_> = found.steps.iter().map(|s| s.rule_name.clone()).collect();
    assert_eq!(names, vec!["addItem", "goToCheckout", "completeCheckout"]);
}

fn loading_is(event: &TransitionEvent, expected: bool) -> bool {
    event
        .before
        .as_object()
        .and_then(|o| o.get("frontend"))
        .and_then(|f| f.as_object())
        .and_then(|f| f.get("loading"))
        .and_then(|v| v.as_bool())
        == Some(expected)
}

fn posts_ready(state: &State) -> bool {
    let Some(frontend) = state.as_object().and_then(|o| o.get("frontend")).and_then(|f| f.as_object())
    else {
        return false;
    };
    let not_loading = frontend.get("loading").and_then(|v| v.as_bool()) == Some(false);
    let has_posts = frontend
        .get("posts")
        .and_then(|v| v.as_array())
        .map(|a| !a.is_empty())
        .unwrap_or(false);
    not_loading && has_posts
}

fn api_posts_system() -> wayfinder::rule::ExecutableSystem {
    let fetch_posts = ExecutableTransition {
        name: "fetchPosts".to_string(),
        constraints: vec![wayfinder::constraint::compile(
            "is_idle",
            ConstraintKind::Custom {
                name: "is_idle".to_string(),
                phase: Phase::BeforeTransition,
                predicate: Arc::new(|event: &TransitionEvent| loading_is(event, false)),
            },
        )]
        .into(),
        effects: vec![wayfinder::effect::compile(EffectOp::Set {
            path: "frontend.loading".to_string(),
            value: State::Bool(true),
        })
        .unwrap()]
        .into(),
        cost: Cost::Fixed(1.0),
        metadata: Arc::new(Default::default()),
    };

    let receive_posts = ExecutableTransition {
        name: "receivePosts".to_string(),
        constraints: vec![wayfinder::constraint::compile(
            "is_loading",
            ConstraintKind::Custom {
                name: "is_loading".to_string(),
                phase: Phase::BeforeTransition,
                predicate: Arc::new(|event: &TransitionEvent| loading_is(event, true)),
            },
        )]
        .into(),
        effects: vec![
            wayfinder::effect::compile(EffectOp::Set {
                path: "frontend.loading".to_string(),
                value: State::Bool(false),
            })
            .unwrap(),
            wayfinder::effect::compile(EffectOp::Set {
                path: "frontend.posts".to_string(),
                value: State::array([State::from("hello world")]),
            })
            .unwrap(),
        ]
        .into(),
        cost: Cost::Fixed(1.0),
        metadata: Arc::new(Default::default()),
    };

    wayfinder::rule::ExecutableSystem { transitions: vec![fetch_posts, receive_posts].into() }
}

fn api_posts_initial() -> State {
    State::object([(
        "frontend".to_string(),
        State::object([
            ("loading".to_string(), State::Bool(false)),
            ("posts".to_string(), State::array([])),
        ]),
    )])
}

#[tokio::test]
async fn s3_api_posts_workflow_visits_loading_state() {
    let system = api_posts_system();
    let schema = open_schema();
    let codex = DefaultCodex;
    let start = api_posts_initial();

    let found =
        study::optimal_path(&system, &schema, &codex, start, posts_ready, |cost, _| cost, study::cheaper)
            .await
            .unwrap()
            .unwrap();

    assert_eq!(found.total_cost, 2.0);
    let names: Vec<_> = found.steps.iter().map(|s| s.rule_name.clone()).collect();
    assert_eq!(names, vec!["fetchPosts", "receivePosts"]);

    let loading_state = State::object([(
        "frontend".to_string(),
        State::object([
            ("loading".to_string(), State::Bool(true)),
            ("posts".to_string(), State::array([])),
        ]),
    )]);
    let loading_hash = codex.encode(&loading_state).await.unwrap();
    assert_eq!(found.steps[0].state_hash, loading_hash);
}

fn flip_flop_system() -> wayfinder::rule::ExecutableSystem {
    let turn_off = ExecutableTransition {
        name: "flip".to_string(),
        constraints: vec![wayfinder::constraint::compile(
            "is_on",
            ConstraintKind::Custom {
                name: "is_on".to_string(),
                phase: Phase::BeforeTransition,
                predicate: Arc::new(|event: &TransitionEvent| {
                    event.before.as_object().and_then(|o| o.get("on")).and_then(|v| v.as_bool())
                        == Some(true)
                }),
            },
        )]
        .into(),
        effects: vec![
            wayfinder::effect::compile(EffectOp::Set { path: "on".to_string(), value: State::Bool(false) })
                .unwrap(),
        ]
        .into(),
        cost: Cost::Fixed(1.0),
        metadata: Arc::new(Default::default()),
    };
    let turn_on = ExecutableTransition {
        name: "flip".to_string(),
        constraints: vec![wayfinder::constraint::compile(
            "is_off",
            ConstraintKind::Custom {
                name: "is_off".to_string(),
                phase: Phase::BeforeTransition,
                predicate: Arc::new(|event: &TransitionEvent| {
                    event.before.as_object().and_then(|o| o.get("on")).and_then(|v| v.as_bool())
                        == Some(false)
                }),
            },
        )]
        .into(),
        effects: vec![
            wayfinder::effect::compile(EffectOp::Set { path: "on".to_string(), value: State::Bool(true) })
                .unwrap(),
        ]
        .into(),
        cost: Cost::Fixed(1.0),
        metadata: Arc::new(Default::default()),
    };
    wayfinder::rule::ExecutableSystem { transitions: vec![turn_off, turn_on].into() }
}

#[tokio::test]
async fn s5_two_state_cycle_is_reported() {
    let system = flip_flop_system();
    let schema = open_schema();
    let codex = DefaultCodex;
    let start = State::object([("on".to_string(), State::Bool(false))]);

    let cycle = study::detect_cycle(&system, &schema, &codex, start, None).await.unwrap().unwrap();
    assert_eq!(cycle.closed_walk.len(), 3);
    assert_eq!(cycle.total_cost, 2.0);
}

#[tokio::test]
async fn s6_codex_reencoding_is_idempotent() {
    let codex = DefaultCodex;
    let state = State::object([
        ("on".to_string(), State::Bool(true)),
        ("nested".to_string(), State::array([State::Number(1.0), State::from("x")])),
    ]);
    let hash = codex.encode(&state).await.unwrap();
    let decoded = codex.decode(&hash).await.unwrap();
    let re_encoded = codex.encode(&decoded).await.unwrap();
    assert_eq!(hash, re_encoded);
}
