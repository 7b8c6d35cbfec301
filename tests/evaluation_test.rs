//! End-to-end evaluation tests: programmatically built nets fed with event
//! streams, one event at a time.

use std::sync::Arc;

use behavior_engine::{
    ApiCallGuard, BehaviorNet, BinaryOp, EventValue, ExecutionEvent, Expression, NetEvaluator,
    Timestamp,
};

fn event(name: &str, args: &[u64]) -> ExecutionEvent {
    ExecutionEvent::new(Timestamp::ZERO, name).with_arguments(args.iter().copied())
}

/// t1(Signal1, captures arg1) -> p1 -> t2(Signal2, captures arg1) -> p2,
/// with p2 accepting. Both transitions capture into the same variable, so
/// the second signal must repeat the first one's argument.
fn simple_path() -> Arc<BehaviorNet> {
    let mut net = BehaviorNet::new();
    let p1 = net.add_place("p1");
    let p2 = net.add_place("p2");
    net.set_accepting(p2, true);

    net.add_transition("t1")
        .with_output(p1)
        .with_function(ApiCallGuard::new("Signal1").capture_argument(0, "arg1"));
    net.add_transition("t2")
        .with_input(p1)
        .with_output(p2)
        .with_function(ApiCallGuard::new("Signal2").capture_argument(0, "arg1"));

    Arc::new(net)
}

/// Fork after p0 into two parallel branches that rejoin at t5.
fn fork_join() -> Arc<BehaviorNet> {
    let mut net = BehaviorNet::new();
    let places = net.add_places(["p0", "p1", "p2", "p3", "p4", "p5"]);
    net.set_accepting(places[5], true);

    net.add_transition("t1")
        .with_output(places[0])
        .with_function(ApiCallGuard::new("Signal1").capture_argument(0, "arg1"));
    net.add_transition("t2")
        .with_input(places[0])
        .with_outputs([places[1], places[3]])
        .with_function(ApiCallGuard::new("Signal2").capture_argument(0, "arg2"));
    net.add_transition("t3")
        .with_input(places[1])
        .with_output(places[2])
        .with_function(ApiCallGuard::new("Signal3").capture_argument(0, "arg3"));
    net.add_transition("t4")
        .with_input(places[3])
        .with_output(places[4])
        .with_function(ApiCallGuard::new("Signal4").capture_argument(0, "arg4"));
    net.add_transition("t5")
        .with_inputs([places[2], places[4]])
        .with_output(places[5])
        .with_function(ApiCallGuard::new("Signal5").capture_argument(0, "arg5"));

    Arc::new(net)
}

#[test]
fn simple_match() {
    let mut evaluator = NetEvaluator::new(simple_path());

    evaluator.step(&event("Signal1", &[123])).unwrap();
    evaluator.step(&event("Signal2", &[123])).unwrap();

    assert!(evaluator.is_accepting());
}

#[test]
fn incomplete_path_does_not_accept() {
    let mut evaluator = NetEvaluator::new(simple_path());

    evaluator.step(&event("Signal1", &[123])).unwrap();
    assert!(!evaluator.is_accepting());
}

#[test]
fn mismatching_arguments_do_not_accept() {
    let mut evaluator = NetEvaluator::new(simple_path());

    evaluator.step(&event("Signal1", &[123])).unwrap();
    evaluator.step(&event("Signal2", &[456])).unwrap();

    assert!(!evaluator.is_accepting());
}

#[test]
fn greedy_match() {
    // The second signal matches the first partial match, not the latest.
    let mut evaluator = NetEvaluator::new(simple_path());

    evaluator.step(&event("Signal1", &[123])).unwrap();
    evaluator.step(&event("Signal1", &[456])).unwrap();
    evaluator.step(&event("Signal2", &[123])).unwrap();

    assert!(evaluator.is_accepting());
}

#[test]
fn lazy_match() {
    // Both partial matches stay live; the later one completes here.
    let mut evaluator = NetEvaluator::new(simple_path());

    evaluator.step(&event("Signal1", &[123])).unwrap();
    evaluator.step(&event("Signal1", &[456])).unwrap();
    evaluator.step(&event("Signal2", &[456])).unwrap();

    assert!(evaluator.is_accepting());
}

#[test]
fn fork_join_branch_order_does_not_matter() {
    for swap in [false, true] {
        let mut evaluator = NetEvaluator::new(fork_join());

        evaluator.step(&event("Signal1", &[1])).unwrap();
        evaluator.step(&event("Signal2", &[2])).unwrap();

        let branches: [&str; 2] = if swap {
            ["Signal4", "Signal3"]
        } else {
            ["Signal3", "Signal4"]
        };
        for name in branches {
            evaluator.step(&event(name, &[3])).unwrap();
        }

        evaluator.step(&event("Signal5", &[5])).unwrap();
        assert!(evaluator.is_accepting(), "swap = {swap}");
    }
}

#[test]
fn join_requires_tokens_on_all_inputs() {
    let mut net = BehaviorNet::new();
    let places = net.add_places(["p1", "p2", "p3"]);
    net.set_accepting(places[2], true);

    net.add_transition("t1")
        .with_output(places[0])
        .with_function(ApiCallGuard::new("Signal1"));
    net.add_transition("t2")
        .with_output(places[1])
        .with_function(ApiCallGuard::new("Signal2"));
    net.add_transition("t3")
        .with_inputs([places[0], places[1]])
        .with_output(places[2])
        .with_function(ApiCallGuard::new("Final"));
    let net = Arc::new(net);

    // Either branch alone is not enough, in any arrival order.
    for first in ["Signal1", "Signal2"] {
        let mut evaluator = NetEvaluator::new(Arc::clone(&net));
        evaluator.step(&event(first, &[])).unwrap();
        evaluator.step(&event("Final", &[])).unwrap();
        assert!(!evaluator.is_accepting());
    }

    let mut evaluator = NetEvaluator::new(net);
    evaluator.step(&event("Signal1", &[])).unwrap();
    evaluator.step(&event("Signal2", &[])).unwrap();
    evaluator.step(&event("Final", &[])).unwrap();
    assert!(evaluator.is_accepting());
}

#[test]
fn forking_transition_deposits_the_same_token_twice() {
    let mut net = BehaviorNet::new();
    let places = net.add_places(["p1", "p2", "p3"]);
    net.add_transition("t1")
        .with_output(places[0])
        .with_function(ApiCallGuard::new("Signal1").capture_argument(0, "x"));
    net.add_transition("t2")
        .with_input(places[0])
        .with_outputs([places[1], places[2]])
        .with_function(ApiCallGuard::new("Signal2").capture_argument(0, "y"));
    let net = Arc::new(net);

    let mut evaluator = NetEvaluator::new(Arc::clone(&net));
    evaluator.step(&event("Signal1", &[123])).unwrap();
    evaluator.step(&event("Signal2", &[456])).unwrap();

    let left = evaluator.marking().tokens(places[1]);
    let right = evaluator.marking().tokens(places[2]);
    assert_eq!(left.len(), 1);
    assert_eq!(left, right);
}

#[test]
fn constraints_filter_generator_transitions() {
    let mut net = BehaviorNet::new();
    let p1 = net.add_place("p1");
    net.add_transition("t1").with_output(p1).with_function(
        ApiCallGuard::new("Signal1")
            .capture_argument(0, "arg1")
            .with_constraint(Expression::binary(
                Expression::variable("arg1"),
                BinaryOp::Gt,
                Expression::literal(100u64),
            ))
            .with_constraint(Expression::binary(
                Expression::variable("arg1"),
                BinaryOp::Lt,
                Expression::literal(10000u64),
            )),
    );
    let net = Arc::new(net);

    let mut evaluator = NetEvaluator::new(Arc::clone(&net));
    evaluator.step(&event("Signal1", &[10001])).unwrap();
    assert!(evaluator.marking().tokens(p1).is_empty());

    evaluator.step(&event("Signal1", &[123])).unwrap();
    let tokens = evaluator.marking().tokens(p1);
    assert_eq!(tokens.len(), 1);
    assert_eq!(
        tokens.iter().next().unwrap().get("arg1"),
        Some(&EventValue::UInt(123))
    );
}

#[test]
fn constraints_can_reference_earlier_captures() {
    let mut net = BehaviorNet::new();
    let p1 = net.add_place("p1");
    let p2 = net.add_place("p2");

    net.add_transition("t1").with_output(p1).with_function(
        ApiCallGuard::new("Signal1")
            .capture_argument(0, "begin")
            .capture_argument(1, "end"),
    );
    net.add_transition("t2")
        .with_input(p1)
        .with_output(p2)
        .with_function(
            ApiCallGuard::new("Signal2")
                .capture_argument(0, "x")
                .with_constraint(Expression::binary(
                    Expression::variable("x"),
                    BinaryOp::Ge,
                    Expression::variable("begin"),
                ))
                .with_constraint(Expression::binary(
                    Expression::variable("x"),
                    BinaryOp::Le,
                    Expression::variable("end"),
                )),
        );
    let net = Arc::new(net);

    let mut evaluator = NetEvaluator::new(Arc::clone(&net));
    evaluator.step(&event("Signal1", &[1000, 2000])).unwrap();

    evaluator.step(&event("Signal2", &[3000])).unwrap();
    assert!(evaluator.marking().tokens(p2).is_empty());

    evaluator.step(&event("Signal2", &[1500])).unwrap();
    let tokens = evaluator.marking().tokens(p2);
    assert_eq!(tokens.len(), 1);
    assert_eq!(
        tokens.iter().next().unwrap().get("x"),
        Some(&EventValue::UInt(1500))
    );
}

#[test]
fn process_capture_partitions_matches() {
    let mut net = BehaviorNet::new();
    let p1 = net.add_place("p1");
    let p2 = net.add_place("p2");
    net.set_accepting(p2, true);

    net.add_transition("t1")
        .with_output(p1)
        .with_function(ApiCallGuard::new("Signal1").capture_process("processId"));
    net.add_transition("t2")
        .with_input(p1)
        .with_output(p2)
        .with_function(ApiCallGuard::new("Signal2").capture_process("processId"));
    let net = Arc::new(net);

    let mut evaluator = NetEvaluator::new(net);
    evaluator
        .step(&ExecutionEvent::new(Timestamp::ZERO, "Signal1").in_process(1))
        .unwrap();
    assert!(!evaluator.is_accepting());

    // Same signal from another process must not complete the match.
    evaluator
        .step(&ExecutionEvent::new(Timestamp::ZERO, "Signal2").in_process(2))
        .unwrap();
    assert!(!evaluator.is_accepting());

    evaluator
        .step(&ExecutionEvent::new(Timestamp::ZERO, "Signal2").in_process(1))
        .unwrap();
    assert!(evaluator.is_accepting());
}

#[test]
fn thread_capture_partitions_matches() {
    let mut net = BehaviorNet::new();
    let p1 = net.add_place("p1");
    let p2 = net.add_place("p2");
    net.set_accepting(p2, true);

    net.add_transition("t1")
        .with_output(p1)
        .with_function(ApiCallGuard::new("Signal1").capture_thread("threadId"));
    net.add_transition("t2")
        .with_input(p1)
        .with_output(p2)
        .with_function(ApiCallGuard::new("Signal2").capture_thread("threadId"));
    let net = Arc::new(net);

    let mut evaluator = NetEvaluator::new(net);
    evaluator
        .step(&ExecutionEvent::new(Timestamp::ZERO, "Signal1").on_thread(1))
        .unwrap();
    evaluator
        .step(&ExecutionEvent::new(Timestamp::ZERO, "Signal2").on_thread(2))
        .unwrap();
    assert!(!evaluator.is_accepting());

    evaluator
        .step(&ExecutionEvent::new(Timestamp::ZERO, "Signal2").on_thread(1))
        .unwrap();
    assert!(evaluator.is_accepting());
}

#[test]
fn undefined_variable_in_constraint_surfaces_as_error() {
    let mut net = BehaviorNet::new();
    let p1 = net.add_place("p1");
    net.add_transition("t1").with_output(p1).with_function(
        ApiCallGuard::new("Signal1").with_constraint(Expression::binary(
            Expression::variable("never_bound"),
            BinaryOp::Eq,
            Expression::literal(1u64),
        )),
    );
    let net = Arc::new(net);

    let mut evaluator = NetEvaluator::new(net);
    assert!(evaluator.step(&event("Signal1", &[])).is_err());
}
