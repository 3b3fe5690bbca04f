//! Tests for the traversal engine: cursor advancement, stream resolution,
//! the recursive runner and whole-flow extraction.
mod common;

use std::cell::RefCell;
use std::rc::Rc;

use kaiwa::prelude::*;

use common::{counters, counting_step, execution_cursor, satisfied_step, stream_map, MockClient};

#[test]
fn test_is_stream() {
    let streams = stream_map(vec![("main", Stream::from("greet"))]);
    assert!(is_stream(&streams, "main"));
    assert!(!is_stream(&streams, "greet"));
}

#[test]
fn test_resolve_active_sequence() {
    let step = satisfied_step();
    let stream = Stream::sequence([
        StreamEntry::from(Rc::clone(&step)),
        StreamEntry::from("payment"),
    ]);

    match resolve_active(&stream, &execution_cursor("greet")) {
        Some(Active::Step(resolved)) => assert!(Rc::ptr_eq(&resolved, &step)),
        other => panic!("expected step, got {:?}", other),
    }
    match resolve_active(&stream, &execution_cursor("greet").advanced()) {
        Some(Active::Pointer(target)) => assert_eq!(target, "payment"),
        other => panic!("expected pointer, got {:?}", other),
    }
    assert!(resolve_active(&stream, &execution_cursor("greet").advanced().advanced()).is_none());
}

#[test]
fn test_resolve_active_single_and_pointer_occupy_position_zero_only() {
    let single = Stream::from(satisfied_step());
    assert!(matches!(
        resolve_active(&single, &execution_cursor("x")),
        Some(Active::Step(_))
    ));
    assert!(resolve_active(&single, &execution_cursor("x").advanced()).is_none());

    let pointer = Stream::from("payment");
    assert!(matches!(
        resolve_active(&pointer, &execution_cursor("x")),
        Some(Active::Pointer(target)) if target == "payment"
    ));
    assert!(resolve_active(&pointer, &execution_cursor("x").advanced()).is_none());
}

#[test]
fn test_next_cursor_advances_within_stream() {
    let streams = stream_map(vec![(
        "greet",
        Stream::sequence([
            StreamEntry::from(satisfied_step()),
            StreamEntry::from(satisfied_step()),
        ]),
    )]);

    let next = next_cursor(&satisfied_step(), &streams, &execution_cursor("greet")).unwrap();
    assert_eq!(next.stream_name, "greet");
    assert_eq!(next.step_index, 1);
    assert!(next.stream_stack.is_empty());
}

#[test]
fn test_next_cursor_self_redirect_does_not_grow_stack() {
    let step = Step::builder().next(|| Some("greet".to_string())).build();
    let streams = stream_map(vec![(
        "greet",
        Stream::sequence([
            StreamEntry::from(Rc::clone(&step)),
            StreamEntry::from(satisfied_step()),
        ]),
    )]);

    let next = next_cursor(&step, &streams, &execution_cursor("greet")).unwrap();
    assert_eq!(next.stream_name, "greet");
    assert_eq!(next.step_index, 1);
    assert!(next.stream_stack.is_empty());
}

#[test]
fn test_next_cursor_redirect_descends_with_resume_frame() {
    let step = Step::builder().next(|| Some("payment".to_string())).build();
    let streams = stream_map(vec![
        (
            "greet",
            Stream::sequence([
                StreamEntry::from(Rc::clone(&step)),
                StreamEntry::from(satisfied_step()),
            ]),
        ),
        ("payment", Stream::from(satisfied_step())),
    ]);

    let next = next_cursor(&step, &streams, &execution_cursor("greet")).unwrap();
    assert_eq!(next.stream_name, "payment");
    assert_eq!(next.step_index, 0);
    assert_eq!(next.stream_stack, vec![StackFrame::new("greet", 1)]);
}

#[test]
fn test_next_cursor_unknown_redirect_falls_back_to_advance() {
    let step = Step::builder().next(|| Some("nowhere".to_string())).build();
    let streams = stream_map(vec![(
        "greet",
        Stream::sequence([
            StreamEntry::from(Rc::clone(&step)),
            StreamEntry::from(satisfied_step()),
        ]),
    )]);

    let next = next_cursor(&step, &streams, &execution_cursor("greet")).unwrap();
    assert_eq!(next.stream_name, "greet");
    assert_eq!(next.step_index, 1);
}

#[test]
fn test_next_cursor_exhaustion_routes_to_end_stream() {
    let streams = stream_map(vec![
        (
            "greet",
            Stream::sequence([
                StreamEntry::from(satisfied_step()),
                StreamEntry::from(satisfied_step()),
            ]),
        ),
        ("end", Stream::from(satisfied_step())),
    ]);

    let cursor = execution_cursor("greet").advanced();
    let next = next_cursor(&satisfied_step(), &streams, &cursor).unwrap();
    assert_eq!(next.stream_name, END_STREAM);
    assert_eq!(next.step_index, 0);
    // The exhausted position is remembered as a return address.
    assert_eq!(next.stream_stack, vec![StackFrame::new("greet", 2)]);
}

#[test]
fn test_next_cursor_exhaustion_pops_frame_exactly() {
    let streams = stream_map(vec![
        (
            "greet",
            Stream::sequence([
                StreamEntry::from(satisfied_step()),
                StreamEntry::from(satisfied_step()),
            ]),
        ),
        ("payment", Stream::from(satisfied_step())),
    ]);

    let cursor = execution_cursor("payment").with_stack(vec![StackFrame::new("greet", 1)]);
    let next = next_cursor(&satisfied_step(), &streams, &cursor).unwrap();
    assert_eq!(next.stream_name, "greet");
    assert_eq!(next.step_index, 1);
    assert!(next.stream_stack.is_empty());
}

#[test]
fn test_next_cursor_pointer_element_descends() {
    let streams = stream_map(vec![
        (
            "greet",
            Stream::sequence([
                StreamEntry::from(satisfied_step()),
                StreamEntry::from("payment"),
                StreamEntry::from(satisfied_step()),
            ]),
        ),
        ("payment", Stream::from(satisfied_step())),
    ]);

    let next = next_cursor(&satisfied_step(), &streams, &execution_cursor("greet")).unwrap();
    assert_eq!(next.stream_name, "payment");
    assert_eq!(next.step_index, 0);
    assert_eq!(next.stream_stack, vec![StackFrame::new("greet", 2)]);
}

#[test]
fn test_next_cursor_undefined_pointer_is_an_error() {
    let streams = stream_map(vec![(
        "greet",
        Stream::sequence([
            StreamEntry::from(satisfied_step()),
            StreamEntry::from("ghost"),
        ]),
    )]);

    let result = next_cursor(&satisfied_step(), &streams, &execution_cursor("greet"));
    assert!(matches!(
        result,
        Err(FlowError::InvalidStreamReference { token }) if token == "ghost"
    ));
}

#[test]
fn test_run_skips_satisfied_steps_until_a_prompt() {
    let greet = counters();
    let streams = stream_map(vec![(
        "greet",
        Stream::sequence([
            StreamEntry::from(satisfied_step()),
            StreamEntry::from(counting_step(&greet, None)),
        ]),
    )]);
    let client = MockClient::with_text("hello");

    let settled = run(
        execution_cursor("greet"),
        &streams,
        &client.as_flow_client(),
    )
    .unwrap();

    assert_eq!(settled.stream_name, "greet");
    assert_eq!(settled.step_index, 1);
    assert_eq!(greet.prompted.get(), 1);
    assert_eq!(*client.active_stream.borrow(), Some("greet".to_string()));
}

#[test]
fn test_run_first_pass_extracts_instead_of_prompting() {
    let greet = counters();
    let streams = stream_map(vec![(
        "greet",
        Stream::from(counting_step(&greet, None)),
    )]);
    let client = MockClient::with_text("hello");

    let settled = run(
        Cursor::initial().at_stream("greet"),
        &streams,
        &client.as_flow_client(),
    )
    .unwrap();

    assert_eq!(greet.extracted.get(), 1);
    assert_eq!(greet.prompted.get(), 0);
    assert!(settled.currently_active_step.is_some());
}

#[test]
fn test_run_resolves_pointer_streams() {
    let target = counters();
    let streams = stream_map(vec![
        ("greet", Stream::from("payment")),
        ("payment", Stream::from(counting_step(&target, None))),
    ]);
    let client = MockClient::with_text("hello");

    let settled = run(
        execution_cursor("greet"),
        &streams,
        &client.as_flow_client(),
    )
    .unwrap();

    assert_eq!(settled.stream_name, "payment");
    assert_eq!(target.prompted.get(), 1);
}

#[test]
fn test_run_terminates_on_satisfied_single_terminal_stream() {
    let streams = stream_map(vec![
        ("greet", Stream::sequence([StreamEntry::from(satisfied_step())])),
        ("end", Stream::from(satisfied_step())),
    ]);
    let client = MockClient::with_text("hello");

    // Exhausting `greet` falls into the single-step terminal stream; once
    // that step is past, the popped frame lands out of range and the walk
    // stops instead of re-resolving the single step.
    let settled = run(
        execution_cursor("greet"),
        &streams,
        &client.as_flow_client(),
    )
    .unwrap();

    assert_eq!(settled.stream_name, "greet");
    assert_eq!(settled.step_index, 1);
    assert!(settled.stream_stack.is_empty());
}

#[test]
fn test_run_missing_stream_is_a_no_op() {
    let streams = stream_map(vec![("greet", Stream::from(satisfied_step()))]);
    let client = MockClient::with_text("hello");

    let settled = run(
        execution_cursor("ghost"),
        &streams,
        &client.as_flow_client(),
    )
    .unwrap();

    assert_eq!(settled.stream_name, "ghost");
    assert_eq!(*client.active_stream.borrow(), None);
}

#[test]
fn test_run_fallback_request_runs_the_fallback() {
    let counters = counters();
    let fell_back = Rc::clone(&counters);
    let step = Step::builder()
        .satisfied(|| false)
        .fallback(move || fell_back.fell_back.set(fell_back.fell_back.get() + 1))
        .build();
    let streams = stream_map(vec![("greet", Stream::from(step))]);
    let client = MockClient::with_text("hello");

    let settled = run(
        execution_cursor("greet").with_fallback_request(),
        &streams,
        &client.as_flow_client(),
    )
    .unwrap();

    assert_eq!(counters.fell_back.get(), 1);
    assert!(settled.ran_fallback);
}

#[test]
fn test_run_fallback_request_without_fallback_does_nothing() {
    let greet = counters();
    let streams = stream_map(vec![(
        "greet",
        Stream::from(counting_step(&greet, None)),
    )]);
    let client = MockClient::with_text("hello");

    let settled = run(
        execution_cursor("greet").with_fallback_request(),
        &streams,
        &client.as_flow_client(),
    )
    .unwrap();

    assert!(!settled.ran_fallback);
    assert_eq!(greet.prompted.get(), 0);
}

#[test]
fn test_proceed_signal_prompts_each_step_exactly_once() {
    let first = counters();
    let second = counters();
    let streams = stream_map(vec![
        (
            "greet",
            Stream::sequence([
                StreamEntry::from(counting_step(&first, Some(Signal::Proceed))),
                StreamEntry::from(counting_step(&second, None)),
            ]),
        ),
        ("end", Stream::from(satisfied_step())),
    ]);
    let client = MockClient::with_text("hello");

    let settled = run(
        execution_cursor("greet"),
        &streams,
        &client.as_flow_client(),
    )
    .unwrap();

    // The continuation chain is detached: the returned cursor is the one the
    // first prompt was dispatched from.
    assert_eq!(settled.step_index, 0);
    assert_eq!(first.prompted.get(), 1);
    assert_eq!(second.prompted.get(), 1);
}

#[test]
fn test_route_signal_redirects_execution() {
    let greet = counters();
    let payment = counters();
    let streams = stream_map(vec![
        (
            "greet",
            Stream::from(counting_step(&greet, Some(Signal::Route("payment".to_string())))),
        ),
        ("payment", Stream::from(counting_step(&payment, None))),
    ]);
    let client = MockClient::with_text("hello");

    run(
        execution_cursor("greet"),
        &streams,
        &client.as_flow_client(),
    )
    .unwrap();

    assert_eq!(greet.prompted.get(), 1);
    assert_eq!(payment.prompted.get(), 1);
    assert_eq!(*client.active_stream.borrow(), Some("payment".to_string()));
}

#[test]
fn test_route_signal_to_unknown_stream_ends_the_turn() {
    let greet = counters();
    let streams = stream_map(vec![(
        "greet",
        Stream::from(counting_step(&greet, Some(Signal::Route("ghost".to_string())))),
    )]);
    let client = MockClient::with_text("hello");

    run(
        execution_cursor("greet"),
        &streams,
        &client.as_flow_client(),
    )
    .unwrap();

    assert_eq!(greet.prompted.get(), 1);
    assert_eq!(*client.active_stream.borrow(), Some("greet".to_string()));
}

#[test]
fn test_suspending_prompt_resumes_through_its_continuation() {
    let parked: Rc<RefCell<Option<Continuation>>> = Rc::new(RefCell::new(None));
    let slot = Rc::clone(&parked);
    let suspending = Step::builder()
        .satisfied(|| false)
        .prompt_suspending(move |continuation| {
            *slot.borrow_mut() = Some(continuation);
        })
        .build();
    let second = counters();
    let streams = stream_map(vec![(
        "greet",
        Stream::sequence([
            StreamEntry::from(suspending),
            StreamEntry::from(counting_step(&second, None)),
        ]),
    )]);
    let client = MockClient::with_text("hello");

    run(
        execution_cursor("greet"),
        &streams,
        &client.as_flow_client(),
    )
    .unwrap();
    // Engine returned with the prompt suspended; nothing has run past it.
    assert_eq!(second.prompted.get(), 0);

    let continuation = parked.borrow_mut().take().unwrap();
    continuation(Some(Signal::Proceed));
    assert_eq!(second.prompted.get(), 1);
}

#[test]
fn test_extract_all_visits_every_step_once() {
    let shared = counters();
    let step = counting_step(&shared, None);
    let other = counters();
    let streams = stream_map(vec![
        ("main", Stream::from("greet")),
        (
            "greet",
            Stream::sequence([
                StreamEntry::from(Rc::clone(&step)),
                StreamEntry::from("payment"),
            ]),
        ),
        ("payment", Stream::from(Rc::clone(&step))),
        ("end", Stream::from(counting_step(&other, None))),
    ]);
    let part = MessagePart::new(MessageContent::Text("hello".to_string()));

    extract_all(&streams, &part);

    // Shared between two streams, extracted once by identity.
    assert_eq!(shared.extracted.get(), 1);
    assert_eq!(other.extracted.get(), 1);
}

#[test]
fn test_extract_all_skips_main_stream_steps() {
    let main_only = counters();
    let streams = stream_map(vec![(
        "main",
        Stream::from(counting_step(&main_only, None)),
    )]);
    let part = MessagePart::new(MessageContent::Text("hello".to_string()));

    extract_all(&streams, &part);

    assert_eq!(main_only.extracted.get(), 0);
}
