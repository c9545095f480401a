mod common;

use common::test_helpers::{advance_ms, settle};
use pacer::sleeper::TrackingSleeper;
use pacer::{DebouncedFn, DebouncedValue, ThrottledFn, ThrottledValue};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(String) + Send + Sync + 'static) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    (log, move |q: String| sink.lock().expect("log lock").push(q))
}

#[tokio::test(start_paused = true)]
async fn debounced_value_waits_out_the_quiet_period() {
    let query = DebouncedValue::new(String::new(), Duration::from_millis(500));
    query.set("matrix".to_string());

    advance_ms(499).await;
    assert_eq!(query.get(), "");
    assert!(query.is_pending());

    advance_ms(1).await;
    assert_eq!(query.get(), "matrix");
    assert!(!query.is_pending());
}

#[tokio::test(start_paused = true)]
async fn debounced_search_issues_only_the_final_query() {
    let (log, on_search) = recorder();
    let search = DebouncedFn::new(Duration::from_millis(300), on_search);

    search.call("a".to_string());
    advance_ms(100).await;
    search.call("b".to_string());
    advance_ms(100).await;
    search.call("c".to_string());

    advance_ms(299).await;
    assert!(log.lock().unwrap().is_empty());

    advance_ms(1).await;
    assert_eq!(*log.lock().unwrap(), vec!["c".to_string()]);

    advance_ms(1_000).await;
    assert_eq!(log.lock().unwrap().len(), 1, "one burst, one invocation");
}

#[tokio::test(start_paused = true)]
async fn debounced_value_notifies_subscribers_once_per_burst() {
    let value = DebouncedValue::new(0u32, Duration::from_millis(50));
    let mut rx = value.subscribe();
    for i in 1..=10 {
        value.set(i);
        advance_ms(10).await;
    }
    assert!(!rx.has_changed().unwrap());

    advance_ms(50).await;
    assert!(rx.has_changed().unwrap());
    assert_eq!(*rx.borrow_and_update(), 10);
}

#[tokio::test(start_paused = true)]
async fn dropping_a_debounced_fn_cancels_its_timer() {
    let (log, on_search) = recorder();
    let search = DebouncedFn::new(Duration::from_millis(300), on_search);
    search.call("lost".to_string());
    drop(search);

    advance_ms(1_000).await;
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn debounce_delays_go_through_the_sleeper() {
    let sleeper = TrackingSleeper::default();
    let value = DebouncedValue::new(0u8, Duration::from_millis(250)).with_sleeper(sleeper.clone());
    value.set(1);
    value.set(2);
    assert_eq!(sleeper.calls(), vec![Duration::from_millis(250); 2]);

    // The tracking sleeper resolves at once; only the restarted timer emits.
    settle().await;
    assert_eq!(value.get(), 2);
}

#[tokio::test(start_paused = true)]
async fn throttled_value_emits_at_most_once_per_interval() {
    let position = ThrottledValue::new(0u64, Duration::from_millis(100));
    let mut rx = position.subscribe();
    let mut emissions = 0;

    for step in 1..=100u64 {
        advance_ms(10).await;
        if rx.has_changed().unwrap() {
            rx.borrow_and_update();
            emissions += 1;
        }
        position.set(step * 10);
    }
    assert!(emissions <= 11, "{emissions} emissions in one second");
    assert!(emissions >= 9, "{emissions} emissions in one second");

    advance_ms(100).await;
    assert_eq!(position.get(), 1_000, "trailing emission catches up with the last input");
}

#[tokio::test(start_paused = true)]
async fn throttled_value_emits_immediately_after_a_quiet_interval() {
    let position = ThrottledValue::new(0u64, Duration::from_millis(100));
    advance_ms(250).await;
    position.set(42);
    assert_eq!(position.get(), 42);
    assert!(!position.is_pending());
}

#[tokio::test(start_paused = true)]
async fn scroll_handler_runs_twice_for_four_spaced_events() {
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = runs.clone();
    let on_scroll = ThrottledFn::new(Duration::from_millis(500), move |_offset: u32| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let mut elapsed = 0;
    for at in [0u64, 100, 600, 1_050] {
        advance_ms(at - elapsed).await;
        elapsed = at;
        on_scroll.call(at as u32);
    }
    assert_eq!(runs.load(Ordering::SeqCst), 2);

    advance_ms(5_000).await;
    assert_eq!(runs.load(Ordering::SeqCst), 2, "dropped calls are never replayed");
}
