use chrono::NaiveDate;
use poolwatch_task_ledger::types::{TimeWindow, TokenPair};
use poolwatch_task_ledger::{LedgerOptions, MemoryTaskLedger, PgTaskLedger, TaskLedger};

fn date(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("test date")
}

fn options() -> LedgerOptions {
    LedgerOptions {
        genesis: date("2024-01-01"),
        window_days: 1,
    }
}

fn pairs() -> Vec<TokenPair> {
    vec![
        TokenPair::new("T0", "T1", 3000),
        TokenPair::new("T0", "T1", 500),
        TokenPair::new("T2", "T3", 10000),
    ]
}

fn pg_ledger() -> Option<PgTaskLedger> {
    let url = std::env::var("POOLWATCH_TEST_PG_URL").ok()?;
    let schema = format!("pw_{}", uuid::Uuid::new_v4().simple());
    let ledger = PgTaskLedger::new(url, options()).with_schema(schema);
    ledger.init_schema().expect("init ledger schema");
    Some(ledger)
}

fn assert_window_continuity(ledger: &dyn TaskLedger) {
    let mut previous: Option<TimeWindow> = None;
    for _ in 0..5 {
        let window = ledger.next_time_window().expect("next window");
        assert!(window.end > window.start);
        if let Some(prev) = previous {
            assert_eq!(window.start, prev.end, "gap or overlap after {prev}");
        }
        assert!(ledger
            .mark_window_complete(window.start, window.end)
            .expect("complete window"));
        previous = Some(window);
    }
    let windows = ledger.windows().expect("list windows");
    assert_eq!(windows.len(), 5);
    assert!(windows.iter().all(|w| w.completed));
    assert!(windows.windows(2).all(|pair| pair[0].end == pair[1].start));
}

fn assert_idempotent_completion(ledger: &dyn TaskLedger) {
    let window = ledger.next_time_window().expect("next window");
    assert_eq!(window, TimeWindow::new(date("2024-01-01"), date("2024-01-02")));

    assert_eq!(ledger.ensure_token_pairs(&window, &pairs()).expect("seed"), 3);
    assert_eq!(ledger.ensure_token_pairs(&window, &pairs()).expect("reseed"), 0);

    assert!(ledger
        .mark_token_pair_complete(&window, "T0", "T1", 3000)
        .expect("complete pair"));
    let after_first = ledger.token_pairs(&window).expect("pairs");
    assert!(ledger
        .mark_token_pair_complete(&window, "T0", "T1", 3000)
        .expect("complete pair again"));
    assert_eq!(ledger.token_pairs(&window).expect("pairs"), after_first);

    let open = ledger
        .next_incomplete_token_pairs(&window)
        .expect("open pairs");
    assert_eq!(
        open.iter().map(|t| t.pair.clone()).collect::<Vec<_>>(),
        vec![TokenPair::new("T0", "T1", 500), TokenPair::new("T2", "T3", 10000)]
    );
    assert!(!ledger
        .mark_token_pair_complete(&window, "T9", "T1", 3000)
        .expect("unknown pair"));

    assert!(ledger
        .mark_window_complete(window.start, window.end)
        .expect("complete window"));
    let after_first = ledger.windows().expect("windows");
    assert!(ledger
        .mark_window_complete(window.start, window.end)
        .expect("complete window again"));
    assert_eq!(ledger.windows().expect("windows"), after_first);
    assert!(!ledger
        .mark_window_complete(date("1999-01-01"), date("1999-01-02"))
        .expect("unknown window"));
}

fn assert_incomplete_window_is_reused(ledger: &dyn TaskLedger) {
    let first = ledger.next_time_window().expect("first");
    let again = ledger.next_time_window().expect("again");
    assert_eq!(first, again);
    assert_eq!(ledger.windows().expect("windows").len(), 1);
}

#[test]
fn memory_ledger_windows_are_contiguous() {
    assert_window_continuity(&MemoryTaskLedger::new(options()));
}

#[test]
fn memory_ledger_completion_is_idempotent() {
    assert_idempotent_completion(&MemoryTaskLedger::new(options()));
}

#[test]
fn memory_ledger_reuses_incomplete_window() {
    assert_incomplete_window_is_reused(&MemoryTaskLedger::new(options()));
}

#[test]
fn memory_ledger_honours_multi_day_windows() {
    let ledger = MemoryTaskLedger::new(LedgerOptions {
        genesis: date("2024-02-27"),
        window_days: 3,
    });
    let first = ledger.next_time_window().expect("first");
    assert_eq!(first.end, date("2024-03-01"));
    ledger
        .mark_window_complete(first.start, first.end)
        .expect("complete");
    let second = ledger.next_time_window().expect("second");
    assert_eq!(second, TimeWindow::new(date("2024-03-01"), date("2024-03-04")));
}

#[test]
fn pg_ledger_windows_are_contiguous() {
    let Some(ledger) = pg_ledger() else {
        eprintln!("POOLWATCH_TEST_PG_URL unset, skipping");
        return;
    };
    assert_window_continuity(&ledger);
}

#[test]
fn pg_ledger_completion_is_idempotent() {
    let Some(ledger) = pg_ledger() else {
        eprintln!("POOLWATCH_TEST_PG_URL unset, skipping");
        return;
    };
    assert_idempotent_completion(&ledger);
}

#[test]
fn pg_ledger_concurrent_callers_create_one_window() {
    let Some(ledger) = pg_ledger() else {
        eprintln!("POOLWATCH_TEST_PG_URL unset, skipping");
        return;
    };
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let ledger = ledger.clone();
            std::thread::spawn(move || ledger.next_time_window().expect("next window"))
        })
        .collect();
    let seen: Vec<TimeWindow> = handles
        .into_iter()
        .map(|h| h.join().expect("join caller"))
        .collect();
    assert!(seen.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(ledger.windows().expect("windows").len(), 1);
}

#[test]
fn pg_ledger_init_schema_twice_is_harmless() {
    let Some(ledger) = pg_ledger() else {
        eprintln!("POOLWATCH_TEST_PG_URL unset, skipping");
        return;
    };
    ledger.init_schema().expect("second init");
    assert_incomplete_window_is_reused(&ledger);
}
