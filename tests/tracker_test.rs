mod common;

use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use common::{FakeApi, Reply, SharedBuf};
use payment_tracker::config::Config;
use payment_tracker::error::{CopyError, FetchError, TIMEOUT_MESSAGE};
use payment_tracker::models::{NewPayment, PaymentId, Tone};
use payment_tracker::services::{
    Clipboard, ClipboardProvider, ManualClock, Osc52Clipboard, PaymentSource, PaymentTracker,
    Phase, TrackerHandle, TrackerSettings,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};

fn clock() -> ManualClock {
    ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
}

fn settings() -> TrackerSettings {
    TrackerSettings::from(&Config::new("http://localhost:8000"))
}

fn waiting() -> Reply {
    Reply::Payment(json!({
        "payment_id": 5077125051u64,
        "order_id": "booking_1",
        "payment_status": "waiting",
        "pay_address": "TQn9Y2khEsLJW1ChVWFMSMeRDow5KcbLSE",
        "pay_amount": 49.12,
        "pay_currency": "usdttrc20"
    }))
}

fn with_status(status: &str) -> Reply {
    Reply::Payment(json!({"payment_id": 5077125051u64, "payment_status": status}))
}

fn spawn(api: &Arc<FakeApi>, clock: &ManualClock, source: PaymentSource) -> TrackerHandle {
    PaymentTracker::new(api.clone(), settings())
        .with_clock(clock.clone())
        .spawn(source)
}

fn new_order() -> PaymentSource {
    PaymentSource::Create(NewPayment::new("booking_1", 49.0))
}

async fn wait_for_phase(handle: &TrackerHandle, phase: Phase) {
    handle
        .subscribe()
        .wait_for(|snapshot| snapshot.phase == phase)
        .await
        .expect("tracker published the phase");
}

#[tokio::test(start_paused = true)]
async fn created_payment_awaits_with_full_countdown_and_polls_after_ten_seconds() {
    let api = FakeApi::new(waiting(), vec![waiting()]);
    let clock = clock();
    let handle = spawn(&api, &clock, new_order());

    wait_for_phase(&handle, Phase::Awaiting).await;
    let snapshot = handle.snapshot();
    assert_eq!(snapshot.status_view().label, "Awaiting payment");
    assert_eq!(snapshot.status_view().tone, Tone::Warning);
    assert_eq!(snapshot.formatted_timer(), "15:00");
    assert!(snapshot.shows_timer());

    let request = api.last_request().unwrap();
    assert_eq!(request.order_id, "booking_1");
    assert_eq!(request.pay_currency, "usdttrc20");
    assert_eq!(request.price_currency, "usd");
    assert_eq!(request.order_description, "Order booking_1");
    assert_eq!(api.create_calls(), 1);

    sleep(Duration::from_millis(9_500)).await;
    assert_eq!(api.lookup_calls(), 0);

    sleep(Duration::from_secs(1)).await;
    assert_eq!(api.lookup_calls(), 1);
    assert_eq!(handle.snapshot().phase, Phase::Awaiting);
}

#[tokio::test(start_paused = true)]
async fn tick_recomputes_countdown_without_network() {
    let api = FakeApi::new(waiting(), vec![waiting()]);
    let clock = clock();
    let handle = spawn(&api, &clock, new_order());
    wait_for_phase(&handle, Phase::Awaiting).await;

    clock.advance(ChronoDuration::seconds(61));
    sleep(Duration::from_millis(1_500)).await;
    assert_eq!(handle.snapshot().formatted_timer(), "13:59");

    clock.advance(ChronoDuration::hours(1));
    sleep(Duration::from_secs(1)).await;
    assert_eq!(handle.snapshot().seconds_remaining, 0);
    assert_eq!(api.lookup_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn existing_confirming_payment_keeps_polling() {
    let api = FakeApi::new(Reply::Transport, vec![with_status("confirming")]);
    let clock = clock();
    let handle = spawn(&api, &clock, PaymentSource::Existing(PaymentId::from(5077125051u64)));

    wait_for_phase(&handle, Phase::Awaiting).await;
    assert_eq!(handle.snapshot().status_view().label, "Network confirmation");
    assert_eq!(handle.snapshot().status_view().tone, Tone::Info);
    assert_eq!(api.create_calls(), 0);

    sleep(Duration::from_secs(35)).await;
    assert_eq!(api.lookup_calls(), 4);
    assert!(handle.is_running());
}

#[tokio::test(start_paused = true)]
async fn finished_poll_stops_polling_and_completes_once() {
    let api = FakeApi::new(
        waiting(),
        vec![with_status("waiting"), with_status("finished"), with_status("refunded")],
    );
    let clock = clock();
    let mut handle = spawn(&api, &clock, new_order());

    let completion = handle.completion().await.expect("payment completes");
    assert!(completion.success);
    assert_eq!(completion.payment.pay_address(), "TQn9Y2khEsLJW1ChVWFMSMeRDow5KcbLSE");
    assert_eq!(api.lookup_calls(), 2);

    sleep(Duration::from_secs(60)).await;
    assert_eq!(api.lookup_calls(), 2);
    assert!(!handle.is_running());
    assert_eq!(handle.snapshot().phase, Phase::Succeeded);
    assert_eq!(handle.snapshot().status_view().tone, Tone::Success);
    assert!(handle.completion().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn terminal_lookup_completes_without_polling() {
    let api = FakeApi::new(Reply::Transport, vec![with_status("expired")]);
    let clock = clock();
    let mut handle = spawn(&api, &clock, PaymentSource::Existing(PaymentId::new("42")));

    let completion = handle.completion().await.expect("expired is terminal");
    assert!(!completion.success);

    sleep(Duration::from_secs(30)).await;
    assert_eq!(api.lookup_calls(), 1);
    assert_eq!(handle.snapshot().phase, Phase::Failed);
    assert_eq!(handle.snapshot().status_view().tone, Tone::Danger);
}

#[tokio::test(start_paused = true)]
async fn creation_timeout_shows_timeout_message() {
    let api = FakeApi::new(Reply::Hang, vec![]);
    let clock = clock();
    let started = Instant::now();
    let mut handle = spawn(&api, &clock, new_order());

    wait_for_phase(&handle, Phase::Error).await;
    assert!(started.elapsed() >= Duration::from_secs(25));

    let snapshot = handle.snapshot();
    assert_eq!(snapshot.error, Some(FetchError::Timeout));
    assert_eq!(snapshot.error.unwrap().to_string(), TIMEOUT_MESSAGE);
    assert!(handle.snapshot().can_retry());
    assert!(handle.completion().await.is_none());
    assert_eq!(api.lookup_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn creation_error_surfaces_backend_detail() {
    let api = FakeApi::new(Reply::Status(400, Some("Amount is below the minimum")), vec![]);
    let clock = clock();
    let handle = spawn(&api, &clock, new_order());

    wait_for_phase(&handle, Phase::Error).await;
    let error = handle.snapshot().error.unwrap();
    assert!(!error.is_timeout());
    assert_eq!(error.to_string(), "Amount is below the minimum");
}

#[tokio::test(start_paused = true)]
async fn lookup_error_without_detail_uses_generic_message() {
    let api = FakeApi::new(Reply::Transport, vec![Reply::Status(502, None)]);
    let clock = clock();
    let handle = spawn(&api, &clock, PaymentSource::Existing(PaymentId::new("42")));

    wait_for_phase(&handle, Phase::Error).await;
    assert_eq!(
        handle.snapshot().error.unwrap().to_string(),
        "Failed to load payment"
    );
}

#[tokio::test(start_paused = true)]
async fn poll_failures_are_swallowed() {
    let api = FakeApi::new(
        waiting(),
        vec![Reply::Transport, Reply::Status(500, Some("boom")), with_status("confirmed")],
    );
    let clock = clock();
    let mut handle = spawn(&api, &clock, new_order());

    wait_for_phase(&handle, Phase::Awaiting).await;
    sleep(Duration::from_secs(21)).await;
    assert_eq!(handle.snapshot().phase, Phase::Awaiting);
    assert_eq!(handle.snapshot().error, None);

    let completion = handle.completion().await.expect("third poll confirms");
    assert!(completion.success);
    assert_eq!(api.lookup_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn outstanding_poll_blocks_the_next_one() {
    let api = FakeApi::new(waiting(), vec![Reply::Hang]);
    let clock = clock();
    let handle = spawn(&api, &clock, new_order());
    wait_for_phase(&handle, Phase::Awaiting).await;

    // Poll intervals at 20s and 30s fall while the first lookup hangs.
    sleep(Duration::from_secs(34)).await;
    assert_eq!(api.lookup_calls(), 1);
    assert_eq!(handle.snapshot().phase, Phase::Awaiting);

    // The hung lookup is abandoned at 35s and polling resumes.
    sleep(Duration::from_secs(2)).await;
    assert_eq!(api.lookup_calls(), 2);
    assert!(handle.is_running());
}

#[tokio::test(start_paused = true)]
async fn hung_poll_times_out_and_tracking_continues() {
    let api = FakeApi::new(waiting(), vec![Reply::Hang, with_status("finished")]);
    let clock = clock();
    let started = Instant::now();
    let mut handle = spawn(&api, &clock, new_order());

    let completion = tokio::time::timeout(Duration::from_secs(3600), handle.completion())
        .await
        .expect("tracker recovers from the hung poll")
        .expect("payment completes");

    assert!(completion.success);
    assert!(started.elapsed() >= Duration::from_secs(35));
    assert_eq!(api.lookup_calls(), 2);
    assert_eq!(handle.snapshot().phase, Phase::Succeeded);
    assert_eq!(handle.snapshot().error, None);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_handle_stops_both_timers() {
    let api = FakeApi::new(waiting(), vec![waiting()]);
    let clock = clock();
    let handle = spawn(&api, &clock, new_order());
    wait_for_phase(&handle, Phase::Awaiting).await;

    let mut updates = handle.subscribe();
    updates.borrow_and_update();
    drop(handle);

    sleep(Duration::from_secs(60)).await;
    assert_eq!(api.lookup_calls(), 0);
    assert!(updates.changed().await.is_err());
}

#[tokio::test(start_paused = true)]
async fn copies_address_and_amount_through_fallback() {
    struct Unavailable;

    #[async_trait::async_trait]
    impl ClipboardProvider for Unavailable {
        fn name(&self) -> &str {
            "unavailable"
        }

        async fn write_text(
            &self,
            _text: &str,
        ) -> Result<(), payment_tracker::error::ClipboardError> {
            Err(payment_tracker::error::ClipboardError::Unavailable)
        }
    }

    let api = FakeApi::new(waiting(), vec![waiting()]);
    let clock = clock();
    let handle = spawn(&api, &clock, new_order());
    wait_for_phase(&handle, Phase::Awaiting).await;

    let buf = SharedBuf::default();
    let clipboard = Clipboard::new(Unavailable, Osc52Clipboard::new(buf.clone()));
    handle.copy_pay_address(&clipboard).await.unwrap();
    handle.copy_pay_amount(&clipboard).await.unwrap();
    assert_eq!(
        buf.contents(),
        format!(
            "{}{}",
            Osc52Clipboard::sequence("TQn9Y2khEsLJW1ChVWFMSMeRDow5KcbLSE"),
            Osc52Clipboard::sequence("49.12000")
        )
    );

    let broken = Clipboard::new(Unavailable, Unavailable);
    assert_eq!(handle.copy_pay_address(&broken).await, Err(CopyError::Address));
    assert_eq!(handle.copy_pay_amount(&broken).await, Err(CopyError::Amount));
}
