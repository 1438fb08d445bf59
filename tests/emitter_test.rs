// End-to-end tests against a loopback receiver


use std::time::Duration;

use spectra_emitter::{emit, EmitError, EmitPlan, Emitter, Pacing, StopCondition};
use test_helpers::{bind_receiver, decode_counter, spawn_collector, RecordingObserver};
use tokio::sync::watch;

#[tokio::test]
async fn test_hundred_packets_arrive_in_order() {
    let (receiver, port) = bind_receiver().await;
    let collector = spawn_collector(receiver, 100, Duration::from_secs(2));

    let plan = EmitPlan::fixed("127.0.0.1", port, 100, Duration::from_millis(1));
    let mut observer = RecordingObserver::default();
    let summary = emit(plan, None, &mut observer).await.unwrap();

    assert_eq!(summary.packets_sent, 100);
    assert_eq!(summary.bytes_sent, 800);
    assert!(summary.is_complete());

    let datagrams = collector.await.unwrap();
    assert_eq!(datagrams.len(), 100);
    let counters: Vec<u64> = datagrams.iter().map(|d| decode_counter(d)).collect();
    assert_eq!(counters, (0..100).collect::<Vec<u64>>());
}

#[tokio::test]
async fn test_per_packet_progress_for_count_runs() {
    let (receiver, port) = bind_receiver().await;
    let _collector = spawn_collector(receiver, 5, Duration::from_secs(1));

    let plan = EmitPlan::fixed("127.0.0.1", port, 5, Duration::from_millis(1));
    let mut observer = RecordingObserver::default();
    emit(plan.clone(), None, &mut observer).await.unwrap();

    let (started_plan, target) = observer.started.expect("on_start called");
    assert_eq!(started_plan, plan);
    assert_eq!(target.port(), port);

    assert_eq!(observer.progress.len(), 5);
    for (i, progress) in observer.progress.iter().enumerate() {
        assert_eq!(progress.packets_sent, i as u64 + 1);
        assert_eq!(progress.last_sequence, i as u64);
        assert_eq!(progress.total, Some(5));
    }
    assert_eq!(observer.summary.map(|s| s.packets_sent), Some(5));
}

#[tokio::test]
async fn test_fixed_interval_spacing() {
    let (receiver, port) = bind_receiver().await;
    let _collector = spawn_collector(receiver, 11, Duration::from_secs(1));

    // Ten gaps of 20 ms: the run cannot finish sooner than 200 ms
    let plan = EmitPlan::fixed("127.0.0.1", port, 11, Duration::from_millis(20));
    let mut observer = RecordingObserver::default();
    let summary = emit(plan, None, &mut observer).await.unwrap();

    assert_eq!(summary.packets_sent, 11);
    assert!(summary.elapsed >= Duration::from_millis(200), "elapsed {:?}", summary.elapsed);
    assert!(summary.elapsed < Duration::from_secs(2), "elapsed {:?}", summary.elapsed);
}

#[tokio::test]
async fn test_bitrate_within_tolerance() {
    let (receiver, port) = bind_receiver().await;
    let _collector = spawn_collector(receiver, usize::MAX, Duration::from_millis(500));

    // 0.256 Mbps is 4000 packets per second
    let plan = EmitPlan::bitrate("127.0.0.1", port, 0.256, Duration::from_secs(1));
    let mut observer = RecordingObserver::default();
    let summary = emit(plan, None, &mut observer).await.unwrap();

    let achieved = summary.achieved_mbps();
    assert!(
        (achieved - 0.256).abs() <= 0.256 * 0.10,
        "achieved {:.4} Mbps over {:?} ({} packets)",
        achieved,
        summary.elapsed,
        summary.packets_sent
    );
    assert!(summary.requested.is_none());
    assert!(!summary.interrupted);

    // Progress lines every 1000 packets while the run is duration-bounded
    assert!(!observer.progress.is_empty());
    assert!(observer.progress.iter().all(|p| p.total.is_none()));
    assert!(observer.progress.iter().all(|p| p.packets_sent % 1000 == 0));
}

#[tokio::test]
async fn test_duration_run_stops_on_time() {
    let (receiver, port) = bind_receiver().await;
    let _collector = spawn_collector(receiver, usize::MAX, Duration::from_millis(500));

    let plan = EmitPlan::fixed("127.0.0.1", port, 1, Duration::from_millis(10))
        .with_stop(StopCondition::Duration(Duration::from_millis(300)));
    let mut observer = RecordingObserver::default();
    let summary = emit(plan, None, &mut observer).await.unwrap();

    // Deadlines at 0, 10, ..., 290 ms fit inside the window
    assert!(summary.packets_sent <= 30, "sent {}", summary.packets_sent);
    assert!(summary.packets_sent >= 20, "sent {}", summary.packets_sent);
    assert!(summary.elapsed < Duration::from_millis(600));
}

#[tokio::test]
async fn test_unpaced_count_run() {
    let (receiver, port) = bind_receiver().await;
    let collector = spawn_collector(receiver, 500, Duration::from_secs(1));

    let plan = EmitPlan::fixed("127.0.0.1", port, 500, Duration::from_millis(1))
        .with_pacing(Pacing::Unpaced)
        .with_progress_every(0);
    let mut observer = RecordingObserver::default();
    let summary = emit(plan, None, &mut observer).await.unwrap();
    assert_eq!(summary.packets_sent, 500);

    // Loopback may drop under burst; whatever arrives must be in order and unique
    let counters: Vec<u64> = collector
        .await
        .unwrap()
        .iter()
        .map(|d| decode_counter(d))
        .collect();
    assert!(counters.windows(2).all(|w| w[0] < w[1]));
    assert!(counters.iter().all(|&c| c < 500));
}

#[tokio::test]
async fn test_interrupt_mid_run() {
    let (receiver, port) = bind_receiver().await;
    let collector = spawn_collector(receiver, 10_000, Duration::from_millis(300));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let _ = shutdown_tx.send(true);
    });

    let plan = EmitPlan::fixed("127.0.0.1", port, 10_000, Duration::from_millis(5));
    let mut observer = RecordingObserver::default();
    let summary = emit(plan, Some(shutdown_rx), &mut observer).await.unwrap();

    assert!(summary.interrupted);
    assert!(!summary.is_complete());
    assert!(summary.packets_sent > 0);
    assert!(summary.packets_sent < 10_000);
    assert_eq!(summary.requested, Some(10_000));
    assert_eq!(observer.summary.as_ref(), Some(&summary));

    let received = collector.await.unwrap();
    assert!(received.len() as u64 <= summary.packets_sent);
    let counters: Vec<u64> = received.iter().map(|d| decode_counter(d)).collect();
    assert_eq!(counters, (0..received.len() as u64).collect::<Vec<u64>>());
}

#[tokio::test]
async fn test_invalid_plans_fail_before_sending() {
    let mut observer = RecordingObserver::default();

    let zero_rate = EmitPlan::bitrate("127.0.0.1", 2023, 0.0, Duration::from_secs(1));
    assert!(matches!(
        emit(zero_rate, None, &mut observer).await,
        Err(EmitError::InvalidPlan(_))
    ));

    let zero_duration = EmitPlan::bitrate("127.0.0.1", 2023, 1.0, Duration::ZERO);
    assert!(matches!(
        emit(zero_duration, None, &mut observer).await,
        Err(EmitError::InvalidPlan(_))
    ));

    assert!(observer.started.is_none());
    assert!(observer.summary.is_none());
}

#[tokio::test]
async fn test_unresolvable_host_is_fatal() {
    let plan = EmitPlan::fixed("host.invalid.", 2023, 1, Duration::from_millis(1));
    let result = Emitter::bind(plan).await;
    assert!(matches!(result, Err(EmitError::Resolve { .. })));
}

#[tokio::test]
async fn test_emitter_exposes_target() {
    let (_receiver, port) = bind_receiver().await;
    let plan = EmitPlan::fixed("127.0.0.1", port, 1, Duration::from_millis(1));
    let emitter = Emitter::bind(plan).await.unwrap();
    assert_eq!(emitter.target().port(), port);
    assert!(emitter.local_addr().unwrap().ip().is_unspecified());
    assert_eq!(emitter.plan().stop, StopCondition::Count(1));
}
