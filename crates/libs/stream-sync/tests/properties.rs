//! Sync Property Tests
//!
//! Invariants that must hold for any stream set: lookups, seek safety,
//! reference candidacy, drift idempotence and resume fan-out.

use remotemedia_stream_sync::test_support::MockStream;
use remotemedia_stream_sync::{
    find_fragment_by_timestamp, plan_seek, select_reference, Fragment, PlaybackControl,
    PlaybackIntent, SeekError, SeekableRange, StreamId, StreamObservation, StreamSet,
    SyncConfig, SyncController, WallClockMs,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};

const T: WallClockMs = 1_700_000_000_000;

fn contiguous(count: usize, duration_secs: f64, first_pdt: WallClockMs) -> Vec<Fragment> {
    (0..count)
        .map(|i| {
            Fragment::tagged(
                i as f64 * duration_secs,
                duration_secs,
                first_pdt + (i as f64 * duration_secs * 1000.0) as WallClockMs,
            )
        })
        .collect()
}

fn controller(set: Arc<StreamSet>) -> SyncController {
    let (_tx, rx) = watch::channel(PlaybackIntent::playing_from(Some(T)));
    SyncController::new(SyncConfig::default(), set, rx)
}

#[test]
fn test_lookup_returns_unique_covering_fragment() {
    let fragments = contiguous(20, 2.0, T);

    for (i, fragment) in fragments.iter().enumerate() {
        let pdt = fragment.program_date_time.unwrap();
        for offset in [1, 500, 1_999] {
            let found = find_fragment_by_timestamp(&fragments, pdt + offset).unwrap();
            assert_eq!(found, &fragments[i]);
            let matches = fragments.iter().filter(|f| f.covers(pdt + offset)).count();
            assert_eq!(matches, 1);
        }
    }

    assert!(find_fragment_by_timestamp(&fragments, T - 1).is_none());
    assert!(find_fragment_by_timestamp(&fragments, T + 40_000).is_none());
}

#[test]
fn test_plan_never_targets_outside_ranges() {
    let fragments = contiguous(30, 2.0, T);
    let range_sets = [
        vec![SeekableRange::new(0.0, 60.0)],
        vec![SeekableRange::new(10.0, 20.0), SeekableRange::new(40.0, 45.0)],
        vec![SeekableRange::new(59.5, 70.0)],
    ];

    for ranges in &range_sets {
        for target in (T..T + 60_000).step_by(137) {
            match plan_seek(Some(fragments.as_slice()), ranges, target) {
                Ok(plan) => assert!(ranges.iter().any(|r| r.contains(plan.target_secs))),
                Err(SeekError::TargetOutsideSeekable { target_secs }) => {
                    assert!(!ranges.iter().any(|r| r.contains(target_secs)))
                }
                Err(other) => panic!("unexpected plan failure: {:?}", other),
            }
        }
    }
}

#[test]
fn test_all_paused_never_yields_reference() {
    for count in 1..6 {
        let observations: Vec<StreamObservation> = (0..count)
            .map(|i| StreamObservation {
                id: StreamId::new(format!("s{}", i)),
                position: T + i as WallClockMs * 1_000,
                paused: true,
            })
            .collect();
        assert!(select_reference(&observations, true).is_none());
    }
}

#[tokio::test]
async fn test_drift_within_tolerance_issues_nothing() {
    let set = Arc::new(StreamSet::new());
    set.insert("ref", Arc::new(MockStream::new().playing_at(T)));

    let followers: Vec<Arc<MockStream>> = [0, 250, 499, 500]
        .iter()
        .map(|lag| {
            Arc::new(
                MockStream::new()
                    .playing_at(T - lag)
                    .with_fragments(contiguous(4, 2.0, T - 4_000))
                    .with_seekable(vec![SeekableRange::new(0.0, 8.0)]),
            )
        })
        .collect();
    for (i, follower) in followers.iter().enumerate() {
        set.insert(format!("f{}", i), follower.clone() as Arc<dyn PlaybackControl>);
    }

    let mut controller = controller(set);
    for _ in 0..3 {
        controller.tick();
    }

    for follower in &followers {
        assert!(follower.seeks().is_empty());
        assert_eq!(follower.resume_count(), 0);
    }
}

#[tokio::test]
async fn test_resume_coordinator_wakes_one_stream_per_tick() {
    let set = Arc::new(StreamSet::new());
    let streams: Vec<Arc<MockStream>> = (0..4)
        .map(|i| {
            Arc::new(
                MockStream::new()
                    .paused_at(T)
                    .with_fragments(vec![Fragment::tagged(0.0, 2.0, T + i * 100)])
                    .rejecting_resume(),
            )
        })
        .collect();
    for (i, stream) in streams.iter().enumerate() {
        set.insert(format!("s{}", i), stream.clone() as Arc<dyn PlaybackControl>);
    }

    let mut controller = controller(set);
    controller.tick();
    let total: usize = streams.iter().map(|s| s.resume_count()).sum();
    assert_eq!(total, 1);
    assert_eq!(streams[0].resume_count(), 1);

    // Rejected resume is retried on the next tick, still one stream at a time
    controller.tick();
    let total: usize = streams.iter().map(|s| s.resume_count()).sum();
    assert_eq!(total, 2);
    assert_eq!(streams[0].resume_count(), 2);
    assert_eq!(streams[0].error(), None);
}

#[tokio::test(start_paused = true)]
async fn test_hung_resume_does_not_block_ticks() {
    let set = Arc::new(StreamSet::new());
    set.insert("ref", Arc::new(MockStream::new().playing_at(T)));
    let stuck = Arc::new(
        MockStream::new()
            .playing_at(T - 3_000)
            .with_fragments(contiguous(4, 2.0, T - 4_000))
            .with_seekable(vec![SeekableRange::new(0.0, 8.0)])
            .hanging_resume(),
    );
    set.insert("stuck", stuck.clone());

    let controller = controller(set);
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let handle = controller.spawn(shutdown_rx);

    tokio::time::sleep(Duration::from_millis(1_050)).await;
    shutdown_tx.send(()).unwrap();
    let controller = handle.await.unwrap();

    // The resume issued on the first tick never settles, yet the loop keeps ticking
    assert_eq!(stuck.seeks(), vec![4.0]);
    assert_eq!(stuck.resume_count(), 1);
    assert!(controller.ticks() >= 10);
}
