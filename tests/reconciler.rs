// ABOUTME: Integration tests for the background deployment reconciler.
// ABOUTME: Tests record finalization, skipped sweeps and shutdown of the polling loop.

mod support;

use std::sync::Arc;
use std::time::Duration;

use shipyard::deploy::{DeployOptions, LockManager};
use shipyard::model::DeploymentStatus;
use support::Harness;
use tokio::sync::watch;

const SLOW: Duration = Duration::from_secs(3600);

mod finalization {
    use super::*;

    #[tokio::test]
    async fn running_build_keeps_record_open() {
        let h = Harness::new();
        let app = h.app_with_archive("demo").await;
        h.sequencer
            .deploy(&app, DeployOptions::default())
            .await
            .unwrap();

        let report = h.reconciler(SLOW).sweep().await.unwrap();
        assert_eq!(report.examined, 1);
        assert!(report.finalized.is_empty());
        assert_eq!(h.open_count(&app).await, 1);
    }

    #[tokio::test]
    async fn completed_build_finalizes_record() {
        let h = Harness::new();
        let app = h.app_with_archive("demo").await;
        let submitted = h
            .sequencer
            .deploy(&app, DeployOptions::default())
            .await
            .unwrap();
        h.cluster.set_build_finished("demo", Some("Complete"));

        let reconciler = h.reconciler(SLOW);
        let report = reconciler.sweep().await.unwrap();
        assert_eq!(report.finalized.len(), 1);
        assert_eq!(report.finalized[0].id, submitted.record.id);
        assert_eq!(report.finalized[0].status, Some(DeploymentStatus::Completed));

        // Nothing left to do on the next sweep.
        let again = reconciler.sweep().await.unwrap();
        assert_eq!(again.examined, 0);
        assert!(again.finalized.is_empty());

        let records = h.records(&app).await;
        assert_eq!(records[0].status, Some(DeploymentStatus::Completed));
        assert!(records[0].end_time.unwrap() >= records[0].start_time);
    }

    #[tokio::test]
    async fn failed_build_finalizes_record_as_failed() {
        let h = Harness::new();
        let app = h.app_with_archive("demo").await;
        h.sequencer
            .deploy(&app, DeployOptions::default())
            .await
            .unwrap();
        h.cluster.set_build_finished("demo", Some("Failed"));

        let report = h.reconciler(SLOW).sweep().await.unwrap();
        assert_eq!(report.finalized[0].status, Some(DeploymentStatus::Failed));
    }

    #[tokio::test]
    async fn untriggered_record_is_left_alone() {
        let h = Harness::new();
        let app = h.app_with_archive("demo").await;
        LockManager::new(h.store.clone()).open(&app).await.unwrap();
        h.cluster.set_build_finished("demo", Some("Complete"));

        let report = h.reconciler(SLOW).sweep().await.unwrap();
        assert_eq!(report.examined, 1);
        assert_eq!(report.untriggered, 1);
        assert!(report.finalized.is_empty());
        assert_eq!(h.open_count(&app).await, 1);
        assert_eq!(h.cluster.list_calls(), 0);
    }
}

mod robustness {
    use super::*;

    #[tokio::test]
    async fn failing_application_does_not_block_others() {
        let h = Harness::new();
        let broken = h.app_with_archive("broken").await;
        let healthy = h.app_with_archive("healthy").await;
        for app in [&broken, &healthy] {
            h.sequencer
                .deploy(app, DeployOptions::default())
                .await
                .unwrap();
        }
        h.cluster.fail_app("broken");
        h.cluster.set_build_finished("healthy", None);

        let report = h.reconciler(SLOW).sweep().await.unwrap();
        assert_eq!(report.examined, 2);
        assert_eq!(report.errors, 1);
        assert_eq!(report.finalized.len(), 1);
        assert_eq!(report.finalized[0].application, healthy);
        assert_eq!(h.open_count(&broken).await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn overlapping_sweep_is_skipped() {
        let h = Harness::new();
        let app = h.app_with_archive("demo").await;
        h.sequencer
            .deploy(&app, DeployOptions::default())
            .await
            .unwrap();

        let gate = h.cluster.gate_list_builds();
        let reconciler = Arc::new(h.reconciler(SLOW));
        let first = {
            let reconciler = reconciler.clone();
            tokio::spawn(async move { reconciler.sweep().await })
        };

        // Wait until the first sweep is parked inside the cluster query.
        while h.cluster.list_calls() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(reconciler.sweep().await.is_none());

        gate.notify_one();
        let report = first.await.unwrap().expect("first sweep ran");
        assert_eq!(report.examined, 1);
    }

    #[tokio::test]
    async fn loop_finalizes_and_stops_on_shutdown() {
        let h = Harness::new();
        let app = h.app_with_archive("demo").await;
        h.sequencer
            .deploy(&app, DeployOptions::default())
            .await
            .unwrap();
        h.cluster.set_build_finished("demo", Some("Complete"));

        let reconciler = Arc::new(h.reconciler(Duration::from_millis(20)));
        assert_eq!(reconciler.interval(), Duration::from_millis(20));
        let (tx, rx) = watch::channel(false);
        let handle = reconciler.spawn(rx);

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while h.open_count(&app).await > 0 {
            assert!(tokio::time::Instant::now() < deadline, "record never finalized");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("reconciler should stop")
            .unwrap();
    }
}
