//! Per-detector polling loop.
//!
//! Each cycle walks the same phases:
//!
//! 1. FETCH       ask the frame server for a frame (skipped while either slot is full)
//! 2. WAIT_FRAME  wait up to 30 s; nothing or an empty frame restarts the cycle
//! 3. MOTION      motion-triggered detectors sleep one cycle when the scene is still
//! 4. SUBMIT      zero-wait image query
//! 5. METADATA    live review snapshot, dropped if the slot is full
//! 6. POLL        re-fetch the query until `cycle_time` elapses; the first decisive
//!    result publishes a CancelNotice and notifies once
//! 7. SETTLE      with no decisive result, publish a default CancelNotice
//!
//! Every cycle runs inside a failure boundary: errors and panics are logged and the
//! loop starts over at FETCH.

use anyhow::{anyhow, Context, Result};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::RecvTimeoutError;
use uuid::Uuid;

use crate::config::{DetectorConfig, TriggerType, MAX_CYCLE_TIME};
use crate::frame::Frame;
use crate::inference::{DetectorInfo, InferenceClient, InferenceConnector, Query};
use crate::messages::{CancelNotice, FetchRequest, LiveReviewMetadata};
use crate::motion::MotionDetector;
use crate::notify::NotificationDispatcher;
use crate::queue::{Delivery, WorkerQueues};

pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.9;
pub const MAX_POLL_DELAY: Duration = Duration::from_millis(500);
pub const FRAME_TIMEOUT: Duration = Duration::from_secs(30);

/// Submissions never wait server-side; results are polled.
const QUERY_WAIT: Duration = Duration::ZERO;
const SLEEP_SLICE: Duration = Duration::from_millis(100);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No frame arrived in time, or the frame server sent an empty one.
    NoFrame,
    /// The motion gate found a still scene.
    NoMotion,
    /// The query was polled until the deadline.
    Settled { crossed: bool, polls: u32 },
    /// Stop was requested mid-cycle.
    Stopped,
}

pub struct DetectorWorker {
    index: usize,
    config: DetectorConfig,
    queues: WorkerQueues,
    client: Box<dyn InferenceClient>,
    detector: DetectorInfo,
    threshold: f64,
    motion: Option<MotionDetector>,
    dispatcher: Option<NotificationDispatcher>,
    cycle_time: Duration,
    poll_delay: Duration,
    frame_timeout: Duration,
    shutdown: Arc<AtomicBool>,
}

impl DetectorWorker {
    /// Validates the trigger, connects to the inference service and resolves the
    /// confidence threshold. Fails for triggers without an implementation.
    pub fn new(
        index: usize,
        config: DetectorConfig,
        queues: WorkerQueues,
        connector: &dyn InferenceConnector,
        shutdown: Arc<AtomicBool>,
    ) -> Result<Self> {
        let motion = match config.trigger_type {
            TriggerType::Motion => Some(MotionDetector::new(
                config.motion_percent,
                config.motion_threshold,
            )),
            TriggerType::Time => None,
            TriggerType::Pin | TriggerType::Http => {
                return Err(anyhow!(
                    "detector '{}': trigger type [{}] not yet supported",
                    config.id,
                    config.trigger_type
                ))
            }
        };
        if config.image_source_index.is_none() {
            return Err(anyhow!("detector '{}' has no image source", config.id));
        }

        let cycle_time = config.cycle_time;
        if cycle_time.is_zero() || cycle_time > MAX_CYCLE_TIME {
            return Err(anyhow!(
                "detector '{}': cycle_time {:?} outside 0..={:?}",
                config.id,
                cycle_time,
                MAX_CYCLE_TIME
            ));
        }
        let poll_delay = cycle_time.min(MAX_POLL_DELAY);

        let client = connector
            .connect()
            .with_context(|| format!("detector '{}': connect to inference service", config.id))?;
        let detector = client
            .detector(&config.id)
            .with_context(|| format!("detector '{}': look up detector", config.id))?;
        let threshold = detector
            .confidence_threshold
            .or(config.confidence_threshold)
            .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD);
        let dispatcher = config
            .notifications
            .as_ref()
            .map(NotificationDispatcher::from_options);

        Ok(Self {
            index,
            config,
            queues,
            client,
            detector,
            threshold,
            motion,
            dispatcher,
            cycle_time,
            poll_delay,
            frame_timeout: FRAME_TIMEOUT,
            shutdown,
        })
    }

    pub fn with_dispatcher(mut self, dispatcher: NotificationDispatcher) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn with_poll_delay(mut self, poll_delay: Duration) -> Self {
        self.poll_delay = poll_delay.min(MAX_CYCLE_TIME);
        self
    }

    pub fn with_frame_timeout(mut self, frame_timeout: Duration) -> Self {
        self.frame_timeout = frame_timeout.min(MAX_CYCLE_TIME);
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn poll_delay(&self) -> Duration {
        self.poll_delay
    }

    /// Runs cycles until stop is requested.
    pub fn run(mut self) {
        log::info!("starting detector {}...", self.config.id);
        while !self.stopped() {
            match panic::catch_unwind(AssertUnwindSafe(|| self.run_cycle())) {
                Ok(Ok(CycleOutcome::Settled { crossed, polls })) => {
                    log::debug!(
                        "detector {}: cycle settled (crossed={}, polls={})",
                        self.config.id,
                        crossed,
                        polls
                    );
                }
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    log::error!("detector {}: cycle failed: {:#}", self.config.id, e);
                    self.sleep(self.poll_delay);
                }
                Err(payload) => {
                    log::error!(
                        "detector {}: cycle panicked: {}",
                        self.config.id,
                        panic_message(payload.as_ref())
                    );
                    self.sleep(self.poll_delay);
                }
            }
        }
        log::info!("detector {} stopped", self.config.id);
    }

    /// One pass through FETCH → SETTLE.
    pub fn run_cycle(&mut self) -> Result<CycleOutcome> {
        if !self.queues.fetch.is_full() && !self.queues.frames.is_full() {
            if self.queues.fetch.offer(FetchRequest) == Delivery::Dropped {
                log::debug!("detector {}: fetch request dropped", self.config.id);
            }
        }

        let frame = match self.wait_frame() {
            Some(Some(frame)) => frame,
            Some(None) => {
                log::warn!("detector {}: frame received as None", self.config.id);
                return Ok(CycleOutcome::NoFrame);
            }
            None if self.stopped() => return Ok(CycleOutcome::Stopped),
            None => {
                log::warn!("detector {}: no frame received from queue", self.config.id);
                return Ok(CycleOutcome::NoFrame);
            }
        };
        let uuid = Uuid::new_v4().simple().to_string();

        if let Some(motion) = self.motion.as_mut() {
            if !motion.detected(&frame) {
                self.sleep(self.cycle_time);
                return Ok(CycleOutcome::NoMotion);
            }
        }

        let mut query = self
            .client
            .submit_query(&self.detector, &frame, QUERY_WAIT)
            .context("submit image query")?;

        let metadata = LiveReviewMetadata {
            uuid: uuid.clone(),
            detector_id: self.config.id.clone(),
            detector_name: self.config.name.clone(),
            detector_query_text: self.config.query.clone(),
            query_id: query.id.clone(),
            detector_index: self.index,
            image_source_index: self.config.image_source_index,
            image_base64: frame.to_base64_jpeg()?,
        };
        if self.queues.metadata.offer(metadata) == Delivery::Dropped {
            log::debug!("detector {}: live review metadata dropped", self.config.id);
        }

        let deadline = Instant::now() + self.cycle_time;
        let mut crossed = false;
        let mut polls = 0u32;
        while Instant::now() < deadline {
            if self.stopped() {
                return Ok(CycleOutcome::Stopped);
            }
            query = self
                .client
                .get_query(&query.id)
                .with_context(|| format!("poll image query {}", query.id))?;
            polls += 1;
            if !crossed && query.crosses(self.threshold) {
                crossed = true;
                log::info!(
                    "detector {}: query {} settled with label {:?} (confidence {:?})",
                    self.config.id,
                    query.id,
                    query.label,
                    query.confidence
                );
                self.publish_cancel(&uuid, query.confidence, query.label.clone());
                self.notify(&query, &frame);
            }
            self.sleep(self.poll_delay);
        }

        if !crossed {
            self.publish_cancel(&uuid, None, None);
        }
        Ok(CycleOutcome::Settled { crossed, polls })
    }

    fn wait_frame(&self) -> Option<Option<Frame>> {
        let deadline = Instant::now() + self.frame_timeout;
        loop {
            let now = Instant::now();
            if now >= deadline || self.stopped() {
                return None;
            }
            let slice = (deadline - now).min(SLEEP_SLICE);
            match self.queues.frames.raw().recv_timeout(slice) {
                Ok(frame) => return Some(frame),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    log::warn!("detector {}: frame server is gone", self.config.id);
                    self.sleep(deadline.saturating_duration_since(Instant::now()));
                    return None;
                }
            }
        }
    }

    fn publish_cancel(&self, uuid: &str, confidence: Option<f64>, label: Option<String>) {
        let notice = CancelNotice {
            cancel: true,
            confidence,
            uuid: uuid.to_string(),
            detector_id: self.config.id.clone(),
            detector_name: self.config.name.clone(),
            detector_query_text: self.config.query.clone(),
            detector_index: self.index,
            image_source_index: self.config.image_source_index,
            label,
        };
        if self.queues.cancel.offer(notice) == Delivery::Dropped {
            log::debug!("detector {}: cancel notice dropped", self.config.id);
        }
    }

    fn notify(&self, query: &Query, frame: &Frame) {
        let Some(dispatcher) = &self.dispatcher else {
            return;
        };
        log::info!("sending notifications for detector {}...", self.config.id);
        let report = dispatcher.dispatch(
            &self.config.name,
            &self.config.query,
            query.label.as_deref().unwrap_or_default(),
            frame,
        );
        if !report.failed.is_empty() {
            log::warn!(
                "detector {}: {} of {} notification(s) failed",
                self.config.id,
                report.failed.len(),
                report.attempted.len()
            );
        }
    }

    fn stopped(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    fn sleep(&self, duration: Duration) {
        let deadline = Instant::now() + duration;
        while !self.stopped() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            std::thread::sleep((deadline - now).min(SLEEP_SLICE));
        }
    }
}

/// Worker entry point: builds the worker and runs it until stop is requested.
/// Returns an error only when the worker cannot start.
pub fn run(
    index: usize,
    config: DetectorConfig,
    queues: WorkerQueues,
    connector: &dyn InferenceConnector,
    shutdown: Arc<AtomicBool>,
) -> Result<()> {
    let worker = DetectorWorker::new(index, config, queues, connector, shutdown)?;
    worker.run();
    Ok(())
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{spawn_frame_server, StubSource};
    use crate::notify::{Alert, Notifier};
    use crate::queue::{FrameRequests, LiveReviewFeed, QueueFabric};
    use image::{Rgb, RgbImage};
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct Counters {
        connects: AtomicUsize,
        submits: AtomicUsize,
        polls: AtomicUsize,
    }

    #[derive(Clone, Default)]
    struct Script {
        server_threshold: Option<f64>,
        answer: Option<Query>,
        answer_from_poll: usize,
        fail_submit: bool,
        panic_first_submit: bool,
        counters: Arc<Counters>,
    }

    impl Script {
        fn answering(label: &str, confidence: Option<f64>, from_poll: usize) -> Self {
            Self {
                answer: Some(Query {
                    id: String::new(),
                    label: Some(label.to_string()),
                    confidence,
                }),
                answer_from_poll: from_poll,
                ..Self::default()
            }
        }

        fn submits(&self) -> usize {
            self.counters.submits.load(Ordering::SeqCst)
        }
    }

    struct FakeClient {
        script: Script,
    }

    impl InferenceClient for FakeClient {
        fn detector(&self, id: &str) -> Result<DetectorInfo> {
            Ok(DetectorInfo {
                id: id.to_string(),
                name: "fake".to_string(),
                confidence_threshold: self.script.server_threshold,
            })
        }

        fn submit_query(&self, _: &DetectorInfo, _: &Frame, wait: Duration) -> Result<Query> {
            assert_eq!(wait, Duration::ZERO);
            let n = self.script.counters.submits.fetch_add(1, Ordering::SeqCst) + 1;
            if self.script.panic_first_submit && n == 1 {
                panic!("inference client blew up");
            }
            if self.script.fail_submit {
                return Err(anyhow!("inference service unavailable"));
            }
            Ok(Query::pending(&format!("iq_{}", n)))
        }

        fn get_query(&self, id: &str) -> Result<Query> {
            let n = self.script.counters.polls.fetch_add(1, Ordering::SeqCst) + 1;
            match &self.script.answer {
                Some(answer) if n >= self.script.answer_from_poll => Ok(Query {
                    id: id.to_string(),
                    ..answer.clone()
                }),
                _ => Ok(Query::pending(id)),
            }
        }
    }

    impl InferenceConnector for Script {
        fn connect(&self) -> Result<Box<dyn InferenceClient>> {
            self.counters.connects.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeClient {
                script: self.clone(),
            }))
        }
    }

    struct CountingChannel(Arc<AtomicUsize>);

    impl Notifier for CountingChannel {
        fn channel(&self) -> &'static str {
            "count"
        }

        fn send(&self, _: &Alert<'_>) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn config(trigger: TriggerType, cycle: Duration) -> DetectorConfig {
        DetectorConfig {
            trigger_type: trigger,
            cycle_time: cycle,
            ..DetectorConfig::new("det_dock", "dock", "Is the door open?")
        }
    }

    fn build(
        config: DetectorConfig,
        script: &Script,
    ) -> (DetectorWorker, FrameRequests, LiveReviewFeed) {
        let fabric = QueueFabric::new();
        let (queues, requests) = fabric.detector_pair(0, config.image_source_index);
        let shutdown = Arc::new(AtomicBool::new(false));
        let worker = DetectorWorker::new(0, config, queues, script, shutdown)
            .unwrap()
            .with_poll_delay(Duration::from_millis(10))
            .with_frame_timeout(Duration::from_millis(50));
        (worker, requests, fabric.live_review())
    }

    fn gray() -> Frame {
        Frame::new(RgbImage::from_pixel(16, 16, Rgb([90, 90, 90])))
    }

    #[test]
    fn unsupported_triggers_fail_before_connecting() {
        for trigger in [TriggerType::Pin, TriggerType::Http] {
            let script = Script::default();
            let fabric = QueueFabric::new();
            let (queues, _requests) = fabric.detector_pair(0, Some(0));
            let err = DetectorWorker::new(
                0,
                config(trigger, Duration::from_secs(1)),
                queues,
                &script,
                Arc::new(AtomicBool::new(false)),
            )
            .err()
            .unwrap();
            assert!(err.to_string().contains("not yet supported"));
            assert_eq!(script.counters.connects.load(Ordering::SeqCst), 0);
        }
    }

    #[test]
    fn detector_without_image_source_fails_to_start() {
        let script = Script::default();
        let fabric = QueueFabric::new();
        let (queues, _requests) = fabric.detector_pair(0, None);
        let cfg = DetectorConfig {
            image_source_index: None,
            ..config(TriggerType::Time, Duration::from_secs(1))
        };
        let result = DetectorWorker::new(0, cfg, queues, &script, Arc::new(AtomicBool::new(false)));
        assert!(result.is_err());
    }

    #[test]
    fn cycle_time_out_of_range_fails_to_start() {
        for cycle in [Duration::ZERO, MAX_CYCLE_TIME + Duration::from_secs(1)] {
            let script = Script::default();
            let fabric = QueueFabric::new();
            let (queues, _requests) = fabric.detector_pair(0, Some(0));
            let shutdown = Arc::new(AtomicBool::new(false));
            let result =
                DetectorWorker::new(0, config(TriggerType::Time, cycle), queues, &script, shutdown);
            assert!(result.is_err());
            assert_eq!(script.counters.connects.load(Ordering::SeqCst), 0);
        }
    }

    #[test]
    fn threshold_resolution_prefers_server_then_config_then_default() {
        let cfg = config(TriggerType::Time, Duration::from_secs(1));
        let (worker, _, _) = build(cfg, &Script::default());
        assert_eq!(worker.threshold(), DEFAULT_CONFIDENCE_THRESHOLD);

        let cfg = DetectorConfig {
            confidence_threshold: Some(0.7),
            ..config(TriggerType::Time, Duration::from_secs(1))
        };
        let (worker, _, _) = build(cfg.clone(), &Script::default());
        assert_eq!(worker.threshold(), 0.7);

        let script = Script {
            server_threshold: Some(0.6),
            ..Script::default()
        };
        let (worker, _, _) = build(cfg, &script);
        assert_eq!(worker.threshold(), 0.6);
    }

    #[test]
    fn poll_delay_is_capped_by_cycle_time() {
        let script = Script::default();
        let fabric = QueueFabric::new();
        let (queues, _requests) = fabric.detector_pair(0, Some(0));
        let worker = DetectorWorker::new(
            0,
            config(TriggerType::Time, Duration::from_millis(200)),
            queues,
            &script,
            Arc::new(AtomicBool::new(false)),
        )
        .unwrap();
        assert_eq!(worker.poll_delay(), Duration::from_millis(200));

        let (queues, _requests) = fabric.detector_pair(1, Some(0));
        let worker = DetectorWorker::new(
            1,
            config(TriggerType::Time, Duration::from_secs(30)),
            queues,
            &script,
            Arc::new(AtomicBool::new(false)),
        )
        .unwrap();
        assert_eq!(worker.poll_delay(), MAX_POLL_DELAY);
    }

    #[test]
    fn first_crossing_notifies_exactly_once_and_keeps_polling() {
        let script = Script::answering("YES", Some(0.95), 3);
        let dispatches = Arc::new(AtomicUsize::new(0));
        let (worker, requests, feed) =
            build(config(TriggerType::Time, Duration::from_millis(300)), &script);
        let mut worker = worker.with_dispatcher(
            NotificationDispatcher::new(Some("PASS"))
                .with_channel(Box::new(CountingChannel(dispatches.clone()))),
        );

        assert!(requests.frames.offer(Some(gray())).is_delivered());
        let outcome = worker.run_cycle().unwrap();

        match outcome {
            CycleOutcome::Settled { crossed, polls } => {
                assert!(crossed);
                assert!(polls > 3, "polling continues after the crossing");
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(dispatches.load(Ordering::SeqCst), 1);

        let notice = feed.cancel.try_recv().unwrap();
        assert_eq!(notice.confidence, Some(0.95));
        assert_eq!(notice.label.as_deref(), Some("YES"));
        assert!(feed.cancel.try_recv().is_none());

        let metadata = feed.metadata.try_recv().unwrap();
        assert_eq!(metadata.query_id, "iq_1");
        assert_eq!(metadata.uuid, notice.uuid);
        assert!(!metadata.image_base64.is_empty());
    }

    #[test]
    fn no_crossing_publishes_default_cancel_and_no_dispatch() {
        let script = Script::answering("YES", Some(0.5), 1);
        let dispatches = Arc::new(AtomicUsize::new(0));
        let (worker, requests, feed) =
            build(config(TriggerType::Time, Duration::from_millis(100)), &script);
        let mut worker = worker.with_dispatcher(
            NotificationDispatcher::new(Some("PASS"))
                .with_telemetry(Box::new(CountingChannel(dispatches.clone()))),
        );

        requests.frames.offer(Some(gray()));
        let outcome = worker.run_cycle().unwrap();

        assert!(matches!(outcome, CycleOutcome::Settled { crossed: false, .. }));
        assert_eq!(dispatches.load(Ordering::SeqCst), 0);
        assert!(feed.cancel.try_recv().unwrap().is_default());
    }

    #[test]
    fn human_label_without_confidence_counts_as_crossing() {
        let script = Script::answering("NO", None, 1);
        let (mut worker, requests, feed) =
            build(config(TriggerType::Time, Duration::from_millis(60)), &script);

        requests.frames.offer(Some(gray()));
        let outcome = worker.run_cycle().unwrap();

        assert!(matches!(outcome, CycleOutcome::Settled { crossed: true, .. }));
        let notice = feed.cancel.try_recv().unwrap();
        assert_eq!(notice.confidence, None);
        assert_eq!(notice.label.as_deref(), Some("NO"));
    }

    #[test]
    fn missing_frame_requests_fetch_and_restarts() {
        let script = Script::default();
        let (mut worker, requests, _feed) =
            build(config(TriggerType::Time, Duration::from_millis(60)), &script);

        assert_eq!(worker.run_cycle().unwrap(), CycleOutcome::NoFrame);
        assert!(requests.fetch.try_recv().is_some());
        assert_eq!(script.submits(), 0);
    }

    #[test]
    fn fetch_is_skipped_while_request_is_pending() {
        let script = Script::default();
        let (mut worker, requests, _feed) =
            build(config(TriggerType::Time, Duration::from_millis(60)), &script);

        worker.run_cycle().unwrap();
        worker.run_cycle().unwrap();
        assert!(requests.fetch.try_recv().is_some());
        assert!(requests.fetch.try_recv().is_none());
    }

    #[test]
    fn empty_frame_restarts_without_submitting() {
        let script = Script::default();
        let (mut worker, requests, _feed) =
            build(config(TriggerType::Time, Duration::from_millis(60)), &script);

        requests.frames.offer(None);
        assert_eq!(worker.run_cycle().unwrap(), CycleOutcome::NoFrame);
        assert_eq!(script.submits(), 0);
    }

    #[test]
    fn motion_gate_skips_still_scenes() {
        let script = Script::default();
        let (mut worker, requests, _feed) =
            build(config(TriggerType::Motion, Duration::from_millis(40)), &script);

        requests.frames.offer(Some(gray()));
        assert!(matches!(worker.run_cycle().unwrap(), CycleOutcome::Settled { .. }));

        requests.frames.offer(Some(gray()));
        assert_eq!(worker.run_cycle().unwrap(), CycleOutcome::NoMotion);
        assert_eq!(script.submits(), 1);
    }

    #[test]
    fn cycle_errors_and_panics_do_not_stop_the_loop() {
        for script in [
            Script {
                fail_submit: true,
                ..Script::default()
            },
            Script {
                panic_first_submit: true,
                ..Script::default()
            },
        ] {
            let fabric = QueueFabric::new();
            let (queues, requests) = fabric.detector_pair(0, Some(0));
            let shutdown = Arc::new(AtomicBool::new(false));
            let worker = DetectorWorker::new(
                0,
                config(TriggerType::Time, Duration::from_millis(20)),
                queues,
                &script,
                shutdown.clone(),
            )
            .unwrap()
            .with_poll_delay(Duration::from_millis(5));
            let server = spawn_frame_server(
                Box::new(StubSource::new("cam", 8, 8, false)),
                vec![requests],
                shutdown.clone(),
            )
            .unwrap();

            let handle = std::thread::spawn(move || worker.run());
            let started = Instant::now();
            while script.submits() < 3 && started.elapsed() < Duration::from_secs(5) {
                std::thread::sleep(Duration::from_millis(10));
            }
            shutdown.store(true, Ordering::SeqCst);
            handle.join().unwrap();
            server.join();

            assert!(script.submits() >= 3);
        }
    }

    #[test]
    fn panic_message_reads_str_and_string_payloads() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
    }
}
