//! Conductor: spawns one isolated worker per enabled detector.
//!
//! Each worker runs on its own named thread (`detector-{index}`) and owns a private
//! fetch/frame queue pair; the two live review queues are shared by all workers.
//! Workers are never restarted. A worker that fails to start or panics is logged and
//! leaves its siblings running.

use anyhow::{anyhow, Context, Result};
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::config::DetectorConfig;
use crate::inference::InferenceConnector;
use crate::ingest::{spawn_frame_server, FrameServerHandle, FrameSource};
use crate::queue::{FrameRequests, LiveReviewFeed, QueueFabric};
use crate::worker::{self, panic_message};

pub struct Conductor;

impl Conductor {
    /// Spawns a worker for every enabled detector. Worker indices count enabled
    /// detectors only. With nothing enabled an error is logged and an empty handle
    /// is returned.
    pub fn start(
        detectors: &[DetectorConfig],
        connector: Arc<dyn InferenceConnector>,
    ) -> Result<ConductorHandle> {
        let enabled: Vec<&DetectorConfig> = detectors.iter().filter(|d| d.enabled).collect();
        let fabric = QueueFabric::new();
        let shutdown = Arc::new(AtomicBool::new(false));
        let mut handle = ConductorHandle {
            workers: Vec::with_capacity(enabled.len()),
            frame_requests: Vec::with_capacity(enabled.len()),
            frame_servers: Vec::new(),
            feed: fabric.live_review(),
            shutdown: shutdown.clone(),
        };
        if enabled.is_empty() {
            log::error!("no detectors are enabled");
            return Ok(handle);
        }

        for (index, config) in enabled.into_iter().enumerate() {
            let (queues, requests) = fabric.detector_pair(index, config.image_source_index);
            let detector_id = config.id.clone();
            let config = config.clone();
            let connector = connector.clone();
            let shutdown = shutdown.clone();
            let thread_id = detector_id.clone();
            let join = std::thread::Builder::new()
                .name(format!("detector-{}", index))
                .spawn(move || {
                    let started = panic::catch_unwind(AssertUnwindSafe(|| {
                        worker::run(index, config, queues, connector.as_ref(), shutdown)
                    }));
                    match started {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => log::error!("detector {} failed: {:#}", thread_id, e),
                        Err(payload) => log::error!(
                            "detector {} panicked: {}",
                            thread_id,
                            panic_message(payload.as_ref())
                        ),
                    }
                })
                .with_context(|| format!("spawn worker for detector {}", detector_id))?;
            log::info!("spawned worker #{} for detector {}", index, detector_id);
            handle.workers.push(WorkerHandle {
                index,
                detector_id,
                join,
            });
            handle.frame_requests.push(requests);
        }
        Ok(handle)
    }
}

pub struct WorkerHandle {
    pub index: usize,
    pub detector_id: String,
    join: JoinHandle<()>,
}

pub struct ConductorHandle {
    workers: Vec<WorkerHandle>,
    frame_requests: Vec<FrameRequests>,
    frame_servers: Vec<FrameServerHandle>,
    feed: LiveReviewFeed,
    shutdown: Arc<AtomicBool>,
}

impl ConductorHandle {
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn detector_ids(&self) -> Vec<&str> {
        self.workers.iter().map(|w| w.detector_id.as_str()).collect()
    }

    /// Grabber-side queue ends not yet handed to a frame server.
    pub fn take_frame_requests(&mut self) -> Vec<FrameRequests> {
        std::mem::take(&mut self.frame_requests)
    }

    /// Starts one frame server per camera. `sources[i]` serves every detector whose
    /// image source index is `i`; detectors pointing past the list are reported.
    pub fn serve_frames(&mut self, sources: Vec<Box<dyn FrameSource>>) -> Result<()> {
        let mut by_camera: BTreeMap<usize, Vec<FrameRequests>> = BTreeMap::new();
        for requests in self.take_frame_requests() {
            match requests.image_source_index {
                Some(idx) if idx < sources.len() => {
                    by_camera.entry(idx).or_default().push(requests)
                }
                Some(idx) => log::error!(
                    "detector #{}: no camera at image source index {}",
                    requests.detector_index,
                    idx
                ),
                None => log::error!("detector #{}: no image source", requests.detector_index),
            }
        }
        for (idx, source) in sources.into_iter().enumerate() {
            let Some(requests) = by_camera.remove(&idx) else {
                log::info!("camera {} has no detectors; not serving", source.name());
                continue;
            };
            let server = spawn_frame_server(source, requests, self.shutdown.clone())?;
            self.frame_servers.push(server);
        }
        Ok(())
    }

    /// Receiving ends of the shared live review queues.
    pub fn live_review(&self) -> LiveReviewFeed {
        self.feed.clone()
    }

    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    /// Asks every worker and frame server to stop after its current phase.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Waits for all workers and frame servers to exit.
    pub fn join(self) -> Result<()> {
        let mut panicked = Vec::new();
        for worker in self.workers {
            if worker.join.join().is_err() {
                panicked.push(worker.detector_id);
            }
        }
        // Dropping the unserved request ends lets nothing block on them.
        drop(self.frame_requests);
        for server in self.frame_servers {
            server.join();
        }
        if !panicked.is_empty() {
            return Err(anyhow!("worker thread(s) panicked: {}", panicked.join(", ")));
        }
        Ok(())
    }
}
