//! Frame servers answer fetch requests from detector workers.
//!
//! One server thread owns one camera. It waits on the fetch queues of every detector
//! bound to that camera, grabs a frame for whichever asked, and offers it on that
//! detector's frame queue. A failed grab is delivered as `None` so the worker can log
//! it and retry on its next cycle.

use anyhow::{Context, Result};
use crossbeam_channel::Select;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use super::FrameSource;
use crate::queue::FrameRequests;

const SELECT_TIMEOUT: Duration = Duration::from_millis(100);

pub struct FrameServerHandle {
    pub camera: String,
    join: JoinHandle<()>,
}

impl FrameServerHandle {
    pub fn join(self) {
        if self.join.join().is_err() {
            log::error!("frame server for camera {} panicked", self.camera);
        }
    }
}

pub fn spawn_frame_server(
    source: Box<dyn FrameSource>,
    requests: Vec<FrameRequests>,
    shutdown: Arc<AtomicBool>,
) -> Result<FrameServerHandle> {
    let camera = source.name().to_string();
    let join = std::thread::Builder::new()
        .name(format!("camera-{}", camera))
        .spawn(move || serve(source, requests, &shutdown))
        .with_context(|| format!("spawn frame server for camera {}", camera))?;
    Ok(FrameServerHandle { camera, join })
}

fn serve(
    mut source: Box<dyn FrameSource>,
    mut requests: Vec<FrameRequests>,
    shutdown: &AtomicBool,
) {
    log::info!(
        "frame server for camera {} serving {} detector(s)",
        source.name(),
        requests.len()
    );
    while !requests.is_empty() && !shutdown.load(Ordering::SeqCst) {
        let (idx, received) = {
            let mut select = Select::new();
            for req in &requests {
                select.recv(req.fetch.raw());
            }
            let op = match select.select_timeout(SELECT_TIMEOUT) {
                Ok(op) => op,
                Err(_) => continue,
            };
            let idx = op.index();
            (idx, op.recv(requests[idx].fetch.raw()).is_ok())
        };
        if !received {
            // Worker side is gone; stop serving it.
            let closed = requests.swap_remove(idx);
            log::warn!(
                "camera {}: detector #{} stopped requesting frames",
                source.name(),
                closed.detector_index
            );
            continue;
        }

        let frame = match source.grab() {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("camera {}: grab failed: {:#}", source.name(), e);
                None
            }
        };
        let req = &requests[idx];
        if !req.frames.offer(frame).is_delivered() {
            log::debug!(
                "camera {}: frame for detector #{} dropped (slot full)",
                source.name(),
                req.detector_index
            );
        }
    }
    log::info!("frame server for camera {} stopped", source.name());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::StubSource;
    use crate::messages::FetchRequest;
    use crate::queue::QueueFabric;

    #[test]
    fn answers_fetch_from_the_requesting_detector_only() {
        let fabric = QueueFabric::new();
        let (first, first_req) = fabric.detector_pair(0, Some(0));
        let (second, second_req) = fabric.detector_pair(1, Some(0));
        let shutdown = Arc::new(AtomicBool::new(false));

        let handle = spawn_frame_server(
            Box::new(StubSource::new("cam", 8, 8, false)),
            vec![first_req, second_req],
            shutdown.clone(),
        )
        .unwrap();

        assert!(second.fetch.offer(FetchRequest).is_delivered());
        let frame = second.frames.recv_timeout(Duration::from_secs(2));
        assert!(matches!(frame, Some(Some(_))));
        assert!(first.frames.is_empty());

        shutdown.store(true, Ordering::SeqCst);
        handle.join();
    }

    #[test]
    fn stops_when_every_worker_is_gone() {
        let fabric = QueueFabric::new();
        let (worker, req) = fabric.detector_pair(0, Some(0));
        let handle = spawn_frame_server(
            Box::new(StubSource::new("cam", 8, 8, false)),
            vec![req],
            Arc::new(AtomicBool::new(false)),
        )
        .unwrap();
        drop(worker);
        handle.join();
    }
}
