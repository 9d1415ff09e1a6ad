//! edgeloop - edge detection runtime
//!
//! Runs one polling loop per configured detector. Each loop grabs a frame from its
//! camera, submits it to a remote inference service, polls the query until the
//! cycle deadline, and fans settled results out to the live review feed and to
//! notification channels.
//!
//! # Module Structure
//!
//! - `config`: runtime config (cameras, detectors, inference endpoint)
//! - `frame`: decoded frames and their JPEG/base64 encodings
//! - `queue`: capacity-1 drop-on-full channels (`QueueFabric`)
//! - `messages`: fetch requests, live review metadata, cancel notices
//! - `ingest`: frame sources, the source registry, per-camera frame servers
//! - `inference`: inference service client trait and its HTTP implementation
//! - `motion`: frame-difference motion gate
//! - `notify`: notification dispatcher and providers
//! - `worker`: the per-detector state machine
//! - `conductor`: spawns and stops workers

pub mod cli;
pub mod conductor;
pub mod config;
pub mod frame;
pub mod inference;
pub mod ingest;
pub mod messages;
pub mod motion;
pub mod notify;
pub mod queue;
pub mod worker;

pub use conductor::{Conductor, ConductorHandle};
pub use config::{CameraConfig, DetectorConfig, NotificationOptions, RuntimeConfig, TriggerType};
pub use frame::Frame;
pub use inference::{
    DetectorInfo, HttpInferenceConnector, InferenceClient, InferenceConnector, Query,
};
pub use ingest::{FrameSource, SourceRegistry};
pub use messages::{CancelNotice, FetchRequest, LiveReviewMetadata};
pub use motion::MotionDetector;
pub use notify::{Alert, Condition, DispatchReport, NotificationDispatcher, Notifier};
pub use queue::{Delivery, LiveReviewFeed, QueueFabric, WorkerQueues};
pub use worker::{CycleOutcome, DetectorWorker};
