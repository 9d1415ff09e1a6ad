use std::collections::HashMap;

use anyhow::{anyhow, Result};

use crate::config::CameraConfig;

use super::FrameSource;
use super::{FileSource, HttpSnapshotSource, StubSource};

pub type SourceConstructor = fn(&CameraConfig) -> Result<Box<dyn FrameSource>>;

/// Maps a camera `input_type` to the constructor for its source.
///
/// Populated explicitly at startup; lookups of unknown tags fail with the list of
/// registered ones.
pub struct SourceRegistry {
    constructors: HashMap<String, SourceConstructor>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Registry holding every source shipped with this crate.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(StubSource::INPUT_TYPE, |camera| {
            Ok(Box::new(StubSource::from_camera(camera)))
        });
        registry.register(FileSource::INPUT_TYPE, |camera| {
            Ok(Box::new(FileSource::from_camera(camera)?))
        });
        registry.register(HttpSnapshotSource::INPUT_TYPE, |camera| {
            Ok(Box::new(HttpSnapshotSource::from_camera(camera)?))
        });
        registry
    }

    /// Register a constructor. A later registration for the same tag replaces the
    /// earlier one.
    pub fn register(&mut self, input_type: &str, constructor: SourceConstructor) {
        self.constructors
            .insert(input_type.to_lowercase(), constructor);
    }

    pub fn contains(&self, input_type: &str) -> bool {
        self.constructors.contains_key(&input_type.to_lowercase())
    }

    /// List registered input types, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.constructors.keys().cloned().collect();
        names.sort();
        names
    }

    /// Build the source for a camera.
    pub fn build(&self, camera: &CameraConfig) -> Result<Box<dyn FrameSource>> {
        let constructor = self
            .constructors
            .get(&camera.input_type.to_lowercase())
            .ok_or_else(|| {
                anyhow!(
                    "camera '{}': unknown input_type '{}' (registered: {})",
                    camera.name,
                    camera.input_type,
                    self.list().join(", ")
                )
            })?;
        constructor(camera)
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
