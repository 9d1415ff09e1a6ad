use anyhow::{anyhow, Context, Result};
use regex::{Captures, Regex};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

const DEFAULT_INFERENCE_ENDPOINT: &str = "http://localhost:30101";
const DEFAULT_CYCLE_TIME_SECS: f64 = 30.0;

/// Longest accepted `cycle_time`.
pub const MAX_CYCLE_TIME: Duration = Duration::from_secs(24 * 60 * 60);
const DEFAULT_MOTION_PERCENT: f64 = 5.0;
const DEFAULT_MOTION_THRESHOLD: u8 = 50;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct RuntimeConfigFile {
    #[serde(default)]
    cameras: Vec<CameraConfig>,
    #[serde(default)]
    detectors: Vec<DetectorConfigFile>,
    inference: Option<InferenceConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct InferenceConfigFile {
    endpoint: Option<String>,
    api_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DetectorConfigFile {
    id: String,
    name: String,
    query: String,
    confidence_threshold: Option<f64>,
    config: DetectorLoopFile,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DetectorLoopFile {
    #[serde(default)]
    enabled: bool,
    imgsrc_idx: Option<i64>,
    trigger_type: String,
    cycle_time: Option<f64>,
    motion_percent: Option<f64>,
    motion_threshold: Option<u8>,
    notifications: Option<NotificationOptions>,
}

/// A camera entry. `id` identifies the device for its input type
/// (`path`, `url`, ...); `options` carries source-specific tuning.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct CameraConfig {
    pub name: String,
    pub input_type: String,
    #[serde(default)]
    pub id: HashMap<String, String>,
    #[serde(default)]
    pub options: HashMap<String, serde_json::Value>,
}

impl CameraConfig {
    pub fn id_field(&self, key: &str) -> Result<&str> {
        self.id
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| anyhow!("camera '{}' is missing id.{}", self.name, key))
    }

    pub fn option_u32(&self, key: &str, default: u32) -> u32 {
        self.options
            .get(key)
            .and_then(serde_json::Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(default)
    }

    pub fn option_bool(&self, key: &str, default: bool) -> bool {
        self.options
            .get(key)
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(default)
    }
}

/// How a detector decides to submit a query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerType {
    Motion,
    Time,
    Pin,
    Http,
}

impl TriggerType {
    pub fn is_supported(&self) -> bool {
        matches!(self, Self::Motion | Self::Time)
    }
}

impl FromStr for TriggerType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "motion" => Ok(Self::Motion),
            "time" => Ok(Self::Time),
            "pin" => Ok(Self::Pin),
            "http" => Ok(Self::Http),
            other => Err(anyhow!(
                "invalid trigger type '{}': expected motion, time, pin or http",
                other
            )),
        }
    }
}

impl std::fmt::Display for TriggerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Motion => write!(f, "motion"),
            Self::Time => write!(f, "time"),
            Self::Pin => write!(f, "pin"),
            Self::Http => write!(f, "http"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct NotificationOptions {
    /// "PASS" or "FAIL", compared case-insensitively.
    pub condition: Option<String>,
    pub stacklight: Option<StacklightOptions>,
    pub email: Option<EmailOptions>,
    pub twilio: Option<SmsOptions>,
    pub slack: Option<ChatOptions>,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct StacklightOptions {
    pub ip: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct EmailOptions {
    pub from_email: String,
    pub to_email: String,
    pub email_password: String,
    pub host: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SmsOptions {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    pub to_number: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ChatOptions {
    pub token: String,
    pub channel_id: String,
}

/// Settings for one detection loop. Owned by its worker once started.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
    pub id: String,
    pub name: String,
    pub query: String,
    pub confidence_threshold: Option<f64>,
    pub enabled: bool,
    /// `None` when the config carries `imgsrc_idx: -1` or omits it.
    pub image_source_index: Option<usize>,
    pub trigger_type: TriggerType,
    pub cycle_time: Duration,
    pub motion_percent: f64,
    pub motion_threshold: u8,
    pub notifications: Option<NotificationOptions>,
}

impl DetectorConfig {
    /// A time-triggered detector with defaults for everything optional.
    pub fn new(id: &str, name: &str, query: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            query: query.to_string(),
            confidence_threshold: None,
            enabled: true,
            image_source_index: Some(0),
            trigger_type: TriggerType::Time,
            cycle_time: Duration::from_secs_f64(DEFAULT_CYCLE_TIME_SECS),
            motion_percent: DEFAULT_MOTION_PERCENT,
            motion_threshold: DEFAULT_MOTION_THRESHOLD,
            notifications: None,
        }
    }

    fn from_file(file: DetectorConfigFile) -> Result<Self> {
        let trigger_type = file
            .config
            .trigger_type
            .parse()
            .with_context(|| format!("detector '{}'", file.id))?;
        let cycle_secs = file.config.cycle_time.unwrap_or(DEFAULT_CYCLE_TIME_SECS);
        let cycle_time = Duration::try_from_secs_f64(cycle_secs)
            .ok()
            .filter(|cycle| !cycle.is_zero() && *cycle <= MAX_CYCLE_TIME)
            .ok_or_else(|| {
                anyhow!(
                    "detector '{}': cycle_time must be a positive number of seconds up to {}",
                    file.id,
                    MAX_CYCLE_TIME.as_secs()
                )
            })?;
        let image_source_index = match file.config.imgsrc_idx {
            Some(idx) if idx >= 0 => Some(idx as usize),
            _ => None,
        };
        Ok(Self {
            id: file.id,
            name: file.name,
            query: file.query,
            confidence_threshold: file.confidence_threshold,
            enabled: file.config.enabled,
            image_source_index,
            trigger_type,
            cycle_time,
            motion_percent: file.config.motion_percent.unwrap_or(DEFAULT_MOTION_PERCENT),
            motion_threshold: file
                .config
                .motion_threshold
                .unwrap_or(DEFAULT_MOTION_THRESHOLD),
            notifications: file.config.notifications,
        })
    }
}

#[derive(Debug, Clone)]
pub struct InferenceSettings {
    pub endpoint: String,
    pub api_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub source_path: Option<PathBuf>,
    pub cameras: Vec<CameraConfig>,
    pub detectors: Vec<DetectorConfig>,
    pub inference: InferenceSettings,
}

impl RuntimeConfig {
    /// Loads the runtime config from `path`, or from `EDGELOOP_CONFIG` when no
    /// path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => std::env::var("EDGELOOP_CONFIG")
                .map(PathBuf::from)
                .map_err(|_| anyhow!("no config path given and EDGELOOP_CONFIG is not set"))?,
        };
        let file_cfg = read_config_file(&path)?;
        let mut cfg = Self::from_file(file_cfg)?;
        cfg.source_path = Some(path);
        cfg.apply_env();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parses config text directly. `format` is "toml" or "json".
    pub fn parse(raw: &str, format: &str) -> Result<Self> {
        let file_cfg = parse_config_text(raw, format)?;
        let mut cfg = Self::from_file(file_cfg)?;
        cfg.apply_env();
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: RuntimeConfigFile) -> Result<Self> {
        let detectors = file
            .detectors
            .into_iter()
            .map(DetectorConfig::from_file)
            .collect::<Result<Vec<_>>>()?;
        let inference = InferenceSettings {
            endpoint: file
                .inference
                .as_ref()
                .and_then(|inference| inference.endpoint.clone())
                .unwrap_or_else(|| DEFAULT_INFERENCE_ENDPOINT.to_string()),
            api_token: file.inference.and_then(|inference| inference.api_token),
        };
        Ok(Self {
            source_path: None,
            cameras: file.cameras,
            detectors,
            inference,
        })
    }

    fn apply_env(&mut self) {
        if let Ok(endpoint) = std::env::var("EDGELOOP_INFERENCE_ENDPOINT") {
            if !endpoint.trim().is_empty() {
                self.inference.endpoint = endpoint;
            }
        }
        if let Ok(token) = std::env::var("EDGELOOP_API_TOKEN") {
            if !token.trim().is_empty() {
                self.inference.api_token = Some(token);
            }
        }
    }

    fn validate(&self) -> Result<()> {
        url::Url::parse(&self.inference.endpoint).with_context(|| {
            format!("invalid inference endpoint '{}'", self.inference.endpoint)
        })?;

        let mut seen = std::collections::HashSet::new();
        for det in &self.detectors {
            if !seen.insert(det.id.as_str()) {
                return Err(anyhow!("duplicate detector id '{}'", det.id));
            }
            if let Some(threshold) = det.confidence_threshold {
                if !(0.0..=1.0).contains(&threshold) {
                    return Err(anyhow!(
                        "detector '{}': confidence_threshold must be within 0.0..=1.0",
                        det.id
                    ));
                }
            }
            if let Some(condition) = det.notifications.as_ref().and_then(|n| n.condition.as_ref())
            {
                crate::notify::Condition::from_str(condition)
                    .with_context(|| format!("detector '{}'", det.id))?;
            }
            if !det.enabled {
                continue;
            }
            if !det.trigger_type.is_supported() {
                return Err(anyhow!(
                    "detector '{}': trigger type [{}] not yet supported",
                    det.id,
                    det.trigger_type
                ));
            }
            if let Some(idx) = det.image_source_index {
                if idx >= self.cameras.len() {
                    return Err(anyhow!(
                        "detector '{}': imgsrc_idx {} out of range ({} cameras configured)",
                        det.id,
                        idx,
                        self.cameras.len()
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn enabled_detectors(&self) -> impl Iterator<Item = &DetectorConfig> {
        self.detectors.iter().filter(|det| det.enabled)
    }
}

fn read_config_file(path: &Path) -> Result<RuntimeConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let format = match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => "toml",
        _ => "json",
    };
    parse_config_text(&raw, format)
        .map_err(|e| anyhow!("invalid config file {}: {:#}", path.display(), e))
}

fn parse_config_text(raw: &str, format: &str) -> Result<RuntimeConfigFile> {
    let text = substitute_variables(raw)?;
    match format {
        "toml" => toml::from_str(&text).map_err(|e| anyhow!("{}", e)),
        "json" => serde_json::from_str(&text).map_err(|e| anyhow!("{}", e)),
        other => Err(anyhow!("unsupported config format '{}'", other)),
    }
}

/// Replaces `{{VAR}}` placeholders with the value of environment variable `VAR`.
pub fn substitute_variables(text: &str) -> Result<String> {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    let re = PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("placeholder regex")
    });

    let mut missing = None;
    let out = re.replace_all(text, |caps: &Captures| {
        let name = &caps[1];
        match std::env::var(name) {
            Ok(value) => value,
            Err(_) => {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });
    if let Some(name) = missing {
        return Err(anyhow!("no environment variable found for: {}", name));
    }
    Ok(out.into_owned())
}
