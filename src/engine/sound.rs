//! The sound-emission capability a body calls into.
//!
//! Audio synthesis lives outside the engine. A body owns one boxed
//! [`SoundModule`] and pokes it on collisions, on every physics tick (pan) and
//! on every modulation tick. The engine never interprets a module's
//! [`SoundDescriptor`]; it only carries it through export and import.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::engine::error::{EngineError, EngineResult};

pub trait SoundModule: Send {
    /// Emit a percussive hit for `note`
    fn trigger_note(&mut self, note: &str);

    /// Stereo position in [-1, 1]
    fn set_pan(&mut self, _pan: f64) {}

    /// Continuous modulation from the body's distance and angle to its attractor
    fn update(&mut self, _distance: f64, _initial_distance: f64, _angle: f64) {}

    /// Opaque description used to rebuild the module after a reload
    fn descriptor(&self) -> SoundDescriptor;
}

impl fmt::Debug for dyn SoundModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SoundModule({})", self.descriptor().kind)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundDescriptor {
    pub kind: String,
    #[serde(default)]
    pub params: BTreeMap<String, serde_yaml::Value>,
}

impl SoundDescriptor {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, key: &str, value: impl Into<serde_yaml::Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }
}

impl Default for SoundDescriptor {
    fn default() -> Self {
        Self::new(SilentModule::KIND)
    }
}

/// Does nothing. Default module of freshly placed bodies in a headless host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentModule;

impl SilentModule {
    pub const KIND: &'static str = "silent";
}

impl SoundModule for SilentModule {
    fn trigger_note(&mut self, _note: &str) {}

    fn descriptor(&self) -> SoundDescriptor {
        SoundDescriptor::new(Self::KIND)
    }
}

/// Writes every hit to the log at info level.
#[derive(Debug, Clone)]
pub struct LoggingModule {
    label: String,
}

impl LoggingModule {
    pub const KIND: &'static str = "log";

    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
        }
    }
}

impl SoundModule for LoggingModule {
    fn trigger_note(&mut self, note: &str) {
        log::info!("{} -> {}", self.label, note);
    }

    fn descriptor(&self) -> SoundDescriptor {
        SoundDescriptor::new(Self::KIND).with_param("label", self.label.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SoundEvent {
    Note(String),
    Pan(f64),
    Modulation {
        distance: f64,
        initial_distance: f64,
        angle: f64,
    },
}

/// Shared view on what a [`RecordingModule`] received.
#[derive(Debug, Clone, Default)]
pub struct SoundLog {
    events: Arc<Mutex<Vec<SoundEvent>>>,
}

impl SoundLog {
    fn push(&self, event: SoundEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    pub fn events(&self) -> Vec<SoundEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn notes(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SoundEvent::Note(note) => Some(note),
                _ => None,
            })
            .collect()
    }

    pub fn note_count(&self) -> usize {
        self.notes().len()
    }

    pub fn last_pan(&self) -> Option<f64> {
        self.events().into_iter().rev().find_map(|e| match e {
            SoundEvent::Pan(pan) => Some(pan),
            _ => None,
        })
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// Records everything it is asked to do. Handy for hosts that render their
/// own audio from the event stream, and for tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingModule {
    log: SoundLog,
}

impl RecordingModule {
    pub const KIND: &'static str = "recording";

    pub fn new() -> (Self, SoundLog) {
        let module = Self::default();
        let log = module.log.clone();
        (module, log)
    }
}

impl SoundModule for RecordingModule {
    fn trigger_note(&mut self, note: &str) {
        self.log.push(SoundEvent::Note(note.to_string()));
    }

    fn set_pan(&mut self, pan: f64) {
        self.log.push(SoundEvent::Pan(pan));
    }

    fn update(&mut self, distance: f64, initial_distance: f64, angle: f64) {
        self.log.push(SoundEvent::Modulation {
            distance,
            initial_distance,
            angle,
        });
    }

    fn descriptor(&self) -> SoundDescriptor {
        SoundDescriptor::new(Self::KIND)
    }
}

/// Rebuild one of the built-in modules from its descriptor.
pub fn module_from_descriptor(descriptor: &SoundDescriptor) -> EngineResult<Box<dyn SoundModule>> {
    match descriptor.kind.as_str() {
        SilentModule::KIND => Ok(Box::new(SilentModule)),
        LoggingModule::KIND => {
            let label = descriptor
                .params
                .get("label")
                .and_then(|v| v.as_str())
                .unwrap_or("body");
            Ok(Box::new(LoggingModule::new(label)))
        }
        RecordingModule::KIND => Ok(Box::new(RecordingModule::default())),
        other => Err(EngineError::UnknownSoundModule(other.to_string())),
    }
}
