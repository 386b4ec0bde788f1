use std::str::{FromStr, SplitN};

use serde::Serialize;

use crate::config::StreamConfig;
use crate::error::EventParseError;

/// One engine callback decoded from an event line.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineEvent {
    pub action: i32,
    pub plugin_id: i32,
    pub value1: i32,
    pub value2: i32,
    pub value3: f64,
    /// Unparsed remainder of the line; may be empty or contain spaces.
    pub value_str: String,
}

impl EngineEvent {
    /// Parse the part of an event line after the marker:
    /// `<action> <pluginId> <value1> <value2> <value3> <valueStr>`.
    pub fn parse(body: &str) -> Result<Self, EventParseError> {
        let mut fields = Fields(body.splitn(6, ' '));
        Ok(Self {
            action: fields.int("action")?,
            plugin_id: fields.int("pluginId")?,
            value1: fields.int("value1")?,
            value2: fields.int("value2")?,
            value3: fields.float("value3")?,
            value_str: fields.0.next().unwrap_or_default().to_string(),
        })
    }
}

/// Peak meter values for one plugin: inputs then outputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeaksEvent {
    pub plugin_id: u32,
    pub peaks: [f32; 4],
}

impl PeaksEvent {
    /// Parse the part of a peaks line after the marker:
    /// `<pluginId> <in1> <in2> <out1> <out2>`.
    pub fn parse(body: &str) -> Result<Self, EventParseError> {
        let mut fields = Fields(body.splitn(5, ' '));
        let plugin_id = fields.next("pluginId")?;
        let plugin_id = plugin_id
            .parse()
            .map_err(|_| EventParseError::InvalidInt {
                field: "pluginId",
                value: plugin_id.to_string(),
            })?;

        let mut peaks = [0.0f32; 4];
        for (slot, name) in peaks.iter_mut().zip(["in1", "in2", "out1", "out2"]) {
            *slot = fields.float(name)?;
        }
        Ok(Self { plugin_id, peaks })
    }
}

/// What one reassembled stream line turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamLine {
    Event(EngineEvent),
    Peaks(PeaksEvent),
    /// The server wants the client to reconnect.
    Sentinel,
    /// A marked line whose fields could not be decoded.
    Invalid {
        line: String,
        error: EventParseError,
    },
    /// Anything else; ignored.
    Other(String),
}

impl StreamLine {
    pub fn classify(line: &str, config: &StreamConfig) -> Self {
        if line == config.sentinel {
            return Self::Sentinel;
        }
        let invalid = |error| Self::Invalid {
            line: line.to_string(),
            error,
        };
        if let Some(body) = line.strip_prefix(config.event_marker.as_str()) {
            return EngineEvent::parse(body).map_or_else(invalid, Self::Event);
        }
        if let Some(body) = line.strip_prefix(config.peaks_marker.as_str()) {
            return PeaksEvent::parse(body).map_or_else(invalid, Self::Peaks);
        }
        Self::Other(line.to_string())
    }
}

/// Receives engine events decoded from the stream.
pub trait EngineCallback {
    fn on_event(&mut self, event: &EngineEvent);

    /// The stream was lost and no replacement is open.
    fn on_disconnect(&mut self) {}
}

impl<F: FnMut(&EngineEvent)> EngineCallback for F {
    fn on_event(&mut self, event: &EngineEvent) {
        (*self)(event)
    }
}

/// Last peak values per plugin slot.
#[derive(Debug, Clone)]
pub struct PeakTable {
    slots: Vec<[f32; 4]>,
}

impl PeakTable {
    pub fn new(slots: usize) -> Self {
        Self {
            slots: vec![[0.0; 4]; slots],
        }
    }

    /// Store `event`; returns `false` if its plugin id has no slot.
    pub fn update(&mut self, event: &PeaksEvent) -> bool {
        match self.slots.get_mut(event.plugin_id as usize) {
            Some(slot) => {
                *slot = event.peaks;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, plugin_id: u32) -> Option<[f32; 4]> {
        self.slots.get(plugin_id as usize).copied()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn clear(&mut self) {
        self.slots.fill([0.0; 4]);
    }
}

struct Fields<'a>(SplitN<'a, char>);

impl<'a> Fields<'a> {
    fn next(&mut self, field: &'static str) -> Result<&'a str, EventParseError> {
        self.0
            .next()
            .filter(|value| !value.is_empty())
            .ok_or(EventParseError::MissingField { field })
    }

    fn int(&mut self, field: &'static str) -> Result<i32, EventParseError> {
        let value = self.next(field)?;
        value.trim().parse().map_err(|_| EventParseError::InvalidInt {
            field,
            value: value.to_string(),
        })
    }

    fn float<T: FromStr>(&mut self, field: &'static str) -> Result<T, EventParseError> {
        let value = self.next(field)?;
        value.trim().parse().map_err(|_| EventParseError::InvalidFloat {
            field,
            value: value.to_string(),
        })
    }
}
