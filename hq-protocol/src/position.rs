use chrono::{DateTime, Utc};

use crate::identity::DeviceId;

/// Alarm classification derived from the status word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Alarm {
    Vibration,
    Sos,
    Overspeed,
    PowerCut,
}

/// Serving cell identification. Attached to a record only when the sentence
/// carried the complete MCC/MNC/LAC/CID tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellTowerInfo {
    pub mcc: u32,
    pub mnc: u32,
    pub lac: u32,
    pub cid: u32,
}

/// A decoded location report. Created fresh per frame and owned by the
/// caller; the decoder never touches it again.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionRecord {
    /// Handle of the reporting device.
    pub device_id: DeviceId,
    /// Report time, UTC. Defaults to decode time when the sentence carries
    /// no date.
    pub time: DateTime<Utc>,
    /// GPS fix validity.
    pub valid: bool,
    /// Latitude in decimal degrees (negative = South).
    pub latitude: f64,
    /// Longitude in decimal degrees (negative = West).
    pub longitude: f64,
    /// Speed as transmitted.
    pub speed: f64,
    /// Course in degrees.
    pub course: f64,
    /// Free-text payload of a V4 response sentence.
    pub result: Option<String>,
    /// Alarm derived from the status word.
    pub alarm: Option<Alarm>,
    /// Ignition input (status bit 10), when a status word was present.
    pub ignition: Option<bool>,
    /// Raw status word.
    pub status: Option<u32>,
    /// Serving cell, when transmitted in full.
    pub cell: Option<CellTowerInfo>,
}

fn bit(value: u32, index: u32) -> bool {
    value & (1 << index) != 0
}

impl PositionRecord {
    /// Decode the 8-hex-digit status word into alarm and ignition state.
    ///
    /// Alarm bits signal by being CLEAR, not set, and the first matching
    /// rule wins. This polarity matches observed device behavior; do not
    /// invert it without device documentation.
    pub fn apply_status(&mut self, status: u32) {
        self.alarm = if !bit(status, 0) {
            Some(Alarm::Vibration)
        } else if !bit(status, 1) || !bit(status, 18) {
            Some(Alarm::Sos)
        } else if !bit(status, 2) {
            Some(Alarm::Overspeed)
        } else if !bit(status, 19) {
            Some(Alarm::PowerCut)
        } else {
            None
        };
        self.ignition = Some(bit(status, 10));
        self.status = Some(status);
    }
}
