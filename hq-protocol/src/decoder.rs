use std::net::SocketAddr;

use chrono::{DateTime, TimeZone, Utc};
use log::warn;

use crate::clock::Clock;
use crate::frame;
use crate::grammar::{self, Captures};
use crate::identity::DeviceResolver;
use crate::position::{CellTowerInfo, PositionRecord};
use crate::transport::{NoReply, ReplyTransport};

/// Message token that requests a D4 acknowledgment.
const ACK_REQUEST: &str = "V1";

/// Decoder for HQ location-report frames.
///
/// Stateless across frames: each [`decode`](Self::decode) call handles one
/// raw frame independently, so distinct frames may be decoded in parallel
/// by distinct decoder instances.
pub struct HqDecoder<R, C, T = NoReply> {
    resolver: R,
    clock: C,
    transport: Option<T>,
}

impl<R, C> HqDecoder<R, C> {
    /// A decoder without an outbound transport; it decodes but never sends
    /// acknowledgments.
    pub fn new(resolver: R, clock: C) -> Self {
        Self {
            resolver,
            clock,
            transport: None,
        }
    }
}

impl<R, C, T> HqDecoder<R, C, T> {
    /// Attach an outbound transport for D4 acknowledgments.
    pub fn with_transport<U>(self, transport: U) -> HqDecoder<R, C, U> {
        HqDecoder {
            resolver: self.resolver,
            clock: self.clock,
            transport: Some(transport),
        }
    }
}

impl<R, C, T> HqDecoder<R, C, T>
where
    R: DeviceResolver,
    C: Clock,
    T: ReplyTransport,
{
    /// Decode one raw frame received from `source`.
    ///
    /// Returns `None` for frames of sibling protocols (other marker bytes),
    /// sentences that do not match the grammar, and unresolvable devices.
    /// Total: never fails on malformed input.
    pub fn decode(&mut self, source: SocketAddr, raw: &[u8]) -> Option<PositionRecord> {
        let sentence = frame::text_sentence(raw)?;
        let captures = grammar::match_sentence(sentence)?;
        self.interpret(source, captures)
    }

    /// Walk the capture slots in grammar order, each presence check gating
    /// its branch.
    fn interpret(&mut self, source: SocketAddr, captures: Captures) -> Option<PositionRecord> {
        let ident = captures.device_id.as_deref()?;
        let device_id = self.resolver.resolve(ident, source)?;

        if captures.message.as_deref() == Some(ACK_REQUEST) {
            self.send_ack(source, ident);
        }

        let valid = match (captures.validity, &captures.coding_scheme) {
            (Some(letter), _) => letter == 'A',
            // a numeric coding scheme in place of the validity letter
            // marks the fix valid; the value itself is discarded
            (None, Some(_)) => true,
            (None, None) => false,
        };

        let mut record = PositionRecord {
            device_id,
            time: self.report_time(&captures),
            valid,
            latitude: captures.latitude?.to_degrees(),
            longitude: captures.longitude?.to_degrees(),
            speed: captures.speed,
            course: captures.course.unwrap_or(0.0),
            result: captures.response,
            alarm: None,
            ignition: None,
            status: None,
            cell: None,
        };

        if let Some(status) = captures.status {
            record.apply_status(status);
        }
        if let Some((mcc, mnc, lac, cid)) = captures.cell {
            record.cell = Some(CellTowerInfo { mcc, mnc, lac, cid });
        }

        Some(record)
    }

    /// Assemble the report timestamp.
    ///
    /// Date and time triples present: UTC from day/month/2000+yy h:m:s.
    /// Date absent: the clock's current date, with the transmitted time of
    /// day when one was sent. A calendar-invalid combination falls back to
    /// the clock entirely.
    fn report_time(&self, captures: &Captures) -> DateTime<Utc> {
        let now = self.clock.now();
        let (hours, minutes, seconds) = captures.time.unwrap_or((0, 0, 0));
        match captures.date {
            Some((day, month, year)) => Utc
                .with_ymd_and_hms(2000 + year as i32, month, day, hours, minutes, seconds)
                .single()
                .unwrap_or(now),
            None if captures.time.is_some() => now
                .date_naive()
                .and_hms_opt(hours, minutes, seconds)
                .map(|time| Utc.from_utc_datetime(&time))
                .unwrap_or(now),
            None => now,
        }
    }

    /// Build and send the `*HQ,<id>,D4,<HHMMSS>#` reply. No-op without a
    /// transport; a failed write is logged and otherwise ignored.
    fn send_ack(&mut self, destination: SocketAddr, ident: &str) {
        let Some(transport) = self.transport.as_mut() else {
            return;
        };
        let stamp = self.clock.now().format("%H%M%S");
        let reply = format!("*HQ,{ident},D4,{stamp}#");
        if let Err(e) = transport.send_reply(reply.as_bytes(), destination) {
            warn!("failed to send D4 acknowledgment to {destination}: {e}");
        }
    }
}
