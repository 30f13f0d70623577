//! Sentence grammar for HQ location reports.
//!
//! Hand-written recursive-descent matcher. The grammar has several optional
//! and alternating groups; an alternative commits only if the remainder of
//! the sentence also matches, so the matcher backtracks with cursor
//! checkpoints at those points instead of using a monolithic regex.

/// Upper bound on accepted sentence length.
const MAX_SENTENCE_LEN: usize = 1024;

/// A coordinate as transmitted, before conversion to decimal degrees.
///
/// The device encodes the hemisphere in the choice of form, not in the
/// N/S/E/W letters that follow the field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawCoordinate {
    /// `-<deg>-<min.frac>` form; converts to a negated value.
    Negative { degrees: u32, minutes: f64 },
    /// `<deg><mm>.<frac>` form, the last two integer digits being the
    /// whole minutes.
    Unsigned { degrees: u32, minutes: f64 },
}

impl RawCoordinate {
    /// Decimal degrees. The sign comes entirely from which alternative the
    /// sentence used; hemisphere letters are never applied here.
    pub fn to_degrees(self) -> f64 {
        match self {
            Self::Negative { degrees, minutes } => -(degrees as f64 + minutes / 60.0),
            Self::Unsigned { degrees, minutes } => degrees as f64 + minutes / 60.0,
        }
    }
}

/// One named slot per grammar position, in grammar order.
///
/// A `None` slot means the enclosing optional group was absent even though
/// the sentence as a whole matched. Presence is the only signal the field
/// interpreter uses to pick its branches.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Captures {
    /// Transmitted device identifier (IMEI or short serial).
    pub device_id: Option<String>,
    /// Free-text payload of the `V4` response form.
    pub response: Option<String>,
    /// `V`-prefixed message token of the plain report form.
    pub message: Option<String>,
    /// Time of day as (hours, minutes, seconds).
    pub time: Option<(u32, u32, u32)>,
    /// Validity letter `A`, `B` or `V`.
    pub validity: Option<char>,
    /// Numeric coding-scheme digits some firmware sends in place of a
    /// validity letter. The value itself is discarded downstream.
    pub coding_scheme: Option<String>,
    pub latitude: Option<RawCoordinate>,
    pub longitude: Option<RawCoordinate>,
    pub speed: f64,
    pub course: Option<f64>,
    /// Date as (day, month, two-digit year), transmitted day-month-year.
    pub date: Option<(u32, u32, u32)>,
    /// 8-hex-digit status word.
    pub status: Option<u32>,
    /// Cellular tuple (MCC, MNC, LAC, CID), present only as a whole.
    pub cell: Option<(u32, u32, u32, u32)>,
}

/// Match a trimmed sentence against the report grammar.
///
/// Returns `None` when the sentence does not conform; foreign or corrupt
/// sentences are dropped, never escalated as errors.
pub fn match_sentence(sentence: &str) -> Option<Captures> {
    if sentence.len() > MAX_SENTENCE_LEN || !sentence.is_ascii() {
        return None;
    }
    let mut cur = Cursor::new(sentence);

    if !cur.eat(b'*') {
        return None;
    }
    // two-character manufacturer code, discarded
    cur.bump()?;
    cur.bump()?;
    if !cur.eat(b',') {
        return None;
    }

    let device_id = cur.digits().map(str::to_owned);
    if !cur.eat(b',') {
        return None;
    }

    // Either "V4,<response>," or a bare V-prefixed token. The V4 form is
    // tried first and only commits if the rest of the sentence matches,
    // since a token like "V4" alone also fits the second form.
    let mark = cur.mark();
    if cur.eat_str("V4,") {
        let response = cur.field().to_owned();
        if cur.eat(b',')
            && let Some(mut captures) = match_body(&mut cur)
        {
            captures.device_id = device_id;
            captures.response = Some(response);
            return Some(captures);
        }
        cur.reset(mark);
    }

    if cur.peek() != Some(b'V') {
        return None;
    }
    let message = cur.field().to_owned();
    if !cur.eat(b',') {
        return None;
    }
    let mut captures = match_body(&mut cur)?;
    captures.device_id = device_id;
    captures.message = Some(message);
    Some(captures)
}

/// Everything from the time-of-day slot to the `#` terminator.
fn match_body(cur: &mut Cursor) -> Option<Captures> {
    let mut captures = Captures::default();

    // optional hhmmss
    if cur.peek() != Some(b',') {
        let hours = cur.exact_digits(2)?.parse().ok()?;
        let minutes = cur.exact_digits(2)?.parse().ok()?;
        let seconds = cur.exact_digits(2)?.parse().ok()?;
        captures.time = Some((hours, minutes, seconds));
    }
    if !cur.eat(b',') {
        return None;
    }

    // validity letter, empty slot, or numeric coding scheme
    match cur.peek()? {
        letter @ (b'A' | b'B' | b'V') => {
            cur.bump();
            captures.validity = Some(letter as char);
        }
        b'0'..=b'9' => {
            captures.coding_scheme = cur.digits().map(str::to_owned);
        }
        b',' => {}
        _ => return None,
    }
    if !cur.eat(b',') {
        return None;
    }

    captures.latitude = Some(coordinate(cur)?);
    if !matches!(cur.bump()?, b'N' | b'S') {
        return None;
    }
    if !cur.eat(b',') {
        return None;
    }

    captures.longitude = Some(coordinate(cur)?);
    if !matches!(cur.bump()?, b'E' | b'W') {
        return None;
    }
    if !cur.eat(b',') {
        return None;
    }

    captures.speed = decimal(cur)?;
    if !cur.eat(b',') {
        return None;
    }

    // optional course
    if cur.peek() != Some(b',') {
        captures.course = Some(decimal(cur)?);
    }
    if !cur.eat(b',') {
        return None;
    }

    let tail = match_tail(cur)?;
    captures.date = tail.date;
    captures.status = tail.status;
    captures.cell = tail.cell;
    Some(captures)
}

/// Latitude or longitude in either of its two forms, comma included.
fn coordinate(cur: &mut Cursor) -> Option<RawCoordinate> {
    if cur.eat(b'-') {
        let degrees = cur.digits()?.parse().ok()?;
        if !cur.eat(b'-') {
            return None;
        }
        let start = cur.mark();
        cur.digits()?;
        if !cur.eat(b'.') {
            return None;
        }
        cur.digits()?;
        let minutes = cur.str_from(start).parse().ok()?;
        if !cur.eat(b',') {
            return None;
        }
        Some(RawCoordinate::Negative { degrees, minutes })
    } else {
        let integer = cur.digits()?;
        // at least one degree digit plus the two minute digits
        if integer.len() < 3 {
            return None;
        }
        if !cur.eat(b'.') {
            return None;
        }
        let fraction = cur.digits()?;
        if !cur.eat(b',') {
            return None;
        }
        let (degrees, whole_minutes) = integer.split_at(integer.len() - 2);
        let minutes = format!("{whole_minutes}.{fraction}").parse().ok()?;
        Some(RawCoordinate::Unsigned {
            degrees: degrees.parse().ok()?,
            minutes,
        })
    }
}

/// Decimal number of the form `d+`, `d+.` or `d+.d+`.
fn decimal(cur: &mut Cursor) -> Option<f64> {
    let start = cur.mark();
    cur.digits()?;
    if cur.eat(b'.') {
        cur.digits();
    }
    cur.str_from(start).parse().ok()
}

#[derive(Debug, Default)]
struct Tail {
    date: Option<(u32, u32, u32)>,
    status: Option<u32>,
    cell: Option<(u32, u32, u32, u32)>,
}

/// Tail of the sentence after the course comma: optional battery level,
/// optional date, optional SIM-metadata block, optional status word with
/// optional cell tuple, then the `#` terminator. Each optional piece is
/// tried present-first and gives its bytes back if the rest cannot match.
fn match_tail(cur: &mut Cursor) -> Option<Tail> {
    let mark = cur.mark();
    // battery level, value discarded
    if cur.digits().is_some()
        && cur.eat(b',')
        && let Some(tail) = tail_after_battery(cur)
    {
        return Some(tail);
    }
    cur.reset(mark);
    tail_after_battery(cur)
}

fn tail_after_battery(cur: &mut Cursor) -> Option<Tail> {
    let mark = cur.mark();
    if let Some(date) = date_triple(cur) {
        if let Some(mut tail) = tail_after_date(cur) {
            tail.date = Some(date);
            return Some(tail);
        }
    }
    cur.reset(mark);
    tail_after_date(cur)
}

/// Six digits, day-month-year, no delimiter.
fn date_triple(cur: &mut Cursor) -> Option<(u32, u32, u32)> {
    let day = cur.exact_digits(2)?.parse().ok()?;
    let month = cur.exact_digits(2)?.parse().ok()?;
    let year = cur.exact_digits(2)?.parse().ok()?;
    Some((day, month, year))
}

fn tail_after_date(cur: &mut Cursor) -> Option<Tail> {
    let mark = cur.mark();
    // two free-text fields plus the SIM-info field, all discarded
    if cur.eat(b',') {
        cur.field();
        if cur.eat(b',') {
            cur.field();
            if cur.eat(b',') {
                cur.field();
                if let Some(tail) = tail_after_metadata(cur) {
                    return Some(tail);
                }
            }
        }
    }
    cur.reset(mark);
    tail_after_metadata(cur)
}

fn tail_after_metadata(cur: &mut Cursor) -> Option<Tail> {
    let mark = cur.mark();
    if cur.eat(b',')
        && let Some(status) = cur.hex_digits(8)
        && let Ok(status) = u32::from_str_radix(status, 16)
    {
        let cell_mark = cur.mark();
        if let Some(cell) = cell_tuple(cur) {
            if terminator(cur) {
                return Some(Tail {
                    date: None,
                    status: Some(status),
                    cell: Some(cell),
                });
            }
        }
        cur.reset(cell_mark);
        if terminator(cur) {
            return Some(Tail {
                date: None,
                status: Some(status),
                cell: None,
            });
        }
    }
    cur.reset(mark);
    terminator(cur).then(Tail::default)
}

fn cell_tuple(cur: &mut Cursor) -> Option<(u32, u32, u32, u32)> {
    if !cur.eat(b',') {
        return None;
    }
    let mcc = cur.digits()?.parse().ok()?;
    if !cur.eat(b',') {
        return None;
    }
    let mnc = cur.digits()?.parse().ok()?;
    if !cur.eat(b',') {
        return None;
    }
    let lac = cur.digits()?.parse().ok()?;
    if !cur.eat(b',') {
        return None;
    }
    let cid = cur.digits()?.parse().ok()?;
    Some((mcc, mnc, lac, cid))
}

fn terminator(cur: &mut Cursor) -> bool {
    cur.eat(b'#') && cur.at_end()
}

/// Byte cursor over an ASCII sentence with checkpoint/restore.
struct Cursor<'a> {
    sentence: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(sentence: &'a str) -> Self {
        Self { sentence, pos: 0 }
    }

    fn mark(&self) -> usize {
        self.pos
    }

    fn reset(&mut self, mark: usize) {
        self.pos = mark;
    }

    fn at_end(&self) -> bool {
        self.pos == self.sentence.len()
    }

    fn peek(&self) -> Option<u8> {
        self.sentence.as_bytes().get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_str(&mut self, literal: &str) -> bool {
        if self.sentence[self.pos..].starts_with(literal) {
            self.pos += literal.len();
            true
        } else {
            false
        }
    }

    /// One or more consecutive decimal digits.
    fn digits(&mut self) -> Option<&'a str> {
        let start = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        (self.pos > start).then(|| self.str_from(start))
    }

    /// Exactly `count` decimal digits.
    fn exact_digits(&mut self, count: usize) -> Option<&'a str> {
        let start = self.pos;
        for _ in 0..count {
            if !matches!(self.peek(), Some(b'0'..=b'9')) {
                self.pos = start;
                return None;
            }
            self.pos += 1;
        }
        Some(self.str_from(start))
    }

    /// Exactly `count` hexadecimal digits.
    fn hex_digits(&mut self, count: usize) -> Option<&'a str> {
        let start = self.pos;
        for _ in 0..count {
            if !self.peek().is_some_and(|b| b.is_ascii_hexdigit()) {
                self.pos = start;
                return None;
            }
            self.pos += 1;
        }
        Some(self.str_from(start))
    }

    /// Zero or more bytes up to the next comma or terminator.
    fn field(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(byte) = self.peek() {
            if byte == b',' || byte == b'#' {
                break;
            }
            self.pos += 1;
        }
        self.str_from(start)
    }

    fn str_from(&self, start: usize) -> &'a str {
        &self.sentence[start..self.pos]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_report() {
        let captures = match_sentence(
            "*HQ,135790246811220,V1,050316,A,2212.8745,N,11346.6574,E,14,28,220923,FFFFFBFF#",
        )
        .unwrap();
        assert_eq!(captures.device_id.as_deref(), Some("135790246811220"));
        assert_eq!(captures.message.as_deref(), Some("V1"));
        assert_eq!(captures.response, None);
        assert_eq!(captures.time, Some((5, 3, 16)));
        assert_eq!(captures.validity, Some('A'));
        assert_eq!(
            captures.latitude,
            Some(RawCoordinate::Unsigned {
                degrees: 22,
                minutes: 12.8745
            })
        );
        assert_eq!(
            captures.longitude,
            Some(RawCoordinate::Unsigned {
                degrees: 113,
                minutes: 46.6574
            })
        );
        assert_eq!(captures.speed, 14.0);
        assert_eq!(captures.course, Some(28.0));
        assert_eq!(captures.date, Some((22, 9, 23)));
        assert_eq!(captures.status, Some(0xFFFFFBFF));
        assert_eq!(captures.cell, None);
    }

    #[test]
    fn test_report_with_cell_tuple() {
        let captures = match_sentence(
            "*HQ,4210209006,V19,104156,A,2235.8975,N,11346.1234,E,000.00,000,240425,FFFFFBFF,460,0,25443,12624#",
        )
        .unwrap();
        assert_eq!(captures.message.as_deref(), Some("V19"));
        assert_eq!(captures.status, Some(0xFFFFFBFF));
        assert_eq!(captures.cell, Some((460, 0, 25443, 12624)));
    }

    #[test]
    fn test_v4_response_form() {
        let captures = match_sentence(
            "*HQ,9171113867,V4,confirmed,101530,A,2230.1234,N,11404.6541,E,0.00,0,050324#",
        )
        .unwrap();
        assert_eq!(captures.response.as_deref(), Some("confirmed"));
        assert_eq!(captures.message, None);
        assert_eq!(captures.date, Some((5, 3, 24)));
    }

    #[test]
    fn test_v4_token_without_payload_falls_back() {
        // "V4" followed directly by the time field is the plain form with a
        // "V4" message token, not the response form.
        let captures = match_sentence(
            "*HQ,1234567890,V4,101530,A,2230.1234,N,11404.6541,E,0.00,0,050324#",
        )
        .unwrap();
        assert_eq!(captures.response, None);
        assert_eq!(captures.message.as_deref(), Some("V4"));
        assert_eq!(captures.time, Some((10, 15, 30)));
    }

    #[test]
    fn test_negative_degree_form() {
        let captures =
            match_sentence("*TQ,2090026468,V1,,0,-22-30.1234,N,-114-4.6541,W,0.00,,#").unwrap();
        assert_eq!(captures.time, None);
        assert_eq!(captures.validity, None);
        assert_eq!(captures.coding_scheme.as_deref(), Some("0"));
        assert_eq!(
            captures.latitude,
            Some(RawCoordinate::Negative {
                degrees: 22,
                minutes: 30.1234
            })
        );
        assert_eq!(
            captures.longitude,
            Some(RawCoordinate::Negative {
                degrees: 114,
                minutes: 4.6541
            })
        );
        assert_eq!(captures.course, None);
        assert_eq!(captures.date, None);
        assert_eq!(captures.status, None);
    }

    #[test]
    fn test_battery_level_discarded() {
        let captures = match_sentence(
            "*HQ,1451316051,V1,121557,A,3214.9369,N,03452.9810,E,000.00,000,95,240311,FFFFFBFF#",
        )
        .unwrap();
        assert_eq!(captures.date, Some((24, 3, 11)));
        assert_eq!(captures.status, Some(0xFFFFFBFF));
    }

    #[test]
    fn test_metadata_block_discarded() {
        let captures = match_sentence(
            "*HQ,9171113867,V1,101530,A,2230.1234,N,11404.6541,E,0.00,0,050324,9170000000,01,89860437012345678901#",
        )
        .unwrap();
        assert_eq!(captures.date, Some((5, 3, 24)));
        assert_eq!(captures.status, None);
        assert_eq!(captures.cell, None);
    }

    #[test]
    fn test_two_trailing_fields_parse_as_metadata_not_cell() {
        // With only two values after the status word the tail fits the
        // metadata block instead; neither status nor cell is captured.
        let captures = match_sentence(
            "*HQ,1451316051,V1,121557,A,3214.9369,N,03452.9810,E,000.00,000,240311,FFFFFBFF,460,0#",
        )
        .unwrap();
        assert_eq!(captures.status, None);
        assert_eq!(captures.cell, None);
    }

    #[test]
    fn test_three_of_four_cell_fields_rejected() {
        assert_eq!(
            match_sentence(
                "*HQ,1451316051,V1,121557,A,3214.9369,N,03452.9810,E,000.00,000,240311,FFFFFBFF,460,0,9163#",
            ),
            None
        );
    }

    #[test]
    fn test_missing_device_id_still_matches() {
        let captures =
            match_sentence("*HQ,,V1,121557,A,3214.9369,N,03452.9810,E,000.00,000,240311#").unwrap();
        assert_eq!(captures.device_id, None);
    }

    #[test]
    fn test_validity_letter_v() {
        let captures =
            match_sentence("*HQ,123,V1,121557,V,3214.9369,N,03452.9810,E,0.00,0,240311#").unwrap();
        assert_eq!(captures.validity, Some('V'));
        assert_eq!(captures.coding_scheme, None);
    }

    #[test]
    fn test_malformed_sentences_rejected() {
        assert_eq!(match_sentence(""), None);
        assert_eq!(match_sentence("*HQ"), None);
        assert_eq!(match_sentence("*HQ,123,X1,121557,A#"), None);
        // five-digit time
        assert_eq!(
            match_sentence("*HQ,123,V1,12155,A,3214.9369,N,03452.9810,E,0.00,0,240311#"),
            None
        );
        // missing terminator
        assert_eq!(
            match_sentence("*HQ,123,V1,121557,A,3214.9369,N,03452.9810,E,0.00,0,240311"),
            None
        );
        // trailing garbage after terminator
        assert_eq!(
            match_sentence("*HQ,123,V1,121557,A,3214.9369,N,03452.9810,E,0.00,0,240311#x"),
            None
        );
    }

    #[test]
    fn test_oversized_sentence_rejected() {
        let mut sentence = String::from("*HQ,123,V4,");
        sentence.push_str(&"a".repeat(MAX_SENTENCE_LEN));
        sentence.push('#');
        assert_eq!(match_sentence(&sentence), None);
    }
}
