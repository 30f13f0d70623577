/// Marker byte of text sentences handled by this decoder.
pub const MARKER_TEXT: u8 = b'*';
/// Marker byte of the sibling binary protocol sharing the same transport.
pub const MARKER_BINARY: u8 = b'$';
/// Marker byte of the sibling extended protocol sharing the same transport.
pub const MARKER_EXTENDED: u8 = b'X';

/// Select the decoding path from the frame's leading marker byte.
///
/// Returns the trimmed text sentence for `*` frames. Frames with any other
/// marker (the `$` and `X` siblings included) belong to protocols this
/// decoder does not handle and yield `None`; that is not an error.
pub fn text_sentence(raw: &[u8]) -> Option<&str> {
    match *raw.first()? {
        MARKER_TEXT => std::str::from_utf8(raw).ok().map(str::trim),
        _ => None,
    }
}
