//! Binary request/response framing shared by server and client
//!
//! Request:
//! - 1 byte: search mode bits
//! - 4 bytes (little-endian i32): query length
//! - N bytes: UTF-8 query
//!
//! Response, per occurrence:
//! - i32 user-data size, then the bytes when `USER_DATA` is set
//! - i32 needle length and UTF-8 bytes when `NEEDLE` is set
//!
//! A lone `-1` answers a query with no occurrence (or one that is not UTF-8).
//! Unless `FIRST` is set, the occurrence list is terminated by a trailing `-1`.

use crate::automaton::{Occurrence, SearchMode};
use crate::utils::{read_bytes, read_i32_le, read_u8, write_i32_le, write_u8};
use std::io::{self, Read, Write};

/// End-of-response marker
pub const SENTINEL: i32 = -1;

/// Largest query or payload accepted off the wire
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// One decoded request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub mode: SearchMode,
    pub query: Vec<u8>,
}

/// An occurrence as seen by a client
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteOccurrence {
    /// Payload, empty unless `USER_DATA` was requested
    pub user_data: Vec<u8>,
    /// Needle text when `NEEDLE` was requested
    pub needle: Option<String>,
}

fn invalid(msg: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.to_string())
}

/// Read a length prefix and check it against the frame limit
fn read_len<R: Read>(reader: &mut R, what: &str) -> io::Result<usize> {
    let len = read_i32_le(reader)?;
    let len = usize::try_from(len).map_err(|_| invalid(&format!("Negative {} length", what)))?;
    if len > MAX_FRAME_LEN {
        return Err(invalid(&format!("{} too large", what)));
    }
    Ok(len)
}

/// Write a request
pub fn write_request<W: Write>(writer: &mut W, mode: SearchMode, query: &[u8]) -> io::Result<()> {
    let len = i32::try_from(query.len()).map_err(|_| invalid("Query too large"))?;
    write_u8(writer, mode.0)?;
    write_i32_le(writer, len)?;
    writer.write_all(query)?;
    writer.flush()
}

/// Read a request
pub fn read_request<R: Read>(reader: &mut R) -> io::Result<Request> {
    let mode = SearchMode(read_u8(reader)?);
    let len = read_len(reader, "Query")?;
    let query = read_bytes(reader, len)?;
    Ok(Request { mode, query })
}

fn write_len<W: Write>(writer: &mut W, len: usize) -> io::Result<()> {
    write_i32_le(writer, i32::try_from(len).map_err(|_| invalid("Frame too large"))?)
}

/// Encode the answer to a request
pub fn encode_response(occurrences: &[Occurrence<'_>], mode: SearchMode) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();

    if occurrences.is_empty() {
        write_i32_le(&mut buf, SENTINEL)?;
        return Ok(buf);
    }

    for occurrence in occurrences {
        let user_data = occurrence.user_data.unwrap_or_default();
        write_len(&mut buf, user_data.len())?;
        if mode.wants_user_data() {
            buf.extend_from_slice(user_data);
        }
        if mode.wants_needle() {
            let needle = occurrence.needle.as_deref().unwrap_or_default();
            write_len(&mut buf, needle.len())?;
            buf.extend_from_slice(needle.as_bytes());
        }
    }

    if !mode.is_first() {
        write_i32_le(&mut buf, SENTINEL)?;
    }

    Ok(buf)
}

/// Answer for a query that could not be searched
pub fn empty_response() -> Vec<u8> {
    SENTINEL.to_le_bytes().to_vec()
}

/// Read one response for a request sent with `mode`
pub fn read_response<R: Read>(reader: &mut R, mode: SearchMode) -> io::Result<Vec<RemoteOccurrence>> {
    let mut occurrences = Vec::new();

    loop {
        let size = read_i32_le(reader)?;
        if size == SENTINEL {
            break;
        }
        let size = usize::try_from(size).map_err(|_| invalid("Negative user data size"))?;
        if size > MAX_FRAME_LEN {
            return Err(invalid("User data too large"));
        }

        let mut occurrence = RemoteOccurrence::default();
        if mode.wants_user_data() {
            occurrence.user_data = read_bytes(reader, size)?;
        }
        if mode.wants_needle() {
            let len = read_len(reader, "Needle")?;
            let bytes = read_bytes(reader, len)?;
            let needle = String::from_utf8(bytes).map_err(|_| invalid("Needle is not UTF-8"))?;
            occurrence.needle = Some(needle);
        }
        occurrences.push(occurrence);

        if mode.is_first() {
            break;
        }
    }

    Ok(occurrences)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn occurrence<'a>(data: Option<&'a [u8]>, needle: Option<&str>) -> Occurrence<'a> {
        Occurrence {
            start: 0,
            end: 1,
            state: 2,
            user_data: data,
            needle: needle.map(str::to_string),
        }
    }

    #[test]
    fn test_request_roundtrip() {
        let mut buf = Vec::new();
        let mode = SearchMode(SearchMode::FIRST | SearchMode::NEEDLE);
        write_request(&mut buf, mode, "héllo".as_bytes()).unwrap();
        assert_eq!(buf[0], 5);
        assert_eq!(&buf[1..5], &6i32.to_le_bytes());

        let request = read_request(&mut Cursor::new(buf)).unwrap();
        assert_eq!(request.mode, mode);
        assert_eq!(request.query, "héllo".as_bytes());
    }

    #[test]
    fn test_request_rejects_negative_length() {
        let mut buf = vec![0u8];
        buf.extend_from_slice(&(-5i32).to_le_bytes());
        let err = read_request(&mut Cursor::new(buf)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_truncated_request() {
        let mut buf = vec![0u8];
        buf.extend_from_slice(&10i32.to_le_bytes());
        buf.extend_from_slice(b"short");
        let err = read_request(&mut Cursor::new(buf)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_no_occurrence_is_one_sentinel() {
        for bits in [SearchMode::ALL, SearchMode::FIRST] {
            let buf = encode_response(&[], SearchMode(bits)).unwrap();
            assert_eq!(buf, empty_response());
            assert!(read_response(&mut Cursor::new(buf), SearchMode(bits)).unwrap().is_empty());
        }
    }

    #[test]
    fn test_response_layout() {
        let mode = SearchMode(SearchMode::USER_DATA | SearchMode::NEEDLE);
        let found = [occurrence(Some(&b"xy"[..]), Some("he")), occurrence(None, Some("she"))];
        let buf = encode_response(&found, mode).unwrap();

        let mut expected = Vec::new();
        expected.extend_from_slice(&2i32.to_le_bytes());
        expected.extend_from_slice(b"xy");
        expected.extend_from_slice(&2i32.to_le_bytes());
        expected.extend_from_slice(b"he");
        expected.extend_from_slice(&0i32.to_le_bytes());
        expected.extend_from_slice(&3i32.to_le_bytes());
        expected.extend_from_slice(b"she");
        expected.extend_from_slice(&(-1i32).to_le_bytes());
        assert_eq!(buf, expected);

        let decoded = read_response(&mut Cursor::new(buf), mode).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].user_data, b"xy");
        assert_eq!(decoded[1].needle.as_deref(), Some("she"));
    }

    #[test]
    fn test_first_mode_has_no_trailer() {
        let mode = SearchMode(SearchMode::FIRST);
        let buf = encode_response(&[occurrence(None, None)], mode).unwrap();
        assert_eq!(buf, 0i32.to_le_bytes().to_vec());

        // A following response must stay unread
        let mut stream = buf.clone();
        stream.extend_from_slice(&empty_response());
        let mut cursor = Cursor::new(stream);
        assert_eq!(read_response(&mut cursor, mode).unwrap().len(), 1);
        assert!(read_response(&mut cursor, mode).unwrap().is_empty());
    }

    #[test]
    fn test_payload_size_without_payload() {
        // Size is sent even when the bytes are not
        let mode = SearchMode(SearchMode::ALL);
        let buf = encode_response(&[occurrence(Some(&b"abc"[..]), None)], mode).unwrap();
        assert_eq!(&buf[..4], &3i32.to_le_bytes());
        assert_eq!(buf.len(), 8);
    }
}
