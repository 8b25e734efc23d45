//! Just enough RTF scanning to find `\objclass` names and decode the
//! payloads of `\objdata` groups.

use crate::document::{find, OLE_MAGIC};

/// Cap on a single decoded `\objdata` payload.
const MAX_OBJDATA_DECODE: usize = 16 * 1024 * 1024;

const OBJDATA: &[u8] = b"\\objdata";
const OBJCLASS: &[u8] = b"\\objclass";

/// Class names declared by `\objclass` control words, in document order.
pub fn object_classes(data: &[u8]) -> Vec<String> {
    let mut classes = Vec::new();
    let mut pos = 0;
    while let Some(offset) = find(&data[pos..], OBJCLASS) {
        let mut i = pos + offset + OBJCLASS.len();
        while i < data.len() && matches!(data[i], b' ' | b'\t') {
            i += 1;
        }
        let start = i;
        while i < data.len() && !matches!(data[i], b'}' | b'\\' | b'{' | b' ' | b'\t' | b'\r' | b'\n')
        {
            i += 1;
        }
        let name = String::from_utf8_lossy(&data[start..i]).trim().to_string();
        if !name.is_empty() {
            classes.push(name);
        }
        pos = i.max(pos + offset + 1);
    }
    classes
}

/// Decoded payloads of every `\objdata` group. Hex digit pairs are decoded
/// with whitespace ignored; a `\binN` run is copied verbatim.
pub fn objdata_payloads(data: &[u8]) -> Vec<Vec<u8>> {
    let mut payloads = Vec::new();
    let mut pos = 0;
    while let Some(offset) = find(&data[pos..], OBJDATA) {
        let mut i = pos + offset + OBJDATA.len();
        let payload = decode_payload(data, &mut i);
        if !payload.is_empty() {
            payloads.push(payload);
        }
        pos = i.max(pos + offset + 1);
    }
    payloads
}

/// The embedded OLE compound file inside an OLE1 wrapper, or the whole
/// payload when no signature is present.
pub fn strip_ole1_wrapper(payload: &[u8]) -> &[u8] {
    match find(payload, OLE_MAGIC) {
        Some(start) => &payload[start..],
        None => payload,
    }
}

fn decode_payload(data: &[u8], i: &mut usize) -> Vec<u8> {
    let mut out = Vec::new();
    let mut pending: Option<u8> = None;

    while *i < data.len() && out.len() < MAX_OBJDATA_DECODE {
        let c = data[*i];
        match c {
            b'}' => break,
            b'\\' => {
                if data[*i..].starts_with(b"\\bin") {
                    if let Some(run) = read_bin_run(data, i) {
                        out.extend_from_slice(run);
                    }
                    continue;
                }
                // skip an unrelated control word and its numeric parameter
                *i += 1;
                while *i < data.len() && data[*i].is_ascii_alphabetic() {
                    *i += 1;
                }
                while *i < data.len() && (data[*i].is_ascii_digit() || data[*i] == b'-') {
                    *i += 1;
                }
            }
            b'{' => *i += 1,
            _ => {
                if let Some(nibble) = hex_value(c) {
                    match pending.take() {
                        Some(hi) => out.push((hi << 4) | nibble),
                        None => pending = Some(nibble),
                    }
                }
                *i += 1;
            }
        }
    }
    out
}

fn read_bin_run<'a>(data: &'a [u8], i: &mut usize) -> Option<&'a [u8]> {
    *i += 4;
    let start = *i;
    while *i < data.len() && data[*i].is_ascii_digit() {
        *i += 1;
    }
    let len: usize = std::str::from_utf8(&data[start..*i]).ok()?.parse().ok()?;
    if *i < data.len() && data[*i] == b' ' {
        *i += 1;
    }
    let end = i.checked_add(len)?.min(data.len());
    let run = &data[*i..end];
    *i = end;
    Some(run)
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_classes() {
        let rtf = b"{\\rtf1{\\object\\objemb{\\*\\objclass Equation.3}{\\*\\objdata 0102}}}";
        assert_eq!(object_classes(rtf), vec!["Equation.3"]);
    }

    #[test]
    fn test_objdata_hex_with_whitespace() {
        let rtf = b"{\\rtf1{\\object{\\*\\objdata 01 05\r\n00 00\n0aFF}}}";
        assert_eq!(objdata_payloads(rtf), vec![vec![0x01, 0x05, 0x00, 0x00, 0x0a, 0xff]]);
    }

    #[test]
    fn test_objdata_bin_run() {
        let mut rtf = b"{\\rtf1{\\*\\objdata \\bin4 ".to_vec();
        rtf.extend_from_slice(&[0x00, b'}', 0xff, 0x10]);
        rtf.extend_from_slice(b"}}");
        assert_eq!(objdata_payloads(&rtf), vec![vec![0x00, b'}', 0xff, 0x10]]);
    }

    #[test]
    fn test_objdata_multiple_groups() {
        let rtf = b"{\\objdata aa}{\\objdata bb}{\\objdata }";
        assert_eq!(objdata_payloads(rtf), vec![vec![0xaa], vec![0xbb]]);
    }

    #[test]
    fn test_bin_run_longer_than_file() {
        let rtf = b"{\\objdata \\bin999 abc";
        assert_eq!(objdata_payloads(rtf), vec![b"abc".to_vec()]);
    }

    #[test]
    fn test_strip_ole1_wrapper() {
        let mut payload = vec![0x01, 0x05, 0x00, 0x00, 0x02, 0x00];
        payload.extend_from_slice(OLE_MAGIC);
        payload.extend_from_slice(b"rest");

        assert!(strip_ole1_wrapper(&payload).starts_with(OLE_MAGIC));
        assert_eq!(strip_ole1_wrapper(b"no magic"), b"no magic");
    }
}
