use std::borrow::Cow;

// Header/body delimiter: the blank line that ends the header block.
pub const HEADER_END: &[u8] = b"\r\n\r\n";
pub const CRLF: &str = "\r\n";

// Position of the first occurrence of `needle` in `haystack`, if any.
pub fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|window| window == needle)
}

/*
Permissive text decoding. Invalid UTF-8 sequences become U+FFFD instead of failing,
so encoding noise in a header never aborts a connection on its own. Valid input is
borrowed as-is.
*/
pub fn decode_lossy(bytes: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}

// Splits `data` around every occurrence of `delimiter`, like a byte-level `str::split`.
pub fn split_bytes<'a>(data: &'a [u8], delimiter: &[u8]) -> Vec<&'a [u8]> {
    let mut parts = Vec::new();
    let mut rest = data;
    while let Some(pos) = find(rest, delimiter) {
        parts.push(&rest[..pos]);
        rest = &rest[pos + delimiter.len()..];
    }
    parts.push(rest);
    parts
}

// Splits once around the first `delimiter`.
pub fn split_once_bytes<'a>(data: &'a [u8], delimiter: &[u8]) -> Option<(&'a [u8], &'a [u8])> {
    let pos = find(data, delimiter)?;
    Some((&data[..pos], &data[pos + delimiter.len()..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find() {
        assert_eq!(find(b"abc\r\n\r\nrest", HEADER_END), Some(3));
        assert_eq!(find(b"abc\r\n", HEADER_END), None);
        assert_eq!(find(b"", b"x"), None);
    }

    #[test]
    fn test_decode_lossy_replaces() {
        let text = decode_lossy(b"Host: \xffx");
        assert_eq!(text, "Host: \u{FFFD}x");
    }

    #[test]
    fn test_split_bytes() {
        let parts = split_bytes(b"--a--b--", b"--");
        assert_eq!(parts, vec![&b""[..], b"a", b"b", b""]);
        assert_eq!(split_bytes(b"plain", b"--"), vec![&b"plain"[..]]);
    }

    #[test]
    fn test_split_once_bytes() {
        let (head, tail) = split_once_bytes(b"h\r\n\r\nbody\r\n\r\nmore", HEADER_END).unwrap();
        assert_eq!(head, b"h");
        assert_eq!(tail, b"body\r\n\r\nmore");
    }
}
