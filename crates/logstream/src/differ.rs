/// Returns the part of `output` that has not been processed yet.
///
/// `output` is the full output captured so far and is assumed to be
/// cumulative: every earlier call's output is a prefix of this one. The
/// returned slice starts at `processed_bytes` and is empty when nothing new
/// has been produced.
///
/// Returns `None` when `output` is shorter than `processed_bytes`. Output that
/// diverges from the earlier prefix without shrinking is not detected.
///
/// ```
/// use logstream::new_output;
///
/// assert_eq!(new_output(b"hello world", 5), Some(&b" world"[..]));
/// assert_eq!(new_output(b"hello", 5), Some(&b""[..]));
/// assert_eq!(new_output(b"hell", 5), None);
/// ```
pub fn new_output(output: &[u8], processed_bytes: usize) -> Option<&[u8]> {
    output.get(processed_bytes..)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_output_has_nothing_new() {
        assert_eq!(new_output(b"", 0), Some(&b""[..]));
    }

    #[test]
    fn first_call_returns_everything() {
        assert_eq!(new_output(b"hello", 0), Some(&b"hello"[..]));
    }

    #[test]
    fn returns_suffix_after_processed_bytes() {
        assert_eq!(new_output(b"hello world", 5), Some(&b" world"[..]));
    }

    #[test]
    fn unchanged_output_is_empty() {
        let suffix = new_output(b"hello", 5).unwrap();
        assert!(suffix.is_empty());
    }

    #[test]
    fn shrunk_output_is_rejected() {
        assert_eq!(new_output(b"hi", 5), None);
    }
}
