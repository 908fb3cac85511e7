use hearth::buffer::Buffer;

#[test]
fn test_append_peek_roundtrip() {
    let mut buf = Buffer::new();
    buf.append(b"hello world");

    assert_eq!(buf.readable_bytes(), 11);
    assert_eq!(buf.peek(), b"hello world");
}

#[test]
fn test_advance_consumes_front() {
    let mut buf = Buffer::new();
    buf.append(b"hello world");
    buf.advance(6);

    assert_eq!(buf.readable_bytes(), 5);
    assert_eq!(buf.peek(), b"world");
}

#[test]
fn test_byte_accounting() {
    let mut buf = Buffer::new();
    let mut appended = 0;
    let mut consumed = 0;

    for chunk in [&b"abc"[..], &b"defgh"[..], &b"ij"[..]] {
        buf.append(chunk);
        appended += chunk.len();
    }
    buf.advance(4);
    consumed += 4;

    assert_eq!(buf.readable_bytes(), appended - consumed);
}

#[test]
fn test_compaction_preserves_unread_bytes() {
    let mut buf = Buffer::with_capacity(16);
    buf.append(b"0123456789");
    buf.advance(6);
    // 6 writable + 6 reclaimable in front: this append compacts in place.
    buf.append(b"abcdefgh");

    assert_eq!(buf.peek(), b"6789abcdefgh");
}

#[test]
fn test_reallocation_preserves_unread_bytes() {
    let mut buf = Buffer::with_capacity(8);
    buf.append(b"01234567");
    buf.append(b"abcdefghijklmnop");

    assert_eq!(buf.peek(), b"01234567abcdefghijklmnop");
}

#[test]
fn test_reset_clears_cursors() {
    let mut buf = Buffer::new();
    buf.append(b"leftover");
    buf.advance(3);
    buf.reset();

    assert_eq!(buf.readable_bytes(), 0);
    assert!(buf.writable_bytes() > 0);
    assert_eq!(buf.peek(), b"");
}

#[test]
fn test_vectored_read_small_payload() {
    let data = b"GET / HTTP/1.1\r\n\r\n";
    let mut src: &[u8] = data;
    let mut buf = Buffer::new();

    let n = buf.read_from(&mut src).unwrap();

    assert_eq!(n, data.len());
    assert_eq!(buf.peek(), data);
}

#[test]
fn test_vectored_read_overflows_into_scratch() {
    // Larger than the default capacity: the tail of the first read lands in
    // the scratch area and must be appended without loss.
    let data = vec![7u8; 70_000];
    let mut src: &[u8] = &data;
    let mut buf = Buffer::new();

    let mut total = 0;
    loop {
        let n = buf.read_from(&mut src).unwrap();
        if n == 0 {
            break;
        }
        total += n;
    }

    assert_eq!(total, data.len());
    assert_eq!(buf.readable_bytes(), data.len());
    assert_eq!(buf.peek(), &data[..]);
}

#[test]
fn test_read_zero_signals_closed_source() {
    let mut src: &[u8] = b"";
    let mut buf = Buffer::new();

    assert_eq!(buf.read_from(&mut src).unwrap(), 0);
}
