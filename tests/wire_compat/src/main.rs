fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use filecast_protocol::{TransferEnvelope, decode_frame, encode_frame};

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    /// Loads a hex fixture file as raw bytes.
    ///
    /// Fixtures freeze the envelope wire format (big-endian 64-bit length
    /// prefixes, no version tag); any codec change that alters these bytes
    /// breaks every deployed receiver and must fail here first.
    fn load_fixture(name: &str) -> Vec<u8> {
        let path = fixtures_dir().join(name);
        let text = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()));
        hex::decode(text.trim())
            .unwrap_or_else(|e| panic!("failed to decode fixture {}: {e}", path.display()))
    }

    #[test]
    fn envelope_basic_encodes_to_frozen_bytes() {
        let expected = load_fixture("envelope_basic.hex");
        let encoded = TransferEnvelope::new("req-42", vec![0x00, 0x01, 0x02]).encode();
        assert_eq!(encoded, expected);
    }

    #[test]
    fn envelope_basic_decodes_from_frozen_bytes() {
        let bytes = load_fixture("envelope_basic.hex");
        let envelope = TransferEnvelope::decode(&bytes).unwrap();
        assert_eq!(envelope.request_id, "req-42");
        assert_eq!(envelope.payload, vec![0x00, 0x01, 0x02]);
    }

    #[test]
    fn envelope_empty_payload_roundtrips_against_fixture() {
        let bytes = load_fixture("envelope_empty_payload.hex");
        let envelope = TransferEnvelope::decode(&bytes).unwrap();
        assert_eq!(envelope.request_id, "upload");
        assert!(envelope.payload.is_empty());
        assert_eq!(envelope.encode(), bytes);
    }

    #[test]
    fn truncated_fixture_prefixes_never_decode() {
        let bytes = load_fixture("envelope_basic.hex");
        for cut in 0..bytes.len() {
            assert!(
                TransferEnvelope::decode(&bytes[..cut]).is_err(),
                "prefix of {cut} bytes decoded"
            );
        }
    }

    #[test]
    fn outer_frame_wraps_the_envelope() {
        let envelope = load_fixture("envelope_basic.hex");
        let header = serde_json::json!({ "type": "fileTransfer", "file": "data.bin" });

        let (frame, correlation_id) = encode_frame(&header, &envelope).unwrap();

        // 4-byte big-endian header length prefix.
        let header_len = u32::from_be_bytes(frame[..4].try_into().unwrap()) as usize;
        let (decoded_header, body) = decode_frame(&frame).unwrap();
        assert_eq!(frame.len(), 4 + header_len + envelope.len());
        assert_eq!(decoded_header["id"], correlation_id.as_str());
        assert_eq!(decoded_header["type"], "fileTransfer");
        assert_eq!(body, envelope);

        // The correlation id on the header is not the envelope's request id.
        let inner = TransferEnvelope::decode(body).unwrap();
        assert_ne!(inner.request_id, correlation_id);
    }
}
