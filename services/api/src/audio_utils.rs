use base64::Engine;

/// Decodes a base64 string carrying raw PCM16 audio.
///
/// Unlike the upstream side, a bad payload from the browser is reported to
/// the caller: it means the client framing can no longer be trusted.
pub fn decode_pcm_base64(base64_fragment: &str) -> Result<Vec<u8>, base64::DecodeError> {
    base64::engine::general_purpose::STANDARD.decode(base64_fragment)
}

/// Encodes raw PCM16 bytes for a JSON text frame.
pub fn encode_pcm_base64(pcm16_bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(pcm16_bytes)
}

/// Playback length of a mono PCM16 buffer, in milliseconds.
pub fn pcm16_duration_ms(byte_len: usize, sample_rate: u32) -> u64 {
    if sample_rate == 0 {
        return 0;
    }
    (byte_len as u64 / 2) * 1000 / sample_rate as u64
}
