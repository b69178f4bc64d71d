//! Canned inputs and upstream responses

#![allow(dead_code)]

use serde_json::{json, Value};

/// Replicate model version the frontend sends.
pub const MODEL_VERSION: &str = "5a7041cc9b82e5a558fea6b3d7b12dea89625e89da33f0447bd727c2d0ab9e77";

pub const API_TOKEN: &str = "r8_test_token";
pub const CLOUD_NAME: &str = "demo";

pub const PROVIDER_VOCAL: &str = "https://a/vocal.mp3";
pub const PROVIDER_INSTRUMENTAL: &str = "https://a/instr.mp3";

pub const HOSTED_VOCAL: &str = "https://res.cloudinary.com/demo/audio-separator/vocal.mp3";
pub const HOSTED_INSTRUMENTAL: &str = "https://res.cloudinary.com/demo/audio-separator/instr.mp3";
pub const HOSTED_SOURCE: &str = "https://res.cloudinary.com/demo/audio-separator/song.wav";

/// A few bytes that look like the start of a WAV file.
pub const FAKE_WAV: &[u8] = b"RIFF\x24\x00\x00\x00WAVEfmt ";

/// Local tool that honours the `(input, output_dir)` contract.
pub const TOOL_OK: &str = r#"
[ -f "$1" ] || exit 9
printf 'vocals' > "$2/vocals.mp3"
printf 'instrumental' > "$2/instrumental.mp3"
printf '%s' "$SEPARATION_MODEL" > "$2/model.txt"
"#;

pub const TOOL_FAILS: &str = r#"
echo "RuntimeError: Demucs separation failed" >&2
exit 3
"#;

/// Exits 0 without writing the instrumental track.
pub const TOOL_PARTIAL: &str = r#"
printf 'vocals' > "$2/vocals.wav"
"#;

pub fn created_prediction(status_url: &str) -> Value {
    json!({
        "id": "abc123",
        "status": "starting",
        "urls": { "get": status_url },
        "error": null
    })
}

pub fn prediction_with_status(status: &str) -> Value {
    json!({ "id": "abc123", "status": status, "output": null, "error": null })
}

pub fn succeeded_prediction() -> Value {
    json!({
        "id": "abc123",
        "status": "succeeded",
        "output": [PROVIDER_VOCAL, PROVIDER_INSTRUMENTAL],
        "error": null
    })
}

pub fn uploaded(secure_url: &str) -> Value {
    json!({ "secure_url": secure_url, "resource_type": "video" })
}
