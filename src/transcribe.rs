//! Speech-to-text via a whisper.cpp subprocess.
//!
//! Invokes the whisper.cpp CLI rather than linking it over FFI; the CLI is
//! fast enough for voice notes and keeps the build free of native
//! dependencies. There is deliberately no timeout here: a hung transcription
//! blocks only the command task that started it.

use anyhow::{Context as _, bail};
use std::path::Path;
use tokio::process::Command;

/// Transcribe an audio file and return the plain text.
pub async fn transcribe(
    whisper_bin: &str,
    model_path: &str,
    audio_path: &Path,
) -> anyhow::Result<String> {
    let output = Command::new(whisper_bin)
        .args(["--model", model_path, "--language", "en", "--no-timestamps", "--file"])
        .arg(audio_path)
        .output()
        .await
        .with_context(|| format!("failed to execute transcription binary '{whisper_bin}'"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("transcription exited with {}: {}", output.status, stderr);
    }

    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    tracing::info!(text_len = text.len(), "transcription complete");
    Ok(text)
}
