use super::state::AppState;
use crate::domain::error::{AppError, Result};
use crate::domain::test_case::TestType;
use crate::infrastructure::response::decode_model_bytes;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use std::process::ExitCode;
use tracing::{error, info, warn};

fn read_text(path: &Path) -> Result<String> {
    let bytes = if path == Path::new("-") {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .map_err(|e| AppError::IoError(format!("Failed to read stdin: {e}")))?;
        buf
    } else {
        fs::read(path)
            .map_err(|e| AppError::IoError(format!("Failed to read {}: {e}", path.display())))?
    };
    Ok(decode_model_bytes(&bytes))
}

/// Features are processed one after another; a backend failure skips only
/// that (feature, type) pair and turns the exit code to 1.
pub(crate) async fn generate(
    state: &AppState,
    requirements: &Path,
    test_types: &[TestType],
    out: &mut impl Write,
) -> Result<ExitCode> {
    let requirements_text = read_text(requirements)?;
    let test_types = if test_types.is_empty() {
        state.config.test_types.as_slice()
    } else {
        test_types
    };

    let features = state
        .generation_use_case
        .analyze_requirements(&state.config.llm, &requirements_text)
        .await?;
    if features.is_empty() {
        warn!(path = %requirements.display(), "No features found in requirements");
        return Ok(ExitCode::FAILURE);
    }

    let mut generated = 0usize;
    let mut failed = 0usize;
    for feature in &features {
        for &test_type in test_types {
            match state
                .generation_use_case
                .generate_test_case(&state.config.llm, feature, test_type)
                .await
            {
                Ok(result) => {
                    generated += 1;
                    if result.record.is_unresolved() {
                        warn!(feature = %feature, test_type = %test_type, path = %result.path.display(), "Stored unresolved test case");
                    }
                    writeln!(out, "{}", result.path.display())?;
                }
                Err(err) => {
                    failed += 1;
                    error!(feature = %feature, test_type = %test_type, error = %err, "Test case generation failed");
                }
            }
        }
    }

    info!(
        features = features.len(),
        generated,
        failed,
        output_dir = %state.config.output_dir.display(),
        "Generation finished"
    );
    Ok(if failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

pub(crate) async fn analyze(
    state: &AppState,
    requirements: &Path,
    out: &mut impl Write,
) -> Result<ExitCode> {
    let requirements_text = read_text(requirements)?;
    let features = state
        .generation_use_case
        .analyze_requirements(&state.config.llm, &requirements_text)
        .await?;

    for feature in &features {
        writeln!(out, "{}", feature)?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Prints the record as JSON on stdout; the saved path goes to the log.
pub(crate) fn extract(
    state: &AppState,
    input: &Path,
    title: Option<&str>,
    no_save: bool,
    out: &mut impl Write,
) -> Result<ExitCode> {
    let raw = read_text(input)?;

    let record = if no_save {
        state.pipeline.run(&raw, title).record
    } else {
        let result = state.generation_use_case.extract_and_store(&raw, title)?;
        info!(path = %result.path.display(), "Stored extracted test case");
        result.record
    };

    writeln!(out, "{}", serde_json::to_string_pretty(&record)?)?;
    Ok(ExitCode::SUCCESS)
}

pub(crate) async fn models(state: &AppState, out: &mut impl Write) -> Result<ExitCode> {
    let models = state.llm_client.list_models(&state.config.llm).await?;
    for model in &models {
        writeln!(out, "{}", model)?;
    }
    Ok(ExitCode::SUCCESS)
}
