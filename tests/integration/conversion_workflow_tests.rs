/*!
 * End-to-end tests of the SRT normalization workflow
 */

use anyhow::Result;
use whispersub::app_controller::{Controller, RunOptions};
use whispersub::subtitle_processor::SubtitleTrack;
use crate::common;

/// Test normalizing a single-line dialect file into canonical blocks
#[test]
fn test_convert_withDialectInput_shouldWriteCanonicalBlocks() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path().to_path_buf();
    let input = common::create_dialect_subtitle(&dir, "dialect.srt")?;
    let output = dir.join("dialect_normalized.srt");

    let controller = Controller::new_for_test()?;
    controller.convert(&input, &output, false, false)?;

    let written = std::fs::read_to_string(&output)?;
    let report = SubtitleTrack::validate(&written);
    assert!(report.is_valid);
    assert_eq!(report.block_count, 2);
    // Period separators were normalized away
    assert!(written.contains("00:00:05,000 --> 00:00:09,000"));
    Ok(())
}

/// Test the conversion report is written next to the output
#[test]
fn test_convert_withReportRequested_shouldWriteReportFile() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path().to_path_buf();
    let content = "\
1 00:00:01,000 --> 00:00:04,000 Good line
not a subtitle line at all
2 00:00:05,000 --> 00:00:08,000 Another good line
";
    let input = common::create_test_file(&dir, "messy.srt", content)?;
    let output = dir.join("messy_normalized.srt");

    let controller = Controller::new_for_test()?;
    controller.convert(&input, &output, true, false)?;

    let report_path = output.with_extension("report.txt");
    assert!(report_path.exists());
    let report_text = std::fs::read_to_string(&report_path)?;
    assert!(report_text.contains("Entries parsed: 2"));
    assert!(report_text.contains("Lines failed: 1"));
    assert!(report_text.contains("not a subtitle line"));
    Ok(())
}

/// Test the plain text sidecar contains dialogue only
#[test]
fn test_convert_withPlainTextRequested_shouldWriteDialogueOnly() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path().to_path_buf();
    let input = common::create_dialect_subtitle(&dir, "dialect.srt")?;
    let output = dir.join("dialect_normalized.srt");

    let controller = Controller::new_for_test()?;
    controller.convert(&input, &output, false, true)?;

    let text_path = output.with_extension("txt");
    assert!(text_path.exists());
    let text = std::fs::read_to_string(&text_path)?;
    assert!(text.contains("First dialect line"));
    assert!(text.contains("Second dialect line"));
    assert!(!text.contains("-->"));
    Ok(())
}

/// Test conversion rejects input with no parsable entries
#[test]
fn test_convert_withUnparsableInput_shouldError() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path().to_path_buf();
    let input = common::create_test_file(&dir, "noise.srt", "nothing here\nat all\n")?;
    let output = dir.join("noise_normalized.srt");

    let controller = Controller::new_for_test()?;
    assert!(controller.convert(&input, &output, false, false).is_err());
    assert!(!output.exists());
    Ok(())
}

/// Test the controller routes .srt inputs to normalization
#[tokio::test]
async fn test_run_withSrtInput_shouldNormalizeInPlace() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path().to_path_buf();
    common::create_test_subtitle(&dir, "episode.srt")?;

    let controller = Controller::new_for_test()?;
    controller
        .run(
            dir.join("episode.srt"),
            dir.clone(),
            RunOptions {
                force_overwrite: false,
                single_pass: false,
                write_report: false,
            },
        )
        .await?;

    let output = dir.join("episode_normalized.srt");
    assert!(output.exists());
    let report = SubtitleTrack::validate(&std::fs::read_to_string(&output)?);
    assert_eq!(report.block_count, 3);
    Ok(())
}

/// Test existing output is not overwritten without the force flag
#[tokio::test]
async fn test_run_withExistingOutput_shouldSkipWithoutForce() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path().to_path_buf();
    common::create_test_subtitle(&dir, "episode.srt")?;
    let output = common::create_test_file(&dir, "episode_normalized.srt", "sentinel")?;

    let controller = Controller::new_for_test()?;
    controller
        .run(dir.join("episode.srt"), dir.clone(), RunOptions::default())
        .await?;

    // Untouched without -f
    assert_eq!(std::fs::read_to_string(&output)?, "sentinel");

    controller
        .run(
            dir.join("episode.srt"),
            dir.clone(),
            RunOptions {
                force_overwrite: true,
                single_pass: false,
                write_report: false,
            },
        )
        .await?;
    assert_ne!(std::fs::read_to_string(&output)?, "sentinel");
    Ok(())
}
