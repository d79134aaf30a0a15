/*!
 * Tests for chunk window planning and extraction
 */

use anyhow::Result;
use whispersub::audio_planner::{materialize, plan};
use whispersub::errors::PlanError;
use crate::common;
use crate::common::mock_engines::MockMediaBackend;

/// Test windows are contiguous and cover the full duration
#[test]
fn test_plan_withLongDuration_shouldCoverContiguously() {
    let total = 3725.0; // one hour, two minutes, five seconds
    let windows = plan(total, 10).unwrap();
    assert_eq!(windows.len(), 7);

    let mut expected_offset = 0.0;
    for (i, window) in windows.iter().enumerate() {
        assert_eq!(window.sequence, i);
        assert_eq!(window.offset_secs, expected_offset);
        expected_offset += window.duration_secs;
    }
    assert_eq!(expected_offset, total);

    // Only the last window may be shorter
    for window in &windows[..windows.len() - 1] {
        assert_eq!(window.duration_secs, 600.0);
    }
    assert_eq!(windows.last().unwrap().duration_secs, 125.0);
}

/// Test input shorter than one chunk yields a single window
#[test]
fn test_plan_withShortDuration_shouldYieldOneWindow() {
    let windows = plan(42.0, 10).unwrap();
    assert_eq!(windows.len(), 1);
    assert_eq!(windows[0].offset_secs, 0.0);
    assert_eq!(windows[0].duration_secs, 42.0);
}

/// Test zero-duration input is rejected
#[test]
fn test_plan_withZeroDuration_shouldFail() {
    assert!(matches!(plan(0.0, 10), Err(PlanError::EmptyInput { .. })));
    assert!(matches!(plan(-3.0, 10), Err(PlanError::EmptyInput { .. })));
}

/// Test materialization names chunk files sequentially and records offsets
#[tokio::test]
async fn test_materialize_withPlannedWindows_shouldExtractEachWindow() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let audio_path = temp_dir.path().join("movie_temp_audio.wav");
    std::fs::write(&audio_path, b"")?;

    let backend = MockMediaBackend::with_duration(630.0);
    let tracker = backend.tracker();

    let windows = plan(630.0, 10).unwrap();
    let chunks = materialize(&backend, &audio_path, &windows).await?;

    assert_eq!(chunks.len(), 2);
    assert!(chunks[0]
        .media
        .to_string_lossy()
        .ends_with("movie_temp_audio_chunk_001.wav"));
    assert!(chunks[1]
        .media
        .to_string_lossy()
        .ends_with("movie_temp_audio_chunk_002.wav"));
    assert_eq!(chunks[1].offset_secs, 600.0);
    assert_eq!(chunks[1].duration_secs, 30.0);

    let tracker = tracker.lock().unwrap();
    assert_eq!(tracker.windows, vec![(0.0, 600.0), (600.0, 30.0)]);
    Ok(())
}
