use std::path::Path;

use tokio::fs;

use crate::model::SegmentationReport;
use crate::output::error::OutputError;

pub fn report_to_json(report: &SegmentationReport, pretty: bool) -> Result<Vec<u8>, OutputError> {
    let encoded = if pretty {
        serde_json::to_vec_pretty(report)?
    } else {
        serde_json::to_vec(report)?
    };
    Ok(encoded)
}

/// Writes the report, creating missing parent directories.
pub async fn write_report(
    path: &Path,
    report: &SegmentationReport,
    pretty: bool,
) -> Result<(), OutputError> {
    let encoded = report_to_json(report, pretty)?;
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|err| OutputError::write(path, err))?;
    }
    fs::write(path, encoded)
        .await
        .map_err(|err| OutputError::write(path, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        ConfidenceSample, MatchChunk, PortLayout, PortRoi, ScreenCalibration, Threshold,
    };
    use vodcut_types::Rect;

    fn report() -> SegmentationReport {
        SegmentationReport {
            input: Some("session.mp4".into()),
            match_log: None,
            layout_version: "melee-4p-v1".into(),
            polling_interval: 2.0,
            calibration: ScreenCalibration {
                screen: Rect::new(17.0, 23.0, 205.0, 274.0),
                scale: 0.5,
            },
            ports: PortLayout::new([
                PortRoi::Absent,
                PortRoi::Detected(Rect::new(159.0, 82.0, 61.0, 83.0)),
                PortRoi::Absent,
                PortRoi::Absent,
            ]),
            threshold: Threshold::Split(0.45),
            chunks: vec![MatchChunk {
                start: 12.0,
                end: 58.0,
            }],
            series: vec![ConfidenceSample {
                time: 0.0,
                confidence: 0.1,
            }],
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn report_is_written_under_new_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("session.json");
        write_report(&path, &report(), true).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["layout_version"], "melee-4p-v1");
        assert_eq!(value["ports"].as_array().unwrap().len(), 4);
        assert_eq!(value["ports"][1]["state"], "detected");
        assert_eq!(value["threshold"]["value"], 0.45);
        assert_eq!(value["chunks"][0]["end"], 58.0);
        assert!(value["match_log"].is_null());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn write_failure_names_the_destination() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("taken");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let path = blocker.join("session.json");

        let err = write_report(&path, &report(), true).await.unwrap_err();
        assert!(matches!(err, OutputError::Write { .. }));
        assert_eq!(err.path(), Some(path.as_path()));
        assert!(err.to_string().contains("session.json"));
    }

    #[test]
    fn compact_encoding_has_no_newlines() {
        let bytes = report_to_json(&report(), false).unwrap();
        assert!(!bytes.contains(&b'\n'));
    }
}
