use std::path::Path;

use anyhow::Context as _;
use image::RgbaImage;
use kurbo::Rect;

use crate::{
    capability::{Captioner, FaceDetector, SubjectDetector},
    error::{OutwardError, OutwardResult},
};

/// Pre-computed scene knowledge loaded from a JSON file next to the input
/// image. Lets a run reuse prompts, captions and detection boxes produced
/// elsewhere instead of calling live services.
///
/// Boxes are `[x0, y0, x1, y1]` in input-image pixel coordinates.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct SceneSidecar {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub faces: Vec<[f64; 4]>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subjects: Vec<[f64; 4]>,
}

impl SceneSidecar {
    pub fn load(path: &Path) -> OutwardResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scene file '{}'", path.display()))?;
        let sidecar: Self = serde_json::from_str(&text)
            .map_err(|e| OutwardError::serde(format!("scene file '{}': {e}", path.display())))?;
        sidecar.validate()?;
        Ok(sidecar)
    }

    pub fn validate(&self) -> OutwardResult<()> {
        for b in self.faces.iter().chain(self.subjects.iter()) {
            if b[0] >= b[2] || b[1] >= b[3] {
                return Err(OutwardError::validation(format!(
                    "scene box [{}, {}, {}, {}] has no area",
                    b[0], b[1], b[2], b[3]
                )));
            }
        }
        Ok(())
    }

    /// First face box, if any.
    pub fn face_box(&self) -> Option<Rect> {
        self.faces.first().map(|b| rect_from(*b))
    }

    pub fn subject_boxes(&self) -> Vec<Rect> {
        self.subjects.iter().map(|b| rect_from(*b)).collect()
    }
}

fn rect_from(b: [f64; 4]) -> Rect {
    Rect::new(b[0], b[1], b[2], b[3])
}

impl FaceDetector for SceneSidecar {
    fn detect_face(&mut self, _image: &RgbaImage) -> OutwardResult<Option<Rect>> {
        Ok(self.face_box())
    }
}

impl SubjectDetector for SceneSidecar {
    fn detect(&mut self, _image: &RgbaImage) -> OutwardResult<Vec<Rect>> {
        Ok(self.subject_boxes())
    }
}

impl Captioner for SceneSidecar {
    fn describe(&mut self, _image: &RgbaImage) -> OutwardResult<String> {
        match self.caption.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => Ok(text.to_string()),
            _ => Err(OutwardError::detection("scene file has no caption")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_partial_documents() {
        let sidecar: SceneSidecar = serde_json::from_str(r#"{"caption": "a red field"}"#).unwrap();
        assert_eq!(sidecar.caption.as_deref(), Some("a red field"));
        assert!(sidecar.prompt.is_none());
        assert!(sidecar.faces.is_empty());
        assert!(sidecar.subjects.is_empty());
        assert!(sidecar.validate().is_ok());
    }

    #[test]
    fn zero_area_boxes_are_rejected() {
        let sidecar: SceneSidecar =
            serde_json::from_str(r#"{"subjects": [[10.0, 10.0, 10.0, 20.0]]}"#).unwrap();
        assert!(sidecar.validate().is_err());
    }

    #[test]
    fn face_box_takes_the_first_entry() {
        let sidecar: SceneSidecar =
            serde_json::from_str(r#"{"faces": [[1.0, 2.0, 3.0, 4.0], [5.0, 6.0, 7.0, 8.0]]}"#)
                .unwrap();
        assert_eq!(sidecar.face_box(), Some(Rect::new(1.0, 2.0, 3.0, 4.0)));
    }

    #[test]
    fn describe_requires_a_nonempty_caption() {
        let mut blank = SceneSidecar {
            caption: Some("   ".to_string()),
            ..SceneSidecar::default()
        };
        let image = RgbaImage::new(1, 1);
        assert!(blank.describe(&image).is_err());

        let mut padded = SceneSidecar {
            caption: Some(" rolling hills ".to_string()),
            ..SceneSidecar::default()
        };
        assert_eq!(padded.describe(&image).unwrap(), "rolling hills");
    }

    #[test]
    fn load_missing_file_is_an_error() {
        assert!(SceneSidecar::load(Path::new("target/does-not-exist.scene.json")).is_err());
    }
}
