use serde_derive::{Deserialize, Serialize};
use std::path::Path;

use crate::counter::CountingLine;
use crate::error::Error;
use crate::ClassId;

pub const COCO_LABELS: [&str; 80] = [
    "person", "bicycle", "car", "motorbike", "aeroplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat",
    "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack",
    "umbrella", "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball",
    "kite", "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket",
    "bottle", "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple",
    "sandwich", "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair",
    "sofa", "pottedplant", "bed", "diningtable", "toilet", "tvmonitor", "laptop", "mouse",
    "remote", "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator",
    "book", "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

/// Which class a track is tallied under when it crosses the line.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CountedClass {
    /// Most voted class over all matched detections, lowest index wins a tie
    #[default]
    Majority,
    /// Class of the latest matched detection at the crossing frame
    AtCrossing,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LineConfig {
    pub start: [f32; 2],
    pub end: [f32; 2],
    /// Half width of the band around the line, measured perpendicular to it
    pub tolerance: f32,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            start: [400.0, 297.0],
            end: [673.0, 297.0],
            tolerance: 15.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CounterConfig {
    /// Minimum IoU for a prediction/detection pair to match
    pub iou_threshold: f32,
    /// Frames a track survives without a match
    pub max_age: u32,
    /// Matches needed before a track is reported
    pub min_hits: u32,
    /// Detections at or below this confidence are ignored
    pub min_confidence: f32,
    pub line: LineConfig,
    /// Ordered label list, detection classes index into it
    pub labels: Vec<String>,
    pub tracked_classes: Vec<String>,
    pub counted_class: CountedClass,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            iou_threshold: 0.3,
            max_age: 20,
            min_hits: 3,
            min_confidence: 0.3,
            line: LineConfig::default(),
            labels: COCO_LABELS.iter().map(|s| s.to_string()).collect(),
            tracked_classes: ["person", "car", "bus", "truck", "motorbike"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            counted_class: CountedClass::default(),
        }
    }
}

impl CounterConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file = std::fs::File::open(path)?;
        let config: CounterConfig = serde_json::from_reader(std::io::BufReader::new(file))?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            return Err(Error::InvalidConfig(format!(
                "iou_threshold must be within [0, 1], got {}",
                self.iou_threshold
            )));
        }

        if self.min_hits == 0 {
            return Err(Error::InvalidConfig("min_hits must be at least 1".into()));
        }

        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(Error::InvalidConfig(format!(
                "min_confidence must be within [0, 1], got {}",
                self.min_confidence
            )));
        }

        if self.labels.is_empty() {
            return Err(Error::InvalidConfig("label list is empty".into()));
        }

        for (i, label) in self.labels.iter().enumerate() {
            if self.labels[..i].contains(label) {
                return Err(Error::InvalidConfig(format!("duplicate label `{}`", label)));
            }
        }

        if self.tracked_classes.is_empty() {
            return Err(Error::InvalidConfig("no tracked classes".into()));
        }

        CountingLine::try_from(&self.line)?;
        self.tracked_class_ids()?;

        Ok(())
    }

    #[inline]
    pub fn class_id(&self, label: &str) -> Option<ClassId> {
        self.labels.iter().position(|l| l == label)
    }

    /// Tracked class names resolved against the label list
    pub fn tracked_class_ids(&self) -> Result<Vec<ClassId>, Error> {
        self.tracked_classes
            .iter()
            .map(|name| {
                self.class_id(name)
                    .ok_or_else(|| Error::UnknownClass(name.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = CounterConfig::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.tracked_class_ids().unwrap(), vec![0, 2, 5, 7, 3]);
    }

    #[test]
    fn rejects_out_of_range_parameters() {
        let mut config = CounterConfig::default();
        config.iou_threshold = 1.5;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let mut config = CounterConfig::default();
        config.iou_threshold = f32::NAN;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let mut config = CounterConfig::default();
        config.min_hits = 0;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let mut config = CounterConfig::default();
        config.line.end = config.line.start;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn rejects_unknown_tracked_class() {
        let mut config = CounterConfig::default();
        config.tracked_classes.push("spaceship".into());

        match config.validate() {
            Err(Error::UnknownClass(name)) => assert_eq!(name, "spaceship"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: CounterConfig =
            serde_json::from_str(r#"{"max_age": 5, "counted_class": "at_crossing"}"#).unwrap();

        assert_eq!(config.max_age, 5);
        assert_eq!(config.min_hits, 3);
        assert_eq!(config.counted_class, CountedClass::AtCrossing);
        assert_eq!(config.labels.len(), 80);
    }

    #[test]
    fn negative_max_age_does_not_parse() {
        assert!(serde_json::from_str::<CounterConfig>(r#"{"max_age": -1}"#).is_err());
    }
}
