//! Batched export of raw samples to a remote sound classifier
//!
//! The exporter keeps its own snapshot buffer and copies every block into
//! it, so it never reads the pipeline's live buffers. Full snapshots are
//! submitted on a detached thread; whatever happens there (network errors,
//! garbage responses) is logged and stays out of the analysis path.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::error::ExportError;

/// Snapshot length: 64 blocks of 1024 samples
pub const DEFAULT_SNAPSHOT_LEN: usize = 65536;

/// Body posted to the classification endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRequest {
    pub audio: Vec<i16>,
    pub sample_rate: u32,
}

impl ClassificationRequest {
    pub fn to_json(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Transport to the classification service
///
/// Returns the raw response body.
pub trait Classifier: Send + Sync {
    fn classify(&self, request: &ClassificationRequest) -> Result<String, ExportError>;
}

/// Labels returned by the classifier (UrbanSound8K classes)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoundLabel {
    AirConditioner,
    CarHorn,
    ChildrenPlaying,
    DogBark,
    Drilling,
    EngineIdling,
    GunShot,
    Jackhammer,
    Siren,
    StreetMusic,
    Unknown(String),
}

impl SoundLabel {
    pub fn from_label(label: &str) -> Self {
        match label {
            "air_conditioner" => SoundLabel::AirConditioner,
            "car_horn" => SoundLabel::CarHorn,
            "children_playing" => SoundLabel::ChildrenPlaying,
            "dog_bark" => SoundLabel::DogBark,
            "drilling" => SoundLabel::Drilling,
            "engine_idling" => SoundLabel::EngineIdling,
            "gun_shot" => SoundLabel::GunShot,
            "jackhammer" => SoundLabel::Jackhammer,
            "siren" => SoundLabel::Siren,
            "street_music" => SoundLabel::StreetMusic,
            other => SoundLabel::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            SoundLabel::AirConditioner => "air_conditioner",
            SoundLabel::CarHorn => "car_horn",
            SoundLabel::ChildrenPlaying => "children_playing",
            SoundLabel::DogBark => "dog_bark",
            SoundLabel::Drilling => "drilling",
            SoundLabel::EngineIdling => "engine_idling",
            SoundLabel::GunShot => "gun_shot",
            SoundLabel::Jackhammer => "jackhammer",
            SoundLabel::Siren => "siren",
            SoundLabel::StreetMusic => "street_music",
            SoundLabel::Unknown(label) => label,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, SoundLabel::Unknown(_))
    }
}

impl fmt::Display for SoundLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decode a classifier response body into a label
///
/// Accepts a JSON string (`"dog_bark"`) or a bare label; surrounding quotes
/// and whitespace are stripped.
pub fn parse_label(body: &str) -> Result<SoundLabel, ExportError> {
    let label = match serde_json::from_str::<String>(body) {
        Ok(decoded) => decoded,
        Err(_) => body.trim().trim_matches('"').to_string(),
    };
    let label = label.trim();

    if label.is_empty() {
        return Err(ExportError::EmptyResponse);
    }
    Ok(SoundLabel::from_label(label))
}

/// Fixed-size batch of raw samples, independent of the pipeline buffers
pub struct SnapshotAccumulator {
    buffer: Vec<i16>,
    filled: usize,
}

impl SnapshotAccumulator {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0; capacity.max(1)],
            filled: 0,
        }
    }

    /// Append samples; `on_full` sees every completed snapshot
    ///
    /// Samples spilling over a snapshot boundary start the next one.
    /// Returns the number of snapshots completed.
    pub fn push<F>(&mut self, mut samples: &[i16], mut on_full: F) -> usize
    where
        F: FnMut(&[i16]),
    {
        let capacity = self.capacity();
        let mut completed = 0;

        while !samples.is_empty() {
            let take = (capacity - self.filled).min(samples.len());
            self.buffer[self.filled..self.filled + take].copy_from_slice(&samples[..take]);
            self.filled += take;
            samples = &samples[take..];

            if self.filled == capacity {
                on_full(&self.buffer);
                self.filled = 0;
                completed += 1;
            }
        }

        completed
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Samples in the current, incomplete snapshot
    pub fn filled(&self) -> usize {
        self.filled
    }

    pub fn clear(&mut self) {
        self.filled = 0;
    }
}

type LabelCallback = Arc<dyn Fn(SoundLabel) + Send + Sync>;

/// Accumulates raw blocks and classifies full snapshots asynchronously
pub struct Exporter {
    accumulator: SnapshotAccumulator,
    sample_rate: u32,
    classifier: Arc<dyn Classifier>,
    on_label: LabelCallback,

    /// Handles of submissions still possibly running
    in_flight: Vec<JoinHandle<()>>,
}

impl Exporter {
    pub fn new<F>(
        classifier: Arc<dyn Classifier>,
        sample_rate: u32,
        snapshot_len: usize,
        on_label: F,
    ) -> Self
    where
        F: Fn(SoundLabel) + Send + Sync + 'static,
    {
        Self {
            accumulator: SnapshotAccumulator::new(snapshot_len),
            sample_rate,
            classifier,
            on_label: Arc::new(on_label),
            in_flight: Vec::new(),
        }
    }

    /// Copy one raw block into the snapshot, submitting it when full
    ///
    /// Returns the number of snapshots submitted by this call.
    pub fn push_block(&mut self, block: &[i16]) -> usize {
        let Self {
            accumulator,
            sample_rate,
            classifier,
            on_label,
            in_flight,
        } = self;

        in_flight.retain(|handle| !handle.is_finished());

        accumulator.push(block, |snapshot| {
            let request = ClassificationRequest {
                audio: snapshot.to_vec(),
                sample_rate: *sample_rate,
            };
            in_flight.push(submit(Arc::clone(classifier), Arc::clone(on_label), request));
        })
    }

    /// Sampling rate stamped on future requests; drops the partial snapshot
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        if sample_rate != self.sample_rate {
            self.accumulator.clear();
            self.sample_rate = sample_rate;
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn buffered(&self) -> usize {
        self.accumulator.filled()
    }

    /// Wait for every submitted request to finish
    pub fn wait(&mut self) {
        for handle in self.in_flight.drain(..) {
            if handle.join().is_err() {
                log::warn!("classification thread panicked");
            }
        }
    }
}

fn submit(
    classifier: Arc<dyn Classifier>,
    on_label: LabelCallback,
    request: ClassificationRequest,
) -> JoinHandle<()> {
    log::debug!(
        "submitting {} samples at {} Hz for classification",
        request.audio.len(),
        request.sample_rate
    );

    std::thread::spawn(move || {
        let label = classifier
            .classify(&request)
            .and_then(|body| parse_label(&body));

        match label {
            Ok(label) => {
                if !label.is_known() {
                    log::warn!("classifier returned unrecognized label {:?}", label.as_str());
                }
                log::debug!("classification label: {}", label);
                on_label(label);
            }
            Err(e) => log::warn!("classification failed: {}", e),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::sync::Mutex;

    struct FixedClassifier {
        response: Result<String, String>,
        requests: Mutex<Vec<ClassificationRequest>>,
    }

    impl FixedClassifier {
        fn new(response: Result<&str, &str>) -> Arc<Self> {
            Arc::new(Self {
                response: response.map(str::to_string).map_err(str::to_string),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    impl Classifier for FixedClassifier {
        fn classify(&self, request: &ClassificationRequest) -> Result<String, ExportError> {
            self.requests.lock().unwrap().push(request.clone());
            self.response.clone().map_err(ExportError::Transport)
        }
    }

    #[test]
    fn test_request_json_shape() {
        let request = ClassificationRequest {
            audio: vec![1, -2, 3],
            sample_rate: 16000,
        };
        assert_eq!(
            request.to_json().unwrap(),
            r#"{"audio":[1,-2,3],"sample_rate":16000}"#
        );
    }

    #[test]
    fn test_parse_label() {
        assert_eq!(parse_label("\"dog_bark\"").unwrap(), SoundLabel::DogBark);
        assert_eq!(parse_label("siren\n").unwrap(), SoundLabel::Siren);
        assert_eq!(parse_label("\"street_music").unwrap(), SoundLabel::StreetMusic);
        assert_eq!(
            parse_label("\"whale\"").unwrap(),
            SoundLabel::Unknown("whale".to_string())
        );
        assert!(matches!(parse_label("\"\""), Err(ExportError::EmptyResponse)));
        assert!(matches!(parse_label("  "), Err(ExportError::EmptyResponse)));
    }

    #[test]
    fn test_label_names_round_trip() {
        for name in ["air_conditioner", "car_horn", "children_playing", "gun_shot", "jackhammer"] {
            let label = SoundLabel::from_label(name);
            assert!(label.is_known());
            assert_eq!(label.to_string(), name);
        }
    }

    #[test]
    fn test_accumulator_splits_blocks() {
        let mut accumulator = SnapshotAccumulator::new(5);
        let mut snapshots = Vec::new();

        assert_eq!(accumulator.push(&[1, 2, 3], |s| snapshots.push(s.to_vec())), 0);
        assert_eq!(accumulator.push(&[4, 5, 6, 7], |s| snapshots.push(s.to_vec())), 1);
        assert_eq!(accumulator.filled(), 2);
        assert_eq!(
            accumulator.push(&[8, 9, 10, 11, 12, 13, 14, 15], |s| snapshots.push(s.to_vec())),
            2
        );

        assert_eq!(snapshots, vec![
            vec![1, 2, 3, 4, 5],
            vec![6, 7, 8, 9, 10],
            vec![11, 12, 13, 14, 15],
        ]);
        assert_eq!(accumulator.filled(), 0);
    }

    #[test]
    fn test_exporter_delivers_label() {
        let classifier = FixedClassifier::new(Ok("\"drilling\""));
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        let mut exporter = Exporter::new(classifier.clone(), 8000, 8, move |label| {
            tx.lock().unwrap().send(label).unwrap();
        });

        assert_eq!(exporter.push_block(&[1; 6]), 0);
        assert_eq!(exporter.buffered(), 6);
        assert_eq!(exporter.push_block(&[2; 6]), 1);
        exporter.wait();

        assert_eq!(rx.recv().unwrap(), SoundLabel::Drilling);
        let requests = classifier.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].audio, vec![1, 1, 1, 1, 1, 1, 2, 2]);
        assert_eq!(requests[0].sample_rate, 8000);
    }

    #[test]
    fn test_exporter_failure_is_contained() {
        let classifier = FixedClassifier::new(Err("connection refused"));
        let labels = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&labels);
        let mut exporter = Exporter::new(classifier.clone(), 8000, 4, move |label| {
            sink.lock().unwrap().push(label);
        });

        assert_eq!(exporter.push_block(&[0; 8]), 2);
        exporter.wait();

        assert_eq!(classifier.requests.lock().unwrap().len(), 2);
        assert!(labels.lock().unwrap().is_empty());
    }

    #[test]
    fn test_sample_rate_change_drops_partial_snapshot() {
        let classifier = FixedClassifier::new(Ok("siren"));
        let mut exporter = Exporter::new(classifier, 8000, 8, |_| {});
        exporter.push_block(&[1; 5]);
        exporter.set_sample_rate(16000);
        assert_eq!(exporter.buffered(), 0);
        assert_eq!(exporter.sample_rate(), 16000);
    }
}
