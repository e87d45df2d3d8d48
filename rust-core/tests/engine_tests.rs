use spectrogram::export::{ClassificationRequest, Classifier, Exporter, SoundLabel};
use spectrogram::{
    EngineError, ExportError, LatestFrame, Pipeline, SharedSink, SpectrogramConfig,
    SpectrogramEngine, WindowKind,
};
use std::sync::{mpsc, Arc, Mutex};
use std::time::{Duration, Instant};

type Frames = Arc<Mutex<Vec<Vec<f64>>>>;

fn wait_for<F: Fn() -> bool>(condition: F) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    condition()
}

fn recording_engine(config: SpectrogramConfig) -> (SpectrogramEngine, Frames, Frames) {
    let waveforms: Frames = Arc::new(Mutex::new(Vec::new()));
    let spectra: Frames = Arc::new(Mutex::new(Vec::new()));
    let w = Arc::clone(&waveforms);
    let s = Arc::clone(&spectra);
    let engine = SpectrogramEngine::new(
        config,
        move |data: &[f64]| w.lock().unwrap().push(data.to_vec()),
        move |data: &[f64]| s.lock().unwrap().push(data.to_vec()),
    )
    .unwrap();
    (engine, waveforms, spectra)
}

fn tone(len: usize, period: usize) -> Vec<i16> {
    (0..len)
        .map(|i| (8000.0 * (2.0 * std::f64::consts::PI * i as f64 / period as f64).sin()) as i16)
        .collect()
}

#[test]
fn test_engine_matches_synchronous_pipeline() {
    let config = SpectrogramConfig::new(8000, 256, WindowKind::Hamming, 512);
    let (mut engine, waveforms, spectra) = recording_engine(config);
    let stream = tone(3 * 512, 32);

    let mut producer = engine.start().unwrap();
    assert_eq!(producer.write(&stream), stream.len());
    assert!(wait_for(|| spectra.lock().unwrap().len() == 12));
    engine.stop();

    // Same stream through a pipeline on this thread
    let expected = Arc::new(Mutex::new(Vec::new()));
    let e = Arc::clone(&expected);
    let mut pipeline = Pipeline::new(|_: &[f64]| {}, move |m: &[f64]| e.lock().unwrap().push(m.to_vec()));
    pipeline.configure(config).unwrap();
    for block in stream.chunks(512) {
        pipeline.ingest(block).unwrap();
    }

    assert_eq!(*spectra.lock().unwrap(), *expected.lock().unwrap());

    let waveforms = waveforms.lock().unwrap();
    assert_eq!(waveforms.len(), 12);
    assert!(waveforms[0][..128].iter().all(|&s| s == 0.0));
    for pair in waveforms.windows(2) {
        assert_eq!(pair[0][128..], pair[1][..128]);
    }
}

#[test]
fn test_partial_block_waits_for_more_samples() {
    let config = SpectrogramConfig::new(8000, 128, WindowKind::Rectangular, 256);
    let (mut engine, _, spectra) = recording_engine(config);

    let mut producer = engine.start().unwrap();
    producer.write(&[1; 200]);
    std::thread::sleep(Duration::from_millis(20));
    assert!(spectra.lock().unwrap().is_empty());

    producer.write(&[1; 56]);
    assert!(wait_for(|| spectra.lock().unwrap().len() == 4));
    engine.stop();
}

#[test]
fn test_reconfigure_is_a_full_stop() {
    let config = SpectrogramConfig::new(8000, 128, WindowKind::Hanning, 128);
    let (mut engine, waveforms, _) = recording_engine(config);

    let mut producer = engine.start().unwrap();
    producer.write(&[500; 256]);
    assert!(wait_for(|| engine.frames_processed() == 4));

    let next = SpectrogramConfig::new(8000, 256, WindowKind::Blackman, 256);
    engine.reconfigure(next).unwrap();
    assert!(!engine.is_running());
    assert_eq!(engine.frames_processed(), 0);
    assert_eq!(engine.config(), &next);

    let mut producer = engine.start().unwrap();
    producer.write(&[700; 256]);
    assert!(wait_for(|| engine.frames_processed() == 2));
    engine.stop();

    let waveforms = waveforms.lock().unwrap();
    assert_eq!(waveforms.len(), 6);
    let first_after = &waveforms[4];
    assert_eq!(first_after.len(), 256);
    // Fresh buffers: the carry-over is silence again, not the old 500s
    assert!(first_after[..128].iter().all(|&s| s == 0.0));
    assert!(first_after[128..].iter().all(|&s| s == 700.0));
}

#[test]
fn test_start_after_stop() {
    let latest = SharedSink::new(LatestFrame::new());
    let handle = latest.handle();
    let config = SpectrogramConfig::new(16000, 64, WindowKind::Welch, 64);
    let mut engine = SpectrogramEngine::new(config, latest.clone(), latest).unwrap();

    let mut producer = engine.start().unwrap();
    producer.write(&[10; 64]);
    // Poll the engine, not the handle: holding the handle makes the sink drop frames
    assert!(wait_for(|| engine.frames_processed() == 2));
    engine.stop();

    // Stopping only pauses delivery; the carry-over survives a restart
    let mut producer = engine.start().unwrap();
    producer.write(&[20; 64]);
    assert!(wait_for(|| engine.frames_processed() == 4));
    engine.stop();

    let mut latest = handle.lock().unwrap();
    assert_eq!(latest.frames(), 4);
    let (waveform, magnitudes) = latest.take_if_new().unwrap();
    assert_eq!(waveform, vec![20.0; 64]);
    assert_eq!(magnitudes.len(), 64);
}

struct ChannelClassifier {
    requests: Mutex<mpsc::Sender<ClassificationRequest>>,
    fail: bool,
}

impl Classifier for ChannelClassifier {
    fn classify(&self, request: &ClassificationRequest) -> Result<String, ExportError> {
        self.requests.lock().unwrap().send(request.clone()).unwrap();
        if self.fail {
            Err(ExportError::Transport("host unreachable".to_string()))
        } else {
            Ok("\"children_playing\"".to_string())
        }
    }
}

#[test]
fn test_export_tap_copies_raw_blocks() {
    let config = SpectrogramConfig::new(22050, 256, WindowKind::Hanning, 512);
    let (mut engine, _, spectra) = recording_engine(config);

    let (request_tx, request_rx) = mpsc::channel();
    let (label_tx, label_rx) = mpsc::channel();
    let label_tx = Mutex::new(label_tx);
    let classifier = Arc::new(ChannelClassifier {
        requests: Mutex::new(request_tx),
        fail: false,
    });
    engine.set_exporter(Exporter::new(classifier, 8000, 1024, move |label| {
        label_tx.lock().unwrap().send(label).unwrap();
    }));

    let stream = tone(1024, 50);
    let mut producer = engine.start().unwrap();
    producer.write(&stream);

    let request = request_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(request.audio, stream);
    // The engine stamps its own sampling rate on the exporter
    assert_eq!(request.sample_rate, 22050);
    assert_eq!(
        label_rx.recv_timeout(Duration::from_secs(5)).unwrap(),
        SoundLabel::ChildrenPlaying
    );
    assert!(wait_for(|| spectra.lock().unwrap().len() == 8));
    engine.stop();
}

#[test]
fn test_export_failure_does_not_stop_analysis() {
    let config = SpectrogramConfig::new(8000, 64, WindowKind::Nuttall, 128);
    let (mut engine, _, spectra) = recording_engine(config);

    let (request_tx, request_rx) = mpsc::channel();
    let classifier = Arc::new(ChannelClassifier {
        requests: Mutex::new(request_tx),
        fail: true,
    });
    engine.set_exporter(Exporter::new(classifier, 8000, 128, |_| {}));

    let mut producer = engine.start().unwrap();
    producer.write(&[3; 256]);
    assert!(request_rx.recv_timeout(Duration::from_secs(5)).is_ok());
    assert!(wait_for(|| spectra.lock().unwrap().len() == 8));

    producer.write(&[4; 128]);
    assert!(wait_for(|| spectra.lock().unwrap().len() == 12));
    assert!(engine.is_running());
    engine.stop();

    let mut exporter = engine.take_exporter().unwrap();
    exporter.wait();
}

#[test]
fn test_invalid_reconfigure_is_rejected() {
    let config = SpectrogramConfig::default();
    let (mut engine, _, _) = recording_engine(config);
    let bad = SpectrogramConfig { sample_rate: 0, ..config };
    assert!(matches!(engine.reconfigure(bad), Err(EngineError::Config(_))));
    assert_eq!(engine.config(), &config);
}
