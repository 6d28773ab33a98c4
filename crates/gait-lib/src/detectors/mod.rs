pub mod peaks;

pub use peaks::{detect_peaks, Peak, PeakDetector, PeakKind, Peaks};
