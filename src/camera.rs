//! Camera capture seam.
//!
//! The device itself lives in the host shell; this module owns the
//! single-live-stream rule and maps device failures to user-facing messages.

use async_trait::async_trait;
use log::{debug, info};

use crate::images::ImageSource;
use crate::AnalysisError;

/// Which camera to prefer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacingMode {
    User,
    Environment,
}

/// Requested stream properties
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraConstraints {
    pub ideal_width: u32,
    pub ideal_height: u32,
    pub aspect_ratio: f64,
    pub facing_mode: FacingMode,
}

impl Default for CameraConstraints {
    fn default() -> Self {
        CameraConstraints {
            ideal_width: 1920,
            ideal_height: 1080,
            aspect_ratio: 16.0 / 9.0,
            facing_mode: FacingMode::User,
        }
    }
}

/// Why the camera could not be used
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceErrorKind {
    PermissionDenied,
    NotFound,
    Busy,
    Other(String),
}

impl DeviceErrorKind {
    /// Map a device error name as reported by the platform
    pub fn from_name(name: &str) -> Self {
        match name {
            "NotAllowedError" | "PermissionDeniedError" => DeviceErrorKind::PermissionDenied,
            "NotFoundError" | "DevicesNotFoundError" => DeviceErrorKind::NotFound,
            "NotReadableError" | "TrackStartError" => DeviceErrorKind::Busy,
            other => DeviceErrorKind::Other(other.to_string()),
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            DeviceErrorKind::PermissionDenied => {
                "Please allow camera access in your browser settings."
            }
            DeviceErrorKind::NotFound => "No camera found on your device.",
            DeviceErrorKind::Busy => "Camera is already in use by another application.",
            DeviceErrorKind::Other(_) => "Please try again or use the upload option.",
        }
    }
}

/// A live camera stream
#[async_trait]
pub trait MediaStream: Send {
    /// Grab the current frame as JPEG bytes
    async fn capture_jpeg(&mut self) -> Result<Vec<u8>, DeviceErrorKind>;

    /// Stop every track of the stream
    fn stop(&mut self);
}

/// Platform camera access
#[async_trait]
pub trait CameraBackend: Send + Sync {
    async fn open(
        &self,
        constraints: &CameraConstraints,
    ) -> Result<Box<dyn MediaStream>, DeviceErrorKind>;
}

/// Owns at most one live stream
pub struct Camera<B: CameraBackend> {
    backend: B,
    constraints: CameraConstraints,
    stream: Option<Box<dyn MediaStream>>,
}

impl<B: CameraBackend> Camera<B> {
    pub fn new(backend: B) -> Self {
        Self::with_constraints(backend, CameraConstraints::default())
    }

    pub fn with_constraints(backend: B, constraints: CameraConstraints) -> Self {
        Camera {
            backend,
            constraints,
            stream: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.stream.is_some()
    }

    /// Open the camera. An already active stream is stopped first.
    pub async fn start(&mut self) -> Result<(), AnalysisError> {
        self.stop();
        let stream = self.backend.open(&self.constraints).await?;
        info!("Camera started");
        self.stream = Some(stream);
        Ok(())
    }

    /// Stop the active stream, if any
    pub fn stop(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            debug!("Stopping camera stream");
            stream.stop();
        }
    }

    /// Start the camera when it is off, stop it when it is on
    pub async fn toggle(&mut self) -> Result<bool, AnalysisError> {
        if self.is_active() {
            self.stop();
            Ok(false)
        } else {
            self.start().await?;
            Ok(true)
        }
    }

    /// Capture one frame and stop the camera.
    ///
    /// Returns `None` when no stream is active.
    pub async fn capture(&mut self) -> Result<Option<ImageSource>, AnalysisError> {
        let Some(mut stream) = self.stream.take() else {
            return Ok(None);
        };

        let frame = stream.capture_jpeg().await;
        stream.stop();

        Ok(Some(ImageSource::Bytes {
            data: frame?,
            mime_type: "image/jpeg".to_string(),
        }))
    }
}

impl<B: CameraBackend> Drop for Camera<B> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Counters {
        opened: AtomicUsize,
        stopped: AtomicUsize,
        live: AtomicUsize,
        max_live: AtomicUsize,
    }

    struct FakeStream {
        counters: Arc<Counters>,
        stopped: bool,
    }

    #[async_trait]
    impl MediaStream for FakeStream {
        async fn capture_jpeg(&mut self) -> Result<Vec<u8>, DeviceErrorKind> {
            Ok(vec![0xFF, 0xD8])
        }

        fn stop(&mut self) {
            if !self.stopped {
                self.stopped = true;
                self.counters.stopped.fetch_add(1, Ordering::SeqCst);
                self.counters.live.fetch_sub(1, Ordering::SeqCst);
            }
        }
    }

    struct FakeBackend {
        counters: Arc<Counters>,
        failure: Mutex<Option<DeviceErrorKind>>,
    }

    impl FakeBackend {
        fn new() -> (Self, Arc<Counters>) {
            let counters = Arc::new(Counters::default());
            (
                FakeBackend {
                    counters: Arc::clone(&counters),
                    failure: Mutex::new(None),
                },
                counters,
            )
        }
    }

    #[async_trait]
    impl CameraBackend for FakeBackend {
        async fn open(
            &self,
            constraints: &CameraConstraints,
        ) -> Result<Box<dyn MediaStream>, DeviceErrorKind> {
            assert_eq!(constraints.ideal_width, 1920);
            if let Some(kind) = self.failure.lock().unwrap().clone() {
                return Err(kind);
            }
            self.counters.opened.fetch_add(1, Ordering::SeqCst);
            let live = self.counters.live.fetch_add(1, Ordering::SeqCst) + 1;
            self.counters.max_live.fetch_max(live, Ordering::SeqCst);
            Ok(Box::new(FakeStream {
                counters: Arc::clone(&self.counters),
                stopped: false,
            }))
        }
    }

    #[tokio::test]
    async fn test_restart_tears_down_previous_stream() {
        let (backend, counters) = FakeBackend::new();
        let mut camera = Camera::new(backend);

        camera.start().await.unwrap();
        camera.start().await.unwrap();

        assert_eq!(counters.opened.load(Ordering::SeqCst), 2);
        assert_eq!(counters.stopped.load(Ordering::SeqCst), 1);
        assert_eq!(counters.max_live.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_capture_stops_stream() {
        let (backend, counters) = FakeBackend::new();
        let mut camera = Camera::new(backend);

        assert_eq!(camera.capture().await.unwrap(), None);

        camera.start().await.unwrap();
        let frame = camera.capture().await.unwrap().unwrap();
        assert_eq!(
            frame,
            ImageSource::Bytes {
                data: vec![0xFF, 0xD8],
                mime_type: "image/jpeg".to_string()
            }
        );
        assert!(!camera.is_active());
        assert_eq!(counters.live.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_toggle() {
        let (backend, _) = FakeBackend::new();
        let mut camera = Camera::new(backend);
        assert!(camera.toggle().await.unwrap());
        assert!(!camera.toggle().await.unwrap());
        assert!(!camera.is_active());
    }

    #[tokio::test]
    async fn test_open_failure_is_device_error() {
        let (backend, _) = FakeBackend::new();
        *backend.failure.lock().unwrap() = Some(DeviceErrorKind::from_name("NotAllowedError"));
        let mut camera = Camera::new(backend);

        let err = camera.start().await.unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Device(DeviceErrorKind::PermissionDenied)
        ));
        assert!(!camera.is_active());
    }

    #[test]
    fn test_error_names() {
        assert_eq!(DeviceErrorKind::from_name("NotFoundError"), DeviceErrorKind::NotFound);
        assert_eq!(DeviceErrorKind::from_name("NotReadableError"), DeviceErrorKind::Busy);
        assert_eq!(
            DeviceErrorKind::from_name("OverconstrainedError").message(),
            "Please try again or use the upload option."
        );
    }

    #[test]
    fn test_default_constraints() {
        let constraints = CameraConstraints::default();
        assert_eq!((constraints.ideal_width, constraints.ideal_height), (1920, 1080));
        assert!((constraints.aspect_ratio - 16.0 / 9.0).abs() < f64::EPSILON);
        assert_eq!(constraints.facing_mode, FacingMode::User);
    }
}
