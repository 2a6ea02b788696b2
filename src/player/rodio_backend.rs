//! Audio output through `rodio`.
//!
//! Lesson clips are addressed as `/audio/<file>` and resolved under the
//! configured assets directory; finished recordings are `blob:` URLs looked
//! up in the shared [`BlobRegistry`].  Each source owns a paused [`Sink`] on
//! the default output mixer and re-queues a fresh decoder when played again
//! after reaching the end.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};

use super::media::{MediaBackend, MediaError, MediaEvent, MediaSource};
use crate::audio::{is_blob_url, BlobRegistry};

type ClipDecoder = Decoder<Cursor<Arc<[u8]>>>;

pub struct RodioBackend {
    output: OutputStream,
    assets_dir: PathBuf,
    blobs: BlobRegistry,
}

impl RodioBackend {
    /// Open the default output device.
    pub fn new(assets_dir: impl Into<PathBuf>, blobs: BlobRegistry) -> Result<Self, MediaError> {
        let output = OutputStreamBuilder::open_default_stream()
            .map_err(|e| MediaError::OutputUnavailable(e.to_string()))?;
        Ok(Self {
            output,
            assets_dir: assets_dir.into(),
            blobs,
        })
    }

    fn load(&self, url: &str) -> Result<Arc<[u8]>, String> {
        if is_blob_url(url) {
            return self
                .blobs
                .resolve(url)
                .map(|entry| entry.bytes)
                .ok_or_else(|| format!("{url} has been revoked"));
        }
        let path = resolve_asset_path(&self.assets_dir, url);
        std::fs::read(&path)
            .map(Arc::from)
            .map_err(|e| format!("{}: {e}", path.display()))
    }
}

/// Map a site-relative URL (`/audio/x.mp3`) onto the assets directory.
/// Anything else is taken as a filesystem path.
pub fn resolve_asset_path(assets_dir: &Path, url: &str) -> PathBuf {
    match url.strip_prefix('/') {
        Some(relative) => assets_dir.join(relative),
        None => PathBuf::from(url),
    }
}

fn decode(bytes: &Arc<[u8]>) -> Result<ClipDecoder, String> {
    Decoder::new(Cursor::new(Arc::clone(bytes))).map_err(|e| e.to_string())
}

/// Duration from the container when it declares one, otherwise by decoding.
fn measure(bytes: &Arc<[u8]>) -> Result<f64, String> {
    let decoder = decode(bytes)?;
    if let Some(total) = decoder.total_duration() {
        return Ok(total.as_secs_f64());
    }
    let frame = f64::from(decoder.channels()) * f64::from(decoder.sample_rate());
    if frame == 0.0 {
        return Ok(0.0);
    }
    Ok(decoder.count() as f64 / frame)
}

impl MediaBackend for RodioBackend {
    fn open(&self, url: &str, events: mpsc::Sender<MediaEvent>) -> Box<dyn MediaSource> {
        let loaded = self.load(url).and_then(|bytes| {
            let duration = measure(&bytes)?;
            Ok((bytes, duration))
        });

        match loaded {
            Ok((bytes, duration)) => {
                let sink = Sink::connect_new(self.output.mixer());
                sink.pause();
                let _ = events.send(MediaEvent::Loaded { duration });
                Box::new(RodioSource {
                    sink: Some(sink),
                    bytes: Some(bytes),
                    queued: false,
                    active: false,
                    events,
                })
            }
            Err(message) => {
                log::warn!("rodio: cannot open {url}: {message}");
                let _ = events.send(MediaEvent::Error(message));
                Box::new(RodioSource {
                    sink: None,
                    bytes: None,
                    queued: false,
                    active: false,
                    events,
                })
            }
        }
    }
}

struct RodioSource {
    sink: Option<Sink>,
    bytes: Option<Arc<[u8]>>,
    /// A decoder is appended to the sink.
    queued: bool,
    /// Playing and not yet reported as ended.
    active: bool,
    events: mpsc::Sender<MediaEvent>,
}

impl RodioSource {
    /// Make sure the sink holds a decoder, appending a fresh one after the
    /// previous one ran out.
    fn ensure_queued(&mut self) -> Result<(), MediaError> {
        let (Some(sink), Some(bytes)) = (self.sink.as_ref(), self.bytes.as_ref()) else {
            return Err(MediaError::LoadFailed("source is not loaded".into()));
        };
        if !self.queued || sink.empty() {
            sink.append(decode(bytes).map_err(MediaError::LoadFailed)?);
            self.queued = true;
        }
        Ok(())
    }
}

impl MediaSource for RodioSource {
    fn play(&mut self) -> Result<(), MediaError> {
        self.ensure_queued()?;
        if let Some(sink) = self.sink.as_ref() {
            sink.play();
        }
        self.active = true;
        let _ = self.events.send(MediaEvent::Started);
        Ok(())
    }

    fn pause(&mut self) {
        if let Some(sink) = self.sink.as_ref() {
            sink.pause();
            if self.active {
                self.active = false;
                let _ = self.events.send(MediaEvent::Paused);
            }
        }
    }

    fn seek(&mut self, position: f64) {
        if let Some(sink) = self.sink.as_ref() {
            if !self.active {
                sink.pause();
            }
        }
        if let Err(e) = self.ensure_queued() {
            log::warn!("rodio: seek ignored: {e}");
            return;
        }
        if let Some(sink) = self.sink.as_ref() {
            if let Err(e) = sink.try_seek(Duration::from_secs_f64(position)) {
                log::warn!("rodio: seek to {position:.2}s failed: {e}");
            }
        }
    }

    fn set_rate(&mut self, rate: f32) {
        if let Some(sink) = self.sink.as_ref() {
            sink.set_speed(rate);
        }
    }

    fn poll(&mut self) {
        let Some(sink) = self.sink.as_ref() else {
            return;
        };
        if !self.active {
            return;
        }
        if sink.empty() {
            self.active = false;
            self.queued = false;
            let _ = self.events.send(MediaEvent::Ended);
        } else {
            let _ = self.events.send(MediaEvent::Progress {
                position: sink.get_pos().as_secs_f64(),
            });
        }
    }

    fn release(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        self.bytes = None;
        self.active = false;
    }
}
