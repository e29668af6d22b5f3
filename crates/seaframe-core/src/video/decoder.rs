use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};

use image::{DynamicImage, RgbImage};
use tracing::{debug, error, info, warn};

use super::frame::Frame;
use super::FrameSource;
use crate::error::{Error, Result};

/// Video metadata obtained by probing with ffprobe.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ProbeResult {
    width: u32,
    height: u32,
    fps: Option<f64>,
}

fn probe(path: &Path) -> Result<ProbeResult> {
    info!(?path, "probing video metadata with ffprobe");

    let output = Command::new("ffprobe")
        .args([
            "-v", "error",
            "-select_streams", "v:0",
            "-show_entries", "stream=width,height,r_frame_rate",
            "-of", "csv=p=0",
        ])
        .arg(path)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| Error::Probe {
            path: path.to_path_buf(),
            reason: format!("failed to run ffprobe, is ffmpeg installed? ({e})"),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        error!(%stderr, ?path, "ffprobe failed");
        return Err(Error::Probe {
            path: path.to_path_buf(),
            reason: stderr.trim().to_string(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let result = parse_probe_output(&stdout).map_err(|reason| {
        error!(%stdout, "unexpected ffprobe output format, expected width,height,fps");
        Error::Probe {
            path: path.to_path_buf(),
            reason,
        }
    })?;

    if result.fps.is_none() {
        warn!(?path, "video does not report a usable frame rate");
    }

    info!(width = result.width, height = result.height, fps = ?result.fps, "probe completed");
    Ok(result)
}

/// Parse ffprobe's "width,height,num/den" line.
fn parse_probe_output(stdout: &str) -> std::result::Result<ProbeResult, String> {
    let line = stdout.lines().next().unwrap_or("").trim();
    let parts: Vec<&str> = line.split(',').collect();
    if parts.len() < 3 {
        return Err(format!("unexpected ffprobe output: {line:?}"));
    }

    let width: u32 = parts[0]
        .parse()
        .map_err(|e| format!("failed to parse width {:?}: {e}", parts[0]))?;
    let height: u32 = parts[1]
        .parse()
        .map_err(|e| format!("failed to parse height {:?}: {e}", parts[1]))?;
    if width == 0 || height == 0 {
        return Err(format!("invalid video dimensions: {width}x{height}"));
    }

    Ok(ProbeResult {
        width,
        height,
        fps: parse_frame_rate(parts[2]),
    })
}

/// Parse an ffprobe rate such as "30000/1001" or "25". Zero, "0/0" and
/// unparsable values yield None.
fn parse_frame_rate(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let fps = if let Some((num, den)) = raw.split_once('/') {
        let num: f64 = num.trim().parse().ok()?;
        let den: f64 = den.trim().parse().ok()?;
        if den == 0.0 {
            return None;
        }
        num / den
    } else {
        raw.parse().ok()?
    };

    (fps.is_finite() && fps > 0.0).then_some(fps)
}

/// Fill one frame of `frame_bytes` from `reader`.
///
/// Returns `None` when the stream is already at its end, and an
/// `UnexpectedEof` error when it ends partway through a frame.
fn read_frame<R: Read>(reader: &mut R, frame_bytes: usize) -> io::Result<Option<Vec<u8>>> {
    let mut buf = vec![0u8; frame_bytes];
    let mut read = 0;

    while read < frame_bytes {
        match reader.read(&mut buf[read..]) {
            Ok(0) => break,
            Ok(n) => read += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    match read {
        0 => Ok(None),
        n if n < frame_bytes => Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("stream ended mid-frame (read {n}/{frame_bytes} bytes)"),
        )),
        _ => Ok(Some(buf)),
    }
}

/// Decodes video frames by piping raw RGB24 data from the ffmpeg CLI.
pub struct VideoDecoder {
    path: PathBuf,
    child: Child,
    stderr: Option<JoinHandle<String>>,
    width: u32,
    height: u32,
    fps: Option<f64>,
    frame_count: u32,
    frame_bytes: usize,
    finished: bool,
}

impl VideoDecoder {
    /// Open a video file for decoding.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::MissingInput(path.to_path_buf()));
        }

        let info = probe(path)?;

        info!(?path, "spawning ffmpeg decoder process");

        let mut command = Command::new("ffmpeg");
        command
            .args(["-i"])
            .arg(path)
            .args([
                "-f", "rawvideo",
                "-pix_fmt", "rgb24",
                "-v", "error",
                "pipe:1",
            ]);

        Self::spawn(path, command, info)
    }

    /// Start `command` as the decoder process. Its stdout must carry raw
    /// RGB24 frames of the probed size; its stderr is kept for error reports.
    fn spawn(path: &Path, mut command: Command, info: ProbeResult) -> Result<Self> {
        let mut child = command
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::Decode {
                path: path.to_path_buf(),
                reason: format!("failed to spawn ffmpeg, is ffmpeg installed? ({e})"),
            })?;

        // Drained on its own thread; a full stderr pipe would stall ffmpeg.
        let stderr = child.stderr.take().map(|mut pipe| {
            thread::spawn(move || {
                let mut text = String::new();
                let _ = pipe.read_to_string(&mut text);
                text
            })
        });

        let frame_bytes = (info.width as usize) * (info.height as usize) * 3;

        info!(
            width = info.width,
            height = info.height,
            fps = ?info.fps,
            frame_bytes,
            "video decoder opened"
        );

        Ok(Self {
            path: path.to_path_buf(),
            child,
            stderr,
            width: info.width,
            height: info.height,
            fps: info.fps,
            frame_count: 0,
            frame_bytes,
            finished: false,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn decode_error(&self, reason: String) -> Error {
        Error::Decode {
            path: self.path.clone(),
            reason,
        }
    }

    /// Reap the decoder process once its output is exhausted. A non-zero
    /// exit is a decode failure carrying ffmpeg's stderr.
    fn finish(&mut self) -> Result<()> {
        self.finished = true;

        let status = self
            .child
            .wait()
            .map_err(|e| self.decode_error(format!("failed to wait for ffmpeg: {e}")))?;
        let stderr = self
            .stderr
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();
        let stderr = stderr.trim();

        if !status.success() {
            error!(%status, %stderr, frame = self.frame_count, "ffmpeg exited with failure");
            return Err(self.decode_error(format!("ffmpeg exited with {status}: {stderr}")));
        }
        if !stderr.is_empty() {
            warn!(%stderr, "ffmpeg reported errors");
        }
        Ok(())
    }
}

impl FrameSource for VideoDecoder {
    fn frame_rate(&self) -> Option<f64> {
        self.fps
    }

    /// Read the next frame from the ffmpeg pipe, or `None` once ffmpeg has
    /// finished successfully.
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.finished {
            return Ok(None);
        }

        let frame_bytes = self.frame_bytes;
        let Some(stdout) = self.child.stdout.as_mut() else {
            return Err(self.decode_error("ffmpeg stdout not available".into()));
        };

        let buf = match read_frame(stdout, frame_bytes) {
            Ok(Some(buf)) => buf,
            Ok(None) => {
                self.finish()?;
                info!(total_frames = self.frame_count, "video stream ended");
                return Ok(None);
            }
            Err(e) => {
                // A failed exit takes precedence over the read error.
                self.finish()?;
                error!(frame = self.frame_count, %e, "failed to read from ffmpeg pipe");
                return Err(self.decode_error(format!("ffmpeg output unreadable: {e}")));
            }
        };

        let Some(image) = RgbImage::from_raw(self.width, self.height, buf) else {
            return Err(self.decode_error("raw frame does not match probed dimensions".into()));
        };

        let source_index = self.frame_count;
        self.frame_count += 1;

        debug!(source_index, "decoded frame");

        Ok(Some(Frame {
            image: DynamicImage::ImageRgb8(image),
            source_index,
        }))
    }
}

impl Drop for VideoDecoder {
    fn drop(&mut self) {
        info!(total_frames = self.frame_count, "closing video decoder");
        if !self.finished {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
