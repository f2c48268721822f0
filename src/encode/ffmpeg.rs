use std::ffi::OsString;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::Context;

use crate::foundation::error::{TimelapseError, TimelapseResult};
use crate::foundation::process;
use crate::pipeline::reporter::Reporter;
use crate::project::Project;

/// Options for one MP4 encode.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoOpts {
    pub frames_dir: PathBuf,
    pub out_path: PathBuf,
    pub framerate: u32,
    /// Applied to both frame dimensions before encoding.
    pub scale: f64,
}

impl VideoOpts {
    pub fn for_project(project: &Project, output: &str) -> Self {
        let paths = project.paths();
        Self {
            frames_dir: paths.frames_dir(),
            out_path: paths.output_file(output),
            framerate: project.config.framerate,
            scale: project.config.video_scale,
        }
    }
}

/// Encode `frames/frame_*.png` of `project` into `output/<output>.mp4`.
pub fn assemble_video(
    project: &Project,
    output: &str,
    reporter: &dyn Reporter,
) -> TimelapseResult<PathBuf> {
    encode(&VideoOpts::for_project(project, output), reporter)
}

pub fn encode(opts: &VideoOpts, reporter: &dyn Reporter) -> TimelapseResult<PathBuf> {
    if opts.framerate == 0 {
        return Err(TimelapseError::validation("framerate must be non-zero"));
    }
    if !(opts.scale.is_finite() && opts.scale > 0.0) {
        return Err(TimelapseError::validation("video scale must be > 0"));
    }

    let total = count_frames(&opts.frames_dir)?;
    if total == 0 {
        return Err(TimelapseError::stage(format!(
            "no frames to encode in {}",
            opts.frames_dir.display()
        )));
    }
    if !is_ffmpeg_on_path() {
        return Err(TimelapseError::tool(
            "ffmpeg is required for MP4 encoding, but was not found on PATH",
        ));
    }

    let out_path = std::path::absolute(&opts.out_path)
        .with_context(|| format!("resolve {}", opts.out_path.display()))?;
    ensure_parent_dir(&out_path)?;

    reporter.set_stage("Assembling video", total);
    tracing::info!(frames = total, out = %out_path.display(), "encoding video");

    let mut child = Command::new("ffmpeg")
        .args(ffmpeg_args(opts.framerate, opts.scale, &out_path))
        .current_dir(&opts.frames_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            TimelapseError::tool(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| TimelapseError::tool("failed to open ffmpeg stdout (unexpected)"))?;
    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| TimelapseError::tool("failed to open ffmpeg stderr (unexpected)"))?;
    let stderr_drain = std::thread::spawn(move || {
        let mut stderr_bytes = Vec::new();
        stderr.read_to_end(&mut stderr_bytes)?;
        Ok::<_, std::io::Error>(stderr_bytes)
    });

    for line in BufReader::new(stdout).lines() {
        let line = line.context("read ffmpeg progress")?;
        if let Some(frame) = parse_progress_line(&line) {
            reporter.set_progress((frame as f64 / total as f64).min(1.0));
        }
    }

    let status = child
        .wait()
        .map_err(|e| TimelapseError::tool(format!("failed to wait for ffmpeg to finish: {e}")))?;
    let stderr_bytes = stderr_drain
        .join()
        .map_err(|_| TimelapseError::tool("ffmpeg stderr drain thread panicked"))?
        .map_err(|e| TimelapseError::tool(format!("ffmpeg stderr read failed: {e}")))?;

    if !status.success() {
        let stderr = String::from_utf8_lossy(&stderr_bytes);
        return Err(TimelapseError::tool(format!(
            "ffmpeg exited with status {status}: {}",
            stderr.trim()
        )));
    }

    reporter.set_progress(1.0);
    Ok(out_path)
}

/// Arguments for an encode run inside the frames directory.
fn ffmpeg_args(framerate: u32, scale: f64, out_path: &Path) -> Vec<OsString> {
    let fps = framerate.to_string();
    let filter = format!(
        "format=yuv420p,scale=iw*{scale}:ih*{scale},pad=ceil(iw/2)*2:ceil(ih/2)*2:0:0:white"
    );
    let mut args: Vec<OsString> = [
        "-y",
        "-loglevel",
        "error",
        "-framerate",
        fps.as_str(),
        "-pattern_type",
        "glob",
        "-i",
        "frame_*.png",
        "-c:v",
        "libx264",
        "-movflags",
        "+faststart",
        "-vf",
        filter.as_str(),
        "-progress",
        "pipe:1",
        "-nostats",
    ]
    .into_iter()
    .map(OsString::from)
    .collect();
    args.push(out_path.as_os_str().to_owned());
    args
}

/// Frame number from one `-progress` line (`frame=42`).
pub(crate) fn parse_progress_line(line: &str) -> Option<u64> {
    line.trim().strip_prefix("frame=")?.trim().parse().ok()
}

fn count_frames(frames_dir: &Path) -> TimelapseResult<usize> {
    if !frames_dir.is_dir() {
        return Ok(0);
    }
    let entries = std::fs::read_dir(frames_dir)
        .with_context(|| format!("read {}", frames_dir.display()))?;
    let mut count = 0;
    for entry in entries {
        let name = entry?.file_name();
        let name = name.to_string_lossy();
        if name.starts_with("frame_") && name.ends_with(".png") {
            count += 1;
        }
    }
    Ok(count)
}

fn ensure_parent_dir(path: &Path) -> TimelapseResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

pub fn is_ffmpeg_on_path() -> bool {
    process::is_on_path("ffmpeg")
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
