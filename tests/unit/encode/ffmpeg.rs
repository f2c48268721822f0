use super::*;
use crate::pipeline::TracingReporter;

#[test]
fn progress_lines_yield_frame_numbers() {
    assert_eq!(parse_progress_line("frame=42"), Some(42));
    assert_eq!(parse_progress_line("  frame= 7 \n"), Some(7));
    assert_eq!(parse_progress_line("fps=12.0"), None);
    assert_eq!(parse_progress_line("frame=N/A"), None);
}

#[test]
fn args_scale_and_pad_to_even_dimensions() {
    let args = ffmpeg_args(8, 0.25, Path::new("/tmp/out.mp4"));
    let args: Vec<String> = args
        .iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect();

    let at = |flag: &str| {
        let i = args.iter().position(|a| a == flag).unwrap();
        args[i + 1].clone()
    };
    assert_eq!(at("-framerate"), "8");
    assert_eq!(at("-i"), "frame_*.png");
    assert_eq!(at("-progress"), "pipe:1");
    assert_eq!(
        at("-vf"),
        "format=yuv420p,scale=iw*0.25:ih*0.25,pad=ceil(iw/2)*2:ceil(ih/2)*2:0:0:white"
    );
    assert_eq!(args.last().unwrap(), "/tmp/out.mp4");
}

#[test]
fn only_frame_pngs_are_counted() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("frame_000000.png"), b"").unwrap();
    std::fs::write(dir.path().join("frame_000001.png"), b"").unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"").unwrap();
    assert_eq!(count_frames(dir.path()).unwrap(), 2);
    assert_eq!(count_frames(&dir.path().join("missing")).unwrap(), 0);
}

#[test]
fn encoding_without_frames_fails_before_spawning() {
    let dir = tempfile::tempdir().unwrap();
    let opts = VideoOpts {
        frames_dir: dir.path().join("frames"),
        out_path: dir.path().join("out.mp4"),
        framerate: 8,
        scale: 1.0,
    };
    let err = encode(&opts, &TracingReporter).unwrap_err();
    assert!(err.to_string().contains("no frames"));
    assert!(!opts.out_path.exists());
}

#[test]
fn invalid_options_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let opts = VideoOpts {
        frames_dir: dir.path().to_path_buf(),
        out_path: dir.path().join("out.mp4"),
        framerate: 0,
        scale: 1.0,
    };
    assert!(encode(&opts, &TracingReporter).unwrap_err().is_structural());
}
