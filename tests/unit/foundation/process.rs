use super::*;

fn tool_output(success: bool, stdout: &str, stderr: &str) -> ToolOutput {
    ToolOutput {
        command: "latexmk paper.tex".to_string(),
        success,
        code: Some(if success { 0 } else { 12 }),
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
    }
}

#[test]
fn failure_text_prefers_stderr() {
    let out = tool_output(false, "log noise", "  ! Undefined control sequence.\n");
    assert_eq!(out.failure_text(), "! Undefined control sequence.");
}

#[test]
fn failure_text_falls_back_to_stdout() {
    let out = tool_output(false, "fatal: bad revision\n", "   ");
    assert_eq!(out.failure_text(), "fatal: bad revision");
}

#[test]
fn checked_failure_carries_command_and_status() {
    let err = tool_output(false, "", "boom").into_checked().unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("tool error:"));
    assert!(msg.contains("latexmk paper.tex"));
    assert!(msg.contains("12"));
    assert!(msg.contains("boom"));
}

#[test]
fn checked_success_returns_stdout() {
    let out = tool_output(true, "Page:2\n", "").into_checked().unwrap();
    assert_eq!(out, "Page:2\n");
}

#[test]
fn spawning_a_missing_program_is_a_tool_error() {
    let dir = std::env::temp_dir();
    let err = output(&dir, "texlapse-definitely-not-a-real-binary", ["x"]).unwrap_err();
    assert!(err.to_string().contains("failed to spawn"));
}
