use chrono::{TimeZone, Utc};

use super::*;
use crate::project::paths::ProjectPaths;

fn stage(pairs: &[(&str, &str)]) -> ReplaceText {
    let mut stage = ReplaceText::default();
    stage
        .init(&Config {
            text_replacements: pairs
                .iter()
                .map(|(old, new)| TextReplacement {
                    old: old.to_string(),
                    new: new.to_string(),
                })
                .collect(),
            ..Config::default()
        })
        .unwrap();
    stage
}

#[test]
fn rewrite_strips_includeonly_from_main_only() {
    let s = stage(&[]);
    let main = "\\documentclass{book}\n  % \\includeonly{ch1,\n ch2}\n\\includeonly{ch3}\n\\begin{document}\n";
    let out = s.rewrite(main, true);
    assert!(!out.contains("includeonly"));
    assert!(out.contains("\\begin{document}"));
    assert_eq!(s.rewrite("\\includeonly{x}\n", false), "\\includeonly{x}\n");
}

#[test]
fn replacements_apply_to_tex_and_bib_includes() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    std::fs::write(root.join("main.tex"), "\\begin{document}\nAUTHOR\n\\end{document}\n").unwrap();
    std::fs::write(root.join("refs.bib"), "@misc{AUTHOR}\n").unwrap();
    std::fs::write(root.join("fig.svg"), "AUTHOR").unwrap();

    let mut snap = Snapshot::new("c", Utc.timestamp_opt(0, 0).unwrap(), 0);
    snap.set_work_dir(root);
    snap.main_file = Some("main.tex".to_string());
    snap.includes = vec![
        "main.tex".to_string(),
        "refs.bib".to_string(),
        "fig.svg".to_string(),
    ];

    let paths = ProjectPaths::new(root.join("project"));
    stage(&[("AUTHOR", "Anonymous")])
        .run(&mut snap, &StageContext { paths: &paths })
        .unwrap();

    let read = |f: &str| std::fs::read_to_string(root.join(f)).unwrap();
    assert!(read("main.tex").contains("Anonymous"));
    assert_eq!(read("refs.bib"), "@misc{Anonymous}\n");
    assert_eq!(read("fig.svg"), "AUTHOR");
}

#[test]
fn restore_rewrites_a_fresh_checkout() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    std::fs::write(root.join("main.tex"), "\\includeonly{a}\nAUTHOR\n").unwrap();

    let mut snap = Snapshot::new("c", Utc.timestamp_opt(0, 0).unwrap(), 0);
    snap.set_work_dir(root);
    snap.main_file = Some("main.tex".to_string());
    snap.includes = vec!["main.tex".to_string()];

    let paths = ProjectPaths::new(root.join("project"));
    stage(&[("AUTHOR", "Anonymous")])
        .restore(&snap, &StageContext { paths: &paths })
        .unwrap();

    assert_eq!(
        std::fs::read_to_string(root.join("main.tex")).unwrap(),
        "\nAnonymous\n"
    );
}
