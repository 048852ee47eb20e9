use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn bin_path(name: &str) -> PathBuf {
    // Prefer cargo-provided env var for binaries
    let key = format!("CARGO_BIN_EXE_{}", name);
    if let Ok(p) = std::env::var(&key) {
        return PathBuf::from(p);
    }
    let mut p = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    p.pop(); // crates/tools
    p.pop(); // crates
    p.push("target");
    p.push("debug");
    p.push(name);
    p
}

const HEADER: &str = "PuzzleId,FEN,Moves,Rating,RatingDeviation,Popularity,NbPlays,Themes,GameUrl,OpeningTags";
const FEN: &str = "r6k/pp2r2p/4Rp1Q/3p4/8/1N1P2R1/PqP2bPP/7K b - - 0 24";

fn row(id: &str, rating: u32, themes: &str) -> String {
    format!("{id},{FEN},f2g3 e6e7 b2b1,{rating},75,95,1200,{themes},https://lichess.org/x#48,")
}

fn write_csv(path: &Path, rows: &[String]) {
    let mut f = File::create(path).expect("create input");
    writeln!(f, "{HEADER}").unwrap();
    for r in rows {
        writeln!(f, "{r}").unwrap();
    }
}

fn run(args: &[&str]) -> Output {
    Command::new(bin_path("partition_puzzles"))
        .args(args)
        .arg("--no-progress")
        .output()
        .expect("run partition_puzzles")
}

fn ids_in(path: &Path) -> Vec<String> {
    let text = fs::read_to_string(path).unwrap_or_default();
    text.lines()
        .skip(1)
        .map(|l| l.split(',').next().unwrap().to_string())
        .collect()
}

/// Every file under `root`, relative path -> contents.
fn snapshot(root: &Path) -> Vec<(PathBuf, Vec<u8>)> {
    fn walk(root: &Path, dir: &Path, out: &mut Vec<(PathBuf, Vec<u8>)>) {
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                walk(root, &path, out);
            } else {
                let rel = path.strip_prefix(root).unwrap().to_path_buf();
                out.push((rel, fs::read(&path).unwrap()));
            }
        }
    }
    let mut out = Vec::new();
    walk(root, root, &mut out);
    out.sort();
    out
}

#[test]
fn test_partitions_into_dataset_and_sorted_layouts() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("puzzles.csv");
    let out = dir.path().join("out");
    write_csv(&input, &[row("abc123", 1150, "fork pin")]);

    let res = run(&[input.to_str().unwrap(), "--output", out.to_str().unwrap()]);
    assert!(res.status.success(), "stderr: {}", String::from_utf8_lossy(&res.stderr));

    let train = out.join("datasets/1000-1200/train.csv");
    let test = out.join("datasets/1000-1200/test.csv");
    let in_train = ids_in(&train).contains(&"abc123".to_string());
    let in_test = ids_in(&test).contains(&"abc123".to_string());
    assert!(in_train ^ in_test, "record must be in exactly one split file");

    for theme in ["fork", "pin"] {
        let path = out.join(format!("sorted/1100/{theme}.csv"));
        let text = fs::read_to_string(&path).expect("theme file");
        assert_eq!(text.lines().next(), Some(HEADER));
        assert_eq!(ids_in(&path), vec!["abc123"]);
    }
    assert!(!out.join("puzzles").exists());
}

#[test]
fn test_malformed_row_is_skipped_and_counted() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("puzzles.csv");
    let out = dir.path().join("out");
    let stats = dir.path().join("stats.json");
    write_csv(
        &input,
        &[
            row("good1", 1500, "mateIn2"),
            format!("bad1,{FEN},f2g3,not-a-number,75,95,1200,fork,,"),
            row("good2", 1720, "endgame"),
        ],
    );

    let res = run(&[
        input.to_str().unwrap(),
        "--output",
        out.to_str().unwrap(),
        "--stats",
        stats.to_str().unwrap(),
    ]);
    assert!(res.status.success(), "stderr: {}", String::from_utf8_lossy(&res.stderr));

    let v: serde_json::Value = serde_json::from_str(&fs::read_to_string(&stats).unwrap()).unwrap();
    assert_eq!(v["rows_read"], 3);
    assert_eq!(v["malformed_skipped"], 1);
    assert_eq!(v["records_partitioned"], 2);
    assert!(out.join("sorted/1500/mateIn2.csv").exists());
    assert!(out.join("sorted/1700/endgame.csv").exists());
    assert!(!out.join("sorted/1500/fork.csv").exists());
}

#[test]
fn test_missing_input_fails() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let res = run(&[
        dir.path().join("nope.csv").to_str().unwrap(),
        "--output",
        out.to_str().unwrap(),
    ]);
    assert!(!res.status.success());
    assert!(!out.join("datasets").exists());
}

#[test]
fn test_rerun_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("puzzles.csv");
    let out = dir.path().join("out");
    let rows: Vec<String> = (0..60)
        .map(|i| row(&format!("p{i:03}"), 600 + i * 37, if i % 2 == 0 { "fork short" } else { "pin long" }))
        .collect();
    write_csv(&input, &rows);

    let args = [input.to_str().unwrap(), "--output", out.to_str().unwrap(), "--flat"];
    assert!(run(&args).status.success());
    let first = snapshot(&out);
    assert!(run(&args).status.success());
    let second = snapshot(&out);
    assert_eq!(first, second);
}

#[test]
fn test_train_and_test_are_disjoint_and_complete() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("puzzles.csv");
    let out = dir.path().join("out");
    let rows: Vec<String> = (0..200).map(|i| row(&format!("q{i:04}"), 1400 + i % 200, "fork")).collect();
    write_csv(&input, &rows);

    assert!(run(&[input.to_str().unwrap(), "--output", out.to_str().unwrap()]).status.success());

    let train = ids_in(&out.join("datasets/1400-1600/train.csv"));
    let test = ids_in(&out.join("datasets/1400-1600/test.csv"));
    assert!(!train.is_empty() && !test.is_empty());
    assert!(train.iter().all(|id| !test.contains(id)));
    let mut all: Vec<String> = train.into_iter().chain(test).collect();
    all.sort();
    let mut expected: Vec<String> = (0..200).map(|i| format!("q{i:04}")).collect();
    expected.sort();
    assert_eq!(all, expected);
}

#[test]
fn test_train_ratio_extremes() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("puzzles.csv");
    write_csv(&input, &[row("a1", 900, "fork"), row("a2", 950, "pin")]);

    let out_all = dir.path().join("all");
    assert!(run(&[input.to_str().unwrap(), "--output", out_all.to_str().unwrap(), "--train-ratio", "1.0"])
        .status
        .success());
    assert_eq!(ids_in(&out_all.join("datasets/800-1000/train.csv")).len(), 2);
    assert!(!out_all.join("datasets/800-1000/test.csv").exists());

    let out_none = dir.path().join("none");
    assert!(run(&[input.to_str().unwrap(), "--output", out_none.to_str().unwrap(), "--train-ratio", "0"])
        .status
        .success());
    assert_eq!(ids_in(&out_none.join("datasets/800-1000/test.csv")).len(), 2);
}

#[test]
fn test_flat_layout_sorted_by_themes() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("puzzles.csv");
    let out = dir.path().join("out");
    write_csv(
        &input,
        &[
            row("z1", 2010, "pin"),
            row("z2", 2090, "fork middlegame"),
            row("z3", 2050, "fork"),
        ],
    );

    assert!(run(&[input.to_str().unwrap(), "--output", out.to_str().unwrap(), "--flat"]).status.success());
    assert_eq!(ids_in(&out.join("puzzles/puzzles_2000.csv")), vec!["z3", "z2", "z1"]);
}

#[test]
fn test_reads_gzip_input_and_writes_gzip_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("puzzles.csv.gz");
    let out = dir.path().join("out");
    {
        let f = File::create(&input).unwrap();
        let mut enc = flate2::write::GzEncoder::new(f, flate2::Compression::default());
        writeln!(enc, "{HEADER}").unwrap();
        writeln!(enc, "{}", row("gz1", 1333, "skewer")).unwrap();
        enc.finish().unwrap();
    }

    let res = run(&[input.to_str().unwrap(), "--output", out.to_str().unwrap(), "--gzip"]);
    assert!(res.status.success(), "stderr: {}", String::from_utf8_lossy(&res.stderr));

    let f = File::open(out.join("sorted/1300/skewer.csv.gz")).expect("gz output");
    let mut dec = flate2::read::GzDecoder::new(f);
    let mut text = String::new();
    dec.read_to_string(&mut text).unwrap();
    assert_eq!(text.lines().count(), 2);
    assert!(text.lines().nth(1).unwrap().starts_with("gz1,"));
}

#[cfg(feature = "zstd")]
#[test]
fn test_reads_zstd_input() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("lichess_db_puzzle.csv.zst");
    let out = dir.path().join("out");
    let text = format!("{HEADER}\n{}\n{}\n", row("zs1", 2420, "mateIn3"), row("zs2", 2480, "mateIn3"));
    fs::write(&input, zstd::encode_all(text.as_bytes(), 3).unwrap()).unwrap();

    let res = run(&[input.to_str().unwrap(), "--output", out.to_str().unwrap()]);
    assert!(res.status.success(), "stderr: {}", String::from_utf8_lossy(&res.stderr));
    assert_eq!(ids_in(&out.join("sorted/2400/mateIn3.csv")), vec!["zs1", "zs2"]);
}

#[test]
fn test_rerun_with_new_ratio_leaves_no_stale_split() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("puzzles.csv");
    let out = dir.path().join("out");
    let rows: Vec<String> = (0..40).map(|i| row(&format!("s{i:02}"), 1000 + i, "fork")).collect();
    write_csv(&input, &rows);

    let with_ratio = |ratio: &'static str| [input.to_str().unwrap(), "--output", out.to_str().unwrap(), "--train-ratio", ratio];
    assert!(run(&with_ratio("0.5")).status.success());
    assert!(out.join("datasets/1000-1200/test.csv").exists());

    assert!(run(&with_ratio("1.0")).status.success());
    assert_eq!(ids_in(&out.join("datasets/1000-1200/train.csv")).len(), 40);
    assert!(!out.join("datasets/1000-1200/test.csv").exists());
}

#[test]
fn test_config_file_with_flag_override() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("puzzles.csv");
    let out = dir.path().join("from_config");
    let cfg = dir.path().join("puzzles.toml");
    write_csv(&input, &[row("c1", 1234, "fork")]);
    fs::write(
        &cfg,
        format!(
            "output_dir = {:?}\nrange_width = 500\nbin_step = 250\n",
            out.to_str().unwrap()
        ),
    )
    .unwrap();

    let res = run(&[
        input.to_str().unwrap(),
        "--config",
        cfg.to_str().unwrap(),
        "--bin-step",
        "50",
    ]);
    assert!(res.status.success(), "stderr: {}", String::from_utf8_lossy(&res.stderr));
    assert!(out.join("datasets/1000-1500").is_dir());
    assert!(out.join("sorted/1200/fork.csv").exists());
}

#[test]
fn test_invalid_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("puzzles.csv");
    let cfg = dir.path().join("bad.toml");
    write_csv(&input, &[row("c1", 1234, "fork")]);
    fs::write(&cfg, "range_width = 0\n").unwrap();

    let res = run(&[input.to_str().unwrap(), "--config", cfg.to_str().unwrap()]);
    assert!(!res.status.success());
}

#[test]
fn test_jsonl_input() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("puzzles.jsonl");
    let out = dir.path().join("out");
    fs::write(
        &input,
        format!(
            "{{\"id\":\"j1\",\"fen\":\"{FEN}\",\"moves\":[\"f2g3\",\"e6e7\"],\"rating\":1890,\"themes\":[\"deflection\"]}}\n"
        ),
    )
    .unwrap();

    assert!(run(&[input.to_str().unwrap(), "--output", out.to_str().unwrap()]).status.success());
    assert_eq!(ids_in(&out.join("sorted/1800/deflection.csv")), vec!["j1"]);
}
