use assert_cmd::Command;
use seisgrid_core::ScalarGrid;
use seisgrid_core::persist;
use std::path::Path;

fn cli() -> Command {
    let mut cmd = Command::cargo_bin("seisgrid-cli").expect("binary builds");
    cmd.env_remove("UCVM_INSTALL_PATH");
    cmd
}

fn write_npy(path: &Path, values: Vec<f32>, num_x: usize, num_y: usize) {
    let grid = ScalarGrid::from_values(values, num_x, num_y).unwrap();
    persist::write_grid(path, &grid).unwrap();
}

#[test]
fn no_arguments_prints_usage() {
    cli().assert().failure().code(2);
}

#[test]
fn help_prints_usage() {
    let out = cli().arg("--help").assert().failure().code(2);
    let text = String::from_utf8(out.get_output().stderr.clone()).unwrap();
    assert!(text.contains("USAGE"));
    assert!(text.contains("horizontal-slice"));
}

#[test]
fn unknown_command_is_a_usage_error() {
    cli().arg("frobnicate").assert().failure().code(2);
}

#[test]
fn missing_install_dir_is_reported() {
    let out = cli()
        .args([
            "models",
        ])
        .assert()
        .failure()
        .code(1);
    let text = String::from_utf8(out.get_output().stderr.clone()).unwrap();
    assert!(text.contains("installdir"));
}

#[test]
fn horizontal_difference_from_datafiles() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a_data.bin");
    let b = dir.path().join("b_data.bin");
    // 1x1 degree box at 1.0 spacing is a 2x2 lattice.
    write_npy(&a, vec![1.0, 2.0, 3.0, 4.0], 2, 2);
    write_npy(&b, vec![1.0, 1.0, 1.0, 9.0], 2, 2);
    let out = dir.path().join("diff.png");
    let debug = dir.path().join("diff_debug.json");

    cli()
        .args([
            "horizontal-difference",
            "--bottomleft",
            "34,-118",
            "--upperright",
            "35,-117",
            "--spacing",
            "1.0",
            "--datafile",
        ])
        .arg(format!("{},{}", a.display(), b.display()))
        .arg("--outfile")
        .arg(&out)
        .arg("--debug")
        .arg(&debug)
        .assert()
        .success();

    assert!(out.exists());
    let report = std::fs::read_to_string(&debug).unwrap();
    assert!(report.contains("\"max_less\""));
    assert!(report.contains("\"less\""));
}

#[test]
fn horizontal_slice_reuses_persisted_data() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("prior_data.bin");
    write_npy(&data, vec![500.0, 1000.0, 1500.0, 2000.0], 2, 2);
    let out = dir.path().join("slice.png");

    cli()
        .args([
            "horizontal-slice",
            "--bottomleft",
            "34,-118",
            "--upperright",
            "35,-117",
            "--spacing",
            "1.0",
            "--cvm",
            "cvms5",
            "--installdir",
        ])
        .arg(dir.path())
        .arg("--datafile")
        .arg(&data)
        .arg("--outfile")
        .arg(&out)
        .assert()
        .success();

    assert!(out.exists());
}

#[test]
fn mismatched_datafile_shape_fails() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("prior_data.bin");
    // 3x3 values against the 2x2 lattice below.
    write_npy(&data, vec![0.0; 9], 3, 3);

    cli()
        .args([
            "horizontal-slice",
            "--bottomleft",
            "34,-118",
            "--upperright",
            "35,-117",
            "--spacing",
            "1.0",
            "--cvm",
            "cvms5",
            "--installdir",
        ])
        .arg(dir.path())
        .arg("--datafile")
        .arg(&data)
        .assert()
        .failure()
        .code(1);
}
