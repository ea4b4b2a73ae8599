use reachab_test::{CommandExt, tool};

/// Chain 1->2->3, priors 1.0/0.9/0.9, edge probs 0.9/0.9 (S1 of the test
/// scenarios).
const CHAIN_CSV: &str = "1.0,0,0.9,0\n0.9,0,0,0.9\n0.9,0,0,0\n";

#[test]
fn reachab_prints_beliefs_for_a_chain() {
    let output = tool!("reachab")
        .args(["--input-format", "csv"])
        .write_stdin(CHAIN_CSV)
        .captured_output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout, "1\t1.000000\n2\t0.810000\n3\t0.656100\n");
}

#[test]
fn reachab_diamonds_reports_the_canonical_diamond() {
    let csv = "0.9,0,0.9,0.9,0\n0.9,0,0,0,0.9\n0.9,0,0,0,0.9\n0.9,0,0,0,0\n";
    let output = tool!("reachab-diamonds")
        .args(["--input-format", "csv"])
        .write_stdin(csv)
        .captured_output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("join=4"));
    assert!(stdout.contains("conditioning={1}"));
}
