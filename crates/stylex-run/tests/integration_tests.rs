use assert_cmd::cargo;
use rstest::rstest;
use std::io::Write;
use tempfile::NamedTempFile;

fn create_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write to temp file");
    file
}

const BUILDINGS: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {"type": "Feature", "id": 1, "properties": {"name": "Tower", "height": 150, "kind": "office"}},
    {"type": "Feature", "id": 2, "properties": {"name": "House", "height": 8, "kind": "home"}},
    {"type": "Feature", "id": 3, "properties": null}
  ]
}"#;

#[test]
fn test_cli_run_with_stdin() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = cargo::cargo_bin_cmd!("stylex");

    let assert = cmd
        .arg("height > 100 ? 'tall' : 'short'")
        .write_stdin(BUILDINGS)
        .assert();
    assert.success().code(0).stdout("tall\nshort\nshort\n");

    Ok(())
}

#[rstest]
#[case::variables(
    vec!["'${name} (${height}m)'"],
    BUILDINGS,
    "Tower (150m)\nHouse (8m)\nundefined (undefinedm)\n"
)]
#[case::defines(
    vec!["-D", "LIMIT=100", "-D", "TALL='tall'", "${height} > LIMIT ? TALL : 'low'"],
    BUILDINGS,
    "tall\nlow\nlow\n"
)]
#[case::undefine(
    vec!["-U", "OFFSET", "height + OFFSET 1"],
    r#"{"height": 2}"#,
    "3\n"
)]
#[case::regex(
    vec!["kind =~ '^off'"],
    BUILDINGS,
    "true\nfalse\nfalse\n"
)]
#[case::json(
    vec!["-F", "json", "-c", "rgb(height, 0, 0)"],
    BUILDINGS,
    "[\"rgb(150, 0, 0)\",\"rgb(8, 0, 0)\",null]\n"
)]
#[case::pretty_json(
    vec!["-F", "json", "len(name)"],
    r#"[{"name": "ab"}]"#,
    "[\n  2\n]\n"
)]
#[case::null_input(
    vec!["-n", "max(1, 2, 3)"],
    "",
    "3\n"
)]
#[case::empty_stdin(
    vec!["1 + 1"],
    "",
    "2\n"
)]
fn test_cli_commands(
    #[case] args: Vec<&str>,
    #[case] input: &str,
    #[case] expected_output: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = cargo::cargo_bin_cmd!("stylex");
    let assert = cmd.args(args).write_stdin(input).assert();

    assert.success().code(0).stdout(expected_output.to_owned());

    Ok(())
}

#[test]
fn test_cli_run_with_file_input() -> Result<(), Box<dyn std::error::Error>> {
    let first = create_file(r#"{"w": 1}"#);
    let second = create_file(r#"[{"w": 2}, {"w": 3}]"#);

    let mut cmd = cargo::cargo_bin_cmd!("stylex");
    let assert = cmd
        .arg("w * 10")
        .arg(first.path())
        .arg(second.path())
        .assert();
    assert.success().code(0).stdout("10\n20\n30\n");

    Ok(())
}

#[test]
fn test_cli_run_with_expression_from_file() -> Result<(), Box<dyn std::error::Error>> {
    let expression = create_file("upper(kind)\n");

    let mut cmd = cargo::cargo_bin_cmd!("stylex");
    let assert = cmd
        .arg("--from-file")
        .arg(expression.path())
        .write_stdin(r#"{"kind": "park"}"#)
        .assert();
    assert.success().code(0).stdout("PARK\n");

    Ok(())
}

#[test]
fn test_cli_parse_error() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = cargo::cargo_bin_cmd!("stylex");
    let assert = cmd.arg("1 +").write_stdin("{}").assert();
    assert.failure().stdout("");

    Ok(())
}

#[test]
fn test_cli_feature_error_keeps_going() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = cargo::cargo_bin_cmd!("stylex");
    let assert = cmd
        .arg("a ? a : nope()")
        .write_stdin(r#"[{"a": 1}, {"a": 0}, {"a": 2}]"#)
        .assert();
    assert.failure().stdout("1\n2\n");

    Ok(())
}

#[test]
fn test_cli_docs() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = cargo::cargo_bin_cmd!("stylex");
    let output = cmd.arg("docs").output()?;

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.lines().any(|line| line.starts_with("substr(")));

    Ok(())
}

#[rstest]
#[case::valid("a + 1\nrgb(1, 2, 3)\n", true)]
#[case::invalid("a + 1\nmax(1,\n", false)]
fn test_cli_check(#[case] content: &str, #[case] ok: bool) -> Result<(), Box<dyn std::error::Error>> {
    let file = create_file(content);

    let mut cmd = cargo::cargo_bin_cmd!("stylex");
    let assert = cmd.arg("check").arg(file.path()).assert();

    if ok {
        assert.success();
    } else {
        assert.failure();
    }

    Ok(())
}
