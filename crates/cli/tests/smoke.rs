use std::{fs, path::Path, process::Command};

fn exo_cypher<I>(cwd: impl AsRef<Path>, args: I) -> Command
where
    I: IntoIterator<Item = &'static str>,
{
    let bin = env!("CARGO_BIN_EXE_exo-cypher");

    let mut cmd = Command::new(bin);
    cmd.current_dir(cwd).args(args).env_remove("EXO_CYPHER_VERSION_PREFIX");
    cmd
}

const SCHEMA: &str = r#"
type Todo @authorization(filter: [{ where: { node: { owner: "$jwt.sub" } } }]) {
    title: String!
    owner: String!
}
"#;

#[test]
fn translate_smoke_test() {
    let cargo_tmp_dir = env!("CARGO_TARGET_TMPDIR");
    let tmp_dir = tempfile::tempdir_in(cargo_tmp_dir).expect("Failed to create tempdir");

    fs::write(tmp_dir.path().join("schema.graphql"), SCHEMA).unwrap();
    fs::write(
        tmp_dir.path().join("operation.graphql"),
        "query($title: String!) { todos(where: { title: $title }) { title } }",
    )
    .unwrap();
    fs::write(tmp_dir.path().join("variables.json"), r#"{ "title": "Ship" }"#).unwrap();
    fs::write(tmp_dir.path().join("jwt.json"), r#"{ "sub": "ann" }"#).unwrap();

    let output = exo_cypher(
        tmp_dir.path(),
        [
            "translate",
            "schema.graphql",
            "operation.graphql",
            "--variables",
            "variables.json",
            "--jwt",
            "jwt.json",
        ],
    )
    .output()
    .expect("Failed to run exo-cypher");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("// todos\nMATCH (this:Todo)\n"), "{stdout}");
    assert!(
        stdout.contains("WHERE (this.title = $param0 AND this.owner = $jwt.sub)"),
        "{stdout}"
    );
    assert!(stdout.contains(r#""sub": "ann""#), "{stdout}");

    let output = exo_cypher(
        tmp_dir.path(),
        ["translate", "schema.graphql", "missing.graphql"],
    )
    .output()
    .expect("Failed to run exo-cypher");
    assert!(!output.status.success());
}
