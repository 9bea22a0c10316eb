use crate::e2e::*;

#[cfg(unix)]
#[test]
fn directory_output_runs_first() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("in.txt", "hi\n")?;
    // Declared before the step that creates its directory.
    space.generate(&[
        Step {
            title: "copy",
            command: "cp in.txt obj/out.txt",
            inputs: &["in.txt"],
            outputs: &["obj/out.txt"],
        },
        Step {
            title: "mkdir",
            command: "mkdir -p obj",
            inputs: &[],
            outputs: &["obj/"],
        },
    ])?;

    let out = space.run_expect(&mut opgraph_command(vec!["build"]))?;
    assert_output_contains(&out, "ran 2 operations");
    assert_eq!(space.read("obj/out.txt")?, b"hi\n");

    let out = space.run_expect(&mut opgraph_command(vec!["build"]))?;
    assert_output_contains(&out, "no work to do");
    Ok(())
}

#[cfg(unix)]
#[test]
fn nested_directories() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.generate(&[
        Step {
            title: "leaf",
            command: "touch a/b/leaf",
            inputs: &[],
            outputs: &["a/b/leaf"],
        },
        Step {
            title: "inner",
            command: "mkdir a/b",
            inputs: &[],
            outputs: &["a/b/"],
        },
        Step {
            title: "outer",
            command: "mkdir a",
            inputs: &[],
            outputs: &["a/"],
        },
    ])?;

    let out = space.run_expect(&mut opgraph_command(vec!["outdated"]))?;
    assert_eq!(std::str::from_utf8(&out.stdout)?, "outer\ninner\nleaf\n");
    space.run_expect(&mut opgraph_command(vec!["build"]))?;
    assert!(space.exists("a/b/leaf"));
    Ok(())
}
