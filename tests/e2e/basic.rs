use crate::e2e::*;

fn copy_then_cat() -> [Step<'static>; 2] {
    [
        Step {
            title: "copy",
            command: "cp in.txt mid.txt",
            inputs: &["in.txt"],
            outputs: &["mid.txt"],
        },
        Step {
            title: "cat",
            command: "cat mid.txt mid.txt > out.txt",
            inputs: &["mid.txt"],
            outputs: &["out.txt"],
        },
    ]
}

#[test]
fn missing_graph() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    let out = space.run(&mut opgraph_command(vec!["build"]))?;
    assert!(!out.status.success());
    assert_output_contains(&out, "no operation graph at");
    Ok(())
}

#[cfg(unix)]
#[test]
fn build_then_noop() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("in.txt", "hi\n")?;
    space.generate(&copy_then_cat())?;

    let out = space.run_expect(&mut opgraph_command(vec!["build"]))?;
    assert_output_contains(&out, "ran 2 operations");
    assert_eq!(space.read("out.txt")?, b"hi\nhi\n");

    let out = space.run_expect(&mut opgraph_command(vec!["build"]))?;
    assert_output_contains(&out, "no work to do");
    Ok(())
}

#[cfg(unix)]
#[test]
fn touched_input_reruns_chain() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("in.txt", "hi\n")?;
    space.generate(&copy_then_cat())?;
    space.run_expect(&mut opgraph_command(vec!["build"]))?;

    space.write("in.txt", "bye\n")?;
    space.touch_later("in.txt")?;
    let out = space.run_expect(&mut opgraph_command(vec!["build"]))?;
    assert_output_contains(&out, "ran 2 operations");
    assert_eq!(space.read("out.txt")?, b"bye\nbye\n");
    Ok(())
}

#[cfg(unix)]
#[test]
fn regenerate_keeps_history() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("in.txt", "hi\n")?;
    space.generate(&copy_then_cat())?;
    space.run_expect(&mut opgraph_command(vec!["build"]))?;

    // Generating the same graph again must not forget what already ran.
    space.generate(&copy_then_cat())?;
    let out = space.run_expect(&mut opgraph_command(vec!["build"]))?;
    assert_output_contains(&out, "no work to do");
    Ok(())
}

#[cfg(unix)]
#[test]
fn failing_step() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.generate(&[
        Step {
            title: "fail",
            command: "false",
            inputs: &[],
            outputs: &["never"],
        },
        Step {
            title: "after",
            command: "touch after",
            inputs: &["never"],
            outputs: &["after"],
        },
    ])?;

    let out = space.run(&mut opgraph_command(vec!["build"]))?;
    assert!(!out.status.success());
    assert_output_contains(&out, "build failed: fail");
    assert!(!space.exists("after"));
    Ok(())
}

#[cfg(unix)]
#[test]
fn outdated_runs_nothing() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("in.txt", "hi\n")?;
    space.generate(&copy_then_cat())?;

    let out = space.run_expect(&mut opgraph_command(vec!["outdated"]))?;
    assert_eq!(std::str::from_utf8(&out.stdout)?, "copy\ncat\n");
    assert!(!space.exists("mid.txt"));

    space.run_expect(&mut opgraph_command(vec!["build"]))?;
    let out = space.run_expect(&mut opgraph_command(vec!["outdated"]))?;
    assert_eq!(std::str::from_utf8(&out.stdout)?, "");
    Ok(())
}

#[cfg(unix)]
#[test]
fn show_prints_operations() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("in.txt", "hi\n")?;
    space.generate(&copy_then_cat())?;

    let out = space.run_expect(&mut opgraph_command(vec!["show"]))?;
    assert_output_contains(&out, "roots #1");
    assert_output_contains(&out, "#1 copy");
    assert_output_contains(&out, "command: \"cp in.txt mid.txt\"");
    assert_output_contains(&out, "children: #2");
    assert_output_contains(&out, "successful: false");

    space.run_expect(&mut opgraph_command(vec!["build"]))?;
    let out = space.run_expect(&mut opgraph_command(vec!["show"]))?;
    assert_output_not_contains(&out, "successful: false");
    Ok(())
}
