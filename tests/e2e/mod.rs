//! Support code for e2e tests, which run opgraph as a binary.  Graphs are
//! generated through the library and saved where the binary looks for them.

mod basic;
mod directories;

use opgraph::file_state::FileSystemState;
use opgraph::fs::RealFileSystem;
use opgraph::generate::OperationGraphGenerator;
use opgraph::manager;
use opgraph::run::DEFAULT_GRAPH_PATH;

pub fn opgraph_binary() -> std::path::PathBuf {
    std::env::current_exe()
        .expect("test binary path")
        .parent()
        .expect("test binary directory")
        .parent()
        .expect("binary directory")
        .join("opgraph")
}

pub fn opgraph_command(args: Vec<&str>) -> std::process::Command {
    let mut cmd = std::process::Command::new(opgraph_binary());
    cmd.args(args);
    cmd
}

fn print_output(out: &std::process::Output) {
    // Gross: use print! instead of writing to stdout so Rust test
    // framework can capture it.
    print!("{}", std::str::from_utf8(&out.stdout).unwrap());
    print!("{}", std::str::from_utf8(&out.stderr).unwrap());
}

pub fn assert_output_contains(out: &std::process::Output, text: &str) {
    let out = std::str::from_utf8(&out.stdout).unwrap();
    if !out.contains(text) {
        panic!(
            "assertion failed; expected output to contain {:?} but got:\n{}",
            text, out
        );
    }
}

pub fn assert_output_not_contains(out: &std::process::Output, text: &str) {
    let out = std::str::from_utf8(&out.stdout).unwrap();
    if out.contains(text) {
        panic!(
            "assertion failed; expected output to not contain {:?} but got:\n{}",
            text, out
        );
    }
}

/// One step of a generated graph: a shell command with its declared files.
pub struct Step<'a> {
    pub title: &'a str,
    pub command: &'a str,
    pub inputs: &'a [&'a str],
    pub outputs: &'a [&'a str],
}

/// Manages a temporary directory for invoking opgraph.
pub struct TestSpace {
    dir: tempfile::TempDir,
}
impl TestSpace {
    pub fn new() -> anyhow::Result<Self> {
        let dir = tempfile::tempdir()?;
        Ok(TestSpace { dir })
    }

    fn root(&self) -> String {
        self.dir.path().to_string_lossy().replace('\\', "/")
    }

    /// Write a file into the working space.
    pub fn write(&self, path: &str, content: &str) -> std::io::Result<()> {
        std::fs::write(self.dir.path().join(path), content)
    }

    /// Read a file from the working space.
    pub fn read(&self, path: &str) -> std::io::Result<Vec<u8>> {
        std::fs::read(self.dir.path().join(path))
    }

    pub fn exists(&self, path: &str) -> bool {
        self.dir.path().join(path).exists()
    }

    /// Move a file's modification time forward, past anything written so far.
    pub fn touch_later(&self, path: &str) -> std::io::Result<()> {
        let later = std::time::SystemTime::now() + std::time::Duration::from_secs(60);
        filetime::set_file_mtime(
            self.dir.path().join(path),
            filetime::FileTime::from_system_time(later),
        )
    }

    /// Generate a graph of `steps`, all run from the space's root, merge
    /// it with any graph already saved there and save the result.
    pub fn generate(&self, steps: &[Step]) -> anyhow::Result<()> {
        let mut file_state = FileSystemState::new(Box::new(RealFileSystem::new()));
        let mut generator = OperationGraphGenerator::new(&mut file_state);
        for step in steps {
            let (exe, args) = match step.command.split_once(' ') {
                Some((exe, args)) => (exe, args),
                None => (step.command, ""),
            };
            generator.create_operation(step.title, exe, args, &self.root(), step.inputs, step.outputs)?;
        }
        let mut graph = generator.build_graph()?;
        let path = self.dir.path().join(DEFAULT_GRAPH_PATH);
        manager::try_merge_existing(&path, &mut graph, &mut file_state)?;
        manager::save_state(&path, &mut graph, &file_state)?;
        Ok(())
    }

    /// Invoke opgraph, returning process output.
    pub fn run(&self, cmd: &mut std::process::Command) -> std::io::Result<std::process::Output> {
        cmd.current_dir(self.dir.path()).output()
    }

    /// Like run, but also print output if the build failed.
    pub fn run_expect(
        &self,
        cmd: &mut std::process::Command,
    ) -> anyhow::Result<std::process::Output> {
        let out = self.run(cmd)?;
        if !out.status.success() {
            print_output(&out);
            anyhow::bail!("build failed, status {}", out.status);
        }
        Ok(out)
    }

    /// Persist the temp dir locally and abort the test.  Debugging helper.
    #[allow(dead_code)]
    pub fn eject(self) -> ! {
        panic!("ejected at {:?}", self.dir.into_path());
    }
}
