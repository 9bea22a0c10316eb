//! Build extensions and the generate phase that runs them.
//!
//! Extensions are registered up front through a registration callback and
//! run in registration order.  Each one declares operations into a shared
//! generator and may leave values in the shared state for later ones.

use crate::error::{Error, Result};
use crate::file_state::FileSystemState;
use crate::generate::OperationGraphGenerator;
use crate::graph::OperationGraph;
use crate::trace;
use crate::value::ValueTable;
use tracing::debug;

/// What an extension sees while it runs.
pub struct GenerateContext<'g, 'a> {
    pub generator: &'g mut OperationGraphGenerator<'a>,
    /// Read-only parameters of the whole build.
    pub global_state: &'g ValueTable,
    /// State written by earlier extensions, passed on to later ones.
    pub shared_state: &'g mut ValueTable,
}

pub trait Extension {
    fn name(&self) -> &str;
    fn generate(&self, ctx: &mut GenerateContext) -> anyhow::Result<()>;
}

/// The extensions of one build, in the order they run.
#[derive(Default)]
pub struct ExtensionRegistry {
    extensions: Vec<Box<dyn Extension>>,
}

/// Callback through which a plugin adds its extensions.
pub type RegisterFn = fn(&mut ExtensionRegistry);

impl ExtensionRegistry {
    pub fn new() -> Self {
        ExtensionRegistry::default()
    }

    pub fn register(&mut self, extension: Box<dyn Extension>) {
        self.extensions.push(extension);
    }

    pub fn register_all(&mut self, callbacks: &[RegisterFn]) {
        for callback in callbacks {
            callback(self);
        }
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

pub struct GenerateResult {
    pub graph: OperationGraph,
    pub shared_state: ValueTable,
}

/// Run every extension, then build the operation graph they declared.
pub fn generate(
    file_state: &mut FileSystemState,
    global_state: &ValueTable,
    registry: &ExtensionRegistry,
) -> Result<GenerateResult> {
    let mut generator = OperationGraphGenerator::new(file_state);
    let mut shared_state = ValueTable::new();
    for extension in &registry.extensions {
        debug!("running extension {}", extension.name());
        let mut ctx = GenerateContext {
            generator: &mut generator,
            global_state,
            shared_state: &mut shared_state,
        };
        trace::scope("extension", || extension.generate(&mut ctx)).map_err(|err| {
            match err.downcast::<Error>() {
                Ok(err) => err,
                Err(err) => Error::Extension {
                    name: extension.name().to_owned(),
                    message: format!("{:#}", err),
                },
            }
        })?;
    }
    let graph = trace::scope("build_graph", || generator.build_graph())?;
    Ok(GenerateResult {
        graph,
        shared_state,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{FileSystem, MTime};
    use crate::value::Value;

    struct NoFileSystem;
    impl FileSystem for NoFileSystem {
        fn stat(&self, _path: &str) -> std::io::Result<MTime> {
            Ok(MTime::Missing)
        }
    }

    /// Compiles the sources named in the global state and publishes the
    /// object files.
    struct Compile;
    impl Extension for Compile {
        fn name(&self) -> &str {
            "compile"
        }
        fn generate(&self, ctx: &mut GenerateContext) -> anyhow::Result<()> {
            let dir = ctx.global_state.get_str("Dir")?;
            for src in ctx.global_state.get_string_list("Sources")? {
                let obj = format!("obj/{}.o", src.trim_end_matches(".c"));
                ctx.generator.create_operation(
                    &format!("compile {}", src),
                    "cc",
                    &format!("-c {} -o {}", src, obj),
                    dir,
                    &[src],
                    &[obj.as_str()],
                )?;
                ctx.shared_state
                    .ensure_list("Objects")?
                    .push(Value::from(obj));
            }
            Ok(())
        }
    }

    /// Links whatever objects earlier extensions published.
    struct Link;
    impl Extension for Link {
        fn name(&self) -> &str {
            "link"
        }
        fn generate(&self, ctx: &mut GenerateContext) -> anyhow::Result<()> {
            let dir = ctx.global_state.get_str("Dir")?;
            let objects = ctx.shared_state.get_string_list("Objects")?;
            ctx.generator.create_operation(
                "link",
                "cc",
                &format!("-o app {}", objects.join(" ")),
                dir,
                &objects,
                &["app"],
            )?;
            Ok(())
        }
    }

    struct Broken;
    impl Extension for Broken {
        fn name(&self) -> &str {
            "broken"
        }
        fn generate(&self, _ctx: &mut GenerateContext) -> anyhow::Result<()> {
            anyhow::bail!("no toolchain")
        }
    }

    fn register(registry: &mut ExtensionRegistry) {
        registry.register(Box::new(Compile));
        registry.register(Box::new(Link));
    }

    fn global_state() -> ValueTable {
        let mut global = ValueTable::new();
        global.set("Dir", "/w");
        global.set("Sources", vec![Value::from("a.c"), Value::from("b.c")]);
        global
    }

    #[test]
    fn extensions_share_state() -> anyhow::Result<()> {
        let mut registry = ExtensionRegistry::new();
        registry.register_all(&[register]);
        let mut state = FileSystemState::with_state_id(0, Box::new(NoFileSystem));
        let result = generate(&mut state, &global_state(), &registry)?;

        assert_eq!(result.graph.len(), 3);
        assert_eq!(result.graph.root_operation_ids().len(), 2);
        let link = result
            .graph
            .operations()
            .find(|op| op.title == "link")
            .expect("link");
        assert_eq!(link.dependency_count, 2);
        assert_eq!(
            result.shared_state.get_string_list("Objects")?,
            vec!["obj/a.o", "obj/b.o"]
        );
        Ok(())
    }

    #[test]
    fn extension_failure() {
        let mut registry = ExtensionRegistry::new();
        registry.register(Box::new(Broken));
        let mut state = FileSystemState::with_state_id(0, Box::new(NoFileSystem));
        match generate(&mut state, &global_state(), &registry) {
            Err(Error::Extension { name, message }) => {
                assert_eq!(name, "broken");
                assert_eq!(message, "no toolchain");
            }
            other => panic!("unexpected {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn generator_errors_pass_through() {
        struct Twice;
        impl Extension for Twice {
            fn name(&self) -> &str {
                "twice"
            }
            fn generate(&self, ctx: &mut GenerateContext) -> anyhow::Result<()> {
                let none: &[&str] = &[];
                for _ in 0..2 {
                    ctx.generator
                        .create_operation("x", "x", "", "/w", none, none)?;
                }
                Ok(())
            }
        }
        let mut registry = ExtensionRegistry::new();
        registry.register(Box::new(Twice));
        let mut state = FileSystemState::with_state_id(0, Box::new(NoFileSystem));
        assert!(matches!(
            generate(&mut state, &global_state(), &registry),
            Err(Error::DuplicateOperation(_))
        ));
    }
}
