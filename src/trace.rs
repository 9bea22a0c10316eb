//! Chrome trace output.
//!
//! Load the written file in chrome://tracing or https://ui.perfetto.dev.

use std::cell::RefCell;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::time::Instant;

thread_local! {
    static TRACE: RefCell<Option<Trace>> = RefCell::new(None);
}

struct Trace {
    start: Instant,
    w: BufWriter<File>,
}

impl Trace {
    fn new(path: &str) -> std::io::Result<Self> {
        let mut w = BufWriter::new(File::create(path)?);
        writeln!(w, "[")?;
        Ok(Trace {
            start: Instant::now(),
            w,
        })
    }

    fn write_complete(&mut self, name: &str, start: Instant, end: Instant) -> std::io::Result<()> {
        write!(
            self.w,
            "{{ \"pid\": 0, \"name\": {:?}, \"ts\": {}, \"ph\": \"X\", \"dur\": {} }}",
            name,
            start.duration_since(self.start).as_micros(),
            end.duration_since(start).as_micros(),
        )
    }

    fn close(&mut self) -> std::io::Result<()> {
        self.write_complete("main", self.start, Instant::now())?;
        writeln!(self.w, "]")?;
        self.w.flush()
    }
}

pub fn open(path: &str) -> std::io::Result<()> {
    let trace = Trace::new(path)?;
    TRACE.with(|t| *t.borrow_mut() = Some(trace));
    Ok(())
}

pub fn is_enabled() -> bool {
    TRACE.with(|t| t.borrow().is_some())
}

/// Run `f`, recording how long it took if tracing is open.
#[inline]
pub fn scope<T>(name: &'static str, f: impl FnOnce() -> T) -> T {
    if !is_enabled() {
        return f();
    }
    let start = Instant::now();
    let result = f();
    let end = Instant::now();
    TRACE.with(|t| {
        if let Some(trace) = t.borrow_mut().as_mut() {
            // Tracing is best-effort; a failed write shouldn't fail the build.
            let _ = trace
                .write_complete(name, start, end)
                .and_then(|_| writeln!(trace.w, ","));
        }
    });
    result
}

pub fn close() -> std::io::Result<()> {
    TRACE.with(|t| match t.borrow_mut().take() {
        Some(mut trace) => trace.close(),
        None => Ok(()),
    })
}
