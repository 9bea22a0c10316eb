//! The on-disk operation graph format.
//!
//! Little-endian, no padding:
//!
//! ```text
//! "BOG\0" version:u32 state_id:u32
//! "FIS\0" count:u32 { file_id:u32 path:str }*
//! "ROP\0" count:u32 { operation_id:u32 }*
//! "OPS\0" count:u32 { operation }*
//! ```
//!
//! Strings are a u32 byte length followed by UTF-8 bytes; lists are a u32
//! count followed by the items.  Each operation is: id, title, working
//! directory, executable, arguments, declared inputs, declared outputs,
//! children, dependency count (i32), successful-run flag (u32 0/1),
//! observed inputs, observed outputs.

use crate::error::{Error, Result};
use crate::graph::{CommandInfo, FileId, Operation, OperationGraph, OperationId};
use rustc_hash::FxHashSet;
use std::io::Write;

const MAGIC: &[u8; 4] = b"BOG\0";
const VERSION: u32 = 1;
const FILES_MARKER: &[u8; 4] = b"FIS\0";
const ROOTS_MARKER: &[u8; 4] = b"ROP\0";
const OPERATIONS_MARKER: &[u8; 4] = b"OPS\0";

/// Serializes an OperationGraph.
pub struct Writer<W: Write> {
    w: W,
}

impl<W: Write> Writer<W> {
    pub fn new(w: W) -> Self {
        Writer { w }
    }

    fn write_u32(&mut self, n: u32) -> std::io::Result<()> {
        self.w.write_all(&n.to_le_bytes())
    }

    fn write_len(&mut self, len: usize) -> std::io::Result<()> {
        let len = u32::try_from(len).map_err(|_| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "list too long")
        })?;
        self.write_u32(len)
    }

    fn write_str(&mut self, s: &str) -> std::io::Result<()> {
        self.write_len(s.len())?;
        self.w.write_all(s.as_bytes())
    }

    fn write_ids(&mut self, ids: impl ExactSizeIterator<Item = u32>) -> std::io::Result<()> {
        self.write_len(ids.len())?;
        for id in ids {
            self.write_u32(id)?;
        }
        Ok(())
    }

    fn write_operation(&mut self, op: &Operation) -> std::io::Result<()> {
        self.write_u32(op.id.0)?;
        self.write_str(&op.title)?;
        self.write_str(&op.command.working_directory)?;
        self.write_str(&op.command.executable)?;
        self.write_str(&op.command.arguments)?;
        self.write_ids(op.declared_input.iter().map(|id| id.0))?;
        self.write_ids(op.declared_output.iter().map(|id| id.0))?;
        self.write_ids(op.children.iter().map(|id| id.0))?;
        self.w.write_all(&op.dependency_count.to_le_bytes())?;
        self.write_u32(op.was_successful_run as u32)?;
        self.write_ids(op.observed_input.iter().map(|id| id.0))?;
        self.write_ids(op.observed_output.iter().map(|id| id.0))
    }

    pub fn write_graph(&mut self, graph: &OperationGraph) -> std::io::Result<()> {
        self.w.write_all(MAGIC)?;
        self.write_u32(VERSION)?;
        self.write_u32(graph.state_id())?;

        self.w.write_all(FILES_MARKER)?;
        self.write_len(graph.files().len())?;
        for (id, path) in graph.files() {
            self.write_u32(id.0)?;
            self.write_str(path)?;
        }

        self.w.write_all(ROOTS_MARKER)?;
        self.write_ids(graph.root_operation_ids().iter().map(|id| id.0))?;

        self.w.write_all(OPERATIONS_MARKER)?;
        self.write_len(graph.len())?;
        for op in graph.operations() {
            self.write_operation(op)?;
        }
        self.w.flush()
    }

    pub fn into_inner(self) -> W {
        self.w
    }
}

/// Serializes a graph into memory.  Fails only if a list or string is too
/// long for its u32 length prefix.
pub fn serialize(graph: &OperationGraph) -> std::io::Result<Vec<u8>> {
    let mut w = Writer::new(Vec::new());
    w.write_graph(graph)?;
    Ok(w.into_inner())
}

/// Reads an OperationGraph, failing closed on anything unexpected.
struct Reader<'a> {
    buf: &'a [u8],
    ofs: usize,
}

fn corrupt(msg: impl Into<String>) -> Error {
    Error::Corrupt(msg.into())
}

impl<'a> Reader<'a> {
    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.buf.len() - self.ofs < len {
            return Err(corrupt(format!("unexpected end of data at offset {}", self.ofs)));
        }
        let bytes = &self.buf[self.ofs..self.ofs + len];
        self.ofs += len;
        Ok(bytes)
    }

    fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_u32()? as i32)
    }

    fn read_bool(&mut self) -> Result<bool> {
        match self.read_u32()? {
            0 => Ok(false),
            1 => Ok(true),
            n => Err(corrupt(format!("bad bool value {}", n))),
        }
    }

    fn read_str(&mut self) -> Result<String> {
        let len = self.read_u32()? as usize;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| corrupt("string is not utf-8"))
    }

    fn read_marker(&mut self, marker: &[u8; 4]) -> Result<()> {
        if self.read_bytes(4)? != marker {
            return Err(corrupt(format!(
                "expected {:?} marker",
                String::from_utf8_lossy(&marker[..3])
            )));
        }
        Ok(())
    }

    /// Reads a count, bounded by the bytes left so a bogus count can't
    /// trigger a huge allocation.
    fn read_count(&mut self, min_item_size: usize) -> Result<usize> {
        let count = self.read_u32()? as usize;
        if count.saturating_mul(min_item_size) > self.buf.len() - self.ofs {
            return Err(corrupt(format!("count {} exceeds remaining data", count)));
        }
        Ok(count)
    }

    fn read_ids(&mut self) -> Result<Vec<u32>> {
        let count = self.read_count(4)?;
        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            ids.push(self.read_u32()?);
        }
        Ok(ids)
    }

    fn read_file_ids(&mut self) -> Result<Vec<FileId>> {
        Ok(self.read_ids()?.into_iter().map(FileId).collect())
    }

    fn read_operation_ids(&mut self) -> Result<Vec<OperationId>> {
        Ok(self.read_ids()?.into_iter().map(OperationId).collect())
    }

    fn read_operation(&mut self) -> Result<Operation> {
        let id = OperationId(self.read_u32()?);
        if id.0 == 0 {
            return Err(corrupt("operation id 0"));
        }
        let title = self.read_str()?;
        let command = CommandInfo {
            working_directory: self.read_str()?,
            executable: self.read_str()?,
            arguments: self.read_str()?,
        };
        let mut op = Operation::new(
            id,
            title,
            command,
            self.read_file_ids()?,
            self.read_file_ids()?,
        );
        op.children = self.read_operation_ids()?;
        op.dependency_count = self.read_i32()?;
        if op.dependency_count < 1 {
            return Err(corrupt(format!(
                "operation {} has dependency count {}",
                id, op.dependency_count
            )));
        }
        op.was_successful_run = self.read_bool()?;
        op.observed_input = self.read_file_ids()?;
        op.observed_output = self.read_file_ids()?;
        Ok(op)
    }

    fn read_graph(&mut self) -> Result<OperationGraph> {
        if self.read_bytes(4)? != MAGIC {
            return Err(corrupt("bad magic"));
        }
        let version = self.read_u32()?;
        if version != VERSION {
            return Err(corrupt(format!(
                "version {}, expected {}",
                version, VERSION
            )));
        }
        let mut graph = OperationGraph::new(self.read_u32()?);

        self.read_marker(FILES_MARKER)?;
        let count = self.read_count(8)?;
        let mut files = Vec::with_capacity(count);
        let mut seen = FxHashSet::default();
        for _ in 0..count {
            let id = FileId(self.read_u32()?);
            if !seen.insert(id) {
                return Err(corrupt(format!("duplicate file id {}", id.0)));
            }
            files.push((id, self.read_str()?));
        }
        graph.set_files(files);

        self.read_marker(ROOTS_MARKER)?;
        let roots = self.read_operation_ids()?;

        self.read_marker(OPERATIONS_MARKER)?;
        let count = self.read_count(4)?;
        for _ in 0..count {
            let op = self.read_operation()?;
            graph
                .add_operation(op)
                .map_err(|err| corrupt(err.to_string()))?;
        }

        if self.ofs != self.buf.len() {
            return Err(corrupt(format!(
                "{} trailing bytes",
                self.buf.len() - self.ofs
            )));
        }

        for &id in roots
            .iter()
            .chain(graph.operations().flat_map(|op| op.children.iter()))
        {
            if graph.operation(id).is_err() {
                return Err(corrupt(format!("reference to unknown operation {}", id)));
            }
        }
        graph.set_root_operation_ids(roots);
        Ok(graph)
    }
}

pub fn deserialize(buf: &[u8]) -> Result<OperationGraph> {
    Reader { buf, ofs: 0 }.read_graph()
}
