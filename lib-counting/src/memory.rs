//! `AlignmentSource` serving pre-classified events from memory.

use std::collections::HashMap;

use lib_shared::errors::*;
use lib_shared::regions::GenomeLayout;

use super::source::{AlignmentHandle, AlignmentSource, ReadEvent};

/// Contents of one in-memory alignment file.
#[derive(Clone, Debug, Default)]
pub struct MemoryFile {
    /// Distinct sample names of the header.
    pub samples: Vec<String>,
    pub events: Vec<ReadEvent>,
    /// Yield a read error after all events.
    pub truncated: bool,
}

impl MemoryFile {
    pub fn new(sample: &str, events: Vec<ReadEvent>) -> Self {
        MemoryFile {
            samples: vec![sample.to_string()],
            events,
            truncated: false,
        }
    }
}

/// Files keyed by path, all sharing one layout.
#[derive(Clone, Debug)]
pub struct MemorySource {
    layout: GenomeLayout,
    files: HashMap<String, MemoryFile>,
}

impl MemorySource {
    pub fn new(layout: GenomeLayout) -> Self {
        MemorySource {
            layout,
            files: HashMap::new(),
        }
    }

    pub fn insert(&mut self, path: &str, file: MemoryFile) {
        self.files.insert(path.to_string(), file);
    }
}

pub struct MemoryHandle {
    path: String,
    layout: GenomeLayout,
    file: MemoryFile,
}

impl AlignmentSource for MemorySource {
    type Handle = MemoryHandle;

    fn open(&self, path: &str) -> Result<MemoryHandle> {
        match self.files.get(path) {
            Some(file) => Ok(MemoryHandle {
                path: path.to_string(),
                layout: self.layout.clone(),
                file: file.clone(),
            }),
            None => bail!(ErrorKind::Open(path.to_string())),
        }
    }
}

impl AlignmentHandle for MemoryHandle {
    fn layout(&self) -> Result<GenomeLayout> {
        Ok(self.layout.clone())
    }

    fn sample_name(&self) -> Result<String> {
        if self.file.samples.len() != 1 {
            bail!(ErrorKind::MissingSampleTag(
                self.path.clone(),
                self.file.samples.len()
            ));
        }
        Ok(self.file.samples[0].clone())
    }

    fn events<'a>(&'a mut self) -> Box<dyn Iterator<Item = Result<ReadEvent>> + 'a> {
        let tail: Vec<Result<ReadEvent>> = if self.file.truncated {
            vec![Err(format!("unexpected end of {}", self.path).into())]
        } else {
            Vec::new()
        };
        Box::new(
            self.file
                .events
                .iter()
                .cloned()
                .map(Ok)
                .chain(tail.into_iter()),
        )
    }
}
