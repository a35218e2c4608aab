//! Repo manifest loading
//!
//! Only `<project>` elements matter here. Projects in the `notdefault`
//! group are not synced by default and are skipped.

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::path::Path;

use crate::error::IngestError;

/// Project names listed by one manifest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    projects: Vec<String>,
}

impl Manifest {
    pub fn new(projects: Vec<String>) -> Self {
        Self { projects }
    }

    pub fn load(path: &Path) -> Result<Self, IngestError> {
        let xml = std::fs::read_to_string(path).map_err(|source| IngestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&xml).map_err(|source| IngestError::Manifest {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(xml: &str) -> Result<Self, quick_xml::Error> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut projects = Vec::new();
        loop {
            match reader.read_event()? {
                Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"project" => {
                    let mut name = None;
                    let mut groups = String::new();
                    for attr in e.attributes() {
                        let attr = attr.map_err(quick_xml::Error::from)?;
                        match attr.key.as_ref() {
                            b"name" => name = Some(attr.unescape_value()?.into_owned()),
                            b"groups" => groups = attr.unescape_value()?.into_owned(),
                            _ => {}
                        }
                    }

                    if groups.split(',').any(|g| g.trim() == "notdefault") {
                        continue;
                    }
                    if let Some(name) = name {
                        projects.push(name);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(Self { projects })
    }

    pub fn project_names(&self) -> &[String] {
        &self.projects
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}
