//! Test harness for isolated pipeline runs.
//!
//! The `TestHarness` struct owns a temporary directory with:
//! - `input/` where fixtures are written
//! - `output/` which every run uses as its extraction directory

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use macroscope::{Pipeline, Report};

pub struct TestHarness {
    temp_dir: TempDir,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pipeline: Pipeline,
}

impl TestHarness {
    /// Harness around the default pipeline.
    pub fn new() -> Self {
        Self::with_pipeline(Pipeline::default())
    }

    pub fn with_pipeline(pipeline: Pipeline) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let input_dir = temp_dir.path().join("input");
        let output_dir = temp_dir.path().join("output");
        std::fs::create_dir_all(&input_dir).expect("Failed to create input dir");

        Self {
            temp_dir,
            input_dir,
            output_dir,
            pipeline,
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes a fixture into `input/` and returns its path.
    pub fn write_input(&self, name: &str, content: &[u8]) -> PathBuf {
        let path = self.input_dir.join(name);
        std::fs::write(&path, content).expect("Failed to write fixture");
        path
    }

    pub fn run(&self, path: &Path, plugins: &[&str], recursive: bool) -> Report {
        let plugins: BTreeSet<String> = plugins.iter().map(|p| p.to_string()).collect();
        self.pipeline
            .analyze_document(path, &plugins, recursive, &self.output_dir)
            .expect("pipeline run failed")
    }

    /// Sorted file names currently in `output/`.
    pub fn list_outputs(&self) -> Vec<String> {
        let mut names: Vec<String> = match std::fs::read_dir(&self.output_dir) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => Vec::new(),
        };
        names.sort();
        names
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
