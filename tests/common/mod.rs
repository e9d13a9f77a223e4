//! Shared fixtures for the integration tests: a tiny NCBI dump with three
//! animal classes and two study dat files citing them.

#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const NODES: &[(&str, &str, &str)] = &[
    ("1", "1", "no rank"),
    ("2759", "1", "superkingdom"),
    ("33208", "2759", "kingdom"),
    ("6656", "33208", "phylum"),
    ("50557", "6656", "class"),
    ("7227", "50557", "species"),
    ("7460", "50557", "species"),
    ("7091", "50557", "species"),
    ("7165", "50557", "species"),
    ("7711", "33208", "phylum"),
    ("8782", "7711", "class"),
    ("9031", "8782", "species"),
    ("40674", "7711", "class"),
    ("9606", "40674", "species"),
];

const NAMES: &[(&str, &str)] = &[
    ("1", "root"),
    ("2759", "Eukaryota"),
    ("33208", "Metazoa"),
    ("6656", "Arthropoda"),
    ("50557", "Insecta"),
    ("7227", "Drosophila melanogaster"),
    ("7460", "Apis mellifera"),
    ("7091", "Bombyx mori"),
    ("7165", "Anopheles gambiae"),
    ("7711", "Chordata"),
    ("8782", "Aves"),
    ("9031", "Gallus gallus"),
    ("40674", "Mammalia"),
    ("9606", "Homo sapiens"),
];

/// S100: three insects and a bird in one treeblock
pub const STUDY_S100: &str = "Tb1\t7227\t011\nTb1\t7460\t101\nTb1\t7091\t110\nTb1\t9031\t000\n";

/// S200: three insects in Tb2, a lone mammal in Tb3
pub const STUDY_S200: &str = "Tb2\t7165\t01\nTb2\t7227\t10\nTb2\t7460\t11\nTb3\t9606\t1\n";

/// Temporary data directory holding the taxonomy dump and study files
pub struct Fixture {
    dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let fixture = Fixture { dir };
        fixture.write_taxonomy();
        fixture.write("S100.dat", STUDY_S100);
        fixture.write("S200.dat", STUDY_S200);
        fixture
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub fn write(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create fixture dir");
        }
        fs::write(&path, contents).expect("Failed to write fixture");
        path
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.path(relative)).expect("Failed to read fixture output")
    }

    pub fn study_files(&self) -> Vec<PathBuf> {
        vec![self.path("S100.dat"), self.path("S200.dat")]
    }

    pub fn nodes(&self) -> PathBuf {
        self.path("nodes.dmp")
    }

    pub fn names(&self) -> PathBuf {
        self.path("names.dmp")
    }

    fn write_taxonomy(&self) {
        let nodes: String = NODES
            .iter()
            .map(|(id, parent, rank)| format!("{}\t|\t{}\t|\t{}\t|\t\t|\n", id, parent, rank))
            .collect();
        self.write("nodes.dmp", &nodes);

        let names: String = NAMES
            .iter()
            .map(|(id, name)| format!("{}\t|\t{}\t|\t\t|\tscientific name\t|\n", id, name))
            .collect();
        self.write("names.dmp", &names);
    }
}

/// The `supertree` binary with logging pinned to warnings
pub fn supertree_cmd() -> Command {
    let mut cmd = Command::cargo_bin("supertree").unwrap();
    cmd.env("SUPERTREE_LOG", "warn").env_remove("RUST_LOG");
    cmd
}
