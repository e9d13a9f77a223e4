mod common;

use common::Fixture;
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use supertree::bio::mrp::{load_study_rows, study_id_from_path, MrpTable};
use supertree::bio::nexus::{read_char_labels, write_char_labels};
use supertree::bio::taxonomy::ncbi;
use supertree::bio::tree::LabelledTree;
use supertree::core::bipartition::{bipartition_support, mrp_splits, read_splits, write_splits};
use supertree::core::classes::{
    parse_partition_table, partition_study_rows, write_partitions, ClassRow, ClassTable, StudySpecies,
};
use supertree::core::partition::{partition_classes, StudyFiles};
use supertree::{MatrixCombiner, TaxonomyIndex};

fn load_index(fixture: &Fixture) -> TaxonomyIndex {
    ncbi::load_index(fixture.nodes(), Some(fixture.names())).unwrap()
}

fn study_species(fixture: &Fixture) -> Vec<StudySpecies> {
    fixture
        .study_files()
        .iter()
        .map(|path| StudySpecies::from_rows(study_id_from_path(path), &load_study_rows(path).unwrap()))
        .collect()
}

fn class_rows(fixture: &Fixture, index: &TaxonomyIndex) -> Vec<ClassRow> {
    let table = ClassTable::build(index, &study_species(fixture), "class");
    let mut out = Vec::new();
    table.write(index, "class", &mut out).unwrap();
    ClassRow::parse_table(out.as_slice()).unwrap()
}

fn insecta_table(fixture: &Fixture, index: &TaxonomyIndex) -> MrpTable {
    let mut rows = Vec::new();
    for path in fixture.study_files() {
        rows.extend(load_study_rows(&path).unwrap());
    }
    let mut partition_out = Vec::new();
    write_partitions(index, &partition_study_rows(index, &rows, "class"), &mut partition_out).unwrap();
    let species = parse_partition_table(partition_out.as_slice()).unwrap();

    let files = StudyFiles::new(fixture.study_files());
    let mut partitions = partition_classes(&species, &class_rows(fixture, index), &files);
    partitions.remove("Insecta").unwrap()
}

#[test]
fn test_class_table_from_study_files() {
    let fixture = Fixture::new();
    let index = load_index(&fixture);

    let rows = class_rows(&fixture, &index);
    let summary: Vec<(String, usize, usize)> = rows
        .iter()
        .map(|row| (row.name.clone(), row.species_count, row.studies.len()))
        .collect();

    assert_eq!(
        summary,
        vec![
            ("Mammalia".to_string(), 1, 1),
            ("Insecta".to_string(), 4, 2),
            ("Aves".to_string(), 1, 1),
        ]
    );
}

#[test]
fn test_partition_table_counts_repeat_citations() {
    let fixture = Fixture::new();
    let index = load_index(&fixture);

    let mut rows = Vec::new();
    for path in fixture.study_files() {
        rows.extend(load_study_rows(&path).unwrap());
    }
    let mut out = Vec::new();
    write_partitions(&index, &partition_study_rows(&index, &rows, "class"), &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();

    assert!(text.contains("Insecta\t6\t4\t66.67\t7091,7165,7227,7460\n"));
    assert!(text.contains("Aves\t1\t1\t100.0\t9031\n"));
}

#[test]
fn test_only_large_classes_are_partitioned() {
    let fixture = Fixture::new();
    let index = load_index(&fixture);

    let table = insecta_table(&fixture, &index);
    let sources: Vec<&str> = table.blocks.iter().map(|b| b.source.as_str()).collect();
    assert_eq!(sources, vec!["S100.Tb1", "S200.Tb2"]);
    assert!(table.blocks.iter().all(|b| b.get("9031").is_none()));
}

#[test]
fn test_partition_to_supermatrix() {
    let fixture = Fixture::new();
    let index = load_index(&fixture);
    let table = insecta_table(&fixture, &index);

    let matrix = MatrixCombiner::new(4).with_root("Root").combine(&table.blocks).unwrap();

    assert_eq!(matrix.nchar(), 5);
    assert_eq!(matrix.ntax(), 5);
    let rows: Vec<(&str, &str)> = matrix.rows().collect();
    assert_eq!(
        rows,
        vec![
            ("Root", "00000"),
            ("7091", "110??"),
            ("7165", "???01"),
            ("7227", "01110"),
            ("7460", "10111"),
        ]
    );

    let mut nexus = Vec::new();
    matrix.to_nexus(&mut nexus).unwrap();
    let nexus = String::from_utf8(nexus).unwrap();
    assert!(nexus.contains("dimensions ntax=5 nchar=5;"));

    let mut labels = Vec::new();
    write_char_labels(&mut labels, &matrix.char_labels()).unwrap();
    let labels = read_char_labels(labels.as_slice()).unwrap();
    let spans: Vec<(&str, usize)> = labels.iter().map(|l| (l.source.as_str(), l.length)).collect();
    assert_eq!(spans, vec![("S100.Tb1", 3), ("S200.Tb2", 2)]);
}

#[test]
fn test_tree_support_from_class_splits() {
    let fixture = Fixture::new();
    let index = load_index(&fixture);
    let table = insecta_table(&fixture, &index);

    let mut split_text = Vec::new();
    write_splits(&mut split_text, &mrp_splits(&table)).unwrap();
    let sources = read_splits(split_text.as_slice()).unwrap();
    assert_eq!(sources.len(), 2);

    let tree = LabelledTree::from_newick("(Root,((7227,7460),(7091,7165)));").unwrap();
    let support = bipartition_support(&tree, &sources, "Root");

    let nodes: Vec<&str> = support.keys().map(String::as_str).collect();
    assert_eq!(nodes, vec!["Node_1", "Node_2"]);

    let all: BTreeSet<String> = ["S100.Tb1", "S200.Tb2"].iter().map(|s| s.to_string()).collect();
    assert_eq!(support["Node_1"].supporting, all);
    assert!(support["Node_1"].opposing.is_empty());
    assert!(support["Node_2"].supporting.is_empty());
    assert_eq!(support["Node_2"].opposing, all);
}
