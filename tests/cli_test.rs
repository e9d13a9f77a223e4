mod common;

use anyhow::Result;
use common::{supertree_cmd, Fixture};
use predicates::prelude::*;

#[test]
fn test_cli_help_lists_pipeline_steps() {
    supertree_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("study-species"))
        .stdout(predicate::str::contains("partition"))
        .stdout(predicate::str::contains("combine"))
        .stdout(predicate::str::contains("tree-support"));
}

#[test]
fn test_study_species_to_stdout() {
    let fixture = Fixture::new();

    supertree_cmd()
        .current_dir(fixture.root())
        .args(["study-species", "S100.dat", "S200.dat"])
        .assert()
        .success()
        .stdout(predicate::str::contains("S100\t4\t7091,7227,7460,9031"))
        .stdout(predicate::str::contains("S200\t4\t7165,7227,7460,9606"));
}

#[test]
fn test_study_species_defaults_to_data_dir() {
    let fixture = Fixture::new();

    supertree_cmd()
        .arg("--data-dir")
        .arg(fixture.root())
        .arg("study-species")
        .assert()
        .success()
        .stdout(predicate::str::contains("S100\t"))
        .stdout(predicate::str::contains("S200\t"));
}

#[test]
fn test_partition_and_combine_workflow() -> Result<()> {
    let fixture = Fixture::new();
    let run = |args: &[&str]| {
        supertree_cmd()
            .current_dir(fixture.root())
            .args(args)
            .assert()
            .success();
    };

    run(&["study-species", "-o", "studies.tsv", "S100.dat", "S200.dat"]);
    run(&["classes", "-i", "studies.tsv", "-t", "nodes.dmp", "-n", "names.dmp", "-o", "classes.tsv"]);
    run(&["class-species", "-t", "nodes.dmp", "-n", "names.dmp", "-o", "species.tsv", "S100.dat", "S200.dat"]);
    run(&[
        "partition", "-s", "species.tsv", "-c", "classes.tsv", "--out-dir", "mrp", "S100.dat", "S200.dat",
    ]);
    run(&[
        "combine", "mrp/Insecta.mrp", "-o", "Insecta.nex", "--char-labels", "Insecta_charlabels.txt",
    ]);

    assert!(fixture.read("classes.tsv").contains("Insecta\t4\t2\tS100,S200"));
    assert!(!fixture.path("mrp/Aves.mrp").exists());

    let nexus = fixture.read("Insecta.nex");
    assert!(nexus.contains("dimensions ntax=5 nchar=5;"));
    assert!(nexus.contains("Root\t00000"));
    assert!(nexus.contains("7165\t???01"));
    assert_eq!(fixture.read("Insecta_charlabels.txt"), "S100.Tb1\t0\t3\nS200.Tb2\t1\t2\n");
    Ok(())
}

#[test]
fn test_combine_tnt_into_directory() {
    let fixture = Fixture::new();
    fixture.write(
        "Demo.mrp",
        "#S1.Tb1\nA\t01\nB\t10\nC\t11\n#S2.Tb2\nC\t1\nD\t0\n",
    );

    supertree_cmd()
        .current_dir(fixture.root())
        .args(["combine", "Demo.mrp", "--format", "tnt", "--out-dir", "out"])
        .assert()
        .success();

    let tnt = fixture.read("out/Demo.tnt");
    assert!(tnt.starts_with("macro=;\nnstates 2;\nxread\n3 5\n"));
    assert!(tnt.contains("& [ num ] @@ S2.Tb2 data ;\nRoot\t0\nC\t1\nD\t0\n"));
    assert!(fixture.path("out/Demo_charlabels.txt").exists());
}

#[test]
fn test_sdm_writes_one_file_per_treeblock() {
    let fixture = Fixture::new();

    supertree_cmd()
        .current_dir(fixture.root())
        .args(["sdm", "S100.dat", "--out-dir", "sdm"])
        .assert()
        .success();

    let sdm = fixture.read("sdm/S100.dat.Tb1.sdm");
    assert!(sdm.starts_with("\n# S100.dat.Tb1.sdm\n\n4 3\n"));
    assert!(sdm.contains("7091 0.00000000 0.16666667 0.16666667 0.16666667\n"));
}

#[test]
fn test_pauplog_table() {
    let fixture = Fixture::new();
    fixture.write(
        "paup.log",
        "Tree-island profile:\n\
         Length            42\n\
         CI                0.714\n\
         RI                0.800\n\
         RC                0.571\n\
         1 tree saved to file \"Insecta.tre\"\n",
    );

    supertree_cmd()
        .current_dir(fixture.root())
        .args(["pauplog", "-i", "paup.log"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Class\tminimum_length"))
        .stdout(predicate::str::contains("Insecta\tNone\t42\t0.714\t0.800\t0.571\tNone"));
}

#[test]
fn test_missing_taxonomy_exits_with_io_code() {
    let fixture = Fixture::new();
    fixture.write("studies.tsv", "S100\t1\t7227\n");

    supertree_cmd()
        .current_dir(fixture.root())
        .args(["classes", "-i", "studies.tsv", "-t", "missing.dmp"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn test_lineages_requires_names() {
    let fixture = Fixture::new();
    fixture.write("classes.tsv", "Insecta\t4\t2\tS100,S200\n");

    supertree_cmd()
        .current_dir(fixture.root())
        .args(["lineages", "-i", "classes.tsv", "-t", "nodes.dmp"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--names"));
}
