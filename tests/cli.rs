mod common;

use std::path::Path;
use std::process::Command;

use anyhow::Result;
use assert_cmd::prelude::*;
use assert_fs::TempDir;
use assert_fs::prelude::*;
use common::*;
use predicates::prelude::*;
use rstest::*;

macro_rules! cargo_run {
    ($cmd:expr, $($args:expr),*) => {
        {
            let mut cmd = Command::cargo_bin($cmd)?;
            $(cmd.arg($args);)*
            cmd.assert()
        }
    };
}

/// 在临时目录中写入 a、b、c 三张图片的特征点，以及作为查询的 A 的副本
#[fixture]
fn dataset() -> TempDir {
    let dir = TempDir::new().unwrap();
    let corpus = dir.child("corpus");
    corpus.child("a.json").write_str(&to_json(&image_a())).unwrap();
    corpus.child("b.json").write_str(&to_json(&image_b())).unwrap();
    corpus.child("c.json").write_str(&to_json(&image_c())).unwrap();
    dir.child("query.json").write_str(&to_json(&image_a_prime())).unwrap();
    dir
}

fn add(conf_dir: &Path, corpus: &Path) -> Result<assert_cmd::assert::Assert> {
    Ok(cargo_run!(
        "vladsearch",
        "-c",
        conf_dir,
        "add",
        "--extractor",
        "precomputed",
        "-s",
        "json",
        corpus
    ))
}

#[rstest]
#[case::flat("flat")]
#[case::usearch("usearch")]
fn add_train_build_search(dataset: TempDir, #[case] backend: &str) -> Result<()> {
    let conf_dir = TempDir::new()?;
    let corpus = dataset.child("corpus");
    let query = dataset.child("query.json");

    add(conf_dir.path(), corpus.path())?.success().stdout(predicate::str::contains("added: 3"));
    cargo_run!("vladsearch", "-c", conf_dir.path(), "train", "-k", "8").success();
    cargo_run!("vladsearch", "-c", conf_dir.path(), "build", "--backend", backend)
        .success()
        .stdout(predicate::str::contains("computed: 3"));

    cargo_run!(
        "vladsearch",
        "-c",
        conf_dir.path(),
        "search",
        "--extractor",
        "precomputed",
        query.path()
    )
    .success()
    .stdout(predicate::str::contains("a.json"))
    .stdout(predicate::str::contains("b.json").not());

    cargo_run!(
        "vladsearch",
        "-c",
        conf_dir.path(),
        "search",
        "--extractor",
        "precomputed",
        "--output-format",
        "json",
        query.path()
    )
    .success()
    .stdout(predicate::str::contains(r#""score": 50"#));

    Ok(())
}

#[rstest]
fn add_twice_updates_paths(dataset: TempDir) -> Result<()> {
    let conf_dir = TempDir::new()?;
    let corpus = dataset.child("corpus");

    add(conf_dir.path(), corpus.path())?.success();
    add(conf_dir.path(), corpus.path())?
        .success()
        .stdout(predicate::str::contains("added: 0\tupdated: 3"));
    Ok(())
}

#[rstest]
fn add_skips_broken_images(dataset: TempDir) -> Result<()> {
    let conf_dir = TempDir::new()?;
    let corpus = dataset.child("corpus");
    corpus.child("broken.json").write_str("not json")?;

    add(conf_dir.path(), corpus.path())?
        .success()
        .stdout(predicate::str::contains("added: 3\tupdated: 0\tfailed: 1"));
    cargo_run!("vladsearch", "-c", conf_dir.path(), "train", "-k", "8").success();
    cargo_run!("vladsearch", "-c", conf_dir.path(), "build")
        .success()
        .stdout(predicate::str::contains("computed: 3"));
    Ok(())
}

#[rstest]
fn search_without_index_is_empty(dataset: TempDir) -> Result<()> {
    let conf_dir = TempDir::new()?;
    add(conf_dir.path(), dataset.child("corpus").path())?.success();

    cargo_run!(
        "vladsearch",
        "-c",
        conf_dir.path(),
        "search",
        "--extractor",
        "precomputed",
        dataset.child("query.json").path()
    )
    .success()
    .stdout(predicate::str::is_empty());
    Ok(())
}

#[rstest]
fn match_prints_score(dataset: TempDir) -> Result<()> {
    let conf_dir = TempDir::new()?;
    cargo_run!(
        "vladsearch",
        "-c",
        conf_dir.path(),
        "match",
        "--extractor",
        "precomputed",
        dataset.child("corpus/a.json").path(),
        dataset.child("query.json").path()
    )
    .success()
    .stdout(predicate::eq("50\n"));

    cargo_run!(
        "vladsearch",
        "-c",
        conf_dir.path(),
        "match",
        "--extractor",
        "precomputed",
        dataset.child("corpus/b.json").path(),
        dataset.child("query.json").path()
    )
    .success()
    .stdout(predicate::str::starts_with("50").not());
    Ok(())
}

#[rstest]
fn validate_and_remove(dataset: TempDir) -> Result<()> {
    let conf_dir = TempDir::new()?;
    let corpus = dataset.child("corpus");
    let broken = corpus.child("broken.json");
    broken.write_str("not json")?;

    let validate = |remove: bool| -> Result<assert_cmd::assert::Assert> {
        let mut cmd = Command::cargo_bin("vladsearch")?;
        cmd.arg("-c").arg(conf_dir.path());
        cmd.args(["validate", "--extractor", "precomputed", "-s", "json"]);
        if remove {
            cmd.arg("--remove");
        }
        Ok(cmd.arg(corpus.path()).assert())
    };

    validate(false)?
        .success()
        .stdout(predicate::str::contains("broken.json"))
        .stdout(predicate::str::contains("a.json").not());
    broken.assert(predicate::path::exists());

    validate(true)?.success();
    broken.assert(predicate::path::missing());
    corpus.child("a.json").assert(predicate::path::exists());
    Ok(())
}

#[rstest]
fn export_signatures(dataset: TempDir) -> Result<()> {
    let conf_dir = TempDir::new()?;
    let output = dataset.child("signatures.npy");
    let ids = dataset.child("ids.npy");

    add(conf_dir.path(), dataset.child("corpus").path())?.success();
    cargo_run!("vladsearch", "-c", conf_dir.path(), "train", "-k", "8").success();
    cargo_run!("vladsearch", "-c", conf_dir.path(), "build").success();
    cargo_run!(
        "vladsearch",
        "-c",
        conf_dir.path(),
        "export",
        "-o",
        output.path(),
        "--ids",
        ids.path()
    )
    .success();

    output.assert(predicate::path::exists());
    ids.assert(predicate::path::exists());
    Ok(())
}

#[cfg(not(feature = "opencv"))]
#[rstest]
fn sift_requires_opencv(dataset: TempDir) -> Result<()> {
    let conf_dir = TempDir::new()?;
    cargo_run!("vladsearch", "-c", conf_dir.path(), "add", dataset.child("corpus").path())
        .failure()
        .stderr(predicate::str::contains("opencv"));
    Ok(())
}
