use assert_cmd::prelude::*; // Add methods on commands
use predicates::prelude::*;
use std::path::{PathBuf,Path};
use std::process::Command; // Run programs
use tempfile;
type STDRESULT = Result<(),Box<dyn std::error::Error>>;

const HAMLET: &str = "Who's there?
Nay, answer me: stand, and unfold yourself.
Long live the king!
Bernardo?
He.
You come most carefully upon your hour.
'Tis now struck twelve; get thee to bed, Francisco.
For this relief much thanks: 'tis bitter cold,
And I am sick at heart.
";

fn write_input(temp_dir: &tempfile::TempDir,name: &str,dat: &[u8]) -> Result<PathBuf,Box<dyn std::error::Error>> {
    let path = temp_dir.path().join(name);
    std::fs::write(&path,dat)?;
    Ok(path)
}

fn run(subcommand: &str,in_path: &Path,out_path: &Path) -> Result<assert_cmd::assert::Assert,Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("huffpack")?;
    Ok(cmd.arg(subcommand)
        .arg("-i").arg(in_path)
        .arg("-o").arg(out_path)
        .assert())
}

fn round_trip_test(dat: &[u8]) -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = write_input(&temp_dir,"orig.txt",dat)?;
    let cmp_path = temp_dir.path().join("orig.huf");
    let out_path = temp_dir.path().join("expanded.txt");
    run("compress",&in_path,&cmp_path)?
        .success()
        .stderr(predicate::str::starts_with(format!("compressed {} into",dat.len())));
    run("expand",&cmp_path,&out_path)?
        .success()
        .stderr(predicate::str::ends_with(format!("into {}\n",dat.len())));
    match (std::fs::read(in_path),std::fs::read(out_path)) {
        (Ok(v1),Ok(v2)) => {
            assert_eq!(v1,v2);
        },
        _ => panic!("unable to compare output with reference")
    }
    Ok(())
}

#[test]
fn text_round_trip() -> STDRESULT {
    round_trip_test(HAMLET.as_bytes())?;
    round_trip_test(&HAMLET.replace("\n","\r\n").into_bytes())
}

#[test]
fn binary_round_trip() -> STDRESULT {
    let dat: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
    round_trip_test(&dat)
}

#[test]
fn empty_round_trip() -> STDRESULT {
    round_trip_test(&[])
}

#[test]
fn compression_matches_reference() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = write_input(&temp_dir,"aaab.txt",b"AAAB")?;
    let out_path = temp_dir.path().join("aaab.huf");
    run("compress",&in_path,&out_path)?
        .success()
        .stderr(predicate::str::contains("compressed 4 into 7"));
    assert_eq!(std::fs::read(out_path)?,hex::decode("242C024120E280")?);
    Ok(())
}

#[test]
fn truncated_input_fails() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = write_input(&temp_dir,"cut.huf",&hex::decode("242C024120E2")?)?;
    let out_path = temp_dir.path().join("cut.txt");
    run("expand",&in_path,&out_path)?
        .failure()
        .stderr(predicate::str::contains("TruncatedPayload"));
    assert!(!out_path.exists());
    Ok(())
}

#[test]
fn missing_input_fails() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = temp_dir.path().join("nothing.txt");
    let out_path = temp_dir.path().join("nothing.huf");
    run("compress",&in_path,&out_path)?.failure();
    Ok(())
}

#[test]
fn inspect_header() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = write_input(&temp_dir,"aaab.huf",&hex::decode("242C024120E280")?)?;
    let mut cmd = Command::cargo_bin("huffpack")?;
    cmd.arg("inspect")
        .arg("-i").arg(&in_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("leaves: 3"))
        .stdout(predicate::str::contains("header bits: 32"))
        .stdout(predicate::str::contains("EOS  2"));
    Ok(())
}

#[test]
fn overwrite_after_confirmation() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = write_input(&temp_dir,"aaab.txt",b"AAAB")?;
    let out_path = write_input(&temp_dir,"aaab.huf",b"stale contents that are longer than the result")?;
    let mut cmd = assert_cmd::Command::cargo_bin("huffpack")?;
    cmd.env("RUST_LOG","warn")
        .arg("compress")
        .arg("-i").arg(&in_path)
        .arg("-o").arg(&out_path)
        .write_stdin("y\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("overwrite?"))
        .stderr(predicate::str::contains("existing file will be replaced"));
    assert_eq!(std::fs::read(out_path)?,hex::decode("242C024120E280")?);
    Ok(())
}
