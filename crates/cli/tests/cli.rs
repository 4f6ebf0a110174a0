use assert_cmd::Command;
use tempfile::TempDir;

fn bookshelf(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("bookshelf").unwrap();
    cmd.current_dir(dir.path())
        .env("BOOKSHELF_CONFIG_DIR", dir.path())
        .env("BOOKSHELF_DATABASE__PATH", dir.path().join("books.db"))
        .env_remove("BOOKSHELF_ENV")
        .env_remove("RUST_LOG");
    cmd
}

fn stdout(output: &std::process::Output) -> String {
    String::from_utf8(output.stdout.clone()).unwrap()
}

#[test]
fn migrate_is_idempotent() {
    let dir = TempDir::new().unwrap();

    let first = bookshelf(&dir).arg("migrate").output().unwrap();
    assert!(first.status.success());
    assert_eq!(stdout(&first).trim(), "applied 1 migration(s)");

    let second = bookshelf(&dir).arg("migrate").output().unwrap();
    assert!(second.status.success());
    assert_eq!(stdout(&second).trim(), "applied 0 migration(s)");
}

#[test]
fn add_reserve_and_list_books() {
    let dir = TempDir::new().unwrap();

    for (title, author) in [("Hamlet", "Shakespeare"), ("apple", "A"), ("Banana", "B")] {
        bookshelf(&dir)
            .args(["books", "add", "--title", title, "--author", author])
            .assert()
            .success();
    }

    bookshelf(&dir)
        .args(["books", "reserve", "--title", "Hamlet"])
        .assert()
        .success();

    let output = bookshelf(&dir)
        .args(["books", "list", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let books: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let titles: Vec<&str> = books
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["apple", "Banana", "Hamlet"]);
    assert_eq!(books[2]["reserved"], true);
    assert_eq!(books[2]["author"], "Shakespeare");
}

#[test]
fn reserving_twice_fails() {
    let dir = TempDir::new().unwrap();

    bookshelf(&dir)
        .args(["books", "add", "--title", "Dune", "--author", "Herbert"])
        .assert()
        .success();
    bookshelf(&dir)
        .args(["books", "reserve", "--id", "1"])
        .assert()
        .success();

    let output = bookshelf(&dir)
        .args(["books", "reserve", "--title", "Dune"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("already reserved"), "stderr: {stderr}");
}

#[test]
fn blank_title_is_rejected() {
    let dir = TempDir::new().unwrap();

    let output = bookshelf(&dir)
        .args(["books", "add", "--title", " ", "--author", "Nobody"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Book title cannot be blank"), "stderr: {stderr}");
}

#[test]
fn verbose_logging_keeps_json_output_clean() {
    let dir = TempDir::new().unwrap();

    bookshelf(&dir)
        .env("RUST_LOG", "info")
        .args(["books", "add", "--title", "Hamlet", "--author", "Shakespeare"])
        .assert()
        .success();

    let output = bookshelf(&dir)
        .env("RUST_LOG", "info")
        .args(["books", "list", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let books: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(books[0]["title"], "Hamlet");

    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("bootstrap complete"), "stderr: {stderr}");
}
