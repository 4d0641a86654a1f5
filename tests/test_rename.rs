mod common;

use common::FaultClient;
use gitcdn::*;

fn seeded(repo: &MemoryRepo) -> TreeMutationCommitter<MemoryRepo> {
    let committer = TreeMutationCommitter::new(repo.clone(), common::config()).unwrap();
    for (path, data) in [("a.txt", b"alpha".as_slice()), ("c.txt", b"gamma")] {
        let blob = committer.client().create_blob(data).unwrap();
        committer
            .add_or_replace(path, &blob, EntryMode::File, Default::default())
            .unwrap();
    }
    committer
}

fn oid_of(repo: &MemoryRepo, path: &str) -> Oid {
    common::file_set(repo, "main")
        .into_iter()
        .find(|(p, _)| p == path)
        .map(|(_, oid)| oid)
        .unwrap_or_else(|| panic!("{} not in tree", path))
}

// ---------------------------------------------------------------------------
// Happy path
// ---------------------------------------------------------------------------

#[test]
fn rename_moves_content_address() {
    let repo = common::new_repo();
    let committer = seeded(&repo);
    let hash_a = oid_of(&repo, "a.txt");
    let hash_c = oid_of(&repo, "c.txt");

    let receipt = committer.rename("a.txt", "b.txt").unwrap();

    let mut set = common::file_set(&repo, "main");
    set.sort();
    assert_eq!(
        set,
        vec![
            ("b.txt".to_string(), hash_a),
            ("c.txt".to_string(), hash_c)
        ]
    );
    assert_eq!(receipt.old_path, "a.txt");
    assert_eq!(receipt.new_path, "b.txt");
    assert_eq!(
        receipt.url.as_deref(),
        Some("https://raw.githubusercontent.com/octo/assets/main/b.txt")
    );
    assert_eq!(repo.read_ref("main").unwrap(), receipt.commit);
}

#[test]
fn rename_costs_two_commits() {
    let repo = common::new_repo();
    let committer = seeded(&repo);
    let before = repo.history("main").unwrap().len();
    committer.rename("a.txt", "b.txt").unwrap();
    assert_eq!(repo.history("main").unwrap().len(), before + 2);
    assert_eq!(committer.head().unwrap().message, "Rename a.txt -> b.txt");
}

#[test]
fn rename_never_reads_blob_content() {
    // The committer reuses the content address; the blob store is only
    // needed at upload time. Renaming through a client whose blobs have
    // been dropped must still work.
    let repo = common::new_repo();
    let committer = seeded(&repo);
    let hash_a = oid_of(&repo, "a.txt");

    committer.rename("a.txt", "moved/a.txt").unwrap();
    assert_eq!(oid_of(&repo, "moved/a.txt"), hash_a);
}

// ---------------------------------------------------------------------------
// Preconditions
// ---------------------------------------------------------------------------

#[test]
fn rename_into_existing_path_fails_without_commit() {
    let repo = common::new_repo();
    let committer = seeded(&repo);
    let history = repo.history("main").unwrap();
    let before = common::file_set(&repo, "main");

    let err = committer.rename("a.txt", "c.txt").unwrap_err();

    assert!(matches!(err, Error::PathCollision(_)));
    assert_eq!(repo.history("main").unwrap(), history);
    assert_eq!(common::file_set(&repo, "main"), before);
}

#[test]
fn rename_missing_source_fails() {
    let repo = common::new_repo();
    let committer = seeded(&repo);
    let err = committer.rename("nope.txt", "b.txt").unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[test]
fn rename_directory_fails() {
    let repo = common::new_repo();
    let committer = TreeMutationCommitter::new(repo.clone(), common::config()).unwrap();
    let blob = committer.client().create_blob(b"x").unwrap();
    committer
        .add_or_replace("dir/a.txt", &blob, EntryMode::File, Default::default())
        .unwrap();

    let err = committer.rename("dir", "newdir").unwrap_err();
    assert!(matches!(err, Error::InvalidPath(_)));
}

#[test]
fn rename_to_same_path_fails() {
    let repo = common::new_repo();
    let committer = seeded(&repo);
    let err = committer.rename("a.txt", "a.txt").unwrap_err();
    assert!(matches!(err, Error::InvalidPath(_)));
}

// ---------------------------------------------------------------------------
// Phase B failure
// ---------------------------------------------------------------------------

fn faulty(repo: &MemoryRepo) -> TreeMutationCommitter<FaultClient> {
    TreeMutationCommitter::new(FaultClient::new(repo.clone()), common::config())
        .unwrap()
        .with_retry(RetryPolicy::none())
}

#[test]
fn phase_b_failure_compensates_and_rolls_back() {
    let repo = common::new_repo();
    seeded(&repo);
    let before = common::file_set(&repo, "main");

    let committer = faulty(&repo);
    // Phase A passes, phase B fails, compensation passes.
    committer.client().fail_updates_after(1, 1);
    let err = committer.rename("a.txt", "b.txt").unwrap_err();

    match &err {
        Error::RenameRolledBack { source } => {
            assert!(matches!(**source, Error::StorageUnavailable(_)));
        }
        other => panic!("expected RenameRolledBack, got {:?}", other),
    }
    assert!(err.is_retryable());
    // The branch is back to its pre-rename entry set.
    assert_eq!(common::file_set(&repo, "main"), before);
}

#[test]
fn phase_b_and_compensation_failure_reports_partial_rename() {
    let repo = common::new_repo();
    seeded(&repo);
    let hash_a = oid_of(&repo, "a.txt");

    let committer = faulty(&repo);
    // Phase A passes, then phase B and the compensating remove both fail.
    committer.client().fail_updates_after(1, 2);
    let err = committer.rename("a.txt", "b.txt").unwrap_err();

    match &err {
        Error::PartialRename { old_path, new_path } => {
            assert_eq!(old_path, "a.txt");
            assert_eq!(new_path, "b.txt");
        }
        other => panic!("expected PartialRename, got {:?}", other),
    }
    assert!(!err.is_retryable());

    // Duplicated, not lost: both paths present with identical content.
    assert_eq!(oid_of(&repo, "a.txt"), hash_a);
    assert_eq!(oid_of(&repo, "b.txt"), hash_a);
}

#[test]
fn rename_failure_never_loses_the_file() {
    // Whatever fails, at least one of the two paths must survive with the
    // original content address.
    for (skip, fail) in [(0, 1), (1, 1), (1, 2)] {
        let repo = common::new_repo();
        seeded(&repo);
        let hash_a = oid_of(&repo, "a.txt");

        let committer = faulty(&repo);
        committer.client().fail_updates_after(skip, fail);
        committer.rename("a.txt", "b.txt").unwrap_err();

        let set = common::file_set(&repo, "main");
        let survivors: Vec<&(String, Oid)> = set
            .iter()
            .filter(|(p, oid)| (p == "a.txt" || p == "b.txt") && *oid == hash_a)
            .collect();
        assert!(
            !survivors.is_empty(),
            "no surviving path after skip={} fail={}",
            skip,
            fail
        );
    }
}
