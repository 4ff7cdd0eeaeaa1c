//! End-to-end clone / sync-back against a bare remote, using the system git.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use stagesync_core::{registry, StagingId, SyncContext};
use stagesync_sync::{
    clone_project, sync_back, CloneOptions, Integration, SyncBackOptions, SyncError, SystemGit,
};
use predicates::prelude::*;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(["-c", "commit.gpgsign=false", "-c", "init.defaultBranch=main"])
        .args(args)
        .env("GIT_AUTHOR_NAME", "Stage Tester")
        .env("GIT_AUTHOR_EMAIL", "tester@example.com")
        .env("GIT_COMMITTER_NAME", "Stage Tester")
        .env("GIT_COMMITTER_EMAIL", "tester@example.com")
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .expect("spawn git");
    assert!(
        output.status.success(),
        "git {:?} failed in {}: {}",
        args,
        dir.display(),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("utf8").trim().to_owned()
}

fn commit(dir: &Path, file: &str, content: &str, message: &str) -> String {
    fs::write(dir.join(file), content).expect("write file");
    git(dir, &["add", file]);
    git(dir, &["commit", "-q", "-m", message]);
    git(dir, &["rev-parse", "HEAD"])
}

fn head_of(dir: &Path, branch: &str) -> String {
    git(dir, &["rev-parse", &format!("refs/heads/{branch}")])
}

fn remote_heads(remote: &Path) -> Vec<String> {
    let out = git(remote, &["for-each-ref", "--format=%(refname)", "refs/heads"]);
    out.lines().map(str::to_owned).collect()
}

/// Every remote head with the commit it points at.
fn remote_snapshot(remote: &Path) -> Vec<(String, String)> {
    remote_heads(remote)
        .into_iter()
        .map(|r| {
            let tip = git(remote, &["rev-parse", &r]);
            (r, tip)
        })
        .collect()
}

struct Sandbox {
    _root: TempDir,
    remote: PathBuf,
    work: PathBuf,
    ctx: SyncContext,
    commit_a: String,
}

impl Sandbox {
    fn staging(&self) -> PathBuf {
        self.ctx.staging_root.join("proj-x")
    }
}

/// Bare remote, a work repo `work/proj-x` on `main` at commit A pushed to it,
/// and an empty staging root.
fn sandbox() -> Sandbox {
    let root = TempDir::new().expect("tempdir");
    let remote = root.path().join("remote.git");
    fs::create_dir_all(&remote).unwrap();
    git(&remote, &["init", "-q", "--bare"]);

    let work_root = root.path().join("work");
    let work = work_root.join("proj-x");
    fs::create_dir_all(&work).unwrap();
    git(&work, &["init", "-q"]);
    git(&work, &["checkout", "-q", "-b", "main"]);
    let commit_a = commit(&work, "README.md", "A\n", "A");
    git(&work, &["remote", "add", "origin", remote.to_str().unwrap()]);
    git(&work, &["push", "-q", "-u", "origin", "main"]);

    let staging_root = root.path().join("stage");
    fs::create_dir_all(&staging_root).unwrap();
    let ctx = SyncContext::new(Some(staging_root), Some(work_root), None).expect("context");
    let work = ctx.work_root.join("proj-x");

    Sandbox {
        _root: root,
        remote,
        work,
        ctx,
        commit_a,
    }
}

fn clone_default(sb: &Sandbox) {
    clone_project(&sb.ctx, &SystemGit::new(), "proj-x", &CloneOptions::default())
        .expect("clone");
}

// ---------------------------------------------------------------------------
// 1. Clone
// ---------------------------------------------------------------------------

#[test]
fn clone_creates_staging_on_base_branch_at_work_commit() {
    let sb = sandbox();
    let outcome = clone_project(&sb.ctx, &SystemGit::new(), "proj-x", &CloneOptions::default())
        .expect("clone");

    assert_eq!(outcome.branch, "main");
    assert!(!outcome.bootstrapped);
    assert_eq!(git(&sb.staging(), &["symbolic-ref", "--short", "HEAD"]), "main");
    assert_eq!(head_of(&sb.staging(), "main"), sb.commit_a);
    assert_eq!(
        git(&sb.staging(), &["rev-parse", "--abbrev-ref", "main@{upstream}"]),
        format!("origin/{}", outcome.temp_branch)
    );

    let reg = registry::load_at(&sb.ctx.config_path).expect("load");
    let entry = reg.get(&StagingId::from("proj-x")).expect("entry");
    assert_eq!(entry.branch, "main");
    assert_eq!(entry.work_path, sb.work);
    assert_eq!(entry.staging_path, sb.staging());
    assert_eq!(entry.remote, sb.remote.to_str().unwrap());
    assert_eq!(entry.last_temp_branch.as_deref(), Some(outcome.temp_branch.as_str()));
}

#[test]
fn clone_into_existing_directory_requires_force() {
    let sb = sandbox();
    let target = sb.staging();
    fs::create_dir_all(&target).unwrap();
    fs::write(target.join("precious.txt"), "keep me").unwrap();
    let before = remote_heads(&sb.remote);

    let err = clone_project(&sb.ctx, &SystemGit::new(), "proj-x", &CloneOptions::default())
        .unwrap_err();
    assert!(matches!(err, SyncError::TargetExists { .. }), "got: {err}");
    assert_eq!(fs::read_to_string(target.join("precious.txt")).unwrap(), "keep me");
    assert_eq!(remote_heads(&sb.remote), before);

    let opts = CloneOptions {
        force: true,
        ..Default::default()
    };
    let outcome = clone_project(&sb.ctx, &SystemGit::new(), "proj-x", &opts).expect("forced clone");
    assert!(outcome.replaced);
    assert!(!target.join("precious.txt").exists());
    assert_eq!(head_of(&target, "main"), sb.commit_a);
}

#[test]
fn clone_pushes_base_branch_missing_on_remote() {
    let sb = sandbox();
    git(&sb.work, &["checkout", "-q", "-b", "feature/login"]);
    let tip = commit(&sb.work, "login.rs", "fn login() {}\n", "login");

    let outcome = clone_project(&sb.ctx, &SystemGit::new(), "proj-x", &CloneOptions::default())
        .expect("clone");
    assert!(outcome.bootstrapped);
    assert!(remote_heads(&sb.remote).contains(&"refs/heads/feature/login".to_owned()));
    assert_eq!(head_of(&sb.staging(), "feature/login"), tip);
    assert!(outcome.temp_branch.starts_with("staging-sync/proj-x-feature-login-"));
}

#[test]
fn clone_with_taken_explicit_temp_branch_fails_without_side_effects() {
    let sb = sandbox();
    git(&sb.work, &["push", "-q", "origin", "HEAD:refs/heads/taken"]);

    let opts = CloneOptions {
        temp_branch: Some("taken".into()),
        ..Default::default()
    };
    let err = clone_project(&sb.ctx, &SystemGit::new(), "proj-x", &opts).unwrap_err();
    assert!(matches!(err, SyncError::TempBranchExists { .. }), "got: {err}");
    assert!(!sb.staging().exists());
    assert!(!sb.ctx.config_path.exists());
}

#[test]
fn forced_clone_never_removes_the_source_project() {
    let sb = sandbox();
    let work_root = sb.ctx.work_root.clone();
    let ctx = SyncContext::new(Some(work_root.clone()), Some(work_root), None).expect("context");
    let before = remote_heads(&sb.remote);

    let opts = CloneOptions {
        force: true,
        ..Default::default()
    };
    let err = clone_project(&ctx, &SystemGit::new(), "proj-x", &opts).unwrap_err();
    assert!(matches!(err, SyncError::SelfDestruct { .. }), "got: {err}");
    assert!(sb.work.join(".git").exists());
    assert_eq!(head_of(&sb.work, "main"), sb.commit_a);
    assert_eq!(remote_heads(&sb.remote), before);
    assert!(!ctx.config_path.exists());
}

#[test]
fn detached_source_is_rejected() {
    let sb = sandbox();
    git(&sb.work, &["checkout", "-q", "--detach"]);
    let err = clone_project(&sb.ctx, &SystemGit::new(), "proj-x", &CloneOptions::default())
        .unwrap_err();
    assert!(matches!(err, SyncError::DetachedHead { .. }), "got: {err}");
}

#[test]
fn source_without_remote_is_rejected() {
    let sb = sandbox();
    git(&sb.work, &["remote", "remove", "origin"]);
    let err = clone_project(&sb.ctx, &SystemGit::new(), "proj-x", &CloneOptions::default())
        .unwrap_err();
    assert!(matches!(err, SyncError::MissingRemote { .. }), "got: {err}");
}

// ---------------------------------------------------------------------------
// 2. Sync-back
// ---------------------------------------------------------------------------

#[test]
fn sync_back_without_changes_is_a_no_op() {
    let sb = sandbox();
    clone_default(&sb);

    let outcome = sync_back(&sb.ctx, &SystemGit::new(), "proj-x", &SyncBackOptions::default())
        .expect("sync");
    assert_eq!(outcome.integration, Integration::FastForward);
    assert!(!outcome.changed());
    assert_eq!(head_of(&sb.work, "main"), sb.commit_a);
    assert_eq!(remote_heads(&sb.remote), vec!["refs/heads/main".to_owned()]);
}

#[test]
fn staging_commit_reaches_work_and_remote() {
    let sb = sandbox();
    clone_default(&sb);
    let commit_b = commit(&sb.staging(), "feature.txt", "B\n", "B");

    let outcome = sync_back(&sb.ctx, &SystemGit::new(), "proj-x", &SyncBackOptions::default())
        .expect("sync");

    assert_eq!(outcome.new_head, commit_b);
    assert_eq!(outcome.previous_head.as_deref(), Some(sb.commit_a.as_str()));
    assert_eq!(head_of(&sb.work, "main"), commit_b);
    assert_eq!(head_of(&sb.remote, "main"), commit_b);
    assert_eq!(fs::read_to_string(sb.work.join("feature.txt")).unwrap(), "B\n");
    assert_eq!(remote_heads(&sb.remote), vec!["refs/heads/main".to_owned()]);

    let reg = registry::load_at(&sb.ctx.config_path).expect("load");
    let entry = reg.get(&StagingId::from("proj-x")).expect("entry");
    assert_eq!(entry.last_temp_branch.as_deref(), Some(outcome.temp_branch.as_str()));
    assert_eq!(entry.branch, "main");
}

#[test]
fn repeated_sync_backs_keep_converging() {
    let sb = sandbox();
    clone_default(&sb);
    commit(&sb.staging(), "one.txt", "1\n", "one");
    sync_back(&sb.ctx, &SystemGit::new(), "proj-x", &SyncBackOptions::default()).expect("first");
    let second = commit(&sb.staging(), "two.txt", "2\n", "two");
    sync_back(&sb.ctx, &SystemGit::new(), "proj-x", &SyncBackOptions::default()).expect("second");

    assert_eq!(head_of(&sb.work, "main"), second);
    assert_eq!(remote_heads(&sb.remote), vec!["refs/heads/main".to_owned()]);
}

#[test]
fn divergence_without_force_fails_and_leaves_work_unchanged() {
    let sb = sandbox();
    clone_default(&sb);
    commit(&sb.staging(), "stage.txt", "B\n", "B");
    let commit_c = commit(&sb.work, "work.txt", "C\n", "C");

    let err = sync_back(&sb.ctx, &SystemGit::new(), "proj-x", &SyncBackOptions::default())
        .unwrap_err();
    assert!(matches!(err, SyncError::FastForward { .. }), "got: {err}");
    assert_eq!(head_of(&sb.work, "main"), commit_c);
    assert_eq!(head_of(&sb.remote, "main"), sb.commit_a);
    // Cleanup ran after the failed merge.
    assert_eq!(remote_heads(&sb.remote), vec!["refs/heads/main".to_owned()]);
}

#[test]
fn force_converges_work_to_staging_despite_divergence() {
    let sb = sandbox();
    clone_default(&sb);
    let commit_b = commit(&sb.staging(), "stage.txt", "B\n", "B");
    commit(&sb.work, "work.txt", "C\n", "C");

    let opts = SyncBackOptions {
        force: true,
        ..Default::default()
    };
    let outcome = sync_back(&sb.ctx, &SystemGit::new(), "proj-x", &opts).expect("forced sync");
    assert_eq!(outcome.integration, Integration::Reset);
    assert_eq!(head_of(&sb.work, "main"), commit_b);
    assert!(!sb.work.join("work.txt").exists());
    assert_eq!(remote_heads(&sb.remote), vec!["refs/heads/main".to_owned()]);
}

#[test]
fn force_converges_after_staging_amends_cloned_commit() {
    let sb = sandbox();
    let cloned = clone_project(&sb.ctx, &SystemGit::new(), "proj-x", &CloneOptions::default())
        .expect("clone");
    fs::write(sb.staging().join("README.md"), "A amended\n").unwrap();
    git(&sb.staging(), &["commit", "-q", "-a", "--amend", "-m", "A amended"]);
    let amended = head_of(&sb.staging(), "main");
    assert_ne!(amended, sb.commit_a);

    let opts = SyncBackOptions {
        force: true,
        ..Default::default()
    };
    let outcome = sync_back(&sb.ctx, &SystemGit::new(), "proj-x", &opts).expect("forced sync");
    // The clone's temp branch was reused and overwritten, then removed.
    assert_eq!(outcome.temp_branch, cloned.temp_branch);
    assert_eq!(head_of(&sb.work, "main"), amended);
    assert_eq!(head_of(&sb.remote, "main"), amended);
    assert_eq!(remote_heads(&sb.remote), vec!["refs/heads/main".to_owned()]);
}

#[test]
fn force_overwrites_remote_branch_ahead_of_staging() {
    let sb = sandbox();
    clone_default(&sb);
    commit(&sb.work, "work.txt", "C\n", "C");
    git(&sb.work, &["push", "-q", "origin", "main"]);
    let commit_b = commit(&sb.staging(), "stage.txt", "B\n", "B");

    let opts = SyncBackOptions {
        force: true,
        ..Default::default()
    };
    let outcome = sync_back(&sb.ctx, &SystemGit::new(), "proj-x", &opts).expect("forced sync");
    assert_eq!(outcome.integration, Integration::Reset);
    assert_eq!(head_of(&sb.work, "main"), commit_b);
    assert_eq!(head_of(&sb.remote, "main"), commit_b);

    let reg = registry::load_at(&sb.ctx.config_path).expect("load");
    let entry = reg.get(&StagingId::from("proj-x")).expect("entry");
    assert_eq!(entry.last_temp_branch.as_deref(), Some(outcome.temp_branch.as_str()));
}

#[test]
fn dirty_staging_fails_without_any_push() {
    let sb = sandbox();
    clone_default(&sb);
    fs::write(sb.staging().join("scratch.txt"), "wip").unwrap();
    let before = remote_snapshot(&sb.remote);

    let err = sync_back(&sb.ctx, &SystemGit::new(), "proj-x", &SyncBackOptions::default())
        .unwrap_err();
    assert!(matches!(err, SyncError::DirtyTree { .. }), "got: {err}");
    assert!(predicate::str::contains("--allow-dirty-stage").eval(&err.to_string()));
    assert_eq!(remote_snapshot(&sb.remote), before);
}

#[test]
fn dirty_work_fails_without_any_push() {
    let sb = sandbox();
    clone_default(&sb);
    commit(&sb.staging(), "b.txt", "B\n", "B");
    fs::write(sb.work.join("README.md"), "edited in work\n").unwrap();
    let before = remote_snapshot(&sb.remote);

    let err = sync_back(&sb.ctx, &SystemGit::new(), "proj-x", &SyncBackOptions::default())
        .unwrap_err();
    assert!(
        matches!(err, SyncError::DirtyTree { flag: "--allow-dirty-work", .. }),
        "got: {err}"
    );
    assert_eq!(remote_snapshot(&sb.remote), before);
    assert_eq!(head_of(&sb.work, "main"), sb.commit_a);
    assert_eq!(fs::read_to_string(sb.work.join("README.md")).unwrap(), "edited in work\n");
}

#[test]
fn allow_dirty_work_fast_forwards_around_untracked_files() {
    let sb = sandbox();
    clone_default(&sb);
    let commit_b = commit(&sb.staging(), "b.txt", "B\n", "B");
    fs::write(sb.work.join("notes.txt"), "local notes").unwrap();

    let opts = SyncBackOptions {
        allow_dirty_work: true,
        ..Default::default()
    };
    sync_back(&sb.ctx, &SystemGit::new(), "proj-x", &opts).expect("sync");
    assert_eq!(head_of(&sb.work, "main"), commit_b);
    assert_eq!(fs::read_to_string(sb.work.join("notes.txt")).unwrap(), "local notes");
}

#[test]
fn allow_dirty_stage_syncs_committed_state_only() {
    let sb = sandbox();
    clone_default(&sb);
    let commit_b = commit(&sb.staging(), "b.txt", "B\n", "B");
    fs::write(sb.staging().join("scratch.txt"), "wip").unwrap();

    let opts = SyncBackOptions {
        allow_dirty_stage: true,
        ..Default::default()
    };
    sync_back(&sb.ctx, &SystemGit::new(), "proj-x", &opts).expect("sync");
    assert_eq!(head_of(&sb.work, "main"), commit_b);
    assert!(!sb.work.join("scratch.txt").exists());
}

#[test]
fn work_on_other_branch_needs_auto_checkout() {
    let sb = sandbox();
    clone_default(&sb);
    let commit_b = commit(&sb.staging(), "b.txt", "B\n", "B");
    git(&sb.work, &["checkout", "-q", "-b", "scratch"]);

    let err = sync_back(&sb.ctx, &SystemGit::new(), "proj-x", &SyncBackOptions::default())
        .unwrap_err();
    assert!(matches!(err, SyncError::WrongBranch { .. }), "got: {err}");
    assert_eq!(git(&sb.work, &["symbolic-ref", "--short", "HEAD"]), "scratch");
    assert_eq!(remote_heads(&sb.remote), vec!["refs/heads/main".to_owned()]);

    let opts = SyncBackOptions {
        auto_checkout: true,
        ..Default::default()
    };
    sync_back(&sb.ctx, &SystemGit::new(), "proj-x", &opts).expect("sync with checkout");
    assert_eq!(git(&sb.work, &["symbolic-ref", "--short", "HEAD"]), "main");
    assert_eq!(head_of(&sb.work, "main"), commit_b);
}

#[test]
fn new_target_branch_is_created_in_work() {
    let sb = sandbox();
    clone_default(&sb);
    let commit_b = commit(&sb.staging(), "b.txt", "B\n", "B");

    let opts = SyncBackOptions {
        branch: Some("release".into()),
        ..Default::default()
    };
    let outcome = sync_back(&sb.ctx, &SystemGit::new(), "proj-x", &opts).expect("sync");
    assert_eq!(outcome.integration, Integration::Created);
    assert_eq!(head_of(&sb.work, "release"), commit_b);
    assert_eq!(head_of(&sb.remote, "release"), commit_b);
    // Work stays where it was.
    assert_eq!(git(&sb.work, &["symbolic-ref", "--short", "HEAD"]), "main");
    assert_eq!(head_of(&sb.work, "main"), sb.commit_a);

    let mut heads = remote_heads(&sb.remote);
    heads.sort();
    assert_eq!(heads, vec!["refs/heads/main".to_owned(), "refs/heads/release".to_owned()]);
}

#[test]
fn mismatched_remote_is_fatal() {
    let sb = sandbox();
    clone_default(&sb);
    let other = TempDir::new().unwrap();
    git(other.path(), &["init", "-q", "--bare"]);
    git(&sb.work, &["remote", "set-url", "origin", other.path().to_str().unwrap()]);

    let err = sync_back(&sb.ctx, &SystemGit::new(), "proj-x", &SyncBackOptions::default())
        .unwrap_err();
    assert!(matches!(err, SyncError::RemoteMismatch { .. }), "got: {err}");
}

#[test]
fn sync_without_registry_entry_falls_back_to_staging_name() {
    let sb = sandbox();
    clone_default(&sb);
    fs::remove_file(&sb.ctx.config_path).unwrap();
    let commit_b = commit(&sb.staging(), "b.txt", "B\n", "B");

    let outcome = sync_back(&sb.ctx, &SystemGit::new(), "proj-x", &SyncBackOptions::default())
        .expect("sync");
    assert_eq!(outcome.work_label, "proj-x");
    assert_eq!(head_of(&sb.work, "main"), commit_b);
    // The clone's temp branch is still on the remote; the fresh one is gone.
    assert!(!remote_heads(&sb.remote).contains(&format!("refs/heads/{}", outcome.temp_branch)));
}
