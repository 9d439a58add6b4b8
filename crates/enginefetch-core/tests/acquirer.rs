use std::path::PathBuf;

use anyhow::Result;
use enginefetch_core::{
    AcquireConfig, AcquireOutcome, Acquirer, AcquisitionFailure, Candidate, DestinationSet,
    PayloadKind,
};
use enginefetch_test_support::{FakeShell, FakeStore};
use url::Url;

const STORE: &str = "https://store.test/gdevelop.js";

fn config() -> Result<AcquireConfig> {
    let mut config = AcquireConfig::with_store(Url::parse(STORE)?);
    config.local_dir = PathBuf::from("build");
    config.destinations = DestinationSet {
        public: PathBuf::from("public"),
        harness: PathBuf::from("harness"),
    };
    Ok(config)
}

fn commit_url(hash: &str, file: &str) -> String {
    format!("{STORE}/master/commit/{hash}/{file}")
}

fn latest_url(file: &str) -> String {
    format!("{STORE}/master/latest/{file}")
}

fn shell_with_history() -> FakeShell {
    FakeShell::new()
        .with_commit("HEAD", "h0", "master")
        .with_commit("HEAD~1", "h1", "master")
        .with_commit("HEAD~2", "h2", "master")
        .with_commit("HEAD~3", "h3", "master")
}

fn not_built(store: FakeStore, hash: &str) -> FakeStore {
    store
        .with_status(commit_url(hash, "libGD.js"), 403)
        .with_status(commit_url(hash, "libGD.js.mem"), 403)
}

fn serving(store: FakeStore, script_url: String, payload_url: String) -> FakeStore {
    store
        .with_body(script_url, "remote-script")
        .with_body(payload_url, "remote-mem")
}

fn assert_pair(shell: &FakeShell, script: &[u8], payload_name: &str, payload: &[u8]) {
    assert_eq!(shell.file("public/libGD.js").as_deref(), Some(script));
    assert_eq!(shell.file("harness/index.js").as_deref(), Some(script));
    assert_eq!(
        shell.file(format!("public/{payload_name}")).as_deref(),
        Some(payload)
    );
    assert_eq!(
        shell.file(format!("harness/{payload_name}")).as_deref(),
        Some(payload)
    );
}

#[tokio::test]
async fn local_build_is_copied_without_network() -> Result<()> {
    let shell = FakeShell::new()
        .with_file("build/libGD.js", "local-script")
        .with_file("build/libGD.wasm", "local-wasm")
        .with_file("build/libGD.js.mem", "local-mem")
        .with_file("public/libGD.js.mem", "stale-mem")
        .with_file("harness/libGD.js.mem", "stale-mem");
    let acquirer = Acquirer::new(config()?, shell, FakeStore::new());

    let outcome = acquirer.acquire(false).await?;

    assert!(matches!(
        outcome,
        AcquireOutcome::Local {
            payload: PayloadKind::Wasm,
            ..
        }
    ));
    let shell = acquirer.shell();
    assert_pair(shell, b"local-script", "libGD.wasm", b"local-wasm");
    assert!(shell.file("public/libGD.js.mem").is_none());
    assert!(shell.file("harness/libGD.js.mem").is_none());
    assert!(acquirer.store().requests().is_empty());
    assert!(shell.commands().is_empty());
    Ok(())
}

#[tokio::test]
async fn local_memory_image_build_removes_stale_wasm() -> Result<()> {
    let shell = FakeShell::new()
        .with_file("build/libGD.js", "local-script")
        .with_file("build/libGD.js.mem", "local-mem")
        .with_file("public/libGD.wasm", "stale-wasm")
        .with_file("harness/libGD.wasm", "stale-wasm");
    let acquirer = Acquirer::new(config()?, shell, FakeStore::new());

    let outcome = acquirer.acquire(false).await?;

    assert!(matches!(
        outcome,
        AcquireOutcome::Local {
            payload: PayloadKind::MemoryImage,
            ..
        }
    ));
    let shell = acquirer.shell();
    assert_pair(shell, b"local-script", "libGD.js.mem", b"local-mem");
    assert!(shell.file("public/libGD.wasm").is_none());
    assert!(shell.file("harness/libGD.wasm").is_none());
    Ok(())
}

#[tokio::test]
async fn local_script_without_payload_fails_without_network() -> Result<()> {
    let shell = shell_with_history()
        .with_file("build/libGD.js", "local-script")
        .with_file("public/libGD.js.mem", "cached-mem");
    let store = serving(
        FakeStore::new(),
        commit_url("h0", "libGD.js"),
        commit_url("h0", "libGD.js.mem"),
    );
    let acquirer = Acquirer::new(config()?, shell, store);

    let result = acquirer.acquire(true).await;

    assert!(matches!(
        result,
        Err(AcquisitionFailure::MalformedLocalBuild { ref dir }) if dir == &PathBuf::from("build")
    ));
    assert!(acquirer.store().requests().is_empty());
    assert!(acquirer.shell().commands().is_empty());
    assert_eq!(
        acquirer.shell().file("public/libGD.js.mem").as_deref(),
        Some(&b"cached-mem"[..])
    );
    Ok(())
}

#[tokio::test]
async fn first_built_ancestor_wins_and_stops_the_chain() -> Result<()> {
    let store = not_built(not_built(FakeStore::new(), "h0"), "h1");
    let store = serving(
        store,
        commit_url("h2", "libGD.js"),
        commit_url("h2", "libGD.js.mem"),
    );
    let store = serving(store, latest_url("libGD.js"), latest_url("libGD.js.mem"));
    let acquirer = Acquirer::new(config()?, shell_with_history(), store);

    let outcome = acquirer.acquire(false).await?;

    match &outcome {
        AcquireOutcome::Remote {
            candidate,
            base_url,
            payload,
            ..
        } => {
            assert_eq!(candidate, &Candidate::Commit("HEAD~2".to_string()));
            assert_eq!(base_url, &format!("{STORE}/master/commit/h2"));
            assert_eq!(*payload, PayloadKind::MemoryImage);
        }
        other => panic!("expected remote outcome, got {other:?}"),
    }
    assert_pair(acquirer.shell(), b"remote-script", "libGD.js.mem", b"remote-mem");

    let store = acquirer.store();
    assert!(store.requested_under(&format!("{STORE}/master/commit/h0/")));
    assert!(store.requested_under(&format!("{STORE}/master/commit/h1/")));
    assert!(!store.requested_under(&format!("{STORE}/master/commit/h3/")));
    assert!(!store.requested_under(&format!("{STORE}/master/latest/")));
    Ok(())
}

#[tokio::test]
async fn exhausted_chain_without_cache_fails() -> Result<()> {
    let store = ["h0", "h1", "h2", "h3"]
        .into_iter()
        .fold(FakeStore::new(), not_built)
        .with_status(latest_url("libGD.js"), 500)
        .with_status(latest_url("libGD.js.mem"), 500);
    let acquirer = Acquirer::new(config()?, shell_with_history(), store);

    let result = acquirer.acquire(false).await;

    assert!(matches!(
        result,
        Err(AcquisitionFailure::ChainExhausted { attempts: 5 })
    ));
    assert!(acquirer.store().requested_under(&format!("{STORE}/master/latest/")));
    assert!(acquirer.shell().file("public/libGD.js").is_none());
    Ok(())
}

#[tokio::test]
async fn exhausted_chain_with_cache_keeps_existing_files() -> Result<()> {
    let shell = shell_with_history()
        .with_file("public/libGD.js", "cached-script")
        .with_file("public/libGD.js.mem", "cached-mem")
        .with_file("harness/index.js", "cached-script")
        .with_file("harness/libGD.js.mem", "cached-mem");
    let store = FakeStore::new()
        .with_body(commit_url("h0", "libGD.js"), "partial-script")
        .with_status(commit_url("h0", "libGD.js.mem"), 403)
        .with_unreachable(latest_url("libGD.js"))
        .with_unreachable(latest_url("libGD.js.mem"));
    let acquirer = Acquirer::new(config()?, shell, store);
    let before = acquirer.shell().files();
    let cached = acquirer.destinations_hold_pair();
    assert!(cached);

    let outcome = acquirer.acquire(cached).await?;

    assert_eq!(outcome, AcquireOutcome::StaleCache);
    assert_eq!(acquirer.shell().files(), before);
    Ok(())
}

#[tokio::test]
async fn unresolvable_ancestor_is_skipped_like_a_download_failure() -> Result<()> {
    let shell = FakeShell::new()
        .with_commit("HEAD", "h0", "feature")
        .with_commit("HEAD~1", "h1", "feature")
        .with_commit("HEAD~2", "h2", "feature");
    let store = FakeStore::new()
        .with_unreachable(format!("{STORE}/feature/commit/h0/libGD.js"))
        .with_unreachable(format!("{STORE}/feature/commit/h0/libGD.js.mem"))
        .with_status(format!("{STORE}/feature/commit/h1/libGD.js"), 403)
        .with_status(format!("{STORE}/feature/commit/h1/libGD.js.mem"), 403);
    let store = serving(store, latest_url("libGD.js"), latest_url("libGD.js.mem"));
    let acquirer = Acquirer::new(config()?, shell, store);

    let outcome = acquirer.acquire(false).await?;

    assert!(matches!(
        outcome,
        AcquireOutcome::Remote {
            candidate: Candidate::Latest,
            ..
        }
    ));
    let looked_up_head_3 = acquirer
        .shell()
        .commands()
        .iter()
        .any(|command| command.args.last().is_some_and(|arg| arg == "HEAD~3"));
    assert!(looked_up_head_3);
    assert!(acquirer.store().requested_under(&format!("{STORE}/feature/commit/h2/")));
    Ok(())
}

#[tokio::test]
async fn transport_failure_advances_to_next_commit() -> Result<()> {
    let store = FakeStore::new()
        .with_unreachable(commit_url("h0", "libGD.js"))
        .with_unreachable(commit_url("h0", "libGD.js.mem"));
    let store = serving(
        store,
        commit_url("h1", "libGD.js"),
        commit_url("h1", "libGD.js.mem"),
    );
    let acquirer = Acquirer::new(config()?, shell_with_history(), store);

    let outcome = acquirer.acquire(false).await?;

    assert!(matches!(
        outcome,
        AcquireOutcome::Remote { ref candidate, .. } if candidate == &Candidate::Commit("HEAD~1".to_string())
    ));
    Ok(())
}

#[tokio::test]
async fn remote_download_replaces_stale_wasm_payloads() -> Result<()> {
    let shell = shell_with_history()
        .with_file("public/libGD.wasm", "old-wasm")
        .with_file("harness/libGD.wasm", "old-wasm");
    let store = serving(
        FakeStore::new(),
        commit_url("h0", "libGD.js"),
        commit_url("h0", "libGD.js.mem"),
    );
    let acquirer = Acquirer::new(config()?, shell, store);

    let outcome = acquirer.acquire(true).await?;

    let digests = outcome.digests().cloned().expect("remote outcome has digests");
    assert_eq!(digests.script.len(), 64);
    assert_ne!(digests.script, digests.payload);
    let shell = acquirer.shell();
    assert_pair(shell, b"remote-script", "libGD.js.mem", b"remote-mem");
    assert!(shell.file("public/libGD.wasm").is_none());
    assert!(shell.file("harness/libGD.wasm").is_none());
    Ok(())
}

#[tokio::test]
async fn unwritable_harness_is_a_distribution_failure() -> Result<()> {
    let shell = FakeShell::new()
        .with_file("build/libGD.js", "local-script")
        .with_file("build/libGD.wasm", "local-wasm")
        .with_read_only_dir("harness");
    let acquirer = Acquirer::new(config()?, shell, FakeStore::new());

    let result = acquirer.acquire(false).await;

    assert!(matches!(
        result,
        Err(AcquisitionFailure::Distribution {
            operation: "copy",
            ref path,
            ..
        }) if path.starts_with("harness")
    ));
    Ok(())
}

#[tokio::test]
async fn destinations_are_created_before_acquisition() -> Result<()> {
    let shell = FakeShell::new()
        .with_file("build/libGD.js", "local-script")
        .with_file("build/libGD.js.mem", "local-mem");
    let acquirer = Acquirer::new(config()?, shell, FakeStore::new());

    acquirer.acquire(false).await?;

    let dirs = acquirer.shell().dirs();
    assert!(dirs.contains(&PathBuf::from("public")));
    assert!(dirs.contains(&PathBuf::from("harness")));
    Ok(())
}

#[test]
fn cached_pair_requires_matching_payloads_in_both_destinations() -> Result<()> {
    let complete = FakeShell::new()
        .with_file("public/libGD.js", "s")
        .with_file("public/libGD.wasm", "w")
        .with_file("harness/index.js", "s")
        .with_file("harness/libGD.wasm", "w");
    assert!(Acquirer::new(config()?, complete, FakeStore::new()).destinations_hold_pair());

    let mixed = FakeShell::new()
        .with_file("public/libGD.js", "s")
        .with_file("public/libGD.wasm", "w")
        .with_file("harness/index.js", "s")
        .with_file("harness/libGD.js.mem", "m");
    assert!(!Acquirer::new(config()?, mixed, FakeStore::new()).destinations_hold_pair());

    let missing_script = FakeShell::new()
        .with_file("public/libGD.js", "s")
        .with_file("public/libGD.js.mem", "m")
        .with_file("harness/libGD.js.mem", "m");
    assert!(!Acquirer::new(config()?, missing_script, FakeStore::new()).destinations_hold_pair());
    Ok(())
}
