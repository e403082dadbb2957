//! Revoke and restore workflows over an easy-rsa CA.
//!
//! Both workflows are small state machines. Each step is entered in order;
//! the first failing step ends the run in `PartialFailure` and later steps are
//! never attempted. The returned [`WorkflowReport`] records which artifacts
//! were produced so the caller can tell the operator exactly what diverged.

use crate::error::{Error, Result, ToolFailure};
use crate::parser::has_common_name;
use crate::store::CertificateStore;
use crate::types::SERVER_NAME;
use log::{debug, info, warn};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::NamedTempFile;

const REVOKE_CONFIRMATION: &str = "yes\n";

/// Captured result of one CA tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// External certificate authority command runner.
pub trait CaTool {
    /// Runs one subcommand to completion, optionally feeding `stdin`.
    fn run(&self, args: &[&str], stdin: Option<&str>) -> Result<ToolOutput>;
}

/// Runs the `easyrsa` script from the CA root.
///
/// There is no timeout: a hung script blocks the workflow.
#[derive(Debug, Clone)]
pub struct EasyRsa {
    working_dir: PathBuf,
    program: PathBuf,
}

impl EasyRsa {
    pub fn new(ca_root: impl Into<PathBuf>) -> Self {
        let working_dir = ca_root.into();
        let program = working_dir.join("easyrsa");
        Self {
            working_dir,
            program,
        }
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }
}

impl CaTool for EasyRsa {
    fn run(&self, args: &[&str], stdin: Option<&str>) -> Result<ToolOutput> {
        debug!("running {} {}", self.program.display(), args.join(" "));

        let mut child = Command::new(&self.program)
            .args(args)
            .current_dir(&self.working_dir)
            .env("EASYRSA_BATCH", "1")
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            match pipe.write_all(input.as_bytes()) {
                Err(e) if e.kind() != ErrorKind::BrokenPipe => return Err(Error::Io(e)),
                _ => {}
            }
        }

        let output = child.wait_with_output()?;
        Ok(ToolOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowKind {
    Revoke,
    Restore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStep {
    Revoking,
    IndexPruning,
    Reissuing,
    CrlRegenerating,
}

impl WorkflowStep {
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowStep::Revoking => "revoke",
            WorkflowStep::IndexPruning => "index pruning",
            WorkflowStep::Reissuing => "reissue",
            WorkflowStep::CrlRegenerating => "CRL regeneration",
        }
    }
}

/// Why a step failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepFailure {
    Tool(ToolFailure),
    Filesystem(String),
}

impl std::fmt::Display for StepFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepFailure::Tool(failure) => write!(f, "{}", failure),
            StepFailure::Filesystem(msg) => write!(f, "{}", msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    Running(WorkflowStep),
    Done,
    PartialFailure {
        step: WorkflowStep,
        failure: StepFailure,
    },
}

/// What exists on disk after a workflow run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Artifacts {
    pub certificate_revoked: bool,
    pub index_pruned: bool,
    pub index_lines_removed: usize,
    pub certificate_issued: bool,
    pub crl_regenerated: bool,
    pub certificate_path: PathBuf,
    pub private_key_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowReport {
    pub kind: WorkflowKind,
    pub common_name: String,
    pub state: WorkflowState,
    /// Steps entered, in order.
    pub steps: Vec<WorkflowStep>,
    pub artifacts: Artifacts,
}

impl WorkflowReport {
    fn start(kind: WorkflowKind, common_name: &str, store: &CertificateStore) -> Self {
        Self {
            kind,
            common_name: common_name.to_string(),
            state: WorkflowState::Idle,
            steps: Vec::new(),
            artifacts: Artifacts {
                certificate_path: store.certificate_path(common_name),
                private_key_path: store.private_key_path(common_name),
                ..Artifacts::default()
            },
        }
    }

    fn enter(&mut self, step: WorkflowStep) {
        info!("{:?} {}: entering {}", self.kind, self.common_name, step.name());
        self.steps.push(step);
        self.state = WorkflowState::Running(step);
    }

    fn fail(mut self, failure: StepFailure) -> Self {
        if let WorkflowState::Running(step) = self.state {
            warn!(
                "{:?} {}: {} failed: {}",
                self.kind,
                self.common_name,
                step.name(),
                failure
            );
            self.state = WorkflowState::PartialFailure { step, failure };
        }
        self
    }

    fn finish(mut self) -> Self {
        info!("{:?} {}: done", self.kind, self.common_name);
        self.state = WorkflowState::Done;
        self
    }

    pub fn is_done(&self) -> bool {
        self.state == WorkflowState::Done
    }

    pub fn failed_step(&self) -> Option<WorkflowStep> {
        match &self.state {
            WorkflowState::PartialFailure { step, .. } => Some(*step),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&StepFailure> {
        match &self.state {
            WorkflowState::PartialFailure { failure, .. } => Some(failure),
            _ => None,
        }
    }

    /// The daemon loads its CRL once; a fresh CRL only applies after restart.
    pub fn restart_required(&self) -> bool {
        self.artifacts.crl_regenerated
    }

    /// True when CA bookkeeping changed but the CRL was not regenerated.
    pub fn crl_out_of_sync(&self) -> bool {
        let a = &self.artifacts;
        (a.certificate_revoked || a.certificate_issued || a.index_pruned) && !a.crl_regenerated
    }

    /// Operator-facing description of a partial run; `None` when done.
    pub fn divergence(&self) -> Option<String> {
        let step = self.failed_step()?;
        let a = &self.artifacts;
        let message = match (self.kind, step) {
            (WorkflowKind::Revoke, WorkflowStep::Revoking) => {
                "nothing was changed; the certificate is still valid".to_string()
            }
            (WorkflowKind::Revoke, _) => {
                "the certificate is revoked in the PKI index but the CRL served to the running server is stale".to_string()
            }
            (WorkflowKind::Restore, WorkflowStep::IndexPruning) => {
                "the PKI index was left unchanged and no certificate was issued".to_string()
            }
            (WorkflowKind::Restore, WorkflowStep::Reissuing) => format!(
                "{} index line(s) were removed but no new certificate exists",
                a.index_lines_removed
            ),
            (WorkflowKind::Restore, _) => format!(
                "a new certificate exists at {} but the CRL served to the running server is stale",
                a.certificate_path.display()
            ),
        };
        Some(message)
    }
}

/// Drives revoke and restore against one CA.
pub struct CertificateLifecycle<T: CaTool> {
    store: CertificateStore,
    tool: T,
}

impl CertificateLifecycle<EasyRsa> {
    /// Uses the `easyrsa` script found in the store's CA root.
    pub fn easy_rsa(store: CertificateStore) -> Self {
        let tool = EasyRsa::new(store.ca_root());
        Self::new(store, tool)
    }
}

impl<T: CaTool> CertificateLifecycle<T> {
    pub fn new(store: CertificateStore, tool: T) -> Self {
        Self { store, tool }
    }

    pub fn store(&self) -> &CertificateStore {
        &self.store
    }

    /// Revokes a currently valid client certificate and regenerates the CRL.
    ///
    /// `server` and names without an issued certificate are rejected before
    /// the CA tool is touched.
    pub fn revoke(&self, common_name: &str) -> Result<WorkflowReport> {
        self.check_target(common_name)?;
        if !self.store.list_valid().iter().any(|n| n == common_name) {
            return Err(Error::NotFound(format!(
                "no valid certificate for '{}'",
                common_name
            )));
        }

        let mut report = WorkflowReport::start(WorkflowKind::Revoke, common_name, &self.store);

        report.enter(WorkflowStep::Revoking);
        if let Err(failure) = self.invoke(&["revoke", common_name], Some(REVOKE_CONFIRMATION)) {
            return Ok(report.fail(failure));
        }
        report.artifacts.certificate_revoked = true;

        self.regenerate_crl(report)
    }

    /// Re-issues a certificate for a previously revoked name.
    ///
    /// easy-rsa cannot un-revoke, so the name's index lines are dropped and a
    /// fresh passwordless client certificate is built under the same name.
    pub fn restore(&self, common_name: &str) -> Result<WorkflowReport> {
        self.check_target(common_name)?;
        if !self.store.list_revoked().iter().any(|n| n == common_name) {
            return Err(Error::NotFound(format!(
                "no revoked certificate for '{}'",
                common_name
            )));
        }
        for leftover in [
            self.store.certificate_path(common_name),
            self.store.private_key_path(common_name),
            self.store.request_path(common_name),
        ] {
            if leftover.exists() {
                return Err(Error::InvalidInput(format!(
                    "{} still exists; archive it before restoring '{}'",
                    leftover.display(),
                    common_name
                )));
            }
        }

        let mut report = WorkflowReport::start(WorkflowKind::Restore, common_name, &self.store);

        report.enter(WorkflowStep::IndexPruning);
        match prune_index(&self.store.index_path(), common_name) {
            Ok(removed) => {
                report.artifacts.index_pruned = removed > 0;
                report.artifacts.index_lines_removed = removed;
            }
            Err(e) => {
                return Ok(report.fail(StepFailure::Filesystem(format!(
                    "rewriting {}: {}",
                    self.store.index_path().display(),
                    e
                ))))
            }
        }

        report.enter(WorkflowStep::Reissuing);
        if let Err(failure) = self.invoke(&["build-client-full", common_name, "nopass"], None) {
            return Ok(report.fail(failure));
        }
        report.artifacts.certificate_issued = true;

        self.regenerate_crl(report)
    }

    fn check_target(&self, common_name: &str) -> Result<()> {
        if common_name.is_empty() || common_name == SERVER_NAME {
            return Err(Error::InvalidInput(format!(
                "'{}' is not a client certificate",
                common_name
            )));
        }
        if !self.store.is_provisioned() {
            return Err(Error::CaNotProvisioned(self.store.ca_root().to_path_buf()));
        }
        Ok(())
    }

    fn regenerate_crl(&self, mut report: WorkflowReport) -> Result<WorkflowReport> {
        report.enter(WorkflowStep::CrlRegenerating);
        if let Err(failure) = self.invoke(&["gen-crl"], None) {
            return Ok(report.fail(failure));
        }
        report.artifacts.crl_regenerated = true;
        Ok(report.finish())
    }

    fn invoke(&self, args: &[&str], stdin: Option<&str>) -> std::result::Result<(), StepFailure> {
        let subcommand = args.first().copied().unwrap_or_default().to_string();
        match self.tool.run(args, stdin) {
            Ok(output) if output.success() => Ok(()),
            Ok(output) => Err(StepFailure::Tool(ToolFailure {
                subcommand,
                exit_code: output.exit_code,
                stderr: output.stderr,
            })),
            Err(e) => Err(StepFailure::Tool(ToolFailure {
                subcommand,
                exit_code: None,
                stderr: e.to_string(),
            })),
        }
    }
}

/// Drops every index line whose `/CN=` equals `common_name`, keeping all
/// other bytes as they were. Returns the number of lines removed.
///
/// The file is replaced atomically; a missing index removes nothing.
pub fn prune_index(index_path: &Path, common_name: &str) -> std::io::Result<usize> {
    let original = match fs::read(index_path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let mut kept = Vec::with_capacity(original.len());
    let mut removed = 0;
    for line in original.split_inclusive(|b| *b == b'\n') {
        if has_common_name(&String::from_utf8_lossy(line), common_name) {
            removed += 1;
        } else {
            kept.extend_from_slice(line);
        }
    }

    if removed == 0 {
        return Ok(0);
    }

    let dir = index_path.parent().unwrap_or_else(|| Path::new("."));
    let mut replacement = NamedTempFile::new_in(dir)?;
    replacement.write_all(&kept)?;
    replacement.as_file().sync_all()?;
    fs::set_permissions(replacement.path(), fs::metadata(index_path)?.permissions())?;
    replacement.persist(index_path).map_err(|e| e.error)?;

    debug!(
        "removed {} line(s) for '{}' from {}",
        removed,
        common_name,
        index_path.display()
    );
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::{pki_fixture, INDEX};
    use std::cell::RefCell;

    /// Records every invocation and fails the named subcommand.
    #[derive(Default)]
    struct FakeTool {
        calls: RefCell<Vec<Vec<String>>>,
        stdin: RefCell<Vec<Option<String>>>,
        fail_on: Option<&'static str>,
        spawn_error: bool,
    }

    impl FakeTool {
        fn failing(subcommand: &'static str) -> Self {
            Self {
                fail_on: Some(subcommand),
                ..Self::default()
            }
        }

        fn subcommands(&self) -> Vec<String> {
            self.calls.borrow().iter().map(|c| c[0].clone()).collect()
        }
    }

    impl CaTool for FakeTool {
        fn run(&self, args: &[&str], stdin: Option<&str>) -> Result<ToolOutput> {
            self.calls
                .borrow_mut()
                .push(args.iter().map(|a| a.to_string()).collect());
            self.stdin.borrow_mut().push(stdin.map(str::to_string));

            if self.spawn_error {
                return Err(Error::Io(std::io::Error::new(
                    ErrorKind::NotFound,
                    "easyrsa: not found",
                )));
            }
            let failed = self.fail_on == Some(args[0]);
            Ok(ToolOutput {
                exit_code: Some(if failed { 1 } else { 0 }),
                stdout: String::new(),
                stderr: if failed {
                    format!("Easy-RSA error: {} failed", args[0])
                } else {
                    String::new()
                },
            })
        }
    }

    #[test]
    fn test_revoke_done() {
        let (_dir, store) = pki_fixture(&["alice", "server"], Some(INDEX));
        let lifecycle = CertificateLifecycle::new(store, FakeTool::default());

        let report = lifecycle.revoke("alice").unwrap();

        assert!(report.is_done());
        assert!(report.restart_required());
        assert!(!report.crl_out_of_sync());
        assert_eq!(
            report.steps,
            vec![WorkflowStep::Revoking, WorkflowStep::CrlRegenerating]
        );
        assert_eq!(
            *lifecycle.tool.calls.borrow(),
            vec![vec!["revoke".to_string(), "alice".to_string()], vec!["gen-crl".to_string()]]
        );
        assert_eq!(lifecycle.tool.stdin.borrow()[0].as_deref(), Some("yes\n"));
        assert_eq!(lifecycle.tool.stdin.borrow()[1], None);
    }

    #[test]
    fn test_revoke_failure_skips_crl() {
        let (_dir, store) = pki_fixture(&["alice"], Some(INDEX));
        let lifecycle = CertificateLifecycle::new(store, FakeTool::failing("revoke"));

        let report = lifecycle.revoke("alice").unwrap();

        assert_eq!(report.failed_step(), Some(WorkflowStep::Revoking));
        assert_eq!(lifecycle.tool.subcommands(), vec!["revoke"]);
        assert!(!report.artifacts.certificate_revoked);
        assert!(!report.restart_required());
        assert!(!report.crl_out_of_sync());

        match report.failure() {
            Some(StepFailure::Tool(failure)) => {
                assert_eq!(failure.exit_code, Some(1));
                assert_eq!(failure.stderr, "Easy-RSA error: revoke failed");
            }
            other => panic!("unexpected failure {:?}", other),
        }
    }

    #[test]
    fn test_revoke_with_stale_crl() {
        let (_dir, store) = pki_fixture(&["alice"], Some(INDEX));
        let lifecycle = CertificateLifecycle::new(store, FakeTool::failing("gen-crl"));

        let report = lifecycle.revoke("alice").unwrap();

        assert_eq!(report.failed_step(), Some(WorkflowStep::CrlRegenerating));
        assert!(report.artifacts.certificate_revoked);
        assert!(report.crl_out_of_sync());
        assert!(!report.restart_required());
        assert!(report.divergence().unwrap().contains("stale"));
    }

    #[test]
    fn test_revoke_spawn_error_is_partial_failure() {
        let (_dir, store) = pki_fixture(&["alice"], Some(INDEX));
        let tool = FakeTool {
            spawn_error: true,
            ..FakeTool::default()
        };
        let lifecycle = CertificateLifecycle::new(store, tool);

        let report = lifecycle.revoke("alice").unwrap();

        match report.failure() {
            Some(StepFailure::Tool(failure)) => assert_eq!(failure.exit_code, None),
            other => panic!("unexpected failure {:?}", other),
        }
        assert_eq!(lifecycle.tool.subcommands(), vec!["revoke"]);
    }

    #[test]
    fn test_revoke_validates_before_invoking_tool() {
        let (_dir, store) = pki_fixture(&["alice", "server"], Some(INDEX));
        let lifecycle = CertificateLifecycle::new(store, FakeTool::default());

        assert!(matches!(lifecycle.revoke("server"), Err(Error::InvalidInput(_))));
        assert!(matches!(lifecycle.revoke("mallory"), Err(Error::NotFound(_))));
        assert!(matches!(lifecycle.revoke(""), Err(Error::InvalidInput(_))));
        assert!(lifecycle.tool.calls.borrow().is_empty());
    }

    #[test]
    fn test_revoke_unprovisioned_ca() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = CertificateStore::new(dir.path().join("easy-rsa"));
        let lifecycle = CertificateLifecycle::new(store, FakeTool::default());

        assert!(matches!(
            lifecycle.revoke("alice"),
            Err(Error::CaNotProvisioned(_))
        ));
        assert!(lifecycle.tool.calls.borrow().is_empty());
    }

    #[test]
    fn test_restore_done() {
        let (_dir, store) = pki_fixture(&["alice"], Some(INDEX));
        let index_path = store.index_path();
        let lifecycle = CertificateLifecycle::new(store, FakeTool::default());

        let report = lifecycle.restore("bob").unwrap();

        assert!(report.is_done());
        assert_eq!(
            report.steps,
            vec![
                WorkflowStep::IndexPruning,
                WorkflowStep::Reissuing,
                WorkflowStep::CrlRegenerating
            ]
        );
        assert_eq!(report.artifacts.index_lines_removed, 2);
        assert!(report.artifacts.certificate_issued);
        assert!(report.restart_required());
        assert_eq!(
            *lifecycle.tool.calls.borrow(),
            vec![
                vec![
                    "build-client-full".to_string(),
                    "bob".to_string(),
                    "nopass".to_string()
                ],
                vec!["gen-crl".to_string()]
            ]
        );

        let index = fs::read_to_string(index_path).unwrap();
        assert!(!index.contains("/CN=bob"));
        assert!(index.contains("/CN=carol"));
        assert!(index.contains("/CN=alice"));
    }

    #[test]
    fn test_restore_reissue_failure_reports_pruned_index() {
        let (_dir, store) = pki_fixture(&[], Some(INDEX));
        let lifecycle = CertificateLifecycle::new(store, FakeTool::failing("build-client-full"));

        let report = lifecycle.restore("carol").unwrap();

        assert_eq!(report.failed_step(), Some(WorkflowStep::Reissuing));
        assert!(report.artifacts.index_pruned);
        assert!(!report.artifacts.certificate_issued);
        assert!(report.crl_out_of_sync());
        assert_eq!(lifecycle.tool.subcommands(), vec!["build-client-full"]);
        assert!(report.divergence().unwrap().contains("no new certificate"));
    }

    #[test]
    fn test_restore_crl_failure() {
        let (_dir, store) = pki_fixture(&[], Some(INDEX));
        let lifecycle = CertificateLifecycle::new(store, FakeTool::failing("gen-crl"));

        let report = lifecycle.restore("carol").unwrap();

        assert_eq!(report.failed_step(), Some(WorkflowStep::CrlRegenerating));
        assert!(report.artifacts.certificate_issued);
        assert!(report.divergence().unwrap().contains("carol.crt"));
    }

    #[test]
    fn test_restore_refuses_leftover_files() {
        let (_dir, store) = pki_fixture(&["bob"], Some(INDEX));
        let index_before = fs::read(store.index_path()).unwrap();
        let lifecycle = CertificateLifecycle::new(store, FakeTool::default());

        assert!(matches!(lifecycle.restore("bob"), Err(Error::InvalidInput(_))));
        assert!(lifecycle.tool.calls.borrow().is_empty());
        assert_eq!(fs::read(lifecycle.store().index_path()).unwrap(), index_before);
    }

    #[test]
    fn test_restore_requires_revoked_name() {
        let (_dir, store) = pki_fixture(&["alice"], Some(INDEX));
        let lifecycle = CertificateLifecycle::new(store, FakeTool::default());

        assert!(matches!(lifecycle.restore("alice"), Err(Error::NotFound(_))));
        assert!(matches!(lifecycle.restore("server"), Err(Error::InvalidInput(_))));
        assert!(lifecycle.tool.calls.borrow().is_empty());
    }

    #[test]
    fn test_prune_index_is_byte_exact() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("index.txt");
        let original = "V\t340101000000Z\t\t01\tunknown\t/CN=alice\r\n\
R\t340101000000Z\t240101000000Z\t02\tunknown\t/CN=bob\n\
V\t340101000000Z\t\t03\tunknown\t/CN=bobby\n\
R\t340101000000Z\t240101000000Z,keyCompromise\t04\tunknown\t/O=Acme/CN=bob/emailAddress=b@acme.test\n\
V\t340101000000Z\t\t05\tunknown\t/CN=zoe";
        fs::write(&path, original).unwrap();

        let removed = prune_index(&path, "bob").unwrap();

        assert_eq!(removed, 2);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "V\t340101000000Z\t\t01\tunknown\t/CN=alice\r\n\
V\t340101000000Z\t\t03\tunknown\t/CN=bobby\n\
V\t340101000000Z\t\t05\tunknown\t/CN=zoe"
        );
    }

    #[test]
    fn test_prune_index_without_match_leaves_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("index.txt");
        fs::write(&path, INDEX).unwrap();

        assert_eq!(prune_index(&path, "nobody").unwrap(), 0);
        assert_eq!(fs::read_to_string(&path).unwrap(), INDEX);
        assert_eq!(prune_index(&dir.path().join("missing"), "bob").unwrap(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_easy_rsa_runner() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let script = dir.path().join("easyrsa");
        fs::write(
            &script,
            "#!/bin/sh\n\
             echo \"$@\" > args.log\n\
             if [ \"$1\" = revoke ]; then read answer; [ \"$answer\" = yes ] || exit 3; fi\n\
             if [ \"$1\" = gen-crl ]; then echo 'no ca.key' >&2; exit 2; fi\n\
             echo ok\n",
        )
        .unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let tool = EasyRsa::new(dir.path());

        let revoked = tool.run(&["revoke", "alice"], Some("yes\n")).unwrap();
        assert!(revoked.success());
        assert_eq!(revoked.stdout.trim(), "ok");
        assert_eq!(
            fs::read_to_string(dir.path().join("args.log")).unwrap().trim(),
            "revoke alice"
        );

        let crl = tool.run(&["gen-crl"], None).unwrap();
        assert_eq!(crl.exit_code, Some(2));
        assert_eq!(crl.stderr.trim(), "no ca.key");
    }
}
