#![allow(dead_code)]

use serde_json::{json, Value};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use tempfile::TempDir;

/// A running `freiarbeitd` with a private workspace directory.
pub struct Sidecar {
    child: Child,
    stdin: Option<ChildStdin>,
    reader: BufReader<ChildStdout>,
    next_id: u64,
    pub dir: TempDir,
}

impl Sidecar {
    /// Spawns the sidecar without selecting a workspace.
    pub fn spawn_bare() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let exe = env!("CARGO_BIN_EXE_freiarbeitd");
        let mut child = Command::new(exe)
            .arg("--config")
            .arg(dir.path().join("no-config.toml"))
            .env_remove("RUST_LOG")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn freiarbeitd");
        let stdin = child.stdin.take().expect("child stdin");
        let stdout = child.stdout.take().expect("child stdout");
        Self {
            child,
            stdin: Some(stdin),
            reader: BufReader::new(stdout),
            next_id: 0,
            dir,
        }
    }

    /// Spawns the sidecar and selects a fresh workspace.
    pub fn spawn() -> Self {
        let mut sc = Self::spawn_bare();
        let ws = sc.workspace();
        sc.ok("workspace.select", json!({ "path": ws }));
        sc
    }

    pub fn workspace(&self) -> PathBuf {
        self.dir.path().join("workspace")
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn send_raw(&mut self, line: &str) -> Value {
        let stdin = self.stdin.as_mut().expect("stdin open");
        writeln!(stdin, "{}", line).expect("write request");
        stdin.flush().expect("flush request");

        let mut out = String::new();
        self.reader.read_line(&mut out).expect("read response line");
        assert!(!out.trim().is_empty(), "empty response for {}", line);
        serde_json::from_str(out.trim()).expect("parse response json")
    }

    /// Sends one request and returns the full response envelope.
    pub fn call(&mut self, method: &str, params: Value) -> Value {
        self.next_id += 1;
        let id = self.next_id.to_string();
        let payload = json!({ "id": id, "method": method, "params": params });
        let resp = self.send_raw(&payload.to_string());
        assert_eq!(resp.get("id").and_then(|v| v.as_str()), Some(id.as_str()));
        resp
    }

    /// Sends one request that must succeed and returns its result.
    pub fn ok(&mut self, method: &str, params: Value) -> Value {
        let resp = self.call(method, params);
        assert_eq!(
            resp.get("ok").and_then(|v| v.as_bool()),
            Some(true),
            "{} failed: {}",
            method,
            resp
        );
        resp["result"].clone()
    }

    /// Sends one request that must fail and returns its error object.
    pub fn fail(&mut self, method: &str, params: Value) -> Value {
        let resp = self.call(method, params);
        assert_eq!(
            resp.get("ok").and_then(|v| v.as_bool()),
            Some(false),
            "{} unexpectedly succeeded: {}",
            method,
            resp
        );
        resp["error"].clone()
    }

    pub fn create_group(&mut self, name: &str) -> String {
        let res = self.ok("groups.create", json!({ "name": name }));
        res["groupId"].as_str().expect("groupId").to_string()
    }

    pub fn create_subject(&mut self, name: &str) -> String {
        let res = self.ok("subjects.create", json!({ "name": name }));
        res["subjectId"].as_str().expect("subjectId").to_string()
    }

    pub fn create_person(&mut self, first: &str, last: &str, group_id: &str) -> String {
        let res = self.ok(
            "persons.create",
            json!({
                "firstName": first,
                "lastName": last,
                "groupId": group_id,
                "grade": 5
            }),
        );
        res["personId"].as_str().expect("personId").to_string()
    }

    pub fn count_rows(&self, table: &str) -> i64 {
        count_rows(&self.workspace(), table)
    }
}

impl Drop for Sidecar {
    fn drop(&mut self) {
        // Closing stdin ends the request loop.
        drop(self.stdin.take());
        let _ = self.child.wait();
    }
}

pub fn count_rows(workspace: &Path, table: &str) -> i64 {
    let conn = rusqlite::Connection::open(workspace.join("freiarbeit.sqlite3")).expect("open db");
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))
        .expect("count rows")
}
