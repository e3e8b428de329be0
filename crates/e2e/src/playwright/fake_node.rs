//! Scripted stand-in for `node bridge.js`, used by unit tests
//!
//! A script run by `/bin/sh` that speaks the bridge's JSON-lines protocol, records
//! every method it receives, and answers with canned results. Requests are
//! serialized as `{"id":N,"method":"...","params":{...}}`, which is what the
//! `sed` expressions below rely on.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use super::bridge::BridgeConfig;

/// What the fake answers to each method
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeNode {
    /// Methods that never get a response
    silent: Vec<&'static str>,
    /// Fail the n-th (1-based) `newPage`
    fail_new_page: Option<usize>,
    /// `waitForSelector` times out for selectors containing this text
    missing_text: Option<String>,
}

/// A written fake plus the file it logs received methods to
pub(crate) struct FakeBridge {
    pub config: BridgeConfig,
    log: PathBuf,
    _dir: tempfile::TempDir,
}

impl FakeNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn never_answer(mut self, method: &'static str) -> Self {
        self.silent.push(method);
        self
    }

    pub fn fail_new_page(mut self, nth: usize) -> Self {
        self.fail_new_page = Some(nth);
        self
    }

    pub fn missing(mut self, text: &str) -> Self {
        self.missing_text = Some(text.to_string());
        self
    }

    pub fn write(self) -> FakeBridge {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("methods.log");
        let script = dir.path().join("fake-bridge.sh");
        std::fs::write(&script, self.script(&log)).unwrap();

        FakeBridge {
            config: BridgeConfig {
                node_path: Some(PathBuf::from("/bin/sh")),
                node_args: vec![script.to_string_lossy().to_string()],
                working_dir: dir.path().to_path_buf(),
                response_timeout_ms: 5_000,
            },
            log,
            _dir: dir,
        }
    }

    fn script(&self, log: &Path) -> String {
        let mut arms = String::new();
        for method in &self.silent {
            let _ = writeln!(arms, "    {}) ;;", method);
        }

        let fail_page = self.fail_new_page.map(|n| n.to_string()).unwrap_or_else(|| "0".to_string());
        let missing = self.missing_text.clone().unwrap_or_else(|| "@@nothing-is-missing@@".to_string());

        format!(
            r#"#!/bin/sh
LOG='{log}'
MISSING='{missing}'
pages=0
rows=0
reply() {{ printf '{{"id":%s,"result":%s}}\n' "$id" "$1"; }}
fail() {{ printf '{{"id":%s,"error":{{"message":"%s","name":"%s"}}}}\n' "$id" "$1" "$2"; }}
while IFS= read -r line; do
  id=$(printf '%s\n' "$line" | sed -n 's/^{{"id":\([0-9]*\),.*/\1/p')
  method=$(printf '%s\n' "$line" | sed -n 's/^{{"id":[0-9]*,"method":"\([A-Za-z]*\)".*/\1/p')
  echo "$method" >> "$LOG"
  case "$method" in
{arms}    ping) reply '"pong"' ;;
    launch) reply '"fake-1.0"' ;;
    newContext) reply "\"ctx-$id\"" ;;
    newPage)
      pages=$((pages + 1))
      if [ "$pages" = "{fail_page}" ]; then fail "Target closed" Error; else reply "\"page-$id\""; fi ;;
    goto|reload) reply '{{"status":200,"url":"https://portal.cempal.example/"}}' ;;
    waitForSelector)
      case "$line" in
        *"$MISSING"*) fail "Timeout exceeded" TimeoutError ;;
        *) reply null ;;
      esac ;;
    count) rows=$((rows + 1)); reply "$rows" ;;
    shutdown) reply null; exit 0 ;;
    *) reply null ;;
  esac
done
"#,
            log = log.display(),
            missing = missing,
            arms = arms,
            fail_page = fail_page,
        )
    }
}

impl FakeBridge {
    /// Methods received so far, in order
    pub fn methods(&self) -> Vec<String> {
        std::fs::read_to_string(&self.log)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn count(&self, method: &str) -> usize {
        self.methods().iter().filter(|m| *m == method).count()
    }
}
