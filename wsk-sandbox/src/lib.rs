//! Bundler + VFS shims + isolated executor: the guest JS/TS execution
//! pipeline run per `execute` call, always inside its own OS process
//! ([`wsk-sandbox-runner`]).

pub mod bundler;
pub mod error;
pub mod executor;
pub mod shims;

pub use bundler::{bundle, Bundle};
pub use error::SandboxError;
pub use executor::{run, ExecutionOutcome};

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::time::Duration;
    use wsk_vfs::Workspace;

    #[test]
    fn runs_a_guest_that_writes_through_the_fs_shim() {
        let mut ws = Workspace::new();
        ws.write_file(
            "/main.js",
            b"const fs = require('fs'); fs.writeFile('/out/hello.txt', 'hi there');",
            true,
        )
        .unwrap();

        let bundle = bundle(&ws, "/main.js").unwrap();
        let (outcome, ws) = run(ws, &bundle, &[], &BTreeMap::new(), Duration::from_millis(1500)).unwrap();
        assert_eq!(outcome.exit_code, 0);
        assert_eq!(ws.read_file("/out/hello.txt").unwrap(), b"hi there");
    }

    #[test]
    fn console_log_is_captured_as_stdout() {
        let mut ws = Workspace::new();
        ws.write_file("/main.js", b"console.log('hello', 'world');", true).unwrap();
        let bundle = bundle(&ws, "/main.js").unwrap();
        let (outcome, _ws) = run(ws, &bundle, &[], &BTreeMap::new(), Duration::from_millis(1500)).unwrap();
        assert_eq!(outcome.stdout, "hello world\n");
    }

    #[test]
    fn reserved_namespace_write_is_rejected() {
        let mut ws = Workspace::new();
        ws.write_file(
            "/main.js",
            b"const fs = require('fs'); fs.writeFile('/.time/x', 'y');",
            true,
        )
        .unwrap();
        let bundle = bundle(&ws, "/main.js").unwrap();
        let (outcome, _ws) = run(ws, &bundle, &[], &BTreeMap::new(), Duration::from_millis(1500)).unwrap();
        assert_eq!(outcome.exit_code, 1);
    }

    #[test]
    fn unbounded_loop_times_out() {
        let mut ws = Workspace::new();
        ws.write_file("/main.js", b"while (true) {}", true).unwrap();
        let bundle = bundle(&ws, "/main.js").unwrap();
        let result = run(ws, &bundle, &[], &BTreeMap::new(), Duration::from_millis(50));
        assert!(matches!(result, Err(SandboxError::Timeout)));
    }
}
