//! Runs a bundled module graph inside an isolated QuickJS context with no
//! host bindings beyond the injected filesystem capability object.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

use rquickjs::{CatchResultExt, Context, Ctx, Function, Object, Runtime};
use tracing::{debug, warn};
use wsk_commons::{is_reserved, normalize, WskError};
use wsk_vfs::{EntryKind, Workspace};

use crate::bundler::Bundle;
use crate::error::SandboxError;

/// Output of a single guest execution.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

struct Capability {
    ws: Rc<RefCell<Workspace>>,
}

impl Capability {
    fn reject_reserved(path: &str) -> Result<String, WskError> {
        let p = normalize(path);
        if is_reserved(&p) {
            return Err(WskError::access_denied(&p));
        }
        Ok(p)
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>, WskError> {
        let p = Self::reject_reserved(path)?;
        Ok(self.ws.borrow().read_file(&p)?.to_vec())
    }

    fn write_file(&self, path: &str, data: &[u8]) -> Result<(), WskError> {
        let p = Self::reject_reserved(path)?;
        self.ws.borrow_mut().write_file(&p, data, true)
    }

    fn readdir(&self, path: &str) -> Result<Vec<String>, WskError> {
        let p = Self::reject_reserved(path)?;
        self.ws.borrow().list(&p)
    }

    fn stat(&self, path: &str) -> Result<Option<(String, u64)>, WskError> {
        let p = Self::reject_reserved(path)?;
        Ok(self.ws.borrow().stat(&p).map(|s| {
            let kind = if s.kind == EntryKind::File { "file" } else { "dir" };
            (kind.to_string(), s.size)
        }))
    }

    fn mkdir(&self, path: &str, recursive: bool) -> Result<(), WskError> {
        let p = Self::reject_reserved(path)?;
        self.ws.borrow_mut().mkdir(&p, recursive)
    }

    fn delete_path(&self, path: &str) -> Result<(), WskError> {
        let p = Self::reject_reserved(path)?;
        self.ws.borrow_mut().delete(&p)
    }
}

/// A single, shimmed script's entry trio invocation plus module cache,
/// expressed as a small CJS-style loader over the bundle's modules.
const LOADER_PRELUDE: &str = r#"
globalThis.__wsk_modules = {};
globalThis.__wsk_cache = {};
globalThis.__wsk_require = function (id) {
  if (Object.prototype.hasOwnProperty.call(globalThis.__wsk_cache, id)) {
    return globalThis.__wsk_cache[id].exports;
  }
  const factory = globalThis.__wsk_modules[id];
  if (!factory) {
    throw new Error("blocked or unresolved module: " + id);
  }
  const mod = { exports: {} };
  globalThis.__wsk_cache[id] = mod;
  factory(globalThis.__wsk_require, mod, mod.exports);
  return mod.exports;
};
"#;

/// Removed from `globalThis` after the bundle's own modules have loaded (the
/// Rust-side `ctx.eval` calls that load the loader prelude and the bundle
/// itself run before this and are unaffected): guest code gets no dynamic
/// code generation, per spec §4.7.
const DISABLE_DYNAMIC_CODE_GEN: &str = r#"
delete globalThis.eval;
delete globalThis.Function;
"#;

fn module_wrapper(id: &str, source: &str) -> String {
    let escaped_id = id.replace('\\', "\\\\").replace('"', "\\\"");
    format!(
        "globalThis.__wsk_modules[\"{escaped_id}\"] = function (require, module, exports) {{\n{source}\n}};\n"
    )
}

/// Run `bundle` against `ws`, mutating it through the capability object,
/// with argv/env/timeout matching the sandbox process protocol.
pub fn run(
    ws: Workspace,
    bundle: &Bundle,
    argv: &[String],
    env: &BTreeMap<String, String>,
    timeout: Duration,
) -> Result<(ExecutionOutcome, Workspace), SandboxError> {
    let shared = Rc::new(RefCell::new(ws));
    let capability = Capability { ws: shared.clone() };
    let stdout = Rc::new(RefCell::new(String::new()));
    let stderr = Rc::new(RefCell::new(String::new()));

    let runtime = Runtime::new().map_err(|err| SandboxError::Runtime(err.to_string()))?;
    let deadline = Instant::now() + timeout;
    runtime.set_interrupt_handler(Some(Box::new(move || Instant::now() >= deadline)));

    let context = Context::full(&runtime).map_err(|err| SandboxError::Runtime(err.to_string()))?;

    let exit_code = context.with(|ctx| -> Result<i32, SandboxError> {
        install_globals(&ctx, &capability, argv, env, stdout.clone(), stderr.clone())
            .map_err(|err| SandboxError::Runtime(err.to_string()))?;

        ctx.eval::<(), _>(LOADER_PRELUDE)
            .catch(&ctx)
            .map_err(|err| SandboxError::Runtime(err.to_string()))?;

        for (id, source) in &bundle.modules {
            let wrapped = module_wrapper(id, source);
            ctx.eval::<(), _>(wrapped.as_bytes())
                .catch(&ctx)
                .map_err(|err| SandboxError::Runtime(err.to_string()))?;
        }

        ctx.eval::<(), _>(DISABLE_DYNAMIC_CODE_GEN)
            .catch(&ctx)
            .map_err(|err| SandboxError::Runtime(err.to_string()))?;

        let entry_call = format!("globalThis.__wsk_require(\"{}\");", bundle.entry_id.replace('"', "\\\""));
        let result = ctx.eval::<(), _>(entry_call.as_bytes()).catch(&ctx);
        match result {
            Ok(()) => Ok(0),
            Err(caught) => {
                let message = caught.to_string();
                if message.contains("interrupted") {
                    return Err(SandboxError::Timeout);
                }
                warn!(error = %message, "guest script raised an uncaught exception");
                Ok(1)
            }
        }
    })?;

    runtime.set_interrupt_handler(None);

    let outcome = ExecutionOutcome {
        stdout: stdout.borrow().clone(),
        stderr: stderr.borrow().clone(),
        exit_code,
    };
    debug!(exit_code, "guest script finished");

    // Drop the context (and the JS closures it holds, each cloning `shared`)
    // before reclaiming sole ownership of the workspace.
    drop(context);
    drop(capability);
    let ws = Rc::try_unwrap(shared)
        .map_err(|_| SandboxError::Runtime("workspace still borrowed after execution".to_string()))?
        .into_inner();
    Ok((outcome, ws))
}

fn install_globals(
    ctx: &Ctx<'_>,
    capability: &Capability,
    argv: &[String],
    env: &BTreeMap<String, String>,
    stdout: Rc<RefCell<String>>,
    stderr: Rc<RefCell<String>>,
) -> rquickjs::Result<()> {
    let globals = ctx.globals();

    let cap_obj = Object::new(ctx.clone())?;
    bind_capability(ctx, &cap_obj, capability)?;
    globals.set("__wsk_capability", cap_obj)?;

    let console = Object::new(ctx.clone())?;
    let out_for_log = stdout.clone();
    console.set(
        "log",
        Function::new(ctx.clone(), move |args: rquickjs::function::Rest<String>| {
            let mut buf = out_for_log.borrow_mut();
            buf.push_str(&args.0.join(" "));
            buf.push('\n');
        })?,
    )?;
    let out_for_info = stdout;
    console.set(
        "info",
        Function::new(ctx.clone(), move |args: rquickjs::function::Rest<String>| {
            let mut buf = out_for_info.borrow_mut();
            buf.push_str(&args.0.join(" "));
            buf.push('\n');
        })?,
    )?;
    let err_for_warn = stderr.clone();
    console.set(
        "warn",
        Function::new(ctx.clone(), move |args: rquickjs::function::Rest<String>| {
            let mut buf = err_for_warn.borrow_mut();
            buf.push_str(&args.0.join(" "));
            buf.push('\n');
        })?,
    )?;
    let err_for_error = stderr;
    console.set(
        "error",
        Function::new(ctx.clone(), move |args: rquickjs::function::Rest<String>| {
            let mut buf = err_for_error.borrow_mut();
            buf.push_str(&args.0.join(" "));
            buf.push('\n');
        })?,
    )?;
    globals.set("console", console)?;

    let process = Object::new(ctx.clone())?;
    let mut process_argv = vec!["wsk".to_string(), "main".to_string()];
    process_argv.extend(argv.iter().cloned());
    process.set("argv", process_argv)?;
    let env_obj = Object::new(ctx.clone())?;
    for (key, value) in env {
        env_obj.set(key.as_str(), value.as_str())?;
    }
    process.set("env", env_obj)?;
    process.set("cwd", Function::new(ctx.clone(), || "/".to_string())?)?;
    globals.set("process", process)?;

    globals.set(
        "require",
        Function::new(ctx.clone(), |_id: String| -> rquickjs::Result<()> {
            Err(rquickjs::Error::Exception)
        })?,
    )?;

    Ok(())
}

fn bind_capability(ctx: &Ctx<'_>, obj: &Object<'_>, capability: &Capability) -> rquickjs::Result<()> {
    let cap = capability.ws.clone();

    {
        let ws = cap.clone();
        obj.set(
            "readFile",
            Function::new(ctx.clone(), move |path: String, enc: Option<String>| -> rquickjs::Result<String> {
                let capability = Capability { ws: ws.clone() };
                let bytes = capability.read_file(&path).map_err(|_| rquickjs::Error::Exception)?;
                if enc.as_deref() == Some("base64") {
                    use base64::Engine;
                    Ok(base64::engine::general_purpose::STANDARD.encode(&bytes))
                } else {
                    Ok(String::from_utf8_lossy(&bytes).into_owned())
                }
            })?,
        )?;
    }
    {
        let ws = cap.clone();
        obj.set(
            "writeFile",
            Function::new(ctx.clone(), move |path: String, data: String, enc: Option<String>| -> rquickjs::Result<()> {
                let capability = Capability { ws: ws.clone() };
                let bytes = if enc.as_deref() == Some("base64") {
                    use base64::Engine;
                    base64::engine::general_purpose::STANDARD
                        .decode(data)
                        .map_err(|_| rquickjs::Error::Exception)?
                } else {
                    data.into_bytes()
                };
                capability.write_file(&path, &bytes).map_err(|_| rquickjs::Error::Exception)
            })?,
        )?;
    }
    {
        let ws = cap.clone();
        obj.set(
            "readdir",
            Function::new(ctx.clone(), move |path: String| -> rquickjs::Result<Vec<String>> {
                let capability = Capability { ws: ws.clone() };
                capability.readdir(&path).map_err(|_| rquickjs::Error::Exception)
            })?,
        )?;
    }
    {
        let ws = cap.clone();
        obj.set(
            "stat",
            Function::new(
                ctx.clone(),
                move |ctx: Ctx<'_>, path: String| -> rquickjs::Result<Option<Object<'_>>> {
                    let capability = Capability { ws: ws.clone() };
                    let stat = capability.stat(&path).map_err(|_| rquickjs::Error::Exception)?;
                    match stat {
                        Some((kind, size)) => {
                            let stat_obj = Object::new(ctx)?;
                            stat_obj.set("type", kind)?;
                            stat_obj.set("size", size)?;
                            Ok(Some(stat_obj))
                        }
                        None => Ok(None),
                    }
                },
            )?,
        )?;
    }
    {
        let ws = cap.clone();
        obj.set(
            "mkdir",
            Function::new(ctx.clone(), move |path: String, recursive: Option<bool>| -> rquickjs::Result<()> {
                let capability = Capability { ws: ws.clone() };
                capability
                    .mkdir(&path, recursive.unwrap_or(false))
                    .map_err(|_| rquickjs::Error::Exception)
            })?,
        )?;
    }
    {
        let ws = cap.clone();
        obj.set(
            "deletePath",
            Function::new(ctx.clone(), move |path: String| -> rquickjs::Result<()> {
                let capability = Capability { ws: ws.clone() };
                capability.delete_path(&path).map_err(|_| rquickjs::Error::Exception)
            })?,
        )?;
    }

    Ok(())
}
