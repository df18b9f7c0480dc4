//! Source templates for the guest-visible `fs`/`path`/`os` modules. Each
//! forwards to the `__wsk_capability` object bound into the execution
//! context by the executor; none of them ever touch the host.

pub const FS_SHIM_ID: &str = "fs";
pub const OS_SHIM_ID: &str = "os";
pub const PATH_SHIM_ID: &str = "path";

const FS_SOURCE: &str = r#"
const cap = globalThis.__wsk_capability;
function readFile(path, enc) { return cap.readFile(path, enc); }
function writeFile(path, data, enc) { return cap.writeFile(path, data, enc); }
function readdirSync(path) { return cap.readdir(path); }
function statSync(path) {
  const s = cap.stat(path);
  if (s === null || s === undefined) {
    const err = new Error(`ENOENT: no such file or directory, stat '${path}'`);
    err.code = "ENOENT";
    throw err;
  }
  return { isFile: () => s.type === "file", isDirectory: () => s.type === "dir", size: s.size };
}
function mkdirSync(path, opts) { return cap.mkdir(path, !!(opts && opts.recursive)); }
function unlinkSync(path) { return cap.deletePath(path); }
function rmSync(path) { return cap.deletePath(path); }
function existsSync(path) { return cap.stat(path) !== null && cap.stat(path) !== undefined; }
module.exports = {
  readFile, writeFile, readdirSync, statSync, mkdirSync, unlinkSync, rmSync, existsSync,
  readFileSync: readFile, writeFileSync: writeFile,
};
"#;

const OS_SOURCE: &str = r#"
module.exports = {
  EOL: "\n",
  homedir: () => "/",
  tmpdir: () => "/tmp",
  platform: () => "wsk",
};
"#;

const PATH_SOURCE: &str = r#"
function normalize(p) {
  const abs = String(p).replace(/\\/g, "/");
  const parts = abs.split("/");
  const out = [];
  for (const part of parts) {
    if (part === "" || part === ".") continue;
    if (part === "..") { out.pop(); continue; }
    out.push(part);
  }
  return "/" + out.join("/");
}
function join(...parts) { return normalize(parts.join("/")); }
function resolve(...parts) { return normalize(parts.join("/")); }
function dirname(p) {
  const n = normalize(p);
  if (n === "/") return "/";
  const idx = n.lastIndexOf("/");
  return idx <= 0 ? "/" : n.slice(0, idx);
}
function basename(p, ext) {
  const n = normalize(p);
  const b = n === "/" ? "/" : n.slice(n.lastIndexOf("/") + 1);
  return ext && b.endsWith(ext) ? b.slice(0, b.length - ext.length) : b;
}
function extname(p) {
  const b = basename(p);
  const idx = b.lastIndexOf(".");
  return idx <= 0 ? "" : b.slice(idx);
}
function relative(from, to) {
  const a = normalize(from).split("/").filter(Boolean);
  const b = normalize(to).split("/").filter(Boolean);
  let i = 0;
  while (i < a.length && i < b.length && a[i] === b[i]) i++;
  const up = a.slice(i).map(() => "..");
  const down = b.slice(i);
  return up.concat(down).join("/") || ".";
}
function parse(p) {
  const n = normalize(p);
  return { root: "/", dir: dirname(n), base: basename(n), ext: extname(n), name: basename(n, extname(n)) };
}
function format(obj) {
  const dir = obj.dir || "/";
  const base = obj.base || (obj.name || "") + (obj.ext || "");
  return dir === "/" ? `/${base}` : `${dir}/${base}`;
}
function isAbsolute(p) { return String(p).startsWith("/") || String(p).startsWith("~"); }
module.exports = { normalize, join, resolve, dirname, basename, extname, relative, parse, format, isAbsolute, sep: "/" };
"#;

pub fn is_shim_name(specifier: &str) -> bool {
    matches!(specifier, "fs" | "os" | "path" | "node:fs" | "node:os" | "node:path")
}

fn canonical_shim_id(specifier: &str) -> &'static str {
    match specifier {
        "fs" | "node:fs" => FS_SHIM_ID,
        "os" | "node:os" => OS_SHIM_ID,
        "path" | "node:path" => PATH_SHIM_ID,
        _ => unreachable!("caller must check is_shim_name first"),
    }
}

pub fn source_for(specifier: &str) -> Option<&'static str> {
    match canonical_shim_id(specifier) {
        FS_SHIM_ID => Some(FS_SOURCE),
        OS_SHIM_ID => Some(OS_SOURCE),
        PATH_SHIM_ID => Some(PATH_SOURCE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_plain_and_node_prefixed_names() {
        assert!(is_shim_name("fs"));
        assert!(is_shim_name("node:path"));
        assert!(!is_shim_name("lodash"));
    }
}
