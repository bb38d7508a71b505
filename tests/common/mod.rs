#![allow(dead_code)]

use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;
use tfs_blame::annotate::{BundledPayload, ANNOTATE_RESOURCE};
use tfs_blame::{
    Batch, BlameCommand, BlameOptions, InputFile, Settings, TfsConfiguration,
    SONAR_TFS_ANNOTATE_PROP_KEY,
};

/// Fake annotate tool: replays `<file>.blame` on stdout, `<file>.stderr` on
/// stderr and exits with the code in `<file>.exit` (0 when absent). Every
/// call is appended to `calls.log` as `<argc>|<args>`.
const FAKE_ANNOTATE: &str = r#"#!/bin/sh
echo "$#|$*" >> "__CALLS__"
if [ -f "$1.delay" ]; then sleep "$(cat "$1.delay")"; fi
if [ -f "$1.stderr" ]; then cat "$1.stderr" >&2; fi
if [ -f "$1.blame" ]; then cat "$1.blame"; fi
if [ -f "$1.exit" ]; then exit "$(cat "$1.exit")"; fi
exit 0
"#;

/// Fake annotate tool that records how many copies of itself are running.
const COUNTING_ANNOTATE: &str = r#"#!/bin/sh
marker="__RUNNING__/running.$$"
touch "$marker"
ls "__RUNNING__" | grep -c '^running\.' >> "__PEAKS__"
sleep 0.3
ls "__RUNNING__" | grep -c '^running\.' >> "__PEAKS__"
rm -f "$marker"
if [ -f "$1.blame" ]; then cat "$1.blame"; fi
exit 0
"#;

pub struct TestEnv {
    _tmp: TempDir,
    pub root: PathBuf,
    pub work: PathBuf,
    pub temp_root: PathBuf,
    pub calls: PathBuf,
    pub running: PathBuf,
    pub peaks: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let root = tmp.path().to_path_buf();
        let work = root.join("work");
        let temp_root = root.join("scratch");
        let running = root.join("running");
        for dir in [&work, &temp_root, &running] {
            fs::create_dir_all(dir).expect("create fixture dir");
        }

        Self {
            _tmp: tmp,
            calls: root.join("calls.log"),
            peaks: root.join("peaks.log"),
            root,
            work,
            temp_root,
            running,
        }
    }

    pub fn fake_annotate_script(&self) -> String {
        FAKE_ANNOTATE.replace("__CALLS__", &self.calls.to_string_lossy())
    }

    pub fn counting_annotate_script(&self) -> String {
        COUNTING_ANNOTATE
            .replace("__RUNNING__", &self.running.to_string_lossy())
            .replace("__PEAKS__", &self.peaks.to_string_lossy())
    }

    /// Writes the fake tool outside the temp root and returns its path.
    pub fn install_tool(&self) -> PathBuf {
        let path = self.root.join("fake-annotate.sh");
        write_executable(&path, &self.fake_annotate_script());
        path
    }

    /// Creates a source file with `lines` lines and returns its descriptor.
    pub fn source(&self, name: &str, lines: usize) -> InputFile {
        let path = self.work.join(name);
        let content = vec!["x"; lines].join("\n");
        fs::write(&path, content).expect("write source file");
        InputFile::new(name, path, lines)
    }

    pub fn stdout(&self, file: &InputFile, blame: &str) {
        fs::write(sidecar(file, "blame"), blame).expect("write blame fixture");
    }

    pub fn stderr(&self, file: &InputFile, stderr: &str) {
        fs::write(sidecar(file, "stderr"), stderr).expect("write stderr fixture");
    }

    pub fn exit_code(&self, file: &InputFile, code: i32) {
        fs::write(sidecar(file, "exit"), code.to_string()).expect("write exit fixture");
    }

    pub fn delay(&self, file: &InputFile, secs: &str) {
        fs::write(sidecar(file, "delay"), secs).expect("write delay fixture");
    }

    pub fn batch(&self, files: &[InputFile]) -> Batch {
        let mut batch = Batch::new(&self.work);
        for file in files {
            batch.push(file.clone());
        }
        batch
    }

    /// Command using the given annotate executable through configuration.
    pub fn command_with_tool(&self, tool: &Path) -> BlameCommand {
        let mut settings = Settings::new();
        settings.set(SONAR_TFS_ANNOTATE_PROP_KEY, tool.to_string_lossy());
        BlameCommand::new(TfsConfiguration::new(settings)).with_options(self.options())
    }

    /// Command extracting `payload` as its bundled annotate executable.
    pub fn command_with_payload(&self, payload: Arc<dyn BundledPayload>) -> BlameCommand {
        BlameCommand::new(TfsConfiguration::new(Settings::new()))
            .with_options(self.options())
            .with_payload(payload)
    }

    pub fn options(&self) -> BlameOptions {
        BlameOptions {
            pool_size: None,
            timeout: None,
            temp_root: Some(self.temp_root.clone()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        fs::read_to_string(&self.calls)
            .unwrap_or_default()
            .lines()
            .map(String::from)
            .collect()
    }

    pub fn peaks(&self) -> Vec<usize> {
        fs::read_to_string(&self.peaks)
            .unwrap_or_default()
            .lines()
            .filter_map(|line| line.trim().parse().ok())
            .collect()
    }

    pub fn temp_root_entries(&self) -> usize {
        fs::read_dir(&self.temp_root).expect("read temp root").count()
    }
}

fn sidecar(file: &InputFile, ext: &str) -> PathBuf {
    let mut name = file.absolute_path().as_os_str().to_os_string();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

pub fn write_executable(path: &Path, content: &str) {
    fs::write(path, content).expect("write script");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).expect("chmod script");
    }
}

/// Bundled payload backed by a string, counting how often it is read.
pub struct ScriptPayload {
    script: String,
    pub loads: AtomicUsize,
}

impl ScriptPayload {
    pub fn new(script: String) -> Arc<Self> {
        Arc::new(Self {
            script,
            loads: AtomicUsize::new(0),
        })
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl BundledPayload for ScriptPayload {
    fn load(&self, name: &str) -> Option<Cow<'static, [u8]>> {
        if name != ANNOTATE_RESOURCE {
            return None;
        }
        self.loads.fetch_add(1, Ordering::SeqCst);
        Some(Cow::Owned(self.script.clone().into_bytes()))
    }
}

/// Collects formatted tracing output in memory.
#[derive(Clone, Default)]
pub struct LogCapture {
    buf: Arc<Mutex<Vec<u8>>>,
}

struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

impl io::Write for CaptureWriter {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("log buffer").extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl LogCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync + 'static {
        let buf = self.buf.clone();
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || CaptureWriter(buf.clone()))
            .finish()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf.lock().expect("log buffer")).into_owned()
    }
}

pub const ALICE: &str = "c1\tAlice\t2020-01-01T10:00:00Z";
pub const BOB: &str = "c2\tBob\t2020-02-02T11:00:00Z";
