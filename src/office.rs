use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use serde_json::{Map, Value, json};

use crate::document::{OfficeDocument, Refreshable, StyleFamilies};
use crate::error::Error;
use crate::format::{DocumentFamily, DocumentFormat};
use crate::package::LoadedDocument;
use crate::props::{PropertyMap, PropertySet, PropertyValue};
use crate::task::OfficeContext;

pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(120);

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Characters that must be escaped in a `file://` URL path.
const URL_PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Load properties that headless `soffice --convert-to` already implies.
const IMPLIED_LOAD_PROPERTIES: &[&str] = &["Hidden", "ReadOnly", "UpdateDocMode"];

#[derive(Clone, Debug)]
pub struct OfficeConfig {
    /// Installation directory (the one containing `program/`).
    pub office_home: Option<PathBuf>,
    /// Explicit `soffice` binary; takes precedence over `office_home`.
    pub executable: Option<PathBuf>,
    pub task_timeout: Duration,
    /// User profile used by the office process. A fresh temporary profile is
    /// used when unset, so runs never touch the user's own profile.
    pub profile_dir: Option<PathBuf>,
}

impl Default for OfficeConfig {
    fn default() -> Self {
        OfficeConfig {
            office_home: None,
            executable: None,
            task_timeout: DEFAULT_TASK_TIMEOUT,
            profile_dir: None,
        }
    }
}

impl OfficeConfig {
    /// Defaults, with `OFFICE_HOME` as the office home if set.
    pub fn from_env() -> Self {
        OfficeConfig {
            office_home: office_home_from_env(),
            ..Default::default()
        }
    }

    pub fn with_office_home(mut self, dir: &Path) -> Self {
        self.office_home = Some(dir.to_path_buf());
        self
    }

    pub fn with_executable(mut self, path: &Path) -> Self {
        self.executable = Some(path.to_path_buf());
        self
    }

    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = timeout;
        self
    }

    pub fn with_profile_dir(mut self, dir: &Path) -> Self {
        self.profile_dir = Some(dir.to_path_buf());
        self
    }

    /// Resolves the `soffice` binary: explicit executable, configured office
    /// home, `OFFICE_HOME`, platform install locations, then `PATH`.
    pub fn find_executable(&self) -> Result<PathBuf, Error> {
        self.find_executable_with(office_home_from_env())
    }

    fn find_executable_with(&self, env_home: Option<PathBuf>) -> Result<PathBuf, Error> {
        if let Some(exe) = &self.executable {
            if exe.is_file() {
                return Ok(exe.clone());
            }
            log::error!("soffice executable not found: {}", exe.display());
            return Err(Error::OfficeNotFound);
        }

        if let Some(home) = self.office_home.as_ref().or(env_home.as_ref()) {
            let exe = executable_in_home(home);
            if exe.is_file() {
                return Ok(exe);
            }
            log::error!("no soffice in office home {}", home.display());
            return Err(Error::OfficeNotFound);
        }

        default_office_homes()
            .iter()
            .map(|home| executable_in_home(home))
            .find(|exe| exe.is_file())
            .or_else(search_path)
            .ok_or(Error::OfficeNotFound)
    }
}

fn office_home_from_env() -> Option<PathBuf> {
    std::env::var_os("OFFICE_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn executable_in_home(home: &Path) -> PathBuf {
    if cfg!(target_os = "macos") {
        home.join("MacOS/soffice")
    } else if cfg!(windows) {
        home.join("program").join("soffice.exe")
    } else {
        home.join("program/soffice")
    }
}

fn default_office_homes() -> Vec<PathBuf> {
    let mut homes: Vec<PathBuf> = Vec::new();

    #[cfg(target_os = "macos")]
    {
        homes.extend([
            "/Applications/LibreOffice.app/Contents".into(),
            "/Applications/OpenOffice.app/Contents".into(),
            "/Applications/OpenOffice.org.app/Contents".into(),
        ]);
    }

    #[cfg(windows)]
    {
        for var in ["ProgramFiles", "ProgramFiles(x86)"] {
            if let Some(base) = std::env::var_os(var) {
                let base = PathBuf::from(base);
                for name in ["LibreOffice", "LibreOffice 4", "LibreOffice 3", "OpenOffice 4", "OpenOffice.org 3"] {
                    homes.push(base.join(name));
                }
            }
        }
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    {
        homes.extend([
            "/usr/lib/libreoffice".into(),
            "/usr/lib64/libreoffice".into(),
            "/usr/local/lib/libreoffice".into(),
            "/opt/libreoffice".into(),
            "/snap/libreoffice/current/lib/libreoffice".into(),
            "/usr/lib/openoffice".into(),
            "/opt/openoffice4".into(),
            "/opt/openoffice.org3".into(),
        ]);
    }

    homes
}

fn search_path() -> Option<PathBuf> {
    let names: &[&str] = if cfg!(windows) {
        &["soffice.exe"]
    } else {
        &["soffice", "libreoffice"]
    };
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .flat_map(|dir| names.iter().map(move |name| dir.join(name)))
        .find(|candidate| candidate.is_file())
}

fn file_url(path: &Path) -> String {
    let path = path.to_string_lossy().replace('\\', "/");
    let encoded = utf8_percent_encode(&path, URL_PATH);
    if path.starts_with('/') {
        format!("file://{encoded}")
    } else {
        format!("file:///{encoded}")
    }
}

/// `--infilter` value from load properties, if a filter is requested.
pub(crate) fn input_filter(properties: &PropertyMap) -> Option<String> {
    for name in properties.keys() {
        match name.as_str() {
            "FilterName" | "FilterOptions" => {}
            name if IMPLIED_LOAD_PROPERTIES.contains(&name) => {}
            name => log::warn!("load property {name} cannot be passed to soffice; ignored"),
        }
    }

    let filter = properties.get("FilterName")?.as_str()?;
    Some(match properties.get("FilterOptions") {
        Some(options) => format!("{filter}:{options}"),
        None => filter.to_string(),
    })
}

/// `--convert-to` value: `ext[:FilterName[:FilterOptions or FilterData JSON]]`.
pub(crate) fn convert_to_arg(extension: &str, properties: &PropertyMap) -> String {
    for name in properties.keys() {
        if !matches!(name.as_str(), "FilterName" | "FilterOptions" | "FilterData") {
            log::warn!("store property {name} cannot be passed to soffice; ignored");
        }
    }

    let mut arg = extension.to_ascii_lowercase();
    let Some(filter) = properties.get("FilterName").and_then(PropertyValue::as_str) else {
        return arg;
    };
    arg.push(':');
    arg.push_str(filter);

    if let Some(options) = properties.get("FilterOptions") {
        arg.push(':');
        arg.push_str(&options.to_string());
    } else if let Some(data) = properties.get("FilterData").and_then(PropertyValue::as_props) {
        arg.push(':');
        arg.push_str(&filter_data_json(data).to_string());
    }
    arg
}

/// Typed JSON form soffice accepts for filter data, e.g.
/// `{"PageRange":{"type":"string","value":"2"}}`.
fn filter_data_json(data: &PropertyMap) -> Value {
    let entries: Map<String, Value> = data
        .iter()
        .map(|(name, value)| {
            let typed_value = match value {
                PropertyValue::Props(nested) => filter_data_json(nested),
                other => Value::String(other.to_string()),
            };
            (name.clone(), json!({ "type": value.type_name(), "value": typed_value }))
        })
        .collect();
    Value::Object(entries)
}

/// A document loaded through [`SofficeContext`].
#[derive(Debug)]
pub struct SofficeDocument {
    document: LoadedDocument,
    file_name: String,
    input_filter: Option<String>,
}

impl SofficeDocument {
    pub fn document(&self) -> &LoadedDocument {
        &self.document
    }
}

impl OfficeDocument for SofficeDocument {
    fn family(&self) -> Option<DocumentFamily> {
        self.document.family()
    }

    fn line_numbering(&mut self) -> Option<&mut dyn PropertySet> {
        self.document.line_numbering()
    }

    fn style_families(&mut self) -> Option<&mut dyn StyleFamilies> {
        self.document.style_families()
    }

    fn refreshable(&mut self) -> Option<&mut dyn Refreshable> {
        self.document.refreshable()
    }
}

/// Runs one headless `soffice --convert-to` process per stored document.
pub struct SofficeContext {
    executable: PathBuf,
    timeout: Duration,
    work_dir: tempfile::TempDir,
    profile_dir: PathBuf,
}

impl SofficeContext {
    pub fn new(config: &OfficeConfig) -> Result<Self, Error> {
        let executable = config.find_executable()?;
        let work_dir = tempfile::Builder::new().prefix("officeconv-").tempdir()?;
        let profile_dir = match &config.profile_dir {
            Some(dir) => dir.clone(),
            None => work_dir.path().join("profile"),
        };
        log::debug!(
            "using {} with profile {}",
            executable.display(),
            profile_dir.display()
        );
        Ok(SofficeContext {
            executable,
            timeout: config.task_timeout,
            work_dir,
            profile_dir,
        })
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    fn run(&self, mut command: Command, log_path: &Path) -> Result<(), Error> {
        let log_file = File::create(log_path)?;
        command
            .stdin(Stdio::null())
            .stdout(Stdio::from(log_file.try_clone()?))
            .stderr(Stdio::from(log_file));
        log::debug!("running {command:?}");

        let mut child = command.spawn().map_err(|e| {
            Error::Office(format!("could not start {}: {e}", self.executable.display()))
        })?;

        let started = Instant::now();
        let status: ExitStatus = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if started.elapsed() >= self.timeout {
                if let Err(e) = child.kill() {
                    log::warn!("could not kill office process: {e}");
                }
                let _ = child.wait();
                return Err(Error::Timeout(self.timeout));
            }
            thread::sleep(POLL_INTERVAL);
        };

        let output = fs::read_to_string(log_path).unwrap_or_default();
        if !output.trim().is_empty() {
            log::debug!("soffice: {}", output.trim());
        }
        if !status.success() {
            return Err(Error::Office(format!("{status}: {}", output.trim())));
        }
        Ok(())
    }
}

impl OfficeContext for SofficeContext {
    type Document = SofficeDocument;

    fn load(&mut self, input: &Path, properties: &PropertyMap) -> Result<SofficeDocument, Error> {
        let display_name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let document = LoadedDocument::read(input)
            .map_err(|e| Error::Load(format!("{display_name}: {e}")))?;

        // soffice names its output after the input file, so keep the name plain
        let file_name = match input.extension().and_then(|e| e.to_str()) {
            Some(ext) => format!("document.{ext}"),
            None => "document".to_string(),
        };

        Ok(SofficeDocument {
            document,
            file_name,
            input_filter: input_filter(properties),
        })
    }

    fn store(
        &mut self,
        document: &SofficeDocument,
        output: &Path,
        output_format: &DocumentFormat,
        properties: &PropertyMap,
    ) -> Result<(), Error> {
        let output_name = output.display().to_string();
        // soffice names its result after the requested extension, not after `output`
        let extension = output_format
            .extension
            .trim_start_matches('.')
            .to_ascii_lowercase();

        let job = tempfile::Builder::new()
            .prefix("job-")
            .tempdir_in(self.work_dir.path())?;
        let input_path = job.path().join(&document.file_name);
        fs::write(&input_path, document.document.to_bytes()?)?;
        let out_dir = job.path().join("out");
        fs::create_dir(&out_dir)?;

        let mut command = Command::new(&self.executable);
        command
            .args([
                "--headless",
                "--invisible",
                "--nocrashreport",
                "--nodefault",
                "--nofirststartwizard",
                "--nolockcheck",
                "--nologo",
                "--norestore",
            ])
            .arg(format!("-env:UserInstallation={}", file_url(&self.profile_dir)));
        if let Some(filter) = &document.input_filter {
            command.arg(format!("--infilter={filter}"));
        }
        command
            .arg("--convert-to")
            .arg(convert_to_arg(&extension, properties))
            .arg("--outdir")
            .arg(&out_dir)
            .arg(&input_path);

        self.run(command, &job.path().join("soffice.log"))
            .map_err(|e| match e {
                Error::Timeout(_) => e,
                other => Error::Store(format!("{output_name}: {other}")),
            })?;

        let stem = Path::new(&document.file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let produced = out_dir.join(format!("{stem}.{extension}"));
        if !produced.is_file() {
            return Err(Error::Store(format!("{output_name}: office produced no output")));
        }
        fs::copy(&produced, output)?;
        log::info!("stored {output_name}");
        Ok(())
    }
}
