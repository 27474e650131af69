//! # Installing a service under a process supervisor.
//!
//! [`Installer`] is the seam; [`RunitInstaller`] is the bundled implementation.
//!
//! ## runit layout
//! ```text
//! <service_dir>/<name>/run        #!/bin/sh
//!                                 exec <current command line> 2>&1
//! <service_dir>/<name>/log/run    #!/bin/sh
//!                                 exec <svlogd> -ttv <log_root>/<name>
//! <log_root>/<name>/              svlogd output
//! ```
//!
//! `--runit-install` is dropped from the recorded command line; arguments that
//! name existing paths are canonicalized so the script does not depend on the
//! working directory.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

/// Flag that triggers installation; never written into a run script.
pub const INSTALL_FLAG: &str = "--runit-install";

/// # Errors produced by installers.
#[derive(Error, Debug)]
pub enum InstallError {
    /// A required supervisor component is missing.
    #[error("supervisor unavailable: {0}")]
    Unavailable(String),

    /// Writing the service directory failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Installs a service under a process supervisor.
pub trait Installer: Send + Sync {
    fn install(&self, service_name: &str) -> Result<(), InstallError>;
}

/// Installs services as runit service directories.
#[derive(Debug, Clone)]
pub struct RunitInstaller {
    service_dir: PathBuf,
    log_root: PathBuf,
    args: Option<Vec<String>>,
    search_path: Option<Vec<PathBuf>>,
}

impl Default for RunitInstaller {
    /// `/etc/service`, logs under `/var/log`, current command line, `$PATH`.
    fn default() -> Self {
        Self {
            service_dir: PathBuf::from("/etc/service"),
            log_root: PathBuf::from("/var/log"),
            args: None,
            search_path: None,
        }
    }
}

impl RunitInstaller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory scanned by `runsvdir`.
    pub fn with_service_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.service_dir = dir.into();
        self
    }

    /// Parent of the per-service `svlogd` directory.
    pub fn with_log_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_root = dir.into();
        self
    }

    /// Command line to record instead of the current one.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = Some(args.into_iter().map(Into::into).collect());
        self
    }

    /// Directories searched for `runsv` and `svlogd` instead of `$PATH`.
    pub fn with_search_path<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.search_path = Some(dirs.into_iter().map(Into::into).collect());
        self
    }

    fn search_dirs(&self) -> Vec<PathBuf> {
        match &self.search_path {
            Some(dirs) => dirs.clone(),
            None => env::var_os("PATH")
                .map(|p| env::split_paths(&p).collect())
                .unwrap_or_default(),
        }
    }

    fn default_args() -> Result<Vec<String>, InstallError> {
        let exe = env::current_exe()?;
        let mut args = vec![exe.to_string_lossy().into_owned()];
        args.extend(env::args().skip(1));
        // runsv only captures stdout; logs go to stderr.
        args.push(STDERR_REDIRECT.to_string());
        Ok(args)
    }
}

impl Installer for RunitInstaller {
    fn install(&self, service_name: &str) -> Result<(), InstallError> {
        let dirs = self.search_dirs();
        find_executable("runsv", &dirs)
            .ok_or_else(|| InstallError::Unavailable("runsv not found on PATH".into()))?;
        let svlogd = find_executable("svlogd", &dirs)
            .ok_or_else(|| InstallError::Unavailable("svlogd not found on PATH".into()))?;

        let service_path = self.service_dir.join(service_name);
        info!(service = service_name, path = %service_path.display(), "installing under runit");

        let log_dir = self.log_root.join(service_name);
        fs::create_dir_all(&log_dir)?;
        write_run_script(
            &service_path.join("log"),
            &[
                svlogd.to_string_lossy().into_owned(),
                "-ttv".to_string(),
                log_dir.to_string_lossy().into_owned(),
            ],
        )?;

        let args = match &self.args {
            Some(args) => args.clone(),
            None => Self::default_args()?,
        };
        write_run_script(&service_path, &args)?;
        Ok(())
    }
}

/// Returns the first executable file called `name` in `dirs`.
pub fn find_executable(name: &str, dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter()
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Redirect appended to the default command line; written to the script verbatim.
const STDERR_REDIRECT: &str = "2>&1";

/// Renders an `exec` script for `args`.
///
/// Every argument is shell-quoted except a trailing `2>&1`.
pub fn run_script(args: &[String]) -> String {
    let args: Vec<&String> = args.iter().filter(|arg| arg.as_str() != INSTALL_FLAG).collect();
    let (args, redirect) = match args.split_last() {
        Some((last, rest)) if last.as_str() == STDERR_REDIRECT => (rest, Some(STDERR_REDIRECT)),
        _ => (args.as_slice(), None),
    };

    let mut parts: Vec<String> = args
        .iter()
        .map(|arg| {
            let path = Path::new(arg.as_str());
            let arg = if path.exists() {
                fs::canonicalize(path)
                    .map(|p| p.to_string_lossy().into_owned())
                    .unwrap_or_else(|_| arg.to_string())
            } else {
                arg.to_string()
            };
            shell_quote(&arg)
        })
        .collect();
    parts.extend(redirect.map(str::to_string));
    format!("#!/bin/sh\nexec {}\n", parts.join(" "))
}

/// Single-quotes `arg` unless it only holds characters the shell passes through.
fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', "'\\''"))
    }
}

fn write_run_script(dir: &Path, args: &[String]) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    let path = dir.join("run");
    fs::write(&path, run_script(args))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(&path)?.permissions();
        perms.set_mode(perms.mode() | 0o111);
        fs::set_permissions(&path, perms)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    fn fake_tool(dir: &Path, name: &str) {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        fs::write(&path, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn test_run_script_drops_install_flag() {
        let script = run_script(&[
            "/nonexistent/bin/app".to_string(),
            INSTALL_FLAG.to_string(),
            "--level".to_string(),
            "info".to_string(),
        ]);
        assert_eq!(script, "#!/bin/sh\nexec /nonexistent/bin/app --level info\n");
    }

    #[test]
    fn test_run_script_quotes_arguments() {
        let script = run_script(&[
            "/nonexistent/bin/app".to_string(),
            "--motd".to_string(),
            "it's a $HOME; day".to_string(),
            String::new(),
            "2>&1".to_string(),
        ]);
        assert_eq!(
            script,
            "#!/bin/sh\nexec /nonexistent/bin/app --motd 'it'\\''s a $HOME; day' '' 2>&1\n"
        );
    }

    #[test]
    fn test_run_script_quotes_redirect_in_the_middle() {
        let script = run_script(&["app".to_string(), "2>&1".to_string(), "x".to_string()]);
        assert_eq!(script, "#!/bin/sh\nexec app '2>&1' x\n");
    }

    #[test]
    fn test_run_script_canonicalizes_existing_paths() {
        let dir = tempfile::tempdir().unwrap();
        let rel = dir.path().join(".").join("cfg");
        fs::write(&rel, "").unwrap();

        let script = run_script(&[rel.to_string_lossy().into_owned()]);
        let canonical = fs::canonicalize(&rel).unwrap();
        assert!(script.contains(&*canonical.to_string_lossy()));
        assert!(!script.contains("/./"));
    }

    #[cfg(unix)]
    #[test]
    fn test_install_writes_service_and_log_scripts() {
        use std::os::unix::fs::PermissionsExt;

        let bin = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        fake_tool(bin.path(), "runsv");
        fake_tool(bin.path(), "svlogd");

        let installer = RunitInstaller::new()
            .with_service_dir(root.path().join("service"))
            .with_log_root(root.path().join("log"))
            .with_search_path([bin.path()])
            .with_args(["/nonexistent/app", INSTALL_FLAG, "2>&1"]);
        installer.install("demo").unwrap();

        let run = root.path().join("service/demo/run");
        assert_eq!(
            fs::read_to_string(&run).unwrap(),
            "#!/bin/sh\nexec /nonexistent/app 2>&1\n"
        );
        assert_ne!(fs::metadata(&run).unwrap().permissions().mode() & 0o111, 0);

        let log_run = fs::read_to_string(root.path().join("service/demo/log/run")).unwrap();
        assert!(log_run.contains("svlogd -ttv"));
        assert!(root.path().join("log/demo").is_dir());
    }

    #[test]
    fn test_install_requires_runsv() {
        let empty = tempfile::tempdir().unwrap();
        let installer = RunitInstaller::new().with_search_path([empty.path()]);

        let err = installer.install("demo").unwrap_err();
        assert!(matches!(err, InstallError::Unavailable(_)));
    }
}
