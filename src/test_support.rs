//! Shell-script stand-ins for `git`, `pip`, `python` and BestiaPop itself.
//!
//! Every fake appends its arguments to `<bin>/<name>.log`, one line per call, so tests can
//! assert on what was run. The fake `python` runs the script it is given with `sh`.

use crate::config::GeneratorConfig;
use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const LOG_ARGS: &str = "echo \"$@\" >> \"$(dirname \"$0\")/$(basename \"$0\").log\"";

/// Writes a `.met` file named `<lat>-<lon>.met` covering the `-y` years into the `-o` directory.
pub(crate) const GENERATOR_OK: &str = r#"
while [ $# -gt 0 ]; do
  case "$1" in
    -y) years="$2"; shift 2 ;;
    -lat) lat="$2"; shift 2 ;;
    -lon) lon="$2"; shift 2 ;;
    -o) out="$2"; shift 2 ;;
    *) shift ;;
  esac
done
start=${years%-*}
end=${years#*-}
file="$out/$lat-$lon.met"
echo "Fetching SILO data for $lat $lon" 1>&2
{
  echo "[weather.met.weather]"
  echo "latitude = $lat (DECIMAL DEGREES)"
  echo "longitude = $lon (DECIMAL DEGREES)"
  echo "tav = 15.2 (oC) ! annual average ambient temperature"
  echo "amp = 12.4 (oC)"
  echo "year day radn maxt mint rain vp evap"
  echo "() () (MJ/m^2) (oC) (oC) (mm) (hPa) (mm)"
  year=$start
  while [ "$year" -le "$end" ]; do
    days=365
    if [ $((year % 4)) -eq 0 ] && { [ $((year % 100)) -ne 0 ] || [ $((year % 400)) -eq 0 ]; }; then
      days=366
    fi
    day=1
    while [ "$day" -le "$days" ]; do
      echo "$year $day 20.5 25.0 12.0 0.4 12.1 5.2"
      day=$((day + 1))
    done
    year=$((year + 1))
  done
} > "$file"
echo "Wrote $file"
"#;

pub(crate) const GENERATOR_FAILS: &str =
    "echo 'Downloading SILO data'; echo 'SILO request failed: HTTP 503' 1>&2; exit 1";

pub(crate) const GENERATOR_SILENT: &str = "echo 'Nothing to do'";

pub(crate) fn write_script(path: &Path, body: &str) -> io::Result<()> {
    fs::write(path, format!("#!/bin/sh\n{body}\n"))?;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
}

pub(crate) struct FakeTools {
    root: TempDir,
}

impl FakeTools {
    pub(crate) fn new() -> io::Result<Self> {
        let tools = Self {
            root: tempfile::tempdir()?,
        };
        let bin = tools.bin_dir();
        fs::create_dir_all(&bin)?;

        write_script(
            &bin.join("git"),
            &format!(
                "{LOG_ARGS}\n\
                 mkdir -p \"$3/bestiapop\" && touch \"$3/requirements.txt\" && \
                 cp \"$(dirname \"$0\")/bestiapop.py\" \"$3/bestiapop/bestiapop.py\""
            ),
        )?;
        write_script(&bin.join("pip"), LOG_ARGS)?;
        write_script(&bin.join("python"), &format!("{LOG_ARGS}\nexec sh \"$@\""))?;
        tools.set_generator(GENERATOR_OK)?;
        Ok(tools)
    }

    pub(crate) fn root(&self) -> &Path {
        self.root.path()
    }

    pub(crate) fn bin_dir(&self) -> PathBuf {
        self.root().join("bin")
    }

    pub(crate) fn temp_root(&self) -> PathBuf {
        self.root().join("tmp")
    }

    pub(crate) fn install_dir(&self) -> PathBuf {
        self.root()
            .join("data")
            .join("ApsimInitiative")
            .join("ApsimX")
            .join("Python")
            .join("bestiapop")
    }

    pub(crate) fn config(&self) -> GeneratorConfig {
        let bin = self.bin_dir();
        GeneratorConfig::builder()
            .install_dir(self.install_dir())
            .git(bin.join("git"))
            .pip(bin.join("pip"))
            .python(bin.join("python"))
            .temp_root(self.temp_root())
            .build()
    }

    /// Lays out an install directory as if `git clone` had run, without logging a call.
    pub(crate) fn install(&self) -> io::Result<()> {
        let install_dir = self.install_dir();
        fs::create_dir_all(install_dir.join("bestiapop"))?;
        fs::write(install_dir.join("requirements.txt"), "")?;
        fs::copy(
            self.bin_dir().join("bestiapop.py"),
            install_dir.join("bestiapop").join("bestiapop.py"),
        )?;
        Ok(())
    }

    /// Replaces the generator script, both for future clones and in an existing install.
    pub(crate) fn set_generator(&self, body: &str) -> io::Result<()> {
        write_script(&self.bin_dir().join("bestiapop.py"), body)?;
        let installed = self.install_dir().join("bestiapop");
        if installed.is_dir() {
            write_script(&installed.join("bestiapop.py"), body)?;
        }
        Ok(())
    }

    /// Argument lines logged by the fake `name`, oldest first.
    pub(crate) fn invocations(&self, name: &str) -> io::Result<Vec<String>> {
        match fs::read_to_string(self.bin_dir().join(format!("{name}.log"))) {
            Ok(log) => Ok(log.lines().map(str::to_string).collect()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }
}
