use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};
use std::str::FromStr;

use anyhow::{
  Context,
  anyhow,
  bail
};
use tracing::{
  debug,
  info,
  trace,
  warn
};

use crate::filter::StatusFilter;

const CONFIG_DIR_NAME: &str =
  "taskmaster";
const CONFIG_FILE_NAME: &str =
  "taskmasterrc";

const KNOWN_KEYS: [&str; 4] = [
  "data.location",
  "storage.backend",
  "log.level",
  "filter.default"
];

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum StorageBackend {
  File,
  Memory
}

impl FromStr for StorageBackend {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "file" => Ok(Self::File),
      | "memory" => Ok(Self::Memory),
      | other => {
        Err(anyhow!(
          "invalid storage.backend \
           '{other}': expected \
           file|memory"
        ))
      }
    }
  }
}

#[derive(Debug, Clone)]
pub struct Config {
  map:              HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    let mut map = HashMap::new();
    map.insert(
      "data.location".to_string(),
      "~/.taskmaster".to_string()
    );
    map.insert(
      "storage.backend".to_string(),
      "file".to_string()
    );
    map.insert(
      "log.level".to_string(),
      "warn".to_string()
    );
    map.insert(
      "filter.default".to_string(),
      "all".to_string()
    );

    Self {
      map,
      loaded_files: vec![]
    }
  }
}

impl Config {
  /// Defaults, then the rc file at
  /// `rc_override` or the per-user
  /// config location when present.
  #[tracing::instrument(skip(
    rc_override
  ))]
  pub fn load(
    rc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Self::default();

    let rc_path = match rc_override {
      | Some(path) => {
        Some(path.to_path_buf())
      }
      | None => default_rc_path()
    };

    if let Some(path) = rc_path {
      info!(rc = %path.display(), "loading config");
      cfg.load_file(&path)?;
    } else {
      debug!(
        "no config file found; using \
         defaults"
      );
    }

    Ok(cfg)
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      debug!(key = %k, value = %v, "applying override");
      self.map.insert(k, v);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  pub fn storage_backend(
    &self
  ) -> anyhow::Result<StorageBackend> {
    self
      .get("storage.backend")
      .unwrap_or_else(|| {
        "file".to_string()
      })
      .parse()
  }

  pub fn default_filter(
    &self
  ) -> anyhow::Result<StatusFilter> {
    self
      .get("filter.default")
      .unwrap_or_else(|| {
        "all".to_string()
      })
      .parse()
  }

  pub fn log_level(&self) -> String {
    self
      .get("log.level")
      .unwrap_or_else(|| {
        "warn".to_string()
      })
  }

  #[tracing::instrument(skip(self))]
  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;

    self
      .loaded_files
      .push(path.clone());

    for (idx, raw_line) in
      text.lines().enumerate()
    {
      let Some((key, value)) =
        parse_rc_line(raw_line)
          .with_context(|| {
            format!(
              "invalid config line \
               {}:{}",
              path.display(),
              idx + 1
            )
          })?
      else {
        continue;
      };

      if !KNOWN_KEYS.contains(&key) {
        warn!(
          file = %path.display(),
          line = idx + 1,
          key,
          "unknown config key"
        );
      }
      trace!(key, value, "loaded config key");
      self
        .map
        .insert(key.to_string(), value.to_string());
    }

    Ok(())
  }
}

/// One rc line as `(key, value)`;
/// `None` for blank and comment-only
/// lines.
fn parse_rc_line(
  raw: &str
) -> anyhow::Result<Option<(&str, &str)>>
{
  let content = match raw.split_once('#')
  {
    | Some((before, _)) => before,
    | None => raw
  }
  .trim();
  if content.is_empty() {
    return Ok(None);
  }

  let Some((key, value)) =
    content.split_once('=')
  else {
    bail!("expected `key = value`, got {raw:?}");
  };
  let key = key.trim();
  if key.is_empty() {
    bail!("missing key before `=`");
  }
  Ok(Some((key, value.trim())))
}

/// Directory the file store lives in,
/// created on first use.
#[tracing::instrument(skip(cfg))]
pub fn resolve_data_dir(
  cfg: &Config
) -> anyhow::Result<PathBuf> {
  let dir = match cfg
    .get("data.location")
  {
    | Some(value) => {
      expand_tilde(Path::new(&value))
    }
    | None => default_data_dir()?
  };

  if !dir.exists() {
    info!(dir = %dir.display(), "creating data directory");
    fs::create_dir_all(&dir)
      .with_context(|| {
        format!(
          "failed to create {}",
          dir.display()
        )
      })?;
  }

  Ok(dir)
}

fn default_rc_path() -> Option<PathBuf>
{
  let candidate = dirs::config_dir()?
    .join(CONFIG_DIR_NAME)
    .join(CONFIG_FILE_NAME);
  candidate
    .exists()
    .then_some(candidate)
}

fn default_data_dir()
-> anyhow::Result<PathBuf> {
  let home = dirs::home_dir()
    .ok_or_else(|| {
      anyhow!(
        "cannot determine home \
         directory"
      )
    })?;
  Ok(home.join(".taskmaster"))
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  match (
    path.strip_prefix("~"),
    dirs::home_dir()
  ) {
    | (Ok(rest), Some(home)) => {
      home.join(rest)
    }
    | _ => path.to_path_buf()
  }
}

#[cfg(test)]
mod tests {
  use std::fs;
  use std::path::Path;

  use tempfile::tempdir;

  use super::{
    Config,
    StorageBackend,
    expand_tilde,
    parse_rc_line,
    resolve_data_dir
  };
  use crate::filter::StatusFilter;

  #[test]
  fn defaults_without_a_file() {
    let cfg = Config::default();
    assert_eq!(
      cfg
        .storage_backend()
        .expect("backend"),
      StorageBackend::File
    );
    assert_eq!(
      cfg
        .default_filter()
        .expect("filter"),
      StatusFilter::All
    );
    assert_eq!(cfg.log_level(), "warn");
  }

  #[test]
  fn rc_file_with_comments_and_blank_lines()
  {
    let temp =
      tempdir().expect("tempdir");
    let rc =
      temp.path().join("taskmasterrc");
    fs::write(
      &rc,
      "# storage\nstorage.backend = \
       memory # inline\n\n  \
       filter.default=pending\n\
       log.level = debug\n"
    )
    .expect("write rc");

    let cfg = Config::load(Some(&rc))
      .expect("load");
    assert_eq!(
      cfg
        .storage_backend()
        .expect("backend"),
      StorageBackend::Memory
    );
    assert_eq!(
      cfg
        .default_filter()
        .expect("filter"),
      StatusFilter::Pending
    );
    assert_eq!(cfg.log_level(), "debug");
    assert_eq!(
      cfg.loaded_files,
      vec![rc.clone()]
    );
  }

  #[test]
  fn include_lines_are_not_directives()
  {
    let temp =
      tempdir().expect("tempdir");
    let rc =
      temp.path().join("taskmasterrc");
    fs::write(
      &rc,
      "include extra.rc\n"
    )
    .expect("write rc");

    let err = Config::load(Some(&rc))
      .expect_err("should fail");
    assert!(
      err
        .to_string()
        .contains("invalid config line")
    );
  }

  #[test]
  fn rc_lines_split_on_first_equals()
  {
    assert_eq!(
      parse_rc_line("  # only a note")
        .expect("comment"),
      None
    );
    assert_eq!(
      parse_rc_line(
        "data.location = /a=b # x"
      )
      .expect("line"),
      Some(("data.location", "/a=b"))
    );
    assert_eq!(
      parse_rc_line("log.level=")
        .expect("empty value"),
      Some(("log.level", ""))
    );
    assert!(
      parse_rc_line(" = debug").is_err()
    );
  }

  #[test]
  fn tilde_expands_only_as_leading_component()
  {
    let plain = Path::new("/srv/~/data");
    assert_eq!(
      expand_tilde(plain),
      plain.to_path_buf()
    );
    assert_eq!(
      expand_tilde(Path::new("~user/x")),
      Path::new("~user/x").to_path_buf()
    );
    if let Some(home) = dirs::home_dir() {
      assert_eq!(
        expand_tilde(Path::new(
          "~/.taskmaster"
        )),
        home.join(".taskmaster")
      );
    }
  }

  #[test]
  fn malformed_line_is_an_error() {
    let temp =
      tempdir().expect("tempdir");
    let rc = temp.path().join("bad.rc");
    fs::write(&rc, "no equals here\n")
      .expect("write rc");

    let err = Config::load(Some(&rc))
      .expect_err("should fail");
    assert!(
      err
        .to_string()
        .contains("invalid config line")
    );
  }

  #[test]
  fn overrides_and_data_dir() {
    let temp =
      tempdir().expect("tempdir");
    let data = temp.path().join("data");

    let mut cfg = Config::default();
    cfg.apply_overrides([(
      "data.location".to_string(),
      data.display().to_string()
    )]);
    cfg.apply_overrides([(
      "storage.backend".to_string(),
      "cloud".to_string()
    )]);

    let dir = resolve_data_dir(&cfg)
      .expect("data dir");
    assert_eq!(dir, data);
    assert!(dir.is_dir());
    assert!(
      cfg.storage_backend().is_err()
    );
  }
}
