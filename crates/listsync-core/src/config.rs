use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};
use std::time::Duration;

use anyhow::{
  Context,
  anyhow
};
use reqwest::Url;
use tracing::{
  debug,
  info,
  trace,
  warn
};

pub const BASE_URL_KEY: &str =
  "collection.base_url";

#[derive(Debug, Clone)]
pub struct Config {
  map: HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    let mut map = HashMap::new();
    for (k, v) in [
      ("collection.lists", "project_lists"),
      ("collection.tasks", "tasks"),
      ("collection.parent_field", "parent"),
      ("collection.parent_prefix", ""),
      ("http.timeout_secs", "30"),
      ("sync.revert_on_failure", "on"),
      ("color", "on")
    ] {
      map.insert(
        k.to_string(),
        v.to_string()
      );
    }
    Self {
      map,
      loaded_files: vec![]
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    rc_override
  ))]
  pub fn load(
    rc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();

    let rc = resolve_rc_path(rc_override)?;
    if let Some(path) = rc {
      info!(rc = %path.display(), "loading rc file");
      cfg.load_file(&path, &mut vec![])?;
    } else {
      warn!(
        "no rc file found; using \
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
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      self.map.insert(key, v);
    }
  }

  pub fn set(
    &mut self,
    key: &str,
    value: impl Into<String>
  ) {
    self
      .map
      .insert(key.to_string(), value.into());
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  pub fn get_bool(
    &self,
    key: &str
  ) -> anyhow::Result<Option<bool>> {
    self
      .map
      .get(key)
      .map(|v| {
        parse_bool(v).ok_or_else(|| {
          anyhow!(
            "invalid boolean for \
             {key}: {v}"
          )
        })
      })
      .transpose()
  }

  /// `chain` holds the canonical paths of
  /// the files that include this one.
  #[tracing::instrument(skip(self, chain))]
  fn load_file(
    &mut self,
    path: &Path,
    chain: &mut Vec<PathBuf>
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
    let canonical = fs::canonicalize(&path)
      .unwrap_or_else(|_| path.clone());

    self
      .loaded_files
      .push(path.clone());

    let base_dir = path
      .parent()
      .map(|p| p.to_path_buf())
      .unwrap_or_else(|| {
        PathBuf::from(".")
      });

    for (line_num, raw_line) in
      text.lines().enumerate()
    {
      let mut line = raw_line.trim();
      if line.is_empty()
        || line.starts_with('#')
      {
        continue;
      }

      if let Some((before, _)) =
        line.split_once(" #")
      {
        line = before.trim();
      }

      if let Some(include_rest) =
        line.strip_prefix("include ")
      {
        let include_path =
          resolve_include_path(
            &base_dir,
            include_rest.trim()
          )?;
        debug!(
            file = %path.display(),
            include = %include_path.display(),
            line = line_num + 1,
            "processing include"
        );

        if include_path.exists() {
          let target =
            fs::canonicalize(&include_path)
              .unwrap_or_else(|_| {
                include_path.clone()
              });
          if target == canonical
            || chain.contains(&target)
          {
            return Err(anyhow!(
              "include cycle at {}:{}: {}",
              path.display(),
              line_num + 1,
              include_path.display()
            ));
          }
          chain.push(canonical.clone());
          let loaded = self
            .load_file(&include_path, chain);
          chain.pop();
          loaded?;
        } else {
          warn!(include = %include_path.display(), "include file does not exist; skipping");
        }
        continue;
      }

      let (k, v) = line
        .split_once('=')
        .ok_or_else(|| {
          anyhow!(
            "invalid config line \
             {}:{}: {}",
            path.display(),
            line_num + 1,
            raw_line
          )
        })?;

      let key = k.trim().to_string();
      let value = v.trim().to_string();
      trace!(key = %key, value = %value, "loaded config key");
      self.map.insert(key, value);
    }

    Ok(())
  }
}

/// Validated view of the settings the
/// synchronizer and the HTTP store need.
#[derive(Debug, Clone)]
pub struct SyncSettings {
  pub base_url:          Url,
  pub lists:             String,
  pub tasks:             String,
  pub parent_field:      String,
  pub parent_prefix:     String,
  pub timeout:           Duration,
  pub revert_on_failure: bool
}

impl SyncSettings {
  #[tracing::instrument(skip(cfg))]
  pub fn from_config(
    cfg: &Config
  ) -> anyhow::Result<Self> {
    let raw_base = cfg
      .get(BASE_URL_KEY)
      .filter(|v| !v.trim().is_empty())
      .ok_or_else(|| {
        anyhow!(
          "{BASE_URL_KEY} is not set; \
           pass --base-url or add it \
           to the rc file"
        )
      })?;
    let base_url =
      parse_base_url(&raw_base)?;

    let lists = required_segment(
      cfg,
      "collection.lists"
    )?;
    let tasks = required_segment(
      cfg,
      "collection.tasks"
    )?;
    let parent_field = cfg
      .get("collection.parent_field")
      .map(|v| v.trim().to_string())
      .filter(|v| !v.is_empty())
      .ok_or_else(|| {
        anyhow!(
          "collection.parent_field \
           cannot be empty"
        )
      })?;
    let parent_prefix = cfg
      .get("collection.parent_prefix")
      .unwrap_or_default();

    let timeout_raw = cfg
      .get("http.timeout_secs")
      .unwrap_or_else(|| "30".to_string());
    let timeout_secs: u64 = timeout_raw
      .trim()
      .parse()
      .with_context(|| {
        format!(
          "invalid http.timeout_secs: \
           {timeout_raw}"
        )
      })?;
    if timeout_secs == 0 {
      return Err(anyhow!(
        "http.timeout_secs must be \
         positive"
      ));
    }

    let revert_on_failure = cfg
      .get_bool("sync.revert_on_failure")?
      .unwrap_or(true);

    debug!(
      base_url = %base_url,
      lists = %lists,
      tasks = %tasks,
      timeout_secs,
      revert_on_failure,
      "resolved sync settings"
    );

    Ok(Self {
      base_url,
      lists,
      tasks,
      parent_field,
      parent_prefix,
      timeout: Duration::from_secs(
        timeout_secs
      ),
      revert_on_failure
    })
  }
}

fn parse_base_url(
  raw: &str
) -> anyhow::Result<Url> {
  let mut text = raw.trim().to_string();
  if !text.ends_with('/') {
    text.push('/');
  }
  let url = Url::parse(&text)
    .with_context(|| {
      format!(
        "invalid {BASE_URL_KEY}: {raw}"
      )
    })?;
  if url.cannot_be_a_base() {
    return Err(anyhow!(
      "{BASE_URL_KEY} cannot be used \
       as a base: {raw}"
    ));
  }
  Ok(url)
}

fn required_segment(
  cfg: &Config,
  key: &str
) -> anyhow::Result<String> {
  let value = cfg
    .get(key)
    .map(|v| {
      v.trim().trim_matches('/').to_string()
    })
    .unwrap_or_default();
  if value.is_empty() {
    return Err(anyhow!(
      "{key} cannot be empty"
    ));
  }
  Ok(value)
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_rc_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(rc_env) =
    std::env::var("LISTSYNC_RC")
  {
    if rc_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      rc_env
    )));
  }

  let Some(home) = dirs::home_dir()
  else {
    debug!(
      "cannot determine home \
       directory; skipping rc lookup"
    );
    return Ok(None);
  };
  let candidate =
    home.join(".listsyncrc");
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn resolve_include_path(
  base_dir: &Path,
  include: &str
) -> anyhow::Result<PathBuf> {
  if include.trim().is_empty() {
    return Err(anyhow!(
      "include path cannot be empty"
    ));
  }

  let raw = PathBuf::from(include);
  let expanded = expand_tilde(&raw);
  if expanded.is_absolute() {
    Ok(expanded)
  } else {
    Ok(base_dir.join(expanded))
  }
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

fn parse_bool(s: &str) -> Option<bool> {
  match s
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "1" | "y" | "yes" | "on"
    | "true" => Some(true),
    | "0" | "n" | "no" | "off"
    | "false" => Some(false),
    | _ => None
  }
}
