pub mod cli;
pub mod commands;
pub mod config;
pub mod edit;
pub mod error;
pub mod model;
pub mod notify;
pub mod remote;
pub mod render;
pub mod sync;

use std::ffi::OsString;

use clap::Parser;
use tracing::{
  debug,
  info
};

pub use crate::error::{
  RemoteError,
  SyncError
};
pub use crate::sync::{
  ListSynchronizer,
  ListView,
  Outcome
};

#[tracing::instrument(skip_all)]
pub async fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting listsync CLI"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.rc_file.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );
  if let Some(base_url) = cli.base_url {
    cfg.set(
      config::BASE_URL_KEY,
      base_url
    );
  }

  let settings =
    config::SyncSettings::from_config(
      &cfg
    )?;
  let renderer =
    render::Renderer::new(&cfg)?;

  commands::dispatch(
    settings,
    renderer,
    cli.command
  )
  .await?;

  info!("done");
  Ok(())
}
