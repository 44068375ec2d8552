//! Periodic refresh loop; prints devices whose data moved.

use std::collections::HashSet;
use std::time::Duration;

use chrono::Local;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use thermly_core::{Controller, CoreError, DataOutcome, DeviceId};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::data::{self, States};
use super::redact::Redactor;
use super::util;

fn parse_interval(raw: Option<&str>, default_secs: u64) -> Result<Duration, CliError> {
    let interval = match raw {
        Some(raw) => humantime::parse_duration(raw).map_err(|e| CliError::Validation {
            field: "interval".into(),
            reason: e.to_string(),
        })?,
        None => Duration::from_secs(default_secs),
    };
    if interval.is_zero() {
        return Err(CliError::Validation {
            field: "interval".into(),
            reason: "must be greater than zero".into(),
        });
    }
    Ok(interval)
}

pub async fn handle(
    controller: &Controller,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let defaults = config::load_config()?.defaults;
    let interval = parse_interval(args.interval.as_deref(), defaults.poll_interval)?;

    controller.connect().await?;
    let watched: HashSet<DeviceId> = util::select_devices(controller, &args.target)?
        .iter()
        .map(|d| d.id.clone())
        .collect();
    let redactor = Redactor::new(global.hide_sensitive, &controller.get_devices());

    info!(interval = %humantime::format_duration(interval), devices = watched.len(), "watching");

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("interrupted, stopping");
                break;
            }
            _ = ticker.tick() => {
                let outcomes = match controller.refresh_data(false).await {
                    Ok(outcomes) => outcomes,
                    Err(err @ (CoreError::Authentication { .. } | CoreError::TokenInvalid { .. })) => {
                        return Err(err.into());
                    }
                    Err(err) => {
                        warn!(error = %err, "refresh failed, retrying next interval");
                        continue;
                    }
                };

                let changed = outcomes
                    .iter()
                    .filter(|(id, outcome)| *outcome != DataOutcome::Unchanged && watched.contains(id))
                    .map(|(id, _)| Ok((redactor.id(id).to_string(), controller.get_device_data(id)?)))
                    .collect::<Result<States, CliError>>()?;
                if changed.is_empty() {
                    continue;
                }

                let rendered = data::render_states(&changed, global)?;
                let out = match global.output {
                    OutputFormat::Table => {
                        format!("{}\n{rendered}", Local::now().format("%Y-%m-%d %H:%M:%S"))
                    }
                    _ => rendered,
                };
                output::print_output(&out, global.quiet);
            }
        }
    }

    Ok(())
}
