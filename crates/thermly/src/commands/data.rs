//! Decoded device state.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use tabled::Tabled;
use thermly_core::{Controller, DecodedState, FieldValue};

use crate::cli::{DataArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::redact::Redactor;
use super::util;

/// Decoded states keyed by (possibly redacted) device id.
pub type States = BTreeMap<String, DecodedState>;

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Value")]
    value: String,
}

fn format_value(value: FieldValue, color: bool) -> String {
    match value {
        FieldValue::Bool(v) => output::on_off(v, color),
        FieldValue::Float(v) => format!("{v:.1}"),
        FieldValue::Int(v) => v.to_string(),
    }
}

fn rows<'a>(
    fields: impl IntoIterator<Item = (&'a String, &'a FieldValue)>,
    color: bool,
) -> Vec<FieldRow> {
    fields
        .into_iter()
        .map(|(field, value)| FieldRow {
            field: field.clone(),
            value: format_value(*value, color),
        })
        .collect()
}

fn detail(states: &States, color: bool) -> String {
    let mut out = String::new();
    for (id, state) in states {
        let _ = writeln!(out, "── {id} ──");
        let _ = writeln!(out, "{}", output::render_table(&rows(&state.fields, color)));
        for (pad_id, pad) in &state.pads {
            let _ = writeln!(
                out,
                "{pad_id} ({}): {}",
                pad.name,
                output::on_off(pad.on, color)
            );
            let _ = writeln!(out, "{}", output::render_table(&rows(&pad.fields, color)));
        }
    }
    out.trim_end().to_owned()
}

/// Render decoded states in the selected output format.
pub fn render_states(states: &States, global: &GlobalOpts) -> Result<String, CliError> {
    let color = output::should_color(&global.color);
    output::render_single(
        &global.output,
        states,
        |s| detail(s, color),
        |s| s.keys().cloned().collect::<Vec<_>>().join("\n"),
    )
}

pub async fn handle(
    controller: &Controller,
    args: DataArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    controller.connect().await?;
    controller.refresh_data(args.full).await?;

    let selected = util::select_devices(controller, &args.target)?;
    let redactor = Redactor::new(global.hide_sensitive, &controller.get_devices());
    let states = selected
        .iter()
        .map(|d| Ok((redactor.id(&d.id).to_string(), controller.get_device_data(&d.id)?)))
        .collect::<Result<States, CliError>>()?;

    let out = render_states(&states, global)?;
    output::print_output(&out, global.quiet);
    Ok(())
}
