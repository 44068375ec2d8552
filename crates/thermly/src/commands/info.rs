//! Device info (model, owner, location).

use tabled::Tabled;
use thermly_core::{Controller, DeviceInfo};

use crate::cli::{DeviceArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::redact::Redactor;
use super::util;

#[derive(Tabled)]
struct InfoRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Module")]
    module: String,
    #[tabled(rename = "Type")]
    pump_type: String,
    #[tabled(rename = "Country")]
    country: String,
    #[tabled(rename = "Owner")]
    owner: String,
}

impl From<&DeviceInfo> for InfoRow {
    fn from(i: &DeviceInfo) -> Self {
        Self {
            id: i.id.to_string(),
            module: i.module_name.clone(),
            pump_type: i.pump_type.clone().unwrap_or_default(),
            country: i.country.clone().unwrap_or_default(),
            owner: owner(i),
        }
    }
}

fn owner(i: &DeviceInfo) -> String {
    [i.name.as_deref(), i.surname.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
}

fn detail(i: &DeviceInfo) -> String {
    let mut lines = vec![
        format!("ID:        {}", i.id),
        format!("Module:    {}", i.module_name),
        format!("Unit:      {}", i.unit_name),
        format!("Type:      {}", i.pump_type.as_deref().unwrap_or("-")),
        format!("Country:   {}", i.country.as_deref().unwrap_or("-")),
        format!("Owner:     {}", owner(i)),
        format!("Latitude:  {}", util::fmt_opt_f64(i.latitude)),
        format!("Longitude: {}", util::fmt_opt_f64(i.longitude)),
    ];
    if let Some(ref notes) = i.notes {
        lines.push(format!("Notes:     {notes}"));
    }
    for (key, value) in &i.extra {
        lines.push(format!("{key}: {value}"));
    }
    lines.join("\n")
}

pub async fn handle(
    controller: &Controller,
    args: DeviceArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    controller.connect().await?;
    controller.refresh_info().await?;

    let selected = util::select_devices(controller, &args)?;
    let redactor = Redactor::new(global.hide_sensitive, &controller.get_devices());
    let infos = selected
        .iter()
        .map(|d| {
            let info = controller.get_device_info(&d.id)?;
            Ok(redactor.info(&info))
        })
        .collect::<Result<Vec<_>, CliError>>()?;

    let out = match (args.device.as_ref(), infos.as_slice()) {
        (Some(_), [info]) => {
            output::render_single(&global.output, info, detail, |i| i.id.to_string())?
        }
        _ => output::render_list(
            &global.output,
            &infos,
            |i| InfoRow::from(i),
            |i| i.id.to_string(),
        )?,
    };
    output::print_output(&out, global.quiet);
    Ok(())
}
