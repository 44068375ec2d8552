//! Device listing.

use tabled::Tabled;
use thermly_core::{Controller, Device};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::redact::Redactor;

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Module")]
    module: String,
    #[tabled(rename = "Unit")]
    unit: String,
    #[tabled(rename = "Active")]
    active: String,
}

impl From<&Device> for DeviceRow {
    fn from(d: &Device) -> Self {
        Self {
            id: d.id.to_string(),
            module: d.module_name.clone(),
            unit: d.unit_name.clone(),
            active: if d.active { "yes" } else { "no" }.into(),
        }
    }
}

pub async fn handle(controller: &Controller, global: &GlobalOpts) -> Result<(), CliError> {
    controller.connect().await?;

    let devices = controller.get_devices();
    let redactor = Redactor::new(global.hide_sensitive, &devices);
    let shown: Vec<Device> = devices.iter().map(|d| redactor.device(d)).collect();

    let out = output::render_list(
        &global.output,
        &shown,
        |d| DeviceRow::from(d),
        |d| d.id.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
