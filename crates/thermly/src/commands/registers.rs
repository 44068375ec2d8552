//! Raw register dump.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use tabled::Tabled;
use thermly_core::{Controller, Registers};

use crate::cli::{GlobalOpts, RegistersArgs};
use crate::error::CliError;
use crate::output;

use super::redact::Redactor;
use super::util;

type Dump = BTreeMap<String, Registers>;

#[derive(Tabled)]
struct RegisterRow {
    #[tabled(rename = "Register")]
    register: String,
    #[tabled(rename = "Value")]
    value: String,
}

fn detail(dump: &Dump) -> String {
    let mut out = String::new();
    for (id, registers) in dump {
        let rows: Vec<RegisterRow> = registers
            .iter()
            .map(|(register, value)| RegisterRow {
                register: register.clone(),
                value: value.clone(),
            })
            .collect();
        let _ = writeln!(out, "── {id} ({} registers) ──", rows.len());
        let _ = writeln!(out, "{}", output::render_table(&rows));
    }
    out.trim_end().to_owned()
}

/// `device register=value`, one per line.
fn plain(dump: &Dump) -> String {
    dump.iter()
        .flat_map(|(id, registers)| {
            registers
                .iter()
                .map(move |(register, value)| format!("{id} {register}={value}"))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub async fn handle(
    controller: &Controller,
    args: RegistersArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    controller.connect().await?;
    controller.refresh_data(args.full).await?;

    let selected = util::select_devices(controller, &args.target)?;
    let redactor = Redactor::new(global.hide_sensitive, &controller.get_devices());
    let dump = selected
        .iter()
        .map(|d| {
            let registers = controller.get_device_registers(&d.id, args.last_update)?;
            Ok((redactor.id(&d.id).to_string(), registers))
        })
        .collect::<Result<Dump, CliError>>()?;

    let out = output::render_single(&global.output, &dump, detail, plain)?;
    output::print_output(&out, global.quiet);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dump {
        let registers: Registers = [("A_1", "4.2"), ("D_3", "1")]
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        BTreeMap::from([("1234_1".to_owned(), registers)])
    }

    #[test]
    fn plain_prints_device_register_pairs() {
        assert_eq!(plain(&sample()), "1234_1 A_1=4.2\n1234_1 D_3=1");
    }

    #[test]
    fn detail_counts_registers() {
        let out = detail(&sample());
        assert!(out.contains("1234_1 (2 registers)"));
        assert!(out.contains("A_1"));
    }
}
