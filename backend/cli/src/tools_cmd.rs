//! `ledgerforge tools`: show the catalog the model is offered.

use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;

use ledgerforge_core::ToolSpec;
use ledgerforge_store::InMemoryStore;
use ledgerforge_tools::{build_registry, ToolOptions};

use crate::terminal_output::{note_info, render_table, Column};

const DESCRIPTION_WIDTH: usize = 60;

pub fn run(json: bool) -> Result<()> {
    let registry = build_registry(Arc::new(InMemoryStore::new()), ToolOptions::default())?;
    let catalog = registry.catalog();

    if json {
        let described: Vec<Value> = catalog.iter().map(ToolSpec::describe).collect();
        println!("{}", serde_json::to_string_pretty(&described)?);
        return Ok(());
    }

    let columns = [
        Column::left("Tool"),
        Column::right("Params"),
        Column::left("Description").max_width(DESCRIPTION_WIDTH),
    ];
    print!("{}", render_table(&columns, &catalog_rows(catalog)));
    note_info(&format!("{} tools registered", catalog.len()));
    Ok(())
}

fn catalog_rows(catalog: &[ToolSpec]) -> Vec<Vec<String>> {
    catalog
        .iter()
        .map(|spec| {
            let required = spec.parameters.iter().filter(|p| p.required).count();
            vec![
                spec.name.clone(),
                format!("{required}/{}", spec.parameters.len()),
                spec.description.clone(),
            ]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerforge_core::{ParamField, ParamSchema};

    #[test]
    fn rows_count_required_params() {
        let spec = ToolSpec::new("recordPayment", "Record a payment")
            .param(ParamField::required("amount", ParamSchema::Number, "Amount"))
            .param(ParamField::optional("notes", ParamSchema::string(), "Notes"));
        let rows = catalog_rows(&[spec]);
        assert_eq!(rows, vec![vec!["recordPayment".to_string(), "1/2".to_string(), "Record a payment".to_string()]]);
    }
}
