use crate::output::{print_json, print_table};
use inkdesk_core::registry;

pub fn run(json: bool) -> anyhow::Result<()> {
    let catalog = registry::catalog();
    if json {
        return print_json(&catalog);
    }

    let rows: Vec<Vec<String>> = catalog
        .iter()
        .map(|spec| {
            vec![
                spec.kind.to_string(),
                spec.summary.to_string(),
                spec.fields.join(", "),
            ]
        })
        .collect();
    print_table(&["TYPE", "SUMMARY", "PAYLOAD FIELDS"], &rows);
    Ok(())
}
