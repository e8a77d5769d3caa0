use std::collections::{BTreeMap, HashMap};
use std::io::Read;

use serde::{Deserialize, Serialize};
use tracing::info;
use ulid::Ulid;

use busytime::config::LayoutConfig;
use busytime::engine::ColumnLayout;
use busytime::model::{BusyTime, Ms, Span};
use busytime::view::DayView;

#[derive(Debug, Deserialize)]
struct Script {
    ops: Vec<Op>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Op {
    Add { label: String, start: Ms, end: Ms },
    Remove { label: String },
}

#[derive(Debug, Serialize)]
struct Placement {
    id: Ulid,
    start: Ms,
    end: Ms,
    span: Option<u64>,
    layout: Option<ColumnLayout>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let metrics = busytime::observability::init(std::env::var("BUSYTIME_METRICS").is_ok());
    let config = LayoutConfig::from_env();

    let input = match std::env::args().nth(1) {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let script: Script = serde_json::from_str(&input)?;
    info!("applying {} ops", script.ops.len());
    info!("  scan_window_ms: {}", config.scan_window_ms);
    info!("  many_overlaps_threshold: {}", config.many_overlaps_threshold);

    let mut view = DayView::with_config(config);
    let mut labels: HashMap<String, Ulid> = HashMap::new();
    for op in script.ops {
        match op {
            Op::Add { label, start, end } => {
                let id = *labels.entry(label).or_insert_with(Ulid::new);
                view.add_busytime(BusyTime {
                    id,
                    span: Span { start, end },
                })?;
            }
            Op::Remove { label } => {
                let id = labels
                    .remove(&label)
                    .ok_or_else(|| format!("unknown label: {label}"))?;
                view.remove_busytime(&id)?;
            }
        }
    }

    let placements: BTreeMap<String, Placement> = labels
        .into_iter()
        .filter_map(|(label, id)| {
            let item = *view.get(&id)?;
            Some((
                label,
                Placement {
                    id,
                    start: item.start(),
                    end: item.end(),
                    span: view.span_of(&id).map(|s| s.get()),
                    layout: view.layout_of(&id),
                },
            ))
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&placements)?);
    info!("{} busy times in {} conflict spans", view.len(), view.span_count());

    if let Some(handle) = metrics {
        eprintln!("{}", handle.render());
    }
    Ok(())
}
