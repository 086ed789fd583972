use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use ordered_tree_crdt::{add, Tree, TreeConfig};

#[derive(serde::Serialize)]
struct Output {
    implementation: &'static str,
    workload: String,
    name: String,
    total_ops: u64,
    duration_ms: f64,
    ops_per_sec: f64,
    extra: Extra,
    source_file: Option<String>,
}

#[derive(serde::Serialize)]
struct Extra {
    count: u64,
}

fn main() {
    let mut count: u64 = 200;
    let mut out_file: Option<PathBuf> = None;
    for arg in env::args().skip(1) {
        if let Some(val) = arg.strip_prefix("--count=") {
            count = val.parse().unwrap_or(count);
        } else if let Some(val) = arg.strip_prefix("--out=") {
            out_file = Some(PathBuf::from(val));
        }
    }

    let mut tree = Tree::<u64>::init(TreeConfig {
        id: 1,
        max_replicas: 1,
    });

    let start = Instant::now();
    let builders = (0..count).map(add).collect();
    tree.batch(builders).expect("batch insert");
    let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

    let output = Output {
        implementation: "ordered-tree-crdt",
        workload: format!("wide-batch-insert-{count}"),
        name: format!("wide-batch-insert-{count}"),
        total_ops: count,
        duration_ms,
        ops_per_sec: if duration_ms > 0.0 {
            count as f64 / duration_ms * 1000.0
        } else {
            f64::INFINITY
        },
        extra: Extra { count },
        source_file: out_file.as_ref().map(|p| p.display().to_string()),
    };

    let json = serde_json::to_string_pretty(&output).expect("serialize");
    if let Some(path) = out_file {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdirs");
        }
        fs::write(&path, &json).expect("write output");
    }
    println!("{json}");
}
