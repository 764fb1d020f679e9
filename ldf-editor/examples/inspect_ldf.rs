//! Standalone LDF inspection tool
//!
//! Loads an LDF file and prints its nodes, signals and frame layouts.
//!
//! Usage:
//!   inspect_ldf <file.ldf>
//!
//! Example:
//!   inspect_ldf body.ldf

use ldf_editor::{Editor, LdfDocument};
use std::env;
use std::path::PathBuf;

fn print_layout(doc: &LdfDocument) {
    for frame in doc.frames() {
        println!(
            "\n{} (id 0x{:02X}, {} bytes, published by {})",
            frame.name,
            frame.frame_id,
            frame.length,
            frame.publisher.as_deref().unwrap_or("-")
        );
        for (offset, name) in &frame.signals {
            let width = doc.signal(name).map(|s| s.width).unwrap_or(0);
            println!("  bits {:>2}..{:<2} {}", offset, u16::from(*offset) + u16::from(width), name);
        }
    }
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let Some(path) = args.get(1).map(PathBuf::from) else {
        eprintln!("Usage: {} <file.ldf>", args[0]);
        std::process::exit(2);
    };

    let doc = match Editor::new().load(&path) {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("Error loading {:?}: {}", path, e);
            std::process::exit(1);
        }
    };

    let header = doc.header();
    println!("=== {} ===", path.display());
    println!(
        "Protocol {} / language {}, {} kbps",
        header.protocol_version, header.language_version, header.speed_kbps
    );

    let stats = doc.stats();
    println!(
        "{} nodes, {} signals, {} frames, {} other sections",
        stats.num_nodes, stats.num_signals, stats.num_frames, stats.num_opaque_sections
    );

    if let Some(master) = doc.master() {
        println!("\nMaster: {}", master.name);
    }
    for slave in doc.slaves() {
        println!("Slave:  {}", slave.name);
    }

    println!("\nSignals:");
    for signal in doc.signals() {
        println!(
            "  {:<24} {:>2} bits  init {:<10} {} -> [{}]",
            signal.name,
            signal.width,
            signal.init_value.to_string(),
            signal.publisher.as_deref().unwrap_or("-"),
            signal.subscribers.iter().cloned().collect::<Vec<_>>().join(", ")
        );
    }

    print_layout(&doc);
}
