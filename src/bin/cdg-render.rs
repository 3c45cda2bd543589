//! CLI front end for the CD+G authoring engine.
//!
//! `render` turns a project description into a `.cdg` stream; `inspect` is a
//! small supplemental collaborator that decodes an existing `.cdg` file
//! pack-by-pack and prints a human-readable instruction trace, useful for
//! checking output without a real CD+G player. Grounded in the `clap` derive
//! pattern from `jacobzlogar-gbr`'s `main.rs`.

use cdg_author::error::CdgError;
use cdg_author::glyph::FixedGlyphSource;
use cdg_author::packet::{
    self, INSTR_BORDER_PRESET, INSTR_COPY_FONT, INSTR_DEFINE_TRANSPARENT, INSTR_LOAD_CLUT_HI,
    INSTR_LOAD_CLUT_LO, INSTR_MEMORY_PRESET, INSTR_SCROLL_COPY, INSTR_SCROLL_PRESET,
    INSTR_XOR_FONT,
};
use cdg_author::project::Project;
use cdg_author::scheduler::{self, SchedulerConfig, SchedulerInput};
use cdg_author::writer;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "cdg-render", version, about = "CD+G subcode stream authoring")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Schedules a project description into a `.cdg` stream.
    Render {
        /// Path to the project JSON file.
        project: PathBuf,
        /// Path to write the `.cdg` output to.
        out: PathBuf,
        /// Caps pack slots reserved per bitmap/text event.
        #[arg(long)]
        pack_budget: Option<u32>,
        /// Duplicates tile packets once per second for loss tolerance.
        #[arg(long)]
        repeat: bool,
        /// Prints the per-event packet budget table.
        #[arg(short, long)]
        verbose: bool,
    },
    /// Decodes a `.cdg` file pack-by-pack and prints an instruction trace.
    Inspect {
        /// Path to the `.cdg` file to inspect.
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Command::Render {
            project,
            out,
            pack_budget,
            repeat,
            verbose,
        } => render(&project, &out, pack_budget, repeat, verbose),
        Command::Inspect { file } => inspect(&file),
    }
}

fn render(
    project_path: &Path,
    out_path: &Path,
    pack_budget: Option<u32>,
    repeat: bool,
    verbose: bool,
) -> ExitCode {
    let result = run_render(project_path, out_path, pack_budget, repeat, verbose);
    match result {
        Ok(()) => ExitCode::from(0),
        Err(err) => {
            eprintln!("error: {err}");
            exit_code_for(&err)
        }
    }
}

fn run_render(
    project_path: &Path,
    out_path: &Path,
    pack_budget: Option<u32>,
    repeat: bool,
    verbose: bool,
) -> cdg_author::error::Result<()> {
    let text = std::fs::read_to_string(project_path)?;
    let project = Project::from_json(&text)?;
    let base_dir = project_path.parent().unwrap_or_else(|| Path::new("."));
    let glyphs = Arc::new(FixedGlyphSource::new());
    let timeline = project.build_timeline(base_dir, glyphs)?;
    let palette = project.initial_palette()?;

    let total_packs = project.total_packs();
    let input = SchedulerInput {
        timeline: &timeline,
        total_packs,
        initial_palette: &palette,
        initial_border: project.initial_border,
        initial_clear_color: project.initial_clear_color,
        initial_transparent: project.initial_transparent,
    };
    let config = SchedulerConfig {
        pack_budget_per_bitmap_event: pack_budget,
        enable_repetition: repeat,
    };

    let packets = scheduler::schedule(&input, &config)?;

    if verbose {
        print_budget_table(&timeline, total_packs);
    }

    writer::write_file(out_path, &packets)?;
    log::info!(
        "wrote {} pack(s) ({} bytes) to {}",
        total_packs,
        total_packs as usize * packet::PACKET_LEN,
        out_path.display()
    );
    Ok(())
}

fn print_budget_table(timeline: &cdg_author::timeline::EventTimeline, total_packs: u32) {
    println!("{:<20} {:>10} {:>10}", "event", "start", "duration");
    let mut events: Vec<_> = timeline.all_events().collect();
    events.sort_by_key(|e| e.start_offset_packs);
    for event in events {
        println!(
            "{:<20} {:>10} {:>10}",
            event.label.clone().unwrap_or_default(),
            event.start_offset_packs,
            event.duration_packs,
        );
    }
    println!("total packs: {total_packs}");
}

fn exit_code_for(err: &CdgError) -> ExitCode {
    match err {
        CdgError::Overbudget { .. } => ExitCode::from(1),
        CdgError::InvalidBmp(_) | CdgError::InvalidEvent { .. } | CdgError::InvalidPalette { .. } => {
            ExitCode::from(2)
        }
        CdgError::Io(_) => ExitCode::from(3),
    }
}

fn inspect(file: &Path) -> ExitCode {
    match std::fs::read(file) {
        Ok(bytes) => {
            print_trace(&bytes);
            ExitCode::from(0)
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(3)
        }
    }
}

fn print_trace(bytes: &[u8]) {
    for (slot, chunk) in bytes.chunks(packet::PACKET_LEN).enumerate() {
        if chunk.len() < packet::PACKET_LEN || chunk.iter().all(|&b| b == 0) {
            continue;
        }
        let instruction = chunk[1] & 0x3F;
        println!("slot {slot:>6}: {}", describe_instruction(instruction));
    }
}

fn describe_instruction(instruction: u8) -> String {
    match instruction {
        INSTR_MEMORY_PRESET => "MEMORY_PRESET".to_string(),
        INSTR_BORDER_PRESET => "BORDER_PRESET".to_string(),
        INSTR_COPY_FONT => "COPY_FONT".to_string(),
        INSTR_SCROLL_PRESET => "SCROLL_PRESET".to_string(),
        INSTR_SCROLL_COPY => "SCROLL_COPY".to_string(),
        INSTR_DEFINE_TRANSPARENT => "DEFINE_TRANSPARENT".to_string(),
        INSTR_LOAD_CLUT_LO => "LOAD_CLUT_LO".to_string(),
        INSTR_LOAD_CLUT_HI => "LOAD_CLUT_HI".to_string(),
        INSTR_XOR_FONT => "XOR_FONT".to_string(),
        other => format!("UNKNOWN({other})"),
    }
}
