//! Pieces command - enumerate the piece set for a block degree

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use gobloks_core::{generate_piece_set, Piece};

#[derive(Args)]
pub struct PiecesArgs {
    /// Largest piece size to generate
    #[arg(long, default_value = "5")]
    pub degree: usize,

    /// Only list pieces of exactly this size
    #[arg(long)]
    pub size: Option<usize>,

    /// Print JSON instead of drawings
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PiecesReport {
    degree: usize,
    total_cells: usize,
    pieces: Vec<Piece>,
}

pub fn run(args: PiecesArgs) -> Result<()> {
    let report = collect(&args)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{} pieces up to degree {} ({} cells per player)",
        report.pieces.len(),
        report.degree,
        report.total_cells
    );
    for piece in &report.pieces {
        println!();
        println!("size {} hash {:#x}", piece.size(), piece.hash());
        print!("{}", trim_drawing(&piece.to_string()));
    }
    Ok(())
}

fn collect(args: &PiecesArgs) -> Result<PiecesReport> {
    let generated = generate_piece_set(args.degree)?;
    let pieces = generated
        .pieces
        .sorted()
        .into_iter()
        .filter(|piece| args.size.map_or(true, |size| piece.size() == size))
        .collect();
    Ok(PiecesReport {
        degree: args.degree,
        total_cells: generated.total_cells,
        pieces,
    })
}

/// Drop the empty rows below a normalized piece
fn trim_drawing(drawing: &str) -> String {
    drawing
        .lines()
        .filter(|row| row.contains('#'))
        .map(|row| format!("{}\n", row.trim_end_matches('.')))
        .collect()
}
