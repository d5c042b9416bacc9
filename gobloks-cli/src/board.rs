//! Board command - lay out a fresh board and report opening mobility

use anyhow::Result;
use clap::Args;

use gobloks_core::{generate_piece_set, search, Board, PlayerId};

#[derive(Args)]
pub struct BoardArgs {
    /// Number of players
    #[arg(long, default_value = "4")]
    pub players: u16,

    /// Largest piece size in each inventory
    #[arg(long, default_value = "5")]
    pub degree: usize,

    /// Board tightening factor; higher packs players closer
    #[arg(long, default_value = "1.0")]
    pub density: f64,

    /// Also count every legal opening placement per player
    #[arg(long)]
    pub mobility: bool,
}

pub fn run(args: BoardArgs) -> Result<()> {
    let pids: Vec<PlayerId> = (1..=args.players).collect();
    let generated = generate_piece_set(args.degree)?;
    let board = Board::new(&pids, generated.total_cells, args.density)?;

    println!(
        "radius {} ({}x{}), {} cells per player",
        board.radius(),
        board.diameter(),
        board.diameter(),
        generated.total_cells
    );
    print!("{}", board);

    for pid in pids {
        let Some(origin) = board.origin(pid) else {
            continue;
        };
        if args.mobility {
            let moves = search(&board, pid, &generated.pieces, false).len();
            println!("player {:>2} origin {} openings {}", pid, origin, moves);
        } else {
            println!("player {:>2} origin {}", pid, origin);
        }
    }
    Ok(())
}
