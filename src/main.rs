use clap::Parser;
use panel_cut::types::{GrainDirection, Piece, Rect, Sheet};
use panel_cut::{OptimizationController, OptimizeOptions, RunStatus, stats};
use tracing::Level;

#[derive(Parser)]
#[command(
    name = "panel_cut",
    about = "Guillotine cutting optimizer for rectangular panels"
)]
struct Cli {
    /// Sheet dimensions (WxH, e.g. 2440x1220)
    #[arg(long)]
    sheet: String,

    /// Pieces as WxH:qty or WxH:qty:id (e.g. 800x600:3 400x300:5:shelf)
    #[arg(long = "pieces", num_args = 1..)]
    pieces: Vec<String>,

    /// Blade kerf width in mm
    #[arg(long, default_value_t = 0)]
    kerf: u32,

    /// Disable piece rotation
    #[arg(long)]
    no_rotate: bool,

    /// Sheet grain direction: none, width, or height
    #[arg(long, default_value = "none", value_parser = parse_grain)]
    grain: GrainArg,

    /// Time budget for the search in milliseconds
    #[arg(long, default_value_t = 2000)]
    time_limit_ms: u64,

    /// Stop after this many heuristic passes
    #[arg(long)]
    max_passes: Option<u32>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Log each pass to stderr
    #[arg(long)]
    verbose: bool,
}

#[derive(Clone, Copy)]
enum GrainArg {
    None,
    Width,
    Height,
}

impl GrainArg {
    fn direction(self) -> Option<GrainDirection> {
        match self {
            GrainArg::None => None,
            GrainArg::Width => Some(GrainDirection::Width),
            GrainArg::Height => Some(GrainDirection::Height),
        }
    }
}

fn parse_grain(s: &str) -> Result<GrainArg, String> {
    match s {
        "none" => Ok(GrainArg::None),
        "width" => Ok(GrainArg::Width),
        "height" => Ok(GrainArg::Height),
        _ => Err(format!(
            "invalid grain '{}', expected: none, width, or height",
            s
        )),
    }
}

fn parse_dimensions(s: &str) -> Result<Rect, String> {
    let (w, h) = s
        .split_once('x')
        .ok_or_else(|| format!("invalid dimensions '{}', expected WxH", s))?;
    let w = w
        .parse::<u32>()
        .map_err(|_| format!("invalid width in '{}'", s))?;
    let h = h
        .parse::<u32>()
        .map_err(|_| format!("invalid height in '{}'", s))?;
    Ok(Rect::new(w, h))
}

/// Zero sizes and quantities are left for the library to reject.
fn parse_piece(s: &str, index: usize, can_rotate: bool) -> Result<Piece, String> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return Err(format!("invalid piece '{}', expected WxH:qty[:id]", s));
    }
    let rect = parse_dimensions(parts[0])?;
    let qty = parts[1]
        .parse::<u32>()
        .map_err(|_| format!("invalid quantity in '{}'", s))?;
    let id = match parts.get(2) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => format!("p{}", index + 1),
    };
    Ok(Piece::new(id, rect.w, rect.h, qty).with_rotation(can_rotate))
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    let stock = parse_dimensions(&cli.sheet).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });
    let mut sheet = Sheet::new(stock.w, stock.h, cli.kerf);
    sheet.grain_direction = cli.grain.direction();

    let pieces: Vec<Piece> = cli
        .pieces
        .iter()
        .enumerate()
        .map(|(i, p)| parse_piece(p, i, !cli.no_rotate))
        .collect::<Result<Vec<_>, _>>()
        .unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        });

    let mut options = OptimizeOptions::new().with_time_limit_ms(cli.time_limit_ms);
    if let Some(n) = cli.max_passes {
        options = options.with_max_passes(n);
    }

    let result = OptimizationController::new(options)
        .optimize(&sheet, &pieces)
        .unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        });

    if cli.json {
        match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    for s in &result.stats {
        println!(
            "Sheet {} ({:.1}% used):",
            s.sheet_index + 1,
            s.efficiency
        );
        for p in result
            .placed_pieces
            .iter()
            .filter(|p| p.sheet_index == s.sheet_index)
        {
            let rot = if p.rotated { " [rotated]" } else { "" };
            println!(
                "  {}#{} {} @ ({}, {}){}",
                p.piece_id,
                p.instance + 1,
                p.rect(),
                p.x,
                p.y,
                rot
            );
        }
        println!();
    }

    if !result.unplaceable.is_empty() {
        println!("Not placed:");
        for u in &result.unplaceable {
            println!("  {}#{} ({:?})", u.piece_id, u.instance + 1, u.reason);
        }
        println!();
    }

    let count = result.sheet_count();
    let note = match (result.meta.status, result.meta.time_limited) {
        (RunStatus::Cancelled, _) => " (cancelled)",
        (_, true) => " (time limit reached)",
        _ => "",
    };
    println!(
        "Summary: {} sheet{} used, {:.1}% efficiency, {}/{} passes{}",
        count,
        if count == 1 { "" } else { "s" },
        stats::aggregate_efficiency(&sheet, &result.placed_pieces),
        result.meta.passes_completed,
        result.meta.planned_passes,
        note,
    );
}
