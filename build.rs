//! Generates the sub-board lookup tables consumed by `src/game/generated.rs`
//! and retrieves information about the version of the engine from Git and the
//! build environment.
//!
//! Every sub-board is a 9-bit mask, so all per-sub-board questions (is this a
//! win? which cells are free?) can be answered by indexing a 512-entry table.

use std::error::Error;
use std::fmt::Write;
use std::path::Path;
use std::{env, fs};

const CELLS: u32 = 9;
const TABLE_SIZE: u32 = 1 << CELLS;

const WINNING_LINES: [u32; 8] = [
    0b111_000_000,
    0b000_111_000,
    0b000_000_111,
    0b100_100_100,
    0b010_010_010,
    0b001_001_001,
    0b100_010_001,
    0b001_010_100,
];

fn generate_file(filename: &str, contents: &str) -> Result<(), Box<dyn Error>> {
    let out_dir = env::var_os("OUT_DIR").ok_or("OUT_DIR is not set")?;
    let dest_path = Path::new(&out_dir).join(filename);
    fs::write(dest_path, contents)?;
    Ok(())
}

// Cell 0 is the top-left corner and is stored in the most significant bit.
const fn cell_mask(cell: u32) -> u32 {
    1 << (CELLS - 1 - cell)
}

fn generate_winning() -> Result<(), Box<dyn Error>> {
    let mut result = String::new();
    result.push('[');
    for mask in 0..TABLE_SIZE {
        let won = WINNING_LINES.iter().any(|line| mask & line == *line);
        writeln!(result, "{won}, ")?;
    }
    result.push(']');
    generate_file("winning.rs", &result)
}

fn generate_free_cells() -> Result<(), Box<dyn Error>> {
    let mut result = String::new();
    result.push('[');
    for occupancy in 0..TABLE_SIZE {
        result.push_str("&[");
        for cell in 0..CELLS {
            let mask = cell_mask(cell);
            if occupancy & mask == 0 {
                write!(result, "Bitboard::from_bits({mask}), ")?;
            }
        }
        result.push_str("],\n");
    }
    result.push(']');
    generate_file("free_cells.rs", &result)
}

fn generate_build_info() -> Result<(), Box<dyn Error>> {
    let features = format!(
        "{}popcnt",
        if cfg!(target_feature = "popcnt") {
            "+"
        } else {
            "-"
        }
    );
    generate_file("features", &features)
}

fn main() -> Result<(), Box<dyn Error>> {
    println!("cargo:rerun-if-changed=build.rs");
    generate_winning()?;
    generate_free_cells()?;
    generate_build_info()?;
    shadow_rs::new().map_err(|e| e.to_string())?;
    Ok(())
}
