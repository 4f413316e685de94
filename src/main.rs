use std::env;
use std::fs;
use std::io;
use std::path;
use std::process;

use log::{error, info, warn};

use quakecat::io::{open_file, to_quakeml, write_quakeml};

fn usage() -> ! {
    eprintln!("Usage: quakecat <input> [outfolder] [type-tag]");
    process::exit(2)
}

fn main() -> io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    let input = match args.get(1) {
        Some(input) => path::PathBuf::from(input),
        None => usage(),
    };
    let outfolder = path::PathBuf::from(args.get(2).map(|s| s.as_str()).unwrap_or("."));
    let file_type = args.get(3).map(|s| s.as_str());
    fs::create_dir_all(&outfolder)?;

    let (format, events) = open_file(&input)?;
    info!("Reading {} as {format}", input.display());

    let mut written = 0usize;
    let mut failed = 0usize;
    for event in events {
        let event = match event {
            Ok(event) => event,
            Err(e) => {
                warn!("Skipping record: {e}");
                failed += 1;
                continue;
            }
        };
        match to_quakeml(&event) {
            Ok(xml) => {
                let path = write_quakeml(&xml, &event.id, &outfolder, file_type)?;
                println!("{}", path.display());
                written += 1;
            }
            Err(e) => {
                error!("Failed to serialize event {}: {e}", event.id);
                failed += 1;
            }
        }
    }
    info!("Wrote {written} events, {failed} records failed");
    Ok(())
}
