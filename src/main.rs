use std::path::Path;
use std::process;

use env_logger;
use transit_skims::{run, SkimConfig};


fn main() {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 2 {
        eprintln!("usage: {} <config.yaml>", args[0]);
        process::exit(1);
    }

    let config = match SkimConfig::from_file(Path::new(&args[1])) {
        Ok(config) => config,
        Err(err) => {
            log::error!("could not load config {}: {}", args[1], err);
            process::exit(1);
        }
    };
    match run(&config) {
        Ok(results) => log::info!("computed skims for {} zones on a graph of {} nodes",
                                  results.matrix.zones().len(), results.graph.num_nodes()),
        Err(err) => {
            log::error!("{}", err);
            process::exit(1);
        }
    }
}
