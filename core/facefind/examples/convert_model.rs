//! Convert a cascade model (PHP `serialize()` dump or JSON) to JSON.
//!
//! Usage:
//!   cargo run --example convert_model -- detection.dat detection.json

use facefind::CascadeModel;

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [input, output] = args.as_slice() else {
        eprintln!("usage: convert_model <input> <output.json>");
        std::process::exit(2);
    };

    let bytes = std::fs::read(input).expect("failed to read model");
    let model = CascadeModel::load(&bytes).expect("failed to load model");
    println!(
        "{} stages, {} trees, {} nodes",
        model.stages().len(),
        model.tree_count(),
        model.node_count()
    );
    let json = model.to_json().expect("failed to render model");
    std::fs::write(output, json).expect("failed to write output");
}
