//! Detect a face in an image file and print the region as JSON.
//!
//! Usage:
//!   cargo run --example find_face -- <model.json|detection.dat> <photo> [crop.jpg] [overlay.jpg]
//!
//! Prints `null` when no face is found. Set `RUST_LOG=facefind=debug` to see
//! the scan trace.

use facefind::{FaceFinder, FacePhoto};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 2 {
        eprintln!("usage: find_face <model> <photo> [crop.jpg] [overlay.jpg]");
        std::process::exit(2);
    }

    let model = std::fs::read(&args[0]).unwrap_or_else(|e| fail(&format!("{}: {e}", args[0])));
    let finder = FaceFinder::from_model_bytes(&model).unwrap_or_else(|e| fail(&e.to_string()));

    let input = std::fs::read(&args[1]).unwrap_or_else(|e| fail(&format!("{}: {e}", args[1])));
    let photo = FacePhoto::new(&input).unwrap_or_else(|e| fail(&e.to_string()));

    let Some(region) = photo.find_face(&finder).unwrap_or_else(|e| fail(&e.to_string())) else {
        println!("null");
        return;
    };
    println!("{}", region.to_json().unwrap_or_else(|e| fail(&e.to_string())));

    if let Some(path) = args.get(2) {
        let jpeg = photo.crop_jpeg(&region, 90).unwrap_or_else(|e| fail(&e.to_string()));
        std::fs::write(path, jpeg).unwrap_or_else(|e| fail(&format!("{path}: {e}")));
    }
    if let Some(path) = args.get(3) {
        let jpeg = photo.overlay_jpeg(&region, 90).unwrap_or_else(|e| fail(&e.to_string()));
        std::fs::write(path, jpeg).unwrap_or_else(|e| fail(&format!("{path}: {e}")));
    }
}

fn fail(message: &str) -> ! {
    eprintln!("error: {message}");
    std::process::exit(1);
}
