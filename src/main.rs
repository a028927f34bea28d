use clap::Parser;
use pt2npz::convert;
use std::path::Path;

#[derive(Parser, Debug)]
#[command(
    version,
    about,
    long_about = "Binary that converts SMPL parameters from a torch .pt container to an AMASS-style .npz archive, rotating the motion from Y-up to Z-up"
)]
struct Args {
    /// Input .pt file path
    #[arg(short, long)]
    input: String,
    /// Output .npz file path
    #[arg(short, long)]
    output: String,
    /// Initial Z height of the root at frame 0, in meters
    #[arg(short = 'H', long, default_value_t = 0.92)]
    height: f32,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    match convert(Path::new(&args.input), Path::new(&args.output), args.height) {
        Ok(summary) => {
            println!(
                "[SAVE] converted {} frames ({} betas) -> {}",
                summary.num_frames,
                summary.num_betas,
                summary.output.display()
            );
        }
        Err(e) => {
            eprintln!("[ERROR] {e}");
            std::process::exit(1);
        }
    }
}
