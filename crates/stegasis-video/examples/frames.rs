//! Decode a directory of video frames and report their coefficient capacity.
//!
//! Usage: cargo run -p stegasis-video --example frames -- <frames-dir> [concurrency]
//!
//! With a third argument `touch` the least significant bit of the first AC
//! coefficient in every frame is flipped and the frames are written back.

use std::env;
use std::process;

use stegasis_video::{Codec, MotionJpegCodec, MotionJpegCodecOptions, DEFAULT_CONCURRENCY};

fn main() {
    env_logger::init();
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args.len() > 4 {
        eprintln!("Usage: {} <frames-dir> [concurrency] [touch]", args[0]);
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  frames-dir   - Directory with image-0.jpeg, image-1.jpeg, ...");
        eprintln!("  concurrency  - Frames decoded in parallel (default {DEFAULT_CONCURRENCY})");
        eprintln!("  touch        - Flip one bit per frame and write the frames back");
        process::exit(1);
    }

    let concurrency = match args.get(2).map(|c| c.parse::<usize>()) {
        None => DEFAULT_CONCURRENCY,
        Some(Ok(c)) => c,
        Some(Err(e)) => {
            eprintln!("Error: invalid concurrency {:?}: {}", args[2], e);
            process::exit(1);
        }
    };
    let touch = args.get(3).is_some_and(|a| a == "touch");

    let options = MotionJpegCodecOptions::default().with_concurrency(concurrency);
    let mut codec = MotionJpegCodec::new(&args[1], options);

    if let Err(e) = codec.decode() {
        eprintln!("Error decoding frames: {}", e);
        process::exit(1);
    }

    println!("Frames: {}", codec.frames());
    println!("Coefficients: {}", codec.capacity());

    if touch {
        for i in 0..codec.frames() {
            let flipped = codec.get_frame_mut(i).and_then(|frame| {
                let value = frame.get_element(1)?;
                frame.set_element(1, value ^ 1)?;
                Ok(())
            });
            if let Err(e) = flipped {
                eprintln!("Error modifying frame {}: {}", i, e);
                process::exit(1);
            }
        }
        if let Err(e) = codec.encode() {
            eprintln!("Error encoding frames: {}", e);
            process::exit(1);
        }
        println!("Rewrote {} frames", codec.frames());
    }

    if let Err(e) = codec.close() {
        eprintln!("Error closing codec: {}", e);
        process::exit(1);
    }
}
