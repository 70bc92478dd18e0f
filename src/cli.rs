use rtpv::io::{read_wav_file, write_wav_file, SampleFormat, WavAudio};
use rtpv::{VocoderConfig, WindowShape};
use tracing_subscriber::EnvFilter;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 {
        print_usage();
        std::process::exit(1);
    }

    let input_path = &args[1];
    let output_path = &args[2];

    let mut ratio: f64 = 1.0;
    let mut block_len: usize = 1024;
    let mut window: Option<WindowShape> = None;
    let mut format = SampleFormat::Pcm16;
    let mut verbose = false;

    let mut i = 3;
    while i < args.len() {
        match args[i].as_str() {
            "--ratio" | "-r" => {
                i += 1;
                ratio = parse_value(&args, i, "ratio");
            }
            "--block" | "-b" => {
                i += 1;
                block_len = parse_value(&args, i, "block");
            }
            "--window" | "-w" => {
                i += 1;
                window = Some(parse_value(&args, i, "window"));
            }
            "--float" => format = SampleFormat::Float32,
            "--verbose" | "-v" => verbose = true,
            other => {
                eprintln!("ERROR: Unknown argument '{}'", other);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    init_logging(verbose);

    if !(ratio.is_finite() && ratio > 0.0) {
        eprintln!("ERROR: Ratio must be positive, got {}", ratio);
        std::process::exit(1);
    }

    let input = match read_wav_file(input_path) {
        Ok(audio) => audio,
        Err(e) => {
            eprintln!("ERROR: Failed to read {}: {}", input_path, e);
            std::process::exit(1);
        }
    };

    tracing::info!(
        frames = input.num_frames(),
        sample_rate = input.sample_rate,
        channels = input.num_channels(),
        "read {}",
        input_path
    );

    let config = build_config(ratio, block_len, window);
    if let Err(e) = config.validate() {
        eprintln!("ERROR: {}", e);
        std::process::exit(1);
    }

    let start = std::time::Instant::now();
    let channels = match rtpv::stretch(&input.channels, ratio, config) {
        Ok(channels) => channels,
        Err(e) => {
            eprintln!("ERROR: Stretching failed: {}", e);
            std::process::exit(1);
        }
    };
    let elapsed = start.elapsed().as_secs_f64();
    let output = WavAudio::new(channels, input.sample_rate);

    let input_secs = input.num_frames() as f64 / input.sample_rate.max(1) as f64;
    let realtime_factor = if elapsed > 0.0 {
        input_secs / elapsed
    } else {
        f64::INFINITY
    };
    tracing::info!(
        frames = output.num_frames(),
        ratio = output.num_frames() as f64 / input.num_frames().max(1) as f64,
        realtime_factor,
        "stretched in {:.3}s",
        elapsed
    );

    if let Err(e) = write_wav_file(output_path, &output, format) {
        eprintln!("ERROR: Failed to write {}: {}", output_path, e);
        std::process::exit(1);
    }

    tracing::info!("written to {}", output_path);
}

/// Default configuration sized for the requested ratio and block length.
fn build_config(ratio: f64, block_len: usize, window: Option<WindowShape>) -> VocoderConfig {
    let defaults = VocoderConfig::default();
    let max_stretch = ratio.max(defaults.max_stretch);
    let config = defaults
        .with_max_block_len(block_len)
        .with_max_stretch(max_stretch);
    match window {
        Some(shape) => config.with_window(shape),
        None => config,
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_usage() {
    eprintln!("Usage: rtpv <input.wav> <output.wav> [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --ratio, -r <f>    Stretch ratio (2.0 = twice as long, default: 1.0)");
    eprintln!("  --block, -b <N>    Frames per processing block (default: 1024)");
    eprintln!("  --window, -w <w>   Analysis window (hann, blackman, nuttall, ...)");
    eprintln!("  --float            Write 32-bit float output (default: 16-bit PCM)");
    eprintln!("  --verbose, -v      Log debug details (RUST_LOG overrides)");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  rtpv in.wav out.wav --ratio 1.5");
    eprintln!("  rtpv in.wav out.wav -r 0.8 --block 512 --window blackman --float");
}

fn parse_value<T>(args: &[String], idx: usize, name: &str) -> T
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    if idx >= args.len() {
        eprintln!("ERROR: --{} requires a value", name);
        std::process::exit(1);
    }
    match args[idx].parse() {
        Ok(v) => v,
        Err(e) => {
            eprintln!("ERROR: Invalid {} '{}': {}", name, args[idx], e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_config() {
        let config = build_config(2.0, 512, None);
        assert_eq!(config.max_block_len, 512);
        assert_eq!(config.max_stretch, 10.0);
        assert_eq!(config.window, WindowShape::Hann);

        let config = build_config(16.0, 1024, Some(WindowShape::Blackman));
        assert_eq!(config.max_stretch, 16.0);
        assert_eq!(config.window, WindowShape::Blackman);
        assert!(build_config(1.0, 0, None).validate().is_err());
    }

    #[test]
    fn test_parse_value() {
        let args: Vec<String> = ["rtpv", "a", "b", "--window", "sqrthann", "--ratio", "1.5"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(parse_value::<WindowShape>(&args, 4, "window"), WindowShape::SqrtHann);
        assert_eq!(parse_value::<f64>(&args, 6, "ratio"), 1.5);
        assert_eq!(parse_value::<usize>(&["64".to_string()], 0, "block"), 64);
    }
}
