use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Default)]
#[command(
    name = "hyperframe",
    author,
    version,
    about = "Editorial 4D lattice renderer",
    arg_required_else_help = false
)]
pub struct Args {
    /// Configuration file; defaults to `hyperframe.toml` in the working directory.
    #[arg(long, value_name = "PATH", env = "HYPERFRAME_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the render resolution (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT")]
    pub size: Option<String>,

    /// Frame rate used for the headless clock (windowed mode follows vsync).
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f32>,

    /// Render against the recording context instead of opening a window.
    #[arg(long)]
    pub headless: bool,

    /// Number of frames to render in headless mode.
    #[arg(long, value_name = "N", default_value_t = 120)]
    pub frames: u64,

    /// Feed reading metrics from a simulated reader.
    #[arg(long)]
    pub simulate: bool,

    /// Seed for the simulated reader.
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Print the fragment shader for a geometry/projection pair and exit.
    #[arg(long, num_args = 2, value_names = ["GEOMETRY", "PROJECTION"])]
    pub print_shader: Option<Vec<String>>,

    /// Editorial section to start in (home, technology, science, culture, analysis).
    #[arg(long, value_name = "SECTION")]
    pub section: Option<String>,

    /// Editorial preset to apply after the section (minimal, immersive, analytical, energetic).
    #[arg(long, value_name = "NAME")]
    pub preset: Option<String>,

    /// Initial parameter patch as camelCase JSON, e.g. `{"morphFactor": 0.8}`.
    #[arg(long, value_name = "JSON")]
    pub params: Option<String>,

    /// Prefer a low-power GPU adapter.
    #[arg(long)]
    pub low_power: bool,
}

pub fn parse() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_headless_run() {
        let args = Args::try_parse_from([
            "hyperframe",
            "--headless",
            "--frames",
            "30",
            "--simulate",
            "--seed",
            "7",
            "--section",
            "science",
        ])
        .unwrap();
        assert!(args.headless);
        assert_eq!(args.frames, 30);
        assert_eq!(args.seed, Some(7));
        assert_eq!(args.section.as_deref(), Some("science"));
    }

    #[test]
    fn print_shader_takes_two_names() {
        let args =
            Args::try_parse_from(["hyperframe", "--print-shader", "hypersphere", "orthographic"])
                .unwrap();
        assert_eq!(
            args.print_shader,
            Some(vec!["hypersphere".to_string(), "orthographic".to_string()])
        );
        assert!(Args::try_parse_from(["hyperframe", "--print-shader", "hypercube"]).is_err());
    }

    #[test]
    fn frames_default_to_two_seconds() {
        let args = Args::try_parse_from(["hyperframe"]).unwrap();
        assert_eq!(args.frames, 120);
        assert!(!args.headless);
    }
}
