use anyhow::Result;
use renderer::{run_window, HeadlessProgram, ShaderManager, WindowConfig};
use tracing_subscriber::EnvFilter;

use crate::bootstrap::{load_config, parse_program_key, resolve_launch};
use crate::cli::Args;
use crate::headless::run_headless;
use crate::window::FrameWindow;

pub fn run(args: Args) -> Result<()> {
    initialise_tracing();

    if let Some(names) = &args.print_shader {
        let key = parse_program_key(names)?;
        let shaders = ShaderManager::<HeadlessProgram>::new();
        println!("{}", shaders.fragment_source(key));
        return Ok(());
    }

    let config = load_config(&args)?;
    let plan = resolve_launch(&args, &config)?;

    if args.headless {
        tracing::info!(frames = args.frames, size = %plan.size, "starting headless run");
        let summary = run_headless(&plan, args.frames)?;
        println!("{summary}");
        return Ok(());
    }

    tracing::info!(size = %plan.size, title = %plan.title, "opening hyperframe window");
    let window = WindowConfig {
        title: plan.title.clone(),
        size: plan.size,
        visible: true,
    };
    run_window(&window, FrameWindow::new(plan))
}

fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
