/// meshmend terminal viewer
///
/// Loads a mesh payload or packaged scene, reports what the ingestion
/// pipeline decided, and shows the result as shaded ASCII.
/// Controls:
///   - WASD / Arrow Keys: Orbit
///   - +/-: Zoom
///   - n/i/y/x/c: Recompute normals, rebase indices, swap Y/Z, flip X, center
///   - Space: Toggle auto-rotation
///   - Q/ESC: Quit
use clap::{Parser, ValueEnum};
use log::info;
use meshmend_core::{Format, LoadFailure, RepairOp, Session};
use meshmend_terminal::{AppOptions, TerminalApp};
use std::io;
use std::path::PathBuf;

/// Unit cube shown when no file is given, as a 0-based JSON payload.
const DEFAULT_CUBE: &str = r#"{
    "positions": [
        -1, -1, -1,   1, -1, -1,   1,  1, -1,  -1,  1, -1,
        -1, -1,  1,   1, -1,  1,   1,  1,  1,  -1,  1,  1
    ],
    "indices": [
        0, 2, 1,  0, 3, 2,
        4, 5, 6,  4, 6, 7,
        0, 1, 5,  0, 5, 4,
        2, 3, 7,  2, 7, 6,
        1, 2, 6,  1, 6, 5,
        0, 4, 7,  0, 7, 3
    ]
}"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    /// Detect from the file contents
    Auto,
    Json,
    #[value(alias = "glb")]
    Gltf,
    Stl,
}

impl FormatArg {
    fn format(self) -> Option<Format> {
        match self {
            FormatArg::Auto => None,
            FormatArg::Json => Some(Format::Json),
            FormatArg::Gltf => Some(Format::Gltf),
            FormatArg::Stl => Some(Format::Stl),
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "meshmend-terminal", version, about = "Inspect and repair meshes in the terminal")]
struct Args {
    /// Mesh file (JSON payload, glTF/GLB or STL); a cube is shown when omitted
    path: Option<PathBuf>,

    /// Input format
    #[arg(long, value_enum, default_value_t = FormatArg::Auto)]
    format: FormatArg,

    /// Frame rate cap
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Start spinning
    #[arg(long)]
    auto_rotate: bool,

    /// Apply a repair before viewing (recompute-normals, rebase-indices,
    /// swap-yz, flip-x, center-zoom); may be repeated
    #[arg(long = "repair", value_name = "NAME")]
    repairs: Vec<RepairOp>,

    /// Print the diagnostics and exit without opening the viewer
    #[arg(long)]
    check: bool,
}

fn main() -> io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("off")).init();
    let args = Args::parse();

    println!("meshmend - Loading...");
    let bytes = match &args.path {
        Some(path) => std::fs::read(path).map_err(|e| {
            let failure = LoadFailure::transport(format!("{}: {e}", path.display()));
            print_report(&failure.report.status_lines(usize::MAX));
            io::Error::new(e.kind(), failure)
        })?,
        None => DEFAULT_CUBE.as_bytes().to_vec(),
    };

    let mut session = match Session::load(&bytes, args.format.format(), 80, 48) {
        Ok(session) => session,
        Err(failure) => {
            print_report(&failure.report.status_lines(usize::MAX));
            return Err(io::Error::new(io::ErrorKind::InvalidData, failure));
        }
    };
    for op in &args.repairs {
        let outcome = session.apply(*op);
        info!("{op}: {}", outcome.message());
    }

    if args.check {
        print_report(&session.status_lines(usize::MAX));
        return Ok(());
    }

    println!("Starting viewer (press Q to quit)...");
    let mut app = TerminalApp::new(
        session,
        AppOptions {
            fps: args.fps,
            auto_rotate: args.auto_rotate,
        },
    )?;
    app.run()?;

    print_report(&app.session().status_lines(usize::MAX));
    Ok(())
}

fn print_report(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}
