use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Parser)]
#[command(name = "xtask", about = "Workspace automation for orbitview")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all checks: fmt, clippy, tests, doc
    Check,
    /// Run cargo fmt --check on all crates
    Fmt,
    /// Run clippy on all crates
    Clippy,
    /// Run all tests
    Test,
    /// Build rustdoc for the workspace
    Doc,
    /// Build the entire workspace
    Build,
    /// Write a sample 3d-model.obj / 3d-model.mtl pair for the viewer
    SampleAssets {
        /// Output directory
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check => {
            cargo("fmt", &["fmt", "--all", "--", "--check"])?;
            run_clippy()?;
            cargo("test", &["test", "--workspace"])?;
            cargo("doc", &["doc", "--workspace", "--no-deps"])?;
        }
        Commands::Fmt => cargo("fmt", &["fmt", "--all", "--", "--check"])?,
        Commands::Clippy => run_clippy()?,
        Commands::Test => cargo("test", &["test", "--workspace"])?,
        Commands::Doc => cargo("doc", &["doc", "--workspace", "--no-deps"])?,
        Commands::Build => cargo("build", &["build", "--workspace"])?,
        Commands::SampleAssets { out } => write_sample_assets(&out)?,
    }

    Ok(())
}

fn cargo(step: &str, args: &[&str]) -> Result<()> {
    println!("==> Running cargo {}", args.join(" "));
    let status = Command::new("cargo").args(args).status()?;
    if !status.success() {
        anyhow::bail!("cargo {step} failed");
    }
    Ok(())
}

fn run_clippy() -> Result<()> {
    cargo(
        "clippy",
        &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
    )
}

/// A two-tier stepped block: a wide base with a smaller cap on top.
fn write_sample_assets(out: &Path) -> Result<()> {
    std::fs::create_dir_all(out).with_context(|| format!("creating {}", out.display()))?;

    let mut obj = String::from("# orbitview sample model\nmtllib 3d-model.mtl\n");
    let mut base_index = 1;
    for (name, material, min, max) in [
        ("base", "stone", [-4.0, 0.0, -4.0], [4.0, 3.0, 4.0]),
        ("cap", "roof", [-2.0, 3.0, -2.0], [2.0, 6.0, 2.0]),
    ] {
        write_box(&mut obj, name, material, min, max, base_index);
        base_index += 8;
    }

    let mtl = "\
newmtl stone
Ka 0.1 0.1 0.1
Kd 0.62 0.58 0.52
Ks 0.05 0.05 0.05
Ns 10

newmtl roof
Ka 0.1 0.1 0.1
Kd 0.55 0.18 0.12
Ks 0.2 0.2 0.2
Ns 40
";

    let obj_path = out.join("3d-model.obj");
    let mtl_path = out.join("3d-model.mtl");
    std::fs::write(&obj_path, obj).with_context(|| format!("writing {}", obj_path.display()))?;
    std::fs::write(&mtl_path, mtl).with_context(|| format!("writing {}", mtl_path.display()))?;

    println!("wrote {} and {}", obj_path.display(), mtl_path.display());
    Ok(())
}

fn write_box(out: &mut String, name: &str, material: &str, min: [f32; 3], max: [f32; 3], first: u32) {
    let [x0, y0, z0] = min;
    let [x1, y1, z1] = max;

    // writing to a String cannot fail
    let _ = writeln!(out, "o {name}\nusemtl {material}");
    for (x, y, z) in [
        (x0, y0, z0),
        (x1, y0, z0),
        (x1, y1, z0),
        (x0, y1, z0),
        (x0, y0, z1),
        (x1, y0, z1),
        (x1, y1, z1),
        (x0, y1, z1),
    ] {
        let _ = writeln!(out, "v {x} {y} {z}");
    }
    // counter-clockwise quads seen from outside
    for [a, b, c, d] in [
        [0, 3, 2, 1],
        [4, 5, 6, 7],
        [0, 1, 5, 4],
        [3, 7, 6, 2],
        [0, 4, 7, 3],
        [1, 2, 6, 5],
    ] {
        let _ = writeln!(
            out,
            "f {} {} {} {}",
            first + a,
            first + b,
            first + c,
            first + d
        );
    }
}
