//! Fastpack CLI
//!
//! Pack the textures of a scene bundle into per-group atlases.

use clap::{Parser, Subcommand};
use fastpack::{load_scene, FastpackError, ObjectId, PackSession, PackerConfig, Scene};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "fastpack")]
#[command(author, version, about = "Pack material textures into atlases", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover, pack and composite atlases, then write the rewritten scene
    Pack {
        /// Scene bundle (ZIP, directory containing scene.json, or a .json scene)
        #[arg(short, long)]
        scene: PathBuf,

        /// Directory for atlas images (default: next to the scene)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Atlas side length at group scale 1
        #[arg(long, default_value = "4096")]
        max_res: u32,

        /// Socket group overrides as SOCKET=ID (e.g., "Normal=0")
        #[arg(short, long, value_parser = parse_group)]
        group: Vec<(String, u32)>,

        /// Extra node kinds to treat as opaque roots
        #[arg(short, long)]
        blacklist: Vec<String>,

        /// Only pack these objects (default: all)
        #[arg(long)]
        objects: Vec<String>,
    },

    /// Show discovered images, sub-UV sets and socket groups
    Inspect {
        /// Scene bundle (ZIP, directory containing scene.json, or a .json scene)
        #[arg(short, long)]
        scene: PathBuf,

        /// Extra node kinds to treat as opaque roots
        #[arg(short, long)]
        blacklist: Vec<String>,

        /// Only inspect these objects (default: all)
        #[arg(long)]
        objects: Vec<String>,
    },
}

fn parse_group(s: &str) -> Result<(String, u32), String> {
    let (socket, id) = s
        .rsplit_once('=')
        .ok_or_else(|| format!("Invalid group format: '{}'. Use SOCKET=ID", s))?;
    let id = id
        .trim()
        .parse()
        .map_err(|_| format!("Invalid group id in '{}'", s))?;
    Ok((socket.trim().to_string(), id))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Pack {
            scene,
            output,
            max_res,
            group,
            blacklist,
            objects,
        } => {
            let output = output.unwrap_or_else(|| scene_dir(&scene).to_path_buf());
            let config = PackerConfig::default()
                .with_max_resolution(max_res)
                .with_output_dir(output)
                .with_blacklist(blacklist);
            pack(&scene, &config, &group, &objects)?;
        }
        Commands::Inspect {
            scene,
            blacklist,
            objects,
        } => {
            let config = PackerConfig::default().with_blacklist(blacklist);
            inspect(&scene, &config, &objects)?;
        }
    }

    Ok(())
}

fn select_objects(scene: &Scene, names: &[String]) -> fastpack::Result<Vec<ObjectId>> {
    if names.is_empty() {
        return Ok(scene.object_ids());
    }
    names
        .iter()
        .map(|name| {
            scene
                .find_object(name)
                .ok_or_else(|| FastpackError::UnknownObject(name.clone()))
        })
        .collect()
}

fn pack(
    scene_path: &Path,
    config: &PackerConfig,
    groups: &[(String, u32)],
    object_names: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Loading scene from {:?}...", scene_path);
    let mut scene = load_scene(scene_path)?;
    let objects = select_objects(&scene, object_names)?;

    let mut session = PackSession::refresh(&scene, &objects, &config.node_blacklist)?;
    for (socket, id) in groups {
        session.set_group(socket, *id)?;
    }

    println!("Packing with config:");
    println!("  - Max resolution: {}", config.max_resolution);
    println!("  - Output: {:?}", config.output_dir);
    for assignment in session.groups() {
        println!("  - {} -> group {}", assignment.socket, assignment.group);
    }

    let report = session.build(&mut scene, config)?;

    for atlas in &report.atlases {
        match &atlas.path {
            Some(path) => println!(
                "Atlas {} ({}x{}) -> {:?}",
                atlas.name, atlas.width, atlas.height, path
            ),
            None => println!("Atlas {} ({}x{})", atlas.name, atlas.width, atlas.height),
        }
    }
    println!(
        "  {} sets packed, {} UVs rewritten, {} nodes repointed",
        report.packed_sets, report.uv_edits, report.swapped_nodes
    );

    let baked = baked_path(scene_path);
    scene.save_json(&baked)?;
    println!("Wrote scene to {:?}", baked);

    Ok(())
}

fn inspect(
    scene_path: &Path,
    config: &PackerConfig,
    object_names: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let scene = load_scene(scene_path)?;
    let objects = select_objects(&scene, object_names)?;
    let session = PackSession::refresh(&scene, &objects, &config.node_blacklist)?;

    println!("\nScene Info:");
    println!("  Objects: {}", objects.len());
    println!("  Materials: {}", scene.materials.len());
    println!("  Images: {}", scene.images.len());

    println!("\nImages to pack:");
    for entry in session.entries() {
        println!(
            "  {} {}x{} set={} socket={} interpolation={}",
            entry.image,
            entry.width,
            entry.height,
            entry.sub_uv,
            entry.socket,
            entry.interpolation.name()
        );
    }

    println!("\nSub-UV sets:");
    for (i, set) in session.sub_uv_sets().iter().enumerate() {
        let owners: BTreeSet<&str> = set
            .references
            .iter()
            .filter_map(|r| scene.object(r.object).ok().map(|o| o.name.as_str()))
            .collect();
        println!("  #{}: {} loops over {:?}", i, set.loop_count(), owners);
    }

    println!("\nGroups:");
    for assignment in session.groups() {
        println!("  {} -> {}", assignment.socket, assignment.group);
    }

    for skipped in session.registry().skipped() {
        println!(
            "Skipped object #{} slot {}: {}",
            skipped.object.0, skipped.slot, skipped.reason
        );
    }

    Ok(())
}

/// Directory holding the input scene.
fn scene_dir(scene_path: &Path) -> &Path {
    scene_path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// `<dir>/<stem>_baked.json` next to the input scene.
fn baked_path(scene_path: &Path) -> PathBuf {
    let stem = scene_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "scene".to_string());
    scene_dir(scene_path).join(format!("{}_baked.json", stem))
}
