use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;

use mintforge_core::{
    assemble, clear_dir, discover_assets, plan_strip, preview_repoint, repoint, scan_pairs,
    shuffle, shuffle_with, strip_extensions, verify_strip, Anomaly, AssembleSettings,
    CaptionLayout, CollectionLayout, PngCompositor, RepointSettings, Result, ShuffleSettings,
    StripSettings,
};

const PREVIEW_LIMIT: usize = 10;

#[derive(Debug, Parser)]
#[command(
    name = "mintforge",
    version,
    about = "NFT collection assembly and shuffle pipeline"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Composite character art onto tier borders and emit sequentially
    /// numbered image/metadata pairs.
    Assemble(AssembleArgs),
    /// Copy the assembled collection into a random reveal order.
    Shuffle(ShuffleArgs),
    /// Rewrite hosted-content locators onto a new base content id.
    Repoint(RepointArgs),
    /// Copy metadata records under bare-identifier names.
    Strip(StripArgs),
}

#[derive(Debug, Args)]
struct CommonArgs {
    /// Collection root holding IMAGES/, BORDER/, Final/ and Shuffled/.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Show a bounded sample of the planned work and exit.
    #[arg(long)]
    preview: bool,

    /// Delete the stage's output files and exit.
    #[arg(long)]
    clear: bool,

    /// Skip the confirmation prompt.
    #[arg(long)]
    yes: bool,
}

#[derive(Debug, Args)]
struct AssembleArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Metadata template, resolved against the root when relative.
    #[arg(long, default_value = "Template.json")]
    template: PathBuf,

    /// Name prefix the decimal identifier is appended to.
    #[arg(long, default_value = "HERO OF AFRICA #")]
    name_prefix: String,

    /// Locator base for image pointers, base content id included.
    #[arg(
        long,
        default_value = "https://ipfs.io/ipfs/bafybeiehwh5dv3wnrn3te7h4sx7gmuzymsi5pzhmfapovyxb2laj2qxche"
    )]
    locator_base: String,

    #[arg(long, default_value = "png")]
    image_ext: String,

    /// Caption at the top of the card.
    #[arg(long, default_value = "HERO OF AFRICA")]
    caption_title: String,

    /// Small caption inside the lower banner.
    #[arg(long, default_value = "TURRET")]
    caption_kicker: String,

    /// Role caption below the kicker.
    #[arg(long, default_value = "MACHINE-GUNNER")]
    caption_subtitle: String,
}

#[derive(Debug, Args)]
struct ShuffleArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Fix the permutation seed. Without it every run draws a fresh,
    /// non-repeatable reveal order.
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, default_value = "HERO OF AFRICA #")]
    name_prefix: String,

    #[arg(long, default_value = "png")]
    image_ext: String,
}

#[derive(Debug, Args)]
struct RepointArgs {
    /// Collection root holding IMAGES/, BORDER/, Final/ and Shuffled/.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Show a bounded sample of the planned rewrites and exit.
    #[arg(long)]
    preview: bool,

    /// Skip the confirmation prompt.
    #[arg(long)]
    yes: bool,

    /// New base content id to point image locators at.
    #[arg(long)]
    cid: String,
}

#[derive(Debug, Args)]
struct StripArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Check existing copies instead of writing new ones.
    #[arg(long)]
    verify: bool,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Assemble(args) => run_assemble(args),
        Command::Shuffle(args) => run_shuffle(args),
        Command::Repoint(args) => run_repoint(args),
        Command::Strip(args) => run_strip(args),
    };

    if let Err(err) = result {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}

fn run_assemble(args: AssembleArgs) -> Result<()> {
    let layout = CollectionLayout::new(&args.common.root);

    if args.common.clear {
        return clear_outputs(
            &[layout.assembled_images(), layout.assembled_metadata()],
            args.common.yes,
        );
    }

    if args.common.preview {
        let discovery = discover_assets(&layout.source_images(), &layout.borders());
        println!(
            "{} character image(s) across {} tier(s):",
            discovery.total_characters(),
            discovery.tiers.len()
        );
        for tier in &discovery.tiers {
            println!("  {}: {} image(s)", tier.tier, tier.characters.len());
        }
        print_anomalies(&discovery.anomalies);
        return Ok(());
    }

    if !confirm(
        "This will write the assembled collection under Final/",
        args.common.yes,
    ) {
        println!("Operation cancelled.");
        return Ok(());
    }

    let settings = AssembleSettings {
        images_root: layout.source_images(),
        border_root: layout.borders(),
        output_images: layout.assembled_images(),
        output_metadata: layout.assembled_metadata(),
        template_path: resolve(&args.common.root, args.template),
        name_prefix: args.name_prefix,
        locator_base: args.locator_base,
        image_extension: args.image_ext,
        captions: CaptionLayout::new(
            args.caption_title,
            args.caption_kicker,
            args.caption_subtitle,
        ),
    };
    let report = assemble(&settings, &PngCompositor)?;

    println!("Assembly complete.");
    for tally in &report.per_tier {
        println!(
            "  {}: {}/{} succeeded",
            tally.tier, tally.succeeded, tally.processed
        );
    }
    println!("Processed: {}", report.processed);
    println!("Images written: {}", report.images_written);
    println!("Metadata written: {}", report.metadata_written);
    println!("Failed: {}", report.failed);
    print_anomalies(&report.anomalies);
    Ok(())
}

fn run_shuffle(args: ShuffleArgs) -> Result<()> {
    let layout = CollectionLayout::new(&args.common.root);

    if args.common.clear {
        return clear_outputs(
            &[layout.shuffled_images(), layout.shuffled_metadata()],
            args.common.yes,
        );
    }

    if args.common.preview {
        let scan = scan_pairs(
            &layout.assembled_images(),
            &layout.assembled_metadata(),
            &args.image_ext,
        )?;
        println!("{} complete pair(s) ready to shuffle", scan.pairs.len());
        for id in scan.pairs.iter().take(PREVIEW_LIMIT) {
            println!("  {}.{} + {}.json", id, args.image_ext, id);
        }
        if scan.pairs.len() > PREVIEW_LIMIT {
            println!("  ... and {} more", scan.pairs.len() - PREVIEW_LIMIT);
        }
        print_anomalies(&scan.anomalies);
        return Ok(());
    }

    if !confirm(
        "This will copy and renumber all pairs into Shuffled/",
        args.common.yes,
    ) {
        println!("Operation cancelled.");
        return Ok(());
    }

    let settings = ShuffleSettings {
        source_images: layout.assembled_images(),
        source_metadata: layout.assembled_metadata(),
        output_images: layout.shuffled_images(),
        output_metadata: layout.shuffled_metadata(),
        name_prefix: args.name_prefix,
        image_extension: args.image_ext,
    };
    let report = match args.seed {
        Some(seed) => shuffle_with(&settings, &mut StdRng::seed_from_u64(seed))?,
        None => shuffle(&settings)?,
    };

    println!("Shuffle complete.");
    println!("Pairs: {}", report.pairs);
    println!("Shuffled: {}", report.shuffled);
    println!("Failed: {}", report.failed);
    print_anomalies(&report.anomalies);
    Ok(())
}

fn run_repoint(args: RepointArgs) -> Result<()> {
    let layout = CollectionLayout::new(&args.root);
    let settings = RepointSettings {
        metadata_dir: layout.shuffled_metadata(),
        new_base: args.cid,
    };

    if args.preview {
        let sample = preview_repoint(&settings, 5)?;
        println!("Planned rewrites (first {} shown):", sample.len());
        for (path, old, new) in sample {
            println!("  {}", path.display());
            println!("    OLD: {}", old);
            println!("    NEW: {}", new);
        }
        return Ok(());
    }

    if !confirm("This will modify all metadata records in place", args.yes) {
        println!("Operation cancelled.");
        return Ok(());
    }

    let report = repoint(&settings)?;
    println!("Locator update complete.");
    println!("Processed: {}", report.processed);
    println!("Updated: {}", report.updated);
    println!("Skipped: {}", report.skipped);
    println!("Failed: {}", report.failed);
    print_anomalies(&report.anomalies);
    Ok(())
}

fn run_strip(args: StripArgs) -> Result<()> {
    let layout = CollectionLayout::new(&args.common.root);
    let settings = StripSettings {
        source: layout.shuffled_metadata(),
        destination: layout.bare_metadata(),
    };

    if args.common.clear {
        return clear_outputs(&[settings.destination.clone()], args.common.yes);
    }

    if args.common.preview {
        let plan = plan_strip(&settings, None)?;
        println!("{} file(s) to copy:", plan.len());
        for (source, destination) in plan.iter().take(PREVIEW_LIMIT) {
            println!("  {} -> {}", source.display(), destination.display());
        }
        if plan.len() > PREVIEW_LIMIT {
            println!("  ... and {} more", plan.len() - PREVIEW_LIMIT);
        }
        return Ok(());
    }

    if args.verify {
        print_verify(&settings)?;
        return Ok(());
    }

    if !confirm(
        "This will copy all metadata records into Shuffled/NoJson",
        args.common.yes,
    ) {
        println!("Operation cancelled.");
        return Ok(());
    }

    let report = strip_extensions(&settings)?;
    println!("Copy complete.");
    println!("Copied: {}", report.copied);
    println!("Failed: {}", report.failed);
    print_anomalies(&report.anomalies);
    print_verify(&settings)?;
    Ok(())
}

fn print_verify(settings: &StripSettings) -> Result<()> {
    let report = verify_strip(settings)?;
    println!(
        "Verification: {} source / {} destination, {} matched, {} mismatched, {} missing -> {}",
        report.source_count,
        report.destination_count,
        report.matched,
        report.mismatched.len(),
        report.missing.len(),
        if report.is_clean() { "OK" } else { "MISMATCH" }
    );
    Ok(())
}

fn clear_outputs(dirs: &[PathBuf], yes: bool) -> Result<()> {
    if !confirm("This will delete previously generated output files", yes) {
        println!("Operation cancelled.");
        return Ok(());
    }
    for dir in dirs {
        let removed = clear_dir(dir)?;
        println!("Cleared {} file(s) from {}", removed, dir.display());
    }
    Ok(())
}

fn confirm(action: &str, skip: bool) -> bool {
    if skip {
        return true;
    }
    print!("{}. Continue? (yes/no): ", action);
    let _ = io::stdout().flush();
    let mut line = String::new();
    if io::stdin().read_line(&mut line).is_err() {
        return false;
    }
    line.trim().eq_ignore_ascii_case("yes")
}

fn resolve(root: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        root.join(path)
    }
}

fn print_anomalies(anomalies: &[Anomaly]) {
    if anomalies.is_empty() {
        return;
    }
    println!("{} issue(s):", anomalies.len());
    for anomaly in anomalies {
        println!("  - {}", anomaly);
    }
}
