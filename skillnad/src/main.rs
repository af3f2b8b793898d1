//! Compare two builds of a font.
//!
//! Differences are written to stdout as JSON, one object per category.

use std::path::PathBuf;

use clap::Parser;
use skillnad::{
    settings::parse_axis_setting, Category, DiffError, DiffSettings, FontDiff, FontSnapshot,
    ShapeMode,
};
use skrifa::raw::types::Tag;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The font before the change.
    before: PathBuf,

    /// The font after the change.
    after: PathBuf,

    /// Comma separated categories to compare, `*` for all of them
    #[arg(short, long, value_delimiter = ',', default_value = "*")]
    categories: Vec<String>,

    /// Ignore kerning changes up to this many units
    #[arg(long, default_value_t = 2.0)]
    kern_threshold: f64,

    #[arg(long, default_value_t = 4.0)]
    marks_threshold: f64,

    #[arg(long, default_value_t = 4.0)]
    mkmks_threshold: f64,

    #[arg(long, default_value_t = 1.0)]
    metrics_threshold: f64,

    #[arg(long, default_value_t = 0.0)]
    glyphs_threshold: f64,

    /// Compare values verbatim when the units per em differ
    #[arg(long)]
    no_scale_upm: bool,

    /// Compare rendered glyphs instead of outline areas
    #[arg(long)]
    render: bool,

    /// Pixels per em when rendering
    #[arg(long, default_value_t = 64.0)]
    render_ppem: f32,

    /// Named instance to select in variable fonts, e.g. "Bold"
    #[arg(short, long)]
    instance: Option<String>,

    /// Axis location for variable fonts, as tag=value (repeatable)
    #[arg(long = "axis", value_parser = parse_axis_setting)]
    axes: Vec<(Tag, f32)>,

    /// Instantiate a variable font at the weight of the other, static, font
    #[arg(long)]
    match_static: bool,
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), DiffError> {
    let settings = DiffSettings {
        kern_threshold: args.kern_threshold,
        marks_threshold: args.marks_threshold,
        mkmks_threshold: args.mkmks_threshold,
        metrics_threshold: args.metrics_threshold,
        glyphs_threshold: args.glyphs_threshold,
        scale_upm: !args.no_scale_upm,
        shape_mode: if args.render {
            ShapeMode::Render
        } else {
            ShapeMode::Area
        },
        render_ppem: args.render_ppem,
        categories: Category::parse_list(&args.categories)?,
    };

    let mut before = FontSnapshot::open(&args.before)?;
    let mut after = FontSnapshot::open(&args.after)?;
    for snapshot in [&mut before, &mut after] {
        if !snapshot.is_variable() {
            continue;
        }
        if let Some(instance) = &args.instance {
            snapshot.set_instance(instance)?;
        } else if !args.axes.is_empty() {
            snapshot.set_variations(&args.axes)?;
        }
    }
    if args.match_static {
        match (before.is_variable(), after.is_variable()) {
            (true, false) => before.set_variations_from_static(&after)?,
            (false, true) => after.set_variations_from_static(&before)?,
            _ => log::warn!("--match-static needs exactly one variable font"),
        }
    }

    let diff = FontDiff::new(&before, &after, &settings)?;
    let stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(stdout, &diff)
        .map_err(|e| DiffError::Io {
            path: "<stdout>".into(),
            source: e.into(),
        })?;
    println!();
    Ok(())
}
