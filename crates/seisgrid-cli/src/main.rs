use std::path::Path;
use std::str::FromStr;

use seisgrid_core::slice::{self, DataSource, ProfileResult, SliceContext, SurfaceKind};
use seisgrid_core::{
    Floors, GeoPoint, Lattice, MaterialProperty, PoissonForm, ToolkitConfig, VerticalRange,
};
use seisgrid_render::{RenderOptions, Scale, ScaleKind, ScaleOptions};
use tracing::debug;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Missing(&'static str),
    BadValue(String),
    Io(std::io::Error),
    Core(seisgrid_core::Error),
    Render(seisgrid_render::Error),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Missing(what) => write!(f, "missing required option: {what}"),
            CliError::BadValue(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Core(err) => write!(f, "{err}"),
            CliError::Render(err) => write!(f, "{err}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<seisgrid_core::Error> for CliError {
    fn from(value: seisgrid_core::Error) -> Self {
        Self::Core(value)
    }
}

impl From<seisgrid_render::Error> for CliError {
    fn from(value: seisgrid_render::Error) -> Self {
        Self::Render(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    HorizontalSlice,
    CrossSection,
    ElevationCrossSection,
    DepthProfile,
    HorizontalDifference,
    CrossDifference,
    Vs30Difference,
    Vs30Slice,
    ElevationSlice,
    BasinSlice,
    Models,
}

impl Command {
    fn default_outfile(&self) -> &'static str {
        match self {
            Command::HorizontalSlice => "horizontal_slice.png",
            Command::CrossSection => "cross_section.png",
            Command::ElevationCrossSection => "elevation_cross_section.png",
            Command::DepthProfile => "depth_profile.png",
            Command::HorizontalDifference => "horizontal_difference.png",
            Command::CrossDifference => "cross_difference.png",
            Command::Vs30Difference => "vs30_difference.png",
            Command::Vs30Slice => "vs30_slice.png",
            Command::ElevationSlice => "elevation_slice.png",
            Command::BasinSlice => "basin_slice.png",
            Command::Models => "",
        }
    }
}

#[derive(Debug)]
struct Args {
    command: Command,
    bottomleft: Option<(f64, f64)>,
    upperright: Option<(f64, f64)>,
    startingpoint: Option<(f64, f64)>,
    endingpoint: Option<(f64, f64)>,
    spacing: Option<f64>,
    hspacing: Option<f64>,
    vspacing: Option<f64>,
    depth: f64,
    elevation: Option<f64>,
    startingdepth: f64,
    endingdepth: Option<f64>,
    startingelevation: Option<f64>,
    endingelevation: Option<f64>,
    cvm: Option<String>,
    datatype: String,
    poisson_form: PoissonForm,
    scale: String,
    scalebounds: Option<(f64, f64)>,
    gate: Option<f64>,
    datafile: Option<String>,
    nx: Option<usize>,
    ny: Option<usize>,
    outfile: Option<String>,
    title: Option<String>,
    installdir: Option<String>,
    configfile: Option<String>,
    zrange: Option<(f64, f64)>,
    floors: Option<Floors>,
    debug: Option<String>,
    etree: bool,
    vs_threshold: f64,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            command: Command::Models,
            bottomleft: None,
            upperright: None,
            startingpoint: None,
            endingpoint: None,
            spacing: None,
            hspacing: None,
            vspacing: None,
            depth: 0.0,
            elevation: None,
            startingdepth: 0.0,
            endingdepth: None,
            startingelevation: None,
            endingelevation: None,
            cvm: None,
            datatype: "vs".to_string(),
            poisson_form: PoissonForm::default(),
            scale: "s".to_string(),
            scalebounds: None,
            gate: None,
            datafile: None,
            nx: None,
            ny: None,
            outfile: None,
            title: None,
            installdir: None,
            configfile: None,
            zrange: None,
            floors: None,
            debug: None,
            etree: false,
            vs_threshold: 1000.0,
        }
    }
}

fn usage() -> &'static str {
    "seisgrid-cli\n\
\n\
USAGE:\n\
  seisgrid-cli horizontal-slice --bottomleft <lat,lon> --upperright <lat,lon> --spacing <deg> --cvm <model> [--depth <m>|--elevation <m>] [options]\n\
  seisgrid-cli cross-section --startingpoint <lat,lon> --endingpoint <lat,lon> --startingdepth <m> --endingdepth <m> --hspacing <m> --vspacing <m> --cvm <model> [options]\n\
  seisgrid-cli elevation-cross-section --startingpoint <lat,lon> --endingpoint <lat,lon> --startingelevation <m> --endingelevation <m> --hspacing <m> --vspacing <m> --cvm <model> [options]\n\
  seisgrid-cli depth-profile --startingpoint <lat,lon> --startingdepth <m> --endingdepth <m> --vspacing <m> --cvm <model> [options]\n\
  seisgrid-cli horizontal-difference --bottomleft <lat,lon> --upperright <lat,lon> --spacing <deg> --datafile <a,b> [--debug <path>] [options]\n\
  seisgrid-cli cross-difference --startingpoint <lat,lon> --endingpoint <lat,lon> --startingdepth <m> --endingdepth <m> --hspacing <m> --vspacing <m> --datafile <a,b> [--debug <path>] [options]\n\
  seisgrid-cli vs30-difference --bottomleft <lat,lon> --upperright <lat,lon> --spacing <deg> --datafile <a,b> [--debug <path>] [options]\n\
  seisgrid-cli vs30-slice --bottomleft <lat,lon> --upperright <lat,lon> --spacing <deg> --cvm <model> [--etree] [options]\n\
  seisgrid-cli elevation-slice --bottomleft <lat,lon> --upperright <lat,lon> --spacing <deg> --cvm <model> [options]\n\
  seisgrid-cli basin-slice --bottomleft <lat,lon> --upperright <lat,lon> --spacing <deg> --cvm <model> [--vs-threshold <m/s>] [options]\n\
  seisgrid-cli models [--installdir <path>]\n\
\n\
OPTIONS:\n\
  --datatype vs|vp|density|poisson|qp|qs   property to plot (default vs)\n\
  --poisson simple|elastic                 poisson derivation form (default simple)\n\
  --scale s|s_r|sd|b|d|d_r|dd              colour scale (default s)\n\
  --scalebounds <min,max>                  explicit scale range\n\
  --gate <value>                           threshold for the b scale (default 2.5)\n\
  --datafile <path>                        reuse persisted grid data instead of querying\n\
  --nx <n> --ny <n>                        explicit lattice shape (both required together)\n\
  --outfile <path.png>                     plot output (data/meta siblings derive from it)\n\
  --title <text>                           plot title stored in the metadata\n\
  --installdir <path>                      toolkit install dir (default $UCVM_INSTALL_PATH)\n\
  --configfile <path>                      toolkit config (default <installdir>/conf/ucvm.conf)\n\
  --zrange <zmin,zmax>                     custom z-range passed to the query tool\n\
  --floors <vs,vp,density>                 floor values passed to the query tool\n\
\n\
  Point options take latitude,longitude. Coordinates are degrees; depths,\n\
  elevations and spacings along sections are meters.\n\
"
}

fn parse_pair(text: &str, flag: &str) -> Result<(f64, f64), CliError> {
    let mut it = text.split(',');
    let a = it.next().and_then(|s| s.trim().parse::<f64>().ok());
    let b = it.next().and_then(|s| s.trim().parse::<f64>().ok());
    match (a, b, it.next()) {
        (Some(a), Some(b), None) => Ok((a, b)),
        _ => Err(CliError::BadValue(format!(
            "{flag} expects two comma-separated numbers, got '{text}'"
        ))),
    }
}

fn parse_num<T: FromStr>(text: &str, flag: &str) -> Result<T, CliError> {
    text.trim()
        .parse::<T>()
        .map_err(|_| CliError::BadValue(format!("{flag} expects a number, got '{text}'")))
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut it = argv.iter().skip(1);
    let command = match it.next().map(String::as_str) {
        None | Some("--help") | Some("-h") => return Err(CliError::Usage(usage())),
        Some("horizontal-slice") => Command::HorizontalSlice,
        Some("cross-section") => Command::CrossSection,
        Some("elevation-cross-section") => Command::ElevationCrossSection,
        Some("depth-profile") => Command::DepthProfile,
        Some("horizontal-difference") => Command::HorizontalDifference,
        Some("cross-difference") => Command::CrossDifference,
        Some("vs30-difference") => Command::Vs30Difference,
        Some("vs30-slice") => Command::Vs30Slice,
        Some("elevation-slice") => Command::ElevationSlice,
        Some("basin-slice") => Command::BasinSlice,
        Some("models") => Command::Models,
        Some(_) => return Err(CliError::Usage(usage())),
    };
    let mut args = Args {
        command,
        ..Default::default()
    };

    while let Some(a) = it.next() {
        let mut value = |flag: &'static str| -> Result<&String, CliError> {
            it.next().ok_or(CliError::Missing(flag))
        };
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "--bottomleft" => args.bottomleft = Some(parse_pair(value("--bottomleft")?, "--bottomleft")?),
            "--upperright" => args.upperright = Some(parse_pair(value("--upperright")?, "--upperright")?),
            "--startingpoint" => {
                args.startingpoint = Some(parse_pair(value("--startingpoint")?, "--startingpoint")?)
            }
            "--endingpoint" => {
                args.endingpoint = Some(parse_pair(value("--endingpoint")?, "--endingpoint")?)
            }
            "--spacing" => args.spacing = Some(parse_num(value("--spacing")?, "--spacing")?),
            "--hspacing" => args.hspacing = Some(parse_num(value("--hspacing")?, "--hspacing")?),
            "--vspacing" => args.vspacing = Some(parse_num(value("--vspacing")?, "--vspacing")?),
            "--depth" => args.depth = parse_num(value("--depth")?, "--depth")?,
            "--elevation" => args.elevation = Some(parse_num(value("--elevation")?, "--elevation")?),
            "--startingdepth" => {
                args.startingdepth = parse_num(value("--startingdepth")?, "--startingdepth")?
            }
            "--endingdepth" => {
                args.endingdepth = Some(parse_num(value("--endingdepth")?, "--endingdepth")?)
            }
            "--startingelevation" => {
                args.startingelevation =
                    Some(parse_num(value("--startingelevation")?, "--startingelevation")?)
            }
            "--endingelevation" => {
                args.endingelevation =
                    Some(parse_num(value("--endingelevation")?, "--endingelevation")?)
            }
            "--cvm" => args.cvm = Some(value("--cvm")?.clone()),
            "--datatype" => args.datatype = value("--datatype")?.clone(),
            "--poisson" => {
                args.poisson_form = match value("--poisson")?.as_str() {
                    "simple" => PoissonForm::Simple,
                    "elastic" => PoissonForm::Elastic,
                    other => {
                        return Err(CliError::BadValue(format!(
                            "--poisson expects simple or elastic, got '{other}'"
                        )));
                    }
                }
            }
            "--scale" => args.scale = value("--scale")?.clone(),
            "--scalebounds" => {
                args.scalebounds = Some(parse_pair(value("--scalebounds")?, "--scalebounds")?)
            }
            "--gate" => args.gate = Some(parse_num(value("--gate")?, "--gate")?),
            "--datafile" => args.datafile = Some(value("--datafile")?.clone()),
            "--nx" => args.nx = Some(parse_num(value("--nx")?, "--nx")?),
            "--ny" => args.ny = Some(parse_num(value("--ny")?, "--ny")?),
            "--outfile" => args.outfile = Some(value("--outfile")?.clone()),
            "--title" => args.title = Some(value("--title")?.clone()),
            "--installdir" => args.installdir = Some(value("--installdir")?.clone()),
            "--configfile" => args.configfile = Some(value("--configfile")?.clone()),
            "--zrange" => args.zrange = Some(parse_pair(value("--zrange")?, "--zrange")?),
            "--floors" => {
                let text = value("--floors")?;
                let parts: Vec<f64> = text
                    .split(',')
                    .filter_map(|s| s.trim().parse::<f64>().ok())
                    .collect();
                let [vs, vp, density] = parts.as_slice() else {
                    return Err(CliError::BadValue(format!(
                        "--floors expects vs,vp,density, got '{text}'"
                    )));
                };
                args.floors = Some(Floors {
                    vs: *vs,
                    vp: *vp,
                    density: *density,
                });
            }
            "--debug" => args.debug = Some(value("--debug")?.clone()),
            "--etree" => args.etree = true,
            "--vs-threshold" => {
                args.vs_threshold = parse_num(value("--vs-threshold")?, "--vs-threshold")?
            }
            _ => return Err(CliError::Usage(usage())),
        }
    }
    if args.nx.is_some() != args.ny.is_some() {
        return Err(CliError::BadValue(
            "--nx and --ny must be given together".to_string(),
        ));
    }
    Ok(args)
}

fn toolkit(args: &Args) -> Result<ToolkitConfig, CliError> {
    // Env fallback happens exactly here; library code only sees the config.
    let installdir = match &args.installdir {
        Some(dir) => dir.clone(),
        None => std::env::var("UCVM_INSTALL_PATH")
            .map_err(|_| CliError::Missing("--installdir (or UCVM_INSTALL_PATH)"))?,
    };
    let mut config = ToolkitConfig::new(installdir);
    if let Some(file) = &args.configfile {
        config = config.with_config_file(file);
    }
    if let Some((zmin, zmax)) = args.zrange {
        config = config.with_z_range(zmin, zmax);
    }
    if let Some(floors) = args.floors {
        config = config.with_floors(floors);
    }
    Ok(config)
}

/// Corner flags come in as latitude,longitude; the lattice wants the
/// upper-left and bottom-right corners.
fn box_corners(args: &Args) -> Result<(GeoPoint, GeoPoint), CliError> {
    let (bl_lat, bl_lon) = args.bottomleft.ok_or(CliError::Missing("--bottomleft"))?;
    let (ur_lat, ur_lon) = args.upperright.ok_or(CliError::Missing("--upperright"))?;
    let (ul, br) = match args.elevation {
        Some(e) => (
            GeoPoint::at_elevation(bl_lon, ur_lat, e)?,
            GeoPoint::at_elevation(ur_lon, bl_lat, e)?,
        ),
        None => (
            GeoPoint::at_depth(bl_lon, ur_lat, args.depth)?,
            GeoPoint::at_depth(ur_lon, bl_lat, args.depth)?,
        ),
    };
    Ok((ul, br))
}

fn section_endpoints(args: &Args) -> Result<(GeoPoint, GeoPoint), CliError> {
    let (s_lat, s_lon) = args
        .startingpoint
        .ok_or(CliError::Missing("--startingpoint"))?;
    let (e_lat, e_lon) = args.endingpoint.ok_or(CliError::Missing("--endingpoint"))?;
    Ok((
        GeoPoint::at_depth(s_lon, s_lat, 0.0)?,
        GeoPoint::at_depth(e_lon, e_lat, 0.0)?,
    ))
}

fn spacing(args: &Args) -> Result<f64, CliError> {
    // Even with an explicit --nx/--ny shape the spacing still places the
    // lattice points and coordinate lists.
    args.spacing.ok_or(CliError::Missing("--spacing"))
}

fn steps(args: &Args) -> Option<(usize, usize)> {
    args.nx.zip(args.ny)
}

fn property(args: &Args) -> Result<MaterialProperty, CliError> {
    Ok(args.datatype.parse::<MaterialProperty>()?)
}

fn cvm(args: &Args) -> Result<&str, CliError> {
    args.cvm.as_deref().ok_or(CliError::Missing("--cvm"))
}

fn datafile_pair(args: &Args) -> Result<(DataSource, DataSource), CliError> {
    let text = args.datafile.as_deref().ok_or(CliError::Missing(
        "--datafile (two comma-separated paths for a difference plot)",
    ))?;
    let mut it = text.split(',');
    match (it.next(), it.next(), it.next()) {
        (Some(a), Some(b), None) if !a.is_empty() && !b.is_empty() => {
            Ok((DataSource::from_name(a), DataSource::from_name(b)))
        }
        _ => Err(CliError::BadValue(format!(
            "--datafile expects two comma-separated paths for a difference plot, got '{text}'"
        ))),
    }
}

fn build_scale(
    args: &Args,
    prop: MaterialProperty,
    difference: bool,
    min: f64,
    max: f64,
) -> Result<Scale, CliError> {
    let opts = ScaleOptions {
        kind: args.scale.parse::<ScaleKind>()?,
        scale_bounds: args.scalebounds,
        gate: args.gate,
        vp: prop == MaterialProperty::Vp,
        poisson: prop == MaterialProperty::Poisson,
        difference,
    };
    Ok(Scale::build(&opts, min, max)?)
}

/// Finalizes a populated slice: title, plot, and for freshly queried grids
/// the persisted data+metadata pair next to the plot.
fn finish_slice(
    args: &Args,
    mut result: slice::SliceResult,
    prop: MaterialProperty,
    difference: bool,
) -> Result<(), CliError> {
    let outfile = args
        .outfile
        .clone()
        .unwrap_or_else(|| args.command.default_outfile().to_string());
    if let Some(title) = &args.title {
        result.metadata.insert("title", title.clone());
    }

    let scale = build_scale(
        args,
        prop,
        difference,
        result.display.min(),
        result.display.max(),
    )?;
    seisgrid_render::save_plot(
        &result.display,
        &scale,
        &RenderOptions::default(),
        Path::new(&outfile),
    )?;

    // A slice fed from a datafile would only round-trip the same artifacts.
    if args.datafile.is_none() {
        result.save(&outfile)?;
    }
    println!("{outfile}");
    Ok(())
}

fn depth_range(args: &Args) -> Result<VerticalRange, CliError> {
    let end = args.endingdepth.ok_or(CliError::Missing("--endingdepth"))?;
    Ok(VerticalRange::Depth {
        start: args.startingdepth,
        end,
    })
}

fn elevation_range(args: &Args) -> Result<VerticalRange, CliError> {
    let start = args
        .startingelevation
        .ok_or(CliError::Missing("--startingelevation"))?;
    let end = args
        .endingelevation
        .ok_or(CliError::Missing("--endingelevation"))?;
    Ok(VerticalRange::Elevation { start, end })
}

fn print_profile(args: &Args, profile: &ProfileResult, prop: MaterialProperty) {
    let coords = profile.lattice.coords();
    let levels = if coords.depth_list.is_empty() {
        &coords.elevation_list
    } else {
        &coords.depth_list
    };
    let series = profile.series(prop, args.poisson_form);
    println!("# level_m {}", prop.name());
    for (level, v) in levels.iter().zip(&series) {
        println!("{level:>10.1} {v:>12.3}");
    }
}

fn run(args: Args) -> Result<(), CliError> {
    match args.command {
        Command::Models => {
            let config = toolkit(&args)?;
            for model in config.installed_models()? {
                match seisgrid_core::query::model_description(&model) {
                    Some(desc) => println!("{model}: {desc}"),
                    None => println!("{model}"),
                }
            }
            Ok(())
        }
        Command::HorizontalSlice => {
            let config = toolkit(&args)?;
            let prop = property(&args)?;
            let (ul, br) = box_corners(&args)?;
            let mut ctx = SliceContext::new(&config, cvm(&args)?)
                .with_property(prop)
                .with_poisson_form(args.poisson_form);
            if let Some(name) = &args.datafile {
                ctx = ctx.with_datafile(DataSource::from_name(name));
            }
            let result = slice::horizontal_slice(&ctx, &ul, &br, spacing(&args)?, steps(&args))?;
            finish_slice(&args, result, prop, false)
        }
        Command::CrossSection | Command::ElevationCrossSection => {
            let config = toolkit(&args)?;
            let prop = property(&args)?;
            let (start, end) = section_endpoints(&args)?;
            let range = if args.command == Command::CrossSection {
                depth_range(&args)?
            } else {
                elevation_range(&args)?
            };
            let hspacing = args.hspacing.ok_or(CliError::Missing("--hspacing"))?;
            let vspacing = args.vspacing.ok_or(CliError::Missing("--vspacing"))?;
            let mut ctx = SliceContext::new(&config, cvm(&args)?)
                .with_property(prop)
                .with_poisson_form(args.poisson_form);
            if let Some(name) = &args.datafile {
                ctx = ctx.with_datafile(DataSource::from_name(name));
            }
            let result = slice::cross_section(&ctx, &start, &end, hspacing, vspacing, range)?;
            finish_slice(&args, result, prop, false)
        }
        Command::DepthProfile => {
            let config = toolkit(&args)?;
            let prop = property(&args)?;
            let (s_lat, s_lon) = args
                .startingpoint
                .ok_or(CliError::Missing("--startingpoint"))?;
            let at = GeoPoint::at_depth(s_lon, s_lat, args.startingdepth)?;
            let vspacing = args.vspacing.ok_or(CliError::Missing("--vspacing"))?;
            let range = depth_range(&args)?;
            let profile = slice::depth_profile(&config, cvm(&args)?, &at, vspacing, range)?;
            if let Some(out) = &args.outfile {
                profile.save_matprops(out)?;
                profile.save_velocity(out)?;
            }
            print_profile(&args, &profile, prop);
            Ok(())
        }
        Command::HorizontalDifference | Command::Vs30Difference => {
            let prop = property(&args)?;
            let (ul, br) = box_corners(&args)?;
            let (a, b) = datafile_pair(&args)?;
            let lattice = Lattice::horizontal(&ul, &br, spacing(&args)?, steps(&args))?;
            let (result, _report) = slice::difference_slice(
                lattice,
                &a,
                &b,
                prop,
                args.debug.as_deref().map(Path::new),
            )?;
            finish_slice(&args, result, prop, true)
        }
        Command::CrossDifference => {
            let prop = property(&args)?;
            let (start, end) = section_endpoints(&args)?;
            let range = depth_range(&args)?;
            let hspacing = args.hspacing.ok_or(CliError::Missing("--hspacing"))?;
            let vspacing = args.vspacing.ok_or(CliError::Missing("--vspacing"))?;
            let (a, b) = datafile_pair(&args)?;
            let lattice = Lattice::cross_section(&start, &end, hspacing, vspacing, range)?;
            let (result, _report) = slice::difference_slice(
                lattice,
                &a,
                &b,
                prop,
                args.debug.as_deref().map(Path::new),
            )?;
            finish_slice(&args, result, prop, true)
        }
        Command::Vs30Slice | Command::ElevationSlice | Command::BasinSlice => {
            let config = toolkit(&args)?;
            let (ul, br) = box_corners(&args)?;
            let kind = match args.command {
                Command::Vs30Slice if args.etree => SurfaceKind::Vs30Etree,
                Command::Vs30Slice => SurfaceKind::Vs30,
                Command::ElevationSlice => SurfaceKind::ElevationEtree,
                _ => SurfaceKind::BasinDepth {
                    vs_threshold: args.vs_threshold,
                },
            };
            let result = slice::surface_slice(
                &config,
                cvm(&args)?,
                kind,
                &ul,
                &br,
                spacing(&args)?,
                steps(&args),
            )?;
            finish_slice(&args, result, MaterialProperty::Vs, false)
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };
    debug!(?args.command, "parsed arguments");

    match run(args) {
        Ok(()) => {}
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}
