//! `evac`: command-line front end for the evacuation routing engine.
//!
//! Networks are read from `{data_dir}/{area}/{mode}/` (see
//! `evac_network::loader`).  Results are printed to stdout as GeoJSON or
//! JSON; logs go to stderr, filtered by `RUST_LOG` (default `info`).
//!
//! Run with:
//!   cargo run -p evac-cli --release -- --data-dir data route \
//!       --area delta --mode car --from 4.47,51.92 --to 4.52,51.90

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use evac_core::{LonLat, ModeCosts, RoutingConfig};
use evac_network::{FileNetworkLoader, SourceNode};
use evac_route::{DEFAULT_ID_FIELD, RouteCalculator, RouteRequest, range_edges_to_geojson};

#[derive(Parser)]
#[command(name = "evac", version, about = "Multi-modal evacuation routing")]
struct Cli {
    /// Routing configuration (JSON).  Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Network data directory; overrides the configuration's `data_dir`.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct NetworkArgs {
    #[arg(long)]
    area: String,

    #[arg(long)]
    mode: String,
}

#[derive(Subcommand)]
enum Command {
    /// Route between two coordinates.
    Route {
        #[command(flatten)]
        network: NetworkArgs,

        /// Start point as `lon,lat`.
        #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
        from: LonLat,

        /// End point as `lon,lat`.
        #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
        to: LonLat,

        /// Snapping tolerance in metres.
        #[arg(long)]
        max_distance: Option<f64>,

        /// Per-mode cost weighting (JSON file).
        #[arg(long)]
        mode_costs: Option<PathBuf>,

        /// Edges to make impassable before routing, comma-separated.
        #[arg(long, value_delimiter = ',')]
        disable: Vec<String>,

        /// Edge property the `--disable` ids refer to.
        #[arg(long, default_value = DEFAULT_ID_FIELD)]
        id_field: String,
    },

    /// Edges reachable within a cost bound from the network point nearest
    /// to a coordinate.
    Range {
        #[command(flatten)]
        network: NetworkArgs,

        /// Centre point as `lon,lat`.
        #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
        at: LonLat,

        #[arg(long)]
        max_cost: f64,
    },

    /// Nodes reachable within a cost bound from one or more nodes.
    Nodes {
        #[command(flatten)]
        network: NetworkArgs,

        /// Source node as `id` or `id:initial_cost`; repeatable.
        #[arg(long = "source", value_parser = parse_source, required = true)]
        sources: Vec<SourceNode>,

        #[arg(long)]
        max_cost: f64,

        /// Per-mode cost weighting (JSON file).
        #[arg(long)]
        mode_costs: Option<PathBuf>,
    },

    /// Convert `graph.json` to the indexed `graph2.json`.
    IndexGraph {
        #[command(flatten)]
        network: NetworkArgs,
    },

    /// Print node and edge counts of a network.
    Stats {
        #[command(flatten)]
        network: NetworkArgs,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => RoutingConfig::from_json_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => RoutingConfig::default(),
    };
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    let loader = FileNetworkLoader::new(config.data_dir.clone());

    match cli.command {
        Command::IndexGraph { network } => {
            let path = loader.index_graph(&network.area, &network.mode)?;
            println!("{}", path.display());
        }
        Command::Stats { network } => {
            let calc = RouteCalculator::with_loader(loader, config);
            let stats = calc.network_stats(&network.area, &network.mode)?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Route { network, from, to, max_distance, mode_costs, disable, id_field } => {
            let calc = RouteCalculator::with_loader(loader, config);
            if !disable.is_empty() {
                let report = calc.disable_graph_edges(&network.area, &network.mode, disable.as_slice(), &id_field)?;
                if report.matched == 0 {
                    bail!("none of the edges to disable exist in field {id_field:?}");
                }
            }

            let mut request = RouteRequest::new(network.area, network.mode, from, to);
            if let Some(max_distance) = max_distance {
                request = request.with_max_distance(max_distance);
            }
            if let Some(path) = mode_costs {
                request = request.with_mode_costs(read_mode_costs(&path)?);
            }

            let route = calc.calculate_route(&request);
            info!(
                segments = route.len(),
                length_m = route.total_length(),
                cost = route.total_cost(),
                "route"
            );
            println!("{}", serde_json::to_string_pretty(&route.to_geojson())?);
        }
        Command::Range { network, at, max_cost } => {
            let calc = RouteCalculator::with_loader(loader, config);
            let edges = calc.get_edges_in_range(&network.area, &network.mode, at, max_cost)?;
            println!("{}", serde_json::to_string_pretty(&range_edges_to_geojson(&edges))?);
        }
        Command::Nodes { network, sources, max_cost, mode_costs } => {
            let calc = RouteCalculator::with_loader(loader, config);
            let mode_costs = mode_costs.as_deref().map(read_mode_costs).transpose()?;
            let reached =
                calc.find_nodes_in_range(&network.area, &network.mode, &sources, max_cost, mode_costs.as_ref())?;
            let json = serde_json::json!({ "nodeIds": reached.node_ids, "nodeCosts": reached.node_costs });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }
    Ok(())
}

fn read_mode_costs(path: &std::path::Path) -> Result<ModeCosts> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing mode costs {}", path.display()))
}

fn parse_point(s: &str) -> Result<LonLat, String> {
    let (lon, lat) = s.split_once(',').ok_or_else(|| format!("expected lon,lat, got {s:?}"))?;
    let lon: f64 = lon.trim().parse().map_err(|e| format!("bad longitude {lon:?}: {e}"))?;
    let lat: f64 = lat.trim().parse().map_err(|e| format!("bad latitude {lat:?}: {e}"))?;
    Ok(LonLat::new(lon, lat))
}

fn parse_source(s: &str) -> Result<SourceNode, String> {
    match s.rsplit_once(':') {
        Some((id, cost)) => {
            let cost: f64 = cost.parse().map_err(|e| format!("bad cost {cost:?}: {e}"))?;
            Ok(SourceNode::new(id, cost))
        }
        None => Ok(SourceNode::new(s, 0.0)),
    }
}
