// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

mod config;
mod fetcher;
mod settings_store;

use std::path::PathBuf;
use std::sync::{Arc, Weak};

use aircraft_list::{
    Aircraft, AircraftFilter, AircraftList, AircraftListFilter, AircraftListFilterSettings,
    AircraftListSettings, CountingIdleTimeout, FilterCondition, FilterProperty, GlobalDispatcher,
    GlobalEvent, IdleTimeout, SelectionSource, SettingsStore, StaticServerCapabilities,
};
use clap::{Args, Parser, Subcommand};
use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use config::AppConfig;
use fetcher::Fetcher;
use settings_store::ConfySettingsStore;

#[derive(Parser, Debug)]
#[command(name = "airjedi-list", version)]
#[command(about = "Track a live aircraft list from a polled aircraft-tracking server", long_about = None)]
struct Cli {
    /// Increase log output (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Select the aircraft with this id once it appears
    #[arg(long)]
    select: Option<i64>,

    #[command(flatten)]
    filter: FilterArgs,

    #[command(subcommand)]
    command: Command,
}

/// Replaces the saved filter when any option is given.
#[derive(Args, Debug, Default, Clone, PartialEq)]
struct FilterArgs {
    /// Only show callsigns starting with this text
    #[arg(long)]
    callsign: Option<String>,

    /// Lowest altitude to show, in feet
    #[arg(long)]
    min_altitude: Option<f64>,

    /// Highest altitude to show, in feet
    #[arg(long)]
    max_altitude: Option<f64>,

    /// Only show military aircraft
    #[arg(long)]
    military: bool,

    /// Hide aircraft that have not reported a position
    #[arg(long)]
    hide_no_position: bool,
}

impl FilterArgs {
    fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn to_filters(&self) -> Result<Vec<AircraftFilter>, aircraft_list::FilterError> {
        let mut filters = Vec::new();
        if let Some(callsign) = &self.callsign {
            filters.push(AircraftFilter::text(
                FilterProperty::Callsign,
                FilterCondition::Starts,
                callsign.as_str(),
            )?);
        }
        if self.min_altitude.is_some() || self.max_altitude.is_some() {
            filters.push(AircraftFilter::range(
                FilterProperty::Altitude,
                self.min_altitude,
                self.max_altitude,
            )?);
        }
        if self.military {
            filters.push(AircraftFilter::flag(FilterProperty::IsMilitary, true)?);
        }
        Ok(filters)
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply recorded AircraftList.json snapshots in order
    Replay {
        /// Snapshot files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Poll the server until interrupted
    Poll {
        /// Server base URL (defaults to the configured server)
        #[arg(long)]
        url: Option<String>,

        /// Stop after this many requests
        #[arg(long)]
        count: Option<u64>,
    },
    /// Show the configuration file location and contents
    Config,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn print_aircraft(aircraft: &[Aircraft], selected: Option<i64>) {
    println!(
        "{} - {} aircraft shown",
        chrono::Local::now().format("%H:%M:%S"),
        aircraft.len()
    );
    for a in aircraft {
        a.with_data(|data| {
            let marker = if selected == Some(data.id) { '*' } else { ' ' };
            let position = match (data.latitude.get(), data.longitude.get()) {
                (Some(lat), Some(lng)) => format!("{lat:.4},{lng:.4}"),
                _ => "-".to_string(),
            };
            println!(
                "{marker}{:>9} {:<7} {:<8} {:>6} {:>5} {}",
                data.id,
                data.icao.value().map_or("", String::as_str),
                data.callsign.value().map_or("", String::as_str),
                data.altitude.get().map_or_else(|| "-".to_string(), |alt| alt.to_string()),
                data.speed.get().map_or_else(|| "-".to_string(), |spd| format!("{spd:.0}")),
                position,
            );
        });
    }
}

/// Print the visible aircraft whenever the display needs refreshing.
fn hook_display(global: &GlobalDispatcher, list: Weak<AircraftList>, filter: Weak<AircraftListFilter>) {
    global.hook(GlobalEvent::DisplayUpdated.name(), move |_| {
        let (Some(list), Some(filter)) = (list.upgrade(), filter.upgrade()) else {
            return;
        };
        let mut shown = list
            .aircraft()
            .to_list_filtered(|aircraft| filter.filter_aircraft(aircraft));
        shown.sort_by_key(Aircraft::id);
        print_aircraft(&shown, list.selected_aircraft().as_ref().map(Aircraft::id));
    });
}

fn hook_list_logging(list: &Arc<AircraftList>) {
    let weak = Arc::downgrade(list);
    list.hook_updated(move |new_aircraft, off_radar| {
        let live = weak.upgrade().map_or(0, |list| list.count_aircraft());
        info!(
            "Aircraft list updated: {} new, {} off radar, {} live",
            new_aircraft.len(),
            off_radar.len(),
            live
        );
    });

    let weak = Arc::downgrade(list);
    list.hook_selected_changed(move |previous| {
        let current = weak.upgrade().and_then(|list| list.selected_aircraft());
        info!(
            "Selection changed: {:?} -> {:?}",
            previous.map(Aircraft::id),
            current.as_ref().map(Aircraft::id)
        );
    });

    list.hook_selected_reselected(|| info!("Selected aircraft reacquired"));
}

/// Select `id` as soon as it shows up in a snapshot. The selection is made by
/// the program, so it does not count as user activity.
fn hook_auto_select(list: &Arc<AircraftList>, id: i64) {
    let weak = Arc::downgrade(list);
    list.hook_updated(move |_, _| {
        let Some(list) = weak.upgrade() else {
            return;
        };
        if list.selected_aircraft().is_some() {
            return;
        }
        if let Some(aircraft) = list.find_aircraft_by_id(id) {
            list.set_selected_aircraft(Some(aircraft), SelectionSource::Program);
        }
    });
}

fn configure_filter(filter: &AircraftListFilter, args: &FilterArgs) -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = filter.load_state() {
        warn!("Could not load saved filter: {}", e);
    }
    if args.is_empty() {
        return Ok(());
    }

    filter.clear_filters();
    for aircraft_filter in args.to_filters()? {
        filter.add_filter(aircraft_filter)?;
    }
    filter.set_hide_aircraft_without_position(args.hide_no_position);
    filter.set_enabled(true);
    filter.save_state()?;
    info!("Saved filter with {} condition(s)", filter.filters().len());
    Ok(())
}

fn replay(list: &AircraftList, files: &[PathBuf]) -> Result<(), Box<dyn std::error::Error>> {
    for path in files {
        let request = fetcher::prepare_request(list);
        debug!("Replaying {} (request params {:?})", path.display(), request.params);

        let text = std::fs::read_to_string(path)?;
        if let Err(e) = list.apply_json_str(&text) {
            warn!("Skipping {}: {}", path.display(), e);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = AppConfig::load()?;
    if let Command::Config = cli.command {
        println!("{}", AppConfig::get_config_path()?.display());
        println!("{config:#?}");
        config.save()?;
        return Ok(());
    }

    let global_events = Arc::new(GlobalDispatcher::new("global"));
    global_events.set_log_timings(config.log_event_timings);
    let idle_timeout = Arc::new(CountingIdleTimeout::default());

    let mut list_settings = AircraftListSettings::new(
        Arc::new(StaticServerCapabilities::new(config.pictures_enabled)),
        Arc::clone(&global_events),
    );
    let shared_timeout: Arc<dyn IdleTimeout> = idle_timeout.clone();
    list_settings.idle_timeout = Some(shared_timeout);
    list_settings.log_event_timings = config.log_event_timings;
    let list = Arc::new(AircraftList::new(list_settings));

    let store: Arc<dyn SettingsStore> = Arc::new(ConfySettingsStore::open(config::APP_NAME, "settings")?);
    let filter = Arc::new(AircraftListFilter::new(AircraftListFilterSettings {
        persistence_key: config.filter_persistence_key.clone(),
        store: Some(store),
    }));
    configure_filter(&filter, &cli.filter)?;
    filter.attach(&list);

    hook_list_logging(&list);
    if let Some(id) = cli.select {
        hook_auto_select(&list, id);
    }
    hook_display(&global_events, Arc::downgrade(&list), Arc::downgrade(&filter));

    match cli.command {
        Command::Replay { files } => replay(&list, &files)?,
        Command::Poll { url, count } => {
            let url = url.unwrap_or_else(|| config.server_url.clone());
            let fetcher = Fetcher::new(&url, Arc::clone(&list))?;

            let cancel = CancellationToken::new();
            let ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Interrupted, shutting down");
                    ctrl_c.cancel();
                }
            });

            fetcher.run(config.refresh_interval(), count, cancel).await;
        }
        Command::Config => {}
    }

    filter.detach(&list);
    debug!("Idle timer was reset {} time(s)", idle_timeout.resets());
    Ok(())
}
