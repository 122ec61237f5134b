//! nlprobe-monitor - watch wireless and routing events.

mod printer;

use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use nlprobe::{AsyncListener, BssFilter, EventSource, RouteListener, WlanListener};

use printer::{Format, Printer};

#[derive(Parser)]
#[command(name = "nlprobe-monitor", version, about = "Netlink event monitor")]
struct Cli {
    /// Output JSON, one object per line.
    #[arg(short = 'j', long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print events until interrupted.
    #[command(visible_alias = "w")]
    Watch(WatchCmd),

    /// Trigger a scan and print the SSIDs found.
    Scan(ScanCmd),

    /// Bring an interface up.
    LinkUp(LinkCmd),

    /// Take an interface down.
    LinkDown(LinkCmd),
}

#[derive(Args)]
struct WatchCmd {
    /// Watch nl80211 events only.
    #[arg(long, conflicts_with = "route")]
    wifi: bool,

    /// Watch rtnetlink events only.
    #[arg(long)]
    route: bool,
}

#[derive(Args)]
struct ScanCmd {
    /// Interface name or index.
    dev: String,

    /// Seconds to wait for results.
    #[arg(short = 't', long, default_value_t = 10)]
    timeout: u64,
}

#[derive(Args)]
struct LinkCmd {
    /// Interface name or index.
    dev: String,
}

/// Accept either an interface index or a name.
fn ifindex(dev: &str) -> anyhow::Result<i32> {
    if let Ok(index) = dev.parse::<i32>() {
        return Ok(index);
    }
    if dev.is_empty() || dev.contains('/') || dev == "." || dev == ".." {
        bail!("invalid interface name: {dev:?}");
    }
    let path = format!("/sys/class/net/{dev}/ifindex");
    let content =
        std::fs::read_to_string(&path).with_context(|| format!("no such interface: {dev}"))?;
    content
        .trim()
        .parse()
        .with_context(|| format!("invalid ifindex for: {dev}"))
}

/// Wait for the next event on `driver`, or forever when there is none.
async fn next<L: EventSource>(driver: &mut Option<AsyncListener<L>>) -> nlprobe::Result<()> {
    match driver {
        Some(driver) => driver.ready().await,
        None => std::future::pending().await,
    }
}

async fn watch(cmd: &WatchCmd, format: Format) -> anyhow::Result<()> {
    let (want_wifi, want_route) = match (cmd.wifi, cmd.route) {
        (false, false) => (true, true),
        (wifi, route) => (wifi, route),
    };

    let mut wifi = None;
    if want_wifi {
        let mut listener = WlanListener::new(Printer::new(format))?;
        match listener.start() {
            Ok(()) => wifi = Some(AsyncListener::new(listener)?),
            // Hosts without a wireless driver have no nl80211 family.
            Err(e) if e.is_not_found() && want_route => {
                tracing::warn!(error = %e, "nl80211 unavailable, watching routing only");
            }
            Err(e) => return Err(e).context("starting wlan listener"),
        }
    }

    let mut route = None;
    if want_route {
        let mut listener = RouteListener::new(Printer::new(format))?;
        listener.start().context("starting route listener")?;
        route = Some(AsyncListener::new(listener)?);
    }

    loop {
        tokio::select! {
            result = next(&mut wifi) => result.context("wlan listener")?,
            result = next(&mut route) => result.context("route listener")?,
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}

async fn scan(cmd: &ScanCmd, format: Format) -> anyhow::Result<()> {
    let index = ifindex(&cmd.dev)?;
    let mut listener = WlanListener::new(Printer::quiet(format))?;
    listener.start().context("starting wlan listener")?;
    listener.trigger_scan(index)?;

    let mut driver = AsyncListener::new(listener)?;
    tokio::time::timeout(Duration::from_secs(cmd.timeout), async {
        while !driver.get_ref().observer().scan_finished(index) {
            driver.ready().await?;
        }
        Ok::<_, nlprobe::Error>(())
    })
    .await
    .context("timed out waiting for scan results")??;

    let results = driver.get_ref().scan_results(index, BssFilter::All)?;
    printer::print_scan(&results, format)?;
    Ok(())
}

fn change_link(cmd: &LinkCmd, up: bool) -> anyhow::Result<()> {
    let index = ifindex(&cmd.dev)?;
    let mut listener = RouteListener::new(Printer::quiet(Format::Text))?;
    listener.start().context("starting route listener")?;
    let flag = libc::IFF_UP as u32;
    if up {
        listener.set_link_flags(index, flag)?;
    } else {
        listener.unset_link_flags(index, flag)?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    let format = if cli.json { Format::Json } else { Format::Text };

    let result = match &cli.command {
        Command::Watch(cmd) => watch(cmd, format).await,
        Command::Scan(cmd) => scan(cmd, format).await,
        Command::LinkUp(cmd) => change_link(cmd, true),
        Command::LinkDown(cmd) => change_link(cmd, false),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
