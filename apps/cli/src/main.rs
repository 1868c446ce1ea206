#![deny(warnings)]

//! Headless CLI: configure slots and Y values from flags, generate, and sum.
//!
//! Example:
//! cli --days 5 --military 2 --economy 2 --sync pair --y m:0:2=25 \
//!     --param e:1:sign=off --init-military 100 --seed 7

use anyhow::{anyhow, bail, Context, Result};
use calc_core::{parse_y, CalcConfig, Category, SlotField};
use calc_runtime::Calculator;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct Options {
    config: CalcConfig,
    pair: bool,
    global: bool,
    y_edits: Vec<(Category, usize, usize, f64)>,
    params: Vec<(Category, usize, SlotField)>,
    init_military: i64,
    init_economy: i64,
    json: bool,
    version: bool,
}

fn next_value(it: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    it.next().ok_or_else(|| anyhow!("{flag} needs a value"))
}

/// Split `cat:slot:rest` into its three parts.
fn parse_target(s: &str) -> Result<(Category, usize, &str)> {
    let mut parts = s.splitn(3, ':');
    let (Some(cat), Some(slot), Some(rest)) = (parts.next(), parts.next(), parts.next()) else {
        bail!("expected CAT:SLOT:..., got {s:?}");
    };
    let category: Category = cat.parse()?;
    let slot = slot
        .parse()
        .with_context(|| format!("bad slot index in {s:?}"))?;
    Ok((category, slot, rest))
}

/// `m:0:2=25` -> Military slot 0, day 2, Y 25.
fn parse_y_edit(s: &str) -> Result<(Category, usize, usize, f64)> {
    let (category, slot, rest) = parse_target(s)?;
    let (day, y) = rest
        .split_once('=')
        .ok_or_else(|| anyhow!("expected DAY=VALUE in {s:?}"))?;
    let day = day.parse().with_context(|| format!("bad day in {s:?}"))?;
    Ok((category, slot, day, parse_y(y)?))
}

/// `e:1:sign=off` -> Economy slot 1, use_sign false.
fn parse_param(s: &str) -> Result<(Category, usize, SlotField)> {
    let (category, slot, rest) = parse_target(s)?;
    let (name, value) = rest
        .split_once('=')
        .ok_or_else(|| anyhow!("expected FIELD=VALUE in {s:?}"))?;
    Ok((category, slot, SlotField::parse(name, value)?))
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Options> {
    let mut opts = Options::default();
    let mut it = args.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--days" => {
                let n: i64 = next_value(&mut it, &arg)?.parse()?;
                opts.config.initial_days = usize::try_from(n).unwrap_or(0);
            }
            "--military" => opts.config.initial_military = next_value(&mut it, &arg)?.parse()?,
            "--economy" => opts.config.initial_economy = next_value(&mut it, &arg)?.parse()?,
            "--seed" => opts.config.rng_seed = Some(next_value(&mut it, &arg)?.parse()?),
            "--sync" => match next_value(&mut it, &arg)?.as_str() {
                "pair" => opts.pair = true,
                "global" => opts.global = true,
                "both" => {
                    opts.pair = true;
                    opts.global = true;
                }
                "off" => {}
                other => bail!("unknown sync mode {other:?}"),
            },
            "--y" => opts.y_edits.push(parse_y_edit(&next_value(&mut it, &arg)?)?),
            "--param" => opts.params.push(parse_param(&next_value(&mut it, &arg)?)?),
            "--init-military" => opts.init_military = next_value(&mut it, &arg)?.parse()?,
            "--init-economy" => opts.init_economy = next_value(&mut it, &arg)?.parse()?,
            "--json" => opts.json = true,
            "--version" => opts.version = true,
            other => bail!("unknown argument {other:?}"),
        }
    }
    Ok(opts)
}

fn run(opts: &Options) -> Calculator {
    let mut calc = Calculator::with_config(&opts.config);
    calc.set_sync_pair_mode(opts.pair);
    calc.set_sync_global_mode(opts.global);
    for &(category, index, field) in &opts.params {
        if !calc.set_slot_param(category, index, field) {
            info!(%category, index, ?field, "parameter not applied");
        }
    }
    for &(category, slot, day, y) in &opts.y_edits {
        let out = calc.set_cell_value(category, slot, day, y);
        info!(%category, slot, day, y, propagated = out.propagated, "y edited");
    }
    calc.set_initial_total(Category::Military, opts.init_military);
    calc.set_initial_total(Category::Economy, opts.init_economy);
    calc.generate();
    calc.sum_all();
    calc
}

/// Log filter from `RUST_LOG`-style directives, falling back to `info`.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn main() -> Result<()> {
    // Logging setup; the env filter alone decides the level.
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(rust_log.as_deref()))
        .with_writer(std::io::stderr)
        .init();

    let opts = parse_args(std::env::args().skip(1))?;
    if opts.version {
        println!("cli {} ({})", env!("CARGO_PKG_VERSION"), env!("GIT_SHA"));
        return Ok(());
    }
    info!(config = ?opts.config, pair = opts.pair, global = opts.global, "starting CLI");

    let calc = run(&opts);

    if opts.json {
        let out = serde_json::json!({
            "seed": calc.seed(),
            "results": calc.results(),
            "summary": calc.summary(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!(
        "Days: {} | seed: {} | sync: pair={} global={}",
        calc.days(),
        calc.seed(),
        calc.sync_modes().pair,
        calc.sync_modes().global
    );
    for r in calc.results() {
        println!(
            "Day {:>2} | Military: {} | Economy: {}",
            r.day,
            r.military_text(),
            r.economy_text()
        );
    }
    println!("{}", calc.summary());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn parses_full_command_line() {
        let opts = parse_args(args(
            "--days 4 --military 2 --economy 3 --seed 9 --sync both \
             --y m:1:2=12.5 --param e:0:max=7 --init-economy -5 --json",
        ))
        .unwrap();
        assert_eq!(opts.config.initial_days, 4);
        assert_eq!(opts.config.initial_military, 2);
        assert_eq!(opts.config.initial_economy, 3);
        assert_eq!(opts.config.rng_seed, Some(9));
        assert!(opts.pair && opts.global);
        assert_eq!(opts.y_edits, vec![(Category::Military, 1, 2, 12.5)]);
        assert_eq!(opts.params, vec![(Category::Economy, 0, SlotField::MaxValue(7))]);
        assert_eq!(opts.init_economy, -5);
        assert!(opts.json);
    }

    #[test]
    fn log_filter_follows_rust_log() {
        assert_eq!(log_filter(Some("warn")).to_string(), "warn");
        assert_eq!(
            log_filter(Some("calc_gen=trace")).to_string(),
            "calc_gen=trace"
        );
        assert_eq!(log_filter(None).to_string(), "info");
        assert_eq!(log_filter(Some("calc_gen=loud")).to_string(), "info");
    }

    #[test]
    fn negative_days_clamp_through_engine() {
        let opts = parse_args(args("--days -3 --seed 1")).unwrap();
        assert_eq!(run(&opts).days(), 1);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_args(args("--sync sideways")).is_err());
        assert!(parse_args(args("--y x:0:0=1")).is_err());
        assert!(parse_args(args("--y m:0:0=inf")).is_err());
        assert!(parse_args(args("--param m:0:colour=red")).is_err());
        assert!(parse_args(args("--days")).is_err());
        assert!(parse_args(args("--frobnicate")).is_err());
    }

    #[test]
    fn run_applies_edits_before_generating() {
        let opts = parse_args(args(
            "--days 2 --seed 3 --sync pair --y m:0:1=50 \
             --param m:0:max=1 --param m:0:sign=off --init-military 10",
        ))
        .unwrap();
        let calc = run(&opts);
        assert_eq!(calc.cell(Category::Economy, 0, 1), Some(50.0));
        // 1 + 1 * 0.5 = 1.5 -> 2 on day 2; 1 on day 1.
        let military: Vec<i64> = calc
            .results()
            .iter()
            .flat_map(|r| r.military_values.clone())
            .collect();
        assert_eq!(military, vec![1, 2]);
        let report = calc.summary().report().unwrap();
        assert_eq!(report.military.final_total, 13);
    }
}
