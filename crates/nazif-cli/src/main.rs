// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod runtime;

use anyhow::{Context, Result, anyhow, bail};
use config::Config;
use nazif_app::{
    ArchiveFilter, ArchiveRecord, ArchiveView, DiscountType, DraftState, QuoteDraft, QuoteId,
    QuoteTotals, TaxMode, format_money, split_installments,
};
use nazif_archive::Client;
use nazif_store::DraftStore;
use runtime::QuoteRuntime;
use std::env;
use std::fs;
use std::path::PathBuf;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `nazif --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;

    let db_path = config.db_path()?;
    let store = DraftStore::open(&db_path).with_context(|| {
        format!(
            "open database {} -- if this path is wrong, set [storage].db_path or NAZIF_DB_PATH",
            db_path.display()
        )
    })?;
    store.bootstrap()?;

    let archive = if config.archive_configured() {
        Some(Client::new(config.archive_config()?).with_context(|| {
            format!(
                "invalid [archive] config in {}; fix url/api_key/tenant values",
                options.config_path.display()
            )
        })?)
    } else {
        None
    };

    if options.check_only {
        return Ok(());
    }

    let mut runtime = QuoteRuntime::new(&store, archive, config.default_draft())?;

    match options.command {
        Command::Show => {
            let draft = runtime.current_draft()?;
            print_draft(&draft, runtime.state());
        }
        Command::Save(update) => {
            let mut draft = runtime.current_draft()?;
            apply_update(&mut draft, &update)?;
            runtime.save_local(&draft)?;
            println!("draft saved");
        }
        Command::New => {
            runtime.start_new()?;
            println!("started a new quote");
        }
        Command::Archive => {
            let draft = runtime.current_draft()?;
            let was_editing = runtime.state();
            let stored = runtime.archive_save(&draft)?;
            runtime.save_local_best_effort(&draft);
            let id = stored.id.map(QuoteId::get).unwrap_or_default();
            match was_editing {
                DraftState::New => println!("archived as quote #{id}"),
                DraftState::Editing(_) => println!("updated quote #{id}"),
            }
        }
        Command::Open(id) => {
            let draft = runtime.open_for_edit(QuoteId::new(id))?;
            println!("opened quote #{id} for editing");
            print_draft(&draft, runtime.state());
        }
        Command::Delete(id) => {
            runtime.delete(QuoteId::new(id))?;
            println!("deleted quote #{id}");
        }
        Command::List(args) => {
            let mut view = ArchiveView::new(args.page_size.unwrap_or(config.page_size()));
            view.set_filter(args.filter);
            view.set_page(args.page.unwrap_or(1));

            let (rows, total) = runtime.list_page(&view)?;
            for row in &rows {
                print_row(row);
            }
            println!(
                "page {} of {} ({} quotes)",
                view.page(),
                view.page_count(total),
                total
            );
        }
        Command::Export(args) => {
            let csv = runtime.export_filtered(&args.filter)?;
            match args.out {
                Some(path) => {
                    fs::write(&path, &csv)
                        .with_context(|| format!("write export to {}", path.display()))?;
                    println!("exported to {}", path.display());
                }
                None => print!("{csv}"),
            }
        }
    }

    Ok(())
}

fn print_draft(draft: &QuoteDraft, state: DraftState) {
    match state {
        DraftState::New => println!("quote: new (not yet archived)"),
        DraftState::Editing(id) => println!("quote: editing archived #{}", id.get()),
    }
    println!("  client:     {}", draft.client);
    println!("  place:      {}", draft.place);
    println!("  date:       {}", draft.date);
    println!(
        "  units:      {} x {}",
        draft.units_count,
        if draft.unit_type.is_empty() {
            "-"
        } else {
            &draft.unit_type
        }
    );

    let totals = QuoteTotals::compute(
        draft.subtotal,
        draft.discount,
        draft.discount_type,
        draft.tax_rate,
        draft.tax_mode,
    );
    let currency = &draft.currency;
    println!(
        "  subtotal:   {} {currency}",
        format_money(draft.subtotal)
    );
    println!(
        "  discount:   {} {currency} ({})",
        format_money(totals.discount_amount),
        draft.discount_type.as_str()
    );
    println!(
        "  tax:        {} {currency} ({} {})",
        format_money(totals.tax_amount),
        draft.tax_rate,
        draft.tax_mode.as_str()
    );
    println!("  total:      {} {currency}", format_money(totals.total));

    for part in split_installments(totals.total, draft.pay_plan) {
        println!(
            "  payment {}:  {} {currency} ({}%)",
            part.index,
            format_money(part.amount),
            part.percent
        );
    }

    if !draft.items.is_empty() {
        println!("  items:");
        for item in &draft.items {
            println!("    - {item}");
        }
    }
}

fn print_row(row: &ArchiveRecord) {
    println!(
        "#{:<6} {}  {:<24} {:<18} {} {}",
        row.id.map(QuoteId::get).unwrap_or_default(),
        row.date.as_deref().unwrap_or("----------"),
        row.client.as_deref().unwrap_or(""),
        row.place.as_deref().unwrap_or(""),
        format_money(row.total),
        row.currency,
    );
}

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Show,
    Save(DraftUpdate),
    New,
    Archive,
    Open(i64),
    Delete(i64),
    List(ListArgs),
    Export(ExportArgs),
}

#[derive(Debug, Clone, PartialEq, Default)]
struct DraftUpdate {
    client: Option<String>,
    place: Option<String>,
    date: Option<String>,
    unit_type: Option<String>,
    units: Option<i64>,
    subtotal: Option<f64>,
    discount: Option<f64>,
    discount_type: Option<DiscountType>,
    tax: Option<f64>,
    tax_mode: Option<TaxMode>,
    currency: Option<String>,
    installments: Option<u8>,
    first_percent: Option<f64>,
    items: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
struct ListArgs {
    filter: ArchiveFilter,
    page: Option<usize>,
    page_size: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Default)]
struct ExportArgs {
    filter: ArchiveFilter,
    out: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
    command: Command,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_example: false,
        check_only: false,
        show_help: false,
        command: Command::Show,
    };

    let mut command_name: Option<String> = None;
    let mut command_args: Vec<String> = Vec::new();

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--print-config-path" => options.print_config_path = true,
            "--print-example-config" => options.print_example = true,
            "--check" => options.check_only = true,
            "--help" | "-h" => options.show_help = true,
            other if command_name.is_some() => command_args.push(other.to_owned()),
            other if !other.starts_with('-') => command_name = Some(other.to_owned()),
            unknown => {
                bail!("unknown argument {unknown:?}; run with --help to see supported options")
            }
        }
    }

    options.command = match command_name.as_deref() {
        None | Some("show") => Command::Show,
        Some("save") => Command::Save(parse_draft_update(&command_args)?),
        Some("new") => Command::New,
        Some("archive") => Command::Archive,
        Some("open") => Command::Open(parse_id(&command_args, "open")?),
        Some("delete") => Command::Delete(parse_id(&command_args, "delete")?),
        Some("list") => Command::List(parse_list_args(&command_args)?),
        Some("export") => Command::Export(parse_export_args(&command_args)?),
        Some(unknown) => {
            bail!("unknown command {unknown:?}; run with --help to see supported commands")
        }
    };

    Ok(options)
}

fn parse_id(args: &[String], command: &str) -> Result<i64> {
    let [raw] = args else {
        bail!("{command} requires exactly one quote id");
    };
    let id: i64 = raw
        .parse()
        .with_context(|| format!("{command}: {raw:?} is not a quote id"))?;
    if id <= 0 {
        bail!("{command}: quote id must be positive, got {id}");
    }
    Ok(id)
}

fn parse_draft_update(args: &[String]) -> Result<DraftUpdate> {
    let mut update = DraftUpdate::default();
    let mut iter = args.iter();
    while let Some(flag) = iter.next() {
        let mut value_for = |name: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| anyhow!("{name} requires a value"))
        };
        match flag.as_str() {
            "--client" => update.client = Some(value_for("--client")?),
            "--place" => update.place = Some(value_for("--place")?),
            "--date" => update.date = Some(value_for("--date")?),
            "--unit-type" => update.unit_type = Some(value_for("--unit-type")?),
            "--units" => {
                let raw = value_for("--units")?;
                update.units =
                    Some(raw.parse().with_context(|| {
                        format!("--units: {raw:?} is not a whole number")
                    })?);
            }
            "--subtotal" => update.subtotal = Some(parse_amount("--subtotal", &value_for("--subtotal")?)?),
            "--discount" => update.discount = Some(parse_amount("--discount", &value_for("--discount")?)?),
            "--discount-type" => {
                let raw = value_for("--discount-type")?;
                update.discount_type = Some(DiscountType::parse(&raw).ok_or_else(|| {
                    anyhow!("--discount-type must be \"amount\" or \"percent\", got {raw:?}")
                })?);
            }
            "--tax" => update.tax = Some(parse_amount("--tax", &value_for("--tax")?)?),
            "--tax-mode" => {
                let raw = value_for("--tax-mode")?;
                update.tax_mode = Some(TaxMode::parse(&raw).ok_or_else(|| {
                    anyhow!("--tax-mode must be \"inclusive\" or \"exclusive\", got {raw:?}")
                })?);
            }
            "--currency" => update.currency = Some(value_for("--currency")?),
            "--installments" => {
                let raw = value_for("--installments")?;
                let count: u8 = raw
                    .parse()
                    .ok()
                    .filter(|count| *count == 1 || *count == 2)
                    .ok_or_else(|| anyhow!("--installments must be 1 or 2, got {raw:?}"))?;
                update.installments = Some(count);
            }
            "--first-percent" => {
                update.first_percent =
                    Some(parse_amount("--first-percent", &value_for("--first-percent")?)?);
            }
            "--item" => update.items.push(value_for("--item")?),
            unknown => bail!("save: unknown option {unknown:?}"),
        }
    }
    Ok(update)
}

fn parse_amount(name: &str, raw: &str) -> Result<f64> {
    let value: f64 = raw
        .parse()
        .with_context(|| format!("{name}: {raw:?} is not a number"))?;
    if !value.is_finite() || value < 0.0 {
        bail!("{name} must be a non-negative number, got {raw}");
    }
    Ok(value)
}

fn parse_list_args(args: &[String]) -> Result<ListArgs> {
    let mut parsed = ListArgs::default();
    let mut iter = args.iter();
    while let Some(flag) = iter.next() {
        let mut value_for = |name: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| anyhow!("{name} requires a value"))
        };
        match flag.as_str() {
            "--search" => parsed.filter.text = value_for("--search")?,
            "--day" => parsed.filter.day = value_for("--day")?,
            "--month" => parsed.filter.month = value_for("--month")?,
            "--page" => parsed.page = Some(parse_page("--page", &value_for("--page")?)?),
            "--page-size" => {
                parsed.page_size = Some(parse_page("--page-size", &value_for("--page-size")?)?);
            }
            unknown => bail!("list: unknown option {unknown:?}"),
        }
    }
    Ok(parsed)
}

fn parse_page(name: &str, raw: &str) -> Result<usize> {
    let value: usize = raw
        .parse()
        .with_context(|| format!("{name}: {raw:?} is not a number"))?;
    if value == 0 {
        bail!("{name} starts at 1");
    }
    Ok(value)
}

fn parse_export_args(args: &[String]) -> Result<ExportArgs> {
    let mut parsed = ExportArgs::default();
    let mut iter = args.iter();
    while let Some(flag) = iter.next() {
        let mut value_for = |name: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| anyhow!("{name} requires a value"))
        };
        match flag.as_str() {
            "--search" => parsed.filter.text = value_for("--search")?,
            "--day" => parsed.filter.day = value_for("--day")?,
            "--month" => parsed.filter.month = value_for("--month")?,
            "--out" => parsed.out = Some(PathBuf::from(value_for("--out")?)),
            unknown => bail!("export: unknown option {unknown:?}"),
        }
    }
    Ok(parsed)
}

fn apply_update(draft: &mut QuoteDraft, update: &DraftUpdate) -> Result<()> {
    if let Some(client) = &update.client {
        draft.client = client.clone();
    }
    if let Some(place) = &update.place {
        draft.place = place.clone();
    }
    if let Some(date) = &update.date {
        draft.date = date.clone();
    }
    if let Some(unit_type) = &update.unit_type {
        draft.unit_type = unit_type.clone();
    }
    if let Some(units) = update.units {
        if units <= 0 {
            bail!("--units must be at least 1, got {units}");
        }
        draft.units_count = units;
    }
    if let Some(subtotal) = update.subtotal {
        draft.subtotal = subtotal;
    }
    if let Some(discount) = update.discount {
        draft.discount = discount;
    }
    if let Some(kind) = update.discount_type {
        draft.discount_type = kind;
    }
    if let Some(tax) = update.tax {
        draft.tax_rate = tax;
    }
    if let Some(mode) = update.tax_mode {
        draft.tax_mode = mode;
    }
    if let Some(currency) = &update.currency {
        draft.currency = currency.clone();
    }
    if let Some(count) = update.installments {
        draft.set_plan_count(count);
    }
    if let Some(percent) = update.first_percent {
        draft.set_plan_count(2);
        draft.pay_plan = nazif_app::PaymentPlan::Split {
            first_percent: percent,
        };
    }
    for item in &update.items {
        if !draft.add_item(item) {
            bail!("line item {item:?} is blank or too long");
        }
    }
    Ok(())
}

fn print_help() {
    println!("nazif - quotation builder for cleaning services");
    println!();
    println!("Commands:");
    println!("  show                     Print the working draft with computed totals (default)");
    println!("  save [--client ... ]     Update fields on the working draft and save it locally");
    println!("  new                      Discard the draft and start a new quote");
    println!("  archive                  Validate the draft and insert/update it in the archive");
    println!("  open <id>                Load an archived quote into the form for editing");
    println!("  delete <id>              Delete an archived quote");
    println!("  list [--search --day --month --page --page-size]");
    println!("  export [--search --day --month --out <file>]");
    println!();
    println!("Options:");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a config template");
    println!("  --check                  Validate config, store and archive settings");
    println!("  --help                   Show this help");
}
